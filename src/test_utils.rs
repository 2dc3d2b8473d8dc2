use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{
    config::{Config, ConfigBuilder},
    idfm::{
        entities::StopMonitoringResponse,
        error::{IdfmError, IdfmResult},
    },
    lines::LineSource,
    next_trains::StopMonitoringSource,
    trains::{ArrivalStatus, Line, RawVisit},
};

pub fn init() {
    dotenvy::from_filename(".dev.vars").ok();
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn config() -> Config {
    init();
    ConfigBuilder::default().api_key("test-key").build().unwrap()
}

pub fn line(id: &str, name: &str) -> Line {
    Line {
        id: id.to_string(),
        name: name.to_string(),
        picto: Some(format!("https://example.org/{}.svg", id)),
    }
}

pub fn visit(line: &Line, destination: &str, expected: DateTime<Utc>, status: ArrivalStatus) -> RawVisit {
    RawVisit {
        line: line.clone(),
        destination_name: destination.to_string(),
        arrival_time: Some(expected),
        expected_arrival_time: expected,
        platform: Some("1".to_string()),
        status,
    }
}

/// A record as the reference dataset returns it
pub fn line_record(id: &str, name: &str) -> Value {
    json!({
        "id_line": id,
        "name_line": name,
        "transportmode": "rail",
        "picto": { "url": format!("https://example.org/{}.svg", id), "format": "svg" },
    })
}

pub fn stop_visit(line_ref: &str, destination: &str, expected: DateTime<Utc>, status: &str) -> Value {
    json!({
        "MonitoredVehicleJourney": {
            "LineRef": { "value": line_ref },
            "DestinationName": [{ "value": destination }],
            "MonitoredCall": {
                "AimedArrivalTime": expected.to_rfc3339(),
                "ExpectedArrivalTime": expected.to_rfc3339(),
                "ArrivalPlatformName": { "value": "1" },
                "ArrivalStatus": status,
            },
        },
    })
}

pub fn feed(visits: Vec<Value>) -> Value {
    json!({
        "Siri": {
            "ServiceDelivery": {
                "StopMonitoringDelivery": [{ "MonitoredStopVisit": visits }],
            },
        },
    })
}

/// Stop monitoring feed serving a fixed body. With no body it answers 503.
#[derive(Clone, Default)]
pub struct FakeFeed {
    response: Arc<Mutex<Option<Value>>>,
}

impl FakeFeed {
    pub fn with_response(response: Value) -> Self {
        let feed = FakeFeed::default();
        feed.set(Some(response));
        feed
    }

    pub fn set(&self, response: Option<Value>) {
        *self.response.lock().unwrap() = response;
    }
}

impl StopMonitoringSource for FakeFeed {
    async fn fetch_stop_monitoring(&self, stop_ref: &str) -> IdfmResult<StopMonitoringResponse> {
        let response = self.response.lock().unwrap().clone();
        match response {
            Some(body) => Ok(serde_json::from_value(body)?),
            None => Err(IdfmError::Status {
                status: 503,
                url: format!("fake://stop-monitoring?MonitoringRef={}", stop_ref),
            }),
        }
    }
}

/// Reference dataset serving the given records, counting requests.
/// Unknown lines answer 404.
#[derive(Clone, Default)]
pub struct FakeLines {
    records: Arc<HashMap<String, Value>>,
    calls: Arc<AtomicUsize>,
}

impl FakeLines {
    pub fn with_records(records: impl IntoIterator<Item = Value>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r["id_line"].as_str().unwrap().to_string(), r))
            .collect();
        FakeLines {
            records: Arc::new(records),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LineSource for FakeLines {
    async fn fetch_line_record(&self, line_id: &str) -> IdfmResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(line_id)
            .cloned()
            .ok_or_else(|| IdfmError::Status {
                status: 404,
                url: format!("fake://lines?id_line={}", line_id),
            })
    }
}
