use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use itertools::Itertools;
use regex::Regex;

use crate::{
    error::NextTrainsResult,
    idfm::{
        client::IdfmClient,
        entities::{MonitoredStopVisit, StopMonitoringResponse},
        error::IdfmResult,
    },
    lines::{LineCache, LineSource},
    trains::{group_and_sort, ArrivalStatus, Line, RawVisit, TrainGroup},
};

/// Line references look like `STIF:Line::C01727:`
const LINE_REF_PATTERN: &str = r"STIF:Line::(C\d+):";

/// Where the real-time feed comes from
#[allow(async_fn_in_trait)]
pub trait StopMonitoringSource {
    async fn fetch_stop_monitoring(&self, stop_ref: &str) -> IdfmResult<StopMonitoringResponse>;
}

impl StopMonitoringSource for IdfmClient {
    async fn fetch_stop_monitoring(&self, stop_ref: &str) -> IdfmResult<StopMonitoringResponse> {
        self.get_stop_monitoring(stop_ref).await
    }
}

/// A visit whose line has been parsed but not yet resolved
#[derive(Debug)]
struct PendingVisit {
    line_id: String,
    destination_name: String,
    arrival_time: Option<DateTime<Utc>>,
    expected_arrival_time: DateTime<Utc>,
    platform: Option<String>,
    status: ArrivalStatus,
}

impl PendingVisit {
    fn into_raw(self, line: Line) -> RawVisit {
        RawVisit {
            line,
            destination_name: self.destination_name,
            arrival_time: self.arrival_time,
            expected_arrival_time: self.expected_arrival_time,
            platform: self.platform,
            status: self.status,
        }
    }
}

/// The fetch, resolve, group pipeline for one stop
pub struct NextTrains<F, L> {
    feed: F,
    lines: LineCache<L>,
    stop_ref: String,
    re_line_ref: Regex,
}

impl<F: StopMonitoringSource, L: LineSource> NextTrains<F, L> {
    pub fn new(feed: F, lines: LineCache<L>, stop_ref: impl Into<String>) -> Self {
        NextTrains {
            feed,
            lines,
            stop_ref: stop_ref.into(),
            re_line_ref: Regex::new(LINE_REF_PATTERN).unwrap(),
        }
    }

    /// Line code out of a SIRI line reference
    pub fn parse_line_ref(&self, line_ref: &str) -> Option<String> {
        self.re_line_ref
            .captures(line_ref)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn pending_visit(&self, visit: serde_json::Value) -> Option<PendingVisit> {
        let visit: MonitoredStopVisit = match serde_json::from_value(visit) {
            Ok(visit) => visit,
            Err(e) => {
                log::warn!("Skipping malformed visit: {}", e);
                return None;
            }
        };
        let journey = visit.monitored_vehicle_journey?;
        let line_id = self.parse_line_ref(&journey.line_ref?.value)?;
        let destination_name = journey.destination_name.into_iter().next()?.value;
        let call = journey.monitored_call?;

        // without a prediction the schedule is the best guess
        let expected_arrival_time = call.expected_arrival_time.or(call.aimed_arrival_time)?;

        Some(PendingVisit {
            line_id,
            destination_name,
            arrival_time: call.aimed_arrival_time,
            expected_arrival_time,
            platform: call.arrival_platform_name.map(|p| p.value),
            status: call.arrival_status,
        })
    }

    /// Visits at the stop, in feed order, joined with their line. Visits that
    /// can't be parsed or whose line can't be resolved are left out.
    pub async fn fetch_visits(&self) -> NextTrainsResult<Vec<RawVisit>> {
        let response = self.feed.fetch_stop_monitoring(&self.stop_ref).await?;

        let Some(visits) = response.into_visits() else {
            log::warn!("No StopMonitoringDelivery or MonitoredStopVisit for {}", self.stop_ref);
            return Ok(vec![]);
        };

        let total = visits.len();
        let pending = visits
            .into_iter()
            .filter_map(|v| self.pending_visit(v))
            .collect::<Vec<_>>();
        if pending.len() < total {
            log::warn!("Skipped {} unparseable visits", total - pending.len());
        }

        // each line is resolved once, all lines at the same time
        let line_ids = pending
            .iter()
            .map(|p| p.line_id.clone())
            .unique()
            .collect::<Vec<_>>();
        let resolved = join_all(line_ids.iter().map(|id| self.lines.resolve(id))).await;

        let lines: HashMap<String, Line> = line_ids
            .into_iter()
            .zip(resolved)
            .filter_map(|(id, result)| match result {
                Ok(line) => Some((id, line)),
                Err(e) => {
                    log::warn!("Skipping line {}: {}", id, e);
                    None
                }
            })
            .collect();

        let visits = pending
            .into_iter()
            .filter_map(|p| {
                let line = lines.get(&p.line_id)?.clone();
                Some(p.into_raw(line))
            })
            .collect();

        Ok(visits)
    }

    pub async fn next_trains(&self, now: DateTime<Utc>) -> NextTrainsResult<Vec<TrainGroup>> {
        let visits = self.fetch_visits().await?;
        Ok(group_and_sort(visits, now))
    }
}
