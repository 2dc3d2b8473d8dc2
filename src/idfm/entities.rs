//! Serde types for the two upstream APIs: the SIRI stop-monitoring feed and the
//! line reference dataset. Only the fields used downstream are declared.
//! Everything is optional on the feed side, a missing branch means "no data".
//! A visit that still fails to parse is dropped on its own.

use chrono::{DateTime, Utc};
use serde::{de::Deserializer, Deserialize, Serialize};

use crate::trains::ArrivalStatus;

/// Raw stop-monitoring body. The envelope is walked rather than typed so a
/// wrong-typed branch reads the same as a missing one.
#[derive(Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct StopMonitoringResponse(serde_json::Value);

impl StopMonitoringResponse {
    const VISITS_PATH: &'static str =
        "/Siri/ServiceDelivery/StopMonitoringDelivery/0/MonitoredStopVisit";

    /// `Siri.ServiceDelivery.StopMonitoringDelivery[0].MonitoredStopVisit`,
    /// or `None` if any part of that path is absent or not the expected shape.
    /// Visits are left raw so each one is parsed on its own.
    pub fn into_visits(mut self) -> Option<Vec<serde_json::Value>> {
        match self.0.pointer_mut(Self::VISITS_PATH)?.take() {
            serde_json::Value::Array(visits) => Some(visits),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredStopVisit {
    pub monitored_vehicle_journey: Option<MonitoredVehicleJourney>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredVehicleJourney {
    /// e.g. `STIF:Line::C01727:`
    pub line_ref: Option<StringValue>,
    #[serde(default)]
    pub destination_name: Vec<StringValue>,
    pub monitored_call: Option<MonitoredCall>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredCall {
    pub aimed_arrival_time: Option<DateTime<Utc>>,
    pub expected_arrival_time: Option<DateTime<Utc>>,
    pub arrival_platform_name: Option<StringValue>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub arrival_status: ArrivalStatus,
}

/// `null` reads as `Unknown`, like an absent status
fn deserialize_status<'de, D>(deserializer: D) -> Result<ArrivalStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let status: Option<ArrivalStatus> = Deserialize::deserialize(deserializer)?;
    Ok(status.unwrap_or_default())
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StringValue {
    pub value: String,
}

/// Envelope of the reference dataset API
#[derive(Deserialize, Debug)]
pub struct ReferenceRecords {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// One record of the line reference dataset, as stored in the cache files
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub id_line: String,
    pub name_line: String,
    pub picto: Option<Picto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Picto {
    pub url: Option<String>,
}
