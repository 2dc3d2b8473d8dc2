use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::idfm::entities::LineRecord;

/// Most arrivals shown per (line, destination) group
pub const MAX_SLOTS: usize = 3;

/// Length of the hex group identifier.
/// With 16^5 possible ids the chance of any collision among `n` groups is
/// about n^2 / 2^21, so roughly 0.02% for the 20 groups a busy stop shows.
/// A collision only means one ignore toggle hides two groups.
pub const GROUP_ID_LEN: usize = 5;

/// Arrival status as reported by SIRI. Anything unrecognised is `Unknown`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum ArrivalStatus {
    OnTime,
    Early,
    Delayed,
    Cancelled,
    Missed,
    Arrived,
    NoReport,
    NotExpected,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Line as returned in the API
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Line {
    pub id: String,
    pub name: String,
    /// Icon URL
    pub picto: Option<String>,
}

impl From<LineRecord> for Line {
    fn from(record: LineRecord) -> Self {
        Line {
            id: record.id_line,
            name: record.name_line,
            picto: record.picto.and_then(|p| p.url),
        }
    }
}

/// One visit from the feed, joined with its line
#[derive(Debug, Clone)]
pub struct RawVisit {
    pub line: Line,
    pub destination_name: String,
    pub arrival_time: Option<DateTime<Utc>>,
    pub expected_arrival_time: DateTime<Utc>,
    pub platform: Option<String>,
    pub status: ArrivalStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalSlot {
    /// Aimed (scheduled) arrival
    pub arrival_time: Option<DateTime<Utc>>,
    pub expected_arrival_time: DateTime<Utc>,
    pub platform: Option<String>,
    pub status: ArrivalStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainGroup {
    pub id: String,
    pub label: String,
    #[serde(rename = "ligne")]
    pub line: Line,
    pub destination_name: String,
    #[serde(rename = "infosList")]
    pub slots: Vec<ArrivalSlot>,
}

impl TrainGroup {
    fn new(line: Line, destination_name: String, first: ArrivalSlot) -> Self {
        let label = format!("{} - {}", line.name, destination_name);
        TrainGroup {
            id: group_id(&label),
            label,
            line,
            destination_name,
            slots: vec![first],
        }
    }

    fn matches(&self, visit: &RawVisit) -> bool {
        self.line.id == visit.line.id && self.destination_name == visit.destination_name
    }

    /// Appends unless the group is full or the slot is already `Arrived`.
    /// Returns whether the slot was kept.
    pub fn push(&mut self, slot: ArrivalSlot) -> bool {
        if self.slots.len() >= MAX_SLOTS || slot.status == ArrivalStatus::Arrived {
            return false;
        }
        self.slots.push(slot);
        true
    }

    /// Soonest expected arrival across the slots
    pub fn next_arrival(&self) -> Option<DateTime<Utc>> {
        self.slots.iter().map(|s| s.expected_arrival_time).min()
    }
}

pub fn group_id(label: &str) -> String {
    let digest = Sha256::digest(label.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(GROUP_ID_LEN);
    id
}

/// Groups visits by (line, destination) and orders the groups by their
/// soonest arrival.
///
/// - visits expected at or before `now` are dropped
/// - the first visit of a pair, in feed order, creates its group; later ones
///   go through [`TrainGroup::push`]
/// - the sort is stable, so groups arriving at the same time keep feed order
pub fn group_and_sort(visits: Vec<RawVisit>, now: DateTime<Utc>) -> Vec<TrainGroup> {
    let mut groups: Vec<TrainGroup> = vec![];

    for visit in visits {
        if visit.expected_arrival_time <= now {
            continue;
        }

        let slot = ArrivalSlot {
            arrival_time: visit.arrival_time,
            expected_arrival_time: visit.expected_arrival_time,
            platform: visit.platform.clone(),
            status: visit.status,
        };

        match groups.iter_mut().find(|g| g.matches(&visit)) {
            Some(group) => {
                group.push(slot);
            }
            None => groups.push(TrainGroup::new(visit.line, visit.destination_name, slot)),
        }
    }

    groups
        .into_iter()
        .sorted_by_key(|g| g.next_arrival())
        .collect()
}
