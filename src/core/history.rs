//! Bounded journal of the switches a machine has performed.

use super::identifier::HashedId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of records a machine keeps unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Why a switch happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchCause {
    /// The default state was selected on first activation
    Start,
    /// A `switch_to` call or a request issued by a state
    Request,
    /// The machine was restarted
    Restart,
}

/// Record of a single switch.
///
/// # Example
///
/// ```rust
/// use statetree::core::{HashedId, SwitchCause, SwitchRecord};
///
/// let record = SwitchRecord::new(Some(HashedId::new("Idle")), HashedId::new("Walk"), SwitchCause::Request);
/// assert_eq!(record.to.name, "Walk");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// The state that was current before the switch, if any
    pub from: Option<HashedId>,
    /// The state that became current
    pub to: HashedId,
    pub cause: SwitchCause,
    pub timestamp: DateTime<Utc>,
}

impl SwitchRecord {
    pub fn new(from: Option<HashedId>, to: HashedId, cause: SwitchCause) -> Self {
        Self {
            from,
            to,
            cause,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered switch records, oldest first, holding at most `capacity` entries.
///
/// A capacity of zero disables recording.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchHistory {
    records: VecDeque<SwitchRecord>,
    capacity: usize,
}

impl Default for SwitchHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SwitchHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, record: SwitchRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &SwitchRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&SwitchRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// States visited, in order.
    ///
    /// Starts with the `from` of the oldest retained record when it has one,
    /// followed by the `to` of every record.
    pub fn path(&self) -> Vec<&HashedId> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(from) = self.records.front().and_then(|r| r.from.as_ref()) {
            path.push(from);
        }
        path.extend(self.records.iter().map(|r| &r.to));
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
