use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::VecDeque;

/// Maximum number of click events retained per URL entity.
pub const HISTORY_CAPACITY: usize = 1000;

/// Request metadata captured for a single access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickContext {
    pub ip: String,
    pub referrer: String,
    pub browser: String,
    pub os: String,
    pub device: String,
}

/// A single recorded resolution access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub timestamp: Timestamp,
    pub ip: String,
    pub referrer: String,
    pub browser: String,
    pub os: String,
    pub device: String,
}

impl ClickEvent {
    pub fn new(timestamp: Timestamp, context: ClickContext) -> Self {
        Self {
            timestamp,
            ip: context.ip,
            referrer: context.referrer,
            browser: context.browser,
            os: context.os,
            device: context.device,
        }
    }
}

/// Fixed-capacity, oldest-evicted click log.
///
/// Never holds more than [`HISTORY_CAPACITY`] events. Pushing onto a full
/// history drops the oldest event first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickHistory {
    events: VecDeque<ClickEvent>,
}

impl ClickHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ClickEvent) {
        if self.events.len() >= HISTORY_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates from the oldest retained event to the newest.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, ClickEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&ClickEvent> {
        self.events.back()
    }
}

impl FromIterator<ClickEvent> for ClickHistory {
    fn from_iter<I: IntoIterator<Item = ClickEvent>>(iter: I) -> Self {
        let mut history = ClickHistory::new();
        for event in iter {
            history.push(event);
        }
        history
    }
}

impl<'a> IntoIterator for &'a ClickHistory {
    type Item = &'a ClickEvent;
    type IntoIter = std::collections::vec_deque::Iter<'a, ClickEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl Serialize for ClickHistory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.events.iter())
    }
}

impl<'de> Deserialize<'de> for ClickHistory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // oversized payloads keep only their newest HISTORY_CAPACITY entries
        let events = Vec::<ClickEvent>::deserialize(deserializer)?;
        Ok(events.into_iter().collect())
    }
}
