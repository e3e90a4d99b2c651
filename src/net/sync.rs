//! Change notifications for external observers
//!
//! The network queues events instead of calling out, so an observer can
//! never stall a link change or a distribution. The host drains the queue
//! whenever it likes (typically once per tick).

use serde::{Deserialize, Serialize};

use super::location::Location;

/// Something an external observer may want to mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// An edge of `node` toward `other` was added or removed
    EdgeChanged {
        node: Location,
        other: Location,
        /// `other` is an output of `node` (otherwise an input)
        is_output: bool,
        removed: bool,
    },
    /// Observers should resend everything about `node`
    FullSync { node: Location },
    /// Impetus flowed along `path` (provider first)
    Transaction { path: Vec<Location> },
}

/// Receiver of queued sync events
pub trait SyncObserver {
    fn on_event(&mut self, event: &SyncEvent);
}

/// Observer that just records what it saw
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<SyncEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_changes(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, SyncEvent::EdgeChanged { .. }))
    }

    pub fn transactions(&self) -> impl Iterator<Item = &[Location]> {
        self.events.iter().filter_map(|e| match e {
            SyncEvent::Transaction { path } => Some(path.as_slice()),
            _ => None,
        })
    }
}

impl SyncObserver for EventLog {
    fn on_event(&mut self, event: &SyncEvent) {
        self.events.push(event.clone());
    }
}
