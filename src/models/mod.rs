// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod fingerprint;
mod history;
mod item;

// Re-export all public types
pub use config::{
    Config, FieldSelectors, FingerprintAlgorithm, FingerprintConfig, HealthConfig, LedgerConfig,
    LedgerStatus, LoggingConfig, MessagesConfig, NotifyConfig, ScheduleConfig, SourceConfig,
    StorageConfig, SupervisorConfig,
};
pub use fingerprint::Fingerprint;
pub use history::{HistoryRecord, HistoryStore};
pub use item::{Item, SENTINEL, TIMESTAMP_FORMAT, UNKNOWN_CATEGORY, is_resolved, timestamp_now};

/// A transition of one offer between two polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The offer was not active and now is
    Added { fingerprint: Fingerprint, item: Item },
    /// The offer was active and is gone; carries the last known item
    Removed { fingerprint: Fingerprint, item: Item },
}

impl Event {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Event::Added { fingerprint, .. } | Event::Removed { fingerprint, .. } => fingerprint,
        }
    }

    pub fn item(&self) -> &Item {
        match self {
            Event::Added { item, .. } | Event::Removed { item, .. } => item,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Event::Added { .. })
    }
}
