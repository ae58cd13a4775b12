//! Service layer: the collaborators a cycle talks to.
//!
//! Each collaborator is a narrow trait so the monitor and supervisor can be
//! driven by substitutes in tests:
//! - Offer acquisition (`Acquisition`, implemented by `HtmlAcquisition`)
//! - Notification delivery (`Notifier`, implemented by `TelegramNotifier`)
//! - Spreadsheet ledger (`Ledger`)
//! - Heartbeat (`HealthProbe`, implemented by `HttpHealthProbe`)

mod health;
mod ledger;
mod notify;
mod source;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Item;

pub use health::HttpHealthProbe;
pub use ledger::{ledger_row, open_ledger};
pub use notify::{DispatchReport, Dispatcher, TelegramNotifier};
pub use source::HtmlAcquisition;

/// Source of offer candidates, owning a resource that can break as a whole.
#[async_trait]
pub trait Acquisition: Send {
    /// Acquire the underlying resource.
    async fn initialize(&mut self) -> Result<()>;

    /// Fetch this poll's offers.
    ///
    /// Offers lacking a subject or market are dropped here, never returned.
    async fn fetch_candidates(&mut self) -> Result<Vec<Item>>;

    /// Dispose of the resource. Must be safe to call when not initialized.
    async fn release(&mut self);

    /// Point-in-time capture of the source, for offline diagnosis.
    async fn capture_diagnostics(&mut self) -> Option<Vec<u8>> {
        None
    }
}

/// Delivers one message to one target.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target: &str, message: &str) -> Result<()>;
}

/// Append-only record of newly seen offers.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn append(&self, item: &Item) -> Result<()>;
}

/// Liveness ping sent after each successful cycle.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
