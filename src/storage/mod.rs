//! Storage abstractions for history persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! {workdir}/
//! ├── superquote_history.json   # fingerprint -> last known offer + active flag
//! └── diagnostics/              # page captures taken on cycle failures
//!     └── error_1767261600.html
//! ```

pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::HistoryStore;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Load the persisted history.
    ///
    /// A missing document yields an empty store. An undecodable one is
    /// logged and also yields an empty store.
    async fn load_history(&self) -> HistoryStore;

    /// Replace the persisted history with `history`.
    ///
    /// Implementations must not leave a partially written document behind.
    async fn persist_history(&self, history: &HistoryStore) -> Result<()>;

    /// Store a diagnostic capture and return where it went.
    async fn write_diagnostic(&self, bytes: &[u8]) -> Result<PathBuf>;
}
