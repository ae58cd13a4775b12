//! Monitoring pipeline.
//!
//! - `fingerprint`: Stable identity for offers
//! - `diff`: Active-set reconciliation between polls
//! - `cycle`: One poll, reconcile, notify, persist cycle
//! - `supervisor`: Resource lifecycle, backoff and the fatal threshold

pub mod clock;
pub mod cycle;
pub mod diff;
pub mod fingerprint;
pub mod supervisor;

pub use clock::{Clock, TokioClock};
pub use cycle::{CycleReport, Monitor, State, StateSnapshot};
pub use diff::{ActiveEntry, ActiveSet, DiffSummary};
pub use fingerprint::FingerprintGenerator;
pub use supervisor::{RetryPolicy, Supervisor, SupervisorState};
