//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{HistoryStore, Item};
use crate::pipeline::Clock;
use crate::services::{Acquisition, HealthProbe, Ledger, Notifier};
use crate::storage::HistoryStorage;

/// Records every delivery; targets listed in `failing` reject theirs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    failing: Vec<String>,
}

impl RecordingNotifier {
    pub fn failing_for(targets: &[&str]) -> Self {
        Self {
            failing: targets.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Successful deliveries as `(target, message)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|t| t == target) {
            return Err(AppError::notification(target, "rejected"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingLedger {
    rows: Arc<Mutex<Vec<Item>>>,
}

impl RecordingLedger {
    pub fn appended(&self) -> Vec<Item> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn append(&self, item: &Item) -> Result<()> {
        self.rows.lock().unwrap().push(item.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountingProbe {
    pings: Arc<AtomicUsize>,
    failing: bool,
}

impl CountingProbe {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for CountingProbe {
    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(AppError::acquisition("heartbeat unreachable"));
        }
        Ok(())
    }
}

/// Clock that returns immediately and remembers what it was asked to sleep.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    persisted: Option<HistoryStore>,
    diagnostics: Vec<Vec<u8>>,
}

/// History storage kept in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
    fail_persist: bool,
}

impl MemoryStorage {
    /// Storage whose writes always fail.
    pub fn failing() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn persisted(&self) -> Option<HistoryStore> {
        self.inner.lock().unwrap().persisted.clone()
    }

    pub fn diagnostics(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().diagnostics.clone()
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn load_history(&self) -> HistoryStore {
        self.persisted().unwrap_or_default()
    }

    async fn persist_history(&self, history: &HistoryStore) -> Result<()> {
        if self.fail_persist {
            return Err(AppError::persistence("disk full"));
        }
        self.inner.lock().unwrap().persisted = Some(history.clone());
        Ok(())
    }

    async fn write_diagnostic(&self, bytes: &[u8]) -> Result<PathBuf> {
        let mut inner = self.inner.lock().unwrap();
        inner.diagnostics.push(bytes.to_vec());
        Ok(PathBuf::from(format!("memory/error_{}.html", inner.diagnostics.len())))
    }
}

/// Acquisition that replays scripted outcomes.
///
/// Unscripted initializations succeed. Once the last scripted fetch has been
/// handed out, the optional stop sender is triggered; further fetches return
/// no offers.
#[derive(Debug, Default)]
pub struct ScriptedAcquisition {
    init_results: VecDeque<Result<()>>,
    fetch_results: VecDeque<Result<Vec<Item>>>,
    capture: Option<Vec<u8>>,
    stop: Option<watch::Sender<bool>>,
    init_calls: u32,
    release_calls: u32,
}

impl ScriptedAcquisition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop(mut self, stop: watch::Sender<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_capture(mut self, bytes: &[u8]) -> Self {
        self.capture = Some(bytes.to_vec());
        self
    }

    pub fn init_result(mut self, result: Result<()>) -> Self {
        self.init_results.push_back(result);
        self
    }

    pub fn init_errs(mut self, messages: &[&str]) -> Self {
        for message in messages {
            self.init_results
                .push_back(Err(AppError::acquisition(*message)));
        }
        self
    }

    pub fn fetch_ok(mut self, items: Vec<Item>) -> Self {
        self.fetch_results.push_back(Ok(items));
        self
    }

    pub fn fetch_err(self, message: &str) -> Self {
        self.fetch_errs(&[message])
    }

    pub fn fetch_errs(mut self, messages: &[&str]) -> Self {
        for message in messages {
            self.fetch_results
                .push_back(Err(AppError::acquisition(*message)));
        }
        self
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls
    }

    pub fn release_calls(&self) -> u32 {
        self.release_calls
    }
}

#[async_trait]
impl Acquisition for ScriptedAcquisition {
    async fn initialize(&mut self) -> Result<()> {
        self.init_calls += 1;
        self.init_results.pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_candidates(&mut self) -> Result<Vec<Item>> {
        let result = self.fetch_results.pop_front().unwrap_or(Ok(Vec::new()));
        if self.fetch_results.is_empty() {
            if let Some(stop) = &self.stop {
                stop.send_replace(true);
            }
        }
        result
    }

    async fn release(&mut self) {
        self.release_calls += 1;
    }

    async fn capture_diagnostics(&mut self) -> Option<Vec<u8>> {
        self.capture.clone()
    }
}
