// src/pipeline/cycle.rs

//! One poll → reconcile → notify → persist cycle.

use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Event, Fingerprint, HistoryStore, Item, timestamp_now};
use crate::pipeline::{ActiveSet, DiffSummary, FingerprintGenerator};
use crate::services::{Acquisition, Dispatcher, HealthProbe, Ledger};
use crate::storage::HistoryStorage;

/// Mutable state owned by the monitor: the live offers and everything seen.
#[derive(Debug, Clone)]
pub struct State {
    pub active: ActiveSet,
    pub history: HistoryStore,
}

impl State {
    /// Rebuild the active set from the history's active subset.
    pub fn from_history(generator: FingerprintGenerator, history: HistoryStore) -> Self {
        let active = ActiveSet::seeded(generator, history.active_subset());
        Self { active, history }
    }
}

/// Read-only view of the monitor state for outside readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub active: Vec<Fingerprint>,
    pub history_count: usize,
    pub last_cycle: Option<String>,
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Offers returned by acquisition and accepted for reconciliation
    pub candidates: usize,
    pub summary: DiffSummary,
    /// Failed deliveries across all events
    pub delivery_failures: usize,
    /// Whether the history write succeeded
    pub persisted: bool,
}

/// Cycle scheduler body: owns the state and the collaborators a cycle uses.
pub struct Monitor {
    state: State,
    dispatcher: Dispatcher,
    storage: Box<dyn HistoryStorage>,
    ledger: Option<Box<dyn Ledger>>,
    health: Option<Box<dyn HealthProbe>>,
    last_cycle: Option<String>,
}

impl Monitor {
    /// Load history from storage and seed the active set from it.
    pub async fn start(
        generator: FingerprintGenerator,
        dispatcher: Dispatcher,
        storage: Box<dyn HistoryStorage>,
    ) -> Self {
        let history = storage.load_history().await;
        let state = State::from_history(generator, history);
        log::info!(
            "Monitor starting with {} active offers ({} known)",
            state.active.len(),
            state.history.len()
        );

        Self {
            state,
            dispatcher,
            storage,
            ledger: None,
            health: None,
            last_cycle: None,
        }
    }

    pub fn with_ledger(mut self, ledger: Option<Box<dyn Ledger>>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_health_probe(mut self, health: Option<Box<dyn HealthProbe>>) -> Self {
        self.health = health;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            active: self.state.active.fingerprints(),
            history_count: self.state.history.len(),
            last_cycle: self.last_cycle.clone(),
        }
    }

    /// Poll once and process the result.
    ///
    /// Only acquisition failures are returned; everything after a successful
    /// fetch is absorbed and logged.
    pub async fn run_cycle(&mut self, acquisition: &mut dyn Acquisition) -> Result<CycleReport> {
        let candidates = acquisition.fetch_candidates().await?;
        Ok(self.process(candidates).await)
    }

    /// Reconcile, notify, record and persist one poll's offers.
    pub async fn process(&mut self, candidates: Vec<Item>) -> CycleReport {
        let now = timestamp_now();

        let observed: Vec<Item> = candidates
            .into_iter()
            .filter(|item| {
                let keep = item.has_identity();
                if !keep {
                    log::warn!("Dropping offer without identity: {:?}", item.subject);
                }
                keep
            })
            .collect();

        let events = self.state.active.reconcile(&observed, &now);
        let summary = DiffSummary::of(&events);

        let mut delivery_failures = 0;
        for event in &events {
            log_event(event);
            let report = self.dispatcher.dispatch(event).await;
            delivery_failures += report.failed.len();

            if let (Event::Added { item, .. }, Some(ledger)) = (event, &self.ledger) {
                match ledger.append(item).await {
                    Ok(()) => log::info!("Ledger updated for {}", item.subject),
                    Err(e) => log::error!("Ledger update failed for {}: {}", item.subject, e),
                }
            }
        }

        self.record_history(&observed, &events, &now);

        let persisted = match self.storage.persist_history(&self.state.history).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save history, will retry next cycle: {}", e);
                false
            }
        };

        if let Some(probe) = &self.health {
            if let Err(e) = probe.ping().await {
                log::debug!("Health ping failed: {}", e);
            }
        }

        self.last_cycle = Some(now);

        CycleReport {
            candidates: observed.len(),
            summary,
            delivery_failures,
            persisted,
        }
    }

    /// Keep the history's active flags in step with the active set.
    fn record_history(&mut self, observed: &[Item], events: &[Event], now: &str) {
        let generator = *self.state.active.generator();
        let history = &mut self.state.history;

        for item in observed {
            history.upsert(&generator.of(item), item, true, now);
        }

        for event in events {
            if let Event::Removed { fingerprint, item } = event {
                let last_known = history
                    .get(fingerprint)
                    .map(|record| record.item.clone())
                    .unwrap_or_else(|| item.clone());
                history.upsert(fingerprint, &last_known, false, now);
            }
        }
    }

    /// Store a diagnostic capture, logging the outcome.
    pub async fn save_diagnostic(&self, bytes: &[u8]) -> Option<PathBuf> {
        match self.storage.write_diagnostic(bytes).await {
            Ok(path) => {
                log::info!("Diagnostic capture saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("Failed to save diagnostic capture: {}", e);
                None
            }
        }
    }
}

fn log_event(event: &Event) {
    let item = event.item();
    match event {
        Event::Added { fingerprint, .. } => log::info!(
            "NEW offer {}: {} / {} ({} -> {})",
            fingerprint.short(),
            item.subject,
            item.market,
            item.old_value,
            item.new_value
        ),
        Event::Removed { fingerprint, .. } => log::info!(
            "Offer REMOVED {}: {} / {}",
            fingerprint.short(),
            item.subject,
            item.market
        ),
    }
}
