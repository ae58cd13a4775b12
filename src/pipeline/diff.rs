//! Active set and diff calculation for event-driven notifications.
//!
//! Compares one poll's offers against the offers believed live after the
//! previous poll. New fingerprints produce `Added`, vanished ones `Removed`.
//! All `Added` events come first, in acquisition order, followed by
//! `Removed` events in the order the offers originally became active.

use std::collections::{HashMap, HashSet};

use crate::models::{Event, Fingerprint, Item};
use crate::pipeline::FingerprintGenerator;

/// An offer currently believed live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEntry {
    /// Item as first observed
    pub item: Item,
    /// Last poll that still returned this offer
    pub last_seen: String,
    seq: u64,
}

/// Offers believed live, keyed by fingerprint.
///
/// Owned by the monitor and mutated only by `reconcile`.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    entries: HashMap<Fingerprint, ActiveEntry>,
    generator: FingerprintGenerator,
    next_seq: u64,
}

impl ActiveSet {
    /// Create an empty active set.
    pub fn new(generator: FingerprintGenerator) -> Self {
        Self {
            entries: HashMap::new(),
            generator,
            next_seq: 0,
        }
    }

    /// Create an active set seeded from previously persisted live offers.
    pub fn seeded(
        generator: FingerprintGenerator,
        live: impl IntoIterator<Item = (Fingerprint, Item)>,
    ) -> Self {
        let mut set = Self::new(generator);
        for (fingerprint, item) in live {
            let last_seen = item.observed_at.clone();
            set.insert(fingerprint, item, last_seen);
        }
        set
    }

    fn insert(&mut self, fingerprint: Fingerprint, item: Item, now: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            fingerprint,
            ActiveEntry {
                item,
                last_seen: now,
                seq,
            },
        );
    }

    /// Reconcile this poll's items against the active set.
    pub fn reconcile(&mut self, current: &[Item], now: &str) -> Vec<Event> {
        let fingerprinted: Vec<(Fingerprint, Item)> = current
            .iter()
            .map(|item| (self.generator.of(item), item.clone()))
            .collect();
        self.reconcile_fingerprinted(&fingerprinted, now)
    }

    /// Reconcile items with precomputed fingerprints.
    fn reconcile_fingerprinted(
        &mut self,
        current: &[(Fingerprint, Item)],
        now: &str,
    ) -> Vec<Event> {
        let mut seen: HashSet<&Fingerprint> = HashSet::with_capacity(current.len());
        let mut events = Vec::new();

        // Added: in current but not active
        for (fingerprint, item) in current {
            if !seen.insert(fingerprint) {
                continue;
            }
            match self.entries.get_mut(fingerprint) {
                Some(entry) => entry.last_seen = now.to_string(),
                None => {
                    self.insert(fingerprint.clone(), item.clone(), now.to_string());
                    events.push(Event::Added {
                        fingerprint: fingerprint.clone(),
                        item: item.clone(),
                    });
                }
            }
        }

        // Removed: active but not in current
        let mut removed: Vec<(Fingerprint, u64)> = self
            .entries
            .iter()
            .filter(|(fp, _)| !seen.contains(fp))
            .map(|(fp, entry)| (fp.clone(), entry.seq))
            .collect();
        removed.sort_by_key(|(_, seq)| *seq);

        for (fingerprint, _) in removed {
            if let Some(entry) = self.entries.remove(&fingerprint) {
                events.push(Event::Removed {
                    fingerprint,
                    item: entry.item,
                });
            }
        }

        events
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&ActiveEntry> {
        self.entries.get(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fingerprints in activation order.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries.into_iter().map(|(fp, _)| fp.clone()).collect()
    }

    pub fn generator(&self) -> &FingerprintGenerator {
        &self.generator
    }
}

/// Counts of an event batch, for cycle summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn of(events: &[Event]) -> Self {
        let added = events.iter().filter(|e| e.is_added()).count();
        Self {
            added,
            removed: events.len() - added,
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added + self.removed
    }
}
