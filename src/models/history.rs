//! Durable record of every offer ever seen.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Fingerprint, Item};

/// Last known state of one fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Last observed item fields
    #[serde(flatten)]
    pub item: Item,

    /// Whether the offer is currently live
    #[serde(default, deserialize_with = "false_if_null")]
    pub active: bool,
}

fn false_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// In-memory history keyed by fingerprint.
///
/// Records are never removed; `upsert` only adds or updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryStore {
    records: BTreeMap<Fingerprint, HistoryRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unseen fingerprint, or overwrite the value fields, active flag
    /// and timestamp of an existing one.
    ///
    /// Identity fields are not touched on update: they are what the fingerprint
    /// was computed from.
    pub fn upsert(&mut self, fingerprint: &Fingerprint, item: &Item, active: bool, now: &str) {
        match self.records.get_mut(fingerprint) {
            Some(record) => {
                record.item.category = item.category.clone();
                record.item.old_value = item.old_value.clone();
                record.item.new_value = item.new_value.clone();
                record.item.observed_at = now.to_string();
                record.active = active;
            }
            None => {
                let mut item = item.clone();
                item.observed_at = now.to_string();
                self.records
                    .insert(fingerprint.clone(), HistoryRecord { item, active });
            }
        }
    }

    /// Items currently flagged active, used to seed the active set on startup.
    ///
    /// Ordered by last update, oldest first, so the active set sees them in the
    /// order they were last observed.
    pub fn active_subset(&self) -> Vec<(Fingerprint, Item)> {
        let mut active: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.active)
            .map(|(fp, record)| (fp.clone(), record.item.clone()))
            .collect();
        active.sort_by(|a, b| a.1.observed_at.cmp(&b.1.observed_at).then(a.0.cmp(&b.0)));
        active
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&HistoryRecord> {
        self.records.get(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.records.values().filter(|r| r.active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &HistoryRecord)> {
        self.records.iter()
    }
}

impl FromIterator<(Fingerprint, HistoryRecord)> for HistoryStore {
    fn from_iter<I: IntoIterator<Item = (Fingerprint, HistoryRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
