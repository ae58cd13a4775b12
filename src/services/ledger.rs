//! Spreadsheet ledger gating and row layout.
//!
//! The spreadsheet client lives outside this crate. This module decides whether
//! a ledger is used for the run and what a row looks like.

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Item, LedgerConfig, LedgerStatus};
use crate::services::Ledger;

/// Number of trailing empty cells kept for manual analysis columns.
const ANALYSIS_COLUMNS: usize = 4;

/// Row appended for a newly seen offer:
/// date, sport, market, details, match, old odds, boosted odds, then blanks.
pub fn ledger_row(item: &Item, date: NaiveDate) -> Vec<String> {
    let mut row = vec![
        date.format("%d/%m/%Y").to_string(),
        item.category.clone(),
        item.market.clone(),
        item.details.clone(),
        item.subject.clone(),
        item.old_value.clone(),
        item.new_value.clone(),
    ];
    row.extend(std::iter::repeat_n(String::new(), ANALYSIS_COLUMNS));
    row
}

/// Open the ledger for this run if it is fully configured.
///
/// Returns `None` when disabled, incomplete, or when `open` fails. A ledger
/// that is not opened here stays off until the process restarts.
pub fn open_ledger<F>(config: &LedgerConfig, open: F) -> Option<Box<dyn Ledger>>
where
    F: FnOnce(&LedgerConfig) -> Result<Box<dyn Ledger>>,
{
    match config.status() {
        LedgerStatus::Disabled => {
            log::info!("Ledger not configured");
            None
        }
        LedgerStatus::Incomplete(missing) => {
            log::warn!("Ledger disabled: missing {}", missing);
            None
        }
        LedgerStatus::Enabled => match open(config) {
            Ok(ledger) => {
                log::info!("Ledger connected (worksheet '{}')", config.worksheet);
                Some(ledger)
            }
            Err(e) => {
                log::error!("Failed to open ledger: {}", e);
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::RecordingLedger;

    fn enabled_config(file: &tempfile::NamedTempFile) -> LedgerConfig {
        LedgerConfig {
            credentials_file: Some(file.path().to_path_buf()),
            spreadsheet_id: Some("sheet-1".into()),
            ..LedgerConfig::default()
        }
    }

    #[test]
    fn test_row_layout() {
        let item = Item {
            category: "Soccer".into(),
            market: "Winner".into(),
            details: "Boost".into(),
            subject: "A vs B".into(),
            old_value: "1,50".into(),
            new_value: "1,80".into(),
            observed_at: "2026-03-04 10:00:00".into(),
        };
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let row = ledger_row(&item, date);

        assert_eq!(row.len(), 11);
        assert_eq!(
            &row[..7],
            &["04/03/2026", "Soccer", "Winner", "Boost", "A vs B", "1,50", "1,80"]
        );
        assert!(row[7..].iter().all(String::is_empty));
    }

    #[test]
    fn test_disabled_never_opens() {
        let ledger = open_ledger(&LedgerConfig::default(), |_| {
            panic!("open must not be called")
        });
        assert!(ledger.is_none());
    }

    #[test]
    fn test_enabled_opens() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let ledger = open_ledger(&enabled_config(&file), |_| {
            Ok(Box::new(RecordingLedger::default()) as Box<dyn Ledger>)
        });
        assert!(ledger.is_some());
    }

    #[test]
    fn test_open_failure_disables() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let ledger = open_ledger(&enabled_config(&file), |_| {
            Err(AppError::config("bad credentials"))
        });
        assert!(ledger.is_none());
    }
}
