// src/models/ledger.rs

//! File tracking ledger (SCD Type 2).
//!
//! Every file identity ever observed gets a row. A row is active while it is
//! the current version of its file; superseded and retired rows are closed
//! with an `end_timestamp` and kept forever.
//!
//! ## Persisted Format
//!
//! ```text
//! file_name,file_timestamp,full_url,start_timestamp,end_timestamp,is_active
//! pr.class,01/03/2025 08:30 AM,https://.../pr.class,2025-01-04 06:00:00,,Y
//! ```

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::RemoteFile;
use super::time::{active_flag, listing_time, optional_run_time, run_time};
use crate::error::{AppError, Result};

/// Column names of the persisted ledger, in order.
pub const LEDGER_COLUMNS: [&str; 6] = [
    "file_name",
    "file_timestamp",
    "full_url",
    "start_timestamp",
    "end_timestamp",
    "is_active",
];

/// One version of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub file_name: String,

    #[serde(with = "listing_time")]
    pub file_timestamp: NaiveDateTime,

    pub full_url: String,

    /// Run time at which this version became active
    #[serde(with = "run_time")]
    pub start_timestamp: NaiveDateTime,

    /// Run time at which this version stopped being active
    #[serde(with = "optional_run_time")]
    pub end_timestamp: Option<NaiveDateTime>,

    #[serde(with = "active_flag")]
    pub is_active: bool,
}

impl LedgerEntry {
    /// New active version of `file`, starting at `now`.
    pub fn activate(file: &RemoteFile, now: NaiveDateTime) -> Self {
        Self {
            file_name: file.file_name.clone(),
            file_timestamp: file.file_timestamp,
            full_url: file.full_url.clone(),
            start_timestamp: now,
            end_timestamp: None,
            is_active: true,
        }
    }

    /// Whether the listing still advertises this exact version.
    pub fn matches(&self, file: &RemoteFile) -> bool {
        self.file_timestamp == file.file_timestamp && self.full_url == file.full_url
    }

    /// Close this version at `now`.
    pub(crate) fn retire(&mut self, now: NaiveDateTime) {
        self.is_active = false;
        self.end_timestamp = Some(now);
    }

    /// Undo a `retire` made earlier in the same run.
    pub(crate) fn reopen(&mut self) {
        self.is_active = true;
        self.end_timestamp = None;
    }
}

/// The full ledger table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Build a ledger, checking its invariants.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Result<Self> {
        let ledger = Self { entries };
        ledger.validate()?;
        Ok(ledger)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active entries, in ledger order.
    pub fn active(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| e.is_active)
    }

    /// The active entry for `file_name`, if any.
    pub fn active_entry(&self, file_name: &str) -> Option<&LedgerEntry> {
        self.active().find(|e| e.file_name == file_name)
    }

    /// Map of file name to the position of its active row.
    pub(crate) fn active_positions(&self) -> HashMap<String, usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_active)
            .map(|(i, e)| (e.file_name.clone(), i))
            .collect()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<LedgerEntry> {
        &mut self.entries
    }

    /// Check the current-version and end-timestamp invariants.
    pub fn validate(&self) -> Result<()> {
        let mut active_names = HashSet::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.file_name.trim().is_empty() {
                return Err(AppError::malformed_ledger(format!(
                    "row {} has an empty file_name",
                    i + 1
                )));
            }
            if entry.is_active == entry.end_timestamp.is_some() {
                return Err(AppError::malformed_ledger(format!(
                    "row {} ({}): end_timestamp must be set exactly when the row is inactive",
                    i + 1,
                    entry.file_name
                )));
            }
            if entry.is_active && !active_names.insert(entry.file_name.as_str()) {
                return Err(AppError::malformed_ledger(format!(
                    "more than one active row for '{}'",
                    entry.file_name
                )));
            }
        }
        Ok(())
    }

    /// Parse a persisted ledger.
    ///
    /// Missing columns, unparseable rows and invariant violations are all
    /// reported as [`AppError::MalformedLedger`].
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| AppError::malformed_ledger(format!("unreadable header: {e}")))?
            .clone();
        for column in LEDGER_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(AppError::malformed_ledger(format!(
                    "missing required column '{column}'"
                )));
            }
        }

        let mut entries = Vec::new();
        for (i, row) in reader.deserialize::<LedgerEntry>().enumerate() {
            // +2: one for the header, one for 1-based numbering
            let entry =
                row.map_err(|e| AppError::malformed_ledger(format!("line {}: {e}", i + 2)))?;
            entries.push(entry);
        }

        Self::from_entries(entries)
    }

    /// Serialize to CSV, header included even when empty.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(LEDGER_COLUMNS)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }
}
