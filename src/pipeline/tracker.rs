// src/pipeline/tracker.rs

//! SCD Type 2 change tracking.
//!
//! Compares the current remote listing with the persisted ledger and produces
//! the next ledger state, the versions to download and the names to retire.
//!
//! ```text
//! listing:  A@t2  B@t1          ledger before:  A@t1 Y   B@t1 Y   C@t1 Y
//!                               ledger after:   A@t1 N   B@t1 Y   C@t1 N   A@t2 Y
//! additions = [A@t2]   retirements = [C]
//! ```
//!
//! Reconciliation is pure: nothing is written until the caller persists the
//! result, so a crash before persisting is safe to re-run.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::error::{AppError, Result};
use crate::models::{DownloadTask, DuplicatePolicy, Ledger, LedgerEntry, RemoteFile};
use crate::storage::Storage;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Proposed ledger: existing rows, flipped in place where needed, plus appended rows
    pub ledger: Ledger,
    /// Newly active entries, in listing order
    pub additions: Vec<LedgerEntry>,
    /// Names whose active entry was retired because they left the listing
    pub retirements: Vec<String>,
    /// Rows superseded this run, by file name
    superseded: HashMap<String, usize>,
    /// Index of the first row appended this run
    appended_from: usize,
}

impl Reconciliation {
    /// Whether the ledger needs to be rewritten.
    pub fn has_changes(&self) -> bool {
        !self.additions.is_empty() || !self.retirements.is_empty()
    }

    /// One download per addition, stored under `target_directory`.
    pub fn download_tasks(&self, target_directory: &str) -> Vec<DownloadTask> {
        self.additions
            .iter()
            .map(|e| DownloadTask::new(&e.full_url, &e.file_name, target_directory))
            .collect()
    }

    /// Drop the additions whose artifact could not be stored.
    ///
    /// Their appended rows are removed and the rows they superseded are made
    /// active again, so the next run sees the same change and retries it.
    pub fn discard_additions<'a, I>(&mut self, failed: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let failed: HashSet<&str> = failed.into_iter().collect();
        if failed.is_empty() {
            return;
        }

        let appended_from = self.appended_from;
        let entries = self.ledger.entries_mut();
        let mut index = 0;
        entries.retain(|entry| {
            let keep = index < appended_from || !failed.contains(entry.file_name.as_str());
            index += 1;
            keep
        });

        for name in &failed {
            if let Some(position) = self.superseded.remove(*name) {
                entries[position].reopen();
            }
        }

        self.additions
            .retain(|e| !failed.contains(e.file_name.as_str()));
    }
}

/// Diffs listings against the ledger.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    duplicate_policy: DuplicatePolicy,
}

impl ChangeTracker {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self { duplicate_policy }
    }

    /// Reconcile `current` against `existing` (None on the first run).
    pub fn reconcile(
        &self,
        current: &[RemoteFile],
        existing: Option<Ledger>,
        now: NaiveDateTime,
    ) -> Result<Reconciliation> {
        let current = self.deduplicate(current)?;

        let Some(mut ledger) = existing else {
            let additions: Vec<LedgerEntry> = current
                .iter()
                .map(|file| LedgerEntry::activate(file, now))
                .collect();
            log::info!(
                "No existing ledger, tracking {} files from scratch",
                additions.len()
            );
            return Ok(Reconciliation {
                ledger: Ledger::from_entries(additions.clone())?,
                additions,
                retirements: Vec::new(),
                superseded: HashMap::new(),
                appended_from: 0,
            });
        };

        ledger.validate()?;
        let active = ledger.active_positions();
        let appended_from = ledger.len();

        let mut additions = Vec::new();
        let mut superseded = HashMap::new();
        let entries = ledger.entries_mut();

        for file in &current {
            match active.get(&file.file_name) {
                Some(&position) if entries[position].matches(file) => {}
                Some(&position) => {
                    log::info!(
                        "Updated: {} ({} -> {})",
                        file.file_name,
                        entries[position].file_timestamp,
                        file.file_timestamp
                    );
                    entries[position].retire(now);
                    superseded.insert(file.file_name.clone(), position);
                    additions.push(LedgerEntry::activate(file, now));
                }
                None => {
                    log::info!("New: {}", file.file_name);
                    additions.push(LedgerEntry::activate(file, now));
                }
            }
        }

        let listed: HashSet<&str> = current.iter().map(|f| f.file_name.as_str()).collect();
        let mut retired: Vec<(usize, String)> = active
            .into_iter()
            .filter(|(name, _)| !listed.contains(name.as_str()))
            .map(|(name, position)| (position, name))
            .collect();
        retired.sort();

        let mut retirements = Vec::with_capacity(retired.len());
        for (position, name) in retired {
            log::info!("Retired: {}", name);
            entries[position].retire(now);
            retirements.push(name);
        }

        entries.extend(additions.iter().cloned());

        log::info!(
            "Reconciled {} listed files: {} additions, {} retirements",
            current.len(),
            additions.len(),
            retirements.len()
        );

        Ok(Reconciliation {
            ledger,
            additions,
            retirements,
            superseded,
            appended_from,
        })
    }

    /// Load the ledger at `ledger_location` and reconcile against it.
    pub async fn reconcile_at(
        &self,
        storage: &Storage,
        ledger_location: &str,
        current: &[RemoteFile],
        now: NaiveDateTime,
    ) -> Result<Reconciliation> {
        let existing = load_ledger(storage, ledger_location).await?;
        self.reconcile(current, existing, now)
    }

    /// Apply the duplicate policy, preserving first-seen order.
    fn deduplicate(&self, current: &[RemoteFile]) -> Result<Vec<RemoteFile>> {
        let mut order: Vec<RemoteFile> = Vec::with_capacity(current.len());
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for file in current {
            match seen.get(file.file_name.as_str()) {
                None => {
                    seen.insert(file.file_name.as_str(), order.len());
                    order.push(file.clone());
                }
                Some(&slot) => {
                    log::warn!("Duplicate listing entry: {}", file.file_name);
                    match self.duplicate_policy {
                        DuplicatePolicy::KeepFirst => {}
                        DuplicatePolicy::KeepLast => order[slot] = file.clone(),
                        DuplicatePolicy::Reject => {
                            return Err(AppError::DuplicateListingEntry(file.file_name.clone()));
                        }
                    }
                }
            }
        }

        Ok(order)
    }
}

/// Read the ledger at `location`; `None` if nothing is there yet.
pub async fn load_ledger(storage: &Storage, location: &str) -> Result<Option<Ledger>> {
    match storage.read_optional(location).await? {
        Some(bytes) => {
            let ledger = Ledger::from_csv(&bytes)?;
            log::info!("Loaded ledger with {} rows from {}", ledger.len(), location);
            Ok(Some(ledger))
        }
        None => Ok(None),
    }
}

/// Replace the ledger at `location`.
pub async fn persist_ledger(storage: &Storage, location: &str, ledger: &Ledger) -> Result<()> {
    let bytes = ledger.to_csv()?;
    storage.write(location, &bytes).await?;
    log::info!("Saved ledger with {} rows to {}", ledger.len(), location);
    Ok(())
}
