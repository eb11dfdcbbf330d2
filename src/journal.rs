// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Local record of publish attempts
//!
//! Answers "which set was published when, in which order, and what did it
//! replace". The remote folders stay the source of truth; nothing reads this
//! journal to decide what is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{JournalConfig, PublishStrategy};
use crate::gestures::PublishOutcome;
use crate::Result;

/// One publish attempt, successful or not
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub gesture_set_id: String,
    pub gesture_set_name: String,
    pub strategy: PublishStrategy,
    /// Name of the active set this publish removed, if any
    pub replaced: Option<String>,
    pub gesture_count: usize,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Which records to return, newest first
#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    pub gesture_set_id: Option<String>,
    pub failed_only: bool,
    pub limit: Option<usize>,
}

impl JournalFilter {
    fn admits(&self, record: &PublishRecord) -> bool {
        let set_matches = self
            .gesture_set_id
            .as_deref()
            .map_or(true, |id| record.gesture_set_id == id);
        set_matches && !(self.failed_only && record.success)
    }
}

/// JSONL file, one record per line, appended in publish order
pub struct PublishJournal {
    path: PathBuf,
}

impl PublishJournal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The configured journal, or `None` when journaling is switched off
    pub fn from_config(config: &JournalConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.path.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write down the result of publishing `gesture_set_id`
    pub fn record(
        &self,
        gesture_set_id: &str,
        strategy: PublishStrategy,
        outcome: &PublishOutcome,
    ) -> Result<PublishRecord> {
        let record = PublishRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            gesture_set_id: gesture_set_id.to_string(),
            gesture_set_name: outcome.new_set_name.clone(),
            strategy,
            replaced: outcome.old_set_name.clone(),
            gesture_count: outcome.gesture_count,
            success: outcome.success,
            error: outcome.error.clone(),
        };

        let line = serde_json::to_string(&record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        debug!("Journaled publish of {} to {:?}", record.gesture_set_name, self.path);

        Ok(record)
    }

    /// `record`, logging instead of failing. A publish that already happened
    /// on Drive is not undone by a journal write error.
    pub fn record_or_warn(&self, gesture_set_id: &str, strategy: PublishStrategy, outcome: &PublishOutcome) {
        if let Err(e) = self.record(gesture_set_id, strategy, outcome) {
            warn!("Could not write publish journal {:?}: {}", self.path, e);
        }
    }

    /// Every readable record in publish order. A missing file is an empty
    /// journal; corrupt lines are skipped.
    fn load(&self) -> Result<Vec<PublishRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping journal line {} in {:?}: {}", n + 1, self.path, e);
                    None
                }
            })
            .collect())
    }

    /// Records matching `filter`, newest first
    pub fn query(&self, filter: &JournalFilter) -> Result<Vec<PublishRecord>> {
        let matching = self.load()?.into_iter().rev().filter(|r| filter.admits(r));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    /// The latest publish that reported success
    pub fn last_published(&self) -> Result<Option<PublishRecord>> {
        Ok(self.load()?.into_iter().rev().find(|r| r.success))
    }

    /// Drop the journal file, returning how many records it held
    pub fn clear(&self) -> Result<usize> {
        let count = self.load()?.len();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome(name: &str, replaced: Option<&str>, success: bool) -> PublishOutcome {
        PublishOutcome {
            success,
            old_set_moved: replaced.is_some(),
            new_set_moved: success,
            old_set_name: replaced.map(str::to_string),
            new_set_name: name.to_string(),
            gesture_count: 7,
            error: (!success).then(|| "copy failed".to_string()),
        }
    }

    fn journal_in(dir: &TempDir) -> PublishJournal {
        PublishJournal::new(dir.path().join("journal.jsonl"))
    }

    #[test]
    fn test_query_by_set_newest_first() {
        let dir = TempDir::new().unwrap();
        let journal = journal_in(&dir);
        let strategy = PublishStrategy::DeleteThenCopy;

        journal.record("id-a", strategy, &outcome("Alpha", None, true)).unwrap();
        journal.record("id-b", strategy, &outcome("Beta", Some("Alpha"), true)).unwrap();
        journal.record("id-a", strategy, &outcome("Alpha", Some("Beta"), true)).unwrap();

        let filter = JournalFilter {
            gesture_set_id: Some("id-a".to_string()),
            ..JournalFilter::default()
        };
        let alpha = journal.query(&filter).unwrap();

        assert_eq!(alpha.len(), 2);
        assert_eq!(alpha[0].replaced.as_deref(), Some("Beta"));
        assert_eq!(alpha[1].replaced, None);
    }

    #[test]
    fn test_failed_only_and_limit() {
        let dir = TempDir::new().unwrap();
        let journal = journal_in(&dir);
        let strategy = PublishStrategy::CopyThenDelete;

        journal.record("id-a", strategy, &outcome("Alpha", None, false)).unwrap();
        journal.record("id-b", strategy, &outcome("Beta", None, false)).unwrap();
        journal.record("id-c", strategy, &outcome("Gamma", None, true)).unwrap();

        let failed = journal
            .query(&JournalFilter {
                failed_only: true,
                limit: Some(1),
                ..JournalFilter::default()
            })
            .unwrap();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].gesture_set_name, "Beta");
        assert_eq!(failed[0].strategy, PublishStrategy::CopyThenDelete);
        assert_eq!(failed[0].error.as_deref(), Some("copy failed"));
    }

    #[test]
    fn test_last_published_skips_failures() {
        let dir = TempDir::new().unwrap();
        let journal = journal_in(&dir);
        let strategy = PublishStrategy::DeleteThenCopy;

        assert!(journal.last_published().unwrap().is_none());

        journal.record("id-a", strategy, &outcome("Alpha", None, true)).unwrap();
        journal.record("id-b", strategy, &outcome("Beta", Some("Alpha"), false)).unwrap();

        let last = journal.last_published().unwrap().unwrap();
        assert_eq!(last.gesture_set_id, "id-a");
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let journal = journal_in(&dir);
        journal
            .record("id-a", PublishStrategy::DeleteThenCopy, &outcome("Alpha", None, true))
            .unwrap();
        OpenOptions::new()
            .append(true)
            .open(journal.path())
            .unwrap()
            .write_all(b"not json\n\n")
            .unwrap();

        assert_eq!(journal.query(&JournalFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_reports_removed_records() {
        let dir = TempDir::new().unwrap();
        let journal = journal_in(&dir);
        assert_eq!(journal.clear().unwrap(), 0);

        journal
            .record("id-a", PublishStrategy::DeleteThenCopy, &outcome("Alpha", None, true))
            .unwrap();
        assert_eq!(journal.clear().unwrap(), 1);
        assert!(!journal.path().exists());
    }

    #[test]
    fn test_disabled_config_has_no_journal() {
        let config = JournalConfig {
            enabled: false,
            ..JournalConfig::default()
        };
        assert!(PublishJournal::from_config(&config).is_none());
    }
}
