use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::identity::ContentIdentity;

/// Saved positions older than this are dropped by the startup sweep.
pub const RETENTION_DAYS: i64 = 30;

pub fn retention_window() -> TimeDelta {
    TimeDelta::days(RETENTION_DAYS)
}

/// Which of the two time readouts the player UI was showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Elapsed,
    Remaining,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Elapsed => Self::Remaining,
            Self::Remaining => Self::Elapsed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Elapsed => "elapsed",
            Self::Remaining => "remaining",
        }
    }
}

/// Transport state saved for one piece of content.
///
/// Field names are the stored JSON contract; `timeIndicator` is optional so
/// records written before the field existed still parse. `title` and `path`
/// are display hints only, never part of the identity: the file may have been
/// renamed or moved since the record was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRecord {
    #[serde(rename = "timer")]
    pub position_seconds: f64,
    #[serde(rename = "playbackRate")]
    pub playback_rate: f64,
    #[serde(rename = "last_opened")]
    pub last_opened_at_ms: i64,
    #[serde(rename = "timeIndicator", default)]
    pub display_mode: DisplayMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum LoadError {
    /// No record under the key. Callers play from the beginning.
    NotFound,
    /// Stored data did not parse. Callers treat this as `NotFound` and should
    /// delete the entry so it cannot accumulate.
    Corrupt(serde_json::Error),
    Backend(anyhow::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no saved playback state"),
            Self::Corrupt(err) => write!(f, "saved playback state is unreadable: {err}"),
            Self::Backend(err) => write!(f, "saved playback state backend failed: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound => None,
            Self::Corrupt(err) => Some(err),
            Self::Backend(err) => Some(err.as_ref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedEntry {
    pub identity: ContentIdentity,
    pub record: PlaybackRecord,
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub removed: usize,
    pub warnings: Vec<String>,
}

/// Durable save/load/delete of playback records keyed by content identity.
/// Sole owner of the backend: no other code touches the database.
pub struct StateStore {
    db: Database,
}

impl StateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn has(&self, key: &ContentIdentity) -> Result<bool> {
        Ok(self.db.get(key.as_str())?.is_some())
    }

    pub fn save(&self, key: &ContentIdentity, record: &PlaybackRecord) -> Result<()> {
        let raw = serde_json::to_string(record).context("failed to serialize playback record")?;
        self.db.set(key.as_str(), &raw)
    }

    pub fn load(&self, key: &ContentIdentity) -> Result<PlaybackRecord, LoadError> {
        let raw = self
            .db
            .get(key.as_str())
            .map_err(LoadError::Backend)?
            .ok_or(LoadError::NotFound)?;
        serde_json::from_str(&raw).map_err(LoadError::Corrupt)
    }

    /// Removing an absent key is a no-op, not an error.
    pub fn delete(&self, key: &ContentIdentity) -> Result<bool> {
        self.db.remove(key.as_str())
    }

    /// Drops every record whose `last_opened` is older than `now - retention`.
    /// Entries that fail to parse are dropped too, otherwise dead keys would
    /// pile up with nothing left to ever remove them. One bad entry never
    /// stops the sweep from finishing the rest.
    pub fn sweep_expired(&self, now: DateTime<Utc>, retention: TimeDelta) -> Result<SweepOutcome> {
        let cutoff_ms = (now - retention).timestamp_millis();
        let mut outcome = SweepOutcome::default();

        for key in self.db.keys()? {
            let raw = match self.db.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    outcome.warnings.push(format!("could not read entry {key}: {err}"));
                    continue;
                }
            };

            let expired = match serde_json::from_str::<PlaybackRecord>(&raw) {
                Ok(record) => record.last_opened_at_ms < cutoff_ms,
                Err(err) => {
                    outcome
                        .warnings
                        .push(format!("dropping unreadable entry {key}: {err}"));
                    true
                }
            };
            if !expired {
                continue;
            }

            match self.db.remove(&key) {
                Ok(true) => outcome.removed += 1,
                Ok(false) => {}
                Err(err) => {
                    outcome.warnings.push(format!("could not remove entry {key}: {err}"));
                }
            }
        }

        Ok(outcome)
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &Database {
        &self.db
    }

    /// All parseable records, most recently opened first.
    pub fn list(&self) -> Result<Vec<SavedEntry>> {
        let mut entries = Vec::new();
        for key in self.db.keys()? {
            let Some(raw) = self.db.get(&key)? else {
                continue;
            };
            let Ok(record) = serde_json::from_str::<PlaybackRecord>(&raw) else {
                // Left for the next sweep to clean up.
                continue;
            };
            entries.push(SavedEntry {
                identity: ContentIdentity::from_stored_key(key),
                record,
            });
        }
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.record.last_opened_at_ms));
        Ok(entries)
    }
}
