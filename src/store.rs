//! # Snapshot Store
//!
//! CSV-backed persistence for the tracked roster, one row per handle. The
//! file format has no set type, so `languages` travels as a JSON array in
//! its column and is rebuilt as a set on read. A missing file is the
//! defined first-run state. Writes land in a temp file first and are
//! renamed into place only after the full merged snapshot serialized, so a
//! run that dies mid-write leaves the previous snapshot intact.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::AppError,
    models::{MergedSnapshot, Snapshot, UserRecord},
};

/// Flat row mirroring the persisted schema. Columns absent from an older
/// file fall back to defaults rather than failing the scan.
#[derive(Serialize, Deserialize)]
struct SnapshotRow {
    handle: String,
    #[serde(rename = "firstName", default)]
    first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(rename = "maxRank", default)]
    max_rank: Option<String>,
    #[serde(rename = "maxRating", default)]
    max_rating: i64,
    #[serde(default)]
    contribution: i64,
    #[serde(default)]
    languages: String,
}

impl From<&UserRecord> for SnapshotRow {
    fn from(record: &UserRecord) -> Self {
        let languages: Vec<&String> = record.languages.iter().collect();

        Self {
            handle: record.handle.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            country: record.country.clone(),
            max_rank: record.max_rank.clone(),
            max_rating: record.max_rating,
            contribution: record.contribution,
            languages: serde_json::to_string(&languages).unwrap(),
        }
    }
}

impl SnapshotRow {
    fn into_record(self) -> UserRecord {
        let languages: BTreeSet<String> = if self.languages.is_empty() {
            BTreeSet::new()
        } else {
            serde_json::from_str(&self.languages).unwrap_or_else(|e| {
                warn!("{}: unreadable languages column, resetting: {e}", self.handle);
                BTreeSet::new()
            })
        };

        UserRecord {
            handle: self.handle,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            country: self.country,
            max_rank: self.max_rank,
            max_rating: self.max_rating,
            contribution: self.contribution,
            languages,
        }
    }
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole table. Rows without a handle are dropped here so
    /// they never reach the diff.
    pub fn scan_all(&self) -> Result<Snapshot, AppError> {
        if !self.path.exists() {
            return Ok(Snapshot::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut snapshot = Snapshot::new();

        for row in reader.deserialize() {
            let row: SnapshotRow = row?;
            if row.handle.is_empty() {
                continue;
            }
            snapshot.insert(row.handle.clone(), row.into_record());
        }

        Ok(snapshot)
    }

    /// Replaces the table with the merged snapshot. Called only after the
    /// full merge is computed, so an interrupted run never half-writes.
    pub fn upsert_batch(&self, merged: &MergedSnapshot) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in merged.values() {
                if record.handle.is_empty() {
                    continue;
                }
                writer.serialize(SnapshotRow::from(record))?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}
