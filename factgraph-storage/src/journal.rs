// Copyright 2025 Factgraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Durable append-only journals.
//!
//! Two JSONL files, one record per line, flushed synchronously before the
//! triggering operation reports success:
//!
//! - `update_history.jsonl` — every predicate transition a fact has gone
//!   through, keyed by id + subject + object. Read back by the timeline
//!   query; truncated by delete-all.
//! - `operation_log.jsonl` — audit record of every mutation. Write-only;
//!   delete-all appends its own record instead of truncating, so the wipe is
//!   itself the final audit row.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use factgraph_core::{Fact, Result};

pub const UPDATE_HISTORY_FILE: &str = "update_history.jsonl";
pub const OPERATION_LOG_FILE: &str = "operation_log.jsonl";

/// One predicate transition: the pre-update snapshot plus the state it was
/// updated to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub subject: String,
    pub old_predicate: String,
    pub object: String,
    pub id: Uuid,
    pub old_created_at: DateTime<Utc>,
    pub old_src: String,
    pub old_original_message: Option<String>,
    pub old_version: u32,
    pub updated_to: UpdatedState,
    pub timestamp: DateTime<Utc>,
}

/// The post-update side of a history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedState {
    pub new_predicate: String,
    pub new_object: String,
    pub id: Uuid,
    pub new_created_at: DateTime<Utc>,
    pub new_src: String,
    pub new_original_message: Option<String>,
    pub new_version: u32,
}

impl HistoryRecord {
    /// Snapshot the transition from `old` to `new`. Identity fields must
    /// already agree; this is a recording step, not a validation step.
    pub fn transition(old: &Fact, new: &Fact) -> Self {
        Self {
            subject: old.subject.clone(),
            old_predicate: old.predicate.clone(),
            object: old.object.clone(),
            id: old.id,
            old_created_at: old.created_at,
            old_src: old.source.clone(),
            old_original_message: old.original_message.clone(),
            old_version: old.version,
            updated_to: UpdatedState {
                new_predicate: new.predicate.clone(),
                new_object: new.object.clone(),
                id: new.id,
                new_created_at: new.created_at,
                new_src: new.source.clone(),
                new_original_message: new.original_message.clone(),
                new_version: new.version,
            },
            timestamp: new.created_at,
        }
    }
}

/// Append-only journal of predicate transitions.
#[derive(Debug)]
pub struct UpdateHistoryLog {
    path: PathBuf,
    // Serializes appends and the delete-all truncation.
    write_lock: Mutex<()>,
}

impl UpdateHistoryLog {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        Ok(Self {
            path: data_dir.as_ref().join(UPDATE_HISTORY_FILE),
            write_lock: Mutex::new(()),
        })
    }

    /// Append one record and flush before returning.
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Scan for every transition matching id, subject, and object. Undecodable
    /// lines are skipped with a warning rather than failing the scan.
    pub fn read_for(&self, subject: &str, object: &str, id: Uuid) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => {
                    if record.id == id && record.subject == subject && record.object == object {
                        records.push(record);
                    }
                }
                Err(e) => {
                    tracing::warn!("skipping undecodable history line: {}", e);
                }
            }
        }
        Ok(records)
    }

    /// Drop all history. Called by delete-all.
    pub fn truncate(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        File::create(&self.path)?;
        Ok(())
    }
}

/// Mutation kinds recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Update,
    Delete,
    DeleteAll,
}

/// One audit record: what happened, to what, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: Operation,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit journal of mutations. Write-only from the store's
/// perspective.
#[derive(Debug)]
pub struct OperationLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OperationLog {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        Ok(Self {
            path: data_dir.as_ref().join(OPERATION_LOG_FILE),
            write_lock: Mutex::new(()),
        })
    }

    /// Append one audit record and flush before returning.
    pub fn append(&self, operation: Operation, details: Value) -> Result<()> {
        let record = OperationRecord {
            operation,
            details,
            timestamp: Utc::now(),
        };
        let line = serde_json::to_string(&record)?;
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        tracing::debug!(operation = ?record.operation, "logged operation");
        Ok(())
    }
}
