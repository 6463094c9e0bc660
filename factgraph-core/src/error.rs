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

//! Error taxonomy for the fact store.
//!
//! Validation errors are raised before any mutation happens. `Conflict` and
//! `NoOp` are expected steady-state outcomes for ingest pipelines and
//! repeated updates, not faults; `WriteFailed` and `NotFound` on the backend
//! leg of an update/delete signal cache/backend divergence that is surfaced
//! to the caller rather than silently repaired.

use thiserror::Error;

/// Result alias used throughout factgraph.
pub type Result<T> = std::result::Result<T, FactStoreError>;

#[derive(Debug, Error)]
pub enum FactStoreError {
    /// An active fact with the same (subject, predicate, object) already
    /// exists in one of the stores.
    #[error("fact ({subject} {predicate} {object}) already exists")]
    Conflict {
        subject: String,
        predicate: String,
        object: String,
    },

    /// The referenced triple is not active in the store that was consulted.
    #[error("fact ({subject} {predicate} {object}) not found")]
    NotFound {
        subject: String,
        predicate: String,
        object: String,
    },

    /// Update requested with an unchanged predicate. No mutation occurred;
    /// callers need not treat this as fatal.
    #[error("new predicate equals old predicate, nothing to update")]
    NoOp,

    /// A required field was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The durable backend is unreachable or the call timed out.
    #[error("graph backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend accepted the request but reported an unexpected result,
    /// e.g. zero affected relationships where a match was expected.
    #[error("backend write failed: {0}")]
    WriteFailed(String),

    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FactStoreError {
    /// Duplicate-add outcome; bulk importers treat this as already-imported.
    pub fn is_conflict(&self) -> bool {
        matches!(self, FactStoreError::Conflict { .. })
    }

    /// Backend unreachable or timed out; queries degrade to cache-only.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FactStoreError::BackendUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FactStoreError::NotFound { .. })
    }

    pub fn conflict(subject: &str, predicate: &str, object: &str) -> Self {
        FactStoreError::Conflict {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        }
    }

    pub fn not_found(subject: &str, predicate: &str, object: &str) -> Self {
        FactStoreError::NotFound {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        }
    }
}
