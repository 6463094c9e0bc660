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

//! The versioned fact triple.
//!
//! A [`Fact`] is a single subject-predicate-object statement with a stable
//! identity (`id`), a monotonically increasing `version`, and provenance
//! metadata. Entities (subjects and objects) have no standalone records; they
//! exist only as endpoints of facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FactStoreError, Result};

/// Provenance tag for facts entered by hand.
pub const SOURCE_MANUAL: &str = "manual";
/// Provenance tag for facts extracted from conversation.
pub const SOURCE_CONVERSATION: &str = "conversation";
/// Provenance tag used by bulk ingest pipelines.
pub const SOURCE_BULK_IMPORT: &str = "bulk-import";

/// A single subject-predicate-object fact with identity, version, and
/// provenance.
///
/// The `id` is assigned once at creation and survives predicate updates;
/// deleting a fact retires its id permanently. `created_at` records the most
/// recent write (creation or update), not the original creation time — the
/// original creation time of an updated fact is recoverable from the update
/// history journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: Uuid,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Starts at 1, incremented by exactly 1 per successful update.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub source: String,
    /// Free-text provenance snippet; absent for manually entered facts.
    pub original_message: Option<String>,
}

impl Fact {
    /// Create a version-1 fact with a fresh id and current timestamp.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        source: impl Into<String>,
        original_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            version: 1,
            created_at: Utc::now(),
            source: source.into(),
            original_message,
        }
    }

    /// The successor state after a predicate update: same id, subject, and
    /// object, version + 1, fresh timestamp and provenance.
    pub fn with_predicate(
        &self,
        new_predicate: impl Into<String>,
        source: impl Into<String>,
        original_message: Option<String>,
    ) -> Self {
        Self {
            id: self.id,
            subject: self.subject.clone(),
            predicate: new_predicate.into(),
            object: self.object.clone(),
            version: self.version + 1,
            created_at: Utc::now(),
            source: source.into(),
            original_message,
        }
    }

    /// The (subject, predicate, object) value identity of this fact, distinct
    /// from its persistent id.
    pub fn triple(&self) -> TripleKey {
        TripleKey::new(&self.subject, &self.predicate, &self.object)
    }
}

/// The (subject, predicate, object) value of a fact, used as merge identity
/// when combining backend and cache query results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleKey {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl TripleKey {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl std::fmt::Display for TripleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// Reject empty components before any mutation is attempted.
pub fn validate_triple(subject: &str, predicate: &str, object: &str) -> Result<()> {
    if subject.trim().is_empty() {
        return Err(FactStoreError::InvalidArgument("subject must be non-empty"));
    }
    if predicate.trim().is_empty() {
        return Err(FactStoreError::InvalidArgument(
            "predicate must be non-empty",
        ));
    }
    if object.trim().is_empty() {
        return Err(FactStoreError::InvalidArgument("object must be non-empty"));
    }
    Ok(())
}
