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

//! Durable graph backend.
//!
//! [`GraphBackend`] abstracts the durable store so the orchestrator can be
//! exercised against [`MemoryBackend`] in tests and offline development,
//! while production runs against [`HttpGraphBackend`] speaking the graph
//! database's HTTP transaction API.

mod http;
mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use factgraph_core::{Fact, Result};

pub use http::HttpGraphBackend;
pub use memory::MemoryBackend;

/// Durable graph storage: entities as nodes, facts as directed attributed
/// relationships.
///
/// Every method is bounded by the configured backend timeout; transport
/// failures and timeouts surface as `BackendUnavailable`, unexpected results
/// (e.g. zero affected relationships on an expected match) as `WriteFailed`
/// or a zero affected-count, which the caller interprets.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Cheap reachability probe.
    async fn ping(&self) -> Result<()>;

    /// Number of active relationships matching the exact triple.
    async fn count_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64>;

    /// Create the relationship for a new fact, merging endpoint entity nodes
    /// into existence.
    async fn create_fact(&self, fact: &Fact) -> Result<()>;

    /// Replace the relationship matching (subject, old_predicate, object) and
    /// the successor's id with the successor state. Returns the number of
    /// relationships created (zero means the stores have diverged).
    async fn replace_fact(&self, old_predicate: &str, successor: &Fact) -> Result<u64>;

    /// Delete the relationship matching the triple. Returns the number of
    /// relationships deleted.
    async fn delete_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64>;

    /// Wipe all nodes and relationships.
    async fn clear(&self) -> Result<()>;

    /// One page of facts for the synchronizer.
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Vec<Fact>>;

    /// Facts whose subject equals `entity`, descending version order.
    async fn facts_by_subject(&self, entity: &str) -> Result<Vec<Fact>>;

    /// Facts carrying `predicate`, descending version order.
    async fn facts_by_predicate(&self, predicate: &str) -> Result<Vec<Fact>>;

    /// Facts whose object equals `entity`, descending version order.
    async fn facts_by_object(&self, entity: &str) -> Result<Vec<Fact>>;

    /// Every fact, descending version order.
    async fn all_facts(&self) -> Result<Vec<Fact>>;

    /// The fact between two endpoints carrying `id`, if present.
    async fn find_by_id(&self, subject: &str, object: &str, id: Uuid) -> Result<Option<Fact>>;
}
