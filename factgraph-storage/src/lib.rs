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

//! Factgraph Storage Layer
//!
//! A mutable set of subject-predicate-object facts kept in two synchronized
//! stores:
//!
//! - [`FactCache`] — an in-process directed multigraph mirroring active
//!   facts, the read fast path and the only store usable when the backend is
//!   down.
//! - a durable graph database behind the [`GraphBackend`] trait — entities
//!   as nodes, facts as attributed relationships; source of truth when
//!   reachable.
//!
//! [`FactStore`] orchestrates the dual-write protocol across the two, keeps
//! the append-only journals ([`UpdateHistoryLog`], [`OperationLog`]), and
//! merges query results by triple identity. [`Synchronizer`] warms the cache
//! from the backend at startup and repairs divergence on demand.

pub mod backend;
pub mod cache;
pub mod fuzzy;
pub mod journal;
pub mod store;
pub mod sync;

pub use backend::{GraphBackend, HttpGraphBackend, MemoryBackend};
pub use cache::FactCache;
pub use journal::{HistoryRecord, Operation, OperationLog, OperationRecord, UpdateHistoryLog};
pub use store::{FactStore, TimelineEntry};
pub use sync::{SyncReport, Synchronizer};
