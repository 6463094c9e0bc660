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

//! Factgraph Core
//!
//! Fundamental types for the fact store: the versioned subject-predicate-object
//! [`Fact`], the error taxonomy, and store configuration.

pub mod config;
pub mod error;
pub mod fact;

pub use config::{BackendConfig, StoreConfig, SyncConfig};
pub use error::{FactStoreError, Result};
pub use fact::{
    validate_triple, Fact, TripleKey, SOURCE_BULK_IMPORT, SOURCE_CONVERSATION, SOURCE_MANUAL,
};
