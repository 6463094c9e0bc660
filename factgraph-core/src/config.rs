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

//! Configuration for the fact store.
//!
//! All settings are serde-derived and loadable from a TOML file. Defaults
//! match the reference deployment: a local graph database, ten-row sync
//! batches capped at a hundred facts, and a 0.8 fuzzy-match threshold.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FactStoreError, Result};

/// Default bound on every backend call.
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5_000;

/// Default page size for the startup synchronizer.
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 10;

/// Default overall cap on facts pulled during startup sync.
pub const DEFAULT_SYNC_MAX_FACTS: usize = 100;

/// Default similarity threshold for fuzzy queries.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Connection settings for the durable graph backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the graph database's HTTP API.
    pub uri: String,
    pub username: String,
    pub password: String,
    /// Database name within the server.
    pub database: String,
    /// Bounded timeout for every backend call, in milliseconds. On expiry the
    /// operation fails as unavailable rather than hanging.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Pagination settings for the startup synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Facts fetched per backend page.
    pub batch_size: usize,
    /// Overall cap on synced facts; `None` syncs everything.
    pub max_facts: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            max_facts: Some(DEFAULT_SYNC_MAX_FACTS),
        }
    }
}

impl SyncConfig {
    /// Sync the whole backend, page by page, with no cap.
    pub fn unbounded() -> Self {
        Self {
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            max_facts: None,
        }
    }
}

/// Top-level store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub sync: SyncConfig,
    /// Directory holding the journal files (`update_history.jsonl`,
    /// `operation_log.jsonl`).
    pub data_dir: PathBuf,
    /// Default threshold for fuzzy queries when the caller passes none.
    pub fuzzy_threshold: f64,
    /// Mirror newly created facts into the in-process cache regardless of
    /// provenance. `false` restores the legacy behavior of mirroring only
    /// manually entered facts.
    pub mirror_all_sources: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            sync: SyncConfig::default(),
            data_dir: PathBuf::from("."),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            mirror_all_sources: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| FactStoreError::Config(e.to_string()))
    }

    /// Config rooted at a scratch directory, suitable for tests.
    pub fn for_tests(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = StoreConfig::default();
        assert_eq!(config.sync.batch_size, 10);
        assert_eq!(config.sync.max_facts, Some(100));
        assert_eq!(config.fuzzy_threshold, 0.8);
        assert!(config.mirror_all_sources);
        assert_eq!(config.backend.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factgraph.toml");
        std::fs::write(
            &path,
            r#"
            data_dir = "/var/lib/factgraph"
            fuzzy_threshold = 0.9
            mirror_all_sources = false

            [backend]
            uri = "http://graph:7474"
            username = "svc"
            password = "secret"
            database = "facts"
            timeout_ms = 2500

            [sync]
            batch_size = 25
            max_facts = 1000
            "#,
        )
        .unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.backend.uri, "http://graph:7474");
        assert_eq!(config.backend.timeout(), Duration::from_millis(2500));
        assert_eq!(config.sync.batch_size, 25);
        assert_eq!(config.fuzzy_threshold, 0.9);
        assert!(!config.mirror_all_sources);
    }

    #[test]
    fn unbounded_sync_has_no_cap() {
        assert_eq!(SyncConfig::unbounded().max_facts, None);
    }
}
