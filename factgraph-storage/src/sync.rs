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

//! Startup cache warm-up.
//!
//! Paginates all facts out of the durable backend into the in-process cache
//! so reads are warm before the store serves traffic, preserving ids,
//! predicates, versions, and timestamps verbatim. A mid-sync backend failure
//! yields a degraded report with whatever was loaded — never a silent
//! success.

use factgraph_core::SyncConfig;

use crate::backend::GraphBackend;
use crate::cache::FactCache;

/// Outcome of a cache warm-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Facts copied into the cache.
    pub synced: usize,
    /// True when the backend failed before the sync completed; the cache
    /// holds only what was loaded so far and the store should be treated as
    /// cache-only.
    pub degraded: bool,
}

impl SyncReport {
    pub fn degraded(synced: usize) -> Self {
        Self {
            synced,
            degraded: true,
        }
    }
}

/// Pages facts out of the backend into the cache.
pub struct Synchronizer;

impl Synchronizer {
    /// Run one warm-up pass. Stops on an empty page or once `max_facts` is
    /// reached.
    pub async fn run(
        backend: &dyn GraphBackend,
        cache: &FactCache,
        config: &SyncConfig,
    ) -> SyncReport {
        let mut skip = 0;
        let mut synced = 0;

        loop {
            let page = match backend.fetch_page(skip, config.batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(synced, "sync aborted, backend unreachable: {}", e);
                    return SyncReport::degraded(synced);
                }
            };
            if page.is_empty() {
                break;
            }

            let fetched = page.len();
            for fact in page {
                cache.insert(fact);
                synced += 1;
                if let Some(cap) = config.max_facts {
                    if synced >= cap {
                        tracing::info!(synced, cap, "sync stopped at configured cap");
                        return SyncReport {
                            synced,
                            degraded: false,
                        };
                    }
                }
            }
            skip += fetched;
        }

        tracing::info!(synced, "cache warm-up complete");
        SyncReport {
            synced,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use factgraph_core::{Fact, SOURCE_MANUAL};

    fn seeded_backend(n: usize) -> MemoryBackend {
        let backend = MemoryBackend::new();
        for i in 0..n {
            backend.insert_raw(Fact::new(
                format!("s{i}"),
                "knows",
                format!("o{i}"),
                SOURCE_MANUAL,
                None,
            ));
        }
        backend
    }

    #[tokio::test]
    async fn syncs_all_facts_across_pages() {
        let backend = seeded_backend(25);
        let cache = FactCache::new();
        let report = Synchronizer::run(&backend, &cache, &SyncConfig::unbounded()).await;
        assert_eq!(report.synced, 25);
        assert!(!report.degraded);
        assert_eq!(cache.len(), 25);
    }

    #[tokio::test]
    async fn preserves_fact_state_verbatim() {
        let backend = MemoryBackend::new();
        let mut fact = Fact::new("Alice", "knows", "Bob", SOURCE_MANUAL, None);
        fact.version = 4;
        backend.insert_raw(fact.clone());
        let cache = FactCache::new();
        Synchronizer::run(&backend, &cache, &SyncConfig::default()).await;
        let cached = cache.get("Alice", "knows", "Bob").unwrap();
        assert_eq!(cached, fact);
    }

    #[tokio::test]
    async fn stops_at_configured_cap() {
        let backend = seeded_backend(40);
        let cache = FactCache::new();
        let config = SyncConfig {
            batch_size: 10,
            max_facts: Some(15),
        };
        let report = Synchronizer::run(&backend, &cache, &config).await;
        assert_eq!(report.synced, 15);
        assert!(!report.degraded);
        assert_eq!(cache.len(), 15);
    }

    #[tokio::test]
    async fn unreachable_backend_reports_degraded() {
        let backend = seeded_backend(5);
        backend.set_offline(true);
        let cache = FactCache::new();
        let report = Synchronizer::run(&backend, &cache, &SyncConfig::default()).await;
        assert!(report.degraded);
        assert_eq!(report.synced, 0);
        assert!(cache.is_empty());
    }
}
