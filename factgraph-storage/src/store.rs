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

//! The fact store orchestrator.
//!
//! [`FactStore`] is the sole writer of fact state in both stores and owns
//! the dual-write protocol:
//!
//! - **Add** commits to the durable backend first; a backend failure leaves
//!   the cache untouched, so the cache never runs ahead of the backend on
//!   creation.
//! - **Update** and **Delete** commit to the cache first, then the backend.
//!   A backend miss afterwards leaves the stores divergent; the divergence
//!   is surfaced to the caller (`NotFound`/`WriteFailed`) rather than rolled
//!   back, and [`FactStore::resync`] or a restart repairs it.
//!
//! Mutations for the same (subject, object) pair are serialized by a
//! per-pair lock held across the existence check and both writes. Queries
//! run lock-free against committed state, reading the backend first and
//! merging in cache-only facts by triple identity.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use factgraph_core::{
    validate_triple, Fact, FactStoreError, Result, StoreConfig, TripleKey, SOURCE_MANUAL,
};

use crate::backend::{GraphBackend, HttpGraphBackend};
use crate::cache::FactCache;
use crate::fuzzy;
use crate::journal::{HistoryRecord, Operation, OperationLog, UpdateHistoryLog};
use crate::sync::{SyncReport, Synchronizer};

/// One state in a fact's predicate timeline. Transition entries carry the
/// superseded predicate and the one it became; the final current-state entry
/// repeats the active predicate in both fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub old_predicate: String,
    pub new_predicate: String,
    pub id: Uuid,
    pub version: u32,
    pub source: String,
    pub original_message: Option<String>,
}

/// Orchestrator over the in-process cache, the durable graph backend, and
/// the append-only journals.
pub struct FactStore {
    cache: FactCache,
    /// `None` when the backend was unreachable at startup; the store then
    /// serves cache-only reads and refuses creations.
    backend: Option<Arc<dyn GraphBackend>>,
    history: UpdateHistoryLog,
    oplog: OperationLog,
    /// Per-(subject, object) mutation locks. Entries are pruned on release
    /// when no other mutation holds or awaits the lock.
    pair_locks: DashMap<(String, String), Arc<Mutex<()>>>,
    config: StoreConfig,
}

/// Holds the mutation lock for one (subject, object) pair. Dropping the
/// guard releases the mutex and removes the lock-table entry again unless
/// another mutation is contending for it.
struct PairGuard<'a> {
    key: (String, String),
    locks: &'a DashMap<(String, String), Arc<Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // remove_if holds the shard lock across the predicate, so the count
        // check and the removal are atomic against new entry() calls.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl FactStore {
    /// Connect to the configured HTTP backend, warm the cache, and return
    /// the store together with the warm-up report. An unreachable backend
    /// degrades to an empty cache-only store with `report.degraded` set.
    pub async fn connect(config: StoreConfig) -> Result<(Self, SyncReport)> {
        let backend: Arc<dyn GraphBackend> = Arc::new(HttpGraphBackend::new(&config.backend)?);
        Self::open_with(backend, config).await
    }

    /// Like [`connect`](Self::connect) but with an injected backend.
    pub async fn open_with(
        backend: Arc<dyn GraphBackend>,
        config: StoreConfig,
    ) -> Result<(Self, SyncReport)> {
        match backend.ping().await {
            Ok(()) => {
                let store = Self::build(Some(Arc::clone(&backend)), config)?;
                let report =
                    Synchronizer::run(backend.as_ref(), &store.cache, &store.config.sync).await;
                Ok((store, report))
            }
            Err(e) => {
                tracing::warn!("backend unreachable at startup, running cache-only: {}", e);
                let store = Self::build(None, config)?;
                Ok((store, SyncReport::degraded(0)))
            }
        }
    }

    /// Build a store around an injected backend without pinging or syncing.
    pub fn with_backend(backend: Arc<dyn GraphBackend>, config: StoreConfig) -> Result<Self> {
        Self::build(Some(backend), config)
    }

    fn build(backend: Option<Arc<dyn GraphBackend>>, config: StoreConfig) -> Result<Self> {
        let history = UpdateHistoryLog::open(&config.data_dir)?;
        let oplog = OperationLog::open(&config.data_dir)?;
        Ok(Self {
            cache: FactCache::new(),
            backend,
            history,
            oplog,
            pair_locks: DashMap::new(),
            config,
        })
    }

    /// True when the store has no reachable backend and serves cache only.
    pub fn is_degraded(&self) -> bool {
        self.backend.is_none()
    }

    /// Number of facts currently mirrored in the cache.
    pub fn cached_facts(&self) -> usize {
        self.cache.len()
    }

    async fn lock_pair(&self, subject: &str, object: &str) -> PairGuard<'_> {
        let key = (subject.to_string(), object.to_string());
        let lock = self
            .pair_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        PairGuard {
            key,
            locks: &self.pair_locks,
            guard: Some(guard),
        }
    }

    fn require_backend(&self) -> Result<&Arc<dyn GraphBackend>> {
        self.backend.as_ref().ok_or_else(|| {
            FactStoreError::BackendUnavailable("store is running cache-only".to_string())
        })
    }

    /// Create a new fact. Fails `Conflict` if the triple is already active
    /// in either store, without writing anything. The durable backend is
    /// written first; only after it accepts is the cache mirrored, so a
    /// backend failure never leaves the cache ahead.
    pub async fn add_fact(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        source: &str,
        original_message: Option<String>,
    ) -> Result<Uuid> {
        validate_triple(subject, predicate, object)?;
        // Manually entered facts carry no provenance snippet.
        let original_message = if source == SOURCE_MANUAL {
            None
        } else {
            original_message
        };

        let _guard = self.lock_pair(subject, object).await;

        if self.cache.get(subject, predicate, object).is_some() {
            return Err(FactStoreError::conflict(subject, predicate, object));
        }
        let backend = self.require_backend()?;
        if backend.count_matching(subject, predicate, object).await? > 0 {
            return Err(FactStoreError::conflict(subject, predicate, object));
        }

        let fact = Fact::new(subject, predicate, object, source, original_message);
        backend.create_fact(&fact).await?;

        if self.config.mirror_all_sources || source == SOURCE_MANUAL {
            self.cache.insert(fact.clone());
        }
        self.oplog.append(
            Operation::Add,
            json!({
                "subject": subject,
                "predicate": predicate,
                "object": object,
                "id": fact.id,
            }),
        )?;
        tracing::info!(id = %fact.id, subject, predicate, object, source, "fact added");
        Ok(fact.id)
    }

    /// Change a fact's predicate in place: same id, version + 1. Fails
    /// `NoOp` when the predicate is unchanged (no mutation, no history) and
    /// `NotFound` when the old triple is not active in the cache. The cache
    /// commits before the backend; a backend miss afterwards surfaces the
    /// divergence as `NotFound` without rolling the cache back.
    pub async fn update_fact(
        &self,
        subject: &str,
        old_predicate: &str,
        object: &str,
        new_predicate: &str,
        source: &str,
        original_message: Option<String>,
    ) -> Result<Fact> {
        validate_triple(subject, old_predicate, object)?;
        validate_triple(subject, new_predicate, object)?;
        if new_predicate == old_predicate {
            return Err(FactStoreError::NoOp);
        }
        let original_message = if source == SOURCE_MANUAL {
            None
        } else {
            original_message
        };

        let _guard = self.lock_pair(subject, object).await;

        let old = self
            .cache
            .get(subject, old_predicate, object)
            .ok_or_else(|| FactStoreError::not_found(subject, old_predicate, object))?;
        let successor = old.with_predicate(new_predicate, source, original_message);

        // Pre-update snapshot goes to durable history before either store
        // mutates, so the transition is never lost.
        self.history
            .append(&HistoryRecord::transition(&old, &successor))?;
        if self.cache.replace(old_predicate, successor.clone()).is_none() {
            // Only reachable when delete-all or resync, which take no pair
            // locks, cleared the edge between the lookup and the swap.
            tracing::warn!(
                id = %successor.id,
                subject,
                old_predicate,
                object,
                "cache edge vanished during update"
            );
            return Err(FactStoreError::not_found(subject, old_predicate, object));
        }

        let backend = self.require_backend()?;
        let affected = backend.replace_fact(old_predicate, &successor).await?;
        if affected == 0 {
            tracing::warn!(
                id = %successor.id,
                subject,
                old_predicate,
                object,
                "backend had no matching relationship; stores have diverged"
            );
            return Err(FactStoreError::not_found(subject, old_predicate, object));
        }

        self.oplog.append(
            Operation::Update,
            json!({
                "subject": subject,
                "old_predicate": old_predicate,
                "object": object,
                "new_predicate": new_predicate,
                "id": successor.id,
            }),
        )?;
        tracing::info!(
            id = %successor.id,
            subject,
            old_predicate,
            new_predicate,
            object,
            version = successor.version,
            "fact updated"
        );
        Ok(successor)
    }

    /// Remove a fact from both stores. Fails `NotFound` when the triple is
    /// not active in the cache, or when the backend reports zero deletions
    /// after the cache edge was already removed (divergence, surfaced).
    pub async fn delete_fact(&self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        validate_triple(subject, predicate, object)?;

        let _guard = self.lock_pair(subject, object).await;

        let removed = self
            .cache
            .remove(subject, predicate, object)
            .ok_or_else(|| FactStoreError::not_found(subject, predicate, object))?;
        self.oplog.append(
            Operation::Delete,
            json!({
                "subject": subject,
                "predicate": predicate,
                "object": object,
            }),
        )?;

        let backend = self.require_backend()?;
        let deleted = backend.delete_matching(subject, predicate, object).await?;
        if deleted == 0 {
            tracing::warn!(
                id = %removed.id,
                subject,
                predicate,
                object,
                "backend had no matching relationship; stores have diverged"
            );
            return Err(FactStoreError::not_found(subject, predicate, object));
        }
        tracing::info!(id = %removed.id, subject, predicate, object, "fact deleted");
        Ok(())
    }

    /// Wipe both stores and the update history. The operation log is not
    /// truncated; the appended `delete_all` record is the final audit row.
    /// Partial failure is reported after the remaining cleanup runs, not
    /// retried.
    pub async fn delete_all_facts(&self) -> Result<()> {
        self.cache.clear();
        let backend_result = match &self.backend {
            Some(backend) => backend.clear().await,
            None => Err(FactStoreError::BackendUnavailable(
                "store is running cache-only".to_string(),
            )),
        };

        self.history.truncate()?;
        self.oplog.append(
            Operation::DeleteAll,
            json!({ "description": "all facts deleted from the fact store" }),
        )?;
        tracing::info!("all facts deleted");
        backend_result
    }

    fn cache_only_on_error(result: Result<Vec<Fact>>) -> Vec<Fact> {
        match result {
            Ok(facts) => facts,
            Err(e) => {
                tracing::warn!("backend query failed, serving cache only: {}", e);
                Vec::new()
            }
        }
    }

    /// Facts whose subject is `entity`. Backend results (descending version)
    /// precede cache-only facts; duplicates collapse by triple identity.
    pub async fn facts_by_entity(&self, entity: &str) -> Vec<Fact> {
        let primary = match &self.backend {
            Some(backend) => Self::cache_only_on_error(backend.facts_by_subject(entity).await),
            None => Vec::new(),
        };
        merge_by_triple(primary, self.cache.facts_by_subject(entity))
    }

    /// Facts carrying `predicate`, merged across both stores.
    pub async fn facts_by_predicate(&self, predicate: &str) -> Vec<Fact> {
        let primary = match &self.backend {
            Some(backend) => Self::cache_only_on_error(backend.facts_by_predicate(predicate).await),
            None => Vec::new(),
        };
        merge_by_triple(primary, self.cache.facts_by_predicate(predicate))
    }

    /// Facts whose object is `entity`, merged across both stores.
    pub async fn facts_by_object(&self, entity: &str) -> Vec<Fact> {
        let primary = match &self.backend {
            Some(backend) => Self::cache_only_on_error(backend.facts_by_object(entity).await),
            None => Vec::new(),
        };
        merge_by_triple(primary, self.cache.facts_by_object(entity))
    }

    /// Every active fact, merged across both stores.
    pub async fn all_facts(&self) -> Vec<Fact> {
        let primary = match &self.backend {
            Some(backend) => Self::cache_only_on_error(backend.all_facts().await),
            None => Vec::new(),
        };
        merge_by_triple(primary, self.cache.all())
    }

    /// Facts where any one of subject, predicate, or object meets the
    /// similarity threshold against the keyword. `None` uses the configured
    /// default threshold.
    pub async fn fuzzy_search(&self, keyword: &str, threshold: Option<f64>) -> Vec<Fact> {
        let threshold = threshold.unwrap_or(self.config.fuzzy_threshold);
        let primary: Vec<Fact> = match &self.backend {
            Some(backend) => Self::cache_only_on_error(backend.all_facts().await)
                .into_iter()
                .filter(|f| fuzzy::fact_matches(f, keyword, threshold))
                .collect(),
            None => Vec::new(),
        };
        let secondary: Vec<Fact> = self
            .cache
            .all()
            .into_iter()
            .filter(|f| fuzzy::fact_matches(f, keyword, threshold))
            .collect();
        merge_by_triple(primary, secondary)
    }

    /// The chronological predicate timeline for a fact id: one entry per
    /// recorded transition, then the current active state (if the fact still
    /// exists), sorted by timestamp ascending. Empty when neither history
    /// nor a current fact matches.
    pub async fn update_timeline(
        &self,
        subject: &str,
        object: &str,
        id: Uuid,
    ) -> Result<Vec<TimelineEntry>> {
        if id.is_nil() {
            return Err(FactStoreError::InvalidArgument("fact id is required"));
        }

        let mut timeline: Vec<TimelineEntry> = self
            .history
            .read_for(subject, object, id)?
            .into_iter()
            .map(|record| TimelineEntry {
                timestamp: record.timestamp,
                old_predicate: record.old_predicate,
                new_predicate: record.updated_to.new_predicate,
                id: record.id,
                version: record.old_version,
                source: record.updated_to.new_src,
                original_message: record.updated_to.new_original_message,
            })
            .collect();

        let current = match self.cache.find_by_id(subject, object, id) {
            Some(fact) => Some(fact),
            None => match &self.backend {
                Some(backend) => backend.find_by_id(subject, object, id).await.unwrap_or_else(
                    |e| {
                        tracing::warn!("backend timeline lookup failed: {}", e);
                        None
                    },
                ),
                None => None,
            },
        };
        if let Some(fact) = current {
            timeline.push(TimelineEntry {
                timestamp: fact.created_at,
                old_predicate: fact.predicate.clone(),
                new_predicate: fact.predicate,
                id: fact.id,
                version: fact.version,
                source: fact.source,
                original_message: fact.original_message,
            });
        }

        timeline.sort_by_key(|entry| entry.timestamp);
        Ok(timeline)
    }

    /// Rebuild the cache from the backend. This is the recovery path for the
    /// divergence window left by failed update/delete backend legs.
    pub async fn resync(&self) -> SyncReport {
        self.cache.clear();
        match &self.backend {
            Some(backend) => {
                Synchronizer::run(backend.as_ref(), &self.cache, &self.config.sync).await
            }
            None => SyncReport::degraded(0),
        }
    }
}

/// Merge two result sets by triple identity. Primary (backend) facts win;
/// secondary (cache) facts are appended only when their triple was not seen.
fn merge_by_triple(primary: Vec<Fact>, secondary: Vec<Fact>) -> Vec<Fact> {
    let mut seen: std::collections::HashSet<TripleKey> =
        primary.iter().map(Fact::triple).collect();
    let mut merged = primary;
    for fact in secondary {
        if seen.insert(fact.triple()) {
            merged.push(fact);
        }
    }
    merged
}
