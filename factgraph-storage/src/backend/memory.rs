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

//! In-memory graph backend for tests and offline development.
//!
//! Linear scans over a vector of facts — correct, not fast. The `offline`
//! switch makes every call fail `BackendUnavailable`, and the `*_raw`
//! helpers mutate durable state behind the store's back to set up divergence
//! scenarios.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use factgraph_core::{Fact, FactStoreError, Result};

use super::GraphBackend;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    facts: RwLock<Vec<Fact>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a fact directly, bypassing the store's dual-write path.
    pub fn insert_raw(&self, fact: Fact) {
        self.facts.write().push(fact);
    }

    /// Remove a triple directly, bypassing the store. Returns whether a fact
    /// was removed. Used to manufacture cache/backend divergence in tests.
    pub fn remove_raw(&self, subject: &str, predicate: &str, object: &str) -> bool {
        let mut facts = self.facts.write();
        let before = facts.len();
        facts.retain(|f| {
            !(f.subject == subject && f.predicate == predicate && f.object == object)
        });
        facts.len() != before
    }

    /// Current durable state, in insertion order.
    pub fn snapshot(&self) -> Vec<Fact> {
        self.facts.read().clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FactStoreError::BackendUnavailable(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn sorted_desc(mut facts: Vec<Fact>) -> Vec<Fact> {
        facts.sort_by(|a, b| b.version.cmp(&a.version));
        facts
    }
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        self.ensure_online()
    }

    async fn count_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(facts
            .iter()
            .filter(|f| f.subject == subject && f.predicate == predicate && f.object == object)
            .count() as u64)
    }

    async fn create_fact(&self, fact: &Fact) -> Result<()> {
        self.ensure_online()?;
        self.facts.write().push(fact.clone());
        Ok(())
    }

    async fn replace_fact(&self, old_predicate: &str, successor: &Fact) -> Result<u64> {
        self.ensure_online()?;
        let mut facts = self.facts.write();
        match facts.iter_mut().find(|f| {
            f.subject == successor.subject
                && f.object == successor.object
                && f.predicate == old_predicate
                && f.id == successor.id
        }) {
            Some(existing) => {
                *existing = successor.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64> {
        self.ensure_online()?;
        let mut facts = self.facts.write();
        let before = facts.len();
        facts.retain(|f| {
            !(f.subject == subject && f.predicate == predicate && f.object == object)
        });
        Ok((before - facts.len()) as u64)
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_online()?;
        self.facts.write().clear();
        Ok(())
    }

    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Vec<Fact>> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(facts.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn facts_by_subject(&self, entity: &str) -> Result<Vec<Fact>> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(Self::sorted_desc(
            facts.iter().filter(|f| f.subject == entity).cloned().collect(),
        ))
    }

    async fn facts_by_predicate(&self, predicate: &str) -> Result<Vec<Fact>> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(Self::sorted_desc(
            facts
                .iter()
                .filter(|f| f.predicate == predicate)
                .cloned()
                .collect(),
        ))
    }

    async fn facts_by_object(&self, entity: &str) -> Result<Vec<Fact>> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(Self::sorted_desc(
            facts.iter().filter(|f| f.object == entity).cloned().collect(),
        ))
    }

    async fn all_facts(&self) -> Result<Vec<Fact>> {
        self.ensure_online()?;
        Ok(Self::sorted_desc(self.facts.read().clone()))
    }

    async fn find_by_id(&self, subject: &str, object: &str, id: Uuid) -> Result<Option<Fact>> {
        self.ensure_online()?;
        let facts = self.facts.read();
        Ok(facts
            .iter()
            .find(|f| f.subject == subject && f.object == object && f.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factgraph_core::SOURCE_MANUAL;

    fn fact(s: &str, p: &str, o: &str) -> Fact {
        Fact::new(s, p, o, SOURCE_MANUAL, None)
    }

    #[tokio::test]
    async fn create_count_delete() {
        let backend = MemoryBackend::new();
        backend.create_fact(&fact("Alice", "knows", "Bob")).await.unwrap();
        assert_eq!(backend.count_matching("Alice", "knows", "Bob").await.unwrap(), 1);
        assert_eq!(backend.delete_matching("Alice", "knows", "Bob").await.unwrap(), 1);
        assert_eq!(backend.delete_matching("Alice", "knows", "Bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_matches_id_and_old_predicate() {
        let backend = MemoryBackend::new();
        let original = fact("Alice", "friends_with", "Bob");
        backend.create_fact(&original).await.unwrap();

        let successor = original.with_predicate("married_to", SOURCE_MANUAL, None);
        assert_eq!(backend.replace_fact("friends_with", &successor).await.unwrap(), 1);
        // Old predicate is gone; replaying the replace affects nothing.
        assert_eq!(backend.replace_fact("friends_with", &successor).await.unwrap(), 0);

        let found = backend.find_by_id("Alice", "Bob", original.id).await.unwrap().unwrap();
        assert_eq!(found.predicate, "married_to");
        assert_eq!(found.version, 2);
    }

    #[tokio::test]
    async fn offline_fails_every_call() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(backend.ping().await.unwrap_err().is_unavailable());
        assert!(backend.all_facts().await.unwrap_err().is_unavailable());
        backend.set_offline(false);
        assert!(backend.ping().await.is_ok());
    }

    #[tokio::test]
    async fn pagination_preserves_insertion_order() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend
                .create_fact(&fact(&format!("s{i}"), "p", "o"))
                .await
                .unwrap();
        }
        let first = backend.fetch_page(0, 2).await.unwrap();
        let second = backend.fetch_page(2, 2).await.unwrap();
        let last = backend.fetch_page(4, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(last.len(), 1);
        assert_eq!(first[0].subject, "s0");
        assert_eq!(last[0].subject, "s4");
        assert!(backend.fetch_page(5, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_results_sorted_by_version_desc() {
        let backend = MemoryBackend::new();
        let mut high = fact("Alice", "knows", "Bob");
        high.version = 3;
        backend.create_fact(&fact("Alice", "knows", "Carol")).await.unwrap();
        backend.create_fact(&high).await.unwrap();
        let facts = backend.facts_by_subject("Alice").await.unwrap();
        assert_eq!(facts[0].version, 3);
    }
}
