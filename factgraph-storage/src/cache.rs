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

//! In-process fact cache.
//!
//! A directed multigraph of active facts keyed by (subject, object), with
//! parallel edges distinguished by predicate. Entities exist only as endpoint
//! strings; there is no node table. Reads return clones of committed state,
//! so query results never observe writes in flight.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use factgraph_core::Fact;

type PairKey = (String, String);

/// In-memory mirror of active facts.
///
/// The cache holds copies, not owning state: the durable backend is the
/// source of truth when reachable, and cache entries are authoritative for
/// reads only while the backend is down.
#[derive(Debug, Default)]
pub struct FactCache {
    edges: RwLock<HashMap<PairKey, Vec<Fact>>>,
}

impl FactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact edge. An existing edge with the same predicate between
    /// the same endpoints is overwritten, keeping at most one active fact per
    /// triple.
    pub fn insert(&self, fact: Fact) {
        let mut edges = self.edges.write();
        let slot = edges
            .entry((fact.subject.clone(), fact.object.clone()))
            .or_default();
        if let Some(existing) = slot.iter_mut().find(|f| f.predicate == fact.predicate) {
            *existing = fact;
        } else {
            slot.push(fact);
        }
    }

    /// Active fact for an exact (subject, predicate, object) triple.
    pub fn get(&self, subject: &str, predicate: &str, object: &str) -> Option<Fact> {
        let edges = self.edges.read();
        edges
            .get(&(subject.to_string(), object.to_string()))?
            .iter()
            .find(|f| f.predicate == predicate)
            .cloned()
    }

    /// Remove the edge matching the triple, returning the removed fact.
    pub fn remove(&self, subject: &str, predicate: &str, object: &str) -> Option<Fact> {
        let mut edges = self.edges.write();
        let key = (subject.to_string(), object.to_string());
        let slot = edges.get_mut(&key)?;
        let idx = slot.iter().position(|f| f.predicate == predicate)?;
        let removed = slot.swap_remove(idx);
        if slot.is_empty() {
            edges.remove(&key);
        }
        Some(removed)
    }

    /// Swap the edge matching (subject, old_predicate, object) for its
    /// successor state. Returns the replaced fact, or `None` if the old edge
    /// was absent (in which case nothing is inserted).
    pub fn replace(&self, old_predicate: &str, successor: Fact) -> Option<Fact> {
        let mut edges = self.edges.write();
        let key = (successor.subject.clone(), successor.object.clone());
        let slot = edges.get_mut(&key)?;
        let existing = slot.iter_mut().find(|f| f.predicate == old_predicate)?;
        Some(std::mem::replace(existing, successor))
    }

    pub fn clear(&self) {
        self.edges.write().clear();
    }

    /// Number of active fact edges.
    pub fn len(&self) -> usize {
        self.edges.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.read().values().all(Vec::is_empty)
    }

    /// All facts whose subject equals `entity`. Scans the edge set; there is
    /// no node index.
    pub fn facts_by_subject(&self, entity: &str) -> Vec<Fact> {
        let edges = self.edges.read();
        edges
            .iter()
            .filter(|((subject, _), _)| subject == entity)
            .flat_map(|(_, facts)| facts.iter().cloned())
            .collect()
    }

    /// All facts whose object equals `entity`.
    pub fn facts_by_object(&self, entity: &str) -> Vec<Fact> {
        let edges = self.edges.read();
        edges
            .iter()
            .filter(|((_, object), _)| object == entity)
            .flat_map(|(_, facts)| facts.iter().cloned())
            .collect()
    }

    /// All facts carrying the given predicate.
    pub fn facts_by_predicate(&self, predicate: &str) -> Vec<Fact> {
        let edges = self.edges.read();
        edges
            .values()
            .flatten()
            .filter(|f| f.predicate == predicate)
            .cloned()
            .collect()
    }

    /// Snapshot of every active fact.
    pub fn all(&self) -> Vec<Fact> {
        let edges = self.edges.read();
        edges.values().flatten().cloned().collect()
    }

    /// The active fact between two endpoints carrying the given id, if any.
    pub fn find_by_id(&self, subject: &str, object: &str, id: Uuid) -> Option<Fact> {
        let edges = self.edges.read();
        edges
            .get(&(subject.to_string(), object.to_string()))?
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factgraph_core::SOURCE_MANUAL;

    fn fact(s: &str, p: &str, o: &str) -> Fact {
        Fact::new(s, p, o, SOURCE_MANUAL, None)
    }

    #[test]
    fn insert_and_get() {
        let cache = FactCache::new();
        cache.insert(fact("Alice", "friends_with", "Bob"));
        assert!(cache.get("Alice", "friends_with", "Bob").is_some());
        assert!(cache.get("Alice", "married_to", "Bob").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn parallel_edges_are_distinct_by_predicate() {
        let cache = FactCache::new();
        cache.insert(fact("Alice", "friends_with", "Bob"));
        cache.insert(fact("Alice", "works_with", "Bob"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("Alice", "friends_with", "Bob").is_some());
        assert!(cache.get("Alice", "works_with", "Bob").is_some());
    }

    #[test]
    fn insert_same_triple_overwrites() {
        let cache = FactCache::new();
        let first = fact("Alice", "friends_with", "Bob");
        cache.insert(first.clone());
        let second = fact("Alice", "friends_with", "Bob");
        cache.insert(second.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("Alice", "friends_with", "Bob").unwrap().id,
            second.id
        );
    }

    #[test]
    fn remove_returns_fact_and_prunes_pair() {
        let cache = FactCache::new();
        cache.insert(fact("Alice", "friends_with", "Bob"));
        let removed = cache.remove("Alice", "friends_with", "Bob").unwrap();
        assert_eq!(removed.predicate, "friends_with");
        assert!(cache.is_empty());
        assert!(cache.remove("Alice", "friends_with", "Bob").is_none());
    }

    #[test]
    fn replace_keeps_endpoints() {
        let cache = FactCache::new();
        let original = fact("Alice", "friends_with", "Bob");
        cache.insert(original.clone());
        let successor = original.with_predicate("married_to", SOURCE_MANUAL, None);
        let replaced = cache.replace("friends_with", successor).unwrap();
        assert_eq!(replaced.id, original.id);
        assert!(cache.get("Alice", "friends_with", "Bob").is_none());
        let current = cache.get("Alice", "married_to", "Bob").unwrap();
        assert_eq!(current.id, original.id);
        assert_eq!(current.version, 2);
    }

    #[test]
    fn replace_missing_edge_inserts_nothing() {
        let cache = FactCache::new();
        let successor = fact("Alice", "married_to", "Bob");
        assert!(cache.replace("friends_with", successor).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn entity_scans_cover_both_endpoints() {
        let cache = FactCache::new();
        cache.insert(fact("Alice", "friends_with", "Bob"));
        cache.insert(fact("Bob", "reports_to", "Carol"));
        assert_eq!(cache.facts_by_subject("Alice").len(), 1);
        assert_eq!(cache.facts_by_subject("Bob").len(), 1);
        assert_eq!(cache.facts_by_object("Bob").len(), 1);
        assert_eq!(cache.facts_by_predicate("reports_to").len(), 1);
        assert_eq!(cache.all().len(), 2);
    }

    #[test]
    fn find_by_id_matches_endpoints() {
        let cache = FactCache::new();
        let f = fact("Alice", "friends_with", "Bob");
        let id = f.id;
        cache.insert(f);
        assert!(cache.find_by_id("Alice", "Bob", id).is_some());
        assert!(cache.find_by_id("Bob", "Alice", id).is_none());
        assert!(cache.find_by_id("Alice", "Bob", Uuid::new_v4()).is_none());
    }
}
