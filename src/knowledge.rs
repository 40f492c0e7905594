//! Knowledge store: where world facts outlive the scheduler.
//!
//! The kernel does not own persistence. After each tick the scheduler writes
//! the variable assignments and removals it applied through a
//! [`KnowledgeStore`], if one is attached. [`MemoryKnowledgeStore`] is the
//! in-process implementation; ontology or database backends implement the
//! same trait outside this crate.

use dashmap::DashMap;

use crate::value::Value;
use crate::world::WorldMutation;

/// Capability interface for world-fact persistence.
pub trait KnowledgeStore: Send + Sync {
    fn read(&self, key: &str) -> Option<Value>;

    fn write(&self, key: &str, value: Value);

    /// Remove a fact. Returns whether it existed.
    fn remove(&self, key: &str) -> bool;

    /// Mirror one applied world mutation. Relations are not persisted.
    fn record(&self, mutation: &WorldMutation) {
        match mutation {
            WorldMutation::Set { key, value } => self.write(key, value.clone()),
            WorldMutation::Unset { key } => {
                self.remove(key);
            }
            WorldMutation::Relate(_) | WorldMutation::Unrelate(_) => {}
        }
    }
}

/// Concurrent in-memory store using a sharded hashmap.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeStore {
    data: DashMap<String, Value>,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|v| v.value().clone())
    }

    fn write(&self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }
}
