//! Shared world state and the mutations that change it.
//!
//! The world is a map of named variables plus a set of
//! `(subject, relation, object)` triples. Agents only read it; every change
//! goes through [`WorldState::apply`], called by the scheduler after all
//! agents have deliberated.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::{Facts, Value};

/// A directed relation between two named entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Relation {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Fact key under which this relation is perceived: `subject.relation.object`.
    pub fn fact_key(&self) -> String {
        format!("{}.{}.{}", self.subject, self.relation, self.object)
    }
}

/// A single change to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorldMutation {
    Set { key: String, value: Value },
    Unset { key: String },
    Relate(Relation),
    Unrelate(Relation),
}

/// Which part of the world an agent perceives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "names", rename_all = "snake_case")]
pub enum PerceptionScope {
    /// Every variable and relation.
    #[default]
    All,
    /// Exactly these fact keys.
    Keys(BTreeSet<String>),
    /// Fact keys starting with any of these prefixes.
    Prefixes(Vec<String>),
}

impl PerceptionScope {
    fn admits(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Keys(keys) => keys.contains(key),
            Self::Prefixes(prefixes) => prefixes.iter().any(|p| key.starts_with(p.as_str())),
        }
    }
}

/// Shared mutable state of the simulated environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    variables: BTreeMap<String, Value>,
    relations: BTreeSet<Relation>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn relations(&self) -> &BTreeSet<Relation> {
        &self.relations
    }

    pub fn has_relation(&self, relation: &Relation) -> bool {
        self.relations.contains(relation)
    }

    /// Objects related to `subject` by `relation`.
    pub fn related<'a>(&'a self, subject: &'a str, relation: &'a str) -> impl Iterator<Item = &'a str> {
        self.relations
            .iter()
            .filter(move |r| r.subject == subject && r.relation == relation)
            .map(|r| r.object.as_str())
    }

    /// Apply one mutation. Returns whether the world changed.
    pub fn apply(&mut self, mutation: &WorldMutation) -> bool {
        match mutation {
            WorldMutation::Set { key, value } => {
                self.variables.insert(key.clone(), value.clone()).as_ref() != Some(value)
            }
            WorldMutation::Unset { key } => self.variables.remove(key).is_some(),
            WorldMutation::Relate(rel) => self.relations.insert(rel.clone()),
            WorldMutation::Unrelate(rel) => self.relations.remove(rel),
        }
    }

    /// Facts visible through `scope`: variables by key, relations as
    /// `subject.relation.object = true`.
    pub fn perceive(&self, scope: &PerceptionScope) -> Facts {
        let mut facts: Facts = self
            .variables
            .iter()
            .filter(|(k, _)| scope.admits(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for rel in &self.relations {
            let key = rel.fact_key();
            if scope.admits(&key) {
                facts.insert(key, Value::Bool(true));
            }
        }
        facts
    }

    /// Remove every variable namespaced to `entity` (`entity.*`) and every
    /// relation whose subject is `entity`. Returns the removals performed.
    pub fn forget_entity(&mut self, entity: &str) -> Vec<WorldMutation> {
        let prefix = format!("{entity}.");
        let keys: Vec<String> = self
            .variables
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        let rels: Vec<Relation> = self
            .relations
            .iter()
            .filter(|r| r.subject == entity)
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(keys.len() + rels.len());
        for key in keys {
            self.variables.remove(&key);
            removed.push(WorldMutation::Unset { key });
        }
        for rel in rels {
            self.relations.remove(&rel);
            removed.push(WorldMutation::Unrelate(rel));
        }
        removed
    }
}
