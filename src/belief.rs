//! Belief store: per-agent certainty-weighted facts with revision.
//!
//! Revision follows two rules:
//!
//! 1. Evidence that agrees with the held value accumulates by noisy-OR,
//!    `1 - (1 - old) * (1 - new)`, so agreeing evidence never lowers certainty.
//! 2. Evidence that disagrees is resolved by certainty: the stronger belief
//!    survives whole and the weaker one is discarded. At equal certainty the
//!    incoming evidence wins.
//!
//! The store is passive. It never calls into the reasoning engine; the
//! deliberation cycle wires the two together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{self, Facts, Value};

/// A certainty-weighted fact held by one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub key: String,
    pub value: Value,
    /// Certainty in `[0, 1]`.
    pub certainty: f64,
}

impl Belief {
    pub fn new(key: impl Into<String>, value: Value, certainty: f64) -> Self {
        Self {
            key: key.into(),
            value,
            certainty: clamp_certainty(certainty),
        }
    }
}

/// What an [`BeliefStore::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Revision {
    /// No prior belief; inserted as given.
    Inserted,
    /// Agreeing evidence; certainty accumulated to the contained value.
    Reinforced(f64),
    /// Conflicting evidence at least as certain as the prior; replaced.
    Replaced,
    /// Conflicting evidence weaker than the prior; ignored.
    Retained,
}

/// Keyed store of an agent's beliefs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeliefStore {
    beliefs: BTreeMap<String, Belief>,
}

impl BeliefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or revise a belief.
    pub fn update(&mut self, key: impl Into<String>, value: Value, certainty: f64) -> Revision {
        let key = key.into();
        let certainty = clamp_certainty(certainty);

        let Some(prior) = self.beliefs.get_mut(&key) else {
            self.beliefs
                .insert(key.clone(), Belief::new(key, value, certainty));
            return Revision::Inserted;
        };

        if value::loosely_equal(&prior.value, &value) {
            let combined = 1.0 - (1.0 - prior.certainty) * (1.0 - certainty);
            prior.certainty = clamp_certainty(combined);
            Revision::Reinforced(prior.certainty)
        } else if certainty >= prior.certainty {
            prior.value = value;
            prior.certainty = certainty;
            Revision::Replaced
        } else {
            Revision::Retained
        }
    }

    pub fn get(&self, key: &str) -> Option<&Belief> {
        self.beliefs.get(key)
    }

    /// Remove a belief. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.beliefs.remove(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Belief> {
        self.beliefs.values()
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }

    /// Belief values keyed by name, the input shape of the reasoning engine.
    pub fn facts(&self) -> Facts {
        self.beliefs
            .iter()
            .map(|(k, b)| (k.clone(), b.value.clone()))
            .collect()
    }

    /// Belief certainties keyed by name, used as priors for probabilistic reasoning.
    pub fn certainties(&self) -> BTreeMap<String, f64> {
        self.beliefs
            .iter()
            .map(|(k, b)| (k.clone(), b.certainty))
            .collect()
    }

    /// Predicates that currently hold, for plan precondition matching.
    ///
    /// A belief with certainty at or above `threshold` and a truthy value
    /// contributes its key; if its value is a scalar it also contributes
    /// `key=value`.
    pub fn satisfied_predicates(&self, threshold: f64) -> Vec<String> {
        let mut predicates = Vec::new();
        for belief in self.beliefs.values() {
            if belief.certainty < threshold || !value::is_truthy(&belief.value) {
                continue;
            }
            predicates.push(belief.key.clone());
            if let Some(text) = value::scalar_text(&belief.value) {
                predicates.push(format!("{}={}", belief.key, text));
            }
        }
        predicates
    }
}

fn clamp_certainty(c: f64) -> f64 {
    if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) }
}
