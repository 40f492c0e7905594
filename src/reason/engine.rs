//! Rule-based and probabilistic reasoning over agent facts.
//!
//! The engine holds an append-only rule set. Each rule pairs a parsed
//! [`Condition`] with an action name and a base probability. Two evaluation
//! modes share the same rules:
//!
//! - [`ReasoningEngine::rule_based_reasoning`] returns the set of actions whose
//!   rules fire.
//! - [`ReasoningEngine::probabilistic_reasoning`] returns a confidence per
//!   action, combining each firing rule's probability with the priors of the
//!   facts its condition cites.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::value::Facts;

use super::condition::Condition;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How confidences from several rules proposing the same action are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationStrategy {
    /// Keep the strongest posterior (optimistic).
    #[default]
    Max,
    /// Treat rules as independent evidence: `1 - prod(1 - p_i)`.
    NoisyOr,
    /// Arithmetic mean of the posteriors.
    Mean,
}

impl CombinationStrategy {
    fn combine(self, posteriors: &[f64]) -> f64 {
        match self {
            Self::Max => posteriors.iter().copied().fold(0.0_f64, f64::max),
            Self::NoisyOr => 1.0 - posteriors.iter().map(|p| 1.0 - p).product::<f64>(),
            Self::Mean => {
                if posteriors.is_empty() {
                    0.0
                } else {
                    posteriors.iter().sum::<f64>() / posteriors.len() as f64
                }
            }
        }
    }
}

/// Configuration for the reasoning engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Merge policy for duplicate actions (default: `Max`).
    pub combination: CombinationStrategy,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A condition → action rule with a base probability.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Condition as authored.
    pub source: String,
    pub condition: Condition,
    pub action: String,
    /// Base probability in `[0, 1]`.
    pub probability: f64,
}

impl Rule {
    /// Parse and validate a rule.
    pub fn new(condition: &str, action: impl Into<String>, probability: f64) -> ConfigResult<Self> {
        let action = action.into();
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::Probability {
                action,
                probability,
            });
        }
        Ok(Self {
            source: condition.to_string(),
            condition: Condition::parse(condition)?,
            action,
            probability,
        })
    }

    /// Posterior confidence given priors on the cited facts.
    ///
    /// `p * prod(prior) / (p * prod(prior) + (1 - p) * prod(1 - prior))`.
    /// Facts without a prior, or with a prior of 1.0 (fully trusted),
    /// contribute a neutral factor, so with no informative priors the result
    /// is the rule's own probability.
    pub fn posterior(&self, priors: &BTreeMap<String, f64>) -> f64 {
        let mut support = self.probability;
        let mut against = 1.0 - self.probability;
        for fact in self.condition.cited_facts() {
            let Some(&prior) = priors.get(fact) else {
                continue;
            };
            if prior.is_nan() || prior >= 1.0 {
                continue;
            }
            let prior = prior.max(0.0);
            support *= prior;
            against *= 1.0 - prior;
        }
        let total = support + against;
        if total <= 0.0 { 0.0 } else { support / total }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Append-only rule set with rule-based and probabilistic evaluation.
#[derive(Debug, Clone, Default)]
pub struct ReasoningEngine {
    config: ReasoningConfig,
    rules: Vec<Rule>,
}

impl ReasoningEngine {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    /// Append a rule. Duplicates are legal and fire independently.
    pub fn add_rule(
        &mut self,
        condition: &str,
        action: impl Into<String>,
        probability: f64,
    ) -> ConfigResult<()> {
        let rule = Rule::new(condition, action, probability)?;
        tracing::debug!(action = %rule.action, condition = %rule.source, "rule added");
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Actions of every rule whose condition holds over `facts`.
    pub fn rule_based_reasoning(&self, facts: &Facts) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|r| r.condition.holds(facts))
            .map(|r| r.action.clone())
            .collect()
    }

    /// Confidence per action for every rule whose condition holds.
    pub fn probabilistic_reasoning(
        &self,
        facts: &Facts,
        priors: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, f64> {
        let mut by_action: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for rule in self.rules.iter().filter(|r| r.condition.holds(facts)) {
            by_action
                .entry(rule.action.clone())
                .or_default()
                .push(rule.posterior(priors));
        }
        by_action
            .into_iter()
            .map(|(action, posteriors)| {
                let confidence = self.config.combination.combine(&posteriors);
                (action, confidence)
            })
            .collect()
    }
}
