//! Scenario files: a whole multi-agent system described in TOML.
//!
//! A scenario declares the world seed, the shared rule set and plan library,
//! and the agents with their initial beliefs, desires and goals. Loading
//! validates everything up front; a scenario that loads builds into a
//! [`Scheduler`] that is ready to step.
//!
//! ```toml
//! [scheduler]
//! parallel = false
//!
//! [world.variables]
//! temperature = 34
//!
//! [[rules]]
//! condition = "temperature > 30"
//! action = "cool_down"
//! probability = 0.8
//!
//! [[plans]]
//! id = "vent"
//! goal = "cool_down"
//! priority = 5
//! steps = ["Move to vent", { description = "Use fan", effects = { temperature = 22 } }]
//!
//! [[agents]]
//! id = "hvac"
//! reasoning = "probabilistic"
//! desires = [{ id = "cool_down", description = "keep the room cool", priority = 3 }]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::action::Action;
use crate::agent::{Agent, AgentConfig};
use crate::error::{ConfigError, ConfigResult, MabosResult};
use crate::goal::{Desire, Goal};
use crate::plan::{Plan, PlanLibrary, Task};
use crate::reason::{ReasoningConfig, ReasoningEngine};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::value::Value;
use crate::world::{Relation, WorldMutation, WorldState};

// ---------------------------------------------------------------------------
// TOML layout
// ---------------------------------------------------------------------------

/// A parsed scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub scheduler: SchedulerConfig,
    pub reasoning: ReasoningConfig,
    pub world: WorldSeed,
    pub rules: Vec<RuleSpec>,
    pub plans: Vec<PlanSpec>,
    pub agents: Vec<AgentSpec>,
}

/// Initial world contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldSeed {
    pub variables: BTreeMap<String, Value>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub condition: String,
    pub action: String,
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanSpec {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub steps: Vec<StepSpec>,
}

/// A plan step: either action text, or a table with effects and an
/// optional explicit action.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Text(String),
    Detailed {
        #[serde(default)]
        id: Option<String>,
        description: String,
        #[serde(default)]
        action: Option<Action>,
        #[serde(default)]
        effects: BTreeMap<String, Value>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    #[serde(flatten)]
    pub config: AgentConfig,
    #[serde(default)]
    pub beliefs: Vec<BeliefSpec>,
    #[serde(default)]
    pub desires: Vec<Desire>,
    #[serde(default)]
    pub goals: Vec<GoalSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeliefSpec {
    pub key: String,
    pub value: Value,
    #[serde(default = "default_probability")]
    pub certainty: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i64,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Scenario {
    /// Parse a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let scenario = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            agents = scenario.agents.len(),
            plans = scenario.plans.len(),
            rules = scenario.rules.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// The rule set, with every condition parsed.
    pub fn reasoning_engine(&self) -> ConfigResult<ReasoningEngine> {
        let mut engine = ReasoningEngine::new(self.reasoning.clone());
        for rule in &self.rules {
            engine.add_rule(&rule.condition, rule.action.clone(), rule.probability)?;
        }
        Ok(engine)
    }

    /// The plan library, with every step resolved to a task.
    pub fn plan_library(&self) -> ConfigResult<PlanLibrary> {
        let mut library = PlanLibrary::new();
        for spec in &self.plans {
            let mut plan = Plan::new(spec.id.clone(), spec.goal.clone(), spec.priority);
            plan.preconditions = spec.preconditions.clone();
            for (i, step) in spec.steps.iter().enumerate() {
                plan.steps.push(step.to_task(&spec.id, i)?);
            }
            library.add_plan(plan)?;
        }
        Ok(library)
    }

    /// The seeded world.
    pub fn world_state(&self) -> WorldState {
        let mut world = WorldState::new();
        for (key, value) in &self.world.variables {
            world.apply(&WorldMutation::Set {
                key: key.clone(),
                value: value.clone(),
            });
        }
        for rel in &self.world.relations {
            world.apply(&WorldMutation::Relate(rel.clone()));
        }
        world
    }

    /// The declared agents, in file order.
    pub fn build_agents(&self) -> ConfigResult<Vec<Agent>> {
        let mut seen = BTreeSet::new();
        let mut agents = Vec::with_capacity(self.agents.len());
        for spec in &self.agents {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateAgent {
                    agent_id: spec.id.clone(),
                });
            }
            let mut agent = Agent::new(spec.id.clone(), spec.config.clone());
            for b in &spec.beliefs {
                agent.beliefs_mut().update(b.key.clone(), b.value.clone(), b.certainty);
            }
            for d in &spec.desires {
                agent.add_desire(d.clone());
            }
            for g in &spec.goals {
                agent.adopt_goal(Goal::new(g.id.clone(), g.description.clone(), g.priority));
            }
            agents.push(agent);
        }
        Ok(agents)
    }

    /// Validate the scenario and assemble a ready-to-run scheduler.
    pub fn build(&self) -> MabosResult<Scheduler> {
        let mut scheduler = Scheduler::new(self.scheduler.clone())
            .with_world(self.world_state())
            .with_plan_library(self.plan_library()?)
            .with_reasoning(self.reasoning_engine()?);
        for agent in self.build_agents()? {
            scheduler.register_agent(agent)?;
        }
        Ok(scheduler)
    }
}

impl StepSpec {
    fn to_task(&self, plan_id: &str, index: usize) -> ConfigResult<Task> {
        let default_id = || format!("{plan_id}.{}", index + 1);
        match self {
            Self::Text(text) => Task::parse(default_id(), text),
            Self::Detailed {
                id,
                description,
                action,
                effects,
            } => {
                let id = id.clone().unwrap_or_else(default_id);
                let action = match action {
                    Some(a) => Some(a.clone()),
                    // Effect-only steps may carry free-text descriptions.
                    None if !effects.is_empty() => Action::parse(description).ok(),
                    None => Some(Action::parse(description)?),
                };
                let mut task = Task::new(id, description.clone());
                task.action = action;
                task.effects = effects.clone();
                Ok(task)
            }
        }
    }
}
