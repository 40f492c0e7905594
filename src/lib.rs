// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # mabos
//!
//! A Belief-Desire-Intention (BDI) deliberation kernel for multi-agent systems.
//!
//! ## Architecture
//!
//! - **Beliefs** (`belief`): per-agent certainty-weighted facts with noisy-OR revision
//! - **Reasoning** (`reason`): condition → action rules, rule-based and probabilistic
//! - **Plans** (`plan`): goal-indexed plan library with preconditions and priority
//! - **Agents** (`agent`): Perceive → Revise → Reason → Plan-select → Act, once per tick
//! - **Scheduler** (`scheduler`): lock-step ticks, serial apply barrier, message routing
//! - **Scenarios** (`scenario`): whole systems authored in TOML
//!
//! ## Library usage
//!
//! ```
//! use mabos::agent::{Agent, AgentConfig};
//! use mabos::goal::Desire;
//! use mabos::plan::{Plan, Task};
//! use mabos::scheduler::Scheduler;
//! use mabos::world::WorldMutation;
//! use serde_json::json;
//!
//! let mut system = Scheduler::default();
//! system.world_mut().unwrap().apply(&WorldMutation::Set { key: "temperature".into(), value: json!(34) });
//! system.reasoning_mut().unwrap().add_rule("temperature > 30", "cool_down", 0.9).unwrap();
//! system
//!     .plan_library_mut()
//!     .unwrap()
//!     .add_plan(Plan::new("vent", "cool_down", 1).with_step(Task::parse("t1", "Use fan").unwrap()))
//!     .unwrap();
//!
//! let mut hvac = Agent::new("hvac", AgentConfig::default());
//! hvac.add_desire(Desire::new("cool_down", "keep the room cool", 5));
//! system.register_agent(hvac).unwrap();
//!
//! system.step();
//! assert_eq!(system.world().get("hvac.last_tool"), Some(&json!("fan")));
//! ```

pub mod action;
pub mod agent;
pub mod belief;
pub mod error;
pub mod event;
pub mod goal;
pub mod knowledge;
pub mod message;
pub mod plan;
pub mod reason;
pub mod scenario;
pub mod scheduler;
pub mod value;
pub mod world;
