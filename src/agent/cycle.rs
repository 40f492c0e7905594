//! Deliberation cycle: Perceive → Revise → Reason → Plan-select → Act.
//!
//! One pass runs per agent per tick. The cycle only reads the world, the
//! plan library and the rule set; everything it wants to change is returned
//! in a [`CycleOutcome`] for the scheduler to apply.

use std::collections::BTreeMap;

use crate::action::Action;
use crate::event::SystemEvent;
use crate::goal::{Desire, DesireStatus, Goal, Intention, IntentionStatus};
use crate::message::{Message, MessageContent, OutboundMessage};
use crate::plan::{PlanLibrary, TaskStatus};
use crate::reason::ReasoningEngine;
use crate::value::Value;
use crate::world::WorldState;

use super::agent::{Agent, ReasoningMode};
use super::executor::TaskEffect;

// ---------------------------------------------------------------------------
// Cycle types
// ---------------------------------------------------------------------------

/// Shared, read-only inputs of a deliberation cycle.
#[derive(Clone, Copy)]
pub struct DeliberationContext<'a> {
    pub world: &'a WorldState,
    pub plans: &'a PlanLibrary,
    pub reasoning: &'a ReasoningEngine,
    pub tick: u64,
}

/// What one agent proposes for the tick.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// World effects in execution order.
    pub effects: Vec<TaskEffect>,
    /// Messages to route at the end of the tick.
    pub outbound: Vec<OutboundMessage>,
    pub events: Vec<SystemEvent>,
    /// Reasoned actions that matched no desire, with their confidence.
    pub candidate_actions: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Cycle implementation
// ---------------------------------------------------------------------------

impl Agent {
    /// Run one deliberation cycle.
    pub fn deliberate(&mut self, ctx: &DeliberationContext<'_>) -> CycleOutcome {
        self.cycle_count += 1;
        let mut out = CycleOutcome::default();

        // ── Perceive ────────────────────────────────────────────────────
        self.perceived = ctx.world.perceive(&self.config.perception);
        let inbox = std::mem::take(&mut self.inbox);

        // ── Revise ──────────────────────────────────────────────────────
        self.revise(&inbox);

        // ── Reason ──────────────────────────────────────────────────────
        self.reason(ctx, &mut out);

        // ── Plan-select ─────────────────────────────────────────────────
        self.select_plans(ctx, &mut out);

        // ── Act ─────────────────────────────────────────────────────────
        self.act(ctx, &mut out);

        tracing::debug!(
            agent = %self.id,
            tick = ctx.tick,
            goals = self.goals.len(),
            intentions = self.intentions.len(),
            effects = out.effects.len(),
            messages = out.outbound.len(),
            "deliberation complete"
        );
        out
    }

    fn revise(&mut self, inbox: &[Message]) {
        let certainty = self.config.perception_certainty;
        for (key, value) in &self.perceived {
            self.beliefs.update(key.clone(), value.clone(), certainty);
        }

        for msg in inbox {
            match &msg.content {
                MessageContent::Inform {
                    key,
                    value,
                    certainty,
                } => {
                    self.beliefs.update(key.clone(), value.clone(), *certainty);
                }
                MessageContent::Request {
                    desire_id,
                    description,
                    priority,
                } => {
                    let known = self.desire(desire_id).is_some() || self.goal(desire_id).is_some();
                    if !known {
                        self.desires
                            .push(Desire::new(desire_id.clone(), description.clone(), *priority));
                    }
                }
                MessageContent::Text { text } => {
                    self.beliefs.update(
                        format!("message.{}", msg.from),
                        Value::String(text.clone()),
                        certainty,
                    );
                }
            }
        }
    }

    fn reason(&mut self, ctx: &DeliberationContext<'_>, out: &mut CycleOutcome) {
        let confidences: BTreeMap<String, f64> = match self.config.reasoning {
            ReasoningMode::Passive => return,
            ReasoningMode::RuleBased => ctx
                .reasoning
                .rule_based_reasoning(&self.beliefs.facts())
                .into_iter()
                .map(|action| (action, 1.0))
                .collect(),
            ReasoningMode::Probabilistic => ctx
                .reasoning
                .probabilistic_reasoning(&self.beliefs.facts(), &self.beliefs.certainties()),
        };

        let threshold = self.config.confidence_threshold;
        let mut triggered: Vec<usize> = Vec::new();
        for (action, confidence) in confidences {
            match self.desires.iter().position(|d| d.id == action) {
                Some(i) => {
                    let d = &self.desires[i];
                    if d.status == DesireStatus::Active
                        && confidence >= threshold
                        && self.goal(&d.id).is_none()
                    {
                        triggered.push(i);
                    }
                }
                None => {
                    out.candidate_actions.insert(action, confidence);
                }
            }
        }

        // Descending priority; stable, so equal priorities keep desire order.
        triggered.sort_by_key(|&i| std::cmp::Reverse(self.desires[i].priority));
        for i in triggered {
            let priority = self.desires[i].priority;
            if self.top_goal_priority().is_some_and(|top| priority <= top) {
                continue;
            }
            self.desires[i].status = DesireStatus::Promoted;
            let goal = self.desires[i].to_goal(ctx.tick);
            out.events.push(SystemEvent::GoalAdopted {
                agent: self.id.clone(),
                goal: goal.id.clone(),
                priority: goal.priority,
            });
            self.goals.push(goal);
        }
    }

    fn select_plans(&mut self, ctx: &DeliberationContext<'_>, out: &mut CycleOutcome) {
        let state = self
            .beliefs
            .satisfied_predicates(self.config.belief_threshold);
        for goal in &self.goals {
            if self.intentions.contains_key(&goal.id) {
                continue;
            }
            match ctx.plans.select_plan(&goal.id, &state) {
                Some(plan) => {
                    out.events.push(SystemEvent::IntentionCommitted {
                        agent: self.id.clone(),
                        goal: goal.id.clone(),
                        plan: plan.id.clone(),
                    });
                    self.intentions.insert(
                        goal.id.clone(),
                        Intention::new(goal.id.clone(), plan.clone(), ctx.tick),
                    );
                }
                None => out.events.push(SystemEvent::PlanNotApplicable {
                    agent: self.id.clone(),
                    goal: goal.id.clone(),
                }),
            }
        }
    }

    /// Goal whose intention runs this tick: highest priority, then earliest
    /// adopted. Held intentions are skipped.
    fn focus(&self) -> Option<String> {
        let mut best: Option<&Goal> = None;
        for goal in &self.goals {
            if !self.intentions.get(&goal.id).is_some_and(Intention::is_runnable) {
                continue;
            }
            if best.is_none_or(|b| goal.priority > b.priority) {
                best = Some(goal);
            }
        }
        best.map(|g| g.id.clone())
    }

    fn act(&mut self, ctx: &DeliberationContext<'_>, out: &mut CycleOutcome) {
        let Some(goal_id) = self.focus() else {
            return;
        };
        // The focused intention runs; any other that was running is preempted.
        for (id, intention) in self.intentions.iter_mut() {
            if *id == goal_id {
                intention.status = IntentionStatus::Active;
            } else if intention.status == IntentionStatus::Active {
                intention.status = IntentionStatus::Suspended;
                tracing::debug!(agent = %self.id, goal = %id, "intention preempted");
            }
        }
        let Some(intention) = self.intentions.get_mut(&goal_id) else {
            return;
        };
        let plan_id = intention.plan.id.clone();

        let Some(index) = intention.plan.next_pending() else {
            // Nothing left to run; a fully completed plan achieves its goal.
            if intention.plan.is_complete() {
                self.achieve(&goal_id, out);
            }
            return;
        };
        intention.plan.set_status(index, TaskStatus::InProgress);
        let task = intention.plan.steps[index].clone();

        match self.executor.execute(&self.id, &task, ctx.world) {
            Ok(effects) => {
                if let Some(intention) = self.intentions.get_mut(&goal_id) {
                    intention.plan.set_status(index, TaskStatus::Completed);
                }
                for effect in effects {
                    match effect {
                        TaskEffect::Act(Action::Communicate { recipient, content }) => {
                            out.outbound.push(OutboundMessage {
                                to: recipient,
                                content,
                            });
                        }
                        other => out.effects.push(other),
                    }
                }
                out.events.push(SystemEvent::TaskCompleted {
                    agent: self.id.clone(),
                    goal: goal_id.clone(),
                    plan: plan_id,
                    task: task.id,
                });
                let complete = self
                    .intentions
                    .get(&goal_id)
                    .is_some_and(|i| i.plan.is_complete());
                if complete {
                    self.achieve(&goal_id, out);
                }
            }
            Err(err) => {
                tracing::warn!(
                    agent = %self.id,
                    goal = %goal_id,
                    plan = %plan_id,
                    task = %task.id,
                    error = %err,
                    "task failed, aborting intention"
                );
                if let Some(mut intention) = self.intentions.remove(&goal_id) {
                    intention.plan.set_status(index, TaskStatus::Failed);
                    intention.status = IntentionStatus::Failed;
                    self.retired.insert(goal_id.clone(), intention);
                }
                out.events.push(SystemEvent::IntentionAborted {
                    agent: self.id.clone(),
                    goal: goal_id.clone(),
                    plan: plan_id,
                    task: task.id,
                    reason: err.to_string(),
                });
                self.record_failure(&goal_id, out);
            }
        }
    }

    fn achieve(&mut self, goal_id: &str, out: &mut CycleOutcome) {
        if let Some(mut intention) = self.intentions.remove(goal_id) {
            intention.status = IntentionStatus::Completed;
            self.retired.insert(goal_id.to_string(), intention);
        }
        if let Some(pos) = self.goals.iter().position(|g| g.id == goal_id) {
            let mut goal = self.goals.remove(pos);
            goal.is_achieved = true;
            tracing::info!(agent = %self.id, goal = %goal.id, "goal achieved");
            out.events.push(SystemEvent::GoalAchieved {
                agent: self.id.clone(),
                goal: goal.id.clone(),
            });
            self.achieved.push(goal);
        }
    }

    fn record_failure(&mut self, goal_id: &str, out: &mut CycleOutcome) {
        let limit = self.config.max_plan_failures;
        let Some(pos) = self.goals.iter().position(|g| g.id == goal_id) else {
            return;
        };
        self.goals[pos].failures += 1;
        let failures = self.goals[pos].failures;
        if limit.is_some_and(|max| failures >= max) {
            self.goals.remove(pos);
            tracing::warn!(agent = %self.id, goal = %goal_id, failures, "goal abandoned");
            out.events.push(SystemEvent::GoalAbandoned {
                agent: self.id.clone(),
                goal: goal_id.to_string(),
                failures,
            });
        }
    }
}
