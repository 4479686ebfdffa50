// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Feedback learner
//!
//! The only writer of the association table. A successful interaction
//! reinforces every (context keyword, helpful module) pair by one learning-rate
//! step; a failed one weakens the same pairs. Modules not marked helpful are
//! left alone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::association::{AssociationTable, WeightChange};
use crate::domain::context::ContextState;
use crate::domain::module::ModuleId;

/// Outcome signal for one interaction. Consumed once, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub interaction_id: String,
    pub success: bool,

    #[serde(default)]
    pub helpful_modules: Vec<ModuleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub interaction_id: String,
    pub success: bool,
    pub changes: Vec<WeightChange>,

    /// Helpful ids that are not in the registry
    pub ignored_modules: Vec<ModuleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetrics {
    pub total_interactions: u64,
    pub successful_interactions: u64,
    pub success_rate: f64,
    pub learned_associations: usize,

    /// Keyword -> modules at or above the suggestion threshold
    pub associations: BTreeMap<String, Vec<ModuleId>>,
}

#[derive(Debug, Clone)]
pub struct FeedbackLearner {
    learning_rate: f64,
    total_interactions: u64,
    successful_interactions: u64,
}

impl FeedbackLearner {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            total_interactions: 0,
            successful_interactions: 0,
        }
    }

    /// Apply one interaction's feedback against the active context.
    /// `is_known` filters out module ids the registry does not recognise.
    pub fn record_feedback(
        &mut self,
        associations: &mut AssociationTable,
        context: &ContextState,
        record: &InteractionRecord,
        is_known: impl Fn(&ModuleId) -> bool,
    ) -> FeedbackOutcome {
        self.total_interactions += 1;
        if record.success {
            self.successful_interactions += 1;
        }

        let mut helpful: Vec<&ModuleId> = Vec::new();
        let mut ignored_modules = Vec::new();
        for module_id in &record.helpful_modules {
            if !is_known(module_id) {
                warn!(
                    interaction_id = %record.interaction_id,
                    module_id = %module_id,
                    "Ignoring feedback for unknown module"
                );
                ignored_modules.push(module_id.clone());
            } else if !helpful.contains(&module_id) {
                helpful.push(module_id);
            }
        }

        let mut changes = Vec::new();
        for keyword in context.keywords() {
            for module_id in &helpful {
                let change = if record.success {
                    associations.reinforce(keyword, module_id, self.learning_rate)
                } else {
                    associations.weaken(keyword, module_id, self.learning_rate)
                };
                debug!(
                    keyword = %change.keyword,
                    module_id = %change.module_id,
                    old_weight = change.old_weight,
                    new_weight = change.new_weight,
                    "Association adjusted"
                );
                changes.push(change);
            }
        }

        FeedbackOutcome {
            interaction_id: record.interaction_id.clone(),
            success: record.success,
            changes,
            ignored_modules,
        }
    }

    pub fn metrics(&self, associations: &AssociationTable, min_weight: f64) -> LearningMetrics {
        let success_rate = if self.total_interactions == 0 {
            0.0
        } else {
            self.successful_interactions as f64 / self.total_interactions as f64
        };

        LearningMetrics {
            total_interactions: self.total_interactions,
            successful_interactions: self.successful_interactions,
            success_rate,
            learned_associations: associations.learned_pairs(),
            associations: associations.associations(min_weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(keywords: &[&str]) -> ContextState {
        ContextState::new(
            Some("programming".to_string()),
            Some(keywords.iter().map(|k| k.to_string()).collect()),
            None,
        )
    }

    fn record(success: bool, helpful: &[&str]) -> InteractionRecord {
        InteractionRecord {
            interaction_id: "int-1".to_string(),
            success,
            helpful_modules: helpful.iter().map(|m| ModuleId::from(*m)).collect(),
        }
    }

    #[test]
    fn test_success_reinforces_each_keyword() {
        let mut learner = FeedbackLearner::new(0.1);
        let mut table = AssociationTable::new();
        let ctx = context(&["python", "debug"]);

        let outcome = learner.record_feedback(&mut table, &ctx, &record(true, &["debugging_tools"]), |_| true);

        assert_eq!(outcome.changes.len(), 2);
        let id = ModuleId::from("debugging_tools");
        assert!((table.weight("python", &id) - 0.1).abs() < 1e-9);
        assert!((table.weight("debug", &id) - 0.1).abs() < 1e-9);
        assert_eq!(table.weight("python", &ModuleId::from("python_expertise")), 0.0);
    }

    #[test]
    fn test_failure_weakens_and_floors() {
        let mut learner = FeedbackLearner::new(0.1);
        let mut table = AssociationTable::new();
        let ctx = context(&["python"]);
        let id = ModuleId::from("python_expertise");

        learner.record_feedback(&mut table, &ctx, &record(true, &["python_expertise"]), |_| true);
        learner.record_feedback(&mut table, &ctx, &record(true, &["python_expertise"]), |_| true);
        learner.record_feedback(&mut table, &ctx, &record(false, &["python_expertise"]), |_| true);
        assert!((table.weight("python", &id) - 0.1).abs() < 1e-9);

        learner.record_feedback(&mut table, &ctx, &record(false, &["python_expertise"]), |_| true);
        learner.record_feedback(&mut table, &ctx, &record(false, &["python_expertise"]), |_| true);
        assert_eq!(table.weight("python", &id), 0.0);
    }

    #[test]
    fn test_unknown_and_duplicate_modules() {
        let mut learner = FeedbackLearner::new(0.1);
        let mut table = AssociationTable::new();
        let ctx = context(&["web"]);

        let outcome = learner.record_feedback(
            &mut table,
            &ctx,
            &record(true, &["html_css", "ghost", "html_css"]),
            |id| id.as_str() != "ghost",
        );

        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.ignored_modules, vec![ModuleId::from("ghost")]);
        assert_eq!(table.weight("web", &ModuleId::from("ghost")), 0.0);
    }

    #[test]
    fn test_no_context_no_changes() {
        let mut learner = FeedbackLearner::new(0.1);
        let mut table = AssociationTable::new();

        let outcome = learner.record_feedback(
            &mut table,
            &ContextState::default(),
            &record(true, &["html_css"]),
            |_| true,
        );

        assert!(outcome.changes.is_empty());
        assert_eq!(learner.metrics(&table, 0.25).total_interactions, 1);
    }

    #[test]
    fn test_metrics() {
        let mut learner = FeedbackLearner::new(0.2);
        let mut table = AssociationTable::new();
        let ctx = context(&["story"]);

        learner.record_feedback(&mut table, &ctx, &record(true, &["creative_writer"]), |_| true);
        learner.record_feedback(&mut table, &ctx, &record(true, &["creative_writer"]), |_| true);
        learner.record_feedback(&mut table, &ctx, &record(false, &[]), |_| true);

        let metrics = learner.metrics(&table, 0.25);
        assert_eq!(metrics.total_interactions, 3);
        assert_eq!(metrics.successful_interactions, 2);
        assert!((metrics.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.learned_associations, 1);
        assert_eq!(metrics.associations["story"], vec![ModuleId::from("creative_writer")]);
    }

    #[test]
    fn test_metrics_without_interactions() {
        let learner = FeedbackLearner::new(0.1);
        let metrics = learner.metrics(&AssociationTable::new(), 0.25);
        assert_eq!(metrics.success_rate, 0.0);
        assert!(metrics.associations.is_empty());
    }
}
