//! Ordered collection of auto-scheduler rules.

use crate::model::SchedulerRule;

/// Canonical set of auto-scheduler rules, unique by `id` and sorted
/// ascending by it. Unsaved drafts (`id: None`) sort as 0, deterministically
/// first.
#[derive(Debug, Clone, Default)]
pub struct SchedulerRegistry {
    rules: Vec<SchedulerRule>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[SchedulerRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: Option<u64>) -> Option<&SchedulerRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn add_one(&mut self, rule: SchedulerRule) {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return;
        }
        self.rules.push(rule);
        self.resort();
    }

    /// Batch insert; on duplicate ids the first occurrence wins.
    pub fn add_many(&mut self, rules: Vec<SchedulerRule>) {
        for rule in rules {
            if !self.rules.iter().any(|r| r.id == rule.id) {
                self.rules.push(rule);
            }
        }
        self.resort();
    }

    /// Overwrites every field except `id` on the stored rule with the same
    /// id. No-op when the id is unknown.
    pub fn update(&mut self, rule: &SchedulerRule) -> bool {
        let Some(stored) = self.rules.iter_mut().find(|r| r.id == rule.id) else {
            return false;
        };
        stored.kind = rule.kind;
        stored.data = rule.data.clone();
        stored.chains = rule.chains.clone();
        stored.enabled = rule.enabled;
        self.resort();
        true
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != Some(id));
        self.rules.len() != before
    }

    pub fn reset(&mut self) {
        self.rules.clear();
    }

    fn resort(&mut self) {
        self.rules.sort_by_key(|r| r.sort_key());
    }
}
