use std::collections::HashMap;

use serde::Serialize;

/// Counters maintained by the task handler, serializable for dumps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// `execute` calls by task kind.
    pub tasks_executed: HashMap<String, u64>,
    /// Tasks that reached a terminal status, by kind.
    pub tasks_finished: HashMap<String, u64>,
    /// Observer notifications delivered.
    pub notifications: u64,
    pub halts: u64,
    pub resumes: u64,
    /// Scheduling passes started.
    pub passes: u64,
    /// Tasks force-removed.
    pub removals: u64,
}

impl SchedulerMetrics {
    pub fn record_execution(&mut self, kind: &str) {
        *self.tasks_executed.entry(kind.to_string()).or_default() += 1;
    }

    pub fn record_finished(&mut self, kind: &str) {
        *self.tasks_finished.entry(kind.to_string()).or_default() += 1;
    }

    pub fn executions(&self, kind: &str) -> u64 {
        self.tasks_executed.get(kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_executions_by_kind() {
        let mut m = SchedulerMetrics::default();
        m.record_execution("build_unit");
        m.record_execution("build_unit");
        m.record_execution("move_close_to");

        assert_eq!(m.executions("build_unit"), 2);
        assert_eq!(m.executions("move_close_to"), 1);
        assert_eq!(m.executions("sequence"), 0);
    }

    #[test]
    fn default_metrics() {
        let m = SchedulerMetrics::default();
        assert_eq!(m.passes, 0);
        assert_eq!(m.notifications, 0);
        assert!(m.tasks_executed.is_empty());
    }
}
