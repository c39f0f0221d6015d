use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Counters accumulated by the command interpreter.
#[derive(Debug, Default, Clone)]
pub struct InterpreterMetrics {
    commands: u64,
    validation_failures: u64,
    handler_failures: u64,
    primitives: u64,
    queue_drains: u64,
}

impl InterpreterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&mut self) {
        self.commands = self.commands.saturating_add(1);
    }

    pub fn record_validation_failure(&mut self) {
        self.validation_failures = self.validation_failures.saturating_add(1);
    }

    pub fn record_handler_failure(&mut self) {
        self.handler_failures = self.handler_failures.saturating_add(1);
    }

    pub fn record_primitives(&mut self, count: usize) {
        self.primitives = self.primitives.saturating_add(count as u64);
    }

    pub fn record_queue_drain(&mut self) {
        self.queue_drains = self.queue_drains.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            commands: self.commands,
            validation_failures: self.validation_failures,
            handler_failures: self.handler_failures,
            primitives: self.primitives,
            queue_drains: self.queue_drains,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub commands: u64,
    pub validation_failures: u64,
    pub handler_failures: u64,
    pub primitives: u64,
    pub queue_drains: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "interpreter_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("commands".to_string(), json!(self.commands));
        map.insert(
            "validation_failures".to_string(),
            json!(self.validation_failures),
        );
        map.insert("handler_failures".to_string(), json!(self.handler_failures));
        map.insert("primitives".to_string(), json!(self.primitives));
        map.insert("queue_drains".to_string(), json!(self.queue_drains));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let mut metrics = InterpreterMetrics::new();
        metrics.record_command();
        metrics.record_command();
        metrics.record_handler_failure();
        metrics.record_primitives(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands, 2);
        assert_eq!(snapshot.handler_failures, 1);
        assert_eq!(snapshot.primitives, 5);

        let event = snapshot.to_log_event("chalkboard::metrics");
        assert_eq!(event.message, "interpreter_metrics");
        assert_eq!(event.field("primitives"), Some(&json!(5)));
    }
}
