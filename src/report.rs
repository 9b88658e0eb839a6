//! Progress Reporting
//!
//! Operations talk to a `Reporter` instead of a global logger so callers
//! decide where messages go.

use parking_lot::Mutex;

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Error,
}

/// Keeps every message in memory, in order
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<(ReportLevel, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ReportLevel, String)> {
        self.lines.lock().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.at_level(ReportLevel::Info)
    }

    pub fn errors(&self) -> Vec<String> {
        self.at_level(ReportLevel::Error)
    }

    fn at_level(&self, level: ReportLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.lines.lock().push((ReportLevel::Info, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push((ReportLevel::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_keeps_order_and_level() {
        let reporter = MemoryReporter::new();
        reporter.info("one");
        reporter.error("two");
        reporter.info("three");

        assert_eq!(reporter.infos(), vec!["one", "three"]);
        assert_eq!(reporter.errors(), vec!["two"]);
        assert_eq!(reporter.lines()[1], (ReportLevel::Error, "two".to_string()));
    }
}
