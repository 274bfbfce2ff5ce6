use crate::core::{Finding, Severity, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeveritySummary {
    pub const fn total(self) -> usize {
        self.critical + self.warning + self.info
    }

    pub const fn has_critical(self) -> bool {
        self.critical > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindingLog {
    findings: Vec<Finding>,
    critical: usize,
    warning: usize,
    info: usize,
}

impl FindingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        stage: Stage,
        severity: Severity,
        message: impl Into<String>,
        remedy: Option<String>,
    ) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
        self.findings.push(Finding {
            stage,
            severity,
            message: message.into(),
            remedy,
        });
    }

    pub fn summary(&self) -> SeveritySummary {
        SeveritySummary {
            critical: self.critical,
            warning: self.warning,
            info: self.info,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_stay_in_lockstep_with_appends() {
        let mut log = FindingLog::new();
        assert_eq!(log.summary().total(), 0);

        log.record(Stage::System, Severity::Critical, "a", None);
        log.record(Stage::Packages, Severity::Warning, "b", Some("c".to_string()));
        log.record(Stage::Packages, Severity::Warning, "d", None);
        log.record(Stage::Containers, Severity::Info, "e", None);

        let summary = log.summary();
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.warning, 2);
        assert_eq!(summary.info, 1);
        assert_eq!(summary.total(), log.len());
        assert!(summary.has_critical());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut log = FindingLog::new();
        log.record(Stage::Toolchains, Severity::Info, "first", None);
        log.record(Stage::System, Severity::Critical, "second", None);

        let messages: Vec<&str> = log.findings().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn counter_invariant_holds_at_every_point() {
        let mut log = FindingLog::new();
        for i in 0..20 {
            let severity = match i % 3 {
                0 => Severity::Critical,
                1 => Severity::Warning,
                _ => Severity::Info,
            };
            log.record(Stage::Processes, severity, format!("f{i}"), None);

            let summary = log.summary();
            let by_count = |s: Severity| log.findings().iter().filter(|f| f.severity == s).count();
            assert_eq!(summary.critical, by_count(Severity::Critical));
            assert_eq!(summary.warning, by_count(Severity::Warning));
            assert_eq!(summary.info, by_count(Severity::Info));
            assert_eq!(summary.total(), log.len());
        }
    }
}
