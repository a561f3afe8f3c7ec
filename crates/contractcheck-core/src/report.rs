//! Reporter: collects outcomes and renders the run summary

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outcome::{SkippedCase, TestOutcome};

/// Exit code when every case passed.
pub const EXIT_PASS: u8 = 0;
/// Exit code when at least one case failed.
pub const EXIT_FAIL: u8 = 1;
/// Exit code when no case ran or the run aborted.
pub const EXIT_ERROR: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.total == 0 {
            EXIT_ERROR
        } else if self.failed > 0 {
            EXIT_FAIL
        } else {
            EXIT_PASS
        }
    }
}

/// Serializable run result (`--output json`, `summary.json`, `failures.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub summary: Summary,
    pub outcomes: Vec<TestOutcome>,
    #[serde(default)]
    pub skipped: Vec<SkippedCase>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Accumulates outcomes. Each case id is recorded at most once.
#[derive(Debug, Default)]
pub struct Reporter {
    outcomes: Vec<TestOutcome>,
    skipped: Vec<SkippedCase>,
    seen: HashSet<String>,
}

impl Reporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome`. Returns `false` if its id was already recorded.
    pub fn record(&mut self, outcome: TestOutcome) -> bool {
        if !self.seen.insert(outcome.id.clone()) {
            return false;
        }
        self.outcomes.push(outcome);
        true
    }

    pub fn record_skip(&mut self, skipped: SkippedCase) {
        self.skipped.push(skipped);
    }

    #[must_use]
    pub fn summarize(&self) -> Summary {
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        Summary {
            total: self.outcomes.len(),
            passed,
            failed: self.outcomes.len() - passed,
            skipped: self.skipped.len(),
        }
    }

    #[must_use]
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedCase] {
        &self.skipped
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Summary line plus an expected-vs-actual diff for every failure.
    #[must_use]
    pub fn render_terminal(&self) -> String {
        let summary = self.summarize();
        let mut lines = Vec::new();

        let icon = match summary.exit_code() {
            EXIT_PASS => "PASS",
            EXIT_FAIL => "FAIL",
            _ => "ERROR",
        };
        lines.push(format!(
            "{icon}: {} total, {} passed, {} failed, {} skipped",
            summary.total, summary.passed, summary.failed, summary.skipped
        ));

        let failures: Vec<&TestOutcome> = self.failures().collect();
        if !failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failures ({}):", failures.len()));
        }
        for outcome in failures {
            let kind = outcome
                .violation
                .map_or_else(|| outcome.suite.to_string(), |v| format!("{} / {v}", outcome.suite));
            lines.push(format!("  {} [{kind}]", outcome.endpoint));
            if let Some(failure) = &outcome.failure {
                lines.push(format!("    reason: {failure}"));
            }
            if !outcome.expected_status.is_empty() {
                let expected: Vec<String> =
                    outcome.expected_status.iter().map(u16::to_string).collect();
                let actual = outcome
                    .status
                    .map_or_else(|| "none".to_string(), |s| s.to_string());
                lines.push(format!("    - status {}", expected.join("|")));
                lines.push(format!("    + status {actual}"));
            }
            for expected in &outcome.expected_errors {
                let code = expected.code.as_deref().unwrap_or("-");
                lines.push(format!("    - [{code}] {}", expected.needle()));
            }
            for actual in &outcome.actual_errors {
                lines.push(format!(
                    "    + [{}] {}",
                    actual.code.as_deref().unwrap_or("-"),
                    actual
                        .title
                        .as_deref()
                        .or(actual.description.as_deref())
                        .unwrap_or("")
                ));
            }
        }

        if !self.skipped.is_empty() {
            lines.push(String::new());
            lines.push(format!("Skipped ({}):", self.skipped.len()));
            for skip in &self.skipped {
                lines.push(format!("  {} [{}]: {}", skip.endpoint, skip.suite, skip.reason));
            }
        }

        lines.join("\n")
    }

    #[must_use]
    pub fn into_report(self) -> RunReport {
        let summary = self.summarize();
        RunReport {
            summary,
            outcomes: self.outcomes,
            skipped: self.skipped,
        }
    }
}
