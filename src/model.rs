//! In-memory test results. Built once by the parser, only read afterwards.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Passed => "PASSED",
            Status::Failed => "FAILED",
            Status::Errored => "ERROR",
            Status::Skipped => "SKIPPED",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::Errored)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub classname: String,
    /// Seconds.
    pub time: f64,
    pub status: Status,
    /// Set for every status except `Passed`.
    pub message: Option<String>,
    /// Marker text of a failed or errored case, verbatim. May be empty.
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub tests: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
    pub time: f64,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// Derived from the declared counts, not from `cases`.
    pub fn passed(&self) -> u32 {
        passed_of(self.tests, self.failures, self.errors, self.skipped)
    }

    pub fn failing_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter().filter(|c| c.status.is_failure())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSummary {
    pub suites: Vec<TestSuite>,
}

impl ReportSummary {
    pub fn totals(&self) -> Totals {
        self.suites.iter().fold(
            Totals {
                suites: self.suites.len(),
                ..Totals::default()
            },
            |mut acc, s| {
                acc.tests += u64::from(s.tests);
                acc.failures += u64::from(s.failures);
                acc.errors += u64::from(s.errors);
                acc.skipped += u64::from(s.skipped);
                acc.time += s.time;
                acc
            },
        )
    }
}

/// Aggregate counts across all suites.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub suites: usize,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub time: f64,
}

impl Totals {
    pub fn passed(&self) -> u64 {
        self.tests
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
            .saturating_sub(self.skipped)
    }

    /// Percentage in `0.0..=100.0`; zero when there are no tests.
    pub fn success_rate(&self) -> f64 {
        if self.tests == 0 {
            return 0.0;
        }
        (self.passed() as f64 * 100.0) / self.tests as f64
    }
}

fn passed_of(tests: u32, failures: u32, errors: u32, skipped: u32) -> u32 {
    tests
        .saturating_sub(failures)
        .saturating_sub(errors)
        .saturating_sub(skipped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    High,
    Medium,
    Low,
}

impl RateTier {
    pub fn classify(rate: f64) -> Self {
        if rate >= 95.0 {
            RateTier::High
        } else if rate >= 80.0 {
            RateTier::Medium
        } else {
            RateTier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite(name: &str, tests: u32, failures: u32, errors: u32, skipped: u32) -> TestSuite {
        TestSuite {
            name: name.to_string(),
            tests,
            failures,
            errors,
            skipped,
            time: 1.5,
            cases: Vec::new(),
        }
    }

    #[test]
    fn passed_and_rate_come_from_declared_counts() {
        let summary = ReportSummary {
            suites: vec![suite("s", 10, 2, 1, 1)],
        };
        let totals = summary.totals();
        assert_eq!(totals.passed(), 6);
        assert_eq!(totals.success_rate(), 60.0);
        assert_eq!(RateTier::classify(totals.success_rate()), RateTier::Low);
        assert_eq!(summary.suites[0].passed(), 6);
    }

    #[test]
    fn zero_tests_means_zero_rate() {
        let summary = ReportSummary {
            suites: vec![suite("empty", 0, 0, 0, 0)],
        };
        assert_eq!(summary.totals().success_rate(), 0.0);
        assert_eq!(ReportSummary::default().totals().success_rate(), 0.0);
    }

    #[test]
    fn totals_sum_across_suites() {
        let summary = ReportSummary {
            suites: vec![suite("A", 5, 1, 0, 0), suite("B", 3, 0, 1, 1)],
        };
        let totals = summary.totals();
        assert_eq!(totals.suites, 2);
        assert_eq!(totals.tests, 8);
        assert_eq!(totals.failures, 1);
        assert_eq!(totals.errors, 1);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.passed(), 5);
        assert!((totals.time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn inconsistent_counts_do_not_underflow() {
        let s = suite("liar", 2, 3, 1, 0);
        assert_eq!(s.passed(), 0);
        let summary = ReportSummary { suites: vec![s] };
        assert_eq!(summary.totals().passed(), 0);
        assert_eq!(summary.totals().success_rate(), 0.0);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(RateTier::classify(100.0), RateTier::High);
        assert_eq!(RateTier::classify(95.0), RateTier::High);
        assert_eq!(RateTier::classify(94.9), RateTier::Medium);
        assert_eq!(RateTier::classify(80.0), RateTier::Medium);
        assert_eq!(RateTier::classify(79.99), RateTier::Low);
        assert_eq!(RateTier::classify(0.0), RateTier::Low);

        let exact = ReportSummary {
            suites: vec![suite("s", 20, 1, 0, 0)],
        };
        assert_eq!(
            RateTier::classify(exact.totals().success_rate()),
            RateTier::High
        );
    }

    #[test]
    fn status_labels_and_failure_flag() {
        assert_eq!(Status::Errored.label(), "ERROR");
        assert_eq!(Status::Passed.label(), "PASSED");
        assert!(Status::Failed.is_failure());
        assert!(Status::Errored.is_failure());
        assert!(!Status::Skipped.is_failure());
        assert!(!Status::Passed.is_failure());
    }
}
