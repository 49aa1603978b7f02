//! Test harness for running the login cases as a suite.
//!
//! Every case gets its own session from the fixture. A failing or panicking
//! case is recorded and the suite moves on unless fail-fast is set.

use crate::fixture::{DriverLauncher, SessionFixture};
use crate::login::LoginCase;
use crate::result::ProbeResult;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::info;

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Test duration
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl TestResult {
    /// Create a passing test result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Create a failing test result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            duration: Duration::ZERO,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Results from running a test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual test results
    pub results: Vec<TestResult>,
    /// Total duration
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all tests passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// One-line summary, e.g. `login: 1 passed, 1 failed (2 total)`
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed ({} total)",
            self.suite_name,
            self.passed_count(),
            self.failed_count(),
            self.total()
        )
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Test harness for running suites
#[derive(Debug, Default)]
pub struct TestHarness {
    /// Whether to stop on first failure
    pub fail_fast: bool,
}

impl TestHarness {
    /// Create a new test harness
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable fail-fast mode
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Run `cases` in order, each in a fresh session from `fixture`
    pub async fn run<L: DriverLauncher>(
        &self,
        suite_name: &str,
        cases: &[LoginCase],
        fixture: &mut SessionFixture<L>,
    ) -> SuiteResults {
        let suite_start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());

        for &case in cases {
            let start = Instant::now();
            let outcome = AssertUnwindSafe(
                fixture.run(case.name(), move |session| Box::pin(case.run(session))),
            )
            .catch_unwind()
            .await;

            let result = match outcome {
                Ok(Ok(())) => TestResult::pass(case.name()),
                Ok(Err(e)) => TestResult::fail(case.name(), e.to_string()),
                Err(panic) => TestResult::fail(case.name(), panic_message(panic.as_ref())),
            }
            .with_duration(start.elapsed());

            let stop = self.fail_fast && !result.passed;
            results.push(result);
            if stop {
                break;
            }
        }

        let suite = SuiteResults {
            suite_name: suite_name.to_string(),
            results,
            duration: suite_start.elapsed(),
        };
        info!(summary = %suite.summary(), "suite finished");
        suite
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
