//! Assertions for test validation.
//!
//! The element expectations poll within the session's implicit wait bound,
//! so a state that is never reached fails the test instead of hanging it.

use crate::driver::BrowserDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementRef, Session};
use std::fmt::Debug;

/// Result of an assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// Convert into a `Result`, failing with [`ProbeError::AssertionFailed`]
    ///
    /// # Errors
    ///
    /// Returns error if the assertion did not pass
    pub fn into_result(self) -> ProbeResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(ProbeError::assertion(self.message))
        }
    }
}

/// Assertion helpers for testing
#[derive(Debug)]
pub struct Assertion;

impl Assertion {
    /// Assert two values are equal
    #[must_use]
    pub fn equals<T: PartialEq + Debug + ?Sized>(expected: &T, actual: &T) -> AssertionResult {
        if expected == actual {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected {expected:?}, got {actual:?}"))
        }
    }

    /// Assert a string contains a substring
    #[must_use]
    pub fn contains(haystack: &str, needle: &str) -> AssertionResult {
        if haystack.contains(needle) {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected '{haystack}' to contain '{needle}'"))
        }
    }

    /// Assert a condition is true
    #[must_use]
    pub fn is_true(condition: bool, message: &str) -> AssertionResult {
        if condition {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(message)
        }
    }
}

/// Wait until `element` is displayed.
///
/// # Errors
///
/// Returns [`ProbeError::AssertionFailed`] if it is still hidden when the
/// implicit wait bound elapses, or the driver's error if a query failed.
pub async fn expect_visible<D: BrowserDriver>(
    session: &mut Session<D>,
    element: &ElementRef,
) -> ProbeResult<()> {
    let mut deadline = session.implicit_wait().start();
    loop {
        if session.is_displayed(element).await? {
            return Ok(());
        }
        if !deadline.next_attempt().await {
            return Assertion::is_true(
                false,
                &format!(
                    "expected {element} to be visible within {}ms",
                    deadline.elapsed_ms()
                ),
            )
            .into_result();
        }
    }
}

/// Wait until the rendered text of `element` equals `expected`.
///
/// # Errors
///
/// Returns [`ProbeError::AssertionFailed`] with the last text seen if it
/// never matched within the implicit wait bound.
pub async fn expect_text<D: BrowserDriver>(
    session: &mut Session<D>,
    element: &ElementRef,
    expected: &str,
) -> ProbeResult<()> {
    let mut deadline = session.implicit_wait().start();
    loop {
        let actual = session.text(element).await?;
        let check = Assertion::equals(expected, actual.as_str());
        if check.passed {
            return Ok(());
        }
        if !deadline.next_attempt().await {
            return AssertionResult::fail(format!("text of {element}: {}", check.message))
                .into_result();
        }
    }
}
