//! login-probe: end-to-end tests for a web login form.
//!
//! Drives a browser through the login page and asserts on what it renders:
//! valid credentials reach a "Welcome back!" banner, invalid ones reach an
//! error banner. Each test runs in its own browser session, released on every
//! exit path.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ LoginCase  │    │ Session    │    │ Browser    │            │
//! │   │ + fixture  │───►│ (implicit  │───►│ Driver     │──► chromium│
//! │   │            │    │  wait)     │    │ (trait)    │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Real browser control needs the `browser` feature; without it the scripted
//! [`MockDriver`] page stands in for the live site.

#![warn(missing_docs)]

mod assertion;
mod browser;
mod config;
#[allow(clippy::missing_errors_doc)]
mod driver;
mod fixture;
mod harness;
mod locator;
mod login;
/// Tracing subscriber setup
pub mod logging;
mod result;
mod session;
mod wait;

pub use assertion::{expect_text, expect_visible, Assertion, AssertionResult};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumLauncher};
pub use browser::BrowserConfig;
pub use config::{
    ProbeConfig, ENV_CHROMIUM_PATH, ENV_HEADLESS, ENV_IMPLICIT_WAIT_MS, ENV_NO_SANDBOX,
};
pub use driver::{
    BrowserDriver, ClickHandler, ElementId, MockDom, MockDriver, MockElement, MockPage,
};
pub use fixture::{DriverLauncher, FixtureState, MockLauncher, SessionFixture};
pub use harness::{SuiteResults, TestHarness, TestResult};
pub use locator::Selector;
pub use login::{
    invalid_credentials, selectors, valid_login, Credentials, LoginCase, LoginPage,
    ScriptedLoginPage, LOGIN_URL, WELCOME_TEXT,
};
pub use result::{ProbeError, ProbeResult};
pub use session::{ElementRef, Session};
pub use wait::{Deadline, WaitOptions, DEFAULT_IMPLICIT_WAIT_MS, DEFAULT_POLL_INTERVAL_MS};
