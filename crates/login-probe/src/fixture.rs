//! Session fixture: setup, run, guaranteed teardown.
//!
//! Each run launches a fresh driver, hands the test body a [`Session`], and
//! releases the session afterwards on every exit path: `Ok`, `Err`, or a
//! panic inside the body. A panic is re-raised after release so the test
//! runner still reports it.

use crate::driver::{BrowserDriver, MockDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;
use crate::wait::WaitOptions;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

/// Something that can start a browser and hand back a driver for it.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    /// Driver produced by this launcher
    type Driver: BrowserDriver;

    /// Start a browser
    async fn launch(&self) -> ProbeResult<Self::Driver>;
}

/// State of the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    /// No session acquired yet.
    Idle,
    /// A test body is running against a live session.
    SetUp,
    /// The last session was released.
    TornDown,
    /// Setup failed; no session was acquired.
    Failed,
}

/// Acquires one session per test and always releases it.
///
/// # Example
///
/// ```ignore
/// let mut fixture = SessionFixture::new(launcher, WaitOptions::default());
/// fixture
///     .run("valid_login", |session| Box::pin(valid_login(session)))
///     .await?;
/// ```
#[derive(Debug)]
pub struct SessionFixture<L: DriverLauncher> {
    launcher: L,
    implicit_wait: WaitOptions,
    state: FixtureState,
    runs: usize,
}

impl<L: DriverLauncher> SessionFixture<L> {
    /// Create a fixture around a launcher
    #[must_use]
    pub const fn new(launcher: L, implicit_wait: WaitOptions) -> Self {
        Self {
            launcher,
            implicit_wait,
            state: FixtureState::Idle,
            runs: 0,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> FixtureState {
        self.state
    }

    /// Number of sessions acquired so far
    #[must_use]
    pub const fn runs(&self) -> usize {
        self.runs
    }

    /// The launcher
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Set up a session.
    ///
    /// # Errors
    ///
    /// Returns the launcher's error; no session exists afterwards.
    pub async fn setup(&mut self) -> ProbeResult<Session<L::Driver>> {
        match self.launcher.launch().await {
            Ok(driver) => {
                self.state = FixtureState::SetUp;
                self.runs += 1;
                let session = Session::new(driver, self.implicit_wait);
                info!(session = %session.id(), timeout_ms = self.implicit_wait.timeout_ms, "session acquired");
                Ok(session)
            }
            Err(e) => {
                self.state = FixtureState::Failed;
                warn!(error = %e, "session setup failed");
                Err(e)
            }
        }
    }

    /// Release a session obtained from [`SessionFixture::setup`].
    ///
    /// # Errors
    ///
    /// Returns a fixture error if the driver failed to quit.
    pub async fn teardown(&mut self, session: &mut Session<L::Driver>) -> ProbeResult<()> {
        self.state = FixtureState::TornDown;
        let id = session.id();
        session.release().await.map_err(|e| {
            warn!(session = %id, error = %e, "session release failed");
            ProbeError::Fixture {
                message: format!("teardown of session {id} failed: {e}"),
            }
        })?;
        info!(session = %id, "session released");
        Ok(())
    }

    /// Run `body` against a fresh session and release it afterwards.
    ///
    /// The body's error wins over a teardown error; a teardown error alone
    /// fails the run. A panic in the body is re-raised after teardown.
    ///
    /// # Errors
    ///
    /// Returns setup, body, or teardown errors, in that priority.
    pub async fn run<T, F>(&mut self, name: &str, body: F) -> ProbeResult<T>
    where
        F: for<'s> FnOnce(&'s mut Session<L::Driver>) -> BoxFuture<'s, ProbeResult<T>>,
    {
        let mut session = self.setup().await?;
        info!(test = name, session = %session.id(), "running");

        let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;
        let released = self.teardown(&mut session).await;

        match outcome {
            Err(panic) => {
                warn!(test = name, "test body panicked");
                resume_unwind(panic)
            }
            Ok(Err(e)) => {
                info!(test = name, error = %e, "failed");
                Err(e)
            }
            Ok(Ok(value)) => {
                released?;
                info!(test = name, "passed");
                Ok(value)
            }
        }
    }
}

// ============================================================================
// Mock launcher
// ============================================================================

type MockFactory = Arc<dyn Fn() -> ProbeResult<MockDriver> + Send + Sync>;

/// Launches [`MockDriver`]s from a factory closure
#[derive(Clone)]
pub struct MockLauncher {
    factory: MockFactory,
}

impl fmt::Debug for MockLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockLauncher").finish_non_exhaustive()
    }
}

impl MockLauncher {
    /// Build each driver with `factory`
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> ProbeResult<MockDriver> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// A launcher whose every launch fails like a missing browser
    #[must_use]
    pub fn failing() -> Self {
        Self::new(|| Err(ProbeError::BrowserNotFound))
    }
}

#[async_trait]
impl DriverLauncher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(&self) -> ProbeResult<MockDriver> {
        (self.factory)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDom, MockElement, MockPage};
    use crate::locator::Selector;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const URL: &str = "https://test.local/";

    /// A launcher that records each driver's quit counter
    fn tracked_launcher() -> (MockLauncher, Arc<Mutex<Vec<Arc<AtomicUsize>>>>) {
        let counters = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&counters);
        let launcher = MockLauncher::new(move || {
            let dom = MockDom::new().with(MockElement::with_id("present"));
            let driver = MockDriver::new().with_page(URL, MockPage::new(dom));
            seen.lock().unwrap().push(driver.quit_counter());
            Ok(driver)
        });
        (launcher, counters)
    }

    fn total_quits(counters: &Mutex<Vec<Arc<AtomicUsize>>>) -> usize {
        counters
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }

    #[tokio::test]
    async fn test_release_after_pass() {
        let (launcher, counters) = tracked_launcher();
        let mut fixture = SessionFixture::new(launcher, WaitOptions::default());

        let value = fixture
            .run("pass", |s| {
                Box::pin(async move {
                    s.goto(URL).await?;
                    s.find(&Selector::id("present")).await?;
                    Ok(7)
                })
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(total_quits(&counters), 1);
        assert_eq!(fixture.state(), FixtureState::TornDown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_error() {
        let (launcher, counters) = tracked_launcher();
        let mut fixture = SessionFixture::new(launcher, WaitOptions::new().with_timeout(100));

        let err = fixture
            .run("fail", |s| {
                Box::pin(async move {
                    s.goto(URL).await?;
                    s.find(&Selector::id("absent")).await?;
                    Ok(())
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::ElementNotFound { .. }));
        assert_eq!(total_quits(&counters), 1);
    }

    #[tokio::test]
    async fn test_release_after_panic() {
        let (launcher, counters) = tracked_launcher();
        let mut fixture = SessionFixture::new(launcher, WaitOptions::default());

        let outcome = AssertUnwindSafe(fixture.run("boom", |_s| {
            Box::pin(async move {
                let text = String::from("Welcome back!");
                assert_eq!(text, "Goodbye", "assertion inside body");
                Ok(())
            })
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert_eq!(total_quits(&counters), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_acquires_nothing() {
        let mut fixture = SessionFixture::new(MockLauncher::failing(), WaitOptions::default());
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_in_body = Arc::clone(&ran);

        let err = fixture
            .run("never", move |_s| {
                Box::pin(async move {
                    let _ = ran_in_body.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::BrowserNotFound));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.state(), FixtureState::Failed);
        assert_eq!(fixture.runs(), 0);
    }

    fn failing_quit_launcher() -> MockLauncher {
        MockLauncher::new(|| {
            let dom = MockDom::new().with(MockElement::with_id("present"));
            Ok(MockDriver::new()
                .with_page(URL, MockPage::new(dom))
                .with_failing_quit())
        })
    }

    #[tokio::test]
    async fn test_teardown_error_fails_passing_run() {
        let mut fixture = SessionFixture::new(failing_quit_launcher(), WaitOptions::default());

        let err = fixture
            .run("pass", |s| Box::pin(async move { s.goto(URL).await }))
            .await
            .unwrap_err();

        match err {
            ProbeError::Fixture { message } => {
                assert!(message.contains("teardown"), "{message}");
            }
            other => panic!("expected Fixture, got {other}"),
        }
        assert_eq!(fixture.state(), FixtureState::TornDown);
    }

    #[tokio::test]
    async fn test_body_error_wins_over_teardown_error() {
        let mut fixture = SessionFixture::new(failing_quit_launcher(), WaitOptions::default());

        let err = fixture
            .run("fail", |_s| {
                Box::pin(async move { Err::<(), _>(ProbeError::assertion("body")) })
            })
            .await
            .unwrap_err();

        assert!(
            matches!(&err, ProbeError::AssertionFailed { message } if message == "body"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_teardown_error_after_panic_still_panics() {
        let mut fixture = SessionFixture::new(failing_quit_launcher(), WaitOptions::default());

        let outcome = AssertUnwindSafe(fixture.run("boom", |_s| {
            Box::pin(async move {
                let banner = String::from("Invalid email or password");
                assert_eq!(banner, "Welcome back!", "assertion inside body");
                Ok(())
            })
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert_eq!(fixture.state(), FixtureState::TornDown);
    }

    #[tokio::test]
    async fn test_fresh_session_per_run() {
        let (launcher, counters) = tracked_launcher();
        let mut fixture = SessionFixture::new(launcher, WaitOptions::default());

        for _ in 0..3 {
            fixture
                .run("repeat", |s| Box::pin(async move { s.goto(URL).await }))
                .await
                .unwrap();
        }

        assert_eq!(fixture.runs(), 3);
        assert_eq!(counters.lock().unwrap().len(), 3);
        assert_eq!(total_quits(&counters), 3);
    }
}
