//! A browser session with an implicit wait bound on element lookups.

use crate::driver::{BrowserDriver, ElementId};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitOptions;
use std::fmt;
use tracing::{debug, trace};
use uuid::Uuid;

/// An element located by a [`Session`].
///
/// Carries the selector that found it so failures can name what was looked
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Driver handle
    pub id: ElementId,
    /// Selector that located the element
    pub selector: Selector,
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.selector, self.id)
    }
}

/// Exclusive owner of one browser driver for the length of a test.
///
/// Lookups via [`Session::find`] retry until the implicit wait bound elapses.
/// Every other command is issued once.
#[derive(Debug)]
pub struct Session<D: BrowserDriver> {
    id: Uuid,
    driver: D,
    implicit_wait: WaitOptions,
    released: bool,
}

impl<D: BrowserDriver> Session<D> {
    /// Wrap a launched driver
    #[must_use]
    pub fn new(driver: D, implicit_wait: WaitOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver,
            implicit_wait,
            released: false,
        }
    }

    /// Session id, used to correlate log lines
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The implicit wait bound
    #[must_use]
    pub const fn implicit_wait(&self) -> &WaitOptions {
        &self.implicit_wait
    }

    /// Change the implicit wait bound
    pub fn set_implicit_wait(&mut self, options: WaitOptions) {
        self.implicit_wait = options;
    }

    /// Whether [`Session::release`] has run
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Borrow the underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Consume the session, returning the driver
    #[must_use]
    pub fn into_driver(self) -> D {
        self.driver
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.released {
            Err(ProbeError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Navigate to URL
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    pub async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        debug!(session = %self.id, url, "navigate");
        self.driver.navigate(url).await
    }

    /// Get current URL
    ///
    /// # Errors
    ///
    /// Returns error if the driver cannot report it
    pub async fn current_url(&mut self) -> ProbeResult<String> {
        self.ensure_open()?;
        self.driver.current_url().await
    }

    /// Locate the first element matching `selector`, retrying until the
    /// implicit wait bound elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ElementNotFound`] if nothing matched in time, or
    /// the driver's error if a query itself failed.
    pub async fn find(&mut self, selector: &Selector) -> ProbeResult<ElementRef> {
        self.ensure_open()?;
        let mut deadline = self.implicit_wait.start();
        loop {
            if let Some(&id) = self.driver.find_all(selector).await?.first() {
                debug!(
                    session = %self.id,
                    %selector,
                    attempts = deadline.attempts() + 1,
                    "found element"
                );
                return Ok(ElementRef {
                    id,
                    selector: selector.clone(),
                });
            }
            trace!(session = %self.id, %selector, "no match yet");
            if !deadline.next_attempt().await {
                debug!(session = %self.id, %selector, waited_ms = deadline.elapsed_ms(), "lookup expired");
                return Err(ProbeError::ElementNotFound {
                    selector: selector.to_string(),
                    waited_ms: deadline.elapsed_ms(),
                });
            }
        }
    }

    /// Locate every element matching `selector`, waiting until at least one
    /// exists. An expired wait yields an empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if a query failed
    pub async fn find_all(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementRef>> {
        self.ensure_open()?;
        let mut deadline = self.implicit_wait.start();
        loop {
            let ids = self.driver.find_all(selector).await?;
            if !ids.is_empty() || !deadline.next_attempt().await {
                return Ok(ids
                    .into_iter()
                    .map(|id| ElementRef {
                        id,
                        selector: selector.clone(),
                    })
                    .collect());
            }
        }
    }

    /// Type text into element
    ///
    /// # Errors
    ///
    /// Returns error if the element cannot receive input
    pub async fn send_keys(&mut self, element: &ElementRef, text: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        debug!(session = %self.id, %element, chars = text.chars().count(), "send keys");
        self.driver.send_keys(element.id, text).await
    }

    /// Click element
    ///
    /// # Errors
    ///
    /// Returns error if the element cannot be clicked
    pub async fn click(&mut self, element: &ElementRef) -> ProbeResult<()> {
        self.ensure_open()?;
        debug!(session = %self.id, %element, "click");
        self.driver.click(element.id).await
    }

    /// Whether the element is visible
    ///
    /// # Errors
    ///
    /// Returns error if the element state cannot be read
    pub async fn is_displayed(&mut self, element: &ElementRef) -> ProbeResult<bool> {
        self.ensure_open()?;
        self.driver.is_displayed(element.id).await
    }

    /// Rendered text of the element
    ///
    /// # Errors
    ///
    /// Returns error if the element state cannot be read
    pub async fn text(&mut self, element: &ElementRef) -> ProbeResult<String> {
        self.ensure_open()?;
        self.driver.text(element.id).await
    }

    /// Close the browser. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the driver's error from the first release attempt
    pub async fn release(&mut self) -> ProbeResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        debug!(session = %self.id, "release");
        self.driver.quit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDom, MockDriver, MockElement, MockPage};
    use std::time::Duration;

    const URL: &str = "https://test.local/";

    fn session_with(dom: MockDom, wait: WaitOptions) -> Session<MockDriver> {
        let driver = MockDriver::new().with_page(URL, MockPage::new(dom));
        Session::new(driver, wait)
    }

    mod find_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_find_immediate() {
            let dom = MockDom::new().with(MockElement::with_id("username"));
            let mut session = session_with(dom, WaitOptions::default());
            session.goto(URL).await.unwrap();
            let el = session.find(&Selector::id("username")).await.unwrap();
            assert_eq!(el.selector, Selector::id("username"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_waits_for_late_element() {
            let dom = MockDom::new().with(MockElement::with_class("welcome").attach_after(3));
            let mut session = session_with(dom, WaitOptions::new().with_timeout(1_000));
            session.goto(URL).await.unwrap();

            let start = tokio::time::Instant::now();
            let el = session.find(&Selector::class_name("welcome")).await;
            assert!(el.is_ok());
            assert_eq!(start.elapsed(), Duration::from_millis(150));
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_expires_at_bound() {
            let mut session = session_with(MockDom::new(), WaitOptions::new().with_timeout(300));
            session.goto(URL).await.unwrap();

            let start = tokio::time::Instant::now();
            let err = session
                .find(&Selector::class_name("welcome"))
                .await
                .unwrap_err();
            assert_eq!(start.elapsed(), Duration::from_millis(300));
            match err {
                ProbeError::ElementNotFound {
                    selector,
                    waited_ms,
                } => {
                    assert_eq!(selector, "class=welcome");
                    assert_eq!(waited_ms, 300);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_bound_single_lookup() {
            let mut session = session_with(MockDom::new(), WaitOptions::new().with_timeout(0));
            session.goto(URL).await.unwrap();
            let _ = session.find(&Selector::id("missing")).await.unwrap_err();
            let lookups = session
                .driver()
                .history()
                .iter()
                .filter(|c| c.starts_with("find:"))
                .count();
            assert_eq!(lookups, 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_query_error_not_retried() {
            let mut session = session_with(MockDom::new(), WaitOptions::default());
            session.goto(URL).await.unwrap();
            let err = session.find(&Selector::css("div > span")).await.unwrap_err();
            assert!(matches!(err, ProbeError::Query { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_all_expired_is_empty() {
            let mut session = session_with(MockDom::new(), WaitOptions::new().with_timeout(100));
            session.goto(URL).await.unwrap();
            let all = session.find_all(&Selector::class_name("row")).await.unwrap();
            assert!(all.is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_all_returns_every_match() {
            let dom = MockDom::new()
                .with(MockElement::with_class("row"))
                .with(MockElement::with_class("row"));
            let mut session = session_with(dom, WaitOptions::default());
            session.goto(URL).await.unwrap();
            assert_eq!(
                session.find_all(&Selector::class_name("row")).await.unwrap().len(),
                2
            );
        }
    }

    mod release_tests {
        use super::*;
        use std::sync::atomic::Ordering;

        #[tokio::test]
        async fn test_release_is_idempotent() {
            let mut session = session_with(MockDom::new(), WaitOptions::default());
            let quits = session.driver().quit_counter();
            session.release().await.unwrap();
            session.release().await.unwrap();
            assert!(session.is_released());
            assert_eq!(quits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_commands_after_release_fail() {
            let mut session = session_with(MockDom::new(), WaitOptions::default());
            session.release().await.unwrap();
            let err = session.goto(URL).await.unwrap_err();
            assert!(matches!(err, ProbeError::SessionClosed));
        }
    }
}
