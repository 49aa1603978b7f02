//! The login form: page object, fixed test data, and the two scenarios.

use crate::assertion::{expect_text, expect_visible};
use crate::driver::{BrowserDriver, MockDom, MockDriver, MockElement, MockPage};
use crate::locator::Selector;
use crate::result::ProbeResult;
use crate::session::{ElementRef, Session};
use std::fmt;
use tracing::debug;

/// Login page under test
pub const LOGIN_URL: &str = "https://example.com/login";

/// Confirmation shown after a successful login
pub const WELCOME_TEXT: &str = "Welcome back!";

/// Element ids and classes on the login page
pub mod selectors {
    /// Email input
    pub const USERNAME_ID: &str = "username";
    /// Password input
    pub const PASSWORD_ID: &str = "password";
    /// Submit button
    pub const LOGIN_BUTTON_ID: &str = "login-btn";
    /// Confirmation banner
    pub const WELCOME_CLASS: &str = "welcome";
    /// Error banner
    pub const ERROR_CLASS: &str = "error";
}

/// A username/password pair. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Email typed into the username field
    pub username: String,
    /// Typed into the password field
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The account the page accepts
    #[must_use]
    pub fn valid() -> Self {
        Self::new("testuser@example.com", "SecurePass123!")
    }

    /// An account the page rejects
    #[must_use]
    pub fn invalid() -> Self {
        Self::new("invalid@example.com", "WrongPassword")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Page object over the login form
#[derive(Debug)]
pub struct LoginPage<'s, D: BrowserDriver> {
    session: &'s mut Session<D>,
}

impl<'s, D: BrowserDriver> LoginPage<'s, D> {
    /// Navigate to [`LOGIN_URL`]
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    pub async fn open(session: &'s mut Session<D>) -> ProbeResult<Self> {
        session.goto(LOGIN_URL).await?;
        Ok(Self { session })
    }

    /// Wrap a session already on the login page
    #[must_use]
    pub fn attach(session: &'s mut Session<D>) -> Self {
        Self { session }
    }

    /// The session driving this page
    pub fn session(&mut self) -> &mut Session<D> {
        self.session
    }

    /// Type into the username field
    ///
    /// # Errors
    ///
    /// Returns error if the field is missing or rejects input
    pub async fn fill_username(&mut self, username: &str) -> ProbeResult<()> {
        let field = self.session.find(&Selector::id(selectors::USERNAME_ID)).await?;
        self.session.send_keys(&field, username).await
    }

    /// Type into the password field
    ///
    /// # Errors
    ///
    /// Returns error if the field is missing or rejects input
    pub async fn fill_password(&mut self, password: &str) -> ProbeResult<()> {
        let field = self.session.find(&Selector::id(selectors::PASSWORD_ID)).await?;
        self.session.send_keys(&field, password).await
    }

    /// Click the login button
    ///
    /// # Errors
    ///
    /// Returns error if the button is missing or not clickable
    pub async fn submit(&mut self) -> ProbeResult<()> {
        let button = self
            .session
            .find(&Selector::id(selectors::LOGIN_BUTTON_ID))
            .await?;
        self.session.click(&button).await
    }

    /// Fill both fields and submit
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error
    pub async fn login(&mut self, credentials: &Credentials) -> ProbeResult<()> {
        debug!(username = %credentials.username, "submitting login form");
        self.fill_username(&credentials.username).await?;
        self.fill_password(&credentials.password).await?;
        self.submit().await
    }

    /// Locate the welcome banner
    ///
    /// # Errors
    ///
    /// Returns error if it does not appear within the implicit wait bound
    pub async fn welcome_message(&mut self) -> ProbeResult<ElementRef> {
        self.session
            .find(&Selector::class_name(selectors::WELCOME_CLASS))
            .await
    }

    /// Locate the error banner
    ///
    /// # Errors
    ///
    /// Returns error if it does not appear within the implicit wait bound
    pub async fn error_message(&mut self) -> ProbeResult<ElementRef> {
        self.session
            .find(&Selector::class_name(selectors::ERROR_CLASS))
            .await
    }
}

// ============================================================================
// Scenarios
// ============================================================================

/// Valid credentials reach a visible "Welcome back!" banner.
///
/// # Errors
///
/// Returns the failing step's error
pub async fn valid_login<D: BrowserDriver>(session: &mut Session<D>) -> ProbeResult<()> {
    let mut page = LoginPage::open(session).await?;
    page.login(&Credentials::valid()).await?;

    let welcome = page.welcome_message().await?;
    expect_visible(page.session(), &welcome).await?;
    expect_text(page.session(), &welcome, WELCOME_TEXT).await
}

/// Invalid credentials reach a visible error banner.
///
/// Only visibility is asserted; the banner's wording is logged, not checked.
///
/// # Errors
///
/// Returns the failing step's error
pub async fn invalid_credentials<D: BrowserDriver>(session: &mut Session<D>) -> ProbeResult<()> {
    let mut page = LoginPage::open(session).await?;
    page.login(&Credentials::invalid()).await?;

    let error = page.error_message().await?;
    expect_visible(page.session(), &error).await?;
    let text = page.session().text(&error).await?;
    debug!(text = %text, "error banner shown");
    Ok(())
}

/// The login test cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginCase {
    /// [`valid_login`]
    ValidLogin,
    /// [`invalid_credentials`]
    InvalidCredentials,
}

impl LoginCase {
    /// Every case, in run order
    pub const ALL: [Self; 2] = [Self::ValidLogin, Self::InvalidCredentials];

    /// Test name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ValidLogin => "valid_login",
            Self::InvalidCredentials => "invalid_credentials",
        }
    }

    /// Run this case against `session`
    ///
    /// # Errors
    ///
    /// Returns the failing step's error
    pub async fn run<D: BrowserDriver>(self, session: &mut Session<D>) -> ProbeResult<()> {
        match self {
            Self::ValidLogin => valid_login(session).await,
            Self::InvalidCredentials => invalid_credentials(session).await,
        }
    }
}

impl fmt::Display for LoginCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Scripted fake of the login page
// ============================================================================

/// A [`MockDriver`] page that behaves like the real login form.
///
/// Submitting [`Credentials::valid`] renders the welcome banner, anything
/// else renders the error banner. Knobs let tests break the page on purpose.
#[derive(Debug, Clone)]
pub struct ScriptedLoginPage {
    accepted: Credentials,
    welcome_text: String,
    error_text: String,
    error_displayed: bool,
    render_after: usize,
    responds: bool,
}

impl Default for ScriptedLoginPage {
    fn default() -> Self {
        Self {
            accepted: Credentials::valid(),
            welcome_text: WELCOME_TEXT.to_string(),
            error_text: "Invalid email or password".to_string(),
            error_displayed: true,
            render_after: 0,
            responds: true,
        }
    }
}

impl ScriptedLoginPage {
    /// The well-behaved page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render this welcome text instead of [`WELCOME_TEXT`]
    #[must_use]
    pub fn with_welcome_text(mut self, text: impl Into<String>) -> Self {
        self.welcome_text = text.into();
        self
    }

    /// Render the error banner hidden
    #[must_use]
    pub const fn with_hidden_error(mut self) -> Self {
        self.error_displayed = false;
        self
    }

    /// Attach the result banner only after this many lookups miss it
    #[must_use]
    pub const fn with_render_delay(mut self, lookups: usize) -> Self {
        self.render_after = lookups;
        self
    }

    /// Never render a result banner
    #[must_use]
    pub const fn unresponsive(mut self) -> Self {
        self.responds = false;
        self
    }

    /// Build the page
    #[must_use]
    pub fn into_page(self) -> MockPage {
        let dom = MockDom::new()
            .with(MockElement::with_id(selectors::USERNAME_ID))
            .with(MockElement::with_id(selectors::PASSWORD_ID))
            .with(MockElement::with_id(selectors::LOGIN_BUTTON_ID).text("Log in"));

        MockPage::new(dom).on_click(selectors::LOGIN_BUTTON_ID, move |dom| {
            if !self.responds {
                return;
            }
            let accepted = dom.value_of(selectors::USERNAME_ID)
                == Some(self.accepted.username.as_str())
                && dom.value_of(selectors::PASSWORD_ID) == Some(self.accepted.password.as_str());

            dom.remove_class(selectors::WELCOME_CLASS);
            dom.remove_class(selectors::ERROR_CLASS);
            let banner = if accepted {
                MockElement::with_class(selectors::WELCOME_CLASS).text(self.welcome_text.clone())
            } else {
                MockElement::with_class(selectors::ERROR_CLASS)
                    .text(self.error_text.clone())
                    .displayed(self.error_displayed)
            };
            dom.insert(banner.attach_after(self.render_after));
        })
    }

    /// A driver serving this page at [`LOGIN_URL`]
    #[must_use]
    pub fn driver(self) -> MockDriver {
        MockDriver::new().with_page(LOGIN_URL, self.into_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ProbeError;
    use crate::wait::WaitOptions;
    use proptest::prelude::*;

    fn session(page: ScriptedLoginPage) -> Session<MockDriver> {
        Session::new(page.driver(), WaitOptions::new().with_timeout(500))
    }

    mod credentials_tests {
        use super::*;

        #[test]
        fn test_debug_redacts_password() {
            let printed = format!("{:?}", Credentials::valid());
            assert!(printed.contains("testuser@example.com"));
            assert!(!printed.contains("SecurePass123!"));
        }

        #[test]
        fn test_fixed_values() {
            assert_eq!(Credentials::invalid().username, "invalid@example.com");
            assert_eq!(Credentials::invalid().password, "WrongPassword");
        }
    }

    mod page_object_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_login_types_into_fields() {
            let mut session = session(ScriptedLoginPage::new());
            let mut page = LoginPage::open(&mut session).await.unwrap();
            page.login(&Credentials::invalid()).await.unwrap();

            let dom = session.driver().dom().unwrap();
            assert_eq!(dom.value_of("username"), Some("invalid@example.com"));
            assert_eq!(dom.value_of("password"), Some("WrongPassword"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_resubmit_replaces_banner() {
            let mut session = session(ScriptedLoginPage::new());
            let mut page = LoginPage::open(&mut session).await.unwrap();
            page.submit().await.unwrap();
            page.submit().await.unwrap();
            let banners = page
                .session()
                .find_all(&Selector::class_name("error"))
                .await
                .unwrap();
            assert_eq!(banners.len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_resubmit_stales_old_banner_handle() {
            let mut session = session(ScriptedLoginPage::new());
            let mut page = LoginPage::open(&mut session).await.unwrap();
            page.submit().await.unwrap();
            let old_error = page.error_message().await.unwrap();

            page.submit().await.unwrap();
            let err = page.session().text(&old_error).await.unwrap_err();
            assert!(matches!(err, ProbeError::StaleElement { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_attach_skips_navigation() {
            let mut session = session(ScriptedLoginPage::new());
            session.goto(LOGIN_URL).await.unwrap();
            let mut page = LoginPage::attach(&mut session);
            page.fill_username("x").await.unwrap();
            let navigations = session
                .driver()
                .history()
                .iter()
                .filter(|c| c.starts_with("navigate:"))
                .count();
            assert_eq!(navigations, 1);
        }
    }

    mod scenario_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_valid_login_passes() {
            valid_login(&mut session(ScriptedLoginPage::new()))
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_invalid_credentials_passes() {
            invalid_credentials(&mut session(ScriptedLoginPage::new()))
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_valid_login_wrong_text_fails() {
            let page = ScriptedLoginPage::new().with_welcome_text("Hello!");
            let err = valid_login(&mut session(page)).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_error_fails() {
            let page = ScriptedLoginPage::new().with_hidden_error();
            let err = invalid_credentials(&mut session(page)).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }

        #[test]
        fn test_case_names() {
            let names: Vec<_> = LoginCase::ALL.iter().map(|c| c.name()).collect();
            assert_eq!(names, ["valid_login", "invalid_credentials"]);
            assert_eq!(LoginCase::ValidLogin.to_string(), "valid_login");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn only_accepted_credentials_get_welcome(
            username in "[a-z]{1,8}@example\\.com",
            password in "[A-Za-z0-9!]{1,12}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let creds = Credentials::new(username, password);
            let accepted = creds == Credentials::valid();

            let welcomed = rt.block_on(async {
                let mut session = session(ScriptedLoginPage::new());
                let mut page = LoginPage::open(&mut session).await.unwrap();
                page.login(&creds).await.unwrap();
                page.welcome_message().await.is_ok()
            });
            prop_assert_eq!(welcomed, accepted);
        }
    }
}
