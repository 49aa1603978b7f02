//! Browser control for headless testing.
//!
//! With the `browser` feature this provides [`ChromiumDriver`], a
//! [`BrowserDriver`](crate::driver::BrowserDriver) over the Chrome `DevTools`
//! Protocol via chromiumoxide. Without it only the launch configuration is
//! compiled and tests run against [`MockDriver`](crate::driver::MockDriver).

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Per-command CDP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            request_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{BrowserDriver, ElementId};
    use crate::fixture::DriverLauncher;
    use crate::locator::Selector;
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::element::Element;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Mirrors what WebDriver's `isDisplayed` treats as visible.
    const IS_DISPLAYED_JS: &str = "function() { \
        const style = window.getComputedStyle(this); \
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') { return false; } \
        return this.getClientRects().length > 0; \
    }";

    /// Chromium session driven over CDP
    ///
    /// Handles are keyed by DOM node, so polling the same selector reuses one
    /// entry per node. All handles are dropped when the document changes.
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: CdpBrowser,
        page: CdpPage,
        handler: tokio::task::JoinHandle<()>,
        elements: HashMap<u64, Element>,
        /// backend node id -> handle
        nodes: HashMap<i64, u64>,
        next_handle: u64,
        url: Option<String>,
        closed: bool,
    }

    impl ChromiumDriver {
        /// Launch a new browser instance with a blank page
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: &BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(Duration::from_millis(config.request_timeout_ms));

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|message| {
                if message.contains("Could not auto detect") {
                    ProbeError::BrowserNotFound
                } else {
                    ProbeError::BrowserLaunch { message }
                }
            })?;

            let (mut browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            // Spawn handler task
            let handler = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    let _ = browser.close().await;
                    handler.abort();
                    return Err(ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    });
                }
            };

            Ok(Self {
                browser,
                page,
                handler,
                elements: HashMap::new(),
                nodes: HashMap::new(),
                next_handle: 0,
                url: None,
                closed: false,
            })
        }

        /// Number of element handles currently held
        #[must_use]
        pub fn tracked_elements(&self) -> usize {
            self.elements.len()
        }

        fn forget_elements(&mut self) {
            self.elements.clear();
            self.nodes.clear();
        }

        async fn page_url(page: &CdpPage) -> Option<String> {
            page.url().await.ok().flatten()
        }

        fn ensure_open(&self) -> ProbeResult<()> {
            if self.closed {
                Err(ProbeError::SessionClosed)
            } else {
                Ok(())
            }
        }

        fn element(&self, element: ElementId) -> ProbeResult<&Element> {
            self.ensure_open()?;
            self.elements
                .get(&element.0)
                .ok_or(ProbeError::StaleElement { id: element.0 })
        }
    }

    #[async_trait]
    impl BrowserDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
            self.ensure_open()?;
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.forget_elements();
            self.url = Self::page_url(&self.page).await;
            Ok(())
        }

        async fn current_url(&mut self) -> ProbeResult<String> {
            self.ensure_open()?;
            let url = self.page.url().await.map_err(|e| ProbeError::Query {
                message: e.to_string(),
            })?;
            Ok(url.unwrap_or_default())
        }

        async fn find_all(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementId>> {
            self.ensure_open()?;
            let found = self
                .page
                .find_elements(selector.to_css())
                .await
                .map_err(|e| ProbeError::Query {
                    message: format!("{selector}: {e}"),
                })?;

            let mut ids = Vec::with_capacity(found.len());
            for element in found {
                let node = *element.backend_node_id.inner();
                let handle = *self.nodes.entry(node).or_insert_with(|| {
                    self.next_handle += 1;
                    self.next_handle
                });
                let _ = self.elements.insert(handle, element);
                ids.push(ElementId(handle));
            }
            Ok(ids)
        }

        async fn send_keys(&mut self, element: ElementId, text: &str) -> ProbeResult<()> {
            let el = self.element(element)?;
            let input_err = |e: chromiumoxide::error::CdpError| ProbeError::Input {
                message: format!("typing into {element}: {e}"),
            };
            let _ = el.focus().await.map_err(input_err)?;
            let _ = el.type_str(text).await.map_err(input_err)?;
            Ok(())
        }

        async fn click(&mut self, element: ElementId) -> ProbeResult<()> {
            let el = self.element(element)?;
            let _ = el.click().await.map_err(|e| ProbeError::Input {
                message: format!("clicking {element}: {e}"),
            })?;

            // a submit that loads another document invalidates every handle
            let url = Self::page_url(&self.page).await;
            if url != self.url {
                self.forget_elements();
                self.url = url;
            }
            Ok(())
        }

        async fn is_displayed(&mut self, element: ElementId) -> ProbeResult<bool> {
            let el = self.element(element)?;
            let returns =
                el.call_js_fn(IS_DISPLAYED_JS, false)
                    .await
                    .map_err(|e| ProbeError::Query {
                        message: format!("visibility of {element}: {e}"),
                    })?;
            Ok(returns
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false))
        }

        async fn text(&mut self, element: ElementId) -> ProbeResult<String> {
            let el = self.element(element)?;
            let text = el.inner_text().await.map_err(|e| ProbeError::Query {
                message: format!("text of {element}: {e}"),
            })?;
            Ok(text.unwrap_or_default())
        }

        async fn quit(&mut self) -> ProbeResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            self.forget_elements();
            let closed = self.browser.close().await.map(|_| ());
            let _ = self.browser.wait().await;
            self.handler.abort();
            closed.map_err(|e| ProbeError::Fixture {
                message: format!("closing browser: {e}"),
            })
        }
    }

    /// Launches a fresh [`ChromiumDriver`] per fixture run
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumLauncher {
        config: BrowserConfig,
    }

    impl ChromiumLauncher {
        /// Create a launcher with the given config
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }
    }

    #[async_trait]
    impl DriverLauncher for ChromiumLauncher {
        type Driver = ChromiumDriver;

        async fn launch(&self) -> ProbeResult<ChromiumDriver> {
            ChromiumDriver::launch(&self.config).await
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumLauncher};
