//! BrowserDriver - the seam between test scripts and a browser backend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (async trait)                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────┐   ┌─────────────────────────┐   │
//! │  │  ChromiumDriver         │   │  MockDriver             │   │
//! │  │  (feature `browser`)    │   │  (scripted fake DOM)    │   │
//! │  │  CDP via chromiumoxide  │   │  used by unit tests     │   │
//! │  └─────────────────────────┘   └─────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers answer single-shot queries. Waiting lives one layer up in
//! [`crate::session::Session`].

use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Opaque handle to an element on the current page.
///
/// Ids are handed out by the driver and go stale on navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Abstract driver trait for browser automation
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate to URL and wait for the load to finish
    async fn navigate(&mut self, url: &str) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&mut self) -> ProbeResult<String>;

    /// Query all matching elements once, in document order
    async fn find_all(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementId>>;

    /// Type text into element, appending to its current value
    async fn send_keys(&mut self, element: ElementId, text: &str) -> ProbeResult<()>;

    /// Click element
    async fn click(&mut self, element: ElementId) -> ProbeResult<()>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&mut self, element: ElementId) -> ProbeResult<bool>;

    /// Rendered text of the element
    async fn text(&mut self, element: ElementId) -> ProbeResult<String>;

    /// Close the browser. Must be safe to call more than once.
    async fn quit(&mut self) -> ProbeResult<()>;
}

// ============================================================================
// Mock DOM
// ============================================================================

/// A fake DOM node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    /// `id` attribute
    pub id: Option<String>,
    /// Class list
    pub classes: Vec<String>,
    /// Rendered text
    pub text: String,
    /// Input value (what `send_keys` appends to)
    pub value: String,
    /// Whether the node is visible
    pub displayed: bool,
    /// Lookups that miss this node before it attaches
    pub attach_after: usize,
}

impl MockElement {
    /// A visible element with the given id
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            displayed: true,
            ..Self::default()
        }
    }

    /// A visible element with the given class
    #[must_use]
    pub fn with_class(class: impl Into<String>) -> Self {
        Self {
            classes: vec![class.into()],
            displayed: true,
            ..Self::default()
        }
    }

    /// Set rendered text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Keep the node detached for the next `lookups` queries
    #[must_use]
    pub const fn attach_after(mut self, lookups: usize) -> Self {
        self.attach_after = lookups;
        self
    }

    fn is_attached(&self) -> bool {
        self.attach_after == 0
    }

    /// Call only with a selector accepted by [`check_selector`]
    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Selector::ClassName(name) => self.has_class(name),
            Selector::Css(css) => match css.strip_prefix('#') {
                Some(id) => self.id.as_deref() == Some(id),
                None => css.strip_prefix('.').is_some_and(|name| self.has_class(name)),
            },
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Reject selectors the mock DOM cannot evaluate.
///
/// Checked once per query so the outcome never depends on page content.
fn check_selector(selector: &Selector) -> ProbeResult<()> {
    match selector {
        Selector::Css(css) if !(css.starts_with('#') || css.starts_with('.')) => {
            Err(ProbeError::Query {
                message: format!("mock DOM only supports #id and .class, got {css:?}"),
            })
        }
        _ => Ok(()),
    }
}

/// A node in a [`MockDom`]; `key` survives removal of other nodes
#[derive(Debug, Clone)]
struct MockNode {
    key: u64,
    element: MockElement,
}

/// The fake document a [`MockDriver`] page renders
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    nodes: Vec<MockNode>,
    next_key: u64,
}

impl MockDom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node
    pub fn insert(&mut self, element: MockElement) {
        self.next_key += 1;
        self.nodes.push(MockNode {
            key: self.next_key,
            element,
        });
    }

    /// Builder form of [`MockDom::insert`]
    #[must_use]
    pub fn with(mut self, element: MockElement) -> Self {
        self.insert(element);
        self
    }

    /// Current value of the input with this id
    #[must_use]
    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.by_id(id).map(|e| e.value.as_str())
    }

    /// Node with this id
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&MockElement> {
        self.nodes
            .iter()
            .map(|n| &n.element)
            .find(|e| e.id.as_deref() == Some(id))
    }

    /// Remove every node carrying this class
    pub fn remove_class(&mut self, class: &str) {
        self.nodes.retain(|n| !n.element.has_class(class));
    }

    /// Number of nodes, attached or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, key: u64) -> Option<&MockElement> {
        self.nodes.iter().find(|n| n.key == key).map(|n| &n.element)
    }

    fn node_mut(&mut self, key: u64) -> Option<&mut MockElement> {
        self.nodes
            .iter_mut()
            .find(|n| n.key == key)
            .map(|n| &mut n.element)
    }
}

/// Reaction to a click on an element, applied to the page's DOM
pub type ClickHandler = Arc<dyn Fn(&mut MockDom) + Send + Sync>;

/// A page the mock can navigate to
#[derive(Clone, Default)]
pub struct MockPage {
    dom: MockDom,
    handlers: HashMap<String, ClickHandler>,
}

impl fmt::Debug for MockPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPage")
            .field("dom", &self.dom)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MockPage {
    /// Create a page rendering `dom`
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            dom,
            handlers: HashMap::new(),
        }
    }

    /// React to clicks on the element with `element_id`
    #[must_use]
    pub fn on_click<F>(mut self, element_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut MockDom) + Send + Sync + 'static,
    {
        let _ = self.handlers.insert(element_id.into(), Arc::new(handler));
        self
    }

    /// The page's document
    #[must_use]
    pub const fn dom(&self) -> &MockDom {
        &self.dom
    }
}

// ============================================================================
// Mock Driver
// ============================================================================

/// Mock driver for unit testing
///
/// Serves registered [`MockPage`]s by URL. Every navigation loads a fresh
/// copy of the page, so state typed into one test never leaks into the next.
#[derive(Debug, Default)]
pub struct MockDriver {
    routes: HashMap<String, MockPage>,
    current: Option<MockPage>,
    current_url: String,
    handles: HashMap<u64, u64>,
    next_handle: u64,
    closed: bool,
    fail_quit: bool,
    quits: Arc<AtomicUsize>,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_url: String::from("about:blank"),
            ..Self::default()
        }
    }

    /// Serve `page` at `url`
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        let _ = self.routes.insert(url.into(), page);
        self
    }

    /// Make `quit` report an error after closing, like a browser that
    /// would not exit cleanly
    #[must_use]
    pub const fn with_failing_quit(mut self) -> Self {
        self.fail_quit = true;
        self
    }

    /// Shared counter of `quit` calls, readable after the driver is moved
    #[must_use]
    pub fn quit_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.quits)
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Whether `quit` has run
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// The currently loaded document, if any
    #[must_use]
    pub fn dom(&self) -> Option<&MockDom> {
        self.current.as_ref().map(MockPage::dom)
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            Err(ProbeError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn page_mut(&mut self) -> ProbeResult<&mut MockPage> {
        self.current.as_mut().ok_or_else(|| ProbeError::Query {
            message: "no page loaded".to_string(),
        })
    }

    /// Node key behind a handle. Fails if the node left the document.
    fn resolve(&self, element: ElementId) -> ProbeResult<u64> {
        self.handles
            .get(&element.0)
            .copied()
            .filter(|&key| {
                self.current
                    .as_ref()
                    .is_some_and(|page| page.dom.node(key).is_some())
            })
            .ok_or(ProbeError::StaleElement { id: element.0 })
    }

    fn element(&self, element: ElementId) -> ProbeResult<&MockElement> {
        let key = self.resolve(element)?;
        self.current
            .as_ref()
            .and_then(|p| p.dom.node(key))
            .ok_or(ProbeError::StaleElement { id: element.0 })
    }

    fn interactable(&self, element: ElementId, action: &str) -> ProbeResult<u64> {
        let key = self.resolve(element)?;
        if self.element(element)?.displayed {
            Ok(key)
        } else {
            Err(ProbeError::Input {
                message: format!("cannot {action} {element}: element not interactable"),
            })
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.call_history.push(format!("navigate:{url}"));
        let page = self
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| ProbeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            })?;
        self.current = Some(page);
        self.current_url = url.to_string();
        self.handles.clear();
        Ok(())
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        self.ensure_open()?;
        Ok(self.current_url.clone())
    }

    async fn find_all(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementId>> {
        self.ensure_open()?;
        self.call_history.push(format!("find:{selector}"));
        check_selector(selector)?;
        let page = self.page_mut()?;

        let mut matched = Vec::new();
        for node in &mut page.dom.nodes {
            if !node.element.matches(selector) {
                continue;
            }
            if node.element.is_attached() {
                matched.push(node.key);
            } else {
                node.element.attach_after -= 1;
            }
        }

        let mut ids = Vec::with_capacity(matched.len());
        for key in matched {
            self.next_handle += 1;
            let _ = self.handles.insert(self.next_handle, key);
            ids.push(ElementId(self.next_handle));
        }
        Ok(ids)
    }

    async fn send_keys(&mut self, element: ElementId, text: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.call_history.push(format!("send_keys:{element}"));
        let key = self.interactable(element, "type into")?;
        let page = self.page_mut()?;
        if let Some(field) = page.dom.node_mut(key) {
            field.value.push_str(text);
        }
        Ok(())
    }

    async fn click(&mut self, element: ElementId) -> ProbeResult<()> {
        self.ensure_open()?;
        self.call_history.push(format!("click:{element}"));
        let key = self.interactable(element, "click")?;
        let page = self.page_mut()?;
        let handler = page
            .dom
            .node(key)
            .and_then(|e| e.id.as_ref())
            .and_then(|id| page.handlers.get(id))
            .cloned();
        if let Some(handler) = handler {
            handler(&mut page.dom);
        }
        Ok(())
    }

    async fn is_displayed(&mut self, element: ElementId) -> ProbeResult<bool> {
        self.ensure_open()?;
        Ok(self.element(element)?.displayed)
    }

    async fn text(&mut self, element: ElementId) -> ProbeResult<String> {
        self.ensure_open()?;
        let el = self.element(element)?;
        Ok(if el.displayed {
            el.text.clone()
        } else {
            String::new()
        })
    }

    async fn quit(&mut self) -> ProbeResult<()> {
        self.call_history.push("quit".to_string());
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.handles.clear();
            let _ = self.quits.fetch_add(1, Ordering::SeqCst);
            if self.fail_quit {
                return Err(ProbeError::Io(std::io::Error::other(
                    "browser process did not exit",
                )));
            }
        }
        Ok(())
    }
}
