//! Selectors for locating form elements.
//!
//! Lookups go by element id or class name, the same two strategies the login
//! page exposes. Both render to a CSS selector so every driver only has to
//! understand one query language.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Element `id` attribute (e.g. `login-btn`)
    Id(String),
    /// A single class name (e.g. `welcome`)
    ClassName(String),
    /// Raw CSS selector, passed through untouched
    Css(String),
}

impl Selector {
    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a class name selector
    #[must_use]
    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Render as a CSS selector usable with `querySelectorAll`
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Id(id) => format!("#{}", escape_ident(id)),
            Self::ClassName(name) => format!(".{}", escape_ident(name)),
            Self::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::ClassName(name) => write!(f, "class={name}"),
            Self::Css(css) => write!(f, "css={css}"),
        }
    }
}

/// Escape a CSS identifier following the `CSS.escape` algorithm.
fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let first = ident.chars().next();
    for (i, ch) in ident.chars().enumerate() {
        let digit_at_start =
            ch.is_ascii_digit() && (i == 0 || (i == 1 && first == Some('-')));
        if ch == '\0' {
            out.push('\u{FFFD}');
        } else if ch.is_ascii_control() || digit_at_start {
            out.push_str(&format!("\\{:x} ", u32::from(ch)));
        } else if i == 0 && ch == '-' && ident.len() == 1 {
            out.push_str("\\-");
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}
