//! Run configuration: browser launch knobs and the implicit wait bound.
//!
//! Test data (URL, selectors, credentials) is not configurable; see
//! [`crate::login`].

use crate::browser::BrowserConfig;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};

/// Environment variable: run with a visible window when `false`
pub const ENV_HEADLESS: &str = "LOGIN_PROBE_HEADLESS";
/// Environment variable: disable the Chromium sandbox when `true`
pub const ENV_NO_SANDBOX: &str = "LOGIN_PROBE_NO_SANDBOX";
/// Environment variable: Chromium binary path
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
/// Environment variable: implicit wait bound in milliseconds
pub const ENV_IMPLICIT_WAIT_MS: &str = "LOGIN_PROBE_IMPLICIT_WAIT_MS";

/// Probe configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Browser launch options
    pub browser: BrowserConfig,
    /// Implicit wait applied to element lookups
    pub implicit_wait: WaitOptions,
}

impl ProbeConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set browser options
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Set the implicit wait bound
    #[must_use]
    pub const fn with_implicit_wait(mut self, wait: WaitOptions) -> Self {
        self.implicit_wait = wait;
        self
    }

    /// Defaults overridden by the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if a variable is set to an unparsable value
    pub fn from_env() -> ProbeResult<Self> {
        Self::default().apply_vars(|key| std::env::var(key).ok())
    }

    /// Parse a YAML document; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if the document is malformed
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::config(e.to_string()))
    }

    /// Apply overrides from a variable lookup
    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> ProbeResult<Self> {
        if let Some(value) = var(ENV_HEADLESS) {
            self.browser.headless = parse_bool(ENV_HEADLESS, &value)?;
        }
        if let Some(value) = var(ENV_NO_SANDBOX) {
            self.browser.sandbox = !parse_bool(ENV_NO_SANDBOX, &value)?;
        }
        if let Some(path) = var(ENV_CHROMIUM_PATH).filter(|p| !p.trim().is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        if let Some(value) = var(ENV_IMPLICIT_WAIT_MS) {
            let ms = value.trim().parse::<u64>().map_err(|e| {
                ProbeError::config(format!("{ENV_IMPLICIT_WAIT_MS}={value:?}: {e}"))
            })?;
            self.implicit_wait.timeout_ms = ms;
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> ProbeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProbeError::config(format!(
            "{key}={value:?}: expected true or false"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::new();
        assert!(config.browser.headless);
        assert_eq!(config.implicit_wait.timeout_ms, 10_000);
    }

    #[test]
    fn test_env_overrides() {
        let config = ProbeConfig::default()
            .apply_vars(lookup(&[
                (ENV_HEADLESS, "false"),
                (ENV_NO_SANDBOX, "1"),
                (ENV_CHROMIUM_PATH, "/opt/chromium/chrome"),
                (ENV_IMPLICIT_WAIT_MS, "2500"),
            ]))
            .unwrap();
        assert!(!config.browser.headless);
        assert!(!config.browser.sandbox);
        assert_eq!(
            config.browser.chromium_path.as_deref(),
            Some("/opt/chromium/chrome")
        );
        assert_eq!(config.implicit_wait.timeout_ms, 2500);
    }

    #[test]
    fn test_empty_env_keeps_defaults() {
        let config = ProbeConfig::default()
            .apply_vars(lookup(&[(ENV_CHROMIUM_PATH, "  ")]))
            .unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_bad_bool() {
        let err = ProbeConfig::default()
            .apply_vars(lookup(&[(ENV_HEADLESS, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Config { .. }));
    }

    #[test]
    fn test_bad_wait() {
        let err = ProbeConfig::default()
            .apply_vars(lookup(&[(ENV_IMPLICIT_WAIT_MS, "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_IMPLICIT_WAIT_MS));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "browser:\n  headless: false\nimplicit_wait:\n  timeout_ms: 3000\n";
        let config = ProbeConfig::from_yaml_str(yaml).unwrap();
        assert!(!config.browser.headless);
        assert!(config.browser.sandbox);
        assert_eq!(config.implicit_wait.timeout_ms, 3000);
        assert_eq!(config.implicit_wait.poll_interval_ms, 50);
    }

    #[test]
    fn test_from_yaml_malformed() {
        let err = ProbeConfig::from_yaml_str("browser: [").unwrap_err();
        assert!(matches!(err, ProbeError::Config { .. }));
    }
}
