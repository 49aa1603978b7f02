//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "login_probe=info";

/// Environment variable selecting `json` output instead of plain text
pub const ENV_LOG_FORMAT: &str = "LOGIN_PROBE_LOG_FORMAT";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Output goes through the test writer so `cargo test` captures it per test.
/// Calling this more than once, or after another subscriber was installed,
/// is a no-op.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer();

    let _ = if wants_json(std::env::var(ENV_LOG_FORMAT).ok().as_deref()) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
