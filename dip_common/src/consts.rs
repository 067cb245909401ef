//! System-wide constants for the dip controller workspace.
//!
//! Single source of truth for timing defaults and paths.
//! Imported by all crates — no duplication permitted.

use std::time::Duration;

/// Default controller tick period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 250;

/// Default controller tick period as a Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(DEFAULT_TICK_MS);

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/dip.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(DEFAULT_TICK_MS > 0);
        assert_eq!(DEFAULT_TICK_PERIOD.as_millis() as u64, DEFAULT_TICK_MS);
        assert!(!DEFAULT_CONFIG_PATH.is_empty());
    }
}
