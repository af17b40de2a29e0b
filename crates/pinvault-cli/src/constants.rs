//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (config, store, entry).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// The vault refused the request (not owner, no entitlement, conflict).
    pub const REJECTED: i32 = 5;

    /// The store failed or is inconsistent.
    pub const STORE_FAILED: i32 = 6;
}

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PINVAULT_CONFIG";

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "PINVAULT_LOG";
