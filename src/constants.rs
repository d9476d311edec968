//! Centralized constants for the application
//!
//! Buffer limits and defaults shared by the option parser and the
//! platform backends.

// ============================================================================
// Application Info
// ============================================================================

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Enumeration Limits
// ============================================================================

/// Default number of modules reported before the listing is truncated
pub const DEFAULT_MODULE_CAPACITY: usize = 1024;

// ============================================================================
// Path Buffers (UTF-16 code units)
// ============================================================================

/// Upper bound for a resolved module path (extended-length path limit)
#[cfg_attr(not(windows), allow(dead_code))]
pub const MAX_MODULE_PATH_CHARS: usize = 32_768;
