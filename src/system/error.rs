//! Error types for the module listing
//!
//! Failures to open or enumerate the target process abort the run and are
//! reported once by the top-level handler. Per-module path resolution
//! failures never become errors; the module is skipped.

use std::io;

use thiserror::Error;

// ============================================================================
// Argument Error
// ============================================================================

/// Errors raised while decoding the command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// `--process-id` was not supplied
    #[error("No process ID specified.")]
    MissingProcessId,

    /// The option parser rejected the command line
    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// List Error
// ============================================================================

/// Errors that abort a module listing.
#[derive(Debug, Error)]
pub enum ListError {
    /// The command line could not be turned into a listing request
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// The OS refused or could not satisfy the open request (bad PID,
    /// access denied). A bitness mismatch between this tool and the target
    /// is not distinguishable here.
    #[error("Could not retrieve process handle.")]
    #[allow(dead_code)]
    ProcessOpen {
        /// Process the open was attempted for
        pid: u32,
        /// OS error code reported by the open call
        code: u32,
    },

    /// The module-list query failed
    #[error("{api} failed with error code: {code}")]
    Enumeration {
        /// Name of the failing OS query
        api: &'static str,
        /// OS error code
        code: u32,
    },

    /// Writing the listing to the output stream failed
    #[error("failed to write module listing: {0}")]
    Output(#[from] io::Error),
}

// ============================================================================
// Result type aliases
// ============================================================================

/// Result type for listing operations
pub type ListResult<T> = Result<T, ListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_process_id_message() {
        let err = ListError::from(ArgumentError::MissingProcessId);
        assert_eq!(err.to_string(), "No process ID specified.");
    }

    #[test]
    fn test_enumeration_message_carries_code() {
        let err = ListError::Enumeration {
            api: "EnumProcessModules",
            code: 299,
        };
        assert_eq!(
            err.to_string(),
            "EnumProcessModules failed with error code: 299"
        );
    }

    #[test]
    fn test_process_open_message_hides_code() {
        let err = ListError::ProcessOpen { pid: 42, code: 87 };
        assert_eq!(err.to_string(), "Could not retrieve process handle.");
    }
}
