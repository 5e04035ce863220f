//! Unified error handling for the coupling core.
//!
//! Every fallible operation in the crate reports through [`LockstepError`],
//! so the engine-side caller sees one consistent taxonomy regardless of
//! which component failed.

use thiserror::Error;

/// Main error type for coupling operations.
#[derive(Debug, Error)]
pub enum LockstepError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failures reported by the bus link
    #[error("Communication error: {0}")]
    Communication(String),

    /// Session lifecycle errors (already running, not started, aborted)
    #[error("Session error: {0}")]
    Session(String),

    /// No signal arrived within the allotted time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// An out-of-order or unrecognized signal was observed
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// An input snapshot exceeded the exchange capacity; values are never
    /// partially delivered
    #[error("Exchange buffer overflow: {held} values held, capacity is {capacity}")]
    BufferOverflow { held: usize, capacity: usize },

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal errors with source location for debugging.
    /// Use the `lockstep_internal!()` macro to create these — it captures
    /// file/line automatically.
    #[error("Internal error: {message} (at {file}:{line})")]
    Internal {
        message: String,
        file: &'static str,
        line: u32,
    },
}

/// Create an internal error with automatic file/line capture.
///
/// ```rust,ignore
/// use lockstep::lockstep_internal;
/// return Err(lockstep_internal!("unexpected session state: {:?}", state));
/// ```
#[macro_export]
macro_rules! lockstep_internal {
    ($($arg:tt)*) => {
        $crate::error::LockstepError::Internal {
            message: format!($($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Convenience type alias for Results using LockstepError
pub type LockstepResult<T> = std::result::Result<T, LockstepError>;

/// Short alias — `Result<T>` is equivalent to `LockstepResult<T>`
pub type Result<T> = LockstepResult<T>;

impl From<toml::de::Error> for LockstepError {
    fn from(err: toml::de::Error) -> Self {
        LockstepError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<serde_yaml::Error> for LockstepError {
    fn from(err: serde_yaml::Error) -> Self {
        LockstepError::Config(format!("YAML parse error: {}", err))
    }
}

// Helper methods
impl LockstepError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LockstepError::Config(msg.into())
    }

    /// Create a communication error
    pub fn communication<S: Into<String>>(msg: S) -> Self {
        LockstepError::Communication(msg.into())
    }

    /// Create a session lifecycle error
    pub fn session<S: Into<String>>(msg: S) -> Self {
        LockstepError::Session(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        LockstepError::Timeout(msg.into())
    }

    /// Create a protocol violation error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        LockstepError::Protocol(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        LockstepError::InvalidInput(msg.into())
    }

    /// True for errors the caller may retry; everything else is fatal to
    /// the current session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LockstepError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(
            LockstepError::config("bad"),
            LockstepError::Config(_)
        ));
        assert!(matches!(
            LockstepError::communication("lost"),
            LockstepError::Communication(_)
        ));
        assert!(matches!(
            LockstepError::timeout("slow"),
            LockstepError::Timeout(_)
        ));
    }

    #[test]
    fn test_buffer_overflow_display() {
        let err = LockstepError::BufferOverflow {
            held: 2048,
            capacity: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_internal_macro_captures_location() {
        let err = lockstep_internal!("state {} is invalid", 3);
        match err {
            LockstepError::Internal { message, file, .. } => {
                assert_eq!(message, "state 3 is invalid");
                assert!(file.ends_with("error.rs"));
            }
            other => panic!("expected Internal, got {:?}", other),
        }
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(LockstepError::timeout("t").is_recoverable());
        assert!(!LockstepError::protocol("p").is_recoverable());
        assert!(!LockstepError::communication("c").is_recoverable());
        assert!(!LockstepError::BufferOverflow {
            held: 1,
            capacity: 0
        }
        .is_recoverable());
    }
}
