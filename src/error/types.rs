//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for duraxell operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DuraxellError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Prerequisite Error - required tool missing or too old
    #[error("Prerequisite error: {message}")]
    Prerequisite { message: String },

    /// Payload Error - disease module file missing or corrupted
    #[error("Module payload error: {message}")]
    Payload { message: String },

    /// Command Error - an external program failed
    #[error("Command error: {message}")]
    Command { message: String },

    /// Verification Error - generated output is empty or incomplete
    #[error("Verification error: {message}")]
    Verification { message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },
}

impl DuraxellError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Prerequisite { .. } => 2,
            Self::Payload { .. } => 3,
            Self::Command { .. } => 4,
            Self::Verification { .. } => 5,
            Self::Filesystem { .. } => 6,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a prerequisite error
    #[inline]
    pub fn prerequisite<S: Into<String>>(message: S) -> Self {
        Self::Prerequisite {
            message: message.into(),
        }
    }

    /// Create a payload error
    #[inline]
    pub fn payload<S: Into<String>>(message: S) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Create a command error
    #[inline]
    pub fn command<S: Into<String>>(message: S) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Create a verification error
    #[inline]
    pub fn verification<S: Into<String>>(message: S) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }
}

/// Resolve the process exit code for an error chain
///
/// Falls back to 1 when no [`DuraxellError`] is found anywhere in the chain.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DuraxellError>())
        .map_or(1, DuraxellError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            DuraxellError::configuration("x").exit_code(),
            DuraxellError::prerequisite("x").exit_code(),
            DuraxellError::payload("x").exit_code(),
            DuraxellError::command("x").exit_code(),
            DuraxellError::verification("x").exit_code(),
            DuraxellError::filesystem("x").exit_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|code| *code != 0));
    }

    #[test]
    fn exit_code_survives_context() {
        let err: anyhow::Error = Err::<(), _>(DuraxellError::payload("missing"))
            .context("Installation failed")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn untyped_errors_exit_with_one() {
        let err = anyhow::anyhow!("plain failure");
        assert_eq!(exit_code_for(&err), 1);
    }
}
