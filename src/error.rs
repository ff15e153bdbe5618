/*!
 * Error types for the erst binary and library façade
 */

use crate::rpc::RpcError;
use erst_core_cache::CacheError;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, ErstError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum ErstError {
    /// Remote data access failed
    Rpc(RpcError),

    /// Cache read, write or sweep failed
    Cache(CacheError),

    /// Configuration error
    Config(String),

    /// I/O error
    Io(io::Error),

    /// Interactive prompt failed
    Prompt(String),

    /// Generic error with message
    Other(String),
}

impl ErstError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ErstError::Config(_) => EXIT_FATAL,
            ErstError::Rpc(e) if e.is_verification_failure() => EXIT_INTEGRITY,
            ErstError::Rpc(RpcError::InvalidConfig(_) | RpcError::InvalidRequest(_)) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErstError::Rpc(e) if e.is_verification_failure() => ErrorCategory::Integrity,
            ErstError::Rpc(RpcError::InvalidConfig(_)) | ErstError::Config(_) => ErrorCategory::Configuration,
            ErstError::Rpc(RpcError::InvalidRequest(_)) => ErrorCategory::Validation,
            ErstError::Rpc(_) => ErrorCategory::Network,
            ErstError::Cache(_) => ErrorCategory::Cache,
            ErstError::Io(_) => ErrorCategory::IoError,
            ErstError::Prompt(_) | ErstError::Other(_) => ErrorCategory::Unknown,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    IoError,
    Configuration,
    Integrity,
    Network,
    Cache,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Cache => write!(f, "cache"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for ErstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErstError::Rpc(e) => write!(f, "{}", e),
            ErstError::Cache(e) => write!(f, "Cache error: {}", e),
            ErstError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ErstError::Io(e) => write!(f, "I/O error: {}", e),
            ErstError::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
            ErstError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ErstError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErstError::Rpc(e) => Some(e),
            ErstError::Cache(e) => Some(e),
            ErstError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RpcError> for ErstError {
    fn from(err: RpcError) -> Self {
        ErstError::Rpc(err)
    }
}

impl From<CacheError> for ErstError {
    fn from(err: CacheError) -> Self {
        ErstError::Cache(err)
    }
}

impl From<io::Error> for ErstError {
    fn from(err: io::Error) -> Self {
        ErstError::Io(err)
    }
}

impl From<toml::de::Error> for ErstError {
    fn from(err: toml::de::Error) -> Self {
        ErstError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ErstError {
    fn from(err: toml::ser::Error) -> Self {
        ErstError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for ErstError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ErstError>() {
            Ok(e) => e,
            Err(err) => ErstError::Other(format!("{:#}", err)),
        }
    }
}

impl From<dialoguer::Error> for ErstError {
    fn from(err: dialoguer::Error) -> Self {
        ErstError::Prompt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErstError::Config("bad".to_string()).exit_code(), EXIT_FATAL);
        assert_eq!(
            ErstError::Rpc(RpcError::Verification("AAA missing".to_string())).exit_code(),
            EXIT_INTEGRITY
        );
        assert_eq!(
            ErstError::Rpc(RpcError::InvalidConfig("url".to_string())).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            ErstError::Rpc(RpcError::NotFound("tx".to_string())).exit_code(),
            EXIT_PARTIAL
        );
        assert_eq!(ErstError::Other("x".to_string()).exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_anyhow_context_is_flattened() {
        use anyhow::Context;
        let err = std::result::Result::<(), io::Error>::Err(io::Error::other("disk gone"))
            .context("Failed to scan cache")
            .unwrap_err();
        let err: ErstError = err.into();
        assert_eq!(err.to_string(), "Failed to scan cache: disk gone");
        assert_eq!(err.exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_eq!(EXIT_PARTIAL, 1);
        assert_eq!(EXIT_FATAL, 2);
        assert_eq!(EXIT_INTEGRITY, 3);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ErstError::Rpc(RpcError::ConnectionFailed("reset".to_string())).category(),
            ErrorCategory::Network
        );
        assert_eq!(ErstError::Config("x".to_string()).category().to_string(), "configuration");
    }

    #[test]
    fn test_display_passes_rpc_message_through() {
        let err = ErstError::from(RpcError::Rpc {
            code: -32601,
            message: "Method not found".to_string(),
        });
        assert!(err.to_string().contains("Method not found"));
    }
}
