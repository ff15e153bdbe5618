//! Outgoing request size guard

use super::error::RpcError;
use crate::cli_style::format_bytes;

/// Hard limit for a serialized request body (10 MiB)
pub const MAX_PAYLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Size at which a warning is logged before the hard limit is reached (8 MiB)
pub const WARNING_THRESHOLD: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub max_bytes: u64,
    pub warn_bytes: u64,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_PAYLOAD_SIZE,
            warn_bytes: WARNING_THRESHOLD,
        }
    }
}

impl PayloadLimits {
    /// Reject bodies over `max_bytes`; warn above `warn_bytes`
    pub fn validate(&self, size: u64) -> Result<(), RpcError> {
        if size > self.warn_bytes {
            tracing::warn!(
                current_size = %format_bytes(size),
                warning_threshold = %format_bytes(self.warn_bytes),
                max_size = %format_bytes(self.max_bytes),
                remaining = %format_bytes(self.max_bytes.saturating_sub(size)),
                "Payload size approaching limit"
            );
        }

        if size > self.max_bytes {
            return Err(RpcError::RequestTooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// [`PayloadLimits::validate`] with the default limits
pub fn validate_payload_size(size: u64) -> Result<(), RpcError> {
    PayloadLimits::default().validate(size)
}
