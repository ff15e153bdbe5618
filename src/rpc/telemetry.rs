//! Per-method timing hooks
//!
//! The client starts one timer when a public operation begins and stops it
//! exactly once with the outcome. Embedders forward these to their metrics
//! backend; the default does nothing.

use super::error::RpcError;
use std::time::Instant;

/// Key/value pairs attached to a method timer
pub type Attributes = Vec<(&'static str, String)>;

pub trait MethodTelemetry: Send + Sync {
    fn start_method_timer(&self, method: &str, attributes: &[(&'static str, String)]) -> Box<dyn MethodTimer>;
}

pub trait MethodTimer: Send {
    /// Consume the timer with the operation's outcome
    fn stop(self: Box<Self>, error: Option<&RpcError>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMethodTelemetry;

impl MethodTelemetry for NoopMethodTelemetry {
    fn start_method_timer(&self, _method: &str, _attributes: &[(&'static str, String)]) -> Box<dyn MethodTimer> {
        Box::new(NoopMethodTimer)
    }
}

struct NoopMethodTimer;

impl MethodTimer for NoopMethodTimer {
    fn stop(self: Box<Self>, _error: Option<&RpcError>) {}
}

/// Emits one `tracing` event per finished method
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMethodTelemetry;

impl MethodTelemetry for TracingMethodTelemetry {
    fn start_method_timer(&self, method: &str, attributes: &[(&'static str, String)]) -> Box<dyn MethodTimer> {
        Box::new(TracingMethodTimer {
            method: method.to_string(),
            attributes: attributes.to_vec(),
            started: Instant::now(),
        })
    }
}

struct TracingMethodTimer {
    method: String,
    attributes: Attributes,
    started: Instant,
}

impl MethodTimer for TracingMethodTimer {
    fn stop(self: Box<Self>, error: Option<&RpcError>) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let attributes = format!("{:?}", self.attributes);
        match error {
            None => tracing::debug!(method = %self.method, elapsed_ms, attributes = %attributes, "RPC method completed"),
            Some(e) => tracing::debug!(
                method = %self.method,
                elapsed_ms,
                attributes = %attributes,
                error = %e,
                "RPC method failed"
            ),
        }
    }
}
