//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to permissive defaults when absent.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Cross-origin headers attached by both handler strategies.
    pub cors: CorsConfig,

    /// Whether error responses carry debug detail.
    pub diagnostics: DiagnosticsConfig,

    /// Strategy selection settings.
    pub dispatch: SelectionConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Total time allowed per request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Cross-origin resource sharing settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Attach CORS headers to responses.
    pub enabled: bool,

    /// Value of `Access-Control-Allow-Origin`.
    pub origin: String,

    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: String,

    /// Value of `Access-Control-Max-Age`, in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: "*".to_string(),
            allow_headers: "Content-Type, Authorization, X-Requested-With".to_string(),
            max_age_secs: 86_400,
        }
    }
}

/// Error diagnostics. Off unless explicitly enabled.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Include error type, message, location and source chain in error bodies.
    pub enabled: bool,
}

/// Strategy selection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Most fingerprints memoized before the selection cache is cleared.
    pub cache_capacity: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: crate::dispatch::dispatcher::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address the Prometheus exporter listens on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
