//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → fingerprint.rs (selection-relevant attributes)
//!     → dispatcher.rs
//!         cache hit  → memoized strategy
//!         cache miss → every strategy's can_handle, in registration order
//!                    → stable sort by descending priority → first match
//!                    → memoize under the fingerprint
//!     → strategy.handle(request) → Response
//! ```
//!
//! # Design Decisions
//! - For a fixed registration list, selection is a pure function of the
//!   fingerprint; the cache never changes the outcome
//! - The dispatcher is constructed explicitly from a `DispatchConfig` and
//!   passed to the transport, never held in global state

pub mod dispatcher;
pub mod fingerprint;

use axum::http::StatusCode;
use serde_json::json;

use crate::http::{Method, Response};

pub use dispatcher::Dispatcher;
pub use fingerprint::Fingerprint;

/// Selection failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("No suitable handler found for {method} {path}")]
    NoHandler { method: Method, path: String },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoHandler { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Structured error response for the transport.
    pub fn to_response(&self) -> Response {
        let status = self.status();
        Response::json(
            json!({
                "error": {
                    "message": self.to_string(),
                    "code": status.as_u16(),
                }
            }),
            status,
        )
    }
}
