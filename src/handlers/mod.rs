//! Handler strategies: one per API paradigm.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Dispatcher asks every strategy `can_handle`
//!     → highest priority match runs `handle`
//!         - graphql.rs (priority 75, `/graphql` and GraphQL payloads)
//!         - rest.rs (priority 50, everything else)
//!     → Response (errors already converted, never propagated)
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless and shared behind `Arc` across requests
//! - `handle` is infallible by signature; internal failures travel as
//!   `Result<Response, Fault<E>>` and are turned into responses at the boundary
//! - Domain work sits behind traits (`ResourceStore`, `GraphqlExecutor`)

use std::fmt;

use crate::http::{Request, Response};

pub mod cors;
pub mod diagnostics;
pub mod graphql;
pub mod resource;
pub mod rest;
pub mod schema;

pub use cors::CorsPolicy;
pub use diagnostics::{Diagnostic, Fault};
pub use graphql::GraphqlHandler;
pub use resource::{IdOutOfRange, ResourcePath, ResourceStore, SampleStore, StoreError};
pub use rest::RestHandler;
pub use schema::{ExecutionResult, ExecutorError, GraphqlExecutor, Operation, OperationKind, SampleSchema};

/// Header naming the paradigm that produced a response.
pub const X_API_PARADIGM: &str = "X-Api-Paradigm";

/// A self-contained policy that decides whether it applies to a request and
/// turns the request into a response.
pub trait HandlerStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns true if this strategy can process the request.
    fn can_handle(&self, request: &Request) -> bool;

    /// Process the request. Never fails: errors become responses.
    fn handle(&self, request: &Request) -> Response;

    /// Static priority. Higher wins when several strategies match.
    fn priority(&self) -> i32;
}
