//! HTTP data model and transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body read)
//!     → request.rs (normalize into an immutable Request)
//!     → [dispatcher selects a handler strategy]
//!     → response.rs (status, headers, content, serialization)
//!     → xml.rs (when the content type is XML)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod xml;

pub use request::{Method, Request, RequestBuilder};
pub use response::{ContentType, FinalizedResponse, Response, ResponseError};
pub use server::HttpServer;
