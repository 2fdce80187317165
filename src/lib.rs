//! Request dispatch core: picks an API paradigm (GraphQL or REST) per
//! request and turns the request into a transport-agnostic response.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::DispatchConfig;
pub use dispatch::{DispatchError, Dispatcher};
pub use error::Error;
pub use handlers::HandlerStrategy;
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
