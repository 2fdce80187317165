//! Selection cache key.

use serde_json::Value;

use crate::handlers::graphql::is_operation_document;
use crate::http::{Method, Request};

/// The request attributes strategy selection depends on.
///
/// Two requests with equal fingerprints are claimed by the same strategies.
/// Besides whether the body declares a `query` field, the key records whether
/// that field reads like a GraphQL operation, since the GraphQL strategy
/// claims on that and not on mere presence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    method: Method,
    path: String,
    content_type: String,
    accept: String,
    declares_query: bool,
    query_is_operation: bool,
}

impl Fingerprint {
    pub fn of(request: &Request) -> Self {
        let query = request.body_data().get("query");
        Self {
            method: request.method().clone(),
            path: request.path().to_string(),
            content_type: request.content_type().to_string(),
            accept: request.header_or("accept", "").to_string(),
            declares_query: query.is_some(),
            query_is_operation: matches!(query, Some(Value::String(q)) if is_operation_document(q)),
        }
    }
}
