//! REST strategy: the default paradigm.
//!
//! # Responsibilities
//! - Claim every request with a supported method that is not addressed to
//!   the GraphQL endpoint
//! - Map method + positional path onto list/show/create/update/delete
//! - Translate validation, lookup and backend failures into status codes
//!
//! # Design Decisions
//! - `OPTIONS` is answered as a CORS preflight before any path parsing
//! - POST 201 / DELETE 204 / everything else 200 on success
//! - Missing id → 400, unknown record → 404, anything else → 500 with a
//!   generic message unless diagnostics are enabled

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use crate::config::DispatchConfig;
use crate::handlers::cors::CorsPolicy;
use crate::handlers::diagnostics::Fault;
use crate::handlers::graphql::ENDPOINT as GRAPHQL_ENDPOINT;
use crate::handlers::resource::{
    IdOutOfRange, Page, ResourcePath, ResourceStore, SampleStore, StoreError,
};
use crate::handlers::{HandlerStrategy, X_API_PARADIGM};
use crate::http::{Method, Request, Response};

/// Priority of the REST strategy.
pub const PRIORITY: i32 = 50;

/// Value of the `Allow` and CORS methods headers.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Failures inside the REST strategy.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("ID required for {operation}")]
    MissingId { operation: &'static str },
    #[error("ID must not be provided when creating a resource")]
    UnexpectedId,
    #[error(transparent)]
    InvalidId(#[from] IdOutOfRange),
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RestError {
    fn status(&self) -> StatusCode {
        match self {
            RestError::MissingId { .. } | RestError::UnexpectedId | RestError::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            RestError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RestError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            RestError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

type RestResult = Result<Response, Fault<RestError>>;

/// Resource-oriented handler.
#[derive(Debug, Clone)]
pub struct RestHandler {
    store: Arc<dyn ResourceStore>,
    cors: CorsPolicy,
    diagnostics: bool,
}

impl RestHandler {
    /// REST handler backed by the stand-in [`SampleStore`].
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_store(config, Arc::new(SampleStore))
    }

    pub fn with_store(config: &DispatchConfig, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            cors: CorsPolicy::new(&config.cors, ALLOWED_METHODS),
            diagnostics: config.diagnostics.enabled,
        }
    }

    fn is_supported(method: &Method) -> bool {
        matches!(
            method,
            Method::Get | Method::Post | Method::Put | Method::Patch | Method::Delete | Method::Options
        )
    }

    fn execute(&self, request: &Request) -> RestResult {
        let path = ResourcePath::parse(request.path()).map_err(RestError::from)?;
        match request.method() {
            Method::Get => self.read(request, &path),
            Method::Post => self.create(request, &path),
            Method::Put => self.update(request, &path, false),
            Method::Patch => self.update(request, &path, true),
            Method::Delete => self.delete(&path),
            other => Err(Fault::new(RestError::MethodNotAllowed(other.clone()))),
        }
    }

    fn read(&self, request: &Request, path: &ResourcePath) -> RestResult {
        if let Some(id) = path.target_id() {
            let item = self.store.show(path, id).map_err(RestError::from)?;
            return Ok(Response::json(json!({ "data": item }), StatusCode::OK));
        }

        let page = Page {
            page: positive_param(request, "page").unwrap_or(DEFAULT_PAGE),
            limit: positive_param(request, "limit")
                .unwrap_or(DEFAULT_LIMIT)
                .min(MAX_LIMIT),
        };
        let collection = self.store.list(path, page).map_err(RestError::from)?;
        Ok(Response::json(
            json!({
                "data": collection.items,
                "meta": {
                    "page": page.page,
                    "limit": page.limit,
                    "total": collection.total,
                },
            }),
            StatusCode::OK,
        ))
    }

    fn create(&self, request: &Request, path: &ResourcePath) -> RestResult {
        if path.target_id().is_some() {
            return Err(Fault::new(RestError::UnexpectedId));
        }

        let created = self
            .store
            .create(path, request.body_data())
            .map_err(RestError::from)?;
        let status = if created.created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Ok(Response::json(
            json!({
                "data": created.record,
                "message": "Resource created",
            }),
            status,
        ))
    }

    fn update(&self, request: &Request, path: &ResourcePath, partial: bool) -> RestResult {
        let Some(id) = path.target_id() else {
            return Err(Fault::new(RestError::MissingId { operation: "update" }));
        };

        let record = self
            .store
            .update(path, id, request.body_data(), partial)
            .map_err(RestError::from)?;
        Ok(Response::json(
            json!({
                "data": record,
                "message": "Resource updated",
            }),
            StatusCode::OK,
        ))
    }

    fn delete(&self, path: &ResourcePath) -> RestResult {
        let Some(id) = path.target_id() else {
            return Err(Fault::new(RestError::MissingId { operation: "delete" }));
        };

        self.store.delete(path, id).map_err(RestError::from)?;
        Ok(Response::json(Value::Null, StatusCode::NO_CONTENT))
    }

    fn failure(&self, request: &Request, fault: Fault<RestError>) -> Response {
        let status = fault.error().status();
        if status.is_server_error() {
            tracing::error!(
                method = %request.method(),
                path = %request.path(),
                error = %fault,
                "REST request failed"
            );
        } else {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                status = status.as_u16(),
                error = %fault.error(),
                "REST request rejected"
            );
        }

        let message = if status.is_server_error() && !self.diagnostics {
            "Internal Server Error".to_string()
        } else {
            fault.error().to_string()
        };
        let mut error = Map::new();
        error.insert("message".into(), Value::String(message));
        error.insert("code".into(), json!(status.as_u16()));
        if self.diagnostics {
            error.insert("debug".into(), json!(fault.diagnostic()));
        }

        let mut response = Response::json(json!({ "error": error }), status);
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response.set_header("Allow", ALLOWED_METHODS);
        }
        response
    }
}

impl HandlerStrategy for RestHandler {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn can_handle(&self, request: &Request) -> bool {
        Self::is_supported(request.method()) && !request.path().contains(GRAPHQL_ENDPOINT)
    }

    fn handle(&self, request: &Request) -> Response {
        let mut response = if request.method() == &Method::Options {
            self.cors.preflight()
        } else {
            match self.execute(request) {
                Ok(response) => response,
                Err(fault) => self.failure(request, fault),
            }
        };

        self.cors.apply(&mut response);
        response.set_header(X_API_PARADIGM, self.name());
        response
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }
}

/// A query parameter as a positive integer, from a number or numeric string.
fn positive_param(request: &Request, key: &str) -> Option<u64> {
    let parsed = match request.query(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n| *n > 0)
}
