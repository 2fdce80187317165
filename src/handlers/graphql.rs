//! GraphQL strategy.
//!
//! # Responsibilities
//! - Claim requests to the GraphQL endpoint, with the GraphQL media type, or
//!   whose body `query` field reads like an operation
//! - Extract query, variables and operation name from GET or POST
//! - Refuse subscriptions, execute everything else through `GraphqlExecutor`
//!
//! # Design Decisions
//! - Priority 75, above REST, so GraphQL wins whenever both apply
//! - Once the transport succeeded the status is 200, even when the payload
//!   carries errors; only wrong method (405) and missing query (400) differ
//! - Executor faults become a 200 with an `errors` array, never a 5xx
//! - Variables may be an object or a JSON string; bad JSON means no variables

use std::sync::{Arc, LazyLock};

use axum::http::StatusCode;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::config::DispatchConfig;
use crate::handlers::cors::CorsPolicy;
use crate::handlers::diagnostics::Fault;
use crate::handlers::schema::{
    ErrorObject, ExecutionResult, ExecutorError, GraphqlExecutor, Operation, OperationKind, SampleSchema,
};
use crate::handlers::{HandlerStrategy, X_API_PARADIGM};
use crate::http::{Method, Request, Response};

/// Priority of the GraphQL strategy.
pub const PRIORITY: i32 = 75;

/// Path marker of the GraphQL endpoint.
pub const ENDPOINT: &str = "/graphql";

/// Media type of a raw GraphQL document body.
pub const GRAPHQL_MEDIA_TYPE: &str = "application/graphql";

/// Value of the `Allow` and CORS methods headers.
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

static OPERATION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(query|mutation|subscription)\s*[{\s]").expect("operation prefix pattern is valid")
});

/// True when `query` reads like a GraphQL operation document.
pub fn is_operation_document(query: &str) -> bool {
    OPERATION_PREFIX.is_match(query.trim())
}

/// Transport-level and execution failures of the GraphQL strategy.
#[derive(Debug, thiserror::Error)]
pub enum GraphqlError {
    #[error("GraphQL requests must use GET or POST, not {0}")]
    MethodNotAllowed(Method),
    #[error("No GraphQL query provided")]
    MissingQuery,
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("failed to encode GraphQL result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GraphqlError {
    fn status(&self) -> StatusCode {
        match self {
            GraphqlError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GraphqlError::MissingQuery => StatusCode::BAD_REQUEST,
            GraphqlError::Executor(_) | GraphqlError::Encode(_) => StatusCode::OK,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            GraphqlError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            GraphqlError::MissingQuery => "BAD_REQUEST",
            GraphqlError::Executor(_) | GraphqlError::Encode(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, GraphqlError::Executor(_) | GraphqlError::Encode(_))
    }
}

type GraphqlResult<T> = Result<T, Fault<GraphqlError>>;

/// GraphQL-over-HTTP handler.
#[derive(Debug, Clone)]
pub struct GraphqlHandler {
    executor: Arc<dyn GraphqlExecutor>,
    cors: CorsPolicy,
    diagnostics: bool,
}

impl GraphqlHandler {
    /// GraphQL handler backed by the stand-in [`SampleSchema`].
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_executor(config, Arc::new(SampleSchema))
    }

    pub fn with_executor(config: &DispatchConfig, executor: Arc<dyn GraphqlExecutor>) -> Self {
        Self {
            executor,
            cors: CorsPolicy::new(&config.cors, ALLOWED_METHODS),
            diagnostics: config.diagnostics.enabled,
        }
    }

    /// Pull the operation out of the query string (GET) or body (POST).
    fn extract(&self, request: &Request) -> GraphqlResult<Operation> {
        let (document, variables, operation_name) = match request.method() {
            Method::Get => (
                string_field(request.query("query")),
                decode_variables(request.query("variables")),
                string_field(request.query("operationName")),
            ),
            Method::Post if request.content_type().contains(GRAPHQL_MEDIA_TYPE) => (
                Some(String::from_utf8_lossy(request.raw_body()).into_owned()),
                Map::new(),
                None,
            ),
            Method::Post => (
                string_field(request.input("query")),
                decode_variables(request.input("variables")),
                string_field(request.input("operationName")),
            ),
            other => return Err(Fault::new(GraphqlError::MethodNotAllowed(other.clone()))),
        };

        let document = document
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Fault::new(GraphqlError::MissingQuery))?;
        Ok(Operation::new(document, variables, operation_name))
    }

    fn execute(&self, request: &Request) -> GraphqlResult<Response> {
        let operation = self.extract(request)?;
        tracing::debug!(
            kind = %operation.kind,
            operation_name = ?operation.operation_name,
            "Executing GraphQL operation"
        );

        let result = if operation.kind == OperationKind::Subscription {
            subscription_unsupported()
        } else {
            self.executor
                .execute(&operation)
                .map_err(GraphqlError::from)?
        };

        let body = serde_json::to_value(&result).map_err(GraphqlError::from)?;
        Ok(Response::json(body, StatusCode::OK))
    }

    fn failure(&self, fault: Fault<GraphqlError>) -> Response {
        let error = fault.error();
        if error.is_internal() {
            tracing::error!(error = %fault, "GraphQL execution failed");
        } else {
            tracing::debug!(error = %error, "GraphQL request rejected");
        }

        let message = if error.is_internal() && !self.diagnostics {
            "Internal server error".to_string()
        } else {
            error.to_string()
        };
        let mut object = ErrorObject::new(message, error.code());
        if self.diagnostics {
            object = object.with_extension("debug", json!(fault.diagnostic()));
        }

        let body = json!({ "errors": [object] });
        let mut response = Response::json(body, error.status());
        if error.status() == StatusCode::METHOD_NOT_ALLOWED {
            response.set_header("Allow", ALLOWED_METHODS);
        }
        response
    }
}

impl HandlerStrategy for GraphqlHandler {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn can_handle(&self, request: &Request) -> bool {
        let path = request.path();
        if path.ends_with(ENDPOINT) {
            return true;
        }
        if request.content_type().contains(GRAPHQL_MEDIA_TYPE) {
            return true;
        }
        matches!(
            request.input("query"),
            Some(Value::String(query)) if is_operation_document(query)
        )
    }

    fn handle(&self, request: &Request) -> Response {
        let mut response = if request.method() == &Method::Options {
            self.cors.preflight()
        } else {
            match self.execute(request) {
                Ok(response) => response,
                Err(fault) => self.failure(fault),
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

fn subscription_unsupported() -> ExecutionResult {
    ExecutionResult::error(
        ErrorObject::new(
            "Subscriptions are not supported over HTTP. Use a WebSocket connection instead.",
            "SUBSCRIPTION_NOT_SUPPORTED",
        )
        .with_extension("alternative", "websocket"),
    )
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Variables as an object, or decoded from a JSON string.
fn decode_variables(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(variables)) => variables.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(variables)) => variables,
            Ok(_) => Map::new(),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable GraphQL variables");
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> GraphqlHandler {
        GraphqlHandler::new(&DispatchConfig::default())
    }

    fn post(path: &str, body: Value) -> Request {
        Request::builder().method("POST").path(path).json(&body).build()
    }

    #[derive(Debug)]
    struct FailingExecutor;

    impl GraphqlExecutor for FailingExecutor {
        fn execute(&self, _: &Operation) -> Result<ExecutionResult, ExecutorError> {
            Err(ExecutorError::Unavailable("resolver pool exhausted".into()))
        }
    }

    #[test]
    fn test_can_handle_endpoint() {
        let graphql = handler();

        assert!(graphql.can_handle(&Request::builder().path("/graphql").build()));
        assert!(graphql.can_handle(&Request::builder().path("/api/v2/graphql").build()));
        assert!(!graphql.can_handle(&Request::builder().path("/users").build()));
        assert_eq!(graphql.priority(), 75);
    }

    #[test]
    fn test_can_handle_media_type() {
        let req = Request::builder()
            .method("POST")
            .path("/api")
            .header("Content-Type", "application/graphql")
            .raw_body("{ hello }")
            .build();

        assert!(handler().can_handle(&req));
    }

    #[test]
    fn test_can_handle_query_field() {
        let graphql = handler();

        assert!(graphql.can_handle(&post("/api", json!({"query": "  query { x }"}))));
        assert!(graphql.can_handle(&post("/api", json!({"query": "mutation{ x }"}))));
        assert!(graphql.can_handle(&post("/api", json!({"query": "subscription S { x }"}))));
        assert!(!graphql.can_handle(&post("/api", json!({"query": "{ x }"}))));
        assert!(!graphql.can_handle(&post("/api", json!({"query": "queryable"}))));
        assert!(!graphql.can_handle(&post("/api", json!({"query": 42}))));
    }

    #[test]
    fn test_post_query() {
        let response = handler().handle(&post("/graphql", json!({"query": "query { hello }"})));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content(), &json!({"data": {"hello": "Hello from GraphQL"}}));
        assert_eq!(response.header(X_API_PARADIGM), Some("graphql"));
    }

    #[test]
    fn test_get_query_with_string_variables() {
        let req = Request::builder()
            .path("/graphql")
            .query("query", "query ($id: Int) { user(id: $id) { name } }")
            .query("variables", r#"{"id": 2}"#)
            .build();
        let response = handler().handle(&req);

        assert_eq!(response.content()["data"]["user"]["name"], "Alan Turing");
    }

    #[test]
    fn test_raw_graphql_body() {
        let req = Request::builder()
            .method("POST")
            .path("/graphql")
            .header("Content-Type", "application/graphql")
            .raw_body("{ users { id } }")
            .build();
        let response = handler().handle(&req);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.content()["data"]["users"].is_array());
    }

    #[test]
    fn test_invalid_variables_degrade_to_empty() {
        assert!(decode_variables(Some(&json!("{not json"))).is_empty());
        assert!(decode_variables(Some(&json!("[1, 2]"))).is_empty());
        assert_eq!(decode_variables(Some(&json!({"a": 1})))["a"], 1);
        assert_eq!(decode_variables(Some(&json!(r#"{"a": 1}"#)))["a"], 1);
    }

    #[test]
    fn test_missing_query_is_400() {
        let response = handler().handle(&post("/graphql", json!({"variables": {}})));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.content()["errors"][0]["extensions"]["code"], "BAD_REQUEST");
        assert_eq!(response.content()["errors"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_wrong_method_is_405() {
        let req = Request::builder().method("DELETE").path("/graphql").build();
        let response = handler().handle(&req);

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("Allow"), Some(ALLOWED_METHODS));
        assert_eq!(response.content()["errors"][0]["extensions"]["code"], "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn test_subscription_is_200_with_error() {
        let response = handler().handle(&post(
            "/graphql",
            json!({"query": "subscription { userCreated { id } }"}),
        ));

        assert_eq!(response.status(), StatusCode::OK);
        let error = &response.content()["errors"][0];
        assert_eq!(error["extensions"]["code"], "SUBSCRIPTION_NOT_SUPPORTED");
        assert_eq!(error["extensions"]["alternative"], "websocket");
        assert!(response.content().get("data").is_none());
    }

    #[test]
    fn test_application_errors_still_200() {
        let response = handler().handle(&post("/graphql", json!({"query": "{ missingField }"})));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.content()["errors"][0]["extensions"]["code"],
            "GRAPHQL_VALIDATION_FAILED"
        );
    }

    #[test]
    fn test_executor_fault_normalized_to_200() {
        let graphql = GraphqlHandler::with_executor(&DispatchConfig::default(), Arc::new(FailingExecutor));
        let response = graphql.handle(&post("/graphql", json!({"query": "{ hello }"})));

        assert_eq!(response.status(), StatusCode::OK);
        let error = &response.content()["errors"][0];
        assert_eq!(error["message"], "Internal server error");
        assert_eq!(error["extensions"]["code"], "INTERNAL_SERVER_ERROR");
        assert!(error["extensions"].get("debug").is_none());
    }

    #[test]
    fn test_executor_fault_with_diagnostics() {
        let mut config = DispatchConfig::default();
        config.diagnostics.enabled = true;
        let graphql = GraphqlHandler::with_executor(&config, Arc::new(FailingExecutor));
        let response = graphql.handle(&post("/graphql", json!({"query": "{ hello }"})));

        let error = &response.content()["errors"][0];
        assert_eq!(error["message"], "schema unavailable: resolver pool exhausted");
        assert!(error["extensions"]["debug"]["file"]
            .as_str()
            .unwrap()
            .ends_with("graphql.rs"));
    }

    #[test]
    fn test_options_preflight() {
        let req = Request::builder().method("OPTIONS").path("/graphql").build();
        let response = handler().handle(&req);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.content().is_null());
        assert_eq!(response.header("Access-Control-Allow-Methods"), Some(ALLOWED_METHODS));
    }
}
