//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the axum `Router`: a single fallback that hands every request to
//!   the dispatcher
//! - Wire up middleware (tracing, request ID, body limit, timeout)
//! - Swap in a freshly built dispatcher when the configuration reloads
//! - Serve until shutdown is broadcast
//!
//! # Design Decisions
//! - The dispatcher lives behind `ArcSwap`; each request loads the current
//!   one, so in-flight requests finish on the dispatcher they started with
//! - Listener settings (address, limits, timeout) apply at startup only

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::DispatchConfig;
use crate::dispatch::Dispatcher;
use crate::http::Request;
use crate::observability::metrics;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ArcSwap<Dispatcher>>,
}

/// HTTP front end of the dispatcher.
pub struct HttpServer {
    router: Router,
    dispatcher: Arc<ArcSwap<Dispatcher>>,
}

impl HttpServer {
    /// Server with the built-in strategies.
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_dispatcher(config, Dispatcher::from_config(config))
    }

    /// Server around a caller-assembled dispatcher.
    pub fn with_dispatcher(config: &DispatchConfig, dispatcher: Dispatcher) -> Self {
        let dispatcher = Arc::new(ArcSwap::from_pointee(dispatcher));
        let state = AppState {
            dispatcher: Arc::clone(&dispatcher),
        };
        let router = Self::build_router(config, state);
        Self { router, dispatcher }
    }

    #[allow(deprecated)]
    fn build_router(config: &DispatchConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live dispatcher.
    pub fn dispatcher(&self) -> Arc<ArcSwap<Dispatcher>> {
        Arc::clone(&self.dispatcher)
    }

    /// Serve on `listener` until a shutdown notice arrives.
    ///
    /// Each configuration received on `reloads` replaces the dispatcher.
    pub async fn run(
        self,
        listener: TcpListener,
        mut reloads: mpsc::UnboundedReceiver<DispatchConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            while let Some(config) = reloads.recv().await {
                dispatcher.store(Arc::new(Dispatcher::from_config(&config)));
                tracing::info!(
                    cors_enabled = config.cors.enabled,
                    diagnostics = config.diagnostics.enabled,
                    "Dispatcher rebuilt from reloaded configuration"
                );
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Adapt, dispatch, serialize.
async fn dispatch_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> AxumResponse {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            metrics::record_dispatch("none", StatusCode::PAYLOAD_TOO_LARGE.as_u16(), start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let request = Request::from_http(&parts, bytes, remote_addr);

    let dispatcher = state.dispatcher.load();
    let (strategy, response) = match dispatcher.select(&request) {
        Ok(strategy) => (strategy.name(), strategy.handle(&request)),
        Err(e) => {
            tracing::warn!(error = %e, "Request not dispatched");
            ("none", e.to_response())
        }
    };

    let status = response.status();
    match response.finalize() {
        Ok(finalized) => {
            metrics::record_dispatch(strategy, status.as_u16(), start);
            finalized.into_response()
        }
        Err(e) => {
            tracing::error!(strategy, error = %e, "Failed to serialize response");
            metrics::record_dispatch(strategy, StatusCode::INTERNAL_SERVER_ERROR.as_u16(), start);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize response").into_response()
        }
    }
}
