//! Strategy registry and selection.
//!
//! # Responsibilities
//! - Own the ordered list of registered strategies
//! - Pick the highest-priority strategy that claims a request
//! - Memoize picks per request fingerprint
//!
//! # Design Decisions
//! - Ties keep registration order (stable sort)
//! - `select` holds the read lock across lookup, evaluation and insert;
//!   `register` and `clear_cache` take the write lock, so a select never
//!   observes a half-cleared cache or inserts a stale pick after a clear
//! - Any change to the registration list clears the whole cache
//! - The cache is cleared once it holds `cache_capacity` fingerprints
//! - Failed selections are not cached

use std::cmp::Reverse;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchError, Fingerprint};
use crate::handlers::{GraphqlHandler, HandlerStrategy, RestHandler};
use crate::http::{Request, Response};
use crate::observability::metrics;

/// Fingerprints memoized when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Selects one strategy per request.
#[derive(Debug)]
pub struct Dispatcher {
    handlers: RwLock<Vec<Arc<dyn HandlerStrategy>>>,
    cache: DashMap<Fingerprint, Arc<dyn HandlerStrategy>>,
    cache_capacity: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl Dispatcher {
    /// Dispatcher with no strategies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dispatcher with no strategies that memoizes at most `capacity`
    /// fingerprints. A capacity of zero is treated as one.
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            cache: DashMap::new(),
            cache_capacity: capacity.max(1),
        }
    }

    /// Dispatcher with the built-in strategies, GraphQL registered before REST.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let dispatcher = Self::with_cache_capacity(config.dispatch.cache_capacity);
        dispatcher
            .register(Arc::new(GraphqlHandler::new(config)))
            .register(Arc::new(RestHandler::new(config)));
        dispatcher
    }

    /// Append a strategy and clear the selection cache.
    pub fn register(&self, strategy: Arc<dyn HandlerStrategy>) -> &Self {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            strategy = strategy.name(),
            priority = strategy.priority(),
            "Registering strategy"
        );
        handlers.push(strategy);
        self.cache.clear();
        self
    }

    /// Registered strategies in registration order.
    pub fn handlers(&self) -> Vec<Arc<dyn HandlerStrategy>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_cache(&self) -> &Self {
        let _handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        self.cache.clear();
        self
    }

    /// Number of memoized selections.
    pub fn cached_selections(&self) -> usize {
        self.cache.len()
    }

    /// Pick the strategy for a request.
    pub fn select(&self, request: &Request) -> Result<Arc<dyn HandlerStrategy>, DispatchError> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let fingerprint = Fingerprint::of(request);

        if let Some(cached) = self.cache.get(&fingerprint) {
            metrics::record_selection(true);
            return Ok(Arc::clone(cached.value()));
        }
        metrics::record_selection(false);

        let mut matches: Vec<&Arc<dyn HandlerStrategy>> =
            handlers.iter().filter(|h| h.can_handle(request)).collect();
        matches.sort_by_key(|h| Reverse(h.priority()));

        let Some(selected) = matches.first().map(|h| Arc::clone(*h)) else {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                "No strategy claimed request"
            );
            return Err(DispatchError::NoHandler {
                method: request.method().clone(),
                path: request.path().to_string(),
            });
        };

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            strategy = selected.name(),
            candidates = matches.len(),
            "Strategy selected"
        );
        if self.cache.len() >= self.cache_capacity {
            tracing::debug!(capacity = self.cache_capacity, "Selection cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(fingerprint, Arc::clone(&selected));
        Ok(selected)
    }

    /// Select a strategy and run it.
    pub fn dispatch(&self, request: &Request) -> Result<Response, DispatchError> {
        let strategy = self.select(request)?;
        Ok(strategy.handle(request))
    }
}
