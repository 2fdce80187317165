//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transport + dispatcher produce:
//!     → logging.rs (structured events, request ID on every span)
//!     → metrics.rs (request counters, latency, selection cache hits)
//!
//! Consumers:
//!     → stdout (fmt or JSON lines)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
