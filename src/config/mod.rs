//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated, immutable)
//!     → passed by reference into Dispatcher and handler strategies
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server rebuilds the Dispatcher and swaps it atomically
//! ```
//!
//! # Design Decisions
//! - Config is an explicit value constructed once at startup, never a global
//! - All fields have permissive defaults (CORS on, origin `*`, diagnostics off)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    CorsConfig, DiagnosticsConfig, DispatchConfig, ListenerConfig, ObservabilityConfig,
    SelectionConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
