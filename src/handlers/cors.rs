//! Cross-origin headers shared by the strategies.

use crate::config::CorsConfig;
use crate::http::Response;

/// CORS settings bound to the method list of one strategy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    origin: String,
    allow_methods: &'static str,
    allow_headers: String,
    max_age_secs: u64,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig, allow_methods: &'static str) -> Self {
        Self {
            enabled: config.enabled,
            origin: config.origin.clone(),
            allow_methods,
            allow_headers: config.allow_headers.clone(),
            max_age_secs: config.max_age_secs,
        }
    }

    /// Attach the four CORS headers when enabled.
    pub fn apply(&self, response: &mut Response) {
        if self.enabled {
            response.with_cors(
                &self.origin,
                self.allow_methods,
                &self.allow_headers,
                self.max_age_secs,
            );
        }
    }

    /// Answer an `OPTIONS` preflight: 200 with no body.
    pub fn preflight(&self) -> Response {
        let mut response = Response::new();
        self.apply(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_preflight_shape() {
        let policy = CorsPolicy::new(&CorsConfig::default(), "GET, OPTIONS");
        let response = policy.preflight();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.content().is_null());
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(response.header("Access-Control-Allow-Methods"), Some("GET, OPTIONS"));
        assert_eq!(response.header("Access-Control-Max-Age"), Some("86400"));
        assert!(response.header("Access-Control-Allow-Headers").is_some());
    }

    #[test]
    fn test_disabled_policy_adds_nothing() {
        let config = CorsConfig {
            enabled: false,
            ..CorsConfig::default()
        };
        let policy = CorsPolicy::new(&config, "GET");
        let mut response = Response::new();
        policy.apply(&mut response);

        assert!(response.header("Access-Control-Allow-Origin").is_none());
    }
}
