//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::DispatchConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides, validate.
pub fn load_config(path: &Path) -> Result<DispatchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    from_toml(&content, |key| std::env::var(key).ok())
}

/// Load from `path` when given, otherwise start from defaults.
///
/// Environment overrides apply in both cases.
pub fn load_or_default(path: Option<&Path>) -> Result<DispatchConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => from_toml("", |key| std::env::var(key).ok()),
    }
}

/// Parse TOML text, apply overrides from `lookup`, validate.
fn from_toml<F>(content: &str, lookup: F) -> Result<DispatchConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: DispatchConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Override selected fields from environment-style variables.
///
/// | Variable       | Field                    |
/// |----------------|--------------------------|
/// | `CORS_ENABLED` | `cors.enabled`           |
/// | `CORS_ORIGIN`  | `cors.origin`            |
/// | `APP_DEBUG`    | `diagnostics.enabled`    |
/// | `BIND_ADDRESS` | `listener.bind_address`  |
/// | `LOG_LEVEL`    | `observability.log_level`|
///
/// Unparseable booleans are ignored.
pub fn apply_env_overrides<F>(config: &mut DispatchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(enabled) = lookup_bool(&lookup, "CORS_ENABLED") {
        config.cors.enabled = enabled;
    }
    if let Some(origin) = lookup("CORS_ORIGIN") {
        config.cors.origin = origin;
    }
    if let Some(debug) = lookup_bool(&lookup, "APP_DEBUG") {
        config.diagnostics.enabled = debug;
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
}

fn lookup_bool<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            tracing::warn!(variable = key, value = %raw, "Ignoring unparseable boolean");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_toml() {
        let config = from_toml(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [diagnostics]
            enabled = true
            "#,
            env(&[]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(config.diagnostics.enabled);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let err = from_toml("[listener]\nbind_address = \"nope\"", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("listener.bind_address"));

        let err = from_toml("[listener\n", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DispatchConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("CORS_ENABLED", "false"),
                ("CORS_ORIGIN", "https://example.org"),
                ("APP_DEBUG", "1"),
            ]),
        );

        assert!(!config.cors.enabled);
        assert_eq!(config.cors.origin, "https://example.org");
        assert!(config.diagnostics.enabled);
    }

    #[test]
    fn test_overrides_are_validated() {
        let err = from_toml("", env(&[("BIND_ADDRESS", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let config = from_toml("[cors]\nenabled = true\n", env(&[("CORS_ENABLED", "no")])).unwrap();
        assert!(!config.cors.enabled);
    }

    #[test]
    fn test_unparseable_bool_ignored() {
        let mut config = DispatchConfig::default();
        apply_env_overrides(&mut config, env(&[("CORS_ENABLED", "maybe")]));

        assert!(config.cors.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("api-dispatch-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[cors]\nmax_age_secs = 60\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cors.max_age_secs, 60);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
