//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Where rendered videos are written and served from under `/videos`
    pub output_dir: PathBuf,
    /// Static assets served under `/public`
    pub public_dir: PathBuf,
    /// Wall-clock limit on one render request
    pub render_request_timeout: Duration,
    /// Include `error` and `stack` in 500 bodies
    pub expose_error_details: bool,
    /// Serve Prometheus metrics at `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 50 * 1024 * 1024, // 50MB
            output_dir: PathBuf::from("out"),
            public_dir: PathBuf::from("public"),
            render_request_timeout: Duration::from_secs(900),
            expose_error_details: true,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            render_request_timeout: std::env::var("RENDER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_request_timeout),
            expose_error_details: std::env::var("EXPOSE_ERROR_DETAILS")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.expose_error_details),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_body_size, 52_428_800);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.render_request_timeout, Duration::from_secs(900));
        assert!(config.expose_error_details);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
