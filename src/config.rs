// src/config.rs
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";
/// Conversion downloads and trims the source before answering.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SESSION_FILE: &str = ".shorts_session.json";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub session_file: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        })
    }

    /// Reads `SHORTS_API_BASE_URL`, `SHORTS_API_TIMEOUT_SECS` and
    /// `SHORTS_SESSION_FILE`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var("SHORTS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(raw) = std::env::var("SHORTS_API_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "SHORTS_API_TIMEOUT_SECS",
                reason: format!("'{}': {}", raw, e),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "SHORTS_API_TIMEOUT_SECS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("SHORTS_SESSION_FILE") {
            if !path.trim().is_empty() {
                config.session_file = PathBuf::from(path);
            }
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Endpoint paths are joined onto the base, so it must end in `/`.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&normalized).map_err(|e| ConfigError::Invalid {
        name: "SHORTS_API_BASE_URL",
        reason: format!("'{}': {}", raw, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: "SHORTS_API_BASE_URL",
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/api").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            config.base_url.join("core/my-videos").unwrap().as_str(),
            "http://localhost:8000/api/core/my-videos"
        );
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        assert!(ClientConfig::new("not a url").is_err());
        assert!(ClientConfig::new("ftp://example.com/api/").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.session_file, PathBuf::from(".shorts_session.json"));
    }
}
