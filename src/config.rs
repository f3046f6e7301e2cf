use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bridge config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How responses to overlapping clicks reach the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Only the most recent click's response is applied.
    #[default]
    LatestClick,
    /// Every response is applied as it completes, so a slow earlier click can
    /// overwrite a faster later one.
    Completion,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    endpoint: Option<String>,
    request_timeout_ms: u64,
    ordering: ResponseOrdering,
    forward_reserved_rules: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            ordering: ResponseOrdering::default(),
            forward_reserved_rules: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the style service; requests go to `{endpoint}/cdp`.
    pub endpoint: Url,
    pub request_timeout: Duration,
    pub ordering: ResponseOrdering,
    /// Forward `inheritedRules` and `keyframeRules` to the store.
    pub forward_reserved_rules: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ordering: ResponseOrdering::default(),
            forward_reserved_rules: false,
        }
    }
}

impl BridgeConfig {
    /// Load from a YAML file. A missing path or file yields the defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_yaml::from_str::<RawConfig>(&contents)?
            }
            _ => RawConfig::default(),
        };

        let config = Self {
            request_timeout: Duration::from_millis(raw.request_timeout_ms),
            ordering: raw.ordering,
            forward_reserved_rules: raw.forward_reserved_rules,
            ..Self::default()
        };

        match raw.endpoint {
            Some(endpoint) => config.with_endpoint(&endpoint),
            None => Ok(config),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(endpoint.trim())?;
        // Keep the base path when joining "cdp".
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.endpoint = url;
        Ok(self)
    }

    pub fn style_endpoint(&self) -> Result<Url, url::ParseError> {
        self.endpoint.join("cdp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = BridgeConfig::load(None).unwrap();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.ordering, ResponseOrdering::LatestClick);
        assert!(!config.forward_reserved_rules);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config =
            BridgeConfig::load(Some(PathBuf::from("/nonexistent/framebridge.yaml"))).unwrap();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoint: http://styles.local:8080/inspect\nrequest_timeout_ms: 250\nordering: completion\nforward_reserved_rules: true"
        )
        .unwrap();

        let config = BridgeConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(
            config.style_endpoint().unwrap().as_str(),
            "http://styles.local:8080/inspect/cdp"
        );
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.ordering, ResponseOrdering::Completion);
        assert!(config.forward_reserved_rules);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ordering: completion").unwrap();
        let config = BridgeConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.ordering, ResponseOrdering::Completion);
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = BridgeConfig::default().with_endpoint("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }
}
