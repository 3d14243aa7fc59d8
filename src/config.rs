//! Configuration module

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL_PATH: &str = "model/best_baseline_model.json";
pub const DEFAULT_MODEL_FILENAME: &str = "best_baseline_model.json";
pub const DEFAULT_HF_ENDPOINT: &str = "https://huggingface.co";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Where the pipeline artifact comes from
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Local artifact path, preferred when the file exists
    pub path: PathBuf,

    /// Hub download, used when the local file is missing
    pub remote: Option<RemoteConfig>,

    /// Expected SHA-256 of the artifact bytes (hex)
    pub expected_sha256: Option<String>,
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub repo_id: String,
    pub filename: String,
    pub revision: String,
    pub token: Option<String>,
    pub cache_dir: PathBuf,
    pub timeout: Duration,
}

impl RemoteConfig {
    /// `<endpoint>/<repo_id>/resolve/<revision>/<filename>`
    pub fn url(&self) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.repo_id,
            self.revision,
            self.filename
        )
    }

    /// Cache location for the downloaded artifact
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir
            .join(self.repo_id.replace('/', "--"))
            .join(&self.revision)
            .join(&self.filename)
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("repo_id", &self.repo_id)
            .field("filename", &self.filename)
            .field("revision", &self.revision)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("cache_dir", &self.cache_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let remote = var("MODEL_REPO_ID").map(|repo_id| RemoteConfig {
            endpoint: var("HF_ENDPOINT").unwrap_or_else(|| DEFAULT_HF_ENDPOINT.to_string()),
            repo_id,
            filename: var("MODEL_FILENAME").unwrap_or_else(|| DEFAULT_MODEL_FILENAME.to_string()),
            revision: var("MODEL_REVISION").unwrap_or_else(|| "main".to_string()),
            token: var("HF_TOKEN"),
            cache_dir: var("MODEL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".model-cache")),
            timeout: Duration::from_secs(
                var("MODEL_DOWNLOAD_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        });

        Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            environment: var("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),

            log_format: match var("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },

            model: ModelConfig {
                path: var("MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                remote,
                expected_sha256: var("MODEL_SHA256").map(|s| s.trim().to_lowercase()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.model.path, PathBuf::from("model/best_baseline_model.json"));
        assert!(config.model.remote.is_none());
        assert!(config.model.expected_sha256.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9001"),
            ("ENVIRONMENT", "production"),
            ("LOG_FORMAT", "JSON"),
            ("MODEL_PATH", "/srv/model.json"),
            ("MODEL_SHA256", " ABCDEF "),
        ]);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9001);
        assert_eq!(config.environment, "production");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.model.path, PathBuf::from("/srv/model.json"));
        assert_eq!(config.model.expected_sha256.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config(&[
            ("PORT", "eighty"),
            ("MODEL_REPO_ID", "acme/churn"),
            ("MODEL_DOWNLOAD_TIMEOUT_SECS", "-3"),
        ]);

        assert_eq!(config.port, 8000);
        assert_eq!(config.model.remote.unwrap().timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_remote_source() {
        let config = config(&[
            ("MODEL_REPO_ID", "acme/churn"),
            ("MODEL_REVISION", "v2"),
            ("HF_ENDPOINT", "http://hub.local/"),
            ("HF_TOKEN", "hf_secret"),
            ("MODEL_CACHE_DIR", "/tmp/cache"),
        ]);
        let remote = config.model.remote.unwrap();

        assert_eq!(remote.url(), "http://hub.local/acme/churn/resolve/v2/best_baseline_model.json");
        assert_eq!(
            remote.cache_path(),
            PathBuf::from("/tmp/cache/acme--churn/v2/best_baseline_model.json")
        );
        assert_eq!(remote.token.as_deref(), Some("hf_secret"));
    }

    #[test]
    fn test_empty_repo_id_means_no_remote() {
        assert!(config(&[("MODEL_REPO_ID", "")]).model.remote.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = config(&[("MODEL_REPO_ID", "acme/churn"), ("HF_TOKEN", "hf_secret")]);
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("***"));
    }
}
