//! Artifact Loader - resolves, verifies and parses the pipeline artifact
//!
//! Runs once before the listener binds. Every failure here is fatal.

mod format;
mod remote;

pub use format::parse_pipeline;
pub use remote::fetch;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::config::ModelConfig;
use crate::logic::pipeline::TrainedPipeline;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Model file not found at {}. Did you add it to the repo?", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),

    #[error("model download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("model download from {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Provenance of the loaded artifact, reported by `/info`
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub source: String,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

pub struct LoadedArtifact {
    pub pipeline: TrainedPipeline,
    pub info: ArtifactInfo,
}

/// Resolve the artifact source, verify its digest and parse it
pub async fn load(config: &ModelConfig) -> Result<LoadedArtifact, ArtifactError> {
    let (path, source) = resolve(config).await?;
    tracing::info!("Loading model artifact from {}", source);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ArtifactError::Io { path: path.clone(), source })?;

    let sha256 = digest(&bytes);
    tracing::info!("Artifact sha256: {}", sha256);
    verify(&sha256, config.expected_sha256.as_deref())?;

    let pipeline = parse_pipeline(&bytes)?;

    Ok(LoadedArtifact {
        pipeline,
        info: ArtifactInfo { source, sha256, loaded_at: Utc::now() },
    })
}

/// Local file first, then a cached download, then the hub, otherwise not found
async fn resolve(config: &ModelConfig) -> Result<(PathBuf, String), ArtifactError> {
    if is_file(&config.path).await {
        return Ok((config.path.clone(), config.path.display().to_string()));
    }

    match &config.remote {
        Some(remote) => {
            let cached = remote.cache_path();
            if is_file(&cached).await {
                tracing::info!("Using cached download of {}", remote.url());
                return Ok((cached.clone(), cached.display().to_string()));
            }

            tracing::info!(
                "No local artifact at {}, fetching {}/{}@{}",
                config.path.display(),
                remote.repo_id,
                remote.filename,
                remote.revision
            );
            let path = fetch(remote).await?;
            Ok((path, remote.url()))
        }
        None => Err(ArtifactError::NotFound(config.path.clone())),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn verify(actual: &str, expected: Option<&str>) -> Result<(), ArtifactError> {
    match expected {
        Some(expected) if !expected.eq_ignore_ascii_case(actual) => Err(ArtifactError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::test_support::DEMO_ARTIFACT;
    use std::io::Write;
    use std::time::Duration;

    fn local(path: PathBuf, expected_sha256: Option<String>) -> ModelConfig {
        ModelConfig { path, remote: None, expected_sha256 }
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        assert_eq!(
            digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEMO_ARTIFACT.as_bytes()).unwrap();

        let loaded = load(&local(file.path().to_path_buf(), None)).await.unwrap();

        assert_eq!(loaded.info.sha256, digest(DEMO_ARTIFACT.as_bytes()));
        assert_eq!(loaded.info.source, file.path().display().to_string());
        assert_eq!(loaded.pipeline.classifier().n_features(), 45);
    }

    #[tokio::test]
    async fn test_missing_file_without_remote_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = load(&local(path.clone(), None)).await.err().unwrap();

        assert!(matches!(err, ArtifactError::NotFound(_)));
        assert!(err.to_string().starts_with(&format!("Model file not found at {}", path.display())));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&local(dir.path().to_path_buf(), None)).await.err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_checksum_is_case_insensitive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEMO_ARTIFACT.as_bytes()).unwrap();
        let expected = digest(DEMO_ARTIFACT.as_bytes()).to_uppercase();

        assert!(load(&local(file.path().to_path_buf(), Some(expected))).await.is_ok());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEMO_ARTIFACT.as_bytes()).unwrap();

        let err = load(&local(file.path().to_path_buf(), Some("00".repeat(32)))).await.err().unwrap();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x80\x04\x95pickle").unwrap();

        let err = load(&local(file.path().to_path_buf(), None)).await.err().unwrap();
        assert!(matches!(err, ArtifactError::Parse(_)));
    }

    #[tokio::test]
    async fn test_cached_download_skips_the_hub() {
        let cache = tempfile::tempdir().unwrap();
        let remote = RemoteConfig {
            // nothing listens here; a request would fail the load
            endpoint: "http://127.0.0.1:9".to_string(),
            repo_id: "acme/churn".to_string(),
            filename: "best_baseline_model.json".to_string(),
            revision: "main".to_string(),
            token: None,
            cache_dir: cache.path().to_path_buf(),
            timeout: Duration::from_secs(1),
        };
        let cached = remote.cache_path();
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, DEMO_ARTIFACT).unwrap();

        let config = ModelConfig {
            path: cache.path().join("not-here.json"),
            remote: Some(remote),
            expected_sha256: None,
        };
        let loaded = load(&config).await.unwrap();

        assert_eq!(loaded.info.source, cached.display().to_string());
        assert_eq!(loaded.pipeline.classifier().n_features(), 45);
    }
}
