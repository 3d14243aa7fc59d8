//! Hub download of the pipeline artifact

use std::path::PathBuf;

use super::ArtifactError;
use crate::config::RemoteConfig;

/// Download the artifact into the cache directory and return its path.
///
/// Single attempt; the client timeout bounds the whole request.
pub async fn fetch(remote: &RemoteConfig) -> Result<PathBuf, ArtifactError> {
    let client = reqwest::Client::builder().timeout(remote.timeout).build()?;
    let url = remote.url();

    let mut request = client.get(&url);
    if let Some(token) = &remote.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(ArtifactError::HttpStatus { url, status: response.status().as_u16() });
    }
    let bytes = response.bytes().await?;

    let path = remote.cache_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ArtifactError::Io { path: parent.to_path_buf(), source })?;
    }
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ArtifactError::Io { path: path.clone(), source })?;

    tracing::info!("Downloaded {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
