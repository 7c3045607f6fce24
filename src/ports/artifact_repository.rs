use async_trait::async_trait;

use crate::helper::error_chain_fmt;

/// Store of processed output bytes.
///
/// Artifacts are written exactly once, addressed by an opaque generated name,
/// and only ever resolved through the name persisted on the owning job,
/// never through a client-supplied path.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Persists `bytes` under a freshly generated opaque name and returns
    /// that name.
    async fn store(
        &self,
        job_id: i64,
        original_file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactRepositoryError>;

    async fn retrieve(&self, artifact_name: &str) -> Result<Vec<u8>, ArtifactRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum ArtifactRepositoryError {
    #[error("The artifact could not be found: {0}")]
    ArtifactNotFound(String),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for ArtifactRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
