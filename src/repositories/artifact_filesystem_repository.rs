use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::ports::artifact_repository::{ArtifactRepository, ArtifactRepositoryError};

/// Artifact store backed by a local directory.
///
/// Names embed the owning job id (reverse lookup for diagnostics) plus a
/// random component (unguessable without the job record) plus the original
/// extension: `job_{job_id}_{uuid}{ext}`.
///
/// Expiry is logical only: nothing here deletes expired artifacts, the
/// download gateway refuses to serve them. A periodic sweep of the directory
/// is the designated hardening for the resulting storage growth.
pub struct ArtifactFilesystemRepository {
    processed_dir: PathBuf,
}

impl ArtifactFilesystemRepository {
    /// Creates the processed-output directory if it does not exist yet.
    pub async fn new(
        processed_dir: impl Into<PathBuf>,
    ) -> Result<Self, ArtifactRepositoryError> {
        let processed_dir = processed_dir.into();
        tokio::fs::create_dir_all(&processed_dir).await?;
        Ok(Self { processed_dir })
    }

    fn artifact_path(&self, artifact_name: &str) -> PathBuf {
        self.processed_dir.join(artifact_name)
    }

    fn extension_of(original_file_name: &str) -> String {
        Path::new(original_file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_else(|| ".jpg".to_string())
    }
}

#[async_trait]
impl ArtifactRepository for ArtifactFilesystemRepository {
    #[tracing::instrument(name = "Storing processed artifact", skip(self, bytes))]
    async fn store(
        &self,
        job_id: i64,
        original_file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactRepositoryError> {
        let artifact_name = format!(
            "job_{}_{}{}",
            job_id,
            Uuid::new_v4(),
            Self::extension_of(original_file_name)
        );
        let path = self.artifact_path(&artifact_name);

        tokio::fs::write(&path, bytes).await?;

        info!("Stored artifact at {}", path.display());
        Ok(artifact_name)
    }

    #[tracing::instrument(name = "Reading processed artifact", skip(self))]
    async fn retrieve(&self, artifact_name: &str) -> Result<Vec<u8>, ArtifactRepositoryError> {
        let path = self.artifact_path(artifact_name);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(
                ArtifactRepositoryError::ArtifactNotFound(artifact_name.to_string()),
            ),
            Err(error) => Err(ArtifactRepositoryError::IOError(error)),
        }
    }
}
