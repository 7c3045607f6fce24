use async_trait::async_trait;
use std::path::Path;

use crate::domain::entities::operation::OperationSettings;
use crate::helper::error_chain_fmt;

/// The black-box transformation capability the pipeline invokes and awaits.
///
/// Pixel-level work is outside this service: implementations apply
/// `settings` to the image at `input` and hand back the processed bytes,
/// however they produce them.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        input: &Path,
        settings: &OperationSettings,
    ) -> Result<Vec<u8>, ImageTransformerError>;
}

#[derive(thiserror::Error)]
pub enum ImageTransformerError {
    #[error("The transformation failed: {0}")]
    TransformationFailed(String),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for ImageTransformerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
