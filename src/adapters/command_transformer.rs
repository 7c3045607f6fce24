use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

use crate::configuration::TransformerSettings;
use crate::domain::entities::operation::{OperationSettings, ResizeMode};
use crate::ports::image_transformer::{ImageTransformer, ImageTransformerError};

/// Image transformer shelling out to an ImageMagick-compatible binary.
///
/// Each transformation is one process invocation reading the input file and
/// writing a temporary output file, which is read back and removed.
pub struct CommandTransformer {
    binary: String,
}

impl CommandTransformer {
    pub fn new(settings: &TransformerSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
        }
    }

    /// Extension of the output file, driving the encoder picked by the binary.
    fn output_extension(input: &Path, settings: &OperationSettings) -> String {
        match settings {
            OperationSettings::Convert { format } => format.extension().to_string(),
            _ => input
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e))
                .unwrap_or_else(|| ".jpg".to_string()),
        }
    }

    fn build_args(settings: &OperationSettings) -> Vec<String> {
        match settings {
            OperationSettings::Compress { quality } => vec![
                "-strip".to_string(),
                "-quality".to_string(),
                quality.to_string(),
            ],
            OperationSettings::Resize {
                mode,
                maintain_aspect_ratio,
                do_not_enlarge,
            } => {
                let mut geometry = match mode {
                    ResizeMode::Percentage(percentage) => format!("{}%", percentage),
                    ResizeMode::Pixels { width, height } => format!("{}x{}", width, height),
                };
                if !maintain_aspect_ratio {
                    geometry.push('!');
                }
                if *do_not_enlarge {
                    geometry.push('>');
                }
                vec!["-resize".to_string(), geometry]
            }
            OperationSettings::Crop {
                width,
                height,
                x,
                y,
            } => vec![
                "-crop".to_string(),
                format!("{}x{}+{}+{}", width, height, x, y),
                "+repage".to_string(),
            ],
            // The conversion itself is driven by the output file extension.
            OperationSettings::Convert { .. } => vec![],
        }
    }

    fn output_path(input: &Path, settings: &OperationSettings) -> PathBuf {
        std::env::temp_dir().join(format!(
            "transform_{}{}",
            Uuid::new_v4(),
            Self::output_extension(input, settings)
        ))
    }
}

#[async_trait]
impl ImageTransformer for CommandTransformer {
    #[tracing::instrument(name = "Running image transformation", skip(self))]
    async fn transform(
        &self,
        input: &Path,
        settings: &OperationSettings,
    ) -> Result<Vec<u8>, ImageTransformerError> {
        let output_path = Self::output_path(input, settings);

        let mut command = Command::new(&self.binary);
        command.arg(input);
        command.args(Self::build_args(settings));
        command.arg(&output_path);

        let output = command.output().await?;

        if !output.status.success() {
            return Err(ImageTransformerError::TransformationFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        tokio::fs::remove_file(&output_path).await?;

        Ok(bytes)
    }
}
