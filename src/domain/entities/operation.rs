use std::fmt;
use std::str::FromStr;

/// Default JPEG-style quality when the client does not provide one.
pub const DEFAULT_COMPRESS_QUALITY: u8 = 80;

/// Quality used for the single best-effort retry when a compression
/// produced an output at least as large as its input.
pub const AGGRESSIVE_COMPRESS_QUALITY: u8 = 40;

/// The closed set of processing operations offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Compress,
    Resize,
    Crop,
    Convert,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Compress => "compress",
            OperationType::Resize => "resize",
            OperationType::Crop => "crop",
            OperationType::Convert => "convert",
        }
    }

    /// Prefix prepended to the original file name when the artifact is
    /// served as an attachment.
    pub fn download_prefix(&self) -> &'static str {
        match self {
            OperationType::Compress => "compressed_",
            OperationType::Resize => "resized_",
            OperationType::Crop => "cropped_",
            OperationType::Convert => "converted_",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compress" => Ok(OperationType::Compress),
            "resize" => Ok(OperationType::Resize),
            "crop" => Ok(OperationType::Crop),
            "convert" => Ok(OperationType::Convert),
            other => Err(format!("Unknown operation: {}", other)),
        }
    }
}

/// Operation settings, resolved once at the top of the processing pipeline.
///
/// Each variant carries everything its transformation needs: handlers never
/// re-inspect raw form fields after this has been built.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSettings {
    Compress {
        quality: u8,
    },
    Resize {
        mode: ResizeMode,
        maintain_aspect_ratio: bool,
        do_not_enlarge: bool,
    },
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    Convert {
        format: TargetFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    Percentage(f64),
    Pixels { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => ".jpg",
            TargetFormat::Png => ".png",
            TargetFormat::Webp => ".webp",
            TargetFormat::Gif => ".gif",
        }
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(TargetFormat::Jpeg),
            "png" => Ok(TargetFormat::Png),
            "webp" => Ok(TargetFormat::Webp),
            "gif" => Ok(TargetFormat::Gif),
            other => Err(format!("Unsupported target format: {}", other)),
        }
    }
}

/// Raw, still-optional settings as they arrive in the multipart form.
#[derive(Debug, Default, Clone)]
pub struct RawOperationSettings {
    pub quality: Option<u8>,
    pub resize_mode: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub percentage: Option<f64>,
    pub maintain_aspect_ratio: Option<bool>,
    pub do_not_enlarge: Option<bool>,
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub format: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum OperationSettingsError {
    #[error("Missing setting `{0}` for operation {1}")]
    MissingSetting(&'static str, OperationType),
    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: String,
    },
}

impl OperationSettings {
    /// Validates the raw form fields against the requested operation.
    pub fn parse(
        operation: OperationType,
        raw: RawOperationSettings,
    ) -> Result<Self, OperationSettingsError> {
        match operation {
            OperationType::Compress => {
                let quality = raw.quality.unwrap_or(DEFAULT_COMPRESS_QUALITY);
                if quality == 0 || quality > 100 {
                    return Err(OperationSettingsError::InvalidSetting {
                        field: "quality",
                        reason: format!("{} is not within 1..=100", quality),
                    });
                }
                Ok(OperationSettings::Compress { quality })
            }
            OperationType::Resize => {
                let mode = Self::parse_resize_mode(&raw)?;
                Ok(OperationSettings::Resize {
                    mode,
                    maintain_aspect_ratio: raw.maintain_aspect_ratio.unwrap_or(false),
                    do_not_enlarge: raw.do_not_enlarge.unwrap_or(false),
                })
            }
            OperationType::Crop => {
                let width = raw
                    .width
                    .ok_or(OperationSettingsError::MissingSetting("width", operation))?;
                let height = raw
                    .height
                    .ok_or(OperationSettingsError::MissingSetting("height", operation))?;
                if width == 0 || height == 0 {
                    return Err(OperationSettingsError::InvalidSetting {
                        field: "width/height",
                        reason: "The crop area cannot be empty".to_string(),
                    });
                }
                Ok(OperationSettings::Crop {
                    width,
                    height,
                    x: raw.x.unwrap_or(0),
                    y: raw.y.unwrap_or(0),
                })
            }
            OperationType::Convert => {
                let format = raw
                    .format
                    .ok_or(OperationSettingsError::MissingSetting("format", operation))?;
                let format = format.parse().map_err(|reason| {
                    OperationSettingsError::InvalidSetting {
                        field: "format",
                        reason,
                    }
                })?;
                Ok(OperationSettings::Convert { format })
            }
        }
    }

    fn parse_resize_mode(raw: &RawOperationSettings) -> Result<ResizeMode, OperationSettingsError> {
        let mode = match raw.resize_mode.as_deref() {
            Some("percentage") => "percentage",
            Some("pixels") => "pixels",
            Some(other) => {
                return Err(OperationSettingsError::InvalidSetting {
                    field: "resizeMode",
                    reason: format!("{} is neither `percentage` nor `pixels`", other),
                })
            }
            // Infers the mode from which fields were provided
            None if raw.percentage.is_some() => "percentage",
            None => "pixels",
        };

        if mode == "percentage" {
            let percentage = raw.percentage.ok_or(OperationSettingsError::MissingSetting(
                "percentage",
                OperationType::Resize,
            ))?;
            if !percentage.is_finite() || percentage <= 0.0 {
                return Err(OperationSettingsError::InvalidSetting {
                    field: "percentage",
                    reason: format!("{} is not a positive number", percentage),
                });
            }
            Ok(ResizeMode::Percentage(percentage))
        } else {
            let width = raw.width.ok_or(OperationSettingsError::MissingSetting(
                "width",
                OperationType::Resize,
            ))?;
            let height = raw.height.ok_or(OperationSettingsError::MissingSetting(
                "height",
                OperationType::Resize,
            ))?;
            if width == 0 || height == 0 {
                return Err(OperationSettingsError::InvalidSetting {
                    field: "width/height",
                    reason: "Target dimensions cannot be zero".to_string(),
                });
            }
            Ok(ResizeMode::Pixels { width, height })
        }
    }

    /// A more aggressive variant of the settings, used for the single retry
    /// when a compression did not shrink its input. Only compression has one.
    pub fn more_aggressive(&self) -> Option<OperationSettings> {
        match self {
            OperationSettings::Compress { quality } => Some(OperationSettings::Compress {
                quality: (*quality).min(AGGRESSIVE_COMPRESS_QUALITY),
            }),
            _ => None,
        }
    }
}
