use thiserror::Error;

/// Errors reported by the sprite engine.
///
/// Soft outcomes (undo with nothing to undo, a fill onto the same colour, a
/// paint that changes nothing) are not errors; those operations return `bool`
/// or `Option` instead.
#[derive(Debug, Error)]
pub enum PixError {
    /// Zero or over-limit width, height or frame count.
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Bad magic or otherwise malformed structure.
    #[error("Invalid format: {0}")]
    Format(String),

    /// A declared length runs past the available bytes.
    #[error("Truncated data: {0}")]
    TruncatedData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sprite has no frames")]
    EmptySprite,

    /// The external PNG encoder rejected the image.
    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<image::ImageError> for PixError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => PixError::Io(io),
            other => PixError::Encode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PixError>;
