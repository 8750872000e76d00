use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ImageError {
    pub fn is_capacity(&self) -> bool {
        matches!(self, ImageError::CapacityExceeded(_))
    }
}

pub type ImageResult<T> = Result<T, ImageError>;
