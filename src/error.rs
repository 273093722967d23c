use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// I/O errors that can occur when reading a raster resource
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Requested bounding box does not intersect the resource
    #[error("Bounding box {bbox} is outside the bounds of {resource}")]
    OutsideBounds { resource: String, bbox: String },

    /// Any other read failure
    #[error("Read error: {0}")]
    Read(String),
}

/// Errors raised while constructing or running a tile algorithm
#[derive(Debug, Clone, Error)]
pub enum AlgorithmError {
    /// No algorithm registered under this name
    #[error("Unknown algorithm: {name}")]
    UnknownAlgorithm { name: String },

    /// Parameters failed to parse or validate
    #[error("Invalid parameters for '{algorithm}': {message}")]
    InvalidParameters { algorithm: String, message: String },

    /// Input tile is smaller than the buffered window the algorithm expects
    #[error(
        "Tile of {height}x{width} pixels is smaller than the required buffered size of {required}x{required}"
    )]
    BufferTooSmall {
        required: usize,
        height: usize,
        width: usize,
    },

    /// Tile has no bands to process
    #[error("Tile has no bands")]
    EmptyTile,

    /// Tile carries no dataset-wide statistics to rescale with
    #[error("Tile has no dataset statistics")]
    MissingDatasetStatistics,

    /// Tile carries no source asset to compute bbox statistics from
    #[error("Tile has no source asset identifier")]
    MissingAsset,

    /// I/O error while computing statistics
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors raised while resolving a colormap
#[derive(Debug, Clone, Error)]
pub enum ColormapError {
    /// No palette registered under this name
    #[error("Unknown colormap: {name}")]
    UnknownColormap { name: String },

    /// Custom colormap JSON could not be parsed
    #[error("Could not parse the colormap value.")]
    Malformed,
}

/// Top-level error for a processed tile request
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error(transparent)]
    Colormap(#[from] ColormapError),

    /// Output image could not be encoded
    #[error("Failed to encode tile: {message}")]
    Encode { message: String },
}

// =============================================================================
// Status Mapping
// =============================================================================

impl IoError {
    /// HTTP status this error should surface as.
    ///
    /// Every read failure, a missing resource included, is a server failure.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl AlgorithmError {
    /// HTTP status this error should surface as.
    ///
    /// Parameter problems are the client's fault; a buffer precondition
    /// violation is a contract violation by the calling layer and is fatal.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AlgorithmError::UnknownAlgorithm { .. } | AlgorithmError::InvalidParameters { .. } => {
                StatusCode::BAD_REQUEST
            }
            AlgorithmError::Io(io_err) => io_err.status_code(),
            AlgorithmError::BufferTooSmall { .. }
            | AlgorithmError::EmptyTile
            | AlgorithmError::MissingDatasetStatistics
            | AlgorithmError::MissingAsset => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AlgorithmError::UnknownAlgorithm { .. } => "unknown_algorithm",
            AlgorithmError::InvalidParameters { .. } => "invalid_parameters",
            AlgorithmError::BufferTooSmall { .. } => "buffer_too_small",
            AlgorithmError::EmptyTile => "empty_tile",
            AlgorithmError::MissingDatasetStatistics => "missing_statistics",
            AlgorithmError::MissingAsset => "missing_asset",
            AlgorithmError::Io(IoError::NotFound(_)) => "not_found",
            AlgorithmError::Io(_) => "io_error",
        }
    }
}

impl ColormapError {
    /// Every colormap failure is a bad request.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl ProcessError {
    /// HTTP status this error should surface as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProcessError::Algorithm(e) => e.status_code(),
            ProcessError::Colormap(e) => e.status_code(),
            ProcessError::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller sent something invalid.
    pub fn is_bad_request(&self) -> bool {
        self.status_code() == StatusCode::BAD_REQUEST
    }

    fn error_type(&self) -> &'static str {
        match self {
            ProcessError::Algorithm(e) => e.error_type(),
            ProcessError::Colormap(ColormapError::UnknownColormap { .. }) => "unknown_colormap",
            ProcessError::Colormap(ColormapError::Malformed) => "invalid_colormap",
            ProcessError::Encode { .. } => "encode_error",
        }
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// JSON error body handed to the request-handling layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_colormap")
    pub error: String,

    /// Human-readable detail message
    pub message: String,

    /// HTTP status code
    pub status: u16,
}

impl From<&ProcessError> for ErrorResponse {
    /// Build the response body, logging by severity:
    /// 5xx at ERROR, 4xx at WARN.
    fn from(err: &ProcessError) -> Self {
        let status = err.status_code();
        let error_type = err.error_type();
        let message = err.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        Self {
            error: error_type.to_string(),
            message,
            status: status.as_u16(),
        }
    }
}
