//! Error types and handling for shmarray

/// Result type alias for shmarray operations
pub type Result<T> = std::result::Result<T, ShmError>;

/// Error types for shared array operations
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// I/O related errors (file operations, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Dimensionality beyond what a region header can describe
    #[error("number of dimensions must be within [0, {max}], got {ndims}")]
    TooManyDims { ndims: usize, max: usize },

    /// Element type code outside the supported set
    #[error("unsupported element type code {code}")]
    UnsupportedType { code: i32 },

    /// The file exists but does not hold a valid shared array region
    #[error("no shared array at {name}")]
    NotAnArray { name: String },

    /// An array with this name already exists
    #[error("array already exists: {name}")]
    ArrayExists { name: String },

    /// No array with this name
    #[error("array not found: {name}")]
    ArrayNotFound { name: String },

    /// Operation not supported by the configured collaborator
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },
}

impl ShmError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a dimensionality error
    pub fn too_many_dims(ndims: usize) -> Self {
        Self::TooManyDims {
            ndims,
            max: crate::descriptor::MAX_DIMS,
        }
    }

    /// Create an unsupported type error
    pub fn unsupported_type(code: i32) -> Self {
        Self::UnsupportedType { code }
    }

    /// Create a "not a shared array" error
    pub fn not_an_array(name: impl Into<String>) -> Self {
        Self::NotAnArray { name: name.into() }
    }

    /// Create an array exists error
    pub fn array_exists(name: impl Into<String>) -> Self {
        Self::ArrayExists { name: name.into() }
    }

    /// Create an array not found error
    pub fn array_not_found(name: impl Into<String>) -> Self {
        Self::ArrayNotFound { name: name.into() }
    }

    /// Create an unsupported operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

impl From<std::io::Error> for ShmError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}
