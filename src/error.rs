use std::path::PathBuf;
use thiserror::Error;

/// Fatal conversion errors. Missing input files and unresolved tokens are not errors.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("dataset root does not exist: {0}")]
    MissingDataroot(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load table `{table}` from {path}: {source}")]
    Table {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write array {path}: {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("point cloud {path} holds {len} bytes, not a whole number of 5-float points")]
    MalformedPointCloud { path: PathBuf, len: usize },

    #[error("array shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
