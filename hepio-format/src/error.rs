use std::path::PathBuf;

use crate::name::IntoTupleNameError;
use crate::tuple::Mode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O operation failed.")]
    Io(#[from] std::io::Error),

    #[error("I/O operation failed. Path: '{}'", .1.display())]
    Path(#[source] std::io::Error, PathBuf),

    #[error("Could not read archive. Is this a valid hepio file? Path: '{}'", .1.display())]
    Archive(#[source] std::io::Error, PathBuf),

    #[error("Invalid archive: {0}")]
    Format(String),

    #[error("Archive path has no usable file name. Path: '{}'", .0.display())]
    InvalidPath(PathBuf),

    #[error("No metadata for tuple '{0}'.")]
    NotFound(String),

    #[error("Tuple '{0}' is in {1} mode.")]
    Mode(String, Mode),

    #[error("Encoding or decoding a value failed.")]
    Codec(#[from] bincode::Error),

    #[error("Invalid tuple name '{1}'.")]
    InvalidName(#[source] IntoTupleNameError, String),

    #[error("Tuple '{0}' is already registered with this container.")]
    AlreadyRegistered(String),

    #[error("Tuple '{0}' is closed.")]
    Closed(String),
}
