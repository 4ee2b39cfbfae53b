use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: hepio_format::Error,
    },

    #[error("Cannot read catalog of `{}`", .path.display())]
    ReadCatalog {
        path: PathBuf,
        #[source]
        source: hepio_format::Error,
    },

    #[error("Cannot extract `{}` into `{}`", .path.display(), .dest.display())]
    Extract {
        path: PathBuf,
        dest: PathBuf,
        #[source]
        source: hepio_format::Error,
    },

    #[error("Cannot encode catalog as JSON")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}
