use std::path::{Path, PathBuf};

use crate::{compression::Compression, Error, Result};

/// Name of the directory, next to the archive, under which staging directories
/// are created unless [Options::staging_root][Options::staging_root] says otherwise.
pub const STAGING_ROOT: &str = "__hepio__";

/// Largest encoded record, in bytes, accepted by default.
pub const DEFAULT_RECORD_LIMIT: u64 = 64 << 20;

#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) staging_root: Option<PathBuf>,
    pub(crate) compression: Compression,
    pub(crate) record_limit: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            staging_root: None,
            compression: Compression::default(),
            record_limit: DEFAULT_RECORD_LIMIT,
        }
    }
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Stage tuple streams under `<root>/<archive file name>` instead of
    /// `<archive dir>/__hepio__/<archive file name>`.
    pub fn staging_root<P: Into<PathBuf>>(mut self, root: P) -> Options {
        self.staging_root = Some(root.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Options {
        self.compression = compression;
        self
    }

    /// Caps the encoded size of a single record. Writing a larger record, or
    /// reading one whose length prefix claims more, fails with a codec error
    /// before anything is allocated for it.
    pub fn record_limit(mut self, bytes: u64) -> Options {
        self.record_limit = bytes;
        self
    }

    #[inline(always)]
    pub(crate) fn uses_default_root(&self) -> bool {
        self.staging_root.is_none()
    }

    pub(crate) fn staging_dir_for(&self, archive: &Path) -> Result<PathBuf> {
        let file_name = archive
            .file_name()
            .ok_or_else(|| Error::InvalidPath(archive.to_path_buf()))?;

        let root = match &self.staging_root {
            Some(root) => root.clone(),
            None => archive
                .parent()
                .filter(|x| !x.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .join(STAGING_ROOT),
        };

        let dir = root.join(file_name);
        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(std::env::current_dir()?.join(dir))
        }
    }
}
