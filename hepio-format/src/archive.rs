//! Packing a staging directory into a single tar archive, and back.
//!
//! An archive named `sample.hep` holds one directory entry, `sample`, followed
//! by `sample/__header__` and one `sample/<tuple>` entry per tuple.

use std::collections::BTreeSet;
use std::fs::{File, Metadata};
use std::io::{prelude::*, BufReader, BufWriter, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tar::{Builder, EntryType, Header};
use tracing::{debug, trace};

use crate::{
    catalog::{Catalog, HEADER_NAME},
    name::TupleName,
    Error, Result,
};

/// Mode of the root directory entry (`rwxr-xr--`).
pub const ROOT_MODE: u32 = 0o754;
pub const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,

    /// Seconds since the Unix epoch.
    pub modified: u64,
}

impl ArchiveEntry {
    /// The last path component, which is the tuple name for tuple entries.
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|x| x.to_str())
    }
}

/// The archive's file name with its last `.`-delimited extension removed.
pub fn root_name(archive: &Path) -> Result<String> {
    let name = archive
        .file_name()
        .and_then(|x| x.to_str())
        .ok_or_else(|| Error::InvalidPath(archive.to_path_buf()))?;

    Ok(match name.rfind('.') {
        None | Some(0) => name.to_string(),
        Some(idx) => name[..idx].to_string(),
    })
}

#[inline(always)]
fn mtime(meta: &Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|x| x.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|x| x.as_secs())
        .unwrap_or(0)
}

fn append_file<W: Write>(
    builder: &mut Builder<W>,
    root: &str,
    name: &str,
    file: &mut File,
) -> std::io::Result<u64> {
    let meta = file.metadata()?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(meta.len());
    header.set_mode(FILE_MODE);
    header.set_mtime(mtime(&meta));

    builder.append_data(&mut header, format!("{}/{}", root, name), file)?;
    trace!(root, name, size = meta.len(), "packed entry");
    Ok(meta.len())
}

/// Writes the archive: the root directory, then the header stream from its
/// first byte, then each tuple file in the given order.
pub(crate) fn pack(archive: &Path, header: &mut File, tuples: &[PathBuf]) -> Result<()> {
    let root = root_name(archive)?;
    let out = File::create(archive).map_err(|e| Error::Path(e, archive.to_path_buf()))?;
    let mut builder = Builder::new(BufWriter::new(out));

    let mut dir = Header::new_gnu();
    dir.set_entry_type(EntryType::Directory);
    dir.set_mode(ROOT_MODE);
    dir.set_size(0);
    dir.set_mtime(0);
    builder.append_data(&mut dir, &root, std::io::empty())?;

    header.seek(SeekFrom::Start(0))?;
    let mut total = append_file(&mut builder, &root, HEADER_NAME, header)?;

    for path in tuples {
        let name = path
            .file_name()
            .and_then(|x| x.to_str())
            .ok_or_else(|| Error::InvalidPath(path.clone()))?;
        let mut file = File::open(path).map_err(|e| Error::Path(e, path.clone()))?;
        total += append_file(&mut builder, &root, name, &mut file)
            .map_err(|e| Error::Path(e, path.clone()))?;
    }

    let out = builder.into_inner()?;
    let out = out
        .into_inner()
        .map_err(|e| Error::Path(e.into(), archive.to_path_buf()))?;
    out.sync_all()?;

    debug!(
        archive = %archive.display(),
        root = %root,
        tuples = tuples.len(),
        bytes = total,
        "packed archive"
    );
    Ok(())
}

/// Copies the archive's header entry into `header` and every other regular
/// entry into `dest/<basename>`. Only the last path component of an entry is
/// ever used, so no entry can be written outside of `dest`.
pub(crate) fn unpack(archive: &Path, dest: &Path, header: &mut File) -> Result<usize> {
    let file = File::open(archive).map_err(|e| Error::Path(e, archive.to_path_buf()))?;
    let mut reader = tar::Archive::new(BufReader::new(file));
    let entries = reader
        .entries()
        .map_err(|e| Error::Archive(e, archive.to_path_buf()))?;

    let mut found_header = false;
    let mut seen = BTreeSet::new();

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::Archive(e, archive.to_path_buf()))?;
        let path = entry
            .path()
            .map_err(|e| Error::Archive(e, archive.to_path_buf()))?
            .into_owned();

        if !entry.header().entry_type().is_file() {
            trace!(path = %path.display(), "skipping non-file entry");
            continue;
        }

        let name = path
            .file_name()
            .and_then(|x| x.to_str())
            .ok_or_else(|| {
                Error::Format(format!("entry '{}' has no usable file name", path.display()))
            })?;

        if name == HEADER_NAME {
            if found_header {
                return Err(Error::Format(format!(
                    "more than one '{}' entry",
                    HEADER_NAME
                )));
            }
            std::io::copy(&mut entry, header)
                .map_err(|e| Error::Archive(e, archive.to_path_buf()))?;
            found_header = true;
            trace!(path = %path.display(), "unpacked header");
            continue;
        }

        let name = TupleName::new(name).map_err(|_| {
            Error::Format(format!("entry '{}' is not a valid tuple", path.display()))
        })?;
        if !seen.insert(name.as_str().to_string()) {
            return Err(Error::Format(format!(
                "more than one entry for tuple '{}'",
                name.as_str()
            )));
        }

        let target = dest.join(name.as_str());
        let mut out = File::create(&target).map_err(|e| Error::Path(e, target.clone()))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| Error::Archive(e, archive.to_path_buf()))?;

        trace!(path = %path.display(), target = %target.display(), "unpacked entry");
    }

    if !found_header {
        return Err(Error::Format(format!("no '{}' entry found", HEADER_NAME)));
    }

    debug!(archive = %archive.display(), tuples = seen.len(), "unpacked archive");
    Ok(seen.len())
}

/// Unpacks an archive into `dest` without opening it as a container. The
/// tuple streams are left compressed.
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest: Q) -> Result<usize> {
    let dest = dest.as_ref();
    std::fs::create_dir_all(dest).map_err(|e| Error::Path(e, dest.to_path_buf()))?;

    let header_path = dest.join(HEADER_NAME);
    let mut header = File::create(&header_path).map_err(|e| Error::Path(e, header_path))?;
    unpack(archive.as_ref(), dest, &mut header)
}

/// Lists the entries of an archive in order without extracting anything.
pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<ArchiveEntry>> {
    let archive = archive.as_ref();
    let file = File::open(archive).map_err(|e| Error::Path(e, archive.to_path_buf()))?;
    let mut reader = tar::Archive::new(BufReader::new(file));

    reader
        .entries()
        .map_err(|e| Error::Archive(e, archive.to_path_buf()))?
        .map(|entry| {
            let entry = entry?;
            let header = entry.header();
            let kind = match header.entry_type() {
                EntryType::Directory => EntryKind::Directory,
                x if x.is_file() => EntryKind::File,
                _ => EntryKind::Other,
            };

            Ok(ArchiveEntry {
                path: entry.path()?.into_owned(),
                kind,
                size: header.size()?,
                modified: header.mtime()?,
            })
        })
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::Archive(e, archive.to_path_buf()))
}

/// Decodes the catalog straight from the archive's header entry.
pub fn read_catalog<P: AsRef<Path>>(archive: P) -> Result<Catalog> {
    let archive = archive.as_ref();
    let file = File::open(archive).map_err(|e| Error::Path(e, archive.to_path_buf()))?;
    let mut reader = tar::Archive::new(BufReader::new(file));

    for entry in reader
        .entries()
        .map_err(|e| Error::Archive(e, archive.to_path_buf()))?
    {
        let entry = entry.map_err(|e| Error::Archive(e, archive.to_path_buf()))?;
        let is_header = entry
            .path()
            .map_err(|e| Error::Archive(e, archive.to_path_buf()))?
            .file_name()
            .map(|x| x == HEADER_NAME)
            .unwrap_or(false);

        if is_header && entry.header().entry_type().is_file() {
            return Catalog::decode(entry);
        }
    }

    Err(Error::Format(format!("no '{}' entry found", HEADER_NAME)))
}
