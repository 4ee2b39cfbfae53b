use std::collections::{btree_map::Entry, BTreeMap};
use std::fs::{File, OpenOptions};
use std::io::{prelude::*, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    archive,
    catalog::{Catalog, TupleMetadata, HEADER_NAME},
    name::TupleName,
    options::Options,
    tuple::Tuple,
    Error, Result,
};

/// A container of tuples, packaged as a single archive when closed.
///
/// While a `HepFile` is open, its tuples live as separate compressed files in
/// a staging directory next to the archive. [close][HepFile::close] writes the
/// catalog, packs the staging directory into the archive and removes it.
/// Dropping a `HepFile` without closing it removes the staging directory and
/// leaves any existing archive untouched.
pub struct HepFile {
    path: PathBuf,
    staging: PathBuf,
    header: Option<File>,
    tuples: BTreeMap<String, Tuple>,
    catalog: Option<Catalog>,
    options: Options,
    staging_removed: bool,
}

impl std::fmt::Debug for HepFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HepFile")
            .field("path", &self.path)
            .field("staging", &self.staging)
            .field("tuples", &self.tuples)
            .field("catalog", &self.catalog)
            .field("options", &self.options)
            .finish()
    }
}

impl Drop for HepFile {
    fn drop(&mut self) {
        if self.staging_removed {
            return;
        }

        self.tuples.clear();
        self.header = None;

        if let Err(error) = self.remove_staging() {
            warn!(staging = %self.staging.display(), %error, "could not remove staging directory");
        }
    }
}

impl HepFile {
    /// This will create a new, empty container. The archive itself is only
    /// written by [close][HepFile::close], replacing any file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<HepFile> {
        HepFile::create_with_options(path, Options::default())
    }

    pub fn create_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<HepFile> {
        let mut file = HepFile::new(path.as_ref(), options)?;
        file.recreate_staging()?;
        file.header = Some(file.create_header()?);
        file.catalog = Some(Catalog::new());

        debug!(archive = %file.path.display(), staging = %file.staging.display(), "created container");
        Ok(file)
    }

    /// This will open an existing archive, unpacking its tuples into the
    /// staging directory, and error if the archive is not valid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<HepFile> {
        HepFile::open_with_options(path, Options::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<HepFile> {
        let mut file = HepFile::new(path.as_ref(), options)?;
        file.recreate_staging()?;

        let mut header = file.create_header()?;
        let count = archive::unpack(&file.path, &file.staging, &mut header)?;
        file.header = Some(header);

        debug!(
            archive = %file.path.display(),
            staging = %file.staging.display(),
            files = count,
            "opened container"
        );
        Ok(file)
    }

    fn new(path: &Path, options: Options) -> Result<HepFile> {
        let staging = options.staging_dir_for(path)?;

        Ok(HepFile {
            path: path.to_path_buf(),
            staging,
            header: None,
            tuples: BTreeMap::new(),
            catalog: None,
            options,
            staging_removed: false,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    #[inline(always)]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Names of the registered tuples, in the order they will be packed.
    pub fn tuple_names(&self) -> impl Iterator<Item = &str> {
        self.tuples.keys().map(|x| x.as_str())
    }

    pub fn tuple(&self, name: &str) -> Option<&Tuple> {
        self.tuples.get(name)
    }

    pub fn tuple_mut(&mut self, name: &str) -> Option<&mut Tuple> {
        self.tuples.get_mut(name)
    }

    /// The catalog this container was opened with. A created container has
    /// an empty catalog. The header stream is decoded on first use only.
    pub fn catalog(&mut self) -> Result<&Catalog> {
        let catalog = match self.catalog.take() {
            Some(catalog) => catalog,
            None => {
                let header = header_stream(&mut self.header)?;
                Catalog::read_from(header)?
            }
        };

        Ok(self.catalog.get_or_insert(catalog))
    }

    pub fn create_tuple<S: AsRef<str>>(&mut self, name: S) -> Result<&mut Tuple> {
        let name = tuple_name(name.as_ref())?;
        let path = self.staging.join(&name);
        let compression = self.options.compression;
        let limit = self.options.record_limit;

        match self.tuples.entry(name) {
            Entry::Occupied(entry) => Err(Error::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                let tuple = Tuple::create(entry.key().clone(), path, compression, limit)?;
                Ok(entry.insert(tuple))
            }
        }
    }

    pub fn open_tuple<S: AsRef<str>>(&mut self, name: S) -> Result<&mut Tuple> {
        let name = tuple_name(name.as_ref())?;
        if self.tuples.contains_key(&name) {
            return Err(Error::AlreadyRegistered(name));
        }

        let entries = self.catalog()?.entries(&name)?;
        let path = self.staging.join(&name);
        let limit = self.options.record_limit;

        match self.tuples.entry(name) {
            Entry::Occupied(entry) => Err(Error::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                let tuple = Tuple::open(entry.key().clone(), path, entries, limit)?;
                Ok(entry.insert(tuple))
            }
        }
    }

    /// Closes every tuple, writes the catalog to the header stream, packs the
    /// archive and removes the staging directory.
    ///
    /// The first failure is returned as is. Nothing is rolled back, so after
    /// an error both the archive and the staging directory must be considered
    /// garbage.
    pub fn close(mut self) -> Result<()> {
        let mut catalog = Catalog::new();
        for (name, tuple) in self.tuples.iter_mut() {
            tuple.close()?;
            catalog.insert(TupleMetadata {
                name: name.clone(),
                entries: tuple.entries(),
            });
        }

        let mut header = self
            .header
            .take()
            .ok_or_else(|| Error::Format(format!("'{}' stream is gone", HEADER_NAME)))?;
        header.set_len(0)?;
        header.seek(SeekFrom::Start(0))?;
        let mut header = catalog.write(header, self.options.compression)?;
        header.sync_all()?;
        header.seek(SeekFrom::Start(0))?;

        let files = self
            .tuples
            .values()
            .map(|x| x.path().to_path_buf())
            .collect::<Vec<_>>();
        archive::pack(&self.path, &mut header, &files)?;
        drop(header);

        self.tuples.clear();
        self.remove_staging()?;

        debug!(archive = %self.path.display(), tuples = catalog.len(), "closed container");
        Ok(())
    }

    #[inline(always)]
    fn header_path(&self) -> PathBuf {
        self.staging.join(HEADER_NAME)
    }

    fn create_header(&self) -> Result<File> {
        let path = self.header_path();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::Path(e, path))
    }

    fn recreate_staging(&mut self) -> Result<()> {
        match std::fs::remove_dir_all(&self.staging) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(Error::Path(e, self.staging.clone()))
            }
            _ => {}
        }

        std::fs::create_dir_all(&self.staging).map_err(|e| Error::Path(e, self.staging.clone()))
    }

    fn remove_staging(&mut self) -> Result<()> {
        match std::fs::remove_dir_all(&self.staging) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(Error::Path(e, self.staging.clone()))
            }
            _ => {}
        }
        self.staging_removed = true;

        // The shared default root is only removed once no other container uses it.
        if self.options.uses_default_root() {
            if let Some(root) = self.staging.parent() {
                let _ = std::fs::remove_dir(root);
            }
        }

        debug!(staging = %self.staging.display(), "removed staging directory");
        Ok(())
    }
}

fn header_stream(header: &mut Option<File>) -> Result<&mut File> {
    header
        .as_mut()
        .ok_or_else(|| Error::Format(format!("'{}' stream is gone", HEADER_NAME)))
}

fn tuple_name(name: &str) -> Result<String> {
    TupleName::new(name)
        .map(TupleName::into_string)
        .map_err(|e| Error::InvalidName(e, name.to_string()))
}
