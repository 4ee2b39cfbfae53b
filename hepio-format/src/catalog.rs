use std::collections::BTreeMap;
use std::io::{prelude::*, SeekFrom};

use bincode::Options as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{compression::Compression, Error, Result};

/// Name of the entry holding the catalog, both in the staging directory and
/// under the archive root.
pub const HEADER_NAME: &str = "__header__";

pub const CATALOG_VERSION: u32 = 0x0000_0001;

/// Upper bound on the decoded size of a catalog.
const CATALOG_LIMIT: u64 = 16 << 20;

/// The record encoding shared by the catalog and the tuples: bincode's
/// fixed-width layout, refusing any value whose encoding exceeds `limit` bytes.
/// Length prefixes are checked against the limit before anything is allocated.
pub(crate) fn codec(limit: u64) -> impl bincode::Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleMetadata {
    pub name: String,

    /// Number of records written to the tuple before its container was closed.
    pub entries: u64,
}

/// The index of every tuple in an archive, keyed by tuple name. Written once
/// into the header stream when a container is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub(crate) version: u32,
    pub(crate) tuples: BTreeMap<String, TupleMetadata>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new()
    }
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog {
            version: CATALOG_VERSION,
            tuples: BTreeMap::new(),
        }
    }

    #[inline(always)]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline(always)]
    pub fn get(&self, name: &str) -> Option<&TupleMetadata> {
        self.tuples.get(name)
    }

    pub fn entries(&self, name: &str) -> Result<u64> {
        self.get(name)
            .map(|x| x.entries)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TupleMetadata> {
        self.tuples.values()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub(crate) fn insert(&mut self, metadata: TupleMetadata) {
        self.tuples.insert(metadata.name.clone(), metadata);
    }

    /// Compresses the version tag followed by the tuple map into `writer`,
    /// returning the writer once the gzip trailer has been written.
    pub fn write<W: Write>(&self, writer: W, compression: Compression) -> Result<W> {
        let mut encoder = compression.encoder(writer);
        encoder.write_all(&bincode::serialize(&self.version)?)?;
        encoder.write_all(&bincode::serialize(&self.tuples)?)?;
        let writer = encoder.finish()?;

        debug!(
            version = self.version,
            tuples = self.tuples.len(),
            "wrote catalog"
        );
        Ok(writer)
    }

    pub fn decode<R: Read>(reader: R) -> Result<Catalog> {
        let mut decoder = Compression::decoder(reader);

        let version: u32 = codec(CATALOG_LIMIT).deserialize_from(&mut decoder)?;
        if version != CATALOG_VERSION {
            return Err(Error::Format(format!(
                "unsupported catalog version {:#x}",
                version
            )));
        }

        let tuples: BTreeMap<String, TupleMetadata> =
            codec(CATALOG_LIMIT).deserialize_from(&mut decoder)?;
        debug!(version, tuples = tuples.len(), "decoded catalog");

        Ok(Catalog { version, tuples })
    }

    /// Decodes the catalog from the start of `stream`. The stream position is
    /// the same on return as on entry, whether or not decoding succeeded.
    pub fn read_from<S: Read + Seek>(stream: &mut S) -> Result<Catalog> {
        let pos = stream.seek(SeekFrom::Current(0))?;
        trace!(pos, "saving header position");

        stream.seek(SeekFrom::Start(0))?;
        let catalog = Catalog::decode(&mut *stream);
        stream.seek(SeekFrom::Start(pos))?;

        catalog
    }
}
