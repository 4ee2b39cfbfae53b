use std::fmt;
use std::fs::File;
use std::io::{prelude::*, BufReader, BufWriter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use bincode::Options as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, trace};

use crate::{catalog::codec, compression::Compression, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    Read,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Write => f.write_str("write"),
            Mode::Read => f.write_str("read"),
        }
    }
}

enum Stream {
    Writer(GzEncoder<BufWriter<File>>),
    Reader(BufReader<GzDecoder<File>>),
}

/// An append-only stream of records stored in one compressed file of a
/// container. A tuple is created for writing or opened for reading, never both.
pub struct Tuple {
    name: String,
    path: PathBuf,
    mode: Mode,
    stream: Option<Stream>,
    entries: u64,
    consumed: u64,
    limit: u64,
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuple")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("entries", &self.entries)
            .field("consumed", &self.consumed)
            .field("closed", &self.stream.is_none())
            .finish()
    }
}

impl Tuple {
    pub(crate) fn create(
        name: String,
        path: PathBuf,
        compression: Compression,
        limit: u64,
    ) -> Result<Tuple> {
        let file = File::create(&path).map_err(|e| Error::Path(e, path.clone()))?;
        let encoder = compression.encoder(BufWriter::new(file));

        debug!(tuple = %name, path = %path.display(), %compression, "created tuple");

        Ok(Tuple {
            name,
            path,
            mode: Mode::Write,
            stream: Some(Stream::Writer(encoder)),
            entries: 0,
            consumed: 0,
            limit,
        })
    }

    pub(crate) fn open(name: String, path: PathBuf, entries: u64, limit: u64) -> Result<Tuple> {
        let file = File::open(&path).map_err(|e| Error::Path(e, path.clone()))?;
        let decoder = BufReader::new(Compression::decoder(file));

        debug!(tuple = %name, path = %path.display(), entries, "opened tuple");

        Ok(Tuple {
            name,
            path,
            mode: Mode::Read,
            stream: Some(Stream::Reader(decoder)),
            entries,
            consumed: 0,
            limit,
        })
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The running number of records written, or for a tuple opened for
    /// reading, the count recorded in the catalog when the archive was closed.
    #[inline(always)]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    #[inline(always)]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Appends one record. The record is encoded completely before any byte
    /// reaches the stream, so a failed encode leaves both the stream and the
    /// count untouched. Records larger than the record limit are refused.
    pub fn write<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<()> {
        let encoder = match (self.mode, self.stream.as_mut()) {
            (Mode::Read, _) => return Err(Error::Mode(self.name.clone(), Mode::Read)),
            (_, Some(Stream::Writer(encoder))) => encoder,
            _ => return Err(Error::Closed(self.name.clone())),
        };

        let bytes = codec(self.limit).serialize(record)?;
        encoder
            .write_all(&bytes)
            .map_err(|e| Error::Path(e, self.path.clone()))?;

        self.entries += 1;
        trace!(tuple = %self.name, bytes = bytes.len(), entries = self.entries, "wrote record");
        Ok(())
    }

    /// Decodes the next record, or returns `None` once every record counted
    /// in the catalog has been read.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let decoder = match (self.mode, self.stream.as_mut()) {
            (Mode::Write, _) => return Err(Error::Mode(self.name.clone(), Mode::Write)),
            (_, Some(Stream::Reader(decoder))) => decoder,
            _ => return Err(Error::Closed(self.name.clone())),
        };

        if self.consumed >= self.entries {
            return Ok(None);
        }

        let record = codec(self.limit).deserialize_from(decoder)?;
        self.consumed += 1;
        Ok(Some(record))
    }

    pub fn records<T: DeserializeOwned>(&mut self) -> Records<'_, T> {
        Records {
            tuple: self,
            done: false,
            _marker: PhantomData,
        }
    }

    /// Finishes the stream. A tuple opened for writing gets its gzip trailer
    /// and is synced to disk. Closing a closed tuple does nothing.
    pub fn close(&mut self) -> Result<()> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => return Ok(()),
        };

        match stream {
            Stream::Writer(encoder) => {
                let writer = encoder
                    .finish()
                    .map_err(|e| Error::Path(e, self.path.clone()))?;
                let file = writer
                    .into_inner()
                    .map_err(|e| Error::Path(e.into(), self.path.clone()))?;
                file.sync_all()
                    .map_err(|e| Error::Path(e, self.path.clone()))?;
            }
            Stream::Reader(decoder) => drop(decoder),
        }

        debug!(tuple = %self.name, mode = %self.mode, entries = self.entries, "closed tuple");
        Ok(())
    }
}

/// Iterator over the remaining records of a tuple opened for reading.
pub struct Records<'a, T> {
    tuple: &'a mut Tuple,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Iterator for Records<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.tuple.read().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_RECORD_LIMIT as LIMIT;
    use serde::{ser, Serializer};

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(ser::Error::custom("refusing to encode"))
        }
    }

    fn written(dir: &Path, values: &[i64]) -> PathBuf {
        let path = dir.join("events");
        let mut tuple =
            Tuple::create("events".into(), path.clone(), Compression::default(), LIMIT).unwrap();
        for v in values {
            tuple.write(v).unwrap();
        }
        tuple.close().unwrap();
        path
    }

    #[test]
    fn write_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut tuple =
            Tuple::create("events".into(), dir.path().join("events"), Compression::default(), LIMIT)
                .unwrap();

        assert_eq!(tuple.entries(), 0);
        tuple.write(&42i64).unwrap();
        tuple.write(&7i64).unwrap();
        assert_eq!(tuple.entries(), 2);
        assert_eq!(tuple.mode(), Mode::Write);
    }

    #[test]
    fn read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = written(dir.path(), &[42, 7]);

        let mut tuple = Tuple::open("events".into(), path, 2, LIMIT).unwrap();
        assert_eq!(tuple.read::<i64>().unwrap(), Some(42));
        assert_eq!(tuple.read::<i64>().unwrap(), Some(7));
        assert_eq!(tuple.read::<i64>().unwrap(), None);
        assert_eq!(tuple.read::<i64>().unwrap(), None);
    }

    #[test]
    fn records_iterator() {
        let dir = tempfile::tempdir().unwrap();
        let path = written(dir.path(), &[1, 2, 3, 5, 8]);

        let mut tuple = Tuple::open("events".into(), path, 5, LIMIT).unwrap();
        let values = tuple.records::<i64>().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(values, vec![1, 2, 3, 5, 8]);
    }

    #[test]
    fn truncated_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = written(dir.path(), &[1, 2]);

        // The count claims more records than the stream holds.
        let mut tuple = Tuple::open("events".into(), path, 3, LIMIT).unwrap();
        assert_eq!(tuple.read::<i64>().unwrap(), Some(1));
        assert_eq!(tuple.read::<i64>().unwrap(), Some(2));
        assert!(matches!(tuple.read::<i64>(), Err(Error::Codec(_))));
    }

    #[test]
    fn mode_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            Tuple::create("jets".into(), dir.path().join("jets"), Compression::default(), LIMIT)
                .unwrap();
        assert!(matches!(writer.read::<i64>(), Err(Error::Mode(_, Mode::Write))));
        writer.write(&1i64).unwrap();
        writer.close().unwrap();

        let mut reader = Tuple::open("jets".into(), dir.path().join("jets"), 1, LIMIT).unwrap();
        assert!(matches!(reader.write(&1i64), Err(Error::Mode(_, Mode::Read))));
        assert_eq!(reader.entries(), 1);
    }

    #[test]
    fn close_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut tuple =
            Tuple::create("events".into(), dir.path().join("events"), Compression::default(), LIMIT)
                .unwrap();
        tuple.write(&"hello").unwrap();
        tuple.close().unwrap();
        tuple.close().unwrap();

        assert!(tuple.is_closed());
        assert!(matches!(tuple.write(&"again"), Err(Error::Closed(_))));
        assert_eq!(tuple.entries(), 1);
        assert_eq!(tuple.mode(), Mode::Write);
    }

    #[test]
    fn failed_encode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events");
        let mut tuple = Tuple::create("events".into(), path.clone(), Compression::default(), LIMIT)
            .unwrap();

        tuple.write(&1u8).unwrap();
        assert!(matches!(tuple.write(&Unencodable), Err(Error::Codec(_))));
        assert_eq!(tuple.entries(), 1);
        tuple.write(&2u8).unwrap();
        assert_eq!(tuple.entries(), 2);
        tuple.close().unwrap();

        let mut tuple = Tuple::open("events".into(), path, 2, LIMIT).unwrap();
        assert_eq!(tuple.read::<u8>().unwrap(), Some(1));
        assert_eq!(tuple.read::<u8>().unwrap(), Some(2));
        assert_eq!(tuple.read::<u8>().unwrap(), None);
    }

    #[test]
    fn oversized_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events");
        let mut tuple =
            Tuple::create("events".into(), path.clone(), Compression::default(), 16).unwrap();

        assert!(matches!(tuple.write(&"x".repeat(64)), Err(Error::Codec(_))));
        assert_eq!(tuple.entries(), 0);
        tuple.write(&"short").unwrap();
        tuple.close().unwrap();

        let mut tuple = Tuple::open("events".into(), path, 1, 16).unwrap();
        assert_eq!(tuple.read::<String>().unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn oversized_length_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events");
        let mut tuple = Tuple::create("events".into(), path.clone(), Compression::default(), LIMIT)
            .unwrap();
        tuple.write(&(u64::MAX >> 2)).unwrap();
        tuple.close().unwrap();

        // The stored u64 reads back as the length prefix of a huge string.
        let mut tuple = Tuple::open("events".into(), path, 1, LIMIT).unwrap();
        assert!(matches!(tuple.read::<String>(), Err(Error::Codec(_))));
    }
}
