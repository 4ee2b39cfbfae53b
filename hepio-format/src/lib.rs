//! Herein lies the brains of the `hepio` container format.
//!
//! Use [HepFile][HepFile] to create or open a container, and the [Tuple][Tuple]s
//! it hands out to append or read records. Any `serde` type can be a record.
//!
//! ```no_run
//! use hepio_format::HepFile;
//!
//! # fn main() -> hepio_format::Result<()> {
//! let mut file = HepFile::create("run.hep")?;
//! let events = file.create_tuple("events")?;
//! events.write(&42i64)?;
//! events.write(&7i64)?;
//! file.close()?;
//!
//! let mut file = HepFile::open("run.hep")?;
//! let events = file.open_tuple("events")?;
//! assert_eq!(events.entries(), 2);
//! while let Some(value) = events.read::<i64>()? {
//!     println!("{}", value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
mod catalog;
mod compression;
mod error;
mod file;
pub mod name;
mod options;
mod tuple;

pub use archive::{ArchiveEntry, EntryKind};
pub use catalog::{Catalog, TupleMetadata, CATALOG_VERSION, HEADER_NAME};
pub use compression::Compression;
pub use error::{Error, Result};
pub use file::HepFile;
pub use name::TupleName;
pub use options::{Options, DEFAULT_RECORD_LIMIT, STAGING_ROOT};
pub use tuple::{Mode, Records, Tuple};
