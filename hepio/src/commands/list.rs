use std::collections::HashMap;
use std::path::PathBuf;

use hepio_format::{archive, ArchiveEntry, EntryKind};

use crate::error::{Error, Result};

#[inline(always)]
fn time(secs: u64) -> String {
    if secs == 0 {
        return "-".into();
    }

    let datetime: chrono::DateTime<chrono::Utc> =
        (std::time::UNIX_EPOCH + std::time::Duration::new(secs, 0)).into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[inline(always)]
fn size(bytes: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};

    bytes
        .file_size(options::BINARY)
        .unwrap_or_else(|_| bytes.to_string())
}

pub fn run(path: PathBuf, json: bool) -> Result<()> {
    let catalog = archive::read_catalog(&path).map_err(|source| Error::ReadCatalog {
        path: path.clone(),
        source,
    })?;
    let entries = archive::list(&path).map_err(|source| Error::OpenArchive {
        path: path.clone(),
        source,
    })?;

    let files = entries
        .iter()
        .filter(|x| x.kind == EntryKind::File)
        .filter_map(|x| x.name().map(|name| (name, x)))
        .collect::<HashMap<&str, &ArchiveEntry>>();

    if json {
        let tuples = catalog
            .iter()
            .map(|tuple| {
                let entry = files.get(tuple.name.as_str());
                serde_json::json!({
                    "name": tuple.name,
                    "entries": tuple.entries,
                    "compressed": entry.map(|x| x.size),
                    "modified": entry.map(|x| x.modified),
                })
            })
            .collect::<Vec<_>>();
        let value = serde_json::json!({
            "version": catalog.version(),
            "tuples": tuples,
        });

        let out = serde_json::to_string_pretty(&value).map_err(|source| Error::Json { source })?;
        println!("{}", out);
        return Ok(());
    }

    println!("Entries       Compressed     Modified               Tuple");
    println!("------------  -------------  ---------------------  --------");
    for tuple in catalog.iter() {
        let (compressed, modified) = match files.get(tuple.name.as_str()) {
            Some(entry) => (size(entry.size), time(entry.modified)),
            None => ("<missing>".to_string(), "-".to_string()),
        };

        println!(
            "{:>12}  {:>13}  {:<21}  {}",
            tuple.entries, compressed, modified, tuple.name,
        );
    }

    Ok(())
}
