use std::path::PathBuf;

use hepio_format::{archive, HEADER_NAME};

use crate::error::{Error, Result};

pub fn run(path: PathBuf, output: Option<PathBuf>, verbose: bool) -> Result<()> {
    let dest = match output {
        Some(dest) => dest,
        None => archive::root_name(&path)
            .map(PathBuf::from)
            .map_err(|source| Error::OpenArchive {
                path: path.clone(),
                source,
            })?,
    };

    let count = archive::extract(&path, &dest).map_err(|source| Error::Extract {
        path: path.clone(),
        dest: dest.clone(),
        source,
    })?;

    if verbose {
        println!("{}", dest.join(HEADER_NAME).display());
        if let Ok(entries) = std::fs::read_dir(&dest) {
            for entry in entries.flatten() {
                if entry.file_name() != HEADER_NAME {
                    println!("{}", entry.path().display());
                }
            }
        }
    }

    println!("Extracted {} tuples to {}", count, dest.display());
    Ok(())
}
