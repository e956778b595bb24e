//! Restore command implementation

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tandem::restore_to_path;

pub fn execute(db: &str, from: PathBuf) -> Result<()> {
    if db == ":memory:" {
        bail!("Cannot restore into an in-memory database");
    }

    let file = File::open(&from).with_context(|| format!("Failed to open {}", from.display()))?;
    let mut reader = BufReader::new(file);
    let bytes = restore_to_path(&mut reader, Path::new(db))
        .with_context(|| format!("Failed to restore {}", db))?;

    println!("Restored {} from {} ({} bytes)", db, from.display(), bytes);
    Ok(())
}
