//! Backup command implementation

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tandem::prelude::*;

pub fn execute(
    db: &str,
    mut config: ConnectorConfig,
    out: PathBuf,
    pages_per_step: Option<i32>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    if let Some(pages) = pages_per_step {
        config.backup.pages_per_step = pages;
    }
    let connector = Connector::new(db, config)?;
    let conn = connector.open_raw().context("Failed to open database")?;

    let mut ctx = BackupContext::new();
    if let Some(secs) = timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let bytes = if out.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut sink = stdout.lock();
        let bytes = connector.backup(&ctx, EngineConnection::Raw(&conn), &mut sink)?;
        sink.flush()?;
        bytes
    } else {
        let file = File::create(&out)
            .with_context(|| format!("Failed to create {}", out.display()))?;
        let mut sink = BufWriter::new(file);
        let result = connector
            .backup(&ctx, EngineConnection::Raw(&conn), &mut sink)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                sink.flush()?;
                Ok(bytes)
            });
        match result {
            Ok(bytes) => bytes,
            Err(e) => {
                // A partial snapshot is useless
                drop(sink);
                let _ = std::fs::remove_file(&out);
                return Err(e);
            }
        }
    };

    if out.as_os_str() != "-" {
        println!("Wrote {} byte snapshot of {} to {}", bytes, db, out.display());
    }
    Ok(())
}
