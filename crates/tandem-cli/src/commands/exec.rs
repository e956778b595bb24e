//! Exec command implementation

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tandem::prelude::*;

/// Changesets buffered between the committing statement and the printer.
const CHANNEL_CAPACITY: usize = 64;

pub fn execute(
    db: &str,
    config: ConnectorConfig,
    sql: Option<String>,
    file: Option<PathBuf>,
    compact: bool,
) -> Result<()> {
    let sql = match (sql, file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Nothing to execute: pass SQL or --file"),
    };

    let (publisher, changesets) = ChannelPublisher::bounded(CHANNEL_CAPACITY);
    let printer = thread::spawn(move || -> Result<usize> {
        let mut printed = 0;
        for changeset in changesets {
            let json = if compact {
                serde_json::to_string(&changeset)?
            } else {
                serde_json::to_string_pretty(&changeset)?
            };
            println!("{}", json);
            printed += 1;
        }
        Ok(printed)
    });

    let connector = Connector::new(db, config)?.with_publisher(Arc::new(publisher));
    tracing::info!("Executing against {} as {}", db, connector.config().node_name);
    let result = connector
        .connect()
        .context("Failed to open database")
        .and_then(|conn| Ok(conn.execute_batch(&sql)?));

    // Close the channel so the printer drains and exits
    drop(connector);
    let printed = printer
        .join()
        .map_err(|_| anyhow!("Changeset printer panicked"))??;
    tracing::info!("{} changeset(s) published", printed);

    result
}
