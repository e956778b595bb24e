//! Snapshot export and restore.
//!
//! A memory database is serialized in one call. A file database is copied
//! page by page into a private temporary file through the engine's online
//! backup, so the snapshot is consistent even while other connections write.
//! The temporary file is removed on every exit path.

use crate::engine::RawConnection;
use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tandem_core::{observe, BackupConfig, BackupContext, BackupPhase, Result, TandemError};
use tempfile::{Builder, NamedTempFile};

/// Write a consistent snapshot of `conn`'s main database to `sink`.
///
/// Returns the number of bytes written. Bytes already written when an error
/// occurs are not withdrawn; a failed export must be discarded by the caller.
pub fn backup(ctx: &BackupContext, conn: &RawConnection, sink: &mut dyn Write) -> Result<u64> {
    backup_with_config(ctx, conn, sink, &BackupConfig::default())
}

pub fn backup_with_config(
    ctx: &BackupContext,
    conn: &RawConnection,
    sink: &mut dyn Write,
    config: &BackupConfig,
) -> Result<u64> {
    let start = Instant::now();
    let (mode, result) = if conn.is_memory() {
        ("serialize", export_memory(ctx, conn, sink))
    } else {
        ("page-copy", export_file(ctx, conn, sink, config))
    };
    observe::record_backup(start.elapsed(), result.is_ok(), mode);

    match &result {
        Ok(bytes) => tracing::info!(
            "Exported {} snapshot of {} ({} bytes) in {:?}",
            mode,
            conn.id(),
            bytes,
            start.elapsed()
        ),
        Err(e) => tracing::warn!("Snapshot export of {} failed: {}", conn.id(), e),
    }
    result
}

fn export_memory(ctx: &BackupContext, conn: &RawConnection, sink: &mut dyn Write) -> Result<u64> {
    ctx.check()?;
    let db = conn.lock();
    let data = db
        .serialize(DatabaseName::Main)
        .map_err(|e| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Serialize))?;
    sink.write_all(&data)
        .map_err(|e| TandemError::from(e).in_phase(BackupPhase::Copy))?;
    Ok(data.len() as u64)
}

fn export_file(
    ctx: &BackupContext,
    conn: &RawConnection,
    sink: &mut dyn Write,
    config: &BackupConfig,
) -> Result<u64> {
    let temp = temp_file(config).map_err(|e| TandemError::from(e).in_phase(BackupPhase::TempFile))?;

    let mut dest = Connection::open(temp.path())
        .map_err(|e| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Open))?;
    {
        let src = conn.lock();
        copy_pages(ctx, &src, &mut dest, config)?;
    }
    dest.close()
        .map_err(|(_, e)| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Close))?;

    let mut file = temp
        .reopen()
        .map_err(|e| TandemError::from(e).in_phase(BackupPhase::Copy))?;
    io::copy(&mut file, sink).map_err(|e| TandemError::from(e).in_phase(BackupPhase::Copy))
}

fn temp_file(config: &BackupConfig) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix("ha-").suffix(".db");
    match &config.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Run the online backup from `src` into `dest` until every page is copied.
fn copy_pages(
    ctx: &BackupContext,
    src: &Connection,
    dest: &mut Connection,
    config: &BackupConfig,
) -> Result<()> {
    let pause = Duration::from_millis(config.step_pause_ms);
    let backup = Backup::new(src, dest)
        .map_err(|e| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Open))?;

    loop {
        ctx.check()?;
        let step = backup
            .step(config.pages_per_step)
            .map_err(|e| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Step))?;
        match step {
            StepResult::Done => break,
            StepResult::More => {}
            // Source or destination briefly locked by another connection
            _ => thread::sleep(pause),
        }
    }

    let expected = backup.progress().pagecount;
    // Dropping the handle finishes the backup
    drop(backup);

    let copied: i64 = dest
        .query_row("PRAGMA page_count", [], |row| row.get(0))
        .map_err(|e| TandemError::Engine(e.to_string()).in_phase(BackupPhase::Finish))?;
    if copied != i64::from(expected) {
        return Err(TandemError::Backup {
            phase: BackupPhase::Finish,
            message: format!("copied {copied} pages, source has {expected}"),
        });
    }
    Ok(())
}

/// Install a snapshot produced by [`backup`] at `path`.
///
/// The bytes land in a temporary file next to `path`, pass an integrity check
/// and are then renamed over `path`, so a failed restore leaves any existing
/// database untouched. No connection may have `path` open.
pub fn restore_to_path(reader: &mut dyn Read, path: &Path) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = Builder::new()
        .prefix(".tandem-restore-")
        .suffix(".db")
        .tempfile_in(dir)?;

    let bytes = io::copy(reader, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    verify_snapshot(temp.path())?;

    temp.persist(path)
        .map_err(|e| TandemError::Restore(e.to_string()))?;
    tracing::info!("Restored snapshot ({} bytes) to {}", bytes, path.display());
    Ok(bytes)
}

fn verify_snapshot(path: &Path) -> Result<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .map_err(|e| TandemError::Restore(e.to_string()))?;
    let status: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| TandemError::Restore(e.to_string()))?;
    if status != "ok" {
        return Err(TandemError::Restore(format!(
            "snapshot failed integrity check: {status}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tandem_core::ConnectorConfig;
    use tempfile::TempDir;

    fn seed(conn: &RawConnection, rows: usize) {
        conn.execute_batch("CREATE TABLE users(id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        let db = conn.lock();
        let mut stmt = db.prepare("INSERT INTO users(name) VALUES(?1)").unwrap();
        for i in 0..rows {
            stmt.execute([format!("user-{i}-{}", "x".repeat(200))]).unwrap();
        }
    }

    fn count_users(path: &Path) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_memory_snapshot_round_trip() {
        let conn = RawConnection::open_in_memory(&ConnectorConfig::default()).unwrap();
        seed(&conn, 10);

        let mut out = Vec::new();
        let written = backup(&BackupContext::new(), &conn, &mut out).unwrap();
        assert_eq!(written, out.len() as u64);
        assert!(out.starts_with(b"SQLite format 3\0"));

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("restored.db");
        restore_to_path(&mut out.as_slice(), &target).unwrap();
        assert_eq!(count_users(&target), 10);
    }

    #[test]
    fn test_file_snapshot_in_small_steps() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        let source = dir.path().join("source.db");
        let conn = RawConnection::open(source.to_str().unwrap(), &ConnectorConfig::default())
            .unwrap();
        seed(&conn, 500);

        let config = BackupConfig::default()
            .with_pages_per_step(4)
            .with_temp_dir(&scratch);
        let mut out = Vec::new();
        backup_with_config(&BackupContext::new(), &conn, &mut out, &config).unwrap();

        // Temporary file is gone
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);

        let target = dir.path().join("restored.db");
        restore_to_path(&mut out.as_slice(), &target).unwrap();
        assert_eq!(count_users(&target), 500);
    }

    #[test]
    fn test_cancelled_export() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.db");
        let conn = RawConnection::open(source.to_str().unwrap(), &ConnectorConfig::default())
            .unwrap();
        seed(&conn, 5);

        let ctx = BackupContext::new();
        ctx.cancel();
        let mut out = Vec::new();
        let err = backup(&ctx, &conn, &mut out).unwrap_err();
        assert!(matches!(err, TandemError::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn test_sink_failure_reports_copy_phase() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let conn = RawConnection::open_in_memory(&ConnectorConfig::default()).unwrap();
        seed(&conn, 1);
        let err = backup(&BackupContext::new(), &conn, &mut Broken).unwrap_err();
        assert!(matches!(
            err,
            TandemError::Backup {
                phase: BackupPhase::Copy,
                ..
            }
        ));
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("restored.db");
        let garbage = vec![0xAB_u8; 4096];

        let err = restore_to_path(&mut garbage.as_slice(), &target).unwrap_err();
        assert!(matches!(err, TandemError::Restore(_)));
        assert!(!target.exists());
    }
}
