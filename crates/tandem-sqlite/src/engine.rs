use crate::conn::CdcConnection;
use crate::session::SessionRegistry;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rusqlite::{Connection, OpenFlags, Params};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tandem_core::{ConnectionId, ConnectorConfig, Result, TandemError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// An engine connection without change capture.
///
/// The handle sits behind a reentrant lock: the pre-mutation callback runs on
/// the thread that is already executing a statement and has to query column
/// metadata on the same connection.
///
/// A connection with capture enabled remembers its registry and leaves it
/// when dropped.
pub struct RawConnection {
    id: ConnectionId,
    conn: Arc<ReentrantMutex<Connection>>,
    filename: String,
    registry: Mutex<Option<Weak<SessionRegistry>>>,
}

impl RawConnection {
    /// Open a data source name (a path, `:memory:` or a `file:` URI).
    pub fn open(dsn: &str, config: &ConnectorConfig) -> Result<Self> {
        let conn = Connection::open_with_flags(
            dsn,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| TandemError::Engine(e.to_string()))?;

        Self::configure_connection(&conn, config)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory(config: &ConnectorConfig) -> Result<Self> {
        Self::open(":memory:", config)
    }

    /// Adopt an already opened engine connection.
    pub fn from_connection(conn: Connection) -> Self {
        let filename = conn.path().unwrap_or_default().to_string();
        Self {
            id: ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            conn: Arc::new(ReentrantMutex::new(conn)),
            filename,
            registry: Mutex::new(None),
        }
    }

    /// Configure SQLite connection
    fn configure_connection(conn: &Connection, config: &ConnectorConfig) -> Result<()> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| TandemError::Config(e.to_string()))?;

        let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
        conn.pragma_update(None, "foreign_keys", foreign_keys)
            .map_err(|e| TandemError::Config(e.to_string()))?;

        let in_memory = conn.path().map_or(true, str::is_empty);
        if config.wal_mode && !in_memory {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| TandemError::Config(e.to_string()))?;
        }

        Ok(())
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Database file path as reported by the engine, empty for memory databases.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn is_memory(&self) -> bool {
        self.filename.is_empty()
    }

    /// Lock the engine handle for the calling thread.
    ///
    /// Reentrant: a thread that already holds the lock may take it again.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, Connection> {
        self.conn.lock()
    }

    pub(crate) fn handle(&self) -> &Arc<ReentrantMutex<Connection>> {
        &self.conn
    }

    pub(crate) fn attach_registry(&self, registry: &Arc<SessionRegistry>) {
        *self.registry.lock() = Some(Arc::downgrade(registry));
    }

    pub(crate) fn detach_registry(&self) {
        self.registry.lock().take();
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.lock()
            .execute(sql, params)
            .map_err(|e| TandemError::Engine(e.to_string()))
    }

    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()
            .execute_batch(sql)
            .map_err(|e| TandemError::Engine(e.to_string()))
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        let Some(registry) = self.registry.get_mut().take().and_then(|r| r.upgrade()) else {
            return;
        };
        // The callbacks go away with the engine handle.
        match registry.unregister(self.id, || Ok(())) {
            Ok(Some(_)) => tracing::debug!("{}: left session registry on drop", self.id),
            Ok(None) => {}
            Err(e) => tracing::warn!("{}: failed to leave session registry: {}", self.id, e),
        }
    }
}

impl std::fmt::Debug for RawConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawConnection")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .finish()
    }
}

/// A connection handed to hook management or the snapshot exporter: either
/// one wrapped with change capture or a bare engine connection.
#[derive(Debug, Clone, Copy)]
pub enum EngineConnection<'a> {
    Wrapped(&'a CdcConnection),
    Raw(&'a RawConnection),
}

impl<'a> EngineConnection<'a> {
    /// The underlying engine connection of either variant.
    pub fn raw(&self) -> &'a RawConnection {
        match self {
            EngineConnection::Wrapped(conn) => conn.raw(),
            EngineConnection::Raw(raw) => raw,
        }
    }

    /// Downcast to the capturing wrapper.
    pub fn as_wrapped(&self) -> Result<&'a CdcConnection> {
        match self {
            EngineConnection::Wrapped(conn) => Ok(conn),
            EngineConnection::Raw(raw) => Err(TandemError::InvalidState(format!(
                "{} is not wrapped with change capture",
                raw.id()
            ))),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.raw().id()
    }
}

impl<'a> From<&'a CdcConnection> for EngineConnection<'a> {
    fn from(conn: &'a CdcConnection) -> Self {
        EngineConnection::Wrapped(conn)
    }
}

impl<'a> From<&'a RawConnection> for EngineConnection<'a> {
    fn from(conn: &'a RawConnection) -> Self {
        EngineConnection::Raw(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ids_are_unique() {
        let config = ConnectorConfig::default();
        let a = RawConnection::open_in_memory(&config).unwrap();
        let b = RawConnection::open_in_memory(&config).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.is_memory());
    }

    #[test]
    fn test_file_connection_is_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.db");
        let config = ConnectorConfig::new("node1").with_wal_mode(true);

        let conn = RawConnection::open(path.to_str().unwrap(), &config).unwrap();
        assert!(!conn.is_memory());
        assert!(conn.filename().ends_with("app.db"));

        let mode: String = conn
            .lock()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let fk: i64 = conn
            .lock()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_raw_variant_is_not_wrapped() {
        let raw = RawConnection::open_in_memory(&ConnectorConfig::default()).unwrap();
        let conn = EngineConnection::from(&raw);
        assert_eq!(conn.id(), raw.id());
        assert!(matches!(
            conn.as_wrapped(),
            Err(TandemError::InvalidState(_))
        ));
    }

    #[test]
    fn test_engine_errors_are_mapped() {
        let raw = RawConnection::open_in_memory(&ConnectorConfig::default()).unwrap();
        let err = raw.execute("INSERT INTO missing VALUES(1)", []).unwrap_err();
        assert!(matches!(err, TandemError::Engine(_)));
    }
}
