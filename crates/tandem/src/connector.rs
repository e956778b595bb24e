//! Connector and driver: the registration surface.
//!
//! A [`Connector`] opens connections to one data source, all sharing its
//! configuration, publisher and session registry. A [`Driver`] holds default
//! options and opens connectors by data source name.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tandem::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let (publisher, changesets) = ChannelPublisher::bounded(64);
//! let connector = Connector::new("app.db", ConnectorConfig::new("node1"))?
//!     .with_publisher(Arc::new(publisher));
//!
//! let conn = connector.connect()?;
//! conn.execute_batch("CREATE TABLE users(name TEXT); INSERT INTO users VALUES('HA user');")?;
//!
//! while let Ok(changeset) = changesets.try_recv() {
//!     println!("{} change(s) from {}", changeset.len(), changeset.node);
//! }
//! # Ok(())
//! # }
//! ```

use rusqlite::Connection;
use std::io::Write;
use std::sync::Arc;
use tandem_core::{
    BackupContext, ChangeSetPublisher, ConnectorConfig, NoopPublisher, Result, StatementParser,
    TandemError,
};
use tandem_sql::SqliteParser;
use tandem_sqlite::{CdcConnection, CdcHooks, EngineConnection, RawConnection, SessionRegistry};

/// Runs on every newly opened engine connection, before capture is enabled.
pub type ConnectHook = Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>;

/// Pluggable snapshot function for replication components.
pub type BackupFn = fn(&BackupContext, EngineConnection<'_>, &mut dyn Write) -> Result<u64>;

/// Write a consistent snapshot of `conn` to `sink`.
pub fn backup(
    ctx: &BackupContext,
    conn: EngineConnection<'_>,
    sink: &mut dyn Write,
) -> Result<u64> {
    tandem_sqlite::backup(ctx, conn.raw(), sink)
}

/// Opens capturing connections to one data source.
pub struct Connector {
    dsn: String,
    config: ConnectorConfig,
    publisher: Arc<dyn ChangeSetPublisher>,
    parser: Arc<dyn StatementParser>,
    registry: Arc<SessionRegistry>,
    connect_hook: Option<ConnectHook>,
}

impl Connector {
    /// Create a connector that discards changesets until a publisher is set.
    pub fn new(dsn: impl Into<String>, config: ConnectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dsn: dsn.into(),
            config,
            publisher: Arc::new(NoopPublisher),
            parser: Arc::new(SqliteParser::new()),
            registry: Arc::new(SessionRegistry::new()),
            connect_hook: None,
        })
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn ChangeSetPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn StatementParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_connect_hook(mut self, hook: ConnectHook) -> Self {
        self.connect_hook = Some(hook);
        self
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Hook provider bound to this connector's node, publisher and registry.
    pub fn hooks(&self) -> CdcHooks {
        CdcHooks::new(
            self.config.node_name.clone(),
            Arc::clone(&self.publisher),
            Arc::clone(&self.registry),
        )
    }

    /// Open an engine connection without change capture.
    pub fn open_raw(&self) -> Result<RawConnection> {
        let raw = RawConnection::open(&self.dsn, &self.config)?;
        if let Some(hook) = &self.connect_hook {
            (hook.as_ref())(&*raw.lock()).map_err(|e| TandemError::Engine(e.to_string()))?;
        }
        Ok(raw)
    }

    /// Open a connection with change capture enabled.
    pub fn connect(&self) -> Result<CdcConnection> {
        let raw = self.open_raw()?;
        let conn = CdcConnection::new(
            raw,
            self.hooks(),
            Arc::clone(&self.parser),
            self.config.disable_ddl_sync,
        )?;
        tracing::debug!("Connected {} to {} as {}", conn.id(), self.dsn, self.config.node_name);
        Ok(conn)
    }

    pub fn enable_hooks(&self, conn: EngineConnection<'_>) -> Result<()> {
        self.hooks().enable(conn.raw())
    }

    pub fn disable_hooks(&self, conn: EngineConnection<'_>) -> Result<()> {
        self.hooks().disable(conn.raw())
    }

    /// Snapshot `conn` with this connector's backup settings.
    pub fn backup(
        &self,
        ctx: &BackupContext,
        conn: EngineConnection<'_>,
        sink: &mut dyn Write,
    ) -> Result<u64> {
        tandem_sqlite::backup_with_config(ctx, conn.raw(), sink, &self.config.backup)
    }

    pub fn backup_fn(&self) -> BackupFn {
        backup
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("dsn", &self.dsn)
            .field("config", &self.config)
            .field("sessions", &self.registry.len())
            .finish()
    }
}

/// Default options applied to every connector a driver opens.
#[derive(Clone, Default)]
pub struct Driver {
    config: ConnectorConfig,
    publisher: Option<Arc<dyn ChangeSetPublisher>>,
    connect_hook: Option<ConnectHook>,
}

impl Driver {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn ChangeSetPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_connect_hook(mut self, hook: ConnectHook) -> Self {
        self.connect_hook = Some(hook);
        self
    }

    pub fn open_connector(&self, dsn: &str) -> Result<Connector> {
        let mut connector = Connector::new(dsn, self.config.clone())?;
        if let Some(publisher) = &self.publisher {
            connector = connector.with_publisher(Arc::clone(publisher));
        }
        if let Some(hook) = &self.connect_hook {
            connector = connector.with_connect_hook(Arc::clone(hook));
        }
        Ok(connector)
    }

    /// Open a capturing connection through a connector of its own.
    pub fn open(&self, dsn: &str) -> Result<CdcConnection> {
        self.open_connector(dsn)?.connect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tandem_core::{Statement, StatementKind};

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Connector::new(":memory:", ConnectorConfig::new("")).unwrap_err();
        assert!(matches!(err, TandemError::Config(_)));
    }

    #[test]
    fn test_connect_registers_session() {
        let connector = Connector::new(":memory:", ConnectorConfig::new("node1")).unwrap();
        let a = connector.connect().unwrap();
        let b = connector.connect().unwrap();
        assert_eq!(connector.registry().len(), 2);

        drop(a);
        assert_eq!(connector.registry().len(), 1);
        assert!(connector.registry().contains(b.id()));
    }

    #[test]
    fn test_connect_hook_runs_per_connection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let hook: ConnectHook = Arc::new(move |conn: &Connection| {
            seen.fetch_add(1, Ordering::SeqCst);
            conn.execute_batch("PRAGMA cache_size = -2000")
        });
        let driver = Driver::new(ConnectorConfig::new("node1")).with_connect_hook(hook);

        let _a = driver.open(":memory:").unwrap();
        let _b = driver.open(":memory:").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hooks_on_either_variant() {
        let connector = Connector::new(":memory:", ConnectorConfig::new("node1")).unwrap();
        let raw = connector.open_raw().unwrap();
        assert!(!connector.registry().contains(raw.id()));

        connector.enable_hooks(EngineConnection::Raw(&raw)).unwrap();
        assert!(connector.registry().contains(raw.id()));
        connector.disable_hooks(EngineConnection::Raw(&raw)).unwrap();
        assert!(!connector.registry().contains(raw.id()));

        let conn = connector.connect().unwrap();
        connector.disable_hooks(EngineConnection::from(&conn)).unwrap();
        assert!(!connector.registry().contains(conn.id()));
        connector.enable_hooks(EngineConnection::from(&conn)).unwrap();
        assert!(connector.registry().contains(conn.id()));
    }

    #[test]
    fn test_dropped_raw_connection_is_unregistered() {
        let connector = Connector::new(":memory:", ConnectorConfig::new("node1")).unwrap();
        let raw = connector.open_raw().unwrap();
        connector.enable_hooks(EngineConnection::Raw(&raw)).unwrap();
        assert_eq!(connector.registry().len(), 1);

        drop(raw);
        assert!(connector.registry().is_empty());
    }

    #[test]
    fn test_custom_parser_decides_capture() {
        /// Classifies everything as plain statements and counts the calls.
        struct Opaque(AtomicUsize);

        impl StatementParser for Opaque {
            fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(vec![Statement::plain(StatementKind::Other, sql.to_string())])
            }
        }

        let parser = Arc::new(Opaque(AtomicUsize::new(0)));
        let connector = Connector::new(":memory:", ConnectorConfig::new("node1"))
            .unwrap()
            .with_parser(Arc::clone(&parser) as Arc<dyn StatementParser>);
        let conn = connector.connect().unwrap();

        conn.execute_batch("BEGIN; CREATE TABLE t(x)").unwrap();
        assert!(conn.changeset().unwrap().is_empty());
        assert_eq!(parser.0.load(Ordering::SeqCst), 1);
        conn.execute_batch("ROLLBACK").unwrap();
    }
}
