//! Tandem: change data capture and snapshots for embedded SQLite
//!
//! Tandem keeps independent copies of a SQLite database in step without a
//! central server:
//! - **Row capture**: every insert, update and delete is recorded from the
//!   engine's pre-update hook, with column names and normalised values
//! - **DDL capture**: schema statements are recorded as idempotent SQL
//!   (`IF NOT EXISTS` / `IF EXISTS`) ahead of execution
//! - **Commit-gated publishing**: a transaction's changeset is published before
//!   it commits; if publishing fails the commit is rolled back
//! - **Snapshots**: consistent exports of memory and file databases, and
//!   restore for bootstrapping a new peer
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tandem::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let publisher = FnPublisher::new(|cs: &ChangeSet| {
//!     println!("{}", String::from_utf8_lossy(&JsonCodec.encode(cs)?));
//!     Ok(())
//! });
//! let connector = Connector::new("app.db", ConnectorConfig::new("node1"))?
//!     .with_publisher(Arc::new(publisher));
//!
//! let conn = connector.connect()?;
//! conn.execute_batch("CREATE TABLE users(name TEXT)")?;
//! conn.execute("INSERT INTO users VALUES(?1)", ["HA user"])?;
//!
//! // Export a snapshot for a new peer
//! let mut snapshot = Vec::new();
//! connector.backup(&BackupContext::new(), EngineConnection::from(&conn), &mut snapshot)?;
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod prelude;

// Re-export core types
pub use tandem_core::{
    codec::{ChangeSetCodec, JsonCodec, MsgPackCodec},
    config::{BackupConfig, ConnectorConfig},
    error::{BackupPhase, Result, TandemError},
    observe,
    publisher::{ChannelPublisher, FnPublisher, NoopPublisher},
    traits::{ChangeSetPublisher, StatementParser},
    types::{
        Change, ChangeSet, ColumnInfo, ConnectionId, DdlKind, Operation, Statement,
        StatementKind, Value,
    },
    BackupContext,
};

// Re-export implementations
pub use tandem_sql::SqliteParser;
pub use tandem_sqlite::{
    restore_to_path, CdcConnection, CdcHooks, EngineConnection, RawConnection, SessionRegistry,
};

// Re-export main types from this crate
pub use connector::{backup, BackupFn, ConnectHook, Connector, Driver};
