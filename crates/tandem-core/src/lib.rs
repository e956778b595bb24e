//! Tandem Core: Types and traits for SQLite change capture
//!
//! This crate defines the engine-independent pieces of a change data capture
//! pipeline that keeps peer databases in step:
//! - Change / ChangeSet: the replicable record of one transaction
//! - Value normaliser: canonical values for captured rows
//! - Publisher and statement parser capabilities
//! - Connector configuration and backup cancellation
//!
//! Key properties:
//! - Changes are ordered as they were captured and replayed in that order
//! - Schema statements travel as idempotent SQL so replay never conflicts
//! - A changeset is published before its transaction commits; a failed
//!   publish turns the commit into a rollback

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod normalize;
pub mod observe;
pub mod publisher;
pub mod traits;
pub mod types;

pub use codec::{ChangeSetCodec, JsonCodec, MsgPackCodec};
pub use config::{BackupConfig, ConnectorConfig};
pub use context::BackupContext;
pub use error::{BackupPhase, Result, TandemError};
pub use normalize::{normalize, normalize_row};
pub use publisher::{ChannelPublisher, FnPublisher, NoopPublisher};
pub use traits::{ChangeSetPublisher, StatementParser};
pub use types::{
    combined_ddl_command, Change, ChangeSet, ColumnInfo, ConnectionId, DdlKind, Operation,
    Statement, StatementKind, Value,
};
