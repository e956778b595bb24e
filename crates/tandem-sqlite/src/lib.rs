//! SQLite change capture and snapshots
//!
//! Binds the tandem capture pipeline to SQLite through rusqlite.
//!
//! Key features:
//! - Row capture through the engine's pre-update, commit and rollback hooks
//! - Idempotent DDL capture on the statement path
//! - Per-connector session registry
//! - Consistent snapshots of memory and file databases, and restore

pub mod backup;
pub mod capture;
pub mod conn;
pub mod engine;
pub mod hooks;
pub mod metadata;
pub mod session;

pub use backup::{backup, backup_with_config, restore_to_path};
pub use conn::CdcConnection;
pub use engine::{EngineConnection, RawConnection};
pub use hooks::CdcHooks;
pub use session::{Session, SessionRegistry};

pub use rusqlite;
