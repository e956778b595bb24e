//! Tandem Prelude
//!
//! Import this to get all commonly used types and traits:
//!
//! ```
//! use tandem::prelude::*;
//! ```

// Core types
pub use crate::{
    BackupContext, Change, ChangeSet, ConnectionId, Operation, Result, TandemError, Value,
};

// Configs
pub use crate::{BackupConfig, ConnectorConfig};

// Traits
pub use crate::{ChangeSetCodec, ChangeSetPublisher, StatementParser};

// Publishers and codecs
pub use crate::{ChannelPublisher, FnPublisher, JsonCodec, MsgPackCodec, NoopPublisher};

// Connections
pub use crate::{CdcConnection, Connector, Driver, EngineConnection, RawConnection};

// Snapshots
pub use crate::{backup, restore_to_path};
