pub mod change;
pub mod changeset;
pub mod statement;
pub mod value;

pub use change::{Change, ColumnInfo, Operation};
pub use changeset::ChangeSet;
pub use statement::{combined_ddl_command, DdlKind, Statement, StatementKind};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-unique identity of an engine connection.
///
/// Keys the session registry; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
