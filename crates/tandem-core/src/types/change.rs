use crate::error::TandemError;
use crate::normalize::normalize_row;
use crate::types::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of a captured change.
///
/// Serialised as `INSERT`, `UPDATE`, `DELETE`, `SQL` or `UNKNOWN - <code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Sql,
    /// An engine notification with an operation code we do not recognise.
    Unknown(i32),
}

impl Operation {
    /// Row-level operations carry columns and values; `Sql` carries a command.
    pub fn is_row(&self) -> bool {
        matches!(
            self,
            Operation::Insert | Operation::Update | Operation::Delete
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Sql => "sql",
            Operation::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert => f.write_str("INSERT"),
            Operation::Update => f.write_str("UPDATE"),
            Operation::Delete => f.write_str("DELETE"),
            Operation::Sql => f.write_str("SQL"),
            Operation::Unknown(code) => write!(f, "UNKNOWN - {}", code),
        }
    }
}

impl FromStr for Operation {
    type Err = TandemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            "SQL" => Ok(Operation::Sql),
            other => other
                .strip_prefix("UNKNOWN - ")
                .and_then(|code| code.trim().parse().ok())
                .map(Operation::Unknown)
                .ok_or_else(|| {
                    TandemError::Serialization(format!("unknown operation: {:?}", other))
                }),
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Name and declared type of a table column, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// One captured mutation or statement.
///
/// Row changes (`INSERT`/`UPDATE`/`DELETE`) carry positional values that
/// line up with `columns`; `SQL` changes carry `command` and `args`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub operation: Operation,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table: String,

    #[serde(default)]
    pub old_row_id: i64,

    #[serde(default)]
    pub new_row_id: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub old_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl Change {
    /// A row-level change against `database.table`.
    pub fn row(
        operation: Operation,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            database: database.into(),
            table: table.into(),
            old_row_id: 0,
            new_row_id: 0,
            columns: Vec::new(),
            types: Vec::new(),
            old_values: Vec::new(),
            new_values: Vec::new(),
            command: String::new(),
            args: Vec::new(),
        }
    }

    /// A statement-level change replayed verbatim on peers.
    pub fn sql(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Self::row(Operation::Sql, "", "")
        }
    }

    pub fn is_row_change(&self) -> bool {
        self.operation.is_row()
    }

    /// Attach column names and types, normalising values at matching positions.
    pub fn apply_columns(&mut self, columns: &[ColumnInfo]) {
        self.columns = columns.iter().map(|c| c.name.clone()).collect();
        self.types = columns.iter().map(|c| c.declared_type.clone()).collect();
        normalize_row(&mut self.old_values, &self.types);
        normalize_row(&mut self.new_values, &self.types);
    }

    /// Whether the positional value lists agree with the column list.
    pub fn is_aligned(&self) -> bool {
        let n = self.columns.len();
        (self.old_values.is_empty() || self.old_values.len() == n)
            && (self.new_values.is_empty() || self.new_values.len() == n)
    }
}
