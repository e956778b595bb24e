use crate::error::Result;
use crate::types::Statement;

/// Splits SQL text into classified statements.
///
/// A parse error rejects the whole text; no statement of a malformed input is
/// returned.
pub trait StatementParser: Send + Sync {
    fn parse(&self, sql: &str) -> Result<Vec<Statement>>;
}
