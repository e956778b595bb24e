use std::fmt;

/// Schema object touched by a DDL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlKind {
    CreateTable,
    CreateVirtualTable,
    CreateIndex,
    CreateView,
    CreateTrigger,
    DropTable,
    DropIndex,
    DropView,
    DropTrigger,
    AlterTable,
}

impl DdlKind {
    /// Guard clause that makes the statement a no-op when replayed, if any.
    pub fn guard(&self) -> Option<&'static str> {
        match self {
            DdlKind::CreateTable
            | DdlKind::CreateVirtualTable
            | DdlKind::CreateIndex
            | DdlKind::CreateView
            | DdlKind::CreateTrigger => Some("IF NOT EXISTS"),
            DdlKind::DropTable | DdlKind::DropIndex | DdlKind::DropView | DdlKind::DropTrigger => {
                Some("IF EXISTS")
            }
            DdlKind::AlterTable => None,
        }
    }
}

impl fmt::Display for DdlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DdlKind::CreateTable => "CREATE TABLE",
            DdlKind::CreateVirtualTable => "CREATE VIRTUAL TABLE",
            DdlKind::CreateIndex => "CREATE INDEX",
            DdlKind::CreateView => "CREATE VIEW",
            DdlKind::CreateTrigger => "CREATE TRIGGER",
            DdlKind::DropTable => "DROP TABLE",
            DdlKind::DropIndex => "DROP INDEX",
            DdlKind::DropView => "DROP VIEW",
            DdlKind::DropTrigger => "DROP TRIGGER",
            DdlKind::AlterTable => "ALTER TABLE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Ddl(DdlKind),
    /// Anything that does not define schema: queries, DML, pragmas, transactions.
    Other,
}

/// A single statement split out of a SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    kind: StatementKind,
    source: String,
    idempotent_source: String,
}

impl Statement {
    pub fn new(kind: StatementKind, source: String, idempotent_source: String) -> Self {
        Self {
            kind,
            source,
            idempotent_source,
        }
    }

    /// A statement whose replay form is its own source.
    pub fn plain(kind: StatementKind, source: String) -> Self {
        let idempotent_source = source.clone();
        Self::new(kind, source, idempotent_source)
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self.kind, StatementKind::Ddl(_))
    }

    /// Source text as written, without the terminating semicolon.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text with an existence guard injected, safe to replay on a peer
    /// that may already have the object.
    pub fn rewritten_idempotent_source(&self) -> &str {
        &self.idempotent_source
    }
}

/// Join the replay forms of every DDL statement into one command.
///
/// Returns an empty string when no statement is DDL.
pub fn combined_ddl_command(statements: &[Statement]) -> String {
    statements
        .iter()
        .filter(|s| s.is_ddl())
        .map(Statement::rewritten_idempotent_source)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_skips_non_ddl() {
        let stmts = vec![
            Statement::new(
                StatementKind::Ddl(DdlKind::CreateTable),
                "CREATE TABLE a(x)".into(),
                "CREATE TABLE IF NOT EXISTS a(x)".into(),
            ),
            Statement::plain(StatementKind::Other, "INSERT INTO a VALUES(1)".into()),
            Statement::new(
                StatementKind::Ddl(DdlKind::DropTable),
                "DROP TABLE b".into(),
                "DROP TABLE IF EXISTS b".into(),
            ),
        ];
        assert_eq!(
            combined_ddl_command(&stmts),
            "CREATE TABLE IF NOT EXISTS a(x); DROP TABLE IF EXISTS b"
        );
    }

    #[test]
    fn test_combined_empty_without_ddl() {
        let stmts = vec![Statement::plain(StatementKind::Other, "SELECT 1".into())];
        assert!(combined_ddl_command(&stmts).is_empty());
    }
}
