use crate::lexer::{Lexer, Token, TokenKind};
use std::ops::Range;
use tandem_core::{DdlKind, Result, Statement, StatementKind, StatementParser, TandemError};

/// Leading keywords of every statement SQLite accepts.
const STATEMENT_KEYWORDS: &[&str] = &[
    "ALTER", "ANALYZE", "ATTACH", "BEGIN", "COMMIT", "CREATE", "DELETE", "DETACH", "DROP", "END",
    "EXPLAIN", "INSERT", "PRAGMA", "REINDEX", "RELEASE", "REPLACE", "ROLLBACK", "SAVEPOINT",
    "SELECT", "UPDATE", "VACUUM", "VALUES", "WITH",
];

/// Statement classifier for the SQLite dialect.
///
/// Splits on top-level semicolons and recognises schema statements. DDL gets
/// an existence guard injected so a peer can replay it without conflicts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteParser;

impl SqliteParser {
    pub fn new() -> Self {
        Self
    }
}

impl StatementParser for SqliteParser {
    fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        parse(sql)
    }
}

/// Split and classify every statement in `sql`.
///
/// Empty statements (stray semicolons, comment-only text) are skipped.
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    let tokens = Lexer::tokenize(sql)?;
    split(sql, &tokens)?
        .into_iter()
        .map(|range| classify(sql, &tokens[range]))
        .collect()
}

/// Token ranges of each statement, without the terminating semicolon.
fn split(sql: &str, tokens: &[Token]) -> Result<Vec<Range<usize>>> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut open_parens: Vec<usize> = Vec::new();
    // CASE nesting inside a trigger body, None outside of one
    let mut trigger_body: Option<usize> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => open_parens.push(token.start),
            TokenKind::RightParen => {
                if open_parens.pop().is_none() {
                    return Err(TandemError::parse("unbalanced parentheses", token.start));
                }
            }
            TokenKind::Word => {
                trigger_body = match trigger_body {
                    None if open_parens.is_empty()
                        && token.is_keyword(sql, "BEGIN")
                        && is_create_trigger(sql, &tokens[start..i]) =>
                    {
                        Some(0)
                    }
                    Some(depth) if token.is_keyword(sql, "CASE") => Some(depth + 1),
                    Some(0) if token.is_keyword(sql, "END") => None,
                    Some(depth) if token.is_keyword(sql, "END") => Some(depth - 1),
                    other => other,
                };
            }
            TokenKind::Semicolon if open_parens.is_empty() && trigger_body.is_none() => {
                if i > start {
                    statements.push(start..i);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    if let Some(&offset) = open_parens.last() {
        return Err(TandemError::parse("unbalanced parentheses", offset));
    }
    if trigger_body.is_some() {
        return Err(TandemError::parse(
            "unterminated trigger body",
            tokens[start].start,
        ));
    }
    if start < tokens.len() {
        statements.push(start..tokens.len());
    }
    Ok(statements)
}

fn is_create_trigger(sql: &str, tokens: &[Token]) -> bool {
    match tokens {
        [create, trigger, ..] if create.is_keyword(sql, "CREATE") => {
            trigger.is_keyword(sql, "TRIGGER")
                || ((trigger.is_keyword(sql, "TEMP") || trigger.is_keyword(sql, "TEMPORARY"))
                    && tokens.get(2).is_some_and(|t| t.is_keyword(sql, "TRIGGER")))
        }
        _ => false,
    }
}

fn classify(sql: &str, tokens: &[Token]) -> Result<Statement> {
    let (first, last) = match tokens {
        [first, .., last] => (*first, *last),
        [only] => (*only, *only),
        [] => return Err(TandemError::parse("empty statement", 0)),
    };
    let source = sql[first.start..last.end].to_string();

    if first.kind != TokenKind::Word {
        return Err(TandemError::parse("expected a statement keyword", first.start));
    }
    let keyword = first.text(sql).to_ascii_uppercase();
    if !STATEMENT_KEYWORDS.contains(&keyword.as_str()) {
        return Err(TandemError::parse(
            format!("unrecognized statement keyword `{}`", first.text(sql)),
            first.start,
        ));
    }

    let (kind, object) = match keyword.as_str() {
        "CREATE" => create_kind(sql, tokens, last.end)?,
        "DROP" => drop_kind(sql, tokens, last.end)?,
        "ALTER" => {
            expect_keyword(sql, tokens, 1, "TABLE", last.end)?;
            (DdlKind::AlterTable, 1)
        }
        _ => return Ok(Statement::plain(StatementKind::Other, source)),
    };

    let Some(guard) = kind.guard() else {
        return Ok(Statement::plain(StatementKind::Ddl(kind), source));
    };
    if has_guard(sql, &tokens[object + 1..], guard) {
        return Ok(Statement::plain(StatementKind::Ddl(kind), source));
    }

    let split_at = tokens[object].end;
    let idempotent = format!(
        "{} {}{}",
        &sql[first.start..split_at],
        guard,
        &sql[split_at..last.end]
    );
    Ok(Statement::new(StatementKind::Ddl(kind), source, idempotent))
}

/// `CREATE [TEMP|TEMPORARY] [UNIQUE] TABLE|INDEX|VIEW|TRIGGER` or `CREATE VIRTUAL TABLE`.
fn create_kind(sql: &str, tokens: &[Token], end: usize) -> Result<(DdlKind, usize)> {
    let mut i = 1;
    if keyword_at(sql, tokens, i, "TEMP") || keyword_at(sql, tokens, i, "TEMPORARY") {
        i += 1;
    }
    if keyword_at(sql, tokens, i, "UNIQUE") {
        i += 1;
    }

    let kind = if keyword_at(sql, tokens, i, "TABLE") {
        DdlKind::CreateTable
    } else if keyword_at(sql, tokens, i, "INDEX") {
        DdlKind::CreateIndex
    } else if keyword_at(sql, tokens, i, "VIEW") {
        DdlKind::CreateView
    } else if keyword_at(sql, tokens, i, "TRIGGER") {
        DdlKind::CreateTrigger
    } else if keyword_at(sql, tokens, i, "VIRTUAL") {
        i += 1;
        expect_keyword(sql, tokens, i, "TABLE", end)?;
        DdlKind::CreateVirtualTable
    } else {
        return Err(TandemError::parse(
            "expected a schema object after CREATE",
            offset_of(tokens, i, end),
        ));
    };
    Ok((kind, i))
}

fn drop_kind(sql: &str, tokens: &[Token], end: usize) -> Result<(DdlKind, usize)> {
    let kind = if keyword_at(sql, tokens, 1, "TABLE") {
        DdlKind::DropTable
    } else if keyword_at(sql, tokens, 1, "INDEX") {
        DdlKind::DropIndex
    } else if keyword_at(sql, tokens, 1, "VIEW") {
        DdlKind::DropView
    } else if keyword_at(sql, tokens, 1, "TRIGGER") {
        DdlKind::DropTrigger
    } else {
        return Err(TandemError::parse(
            "expected a schema object after DROP",
            offset_of(tokens, 1, end),
        ));
    };
    Ok((kind, 1))
}

fn has_guard(sql: &str, rest: &[Token], guard: &str) -> bool {
    let words: Vec<&str> = guard.split(' ').collect();
    rest.len() >= words.len()
        && rest
            .iter()
            .zip(&words)
            .all(|(token, word)| token.is_keyword(sql, word))
}

fn keyword_at(sql: &str, tokens: &[Token], index: usize, keyword: &str) -> bool {
    tokens
        .get(index)
        .is_some_and(|t| t.is_keyword(sql, keyword))
}

fn expect_keyword(
    sql: &str,
    tokens: &[Token],
    index: usize,
    keyword: &str,
    end: usize,
) -> Result<()> {
    if keyword_at(sql, tokens, index, keyword) {
        Ok(())
    } else {
        Err(TandemError::parse(
            format!("expected {keyword}"),
            offset_of(tokens, index, end),
        ))
    }
}

fn offset_of(tokens: &[Token], index: usize, end: usize) -> usize {
    tokens.get(index).map_or(end, |t| t.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::combined_ddl_command;

    #[test]
    fn test_batch_of_creates() {
        let stmts = parse(
            "CREATE TABLE users(ID INTEGER PRIMARY KEY, name TEXT); CREATE TABLE users2(ID INTEGER PRIMARY KEY, name TEXT)",
        )
        .unwrap();

        assert_eq!(stmts.len(), 2);
        assert!(stmts.iter().all(Statement::is_ddl));
        assert_eq!(
            stmts[0].source(),
            "CREATE TABLE users(ID INTEGER PRIMARY KEY, name TEXT)"
        );
        assert_eq!(
            combined_ddl_command(&stmts),
            "CREATE TABLE IF NOT EXISTS users(ID INTEGER PRIMARY KEY, name TEXT); CREATE TABLE IF NOT EXISTS users2(ID INTEGER PRIMARY KEY, name TEXT)"
        );
    }

    #[test]
    fn test_mixed_batch() {
        let stmts = parse("INSERT INTO t VALUES('a;b'); DROP INDEX idx_t; SELECT 1;").unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].kind(), StatementKind::Other);
        assert_eq!(stmts[1].kind(), StatementKind::Ddl(DdlKind::DropIndex));
        assert_eq!(
            stmts[1].rewritten_idempotent_source(),
            "DROP INDEX IF EXISTS idx_t"
        );
        assert_eq!(combined_ddl_command(&stmts), "DROP INDEX IF EXISTS idx_t");
    }

    #[test]
    fn test_existing_guard_is_kept() {
        let sql = "create temp table if not exists t(a)";
        let stmts = parse(sql).unwrap();
        assert_eq!(stmts[0].kind(), StatementKind::Ddl(DdlKind::CreateTable));
        assert_eq!(stmts[0].rewritten_idempotent_source(), sql);

        let stmts = parse("DROP VIEW IF EXISTS v").unwrap();
        assert_eq!(stmts[0].rewritten_idempotent_source(), "DROP VIEW IF EXISTS v");
    }

    #[test]
    fn test_object_variants() {
        let cases = [
            (
                "CREATE UNIQUE INDEX i ON t(a)",
                DdlKind::CreateIndex,
                "CREATE UNIQUE INDEX IF NOT EXISTS i ON t(a)",
            ),
            (
                "CREATE VIRTUAL TABLE docs USING fts5(body)",
                DdlKind::CreateVirtualTable,
                "CREATE VIRTUAL TABLE IF NOT EXISTS docs USING fts5(body)",
            ),
            (
                "CREATE VIEW v AS SELECT 1",
                DdlKind::CreateView,
                "CREATE VIEW IF NOT EXISTS v AS SELECT 1",
            ),
            (
                "ALTER TABLE t ADD COLUMN b TEXT",
                DdlKind::AlterTable,
                "ALTER TABLE t ADD COLUMN b TEXT",
            ),
        ];
        for (sql, kind, expected) in cases {
            let stmts = parse(sql).unwrap();
            assert_eq!(stmts[0].kind(), StatementKind::Ddl(kind), "{sql}");
            assert_eq!(stmts[0].rewritten_idempotent_source(), expected);
        }
    }

    #[test]
    fn test_trigger_body_is_one_statement() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON a BEGIN \
                   UPDATE b SET n = CASE WHEN n > 0 THEN n + 1 ELSE 1 END; \
                   DELETE FROM c; \
                   END; INSERT INTO a VALUES(1)";
        let stmts = parse(sql).unwrap();

        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].kind(), StatementKind::Ddl(DdlKind::CreateTrigger));
        assert!(stmts[0].source().ends_with("END"));
        assert!(stmts[0]
            .rewritten_idempotent_source()
            .starts_with("CREATE TRIGGER IF NOT EXISTS trg"));
        assert_eq!(stmts[1].source(), "INSERT INTO a VALUES(1)");
    }

    #[test]
    fn test_transaction_statements() {
        let stmts = parse("BEGIN; INSERT INTO t VALUES(1); COMMIT").unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(stmts.iter().all(|s| !s.is_ddl()));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse(" ;; -- nothing\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("SELEC 1").unwrap_err();
        assert!(matches!(err, TandemError::Parse { offset: 0, .. }));

        let err = parse("SELECT 1; SELECT (1").unwrap_err();
        assert!(matches!(err, TandemError::Parse { offset: 17, .. }));

        assert!(parse("SELECT 1)").is_err());
        assert!(parse("SELECT 'open").is_err());
        assert!(parse("CREATE TRIGGER t AFTER INSERT ON a BEGIN SELECT 1;").is_err());
        assert!(parse("CREATE THING x").is_err());
        assert!(parse("DROP").is_err());
        assert!(parse("(SELECT 1)").is_err());
    }

    #[test]
    fn test_parser_trait() {
        let parser: &dyn StatementParser = &SqliteParser::new();
        let stmts = parser.parse("DROP TABLE t").unwrap();
        assert_eq!(stmts[0].rewritten_idempotent_source(), "DROP TABLE IF EXISTS t");
    }
}
