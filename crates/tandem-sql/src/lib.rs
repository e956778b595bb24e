//! SQLite statement classification for tandem
//!
//! Splits SQL text into statements and recognises schema statements, so that
//! DDL can be captured as an idempotent SQL change before it runs.

pub mod lexer;
pub mod parser;

pub use parser::{parse, SqliteParser};
