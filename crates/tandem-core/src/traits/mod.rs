pub mod parser;
pub mod publisher;

pub use parser::StatementParser;
pub use publisher::ChangeSetPublisher;
