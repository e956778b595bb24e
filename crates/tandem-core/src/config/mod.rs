pub mod connector;

pub use connector::{BackupConfig, ConnectorConfig};
