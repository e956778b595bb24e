use crate::error::{Result, TandemError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by every connection a connector opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Origin node identifier stamped on every changeset
    /// Default: "node"
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Skip capture of schema statements
    #[serde(default)]
    pub disable_ddl_sync: bool,

    /// Enable WAL mode on file-backed databases
    /// Default: false
    #[serde(default)]
    pub wal_mode: bool,

    /// Engine busy timeout in milliseconds
    /// Default: 5000
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Enforce foreign keys
    /// Default: true
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,

    #[serde(default)]
    pub backup: BackupConfig,
}

/// Snapshot export tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Pages copied per backup step (-1 = all remaining pages)
    #[serde(default = "default_pages_per_step")]
    pub pages_per_step: i32,

    /// Pause after a busy or locked step, in milliseconds
    #[serde(default = "default_step_pause")]
    pub step_pause_ms: u64,

    /// Directory for the private temporary file (system default when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            pages_per_step: default_pages_per_step(),
            step_pause_ms: default_step_pause(),
            temp_dir: None,
        }
    }
}

impl BackupConfig {
    pub fn with_pages_per_step(mut self, pages: i32) -> Self {
        self.pages_per_step = pages;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

fn default_node_name() -> String {
    "node".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

fn default_foreign_keys() -> bool {
    true
}

fn default_pages_per_step() -> i32 {
    -1
}

fn default_step_pause() -> u64 {
    10
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            disable_ddl_sync: false,
            wal_mode: false,
            busy_timeout_ms: default_busy_timeout(),
            foreign_keys: default_foreign_keys(),
            backup: BackupConfig::default(),
        }
    }
}

impl ConnectorConfig {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            ..Default::default()
        }
    }

    pub fn with_disable_ddl_sync(mut self, disable: bool) -> Self {
        self.disable_ddl_sync = disable;
        self
    }

    pub fn with_wal_mode(mut self, wal_mode: bool) -> Self {
        self.wal_mode = wal_mode;
        self
    }

    pub fn with_busy_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = backup;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_name.trim().is_empty() {
            return Err(TandemError::Config("node_name must not be empty".into()));
        }
        if self.backup.pages_per_step < 1 && self.backup.pages_per_step != -1 {
            return Err(TandemError::Config(
                "backup.pages_per_step must be positive or -1".into(),
            ));
        }
        Ok(())
    }
}
