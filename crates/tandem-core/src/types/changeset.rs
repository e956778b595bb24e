use crate::error::Result;
use crate::observe;
use crate::traits::ChangeSetPublisher;
use crate::types::{Change, Operation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Ordered batch of changes captured on one connection.
///
/// Insertion order is replay order. A changeset accumulates changes for the
/// transaction in flight; it is handed to a publisher on commit and emptied
/// on rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Origin node identifier
    pub node: String,

    /// Origin database identifier (file name, empty for in-memory databases)
    #[serde(default)]
    pub filename: String,

    pub changes: Vec<Change>,

    /// Set when the changeset is sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeSet {
    pub fn new(node: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            filename: filename.into(),
            changes: Vec::new(),
            timestamp: None,
        }
    }

    /// Append `change` and return its position.
    pub fn add_change(&mut self, change: Change) -> usize {
        self.changes.push(change);
        self.changes.len() - 1
    }

    /// Pop the most recently appended change.
    pub fn remove_last(&mut self) -> Option<Change> {
        self.changes.pop()
    }

    /// Remove the SQL change at `index`, provided it still carries `command`.
    ///
    /// Row changes appended after it keep their order. Returns `None` when the
    /// position no longer holds that change (e.g. after a rollback cleared it).
    pub fn withdraw_sql(&mut self, index: usize, command: &str) -> Option<Change> {
        match self.changes.get(index) {
            Some(change) if change.operation == Operation::Sql && change.command == command => {
                Some(self.changes.remove(index))
            }
            _ => None,
        }
    }

    /// Keep only the first `len` changes.
    pub fn truncate(&mut self, len: usize) {
        self.changes.truncate(len);
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.timestamp = None;
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Hand the changeset to `publisher` and return its verdict.
    ///
    /// An empty changeset is not published. The changes are left in place;
    /// clearing after a successful send is up to the caller.
    pub fn send(&mut self, publisher: &dyn ChangeSetPublisher) -> Result<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        self.timestamp = Some(Utc::now());

        let start = Instant::now();
        let result = publisher.publish(self);
        observe::record_publish(start.elapsed(), self.changes.len(), result.is_ok());
        result
    }
}
