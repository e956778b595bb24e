//! Stock changeset publishers
//!
//! The network transport that ships changesets between nodes lives outside
//! this workspace. These publishers cover the in-process cases: dropping
//! changesets, forwarding them to a channel drained by a transport task, or
//! calling a closure.

use crate::error::{Result, TandemError};
use crate::traits::ChangeSetPublisher;
use crate::types::ChangeSet;
use std::sync::mpsc::{self, Receiver, SyncSender};

/// Accepts and discards every changeset.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl ChangeSetPublisher for NoopPublisher {
    fn publish(&self, changeset: &ChangeSet) -> Result<()> {
        tracing::trace!(
            "Discarding changeset with {} change(s) from {}",
            changeset.len(),
            changeset.node
        );
        Ok(())
    }
}

/// Forwards changesets into a bounded channel.
///
/// A full channel blocks the committing thread until the consumer catches
/// up. A dropped receiver fails the publish, and with it the commit.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: SyncSender<ChangeSet>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ChangeSet>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self { tx }, rx)
    }
}

impl ChangeSetPublisher for ChannelPublisher {
    fn publish(&self, changeset: &ChangeSet) -> Result<()> {
        self.tx
            .send(changeset.clone())
            .map_err(|_| TandemError::Publish("changeset receiver disconnected".into()))
    }
}

/// Adapts a closure into a publisher.
pub struct FnPublisher<F>(F);

impl<F> FnPublisher<F>
where
    F: Fn(&ChangeSet) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ChangeSetPublisher for FnPublisher<F>
where
    F: Fn(&ChangeSet) -> Result<()> + Send + Sync,
{
    fn publish(&self, changeset: &ChangeSet) -> Result<()> {
        (self.0)(changeset)
    }
}
