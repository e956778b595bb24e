use crate::error::Result;
use crate::types::ChangeSet;
use std::sync::Arc;

/// Destination for committed changesets.
///
/// Called synchronously from the engine's pre-commit callback. Returning an
/// error fails the commit, so the transaction is rolled back and its changes
/// are never considered delivered.
pub trait ChangeSetPublisher: Send + Sync {
    fn publish(&self, changeset: &ChangeSet) -> Result<()>;
}

impl<T: ChangeSetPublisher + ?Sized> ChangeSetPublisher for Arc<T> {
    fn publish(&self, changeset: &ChangeSet) -> Result<()> {
        (**self).publish(changeset)
    }
}

impl<T: ChangeSetPublisher + ?Sized> ChangeSetPublisher for Box<T> {
    fn publish(&self, changeset: &ChangeSet) -> Result<()> {
        (**self).publish(changeset)
    }
}
