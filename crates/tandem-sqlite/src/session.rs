//! Session registry: connection identity to its active changeset.
//!
//! Engine callbacks and the statement path reach a connection's changeset
//! through the registry. One registry is owned by each connector and shared
//! with every connection it opens.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::{ChangeSet, ConnectionId, Result, TandemError};

/// The changeset a connection is currently appending to.
pub type Session = Arc<Mutex<ChangeSet>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session for `id` and run `install` while the registry
    /// lock is held, so no other thread observes a half-registered connection.
    ///
    /// An existing session for `id` is replaced.
    pub fn register<F>(&self, id: ConnectionId, changeset: ChangeSet, install: F) -> Result<Session>
    where
        F: FnOnce(&Session) -> Result<()>,
    {
        let mut sessions = self.sessions.lock();
        let session = Arc::new(Mutex::new(changeset));
        install(&session)?;
        sessions.insert(id, Arc::clone(&session));
        tracing::debug!("Registered changeset session for {}", id);
        Ok(session)
    }

    /// Remove the session for `id`, running `uninstall` under the registry lock.
    ///
    /// Returns the removed session, if there was one.
    pub fn unregister<F>(&self, id: ConnectionId, uninstall: F) -> Result<Option<Session>>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut sessions = self.sessions.lock();
        uninstall()?;
        let removed = sessions.remove(&id);
        if removed.is_some() {
            tracing::debug!("Removed changeset session for {}", id);
        }
        Ok(removed)
    }

    pub fn session(&self, id: ConnectionId) -> Result<Session> {
        self.sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or(TandemError::NoActiveSession(id))
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Copy of the active changeset of `id`.
    pub fn changeset(&self, id: ConnectionId) -> Result<ChangeSet> {
        let session = self.session(id)?;
        let changeset = session.lock().clone();
        Ok(changeset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::Change;

    fn registry_with(id: ConnectionId) -> SessionRegistry {
        let registry = SessionRegistry::new();
        registry
            .register(id, ChangeSet::new("node1", "app.db"), |_| Ok(()))
            .unwrap();
        registry
    }

    #[test]
    fn test_missing_session() {
        let registry = SessionRegistry::new();
        let id = ConnectionId(7);

        assert!(registry.session(id).unwrap_err().is_no_active_session());
        assert!(registry.changeset(id).unwrap_err().is_no_active_session());
    }

    #[test]
    fn test_session_is_shared() {
        let id = ConnectionId(1);
        let registry = registry_with(id);

        let session = registry.session(id).unwrap();
        let index = session
            .lock()
            .add_change(Change::sql("CREATE TABLE IF NOT EXISTS a(x)", vec![]));
        assert_eq!(index, 0);
        assert_eq!(registry.changeset(id).unwrap().len(), 1);

        // Re-registering starts a fresh changeset
        registry
            .register(id, ChangeSet::new("node1", "app.db"), |_| Ok(()))
            .unwrap();
        assert!(registry.changeset(id).unwrap().is_empty());
        assert_eq!(session.lock().len(), 1);
    }

    #[test]
    fn test_failed_install_registers_nothing() {
        let registry = SessionRegistry::new();
        let id = ConnectionId(3);
        let result = registry.register(id, ChangeSet::new("node1", ""), |_| {
            Err(TandemError::Engine("hook refused".into()))
        });
        assert!(result.is_err());
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_unregister() {
        let id = ConnectionId(2);
        let registry = registry_with(id);
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id, || Ok(())).unwrap().is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister(id, || Ok(())).unwrap().is_none());
    }
}
