//! Engine callback lifecycle.
//!
//! [`CdcHooks`] binds the pre-mutation, pre-commit and post-rollback
//! callbacks of one engine connection to a changeset session:
//!
//! - pre-mutation: build a [`Change`](tandem_core::Change) from the row
//!   notification, attach column metadata and append it
//! - pre-commit: publish the changeset; a failed publish turns the commit
//!   into a rollback
//! - post-rollback: discard everything captured for the aborted transaction
//!
//! Enabling and disabling happen under the session registry lock.

use crate::capture::{change_from_preupdate, is_internal_table};
use crate::engine::RawConnection;
use crate::metadata::table_columns;
use crate::session::{Session, SessionRegistry};
use parking_lot::ReentrantMutex;
use rusqlite::hooks::{Action, PreUpdateCase};
use rusqlite::Connection;
use std::sync::{Arc, Weak};
use tandem_core::{observe, ChangeSet, ChangeSetPublisher, ConnectionId, Result};

/// Installs and removes change capture callbacks on engine connections.
#[derive(Clone)]
pub struct CdcHooks {
    node_name: String,
    publisher: Arc<dyn ChangeSetPublisher>,
    registry: Arc<SessionRegistry>,
}

impl CdcHooks {
    pub fn new(
        node_name: impl Into<String>,
        publisher: Arc<dyn ChangeSetPublisher>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            publisher,
            registry,
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Register a fresh changeset for `conn` and install all three callbacks.
    ///
    /// Enabling an already enabled connection starts a new changeset.
    pub fn enable(&self, conn: &RawConnection) -> Result<()> {
        let changeset = ChangeSet::new(self.node_name.clone(), conn.filename());
        self.registry.register(conn.id(), changeset, |session| {
            let db = conn.lock();
            install_preupdate_hook(&db, conn.id(), Arc::downgrade(conn.handle()), session);
            install_commit_hook(&db, conn.id(), Arc::clone(&self.publisher), session);
            install_rollback_hook(&db, session);
            Ok(())
        })?;
        conn.attach_registry(&self.registry);
        tracing::debug!("Change capture enabled on {}", conn.id());
        Ok(())
    }

    /// Remove all three callbacks and drop the connection's changeset.
    pub fn disable(&self, conn: &RawConnection) -> Result<()> {
        self.registry.unregister(conn.id(), || {
            let db = conn.lock();
            db.preupdate_hook(None::<fn(Action, &str, &str, &PreUpdateCase)>);
            db.commit_hook(None::<fn() -> bool>);
            db.rollback_hook(None::<fn()>);
            Ok(())
        })?;
        conn.detach_registry();
        tracing::debug!("Change capture disabled on {}", conn.id());
        Ok(())
    }
}

fn install_preupdate_hook(
    db: &Connection,
    id: ConnectionId,
    handle: Weak<ReentrantMutex<Connection>>,
    session: &Session,
) {
    let session = Arc::clone(session);
    db.preupdate_hook(Some(
        move |action: Action, database: &str, table: &str, case: &PreUpdateCase| {
            if is_internal_table(table) {
                return;
            }
            let mut change = match change_from_preupdate(action, database, table, case) {
                Ok(change) => change,
                Err(e) => {
                    tracing::warn!(
                        "{}: failed to read row values of {}.{}: {}",
                        id,
                        database,
                        table,
                        e
                    );
                    return;
                }
            };

            // Called while the executing thread holds the connection lock.
            let Some(handle) = handle.upgrade() else {
                return;
            };
            let columns = {
                let conn = handle.lock();
                table_columns(&conn, database, table)
            };
            match columns {
                Ok(columns) => change.apply_columns(&columns),
                Err(e) => {
                    tracing::warn!(
                        "{}: failed to read columns of {}.{}: {}",
                        id,
                        database,
                        table,
                        e
                    );
                    return;
                }
            }
            if !change.is_aligned() {
                tracing::warn!(
                    "{}: {} values do not line up with {} columns of {}.{}",
                    id,
                    change.operation,
                    change.columns.len(),
                    database,
                    table
                );
            }

            observe::record_capture(change.operation.as_label());
            tracing::trace!("{}: captured {} on {}.{}", id, change.operation, database, table);
            session.lock().add_change(change);
        },
    ));
}

fn install_commit_hook(
    db: &Connection,
    id: ConnectionId,
    publisher: Arc<dyn ChangeSetPublisher>,
    session: &Session,
) {
    let session = Arc::clone(session);
    db.commit_hook(Some(move || {
        let mut changeset = session.lock();
        let result = changeset.send(publisher.as_ref());
        changeset.clear();
        match result {
            Ok(()) => false,
            Err(e) => {
                tracing::error!("{}: failed to send changeset, aborting commit: {}", id, e);
                true
            }
        }
    }));
}

fn install_rollback_hook(db: &Connection, session: &Session) {
    let session = Arc::clone(session);
    db.rollback_hook(Some(move || {
        session.lock().clear();
    }));
}
