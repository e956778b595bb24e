use crate::engine::RawConnection;
use crate::hooks::CdcHooks;
use crate::session::Session;
use rusqlite::{Batch, Connection, Params, Row};
use std::sync::Arc;
use tandem_core::{
    combined_ddl_command, observe, Change, ChangeSet, ConnectionId, Result, StatementParser,
    TandemError,
};

/// An engine connection with change capture.
///
/// Every statement passes through the classifier first. Schema statements are
/// recorded as one idempotent SQL change ahead of execution, and the record
/// is withdrawn if execution fails. Row changes are captured by the engine
/// callbacks installed on construction.
pub struct CdcConnection {
    raw: RawConnection,
    hooks: CdcHooks,
    parser: Arc<dyn StatementParser>,
    disable_ddl_sync: bool,
}

impl CdcConnection {
    /// Wrap `raw` and enable capture on it.
    pub fn new(
        raw: RawConnection,
        hooks: CdcHooks,
        parser: Arc<dyn StatementParser>,
        disable_ddl_sync: bool,
    ) -> Result<Self> {
        hooks.enable(&raw)?;
        Ok(Self {
            raw,
            hooks,
            parser,
            disable_ddl_sync,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.raw.id()
    }

    pub fn raw(&self) -> &RawConnection {
        &self.raw
    }

    pub fn hooks(&self) -> &CdcHooks {
        &self.hooks
    }

    pub fn ddl_sync_disabled(&self) -> bool {
        self.disable_ddl_sync
    }

    /// Execute a single parameterized statement.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let capture = self.begin(sql)?;
        let result = {
            let conn = self.raw.lock();
            let mark = capture.mark();
            conn.execute(sql, params).map_err(|e| (e, mark))
        };
        result.map_err(|(e, mark)| self.fail(&capture, mark, e))
    }

    /// Execute one or more statements without parameters.
    ///
    /// Statements run in order. The first failing statement stops the batch;
    /// row changes of the statements before it stay in the changeset.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let capture = self.begin(sql)?;
        let result = {
            let conn = self.raw.lock();
            let mut batch = Batch::new(&conn, sql);
            loop {
                let mark = capture.mark();
                match run_next(&mut batch) {
                    Ok(true) => {}
                    Ok(false) => break Ok(()),
                    Err(e) => break Err((e, mark)),
                }
            }
        };
        result.map_err(|(e, mark)| self.fail(&capture, mark, e))
    }

    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.raw
            .lock()
            .query_row(sql, params, f)
            .map_err(|e| TandemError::Engine(e.to_string()))
    }

    /// Run `f` against the engine connection, e.g. to iterate rows.
    ///
    /// Statements run here bypass DDL capture; row changes are still captured
    /// by the engine callbacks.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.raw.lock();
        f(&*conn).map_err(|e| TandemError::Engine(e.to_string()))
    }

    /// Copy of the changeset accumulated for the transaction in flight.
    pub fn changeset(&self) -> Result<ChangeSet> {
        self.hooks.registry().changeset(self.id())
    }

    /// Classify `sql` and record its schema statements ahead of execution.
    ///
    /// Runs before the engine connection is locked: the registry lock is
    /// never taken while the connection lock is held.
    fn begin(&self, sql: &str) -> Result<Capture> {
        let statements = self.parser.parse(sql)?;
        let command = if self.disable_ddl_sync {
            String::new()
        } else {
            combined_ddl_command(&statements)
        };

        let registry = self.hooks.registry();
        if command.is_empty() {
            return Ok(Capture {
                session: registry.session(self.id()).ok(),
                ddl: None,
            });
        }

        let session = registry.session(self.id())?;
        tracing::debug!("{}: capturing DDL: {}", self.id(), command);
        let index = session
            .lock()
            .add_change(Change::sql(command.clone(), Vec::new()));
        observe::record_ddl_capture();
        Ok(Capture {
            session: Some(session),
            ddl: Some((index, command)),
        })
    }

    /// Undo the bookkeeping of a failed statement. Called with the engine
    /// connection released.
    fn fail(&self, capture: &Capture, mark: usize, err: rusqlite::Error) -> TandemError {
        if let Some(session) = &capture.session {
            let mut changeset = session.lock();
            changeset.truncate(mark);
            if let Some((index, command)) = &capture.ddl {
                // An autocommit failure rolls back and clears the changeset first.
                if changeset.withdraw_sql(*index, command).is_some() {
                    tracing::debug!("{}: withdrew DDL change after failure", self.id());
                }
            }
        }
        TandemError::Engine(err.to_string())
    }
}

/// The session a call writes to and the position of the DDL change it
/// appended, if any.
struct Capture {
    session: Option<Session>,
    ddl: Option<(usize, String)>,
}

impl Capture {
    /// Changeset length before the next statement runs.
    fn mark(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.lock().len())
    }
}

/// Step the next statement of `batch` to completion. `false` once the batch
/// is exhausted.
fn run_next(batch: &mut Batch<'_, '_>) -> rusqlite::Result<bool> {
    let Some(mut stmt) = batch.next()? else {
        return Ok(false);
    };
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(true)
}

impl Drop for CdcConnection {
    fn drop(&mut self) {
        if let Err(e) = self.hooks.disable(&self.raw) {
            tracing::warn!("{}: failed to disable change capture: {}", self.id(), e);
        }
    }
}

impl std::fmt::Debug for CdcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdcConnection")
            .field("raw", &self.raw)
            .field("node", &self.hooks.node_name())
            .field("disable_ddl_sync", &self.disable_ddl_sync)
            .finish()
    }
}
