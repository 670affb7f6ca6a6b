use crate::model::{Error, PersistedQuote};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, InterruptHandle, OptionalExtension, TransactionBehavior};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex,
};

const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared by a blocking insert and the task enforcing its deadline. Exactly
/// one side wins: the insert commits or the deadline cancels it.
pub struct InsertGuard {
    state: AtomicU8,
    interrupt: Mutex<Option<InterruptHandle>>,
}

impl InsertGuard {
    pub fn new() -> InsertGuard {
        InsertGuard {
            state: AtomicU8::new(RUNNING),
            interrupt: Mutex::new(None),
        }
    }

    /// Returns false when the insert already reached its commit, in which
    /// case its own result is authoritative.
    pub fn cancel(&self) -> bool {
        if self
            .state
            .compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        if let Ok(slot) = self.interrupt.lock() {
            if let Some(handle) = slot.as_ref() {
                handle.interrupt();
            }
        }

        true
    }

    fn attach(&self, handle: InterruptHandle) -> bool {
        if let Ok(mut slot) = self.interrupt.lock() {
            *slot = Some(handle);
        }
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    fn try_commit(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, COMMITTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[derive(Clone)]
pub struct QuoteRepository {
    pool: Pool<SqliteConnectionManager>,
}

impl QuoteRepository {
    pub fn new(pool: Pool<SqliteConnectionManager>) -> QuoteRepository {
        QuoteRepository { pool: pool }
    }

    /// Inserts inside an immediate transaction that is only committed if
    /// `guard` has not been cancelled by then.
    pub fn insert(
        &self,
        value: &str,
        recorded_at: DateTime<Utc>,
        guard: &InsertGuard,
    ) -> Result<PersistedQuote, Error> {
        let mut conn = self.conn()?;
        if !guard.attach(conn.get_interrupt_handle()) {
            return Err(cancelled());
        }

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::StorageWriteFailed(e.to_string()))?;
        tx.execute(
            "INSERT INTO quote (value, recorded_at) VALUES (?, ?)",
            params![value, recorded_at],
        )
        .map_err(|e| Error::StorageWriteFailed(e.to_string()))?;
        let id = tx.last_insert_rowid();

        // Dropping the transaction rolls it back.
        if !guard.try_commit() {
            return Err(cancelled());
        }
        tx.commit().map_err(|e| Error::StorageWriteFailed(e.to_string()))?;

        Ok(PersistedQuote {
            id: id,
            value: value.into(),
            recorded_at: recorded_at,
        })
    }

    pub fn count(&self) -> Result<i64, Error> {
        self.conn()?
            .query_row("SELECT COUNT(*) FROM quote", [], |row| row.get(0))
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }

    pub fn latest(&self) -> Result<Option<PersistedQuote>, Error> {
        self.conn()?
            .query_row(
                "SELECT id, value, recorded_at FROM quote ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(PersistedQuote {
                        id: row.get(0)?,
                        value: row.get(1)?,
                        recorded_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, Error> {
        self.pool
            .get()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }
}

fn cancelled() -> Error {
    Error::StorageWriteFailed("write cancelled by deadline".into())
}
