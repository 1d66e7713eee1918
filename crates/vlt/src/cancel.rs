//! Statement cancellation
//!
//! While a [`CancelGuard`] is alive, SQLite calls a progress handler every
//! [`PROGRESS_OPS`] virtual machine instructions; once the token is cancelled
//! the handler aborts the running statement with `SQLITE_INTERRUPT`, which
//! converts to [`StoreError::Cancelled`].

use crate::error::StoreError;
use rusqlite::Connection;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;

/// VM instructions between token checks
pub const PROGRESS_OPS: i32 = 1000;

/// Installs the cancellation progress handler for the guard's lifetime
pub struct CancelGuard<'c> {
    conn: &'c Connection,
}

impl<'c> CancelGuard<'c> {
    /// Fails with [`StoreError::Cancelled`] if the token has already fired.
    pub fn install(conn: &'c Connection, cancel: &CancellationToken) -> Result<Self, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let token = AssertUnwindSafe(cancel.clone());
        conn.progress_handler(PROGRESS_OPS, Some(move || token.is_cancelled()));

        Ok(Self { conn })
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}
