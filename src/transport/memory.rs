//! # In-Memory Recording Link
//!
//! A [`LinkProvider`] that records every accepted chunk and can be scripted
//! to fail connects or writes. Used by the test suite and handy for dry runs.
//!
//! ```
//! use tokenprint::transport::{send, PrinterConnection, RecordingLink};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let link = RecordingLink::new();
//! link.fail_next_writes(1);
//!
//! let mut conn = PrinterConnection::new();
//! send(&mut conn, &link, b"hello").await?;
//!
//! assert_eq!(link.connect_attempts(), 2);
//! assert_eq!(link.writes(), vec![b"hello".to_vec()]);
//! # Ok::<(), tokenprint::error::TransportError>(())
//! # }).unwrap();
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::LinkProvider;
use crate::error::{ConnectError, WriteError};

/// Handle for one [`RecordingLink`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingHandle {
    /// 1-based connect count that produced this handle.
    pub session: usize,
}

#[derive(Debug, Default)]
struct Script {
    connect_attempts: usize,
    write_attempts: usize,
    closes: usize,
    fail_connects: usize,
    connects_allowed: Option<usize>,
    fail_writes: usize,
    fail_write_at: Option<usize>,
    fail_all_writes: bool,
    writes: Vec<(usize, Vec<u8>)>,
}

/// Scripted in-memory printer link.
#[derive(Debug, Default)]
pub struct RecordingLink {
    script: Mutex<Script>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next `n` connect attempts.
    pub fn fail_next_connects(&self, n: usize) {
        self.script().fail_connects = n;
    }

    /// Let the first `n` connects through, fail every one after.
    pub fn fail_connects_after(&self, n: usize) {
        self.script().connects_allowed = Some(n);
    }

    /// Fail the next `n` chunk writes.
    pub fn fail_next_writes(&self, n: usize) {
        self.script().fail_writes = n;
    }

    /// Fail the `n`th write attempt (1-based, counted over the link's
    /// lifetime), once.
    pub fn fail_write_at(&self, n: usize) {
        self.script().fail_write_at = Some(n);
    }

    /// Fail every chunk write.
    pub fn fail_all_writes(&self) {
        self.script().fail_all_writes = true;
    }

    pub fn connect_attempts(&self) -> usize {
        self.script().connect_attempts
    }

    /// Write attempts, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.script().write_attempts
    }

    /// Handles given back through [`LinkProvider::close`].
    pub fn closes(&self) -> usize {
        self.script().closes
    }

    /// Accepted chunks in arrival order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script().writes.iter().map(|(_, w)| w.clone()).collect()
    }

    /// Accepted chunks written through the handle of connect number `session`.
    pub fn writes_in_session(&self, session: usize) -> Vec<Vec<u8>> {
        self.script()
            .writes
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, w)| w.clone())
            .collect()
    }
}

#[async_trait]
impl LinkProvider for RecordingLink {
    type Handle = RecordingHandle;

    async fn connect(&self) -> Result<RecordingHandle, ConnectError> {
        let mut script = self.script();
        script.connect_attempts += 1;

        if script.fail_connects > 0 {
            script.fail_connects -= 1;
            return Err(ConnectError::Unavailable("scripted connect failure".into()));
        }
        if script
            .connects_allowed
            .is_some_and(|allowed| script.connect_attempts > allowed)
        {
            return Err(ConnectError::NotFound("scripted: printer gone".into()));
        }

        Ok(RecordingHandle {
            session: script.connect_attempts,
        })
    }

    async fn write_chunk(
        &self,
        handle: &mut RecordingHandle,
        bytes: &[u8],
    ) -> Result<(), WriteError> {
        let mut script = self.script();
        script.write_attempts += 1;

        if script.fail_all_writes {
            return Err(WriteError::Disconnected);
        }
        if script.fail_writes > 0 {
            script.fail_writes -= 1;
            return Err(WriteError::Rejected("scripted write failure".into()));
        }
        if script.fail_write_at == Some(script.write_attempts) {
            script.fail_write_at = None;
            return Err(WriteError::Rejected(format!(
                "scripted failure of write {}",
                script.write_attempts
            )));
        }

        script.writes.push((handle.session, bytes.to_vec()));
        Ok(())
    }

    async fn close(&self, _handle: RecordingHandle) {
        self.script().closes += 1;
    }
}
