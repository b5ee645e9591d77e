//! # Printer Transport Layer
//!
//! Owns one logical connection to a printer and pushes a command stream
//! through it in link-sized chunks.
//!
//! ## Link Providers
//!
//! The physical link is behind the [`LinkProvider`] trait:
//!
//! - [`rfcomm`]: Bluetooth serial port bound to `/dev/rfcommN` (Linux)
//! - [`ble`]: Bluetooth LE GATT characteristic (feature `ble`)
//! - [`memory`]: scripted in-memory link for tests
//!
//! ## Connection Lifecycle
//!
//! ```text
//!            connect ok
//! Absent ──► Connecting ──────────► Connected
//!   ▲             │                     │
//!   │ connect err │        write error  │
//!   └─────────────┴─────────────────────┘
//! ```
//!
//! ## Send and Retry
//!
//! [`send`] connects if needed, then writes chunks strictly in order, each
//! write completing before the next starts. A failed write drops the handle
//! and the whole send is run once more from a fresh connect. There is no
//! further retry: the second failure is returned as
//! [`TransportError::Send`] with the last underlying cause.
//!
//! A [`PrinterConnection`] has no internal locking. Callers that share one
//! across tasks must serialize sends themselves (e.g. behind a
//! `tokio::sync::Mutex`).

pub mod memory;
pub mod rfcomm;

#[cfg(feature = "ble")]
pub mod ble;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConnectError, LinkFailure, TransportError, WriteError};

pub use memory::RecordingLink;
pub use rfcomm::RfcommLink;

/// Default chunk size in bytes (one GATT long write).
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Full send attempts per [`send`] call: the first plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

// ============================================================================
// LINK PROVIDER
// ============================================================================

/// Opens and writes to the physical printer endpoint.
///
/// Timeouts are the provider's job; a timed-out connect or write is reported
/// as a [`ConnectError`] or [`WriteError`].
#[async_trait]
pub trait LinkProvider: Send + Sync {
    /// Writable endpoint returned by [`connect`](Self::connect).
    type Handle: Send;

    /// Discover and open the printer endpoint.
    async fn connect(&self) -> Result<Self::Handle, ConnectError>;

    /// Write one chunk, returning once the link has accepted it.
    async fn write_chunk(&self, handle: &mut Self::Handle, bytes: &[u8])
    -> Result<(), WriteError>;

    /// Release a handle the connection no longer holds. Closing is best
    /// effort and cannot fail; the default just drops the handle.
    async fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

// ============================================================================
// CONNECTION STATE
// ============================================================================

/// Where a [`PrinterConnection`] is in its lifecycle.
#[derive(Debug, Default)]
pub enum ConnectionState<H> {
    #[default]
    Absent,
    /// A connect is in flight. Only observable if that connect's future was
    /// dropped before finishing; the next send treats it as `Absent`.
    Connecting,
    Connected(H),
}

impl<H> ConnectionState<H> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Connecting => "connecting",
            Self::Connected(_) => "connected",
        }
    }
}

/// One printer connection, owned by the caller.
#[derive(Debug)]
pub struct PrinterConnection<H> {
    state: ConnectionState<H>,
}

impl<H> Default for PrinterConnection<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PrinterConnection<H> {
    /// A connection with no handle yet.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Absent,
        }
    }

    pub fn state(&self) -> &ConnectionState<H> {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Open the link if no handle is held. A held handle is kept as-is.
    #[instrument(skip_all)]
    pub async fn connect<P>(&mut self, provider: &P) -> Result<(), ConnectError>
    where
        P: LinkProvider<Handle = H>,
    {
        if self.is_connected() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match provider.connect().await {
            Ok(handle) => {
                info!("printer connected");
                self.state = ConnectionState::Connected(handle);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "printer connect failed");
                self.state = ConnectionState::Absent;
                Err(e)
            }
        }
    }

    /// Hand the handle back to the provider to close the link.
    ///
    /// Dropping a `PrinterConnection` only drops the handle; call this to
    /// let links like BLE tear down cleanly.
    pub async fn disconnect<P>(&mut self, provider: &P)
    where
        P: LinkProvider<Handle = H>,
    {
        if let ConnectionState::Connected(handle) =
            std::mem::replace(&mut self.state, ConnectionState::Absent)
        {
            provider.close(handle).await;
            info!("printer disconnected");
        }
    }

    /// Write every chunk in order; the first failure closes the handle.
    async fn write_all<P>(
        &mut self,
        provider: &P,
        data: &[u8],
        chunk_size: usize,
    ) -> Result<(), WriteError>
    where
        P: LinkProvider<Handle = H>,
    {
        // Absent while writing: a cancelled send leaves no half-used handle
        let ConnectionState::Connected(mut handle) =
            std::mem::replace(&mut self.state, ConnectionState::Absent)
        else {
            return Err(WriteError::Disconnected);
        };

        let total = data.len().div_ceil(chunk_size);
        for (index, chunk) in data.chunks(chunk_size).enumerate() {
            debug!(chunk = index + 1, total, len = chunk.len(), "writing chunk");
            if let Err(e) = provider.write_chunk(&mut handle, chunk).await {
                provider.close(handle).await;
                return Err(e);
            }
        }
        self.state = ConnectionState::Connected(handle);
        Ok(())
    }
}

// ============================================================================
// SEND
// ============================================================================

/// Send tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Maximum bytes per link write.
    pub chunk_size: usize,
}

impl SendOptions {
    pub const DEFAULT: Self = Self {
        chunk_size: DEFAULT_CHUNK_SIZE,
    };
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Send `data` with the default chunk size.
pub async fn send<P: LinkProvider>(
    connection: &mut PrinterConnection<P::Handle>,
    provider: &P,
    data: &[u8],
) -> Result<(), TransportError> {
    send_with(connection, provider, data, SendOptions::DEFAULT).await
}

/// Send `data` to the printer, reconnecting and retrying once on failure.
///
/// ## Errors
///
/// - [`TransportError::Connect`]: the first connect attempt failed
/// - [`TransportError::Send`]: a write failed, the retry (fresh connect plus
///   full resend) failed too. `cause` is the retry's failure, `initial` the
///   write failure that started it
/// - [`TransportError::InvalidChunkSize`]: `chunk_size` is 0
///
/// On return the connection is either `Connected` (success, or a failure
/// that left the handle intact) or `Absent`.
#[instrument(skip_all, fields(data_len = data.len(), chunk_size = options.chunk_size))]
pub async fn send_with<P: LinkProvider>(
    connection: &mut PrinterConnection<P::Handle>,
    provider: &P,
    data: &[u8],
    options: SendOptions,
) -> Result<(), TransportError> {
    if options.chunk_size == 0 {
        return Err(TransportError::InvalidChunkSize);
    }

    let mut attempt = 1;
    let mut initial = None;
    loop {
        let result = match connection.connect(provider).await {
            Ok(()) => connection
                .write_all(provider, data, options.chunk_size)
                .await
                .map_err(LinkFailure::Write),
            Err(e) if attempt == 1 => return Err(TransportError::Connect(e)),
            Err(e) => Err(LinkFailure::Connect(e)),
        };

        match result {
            Ok(()) => {
                info!(attempt, "print data sent");
                return Ok(());
            }
            Err(cause) if attempt < MAX_ATTEMPTS => {
                warn!(error = %cause, "send failed, reconnecting to retry");
                initial = Some(cause);
                attempt += 1;
            }
            Err(cause) => {
                warn!(error = %cause, attempts = attempt, "send failed, giving up");
                return Err(TransportError::Send {
                    attempts: attempt,
                    cause,
                    initial,
                });
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[tokio::test]
    async fn test_chunks_in_order() {
        let link = RecordingLink::new();
        let mut conn = PrinterConnection::new();
        let data = payload(1025);

        send(&mut conn, &link, &data).await.unwrap();

        let writes = link.writes();
        let sizes: Vec<usize> = writes.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![512, 512, 1]);
        assert_eq!(writes.concat(), data);
        assert!(conn.is_connected());
        assert_eq!(link.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_reuses_existing_connection() {
        let link = RecordingLink::new();
        let mut conn = PrinterConnection::new();

        send(&mut conn, &link, b"one").await.unwrap();
        send(&mut conn, &link, b"two").await.unwrap();

        assert_eq!(link.connect_attempts(), 1);
        assert_eq!(link.writes(), vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_retried() {
        let link = RecordingLink::new();
        link.fail_next_connects(1);
        let mut conn = PrinterConnection::new();

        let err = send(&mut conn, &link, b"data").await.unwrap_err();

        assert!(matches!(err, TransportError::Connect(_)));
        assert_eq!(link.connect_attempts(), 1);
        assert_eq!(link.write_attempts(), 0);
        assert_eq!(conn.state().name(), "absent");
    }

    #[tokio::test]
    async fn test_every_write_failing_gives_up_after_two_attempts() {
        let link = RecordingLink::new();
        link.fail_all_writes();
        let mut conn = PrinterConnection::new();
        let data = payload(1025);

        let err = send(&mut conn, &link, &data).await.unwrap_err();

        match err {
            TransportError::Send {
                attempts,
                cause,
                initial,
            } => {
                assert_eq!(attempts, 2);
                assert!(matches!(cause, LinkFailure::Write(_)));
                assert!(matches!(initial, Some(LinkFailure::Write(_))));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(link.connect_attempts(), 2);
        assert!(link.write_attempts() <= 2 * 3);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_single_write_failure_recovers() {
        let link = RecordingLink::new();
        link.fail_next_writes(1);
        let mut conn = PrinterConnection::new();
        let data = payload(1025);

        send(&mut conn, &link, &data).await.unwrap();

        assert!(conn.is_connected());
        assert_eq!(link.connect_attempts(), 2);
        // the retry resends everything from the first chunk
        assert_eq!(link.writes().concat(), data);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_restarts_from_first_chunk() {
        let link = RecordingLink::new();
        link.fail_write_at(2);
        let mut conn = PrinterConnection::new();
        let data = payload(1025);

        send(&mut conn, &link, &data).await.unwrap();

        // session 1 got chunk 1 only; session 2 got all three again
        assert_eq!(link.writes_in_session(1), vec![data[..512].to_vec()]);
        let resent = link.writes_in_session(2);
        let sizes: Vec<usize> = resent.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![512, 512, 1]);
        assert_eq!(resent.concat(), data);
        assert_eq!(link.write_attempts(), 5);
    }

    #[tokio::test]
    async fn test_reconnect_failure_on_retry() {
        let link = RecordingLink::new();
        link.fail_next_writes(1);
        link.fail_connects_after(1);
        let mut conn = PrinterConnection::new();

        let err = send(&mut conn, &link, b"data").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Send {
                attempts: 2,
                cause: LinkFailure::Connect(_),
                initial: Some(LinkFailure::Write(WriteError::Rejected(_))),
            }
        ));
        assert_eq!(conn.state().name(), "absent");
        assert_eq!(link.closes(), 1);
    }

    #[tokio::test]
    async fn test_zero_chunk_size() {
        let link = RecordingLink::new();
        let mut conn = PrinterConnection::new();
        let err = send_with(&mut conn, &link, b"x", SendOptions { chunk_size: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidChunkSize));
        assert_eq!(link.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_data_only_connects() {
        let link = RecordingLink::new();
        let mut conn = PrinterConnection::new();
        send(&mut conn, &link, &[]).await.unwrap();
        assert!(conn.is_connected());
        assert_eq!(link.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_explicit_connect_and_disconnect() {
        let link = RecordingLink::new();
        let mut conn = PrinterConnection::new();

        conn.connect(&link).await.unwrap();
        conn.connect(&link).await.unwrap();
        assert_eq!(link.connect_attempts(), 1);

        conn.disconnect(&link).await;
        assert_eq!(conn.state().name(), "absent");
        assert_eq!(link.closes(), 1);

        // nothing held, nothing to close
        conn.disconnect(&link).await;
        assert_eq!(link.closes(), 1);

        send(&mut conn, &link, b"x").await.unwrap();
        assert_eq!(link.connect_attempts(), 2);
    }
}
