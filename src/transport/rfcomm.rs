//! # Bluetooth RFCOMM Link
//!
//! Talks to a printer over Bluetooth Serial Port Profile (SPP) through an
//! RFCOMM TTY device such as `/dev/rfcomm0`.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must be paired and bound to an RFCOMM device first:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! A link can name the device path directly, or a MAC address that is
//! resolved to an already-bound device at connect time.
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary raster data is not altered:
//! no input/output processing, 8-bit characters, no echo, non-canonical
//! mode, and no XON/XOFF flow control.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::LinkProvider;
use crate::error::{ConnectError, WriteError};

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Per-chunk write timeout.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Which RFCOMM device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfcommTarget {
    Device(PathBuf),
    /// Bluetooth MAC, looked up among bound RFCOMM devices on connect.
    Mac(String),
}

/// # RFCOMM Printer Link
///
/// ```no_run
/// use tokenprint::transport::{send, PrinterConnection, RfcommLink};
///
/// # async fn demo() -> Result<(), tokenprint::error::TransportError> {
/// let link = RfcommLink::device("/dev/rfcomm0");
/// let mut conn = PrinterConnection::new();
/// send(&mut conn, &link, b"hello\n").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RfcommLink {
    target: RfcommTarget,
    chunk_delay: Duration,
}

/// Open RFCOMM device.
#[derive(Debug)]
pub struct RfcommHandle {
    file: File,
    path: PathBuf,
}

impl RfcommHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RfcommLink {
    pub fn new(target: RfcommTarget) -> Self {
        Self {
            target,
            chunk_delay: Duration::ZERO,
        }
    }

    /// Link to a known device path.
    pub fn device(path: impl Into<PathBuf>) -> Self {
        Self::new(RfcommTarget::Device(path.into()))
    }

    /// Link to whichever RFCOMM device is bound to `mac`.
    pub fn mac(mac: impl Into<String>) -> Self {
        Self::new(RfcommTarget::Mac(mac.into()))
    }

    /// Pause after every chunk, giving slow printers time to drain their
    /// buffer. Default is no pause.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn target(&self) -> &RfcommTarget {
        &self.target
    }

    async fn resolve(&self) -> Result<PathBuf, ConnectError> {
        match &self.target {
            RfcommTarget::Device(path) => Ok(path.clone()),
            RfcommTarget::Mac(mac) => {
                if !is_valid_mac(mac) {
                    return Err(ConnectError::NotFound(format!(
                        "'{}' is not a Bluetooth MAC address",
                        mac
                    )));
                }
                find_rfcomm_for_mac(mac).await?.ok_or_else(|| {
                    ConnectError::NotFound(format!(
                        "No RFCOMM device bound to {} (try: sudo rfcomm bind 0 {})",
                        mac.to_uppercase(),
                        mac.to_uppercase()
                    ))
                })
            }
        }
    }
}

impl Default for RfcommLink {
    fn default() -> Self {
        Self::device(DEFAULT_DEVICE)
    }
}

#[async_trait]
impl LinkProvider for RfcommLink {
    type Handle = RfcommHandle;

    #[instrument(skip(self), fields(target = ?self.target))]
    async fn connect(&self) -> Result<RfcommHandle, ConnectError> {
        let path = self.resolve().await?;

        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    ConnectError::NotFound(format!("{} does not exist", path.display()))
                }
                _ => ConnectError::Unavailable(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                )),
            })?;

        configure_tty_raw(&file)?;

        info!(device = %path.display(), "rfcomm device opened");
        Ok(RfcommHandle { file, path })
    }

    async fn write_chunk(&self, handle: &mut RfcommHandle, bytes: &[u8]) -> Result<(), WriteError> {
        let write = async {
            handle.file.write_all(bytes).await?;
            handle.file.flush().await
        };

        match tokio::time::timeout(WRITE_TIMEOUT, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                return Err(WriteError::Disconnected);
            }
            Ok(Err(e)) => return Err(WriteError::Io(e)),
            Err(_) => {
                return Err(WriteError::Rejected(format!(
                    "write to {} timed out after {:?}",
                    handle.path.display(),
                    WRITE_TIMEOUT
                )));
            }
        }

        if !self.chunk_delay.is_zero() {
            debug!(delay = ?self.chunk_delay, "pacing after chunk");
            tokio::time::sleep(self.chunk_delay).await;
        }
        Ok(())
    }
}

/// Configure an open device for raw TTY mode.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// IXON/IXOFF/IXANY must be off: 0x11 (XON) and 0x13 (XOFF) occur in raster
/// data and would otherwise be swallowed by the line discipline.
#[cfg(unix)]
fn configure_tty_raw(file: &File) -> Result<(), ConnectError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();

    let mut termios = MaybeUninit::uninit();
    // SAFETY: fd is an open descriptor owned by `file`; tcgetattr fills termios
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(ConnectError::Unavailable(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    // SAFETY: tcgetattr returned 0, so termios is initialized
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // SAFETY: fd is still open and termios is a valid, initialized struct
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(ConnectError::Unavailable(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File) -> Result<(), ConnectError> {
    Ok(())
}

// ============================================================================
// RFCOMM LOOKUP
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find the device bound to `mac` in an `/proc/net/rfcomm` style listing.
///
/// Lines look like `rfcomm0: XX:XX:XX:XX:XX:XX channel 1 clean`.
fn device_for_mac(listing: &str, mac: &str) -> Option<PathBuf> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|name| PathBuf::from(format!("/dev/{}", name.trim())))
        .next()
}

/// Find an RFCOMM device already bound to `mac`.
///
/// Checks `/proc/net/rfcomm`, falling back to `rfcomm -a`.
pub async fn find_rfcomm_for_mac(mac: &str) -> Result<Option<PathBuf>, ConnectError> {
    if let Ok(contents) = tokio::fs::read_to_string("/proc/net/rfcomm").await {
        if let Some(path) = device_for_mac(&contents, mac) {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(Some(path));
            }
        }
    }

    let output = tokio::process::Command::new("rfcomm")
        .arg("-a")
        .output()
        .await
        .map_err(|e| ConnectError::Unavailable(format!("Failed to run 'rfcomm -a': {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(path) = device_for_mac(&stdout, mac) else {
        return Ok(None);
    };
    let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
    Ok(exists.then_some(path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{PrinterConnection, send};

    #[test]
    fn test_default_device_path() {
        assert_eq!(
            RfcommLink::default().target(),
            &RfcommTarget::Device(PathBuf::from("/dev/rfcomm0"))
        );
    }

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac(""));
    }

    #[test]
    fn test_device_for_mac() {
        let listing = "rfcomm0: 00:11:62:AA:BB:CC channel 1 clean\n\
                       rfcomm1: 00:11:62:DD:EE:FF channel 1 connected\n";
        assert_eq!(
            device_for_mac(listing, "00:11:62:dd:ee:ff"),
            Some(PathBuf::from("/dev/rfcomm1"))
        );
        assert_eq!(device_for_mac(listing, "00:11:62:00:00:00"), None);
    }

    #[tokio::test]
    async fn test_missing_device_is_connect_error() {
        let link = RfcommLink::device("/nonexistent/rfcomm-test");
        let mut conn = PrinterConnection::new();

        let err = send(&mut conn, &link, b"x").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::TransportError::Connect(ConnectError::NotFound(_))
        ));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_bad_mac_is_rejected_before_lookup() {
        let link = RfcommLink::mac("not-a-mac");
        assert!(matches!(
            link.connect().await,
            Err(ConnectError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_tty_file_fails_raw_mode() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let link = RfcommLink::device(file.path());
        assert!(matches!(
            link.connect().await,
            Err(ConnectError::Unavailable(_))
        ));
    }
}
