//! Event Socket Server
//!
//! Accepts hook forwarders on the session's Unix socket and feeds what they
//! send into the runtime loop through a [`CompanionHandle`].
//!
//! # Wire Format
//!
//! Newline-delimited JSON, one message per line:
//!
//! ```text
//! {"hook_event_name":"PostToolUse","tool_name":"Bash","tool_result":{...}}
//! {"pointer":{"x":812,"y":440},"anchor":{"x":900,"y":600}}
//! ```
//!
//! Lines carrying a `pointer` object are pointer updates; everything else
//! is parsed as a hook event. Malformed lines are logged and skipped.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};

use companion_core::render::motion::Point;
use companion_core::{CompanionHandle, HookEvent};

/// Longest accepted line; tool results can be large
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Result of one bounded line read
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// A complete line is in the buffer (newline stripped)
    Line,
    /// The line exceeded the limit and was discarded
    TooLong,
    /// End of stream
    Eof,
}

/// Read one newline-terminated line, holding at most `limit + 1` bytes
///
/// An overlong line is skipped through its newline in bounded chunks.
async fn read_line_limited<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let chunk = limit as u64 + 1;

    buf.clear();
    let n = (&mut *reader).take(chunk).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(LineRead::Line);
    }
    if buf.len() <= limit {
        // Final line without a newline
        return Ok(LineRead::Line);
    }

    loop {
        buf.clear();
        let n = (&mut *reader).take(chunk).read_until(b'\n', buf).await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            buf.clear();
            return Ok(LineRead::TooLong);
        }
    }
}

/// One decoded line
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Host lifecycle event
    Event(HookEvent),
    /// Pointer position update
    Pointer {
        /// Pointer position
        pointer: Point,
        /// Character anchor
        anchor: Point,
    },
}

/// Decode one line of the wire format
pub fn decode_line(line: &str) -> Result<Inbound> {
    let value: Value = serde_json::from_str(line).context("line is not JSON")?;

    if let Some(pointer) = value.get("pointer") {
        let pointer: Point =
            serde_json::from_value(pointer.clone()).context("invalid pointer position")?;
        let anchor: Point = match value.get("anchor") {
            Some(anchor) => serde_json::from_value(anchor.clone()).context("invalid anchor")?,
            None => Point::default(),
        };
        return Ok(Inbound::Pointer { pointer, anchor });
    }

    let event: HookEvent = serde_json::from_value(value).context("invalid hook event")?;
    Ok(Inbound::Event(event))
}

/// The session socket server
pub struct EventServer {
    socket_path: PathBuf,
}

impl EventServer {
    /// Server for `socket_path`
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Prepare the socket path (create directory, remove stale socket)
    fn prepare_socket(&self) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create socket directory: {parent:?}"))?;
                info!(path = ?parent, "Created socket directory");
            }
        }

        if self.socket_path.exists() {
            warn!(path = ?self.socket_path, "Removing stale socket file");
            fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove stale socket: {:?}", self.socket_path)
            })?;
        }

        Ok(())
    }

    /// Bind the socket with owner-only permissions
    pub fn bind(&self) -> Result<UnixListener> {
        self.prepare_socket()?;

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to {:?}", self.socket_path))?;

        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.socket_path, perms)?;
        }

        info!(path = ?self.socket_path, "Listening for hook events");
        Ok(listener)
    }

    /// Remove the socket file if it still exists
    pub fn cleanup(&self) {
        if self.socket_path.exists() {
            if let Err(e) = fs::remove_file(&self.socket_path) {
                warn!(error = %e, "Failed to remove socket file");
            }
        }
    }

    /// Accept connections until `stop` turns true
    pub async fn serve(
        listener: UnixListener,
        handle: CompanionHandle,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("Shutdown requested, stopping accept loop");
                        break;
                    }
                }

                accepted = listener.accept() => {
                    let stream = match accepted {
                        Ok((stream, _addr)) => stream,
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let peer_uid = get_peer_uid(&stream);
                    let our_uid = unsafe { libc::getuid() };
                    if let Some(uid) = peer_uid {
                        if uid != our_uid && uid != 0 {
                            warn!(peer_uid = uid, our_uid = our_uid, "Rejecting connection from different user");
                            continue;
                        }
                    }

                    next_id += 1;
                    let conn_id = next_id;
                    debug!(conn_id, peer_uid = ?peer_uid, "Connection accepted");

                    tokio::spawn(
                        handle_connection(stream, handle.clone())
                            .instrument(tracing::debug_span!("connection", conn_id)),
                    );
                }
            }
        }
    }
}

/// Read lines from one forwarder until EOF
async fn handle_connection(stream: UnixStream, handle: CompanionHandle) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        match read_line_limited(&mut reader, &mut buf, MAX_LINE_BYTES).await {
            Ok(LineRead::Line) => {}
            Ok(LineRead::TooLong) => {
                warn!(limit = MAX_LINE_BYTES, "Dropping oversized line");
                continue;
            }
            Ok(LineRead::Eof) => break,
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("Skipping line that is not UTF-8");
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        let sent = match decode_line(line) {
            Ok(Inbound::Event(event)) => {
                debug!(event = %event.event_name, tool = ?event.tool_name, "Received event");
                handle.event(event).await
            }
            Ok(Inbound::Pointer { pointer, anchor }) => handle.pointer(pointer, anchor),
            Err(e) => {
                warn!(error = %e, "Skipping malformed line");
                continue;
            }
        };

        if sent.is_err() {
            debug!("Runtime loop stopped; closing connection");
            break;
        }
    }
}

/// Get peer credentials from Unix socket
#[cfg(target_os = "linux")]
fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
    use std::os::unix::io::AsRawFd;

    let fd = stream.as_raw_fd();
    let mut cred: libc::ucred = unsafe { std::mem::zeroed() };
    #[allow(clippy::cast_possible_truncation)]
    let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

    let result = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            std::ptr::addr_of_mut!(cred).cast::<libc::c_void>(),
            &mut len,
        )
    };

    (result == 0).then_some(cred.uid)
}

#[cfg(not(target_os = "linux"))]
fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
    stream.peer_cred().ok().map(|cred| cred.uid())
}
