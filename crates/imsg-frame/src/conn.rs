use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::BytesMut;
#[cfg(unix)]
use imsg_transport::{IpcStream, TransportError};
use tracing::{debug, trace};

use crate::error::{ImsgError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::message::Message;

/// Configuration for an imsg connection.
#[derive(Debug, Clone, Default)]
pub struct ConnConfig {
    /// Sender process id written into every outgoing header.
    /// `None` uses the id of the current process.
    pub pid: Option<u32>,
    /// Read timeout applied to an [`IpcStream`] by [`Conn::with_config_ipc`].
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to an [`IpcStream`] by [`Conn::with_config_ipc`].
    pub write_timeout: Option<Duration>,
    /// Transmit zero for `flags` and `peer_id` whatever the caller passes.
    /// Matches peers that never carried those fields on the wire.
    pub zero_routing_fields: bool,
}

/// One endpoint of an imsg channel.
///
/// Owns the stream; dropping the connection closes it. Each [`send`](Self::send)
/// and [`recv`](Self::recv) moves exactly one whole frame. After any error the
/// framing position on the stream is unknown and the connection should be
/// discarded.
///
/// There is no internal locking. To send from one thread while receiving on
/// another, give each its own handle via [`Conn::try_clone`].
pub struct Conn<T> {
    inner: T,
    pid: u32,
    config: ConnConfig,
}

impl<T> Conn<T> {
    /// Wrap a connected stream, stamping frames with the current process id.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ConnConfig::default())
    }

    /// Wrap a connected stream with an explicit sender process id.
    pub fn with_pid(inner: T, pid: u32) -> Self {
        Self::with_config(
            inner,
            ConnConfig {
                pid: Some(pid),
                ..ConnConfig::default()
            },
        )
    }

    /// Wrap a connected stream with explicit configuration.
    pub fn with_config(inner: T, config: ConnConfig) -> Self {
        let pid = config.pid.unwrap_or_else(std::process::id);
        Self { inner, pid, config }
    }

    /// Process id written into outgoing headers.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Current connection configuration.
    pub fn config(&self) -> &ConnConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Reading or writing through this reference desynchronizes framing.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the connection and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> Conn<T> {
    /// Send one message (blocking).
    ///
    /// The header and payload go out as a single buffer. A payload larger than
    /// [`MAX_MESSAGE_SIZE`](crate::MAX_MESSAGE_SIZE) fails with
    /// [`ImsgError::SizeExceeded`] before anything is written.
    pub fn send(
        &mut self,
        msg_type: u32,
        flags: u16,
        peer_id: u32,
        payload: &[u8],
    ) -> Result<()> {
        let (flags, peer_id) = if self.config.zero_routing_fields {
            (0, 0)
        } else {
            (flags, peer_id)
        };
        let header = Header::new(msg_type, flags, peer_id, self.pid, payload.len())?;

        let mut frame = BytesMut::with_capacity(usize::from(header.length));
        header.encode(&mut frame);
        frame.extend_from_slice(payload);

        self.write_frame(&frame)?;
        trace!(
            msg_type,
            length = header.length,
            flags,
            peer_id,
            pid = header.pid,
            "sent imsg"
        );
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < frame.len() {
            match self.inner.write(&frame[offset..]) {
                Ok(0) => {
                    return Err(ImsgError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "stream accepted no bytes of the frame",
                    )))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ImsgError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ImsgError::Io(err)),
            }
        }
    }
}

impl<T: Read> Conn<T> {
    /// Receive the next complete message (blocking).
    ///
    /// Returns [`ImsgError::ConnectionClosed`] when the peer closed the stream
    /// between frames, and [`ImsgError::Truncated`] when it closed part way
    /// through one.
    pub fn recv(&mut self) -> Result<Message> {
        let mut raw = [0u8; HEADER_SIZE];
        let got = self.read_full(&mut raw)?;
        if got == 0 {
            debug!("peer closed connection");
            return Err(ImsgError::ConnectionClosed);
        }
        if got < HEADER_SIZE {
            return Err(ImsgError::Truncated {
                expected: HEADER_SIZE,
                received: got,
            });
        }

        let header = Header::decode(&raw)?;
        let payload_len = header.checked_payload_len()?;

        let mut payload = BytesMut::zeroed(payload_len);
        let got = self.read_full(&mut payload)?;
        if got < payload_len {
            return Err(ImsgError::Truncated {
                expected: usize::from(header.length),
                received: HEADER_SIZE + got,
            });
        }

        trace!(
            msg_type = header.msg_type,
            length = header.length,
            flags = header.flags,
            peer_id = header.peer_id,
            pid = header.pid,
            "received imsg"
        );
        Ok(Message::new(header, payload.freeze()))
    }

    /// Fill `buf` from the stream, stopping early only at end-of-file.
    /// Returns the number of bytes read.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ImsgError::Io(err)),
            }
        }
        Ok(filled)
    }
}

#[cfg(unix)]
impl Conn<IpcStream> {
    /// Wrap an [`IpcStream`] and apply the configured read/write timeouts to it.
    pub fn with_config_ipc(inner: IpcStream, config: ConnConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_imsg_error)?;
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_imsg_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Open a second handle on the same socket with the same sender identity.
    ///
    /// One handle may send while the other receives. Two concurrent senders
    /// (or receivers) still interleave bytes and must be serialized by the caller.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = self.inner.try_clone().map_err(transport_to_imsg_error)?;
        Ok(Self {
            inner,
            pid: self.pid,
            config: self.config.clone(),
        })
    }

    /// Kernel-reported `(uid, gid, pid)` of the connected peer, where available.
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        self.inner.peer_credentials()
    }
}

#[cfg(unix)]
fn transport_to_imsg_error(err: TransportError) -> ImsgError {
    match err {
        TransportError::Io(io) | TransportError::Accept(io) => ImsgError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            ImsgError::Io(source)
        }
        other => ImsgError::Io(std::io::Error::other(other.to_string())),
    }
}
