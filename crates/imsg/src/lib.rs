//! Typed, length-framed messages between cooperating processes.
//!
//! imsg carries short control messages between a coordinating process and
//! its workers over a connected local socket. Each message is a fixed
//! 16-byte header (type, length, flags, peer id, sender pid) plus an opaque
//! payload of at most 16 KiB.
//!
//! # Crate Structure
//!
//! - [`transport`] — Unix domain socket streams (socket pairs, listeners)
//! - [`frame`] — Header codec and the [`Conn`] send/receive wrapper
//!
//! ```no_run
//! use imsg::{pair, Conn};
//!
//! let (parent, child) = pair()?;
//! let mut parent = Conn::new(parent);
//! let mut child = Conn::new(child);
//!
//! parent.send(1, 0, 0, b"hello")?;
//! let msg = child.recv()?;
//! assert_eq!(msg.msg_type(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use imsg_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use imsg_frame::*;
}

pub use imsg_frame::{
    Conn, ConnConfig, Header, ImsgError, Message, HEADER_SIZE, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE,
};
#[cfg(unix)]
pub use imsg_transport::{pair, IpcStream, UnixDomainSocket};
