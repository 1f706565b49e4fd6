//! Local stream transport for imsg connections.
//!
//! The imsg protocol runs over an already-connected duplex byte stream. This
//! crate provides one concrete kind of such stream, a Unix domain socket,
//! either created as a connected [`pair`] (the usual privilege-separation
//! setup, one end per process) or through a filesystem-path listener.
//!
//! Everything here is transport setup; the framing itself lives in
//! `imsg-frame` and accepts any `Read + Write` stream.

pub mod error;
#[cfg(unix)]
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
#[cfg(unix)]
pub use stream::IpcStream;

#[cfg(unix)]
pub use uds::{pair, UnixDomainSocket};
