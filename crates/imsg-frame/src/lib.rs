//! imsg message framing over an already-connected duplex byte stream.
//!
//! Every message is a 16-byte little-endian header followed by an opaque
//! payload:
//! - `type` (u32): caller-defined message kind
//! - `length` (u16): total frame length, header included
//! - `flags` (u16): caller-defined bits
//! - `peer_id` (u32): caller-defined routing identifier
//! - `pid` (u32): process id of the sender
//!
//! [`Conn`] owns the stream and performs whole-frame sends and receives;
//! callers never see a partial header or payload.

pub mod conn;
pub mod error;
pub mod header;
pub mod message;

pub use conn::{Conn, ConnConfig};
pub use error::{ImsgError, Result};
pub use header::{Header, HEADER_SIZE, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE};
pub use message::Message;
