//! Peer wire message codec (BEP-3)
//!
//! This module turns `<ID><payload>` regions into typed messages and back,
//! validates message lengths, and packs piece sets into BITFIELD payloads.
//! Length-prefix framing and connection state belong to the transport.

mod bitfield;
mod error;
mod fill;
mod message;
mod piece;

pub use bitfield::Bitfield;
pub use error::PeerError;
pub use fill::{BlockFill, PendingMessage};
pub use message::{Message, MessageId, Packet};
pub use piece::BlockRegion;
