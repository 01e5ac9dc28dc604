//! peerwire - BitTorrent peer wire message codec
//!
//! Encodes, decodes and validates the messages two BitTorrent peers
//! exchange once the handshake is done (BEP-3). The codec works on the
//! `<ID><payload>` region only; the 4-byte length prefix is left to the
//! transport.
//!
//! # Modules
//!
//! - [`peer`] - Message construction, inspection, validation and bitfields
//! - [`constants`] - Field widths and fixed message lengths

pub mod constants;
pub mod peer;

pub use peer::{
    Bitfield, BlockFill, BlockRegion, Message, MessageId, Packet, PeerError, PendingMessage,
};
