use thiserror::Error;

use super::message::MessageId;

/// Errors reported when a received message breaks the wire layout.
///
/// These describe a misbehaving remote peer and are always recoverable.
/// Local misuse of the codec (asking a HAVE for its block begin) panics
/// instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Received an unknown message ID.
    #[error("invalid message id: {0}")]
    InvalidMessageId(u8),

    /// A known message kind with a length its layout does not allow.
    #[error("invalid {kind} message length: {length}")]
    InvalidLength { kind: MessageId, length: usize },

    /// The bitfield does not cover the expected number of pieces.
    #[error("bitfield length mismatch: expected {expected} bytes, got {actual}")]
    BitfieldLength { expected: usize, actual: usize },

    /// A bitfield was expected but another message arrived.
    #[error("expected bitfield, got {0}")]
    NotBitfield(&'static str),
}
