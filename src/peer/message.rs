use std::fmt;
use std::time::Instant;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use super::bitfield::Bitfield;
use super::error::PeerError;
use super::fill::BlockFill;
use super::piece::{wire_length, BlockRegion};
use crate::constants::{
    BLOCK_BEGIN_OFFSET, BLOCK_HEADER_LEN, BLOCK_LENGTH_OFFSET, BLOCK_REGION_LEN, HAVE_LEN,
    ID_LEN, INT_LEN, INVALID_NAME, KEEP_ALIVE_NAME, PIECE_INDEX_OFFSET, PIECE_MIN_EXCLUSIVE_LEN,
    SIGNAL_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
}

impl MessageId {
    /// Wire name of the message kind.
    pub fn name(self) -> &'static str {
        match self {
            MessageId::Choke => "CHOKE",
            MessageId::Unchoke => "UNCHOKE",
            MessageId::Interested => "INTERESTED",
            MessageId::NotInterested => "NOT-INTERESTED",
            MessageId::Have => "HAVE",
            MessageId::Bitfield => "BITFIELD",
            MessageId::Request => "REQUEST",
            MessageId::Piece => "PIECE",
            MessageId::Cancel => "CANCEL",
        }
    }
}

impl TryFrom<u8> for MessageId {
    type Error = PeerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            _ => Err(PeerError::InvalidMessageId(value)),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A peer wire message: the `<ID><payload>` region between length prefixes.
///
/// The bytes are never modified once a `Message` exists. Cloning is cheap
/// and shares the buffer. A zero-length message is a keep-alive.
///
/// Wrapping received bytes does not validate them. Check [`is_valid`]
/// (or use [`decode`]) before calling the field accessors, which panic
/// when asked for a field the message kind does not carry.
///
/// [`is_valid`]: Message::is_valid
/// [`decode`]: Message::decode
#[derive(Clone)]
pub struct Message {
    data: Bytes,
    timestamp: Option<Instant>,
}

impl Message {
    /// Wraps a received `<ID><payload>` region without copying or validating.
    pub fn wrap(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            timestamp: None,
        }
    }

    pub fn new_keep_alive() -> Self {
        Self::wrap(Bytes::new())
    }

    pub fn new_choke() -> Self {
        Self::signal(MessageId::Choke)
    }

    pub fn new_unchoke() -> Self {
        Self::signal(MessageId::Unchoke)
    }

    pub fn new_interested() -> Self {
        Self::signal(MessageId::Interested)
    }

    pub fn new_not_interested() -> Self {
        Self::signal(MessageId::NotInterested)
    }

    pub fn new_have(index: i32) -> Self {
        let mut buf = BytesMut::with_capacity(HAVE_LEN);
        buf.put_u8(MessageId::Have as u8);
        buf.put_i32(index);
        Self::wrap(buf.freeze())
    }

    pub fn new_request(index: i32, begin: i32, length: i32) -> Self {
        Self::region(MessageId::Request, index, begin, length)
    }

    pub fn new_cancel(index: i32, begin: i32, length: i32) -> Self {
        Self::region(MessageId::Cancel, index, begin, length)
    }

    /// Allocates a PIECE message whose block bytes are still to be written.
    ///
    /// The header is written immediately and the block region is zeroed.
    /// Write the block through [`BlockFill::block_mut`], possibly on another
    /// thread, then [`BlockFill::finish`] it to obtain the `Message` and
    /// publish it to every [`PendingMessage`](super::PendingMessage) handed out.
    ///
    /// # Panics
    ///
    /// Panics if `length` is negative.
    pub fn new_block(index: i32, begin: i32, length: i32) -> BlockFill {
        assert!(length >= 0, "negative block length: {length}");
        BlockFill::new(index, begin, length as usize)
    }

    /// Builds a PIECE message carrying a copy of `block`.
    pub fn new_piece(index: i32, begin: i32, block: &[u8]) -> Self {
        let mut fill = BlockFill::new(index, begin, block.len());
        fill.block_mut().copy_from_slice(block);
        fill.finish()
    }

    /// Packs the first `piece_count` flags of `pieces` into a BITFIELD message.
    ///
    /// Flags go MSB-first into `ceil(piece_count / 8)` bytes. Spare bits in
    /// the last byte are zero, and so are positions beyond `pieces.len()`.
    pub fn new_bitfield(pieces: &Bitfield, piece_count: usize) -> Self {
        let byte_len = piece_count.div_ceil(8);
        let mut buf = BytesMut::with_capacity(ID_LEN + byte_len);
        buf.put_u8(MessageId::Bitfield as u8);
        buf.put_bytes(0, byte_len);

        for index in (0..piece_count).filter(|&i| pieces.has(i)) {
            buf[ID_LEN + index / 8] |= 0x80 >> (index % 8);
        }
        Self::wrap(buf.freeze())
    }

    fn signal(id: MessageId) -> Self {
        Self::wrap(Bytes::copy_from_slice(&[id as u8]))
    }

    fn region(id: MessageId, index: i32, begin: i32, length: i32) -> Self {
        let mut buf = BytesMut::with_capacity(BLOCK_REGION_LEN);
        buf.put_u8(id as u8);
        buf.put_i32(index);
        buf.put_i32(begin);
        buf.put_i32(length);
        Self::wrap(buf.freeze())
    }

    /// The ID byte, or `None` for a keep-alive.
    pub fn id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// The message kind, or `None` for a keep-alive or an unknown ID.
    pub fn kind(&self) -> Option<MessageId> {
        self.id().and_then(|id| MessageId::try_from(id).ok())
    }

    /// Total length, ID byte included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn payload_len(&self) -> usize {
        self.len().saturating_sub(ID_LEN)
    }

    /// The whole `<ID><payload>` region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The bytes after the ID.
    pub fn payload(&self) -> &[u8] {
        self.data.get(ID_LEN..).unwrap_or_default()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// When the message was produced, if recorded.
    pub fn timestamp(&self) -> Option<Instant> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, at: Instant) {
        self.timestamp = Some(at);
    }

    /// Human-readable type: the kind name, `KEEP-ALIVE` or `INVALID`.
    pub fn type_name(&self) -> &'static str {
        match self.id() {
            None => KEEP_ALIVE_NAME,
            Some(id) => MessageId::try_from(id)
                .map(MessageId::name)
                .unwrap_or(INVALID_NAME),
        }
    }

    pub fn is_keep_alive(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_have(&self) -> bool {
        self.kind() == Some(MessageId::Have)
    }

    pub fn is_bitfield(&self) -> bool {
        self.kind() == Some(MessageId::Bitfield)
    }

    pub fn is_request(&self) -> bool {
        self.kind() == Some(MessageId::Request)
    }

    pub fn is_piece(&self) -> bool {
        self.kind() == Some(MessageId::Piece)
    }

    pub fn is_cancel(&self) -> bool {
        self.kind() == Some(MessageId::Cancel)
    }

    /// Checks the length rule of the message kind.
    ///
    /// Only lengths are checked. A BITFIELD must still be matched against
    /// the piece count with [`is_valid_bitfield`](Message::is_valid_bitfield),
    /// and a PIECE against the outstanding request.
    pub fn is_valid(&self) -> bool {
        let Some(id) = self.id() else {
            return true;
        };
        let len = self.len();
        match MessageId::try_from(id) {
            Ok(
                MessageId::Choke
                | MessageId::Unchoke
                | MessageId::Interested
                | MessageId::NotInterested,
            ) => len == SIGNAL_LEN,
            Ok(MessageId::Have) => len == HAVE_LEN,
            Ok(MessageId::Bitfield) => len >= ID_LEN,
            Ok(MessageId::Request | MessageId::Cancel) => len == BLOCK_REGION_LEN,
            Ok(MessageId::Piece) => len > PIECE_MIN_EXCLUSIVE_LEN,
            Err(_) => false,
        }
    }

    /// True if this is a BITFIELD sized for exactly `piece_count` pieces.
    ///
    /// Spare bits are not checked.
    pub fn is_valid_bitfield(&self, piece_count: usize) -> bool {
        self.is_bitfield() && self.payload_len() == piece_count.div_ceil(8)
    }

    /// # Panics
    ///
    /// Panics unless this is a HAVE, REQUEST, PIECE or CANCEL long enough
    /// to hold the field.
    pub fn piece_index(&self) -> i32 {
        match self.kind() {
            Some(MessageId::Have | MessageId::Request | MessageId::Piece | MessageId::Cancel) => {
                self.read_i32(PIECE_INDEX_OFFSET)
            }
            _ => self.contract_violation("piece index"),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is a REQUEST, PIECE or CANCEL long enough to hold
    /// the field.
    pub fn block_begin(&self) -> i32 {
        match self.kind() {
            Some(MessageId::Request | MessageId::Piece | MessageId::Cancel) => {
                self.read_i32(BLOCK_BEGIN_OFFSET)
            }
            _ => self.contract_violation("block begin"),
        }
    }

    /// Explicit length field of a REQUEST or CANCEL, or the size of the
    /// block carried by a PIECE.
    ///
    /// # Panics
    ///
    /// Panics on any other kind, or if the message is too short.
    pub fn block_length(&self) -> i32 {
        match self.kind() {
            Some(MessageId::Request | MessageId::Cancel) => self.read_i32(BLOCK_LENGTH_OFFSET),
            Some(MessageId::Piece) => wire_length(self.block().len()),
            _ => self.contract_violation("block length"),
        }
    }

    /// The block bytes of a PIECE.
    ///
    /// # Panics
    ///
    /// Panics unless this is a PIECE holding a complete header.
    pub fn block(&self) -> &[u8] {
        if !self.is_piece() {
            self.contract_violation("block");
        }
        match self.payload().get(BLOCK_HEADER_LEN..) {
            Some(block) => block,
            None => panic!("PIECE message too short: {} bytes", self.len()),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is a REQUEST, PIECE or CANCEL.
    pub fn block_region(&self) -> BlockRegion {
        BlockRegion::new(self.piece_index(), self.block_begin(), self.block_length())
    }

    /// True if both messages name the same piece index, begin and length.
    ///
    /// Matches an incoming PIECE or CANCEL against an outstanding REQUEST.
    ///
    /// # Panics
    ///
    /// Panics if either message is not a REQUEST, PIECE or CANCEL.
    pub fn same_block_region(&self, other: &Message) -> bool {
        self.block_region() == other.block_region()
    }

    /// Unpacks a BITFIELD into one flag per payload bit.
    ///
    /// The result covers `payload_len * 8` positions, padding included.
    /// Use [`Bitfield::truncate`] or [`decode_bitfield`](Message::decode_bitfield)
    /// to restrict it to the real piece count.
    ///
    /// # Panics
    ///
    /// Panics if this is not a BITFIELD.
    pub fn to_bitfield(&self) -> Bitfield {
        if !self.is_bitfield() {
            self.contract_violation("bitfield");
        }
        let payload = self.payload();
        Bitfield::from_bytes(payload, payload.len() * 8)
    }

    /// Validates a BITFIELD against the expected piece count and unpacks it.
    pub fn decode_bitfield(&self, piece_count: usize) -> Result<Bitfield, PeerError> {
        if !self.is_bitfield() {
            return Err(PeerError::NotBitfield(self.type_name()));
        }
        let expected = piece_count.div_ceil(8);
        if self.payload_len() != expected {
            trace!(
                piece_count,
                length = self.payload_len(),
                "rejecting bitfield of the wrong size"
            );
            return Err(PeerError::BitfieldLength {
                expected,
                actual: self.payload_len(),
            });
        }
        Ok(Bitfield::from_bytes(self.payload(), piece_count))
    }

    /// Validates the message and extracts its typed fields.
    pub fn decode(&self) -> Result<Packet, PeerError> {
        let Some(id) = self.id() else {
            return Ok(Packet::KeepAlive);
        };
        let kind = match MessageId::try_from(id) {
            Ok(kind) => kind,
            Err(e) => {
                trace!(id, length = self.len(), "rejecting unknown message");
                return Err(e);
            }
        };
        if !self.is_valid() {
            trace!(%kind, length = self.len(), "rejecting malformed message");
            return Err(PeerError::InvalidLength {
                kind,
                length: self.len(),
            });
        }

        let packet = match kind {
            MessageId::Choke => Packet::Choke,
            MessageId::Unchoke => Packet::Unchoke,
            MessageId::Interested => Packet::Interested,
            MessageId::NotInterested => Packet::NotInterested,
            MessageId::Have => Packet::Have {
                piece: self.piece_index(),
            },
            MessageId::Bitfield => Packet::Bitfield(self.data.slice(ID_LEN..)),
            MessageId::Request => Packet::Request(self.block_region()),
            MessageId::Piece => Packet::Piece {
                index: self.piece_index(),
                begin: self.block_begin(),
                data: self.data.slice(ID_LEN + BLOCK_HEADER_LEN..),
            },
            MessageId::Cancel => Packet::Cancel(self.block_region()),
        };
        Ok(packet)
    }

    fn read_i32(&self, offset: usize) -> i32 {
        match self.data.get(offset..offset + INT_LEN) {
            Some(mut field) => field.get_i32(),
            None => panic!(
                "{} message too short for field at offset {}: {} bytes",
                self.type_name(),
                offset,
                self.len()
            ),
        }
    }

    fn contract_violation(&self, field: &str) -> ! {
        panic!("{} message has no {}", self.type_name(), field)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Message {}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(MessageId::Have) if self.is_valid() => {
                write!(f, "HAVE {}", self.piece_index())
            }
            Some(MessageId::Request | MessageId::Piece | MessageId::Cancel) if self.is_valid() => {
                write!(f, "{} {}", self.type_name(), self.block_region())
            }
            _ => f.write_str(self.type_name()),
        }
    }
}

/// A validated message with its fields extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have { piece: i32 },
    Bitfield(Bytes),
    Request(BlockRegion),
    Piece { index: i32, begin: i32, data: Bytes },
    Cancel(BlockRegion),
}

impl Packet {
    /// The kind identifier, `None` for a keep-alive.
    pub fn id(&self) -> Option<MessageId> {
        match self {
            Packet::KeepAlive => None,
            Packet::Choke => Some(MessageId::Choke),
            Packet::Unchoke => Some(MessageId::Unchoke),
            Packet::Interested => Some(MessageId::Interested),
            Packet::NotInterested => Some(MessageId::NotInterested),
            Packet::Have { .. } => Some(MessageId::Have),
            Packet::Bitfield(_) => Some(MessageId::Bitfield),
            Packet::Request(_) => Some(MessageId::Request),
            Packet::Piece { .. } => Some(MessageId::Piece),
            Packet::Cancel(_) => Some(MessageId::Cancel),
        }
    }

    /// The block named by a REQUEST, PIECE or CANCEL.
    pub fn region(&self) -> Option<BlockRegion> {
        match self {
            Packet::Request(region) | Packet::Cancel(region) => Some(*region),
            Packet::Piece { index, begin, data } => {
                Some(BlockRegion::new(*index, *begin, wire_length(data.len())))
            }
            _ => None,
        }
    }

    pub fn encode(&self) -> Message {
        match self {
            Packet::KeepAlive => Message::new_keep_alive(),
            Packet::Choke => Message::new_choke(),
            Packet::Unchoke => Message::new_unchoke(),
            Packet::Interested => Message::new_interested(),
            Packet::NotInterested => Message::new_not_interested(),
            Packet::Have { piece } => Message::new_have(*piece),
            Packet::Bitfield(bits) => {
                let mut buf = BytesMut::with_capacity(ID_LEN + bits.len());
                buf.put_u8(MessageId::Bitfield as u8);
                buf.put_slice(bits);
                Message::wrap(buf.freeze())
            }
            Packet::Request(r) => Message::new_request(r.index, r.begin, r.length),
            Packet::Piece { index, begin, data } => Message::new_piece(*index, *begin, data),
            Packet::Cancel(r) => Message::new_cancel(r.index, r.begin, r.length),
        }
    }
}
