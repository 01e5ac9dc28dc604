//! Protocol constants.
//!
//! Field widths and fixed message lengths of the BitTorrent peer wire
//! protocol (BEP-3). All lengths here count the ID byte but never the
//! 4-byte length prefix, which belongs to the transport.

// ============================================================================
// Field widths
// ============================================================================

/// Width of the message ID byte
pub const ID_LEN: usize = 1;

/// Width of every integer field (big-endian, two's complement)
pub const INT_LEN: usize = 4;

/// PIECE payload header: piece index + block begin
pub const BLOCK_HEADER_LEN: usize = 2 * INT_LEN;

// ============================================================================
// Field offsets (relative to the ID byte)
// ============================================================================

/// Piece index offset in HAVE, REQUEST, PIECE and CANCEL
pub const PIECE_INDEX_OFFSET: usize = ID_LEN;

/// Block begin offset in REQUEST, PIECE and CANCEL
pub const BLOCK_BEGIN_OFFSET: usize = ID_LEN + INT_LEN;

/// Block length offset in REQUEST and CANCEL
pub const BLOCK_LENGTH_OFFSET: usize = ID_LEN + 2 * INT_LEN;

// ============================================================================
// Message lengths
// ============================================================================

/// CHOKE, UNCHOKE, INTERESTED and NOT-INTERESTED carry no payload
pub const SIGNAL_LEN: usize = ID_LEN;

/// HAVE: ID + piece index
pub const HAVE_LEN: usize = ID_LEN + INT_LEN;

/// REQUEST and CANCEL: ID + index + begin + length
pub const BLOCK_REGION_LEN: usize = ID_LEN + 3 * INT_LEN;

/// PIECE messages must be strictly longer than this
pub const PIECE_MIN_EXCLUSIVE_LEN: usize = BLOCK_HEADER_LEN;

// ============================================================================
// Blocks
// ============================================================================

/// Conventional block size requested by most clients (16 KiB)
pub const BLOCK_SIZE: i32 = 16384;

// ============================================================================
// Type names
// ============================================================================

/// Type name reported for zero-length messages
pub const KEEP_ALIVE_NAME: &str = "KEEP-ALIVE";

/// Type name reported for unknown message IDs
pub const INVALID_NAME: &str = "INVALID";
