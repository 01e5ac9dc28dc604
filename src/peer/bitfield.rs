/// A set of pieces, one flag per piece.
///
/// Bits are numbered from the high bit of the first byte, the same order
/// the BITFIELD message uses on the wire. Spare bits in the last byte are
/// always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
    piece_count: usize,
}

impl Bitfield {
    /// Creates an empty set for the given number of pieces.
    pub fn new(piece_count: usize) -> Self {
        Self {
            bits: vec![0; piece_count.div_ceil(8)],
            piece_count,
        }
    }

    /// Creates a set from packed bytes.
    ///
    /// Missing bytes read as unset, extra bytes are dropped and spare bits
    /// are cleared.
    pub fn from_bytes(bytes: &[u8], piece_count: usize) -> Self {
        let mut bits = bytes.to_vec();
        bits.resize(piece_count.div_ceil(8), 0);

        let mut bf = Self { bits, piece_count };
        bf.clear_spare_bits();
        bf
    }

    /// Creates a set with every piece present.
    pub fn full(piece_count: usize) -> Self {
        let mut bf = Self {
            bits: vec![0xFF; piece_count.div_ceil(8)],
            piece_count,
        };
        bf.clear_spare_bits();
        bf
    }

    /// Creates a set holding the given piece indices.
    ///
    /// Indices at or beyond `piece_count` are ignored.
    pub fn from_indices<I>(piece_count: usize, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bf = Self::new(piece_count);
        for index in indices {
            bf.set(index);
        }
        bf
    }

    /// Returns true if the piece at the given index is present.
    pub fn has(&self, index: usize) -> bool {
        if index >= self.piece_count {
            return false;
        }
        (self.bits[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Marks the piece at the given index as present.
    pub fn set(&mut self, index: usize) {
        if index >= self.piece_count {
            return;
        }
        self.bits[index / 8] |= 0x80 >> (index % 8);
    }

    /// Shortens the set to `piece_count` pieces.
    ///
    /// Unpacked bitfields cover whole bytes; this drops the padding
    /// positions once the real piece count is known. Has no effect when
    /// `piece_count` is not smaller than the current count.
    pub fn truncate(&mut self, piece_count: usize) {
        if piece_count >= self.piece_count {
            return;
        }
        self.bits.truncate(piece_count.div_ceil(8));
        self.piece_count = piece_count;
        self.clear_spare_bits();
    }

    /// Returns the number of pieces present.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Returns true if all pieces are present.
    pub fn is_complete(&self) -> bool {
        self.count() == self.piece_count
    }

    /// Returns true if no pieces are present.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Returns the total number of pieces.
    pub fn len(&self) -> usize {
        self.piece_count
    }

    /// Returns the packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Iterates over every flag in piece order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.piece_count).map(move |i| self.has(i))
    }

    /// Returns indices of all present pieces.
    pub fn available_pieces(&self) -> Vec<usize> {
        (0..self.piece_count).filter(|&i| self.has(i)).collect()
    }

    /// Returns indices of pieces present here but not in `ours`.
    pub fn missing_pieces(&self, ours: &Bitfield) -> Vec<usize> {
        (0..self.piece_count)
            .filter(|&i| self.has(i) && !ours.has(i))
            .collect()
    }

    fn clear_spare_bits(&mut self) {
        let spare = self.bits.len() * 8 - self.piece_count;
        if spare > 0 && spare < 8 {
            let last = self.bits.len() - 1;
            self.bits[last] &= 0xFFu8 << spare;
        }
    }
}

impl FromIterator<bool> for Bitfield {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let flags: Vec<bool> = iter.into_iter().collect();
        let mut bf = Self::new(flags.len());
        for (index, flag) in flags.into_iter().enumerate() {
            if flag {
                bf.set(index);
            }
        }
        bf
    }
}
