use std::fmt;

/// The part of a piece named by REQUEST, PIECE and CANCEL messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRegion {
    pub index: i32,
    pub begin: i32,
    pub length: i32,
}

impl BlockRegion {
    pub fn new(index: i32, begin: i32, length: i32) -> Self {
        Self {
            index,
            begin,
            length,
        }
    }
}

impl fmt::Display for BlockRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.index, self.begin, self.length)
    }
}

/// Converts an in-memory block size to its wire length field.
///
/// # Panics
///
/// Panics if `len` does not fit the signed 32-bit field.
pub(crate) fn wire_length(len: usize) -> i32 {
    i32::try_from(len).expect("block longer than i32::MAX")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_length() {
        assert_eq!(wire_length(0), 0);
        assert_eq!(wire_length(16384), 16384);
        assert_eq!(wire_length(i32::MAX as usize), i32::MAX);
    }

    #[test]
    #[should_panic(expected = "block longer than i32::MAX")]
    fn test_wire_length_overflow_panics() {
        wire_length(i32::MAX as usize + 1);
    }
}
