//! Format constants and the position slot tables.

/// Shortest match.
pub const MIN_MATCH: usize = 2;

/// Longest match.
pub const MAX_MATCH: usize = 257;

/// Literal symbols at the bottom of the main tree.
pub const NUM_CHARS: usize = 256;

/// Length headers encodable directly in a main-tree symbol.
pub const NUM_PRIMARY_LENGTHS: usize = 7;

/// Symbols in the length tree that carry data.
pub const NUM_SECONDARY_LENGTHS: usize = 249;

/// Pre-tree symbols and lookup bits.
pub const PRETREE_MAXSYMBOLS: usize = 20;
pub const PRETREE_TABLEBITS: u8 = 6;

/// Main tree symbols (for the largest window) and lookup bits.
pub const MAINTREE_MAXSYMBOLS: usize = NUM_CHARS + 50 * 8;
pub const MAINTREE_TABLEBITS: u8 = 12;

/// Length tree symbols and lookup bits.
pub const LENGTH_MAXSYMBOLS: usize = NUM_SECONDARY_LENGTHS + 1;
pub const LENGTH_TABLEBITS: u8 = 12;

/// Aligned-offset tree symbols and lookup bits.
pub const ALIGNED_MAXSYMBOLS: usize = 8;
pub const ALIGNED_TABLEBITS: u8 = 7;

/// Slack after each length array that run codes may spill into.
pub const LENTABLE_SAFETY: usize = 64;

/// Byte every window position holds before anything is decoded.
pub const WINDOW_FILL: u8 = 0xDC;

/// Decompressed size of every frame but the last.
pub const FRAME_SIZE: usize = 0x8000;

/// Frames after which call translation stops.
pub const TRANSLATION_FRAME_LIMIT: u32 = 32768;

/// Extra offset bits per position slot.
pub const EXTRA_BITS: [u8; 52] = {
    let mut bits = [0u8; 52];
    let mut i = 0;
    let mut j = 0;
    while i <= 50 {
        bits[i] = j;
        bits[i + 1] = j;
        if i != 0 && j < 17 {
            j += 1;
        }
        i += 2;
    }
    bits
};

/// Smallest formatted offset per position slot.
pub const POSITION_BASE: [u32; 51] = {
    let mut base = [0u32; 51];
    let mut i = 0;
    let mut j = 0u32;
    while i <= 50 {
        base[i] = j;
        j += 1 << EXTRA_BITS[i];
        i += 1;
    }
    base
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_bits_prefix() {
        assert_eq!(&EXTRA_BITS[..12], &[0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
        assert_eq!(EXTRA_BITS[36], 17);
        assert_eq!(EXTRA_BITS[50], 17);
    }

    #[test]
    fn test_position_base_prefix() {
        assert_eq!(&POSITION_BASE[..10], &[0, 1, 2, 3, 4, 6, 8, 12, 16, 24]);
        // Slot 3 always means an offset of one.
        assert_eq!(POSITION_BASE[3] - 2, 1);
    }

    #[test]
    fn test_largest_window_is_covered() {
        let last = POSITION_BASE[49] + (1 << EXTRA_BITS[49]) - 1;
        assert!(last as usize >= (1 << 21) - 3 + 2);
        assert_eq!(MAINTREE_MAXSYMBOLS, 656);
    }
}
