//! Recently used match offsets.

/// The three repeat offsets R0, R1 and R2.
///
/// New offsets enter at R0 and push the others down. Reusing R1 swaps it with
/// R0; reusing R2 swaps it with R0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOffsets {
    offsets: [u32; 3],
}

impl RepeatOffsets {
    /// Initial state: all three offsets are 1.
    pub fn new() -> Self {
        Self { offsets: [1, 1, 1] }
    }

    /// Current `[R0, R1, R2]`.
    #[inline]
    pub fn get(&self) -> [u32; 3] {
        self.offsets
    }

    /// Replace all three, as an uncompressed block header does.
    pub fn set(&mut self, offsets: [u32; 3]) {
        self.offsets = offsets;
    }

    /// Record a freshly coded offset.
    #[inline]
    pub fn push(&mut self, offset: u32) {
        self.offsets = [offset, self.offsets[0], self.offsets[1]];
    }

    /// Reuse the offset in `slot` (0, 1 or 2), moving it to R0.
    #[inline]
    pub fn take(&mut self, slot: usize) -> u32 {
        debug_assert!(slot < 3);
        self.offsets.swap(0, slot);
        self.offsets[0]
    }

    /// Slot holding `offset`, if any.
    pub fn find(&self, offset: u32) -> Option<usize> {
        self.offsets.iter().position(|&o| o == offset)
    }
}

impl Default for RepeatOffsets {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_shifts() {
        let mut r = RepeatOffsets::new();
        r.push(10);
        r.push(20);
        r.push(30);
        assert_eq!(r.get(), [30, 20, 10]);
        r.push(40);
        assert_eq!(r.get(), [40, 30, 20]);
    }

    #[test]
    fn test_take_reorders() {
        let mut r = RepeatOffsets::new();
        r.set([3, 2, 1]);
        assert_eq!(r.take(0), 3);
        assert_eq!(r.get(), [3, 2, 1]);
        assert_eq!(r.take(1), 2);
        assert_eq!(r.get(), [2, 3, 1]);
        assert_eq!(r.take(2), 1);
        assert_eq!(r.get(), [1, 3, 2]);
    }

    #[test]
    fn test_find() {
        let mut r = RepeatOffsets::new();
        r.set([5, 6, 7]);
        assert_eq!(r.find(7), Some(2));
        assert_eq!(r.find(8), None);
    }
}
