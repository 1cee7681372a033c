//! MSB-first bit writer emitting little-endian 16-bit words.

/// Bit writer matching [`BitReader`](crate::bits::BitReader).
#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    count: u32,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        for i in (0..n).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.count += 1;
            if self.count == 16 {
                self.out.extend_from_slice(&(self.acc as u16).to_le_bytes());
                self.acc = 0;
                self.count = 0;
            }
        }
    }

    /// Pad the current word with zeros.
    pub fn align(&mut self) {
        if self.count > 0 {
            self.write_bits(0, 16 - self.count);
        }
    }

    /// Padding that precedes an uncompressed block body.
    ///
    /// The decoder always discards at least one bit's worth of the current
    /// word, so an already aligned writer emits a whole padding word.
    pub fn align_for_raw(&mut self) {
        if self.count == 0 {
            self.write_bits(0, 16);
        } else {
            self.align();
        }
    }

    /// Append raw bytes. The writer must be aligned.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        assert_eq!(self.count, 0, "raw bytes require an aligned writer");
        self.out.extend_from_slice(bytes);
    }

    /// True when no partial word is pending.
    pub fn is_aligned(&self) -> bool {
        self.count == 0
    }

    /// Take the bytes written so far, leaving any partial word in place.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;

    #[test]
    fn test_writer_matches_reader() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(0x1234, 16);
        w.write_bits(0x1FFFF, 17);
        w.align();
        let data = w.take();
        assert_eq!(data.len() % 2, 0);

        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(16).unwrap(), 0x1234);
        assert_eq!(r.read_bits_wide(17).unwrap(), 0x1FFFF);
    }

    #[test]
    fn test_raw_after_alignment() {
        let mut w = BitWriter::new();
        w.write_bits(0b11, 2);
        w.align_for_raw();
        w.write_raw(&[9, 8, 7]);
        let data = w.take();

        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(2).unwrap(), 0b11);
        r.align_to_bytes().unwrap();
        let mut raw = [0u8; 3];
        r.read_raw(&mut raw).unwrap();
        assert_eq!(raw, [9, 8, 7]);
    }
}
