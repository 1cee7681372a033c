//! Circular sliding window.
//!
//! All position arithmetic lives here. Writes never wrap: a run that would
//! cross the end of the buffer is rejected, and the cursor is folded back to
//! zero only between runs. Match sources do wrap.

use vassago_core::{Error, Result, WindowBits};

use crate::tables::WINDOW_FILL;

/// Fixed-capacity history buffer with a write cursor.
pub struct Window {
    buf: Vec<u8>,
    pos: usize,
    mask: usize,
}

impl Window {
    /// Create a window pre-filled with the format's fill byte.
    pub fn new(bits: WindowBits) -> Self {
        Self {
            buf: vec![WINDOW_FILL; bits.size()],
            pos: 0,
            mask: bits.size() - 1,
        }
    }

    /// Window size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Write cursor. Equals `size()` right after the last byte is filled.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Fold the cursor back into range before starting a run.
    #[inline]
    pub fn wrap(&mut self) {
        self.pos &= self.mask;
    }

    /// Check that `len` bytes fit between the cursor and the end of the buffer.
    #[inline]
    pub fn check_room(&self, len: usize) -> Result<()> {
        if self.pos + len > self.buf.len() {
            return Err(Error::WindowOverrun {
                position: self.pos,
                length: len,
                window_size: self.buf.len(),
            });
        }
        Ok(())
    }

    /// Append one literal byte.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.check_room(1)?;
        self.buf[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }

    /// Copy `len` bytes from `offset` bytes back.
    ///
    /// The source may precede the start of the buffer, in which case it wraps
    /// around to the end, and may overlap the destination.
    pub fn copy_match(&mut self, offset: usize, len: usize) -> Result<()> {
        if offset == 0 || offset > self.buf.len() {
            return Err(Error::corrupted_at(
                format!("match offset {offset} outside window"),
                self.pos as u64,
            ));
        }
        self.check_room(len)?;

        let dest = self.pos;
        let mut src = if dest >= offset {
            dest - offset
        } else {
            dest + self.buf.len() - offset
        };

        if src + len <= dest {
            self.buf.copy_within(src..src + len, dest);
        } else {
            for i in 0..len {
                self.buf[dest + i] = self.buf[src];
                src = (src + 1) & self.mask;
            }
        }
        self.pos += len;
        Ok(())
    }

    /// Buffer for `len` raw bytes at the cursor; advances the cursor.
    pub fn reserve_raw(&mut self, len: usize) -> Result<&mut [u8]> {
        self.check_room(len)?;
        let start = self.pos;
        self.pos += len;
        Ok(&mut self.buf[start..start + len])
    }

    /// The `len` bytes that end at the cursor.
    pub fn tail(&self, len: usize) -> Result<&[u8]> {
        let end = if self.pos == 0 { self.buf.len() } else { self.pos };
        if len > end {
            return Err(Error::LengthMismatch {
                expected: len,
                actual: end,
            });
        }
        Ok(&self.buf[end - len..end])
    }

    /// Restore the initial state.
    pub fn reset(&mut self) {
        self.buf.fill(WINDOW_FILL);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Window {
        Window::new(WindowBits::new(15).unwrap())
    }

    #[test]
    fn test_literals_and_tail() {
        let mut w = window();
        for &b in b"abc" {
            w.push(b).unwrap();
        }
        assert_eq!(w.tail(3).unwrap(), b"abc");
        assert_eq!(w.position(), 3);
    }

    #[test]
    fn test_overlapping_match_repeats() {
        let mut w = window();
        w.push(b'x').unwrap();
        w.push(b'y').unwrap();
        w.copy_match(2, 5).unwrap();
        assert_eq!(w.tail(7).unwrap(), b"xyxyxyx");
    }

    #[test]
    fn test_match_source_wraps() {
        let mut w = window();
        let size = w.size();
        w.reserve_raw(size).unwrap().fill(7);
        w.wrap();
        assert_eq!(w.position(), 0);
        w.push(1).unwrap();
        // Three bytes back from position 1 starts two bytes before the end.
        w.copy_match(3, 3).unwrap();
        assert_eq!(w.tail(4).unwrap(), &[1, 7, 7, 1]);
    }

    #[test]
    fn test_fresh_window_reads_fill_byte() {
        let mut w = window();
        w.copy_match(4, 2).unwrap();
        assert_eq!(w.tail(2).unwrap(), &[WINDOW_FILL, WINDOW_FILL]);
    }

    #[test]
    fn test_writes_never_cross_the_end() {
        let mut w = window();
        let size = w.size();
        w.reserve_raw(size - 2).unwrap();
        assert!(matches!(w.copy_match(1, 3), Err(Error::WindowOverrun { .. })));
        assert!(w.copy_match(1, 2).is_ok());
        assert!(matches!(w.push(0), Err(Error::WindowOverrun { .. })));
        assert_eq!(w.tail(2).unwrap().len(), 2);
    }

    #[test]
    fn test_bad_offset_rejected() {
        let mut w = window();
        let size = w.size();
        assert!(w.copy_match(0, 1).is_err());
        assert!(w.copy_match(size + 1, 1).is_err());
    }
}
