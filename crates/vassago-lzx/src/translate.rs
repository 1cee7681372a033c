//! x86 call address translation.
//!
//! Encoders may rewrite the 32-bit operand after each `0xE8` (CALL) byte from
//! a relative to an absolute address, which compresses better. The decoder
//! undoes that on each output frame.

use crate::tables::TRANSLATION_FRAME_LIMIT;

/// Bytes at the end of a frame that are never scanned.
const TAIL_GUARD: usize = 10;

/// Translation state carried across frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTranslation {
    file_size: i32,
    current_pos: i32,
    frames: u32,
    started: bool,
}

impl CallTranslation {
    /// Create translation state for a stream whose header declared `file_size`.
    ///
    /// A file size of zero disables translation.
    pub fn new(file_size: u32) -> Self {
        Self {
            file_size: file_size as i32,
            ..Default::default()
        }
    }

    /// Declared file size, zero when disabled.
    pub fn file_size(&self) -> u32 {
        self.file_size as u32
    }

    /// Mark that the stream may contain translated operands.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Whether any block has enabled translation yet.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Undo translation in one output frame in place.
    pub fn apply(&mut self, frame: &mut [u8]) {
        let counted = self.frames < TRANSLATION_FRAME_LIMIT;
        self.frames = self.frames.saturating_add(1);
        if !counted || self.file_size == 0 {
            return;
        }

        if frame.len() > TAIL_GUARD && self.started {
            let end = frame.len() - TAIL_GUARD;
            let mut cur = self.current_pos;
            let mut i = 0;
            while i < end {
                if frame[i] != 0xE8 {
                    i += 1;
                    cur = cur.wrapping_add(1);
                    continue;
                }
                let operand = [frame[i + 1], frame[i + 2], frame[i + 3], frame[i + 4]];
                let absolute = i32::from_le_bytes(operand);
                if absolute >= cur.wrapping_neg() && absolute < self.file_size {
                    let relative = if absolute >= 0 {
                        absolute.wrapping_sub(cur)
                    } else {
                        absolute + self.file_size
                    };
                    frame[i + 1..i + 5].copy_from_slice(&relative.to_le_bytes());
                }
                i += 5;
                cur = cur.wrapping_add(5);
            }
        }
        self.current_pos = self.current_pos.wrapping_add(frame.len() as i32);
    }
}
