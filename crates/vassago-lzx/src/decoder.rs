//! LZX block decoder.
//!
//! Persistent state (window, trees, repeat offsets, the current block) lives
//! in [`LzxDecoder`] and carries from one chunk to the next.

use tracing::trace;
use vassago_core::{ChunkDecompressor, DecodeStats, Error, Result, WindowBits};

use crate::bits::BitReader;
use crate::huffman::HuffmanTable;
use crate::offsets::RepeatOffsets;
use crate::tables::{
    ALIGNED_MAXSYMBOLS, ALIGNED_TABLEBITS, EXTRA_BITS, LENGTH_MAXSYMBOLS, LENGTH_TABLEBITS,
    LENTABLE_SAFETY, MAINTREE_MAXSYMBOLS, MAINTREE_TABLEBITS, MIN_MATCH, NUM_CHARS,
    NUM_PRIMARY_LENGTHS, NUM_SECONDARY_LENGTHS, POSITION_BASE, PRETREE_MAXSYMBOLS,
    PRETREE_TABLEBITS,
};
use crate::translate::CallTranslation;
use crate::window::Window;

/// LZX block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    /// No block has been read yet.
    Invalid = 0,
    /// Huffman-coded with plain offsets.
    Verbatim = 1,
    /// Huffman-coded with aligned-offset low bits.
    Aligned = 2,
    /// Stored bytes.
    Uncompressed = 3,
}

impl BlockType {
    /// Parse the 3-bit block type field.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            1 => Ok(BlockType::Verbatim),
            2 => Ok(BlockType::Aligned),
            3 => Ok(BlockType::Uncompressed),
            other => Err(Error::InvalidBlockType {
                block_type: other as u8,
            }),
        }
    }
}

/// Current block bookkeeping.
#[derive(Debug, Clone, Copy)]
struct Block {
    kind: BlockType,
    length: u32,
    remaining: u32,
}

impl Block {
    const NONE: Block = Block {
        kind: BlockType::Invalid,
        length: 0,
        remaining: 0,
    };
}

/// Stateful LZX decompressor.
pub struct LzxDecoder {
    bits: WindowBits,
    window: Window,
    offsets: RepeatOffsets,
    block: Block,
    header_read: bool,
    translation: CallTranslation,
    main_elements: usize,
    pretree: HuffmanTable,
    main_tree: HuffmanTable,
    length_tree: HuffmanTable,
    aligned_tree: HuffmanTable,
    stats: DecodeStats,
}

impl LzxDecoder {
    /// Create a decoder for a window of `2^window_bits` bytes.
    pub fn new(window_bits: u8) -> Result<Self> {
        Ok(Self::with_window(WindowBits::new(window_bits)?))
    }

    /// Create a decoder for a validated window size.
    pub fn with_window(bits: WindowBits) -> Self {
        Self {
            bits,
            window: Window::new(bits),
            offsets: RepeatOffsets::new(),
            block: Block::NONE,
            header_read: false,
            translation: CallTranslation::default(),
            main_elements: NUM_CHARS + bits.position_slots() * 8,
            pretree: HuffmanTable::new(
                "pre-tree",
                PRETREE_MAXSYMBOLS,
                PRETREE_TABLEBITS,
                LENTABLE_SAFETY,
            ),
            main_tree: HuffmanTable::new(
                "main",
                MAINTREE_MAXSYMBOLS,
                MAINTREE_TABLEBITS,
                LENTABLE_SAFETY,
            ),
            length_tree: HuffmanTable::new(
                "length",
                LENGTH_MAXSYMBOLS,
                LENGTH_TABLEBITS,
                LENTABLE_SAFETY,
            ),
            aligned_tree: HuffmanTable::new("aligned", ALIGNED_MAXSYMBOLS, ALIGNED_TABLEBITS, 0),
            stats: DecodeStats::new(),
        }
    }

    /// Block counters gathered so far.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Current repeat offsets.
    pub fn repeat_offsets(&self) -> [u32; 3] {
        self.offsets.get()
    }

    /// Type of the block being decoded.
    pub fn block_type(&self) -> BlockType {
        self.block.kind
    }

    /// Number of symbols in the main tree for this window.
    pub fn main_elements(&self) -> usize {
        self.main_elements
    }

    /// Decompress one chunk, appending exactly `output_len` bytes to `output`.
    pub fn decompress(&mut self, input: &[u8], output_len: usize, output: &mut Vec<u8>) -> Result<()> {
        if output_len > self.window.size() {
            return Err(Error::LengthMismatch {
                expected: output_len,
                actual: self.window.size(),
            });
        }

        let mut bits = BitReader::new(input);

        if !self.header_read {
            if bits.read_bits(1)? == 1 {
                let high = bits.read_bits(16)?;
                let low = bits.read_bits(16)?;
                self.translation = CallTranslation::new((high << 16) | low);
            }
            self.header_read = true;
        }

        let mut togo = output_len;
        while togo > 0 {
            if self.block.remaining == 0 {
                self.read_block_header(&mut bits)?;
                continue;
            }

            let this_run = (self.block.remaining as usize).min(togo);
            self.window.wrap();
            self.window.check_room(this_run)?;

            let produced = match self.block.kind {
                BlockType::Verbatim => self.decode_run(&mut bits, this_run, false)?,
                BlockType::Aligned => self.decode_run(&mut bits, this_run, true)?,
                BlockType::Uncompressed => {
                    bits.read_raw(self.window.reserve_raw(this_run)?)?;
                    this_run
                }
                BlockType::Invalid => {
                    return Err(Error::InvalidBlockType { block_type: 0 });
                }
            };

            // A final match may run past the requested length.
            if produced > self.block.remaining as usize || produced > togo {
                return Err(Error::LengthMismatch {
                    expected: output_len,
                    actual: output_len - togo + produced,
                });
            }
            self.block.remaining -= produced as u32;
            togo -= produced;
        }

        let start = output.len();
        output.extend_from_slice(self.window.tail(output_len)?);
        self.translation.apply(&mut output[start..]);
        Ok(())
    }

    /// Restore the initial state.
    pub fn reset(&mut self) {
        self.window.reset();
        self.offsets = RepeatOffsets::new();
        self.block = Block::NONE;
        self.header_read = false;
        self.translation = CallTranslation::default();
        self.pretree.clear();
        self.main_tree.clear();
        self.length_tree.clear();
        self.aligned_tree.clear();
        self.stats = DecodeStats::new();
    }

    fn read_block_header(&mut self, bits: &mut BitReader<'_>) -> Result<()> {
        if self.block.kind == BlockType::Uncompressed {
            if self.block.length & 1 == 1 {
                bits.skip_raw_byte()?;
            }
            bits.reset();
        }

        let kind = BlockType::from_bits(bits.read_bits(3)?)?;
        let high = bits.read_bits(16)?;
        let low = bits.read_bits(8)?;
        let length = (high << 8) | low;
        trace!(?kind, length, "lzx block");

        match kind {
            BlockType::Aligned => {
                for i in 0..ALIGNED_MAXSYMBOLS {
                    self.aligned_tree.lengths_mut()[i] = bits.read_bits(3)? as u8;
                }
                self.aligned_tree.rebuild()?;
                self.read_main_and_length_trees(bits)?;
                self.stats.aligned_blocks += 1;
            }
            BlockType::Verbatim => {
                self.read_main_and_length_trees(bits)?;
                self.stats.verbatim_blocks += 1;
            }
            BlockType::Uncompressed => {
                self.translation.start();
                bits.align_to_bytes()?;
                let r0 = bits.read_raw_u32()?;
                let r1 = bits.read_raw_u32()?;
                let r2 = bits.read_raw_u32()?;
                self.offsets.set([r0, r1, r2]);
                self.stats.uncompressed_blocks += 1;
            }
            BlockType::Invalid => unreachable!("from_bits never yields Invalid"),
        }

        self.block = Block {
            kind,
            length,
            remaining: length,
        };
        Ok(())
    }

    fn read_main_and_length_trees(&mut self, bits: &mut BitReader<'_>) -> Result<()> {
        read_lengths(&mut self.pretree, self.main_tree.lengths_mut(), 0, NUM_CHARS, bits)?;
        read_lengths(
            &mut self.pretree,
            self.main_tree.lengths_mut(),
            NUM_CHARS,
            self.main_elements,
            bits,
        )?;
        self.main_tree.rebuild()?;
        if self.main_tree.lengths()[0xE8] != 0 {
            self.translation.start();
        }

        read_lengths(
            &mut self.pretree,
            self.length_tree.lengths_mut(),
            0,
            NUM_SECONDARY_LENGTHS,
            bits,
        )?;
        self.length_tree.rebuild()
    }

    /// Decode symbols until at least `this_run` bytes were produced.
    fn decode_run(&mut self, bits: &mut BitReader<'_>, this_run: usize, aligned: bool) -> Result<usize> {
        let mut produced = 0;
        while produced < this_run {
            let symbol = self.main_tree.decode(bits)?;
            if symbol < NUM_CHARS {
                self.window.push(symbol as u8)?;
                produced += 1;
                continue;
            }

            let element = symbol - NUM_CHARS;
            let mut match_len = element & NUM_PRIMARY_LENGTHS;
            if match_len == NUM_PRIMARY_LENGTHS {
                match_len += self.length_tree.decode(bits)?;
            }
            match_len += MIN_MATCH;

            let slot = element >> 3;
            let offset = if slot > 2 {
                let offset = if aligned {
                    self.aligned_offset(bits, slot)?
                } else {
                    verbatim_offset(bits, slot)?
                };
                self.offsets.push(offset);
                offset
            } else {
                self.offsets.take(slot)
            };

            self.window.copy_match(offset as usize, match_len)?;
            produced += match_len;
        }
        Ok(produced)
    }

    fn aligned_offset(&self, bits: &mut BitReader<'_>, slot: usize) -> Result<u32> {
        let extra = EXTRA_BITS[slot] as u32;
        let mut offset = POSITION_BASE[slot] - 2;
        if extra > 3 {
            offset += bits.read_bits_wide(extra - 3)? << 3;
            offset += self.aligned_tree.decode(bits)? as u32;
        } else if extra == 3 {
            offset += self.aligned_tree.decode(bits)? as u32;
        } else if extra > 0 {
            offset += bits.read_bits(extra)?;
        } else {
            offset = 1;
        }
        Ok(offset)
    }
}

fn verbatim_offset(bits: &mut BitReader<'_>, slot: usize) -> Result<u32> {
    if slot == 3 {
        return Ok(1);
    }
    let extra = EXTRA_BITS[slot] as u32;
    Ok(POSITION_BASE[slot] - 2 + bits.read_bits_wide(extra)?)
}

/// Delta-decode `lengths[first..last]` through a freshly read pre-tree.
fn read_lengths(
    pretree: &mut HuffmanTable,
    lengths: &mut [u8],
    first: usize,
    last: usize,
    bits: &mut BitReader<'_>,
) -> Result<()> {
    for i in 0..PRETREE_MAXSYMBOLS {
        pretree.lengths_mut()[i] = bits.read_bits(4)? as u8;
    }
    pretree.rebuild()?;

    let mut x = first;
    while x < last {
        let code = pretree.decode(bits)?;
        match code {
            17 => {
                let run = 4 + bits.read_bits(4)? as usize;
                fill_run(lengths, x, run, 0)?;
                x += run;
            }
            18 => {
                let run = 20 + bits.read_bits(5)? as usize;
                fill_run(lengths, x, run, 0)?;
                x += run;
            }
            19 => {
                let run = 4 + bits.read_bits(1)? as usize;
                let delta = pretree.decode(bits)?;
                if delta > 16 {
                    return Err(Error::malformed_table("pre-tree", "run code inside run"));
                }
                let value = apply_delta(lengths[x], delta);
                fill_run(lengths, x, run, value)?;
                x += run;
            }
            delta => {
                lengths[x] = apply_delta(lengths[x], delta);
                x += 1;
            }
        }
    }
    Ok(())
}

#[inline]
fn apply_delta(previous: u8, delta: usize) -> u8 {
    (previous as i32 - delta as i32).rem_euclid(17) as u8
}

fn fill_run(lengths: &mut [u8], at: usize, run: usize, value: u8) -> Result<()> {
    match lengths.get_mut(at..at + run) {
        Some(slots) => {
            slots.fill(value);
            Ok(())
        }
        None => Err(Error::malformed_table("pre-tree", "length run past end of table")),
    }
}

impl ChunkDecompressor for LzxDecoder {
    fn window_bits(&self) -> WindowBits {
        self.bits
    }

    fn decompress_chunk(&mut self, input: &[u8], output_len: usize, output: &mut Vec<u8>) -> Result<()> {
        self.decompress(input, output_len, output)
    }

    fn reset(&mut self) {
        LzxDecoder::reset(self)
    }

    fn stats(&self) -> Option<DecodeStats> {
        Some(self.stats.clone())
    }
}

impl std::fmt::Debug for LzxDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzxDecoder")
            .field("window_bits", &self.bits.bits())
            .field("window_pos", &self.window.position())
            .field("block", &self.block)
            .field("repeat_offsets", &self.offsets.get())
            .finish()
    }
}
