//! Canonical Huffman decode tables.
//!
//! Codes up to `table_bits` long resolve with a single lookup. Longer codes
//! (up to 16 bits) continue through escape nodes stored after the direct
//! region: each node is a pair of slots indexed by the next input bit.

use vassago_core::{Error, Result};

use crate::bits::BitReader;

/// Longest code LZX can describe.
pub const MAX_CODE_LENGTH: u8 = 16;

/// Huffman decoder built from code lengths.
#[derive(Clone)]
pub struct HuffmanTable {
    name: &'static str,
    /// Direct region of `1 << table_bits` entries, then escape node pairs.
    table: Vec<u16>,
    /// Code length per symbol, plus run-code slack.
    lengths: Vec<u8>,
    num_symbols: usize,
    table_bits: u8,
}

impl HuffmanTable {
    /// Create an empty table able to hold `num_symbols` symbols.
    ///
    /// `slack` extra length entries are allocated past the last symbol.
    pub fn new(name: &'static str, num_symbols: usize, table_bits: u8, slack: usize) -> Self {
        Self {
            name,
            table: vec![0; (1 << table_bits) + (num_symbols << 1)],
            lengths: vec![0; num_symbols + slack],
            num_symbols,
            table_bits,
        }
    }

    /// Build a decoder from code lengths.
    pub fn from_lengths(name: &'static str, lengths: &[u8], table_bits: u8) -> Result<Self> {
        if table_bits == 0 || table_bits > MAX_CODE_LENGTH {
            return Err(Error::malformed_table(name, "table bits out of range"));
        }
        if lengths.len() > 1 << (table_bits - 1) {
            return Err(Error::malformed_table(name, "too many symbols for table bits"));
        }
        let mut table = Self::new(name, lengths.len(), table_bits, 0);
        table.lengths.copy_from_slice(lengths);
        table.rebuild()?;
        Ok(table)
    }

    /// Code lengths, including the slack region.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Mutable code lengths. Call [`rebuild`](Self::rebuild) afterwards.
    pub fn lengths_mut(&mut self) -> &mut [u8] {
        &mut self.lengths
    }

    /// Number of decodable symbols.
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// True when every code length is zero.
    pub fn is_empty(&self) -> bool {
        self.lengths[..self.num_symbols].iter().all(|&len| len == 0)
    }

    /// Zero every code length.
    pub fn clear(&mut self) {
        self.lengths.fill(0);
        self.table.fill(0);
    }

    /// Regenerate the decode table from the current code lengths.
    ///
    /// Succeeds when the lengths describe a complete prefix code, or when
    /// they are all zero (an unused tree).
    pub fn rebuild(&mut self) -> Result<()> {
        let nbits = self.table_bits as u32;
        let nsyms = self.num_symbols;
        let name = self.name;
        let lengths = &self.lengths[..nsyms];
        let table = &mut self.table;

        if lengths.iter().any(|&len| len > MAX_CODE_LENGTH) {
            return Err(Error::malformed_table(name, "code longer than 16 bits"));
        }

        let mut pos: u32 = 0;
        let mut table_mask: u32 = 1 << nbits;
        let mut bit_mask: u32 = table_mask >> 1;
        let mut next_symbol: u32 = bit_mask;

        // Codes that fit the direct region fill 2^(nbits - len) slots each.
        for bit_num in 1..=nbits {
            for (sym, &len) in lengths.iter().enumerate() {
                if len as u32 != bit_num {
                    continue;
                }
                let leaf = pos;
                pos += bit_mask;
                if pos > table_mask {
                    return Err(Error::malformed_table(name, "over-subscribed code"));
                }
                table[leaf as usize..pos as usize].fill(sym as u16);
            }
            bit_mask >>= 1;
        }

        if pos == table_mask {
            return Ok(());
        }

        table[pos as usize..table_mask as usize].fill(0);

        // Remaining positions are tracked with 16 extra bits of precision.
        pos <<= 16;
        table_mask <<= 16;
        bit_mask = 1 << 15;

        for bit_num in nbits + 1..=MAX_CODE_LENGTH as u32 {
            for (sym, &len) in lengths.iter().enumerate() {
                if len as u32 != bit_num {
                    continue;
                }
                let mut leaf = (pos >> 16) as usize;
                for fill in 0..bit_num - nbits {
                    if table[leaf] == 0 {
                        let node = (next_symbol << 1) as usize;
                        if node + 1 >= table.len() {
                            return Err(Error::malformed_table(name, "escape nodes exhausted"));
                        }
                        table[node] = 0;
                        table[node + 1] = 0;
                        table[leaf] = next_symbol as u16;
                        next_symbol += 1;
                    }
                    leaf = (table[leaf] as usize) << 1;
                    if (pos >> (15 - fill)) & 1 != 0 {
                        leaf += 1;
                    }
                    if leaf >= table.len() {
                        return Err(Error::malformed_table(name, "escape node out of range"));
                    }
                }
                table[leaf] = sym as u16;
                pos += bit_mask;
                if pos > table_mask {
                    return Err(Error::malformed_table(name, "over-subscribed code"));
                }
            }
            bit_mask >>= 1;
        }

        if pos == table_mask {
            return Ok(());
        }

        if lengths.iter().all(|&len| len == 0) {
            Ok(())
        } else {
            Err(Error::malformed_table(name, "incomplete code"))
        }
    }

    /// Decode one symbol.
    #[inline]
    pub fn decode(&self, bits: &mut BitReader<'_>) -> Result<usize> {
        bits.ensure(16)?;
        let mut sym = self.table[bits.peek(self.table_bits as u32) as usize] as usize;

        if sym >= self.num_symbols {
            let mut mask = 1u32 << (32 - self.table_bits as u32);
            loop {
                mask >>= 1;
                if mask == 0 {
                    return Err(Error::malformed_table(self.name, "code longer than 16 bits"));
                }
                let next = (sym << 1) | usize::from(bits.buffer() & mask != 0);
                sym = match self.table.get(next) {
                    Some(&entry) => entry as usize,
                    None => return Err(Error::malformed_table(self.name, "escape node out of range")),
                };
                if sym < self.num_symbols {
                    break;
                }
            }
        }

        let len = self.lengths[sym];
        if len == 0 {
            return Err(Error::malformed_table(self.name, "decode from empty table"));
        }
        bits.remove(len as u32);
        Ok(sym)
    }
}

impl std::fmt::Debug for HuffmanTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuffmanTable")
            .field("name", &self.name)
            .field("num_symbols", &self.num_symbols)
            .field("table_bits", &self.table_bits)
            .finish()
    }
}
