//! Greedy LZX encoder.

use std::collections::HashMap;

use crate::offsets::RepeatOffsets;
use crate::tables::{
    ALIGNED_MAXSYMBOLS, EXTRA_BITS, FRAME_SIZE, LENGTH_MAXSYMBOLS, MAINTREE_MAXSYMBOLS,
    MAX_MATCH, MIN_MATCH, NUM_CHARS, NUM_PRIMARY_LENGTHS, NUM_SECONDARY_LENGTHS, POSITION_BASE,
    PRETREE_MAXSYMBOLS,
};

use super::bit_writer::BitWriter;

/// Shortest match the encoder looks for.
const MIN_SEARCH: usize = 3;

/// Code length layout for the main and length trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeShape {
    /// Lengths differ by at most one bit.
    #[default]
    Flat,
    /// A flat tree with one leaf split into a chain of long codes on the
    /// lowest symbols.
    Skewed,
}

/// Block types to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Verbatim,
    Aligned,
    Uncompressed,
    /// Cycle verbatim, aligned, uncompressed.
    Rotate,
}

/// Encoder settings.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Log2 of the window size.
    pub window_bits: u8,
    /// Uncompressed bytes per block.
    pub block_size: usize,
    pub block_kind: BlockKind,
    pub tree_shape: TreeShape,
    /// File size written to the call translation header.
    pub translation_size: Option<u32>,
    /// Candidates examined per position.
    pub max_chain: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            window_bits: 16,
            block_size: FRAME_SIZE,
            block_kind: BlockKind::Verbatim,
            tree_shape: TreeShape::Flat,
            translation_size: None,
            max_chain: 16,
        }
    }
}

/// One compressed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub compressed: Vec<u8>,
    pub decompressed_len: usize,
}

/// Canonical codes for a set of lengths.
#[derive(Debug, Clone)]
pub struct CanonicalCodes {
    codes: Vec<u32>,
    lengths: Vec<u8>,
}

impl CanonicalCodes {
    /// Assign codes in (length, symbol) order.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let mut bl_count = [0u32; 17];
        for &len in lengths {
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }
        let mut next_code = [0u32; 17];
        let mut code = 0u32;
        for bits in 1..=16 {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }
        let mut codes = vec![0u32; lengths.len()];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                codes[symbol] = next_code[len as usize];
                next_code[len as usize] += 1;
            }
        }
        Self {
            codes,
            lengths: lengths.to_vec(),
        }
    }

    /// Write the code for `symbol`.
    pub fn write(&self, w: &mut BitWriter, symbol: usize) {
        let len = self.lengths[symbol];
        assert!(len > 0, "symbol {symbol} has no code");
        w.write_bits(self.codes[symbol], len as u32);
    }
}

/// Lengths of a complete code over `n` symbols, all within one bit of each other.
pub fn complete_lengths(n: usize) -> Vec<u8> {
    assert!(n >= 2);
    let bits = usize::BITS - (n - 1).leading_zeros();
    let short = (1usize << bits) - n;
    (0..n)
        .map(|i| if i < short { bits as u8 - 1 } else { bits as u8 })
        .collect()
}

/// Complete code over `n` symbols whose first seven codes form a chain of
/// increasingly long codes, up to six bits longer than the rest.
pub fn skewed_lengths(n: usize) -> Vec<u8> {
    const CHAIN: usize = 6;
    let mut flat = complete_lengths(n - CHAIN);
    let last = flat.pop().unwrap_or(1);
    let mut lengths: Vec<u8> = (1..=CHAIN as u8).map(|step| last + step).collect();
    lengths.push(last + CHAIN as u8);
    lengths.extend(flat);
    assert!(lengths.iter().all(|&len| len <= 16));
    lengths
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Literal(u8),
    Match { len: usize, dist: usize },
}

/// Greedy LZX encoder.
pub struct LzxEncoder {
    options: EncoderOptions,
    offsets: RepeatOffsets,
    main_lengths: Vec<u8>,
    length_lengths: Vec<u8>,
    chains: HashMap<[u8; 3], Vec<usize>>,
    blocks: usize,
}

impl LzxEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        assert!((15..=21).contains(&options.window_bits));
        assert!(options.block_size > 0);
        Self {
            options,
            offsets: RepeatOffsets::new(),
            main_lengths: vec![0; MAINTREE_MAXSYMBOLS],
            length_lengths: vec![0; LENGTH_MAXSYMBOLS],
            chains: HashMap::new(),
            blocks: 0,
        }
    }

    fn window_size(&self) -> usize {
        1 << self.options.window_bits
    }

    fn main_elements(&self) -> usize {
        let slots = match self.options.window_bits {
            20 => 42,
            21 => 50,
            bits => bits as usize * 2,
        };
        NUM_CHARS + slots * 8
    }

    /// Encode `data` into frames of up to 32 KiB each.
    pub fn encode(mut self, data: &[u8]) -> Vec<EncodedFrame> {
        let mut frames = Vec::new();
        let mut w = BitWriter::new();

        match self.options.translation_size {
            Some(size) => {
                w.write_bits(1, 1);
                w.write_bits(size >> 16, 16);
                w.write_bits(size & 0xFFFF, 16);
            }
            None => w.write_bits(0, 1),
        }

        let mut pos = 0;
        let mut frame_start = 0;
        let mut pending_pad = false;

        while pos < data.len() {
            let block_len = self.options.block_size.min(data.len() - pos);
            let block_end = pos + block_len;
            let kind = self.next_kind();

            let mut segments = Vec::new();
            let mut seg_start = pos;
            while seg_start < block_end {
                let frame_end = (seg_start / FRAME_SIZE + 1) * FRAME_SIZE;
                let seg_end = frame_end.min(block_end);
                segments.push((seg_start, seg_end));
                seg_start = seg_end;
            }

            let tokens: Vec<Vec<Token>> = if kind == BlockKind::Uncompressed {
                segments.iter().map(|_| Vec::new()).collect()
            } else {
                let mut simulated = self.offsets;
                segments
                    .iter()
                    .map(|&(start, end)| self.tokenize(data, start, end, &mut simulated))
                    .collect()
            };

            if pending_pad {
                w.write_raw(&[0]);
                pending_pad = false;
            }
            let (main, length) = self.write_block_header(&mut w, kind, block_len, &tokens);

            for (&(start, end), seg_tokens) in segments.iter().zip(&tokens) {
                if kind == BlockKind::Uncompressed {
                    w.write_raw(&data[start..end]);
                } else {
                    for &token in seg_tokens {
                        self.write_token(&mut w, token, kind == BlockKind::Aligned, &main, &length);
                    }
                }
                if end % FRAME_SIZE == 0 || end == data.len() {
                    w.align();
                    frames.push(EncodedFrame {
                        compressed: w.take(),
                        decompressed_len: end - frame_start,
                    });
                    frame_start = end;
                }
            }

            if kind == BlockKind::Uncompressed && block_len % 2 == 1 {
                pending_pad = true;
            }
            pos = block_end;
        }
        frames
    }

    fn next_kind(&mut self) -> BlockKind {
        let index = self.blocks;
        self.blocks += 1;
        match self.options.block_kind {
            BlockKind::Rotate => match index % 3 {
                0 => BlockKind::Verbatim,
                1 => BlockKind::Aligned,
                _ => BlockKind::Uncompressed,
            },
            kind => kind,
        }
    }

    fn shape(&self, n: usize) -> Vec<u8> {
        match self.options.tree_shape {
            TreeShape::Flat => complete_lengths(n),
            TreeShape::Skewed => skewed_lengths(n),
        }
    }

    fn write_block_header(
        &mut self,
        w: &mut BitWriter,
        kind: BlockKind,
        block_len: usize,
        tokens: &[Vec<Token>],
    ) -> (CanonicalCodes, CanonicalCodes) {
        let type_bits = match kind {
            BlockKind::Verbatim => 1,
            BlockKind::Aligned => 2,
            _ => 3,
        };
        w.write_bits(type_bits, 3);
        w.write_bits((block_len >> 8) as u32, 16);
        w.write_bits((block_len & 0xFF) as u32, 8);

        if kind == BlockKind::Uncompressed {
            w.align_for_raw();
            let mut raw = Vec::with_capacity(12);
            for offset in self.offsets.get() {
                raw.extend_from_slice(&offset.to_le_bytes());
            }
            w.write_raw(&raw);
            return (
                CanonicalCodes::from_lengths(&self.main_lengths),
                CanonicalCodes::from_lengths(&self.length_lengths),
            );
        }

        if kind == BlockKind::Aligned {
            for _ in 0..ALIGNED_MAXSYMBOLS {
                w.write_bits(3, 3);
            }
        }

        let main_elements = self.main_elements();
        let mut main = vec![0u8; MAINTREE_MAXSYMBOLS];
        main[..main_elements].copy_from_slice(&self.shape(main_elements));
        write_lengths(w, &mut self.main_lengths, &main, 0, NUM_CHARS);
        write_lengths(w, &mut self.main_lengths, &main, NUM_CHARS, main_elements);

        let needs_length_tree = tokens.iter().flatten().any(|token| {
            matches!(token, Token::Match { len, .. } if len - MIN_MATCH >= NUM_PRIMARY_LENGTHS)
        });
        let mut length = vec![0u8; LENGTH_MAXSYMBOLS];
        if needs_length_tree {
            length[..NUM_SECONDARY_LENGTHS].copy_from_slice(&self.shape(NUM_SECONDARY_LENGTHS));
        }
        write_lengths(w, &mut self.length_lengths, &length, 0, NUM_SECONDARY_LENGTHS);

        (
            CanonicalCodes::from_lengths(&main),
            CanonicalCodes::from_lengths(&length),
        )
    }

    fn tokenize(
        &mut self,
        data: &[u8],
        start: usize,
        end: usize,
        offsets: &mut RepeatOffsets,
    ) -> Vec<Token> {
        let max_dist = self.window_size() - 3;
        let mut tokens = Vec::new();
        let mut p = start;
        while p < end {
            let limit = MAX_MATCH.min(end - p);
            let mut best: Option<(usize, usize)> = None;

            if limit >= MIN_SEARCH {
                for dist in offsets.get() {
                    let dist = dist as usize;
                    if dist == 0 || dist > p || dist > max_dist {
                        continue;
                    }
                    let len = match_len(data, p - dist, p, limit);
                    if len >= MIN_SEARCH && best.map_or(true, |(l, _)| len > l) {
                        best = Some((len, dist));
                    }
                }
                if let Some(candidates) = self.chains.get(&key(data, p)) {
                    for &c in candidates.iter().rev().take(self.options.max_chain) {
                        let dist = p - c;
                        if dist > max_dist {
                            break;
                        }
                        let len = match_len(data, c, p, limit);
                        if len >= MIN_SEARCH && best.map_or(true, |(l, _)| len > l) {
                            best = Some((len, dist));
                        }
                    }
                }
            }

            match best {
                Some((len, dist)) => {
                    match offsets.find(dist as u32) {
                        Some(slot) => {
                            offsets.take(slot);
                        }
                        None => offsets.push(dist as u32),
                    }
                    tokens.push(Token::Match { len, dist });
                    for q in p..p + len {
                        self.insert(data, q);
                    }
                    p += len;
                }
                None => {
                    tokens.push(Token::Literal(data[p]));
                    self.insert(data, p);
                    p += 1;
                }
            }
        }
        tokens
    }

    fn insert(&mut self, data: &[u8], p: usize) {
        if p + 3 <= data.len() {
            self.chains.entry(key(data, p)).or_default().push(p);
        }
    }

    fn write_token(
        &mut self,
        w: &mut BitWriter,
        token: Token,
        aligned: bool,
        main: &CanonicalCodes,
        length: &CanonicalCodes,
    ) {
        let (len, dist) = match token {
            Token::Literal(byte) => {
                main.write(w, byte as usize);
                return;
            }
            Token::Match { len, dist } => (len, dist as u32),
        };

        let (slot, formatted) = match self.offsets.find(dist) {
            Some(slot) => {
                self.offsets.take(slot);
                (slot, 0)
            }
            None => {
                self.offsets.push(dist);
                let formatted = dist + 2;
                let slot = (0..POSITION_BASE.len())
                    .rev()
                    .find(|&s| POSITION_BASE[s] <= formatted)
                    .unwrap_or(0);
                (slot, formatted)
            }
        };

        let header = (len - MIN_MATCH).min(NUM_PRIMARY_LENGTHS);
        main.write(w, NUM_CHARS + (slot << 3) + header);
        if header == NUM_PRIMARY_LENGTHS {
            length.write(w, len - MIN_MATCH - NUM_PRIMARY_LENGTHS);
        }

        if slot > 2 {
            let extra = EXTRA_BITS[slot] as u32;
            let value = formatted - POSITION_BASE[slot];
            if aligned && extra >= 3 {
                if extra > 3 {
                    write_wide(w, value >> 3, extra - 3);
                }
                // Aligned tree is flat 3-bit: the code is the symbol itself.
                w.write_bits(value & 7, 3);
            } else {
                write_wide(w, value, extra);
            }
        }
    }
}

fn write_wide(w: &mut BitWriter, value: u32, n: u32) {
    if n > 16 {
        w.write_bits(value >> 16, n - 16);
        w.write_bits(value & 0xFFFF, 16);
    } else {
        w.write_bits(value, n);
    }
}

fn key(data: &[u8], p: usize) -> [u8; 3] {
    [
        data[p],
        data.get(p + 1).copied().unwrap_or(0),
        data.get(p + 2).copied().unwrap_or(0),
    ]
}

fn match_len(data: &[u8], src: usize, dst: usize, limit: usize) -> usize {
    let mut len = 0;
    while len < limit && data[src + len] == data[dst + len] {
        len += 1;
    }
    len
}

/// Delta-code `new[first..last]` against `prev` through a flat pre-tree.
fn write_lengths(w: &mut BitWriter, prev: &mut [u8], new: &[u8], first: usize, last: usize) {
    let pre_lengths = complete_lengths(PRETREE_MAXSYMBOLS);
    for &len in &pre_lengths {
        w.write_bits(len as u32, 4);
    }
    let pre = CanonicalCodes::from_lengths(&pre_lengths);
    let delta = |from: u8, to: u8| ((from as usize + 17 - to as usize) % 17) as usize;

    let mut x = first;
    while x < last {
        let zeros = new[x..last].iter().take_while(|&&len| len == 0).count();
        if zeros >= 20 {
            let run = zeros.min(51);
            pre.write(w, 18);
            w.write_bits((run - 20) as u32, 5);
            prev[x..x + run].fill(0);
            x += run;
            continue;
        }
        if zeros >= 4 {
            let run = zeros.min(19);
            pre.write(w, 17);
            w.write_bits((run - 4) as u32, 4);
            prev[x..x + run].fill(0);
            x += run;
            continue;
        }

        let same = new[x..last].iter().take_while(|&&len| len == new[x]).count();
        if same >= 4 {
            let run = same.min(5);
            pre.write(w, 19);
            w.write_bits((run - 4) as u32, 1);
            pre.write(w, delta(prev[x], new[x]));
            prev[x..x + run].fill(new[x]);
            x += run;
            continue;
        }

        pre.write(w, delta(prev[x], new[x]));
        prev[x] = new[x];
        x += 1;
    }
}

/// Concatenate frames with their size headers.
///
/// Full 32 KiB frames carry a 2-byte big-endian compressed size; any other
/// frame is introduced by `0xFF`, its 2-byte decompressed size, then the
/// 2-byte compressed size.
pub fn frame_stream(frames: &[EncodedFrame]) -> Vec<u8> {
    let mut out = Vec::new();
    for frame in frames {
        let block_size = frame.compressed.len();
        assert!(block_size < 0xFF00, "frame too large for a size header");
        if frame.decompressed_len != FRAME_SIZE {
            out.push(0xFF);
            out.extend_from_slice(&(frame.decompressed_len as u16).to_be_bytes());
        }
        out.extend_from_slice(&(block_size as u16).to_be_bytes());
        out.extend_from_slice(&frame.compressed);
    }
    out
}
