//! Canonical Huffman tables and codebook assets
//!
//! A codebook is a set of `(key, code length)` pairs; codes are assigned
//! canonically (shortest first, ties broken by key), so an asset only has to
//! carry lengths. Assets are JSON:
//!
//! ```json
//! {
//!   "keying": "run_size",
//!   "table": [ { "run": 0, "key": 0, "length": 2 }, ... ],
//!   "dc_table": null
//! }
//! ```
//!
//! With `literal` keying, `key` is the coefficient value itself. With
//! `run_size` keying, `key` is the magnitude class and the raw magnitude
//! bits follow the code (see [`vlc`](super::vlc)).

use super::bitstream::BitstreamReader;
use super::dc::DcPredictor;
use super::frame::YuvFrame;
use super::plane::{visit_symbols, Plane};
use super::rle::Symbol;
use super::transform::{Qp, TransformQuantizer};
use super::vlc::{magnitude_size, SymbolClass, MAX_MAGNITUDE_BITS};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Longest code a table may hold
pub const MAX_CODE_LENGTH: usize = 16;

/// Largest run a codebook key may carry
pub const MAX_RUN: u8 = 15;

/// Table key: `(run, value)` or `(run, size)` depending on [`Keying`]
pub type CodeKey = (u8, i32);

/// How symbols map onto table keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keying {
    /// One code per literal `(run, value)` pair
    Literal,
    /// One code per `(run, magnitude size)`, magnitude bits appended raw
    RunSize,
}

impl Keying {
    /// Table key for `symbol`
    #[inline]
    pub fn key(self, symbol: Symbol) -> CodeKey {
        match self {
            Keying::Literal => (symbol.run, symbol.value),
            Keying::RunSize => (symbol.run, magnitude_size(symbol.value) as i32),
        }
    }
}

/// One entry of a codebook asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLength {
    pub run: u8,
    pub key: i32,
    pub length: u8,
}

/// Serialized form of a [`Codebook`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebookAsset {
    pub keying: Keying,
    pub table: Vec<CodeLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc_table: Option<Vec<CodeLength>>,
}

// ============================================================================
// Canonical table
// ============================================================================

/// A canonical prefix code over [`CodeKey`]s
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// key -> (code, length)
    codes: HashMap<CodeKey, (u32, u8)>,
    /// Keys in canonical order
    symbols: Vec<CodeKey>,
    /// Code lengths parallel to `symbols`
    lengths: Vec<u8>,
    /// Number of codes of each length
    counts: [u32; MAX_CODE_LENGTH + 1],
    /// First canonical code of each length
    first_code: [u32; MAX_CODE_LENGTH + 1],
    /// Index into `symbols` of the first code of each length
    first_index: [usize; MAX_CODE_LENGTH + 1],
    max_length: u8,
}

impl HuffmanTable {
    /// Build a table from per-key code lengths
    ///
    /// Rejects empty tables, lengths outside 1..=16, duplicate keys and
    /// over-subscribed length sets.
    pub fn from_lengths(entries: &[CodeLength]) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::codebook("table has no entries"));
        }

        let mut sorted: Vec<(u8, CodeKey)> = Vec::with_capacity(entries.len());
        let mut kraft: u64 = 0;
        for entry in entries {
            if entry.length == 0 || entry.length as usize > MAX_CODE_LENGTH {
                return Err(Error::codebook(format!(
                    "code length {} for ({}, {}) outside 1..={}",
                    entry.length, entry.run, entry.key, MAX_CODE_LENGTH
                )));
            }
            kraft += 1u64 << (MAX_CODE_LENGTH - entry.length as usize);
            sorted.push((entry.length, (entry.run, entry.key)));
        }
        if kraft > 1u64 << MAX_CODE_LENGTH {
            return Err(Error::codebook("code lengths are over-subscribed"));
        }

        sorted.sort_unstable();
        let mut seen = HashMap::with_capacity(sorted.len());
        for &(length, key) in &sorted {
            if seen.insert(key, length).is_some() {
                return Err(Error::codebook(format!(
                    "duplicate entry ({}, {})",
                    key.0, key.1
                )));
            }
        }

        let mut counts = [0u32; MAX_CODE_LENGTH + 1];
        for &(length, _) in &sorted {
            counts[length as usize] += 1;
        }

        let mut first_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut first_index = [0usize; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        let mut index = 0usize;
        for len in 1..=MAX_CODE_LENGTH {
            first_code[len] = code;
            first_index[len] = index;
            code += counts[len];
            index += counts[len] as usize;
            code <<= 1;
        }

        let mut codes = HashMap::with_capacity(sorted.len());
        let mut next = first_code;
        for &(length, key) in &sorted {
            codes.insert(key, (next[length as usize], length));
            next[length as usize] += 1;
        }

        let max_length = sorted.last().map(|&(length, _)| length).unwrap_or(0);

        Ok(HuffmanTable {
            codes,
            symbols: sorted.iter().map(|&(_, key)| key).collect(),
            lengths: sorted.iter().map(|&(length, _)| length).collect(),
            counts,
            first_code,
            first_index,
            max_length,
        })
    }

    /// Build a length-limited optimal table from symbol counts
    pub fn from_frequencies(frequencies: &BTreeMap<CodeKey, u64>) -> Result<Self> {
        let lengths = code_lengths_from_frequencies(frequencies)?;
        Self::from_lengths(&lengths)
    }

    /// `(code, length)` for `key`
    #[inline]
    pub fn code(&self, key: CodeKey) -> Option<(u32, u8)> {
        self.codes.get(&key).copied()
    }

    /// Read one code from `reader`
    ///
    /// # Errors
    /// `TruncatedBitstream` if the bits run out mid-code, `UnknownSymbol`
    /// (with the code's start position) if no entry matches.
    pub fn decode(&self, reader: &mut BitstreamReader) -> Result<CodeKey> {
        let start = reader.position();
        let mut code = 0u32;
        for len in 1..=self.max_length as usize {
            code = (code << 1) | reader.read_bit()? as u32;
            let count = self.counts[len];
            if count > 0 && code >= self.first_code[len] {
                let offset = code - self.first_code[len];
                if offset < count {
                    return Ok(self.symbols[self.first_index[len] + offset as usize]);
                }
            }
        }
        Err(Error::UnknownSymbol { position: start })
    }

    /// Entries in canonical order
    pub fn lengths(&self) -> Vec<CodeLength> {
        self.symbols
            .iter()
            .zip(&self.lengths)
            .map(|(&(run, key), &length)| CodeLength { run, key, length })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn max_length(&self) -> u8 {
        self.max_length
    }
}

/// Optimal code lengths limited to 16 bits
///
/// Plain Huffman over the counts plus one pseudo-symbol of weight 1, then
/// the JPEG Annex K.2 adjustment moves codes longer than 16 bits up the tree.
/// The pseudo-symbol's slot is dropped at the end, so no real code is all
/// ones. Ties are broken by key order, so the result is deterministic.
pub fn code_lengths_from_frequencies(
    frequencies: &BTreeMap<CodeKey, u64>,
) -> Result<Vec<CodeLength>> {
    let keys: Vec<CodeKey> = frequencies
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(&key, _)| key)
        .collect();
    if keys.is_empty() {
        return Err(Error::codebook("no symbols to build a table from"));
    }

    // leaves 0..keys.len() are real keys, the next leaf is the pseudo-symbol
    let leaf_count = keys.len() + 1;
    let mut children: Vec<Option<(usize, usize)>> = vec![None; leaf_count];
    let mut heap = BinaryHeap::with_capacity(leaf_count);
    for (i, key) in keys.iter().enumerate() {
        heap.push(Reverse((frequencies[key], i)));
    }
    heap.push(Reverse((1u64, keys.len())));

    while heap.len() > 1 {
        let (Some(Reverse((w1, a))), Some(Reverse((w2, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        children.push(Some((a, b)));
        heap.push(Reverse((w1.saturating_add(w2), children.len() - 1)));
    }

    let mut depth = vec![0usize; children.len()];
    let mut stack = vec![children.len() - 1];
    while let Some(node) = stack.pop() {
        if let Some((a, b)) = children[node] {
            depth[a] = depth[node] + 1;
            depth[b] = depth[node] + 1;
            stack.push(a);
            stack.push(b);
        }
    }

    let max_depth = depth[..leaf_count].iter().copied().max().unwrap_or(0);
    let mut bits = vec![0i64; max_depth.max(MAX_CODE_LENGTH) + 1];
    for &d in &depth[..leaf_count] {
        bits[d] += 1;
    }

    // Annex K.2: fold lengths above 16 back into the tree
    for i in (MAX_CODE_LENGTH + 1..bits.len()).rev() {
        while bits[i] > 0 {
            let mut j = i - 2;
            while j > 0 && bits[j] == 0 {
                j -= 1;
            }
            if j == 0 || bits[i] < 2 {
                return Err(Error::codebook("cannot limit code lengths to 16 bits"));
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
    }

    // the pseudo-symbol takes one slot of the longest length
    if let Some(longest) = (1..=MAX_CODE_LENGTH).rev().find(|&len| bits[len] > 0) {
        bits[longest] -= 1;
    }

    let mut order: Vec<(usize, CodeKey)> = keys
        .iter()
        .enumerate()
        .map(|(i, &key)| (depth[i], key))
        .collect();
    order.sort_unstable();

    let mut lengths = Vec::with_capacity(order.len());
    let mut iter = order.into_iter();
    for (len, &count) in bits.iter().enumerate().take(MAX_CODE_LENGTH + 1).skip(1) {
        for _ in 0..count {
            if let Some((_, (run, key))) = iter.next() {
                lengths.push(CodeLength {
                    run,
                    key,
                    length: len as u8,
                });
            }
        }
    }

    Ok(lengths)
}

// ============================================================================
// Codebook
// ============================================================================

/// Loaded, validated codebook shared by encoder and decoder
#[derive(Debug, Clone)]
pub struct Codebook {
    keying: Keying,
    table: HuffmanTable,
    dc_table: Option<HuffmanTable>,
}

impl Codebook {
    /// Validate an asset and build its tables
    pub fn from_asset(asset: &CodebookAsset) -> Result<Self> {
        validate_keys(asset.keying, &asset.table)?;
        let table = HuffmanTable::from_lengths(&asset.table)?;
        let dc_table = match &asset.dc_table {
            Some(entries) => {
                validate_keys(asset.keying, entries)?;
                Some(HuffmanTable::from_lengths(entries)?)
            }
            None => None,
        };

        Ok(Codebook {
            keying: asset.keying,
            table,
            dc_table,
        })
    }

    /// Parse a JSON asset
    pub fn from_json(json: &str) -> Result<Self> {
        let asset: CodebookAsset = serde_json::from_str(json)
            .map_err(|e| Error::codebook(format!("malformed codebook: {}", e)))?;
        Self::from_asset(&asset)
    }

    /// Load a JSON asset from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::codebook(format!("{}: {}", path.display(), e)))?;
        let codebook = Self::from_json(&json)?;
        info!(
            "Loaded codebook {} ({:?}, {} entries{})",
            path.display(),
            codebook.keying,
            codebook.table.len(),
            if codebook.dc_table.is_some() { ", separate DC table" } else { "" }
        );
        Ok(codebook)
    }

    /// Serializable form
    pub fn to_asset(&self) -> CodebookAsset {
        CodebookAsset {
            keying: self.keying,
            table: self.table.lengths(),
            dc_table: self.dc_table.as_ref().map(HuffmanTable::lengths),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_asset())
            .map_err(|e| Error::codebook(format!("cannot serialize codebook: {}", e)))
    }

    /// Write the asset as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Built-in `run_size` codebook
    ///
    /// Covers runs 0..=15 and magnitude sizes 1..=15 plus `(0, 0)`, with
    /// lengths derived from a fixed model where short runs and small
    /// magnitudes are common. Any block at any QP can be coded with it.
    pub fn builtin() -> Result<Self> {
        let mut frequencies = BTreeMap::new();
        frequencies.insert((0u8, 0i32), 1u64 << 30);
        for run in 0..=MAX_RUN {
            for size in 1..=15u32 {
                let shift = 2 * run as u32 + 3 * (size - 1);
                let weight = (1u64 << 30).checked_shr(shift).unwrap_or(0);
                frequencies.insert((run, size as i32), weight + 1);
            }
        }
        let table = HuffmanTable::from_frequencies(&frequencies)?;
        debug!(
            "Built-in codebook: {} entries, longest code {} bits",
            table.len(),
            table.max_length()
        );
        Ok(Codebook {
            keying: Keying::RunSize,
            table,
            dc_table: None,
        })
    }

    pub fn keying(&self) -> Keying {
        self.keying
    }

    pub fn has_dc_table(&self) -> bool {
        self.dc_table.is_some()
    }

    /// Table used for symbols of `class`
    #[inline]
    pub fn table_for(&self, class: SymbolClass) -> &HuffmanTable {
        match (class, &self.dc_table) {
            (SymbolClass::Dc, Some(dc)) => dc,
            _ => &self.table,
        }
    }
}

fn validate_keys(keying: Keying, entries: &[CodeLength]) -> Result<()> {
    for entry in entries {
        if entry.run > MAX_RUN {
            return Err(Error::codebook(format!("run {} exceeds {}", entry.run, MAX_RUN)));
        }
        if keying == Keying::RunSize && !(0..=MAX_MAGNITUDE_BITS as i32).contains(&entry.key) {
            return Err(Error::codebook(format!(
                "magnitude size {} outside 0..={}",
                entry.key, MAX_MAGNITUDE_BITS
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Training
// ============================================================================

/// Collects symbol statistics and builds a codebook from them
#[derive(Debug, Clone)]
pub struct CodebookBuilder {
    keying: Keying,
    split_dc: bool,
    quantizer: TransformQuantizer,
    dc_counts: BTreeMap<CodeKey, u64>,
    ac_counts: BTreeMap<CodeKey, u64>,
}

impl CodebookBuilder {
    pub fn new(keying: Keying, qp: Qp) -> Self {
        Self {
            keying,
            split_dc: false,
            quantizer: TransformQuantizer::new(qp),
            dc_counts: BTreeMap::new(),
            ac_counts: BTreeMap::new(),
        }
    }

    /// Build a separate DC table
    pub fn with_split_dc(mut self, split_dc: bool) -> Self {
        self.split_dc = split_dc;
        self
    }

    /// Count one symbol
    pub fn observe(&mut self, symbol: Symbol, class: SymbolClass) {
        let key = self.keying.key(symbol);
        let counts = match class {
            SymbolClass::Dc => &mut self.dc_counts,
            SymbolClass::Ac => &mut self.ac_counts,
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    /// Count the symbols one plane produces with a fresh DC predictor
    pub fn observe_plane(&mut self, plane: &Plane) -> Result<()> {
        let quantizer = self.quantizer;
        let mut predictor = DcPredictor::new();
        visit_symbols(plane, &quantizer, &mut predictor, |symbol, class| {
            self.observe(symbol, class);
            Ok(())
        })
    }

    /// Count the symbols of all three planes of a frame
    pub fn observe_frame(&mut self, frame: &YuvFrame) -> Result<()> {
        for plane in frame.planes() {
            self.observe_plane(plane)?;
        }
        Ok(())
    }

    /// Total symbols counted
    pub fn symbol_count(&self) -> u64 {
        self.dc_counts.values().chain(self.ac_counts.values()).sum()
    }

    /// Build the trained codebook
    pub fn build(&self) -> Result<Codebook> {
        let (table, dc_table) = if self.split_dc {
            (
                HuffmanTable::from_frequencies(&self.ac_counts)?,
                Some(HuffmanTable::from_frequencies(&self.dc_counts)?),
            )
        } else {
            let mut merged = self.ac_counts.clone();
            for (&key, &count) in &self.dc_counts {
                *merged.entry(key).or_insert(0) += count;
            }
            (HuffmanTable::from_frequencies(&merged)?, None)
        };

        info!(
            "Trained {:?} codebook from {} symbols: {} entries{}",
            self.keying,
            self.symbol_count(),
            table.len(),
            match &dc_table {
                Some(dc) => format!(" + {} DC entries", dc.len()),
                None => String::new(),
            }
        );

        Ok(Codebook {
            keying: self.keying,
            table,
            dc_table,
        })
    }
}
