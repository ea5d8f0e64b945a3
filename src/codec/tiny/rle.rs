//! Run-length coding of scanned coefficient vectors
//!
//! A block becomes a list of `(run, value)` symbols: the DC symbol first
//! (always emitted, run 0), then one symbol per non-zero AC coefficient with
//! `run` counting the zeros skipped since the previous emitted position. If
//! the last emitted position is not 15, an EOB `(0, 0)` closes the block.

use super::scan::ScanVector;
use super::tables::BLOCK_COEFFS;
use crate::error::{Error, Result};

/// A `(run, value)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub run: u8,
    pub value: i32,
}

impl Symbol {
    /// End of block: every remaining position is zero
    pub const EOB: Symbol = Symbol { run: 0, value: 0 };

    pub const fn new(run: u8, value: i32) -> Self {
        Self { run, value }
    }

    /// Whether this is `(0, 0)`
    ///
    /// Only meaningful for AC symbols; a DC symbol of value 0 has the same
    /// shape.
    #[inline]
    pub fn is_eob(&self) -> bool {
        self.run == 0 && self.value == 0
    }
}

/// Collapse a scanned block into symbols
pub fn collapse(coeffs: &ScanVector) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(4);
    collapse_into(coeffs, &mut out);
    out
}

/// Append the symbols of one block to `out`
pub fn collapse_into(coeffs: &ScanVector, out: &mut Vec<Symbol>) {
    out.push(Symbol::new(0, coeffs[0]));

    let mut last = 0usize;
    for (i, &value) in coeffs.iter().enumerate().skip(1) {
        if value == 0 {
            continue;
        }
        out.push(Symbol::new((i - last - 1) as u8, value));
        last = i;
    }

    if last != BLOCK_COEFFS - 1 {
        out.push(Symbol::EOB);
    }
}

/// Expand one block's symbols back into a scan vector
///
/// The slice must hold exactly one block: a DC symbol, then AC symbols up to
/// the 16th position or an EOB.
pub fn expand(symbols: &[Symbol]) -> Result<ScanVector> {
    let mut expander = BlockExpander::new();
    for (i, &symbol) in symbols.iter().enumerate() {
        if expander.push(symbol)? {
            if i + 1 != symbols.len() {
                return Err(Error::invalid_input(format!(
                    "{} symbols after end of block",
                    symbols.len() - i - 1
                )));
            }
            return Ok(expander.finish());
        }
    }
    Err(Error::invalid_input(format!(
        "block ended after {} of {} positions",
        expander.filled(),
        BLOCK_COEFFS
    )))
}

/// Incremental inverse of [`collapse`], fed one decoded symbol at a time
#[derive(Debug, Clone)]
pub struct BlockExpander {
    coeffs: ScanVector,
    filled: usize,
    complete: bool,
}

impl BlockExpander {
    pub fn new() -> Self {
        Self {
            coeffs: [0; BLOCK_COEFFS],
            filled: 0,
            complete: false,
        }
    }

    /// Scan positions written so far (including implied zeros)
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// True once the block has 16 positions or saw an EOB
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Add a symbol; returns whether the block is now complete
    pub fn push(&mut self, symbol: Symbol) -> Result<bool> {
        if self.complete {
            return Err(Error::invalid_input("symbol pushed after end of block"));
        }

        if self.filled == 0 {
            if symbol.run != 0 {
                return Err(Error::CorruptBlock {
                    position: 0,
                    run: symbol.run,
                });
            }
            self.coeffs[0] = symbol.value;
            self.filled = 1;
            return Ok(false);
        }

        if symbol.is_eob() {
            self.complete = true;
            return Ok(true);
        }

        let position = self.filled + symbol.run as usize;
        if position >= BLOCK_COEFFS {
            return Err(Error::CorruptBlock {
                position: self.filled,
                run: symbol.run,
            });
        }
        self.coeffs[position] = symbol.value;
        self.filled = position + 1;
        self.complete = self.filled == BLOCK_COEFFS;
        Ok(self.complete)
    }

    /// The expanded vector; unfilled positions are zero
    pub fn finish(self) -> ScanVector {
        self.coeffs
    }
}

impl Default for BlockExpander {
    fn default() -> Self {
        Self::new()
    }
}
