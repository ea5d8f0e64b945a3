//! Forward/inverse 4x4 integer transform and scalar quantization
//!
//! The forward path is `Z = trunc((C * X * C^T) .* M(QP) / 2^(15 + QP/6))`
//! on raw 8-bit samples. The inverse path rescales with the matching `V`
//! table, runs the integer inverse core transform (half-tap butterflies) and
//! rounds with `(x + 32) >> 6`. All arithmetic is integer, so results are
//! identical whether blocks are processed one at a time or in bulk.

use super::tables::{ScaleClass, BLOCK_SIZE, CORE_TRANSFORM, QUANT_SHIFT_BASE};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantization parameter in [0, 51], fixed for a whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Qp(u8);

impl Qp {
    /// Smallest (finest) QP
    pub const MIN: u8 = 0;
    /// Largest (coarsest) QP
    pub const MAX: u8 = 51;

    /// Validate and wrap a QP value
    pub fn new(value: i64) -> Result<Self> {
        if value < Self::MIN as i64 || value > Self::MAX as i64 {
            return Err(Error::QpOutOfRange(value));
        }
        Ok(Qp(value as u8))
    }

    /// Raw QP value
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Scale table row, `QP % 6`
    #[inline]
    pub const fn phase(self) -> usize {
        (self.0 % 6) as usize
    }

    /// Right shift after forward scaling, `15 + QP / 6`
    #[inline]
    pub const fn shift(self) -> u32 {
        QUANT_SHIFT_BASE + (self.0 / 6) as u32
    }

    /// Left shift applied when rescaling, `QP / 6`
    #[inline]
    pub const fn rescale_shift(self) -> u32 {
        (self.0 / 6) as u32
    }
}

impl Default for Qp {
    fn default() -> Self {
        Qp(24)
    }
}

impl fmt::Display for Qp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Qp {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Qp::new(value)
    }
}

impl From<Qp> for u8 {
    fn from(qp: Qp) -> u8 {
        qp.0
    }
}

/// A 4x4 matrix of integers: samples, transform coefficients or quantized levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Block(pub [[i32; BLOCK_SIZE]; BLOCK_SIZE]);

impl Block {
    /// All-zero block
    pub const ZERO: Block = Block([[0; BLOCK_SIZE]; BLOCK_SIZE]);

    /// Block from row-major rows
    pub const fn from_rows(rows: [[i32; BLOCK_SIZE]; BLOCK_SIZE]) -> Self {
        Block(rows)
    }

    /// Block with every entry set to `value`
    pub const fn filled(value: i32) -> Self {
        Block([[value; BLOCK_SIZE]; BLOCK_SIZE])
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.0[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: i32) {
        self.0[row][col] = value;
    }

    /// Top-left (DC) entry
    #[inline]
    pub fn dc(&self) -> i32 {
        self.0[0][0]
    }

    pub fn rows(&self) -> &[[i32; BLOCK_SIZE]; BLOCK_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().flatten().all(|&v| v == 0)
    }

    /// Number of non-zero entries
    pub fn nonzero_count(&self) -> usize {
        self.0.iter().flatten().filter(|&&v| v != 0).count()
    }
}

/// Forward transform + quantization and its inverse for one QP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformQuantizer {
    qp: Qp,
}

impl TransformQuantizer {
    /// Create a quantizer for `qp`
    pub fn new(qp: Qp) -> Self {
        Self { qp }
    }

    pub fn qp(&self) -> Qp {
        self.qp
    }

    /// Transform and quantize a block of samples
    ///
    /// Division truncates toward zero, so negative coefficients are not
    /// biased away from zero.
    pub fn forward(&self, samples: &Block) -> Block {
        let coeffs = forward_core_transform(samples);
        let phase = self.qp.phase();
        let divisor = 1i64 << self.qp.shift();

        let mut out = Block::ZERO;
        for row in 0..BLOCK_SIZE {
            for col in 0..BLOCK_SIZE {
                let scaled = coeffs[row][col] * ScaleClass::of(row, col).scale(phase);
                out.0[row][col] = (scaled / divisor) as i32;
            }
        }
        out
    }

    /// Rescale quantized levels back to transform-domain magnitudes
    pub fn dequantize(&self, levels: &Block) -> [[i64; BLOCK_SIZE]; BLOCK_SIZE] {
        let phase = self.qp.phase();
        let shift = self.qp.rescale_shift();

        let mut out = [[0i64; BLOCK_SIZE]; BLOCK_SIZE];
        for row in 0..BLOCK_SIZE {
            for col in 0..BLOCK_SIZE {
                let rescale = ScaleClass::of(row, col).rescale(phase);
                out[row][col] = (levels.0[row][col] as i64 * rescale) << shift;
            }
        }
        out
    }

    /// Reconstruct 8-bit samples from quantized levels
    ///
    /// Output entries are clamped to [0, 255].
    pub fn inverse(&self, levels: &Block) -> Block {
        let rescaled = self.dequantize(levels);
        let residual = inverse_core_transform(&rescaled);

        let mut out = Block::ZERO;
        for row in 0..BLOCK_SIZE {
            for col in 0..BLOCK_SIZE {
                out.0[row][col] = residual[row][col].clamp(0, 255) as i32;
            }
        }
        out
    }
}

/// `C * X * C^T` with the integer core matrix
pub fn forward_core_transform(samples: &Block) -> [[i64; BLOCK_SIZE]; BLOCK_SIZE] {
    let mut temp = [[0i64; BLOCK_SIZE]; BLOCK_SIZE];
    for row in 0..BLOCK_SIZE {
        for col in 0..BLOCK_SIZE {
            temp[row][col] = (0..BLOCK_SIZE)
                .map(|k| CORE_TRANSFORM[row][k] * samples.0[k][col] as i64)
                .sum();
        }
    }

    let mut out = [[0i64; BLOCK_SIZE]; BLOCK_SIZE];
    for row in 0..BLOCK_SIZE {
        for col in 0..BLOCK_SIZE {
            out[row][col] = (0..BLOCK_SIZE)
                .map(|k| temp[row][k] * CORE_TRANSFORM[col][k])
                .sum();
        }
    }
    out
}

/// One 1-D pass of the inverse core transform
#[inline]
fn inverse_butterfly(d: [i64; 4]) -> [i64; 4] {
    let e0 = d[0] + d[2];
    let e1 = d[0] - d[2];
    let e2 = (d[1] >> 1) - d[3];
    let e3 = d[1] + (d[3] >> 1);
    [e0 + e3, e1 + e2, e1 - e2, e0 - e3]
}

/// Inverse core transform (rows, then columns) with final `(x + 32) >> 6`
pub fn inverse_core_transform(
    coeffs: &[[i64; BLOCK_SIZE]; BLOCK_SIZE],
) -> [[i64; BLOCK_SIZE]; BLOCK_SIZE] {
    let mut temp = [[0i64; BLOCK_SIZE]; BLOCK_SIZE];
    for row in 0..BLOCK_SIZE {
        temp[row] = inverse_butterfly(coeffs[row]);
    }

    let mut out = [[0i64; BLOCK_SIZE]; BLOCK_SIZE];
    for col in 0..BLOCK_SIZE {
        let column = inverse_butterfly([temp[0][col], temp[1][col], temp[2][col], temp[3][col]]);
        for row in 0..BLOCK_SIZE {
            out[row][col] = (column[row] + 32) >> 6;
        }
    }
    out
}
