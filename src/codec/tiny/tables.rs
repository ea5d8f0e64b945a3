//! Constant tables for the tiny codec
//!
//! The forward scale constants are the H.264 4x4 `MF` multipliers; the
//! rescale constants are the matching `V` table used by the decoder. Both
//! are indexed by `QP % 6` and by the parity class of the coefficient
//! position.

/// Side length of a transform block
pub const BLOCK_SIZE: usize = 4;

/// Number of coefficients in a transform block
pub const BLOCK_COEFFS: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Integer core transform matrix `C` (forward transform is `C * X * C^T`)
pub const CORE_TRANSFORM: [[i64; 4]; 4] = [
    [1, 1, 1, 1],
    [2, 1, -1, -2],
    [1, -1, -1, 1],
    [1, -2, 2, -1],
];

/// Forward scale for positions whose row and column are both even
pub const SCALE_EVEN: [i64; 6] = [13107, 11916, 10082, 9362, 8192, 7282];

/// Forward scale for positions whose row and column are both odd
pub const SCALE_ODD: [i64; 6] = [5243, 4660, 4194, 3647, 3355, 2893];

/// Forward scale for mixed-parity positions
pub const SCALE_MIXED: [i64; 6] = [8066, 7490, 6554, 5825, 5243, 4559];

/// Rescale for positions whose row and column are both even
pub const RESCALE_EVEN: [i64; 6] = [10, 11, 13, 14, 16, 18];

/// Rescale for positions whose row and column are both odd
pub const RESCALE_ODD: [i64; 6] = [16, 18, 20, 23, 25, 29];

/// Rescale for mixed-parity positions
pub const RESCALE_MIXED: [i64; 6] = [13, 14, 16, 18, 20, 23];

/// Base right shift applied after forward scaling (plus `QP / 6`)
pub const QUANT_SHIFT_BASE: u32 = 15;

/// Scan order as (row, col) pairs: scan position `i` reads `SCAN_ORDER[i]`
///
/// Specific to 4x4 blocks; it is not the classic 8x8 zigzag restricted to
/// the top-left corner.
pub const SCAN_ORDER: [(usize, usize); BLOCK_COEFFS] = [
    (0, 0),
    (0, 1),
    (1, 0),
    (2, 0),
    (1, 1),
    (0, 2),
    (0, 3),
    (1, 2),
    (2, 1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (2, 3),
    (3, 2),
    (3, 3),
];

/// Parity class of a coefficient position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleClass {
    /// Row and column both even
    Even,
    /// Row and column both odd
    Odd,
    /// One even, one odd
    Mixed,
}

impl ScaleClass {
    /// Classify position `(row, col)`
    #[inline]
    pub fn of(row: usize, col: usize) -> Self {
        match (row % 2, col % 2) {
            (0, 0) => ScaleClass::Even,
            (1, 1) => ScaleClass::Odd,
            _ => ScaleClass::Mixed,
        }
    }

    /// Forward scale constant for this class at `phase = QP % 6`
    #[inline]
    pub fn scale(self, phase: usize) -> i64 {
        match self {
            ScaleClass::Even => SCALE_EVEN[phase],
            ScaleClass::Odd => SCALE_ODD[phase],
            ScaleClass::Mixed => SCALE_MIXED[phase],
        }
    }

    /// Inverse rescale constant for this class at `phase = QP % 6`
    #[inline]
    pub fn rescale(self, phase: usize) -> i64 {
        match self {
            ScaleClass::Even => RESCALE_EVEN[phase],
            ScaleClass::Odd => RESCALE_ODD[phase],
            ScaleClass::Mixed => RESCALE_MIXED[phase],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_class_pattern() {
        // [[A,C,A,C],[C,B,C,B],[A,C,A,C],[C,B,C,B]]
        let expected = [
            [ScaleClass::Even, ScaleClass::Mixed, ScaleClass::Even, ScaleClass::Mixed],
            [ScaleClass::Mixed, ScaleClass::Odd, ScaleClass::Mixed, ScaleClass::Odd],
            [ScaleClass::Even, ScaleClass::Mixed, ScaleClass::Even, ScaleClass::Mixed],
            [ScaleClass::Mixed, ScaleClass::Odd, ScaleClass::Mixed, ScaleClass::Odd],
        ];
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(ScaleClass::of(row, col), expected[row][col]);
            }
        }
    }

    #[test]
    fn test_scan_order_is_permutation() {
        let mut seen = [false; BLOCK_COEFFS];
        for &(row, col) in SCAN_ORDER.iter() {
            let idx = row * BLOCK_SIZE + col;
            assert!(!seen[idx], "position ({}, {}) visited twice", row, col);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_scale_tables_decrease_with_phase() {
        for table in [SCALE_EVEN, SCALE_ODD, SCALE_MIXED] {
            for w in table.windows(2) {
                assert!(w[0] > w[1]);
            }
        }
    }
}
