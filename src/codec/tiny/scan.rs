//! Zig-zag scan between 4x4 blocks and 16-entry vectors

use super::tables::{BLOCK_COEFFS, SCAN_ORDER};
use super::transform::Block;

/// Coefficients in scan order; index 0 is DC
pub type ScanVector = [i32; BLOCK_COEFFS];

/// Flatten a block in zig-zag order
pub fn zigzag(block: &Block) -> ScanVector {
    let mut out = [0i32; BLOCK_COEFFS];
    for (i, &(row, col)) in SCAN_ORDER.iter().enumerate() {
        out[i] = block.get(row, col);
    }
    out
}

/// Place scan-ordered values back into a block
///
/// Missing trailing entries are zero; anything beyond 16 values is ignored.
pub fn unzigzag(values: &[i32]) -> Block {
    let mut block = Block::ZERO;
    for (&(row, col), &value) in SCAN_ORDER.iter().zip(values) {
        block.set(row, col, value);
    }
    block
}
