//! Common test utilities for tinycodec integration tests
//!
//! Helpers for building deterministic test planes and frames, and for
//! writing them out as Y4M.

#![allow(dead_code)]

use tinycodec_lib::codec::tiny::{FrameRate, Plane, YuvFrame};
use tinycodec_lib::format::Y4mMuxer;

// ============================================================================
// Plane Generation
// ============================================================================

/// Diagonal gradient offset by `seed`
pub fn create_gradient_plane(width: usize, height: usize, seed: u8) -> Plane {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(((seed as usize + row * 3 + col * 2) % 256) as u8);
        }
    }
    Plane::new(width, height, data).expect("valid gradient plane")
}

/// Pseudo-random samples from a fixed LCG, so every run sees the same data
pub fn create_noise_plane(width: usize, height: usize, seed: u32) -> Plane {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let data = (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect();
    Plane::new(width, height, data).expect("valid noise plane")
}

/// Plane of 8x8 checkerboard squares alternating between `low` and `high`
pub fn create_checker_plane(width: usize, height: usize, low: u8, high: u8) -> Plane {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let on = ((row / 8) + (col / 8)) % 2 == 0;
            data.push(if on { high } else { low });
        }
    }
    Plane::new(width, height, data).expect("valid checker plane")
}

// ============================================================================
// Frame Generation
// ============================================================================

/// Gradient luma with gently varying chroma
pub fn create_test_frame(width: usize, height: usize, seed: u8) -> YuvFrame {
    YuvFrame::new(
        create_gradient_plane(width, height, seed),
        create_gradient_plane(width / 2, height / 2, seed.wrapping_add(64)),
        create_gradient_plane(width / 2, height / 2, seed.wrapping_add(128)),
    )
    .expect("valid test frame")
}

/// Noise in every plane; the hardest input for the entropy coder
pub fn create_noise_frame(width: usize, height: usize, seed: u32) -> YuvFrame {
    YuvFrame::new(
        create_noise_plane(width, height, seed),
        create_noise_plane(width / 2, height / 2, seed + 1),
        create_noise_plane(width / 2, height / 2, seed + 2),
    )
    .expect("valid noise frame")
}

/// A short sequence of distinct frames
pub fn create_test_sequence(width: usize, height: usize, count: usize) -> Vec<YuvFrame> {
    (0..count)
        .map(|i| create_test_frame(width, height, (i * 37) as u8))
        .collect()
}

// ============================================================================
// Y4M Helpers
// ============================================================================

/// Serialize frames as a 4:2:0 Y4M stream
pub fn frames_to_y4m(frames: &[YuvFrame]) -> Vec<u8> {
    let first = frames.first().expect("at least one frame");
    let mut data = Vec::new();
    {
        let mut muxer = Y4mMuxer::new(&mut data, first.width(), first.height(), FrameRate::new(30, 1))
            .expect("Y4M header");
        for frame in frames {
            muxer.write_frame(frame).expect("Y4M frame");
        }
    }
    data
}

// ============================================================================
// Verification Helpers
// ============================================================================

/// Largest absolute sample difference between two planes
pub fn max_abs_diff(a: &Plane, b: &Plane) -> u8 {
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}

/// Peak signal-to-noise ratio in dB (infinite for identical planes)
pub fn psnr(a: &Plane, b: &Plane) -> f64 {
    let mse: f64 = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        / a.data().len() as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}
