//! tinycodec - a 4x4 integer-transform intra video codec
//!
//! Frames are coded plane by plane in 4x4 blocks: integer core transform,
//! scalar quantization, DC prediction, a fixed 4x4 scan, run-length coding and
//! canonical Huffman codes. Decoding is the exact mirror of encoding.
//!
//! # Architecture
//!
//! - `codec::tiny`: the block codec, codebooks and session encoder/decoder
//! - `format::y4m`: YUV4MPEG2 input and output for the command-line tool
//! - `error`: crate-wide error type

pub mod codec;
pub mod error;
pub mod format;

pub use codec::tiny::{Codebook, EncoderConfig, Qp, StreamInfo, TinyDecoder, TinyEncoder, YuvFrame};
pub use error::{Error, Result};

/// tinycodec version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Configuration for the tinycodec library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of threads to use for parallel encoding
    pub max_threads: Option<usize>,
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the thread pool and logging
pub fn init(config: Config) -> Result<()> {
    if let Some(threads) = config.max_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| Error::config(format!("Failed to initialize thread pool: {}", e)))?;
    }

    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt().with_env_filter(level).init();
    }

    Ok(())
}
