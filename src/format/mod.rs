//! Container format handling
//!
//! The tiny bitstream itself has no container; this module only covers the
//! raw YUV4MPEG2 files the command-line tool reads frames from and writes
//! reconstructions to.

pub mod y4m;

pub use self::y4m::{Y4mDemuxer, Y4mMuxer};
