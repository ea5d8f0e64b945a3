//! Y4M (YUV4MPEG2) format support
//!
//! Raw 8-bit planar video with a one-line text header. Input may be 4:2:0,
//! 4:4:4 (chroma is decimated) or monochrome (chroma is mid-gray); output is
//! always 4:2:0.

pub mod demuxer;
pub mod muxer;

pub use demuxer::Y4mDemuxer;
pub use muxer::Y4mMuxer;
