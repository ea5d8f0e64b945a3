//! Tiny 4x4 integer-transform intra codec
//!
//! Every plane of a 4:2:0 frame is cut into 4x4 tiles. Each tile is
//! transformed with the integer core transform, quantized at a session-wide
//! QP, DC-predicted against the previous tile of the same plane, scanned,
//! run-length coded and written with a canonical Huffman codebook.
//!
//! The bitstream has no header and no delimiters: frame size, QP and frame
//! count travel in a [`StreamInfo`] sidecar, and the decoder finds block,
//! plane and frame boundaries by counting.

pub mod bitstream;
pub mod config;
pub mod dc;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod huffman;
pub mod plane;
pub mod rle;
pub mod scan;
pub mod tables;
pub mod transform;
pub mod vlc;

pub use config::{DcReset, EncoderConfig, FrameRate, StreamInfo};
pub use decoder::{decode_all, TinyDecoder};
pub use encoder::{encode_frames, TinyEncoder};
pub use frame::{FrameCodec, FrameDcState, PlaneKind, YuvFrame};
pub use huffman::{Codebook, CodebookAsset, CodebookBuilder, Keying};
pub use plane::{Plane, PlaneCodec};
pub use transform::{Block, Qp, TransformQuantizer};
