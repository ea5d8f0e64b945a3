//! Codec implementations

pub mod tiny;

pub use tiny::{
    Codebook, DcReset, EncoderConfig, FrameCodec, Plane, PlaneCodec, Qp, StreamInfo,
    TinyDecoder, TinyEncoder, YuvFrame,
};
