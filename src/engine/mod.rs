// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Seams between the codec loops and the streaming engine that does the work.
//!
//! The engine is modeled as a producer of status events. The decode and encode
//! loops consume those events explicitly and own every buffer-sizing decision;
//! an engine only answers queries and writes into buffers it is handed.

mod libjxl;
#[cfg(test)]
pub(crate) mod scripted;

pub use libjxl::{LibjxlDecoder, LibjxlEncoder, check_signature};

use crate::error::EngineError;
use crate::types::{PixelFormat, StreamInfo};

/// Status returned by one step of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// The engine hit an internal or bitstream error.
    Error,
    /// The engine needs more input than was supplied.
    NeedMoreInput,
    /// Basic image info is available.
    BasicInfo,
    /// The color encoding of the pixel data is available.
    ColorEncoding,
    /// The engine needs a buffer for the full image.
    NeedImageOutBuffer,
    /// A full frame has been written to the image buffer.
    FullImage,
    /// Decoding finished.
    Success,
    /// Any status the loops do not handle, by raw code.
    Other(i32),
}

/// Streaming decoder with a growable image output buffer.
pub trait DecodeEngine {
    /// Runs the engine until it has something to report.
    fn process(&mut self) -> DecoderEvent;

    /// Valid after [`DecoderEvent::BasicInfo`].
    fn basic_info(&self) -> Result<StreamInfo, EngineError>;

    /// Resizes the work pool for an image of the given dimensions.
    fn scale_workers(&mut self, width: u32, height: u32);

    /// Valid after [`DecoderEvent::ColorEncoding`].
    fn icc_profile_size(&self) -> Result<usize, EngineError>;

    /// Fills `profile`, which must be exactly `icc_profile_size` bytes.
    fn read_icc_profile(&self, profile: &mut [u8]) -> Result<(), EngineError>;

    /// Bytes the engine needs for a full image in `format`.
    fn image_out_buffer_size(&self, format: &PixelFormat) -> Result<usize, EngineError>;

    /// Hands `buffer` to the engine, which writes decoded frames into it.
    ///
    /// The engine owns the buffer until [`DecodeEngine::take_image_buffer`].
    fn set_image_out_buffer(&mut self, format: &PixelFormat, buffer: Vec<u8>)
    -> Result<(), EngineError>;

    /// Takes back the buffer last passed to `set_image_out_buffer`.
    fn take_image_buffer(&mut self) -> Option<Vec<u8>>;
}

/// Status returned by one step of output draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStatus {
    Success,
    Error,
    NeedMoreOutput,
}

/// Basic image info declared to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderBasicInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u32,
    pub exponent_bits_per_sample: u32,
    pub uses_original_profile: bool,
    pub num_color_channels: u32,
    pub num_extra_channels: u32,
    pub alpha_bits: u32,
}

/// An alpha extra channel declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaChannel {
    pub bits_per_sample: u32,
    pub premultiplied: bool,
}

/// Fidelity requested for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameDistance {
    /// The engine's mathematically lossless mode.
    Lossless,
    /// Butteraugli distance, passed through unchanged.
    Distance(f32),
}

/// Streaming encoder producing compressed output into caller buffers.
pub trait EncodeEngine {
    fn set_basic_info(&mut self, info: &EncoderBasicInfo) -> Result<(), EngineError>;

    fn set_alpha_channel(&mut self, index: usize, alpha: &AlphaChannel) -> Result<(), EngineError>;

    fn set_color_encoding_srgb(&mut self, is_gray: bool) -> Result<(), EngineError>;

    fn set_frame_distance(&mut self, distance: FrameDistance) -> Result<(), EngineError>;

    /// Queues `pixels` as one frame. The engine copies the data.
    fn add_image_frame(&mut self, format: &PixelFormat, pixels: &[u8]) -> Result<(), EngineError>;

    /// Signals that no more frames follow.
    fn close_input(&mut self);

    /// Writes compressed bytes into `out`, returning the status and bytes written.
    fn process_output(&mut self, out: &mut [u8]) -> (EncoderStatus, usize);
}
