// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! One-shot encoding of packed 8-bit RGB/RGBA pixels.

use crate::buffer::{INITIAL_OUTPUT_CAPACITY, OutputArena};
use crate::conversions::{encode_pixel_format, image_buffer_size};
use crate::engine::{
    AlphaChannel, EncodeEngine, EncoderBasicInfo, EncoderStatus, FrameDistance, LibjxlEncoder,
};
use crate::error::{
    CodecError, EncodeStep, Result, clear_last_error, report_failure, set_last_error,
};
use crate::types::*;
use std::slice;
use tracing::{debug, trace};

/// Internal working precision declared to the encoder, independent of the 8-bit input.
const WORKING_BITS_PER_SAMPLE: u32 = 32;
const WORKING_EXPONENT_BITS: u32 = 8;

/// Encodes `request` into a JPEG XL codestream.
pub fn encode_image(request: &EncodeRequest<'_>) -> Result<Vec<u8>> {
    let mut engine = LibjxlEncoder::new()?;
    encode_with_engine(&mut engine, request)
}

pub(crate) fn encode_with_engine<E: EncodeEngine>(
    engine: &mut E,
    request: &EncodeRequest<'_>,
) -> Result<Vec<u8>> {
    let format = encode_pixel_format(request.color_space);
    let expected = image_buffer_size(request.width, request.height, &format)?;
    if request.pixels.len() != expected {
        return Err(CodecError::InvalidPixelBuffer {
            actual: request.pixels.len(),
            expected,
        });
    }

    configure(engine, request, &format)?;
    engine.close_input();

    drain(engine)
}

fn configure<E: EncodeEngine>(
    engine: &mut E,
    request: &EncodeRequest<'_>,
    format: &PixelFormat,
) -> Result<()> {
    let has_alpha = request.color_space.has_alpha();
    let lossless = request.compression == JxlCompressionOption::Lossless;

    let basic_info = EncoderBasicInfo {
        width: request.width,
        height: request.height,
        bits_per_sample: WORKING_BITS_PER_SAMPLE,
        exponent_bits_per_sample: WORKING_EXPONENT_BITS,
        uses_original_profile: lossless,
        num_color_channels: 3,
        num_extra_channels: u32::from(has_alpha),
        alpha_bits: if has_alpha { 8 } else { 0 },
    };
    engine
        .set_basic_info(&basic_info)
        .map_err(|_| CodecError::Configuration(EncodeStep::BasicInfo))?;

    // The alpha channel can only be described once basic info has declared it.
    if has_alpha {
        let alpha = AlphaChannel {
            bits_per_sample: 8,
            premultiplied: false,
        };
        engine
            .set_alpha_channel(0, &alpha)
            .map_err(|_| CodecError::Configuration(EncodeStep::ExtraChannel))?;
    }

    engine
        .set_color_encoding_srgb(format.channels < 3)
        .map_err(|_| CodecError::Configuration(EncodeStep::ColorEncoding))?;

    // Frame settings are captured when the frame is queued.
    let distance = if lossless {
        FrameDistance::Lossless
    } else {
        FrameDistance::Distance(request.distance)
    };
    engine
        .set_frame_distance(distance)
        .map_err(|_| CodecError::Configuration(EncodeStep::FrameDistance))?;

    engine
        .add_image_frame(format, request.pixels)
        .map_err(|_| CodecError::Configuration(EncodeStep::AddFrame))?;

    debug!(
        width = request.width,
        height = request.height,
        color_space = ?request.color_space,
        compression = ?request.compression,
        "encoder configured"
    );
    Ok(())
}

fn drain<E: EncodeEngine>(engine: &mut E) -> Result<Vec<u8>> {
    let mut output = OutputArena::with_capacity(INITIAL_OUTPUT_CAPACITY);

    loop {
        let (status, written) = engine.process_output(output.spare_mut());
        output.advance(written);
        trace!(?status, written, total = output.written(), "encoder output");

        match status {
            EncoderStatus::NeedMoreOutput => {
                output.grow();
                debug!(capacity = output.capacity(), "growing output buffer");
            }
            EncoderStatus::Success => return Ok(output.into_vec()),
            EncoderStatus::Error => return Err(CodecError::EncodeFailed),
        }
    }
}

// ============================================================================
// C API
// ============================================================================

/// Encodes packed 8-bit pixels into a JPEG XL codestream.
///
/// # Arguments
/// * `pixels` - `width * height * 3` (RGB) or `* 4` (RGBA) bytes.
/// * `distance` - Butteraugli distance, only used with `Lossy`.
/// * `out_data`, `out_len` - Receive the compressed bytes. Release them with
///   `jxl_buffer_free(out_data, out_len)`.
///
/// # Returns
/// `true` on success. On failure the outputs are untouched and
/// `jxl_get_last_error` describes the problem.
///
/// # Safety
/// - `pixels` must point to `pixels_len` readable bytes.
/// - `out_data` and `out_len` must be writable.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn jxl_encode_image(
    pixels: *const u8,
    pixels_len: usize,
    width: u32,
    height: u32,
    color_space: JxlColorSpace,
    compression: JxlCompressionOption,
    distance: f32,
    out_data: *mut *mut u8,
    out_len: *mut usize,
) -> bool {
    clear_last_error();

    if pixels.is_null() || out_data.is_null() || out_len.is_null() {
        set_last_error("Null pixel or output pointer");
        return false;
    }

    let request = EncodeRequest {
        pixels: unsafe { slice::from_raw_parts(pixels, pixels_len) },
        width,
        height,
        color_space,
        compression,
        distance,
    };

    match encode_image(&request) {
        Ok(encoded) => {
            let len = encoded.len();
            let data = Box::into_raw(encoded.into_boxed_slice()) as *mut u8;
            unsafe {
                *out_data = data;
                *out_len = len;
            }
            true
        }
        Err(e) => report_failure("encode image", &e),
    }
}

#[cfg(test)]
#[path = "encoder_tests.rs"]
mod tests;
