// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! One-shot decoding: full images and basic-info probes.

use crate::conversions::{decode_pixel_format, image_buffer_size};
use crate::engine::{DecodeEngine, DecoderEvent, LibjxlDecoder};
use crate::error::{CodecError, Result, clear_last_error, report_failure, set_last_error};
use crate::types::*;
use std::slice;
use tracing::{debug, trace};

/// Decodes a complete JPEG XL image with default options.
pub fn decode_image(data: &[u8]) -> Result<DecodedImage> {
    decode_image_with_options(data, &DecodeOptions::default())
}

/// Decodes a complete JPEG XL image.
///
/// For animations only the last frame is returned.
pub fn decode_image_with_options(data: &[u8], options: &DecodeOptions) -> Result<DecodedImage> {
    let mut engine = LibjxlDecoder::new(data, options)?;
    decode_with_engine(&mut engine, options)
}

/// Reads only the image dimensions, without allocating a pixel buffer.
pub fn decode_basic_info(data: &[u8]) -> Result<ImageSize> {
    let mut engine = LibjxlDecoder::new(data, &DecodeOptions::default())?;
    basic_info_with_engine(&mut engine)
}

/// Checks whether `data` starts like a JPEG XL codestream or container.
pub fn check_signature(data: &[u8]) -> JxlSignature {
    crate::engine::check_signature(data)
}

/// What the decode loop has learned from the basic info event.
struct Discovered {
    info: StreamInfo,
    format: PixelFormat,
}

pub(crate) fn decode_with_engine<E: DecodeEngine>(
    engine: &mut E,
    options: &DecodeOptions,
) -> Result<DecodedImage> {
    let mut discovered: Option<Discovered> = None;
    let mut icc_profile = Vec::new();

    loop {
        let event = engine.process();
        trace!(?event, "decoder event");

        match event {
            DecoderEvent::Error => return Err(CodecError::DecodeFailed),
            DecoderEvent::NeedMoreInput => return Err(CodecError::TruncatedInput),
            DecoderEvent::BasicInfo => {
                let info = engine.basic_info()?;
                let format = decode_pixel_format(&info);
                debug!(
                    width = info.width,
                    height = info.height,
                    bit_depth = info.bits_per_sample,
                    components = format.channels,
                    float_samples = format.sample_type == SampleType::Float16,
                    "basic info"
                );

                if let Some(limit) = options.pixel_limit {
                    let pixels = u64::from(info.width) * u64::from(info.height);
                    if pixels > limit as u64 {
                        return Err(CodecError::PixelLimitExceeded { pixels, limit });
                    }
                }

                engine.scale_workers(info.width, info.height);
                discovered = Some(Discovered { info, format });
            }
            DecoderEvent::ColorEncoding => {
                let size = engine.icc_profile_size()?;
                icc_profile = vec![0; size];
                engine.read_icc_profile(&mut icc_profile)?;
                debug!(size, "icc profile");
            }
            DecoderEvent::NeedImageOutBuffer => {
                let Some(Discovered { info, format }) = discovered.as_ref() else {
                    return Err(CodecError::UnexpectedEvent {
                        event,
                        stage: "waiting for basic info",
                    });
                };

                let required = engine.image_out_buffer_size(format)?;
                let expected = image_buffer_size(info.width, info.height, format)?;
                if required != expected {
                    return Err(CodecError::BufferSizeMismatch { required, expected });
                }

                // Reuse the previous frame's buffer; it has the same size.
                let mut pixels = engine.take_image_buffer().unwrap_or_default();
                pixels.resize(expected, 0);
                debug!(size = expected, "image out buffer");
                engine.set_image_out_buffer(format, pixels)?;
            }
            DecoderEvent::FullImage => {
                // Animations keep going; the next frame overwrites this one.
            }
            DecoderEvent::Success => {
                let Some(Discovered { info, format }) = discovered else {
                    return Err(CodecError::UnexpectedEvent {
                        event,
                        stage: "waiting for basic info",
                    });
                };
                let Some(pixels) = engine.take_image_buffer() else {
                    return Err(CodecError::UnexpectedEvent {
                        event,
                        stage: "waiting for an image buffer request",
                    });
                };

                return Ok(DecodedImage {
                    width: info.width,
                    height: info.height,
                    bit_depth: info.bits_per_sample,
                    components: format.channels,
                    uses_float_samples: format.sample_type == SampleType::Float16,
                    orientation: info.orientation,
                    icc_profile,
                    pixels,
                });
            }
            DecoderEvent::Other(_) => {
                return Err(CodecError::UnexpectedEvent {
                    event,
                    stage: "decoding",
                });
            }
        }
    }
}

pub(crate) fn basic_info_with_engine<E: DecodeEngine>(engine: &mut E) -> Result<ImageSize> {
    // Basic info is always the first subscribed event, so one step settles it.
    let event = engine.process();
    trace!(?event, "decoder event");

    match event {
        DecoderEvent::Error => Err(CodecError::DecodeFailed),
        DecoderEvent::NeedMoreInput => Err(CodecError::TruncatedInput),
        DecoderEvent::BasicInfo => {
            let info = engine.basic_info()?;
            Ok(ImageSize {
                width: info.width,
                height: info.height,
            })
        }
        _ => Err(CodecError::UnexpectedEvent {
            event,
            stage: "probing basic info",
        }),
    }
}

// ============================================================================
// C API
// ============================================================================

fn into_raw_parts(bytes: Vec<u8>) -> (*mut u8, usize) {
    if bytes.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = bytes.len();
    let ptr = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    (ptr, len)
}

/// Frees a buffer returned by this library.
///
/// # Safety
/// `data` and `len` must come from a single buffer handed out by this library,
/// and the buffer must not be freed twice. Null is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_buffer_free(data: *mut u8, len: usize) {
    if !data.is_null() {
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(data, len)));
        }
    }
}

/// Decodes a complete JPEG XL image.
///
/// # Returns
/// `true` on success, with `image` populated. On failure `image` is left
/// untouched and `jxl_get_last_error` describes the problem.
/// Release the buffers with `jxl_decoded_image_free`.
///
/// # Safety
/// - `data` must point to `size` readable bytes.
/// - `image` must point to a writable `JxlDecodedImage`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_decode_image(
    data: *const u8,
    size: usize,
    image: *mut JxlDecodedImage,
) -> bool {
    clear_last_error();

    if data.is_null() || image.is_null() {
        set_last_error("Null data or image pointer");
        return false;
    }

    let bytes = unsafe { slice::from_raw_parts(data, size) };
    let decoded = match decode_image(bytes) {
        Ok(decoded) => decoded,
        Err(e) => return report_failure("decode image", &e),
    };

    let (pixels, pixels_len) = into_raw_parts(decoded.pixels);
    let (icc, icc_len) = into_raw_parts(decoded.icc_profile);
    unsafe {
        *image = JxlDecodedImage {
            Pixels: pixels,
            PixelsLength: pixels_len,
            IccProfile: icc,
            IccProfileLength: icc_len,
            Width: decoded.width,
            Height: decoded.height,
            BitDepth: decoded.bit_depth,
            Components: decoded.components,
            Orientation: decoded.orientation,
            UseFloats: decoded.uses_float_samples,
        };
    }

    true
}

/// Releases the buffers of an image filled by `jxl_decode_image` and resets it.
///
/// # Safety
/// `image` must be null or point to an image filled by `jxl_decode_image`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_decoded_image_free(image: *mut JxlDecodedImage) {
    let Some(image) = (unsafe { image.as_mut() }) else {
        return;
    };

    unsafe {
        jxl_buffer_free(image.Pixels, image.PixelsLength);
        jxl_buffer_free(image.IccProfile, image.IccProfileLength);
    }
    *image = JxlDecodedImage::default();
}

/// Reads the image dimensions without decoding pixels.
///
/// # Safety
/// - `data` must point to `size` readable bytes.
/// - `width` and `height` must point to writable `usize` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_decode_basic_info(
    data: *const u8,
    size: usize,
    width: *mut usize,
    height: *mut usize,
) -> bool {
    clear_last_error();

    if data.is_null() || width.is_null() || height.is_null() {
        set_last_error("Null data or output pointer");
        return false;
    }

    let bytes = unsafe { slice::from_raw_parts(data, size) };
    match decode_basic_info(bytes) {
        Ok(dimensions) => {
            unsafe {
                *width = dimensions.width as usize;
                *height = dimensions.height as usize;
            }
            true
        }
        Err(e) => report_failure("decode basic info", &e),
    }
}

/// Checks if data appears to be a JPEG XL file.
///
/// Only needs the first 12 bytes to determine.
///
/// # Safety
/// `data` must be valid for reads of `size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_signature_check(data: *const u8, size: usize) -> JxlSignature {
    if data.is_null() || size == 0 {
        return JxlSignature::NotEnoughBytes;
    }

    let bytes = unsafe { slice::from_raw_parts(data, size) };
    check_signature(bytes)
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
