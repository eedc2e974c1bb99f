// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Pixel format selection and buffer size calculations.

use crate::error::CodecError;
use crate::types::{Endianness, JxlColorSpace, PixelFormat, SampleType, StreamInfo};

// ============================================================================
// Decode Side
// ============================================================================

/// Output components for a stream: never fewer than 3, exactly 4 with any
/// extra channel.
pub(crate) fn output_components(num_color_channels: u32, num_extra_channels: u32) -> u32 {
    if num_extra_channels > 0 {
        4
    } else {
        num_color_channels.max(3)
    }
}

/// Sample type used for decoding: float16 above 8 bits, otherwise 8-bit integers.
pub(crate) fn output_sample_type(bits_per_sample: u32) -> SampleType {
    if bits_per_sample > 8 {
        SampleType::Float16
    } else {
        SampleType::Uint8
    }
}

/// Pixel format the decoder asks the engine for.
pub(crate) fn decode_pixel_format(info: &StreamInfo) -> PixelFormat {
    PixelFormat {
        channels: output_components(info.num_color_channels, info.num_extra_channels),
        sample_type: output_sample_type(info.bits_per_sample),
        endianness: Endianness::Native,
    }
}

/// `width * height * bytes_per_pixel`, or an error if it does not fit in `usize`.
pub(crate) fn image_buffer_size(
    width: u32,
    height: u32,
    format: &PixelFormat,
) -> Result<usize, CodecError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(format.bytes_per_pixel()))
        .ok_or(CodecError::DimensionOverflow)
}

// ============================================================================
// Encode Side
// ============================================================================

/// Pixel format of caller-supplied encoder input: 8-bit big-endian samples.
pub(crate) fn encode_pixel_format(color_space: JxlColorSpace) -> PixelFormat {
    PixelFormat {
        channels: color_space.channels(),
        sample_type: SampleType::Uint8,
        endianness: Endianness::Big,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JxlOrientation;
    use proptest::prelude::*;

    fn info(bits: u32, color: u32, extra: u32) -> StreamInfo {
        StreamInfo {
            width: 3,
            height: 2,
            bits_per_sample: bits,
            num_color_channels: color,
            num_extra_channels: extra,
            orientation: JxlOrientation::Identity,
        }
    }

    #[test]
    fn test_mono_is_promoted_to_rgb() {
        assert_eq!(output_components(1, 0), 3);
    }

    #[test]
    fn test_mono_with_alpha_is_rgba() {
        assert_eq!(output_components(1, 1), 4);
    }

    #[test]
    fn test_hdr_format_uses_float16() {
        let format = decode_pixel_format(&info(16, 3, 0));
        assert_eq!(format.sample_type, SampleType::Float16);
        assert_eq!(format.channels, 3);
        assert_eq!(image_buffer_size(3, 2, &format).unwrap(), 3 * 2 * 3 * 2);
    }

    #[test]
    fn test_encode_format_is_big_endian_u8() {
        let format = encode_pixel_format(JxlColorSpace::Rgba);
        assert_eq!(format.channels, 4);
        assert_eq!(format.sample_type, SampleType::Uint8);
        assert_eq!(format.endianness, Endianness::Big);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn test_buffer_size_overflow() {
        let format = decode_pixel_format(&info(8, 3, 1));
        assert_eq!(
            image_buffer_size(u32::MAX, u32::MAX, &format),
            Err(CodecError::DimensionOverflow)
        );
    }

    proptest! {
        #[test]
        fn components_never_below_three(color in 0u32..8, extra in 0u32..4) {
            let components = output_components(color, extra);
            prop_assert!(components >= 3);
            if extra > 0 {
                prop_assert_eq!(components, 4);
            }
        }

        #[test]
        fn sample_width_follows_bit_depth(bits in 1u32..=32) {
            let width = output_sample_type(bits).byte_width();
            prop_assert_eq!(width, if bits > 8 { 2 } else { 1 });
        }

        #[test]
        fn buffer_size_is_product_of_dimensions(
            width in 1u32..4096,
            height in 1u32..4096,
            bits in 1u32..=32,
            extra in 0u32..3,
        ) {
            let format = decode_pixel_format(&info(bits, 3, extra));
            let expected = width as usize
                * height as usize
                * format.channels as usize
                * if bits > 8 { 2 } else { 1 };
            prop_assert_eq!(image_buffer_size(width, height, &format).unwrap(), expected);
        }
    }
}
