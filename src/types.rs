// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Public data types shared by the Rust API and the C API.

/// Color layout of the pixels handed to the encoder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JxlColorSpace {
    /// Red, green, blue; 3 bytes per pixel.
    Rgb = 0,
    /// Red, green, blue, alpha; 4 bytes per pixel.
    Rgba = 1,
}

impl JxlColorSpace {
    /// Number of interleaved 8-bit channels per pixel.
    pub fn channels(self) -> u32 {
        match self {
            JxlColorSpace::Rgb => 3,
            JxlColorSpace::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == JxlColorSpace::Rgba
    }
}

/// Compression policy for the encoder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JxlCompressionOption {
    /// Mathematically lossless; the distance parameter is ignored.
    Lossless = 0,
    /// Lossy; the distance parameter is passed to the engine verbatim.
    Lossy = 1,
}

/// Image orientation (EXIF-style), passed through from the source stream.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JxlOrientation {
    /// Normal orientation.
    #[default]
    Identity = 1,
    /// Flipped horizontally.
    FlipHorizontal = 2,
    /// Rotated 180 degrees.
    Rotate180 = 3,
    /// Flipped vertically.
    FlipVertical = 4,
    /// Transposed (swap x/y) then flipped horizontally.
    Transpose = 5,
    /// Rotated 90 degrees clockwise.
    Rotate90Cw = 6,
    /// Transposed then flipped vertically.
    AntiTranspose = 7,
    /// Rotated 90 degrees counter-clockwise.
    Rotate90Ccw = 8,
}

impl JxlOrientation {
    /// Maps a raw orientation code to the enum. Codes outside 1..=8 yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => JxlOrientation::Identity,
            2 => JxlOrientation::FlipHorizontal,
            3 => JxlOrientation::Rotate180,
            4 => JxlOrientation::FlipVertical,
            5 => JxlOrientation::Transpose,
            6 => JxlOrientation::Rotate90Cw,
            7 => JxlOrientation::AntiTranspose,
            8 => JxlOrientation::Rotate90Ccw,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Signature check result.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JxlSignature {
    /// Not enough data to determine.
    NotEnoughBytes = 0,
    /// Not a JPEG XL file.
    Invalid = 1,
    /// Valid JPEG XL codestream.
    Codestream = 2,
    /// Valid JPEG XL container.
    Container = 3,
}

/// Sample type of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    /// 8-bit unsigned integer per channel.
    Uint8,
    /// 16-bit IEEE half float per channel.
    Float16,
}

impl SampleType {
    /// Bytes occupied by a single sample.
    pub fn byte_width(self) -> usize {
        match self {
            SampleType::Uint8 => 1,
            SampleType::Float16 => 2,
        }
    }
}

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Native,
    Big,
}

/// Interleaved pixel layout exchanged with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub channels: u32,
    pub sample_type: SampleType,
    pub endianness: Endianness,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels as usize * self.sample_type.byte_width()
    }
}

/// Image metadata discovered by the decoder before any pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u32,
    pub num_color_channels: u32,
    pub num_extra_channels: u32,
    pub orientation: JxlOrientation,
}

/// Width and height of an image, as reported by a basic-info probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A fully decoded image.
///
/// `pixels` holds `width * height * components` interleaved samples. Samples are
/// 8-bit integers, or native-endian float16 when `uses_float_samples` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Bits per sample declared by the source stream.
    pub bit_depth: u32,
    /// 3 or 4.
    pub components: u32,
    pub uses_float_samples: bool,
    pub orientation: JxlOrientation,
    /// ICC profile of the pixel data, verbatim. May be empty.
    pub icc_profile: Vec<u8>,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Bytes per sample in `pixels`.
    pub fn sample_byte_width(&self) -> usize {
        if self.uses_float_samples {
            SampleType::Float16.byte_width()
        } else {
            SampleType::Uint8.byte_width()
        }
    }

    /// Float16 bit patterns of every sample, or `None` for 8-bit images.
    pub fn float16_samples(&self) -> Option<Vec<u16>> {
        self.uses_float_samples
            .then(|| bytemuck::pod_collect_to_vec::<u8, u16>(&self.pixels))
    }
}

/// Everything the encoder needs for a single call.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    /// Tightly packed 8-bit samples, `color_space.channels()` per pixel.
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub color_space: JxlColorSpace,
    pub compression: JxlCompressionOption,
    /// Butteraugli distance; only read for [`JxlCompressionOption::Lossy`].
    pub distance: f32,
}

/// Decoder options.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Leave pixels in stored orientation and report the orientation code instead.
    pub keep_orientation: bool,
    /// Deliver alpha unpremultiplied.
    pub unpremultiply_alpha: bool,
    /// Maximum number of pixels to decode. `None` = no limit.
    pub pixel_limit: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            keep_orientation: true,
            unpremultiply_alpha: true,
            pixel_limit: None,
        }
    }
}

/// Decoded image handed across the C API.
///
/// Buffers are owned by the library; release them with `jxl_decoded_image_free`.
/// Fields are ordered by size (largest first) to minimize padding.
#[repr(C)]
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct JxlDecodedImage {
    /// Interleaved pixel samples.
    pub Pixels: *mut u8,
    /// Length of `Pixels` in bytes.
    pub PixelsLength: usize,
    /// ICC profile bytes, or null when the profile is empty.
    pub IccProfile: *mut u8,
    /// Length of `IccProfile` in bytes.
    pub IccProfileLength: usize,
    /// Image width in pixels.
    pub Width: u32,
    /// Image height in pixels.
    pub Height: u32,
    /// Bits per sample of the source stream.
    pub BitDepth: u32,
    /// Samples per pixel (3 or 4).
    pub Components: u32,
    /// Image orientation.
    pub Orientation: JxlOrientation,
    /// Whether samples are float16 rather than 8-bit integers.
    pub UseFloats: bool,
}

impl Default for JxlDecodedImage {
    fn default() -> Self {
        Self {
            Pixels: std::ptr::null_mut(),
            PixelsLength: 0,
            IccProfile: std::ptr::null_mut(),
            IccProfileLength: 0,
            Width: 0,
            Height: 0,
            BitDepth: 0,
            Components: 0,
            Orientation: JxlOrientation::Identity,
            UseFloats: false,
        }
    }
}
