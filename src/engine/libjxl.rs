// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! libjxl-backed engines.
//!
//! Every raw handle is wrapped in a guard that releases it on drop, so the codec
//! loops can bail out with `?` at any point without leaking.

use super::{
    AlphaChannel, DecodeEngine, DecoderEvent, EncodeEngine, EncoderBasicInfo, EncoderStatus,
    FrameDistance,
};
use crate::error::EngineError;
use crate::types::{
    DecodeOptions, Endianness, JxlOrientation, JxlSignature, PixelFormat, SampleType, StreamInfo,
};
use jpegxl_sys::color::color_encoding::JxlColorEncoding;
use jpegxl_sys::common::types::{JxlBool, JxlDataType, JxlEndianness, JxlPixelFormat};
use jpegxl_sys::decode::{
    JxlColorProfileTarget, JxlDecoder, JxlDecoderCloseInput, JxlDecoderCreate, JxlDecoderDestroy,
    JxlDecoderGetBasicInfo, JxlDecoderGetColorAsICCProfile, JxlDecoderGetICCProfileSize,
    JxlDecoderImageOutBufferSize, JxlDecoderProcessInput, JxlDecoderSetImageOutBuffer,
    JxlDecoderSetInput, JxlDecoderSetKeepOrientation, JxlDecoderSetParallelRunner,
    JxlDecoderSetUnpremultiplyAlpha, JxlDecoderStatus, JxlDecoderSubscribeEvents,
    JxlSignature as UpstreamSignature, JxlSignatureCheck,
};
use jpegxl_sys::encoder::encode::{
    JxlColorEncodingSetToSRGB, JxlEncoder, JxlEncoderAddImageFrame, JxlEncoderCloseInput,
    JxlEncoderCreate, JxlEncoderDestroy, JxlEncoderFrameSettings, JxlEncoderFrameSettingsCreate,
    JxlEncoderInitBasicInfo, JxlEncoderInitExtraChannelInfo, JxlEncoderProcessOutput,
    JxlEncoderSetBasicInfo, JxlEncoderSetColorEncoding, JxlEncoderSetExtraChannelInfo,
    JxlEncoderSetFrameDistance, JxlEncoderSetFrameLossless, JxlEncoderSetParallelRunner,
    JxlEncoderStatus,
};
use jpegxl_sys::metadata::codestream_header::{
    JxlBasicInfo, JxlExtraChannelInfo, JxlExtraChannelType,
};
use jpegxl_sys::threads::resizable_parallel_runner::{
    JxlResizableParallelRunner, JxlResizableParallelRunnerCreate,
    JxlResizableParallelRunnerDestroy, JxlResizableParallelRunnerSetThreads,
    JxlResizableParallelRunnerSuggestThreads,
};
use jpegxl_sys::threads::thread_parallel_runner::{
    JxlThreadParallelRunner, JxlThreadParallelRunnerCreate,
    JxlThreadParallelRunnerDefaultNumWorkerThreads, JxlThreadParallelRunnerDestroy,
};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

fn jxl_bool(value: bool) -> JxlBool {
    if value { JxlBool::True } else { JxlBool::False }
}

fn check_dec(status: JxlDecoderStatus, call: &'static str) -> Result<(), EngineError> {
    match status {
        JxlDecoderStatus::Success => Ok(()),
        _ => Err(EngineError::new(call)),
    }
}

fn check_enc(status: JxlEncoderStatus, call: &'static str) -> Result<(), EngineError> {
    match status {
        JxlEncoderStatus::Success => Ok(()),
        _ => Err(EngineError::new(call)),
    }
}

fn to_upstream_format(format: &PixelFormat) -> JxlPixelFormat {
    JxlPixelFormat {
        num_channels: format.channels,
        data_type: match format.sample_type {
            SampleType::Uint8 => JxlDataType::Uint8,
            SampleType::Float16 => JxlDataType::Float16,
        },
        endianness: match format.endianness {
            Endianness::Native => JxlEndianness::Native,
            Endianness::Big => JxlEndianness::Big,
        },
        align: 0,
    }
}

// ============================================================================
// Parallel Runners
// ============================================================================

/// Worker pool whose thread count can change after creation.
struct ResizableRunner(NonNull<c_void>);

impl ResizableRunner {
    fn new() -> Result<Self, EngineError> {
        let runner = unsafe { JxlResizableParallelRunnerCreate(ptr::null()) };
        NonNull::new(runner)
            .map(Self)
            .ok_or(EngineError::new("JxlResizableParallelRunnerCreate"))
    }

    fn set_threads_for(&self, width: u32, height: u32) {
        let threads = unsafe {
            JxlResizableParallelRunnerSuggestThreads(u64::from(width), u64::from(height))
        };
        unsafe { JxlResizableParallelRunnerSetThreads(self.0.as_ptr(), threads as usize) };
    }
}

impl Drop for ResizableRunner {
    fn drop(&mut self) {
        unsafe { JxlResizableParallelRunnerDestroy(self.0.as_ptr()) };
    }
}

/// Fixed-size worker pool.
struct ThreadRunner(NonNull<c_void>);

impl ThreadRunner {
    fn with_default_workers() -> Result<Self, EngineError> {
        let workers = unsafe { JxlThreadParallelRunnerDefaultNumWorkerThreads() };
        let runner = unsafe { JxlThreadParallelRunnerCreate(ptr::null(), workers) };
        NonNull::new(runner)
            .map(Self)
            .ok_or(EngineError::new("JxlThreadParallelRunnerCreate"))
    }
}

impl Drop for ThreadRunner {
    fn drop(&mut self) {
        unsafe { JxlThreadParallelRunnerDestroy(self.0.as_ptr()) };
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// A libjxl decoder reading a borrowed, already complete input buffer.
pub struct LibjxlDecoder<'a> {
    dec: NonNull<JxlDecoder>,
    runner: ResizableRunner,
    image: Option<Vec<u8>>,
    // libjxl reads the input in place; it must outlive the decoder.
    _input: PhantomData<&'a [u8]>,
}

impl<'a> LibjxlDecoder<'a> {
    /// Creates a decoder subscribed to basic info, color encoding and full image
    /// events, with `data` set as the complete, closed input.
    pub fn new(data: &'a [u8], options: &DecodeOptions) -> Result<Self, EngineError> {
        let runner = ResizableRunner::new()?;
        let dec = NonNull::new(unsafe { JxlDecoderCreate(ptr::null()) })
            .ok_or(EngineError::new("JxlDecoderCreate"))?;
        let decoder = Self {
            dec,
            runner,
            image: None,
            _input: PhantomData,
        };

        let events = JxlDecoderStatus::BasicInfo as i32
            | JxlDecoderStatus::ColorEncoding as i32
            | JxlDecoderStatus::FullImage as i32;
        check_dec(
            unsafe { JxlDecoderSubscribeEvents(decoder.dec.as_ptr(), events) },
            "JxlDecoderSubscribeEvents",
        )?;
        check_dec(
            unsafe {
                JxlDecoderSetParallelRunner(
                    decoder.dec.as_ptr(),
                    JxlResizableParallelRunner,
                    decoder.runner.0.as_ptr(),
                )
            },
            "JxlDecoderSetParallelRunner",
        )?;
        check_dec(
            unsafe {
                JxlDecoderSetKeepOrientation(
                    decoder.dec.as_ptr(),
                    jxl_bool(options.keep_orientation),
                )
            },
            "JxlDecoderSetKeepOrientation",
        )?;
        check_dec(
            unsafe {
                JxlDecoderSetUnpremultiplyAlpha(
                    decoder.dec.as_ptr(),
                    jxl_bool(options.unpremultiply_alpha),
                )
            },
            "JxlDecoderSetUnpremultiplyAlpha",
        )?;
        check_dec(
            unsafe { JxlDecoderSetInput(decoder.dec.as_ptr(), data.as_ptr(), data.len()) },
            "JxlDecoderSetInput",
        )?;
        unsafe { JxlDecoderCloseInput(decoder.dec.as_ptr()) };

        Ok(decoder)
    }
}

impl DecodeEngine for LibjxlDecoder<'_> {
    fn process(&mut self) -> DecoderEvent {
        match unsafe { JxlDecoderProcessInput(self.dec.as_ptr()) } {
            JxlDecoderStatus::Error => DecoderEvent::Error,
            JxlDecoderStatus::NeedMoreInput => DecoderEvent::NeedMoreInput,
            JxlDecoderStatus::BasicInfo => DecoderEvent::BasicInfo,
            JxlDecoderStatus::ColorEncoding => DecoderEvent::ColorEncoding,
            JxlDecoderStatus::NeedImageOutBuffer => DecoderEvent::NeedImageOutBuffer,
            JxlDecoderStatus::FullImage => DecoderEvent::FullImage,
            JxlDecoderStatus::Success => DecoderEvent::Success,
            other => DecoderEvent::Other(other as i32),
        }
    }

    fn basic_info(&self) -> Result<StreamInfo, EngineError> {
        let mut info = MaybeUninit::<JxlBasicInfo>::uninit();
        check_dec(
            unsafe { JxlDecoderGetBasicInfo(self.dec.as_ptr(), info.as_mut_ptr()) },
            "JxlDecoderGetBasicInfo",
        )?;
        let info = unsafe { info.assume_init() };

        Ok(StreamInfo {
            width: info.xsize,
            height: info.ysize,
            bits_per_sample: info.bits_per_sample,
            num_color_channels: info.num_color_channels,
            num_extra_channels: info.num_extra_channels,
            orientation: JxlOrientation::from_code(info.orientation as u32).unwrap_or_default(),
        })
    }

    fn scale_workers(&mut self, width: u32, height: u32) {
        self.runner.set_threads_for(width, height);
    }

    fn icc_profile_size(&self) -> Result<usize, EngineError> {
        let mut size = 0usize;
        check_dec(
            unsafe {
                JxlDecoderGetICCProfileSize(
                    self.dec.as_ptr(),
                    JxlColorProfileTarget::Data,
                    &mut size,
                )
            },
            "JxlDecoderGetICCProfileSize",
        )?;
        Ok(size)
    }

    fn read_icc_profile(&self, profile: &mut [u8]) -> Result<(), EngineError> {
        check_dec(
            unsafe {
                JxlDecoderGetColorAsICCProfile(
                    self.dec.as_ptr(),
                    JxlColorProfileTarget::Data,
                    profile.as_mut_ptr(),
                    profile.len(),
                )
            },
            "JxlDecoderGetColorAsICCProfile",
        )
    }

    fn image_out_buffer_size(&self, format: &PixelFormat) -> Result<usize, EngineError> {
        let format = to_upstream_format(format);
        let mut size = 0usize;
        check_dec(
            unsafe { JxlDecoderImageOutBufferSize(self.dec.as_ptr(), &format, &mut size) },
            "JxlDecoderImageOutBufferSize",
        )?;
        Ok(size)
    }

    fn set_image_out_buffer(
        &mut self,
        format: &PixelFormat,
        mut buffer: Vec<u8>,
    ) -> Result<(), EngineError> {
        let format = to_upstream_format(format);
        let status = unsafe {
            JxlDecoderSetImageOutBuffer(
                self.dec.as_ptr(),
                &format,
                buffer.as_mut_ptr().cast::<c_void>(),
                buffer.len(),
            )
        };
        // Moving the Vec keeps its heap allocation where the engine expects it.
        self.image = Some(buffer);
        check_dec(status, "JxlDecoderSetImageOutBuffer")
    }

    fn take_image_buffer(&mut self) -> Option<Vec<u8>> {
        self.image.take()
    }
}

impl Drop for LibjxlDecoder<'_> {
    fn drop(&mut self) {
        // Runs before the runner and image fields are dropped.
        unsafe { JxlDecoderDestroy(self.dec.as_ptr()) };
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// A libjxl encoder with one set of frame settings.
pub struct LibjxlEncoder {
    enc: NonNull<JxlEncoder>,
    // Owned by `enc`.
    frame_settings: NonNull<JxlEncoderFrameSettings>,
    runner: ThreadRunner,
}

impl LibjxlEncoder {
    /// Creates an encoder backed by a thread pool of the default worker count.
    pub fn new() -> Result<Self, EngineError> {
        let runner = ThreadRunner::with_default_workers()?;
        let enc = NonNull::new(unsafe { JxlEncoderCreate(ptr::null()) })
            .ok_or(EngineError::new("JxlEncoderCreate"))?;

        let frame_settings =
            NonNull::new(unsafe { JxlEncoderFrameSettingsCreate(enc.as_ptr(), ptr::null()) });
        let Some(frame_settings) = frame_settings else {
            unsafe { JxlEncoderDestroy(enc.as_ptr()) };
            return Err(EngineError::new("JxlEncoderFrameSettingsCreate"));
        };

        let encoder = Self {
            enc,
            frame_settings,
            runner,
        };
        check_enc(
            unsafe {
                JxlEncoderSetParallelRunner(
                    encoder.enc.as_ptr(),
                    JxlThreadParallelRunner,
                    encoder.runner.0.as_ptr(),
                )
            },
            "JxlEncoderSetParallelRunner",
        )?;

        Ok(encoder)
    }
}

impl EncodeEngine for LibjxlEncoder {
    fn set_basic_info(&mut self, info: &EncoderBasicInfo) -> Result<(), EngineError> {
        let mut basic_info = MaybeUninit::<JxlBasicInfo>::uninit();
        unsafe { JxlEncoderInitBasicInfo(basic_info.as_mut_ptr()) };
        let mut basic_info = unsafe { basic_info.assume_init() };

        basic_info.xsize = info.width;
        basic_info.ysize = info.height;
        basic_info.bits_per_sample = info.bits_per_sample;
        basic_info.exponent_bits_per_sample = info.exponent_bits_per_sample;
        basic_info.uses_original_profile = jxl_bool(info.uses_original_profile);
        basic_info.num_color_channels = info.num_color_channels;
        basic_info.num_extra_channels = info.num_extra_channels;
        basic_info.alpha_bits = info.alpha_bits;

        check_enc(
            unsafe { JxlEncoderSetBasicInfo(self.enc.as_ptr(), &basic_info) },
            "JxlEncoderSetBasicInfo",
        )
    }

    fn set_alpha_channel(&mut self, index: usize, alpha: &AlphaChannel) -> Result<(), EngineError> {
        let mut channel_info = MaybeUninit::<JxlExtraChannelInfo>::uninit();
        unsafe {
            JxlEncoderInitExtraChannelInfo(JxlExtraChannelType::Alpha, channel_info.as_mut_ptr())
        };
        let mut channel_info = unsafe { channel_info.assume_init() };

        channel_info.bits_per_sample = alpha.bits_per_sample;
        channel_info.alpha_premultiplied = jxl_bool(alpha.premultiplied);

        check_enc(
            unsafe { JxlEncoderSetExtraChannelInfo(self.enc.as_ptr(), index, &channel_info) },
            "JxlEncoderSetExtraChannelInfo",
        )
    }

    fn set_color_encoding_srgb(&mut self, is_gray: bool) -> Result<(), EngineError> {
        let mut color_encoding = MaybeUninit::<JxlColorEncoding>::uninit();
        unsafe { JxlColorEncodingSetToSRGB(color_encoding.as_mut_ptr(), is_gray) };

        check_enc(
            unsafe { JxlEncoderSetColorEncoding(self.enc.as_ptr(), color_encoding.as_ptr()) },
            "JxlEncoderSetColorEncoding",
        )
    }

    fn set_frame_distance(&mut self, distance: FrameDistance) -> Result<(), EngineError> {
        match distance {
            FrameDistance::Lossless => check_enc(
                unsafe { JxlEncoderSetFrameLossless(self.frame_settings.as_ptr(), true) },
                "JxlEncoderSetFrameLossless",
            ),
            FrameDistance::Distance(distance) => check_enc(
                unsafe { JxlEncoderSetFrameDistance(self.frame_settings.as_ptr(), distance) },
                "JxlEncoderSetFrameDistance",
            ),
        }
    }

    fn add_image_frame(&mut self, format: &PixelFormat, pixels: &[u8]) -> Result<(), EngineError> {
        let format = to_upstream_format(format);
        check_enc(
            unsafe {
                JxlEncoderAddImageFrame(
                    self.frame_settings.as_ptr(),
                    &format,
                    pixels.as_ptr().cast::<c_void>(),
                    pixels.len(),
                )
            },
            "JxlEncoderAddImageFrame",
        )
    }

    fn close_input(&mut self) {
        unsafe { JxlEncoderCloseInput(self.enc.as_ptr()) };
    }

    fn process_output(&mut self, out: &mut [u8]) -> (EncoderStatus, usize) {
        let mut next_out = out.as_mut_ptr();
        let mut avail_out = out.len();
        let status =
            unsafe { JxlEncoderProcessOutput(self.enc.as_ptr(), &mut next_out, &mut avail_out) };
        let written = out.len() - avail_out;

        let status = match status {
            JxlEncoderStatus::Success => EncoderStatus::Success,
            JxlEncoderStatus::NeedMoreOutput => EncoderStatus::NeedMoreOutput,
            _ => EncoderStatus::Error,
        };
        (status, written)
    }
}

impl Drop for LibjxlEncoder {
    fn drop(&mut self) {
        // Also frees the frame settings. Runs before the runner is dropped.
        unsafe { JxlEncoderDestroy(self.enc.as_ptr()) };
    }
}

// ============================================================================
// Signature Check
// ============================================================================

/// Classifies the leading bytes of `data` without creating a decoder.
pub fn check_signature(data: &[u8]) -> JxlSignature {
    if data.is_empty() {
        return JxlSignature::NotEnoughBytes;
    }

    match unsafe { JxlSignatureCheck(data.as_ptr(), data.len()) } {
        UpstreamSignature::NotEnoughBytes => JxlSignature::NotEnoughBytes,
        UpstreamSignature::Invalid => JxlSignature::Invalid,
        UpstreamSignature::Codestream => JxlSignature::Codestream,
        UpstreamSignature::Container => JxlSignature::Container,
    }
}
