// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Scripted engines for exercising the codec loops without libjxl.

use super::{
    AlphaChannel, DecodeEngine, DecoderEvent, EncodeEngine, EncoderBasicInfo, EncoderStatus,
    FrameDistance,
};
use crate::error::EngineError;
use crate::types::{PixelFormat, StreamInfo};
use std::collections::VecDeque;

/// Replays a fixed list of decoder events.
///
/// On every `FullImage` event the held image buffer is filled with the number of
/// full images seen so far, so tests can tell which frame was retained.
pub(crate) struct ScriptedDecoder {
    events: VecDeque<DecoderEvent>,
    pub info: StreamInfo,
    pub icc_profile: Vec<u8>,
    /// Overrides the size reported by `image_out_buffer_size`.
    pub required_size: Option<usize>,
    pub fail_basic_info: bool,
    pub fail_icc: bool,
    pub fail_icc_read: bool,
    pub fail_set_buffer: bool,
    image: Option<Vec<u8>>,
    frames: u8,
    pub worker_hint: Option<(u32, u32)>,
    pub buffers_set: Vec<(PixelFormat, usize)>,
}

impl ScriptedDecoder {
    pub(crate) fn new(info: StreamInfo, events: impl IntoIterator<Item = DecoderEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            info,
            icc_profile: Vec::new(),
            required_size: None,
            fail_basic_info: false,
            fail_icc: false,
            fail_icc_read: false,
            fail_set_buffer: false,
            image: None,
            frames: 0,
            worker_hint: None,
            buffers_set: Vec::new(),
        }
    }

    pub(crate) fn remaining_events(&self) -> usize {
        self.events.len()
    }
}

impl DecodeEngine for ScriptedDecoder {
    fn process(&mut self) -> DecoderEvent {
        let event = self.events.pop_front().unwrap_or(DecoderEvent::Error);
        if event == DecoderEvent::FullImage {
            self.frames += 1;
            if let Some(image) = self.image.as_mut() {
                image.fill(self.frames);
            }
        }
        event
    }

    fn basic_info(&self) -> Result<StreamInfo, EngineError> {
        if self.fail_basic_info {
            return Err(EngineError::new("basic_info"));
        }
        Ok(self.info.clone())
    }

    fn scale_workers(&mut self, width: u32, height: u32) {
        self.worker_hint = Some((width, height));
    }

    fn icc_profile_size(&self) -> Result<usize, EngineError> {
        if self.fail_icc {
            return Err(EngineError::new("icc_profile_size"));
        }
        Ok(self.icc_profile.len())
    }

    fn read_icc_profile(&self, profile: &mut [u8]) -> Result<(), EngineError> {
        if self.fail_icc_read || profile.len() != self.icc_profile.len() {
            return Err(EngineError::new("read_icc_profile"));
        }
        profile.copy_from_slice(&self.icc_profile);
        Ok(())
    }

    fn image_out_buffer_size(&self, format: &PixelFormat) -> Result<usize, EngineError> {
        Ok(self.required_size.unwrap_or(
            self.info.width as usize * self.info.height as usize * format.bytes_per_pixel(),
        ))
    }

    fn set_image_out_buffer(
        &mut self,
        format: &PixelFormat,
        buffer: Vec<u8>,
    ) -> Result<(), EngineError> {
        self.image = Some(buffer);
        if self.fail_set_buffer {
            return Err(EngineError::new("set_image_out_buffer"));
        }
        self.buffers_set.push((*format, self.image.as_ref().map_or(0, Vec::len)));
        Ok(())
    }

    fn take_image_buffer(&mut self) -> Option<Vec<u8>> {
        self.image.take()
    }
}

/// A configuration call observed by [`ScriptedEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EncoderCall {
    BasicInfo(EncoderBasicInfo),
    AlphaChannel(usize, AlphaChannel),
    ColorEncoding { is_gray: bool },
    FrameDistance(FrameDistance),
    AddFrame(PixelFormat, usize),
    CloseInput,
    ProcessOutput { avail: usize },
}

/// Records configuration calls and emits a fixed compressed stream.
///
/// Each `process_output` call writes as much of the stream as fits and reports
/// `NeedMoreOutput` until everything has been written.
pub(crate) struct ScriptedEncoder {
    pub calls: Vec<EncoderCall>,
    stream: Vec<u8>,
    position: usize,
    /// Call name that should fail, e.g. `"basic_info"`.
    pub fail_on: Option<&'static str>,
    /// Report an error once compressed output reaches this many bytes.
    pub error_after: Option<usize>,
}

impl ScriptedEncoder {
    pub(crate) fn new(stream: Vec<u8>) -> Self {
        Self {
            calls: Vec::new(),
            stream,
            position: 0,
            fail_on: None,
            error_after: None,
        }
    }

    fn check(&self, call: &'static str) -> Result<(), EngineError> {
        match self.fail_on {
            Some(failing) if failing == call => Err(EngineError::new(call)),
            _ => Ok(()),
        }
    }
}

impl EncodeEngine for ScriptedEncoder {
    fn set_basic_info(&mut self, info: &EncoderBasicInfo) -> Result<(), EngineError> {
        self.calls.push(EncoderCall::BasicInfo(*info));
        self.check("basic_info")
    }

    fn set_alpha_channel(&mut self, index: usize, alpha: &AlphaChannel) -> Result<(), EngineError> {
        self.calls.push(EncoderCall::AlphaChannel(index, *alpha));
        self.check("alpha_channel")
    }

    fn set_color_encoding_srgb(&mut self, is_gray: bool) -> Result<(), EngineError> {
        self.calls.push(EncoderCall::ColorEncoding { is_gray });
        self.check("color_encoding")
    }

    fn set_frame_distance(&mut self, distance: FrameDistance) -> Result<(), EngineError> {
        self.calls.push(EncoderCall::FrameDistance(distance));
        self.check("frame_distance")
    }

    fn add_image_frame(&mut self, format: &PixelFormat, pixels: &[u8]) -> Result<(), EngineError> {
        self.calls.push(EncoderCall::AddFrame(*format, pixels.len()));
        self.check("add_frame")
    }

    fn close_input(&mut self) {
        self.calls.push(EncoderCall::CloseInput);
    }

    fn process_output(&mut self, out: &mut [u8]) -> (EncoderStatus, usize) {
        self.calls.push(EncoderCall::ProcessOutput { avail: out.len() });

        let remaining = &self.stream[self.position..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        self.position += n;

        if self.error_after.is_some_and(|limit| self.position >= limit) {
            return (EncoderStatus::Error, n);
        }
        if self.position < self.stream.len() {
            (EncoderStatus::NeedMoreOutput, n)
        } else {
            (EncoderStatus::Success, n)
        }
    }
}
