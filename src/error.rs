// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Error types, and error reporting for the C API.

use crate::engine::DecoderEvent;
use std::cell::RefCell;
use std::ffi::c_char;
use std::fmt;

/// A single engine call that reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{call} failed")]
pub struct EngineError {
    pub call: &'static str,
}

impl EngineError {
    pub(crate) fn new(call: &'static str) -> Self {
        Self { call }
    }
}

/// Encoder configuration steps, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStep {
    BasicInfo,
    ExtraChannel,
    ColorEncoding,
    FrameDistance,
    AddFrame,
}

impl fmt::Display for EncodeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodeStep::BasicInfo => "basic info",
            EncodeStep::ExtraChannel => "extra channel info",
            EncodeStep::ColorEncoding => "color encoding",
            EncodeStep::FrameDistance => "frame distance",
            EncodeStep::AddFrame => "image frame",
        })
    }
}

/// Every way a decode or encode call can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("decoder reported an error")]
    DecodeFailed,

    #[error("input ended before decoding finished")]
    TruncatedInput,

    #[error("unexpected decoder event {event:?} while {stage}")]
    UnexpectedEvent {
        event: DecoderEvent,
        stage: &'static str,
    },

    #[error("image buffer size mismatch: engine requires {required} bytes, metadata implies {expected}")]
    BufferSizeMismatch { required: usize, expected: usize },

    #[error("image dimensions overflow the address space")]
    DimensionOverflow,

    #[error("image has {pixels} pixels, limit is {limit}")]
    PixelLimitExceeded { pixels: u64, limit: usize },

    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    InvalidPixelBuffer { actual: usize, expected: usize },

    #[error("failed to configure encoder: {0}")]
    Configuration(EncodeStep),

    #[error("encoder reported an error")]
    EncodeFailed,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the last error message for the current thread.
pub(crate) fn set_last_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = msg.into();
    });
}

/// Clears the last error message.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| {
        e.borrow_mut().clear();
    });
}

/// Records a failed call for `jxl_get_last_error` and reports it as `false`.
pub(crate) fn report_failure(context: &str, err: &CodecError) -> bool {
    tracing::debug!(error = %err, "{context} failed");
    set_last_error(format!("{context}: {err}"));
    false
}

/// Gets the last error message.
///
/// # Arguments
/// * `buffer` - Buffer to write the error message to.
/// * `buffer_size` - Size of the buffer in bytes.
///
/// # Returns
/// The length of the error message (excluding null terminator).
/// If the buffer is too small, the message is truncated.
/// Returns 0 if there is no error message.
///
/// # Safety
/// The buffer must be valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jxl_get_last_error(buffer: *mut c_char, buffer_size: usize) -> usize {
    if buffer.is_null() || buffer_size == 0 {
        return LAST_ERROR.with(|e| e.borrow().len());
    }

    LAST_ERROR.with(|e| {
        let error = e.borrow();
        let bytes = error.as_bytes();
        let copy_len = bytes.len().min(buffer_size - 1);

        if copy_len > 0 {
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer as *mut u8, copy_len);
            }
        }

        // Null terminate
        unsafe {
            *buffer.add(copy_len) = 0;
        }

        error.len()
    })
}

/// Clears the last error message.
#[unsafe(no_mangle)]
pub extern "C" fn jxl_clear_last_error() {
    clear_last_error();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_truncates_and_terminates() {
        set_last_error("decode image: decoder reported an error");

        let mut buffer = [0x7f as c_char; 8];
        let len = unsafe { jxl_get_last_error(buffer.as_mut_ptr(), buffer.len()) };

        assert_eq!(len, "decode image: decoder reported an error".len());
        assert_eq!(buffer[7], 0);
        let copied: Vec<u8> = buffer[..7].iter().map(|&c| c as u8).collect();
        assert_eq!(&copied, b"decode ");
    }

    #[test]
    fn test_clear_last_error() {
        set_last_error("boom");
        jxl_clear_last_error();
        assert_eq!(unsafe { jxl_get_last_error(std::ptr::null_mut(), 0) }, 0);
    }

    #[test]
    fn test_size_mismatch_message_names_both_sizes() {
        let err = CodecError::BufferSizeMismatch {
            required: 48,
            expected: 24,
        };
        assert_eq!(
            err.to_string(),
            "image buffer size mismatch: engine requires 48 bytes, metadata implies 24"
        );
    }

    #[test]
    fn test_engine_setup_failure_names_the_call() {
        let err: CodecError = EngineError::new("JxlEncoderFrameSettingsCreate").into();
        assert_eq!(err, CodecError::Engine(EngineError::new("JxlEncoderFrameSettingsCreate")));
        assert_eq!(err.to_string(), "JxlEncoderFrameSettingsCreate failed");
    }
}
