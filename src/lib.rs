// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! jxl-coder - one-shot JPEG XL decoding and encoding on top of libjxl.
//!
//! Every call creates its own engine and worker pool, runs it to completion and
//! tears it down again. The Rust API returns [`Result`]s; the C API mirrors it
//! with `bool` returns, out-parameters and `jxl_get_last_error`.

mod buffer;
mod conversions;
mod decoder;
mod encoder;
mod engine;
mod error;
mod types;

pub use decoder::*;
pub use encoder::*;
pub use engine::DecoderEvent;
pub use error::*;
pub use types::*;

/// Returns the library version as a packed integer.
/// Format: (major << 24) | (minor << 16) | (patch << 8)
#[unsafe(no_mangle)]
pub extern "C" fn jxl_version() -> u32 {
    let major: u32 = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
    let minor: u32 = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
    let patch: u32 = env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0);
    (major << 24) | (minor << 16) | (patch << 8)
}
