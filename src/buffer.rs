// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Growable output buffer for draining encoder output.

/// Size of the first buffer handed to the encoder.
pub(crate) const INITIAL_OUTPUT_CAPACITY: usize = 64;

/// A byte buffer with separate capacity and written length.
///
/// The whole capacity is initialized so the spare region can be lent out as a
/// plain `&mut [u8]`.
#[derive(Debug)]
pub(crate) struct OutputArena {
    buf: Vec<u8>,
    written: usize,
}

impl OutputArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            written: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn written(&self) -> usize {
        self.written
    }

    /// The unwritten tail of the buffer.
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.written..]
    }

    /// Marks `n` more bytes of the spare region as written.
    pub(crate) fn advance(&mut self, n: usize) {
        assert!(n <= self.buf.len() - self.written, "advanced past capacity");
        self.written += n;
    }

    /// Doubles the capacity, keeping written bytes in place.
    pub(crate) fn grow(&mut self) {
        let capacity = self.buf.len().max(1) * 2;
        self.buf.resize(capacity, 0);
    }

    /// Returns exactly the written bytes.
    pub(crate) fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.written);
        self.buf.shrink_to_fit();
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_preserves_written_bytes() {
        let mut arena = OutputArena::with_capacity(INITIAL_OUTPUT_CAPACITY);
        arena.spare_mut()[..3].copy_from_slice(b"jxl");
        arena.advance(3);

        arena.grow();

        assert_eq!(arena.capacity(), 128);
        assert_eq!(arena.written(), 3);
        assert_eq!(arena.spare_mut().len(), 125);
        assert_eq!(&arena.into_vec(), b"jxl");
    }

    #[test]
    fn test_into_vec_drops_unused_capacity() {
        let mut arena = OutputArena::with_capacity(8);
        arena.spare_mut()[..5].fill(0xAA);
        arena.advance(5);
        arena.grow();
        arena.grow();

        let out = arena.into_vec();
        assert_eq!(out, vec![0xAA; 5]);
    }

    #[test]
    fn test_grow_from_empty() {
        let mut arena = OutputArena::with_capacity(0);
        arena.grow();
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    #[should_panic(expected = "advanced past capacity")]
    fn test_advance_past_capacity_panics() {
        let mut arena = OutputArena::with_capacity(4);
        arena.advance(5);
    }
}
