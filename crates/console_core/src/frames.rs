//! Rolling gameplay preview: a fixed-capacity FIFO of encoded screen captures.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::CapturedFrame;

pub const GIF_SIZE: usize = 20;
/// Captures per second of emulated time.
pub const GIF_FRAME_FREQ: u32 = 4;

/// Emulator frames between two captures at the given rate.
pub fn capture_interval(fps: u32) -> u64 {
    u64::from((fps / GIF_FRAME_FREQ).max(1))
}

/// A capture as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame(pub String);

impl EncodedFrame {
    pub fn from_capture(frame: &CapturedFrame) -> Self {
        Self(format!(
            "data:{};base64,{}",
            frame.mime_type,
            STANDARD.encode(&frame.bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fixed array plus write cursor; once full, each push overwrites the oldest slot.
#[derive(Debug, Clone)]
pub struct FrameRing<T, const N: usize> {
    slots: [Option<T>; N],
    cursor: usize,
    len: usize,
}

impl<T, const N: usize> Default for FrameRing<T, N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            cursor: 0,
            len: 0,
        }
    }
}

impl<T, const N: usize> FrameRing<T, N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `item`, returning the evicted oldest entry when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if N == 0 {
            return Some(item);
        }
        let evicted = self.slots[self.cursor].replace(item);
        self.cursor = (self.cursor + 1) % N;
        if evicted.is_none() {
            self.len += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
        self.len = 0;
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let start = if self.len < N { 0 } else { self.cursor };
        (0..self.len).filter_map(move |offset| self.slots[(start + offset) % N].as_ref())
    }
}

pub type PreviewFrames = FrameRing<EncodedFrame, GIF_SIZE>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifParameters {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<EncodedFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreviewUnavailable {
    #[error("gif resolution not known yet")]
    NoResolution,
    #[error("no gif frames captured yet")]
    NoFrames,
}
