//! Interleaved block buffer.
//!
//! `Frames` is the unit of data that flows through a synthesis graph: one block
//! of `frames × channels` samples, interleaved (`L R L R …` for stereo).
//!
//! Notes:
//! - Channel count is fixed at construction and only changes through [`Frames::resize`].
//! - [`Frames::copy_from`] converts between channel layouts so a consumer can pull
//!   from a generator of a different width without caring.
//! - No allocation happens in `copy_from` as long as the frame counts already match.

use core::ops::{Index, IndexMut};

/// Interleaved `f32` block of audio.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frames {
    data: Vec<f32>,
    frames: usize,
    channels: usize,
}

impl Frames {
    /// Zeroed block of `frames × channels` samples.
    pub fn new(frames: usize, channels: usize) -> Self {
        Self { data: vec![0.0; frames * channels], frames, channels }
    }

    /// Zeroed mono block.
    #[inline] pub fn mono(frames: usize) -> Self { Self::new(frames, 1) }

    /// Zeroed stereo block.
    #[inline] pub fn stereo(frames: usize) -> Self { Self::new(frames, 2) }

    #[inline] pub fn frames(&self) -> usize { self.frames }
    #[inline] pub fn channels(&self) -> usize { self.channels }
    /// Total samples (`frames × channels`).
    #[inline] pub fn len(&self) -> usize { self.data.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.data.is_empty() }
    #[inline] pub fn as_slice(&self) -> &[f32] { &self.data }
    #[inline] pub fn as_mut_slice(&mut self) -> &mut [f32] { &mut self.data }

    /// Change the shape; contents are zeroed when the shape actually changes.
    pub fn resize(&mut self, frames: usize, channels: usize) {
        if frames == self.frames && channels == self.channels {
            return;
        }
        self.frames = frames;
        self.channels = channels;
        self.data.clear();
        self.data.resize(frames * channels, 0.0);
    }

    /// Set every sample to `value`.
    #[inline]
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Interleaved samples of frame `i`.
    #[inline]
    pub fn frame(&self, i: usize) -> &[f32] {
        &self.data[i * self.channels..(i + 1) * self.channels]
    }

    /// Mutable samples of frame `i`.
    #[inline]
    pub fn frame_mut(&mut self, i: usize) -> &mut [f32] {
        let ch = self.channels;
        &mut self.data[i * ch..(i + 1) * ch]
    }

    /// Iterate frames as channel slices.
    #[inline]
    pub fn frames_iter(&self) -> core::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Iterate frames as mutable channel slices.
    #[inline]
    pub fn frames_iter_mut(&mut self) -> core::slice::ChunksExactMut<'_, f32> {
        self.data.chunks_exact_mut(self.channels.max(1))
    }

    /// Copy `src` into `self`, converting the channel layout.
    ///
    /// The frame count follows `src`; the channel count of `self` is kept.
    /// - same width: plain copy
    /// - mono source: broadcast to every destination channel
    /// - mono destination: mean of the source channels
    /// - otherwise: destination channel `c` reads source channel `min(c, src_channels - 1)`
    pub fn copy_from(&mut self, src: &Frames) {
        if self.frames != src.frames {
            let channels = self.channels;
            self.resize(src.frames, channels);
        }
        let (dc, sc) = (self.channels, src.channels);
        if dc == 0 || sc == 0 {
            return;
        }

        if dc == sc {
            self.data.copy_from_slice(&src.data);
        } else if sc == 1 {
            for (dst, &s) in self.data.chunks_exact_mut(dc).zip(src.data.iter()) {
                dst.fill(s);
            }
        } else if dc == 1 {
            let norm = 1.0 / sc as f32;
            for (dst, frame) in self.data.iter_mut().zip(src.data.chunks_exact(sc)) {
                *dst = frame.iter().sum::<f32>() * norm;
            }
        } else {
            for (dst, frame) in self.data.chunks_exact_mut(dc).zip(src.data.chunks_exact(sc)) {
                for (c, d) in dst.iter_mut().enumerate() {
                    *d = frame[c.min(sc - 1)];
                }
            }
        }
    }

    /// Add `src` sample-by-sample into `self`. Shapes must match.
    #[inline]
    pub fn add_assign(&mut self, src: &Frames) {
        debug_assert_eq!(self.len(), src.len());
        for (d, s) in self.data.iter_mut().zip(src.data.iter()) {
            *d += *s;
        }
    }
}

impl Index<usize> for Frames {
    type Output = f32;
    #[inline] fn index(&self, i: usize) -> &f32 { &self.data[i] }
}

impl IndexMut<usize> for Frames {
    #[inline] fn index_mut(&mut self, i: usize) -> &mut f32 { &mut self.data[i] }
}
