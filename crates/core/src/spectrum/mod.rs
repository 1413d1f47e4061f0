//! Spectrum frames and their hand-off between the audio and simulation
//! contexts.
//!
//! [`SharedSpectrum`] is written only by the audio context and read only by
//! the simulation context. Every bin is an independent atomic, so a reader
//! racing the writer can observe a mix of two frames (a torn read) but never
//! an out-of-bounds or partially written float.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::consts::{MAX_CHANNELS, SPECTRUM_LEN};

/// Calibrated power per frequency bin for up to two channels.
///
/// A mono frame stores only channel 0; asking for channel 1 returns channel 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    channels: usize,
    bins: [[f32; SPECTRUM_LEN]; MAX_CHANNELS],
}

impl SpectrumFrame {
    /// A zeroed frame for `channels` channels (clamped to `1..=2`).
    pub fn silent(channels: usize) -> Self {
        Self {
            channels: channels.clamp(1, MAX_CHANNELS),
            bins: [[0.0; SPECTRUM_LEN]; MAX_CHANNELS],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn set_channels(&mut self, channels: usize) {
        self.channels = channels.clamp(1, MAX_CHANNELS);
    }

    /// Bins of `channel`. Channels past the last stored one read as channel 0.
    pub fn channel(&self, channel: usize) -> &[f32; SPECTRUM_LEN] {
        if channel < self.channels {
            &self.bins[channel]
        } else {
            &self.bins[0]
        }
    }

    /// Mutable bins of `channel`, which must be below [`MAX_CHANNELS`].
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32; SPECTRUM_LEN] {
        &mut self.bins[channel]
    }

    pub fn bin(&self, channel: usize, bin: usize) -> f32 {
        self.channel(channel)[bin]
    }

    pub fn clear(&mut self) {
        for channel in &mut self.bins {
            channel.fill(0.0);
        }
    }

    /// Channel, bin and value of the loudest bin.
    pub fn peak(&self) -> (usize, usize, f32) {
        let mut best = (0, 0, 0.0);
        for channel in 0..self.channels {
            for (bin, &value) in self.bins[channel].iter().enumerate() {
                if value > best.2 {
                    best = (channel, bin, value);
                }
            }
        }
        best
    }
}

impl Default for SpectrumFrame {
    fn default() -> Self {
        Self::silent(MAX_CHANNELS)
    }
}

/// Lock-free single-writer/single-reader spectrum slot.
#[derive(Debug)]
pub struct SharedSpectrum {
    channels: AtomicUsize,
    bins: Box<[AtomicU32]>,
    generation: AtomicU64,
}

impl SharedSpectrum {
    pub fn new() -> Self {
        let bins = (0..MAX_CHANNELS * SPECTRUM_LEN)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect::<Vec<_>>();
        Self {
            channels: AtomicUsize::new(MAX_CHANNELS),
            bins: bins.into_boxed_slice(),
            generation: AtomicU64::new(0),
        }
    }

    /// Overwrites the slot with `frame`. Audio context only.
    pub fn publish(&self, frame: &SpectrumFrame) {
        self.channels.store(frame.channels(), Ordering::Relaxed);
        for channel in 0..MAX_CHANNELS {
            let source = frame.channel(channel);
            let offset = channel * SPECTRUM_LEN;
            for (slot, value) in self.bins[offset..offset + SPECTRUM_LEN]
                .iter()
                .zip(source.iter())
            {
                slot.store(value.to_bits(), Ordering::Relaxed);
            }
        }
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Copies the current contents into `frame`. Simulation context only.
    ///
    /// Returns the generation counter observed before copying; a frame that
    /// is being overwritten concurrently may be torn.
    pub fn snapshot_into(&self, frame: &mut SpectrumFrame) -> u64 {
        let generation = self.generation.load(Ordering::Acquire);
        frame.set_channels(self.channels.load(Ordering::Relaxed));
        for channel in 0..MAX_CHANNELS {
            let offset = channel * SPECTRUM_LEN;
            for (value, slot) in frame
                .channel_mut(channel)
                .iter_mut()
                .zip(self.bins[offset..offset + SPECTRUM_LEN].iter())
            {
                *value = f32::from_bits(slot.load(Ordering::Relaxed));
            }
        }
        generation
    }

    pub fn snapshot(&self) -> SpectrumFrame {
        let mut frame = SpectrumFrame::default();
        self.snapshot_into(&mut frame);
        frame
    }

    /// Number of frames published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SharedSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

/// The last `K` frames, oldest first. Always holds exactly `K` frames;
/// zeroed before the first push.
#[derive(Debug, Clone)]
pub struct SpectrumHistory<const K: usize> {
    frames: [SpectrumFrame; K],
}

impl<const K: usize> SpectrumHistory<K> {
    pub fn new() -> Self {
        assert!(K > 0, "history needs at least one frame");
        Self {
            frames: std::array::from_fn(|_| SpectrumFrame::default()),
        }
    }

    /// Drops the oldest frame and appends `frame`.
    pub fn push(&mut self, frame: &SpectrumFrame) {
        self.frames.rotate_left(1);
        self.frames[K - 1].clone_from(frame);
    }

    pub fn frames(&self) -> &[SpectrumFrame; K] {
        &self.frames
    }

    pub fn latest(&self) -> &SpectrumFrame {
        &self.frames[K - 1]
    }

    /// Values of one bin across the history, oldest first.
    pub fn samples(&self, channel: usize, bin: usize) -> [f32; K] {
        std::array::from_fn(|i| self.frames[i].bin(channel, bin))
    }

    pub fn clear(&mut self) {
        for frame in &mut self.frames {
            frame.clear();
        }
    }
}

impl<const K: usize> Default for SpectrumHistory<K> {
    fn default() -> Self {
        Self::new()
    }
}
