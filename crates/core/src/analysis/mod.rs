//! Real-time spectral analysis for the audio callback.
//!
//! One [`SpectrumAnalyzer::process_block`] call turns one hardware buffer of
//! interleaved samples into one [`SpectrumFrame`]. The FFT runs repeatedly
//! over overlapping windows (stride [`SUB_WINDOW_STRIDE`]). Windows are binned
//! by position into time slots, so the fine per-slot volume array tracks
//! changes within the buffer faster than one window length.

mod fft;

use std::{f32::consts::PI, fmt};

use realfft::num_complex::Complex32;

pub use fft::Radix2Fft;

use crate::consts::{FFT_LEN, LG_FFT_LEN, MAX_CHANNELS, SPECTRUM_LEN, SUB_WINDOW_STRIDE};
use crate::SpectrumFrame;

/// Windowed FFT pipeline with calibrated power output.
///
/// Every buffer the analyzer touches while processing is allocated in
/// [`SpectrumAnalyzer::new`]; `process_block` is allocation free.
pub struct SpectrumAnalyzer {
    fft: Radix2Fft,
    scratch: Vec<Complex32>,
    reference_power: f32,
    max_frames: usize,
    volume: [Vec<f32>; MAX_CHANNELS],
    slots_per_bin: usize,
    frame: SpectrumFrame,
}

impl SpectrumAnalyzer {
    /// Plans the FFT, calibrates against the reference tone and sizes the
    /// volume arrays for hardware buffers of up to `max_frames` frames.
    pub fn new(max_frames: usize) -> Self {
        let fft = Radix2Fft::new(LG_FFT_LEN);
        let mut scratch = vec![Complex32::new(0.0, 0.0); FFT_LEN];
        let reference_power = calibrate(&fft, &mut scratch);
        let max_frames = max_frames.max(FFT_LEN);
        let volume_len = SPECTRUM_LEN * (max_frames / SPECTRUM_LEN);

        tracing::info!(reference_power, fft_len = FFT_LEN, "spectrum analyzer calibrated");

        Self {
            fft,
            scratch,
            reference_power,
            max_frames,
            volume: std::array::from_fn(|_| vec![0.0; volume_len]),
            slots_per_bin: 1,
            frame: SpectrumFrame::default(),
        }
    }

    /// Peak bin power of the reference tone. Every bin power is divided by it.
    pub fn reference_power(&self) -> f32 {
        self.reference_power
    }

    /// The frame produced by the last call to [`process_block`](Self::process_block).
    pub fn frame(&self) -> &SpectrumFrame {
        &self.frame
    }

    /// Fine per-slot volume for `channel` from the last block: `slots_per_bin`
    /// consecutive slots per output bin, earliest part of the buffer first.
    pub fn volume(&self, channel: usize) -> &[f32] {
        let used = SPECTRUM_LEN * self.slots_per_bin;
        &self.volume[channel.min(MAX_CHANNELS - 1)][..used]
    }

    /// Calibrated power of a single window of mono `samples` (zero padded or
    /// truncated to the FFT length), written into `out`.
    pub fn window_power(&mut self, samples: &[f32], out: &mut [f32; SPECTRUM_LEN]) {
        self.fft.load_windowed(&mut self.scratch, |i| {
            samples.get(i).copied().unwrap_or(0.0)
        });
        self.fft.transform(&mut self.scratch);
        for (value, bin) in out.iter_mut().zip(self.scratch.iter()) {
            *value = (bin.norm_sqr() / self.reference_power).min(f32::MAX);
        }
    }

    /// Analyses one hardware buffer of interleaved samples.
    ///
    /// A mono stream only computes channel 0; downstream reads of channel 1
    /// see channel 0. Streams with more than two channels analyse the first
    /// two. Empty input or zero channels leave the previous frame untouched.
    pub fn process_block(&mut self, samples: &[f32], channels: usize) -> &SpectrumFrame {
        if channels == 0 || samples.len() < channels {
            return &self.frame;
        }

        let frames = (samples.len() / channels).min(self.max_frames);
        let analysed = channels.min(MAX_CHANNELS);
        let windows = if frames >= FFT_LEN {
            (frames - FFT_LEN) / SUB_WINDOW_STRIDE + 1
        } else {
            1
        };
        self.slots_per_bin = (frames / SPECTRUM_LEN).max(1);
        let slots = self.slots_per_bin;
        let share = 1.0 / windows as f32;

        self.frame.set_channels(analysed);
        for channel in 0..analysed {
            let volume = &mut self.volume[channel][..SPECTRUM_LEN * slots];
            volume.fill(0.0);

            for window in 0..windows {
                let start = window * SUB_WINDOW_STRIDE;
                self.fft.load_windowed(&mut self.scratch, |i| {
                    let frame = start + i;
                    if frame < frames {
                        samples[frame * channels + channel]
                    } else {
                        0.0
                    }
                });
                self.fft.transform(&mut self.scratch);

                let slot = (window * slots / windows).min(slots - 1);
                for (bin, value) in self.scratch[..SPECTRUM_LEN].iter().enumerate() {
                    let power = (value.norm_sqr() / self.reference_power).min(f32::MAX);
                    volume[bin * slots + slot] += power * share;
                }
            }

            let bins = self.frame.channel_mut(channel);
            for (bin, chunk) in bins.iter_mut().zip(volume.chunks_exact(slots)) {
                *bin = chunk.iter().sum::<f32>().min(f32::MAX);
            }
        }

        &self.frame
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft", &self.fft)
            .field("reference_power", &self.reference_power)
            .field("max_frames", &self.max_frames)
            .field("slots_per_bin", &self.slots_per_bin)
            .finish()
    }
}

/// The calibration tone: a sine at half the Nyquist frequency, one FFT
/// window long.
pub fn reference_signal() -> Vec<f32> {
    (0..FFT_LEN).map(reference_sample).collect()
}

fn reference_sample(index: usize) -> f32 {
    let cycles = (SPECTRUM_LEN / 2) as f32;
    (cycles * 2.0 * PI * index as f32 / FFT_LEN as f32).sin()
}

fn calibrate(fft: &Radix2Fft, scratch: &mut [Complex32]) -> f32 {
    fft.load_windowed(scratch, reference_sample);
    fft.transform(scratch);
    let peak = scratch[..SPECTRUM_LEN]
        .iter()
        .map(|bin| bin.norm_sqr())
        .fold(0.0f32, f32::max);
    reference_from_peak(peak)
}

/// Zero, negative or non-finite peaks clamp to the smallest positive power.
fn reference_from_peak(peak: f32) -> f32 {
    if peak.is_finite() && peak > 0.0 {
        peak
    } else {
        tracing::warn!(peak, "reference power degenerate, clamping");
        f32::MIN_POSITIVE
    }
}
