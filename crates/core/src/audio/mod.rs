//! Audio sources and the audio-context thread.
//!
//! [`AudioEngine::start`] moves a source and a freshly calibrated
//! [`SpectrumAnalyzer`] onto a dedicated thread that runs the
//! [`StreamCallback`] once per hardware-buffer period. The only state the
//! simulation sees is [`StreamShared`]: flags, progress and the published
//! spectrum, all lock free.

use std::f32::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{ArcadeError, Result, SharedSpectrum, SpectrumAnalyzer};

/// Interleaved `f32` sample stream.
pub trait AudioSource: Send {
    fn channel_count(&self) -> u16;
    fn sample_rate(&self) -> u32;
    /// Length in frames, if known.
    fn total_frames(&self) -> Option<u64>;
    /// Fills `out` with whole frames and returns how many frames were read.
    /// Fewer than requested means the stream has ended.
    fn read(&mut self, out: &mut [f32]) -> usize;
}

/// Sine test tone of bounded length.
#[derive(Debug, Clone)]
pub struct ToneSource {
    hz: f32,
    amplitude: f32,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
    position: u64,
}

impl ToneSource {
    pub fn new(hz: f32, sample_rate: u32, channels: u16, seconds: f32) -> Self {
        Self {
            hz,
            amplitude: 0.5,
            sample_rate,
            channels,
            total_frames: (seconds.max(0.0) * sample_rate as f32) as u64,
            position: 0,
        }
    }
}

impl AudioSource for ToneSource {
    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total_frames)
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        let channels = usize::from(self.channels.max(1));
        let step = 2.0 * PI * self.hz / self.sample_rate.max(1) as f32;
        let mut frames = 0;
        for frame in out.chunks_exact_mut(channels) {
            if self.position >= self.total_frames {
                break;
            }
            let phase = (self.position as f64 * step as f64) % (2.0 * std::f64::consts::PI);
            frame.fill(self.amplitude * (phase as f32).sin());
            self.position += 1;
            frames += 1;
        }
        frames
    }
}

/// WAV file adapter. Integer PCM is scaled into `[-1, 1]`.
pub struct WavSource {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    total_frames: u64,
    failed: bool,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let total_frames = u64::from(reader.duration());
        tracing::info!(
            path = %path.display(),
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            bits = spec.bits_per_sample,
            "opened wav source"
        );
        Ok(Self {
            reader,
            spec,
            total_frames,
            failed: false,
        })
    }
}

impl AudioSource for WavSource {
    fn channel_count(&self) -> u16 {
        self.spec.channels
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total_frames)
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        let channels = usize::from(self.spec.channels.max(1));
        let wanted = out.len() / channels * channels;
        if self.failed || wanted == 0 {
            return 0;
        }

        let read = match self.spec.sample_format {
            hound::SampleFormat::Float => {
                fill_from(&mut out[..wanted], self.reader.samples::<f32>(), |s| s)
            }
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample.max(1) - 1)) as f32;
                fill_from(&mut out[..wanted], self.reader.samples::<i32>(), |s| {
                    s as f32 * scale
                })
            }
        };
        match read {
            Ok(samples) => samples / channels,
            Err(err) => {
                tracing::warn!(%err, "wav decode failed, ending stream");
                self.failed = true;
                0
            }
        }
    }
}

impl std::fmt::Debug for WavSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSource")
            .field("spec", &self.spec)
            .field("total_frames", &self.total_frames)
            .finish()
    }
}

fn fill_from<S>(
    out: &mut [f32],
    samples: impl Iterator<Item = hound::Result<S>>,
    convert: impl Fn(S) -> f32,
) -> hound::Result<usize> {
    let mut written = 0;
    for (slot, sample) in out.iter_mut().zip(samples) {
        *slot = convert(sample?);
        written += 1;
    }
    Ok(written)
}

/// What the audio backend should do after one callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Continue,
    Complete,
}

/// State shared between the audio context and the simulation.
#[derive(Debug)]
pub struct StreamShared {
    running: AtomicBool,
    playing: AtomicBool,
    progress: AtomicU32,
    spectrum: SharedSpectrum,
}

impl StreamShared {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            progress: AtomicU32::new(0f32.to_bits()),
            spectrum: SharedSpectrum::new(),
        }
    }

    /// Keep-running flag, checked at the top of every callback.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Fraction of the source played, `0..=1`.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    pub fn spectrum(&self) -> &SharedSpectrum {
        &self.spectrum
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    fn set_progress(&self, progress: f32) {
        self.progress
            .store(progress.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

impl Default for StreamShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of the audio context: pulls one buffer from the source, hands it to
/// the output and publishes its spectrum.
pub struct StreamCallback {
    source: Box<dyn AudioSource>,
    analyzer: SpectrumAnalyzer,
    shared: Arc<StreamShared>,
    buffer: Vec<f32>,
    channels: usize,
    frames_played: u64,
}

impl StreamCallback {
    pub fn new(
        source: Box<dyn AudioSource>,
        buffer_frames: usize,
        shared: Arc<StreamShared>,
    ) -> Self {
        let channels = usize::from(source.channel_count().max(1));
        shared.set_playing(true);
        shared.set_progress(0.0);
        Self {
            source,
            analyzer: SpectrumAnalyzer::new(buffer_frames),
            shared,
            buffer: vec![0.0; buffer_frames.max(1) * channels],
            channels,
            frames_played: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn buffer_frames(&self) -> usize {
        self.buffer.len() / self.channels
    }

    /// Runs one callback. `output` receives the interleaved samples; it is
    /// zeroed first and may be any length.
    pub fn process(&mut self, output: &mut [f32]) -> StreamStatus {
        if !self.shared.is_running() {
            self.shared.set_playing(false);
            return StreamStatus::Complete;
        }

        output.fill(0.0);
        let frames = self.source.read(&mut self.buffer).min(self.buffer_frames());
        let samples = &self.buffer[..frames * self.channels];
        let copied = samples.len().min(output.len());
        output[..copied].copy_from_slice(&samples[..copied]);

        self.frames_played += frames as u64;
        if let Some(total) = self.source.total_frames().filter(|&t| t > 0) {
            self.shared
                .set_progress(self.frames_played as f32 / total as f32);
        }

        if frames > 0 {
            let frame = self.analyzer.process_block(samples, self.channels);
            self.shared.spectrum.publish(frame);
        }

        if frames < self.buffer_frames() {
            self.shared.set_playing(false);
            StreamStatus::Complete
        } else {
            StreamStatus::Continue
        }
    }
}

impl std::fmt::Debug for StreamCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCallback")
            .field("analyzer", &self.analyzer)
            .field("channels", &self.channels)
            .field("frames_played", &self.frames_played)
            .finish()
    }
}

/// Starts audio threads.
#[derive(Debug, Clone)]
pub struct AudioEngine {
    buffer_frames: usize,
    paced: bool,
}

impl AudioEngine {
    pub fn new(buffer_frames: usize) -> Self {
        Self {
            buffer_frames: buffer_frames.max(1),
            paced: true,
        }
    }

    /// Runs callbacks back to back instead of at buffer cadence.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn buffer_frames(&self) -> usize {
        self.buffer_frames
    }

    pub fn start(&self, source: Box<dyn AudioSource>) -> Result<Playback> {
        let channels = source.channel_count();
        let sample_rate = source.sample_rate();
        if channels == 0 {
            return Err(ArcadeError::AudioInit("source has no channels".into()));
        }
        if sample_rate == 0 {
            return Err(ArcadeError::AudioInit("source has a zero sample rate".into()));
        }

        let shared = Arc::new(StreamShared::new());
        let mut callback = StreamCallback::new(source, self.buffer_frames, shared.clone());
        let period = self
            .paced
            .then(|| Duration::from_secs_f64(self.buffer_frames as f64 / sample_rate as f64));
        let mut output = vec![0.0f32; self.buffer_frames * usize::from(channels)];

        let thread = thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                let mut deadline = Instant::now();
                while callback.process(&mut output) == StreamStatus::Continue {
                    if let Some(period) = period {
                        deadline += period;
                        thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    }
                }
                tracing::debug!(frames = callback.frames_played, "audio stream complete");
            })?;

        tracing::info!(
            channels,
            sample_rate,
            buffer_frames = self.buffer_frames,
            "playback started"
        );
        Ok(Playback {
            shared,
            thread: Some(thread),
        })
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A running audio thread. Dropping it stops playback.
#[derive(Debug)]
pub struct Playback {
    shared: Arc<StreamShared>,
    thread: Option<JoinHandle<()>>,
}

impl Playback {
    pub fn shared(&self) -> &Arc<StreamShared> {
        &self.shared
    }

    pub fn is_finished(&self) -> bool {
        match &self.thread {
            Some(thread) => thread.is_finished(),
            None => true,
        }
    }

    /// Clears the keep-running flag and joins the audio thread.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.request_stop();
        self.join()
    }

    /// Waits for the stream to end on its own.
    pub fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread
            .join()
            .map_err(|_| ArcadeError::msg("audio thread panicked"))?;
        tracing::info!(progress = self.shared.progress(), "playback stopped");
        Ok(())
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "failed to stop playback");
        }
    }
}
