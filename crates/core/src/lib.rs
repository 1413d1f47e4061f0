//! Core library for the Spectrum Arcade game.
//!
//! Two subsystems do the heavy lifting: the spectral analysis engine that runs
//! inside the audio callback ([`analysis`], [`spectrum`], [`audio`]) and the
//! fixed-capacity entity pool that the simulation tick drives ([`pool`],
//! [`entity`]). The [`spawner`] bridges the two, and [`scene`] wires all of it
//! into one tick. Rendering and input are consumed through the narrow
//! [`render::Canvas`] and [`scene::PlayerInput`] surfaces.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod entity;
pub mod error;
pub mod pool;
pub mod raster;
pub mod render;
pub mod scene;
pub mod spawner;
pub mod spectrum;
pub mod timeline;
pub mod trig;

pub use analysis::SpectrumAnalyzer;
pub use audio::{
    AudioEngine, AudioSource, Playback, StreamCallback, StreamShared, StreamStatus, ToneSource,
    WavSource,
};
pub use config::{AppConfig, AudioConfig, SimConfig, SpawnMode, SpawnerConfig};
pub use entity::{
    Field, Projectile, ProjectilePool, Spark, SparkPool, SubProjectile, SubProjectilePool,
};
pub use error::{ArcadeError, Result};
pub use pool::{EntityPool, Handle, Pooled, Step};
pub use raster::{ArrowShape, Stencil};
pub use render::{Canvas, Color, DrawList, Primitive};
pub use scene::{Facing, Player, PlayerInput, Scene};
pub use spawner::{SpectrumReactiveSpawner, SweepEmitter};
pub use spectrum::{SharedSpectrum, SpectrumFrame, SpectrumHistory};
pub use timeline::TickPacer;
pub use trig::{Angle, AngleTable};

/// Angle table at the game's resolution.
pub type Angles = AngleTable<{ consts::ANGLE_BITS }>;

/// Build-time tuning constants.
pub mod consts {
    /// Angle space is `1 << ANGLE_BITS` steps per turn.
    pub const ANGLE_BITS: u32 = 8;

    /// Output bins per channel in a spectrum frame.
    pub const SPECTRUM_LEN: usize = 1 << 8;
    pub const LG_FFT_LEN: u32 = 9;
    /// FFT window; twice the bin count so the kept half spans 0..Nyquist.
    pub const FFT_LEN: usize = 1 << LG_FFT_LEN;
    /// Hop between overlapping FFT windows inside one hardware buffer.
    pub const SUB_WINDOW_STRIDE: usize = 4;
    pub const MAX_CHANNELS: usize = 2;
    /// Frames kept by the spawner to judge a spike against.
    pub const HISTORY_DEPTH: usize = 3;

    /// Spike test: `ln(1 + now) / ln(1 + baseline)` must reach this.
    pub const DETECTION_THRESHOLD: f32 = 2.0;

    pub const FIELD_WIDTH: f32 = 440.0;
    pub const FIELD_HEIGHT: f32 = 440.0;

    pub const SPARK_BURST: usize = 12;
    pub const SPARK_CAPACITY: usize = 1024 * SPARK_BURST;
    pub const SPARK_LIFETIME: u32 = 30;
    pub const SPARK_SPEED: f32 = 25.0 / SPARK_LIFETIME as f32;
    pub const SPARK_LENGTH: f32 = 3.0;

    pub const PROJECTILE_CAPACITY: usize = 256 * 2;
    /// Boundary hits a projectile survives before it bursts for good.
    pub const PROJECTILE_PHASES: u32 = 2;

    pub const SUB_PROJECTILE_CAPACITY: usize = 256;
    pub const SUB_PROJECTILE_SPEED: f32 = 1.75;

    pub const PLAYER_SPEED: f32 = 1.25;
}
