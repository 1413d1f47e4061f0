use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ArcadeError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub sim: SimConfig,
    pub spawner: SpawnerConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.sim.validate()?;
        self.spawner.validate()
    }
}

/// Audio source and buffer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Frames per callback buffer.
    pub buffer_frames: usize,
    /// Frequency of the built-in test tone.
    pub tone_hz: f32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Length of the built-in test tone.
    pub seconds: f32,
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.buffer_frames == 0 {
            return Err(ArcadeError::InvalidConfig("audio.buffer_frames must be positive"));
        }
        if self.sample_rate == 0 {
            return Err(ArcadeError::InvalidConfig("audio.sample_rate must be positive"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ArcadeError::InvalidConfig("audio.channels must be 1 or 2"));
        }
        if !(self.tone_hz.is_finite() && self.tone_hz > 0.0) {
            return Err(ArcadeError::InvalidConfig("audio.tone_hz must be positive"));
        }
        if !(self.seconds.is_finite() && self.seconds > 0.0) {
            return Err(ArcadeError::InvalidConfig("audio.seconds must be positive"));
        }
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_frames: 1024,
            tone_hz: 440.0,
            sample_rate: 44_100,
            channels: 2,
            seconds: 10.0,
        }
    }
}

/// Simulation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_hz: u32,
    /// Seed for spark scatter.
    pub seed: u64,
    /// Stop after this many ticks. `None` runs until playback ends.
    pub max_ticks: Option<u64>,
}

impl SimConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_hz == 0 {
            return Err(ArcadeError::InvalidConfig("sim.tick_hz must be positive"));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            seed: 0x5eed,
            max_ticks: None,
        }
    }
}

/// Where sub-projectiles come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Spikes in the live spectrum.
    #[default]
    Spectrum,
    /// Fixed rotating pattern, independent of the music.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub mode: SpawnMode,
    /// Ticks between sweep pairs.
    pub sweep_interval: u32,
}

impl SpawnerConfig {
    fn validate(&self) -> Result<()> {
        if self.sweep_interval == 0 {
            return Err(ArcadeError::InvalidConfig("spawner.sweep_interval must be positive"));
        }
        Ok(())
    }
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            mode: SpawnMode::Spectrum,
            sweep_interval: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.audio.buffer_frames, 1024);
        assert_eq!(config.sim.tick_hz, 60);
        assert_eq!(config.spawner.sweep_interval, 2);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "spawner": { "mode": "sweep" }, "sim": { "seed": 9 } }"#)
                .unwrap();
        assert_eq!(config.spawner.mode, SpawnMode::Sweep);
        assert_eq!(config.spawner.sweep_interval, 2);
        assert_eq!(config.sim.seed, 9);
        assert_eq!(config.sim.tick_hz, 60);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        config.audio.channels = 3;
        assert!(matches!(config.validate(), Err(ArcadeError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.sim.tick_hz = 0;
        assert!(matches!(config.validate(), Err(ArcadeError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.audio.tone_hz = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_and_validates_files() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("spectrum-arcade-good-{}.json", std::process::id()));
        let bad = dir.join(format!("spectrum-arcade-bad-{}.json", std::process::id()));
        std::fs::write(&good, r#"{ "audio": { "buffer_frames": 2048 } }"#).unwrap();
        std::fs::write(&bad, r#"{ "spawner": { "sweep_interval": 0 } }"#).unwrap();

        let config = AppConfig::load(&good).unwrap();
        assert_eq!(config.audio.buffer_frames, 2048);
        assert!(matches!(AppConfig::load(&bad), Err(ArcadeError::InvalidConfig(_))));
        assert!(matches!(
            AppConfig::load(dir.join("spectrum-arcade-missing.json")),
            Err(ArcadeError::Io(_))
        ));

        std::fs::remove_file(good).unwrap();
        std::fs::remove_file(bad).unwrap();
    }
}
