//! Turns spectrum spikes into sub-projectiles.
//!
//! The spawner is the only place where analysis output reaches the game. It
//! keeps its own short [`SpectrumHistory`] and fires one sub-projectile per
//! `(channel, bin)` whose power jumps well above that bin's recent floor.

use glam::Vec2;

use crate::consts::{DETECTION_THRESHOLD, HISTORY_DEPTH, SPECTRUM_LEN, SUB_PROJECTILE_SPEED};
use crate::entity::SubProjectilePool;
use crate::spectrum::{SpectrumFrame, SpectrumHistory};
use crate::{Angle, Angles};

/// Spike test of one bin against its history.
///
/// Compares on a log scale: `ln(1 + current) / ln(1 + min(history))`. A
/// non-positive baseline never counts as a spike.
pub fn is_spike<const K: usize>(current: f32, history: [f32; K], threshold: f32) -> bool {
    let mut sorted = history;
    sorted.sort_by(f32::total_cmp);
    let Some(&floor) = sorted.first() else {
        return false;
    };

    let baseline = floor.ln_1p();
    if !baseline.is_finite() || baseline <= 0.0 {
        return false;
    }
    current.ln_1p() / baseline >= threshold
}

/// Launch heading for `bin`: the bin range sweeps one full turn starting at
/// half a turn back. The second channel mirrors the first.
pub fn bin_heading(bin: usize, channel: usize) -> Angle {
    let heading = bin as Angle * Angles::FULL_TURN / SPECTRUM_LEN as Angle - Angles::HALF_TURN;
    if channel == 1 {
        -heading
    } else {
        heading
    }
}

#[derive(Debug, Clone)]
pub struct SpectrumReactiveSpawner {
    history: SpectrumHistory<HISTORY_DEPTH>,
    threshold: f32,
    speed: f32,
    spawned: u64,
}

impl SpectrumReactiveSpawner {
    pub fn new() -> Self {
        Self::with_threshold(DETECTION_THRESHOLD)
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            history: SpectrumHistory::new(),
            threshold,
            speed: SUB_PROJECTILE_SPEED,
            spawned: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn history(&self) -> &SpectrumHistory<HISTORY_DEPTH> {
        &self.history
    }

    /// Sub-projectiles spawned since construction.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Tests `frame` against the frames seen so far, spawns a sub-projectile
    /// at `origin` for every spike, then records `frame` in the history.
    /// Returns the number spawned; spikes that find the pool full are dropped.
    ///
    /// The history therefore moves once per audio frame, not once per tick:
    /// callers pass each new frame exactly once.
    pub fn observe(
        &mut self,
        frame: &SpectrumFrame,
        origin: Vec2,
        angles: &Angles,
        subs: &mut SubProjectilePool,
    ) -> usize {
        let mut spawned = 0;
        let mut dropped = 0;

        for channel in 0..frame.channels() {
            for (bin, &current) in frame.channel(channel).iter().enumerate() {
                if !is_spike(current, self.history.samples(channel, bin), self.threshold) {
                    continue;
                }
                let heading = bin_heading(bin, channel);
                match subs.create_with(|s| s.launch(origin, heading, self.speed, angles)) {
                    Some(_) => spawned += 1,
                    None => dropped += 1,
                }
            }
        }

        self.history.push(frame);
        self.spawned += spawned as u64;
        if spawned > 0 || dropped > 0 {
            tracing::debug!(spawned, dropped, "spectrum spikes");
        }
        spawned
    }

    /// Forgets the history, e.g. on track change.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl Default for SpectrumReactiveSpawner {
    fn default() -> Self {
        Self::new()
    }
}

/// Music-independent emitter: fires a pair of opposing sub-projectiles
/// every `interval` ticks along a slowly rotating axis.
#[derive(Debug, Clone)]
pub struct SweepEmitter {
    interval: u32,
    countdown: u32,
    angle: Angle,
}

impl SweepEmitter {
    pub fn new(interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            countdown: interval,
            angle: 0,
        }
    }

    pub fn angle(&self) -> Angle {
        self.angle
    }

    pub fn tick(&mut self, origin: Vec2, angles: &Angles, subs: &mut SubProjectilePool) -> usize {
        self.angle = Angles::wrap(self.angle + (Angles::FULL_TURN / 256).max(1));
        self.countdown -= 1;
        if self.countdown > 0 {
            return 0;
        }
        self.countdown = self.interval;

        let mut spawned = 0;
        for heading in [self.angle, self.angle + Angles::HALF_TURN] {
            if subs
                .create_with(|s| s.launch(origin, heading, SUB_PROJECTILE_SPEED, angles))
                .is_some()
            {
                spawned += 1;
            }
        }
        spawned
    }
}
