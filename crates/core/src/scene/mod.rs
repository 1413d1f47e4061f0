use std::sync::Arc;

use glam::{IVec2, Vec2};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::{SimConfig, SpawnMode, SpawnerConfig};
use crate::consts::{PLAYER_SPEED, SPECTRUM_LEN};
use crate::entity::{Field, ProjectilePool, Spark, SparkPool, SubProjectilePool};
use crate::raster::{ArrowShape, Stencil};
use crate::render::{Canvas, Color};
use crate::spawner::{SpectrumReactiveSpawner, SweepEmitter};
use crate::spectrum::{SharedSpectrum, SpectrumFrame};
use crate::Angles;

pub const PLAYER_COLOR: Color = Color::rgb(0, 0, 0);
pub const HUD_COLOR: Color = Color::rgb(192, 192, 192);

/// Direction keys held this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

const MOVE_LEFT: u8 = 0b0001;
const MOVE_RIGHT: u8 = 0b0010;
const MOVE_UP: u8 = 0b0100;
const MOVE_DOWN: u8 = 0b1000;
const WALK_CYCLE: u32 = 8;

#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub facing: Facing,
    motion: u8,
    walk: u32,
}

impl Player {
    pub fn new(field: &Field) -> Self {
        Self {
            pos: Vec2::new(field.width / 2.0, field.height * 3.0 / 4.0),
            facing: Facing::Down,
            motion: 0,
            walk: 0,
        }
    }

    /// Walk animation counter, `0..8`; zero while standing.
    pub fn walk(&self) -> u32 {
        self.walk
    }

    pub fn update(&mut self, input: PlayerInput, field: &Field) {
        if !(input.up || input.down) {
            if input.left {
                self.facing = Facing::Left;
            } else if input.right {
                self.facing = Facing::Right;
            }
        }
        if !(input.left || input.right) {
            if input.up {
                self.facing = Facing::Up;
            } else if input.down {
                self.facing = Facing::Down;
            }
        }

        // Both keys of an axis held: that axis keeps last tick's motion.
        if !(input.left && input.right) {
            self.set_motion(MOVE_LEFT, input.left);
            self.set_motion(MOVE_RIGHT, input.right);
        }
        if !(input.up && input.down) {
            self.set_motion(MOVE_UP, input.up);
            self.set_motion(MOVE_DOWN, input.down);
        }

        let mut step = Vec2::ZERO;
        if self.motion & MOVE_LEFT != 0 {
            step.x = -PLAYER_SPEED;
        } else if self.motion & MOVE_RIGHT != 0 {
            step.x = PLAYER_SPEED;
        }
        if self.motion & MOVE_UP != 0 {
            step.y = -PLAYER_SPEED;
        } else if self.motion & MOVE_DOWN != 0 {
            step.y = PLAYER_SPEED;
        }

        if step == Vec2::ZERO {
            self.walk = 0;
        } else {
            self.walk = (self.walk + 1) % WALK_CYCLE;
        }
        if step.x != 0.0 && step.y != 0.0 {
            step *= std::f32::consts::FRAC_1_SQRT_2;
        }

        self.pos += step;
        self.pos.x = clamp_axis(self.pos.x, field.width);
        self.pos.y = clamp_axis(self.pos.y, field.height);
    }

    /// Square marker with a tick towards the facing direction.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let c = self.pos.as_ivec2();
        let corners = [
            c + IVec2::new(-3, -3),
            c + IVec2::new(3, -3),
            c + IVec2::new(3, 3),
            c + IVec2::new(-3, 3),
        ];
        for i in 0..corners.len() {
            canvas.line(corners[i], corners[(i + 1) % corners.len()], PLAYER_COLOR);
        }
        let facing = match self.facing {
            Facing::Up => IVec2::NEG_Y,
            Facing::Down => IVec2::Y,
            Facing::Left => IVec2::NEG_X,
            Facing::Right => IVec2::X,
        };
        canvas.line(c, c + facing * 5, PLAYER_COLOR);
    }

    fn set_motion(&mut self, bit: u8, held: bool) {
        if held {
            self.motion |= bit;
        } else {
            self.motion &= !bit;
        }
    }
}

fn clamp_axis(value: f32, extent: f32) -> f32 {
    if value < 0.0 {
        0.0
    } else if value >= extent {
        extent - 1.0
    } else {
        value
    }
}

/// One game scene: the player, the three entity pools and whatever feeds
/// them sub-projectiles.
#[derive(Debug)]
pub struct Scene {
    angles: Arc<Angles>,
    field: Field,
    arrow: ArrowShape,
    player: Player,
    sparks: SparkPool,
    projectiles: ProjectilePool,
    subs: SubProjectilePool,
    mode: SpawnMode,
    spawner: SpectrumReactiveSpawner,
    sweep: SweepEmitter,
    rng: Pcg32,
    spectrum: SpectrumFrame,
    generation: u64,
    ticks: u64,
}

impl Scene {
    pub fn new(angles: Arc<Angles>, sim: &SimConfig, spawner: &SpawnerConfig) -> Self {
        let field = Field::default();
        Self {
            arrow: ArrowShape::new(&angles),
            angles,
            player: Player::new(&field),
            field,
            sparks: SparkPool::new(),
            projectiles: ProjectilePool::new(),
            subs: SubProjectilePool::new(),
            mode: spawner.mode,
            spawner: SpectrumReactiveSpawner::new(),
            sweep: SweepEmitter::new(spawner.sweep_interval),
            rng: Pcg32::seed_from_u64(sim.seed),
            spectrum: SpectrumFrame::default(),
            generation: 0,
            ticks: 0,
        }
    }

    pub fn angles(&self) -> &Arc<Angles> {
        &self.angles
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn sparks(&self) -> &SparkPool {
        &self.sparks
    }

    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    pub fn subs(&self) -> &SubProjectilePool {
        &self.subs
    }

    pub fn spawner(&self) -> &SpectrumReactiveSpawner {
        &self.spawner
    }

    /// Spectrum as of the last tick.
    pub fn spectrum(&self) -> &SpectrumFrame {
        &self.spectrum
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one simulation tick against the live spectrum. A spectrum frame
    /// is judged by the spawner once, on the first tick that sees it.
    /// Returns the number of sub-projectiles spawned.
    pub fn tick(&mut self, input: PlayerInput, spectrum: &SharedSpectrum) -> usize {
        self.advance(input);
        let generation = spectrum.snapshot_into(&mut self.spectrum);
        let fresh = generation != self.generation;
        self.generation = generation;
        self.spawn(fresh)
    }

    /// [`tick`](Self::tick) with an explicit frame; `None` means no new
    /// analysis arrived since the previous tick.
    pub fn tick_with(&mut self, input: PlayerInput, frame: Option<&SpectrumFrame>) -> usize {
        self.advance(input);
        if let Some(frame) = frame {
            self.spectrum.clone_from(frame);
        }
        self.spawn(frame.is_some())
    }

    fn advance(&mut self, input: PlayerInput) {
        self.player.update(input, &self.field);

        let Self {
            angles,
            field,
            rng,
            sparks,
            projectiles,
            subs,
            ..
        } = self;
        let angles: &Angles = angles;
        subs.update_all(|s| s.update(field, angles, rng, sparks, projectiles));
        projectiles.update_all(|p| p.update(field, angles, rng, sparks));
        sparks.update_all(Spark::update);

        self.ticks += 1;
    }

    fn spawn(&mut self, fresh: bool) -> usize {
        match self.mode {
            SpawnMode::Spectrum if fresh => self.spawner.observe(
                &self.spectrum,
                self.player.pos,
                &self.angles,
                &mut self.subs,
            ),
            SpawnMode::Spectrum => 0,
            SpawnMode::Sweep => self
                .sweep
                .tick(self.field.center(), &self.angles, &mut self.subs),
        }
    }

    /// Draws everything alive, including whatever this tick spawned.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let angles: &Angles = &self.angles;
        let mut stencil = Stencil::new();

        self.projectiles
            .draw_all(|p| p.draw(&self.arrow, angles, &mut stencil, canvas));
        self.player.draw(canvas);
        self.subs.draw_all(|s| s.draw(&self.arrow, angles, canvas));
        self.sparks.draw_all(|s| s.draw(canvas));
    }

    /// Field border, playback progress under the field and the spectrum of
    /// both channels growing inwards from the side edges.
    pub fn draw_hud(&self, canvas: &mut dyn Canvas, progress: f32) {
        let w = self.field.width as i32;
        let h = self.field.height as i32;
        let corners = [
            IVec2::ZERO,
            IVec2::new(w, 0),
            IVec2::new(w, h),
            IVec2::new(0, h),
        ];
        for i in 0..corners.len() {
            canvas.line(corners[i], corners[(i + 1) % corners.len()], PLAYER_COLOR);
        }

        let filled = (progress.clamp(0.0, 1.0) * self.field.width) as i32;
        canvas.line(IVec2::new(0, h + 4), IVec2::new(filled, h + 4), PLAYER_COLOR);

        let top = (h - SPECTRUM_LEN as i32) / 2;
        let half = self.field.width / 2.0;
        for bin in 0..SPECTRUM_LEN {
            let y = top + bin as i32;
            let left = (self.spectrum.bin(0, bin).min(1.0) * half) as i32;
            let right = (self.spectrum.bin(1, bin).min(1.0) * half) as i32;
            if left > 0 {
                canvas.line(IVec2::new(0, y), IVec2::new(left, y), HUD_COLOR);
            }
            if right > 0 {
                canvas.line(IVec2::new(w, y), IVec2::new(w - right, y), HUD_COLOR);
            }
        }
    }

    /// Scene transition: every entity goes, and the spawner forgets its
    /// history.
    pub fn clear(&mut self) {
        self.sparks.clear();
        self.projectiles.clear();
        self.subs.clear();
        self.spawner.reset();
        tracing::debug!(ticks = self.ticks, "scene cleared");
    }
}
