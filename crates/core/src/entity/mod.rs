//! Entity payloads and their per-tick policies.
//!
//! Each kind lives in its own [`EntityPool`]. Boundary hits convert entities:
//! a sub-projectile promotes into a projectile, and every hit throws a burst
//! of sparks.

use glam::{BVec2, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{
    FIELD_HEIGHT, FIELD_WIDTH, PROJECTILE_CAPACITY, PROJECTILE_PHASES, SPARK_BURST,
    SPARK_CAPACITY, SPARK_LENGTH, SPARK_LIFETIME, SPARK_SPEED, SUB_PROJECTILE_CAPACITY,
};
use crate::pool::{EntityPool, Pooled, Step};
use crate::raster::{ArrowShape, Stencil};
use crate::render::{Canvas, Color};
use crate::{Angle, Angles};

pub const PROJECTILE_COLOR: Color = Color::rgb(192, 0, 0);
pub const SUB_PROJECTILE_COLOR: Color = Color::rgb(0, 0, 192);

pub type SparkPool = EntityPool<Spark, SPARK_CAPACITY>;
pub type ProjectilePool = EntityPool<Projectile, PROJECTILE_CAPACITY>;
pub type SubProjectilePool = EntityPool<SubProjectile, SUB_PROJECTILE_CAPACITY>;

/// Playing field, `[0, width] x [0, height]` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.crossing(point).is_none()
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(Vec2::ZERO, self.size())
    }

    /// `None` while `point` is inside the field. The far edges belong to the
    /// outside: `x == width` is a crossing while `x == 0` is not.
    pub fn crossing(&self, point: Vec2) -> Option<Crossing> {
        let clamped = self.clamp(point);
        let axes = point.cmpne(clamped) | point.cmpge(self.size());
        axes.any().then_some(Crossing {
            point: clamped,
            axes,
        })
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new(FIELD_WIDTH, FIELD_HEIGHT)
    }
}

/// Where and on which axes a position left the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// The position clamped back onto the boundary.
    pub point: Vec2,
    pub axes: BVec2,
}

impl Crossing {
    /// `velocity` with its component flipped on every crossed axis.
    pub fn reflect(&self, velocity: Vec2) -> Vec2 {
        Vec2::select(self.axes, -velocity, velocity)
    }
}

/// Throws [`SPARK_BURST`] sparks out of `at`. Returns how many fit in the pool.
pub fn spark_burst<const N: usize>(
    sparks: &mut EntityPool<Spark, N>,
    angles: &Angles,
    rng: &mut impl Rng,
    at: Vec2,
    color: Color,
) -> usize {
    let mut created = 0;
    for _ in 0..SPARK_BURST {
        let r: Angle = rng.random_range(0..64);
        let heading = Angles::HALF_TURN * (r - 32) / 32;
        let velocity = angles.direction(heading) * SPARK_SPEED;
        if sparks
            .create_with(|spark| spark.launch(at, velocity, color))
            .is_none()
        {
            break;
        }
        created += 1;
    }
    created
}

/// Short-lived debris with a fixed velocity.
#[derive(Debug, Clone, Default)]
pub struct Spark {
    pub pos: Vec2,
    pub vel: Vec2,
    pub age: u32,
    pub color: Color,
}

impl Pooled for Spark {}

impl Spark {
    pub fn launch(&mut self, pos: Vec2, vel: Vec2, color: Color) {
        self.pos = pos;
        self.vel = vel;
        self.color = color;
    }

    pub fn update(&mut self) -> Step {
        self.age += 1;
        if self.age >= SPARK_LIFETIME {
            return Step::Delete;
        }
        self.pos += self.vel;
        Step::Keep
    }

    /// A short streak from the spark along its velocity, tipped with a pixel.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let from = self.pos.as_ivec2();
        let tip = (self.pos + self.vel * SPARK_LENGTH).as_ivec2();
        canvas.line(from, tip, self.color);
        canvas.pixel(tip, self.color);
    }
}

/// Heavy bullet. Bounces off the field until it runs out of phases.
#[derive(Debug, Clone, Default)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub heading: Angle,
    pub phase: u32,
    pub color: Color,
}

impl Pooled for Projectile {
    fn on_create(&mut self) {
        self.color = PROJECTILE_COLOR;
    }
}

impl Projectile {
    pub fn launch(&mut self, pos: Vec2, vel: Vec2, angles: &Angles) {
        self.pos = pos;
        self.vel = vel;
        self.heading = angles.atan2(vel.y, vel.x);
    }

    pub fn update(
        &mut self,
        field: &Field,
        angles: &Angles,
        rng: &mut impl Rng,
        sparks: &mut SparkPool,
    ) -> Step {
        self.pos += self.vel;
        let Some(hit) = field.crossing(self.pos) else {
            return Step::Keep;
        };

        spark_burst(sparks, angles, rng, hit.point, self.color);
        self.phase += 1;
        if self.phase >= PROJECTILE_PHASES {
            return Step::Delete;
        }
        let vel = hit.reflect(self.vel);
        self.launch(hit.point, vel, angles);
        Step::Keep
    }

    pub fn draw(
        &self,
        shape: &ArrowShape,
        angles: &Angles,
        stencil: &mut Stencil,
        canvas: &mut dyn Canvas,
    ) {
        shape.draw_filled(angles, canvas, stencil, self.pos, self.heading, self.color);
    }
}

/// Light bullet spawned by the music. Promotes into a [`Projectile`] at the
/// first boundary it reaches.
#[derive(Debug, Clone, Default)]
pub struct SubProjectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub heading: Angle,
    pub color: Color,
}

impl Pooled for SubProjectile {
    fn on_create(&mut self) {
        self.color = SUB_PROJECTILE_COLOR;
    }
}

impl SubProjectile {
    pub fn launch(&mut self, pos: Vec2, heading: Angle, speed: f32, angles: &Angles) {
        self.pos = pos;
        self.heading = Angles::wrap(heading);
        self.vel = angles.direction(heading) * speed;
    }

    pub fn update(
        &mut self,
        field: &Field,
        angles: &Angles,
        rng: &mut impl Rng,
        sparks: &mut SparkPool,
        projectiles: &mut ProjectilePool,
    ) -> Step {
        self.pos += self.vel;
        let Some(hit) = field.crossing(self.pos) else {
            return Step::Keep;
        };

        spark_burst(sparks, angles, rng, hit.point, self.color);
        let vel = hit.reflect(self.vel);
        if projectiles
            .create_with(|p| p.launch(hit.point, vel, angles))
            .is_none()
        {
            tracing::trace!("projectile pool full, promotion dropped");
        }
        Step::Delete
    }

    pub fn draw(&self, shape: &ArrowShape, angles: &Angles, canvas: &mut dyn Canvas) {
        shape.draw_outline(angles, canvas, self.pos, self.heading, self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SUB_PROJECTILE_SPEED;
    use crate::render::{DrawList, Primitive};
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct World {
        field: Field,
        angles: Angles,
        rng: Pcg32,
        sparks: SparkPool,
        projectiles: ProjectilePool,
        subs: SubProjectilePool,
    }

    impl World {
        fn new() -> Self {
            Self {
                field: Field::default(),
                angles: Angles::new(),
                rng: Pcg32::seed_from_u64(7),
                sparks: SparkPool::new(),
                projectiles: ProjectilePool::new(),
                subs: SubProjectilePool::new(),
            }
        }

        fn tick_subs(&mut self) {
            let Self {
                field,
                angles,
                rng,
                sparks,
                projectiles,
                subs,
            } = self;
            subs.update_all(|s| s.update(field, angles, rng, sparks, projectiles));
        }

        fn tick_projectiles(&mut self) {
            let Self {
                field,
                angles,
                rng,
                sparks,
                projectiles,
                ..
            } = self;
            projectiles.update_all(|p| p.update(field, angles, rng, sparks));
        }
    }

    #[test]
    fn crossing_clamps_and_reports_axes() {
        let field = Field::new(100.0, 50.0);
        assert!(field.contains(Vec2::new(0.0, 49.5)));

        let hit = field.crossing(Vec2::new(-2.0, 20.0)).unwrap();
        assert_eq!(hit.point, Vec2::new(0.0, 20.0));
        assert_eq!(hit.reflect(Vec2::new(-1.0, 3.0)), Vec2::new(1.0, 3.0));

        let corner = field.crossing(Vec2::new(101.0, 60.0)).unwrap();
        assert_eq!(corner.point, Vec2::new(100.0, 50.0));
        assert_eq!(corner.reflect(Vec2::new(2.0, 1.0)), Vec2::new(-2.0, -1.0));
    }

    #[test]
    fn far_edges_count_as_outside() {
        let field = Field::new(100.0, 50.0);
        assert!(field.contains(Vec2::ZERO));
        assert!(!field.contains(Vec2::new(0.0, 50.0)));

        let edge = field.crossing(Vec2::new(100.0, 20.0)).unwrap();
        assert_eq!(edge.point, Vec2::new(100.0, 20.0));
        assert_eq!(edge.axes, BVec2::new(true, false));
        assert_eq!(edge.reflect(Vec2::new(2.0, 1.0)), Vec2::new(-2.0, 1.0));

        assert!(field.crossing(Vec2::new(f32::NAN, 20.0)).is_some());
    }

    #[test]
    fn projectile_on_the_far_edge_bounces_back() {
        let angles = Angles::new();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut sparks = SparkPool::new();
        let field = Field::default();

        let mut projectile = Projectile::default();
        projectile.on_create();
        projectile.launch(Vec2::new(FIELD_WIDTH - 2.0, 100.0), Vec2::new(2.0, 0.0), &angles);
        assert_eq!(projectile.update(&field, &angles, &mut rng, &mut sparks), Step::Keep);
        assert_eq!(projectile.pos, Vec2::new(FIELD_WIDTH, 100.0));
        assert_eq!(projectile.vel, Vec2::new(-2.0, 0.0));
        assert_eq!(sparks.len(), SPARK_BURST);
    }

    #[test]
    fn spark_streaks_forward_along_its_velocity() {
        let spark = Spark {
            pos: Vec2::new(10.0, 20.0),
            vel: Vec2::new(2.0, -1.0),
            age: 0,
            color: Color::rgb(4, 5, 6),
        };
        let mut canvas = DrawList::new();
        spark.draw(&mut canvas);

        let tip = IVec2::new(10 + 2 * SPARK_LENGTH as i32, 20 - SPARK_LENGTH as i32);
        assert_eq!(
            canvas.primitives(),
            &[
                Primitive::Line {
                    from: IVec2::new(10, 20),
                    to: tip,
                    color: Color::rgb(4, 5, 6),
                },
                Primitive::Pixel {
                    at: tip,
                    color: Color::rgb(4, 5, 6),
                },
            ]
        );
    }

    #[test]
    fn spark_expires_after_its_lifetime() {
        let mut spark = Spark::default();
        spark.launch(Vec2::ZERO, Vec2::new(1.0, 0.0), PROJECTILE_COLOR);

        let mut ticks = 0;
        while spark.update() == Step::Keep {
            ticks += 1;
        }
        assert_eq!(ticks, SPARK_LIFETIME - 1);
        assert_eq!(spark.pos.x, (SPARK_LIFETIME - 1) as f32);
    }

    #[test]
    fn burst_is_bounded_by_pool_capacity() {
        let mut world = World::new();
        let n = spark_burst(
            &mut world.sparks,
            &world.angles,
            &mut world.rng,
            Vec2::new(10.0, 10.0),
            PROJECTILE_COLOR,
        );
        assert_eq!(n, SPARK_BURST);
        assert!(world
            .sparks
            .iter()
            .all(|s| (s.vel.length() - SPARK_SPEED).abs() < 1e-4));

        let mut small = EntityPool::<Spark, 5>::new();
        let n = spark_burst(
            &mut small,
            &world.angles,
            &mut world.rng,
            Vec2::ZERO,
            PROJECTILE_COLOR,
        );
        assert_eq!(n, 5);
        assert_eq!(small.free_count(), 0);
    }

    #[test]
    fn sub_projectile_promotes_at_the_left_edge() {
        let mut world = World::new();
        let angles = Angles::new();
        world.subs.create_with(|s| {
            s.launch(Vec2::new(0.5, 200.0), Angles::HALF_TURN, SUB_PROJECTILE_SPEED, &angles)
        });

        world.tick_subs();

        assert!(world.subs.is_empty());
        assert_eq!(world.projectiles.len(), 1);
        let promoted = world.projectiles.iter().next().unwrap();
        assert_eq!(promoted.pos.x, 0.0);
        assert!((promoted.pos.y - 200.0).abs() < 1e-3);
        assert!(promoted.vel.x > 0.0);
        assert!((promoted.vel.x - SUB_PROJECTILE_SPEED).abs() < 1e-4);
        assert_eq!(promoted.color, PROJECTILE_COLOR);
        assert_eq!(world.sparks.len(), SPARK_BURST);
        assert!(world.sparks.iter().all(|s| s.color == SUB_PROJECTILE_COLOR));
    }

    #[test]
    fn projectile_bounces_then_bursts() {
        let mut world = World::new();
        let angles = Angles::new();
        world
            .projectiles
            .create_with(|p| p.launch(Vec2::new(439.0, 10.0), Vec2::new(2.0, 0.0), &angles));

        world.tick_projectiles();
        let p = world.projectiles.iter().next().unwrap();
        assert_eq!(p.pos.x, FIELD_WIDTH);
        assert_eq!(p.vel, Vec2::new(-2.0, 0.0));
        assert_eq!(p.heading, Angles::HALF_TURN);
        assert_eq!(p.phase, 1);
        assert_eq!(world.sparks.len(), SPARK_BURST);

        world.projectiles.update_all(|p| {
            p.pos.x = 1.0;
            Step::Keep
        });
        world.tick_projectiles();
        assert!(world.projectiles.is_empty());
        assert_eq!(world.sparks.len(), 2 * SPARK_BURST);
    }

    #[test]
    fn draws_use_the_entity_colour() {
        let angles = Angles::new();
        let shape = ArrowShape::new(&angles);
        let mut stencil = Stencil::new();
        let mut canvas = DrawList::new();

        let mut sub = SubProjectile::default();
        sub.on_create();
        sub.launch(Vec2::new(50.0, 50.0), 0, 1.0, &angles);
        sub.draw(&shape, &angles, &mut canvas);
        assert_eq!(canvas.count_color(SUB_PROJECTILE_COLOR), 8);

        let mut projectile = Projectile::default();
        projectile.on_create();
        projectile.launch(Vec2::new(80.0, 80.0), Vec2::new(0.0, 1.0), &angles);
        projectile.draw(&shape, &angles, &mut stencil, &mut canvas);
        assert!(canvas.count_color(PROJECTILE_COLOR) > 0);

        let spark = Spark {
            pos: Vec2::new(5.0, 5.0),
            vel: Vec2::new(1.0, 0.0),
            age: 0,
            color: Color::rgb(1, 2, 3),
        };
        spark.draw(&mut canvas);
        assert_eq!(canvas.count_color(Color::rgb(1, 2, 3)), 2);
    }
}
