//! Fixed-resolution trigonometric lookup tables.
//!
//! Angles are plain integers in a power-of-two angle space: one full turn is
//! `1 << BITS` steps. All arithmetic wraps through a bit mask, so any integer
//! is a valid angle.

use std::f32::consts::PI;

/// Integer angle. Values outside `[0, full_turn)` wrap.
pub type Angle = i32;

/// Precomputed `sin`/`tan`/`atan` tables over a `1 << BITS` angle space.
///
/// The tables are built once and never mutated, so a single instance can be
/// shared behind an `Arc` by every consumer in the process.
#[derive(Clone)]
pub struct AngleTable<const BITS: u32> {
    sin: Box<[f32]>,
    tan: Box<[f32]>,
    /// `atan(i / octant)` in angle steps for `i` in `0..=octant`.
    atan: Box<[Angle]>,
}

impl<const BITS: u32> AngleTable<BITS> {
    /// Steps in one full turn.
    pub const FULL_TURN: Angle = 1 << BITS;
    /// Steps in half a turn.
    pub const HALF_TURN: Angle = Self::FULL_TURN / 2;
    /// Steps in a quarter turn.
    pub const QUARTER_TURN: Angle = Self::FULL_TURN / 4;
    const OCTANT: Angle = Self::FULL_TURN / 8;
    const MASK: Angle = Self::FULL_TURN - 1;

    /// Builds every table. O(full_turn).
    pub fn new() -> Self {
        assert!(
            (3..=20).contains(&BITS),
            "angle table needs between 3 and 20 bits"
        );

        let step = 2.0 * PI / Self::FULL_TURN as f32;
        let mut sin = Vec::with_capacity(Self::FULL_TURN as usize);
        let mut tan = Vec::with_capacity(Self::FULL_TURN as usize);
        for i in 0..Self::FULL_TURN {
            let t = i as f32 * step;
            sin.push(t.sin());
            tan.push(t.tan());
        }

        let steps_per_radian = Self::HALF_TURN as f32 / PI;
        let atan = (0..=Self::OCTANT)
            .map(|i| {
                let ratio = i as f32 / Self::OCTANT as f32;
                (ratio.atan() * steps_per_radian).round() as Angle
            })
            .collect::<Vec<_>>();

        Self {
            sin: sin.into_boxed_slice(),
            tan: tan.into_boxed_slice(),
            atan: atan.into_boxed_slice(),
        }
    }

    /// Wraps an arbitrary angle into `[0, full_turn)`.
    #[inline]
    pub fn wrap(angle: Angle) -> Angle {
        angle & Self::MASK
    }

    #[inline]
    pub fn sin(&self, angle: Angle) -> f32 {
        self.sin[Self::wrap(angle) as usize]
    }

    #[inline]
    pub fn cos(&self, angle: Angle) -> f32 {
        self.sin[Self::wrap(angle + Self::QUARTER_TURN) as usize]
    }

    #[inline]
    pub fn tan(&self, angle: Angle) -> f32 {
        self.tan[Self::wrap(angle) as usize]
    }

    /// Returns the angle of the vector `(x, y)` in `[0, full_turn)`.
    ///
    /// The result is on the same grid as [`sin`](Self::sin) and
    /// [`cos`](Self::cos), so it can be fed straight back into them. The zero
    /// vector maps to angle 0.
    pub fn atan2(&self, y: f32, x: f32) -> Angle {
        let (ax, ay) = (x.abs(), y.abs());
        if ax == 0.0 && ay == 0.0 {
            return 0;
        }

        // Reduce to the first octant, then unfold.
        let octant = Self::OCTANT as f32;
        let base = if ax >= ay {
            self.atan[(octant * ay / ax).round() as usize]
        } else {
            Self::QUARTER_TURN - self.atan[(octant * ax / ay).round() as usize]
        };

        let angle = match (x < 0.0, y < 0.0) {
            (false, false) => base,
            (true, false) => Self::HALF_TURN - base,
            (true, true) => Self::HALF_TURN + base,
            (false, true) => Self::FULL_TURN - base,
        };
        Self::wrap(angle)
    }

    /// Unit vector pointing along `angle`.
    #[inline]
    pub fn direction(&self, angle: Angle) -> glam::Vec2 {
        glam::Vec2::new(self.cos(angle), self.sin(angle))
    }
}

impl<const BITS: u32> Default for AngleTable<BITS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BITS: u32> std::fmt::Debug for AngleTable<BITS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngleTable")
            .field("full_turn", &Self::FULL_TURN)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type Table = AngleTable<8>;

    fn circular_distance(a: Angle, b: Angle) -> Angle {
        let d = Table::wrap(a - b);
        d.min(Table::FULL_TURN - d)
    }

    #[test]
    fn cardinal_directions() {
        let table = Table::new();
        assert!((table.sin(0)).abs() < 1e-6);
        assert!((table.cos(0) - 1.0).abs() < 1e-6);
        assert!((table.sin(Table::QUARTER_TURN) - 1.0).abs() < 1e-6);
        assert!((table.cos(Table::HALF_TURN) + 1.0).abs() < 1e-6);

        assert_eq!(table.atan2(0.0, 1.0), 0);
        assert_eq!(table.atan2(1.0, 0.0), Table::QUARTER_TURN);
        assert_eq!(table.atan2(0.0, -1.0), Table::HALF_TURN);
        assert_eq!(table.atan2(-1.0, 0.0), Table::QUARTER_TURN * 3);
        assert_eq!(table.atan2(1.0, 1.0), Table::FULL_TURN / 8);
    }

    #[test]
    fn zero_vector_maps_to_zero() {
        let table = Table::new();
        assert_eq!(table.atan2(0.0, 0.0), 0);
        assert_eq!(table.atan2(-0.0, -0.0), 0);
    }

    #[test]
    fn tan_matches_ratio_away_from_poles() {
        let table = Table::new();
        for a in [1, 10, 30, 100, 200] {
            let expected = table.sin(a) / table.cos(a);
            assert!((table.tan(a) - expected).abs() < 1e-3 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn round_trip_every_angle() {
        let table = Table::new();
        for a in 0..Table::FULL_TURN {
            let back = table.atan2(table.sin(a), table.cos(a));
            assert!((0..Table::FULL_TURN).contains(&back));
            assert!(
                circular_distance(back, a) <= 1,
                "angle {a} came back as {back}"
            );
        }
    }

    proptest! {
        #[test]
        fn sin_is_periodic(a in -100_000i32..100_000) {
            let table = Table::new();
            prop_assert_eq!(table.sin(a + Table::FULL_TURN), table.sin(a));
            prop_assert_eq!(table.cos(a - Table::FULL_TURN), table.cos(a));
        }

        #[test]
        fn atan2_tracks_libm(x in -1000.0f32..1000.0, y in -1000.0f32..1000.0) {
            prop_assume!(x.abs() > 1e-3 || y.abs() > 1e-3);
            let table = Table::new();
            let exact = (y.atan2(x) * Table::HALF_TURN as f32 / PI).round() as Angle;
            prop_assert!(circular_distance(table.atan2(y, x), exact) <= 1);
        }
    }
}
