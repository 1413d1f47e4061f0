//! Arrow sprites for projectiles.
//!
//! Sub-projectiles draw as an outline. Projectiles draw filled: the outline is
//! rasterised into a small stencil, flood filled from its centre, and the
//! stencil is emitted pixel by pixel.

use glam::{IVec2, Vec2};

use crate::render::{Canvas, Color};
use crate::{Angle, Angles};

/// Side of the square fill stencil, in pixels.
pub const STENCIL_SIZE: usize = 19;
const STENCIL_CENTER: i32 = (STENCIL_SIZE / 2) as i32;

/// Arrow outline vertices, pointing along +x, before rotation.
const ARROW_FRAME: [(f32, f32); 4] = [
    (7.0 * 1.25, 0.0),
    (-3.0 * 1.25, 5.0 * 1.25),
    (-5.0 * 1.25, 0.0),
    (-3.0 * 1.25, -5.0 * 1.25),
];

/// Arrow outline in polar form so it can be rotated by table angles.
#[derive(Debug, Clone)]
pub struct ArrowShape {
    vertices: [(f32, Angle); 4],
}

impl ArrowShape {
    pub fn new(angles: &Angles) -> Self {
        Self {
            vertices: ARROW_FRAME.map(|(x, y)| (Vec2::new(x, y).length(), angles.atan2(y, x))),
        }
    }

    /// Vertex offsets from the arrow centre after rotating by `heading`.
    pub fn vertices(&self, angles: &Angles, heading: Angle) -> [Vec2; 4] {
        self.vertices
            .map(|(radius, angle)| angles.direction(angle + heading) * radius)
    }

    /// Closed outline with a pixel on every vertex.
    pub fn draw_outline(
        &self,
        angles: &Angles,
        canvas: &mut dyn Canvas,
        center: Vec2,
        heading: Angle,
        color: Color,
    ) {
        let points = self.vertices(angles, heading).map(|v| (center + v).as_ivec2());
        for i in 0..points.len() {
            let from = points[i];
            let to = points[(i + 1) % points.len()];
            canvas.line(from, to, color);
            canvas.pixel(to, color);
        }
    }

    /// Solid arrow. Uses `stencil` as scratch space.
    pub fn draw_filled(
        &self,
        angles: &Angles,
        canvas: &mut dyn Canvas,
        stencil: &mut Stencil,
        center: Vec2,
        heading: Angle,
        color: Color,
    ) {
        stencil.clear();
        let fraction = center - center.trunc();
        let cells = self.vertices(angles, heading).map(|v| {
            let p = v + fraction;
            IVec2::new(p.x as i32 + STENCIL_CENTER, p.y as i32 + STENCIL_CENTER)
        });
        for i in 0..cells.len() {
            stencil.line(cells[i], cells[(i + 1) % cells.len()]);
        }
        stencil.flood_fill(IVec2::splat(STENCIL_CENTER));

        let origin = center.as_ivec2() - IVec2::splat(STENCIL_CENTER);
        for y in 0..STENCIL_SIZE as i32 {
            for x in 0..STENCIL_SIZE as i32 {
                let cell = IVec2::new(x, y);
                if stencil.get(cell) || stencil.is_enclosed(cell) {
                    canvas.pixel(origin + cell, color);
                }
            }
        }
    }
}

/// Fixed 19x19 bitmap used to rasterise one filled arrow.
#[derive(Debug, Clone)]
pub struct Stencil {
    cells: [[bool; STENCIL_SIZE]; STENCIL_SIZE],
}

impl Stencil {
    pub fn new() -> Self {
        Self {
            cells: [[false; STENCIL_SIZE]; STENCIL_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STENCIL_SIZE]; STENCIL_SIZE];
    }

    fn in_bounds(cell: IVec2) -> bool {
        (0..STENCIL_SIZE as i32).contains(&cell.x) && (0..STENCIL_SIZE as i32).contains(&cell.y)
    }

    /// Out-of-bounds cells read as unset.
    pub fn get(&self, cell: IVec2) -> bool {
        Self::in_bounds(cell) && self.cells[cell.y as usize][cell.x as usize]
    }

    /// Out-of-bounds writes are dropped.
    pub fn set(&mut self, cell: IVec2) {
        if Self::in_bounds(cell) {
            self.cells[cell.y as usize][cell.x as usize] = true;
        }
    }

    pub fn count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c).count()
    }

    /// An unset interior cell whose four neighbours are all set.
    pub fn is_enclosed(&self, cell: IVec2) -> bool {
        let interior = (1..STENCIL_SIZE as i32 - 1).contains(&cell.x)
            && (1..STENCIL_SIZE as i32 - 1).contains(&cell.y);
        interior
            && [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y]
                .iter()
                .all(|d| self.get(cell + *d))
    }

    /// Bresenham line, both endpoints included.
    pub fn line(&mut self, from: IVec2, to: IVec2) {
        let delta = (to - from).abs();
        let step = IVec2::new(
            if to.x > from.x { 1 } else { -1 },
            if to.y > from.y { 1 } else { -1 },
        );
        let mut p = from;

        if delta.x > delta.y {
            let mut error = -delta.x;
            for _ in 0..=delta.x {
                self.set(p);
                p.x += step.x;
                error += 2 * delta.y;
                if error >= 0 {
                    p.y += step.y;
                    error -= 2 * delta.x;
                }
            }
        } else {
            let mut error = -delta.y;
            for _ in 0..=delta.y {
                self.set(p);
                p.y += step.y;
                error += 2 * delta.x;
                if error >= 0 {
                    p.x += step.x;
                    error -= 2 * delta.y;
                }
            }
        }
    }

    /// 4-connected fill from `seed` with an explicit stack.
    pub fn flood_fill(&mut self, seed: IVec2) {
        if !Self::in_bounds(seed) || self.get(seed) {
            return;
        }

        let mut stack = Vec::with_capacity(STENCIL_SIZE * STENCIL_SIZE);
        self.set(seed);
        stack.push(seed);
        while let Some(cell) = stack.pop() {
            for d in [IVec2::NEG_X, IVec2::X, IVec2::NEG_Y, IVec2::Y] {
                let next = cell + d;
                if Self::in_bounds(next) && !self.get(next) {
                    self.set(next);
                    stack.push(next);
                }
            }
        }
    }
}

impl Default for Stencil {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawList, Primitive};

    #[test]
    fn line_covers_both_endpoints() {
        let mut stencil = Stencil::new();
        stencil.line(IVec2::new(2, 3), IVec2::new(10, 6));
        assert!(stencil.get(IVec2::new(2, 3)));
        assert!(stencil.get(IVec2::new(10, 6)));
        assert_eq!(stencil.count(), 9);
    }

    #[test]
    fn fill_stays_inside_a_closed_box() {
        let mut stencil = Stencil::new();
        let corners = [
            IVec2::new(4, 4),
            IVec2::new(12, 4),
            IVec2::new(12, 12),
            IVec2::new(4, 12),
        ];
        for i in 0..4 {
            stencil.line(corners[i], corners[(i + 1) % 4]);
        }
        stencil.flood_fill(IVec2::new(8, 8));

        assert_eq!(stencil.count(), 9 * 9);
        assert!(!stencil.get(IVec2::new(3, 8)));
        assert!(!stencil.get(IVec2::new(13, 8)));
    }

    #[test]
    fn fill_of_open_stencil_is_bounded() {
        let mut stencil = Stencil::new();
        stencil.flood_fill(IVec2::splat(STENCIL_CENTER));
        assert_eq!(stencil.count(), STENCIL_SIZE * STENCIL_SIZE);

        // A seed on a set cell is a no-op.
        stencil.flood_fill(IVec2::splat(0));
        assert_eq!(stencil.count(), STENCIL_SIZE * STENCIL_SIZE);
    }

    #[test]
    fn enclosed_cells_need_all_four_neighbours() {
        let mut stencil = Stencil::new();
        let hole = IVec2::new(5, 5);
        for d in [IVec2::X, IVec2::NEG_X, IVec2::Y] {
            stencil.set(hole + d);
        }
        assert!(!stencil.is_enclosed(hole));
        stencil.set(hole + IVec2::NEG_Y);
        assert!(stencil.is_enclosed(hole));
        assert!(!stencil.is_enclosed(IVec2::ZERO));
    }

    #[test]
    fn outline_is_a_closed_four_segment_loop() {
        let angles = Angles::new();
        let shape = ArrowShape::new(&angles);
        let mut canvas = DrawList::new();
        let color = Color::rgb(0, 0, 192);

        shape.draw_outline(&angles, &mut canvas, Vec2::new(100.0, 100.0), 0, color);

        let lines: Vec<_> = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Line { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].0, lines[3].1);
        // Tip points along +x at heading 0.
        assert_eq!(lines[0].0, IVec2::new(108, 100));
    }

    #[test]
    fn filled_arrow_is_solid_and_local() {
        let angles = Angles::new();
        let shape = ArrowShape::new(&angles);
        let mut canvas = DrawList::new();
        let mut stencil = Stencil::new();
        let center = Vec2::new(50.5, 60.25);

        shape.draw_filled(&angles, &mut canvas, &mut stencil, center, 32, Color::rgb(192, 0, 0));

        let pixels: Vec<IVec2> = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Pixel { at, .. } => Some(*at),
                _ => None,
            })
            .collect();
        assert!(pixels.contains(&center.as_ivec2()));
        // Bigger than the outline alone, smaller than the whole stencil.
        assert!(pixels.len() > 40);
        assert!(pixels.len() < STENCIL_SIZE * STENCIL_SIZE);
        assert!(pixels
            .iter()
            .all(|p| (*p - center.as_ivec2()).abs().max_element() <= STENCIL_CENTER));
    }
}
