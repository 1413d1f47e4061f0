use glam::IVec2;
use serde::{Deserialize, Serialize};

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Drawing surface supplied by the rendering backend. Coordinates are field
/// pixels; the backend applies any screen offset.
pub trait Canvas {
    fn line(&mut self, from: IVec2, to: IVec2, color: Color);
    fn pixel(&mut self, at: IVec2, color: Color);
}

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Line { from: IVec2, to: IVec2, color: Color },
    Pixel { at: IVec2, color: Color },
}

impl Primitive {
    pub fn color(&self) -> Color {
        match self {
            Primitive::Line { color, .. } | Primitive::Pixel { color, .. } => *color,
        }
    }
}

/// Canvas that records primitives instead of rasterising them. Used by
/// headless runs and tests.
#[derive(Debug, Default)]
pub struct DrawList {
    primitives: Vec<Primitive>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Number of primitives drawn in `color`.
    pub fn count_color(&self, color: Color) -> usize {
        self.primitives.iter().filter(|p| p.color() == color).count()
    }
}

impl Canvas for DrawList {
    fn line(&mut self, from: IVec2, to: IVec2, color: Color) {
        self.primitives.push(Primitive::Line { from, to, color });
    }

    fn pixel(&mut self, at: IVec2, color: Color) {
        self.primitives.push(Primitive::Pixel { at, color });
    }
}
