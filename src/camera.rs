//! Camera and bounding-box math for framing node clusters

use crate::graph_state::Position;

/// Camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera3D {
    /// Eye point
    pub position: Position,
    /// Look-at point
    pub target: Position,
    /// Up vector (Y-up)
    pub up: Position,
    /// Field of view in radians
    pub fov: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera3D {
    /// Camera on the +z axis looking at the origin
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 400.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov: 45f32.to_radians(),
        }
    }

    pub fn move_to(&mut self, position: Position, target: Position) {
        self.position = position;
        self.target = target;
    }

    /// Distance from the camera to its target
    pub fn distance(&self) -> f32 {
        length(sub(self.position, self.target))
    }

    /// Back the camera off along +z until the whole box fits in view
    pub fn fit_to_bounds(&mut self, bounds: &BoundingBox3D, padding: f32) {
        if bounds.is_empty() {
            return;
        }

        let look_at = bounds.center();
        let span = bounds.max_extent() + 2.0 * padding;
        let distance = (0.5 * span / (0.5 * self.fov).tan()).max(1.0);
        self.move_to([look_at[0], look_at[1], look_at[2] + distance], look_at);
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox3D {
    pub min: Position,
    pub max: Position,
}

impl BoundingBox3D {
    /// Box containing nothing; any point widens it
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY, f32::INFINITY, f32::INFINITY],
            max: [f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut bounds = Self::empty();
        points.into_iter().for_each(|p| bounds.include_point(*p));
        bounds
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn include_point(&mut self, p: Position) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn center(&self) -> Position {
        std::array::from_fn(|axis| 0.5 * (self.min[axis] + self.max[axis]))
    }

    /// Side lengths along x, y and z
    pub fn size(&self) -> Position {
        sub(self.max, self.min)
    }

    /// Largest side length; zero for an empty box
    pub fn max_extent(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let size = self.size();
        size[0].max(size[1]).max(size[2])
    }
}

/// Mean of a set of points; `None` when there are none
pub fn centroid(points: &[Position]) -> Option<Position> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let sum = points.iter().fold([0.0f32; 3], |acc, p| {
        [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
    });
    Some([sum[0] / n, sum[1] / n, sum[2] / n])
}

fn sub(a: Position, b: Position) -> Position {
    std::array::from_fn(|axis| a[axis] - b[axis])
}

fn length(v: Position) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
