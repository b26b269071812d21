use serde::{Deserialize, Serialize};

/// World position. `y` is elevation; horizontal distance ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Position on the ground plane.
    pub const fn flat(x: f64, z: f64) -> Self {
        Self { x, y: 0.0, z }
    }

    /// Full 3D distance.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance on the ground plane.
    pub fn distance_2d(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Average of a set of positions, `None` when empty.
    pub fn centroid<I>(positions: I) -> Option<Position>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut count = 0usize;
        let mut sum = Position::default();
        for p in positions {
            sum.x += p.x;
            sum.y += p.y;
            sum.z += p.z;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Position::new(sum.x / n, sum.y / n, sum.z / n))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.0}, {:.0}, {:.0})", self.x, self.y, self.z)
    }
}
