//! Tile coordinates and Manhattan geometry.

use serde::{Deserialize, Serialize};

/// A map tile address. `(0, 0)` is the top-left tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonally adjacent tiles (not bounds-checked).
    pub fn neighbours(self) -> [Coord; 4] {
        [
            Coord::new(self.x, self.y - 1),
            Coord::new(self.x + 1, self.y),
            Coord::new(self.x, self.y + 1),
            Coord::new(self.x - 1, self.y),
        ]
    }

    /// Every tile within Manhattan distance `radius`, centre included,
    /// row by row from the top.
    pub fn diamond(self, radius: u32) -> impl Iterator<Item = Coord> {
        let r = radius as i32;
        (-r..=r).flat_map(move |dy| {
            let span = r - dy.abs();
            (-span..=span).map(move |dx| Coord::new(self.x + dx, self.y + dy))
        })
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        assert_eq!(Coord::new(0, 0).manhattan(Coord::new(3, -4)), 7);
        assert_eq!(Coord::new(2, 2).manhattan(Coord::new(2, 2)), 0);
    }

    #[test]
    fn test_diamond_sizes() {
        // 2r^2 + 2r + 1 tiles in a diamond of radius r
        for r in 0..6u32 {
            let tiles: Vec<_> = Coord::new(4, 4).diamond(r).collect();
            assert_eq!(tiles.len() as u32, 2 * r * r + 2 * r + 1);
            assert!(tiles.iter().all(|t| t.manhattan(Coord::new(4, 4)) <= r));
        }
    }

    #[test]
    fn test_neighbours_are_adjacent() {
        let c = Coord::new(1, 1);
        assert!(c.neighbours().iter().all(|n| n.manhattan(c) == 1));
    }
}
