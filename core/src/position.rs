use anyhow::bail;
use serde::{Deserialize, Serialize};

/// A point in the game world.
///
/// Game servers report positions as bare float lists. The list form is kept only on the wire:
/// `[x, y, z]` round trips, and an empty list (sent for events with no meaningful location) is read
/// as the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 3]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = anyhow::Error;

    fn try_from(coords: Vec<f64>) -> anyhow::Result<Self> {
        match coords[..] {
            [] => Ok(Self::default()),
            [x, y, z] => Ok(Self { x, y, z }),
            _ => bail!("position must have 3 coordinates, got {}", coords.len()),
        }
    }
}

impl From<Position> for [f64; 3] {
    fn from(p: Position) -> Self {
        [p.x, p.y, p.z]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Position::new(1.0, 2.0, 3.0);
        let b = Position::new(4.0, 6.0, 3.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_wire_format() {
        let p: Position = serde_json::from_str("[1.5, -2.0, 30.25]").unwrap();
        assert_eq!(p, Position::new(1.5, -2.0, 30.25));
        assert_eq!(serde_json::to_string(&p).unwrap(), "[1.5,-2.0,30.25]");

        let origin: Position = serde_json::from_str("[]").unwrap();
        assert_eq!(origin, Position::default());

        serde_json::from_str::<Position>("[1.0, 2.0]").unwrap_err();
    }
}
