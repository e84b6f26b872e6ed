//! # Core Type Definitions
//!
//! Identifiers and spatial values shared by every component of the tracker.
//!
//! - [`AgentId`] - Unique identifier for a tracked agent (player)
//! - [`SpatialPoint`] - An immutable point in a named world
//! - [`MovementSample`] - One movement report from the host's event system

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an agent in the live world.
///
/// A thin wrapper around a UUID so agent ids cannot be confused with
/// other identifiers flowing through the host adapter.
///
/// # Examples
///
/// ```rust
/// use trail_core::AgentId;
///
/// let agent = AgentId::new();
/// let parsed: AgentId = agent.to_string().parse().unwrap();
/// assert_eq!(agent, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Creates a new random agent ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in a named world.
///
/// Equality is exact on every field: two points are the same only if the
/// world matches and all three coordinates are bit-for-bit equal floats.
/// The recording stillness filter relies on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoint {
    /// Name of the world the point lives in
    pub world: String,
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (vertical axis)
    pub y: f64,
    /// Z coordinate (north-south axis)
    pub z: f64,
}

impl SpatialPoint {
    /// Creates a new point in `world` with the given coordinates.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Euclidean distance to `other`, or `None` when the points are in
    /// different worlds.
    pub fn distance(&self, other: &SpatialPoint) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        Some(
            ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
                .sqrt(),
        )
    }

    /// True when `self` and `other` differ in at least one coordinate.
    ///
    /// The world is deliberately not compared; the host reports cross-world
    /// teleports as separate events.
    pub fn moved_from(&self, other: &SpatialPoint) -> bool {
        self.x != other.x || self.y != other.y || self.z != other.z
    }

    /// Whether every coordinate is finite and the world is named.
    pub fn is_well_formed(&self) -> bool {
        !self.world.is_empty() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::fmt::Display for SpatialPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:.2}, {:.2}, {:.2})", self.world, self.x, self.y, self.z)
    }
}

/// A single movement report as delivered by the host event system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSample {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub from: SpatialPoint,
    pub to: SpatialPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_world() {
        let a = SpatialPoint::new("overworld", 0.0, 0.0, 0.0);
        let b = SpatialPoint::new("overworld", 3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), Some(5.0));
    }

    #[test]
    fn test_distance_across_worlds_is_undefined() {
        let a = SpatialPoint::new("overworld", 0.0, 0.0, 0.0);
        let b = SpatialPoint::new("nether", 0.0, 0.0, 0.0);
        assert_eq!(a.distance(&b), None);
    }

    #[test]
    fn test_exact_equality() {
        let a = SpatialPoint::new("overworld", 1.0, 2.0, 3.0);
        let b = SpatialPoint::new("overworld", 1.0, 2.0, 3.0 + 0.001);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_moved_from_ignores_world() {
        let a = SpatialPoint::new("overworld", 1.0, 2.0, 3.0);
        let b = SpatialPoint::new("nether", 1.0, 2.0, 3.0);
        assert!(!a.moved_from(&b));
        assert!(a.moved_from(&SpatialPoint::new("overworld", 1.0, 2.5, 3.0)));
    }

    #[test]
    fn test_well_formed() {
        assert!(SpatialPoint::new("overworld", 1.0, 2.0, 3.0).is_well_formed());
        assert!(!SpatialPoint::new("", 1.0, 2.0, 3.0).is_well_formed());
        assert!(!SpatialPoint::new("overworld", f64::NAN, 2.0, 3.0).is_well_formed());
    }

    #[test]
    fn test_agent_id_round_trip_through_string() {
        let id = AgentId::new();
        let parsed: AgentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
