//! Bounded world model: what a valid entity position is.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Half extent of the square play area on the horizontal plane.
pub const DEFAULT_BOUND: f32 = 245.0;
/// Height every authoritative position is pinned to.
pub const DEFAULT_GROUND_Y: f32 = -1.0;
/// Fraction of the remaining distance a shadow entity covers per frame.
pub const INTERPOLATION_FACTOR: f32 = 0.05;

/// A point in world space. `x`/`z` span the ground plane, `y` is height.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Moves `factor` of the way from `self` towards `target`.
    pub fn lerp(&self, target: &Position, factor: f32) -> Position {
        Position {
            x: self.x + (target.x - self.x) * factor,
            y: self.y + (target.y - self.y) * factor,
            z: self.z + (target.z - self.z) * factor,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The symmetric box `[-half_extent, half_extent]` on the ground plane.
///
/// Both sides of the connection use the same bounds: the server to enforce
/// them, clients to pre-clamp their optimistic targets.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BoundsError {
    #[error("half extent must be finite and non-zero, got {0}")]
    InvalidExtent(f32),
    #[error("ground height must be finite, got {0}")]
    InvalidGround(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    half_extent: f32,
    ground_y: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            half_extent: DEFAULT_BOUND,
            ground_y: DEFAULT_GROUND_Y,
        }
    }
}

impl WorldBounds {
    /// The sign of `half_extent` is ignored. Zero and non-finite extents
    /// are refused, as is a non-finite ground height.
    pub fn new(half_extent: f32, ground_y: f32) -> Result<Self, BoundsError> {
        if !half_extent.is_finite() || half_extent == 0.0 {
            return Err(BoundsError::InvalidExtent(half_extent));
        }
        if !ground_y.is_finite() {
            return Err(BoundsError::InvalidGround(ground_y));
        }

        Ok(Self {
            half_extent: half_extent.abs(),
            ground_y,
        })
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn ground_y(&self) -> f32 {
        self.ground_y
    }

    /// Projects `position` onto the nearest point inside the box.
    ///
    /// The vertical coordinate is not clamped, it is replaced by the ground
    /// height. Total and idempotent. A NaN horizontal coordinate collapses
    /// to the centre line so that no NaN ever reaches authoritative state.
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            x: self.clamp_axis(position.x),
            y: self.ground_y,
            z: self.clamp_axis(position.z),
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.x.abs() <= self.half_extent && position.z.abs() <= self.half_extent
    }

    fn clamp_axis(&self, value: f32) -> f32 {
        if value.is_nan() {
            0.0
        } else {
            value.max(-self.half_extent).min(self.half_extent)
        }
    }
}
