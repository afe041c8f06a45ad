//! Per-frame exponential smoothing of shadow entities toward their targets.
//!
//! Each tick covers a fixed fraction of the remaining distance, so an entity
//! never overshoots and keeps catching up however often its target moves.

use crate::shadow::ShadowState;
use log::warn;
use shared::INTERPOLATION_FACTOR;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    factor: f32,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self {
            factor: INTERPOLATION_FACTOR,
        }
    }
}

impl Interpolator {
    /// `factor` must lie strictly between 0 and 1, anything else would
    /// either freeze entities or snap them onto their targets. Out of range
    /// values fall back to the default.
    pub fn new(factor: f32) -> Self {
        if factor > 0.0 && factor < 1.0 {
            Self { factor }
        } else {
            warn!("Smoothing factor {} outside (0, 1), using {}", factor, INTERPOLATION_FACTOR);
            Self::default()
        }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn tick(&self, shadow: &mut ShadowState) {
        for (_, entity) in shadow.iter_mut() {
            entity.current = entity.current.lerp(&entity.target, self.factor);
        }
    }
}
