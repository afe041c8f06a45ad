//! Translates pointer input into world-space move targets.

use crate::rendering::GroundView;
use macroquad::prelude::*;
use shared::{Position, WorldBounds};

#[derive(Debug, Default)]
pub struct InputManager {
    last_target: Option<Position>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clamped ground-plane target when the left button was
    /// pressed this frame.
    pub fn update(&mut self, view: &GroundView, bounds: &WorldBounds) -> Option<Position> {
        if !is_mouse_button_pressed(MouseButton::Left) {
            return None;
        }

        let (x, y) = mouse_position();
        let target = Self::pick(view, bounds, x, y);
        self.last_target = Some(target);
        Some(target)
    }

    pub fn last_target(&self) -> Option<Position> {
        self.last_target
    }

    fn pick(view: &GroundView, bounds: &WorldBounds, x: f32, y: f32) -> Position {
        bounds.clamp(view.screen_to_world(x, y, bounds.ground_y()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_manager_creation() {
        let input_manager = InputManager::new();
        assert_eq!(input_manager.last_target(), None);
    }

    #[test]
    fn test_pick_outside_bounds_is_clamped() {
        let bounds = WorldBounds::default();
        let view = GroundView::fit(800.0, 600.0, &bounds);

        let target = InputManager::pick(&view, &bounds, 799.0, 0.0);

        assert_eq!(target.x, 245.0);
        assert_eq!(target.z, -245.0);
        assert_eq!(target.y, bounds.ground_y());
    }
}
