use macroquad::prelude::*;
use shared::{EntityId, Position, WorldBounds};
use std::collections::HashMap;

/// Diameter of an entity sphere in world units.
pub const ENTITY_DIAMETER: f32 = 40.0;
/// Margin of visible ground around the playable box, in world units.
const GROUND_MARGIN: f32 = 5.0;

const LOCAL_COLOR: Color = Color::new(1.0, 0.6, 0.0, 1.0);
const REMOTE_COLOR: Color = Color::new(0.5, 0.5, 0.5, 1.0);

/// One entity as it should appear this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntity {
    pub id: EntityId,
    pub position: Position,
    pub is_self: bool,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub room: String,
    pub local_id: Option<EntityId>,
    pub connected: bool,
}

/// Top-down projection of the ground plane onto the window. World `x` maps
/// to screen x and world `z` to screen y, centred on the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundView {
    center_x: f32,
    center_y: f32,
    scale: f32,
}

impl GroundView {
    pub fn fit(screen_width: f32, screen_height: f32, bounds: &WorldBounds) -> Self {
        let half_ground = bounds.half_extent() + GROUND_MARGIN;
        let usable = screen_width.min(screen_height) * 0.9;
        Self {
            center_x: screen_width / 2.0,
            center_y: screen_height / 2.0,
            scale: usable / (2.0 * half_ground),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn world_to_screen(&self, position: &Position) -> (f32, f32) {
        (
            self.center_x + position.x * self.scale,
            self.center_y + position.z * self.scale,
        )
    }

    /// Picks the ground-plane point under a screen coordinate.
    pub fn screen_to_world(&self, x: f32, y: f32, ground_y: f32) -> Position {
        Position::new(
            (x - self.center_x) / self.scale,
            ground_y,
            (y - self.center_y) / self.scale,
        )
    }
}

/// Draws the ground and the entities. Holds one label per visible entity
/// and drops it as soon as the entity is gone.
pub struct Renderer {
    bounds: WorldBounds,
    labels: HashMap<EntityId, String>,
}

impl Renderer {
    pub fn new(bounds: WorldBounds) -> Self {
        Renderer {
            bounds,
            labels: HashMap::new(),
        }
    }

    pub fn view(&self) -> GroundView {
        GroundView::fit(screen_width(), screen_height(), &self.bounds)
    }

    pub fn render(&mut self, entities: &[RenderEntity], status: &StatusLine) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let view = self.view();
        self.draw_ground(&view);

        self.labels
            .retain(|id, _| entities.iter().any(|entity| entity.id == *id));

        for entity in entities {
            self.draw_entity(&view, entity);
        }

        self.draw_status(status, entities.len());
    }

    fn draw_ground(&self, view: &GroundView) {
        let half = self.bounds.half_extent() + GROUND_MARGIN;
        let (x, y) = view.world_to_screen(&Position::new(-half, 0.0, -half));
        let size = 2.0 * half * view.scale();
        draw_rectangle(x, y, size, size, Color::from_rgba(68, 68, 68, 255));

        let edge = self.bounds.half_extent();
        let (x, y) = view.world_to_screen(&Position::new(-edge, 0.0, -edge));
        let size = 2.0 * edge * view.scale();
        draw_rectangle_lines(x, y, size, size, 1.0, Color::from_rgba(90, 90, 90, 255));
    }

    fn draw_entity(&mut self, view: &GroundView, entity: &RenderEntity) {
        let (x, y) = view.world_to_screen(&entity.position);
        let radius = ENTITY_DIAMETER / 2.0 * view.scale();
        let color = if entity.is_self {
            LOCAL_COLOR
        } else {
            REMOTE_COLOR
        };

        draw_circle(x, y, radius, color);
        draw_circle_lines(x, y, radius, 1.0, WHITE);

        let label = self
            .labels
            .entry(entity.id)
            .or_insert_with(|| format!("#{}", entity.id));
        draw_text(label, x - radius, y - radius - 4.0, 14.0, WHITE);
    }

    fn draw_status(&self, status: &StatusLine, entity_count: usize) {
        let connection_color = if status.connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);

        let identity = match status.local_id {
            Some(id) => format!("#{}", id),
            None => "-".to_string(),
        };
        let text = format!(
            "room {}  you {}  {} entities",
            status.room, identity, entity_count
        );
        draw_text(&text, 24.0, 18.0, 14.0, WHITE);
        draw_text("Left click to move", 10.0, 36.0, 14.0, GRAY);
    }
}
