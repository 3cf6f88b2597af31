//! Player records owned by a room

use serde::Serialize;
use uuid::Uuid;

use super::physics::Rect;

/// Connection-derived player identity
pub type PlayerId = Uuid;

/// Player bounding box edge length
pub const PLAYER_SIZE: f32 = 20.0;
pub const MAX_HEALTH: i32 = 100;

/// Colours handed out by room occupancy
pub const PLAYER_COLORS: [&str; 7] = [
    "#4CAF50", "#2196F3", "#FF9800", "#E91E63", "#9C27B0", "#00BCD4", "#795548",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Authoritative player state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub health: i32,
    pub max_health: i32,
    pub score: u32,
    pub angle: f32,
    pub color: &'static str,
    pub room: String,
    /// Unix millis of the last hazard damage, 0 when never hurt
    pub last_hazard_damage: u64,
}

impl Player {
    pub fn new(id: PlayerId, name: String, room: String, spawn: Position, color: &'static str) -> Self {
        Self {
            id,
            name,
            x: spawn.x,
            y: spawn.y,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            score: 0,
            angle: 0.0,
            color,
            room,
            last_hazard_damage: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    /// Bounding box centred on `(x, y)`
    pub fn rect_at(&self, x: f32, y: f32) -> Rect {
        Rect::from_center(x, y, self.width, self.height)
    }

    /// Move to a spawn point with full health
    pub fn respawn(&mut self, at: Position) {
        self.x = at.x;
        self.y = at.y;
        self.health = self.max_health;
    }
}
