//! Full-state room snapshots sent to clients

use std::collections::BTreeMap;

use serde::Serialize;

use super::combat::Bullet;
use super::map::MapData;
use super::player::{Player, PlayerId};
use super::room::{PowerupState, Room};

/// Periodic full-state broadcast. Not a delta: every tick carries everything.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub players: BTreeMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub powerups: Vec<PowerupState>,
}

impl RoomSnapshot {
    pub fn capture(room: &Room) -> Self {
        Self {
            players: room.players().clone(),
            bullets: room.bullets().to_vec(),
            powerups: room.powerups().cloned().collect(),
        }
    }
}

/// State handed to a player as it enters a room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInit {
    pub player_id: PlayerId,
    pub room_name: String,
    pub players: BTreeMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub map_data: MapData,
}

impl GameInit {
    pub fn for_player(room: &Room, player_id: PlayerId) -> Self {
        Self {
            player_id,
            room_name: room.name().to_string(),
            players: room.players().clone(),
            bullets: room.bullets().to_vec(),
            map_data: room.map().clone(),
        }
    }
}
