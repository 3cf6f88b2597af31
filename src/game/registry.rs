//! Registry of all live rooms

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use super::map::MapData;
use super::player::{Player, PlayerId};
use super::room::Room;

/// Players allowed in one room
pub const DEFAULT_MAX_PLAYERS: usize = 8;

/// A room behind its own lock. Unrelated rooms never contend.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Registry failures, displayed verbatim to clients as `error` events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room name and player name are required")]
    Validation,

    #[error("Room already exists")]
    AlreadyExists,

    #[error("Room does not exist")]
    NotFound,

    #[error("Room is full")]
    Full,
}

/// Lobby listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
}

/// Everything a successful join needs to announce
#[derive(Debug, Clone)]
pub struct JoinReceipt {
    pub player: Player,
    /// Members other than the new player
    pub others: Vec<PlayerId>,
    pub init: super::snapshot::GameInit,
}

/// What a leave did to the room
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveReceipt {
    pub remaining: Vec<PlayerId>,
    pub room_deleted: bool,
}

/// Process-wide room collection, owned by the application state
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
    max_players: usize,
}

impl RoomRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            max_players,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<SharedRoom> {
        self.rooms.get(name).map(|room| room.value().clone())
    }

    /// Create a room seated with its first player.
    ///
    /// Creation and the first join happen under the map entry lock, so a freshly created
    /// room is never observable while empty.
    pub fn create_room(
        &self,
        name: &str,
        map: MapData,
        host_id: PlayerId,
        host_name: &str,
    ) -> Result<JoinReceipt, RoomError> {
        let (name, host_name) = validate_names(name, host_name)?;

        match self.rooms.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RoomError::AlreadyExists),
            Entry::Vacant(vacant) => {
                let map_name = map.name.clone();
                let mut room = Room::new(name.to_string(), map, rand::random::<u64>());
                let receipt = seat(&mut room, host_id, host_name);
                vacant.insert(Arc::new(Mutex::new(room)));
                info!(room = %name, map = %map_name, "Room created");
                Ok(receipt)
            }
        }
    }

    /// Seat a player in an existing room
    pub fn join_room(
        &self,
        name: &str,
        player_id: PlayerId,
        player_name: &str,
    ) -> Result<JoinReceipt, RoomError> {
        let (name, player_name) = validate_names(name, player_name)?;

        // Holding the entry guard keeps a concurrent leave from deleting the room
        // between the lookup and the insert.
        let entry = self.rooms.get(name).ok_or(RoomError::NotFound)?;
        let mut room = entry.value().lock();

        if room.player_count() >= self.max_players {
            return Err(RoomError::Full);
        }

        Ok(seat(&mut room, player_id, player_name))
    }

    /// Run `f` against a room under its lock. `None` when the room is gone.
    pub fn with_room<R>(&self, name: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let room = self.get(name)?;
        let mut guard = room.lock();
        Some(f(&mut guard))
    }

    /// Remove a player; deletes the room once nobody is left. Idempotent.
    pub fn leave(&self, name: &str, player_id: &PlayerId) -> Option<LeaveReceipt> {
        let remaining = {
            let entry = self.rooms.get(name)?;
            let mut room = entry.value().lock();
            room.remove_player(player_id)?;
            room.member_ids()
        };

        let removed = if remaining.is_empty() {
            self.rooms.remove_if(name, |_, room| room.lock().is_empty())
        } else {
            None
        };
        let room_deleted = removed.is_some();

        if let Some((_, room)) = removed {
            let lived = Utc::now() - room.lock().created_at();
            info!(room = %name, lived_secs = lived.num_seconds(), "Room deleted");
        }

        Some(LeaveReceipt {
            remaining,
            room_deleted,
        })
    }

    /// Lobby snapshot of every room
    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .iter()
            .map(|entry| RoomSummary {
                name: entry.key().clone(),
                player_count: entry.value().lock().player_count(),
                max_players: self.max_players,
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    /// Handles to every live room, taken without holding any room lock
    pub fn handles(&self) -> Vec<SharedRoom> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.handles()
            .iter()
            .map(|room| room.lock().player_count())
            .sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PLAYERS)
    }
}

fn validate_names<'a>(room: &'a str, player: &'a str) -> Result<(&'a str, &'a str), RoomError> {
    let room = room.trim();
    let player = player.trim();
    if room.is_empty() || player.is_empty() {
        return Err(RoomError::Validation);
    }
    Ok((room, player))
}

fn seat(room: &mut Room, player_id: PlayerId, player_name: &str) -> JoinReceipt {
    let others = room.member_ids();
    let player = room.add_player(player_id, player_name.to_string());
    info!(
        room = %room.name(),
        player_id = %player_id,
        player_count = room.player_count(),
        "Player joined room"
    );
    JoinReceipt {
        init: super::snapshot::GameInit::for_player(room, player_id),
        player,
        others,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn host(registry: &RoomRegistry, name: &str) -> PlayerId {
        let id = Uuid::new_v4();
        registry
            .create_room(name, MapData::default(), id, "host")
            .unwrap();
        id
    }

    #[test]
    fn duplicate_room_name_is_rejected() {
        let registry = RoomRegistry::default();
        host(&registry, "alpha");
        let err = registry
            .create_room("alpha", MapData::default(), Uuid::new_v4(), "other")
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyExists);
        assert_eq!(registry.active_rooms(), 1);
    }

    #[test]
    fn blank_names_fail_validation() {
        let registry = RoomRegistry::default();
        assert_eq!(
            registry
                .create_room("  ", MapData::default(), Uuid::new_v4(), "ada")
                .unwrap_err(),
            RoomError::Validation
        );
        host(&registry, "alpha");
        assert_eq!(
            registry.join_room("alpha", Uuid::new_v4(), "").unwrap_err(),
            RoomError::Validation
        );
    }

    #[test]
    fn joining_missing_room_is_not_found() {
        let registry = RoomRegistry::default();
        assert_eq!(
            registry.join_room("ghost", Uuid::new_v4(), "ada").unwrap_err(),
            RoomError::NotFound
        );
    }

    #[test]
    fn full_room_rejects_ninth_player_without_mutation() {
        let registry = RoomRegistry::default();
        host(&registry, "alpha");
        for n in 1..DEFAULT_MAX_PLAYERS {
            registry
                .join_room("alpha", Uuid::new_v4(), &format!("p{n}"))
                .unwrap();
        }
        assert_eq!(
            registry.join_room("alpha", Uuid::new_v4(), "late").unwrap_err(),
            RoomError::Full
        );
        assert_eq!(registry.list()[0].player_count, DEFAULT_MAX_PLAYERS);
    }

    #[test]
    fn colors_cycle_by_occupancy() {
        let registry = RoomRegistry::default();
        host(&registry, "alpha");
        let second = registry.join_room("alpha", Uuid::new_v4(), "b").unwrap();
        assert_eq!(second.player.color, "#2196F3");
        assert_eq!(second.others.len(), 1);
    }

    #[test]
    fn join_receipt_carries_full_room_state() {
        let registry = RoomRegistry::default();
        let first = host(&registry, "alpha");
        let id = Uuid::new_v4();
        let receipt = registry.join_room("alpha", id, "b").unwrap();
        assert_eq!(receipt.init.player_id, id);
        assert_eq!(receipt.init.room_name, "alpha");
        assert!(receipt.init.players.contains_key(&first));
        assert!(receipt.init.players.contains_key(&id));
    }

    #[test]
    fn last_leave_deletes_room_and_repeat_leave_is_noop() {
        let registry = RoomRegistry::default();
        let a = host(&registry, "alpha");
        let b = Uuid::new_v4();
        registry.join_room("alpha", b, "b").unwrap();

        let receipt = registry.leave("alpha", &a).unwrap();
        assert_eq!(receipt.remaining, vec![b]);
        assert!(!receipt.room_deleted);

        let receipt = registry.leave("alpha", &b).unwrap();
        assert!(receipt.room_deleted);
        assert!(registry.list().is_empty());
        assert!(registry.leave("alpha", &b).is_none());
    }

    #[test]
    fn list_reports_capacity() {
        let registry = RoomRegistry::new(4);
        host(&registry, "beta");
        host(&registry, "alpha");
        assert_eq!(
            registry.list(),
            vec![
                RoomSummary {
                    name: "alpha".to_string(),
                    player_count: 1,
                    max_players: 4
                },
                RoomSummary {
                    name: "beta".to_string(),
                    player_count: 1,
                    max_players: 4
                },
            ]
        );
        assert_eq!(registry.total_players(), 2);
    }

    #[test]
    fn with_room_on_missing_room_is_none() {
        let registry = RoomRegistry::default();
        assert!(registry.with_room("ghost", |room| room.player_count()).is_none());
    }
}
