//! Per-connection command dispatch
//!
//! A `Session` turns client intents into registry and room mutations and routes the
//! resulting events through the hub. It knows nothing about sockets, which keeps the
//! protocol testable with plain channels.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::AppState;
use crate::game::player::Position;
use crate::game::registry::JoinReceipt;
use crate::game::room::MoveOutcome;
use crate::game::RoomError;
use crate::util::time::unix_millis;

use super::hub::{ConnectionId, Frame};
use super::protocol::{
    ClientMsg, CreateRoom, JoinRoom, PlayerHit, PlayerMove, PlayerMoved, ServerMsg, Shoot,
};

/// Map used when a createRoom request names none
pub const DEFAULT_MAP_NAME: &str = "default";

pub struct Session {
    id: ConnectionId,
    /// Room the connection's player is seated in; a connection owns at most one player
    room: Option<String>,
    state: AppState,
}

impl Session {
    /// Register a new connection with the hub and greet it with the lobby listing
    pub fn open(state: AppState, id: ConnectionId) -> (Self, mpsc::Receiver<Frame>) {
        let outbound = state.hub.register(id);
        state
            .hub
            .send_to(&id, &ServerMsg::RoomsList(state.registry.list()));
        let session = Self {
            id,
            room: None,
            state,
        };
        (session, outbound)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub async fn handle(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::CreateRoom(req) => self.create_room(req).await,
            ClientMsg::JoinRoom(req) => self.join_room(req),
            ClientMsg::PlayerMove(req) => self.player_move(req),
            ClientMsg::Shoot(req) => self.shoot(req),
            ClientMsg::LeaveRoom => self.leave(),
        }
    }

    /// Transport went away. Same as an explicit leave, and safe after one.
    pub fn close(mut self) {
        self.leave();
        self.state.hub.unregister(&self.id);
    }

    async fn create_room(&mut self, req: CreateRoom) {
        let (Some(room_name), Some(player_name)) = (req.room_name, req.player_name) else {
            return self.send_error(RoomError::Validation);
        };
        if room_name.trim().is_empty() || player_name.trim().is_empty() {
            return self.send_error(RoomError::Validation);
        }
        if self.state.registry.contains(room_name.trim()) {
            return self.send_error(RoomError::AlreadyExists);
        }

        let map_name = req
            .map_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MAP_NAME.to_string());
        let map = self.state.maps.load(map_name.trim()).await;

        match self
            .state
            .registry
            .create_room(&room_name, map, self.id, &player_name)
        {
            Ok(receipt) => self.enter(receipt),
            Err(e) => self.send_error(e),
        }
    }

    fn join_room(&mut self, req: JoinRoom) {
        let (Some(room_name), Some(player_name)) = (req.room_name, req.player_name) else {
            return self.send_error(RoomError::Validation);
        };
        if self.room.as_deref() == Some(room_name.trim()) {
            debug!(connection_id = %self.id, room = %room_name, "Already seated, ignoring join");
            return;
        }

        match self
            .state
            .registry
            .join_room(&room_name, self.id, &player_name)
        {
            Ok(receipt) => self.enter(receipt),
            Err(e) => self.send_error(e),
        }
    }

    /// Announce a successful seat, leaving any previous room first
    fn enter(&mut self, receipt: JoinReceipt) {
        self.leave();

        let JoinReceipt {
            player,
            others,
            init,
        } = receipt;
        info!(connection_id = %self.id, room = %player.room, name = %player.name, "Entered room");
        self.room = Some(player.room.clone());

        let hub = &self.state.hub;
        hub.send_to(&self.id, &ServerMsg::GameInit(init));
        hub.send_to_many(&others, &ServerMsg::PlayerJoined(player));
        self.broadcast_rooms();
    }

    fn player_move(&self, req: PlayerMove) {
        let Some(room_name) = self.room.as_deref() else {
            debug!(connection_id = %self.id, "Move without a room, dropped");
            return;
        };
        let id = self.id;
        let now = unix_millis();
        let result = self
            .state
            .registry
            .with_room(room_name, |room| {
                room.move_player(&id, req.x, req.y, req.angle, now)
                    .map(|outcome| (outcome, room.member_ids()))
            })
            .flatten();
        let Some((outcome, members)) = result else {
            debug!(connection_id = %self.id, "Move dropped");
            return;
        };

        let hub = &self.state.hub;
        match outcome {
            MoveOutcome::Accepted { x, y, angle, hazard } => {
                if let Some(report) = hazard {
                    hub.send_to_many(&members, &ServerMsg::PlayerHit(PlayerHit::from(report)));
                }
                let moved = ServerMsg::PlayerMoved(PlayerMoved {
                    player_id: id,
                    x,
                    y,
                    angle,
                });
                hub.send_to_many(members.iter().filter(|member| **member != id), &moved);
            }
            MoveOutcome::Rejected { x, y } => {
                hub.send_to(
                    &id,
                    &ServerMsg::PositionCorrection(Position { x, y }),
                );
            }
        }
    }

    fn shoot(&self, req: Shoot) {
        let Some(room_name) = self.room.as_deref() else {
            debug!(connection_id = %self.id, "Shot without a room, dropped");
            return;
        };
        let id = self.id;
        let fired = self
            .state
            .registry
            .with_room(room_name, |room| {
                room.shoot(&id, req.angle)
                    .map(|bullet| (bullet, room.member_ids()))
            })
            .flatten();

        if let Some((bullet, members)) = fired {
            self.state
                .hub
                .send_to_many(&members, &ServerMsg::BulletFired(bullet));
        }
    }

    fn leave(&mut self) {
        let Some(room_name) = self.room.take() else {
            return;
        };
        let Some(receipt) = self.state.registry.leave(&room_name, &self.id) else {
            return;
        };

        info!(connection_id = %self.id, room = %room_name, "Left room");
        self.state
            .hub
            .send_to_many(&receipt.remaining, &ServerMsg::PlayerLeft(self.id));
        self.broadcast_rooms();
    }

    fn send_error(&self, err: RoomError) {
        debug!(connection_id = %self.id, error = %err, "Command rejected");
        self.state
            .hub
            .send_to(&self.id, &ServerMsg::Error(err.to_string()));
    }

    fn broadcast_rooms(&self) {
        self.state
            .hub
            .broadcast_all(&ServerMsg::RoomsList(self.state.registry.list()));
    }
}
