//! WebSocket protocol message definitions
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::game::combat::{Bullet, HitReport, HitSource};
use crate::game::map::{HazardKind, ObjectId};
use crate::game::player::{Player, PlayerId, Position};
use crate::game::registry::RoomSummary;
use crate::game::snapshot::{GameInit, RoomSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    CreateRoom(CreateRoom),
    JoinRoom(JoinRoom),
    PlayerMove(PlayerMove),
    Shoot(Shoot),
    LeaveRoom,
}

/// Names are optional on the wire so that a missing one becomes a validation error
/// instead of a dropped frame
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoom {
    pub room_name: Option<String>,
    pub player_name: Option<String>,
    pub map_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRoom {
    pub room_name: Option<String>,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerMove {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Shoot {
    pub angle: f32,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    RoomsList(Vec<RoomSummary>),
    Error(String),
    GameInit(GameInit),
    PlayerJoined(Player),
    PlayerLeft(PlayerId),
    PlayerMoved(PlayerMoved),
    BulletFired(Bullet),
    PlayerHit(PlayerHit),
    CoverDestroyed(CoverDestroyed),
    PositionCorrection(Position),
    GameUpdate(RoomSnapshot),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoved {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHit {
    pub player_id: PlayerId,
    pub health: i32,
    /// Absent for environmental damage
    pub shooter_id: Option<PlayerId>,
    pub respawned: bool,
    pub new_position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazard_type: Option<HazardKind>,
}

impl From<HitReport> for PlayerHit {
    fn from(report: HitReport) -> Self {
        let (shooter_id, damage_type, hazard_type) = match report.source {
            HitSource::Bullet { shooter_id } => (Some(shooter_id), None, None),
            HitSource::Hazard { kind } => (None, Some("hazard"), Some(kind)),
        };
        Self {
            player_id: report.player_id,
            health: report.health,
            shooter_id,
            respawned: report.respawned_at.is_some(),
            new_position: report.respawned_at,
            damage_type,
            hazard_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverDestroyed {
    pub wall_id: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn parses_create_room_envelope() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "event": "createRoom",
            "data": {"roomName": "alpha", "playerName": "ada", "mapName": "arena"}
        }))
        .unwrap();
        let ClientMsg::CreateRoom(create) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(create.room_name.as_deref(), Some("alpha"));
        assert_eq!(create.map_name.as_deref(), Some("arena"));
    }

    #[test]
    fn missing_names_still_parse() {
        let msg: ClientMsg =
            serde_json::from_value(json!({"event": "joinRoom", "data": {}})).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::JoinRoom(JoinRoom {
                room_name: None,
                player_name: None
            })
        ));
    }

    #[test]
    fn leave_room_needs_no_data() {
        let msg: ClientMsg = serde_json::from_str(r#"{"event":"leaveRoom"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::LeaveRoom));
    }

    #[test]
    fn malformed_move_is_rejected() {
        assert!(serde_json::from_value::<ClientMsg>(
            json!({"event": "playerMove", "data": {"x": "left"}})
        )
        .is_err());
        assert!(serde_json::from_value::<ClientMsg>(json!({"event": "teleport"})).is_err());
    }

    #[test]
    fn move_without_angle_is_rejected() {
        assert!(serde_json::from_value::<ClientMsg>(
            json!({"event": "playerMove", "data": {"x": 10.0, "y": 20.0}})
        )
        .is_err());
    }

    #[test]
    fn unlisted_hazard_type_reaches_clients_as_authored() {
        let hit = PlayerHit::from(HitReport {
            player_id: Uuid::new_v4(),
            health: 90,
            source: HitSource::Hazard {
                kind: HazardKind::Other("acid".to_string()),
            },
            respawned_at: None,
        });
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["hazardType"], "acid");
        assert_eq!(json["damageType"], "hazard");
    }

    #[test]
    fn cover_destroyed_names_the_wall() {
        let json = serde_json::to_value(ServerMsg::CoverDestroyed(CoverDestroyed {
            wall_id: ObjectId::Number(12),
        }))
        .unwrap();
        assert_eq!(json, json!({"event": "coverDestroyed", "data": {"wallId": 12}}));
    }

    #[test]
    fn error_event_is_a_bare_string() {
        let json = serde_json::to_value(ServerMsg::Error("Room is full".to_string())).unwrap();
        assert_eq!(json, json!({"event": "error", "data": "Room is full"}));
    }

    #[test]
    fn hazard_hit_carries_damage_and_hazard_type() {
        let id = Uuid::new_v4();
        let hit = PlayerHit::from(HitReport {
            player_id: id,
            health: 100,
            source: HitSource::Hazard {
                kind: HazardKind::Lava,
            },
            respawned_at: Some(Position { x: 5.0, y: 6.0 }),
        });
        let json = serde_json::to_value(ServerMsg::PlayerHit(hit)).unwrap();
        assert_eq!(json["event"], "playerHit");
        assert_eq!(json["data"]["shooterId"], serde_json::Value::Null);
        assert_eq!(json["data"]["respawned"], true);
        assert_eq!(json["data"]["newPosition"], json!({"x": 5.0, "y": 6.0}));
        assert_eq!(json["data"]["damageType"], "hazard");
        assert_eq!(json["data"]["hazardType"], "lava");
    }

    #[test]
    fn bullet_hit_omits_hazard_fields() {
        let victim = Uuid::new_v4();
        let shooter = Uuid::new_v4();
        let hit = PlayerHit::from(HitReport {
            player_id: victim,
            health: 80,
            source: HitSource::Bullet { shooter_id: shooter },
            respawned_at: None,
        });
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["shooterId"], shooter.to_string());
        assert_eq!(json["respawned"], false);
        assert_eq!(json["newPosition"], serde_json::Value::Null);
        assert!(json.get("damageType").is_none());
        assert!(json.get("hazardType").is_none());
    }

    #[test]
    fn player_left_payload_is_the_id() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ServerMsg::PlayerLeft(id)).unwrap();
        assert_eq!(json["data"], id.to_string());
    }
}
