//! Fixed-rate simulation driver
//!
//! One process-wide loop ticks every live room at `SIMULATION_TPS` and fans the full
//! room state out to that room's members after each tick.

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::registry::RoomRegistry;
use super::room::TickEvent;
use super::snapshot::RoomSnapshot;
use crate::util::time::{tick_duration, StepTimer};
use crate::ws::hub::ConnectionHub;
use crate::ws::protocol::{CoverDestroyed, PlayerHit, ServerMsg};

pub struct Scheduler {
    registry: Arc<RoomRegistry>,
    hub: Arc<ConnectionHub>,
}

impl Scheduler {
    pub fn new(registry: Arc<RoomRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self { registry, hub }
    }

    /// Tick forever. Overruns skip missed ticks instead of bursting to catch up.
    pub async fn run(self) {
        let period = tick_duration();
        info!(tick_ms = period.as_millis() as u64, "Simulation scheduler started");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let timer = StepTimer::start(period);
            let rooms = self.step();
            if let Some(over) = timer.overrun() {
                debug!(
                    rooms,
                    over_us = over.as_micros() as u64,
                    "Simulation step overran its tick"
                );
            }
        }
    }

    /// Advance every room once and publish the results. Returns the number of rooms
    /// ticked.
    pub fn step(&self) -> usize {
        let rooms = self.registry.handles();

        for room in &rooms {
            // Everything leaving the lock is owned, so sends happen unlocked
            let (events, snapshot, members) = {
                let mut room = room.lock();
                let events = room.tick();
                (events, RoomSnapshot::capture(&room), room.member_ids())
            };

            if members.is_empty() {
                continue;
            }

            for event in events {
                let msg = match event {
                    TickEvent::PlayerHit(report) => ServerMsg::PlayerHit(PlayerHit::from(report)),
                    TickEvent::CoverDestroyed { wall_id } => {
                        ServerMsg::CoverDestroyed(CoverDestroyed { wall_id })
                    }
                };
                self.hub.send_to_many(&members, &msg);
            }

            self.hub
                .send_to_many(&members, &ServerMsg::GameUpdate(snapshot));
        }

        rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::MapData;
    use crate::ws::hub::Frame;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn events(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    fn count(events: &[Value], name: &str) -> usize {
        events.iter().filter(|e| e["event"] == name).count()
    }

    #[test]
    fn empty_registry_steps_nothing() {
        let scheduler = Scheduler::new(
            Arc::new(RoomRegistry::default()),
            Arc::new(ConnectionHub::new()),
        );
        assert_eq!(scheduler.step(), 0);
    }

    #[test]
    fn every_tick_broadcasts_state_to_members_only() {
        let registry = Arc::new(RoomRegistry::default());
        let hub = Arc::new(ConnectionHub::new());
        let a = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let mut rx_a = hub.register(a);
        let mut rx_out = hub.register(outsider);
        registry
            .create_room("alpha", MapData::default(), a, "ada")
            .unwrap();

        let scheduler = Scheduler::new(registry, hub);
        scheduler.step();
        scheduler.step();

        let seen = events(&mut rx_a);
        assert_eq!(count(&seen, "gameUpdate"), 2);
        let players = seen[0]["data"]["players"].as_object().unwrap();
        assert!(players.contains_key(&a.to_string()));
        assert!(events(&mut rx_out).is_empty());
    }

    #[test]
    fn bullet_hit_is_announced_once_and_bullet_retired() {
        let registry = Arc::new(RoomRegistry::default());
        let hub = Arc::new(ConnectionHub::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);
        registry
            .create_room("alpha", MapData::default(), a, "ada")
            .unwrap();
        registry.join_room("alpha", b, "bo").unwrap();
        registry.with_room("alpha", |room| {
            room.move_player(&a, 100.0, 300.0, 0.0, 0).unwrap();
            room.move_player(&b, 200.0, 300.0, 0.0, 0).unwrap();
            room.shoot(&a, 0.0).unwrap();
        });

        let scheduler = Scheduler::new(registry.clone(), hub);
        for _ in 0..20 {
            scheduler.step();
        }

        let seen_b = events(&mut rx_b);
        let hits: Vec<&Value> = seen_b
            .iter()
            .filter(|e| e["event"] == "playerHit")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["data"]["playerId"], b.to_string());
        assert_eq!(hits[0]["data"]["shooterId"], a.to_string());
        assert_eq!(hits[0]["data"]["health"], 80);
        assert_eq!(count(&events(&mut rx_a), "playerHit"), 1);

        let last = seen_b.last().unwrap();
        assert_eq!(last["event"], "gameUpdate");
        assert!(last["data"]["bullets"].as_array().unwrap().is_empty());
        let score = registry
            .with_room("alpha", |room| room.player(&a).map(|p| p.score))
            .flatten();
        assert_eq!(score, Some(10));
    }

    #[test]
    fn cover_destruction_reaches_members_only() {
        let registry = Arc::new(RoomRegistry::default());
        let hub = Arc::new(ConnectionHub::new());
        let (a, outsider) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = hub.register(a);
        let mut rx_out = hub.register(outsider);

        let map: MapData = serde_json::from_str(
            r#"{"walls": [{"type": "cover", "x": 200, "y": 300, "width": 20, "height": 20,
                           "properties": {"destructible": true, "health": 20}}]}"#,
        )
        .unwrap();
        let receipt = registry.create_room("alpha", map, a, "ada").unwrap();
        let wall_id = receipt.init.map_data.walls[0].id.clone().unwrap();
        registry.with_room("alpha", |room| {
            room.move_player(&a, 100.0, 300.0, 0.0, 0).unwrap();
            room.shoot(&a, 0.0).unwrap();
        });

        let scheduler = Scheduler::new(registry.clone(), hub);
        for _ in 0..20 {
            scheduler.step();
        }

        let seen = events(&mut rx_a);
        let destroyed: Vec<&Value> = seen
            .iter()
            .filter(|e| e["event"] == "coverDestroyed")
            .collect();
        assert_eq!(destroyed.len(), 1);
        assert_eq!(
            destroyed[0]["data"]["wallId"],
            serde_json::to_value(&wall_id).unwrap()
        );
        assert!(events(&mut rx_out).is_empty());
        let walls_left = registry.with_room("alpha", |room| room.map().walls.len());
        assert_eq!(walls_left, Some(0));
    }
}
