//! Room state and the authoritative tick

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::combat::{
    Bullet, CombatSystem, HitReport, HitSource, BULLET_DAMAGE, HIT_REWARD,
};
use super::map::{MapData, ObjectId};
use super::physics::PhysicsSystem;
use super::player::{Player, PlayerId, Position, PLAYER_COLORS, PLAYER_SIZE};

/// Distance kept between a committed player centre and the map edge
pub const MOVE_BOUNDS_INSET: f32 = PLAYER_SIZE / 2.0;
/// Inset used for random spawns when the map defines no spawn points
const RANDOM_SPAWN_INSET: f32 = 20.0;

/// Runtime state of a powerup spawn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerupState {
    #[serde(flatten)]
    pub spawn: super::map::PowerupSpawn,
    pub active: bool,
    pub last_pickup_time: u64,
}

/// Something a tick produced that clients in the room must hear about
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    CoverDestroyed { wall_id: ObjectId },
    PlayerHit(HitReport),
}

/// Result of a movement request
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Position committed; `hazard` is set when standing there hurt the player
    Accepted {
        x: f32,
        y: f32,
        angle: f32,
        hazard: Option<HitReport>,
    },
    /// Destination blocked; the stored position is echoed back as a correction
    Rejected { x: f32, y: f32 },
}

/// One isolated simulation instance
pub struct Room {
    name: String,
    map: MapData,
    players: BTreeMap<PlayerId, Player>,
    bullets: Vec<Bullet>,
    powerups: BTreeMap<ObjectId, PowerupState>,
    created_at: DateTime<Utc>,
    rng: ChaCha8Rng,
}

impl Room {
    pub fn new(name: String, mut map: MapData, seed: u64) -> Self {
        map.assign_missing_ids();

        let powerups = map
            .powerups
            .iter()
            .filter_map(|spawn| {
                let state = PowerupState {
                    spawn: spawn.clone(),
                    active: true,
                    last_pickup_time: 0,
                };
                Some((spawn.id.clone()?, state))
            })
            .collect();

        Self {
            name,
            map,
            players: BTreeMap::new(),
            bullets: Vec::new(),
            powerups,
            created_at: Utc::now(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, Player> {
        &self.players
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn powerups(&self) -> impl Iterator<Item = &PowerupState> {
        self.powerups.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Pick a spawn: a map spawn point uniformly at random, otherwise a random point
    /// inside the map bounds
    pub fn spawn_position(&mut self) -> Position {
        if !self.map.spawns.is_empty() {
            let spawn = &self.map.spawns[self.rng.gen_range(0..self.map.spawns.len())];
            return Position {
                x: spawn.x,
                y: spawn.y,
            };
        }

        Position {
            x: self.random_coordinate(self.map.width),
            y: self.random_coordinate(self.map.height),
        }
    }

    fn random_coordinate(&mut self, extent: f32) -> f32 {
        let max = extent - RANDOM_SPAWN_INSET;
        if max > RANDOM_SPAWN_INSET {
            self.rng.gen_range(RANDOM_SPAWN_INSET..max)
        } else {
            extent / 2.0
        }
    }

    /// Seat a new player; colour is picked by current occupancy
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Player {
        let spawn = self.spawn_position();
        let color = PLAYER_COLORS[self.players.len() % PLAYER_COLORS.len()];
        let player = Player::new(id, name, self.name.clone(), spawn, color);
        self.players.insert(id, player.clone());
        player
    }

    /// Remove a player and every bullet it still has in flight
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.bullets.retain(|bullet| bullet.owner_id != *id);
        Some(player)
    }

    /// Validate and commit a movement request.
    ///
    /// The destination is clamped into the map, then rejected if the player's box would
    /// overlap movement-blocking geometry. A committed position standing in a hazard
    /// applies the hazard's damage at most once per its interval (`now_ms` is wall
    /// clock). Returns `None` for unknown players or non-finite input.
    pub fn move_player(
        &mut self,
        id: &PlayerId,
        x: f32,
        y: f32,
        angle: f32,
        now_ms: u64,
    ) -> Option<MoveOutcome> {
        if !(x.is_finite() && y.is_finite() && angle.is_finite()) {
            return None;
        }

        let (new_x, new_y) = PhysicsSystem::clamp_to_bounds(
            x,
            y,
            self.map.width,
            self.map.height,
            MOVE_BOUNDS_INSET,
        );

        let player = self.players.get(id)?;
        if self.map.blocks_movement(&player.rect_at(new_x, new_y)) {
            return Some(MoveOutcome::Rejected {
                x: player.x,
                y: player.y,
            });
        }

        let hazard = self
            .map
            .hazard_at(new_x, new_y)
            .map(|hazard| (hazard.kind.clone(), hazard.damage_points(), hazard.interval_millis()));

        let player = self.players.get_mut(id)?;
        player.x = new_x;
        player.y = new_y;

        let mut hurt = None;
        if let Some((kind, damage, interval)) = hazard {
            if now_ms.saturating_sub(player.last_hazard_damage) >= interval {
                player.last_hazard_damage = now_ms;
                hurt = Some((damage, HitSource::Hazard { kind }));
            }
        }

        let report = hurt.map(|(damage, source)| self.damage_player(id, damage, source));

        let player = self.players.get_mut(id)?;
        player.angle = angle;

        Some(MoveOutcome::Accepted {
            x: player.x,
            y: player.y,
            angle: player.angle,
            hazard: report.flatten(),
        })
    }

    /// Spawn a bullet at the shooter's current position
    pub fn shoot(&mut self, id: &PlayerId, angle: f32) -> Option<Bullet> {
        if !angle.is_finite() {
            return None;
        }
        let player = self.players.get(id)?;
        let bullet = Bullet::new(*id, player.x, player.y, angle);
        self.bullets.push(bullet.clone());
        Some(bullet)
    }

    /// Advance every bullet one step and resolve geometry, bounds, lifetime and player
    /// hits, in that order
    pub fn tick(&mut self) -> Vec<TickEvent> {
        let mut events = Vec::new();

        let mut index = self.bullets.len();
        while index > 0 {
            index -= 1;

            let bullet = &mut self.bullets[index];
            bullet.advance();
            let bullet = bullet.clone();

            if let Some(wall_index) = self.map.bullet_obstacle(bullet.x, bullet.y, bullet.radius) {
                let wall = &mut self.map.walls[wall_index];
                if wall.is_destructible() && wall.absorb_hit(BULLET_DAMAGE as f32) {
                    let destroyed = self.map.walls.remove(wall_index);
                    if let Some(wall_id) = destroyed.id {
                        events.push(TickEvent::CoverDestroyed { wall_id });
                    }
                }
                self.bullets.remove(index);
                continue;
            }

            if bullet.expired()
                || !PhysicsSystem::in_bounds(bullet.x, bullet.y, self.map.width, self.map.height)
            {
                self.bullets.remove(index);
                continue;
            }

            let victim = self
                .players
                .values()
                .find(|player| {
                    player.id != bullet.owner_id && bullet.hits_player(player.x, player.y, player.width)
                })
                .map(|player| player.id);

            if let Some(victim_id) = victim {
                self.bullets.remove(index);
                if let Some(shooter) = self.players.get_mut(&bullet.owner_id) {
                    shooter.score += HIT_REWARD;
                }
                let source = HitSource::Bullet {
                    shooter_id: bullet.owner_id,
                };
                if let Some(report) = self.damage_player(&victim_id, BULLET_DAMAGE, source) {
                    events.push(TickEvent::PlayerHit(report));
                }
            }
        }

        events
    }

    /// Apply damage and respawn on death
    fn damage_player(&mut self, id: &PlayerId, damage: i32, source: HitSource) -> Option<HitReport> {
        let health = self.players.get(id)?.health;
        let (new_health, killed) = CombatSystem::apply_damage(health, damage);

        let respawn_at = if killed {
            Some(self.spawn_position())
        } else {
            None
        };

        let player = self.players.get_mut(id)?;
        player.health = new_health;
        if let Some(at) = respawn_at {
            player.respawn(at);
        }

        Some(HitReport {
            player_id: *id,
            health: player.health,
            source,
            respawned_at: respawn_at,
        })
    }
}
