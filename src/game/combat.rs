//! Combat system - bullets, damage, hit detection

use serde::Serialize;

use super::physics::PhysicsSystem;
use super::player::{PlayerId, Position};

/// Distance a bullet travels per tick
pub const BULLET_SPEED: f32 = 8.0;
/// Bullet collision radius
pub const BULLET_RADIUS: f32 = 4.0;
/// Ticks a bullet lives before expiring
pub const BULLET_LIFE: i32 = 100;
/// Health removed from a player, or from destructible cover, per hit
pub const BULLET_DAMAGE: i32 = 20;
/// Score credited to the shooter per hit
pub const HIT_REWARD: u32 = 10;

/// Active bullet in a room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    #[serde(rename = "size")]
    pub radius: f32,
    pub owner_id: PlayerId,
    pub life: i32,
}

impl Bullet {
    /// Fire a bullet from `(x, y)` along `angle` (radians)
    pub fn new(owner_id: PlayerId, x: f32, y: f32, angle: f32) -> Self {
        Self {
            x,
            y,
            vx: angle.cos() * BULLET_SPEED,
            vy: angle.sin() * BULLET_SPEED,
            radius: BULLET_RADIUS,
            owner_id,
            life: BULLET_LIFE,
        }
    }

    /// Advance one tick
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.life -= 1;
    }

    pub fn expired(&self) -> bool {
        self.life <= 0
    }

    /// Check collision with a square target approximated by its inscribed circle
    pub fn hits_player(&self, target_x: f32, target_y: f32, target_width: f32) -> bool {
        PhysicsSystem::circles_overlap(
            self.x,
            self.y,
            self.radius,
            target_x,
            target_y,
            target_width / 2.0,
        )
    }
}

/// Damage bookkeeping helpers
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_dead). Health may go negative
    /// here; the caller respawns before anyone observes it.
    pub fn apply_damage(current_health: i32, damage: i32) -> (i32, bool) {
        let new_health = current_health - damage;
        (new_health, new_health <= 0)
    }
}

/// Source of a hit on a player
#[derive(Debug, Clone, PartialEq)]
pub enum HitSource {
    Bullet { shooter_id: PlayerId },
    Hazard { kind: super::map::HazardKind },
}

/// Outcome of damage applied to one player
#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub player_id: PlayerId,
    pub health: i32,
    pub source: HitSource,
    /// Position after respawn, present only when the hit was lethal
    pub respawned_at: Option<Position>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn bullet_moves_speed_along_angle_each_tick() {
        let mut bullet = Bullet::new(Uuid::new_v4(), 100.0, 100.0, std::f32::consts::FRAC_PI_2);
        for _ in 0..5 {
            bullet.advance();
        }
        assert!((bullet.x - 100.0).abs() < 1e-3);
        assert!((bullet.y - 140.0).abs() < 1e-3);
        assert_eq!(bullet.life, BULLET_LIFE - 5);
    }

    #[test]
    fn bullet_expires_when_life_reaches_zero() {
        let mut bullet = Bullet::new(Uuid::new_v4(), 0.0, 0.0, 0.0);
        bullet.life = 1;
        assert!(!bullet.expired());
        bullet.advance();
        assert!(bullet.expired());
    }

    #[test]
    fn hits_player_within_combined_radius() {
        let bullet = Bullet::new(Uuid::new_v4(), 100.0, 100.0, 0.0);
        assert!(bullet.hits_player(113.0, 100.0, 20.0));
        assert!(!bullet.hits_player(114.5, 100.0, 20.0));
    }

    #[test]
    fn apply_damage_reports_death_at_zero() {
        assert_eq!(CombatSystem::apply_damage(40, 20), (20, false));
        assert_eq!(CombatSystem::apply_damage(20, 20), (0, true));
        assert_eq!(CombatSystem::apply_damage(10, 30), (-20, true));
    }

    #[test]
    fn serializes_with_client_field_names() {
        let owner = Uuid::new_v4();
        let json = serde_json::to_value(Bullet::new(owner, 1.0, 2.0, 0.0)).unwrap();
        assert_eq!(json["size"], 4.0);
        assert_eq!(json["life"], 100);
        assert_eq!(json["ownerId"], owner.to_string());
        assert_eq!(json["vx"], 8.0);
    }
}
