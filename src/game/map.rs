//! Static map geometry consumed by a room
//!
//! Map files store every object by its centre and full width/height, with a free-form
//! `properties` object. Only the properties the simulation reads are typed; anything
//! else is carried through untouched so clients receive the map as authored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::physics::{PhysicsSystem, Rect};

/// Default playfield when no map file is available
pub const DEFAULT_MAP_WIDTH: f32 = 800.0;
pub const DEFAULT_MAP_HEIGHT: f32 = 600.0;

/// Health given to destructible cover that does not declare one
pub const DEFAULT_COVER_HEALTH: f32 = 100.0;
/// Hazard damage when the map omits it
pub const DEFAULT_HAZARD_DAMAGE: f32 = 10.0;
/// Seconds between hazard damage applications when the map omits it
pub const DEFAULT_HAZARD_INTERVAL_SECS: f32 = 1.0;

/// Identifier of a map object; editors emit numbers, hand-written maps often use strings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Number(i64),
    Text(String),
}

/// Declares an object `type` tag with known variants plus `Other`, which keeps the
/// authored string so a map round-trips to clients unchanged.
macro_rules! object_kind {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $tag,)+
                    $name::Other(tag) => tag,
                }
            }
        }

        impl From<String> for $name {
            fn from(tag: String) -> Self {
                match tag.as_str() {
                    $($tag => $name::$variant,)+
                    _ => $name::Other(tag),
                }
            }
        }

        impl From<$name> for String {
            fn from(kind: $name) -> Self {
                match kind {
                    $name::Other(tag) => tag,
                    known => known.as_str().to_string(),
                }
            }
        }
    };
}

object_kind! {
    /// Static geometry kinds
    WallKind {
        Wall => "wall",
        Pillar => "pillar",
        Barrier => "barrier",
        Cover => "cover",
    }
}

/// What a piece of geometry obstructs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocking {
    pub movement: bool,
    pub bullets: bool,
}

impl WallKind {
    /// Collision-set membership. Barriers stop players but not bullets; cover stops
    /// bullets but can be walked through. Unrecognised kinds are decoration.
    pub fn blocking(&self) -> Blocking {
        match self {
            WallKind::Wall | WallKind::Pillar => Blocking {
                movement: true,
                bullets: true,
            },
            WallKind::Barrier => Blocking {
                movement: true,
                bullets: false,
            },
            WallKind::Cover => Blocking {
                movement: false,
                bullets: true,
            },
            WallKind::Other(_) => Blocking {
                movement: false,
                bullets: false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WallProperties {
    #[serde(default)]
    pub destructible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: WallKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub properties: WallProperties,
}

impl Wall {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.x, self.y, self.width, self.height)
    }

    /// Only cover flagged destructible can be shot away
    pub fn is_destructible(&self) -> bool {
        self.kind == WallKind::Cover && self.properties.destructible
    }

    /// Subtract damage from the cover's health counter; returns true once it reaches zero
    pub fn absorb_hit(&mut self, damage: f32) -> bool {
        let remaining = self.properties.health.unwrap_or(DEFAULT_COVER_HEALTH) - damage;
        self.properties.health = Some(remaining);
        remaining <= 0.0
    }
}

object_kind! {
    /// Environmental hazard kinds
    HazardKind {
        Spikes => "spikes",
        Lava => "lava",
        Water => "water",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardProperties {
    #[serde(default = "default_hazard_damage")]
    pub damage: f32,
    #[serde(default = "default_hazard_interval")]
    pub damage_interval: f32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_hazard_damage() -> f32 {
    DEFAULT_HAZARD_DAMAGE
}

fn default_hazard_interval() -> f32 {
    DEFAULT_HAZARD_INTERVAL_SECS
}

impl Default for HazardProperties {
    fn default() -> Self {
        Self {
            damage: DEFAULT_HAZARD_DAMAGE,
            damage_interval: DEFAULT_HAZARD_INTERVAL_SECS,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub properties: HazardProperties,
}

impl Hazard {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.x, self.y, self.width, self.height)
    }

    /// Whole hit points dealt per application
    pub fn damage_points(&self) -> i32 {
        self.properties.damage.round() as i32
    }

    /// Minimum wall-clock gap between two applications to the same player
    pub fn interval_millis(&self) -> u64 {
        (self.properties.damage_interval.max(0.0) * 1000.0) as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub x: f32,
    pub y: f32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

object_kind! {
    /// Powerup kinds placed by the editor
    PowerupKind {
        Health => "health",
        Ammo => "ammo",
        Shield => "shield",
        Speed => "speed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerupSpawn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed map. Read-only to the simulation apart from destructible cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapData {
    #[serde(default = "default_map_name")]
    pub name: String,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default, deserialize_with = "lenient_list")]
    pub walls: Vec<Wall>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub spawns: Vec<SpawnPoint>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub powerups: Vec<PowerupSpawn>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub hazards: Vec<Hazard>,
}

/// Parse an object list entry by entry, skipping malformed entries instead of rejecting
/// the whole map
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed map object");
                None
            }
        })
        .collect())
}

fn default_map_name() -> String {
    "default".to_string()
}

fn default_width() -> f32 {
    DEFAULT_MAP_WIDTH
}

fn default_height() -> f32 {
    DEFAULT_MAP_HEIGHT
}

impl Default for MapData {
    fn default() -> Self {
        Self {
            name: default_map_name(),
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            walls: Vec::new(),
            spawns: Vec::new(),
            powerups: Vec::new(),
            hazards: Vec::new(),
        }
    }
}

impl MapData {
    /// Give every wall and powerup without an id one that no authored id uses, so that
    /// events can name them
    pub fn assign_missing_ids(&mut self) {
        let authored = self
            .walls
            .iter()
            .map(|wall| &wall.id)
            .chain(self.spawns.iter().map(|spawn| &spawn.id))
            .chain(self.powerups.iter().map(|powerup| &powerup.id))
            .chain(self.hazards.iter().map(|hazard| &hazard.id))
            .filter_map(|id| match id {
                Some(ObjectId::Number(n)) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let mut next = authored.max(0);
        let mut fresh = || {
            next += 1;
            Some(ObjectId::Number(next))
        };

        for wall in self.walls.iter_mut().filter(|wall| wall.id.is_none()) {
            wall.id = fresh();
        }
        for powerup in self.powerups.iter_mut().filter(|powerup| powerup.id.is_none()) {
            powerup.id = fresh();
        }
    }

    /// Does any movement-blocking geometry overlap `rect`?
    pub fn blocks_movement(&self, rect: &Rect) -> bool {
        self.walls
            .iter()
            .filter(|wall| wall.kind.blocking().movement)
            .any(|wall| PhysicsSystem::rects_overlap(rect, &wall.rect()))
    }

    /// Index of the first bullet-blocking wall struck by a circle
    pub fn bullet_obstacle(&self, x: f32, y: f32, radius: f32) -> Option<usize> {
        self.walls.iter().position(|wall| {
            wall.kind.blocking().bullets
                && PhysicsSystem::circle_hits_rect(x, y, radius, &wall.rect())
        })
    }

    /// First hazard whose rectangle contains the point
    pub fn hazard_at(&self, x: f32, y: f32) -> Option<&Hazard> {
        self.hazards
            .iter()
            .find(|hazard| PhysicsSystem::rect_contains(x, y, &hazard.rect()))
    }
}
