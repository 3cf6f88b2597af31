//! Map file catalogue backed by a directory of `*.json` files

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::game::map::MapData;

/// Lobby entry for one map file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapListing {
    pub filename: String,
    pub name: String,
    pub size: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid map name: {0}")]
    InvalidName(String),

    #[error("Map not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads maps on demand so new files show up without a restart
#[derive(Debug, Clone)]
pub struct MapCatalog {
    dir: PathBuf,
}

impl MapCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Every parseable map in the directory, sorted by filename
    pub async fn list(&self) -> Result<Vec<MapListing>, MapError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut maps = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(".json") {
                continue;
            }
            match read_map(&entry.path()).await {
                Ok(map) => maps.push(MapListing {
                    filename,
                    name: map.name,
                    size: format!("{}x{}", map.width, map.height),
                }),
                Err(e) => warn!(file = %filename, error = %e, "Skipping unreadable map"),
            }
        }

        maps.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(maps)
    }

    /// Raw JSON of one map file, as authored
    pub async fn get(&self, filename: &str) -> Result<Value, MapError> {
        let path = self.resolve(filename)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MapError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load `<dir>/<map_name>.json` for a new room, falling back to the empty default
    /// map on any failure
    pub async fn load(&self, map_name: &str) -> MapData {
        let result = match self.resolve(&format!("{map_name}.json")) {
            Ok(path) => read_map(&path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(map) => {
                info!(map = %map_name, walls = map.walls.len(), "Loaded map");
                map
            }
            Err(MapError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => MapData::default(),
            Err(e) => {
                warn!(map = %map_name, error = %e, "Failed to load map, using default");
                MapData::default()
            }
        }
    }

    /// Only bare file names inside the catalogue directory are accepted
    fn resolve(&self, filename: &str) -> Result<PathBuf, MapError> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(|c: char| c == '/' || c == '\\')
            && !filename.contains("..");
        if !valid {
            return Err(MapError::InvalidName(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }
}

async fn read_map(path: &Path) -> Result<MapData, MapError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh scratch directory under the system temp dir
    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("arena-maps-{tag}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) const ARENA: &str = r#"{
        "name": "Arena",
        "width": 1200,
        "height": 900,
        "walls": [{"id": 1, "type": "wall", "x": 600, "y": 450, "width": 40, "height": 40}],
        "spawns": [{"x": 100, "y": 100}]
    }"#;

    #[tokio::test]
    async fn lists_json_maps_and_skips_broken_ones() {
        let dir = scratch_dir("list");
        std::fs::write(dir.join("arena.json"), ARENA).unwrap();
        std::fs::write(dir.join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignore me").unwrap();

        let maps = MapCatalog::new(&dir).list().await.unwrap();
        assert_eq!(
            maps,
            vec![MapListing {
                filename: "arena.json".to_string(),
                name: "Arena".to_string(),
                size: "1200x900".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let catalog = MapCatalog::new(std::env::temp_dir().join("arena-maps-does-not-exist"));
        assert!(catalog.list().await.is_err());
    }

    #[tokio::test]
    async fn load_falls_back_to_default_map() {
        let dir = scratch_dir("load");
        std::fs::write(dir.join("arena.json"), ARENA).unwrap();
        std::fs::write(dir.join("broken.json"), "[]").unwrap();
        let catalog = MapCatalog::new(&dir);

        assert_eq!(catalog.load("arena").await.walls.len(), 1);
        assert_eq!(catalog.load("missing").await.name, "default");
        assert_eq!(catalog.load("broken").await.width, 800.0);
        assert_eq!(catalog.load("../arena").await.name, "default");
    }

    #[tokio::test]
    async fn get_returns_raw_json_and_rejects_traversal() {
        let dir = scratch_dir("get");
        std::fs::write(dir.join("arena.json"), ARENA).unwrap();
        let catalog = MapCatalog::new(&dir);

        let raw = catalog.get("arena.json").await.unwrap();
        assert_eq!(raw["name"], "Arena");
        assert!(matches!(
            catalog.get("nope.json").await,
            Err(MapError::NotFound(_))
        ));
        assert!(matches!(
            catalog.get("../secret.json").await,
            Err(MapError::InvalidName(_))
        ));
    }
}
