//! Terrain classification.
//!
//! The classifier is the single authority on what kind of ground a world
//! coordinate is: movement validation, NPC placement and world export all
//! ask it. By default terrain is defined piecewise by coordinate bands
//! plus a cheap hash of the tile coordinates, so no tile grid has to be
//! stored. A world built in the world-builder tool may instead supply an
//! explicit tile grid, which overrides the procedural rules.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::Deserialize;

/// Side length of one terrain tile in world units
pub const TILE_SIZE: f32 = 32.0;

/// Terrain category of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Water,
    Sand,
    Stone,
    Mud,
    Path,
    Dirt,
    Grass,
}

impl Terrain {
    /// Water is the only impassable class
    pub fn is_walkable(&self) -> bool {
        !matches!(self, Terrain::Water)
    }

    /// Parse a tile-grid type string; unknown types read as grass,
    /// mirroring the procedural default.
    pub fn from_name(name: &str) -> Terrain {
        match name {
            "water" => Terrain::Water,
            "sand" => Terrain::Sand,
            "stone" | "cobblestone" => Terrain::Stone,
            "mud" => Terrain::Mud,
            "path" => Terrain::Path,
            "dirt" => Terrain::Dirt,
            _ => Terrain::Grass,
        }
    }
}

/// Procedural classification: deterministic and side-effect-free.
pub fn classify_procedural(x: f32, y: f32) -> Terrain {
    let tile_x = (x / TILE_SIZE).floor() as i64;
    let tile_y = (y / TILE_SIZE).floor() as i64;
    let noise = (tile_x as f64 * 0.1).sin() * (tile_y as f64 * 0.1).cos()
        + (tile_x as f64 * 0.05).sin() * 0.5;

    // Water: the north sea and an inland lake
    if y < 150.0 || (y > 800.0 && y < 900.0 && x > 600.0 && x < 900.0) {
        Terrain::Water
    }
    // Sandy beaches fringing the water
    else if y < 180.0 || (y > 770.0 && y < 810.0 && x > 570.0 && x < 930.0) {
        Terrain::Sand
    }
    // Southern mountains and noisy rocky outcrops
    else if y > 1700.0 || (noise > 0.7 && y > 1200.0) {
        Terrain::Stone
    }
    // Eastern swamp
    else if x > 1400.0 && x < 1600.0 && y > 400.0 && y < 600.0 {
        Terrain::Mud
    }
    // The two main roads and the diagonal trail
    else if (x > 480.0 && x < 520.0 && y > 200.0 && y < 1800.0)
        || (y > 580.0 && y < 620.0 && x > 200.0 && x < 1800.0)
        || ((x - y).abs() < 40.0 && x > 300.0 && x < 800.0)
    {
        Terrain::Path
    }
    // Dirt speckling plus the road shoulders
    else if (tile_x * 7 + tile_y * 13).rem_euclid(31) == 0
        || (x > 520.0 && x < 560.0 && y > 200.0 && y < 1800.0)
        || (y > 620.0 && y < 660.0 && x > 200.0 && x < 1800.0)
    {
        Terrain::Dirt
    } else {
        Terrain::Grass
    }
}

/// Tile-grid file metadata and rows (world-builder export format)
#[derive(Debug, Deserialize)]
struct TileGridFile {
    version: u32,
    #[allow(dead_code)]
    name: Option<String>,
    width: u32,
    height: u32,
    tile_size: f32,
    /// Row-major: `tiles[y][x]`
    tiles: Vec<Vec<TileEntry>>,
}

#[derive(Debug, Deserialize)]
struct TileEntry {
    #[serde(rename = "type")]
    kind: String,
    #[allow(dead_code)]
    variant: Option<u32>,
}

/// An explicit tile grid overriding the procedural classifier
#[derive(Debug)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    /// Row-major, `width * height` entries
    tiles: Vec<Terrain>,
}

impl TileGrid {
    /// Load a tile grid from a world-builder JSON export
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| format!("Failed to open tile grid {:?}: {}", path, e))?;
        let reader = BufReader::new(file);
        let raw: TileGridFile = serde_json::from_reader(reader)
            .map_err(|e| format!("Failed to parse tile grid {:?}: {}", path, e))?;

        if raw.version != 1 {
            return Err(format!("Unsupported tile grid version: {}", raw.version));
        }
        if raw.tiles.len() != raw.height as usize {
            return Err(format!(
                "Tile grid row count mismatch: expected {}, got {}",
                raw.height,
                raw.tiles.len()
            ));
        }

        let mut tiles = Vec::with_capacity((raw.width * raw.height) as usize);
        for (y, row) in raw.tiles.iter().enumerate() {
            if row.len() != raw.width as usize {
                return Err(format!(
                    "Tile grid row {} length mismatch: expected {}, got {}",
                    y,
                    raw.width,
                    row.len()
                ));
            }
            tiles.extend(row.iter().map(|t| Terrain::from_name(&t.kind)));
        }

        info!(
            "Loaded tile grid {}x{} (tile size {})",
            raw.width, raw.height, raw.tile_size
        );

        Ok(Self {
            width: raw.width,
            height: raw.height,
            tile_size: raw.tile_size,
            tiles,
        })
    }

    fn classify(&self, x: f32, y: f32) -> Terrain {
        let tile_x = (x / self.tile_size).floor();
        let tile_y = (y / self.tile_size).floor();
        if tile_x < 0.0 || tile_y < 0.0 {
            return Terrain::Grass;
        }
        let (tile_x, tile_y) = (tile_x as u32, tile_y as u32);
        if tile_x >= self.width || tile_y >= self.height {
            return Terrain::Grass;
        }
        self.tiles[(tile_y * self.width + tile_x) as usize]
    }
}

/// The world's terrain authority: an optional explicit grid in front of
/// the procedural rules.
#[derive(Debug, Default)]
pub struct TerrainMap {
    grid: Option<TileGrid>,
}

impl TerrainMap {
    pub fn procedural() -> Self {
        Self { grid: None }
    }

    pub fn with_grid(grid: TileGrid) -> Self {
        Self { grid: Some(grid) }
    }

    pub fn classify(&self, x: f32, y: f32) -> Terrain {
        match &self.grid {
            Some(grid) => grid.classify(x, y),
            None => classify_procedural(x, y),
        }
    }

    /// Whether a point may be moved onto
    pub fn is_walkable(&self, x: f32, y: f32) -> bool {
        self.classify(x, y).is_walkable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_deterministic() {
        for &(x, y) in &[(0.0, 0.0), (123.0, 456.0), (1999.0, 1999.0)] {
            assert_eq!(classify_procedural(x, y), classify_procedural(x, y));
        }
    }

    #[test]
    fn known_bands() {
        assert_eq!(classify_procedural(1000.0, 100.0), Terrain::Water);
        assert_eq!(classify_procedural(750.0, 850.0), Terrain::Water);
        assert_eq!(classify_procedural(1000.0, 165.0), Terrain::Sand);
        assert_eq!(classify_procedural(1000.0, 1900.0), Terrain::Stone);
        assert_eq!(classify_procedural(1500.0, 500.0), Terrain::Mud);
        assert_eq!(classify_procedural(500.0, 1000.0), Terrain::Path);
        assert_eq!(classify_procedural(940.0, 1000.0), Terrain::Grass);
    }

    #[test]
    fn only_water_blocks_movement() {
        assert!(!Terrain::Water.is_walkable());
        for t in [
            Terrain::Sand,
            Terrain::Stone,
            Terrain::Mud,
            Terrain::Path,
            Terrain::Dirt,
            Terrain::Grass,
        ] {
            assert!(t.is_walkable());
        }
    }

    #[test]
    fn unknown_tile_names_read_as_grass() {
        assert_eq!(Terrain::from_name("lava"), Terrain::Grass);
        assert_eq!(Terrain::from_name("cobblestone"), Terrain::Stone);
    }

    #[test]
    fn grid_overrides_procedural_rules() {
        // A 2x2 all-water grid over a region that is procedurally grassy
        let grid = TileGrid {
            width: 2,
            height: 2,
            tile_size: 1000.0,
            tiles: vec![Terrain::Water; 4],
        };
        let map = TerrainMap::with_grid(grid);
        assert_eq!(map.classify(940.0, 1000.0), Terrain::Water);
        // Outside the grid falls back to the grass default
        assert_eq!(map.classify(2100.0, 2100.0), Terrain::Grass);
    }
}
