//! Tile grid: terrain and the occupancy index.
//!
//! The occupancy index maps every tile to the ids of entities whose footprint
//! interior overlaps it. Ids within a tile are kept in the order they entered
//! that tile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::RectFixed;

/// Integer tile coordinate.
pub type Tile = (i32, i32);

/// Terrain classification of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground.
    #[default]
    Grass,
    /// Light woodland.
    Forest,
    /// Lakes and rivers.
    Water,
    /// Cliffs and mountains.
    Rock,
}

impl Terrain {
    /// Whether buildings may stand on this terrain.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Grass | Self::Forest)
    }
}

/// Terrain for every tile of the map, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tiles: Vec<Terrain>,
}

impl TerrainGrid {
    /// A map of open ground.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Terrain::Grass; count],
        }
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, (x, y): Tile) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width && y < self.height)
            .then(|| (y as usize) * (self.width as usize) + (x as usize))
    }

    /// Terrain at a tile, `None` outside the map.
    #[must_use]
    pub fn get(&self, tile: Tile) -> Option<Terrain> {
        self.index(tile).map(|index| self.tiles[index])
    }

    /// Set terrain at a tile. Returns `false` outside the map.
    pub fn set(&mut self, tile: Tile, terrain: Terrain) -> bool {
        match self.index(tile) {
            Some(index) => {
                self.tiles[index] = terrain;
                true
            }
            None => false,
        }
    }
}

/// Tiles covered by a footprint, row by row.
pub fn tiles_of(rect: &RectFixed) -> impl Iterator<Item = Tile> {
    let (x0, y0, x1, y1) = rect.tile_span();
    (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
}

/// Occupancy index from tile to entity ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileIndex {
    tiles: BTreeMap<Tile, Vec<EntityId>>,
}

impl TileIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` on every tile of `footprint`.
    pub fn insert(&mut self, id: EntityId, footprint: &RectFixed) {
        for tile in tiles_of(footprint) {
            self.add_to_tile(tile, id);
        }
    }

    /// Unregister `id` from every tile of `footprint`.
    pub fn remove(&mut self, id: EntityId, footprint: &RectFixed) {
        for tile in tiles_of(footprint) {
            self.remove_from_tile(tile, id);
        }
    }

    /// Move `id` from one footprint to another.
    ///
    /// Both tile sets are computed before anything is touched, and tiles in
    /// both sets are left alone, so the entity keeps its place in the order of
    /// tiles it never left.
    pub fn relocate(&mut self, id: EntityId, from: &RectFixed, to: &RectFixed) {
        let old: Vec<Tile> = tiles_of(from).collect();
        let new: Vec<Tile> = tiles_of(to).collect();
        if old == new {
            return;
        }

        let removed: Vec<Tile> = old.iter().filter(|t| !new.contains(t)).copied().collect();
        let added: Vec<Tile> = new.iter().filter(|t| !old.contains(t)).copied().collect();

        for tile in removed {
            self.remove_from_tile(tile, id);
        }
        for tile in added {
            self.add_to_tile(tile, id);
        }
    }

    /// Ids on one tile, in arrival order.
    #[must_use]
    pub fn at(&self, tile: Tile) -> &[EntityId] {
        self.tiles.get(&tile).map_or(&[][..], Vec::as_slice)
    }

    /// Every id on any tile of `area`, each once, in first-seen order.
    #[must_use]
    pub fn candidates(&self, area: &RectFixed) -> Vec<EntityId> {
        let mut seen = Vec::new();
        for tile in tiles_of(area) {
            for &id in self.at(tile) {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        seen
    }

    /// Number of occupied tiles.
    #[must_use]
    pub fn occupied_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Whether `id` is registered on `tile`.
    #[must_use]
    pub fn contains(&self, tile: Tile, id: EntityId) -> bool {
        self.at(tile).contains(&id)
    }

    /// Iterate over every `(tile, ids)` pair in tile order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tile, &Vec<EntityId>)> {
        self.tiles.iter()
    }

    fn add_to_tile(&mut self, tile: Tile, id: EntityId) {
        let ids = self.tiles.entry(tile).or_default();
        debug_assert!(!ids.contains(&id), "entity {id} indexed twice on {tile:?}");
        ids.push(id);
    }

    fn remove_from_tile(&mut self, tile: Tile, id: EntityId) {
        if let Some(ids) = self.tiles.get_mut(&tile) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.tiles.remove(&tile);
            }
        }
    }
}
