//! External terrain attribute source consumed by the world.

use std::collections::BTreeMap;
use std::fmt;

use rover_colony_core::{ElevationLayer, LayerId, TileFlag, TilePosition, TileRect};

/// Attribute lookup result naming the layer that supplied the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainSample {
    /// Terrain layer that owns the attribute value.
    pub layer: LayerId,
    /// Boolean attribute value read from the layer.
    pub value: bool,
}

/// Read-only terrain attribute supplier.
///
/// The engine treats terrain as an external collaborator: attribute values
/// come from the first non-ignored layer covering a position, and layers are
/// grouped into elevation tiers by the resolver. Implementations must be
/// pure; the world never writes through this interface.
pub trait TerrainSource: fmt::Debug {
    /// Looks up a boolean attribute for the provided tile.
    ///
    /// Returns `None` when no layer covers the position at all.
    fn attribute(&self, position: TilePosition, flag: TileFlag) -> Option<TerrainSample>;

    /// Terrain layer covering the provided tile, if any.
    fn covering_layer(&self, position: TilePosition) -> Option<LayerId>;

    /// Resolves the elevation tier that owns a terrain layer.
    fn elevation_of(&self, layer: LayerId) -> ElevationLayer;

    /// Convenience lookup returning the attribute value, defaulting to false.
    fn flag(&self, position: TilePosition, flag: TileFlag) -> bool {
        self.attribute(position, flag)
            .map_or(false, |sample| sample.value)
    }

    /// Elevation tier covering the provided tile, if any layer covers it.
    fn elevation_at(&self, position: TilePosition) -> Option<ElevationLayer> {
        self.covering_layer(position)
            .map(|layer| self.elevation_of(layer))
    }
}

#[derive(Clone, Copy, Debug)]
struct TileRecord {
    layer: LayerId,
    buildable: bool,
    wood: bool,
    rough: bool,
    water: bool,
    mud: bool,
}

impl Default for LayerRecord {
    fn default() -> Self {
        Self {
            elevation: ElevationLayer::new(0),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LayerRecord {
    elevation: ElevationLayer,
}

impl TileRecord {
    fn read(&self, flag: TileFlag) -> bool {
        match flag {
            TileFlag::Buildable => self.buildable,
            TileFlag::WoodResource => self.wood,
            TileFlag::RoughTerrain => self.rough,
            TileFlag::Water => self.water,
            TileFlag::Mud => self.mud,
        }
    }

    fn write(&mut self, flag: TileFlag, value: bool) {
        match flag {
            TileFlag::Buildable => self.buildable = value,
            TileFlag::WoodResource => self.wood = value,
            TileFlag::RoughTerrain => self.rough = value,
            TileFlag::Water => self.water = value,
            TileFlag::Mud => self.mud = value,
        }
    }
}

impl Default for TileRecord {
    fn default() -> Self {
        Self {
            layer: LayerId::new(0),
            buildable: false,
            wood: false,
            rough: false,
            water: false,
            mud: false,
        }
    }
}

/// In-memory [`TerrainSource`] backed by explicit per-tile records.
///
/// Used by the command-line adapter and by tests; production deployments
/// supply their own terrain layers through the trait.
#[derive(Debug, Default)]
pub struct MapTerrain {
    tiles: BTreeMap<TilePosition, TileRecord>,
    layers: BTreeMap<LayerId, LayerRecord>,
}

impl MapTerrain {
    /// Creates an empty terrain map with no known tiles or layers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a terrain layer under the provided elevation tier.
    pub fn assign_layer(&mut self, layer: LayerId, elevation: ElevationLayer) {
        let _ = self.layers.insert(layer, LayerRecord { elevation });
    }

    /// Declares a tile covered by the given layer carrying the given flags.
    pub fn insert_tile(&mut self, position: TilePosition, layer: LayerId, flags: &[TileFlag]) {
        let mut record = TileRecord {
            layer,
            ..TileRecord::default()
        };
        for flag in flags {
            record.write(*flag, true);
        }
        let _ = self.tiles.insert(position, record);
    }

    /// Declares every tile in a rectangle with identical layer and flags.
    pub fn fill(&mut self, rect: TileRect, layer: LayerId, flags: &[TileFlag]) {
        for tile in rect.tiles() {
            self.insert_tile(tile, layer, flags);
        }
    }

    /// Overrides a single flag on an already declared tile.
    pub fn set_flag(&mut self, position: TilePosition, flag: TileFlag, value: bool) {
        if let Some(record) = self.tiles.get_mut(&position) {
            record.write(flag, value);
        }
    }
}

impl TerrainSource for MapTerrain {
    fn attribute(&self, position: TilePosition, flag: TileFlag) -> Option<TerrainSample> {
        self.tiles.get(&position).map(|record| TerrainSample {
            layer: record.layer,
            value: record.read(flag),
        })
    }

    fn covering_layer(&self, position: TilePosition) -> Option<LayerId> {
        self.tiles.get(&position).map(|record| record.layer)
    }

    fn elevation_of(&self, layer: LayerId) -> ElevationLayer {
        self.layers
            .get(&layer)
            .map_or(ElevationLayer::new(layer.get()), |record| record.elevation)
    }
}
