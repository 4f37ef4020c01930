#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure movement validation and A* route planning for the Rover Colony engine.
//!
//! The planner never touches world state directly: it reads tiles through the
//! [`PathTiles`] oracle, so callers decide whether the backing store is the
//! live world, a snapshot, or a synthetic fixture.

use std::collections::{BTreeMap, BTreeSet};

use rover_colony_core::{ElevationLayer, MoveError, TileFlag, TilePosition, TileRect, UnitId,
    VehicleClass};
use rover_colony_world::{query, World};

/// Upper bound on A* node expansions before the search reports no route.
pub const SEARCH_EXPANSION_CAP: usize = 1000;

/// Immutable tile oracle consulted by the validator and the planner.
pub trait PathTiles {
    /// Elevation tier of the tile, or `None` when no layer covers it.
    fn elevation(&self, tile: TilePosition) -> Option<ElevationLayer>;
    /// Whether the tile accepts ground traversal and construction.
    fn is_buildable(&self, tile: TilePosition) -> bool;
    /// Whether the tile is rough terrain.
    fn is_rough(&self, tile: TilePosition) -> bool;
    /// Whether the tile is covered by water.
    fn is_water(&self, tile: TilePosition) -> bool;
    /// Whether the tile holds a wood resource blocking aerial traffic.
    fn is_wood(&self, tile: TilePosition) -> bool;
    /// Whether any unit occupies the tile.
    fn is_occupied(&self, tile: TilePosition) -> bool;
    /// Whether a standing structure occupies the tile.
    fn is_structure(&self, tile: TilePosition) -> bool;
}

/// [`PathTiles`] adapter reading from the live world.
///
/// When `mover` is set, tiles inside that unit's own footprint do not count
/// as occupied, so a unit never blocks itself.
#[derive(Clone, Copy, Debug)]
pub struct WorldTiles<'world> {
    world: &'world World,
    mover: Option<UnitId>,
}

impl<'world> WorldTiles<'world> {
    /// Creates an oracle over the provided world with no mover exemption.
    #[must_use]
    pub fn new(world: &'world World) -> Self {
        Self {
            world,
            mover: None,
        }
    }

    /// Creates an oracle that exempts the moving unit's own footprint.
    #[must_use]
    pub fn for_mover(world: &'world World, mover: UnitId) -> Self {
        Self {
            world,
            mover: Some(mover),
        }
    }

    fn is_own_footprint(&self, tile: TilePosition) -> bool {
        self.mover
            .and_then(|id| query::unit(self.world, id))
            .map_or(false, |unit| unit.area.contains(tile))
    }
}

impl PathTiles for WorldTiles<'_> {
    fn elevation(&self, tile: TilePosition) -> Option<ElevationLayer> {
        query::terrain(self.world).elevation_at(tile)
    }

    fn is_buildable(&self, tile: TilePosition) -> bool {
        query::terrain(self.world).flag(tile, TileFlag::Buildable)
            || query::landmark(self.world) == Some(tile)
    }

    fn is_rough(&self, tile: TilePosition) -> bool {
        query::terrain(self.world).flag(tile, TileFlag::RoughTerrain)
    }

    fn is_water(&self, tile: TilePosition) -> bool {
        query::terrain(self.world).flag(tile, TileFlag::Water)
    }

    fn is_wood(&self, tile: TilePosition) -> bool {
        query::terrain(self.world).flag(tile, TileFlag::WoodResource)
    }

    fn is_occupied(&self, tile: TilePosition) -> bool {
        if self.is_own_footprint(tile) {
            return false;
        }
        query::occupied_tiles(self.world).contains(&tile)
    }

    fn is_structure(&self, tile: TilePosition) -> bool {
        if self.is_own_footprint(tile) {
            return false;
        }
        query::structure_at(self.world, tile).is_some()
    }
}

/// Validates a single-step move of a unit's footprint.
///
/// Ground vehicles require every destination tile to be buildable, to share
/// the elevation layer of both the origin and destination reference tiles,
/// and to avoid rough terrain. Aerial vehicles only require destination
/// tiles free of standing structures and wood. Tiles shared between the
/// origin and destination areas are always permitted so units can turn in
/// place.
pub fn can_step_to<T: PathTiles>(
    tiles: &T,
    vehicle: VehicleClass,
    origin: TileRect,
    destination: TileRect,
) -> Result<(), MoveError> {
    match vehicle {
        VehicleClass::Ground => {
            let origin_elevation = tiles.elevation(origin.origin());
            let destination_elevation = tiles.elevation(destination.origin());
            if origin_elevation.is_none() || destination_elevation.is_none() {
                return Err(MoveError::OutOfBounds);
            }
            if origin_elevation != destination_elevation {
                return Err(MoveError::ElevationMismatch);
            }
            for tile in destination.tiles() {
                if origin.contains(tile) {
                    continue;
                }
                if tiles.elevation(tile).is_none() {
                    return Err(MoveError::OutOfBounds);
                }
                if tiles.elevation(tile) != destination_elevation {
                    return Err(MoveError::ElevationMismatch);
                }
                if !tiles.is_buildable(tile) || tiles.is_rough(tile) {
                    return Err(MoveError::NotTraversable);
                }
                if tiles.is_occupied(tile) {
                    return Err(MoveError::Occupied);
                }
            }
        }
        VehicleClass::Aerial => {
            for tile in destination.tiles() {
                if origin.contains(tile) {
                    continue;
                }
                if tiles.is_structure(tile) {
                    return Err(MoveError::Occupied);
                }
                if tiles.is_wood(tile) {
                    return Err(MoveError::NotTraversable);
                }
            }
        }
    }
    Ok(())
}

/// Route computed by the planner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlannedPath {
    /// Tiles to traverse in order, excluding the start tile.
    pub steps: Vec<TilePosition>,
    /// Path tiles that require a bridge before traversal.
    pub bridge_tiles: Vec<TilePosition>,
}

impl PlannedPath {
    /// Total step cost of the route; each tile advance costs one.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.steps.len() as u32
    }

    /// Whether the planner found no route.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Reasons the two-phase route policy can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteError {
    /// No route exists within the expansion cap, dry or bridged.
    NoRoute,
    /// A bridged route exists but the caller cannot afford its bridges.
    InsufficientBridges {
        /// Number of bridge tiles the route requires.
        required: usize,
        /// Consumable bridge units the caller holds.
        available: u32,
    },
}

/// A* search between two tiles over 4-connected moves.
///
/// The open list is re-sorted by total cost each iteration with ties broken
/// by insertion order, and the search gives up after
/// [`SEARCH_EXPANSION_CAP`] expansions, yielding an empty path. Tiles in
/// `excluded` are never entered. With `allow_water_crossing` the endpoints
/// must share an elevation layer; path tiles that are water-flagged or off
/// that layer are reported as bridge tiles.
pub fn find_path<T: PathTiles>(
    tiles: &T,
    vehicle: VehicleClass,
    from: TilePosition,
    to: TilePosition,
    allow_water_crossing: bool,
    excluded: &BTreeSet<TilePosition>,
) -> PlannedPath {
    if from == to {
        return PlannedPath::default();
    }

    let shared_elevation = tiles.elevation(from);
    if allow_water_crossing && shared_elevation != tiles.elevation(to) {
        return PlannedPath::default();
    }

    let admit = |tile: TilePosition| -> bool {
        if excluded.contains(&tile) {
            return false;
        }
        match vehicle {
            VehicleClass::Ground => {
                let Some(elevation) = tiles.elevation(tile) else {
                    return false;
                };
                if tiles.is_rough(tile) || tiles.is_occupied(tile) {
                    return false;
                }
                let on_shared_layer = Some(elevation) == shared_elevation;
                let dry = tiles.is_buildable(tile) && !tiles.is_water(tile) && on_shared_layer;
                if allow_water_crossing {
                    // Wet or off-layer tiles become bridges later.
                    dry || tiles.is_water(tile) || !on_shared_layer
                } else {
                    dry
                }
            }
            VehicleClass::Aerial => {
                tiles.elevation(tile).is_some()
                    && !tiles.is_structure(tile)
                    && !tiles.is_wood(tile)
            }
        }
    };

    if !admit(to) {
        return PlannedPath::default();
    }

    let mut open: Vec<OpenNode> = vec![OpenNode {
        tile: from,
        total_cost: from.manhattan_distance(to),
        sequence: 0,
    }];
    let mut best_cost: BTreeMap<TilePosition, u32> = BTreeMap::new();
    let mut came_from: BTreeMap<TilePosition, TilePosition> = BTreeMap::new();
    let _ = best_cost.insert(from, 0);

    let mut sequence = 1u64;
    let mut expansions = 0usize;

    while !open.is_empty() {
        if expansions >= SEARCH_EXPANSION_CAP {
            return PlannedPath::default();
        }
        expansions += 1;

        open.sort_by_key(|node| (node.total_cost, node.sequence));
        let current = open.remove(0);

        if current.tile == to {
            let flag_bridges = allow_water_crossing && vehicle == VehicleClass::Ground;
            return reconstruct(tiles, shared_elevation, &came_from, from, to, flag_bridges);
        }

        let reached = best_cost.get(&current.tile).copied().unwrap_or(u32::MAX);
        for neighbor in cardinal_neighbors(current.tile) {
            if !admit(neighbor) {
                continue;
            }

            let tentative = reached.saturating_add(1);
            let known = best_cost.get(&neighbor).copied().unwrap_or(u32::MAX);
            if tentative >= known {
                continue;
            }

            let _ = best_cost.insert(neighbor, tentative);
            let _ = came_from.insert(neighbor, current.tile);
            open.push(OpenNode {
                tile: neighbor,
                total_cost: tentative.saturating_add(neighbor.manhattan_distance(to)),
                sequence,
            });
            sequence += 1;
        }
    }

    PlannedPath::default()
}

/// Two-phase route policy preferring dry paths over bridged ones.
///
/// The dry attempt always runs first; the crossing retry happens only when
/// the dry attempt came back empty and the mover is a ground unit. A
/// crossing route commits only when the caller can afford one consumable
/// bridge unit per reported bridge tile.
pub fn plan_route<T: PathTiles>(
    tiles: &T,
    vehicle: VehicleClass,
    from: TilePosition,
    to: TilePosition,
    bridge_budget: u32,
    excluded: &BTreeSet<TilePosition>,
) -> Result<PlannedPath, RouteError> {
    if from == to {
        return Ok(PlannedPath::default());
    }

    let dry = find_path(tiles, vehicle, from, to, false, excluded);
    if !dry.is_empty() {
        return Ok(dry);
    }

    if vehicle != VehicleClass::Ground {
        return Err(RouteError::NoRoute);
    }

    let bridged = find_path(tiles, vehicle, from, to, true, excluded);
    if bridged.is_empty() {
        return Err(RouteError::NoRoute);
    }

    let required = bridged.bridge_tiles.len();
    if required as u64 > u64::from(bridge_budget) {
        return Err(RouteError::InsufficientBridges {
            required,
            available: bridge_budget,
        });
    }

    Ok(bridged)
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    tile: TilePosition,
    total_cost: u32,
    sequence: u64,
}

fn cardinal_neighbors(tile: TilePosition) -> [TilePosition; 4] {
    [
        tile.offset_by(0, -1),
        tile.offset_by(1, 0),
        tile.offset_by(0, 1),
        tile.offset_by(-1, 0),
    ]
}

fn reconstruct<T: PathTiles>(
    tiles: &T,
    shared_elevation: Option<ElevationLayer>,
    came_from: &BTreeMap<TilePosition, TilePosition>,
    from: TilePosition,
    to: TilePosition,
    flag_bridges: bool,
) -> PlannedPath {
    let mut steps = vec![to];
    let mut cursor = to;
    while let Some(previous) = came_from.get(&cursor).copied() {
        if previous == from {
            break;
        }
        steps.push(previous);
        cursor = previous;
    }
    steps.reverse();

    let bridge_tiles = if flag_bridges {
        steps
            .iter()
            .copied()
            .filter(|tile| tiles.is_water(*tile) || tiles.elevation(*tile) != shared_elevation)
            .collect()
    } else {
        Vec::new()
    };

    PlannedPath {
        steps,
        bridge_tiles,
    }
}
