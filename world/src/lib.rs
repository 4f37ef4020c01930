#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Rover Colony engine.
//!
//! The world owns the unit registry, the per-unit waypoint lists, and the
//! derived tile-set registry. Adapters and systems mutate it exclusively
//! through [`apply`]; every command either commits and broadcasts a
//! confirmation event or rejects synchronously with a reason event and no
//! state change.

mod connectivity;
pub mod spatial;
pub mod terrain;
mod units;

use std::collections::{BTreeMap, BTreeSet};

use rover_colony_core::{
    Command, Event, MoveError, PlacementError, RemovalError, TileFlag, TilePosition, TileRect,
    UnitId, UnitKind, UnitSpec, VehicleClass, Waypoint,
};

use connectivity::NetworkNode;
use terrain::TerrainSource;
use units::{UnitRegistry, UnitState};

/// Represents the authoritative Rover Colony world state.
#[derive(Debug)]
pub struct World {
    terrain: Box<dyn TerrainSource>,
    units: UnitRegistry,
    base: Option<UnitId>,
    landmark: Option<TilePosition>,
    waypoints: BTreeMap<UnitId, Vec<Waypoint>>,
    occupied: BTreeSet<TilePosition>,
    valid_buildable: BTreeSet<TilePosition>,
    danger_occupied: BTreeSet<TilePosition>,
    attack: BTreeSet<TilePosition>,
    collected_resource: BTreeSet<TilePosition>,
    base_coverage: BTreeSet<TilePosition>,
}

impl World {
    /// Creates a new world reading tile attributes from the provided source.
    #[must_use]
    pub fn new(terrain: Box<dyn TerrainSource>) -> Self {
        Self {
            terrain,
            units: UnitRegistry::new(),
            base: None,
            landmark: None,
            waypoints: BTreeMap::new(),
            occupied: BTreeSet::new(),
            valid_buildable: BTreeSet::new(),
            danger_occupied: BTreeSet::new(),
            attack: BTreeSet::new(),
            collected_resource: BTreeSet::new(),
            base_coverage: BTreeSet::new(),
        }
    }

    /// Clears every derived tile set and replays all live units.
    ///
    /// Must be invoked after any destroy or disable; invoking it redundantly
    /// is safe. Occupancy is excluded from buildability before danger
    /// coverage is.
    fn recalculate_grid(&mut self) {
        self.occupied.clear();
        self.valid_buildable.clear();
        self.danger_occupied.clear();
        self.attack.clear();
        self.collected_resource.clear();
        self.base_coverage.clear();

        for unit in self.units.iter() {
            if unit.destroying {
                continue;
            }
            self.occupied.extend(unit.area.tiles());
        }

        let terrain = self.terrain.as_ref();
        let landmark = self.landmark;
        for unit in self.units.iter() {
            if !unit.is_active() {
                continue;
            }
            if unit.radii.network > 0 {
                self.valid_buildable.extend(spatial::valid_tiles_in_radius(
                    terrain,
                    landmark,
                    unit.area,
                    unit.radii.network,
                ));
            }
            if unit.radii.danger > 0 {
                self.danger_occupied
                    .extend(spatial::tiles_in_radius(unit.area, unit.radii.danger, |_| {
                        true
                    }));
            }
            if unit.radii.attack > 0 {
                self.attack
                    .extend(spatial::tiles_in_radius(unit.area, unit.radii.attack, |_| {
                        true
                    }));
            }
            if unit.radii.resource > 0 {
                self.collected_resource.extend(
                    spatial::resource_tiles_in_radius(terrain, unit.area, unit.radii.resource),
                );
            }
        }

        if let Some(base) = self.base.and_then(|id| self.units.get(id)) {
            if base.is_active() {
                self.base_coverage = spatial::valid_tiles_in_radius(
                    terrain,
                    landmark,
                    base.area,
                    base.radii.network,
                );
            }
        }

        // Occupancy exclusion first, danger exclusion second.
        self.valid_buildable = &self.valid_buildable - &self.occupied;
        self.valid_buildable = &self.valid_buildable - &self.danger_occupied;
    }

    fn unit_coverage(&self, area: TileRect, network_radius: u32) -> BTreeSet<TilePosition> {
        if network_radius == 0 {
            return BTreeSet::new();
        }
        spatial::valid_tiles_in_radius(self.terrain.as_ref(), self.landmark, area, network_radius)
    }

    /// Connectivity nodes for every active unit, with optional overrides.
    ///
    /// `relocated` substitutes a hypothetical footprint for one unit;
    /// `removed` drops a unit from the graph entirely.
    fn network_nodes(
        &self,
        relocated: Option<(UnitId, TileRect)>,
        removed: Option<UnitId>,
    ) -> Vec<NetworkNode> {
        self.units
            .iter()
            .filter(|unit| unit.is_active() && Some(unit.id) != removed)
            .map(|unit| {
                let area = match relocated {
                    Some((id, substitute)) if id == unit.id => substitute,
                    _ => unit.area,
                };
                NetworkNode {
                    id: unit.id,
                    area,
                    coverage: self.unit_coverage(area, unit.radii.network),
                    is_danger: unit.is_danger(),
                }
            })
            .collect()
    }

    /// Checks that every active network unit still reaches the base.
    fn network_intact(
        &self,
        relocated: Option<(UnitId, TileRect)>,
        removed: Option<UnitId>,
    ) -> bool {
        let Some(base) = self.base else {
            return true;
        };
        if removed == Some(base) {
            return true;
        }

        let nodes = self.network_nodes(relocated, removed);
        for node in &nodes {
            if node.id == base || node.is_danger || node.coverage.is_empty() {
                continue;
            }
            let others: Vec<NetworkNode> = nodes
                .iter()
                .filter(|other| other.id != node.id)
                .cloned()
                .collect();
            if !connectivity::is_connected_to_base(&others, base, &node.coverage) {
                return false;
            }
        }
        true
    }

    fn validate_placement(&self, spec: &UnitSpec) -> Result<(), PlacementError> {
        let area = spec.area();

        if spec.base && self.base.is_some() {
            return Err(PlacementError::BaseAlreadyPlaced);
        }

        for tile in area.tiles() {
            if self.terrain.covering_layer(tile).is_none() {
                return Err(PlacementError::OutOfBounds);
            }
            if self.occupied.contains(&tile) {
                return Err(PlacementError::Occupied);
            }
            if self.danger_occupied.contains(&tile) {
                return Err(PlacementError::DangerZone);
            }
            if !self.terrain.flag(tile, TileFlag::Buildable) && self.landmark != Some(tile) {
                return Err(PlacementError::NotBuildable);
            }
        }

        if !spec.base {
            for tile in area.tiles() {
                if !self.valid_buildable.contains(&tile) {
                    return Err(PlacementError::OutsideNetwork);
                }
            }
        }

        Ok(())
    }

    fn validate_removal(&self, unit: UnitId) -> Result<(), RemovalError> {
        let Some(state) = self.units.get(unit) else {
            return Err(RemovalError::MissingUnit);
        };
        if self.base == Some(state.id) {
            return Err(RemovalError::IsBase);
        }

        if !self.network_intact(None, Some(unit)) {
            return Err(RemovalError::WouldDisconnectNetwork);
        }

        let mut remaining_coverage = BTreeSet::new();
        for other in self.units.iter() {
            if other.id == unit || !other.is_active() {
                continue;
            }
            remaining_coverage.extend(self.unit_coverage(other.area, other.radii.network));
        }
        let dependents: Vec<(UnitId, TileRect)> = self
            .units
            .iter()
            .filter(|other| {
                other.id != unit && other.is_active() && other.kind == UnitKind::Building
            })
            .map(|other| (other.id, other.area))
            .collect();
        if let Some(_orphan) = connectivity::orphaned_dependent(&remaining_coverage, &dependents) {
            return Err(RemovalError::WouldOrphanDependent);
        }

        Ok(())
    }

    fn validate_move(&self, state: &UnitState, destination: TileRect) -> Result<(), MoveError> {
        if state.disabled {
            return Err(MoveError::UnitDisabled);
        }
        if state.stuck {
            return Err(MoveError::UnitStuck);
        }

        let origin = state.area;
        for tile in destination.tiles() {
            if self.terrain.covering_layer(tile).is_none() {
                return Err(MoveError::OutOfBounds);
            }
        }

        match state.vehicle {
            VehicleClass::Ground => {
                let origin_elevation = self.terrain.elevation_at(origin.origin());
                let destination_elevation = self.terrain.elevation_at(destination.origin());
                if origin_elevation != destination_elevation {
                    return Err(MoveError::ElevationMismatch);
                }
                for tile in destination.tiles() {
                    // Transition tiles shared with the origin stay legal so
                    // units can turn in place.
                    if origin.contains(tile) {
                        continue;
                    }
                    if self.terrain.elevation_at(tile) != destination_elevation {
                        return Err(MoveError::ElevationMismatch);
                    }
                    if !self.terrain.flag(tile, TileFlag::Buildable)
                        || self.terrain.flag(tile, TileFlag::RoughTerrain)
                    {
                        return Err(MoveError::NotTraversable);
                    }
                    if self.occupied.contains(&tile) {
                        return Err(MoveError::Occupied);
                    }
                }
            }
            VehicleClass::Aerial => {
                for tile in destination.tiles() {
                    if origin.contains(tile) {
                        continue;
                    }
                    if self.structure_at(tile).is_some() {
                        return Err(MoveError::Occupied);
                    }
                    if self.terrain.flag(tile, TileFlag::WoodResource) {
                        return Err(MoveError::NotTraversable);
                    }
                }
            }
        }

        if state.radii.network > 0
            && Some(state.id) != self.base
            && !self.network_intact(Some((state.id, destination)), None)
        {
            return Err(MoveError::WouldDisconnectNetwork);
        }

        Ok(())
    }

    fn structure_at(&self, tile: TilePosition) -> Option<UnitId> {
        self.units
            .iter()
            .find(|unit| {
                !unit.destroying && unit.kind == UnitKind::Building && unit.area.contains(tile)
            })
            .map(|unit| unit.id)
    }

    fn destroy_unit(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        if let Some(state) = self.units.get_mut(unit) {
            state.destroying = true;
        }
        if let Some(state) = self.units.remove(unit) {
            let _ = self.waypoints.remove(&unit);
            self.recalculate_grid();
            out_events.push(Event::UnitRemoved {
                unit,
                area: state.area,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceUnit { spec } => match world.validate_placement(&spec) {
            Ok(()) => {
                let unit = world.units.insert(&spec);
                if spec.base {
                    world.base = Some(unit);
                }
                world.recalculate_grid();
                out_events.push(Event::UnitPlaced {
                    unit,
                    kind: spec.kind,
                    area: spec.area(),
                });
            }
            Err(reason) => out_events.push(Event::PlacementRejected {
                origin: spec.origin,
                reason,
            }),
        },
        Command::RemoveUnit { unit } => match world.validate_removal(unit) {
            Ok(()) => world.destroy_unit(unit, out_events),
            Err(reason) => out_events.push(Event::RemovalRejected { unit, reason }),
        },
        Command::MoveUnit { unit, destination } => {
            let Some(state) = world.units.get(unit) else {
                out_events.push(Event::MoveRejected {
                    unit,
                    reason: MoveError::MissingUnit,
                });
                return;
            };
            let from = state.area.origin();
            let target = TileRect::from_origin_and_size(destination, state.area.size());
            match world.validate_move(state, target) {
                Ok(()) => {
                    if let Some(state) = world.units.get_mut(unit) {
                        state.area = target;
                    }
                    world.recalculate_grid();

                    // Residual safety net: if the committed move somehow cut
                    // the network, re-attempt the reverse step immediately.
                    if !world.network_intact(None, None) {
                        if let Some(state) = world.units.get_mut(unit) {
                            state.area =
                                TileRect::from_origin_and_size(from, state.area.size());
                        }
                        world.recalculate_grid();
                        out_events.push(Event::MoveRejected {
                            unit,
                            reason: MoveError::WouldDisconnectNetwork,
                        });
                    } else {
                        out_events.push(Event::UnitMoved {
                            unit,
                            from,
                            to: destination,
                        });
                    }
                }
                Err(reason) => out_events.push(Event::MoveRejected { unit, reason }),
            }
        }
        Command::SetUnitEnabled { unit, enabled } => {
            if let Some(state) = world.units.get_mut(unit) {
                state.disabled = !enabled;
                world.recalculate_grid();
                out_events.push(Event::UnitEnabledChanged { unit, enabled });
            }
        }
        Command::SetUnitStuck { unit, stuck } => {
            if let Some(state) = world.units.get_mut(unit) {
                state.stuck = stuck;
                out_events.push(Event::UnitStuckChanged { unit, stuck });
            }
        }
        Command::PaintWaypoint {
            unit,
            position,
            note,
        } => {
            if world.units.get(unit).is_none() {
                return;
            }
            if world.terrain.covering_layer(position).is_none() {
                return;
            }
            let list = world.waypoints.entry(unit).or_default();
            let index = list.len() as u32 + 1;
            list.push(Waypoint::new(position, index, note));
            let count = list.len();
            out_events.push(Event::WaypointsChanged { unit, count });
        }
        Command::SetWaypoints { unit, waypoints } => {
            if world.units.get(unit).is_none() {
                return;
            }
            if waypoints
                .iter()
                .any(|waypoint| world.terrain.covering_layer(waypoint.position).is_none())
            {
                return;
            }
            let renumbered: Vec<Waypoint> = waypoints
                .into_iter()
                .enumerate()
                .map(|(offset, waypoint)| {
                    Waypoint::new(waypoint.position, offset as u32 + 1, waypoint.note)
                })
                .collect();
            let count = renumbered.len();
            let _ = world.waypoints.insert(unit, renumbered);
            out_events.push(Event::WaypointsChanged { unit, count });
        }
        Command::ClearWaypoints { unit } => {
            if world.waypoints.remove(&unit).is_some() {
                out_events.push(Event::WaypointsChanged { unit, count: 0 });
            }
        }
        Command::DrainBattery { unit, amount } => {
            let Some(state) = world.units.get_mut(unit) else {
                return;
            };
            state.battery = state.battery.drained_by(amount);
            let remaining = state.battery;
            if remaining.is_depleted() {
                out_events.push(Event::BatteryDepleted { unit });
                world.destroy_unit(unit, out_events);
            } else {
                out_events.push(Event::BatteryDrained { unit, remaining });
            }
        }
        Command::ConfigureLandmark { position } => {
            world.landmark = position;
            world.recalculate_grid();
            out_events.push(Event::LandmarkConfigured { position });
        }
        Command::RecalculateGrid => {
            world.recalculate_grid();
            out_events.push(Event::GridRecalculated);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeSet;

    use super::{TerrainSource, World};
    use rover_colony_core::{
        Battery, TilePosition, TileRect, UnitId, UnitKind, UnitRadii, VehicleClass, Waypoint,
    };

    /// Immutable representation of a single unit's state used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct UnitSnapshot {
        /// Identifier allocated to the unit by the world.
        pub id: UnitId,
        /// Category the unit belongs to.
        pub kind: UnitKind,
        /// Movement rules governing the unit.
        pub vehicle: VehicleClass,
        /// Footprint currently occupied by the unit.
        pub area: TileRect,
        /// Coverage radii owned by the unit.
        pub radii: UnitRadii,
        /// Base probability of the unit becoming stuck after a step.
        pub stuck_probability: f64,
        /// Remaining battery charge.
        pub battery: Battery,
        /// Whether the unit is excluded from the simulation.
        pub disabled: bool,
        /// Whether terrain currently pins the unit in place.
        pub stuck: bool,
    }

    fn snapshot(unit: &super::UnitState) -> UnitSnapshot {
        UnitSnapshot {
            id: unit.id,
            kind: unit.kind,
            vehicle: unit.vehicle,
            area: unit.area,
            radii: unit.radii,
            stuck_probability: unit.stuck_probability,
            battery: unit.battery,
            disabled: unit.disabled,
            stuck: unit.stuck,
        }
    }

    /// Captures a read-only view of every unit in identifier order.
    #[must_use]
    pub fn unit_view(world: &World) -> Vec<UnitSnapshot> {
        world.units.iter().map(snapshot).collect()
    }

    /// Retrieves a snapshot of the unit with the provided identifier.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        world.units.get(id).map(snapshot)
    }

    /// Identifier of the unit occupying the provided tile, if any.
    #[must_use]
    pub fn unit_at(world: &World, tile: TilePosition) -> Option<UnitId> {
        world
            .units
            .iter()
            .find(|unit| !unit.destroying && unit.area.contains(tile))
            .map(|unit| unit.id)
    }

    /// Identifier of the standing structure occupying the provided tile.
    #[must_use]
    pub fn structure_at(world: &World, tile: TilePosition) -> Option<UnitId> {
        world.structure_at(tile)
    }

    /// Identifier of the base unit rooting the colony network.
    #[must_use]
    pub fn base(world: &World) -> Option<UnitId> {
        world.base
    }

    /// Landmark tile currently counting as buildable, if designated.
    #[must_use]
    pub fn landmark(world: &World) -> Option<TilePosition> {
        world.landmark
    }

    /// Tiles physically occupied by live units.
    #[must_use]
    pub fn occupied_tiles(world: &World) -> &BTreeSet<TilePosition> {
        &world.occupied
    }

    /// Tiles accepting construction after occupancy and danger exclusion.
    #[must_use]
    pub fn valid_buildable_tiles(world: &World) -> &BTreeSet<TilePosition> {
        &world.valid_buildable
    }

    /// Tiles covered by at least one danger radius.
    #[must_use]
    pub fn danger_tiles(world: &World) -> &BTreeSet<TilePosition> {
        &world.danger_occupied
    }

    /// Tiles covered by at least one attack radius.
    #[must_use]
    pub fn attack_tiles(world: &World) -> &BTreeSet<TilePosition> {
        &world.attack
    }

    /// Resource tiles currently collected by resource radii.
    #[must_use]
    pub fn collected_resource_tiles(world: &World) -> &BTreeSet<TilePosition> {
        &world.collected_resource
    }

    /// Tiles covered by the base unit's network radius.
    #[must_use]
    pub fn base_coverage(world: &World) -> &BTreeSet<TilePosition> {
        &world.base_coverage
    }

    /// Waypoints painted for the provided unit, in execution order.
    #[must_use]
    pub fn waypoints<'world>(world: &'world World, unit: UnitId) -> &'world [Waypoint] {
        world
            .waypoints
            .get(&unit)
            .map_or(&[], |list| list.as_slice())
    }

    /// Read-only access to the terrain attribute source.
    #[must_use]
    pub fn terrain(world: &World) -> &dyn TerrainSource {
        world.terrain.as_ref()
    }
}
