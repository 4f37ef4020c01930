//! Authoritative unit state management utilities.

use std::collections::BTreeMap;

use rover_colony_core::{Battery, TileRect, UnitId, UnitKind, UnitRadii, UnitSpec, VehicleClass};

/// State of a unit stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct UnitState {
    /// Identifier allocated by the world for the unit.
    pub(crate) id: UnitId,
    /// Category the unit belongs to.
    pub(crate) kind: UnitKind,
    /// Movement rules governing the unit.
    pub(crate) vehicle: VehicleClass,
    /// Footprint currently occupied by the unit.
    pub(crate) area: TileRect,
    /// Coverage radii owned by the unit.
    pub(crate) radii: UnitRadii,
    /// Base probability of the unit becoming stuck after a step.
    pub(crate) stuck_probability: f64,
    /// Remaining battery charge.
    pub(crate) battery: Battery,
    /// Whether the unit is excluded from the simulation.
    pub(crate) disabled: bool,
    /// Whether the unit is being torn down and must be ignored.
    pub(crate) destroying: bool,
    /// Whether terrain currently pins the unit in place.
    pub(crate) stuck: bool,
}

impl UnitState {
    fn from_spec(id: UnitId, spec: &UnitSpec) -> Self {
        Self {
            id,
            kind: spec.kind,
            vehicle: spec.vehicle,
            area: spec.area(),
            radii: spec.radii,
            stuck_probability: spec.stuck_probability,
            battery: spec.battery,
            disabled: false,
            destroying: false,
            stuck: false,
        }
    }

    /// Whether the unit participates in coverage and connectivity.
    pub(crate) fn is_active(&self) -> bool {
        !self.disabled && !self.destroying
    }

    /// Whether the unit projects a danger zone.
    pub(crate) fn is_danger(&self) -> bool {
        self.radii.danger > 0
    }
}

/// Registry that stores units and manages identifier allocation.
#[derive(Debug, Default)]
pub(crate) struct UnitRegistry {
    entries: BTreeMap<UnitId, UnitState>,
    next_unit_id: u32,
}

impl UnitRegistry {
    /// Creates an empty unit registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_unit_id: 0,
        }
    }

    /// Inserts a unit built from the provided spec, allocating its identifier.
    pub(crate) fn insert(&mut self, spec: &UnitSpec) -> UnitId {
        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        let _ = self.entries.insert(id, UnitState::from_spec(id, spec));
        id
    }

    /// Removes and returns the unit with the provided identifier.
    pub(crate) fn remove(&mut self, id: UnitId) -> Option<UnitState> {
        self.entries.remove(&id)
    }

    /// Retrieves the unit with the provided identifier.
    pub(crate) fn get(&self, id: UnitId) -> Option<&UnitState> {
        self.entries.get(&id)
    }

    /// Retrieves a mutable reference to the unit with the provided identifier.
    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitState> {
        self.entries.get_mut(&id)
    }

    /// Iterates over every stored unit in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &UnitState> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_colony_core::{TilePosition, TileRectSize};

    fn robot_spec(origin: TilePosition) -> UnitSpec {
        UnitSpec {
            kind: UnitKind::Robot,
            vehicle: VehicleClass::Ground,
            origin,
            size: TileRectSize::new(1, 1),
            radii: UnitRadii::network_only(2),
            stuck_probability: 0.0,
            battery: Battery::new(10),
            base: false,
        }
    }

    #[test]
    fn registry_allocates_sequential_identifiers() {
        let mut registry = UnitRegistry::new();
        let first = registry.insert(&robot_spec(TilePosition::new(0, 0)));
        let second = registry.insert(&robot_spec(TilePosition::new(1, 0)));
        assert_eq!(first, UnitId::new(0));
        assert_eq!(second, UnitId::new(1));
        assert_eq!(registry.entries.len(), 2);
    }

    #[test]
    fn removal_does_not_recycle_identifiers() {
        let mut registry = UnitRegistry::new();
        let first = registry.insert(&robot_spec(TilePosition::new(0, 0)));
        assert!(registry.remove(first).is_some());
        let second = registry.insert(&robot_spec(TilePosition::new(1, 0)));
        assert_eq!(second, UnitId::new(1));
        assert!(registry.get(first).is_none());
    }

    #[test]
    fn disabled_units_are_inactive() {
        let mut registry = UnitRegistry::new();
        let id = registry.insert(&robot_spec(TilePosition::new(0, 0)));
        assert!(registry.get(id).expect("unit exists").is_active());
        registry.get_mut(id).expect("unit exists").disabled = true;
        assert!(!registry.get(id).expect("unit exists").is_active());
    }
}
