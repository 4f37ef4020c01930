//! Transitive network reachability over the dynamic unit set.

use std::collections::BTreeSet;

use rover_colony_core::{TilePosition, TileRect, UnitId};

/// Connectivity view of one unit: its footprint and network coverage.
#[derive(Clone, Debug)]
pub(crate) struct NetworkNode {
    /// Identifier of the unit the node describes.
    pub(crate) id: UnitId,
    /// Tiles physically occupied by the unit.
    pub(crate) area: TileRect,
    /// Tiles covered by the unit's network radius.
    pub(crate) coverage: BTreeSet<TilePosition>,
    /// Danger units relay nothing and are skipped by the traversal.
    pub(crate) is_danger: bool,
}

/// Reports whether coverage placed at a hypothetical location reaches the base.
///
/// The traversal seeds from units directly overlapping `start_coverage` and
/// expands to any non-danger unit whose own coverage intersects a frontier
/// unit's coverage. A union-based visited set tolerates cycles; the
/// traversal stops once the base joins the set or no unit can be added.
/// Callers must exclude the unit under test from `nodes` so its old
/// position cannot vouch for its new one.
pub(crate) fn is_connected_to_base(
    nodes: &[NetworkNode],
    base: UnitId,
    start_coverage: &BTreeSet<TilePosition>,
) -> bool {
    let mut visited: BTreeSet<UnitId> = BTreeSet::new();
    let mut stack: Vec<usize> = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        if node.is_danger {
            continue;
        }
        if node.area.tiles().any(|tile| start_coverage.contains(&tile)) {
            if visited.insert(node.id) {
                stack.push(index);
            }
        }
    }

    while let Some(index) = stack.pop() {
        let current = &nodes[index];
        if current.id == base {
            return true;
        }

        for (other_index, other) in nodes.iter().enumerate() {
            if other.is_danger || visited.contains(&other.id) {
                continue;
            }
            if coverage_intersects(&current.coverage, &other.coverage) {
                let _ = visited.insert(other.id);
                stack.push(other_index);
            }
        }
    }

    visited.contains(&base)
}

/// Finds a unit whose footprint would lose all covering coverage.
///
/// `remaining_coverage` is the union of every surviving unit's network
/// footprint; a dependent is orphaned when any of its occupied tiles falls
/// outside that union.
pub(crate) fn orphaned_dependent(
    remaining_coverage: &BTreeSet<TilePosition>,
    dependents: &[(UnitId, TileRect)],
) -> Option<UnitId> {
    dependents.iter().find_map(|(id, area)| {
        area.tiles()
            .any(|tile| !remaining_coverage.contains(&tile))
            .then_some(*id)
    })
}

fn coverage_intersects(a: &BTreeSet<TilePosition>, b: &BTreeSet<TilePosition>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|tile| large.contains(tile))
}
