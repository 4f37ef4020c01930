#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Interactive path-edit tool that drags, shortens, and recursively pushes
//! painted waypoints and other tools across the grid.
//!
//! The editor keeps its own tool registry and never mutates the world
//! directly: waypoint edits leave as [`Command::SetWaypoints`] batches and
//! path gaps leave as [`ReplanRequest`] values for the caller to resolve.
//! Every push is resolved in two phases. A planning pass walks an immutable
//! snapshot of tool cells and waypoint lists, chasing chained collisions
//! depth-first in the drag direction, and records the resulting tool moves
//! and waypoint edits. An apply pass then mutates the registry and emits the
//! commands, so no collection is ever edited while it is being iterated.

use std::collections::{BTreeMap, BTreeSet};

use rover_colony_core::{Command, TilePosition, UnitId, Waypoint};
use rover_colony_world::query;
use rover_colony_world::World;

/// Identifier of an editor tool instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolId(u32);

impl ToolId {
    /// Creates a tool identifier from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw value backing the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Axis a tool's span extends along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// The tool spans tiles of increasing x.
    Horizontal,
    /// The tool spans tiles of increasing y.
    Vertical,
}

/// Lifecycle state of an editor tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RakeState {
    /// Shown in the palette, not yet on the grid.
    InDisplay,
    /// Held by the cursor, occupying no cells.
    PickedUp,
    /// Resting on the grid at its origin.
    Placed,
    /// Held down on the grid; dragging it pushes what it enters.
    Pressed,
}

/// A rectangular tool spanning a run of tiles along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rake {
    /// Identifier of the tool.
    pub id: ToolId,
    /// Axis the span extends along.
    pub orientation: Orientation,
    /// Number of tiles the tool covers.
    pub span: u32,
    /// Current lifecycle state.
    pub state: RakeState,
    /// First tile of the span while on the grid.
    pub origin: TilePosition,
}

impl Rake {
    /// Grid cells the tool currently overlaps; empty off the grid.
    #[must_use]
    pub fn cells(&self) -> Vec<TilePosition> {
        if !matches!(self.state, RakeState::Placed | RakeState::Pressed) {
            return Vec::new();
        }
        cells_of(self.origin, self.orientation, self.span)
    }
}

fn cells_of(origin: TilePosition, orientation: Orientation, span: u32) -> Vec<TilePosition> {
    (0..span as i32)
        .map(|offset| match orientation {
            Orientation::Horizontal => origin.offset_by(offset, 0),
            Orientation::Vertical => origin.offset_by(0, offset),
        })
        .collect()
}

/// Asks the caller to recompute a path segment left open by a deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplanRequest {
    /// Unit whose waypoint list carries the gap.
    pub unit: UnitId,
    /// Where the recomputed segment starts.
    pub anchor: ReplanAnchor,
    /// Tile the recomputed segment must reach.
    pub target: TilePosition,
}

/// Starting point of a requested replan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplanAnchor {
    /// Start from a surviving waypoint tile.
    Waypoint(TilePosition),
    /// Start from wherever the unit currently stands.
    LiveUnitPosition,
}

/// Reasons an editor operation could not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolError {
    /// The tool identifier is unknown to the editor.
    UnknownTool,
    /// The operation requires the tool to be in a different state.
    WrongState,
}

enum WaypointEdit {
    SlideLast {
        unit: UnitId,
        from: TilePosition,
        to: TilePosition,
    },
    TruncateAt {
        unit: UnitId,
        position: TilePosition,
    },
    DeleteMiddle {
        unit: UnitId,
        position: TilePosition,
    },
    DeleteFirst {
        unit: UnitId,
    },
}

impl WaypointEdit {
    fn unit(&self) -> UnitId {
        match self {
            WaypointEdit::SlideLast { unit, .. }
            | WaypointEdit::TruncateAt { unit, .. }
            | WaypointEdit::DeleteMiddle { unit, .. }
            | WaypointEdit::DeleteFirst { unit } => *unit,
        }
    }
}

struct PushPlan {
    tool_moves: Vec<(ToolId, TilePosition)>,
    waypoint_edits: Vec<WaypointEdit>,
}

/// Immutable view of everything a push can collide with.
struct Snapshot {
    tool_cells: BTreeMap<TilePosition, ToolId>,
    waypoints: BTreeMap<UnitId, Vec<Waypoint>>,
}

impl Snapshot {
    fn capture(editor: &PathEditor, world: &World, dragged: ToolId) -> Self {
        let mut tool_cells = BTreeMap::new();
        for tool in editor.tools.values() {
            if tool.id == dragged {
                continue;
            }
            for cell in tool.cells() {
                let _ = tool_cells.insert(cell, tool.id);
            }
        }
        let mut waypoints = BTreeMap::new();
        for unit in query::unit_view(world) {
            let list = query::waypoints(world, unit.id);
            if !list.is_empty() {
                let _ = waypoints.insert(unit.id, list.to_vec());
            }
        }
        Self {
            tool_cells,
            waypoints,
        }
    }

    fn waypoint_at(&self, cell: TilePosition) -> Option<(UnitId, usize, usize)> {
        for (unit, list) in &self.waypoints {
            if let Some(index) = list.iter().position(|waypoint| waypoint.position == cell) {
                return Some((*unit, index, list.len()));
            }
        }
        None
    }

    fn on_path(&self, unit: UnitId, cell: TilePosition) -> bool {
        self.waypoints
            .get(&unit)
            .is_some_and(|list| list.iter().any(|waypoint| waypoint.position == cell))
    }
}

/// Registry of editor tools plus the push resolution logic.
#[derive(Debug, Default)]
pub struct PathEditor {
    tools: BTreeMap<ToolId, Rake>,
    next_tool_id: u32,
}

impl PathEditor {
    /// Creates an editor with no tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool to the palette and returns its identifier.
    pub fn spawn_tool(&mut self, orientation: Orientation, span: u32) -> ToolId {
        let id = ToolId::new(self.next_tool_id);
        self.next_tool_id += 1;
        let _ = self.tools.insert(
            id,
            Rake {
                id,
                orientation,
                span: span.max(1),
                state: RakeState::InDisplay,
                origin: TilePosition::new(0, 0),
            },
        );
        id
    }

    /// Current state of the identified tool.
    #[must_use]
    pub fn tool(&self, id: ToolId) -> Option<&Rake> {
        self.tools.get(&id)
    }

    /// Lifts the tool off the grid or out of the palette.
    pub fn pick_up(&mut self, id: ToolId) -> Result<(), ToolError> {
        let tool = self.tools.get_mut(&id).ok_or(ToolError::UnknownTool)?;
        tool.state = RakeState::PickedUp;
        Ok(())
    }

    /// Sets a picked-up tool down at the provided origin.
    pub fn place(&mut self, id: ToolId, origin: TilePosition) -> Result<(), ToolError> {
        let tool = self.tools.get_mut(&id).ok_or(ToolError::UnknownTool)?;
        if tool.state != RakeState::PickedUp {
            return Err(ToolError::WrongState);
        }
        tool.origin = origin;
        tool.state = RakeState::Placed;
        Ok(())
    }

    /// Presses a placed tool so dragging it pushes what it enters.
    pub fn press(&mut self, id: ToolId) -> Result<(), ToolError> {
        let tool = self.tools.get_mut(&id).ok_or(ToolError::UnknownTool)?;
        if tool.state != RakeState::Placed {
            return Err(ToolError::WrongState);
        }
        tool.state = RakeState::Pressed;
        Ok(())
    }

    /// Releases a pressed tool back to resting on the grid.
    pub fn release(&mut self, id: ToolId) -> Result<(), ToolError> {
        let tool = self.tools.get_mut(&id).ok_or(ToolError::UnknownTool)?;
        if tool.state != RakeState::Pressed {
            return Err(ToolError::WrongState);
        }
        tool.state = RakeState::Placed;
        Ok(())
    }

    /// Drags a pressed tool to a new origin, pushing whatever it enters.
    ///
    /// Newly entered cells are resolved in grid order against a snapshot
    /// taken before any mutation. Chained tool collisions are pushed one
    /// tile further in the drag direction, depth-first, before the waypoints
    /// beneath them are considered. Returns the replan requests produced by
    /// deleted waypoints; waypoint list replacements are emitted on `out`.
    pub fn drag(
        &mut self,
        world: &World,
        id: ToolId,
        to_origin: TilePosition,
        out: &mut Vec<Command>,
    ) -> Result<Vec<ReplanRequest>, ToolError> {
        let tool = *self.tools.get(&id).ok_or(ToolError::UnknownTool)?;
        if tool.state != RakeState::Pressed {
            return Err(ToolError::WrongState);
        }
        if to_origin == tool.origin {
            return Ok(Vec::new());
        }

        let direction = drag_direction(tool.origin, to_origin);
        let old_cells: BTreeSet<TilePosition> = tool.cells().into_iter().collect();
        let footprint: BTreeSet<TilePosition> = cells_of(to_origin, tool.orientation, tool.span)
            .into_iter()
            .collect();
        let entered: Vec<TilePosition> = footprint
            .iter()
            .copied()
            .filter(|cell| !old_cells.contains(cell))
            .collect();

        let snapshot = Snapshot::capture(self, world, id);
        let mut plan = PushPlan {
            tool_moves: Vec::new(),
            waypoint_edits: Vec::new(),
        };
        let mut pushed_tools = BTreeSet::new();
        for cell in entered {
            self.plan_cell(&snapshot, cell, direction, &footprint, &mut pushed_tools, &mut plan);
        }

        self.apply_plan(world, id, to_origin, plan, out)
    }

    /// Planning pass for one entered cell. Tools are chased before the
    /// waypoint beneath them so a cascade settles its occupancy first.
    fn plan_cell(
        &self,
        snapshot: &Snapshot,
        cell: TilePosition,
        direction: (i32, i32),
        footprint: &BTreeSet<TilePosition>,
        pushed_tools: &mut BTreeSet<ToolId>,
        plan: &mut PushPlan,
    ) {
        if let Some(occupant) = snapshot.tool_cells.get(&cell).copied() {
            if pushed_tools.insert(occupant) {
                self.plan_tool_push(snapshot, occupant, direction, pushed_tools, plan);
            }
        }
        if let Some((unit, index, len)) = snapshot.waypoint_at(cell) {
            plan.waypoint_edits.push(plan_waypoint_edit(
                snapshot, unit, index, len, cell, direction, footprint,
            ));
        }
    }

    fn plan_tool_push(
        &self,
        snapshot: &Snapshot,
        id: ToolId,
        direction: (i32, i32),
        pushed_tools: &mut BTreeSet<ToolId>,
        plan: &mut PushPlan,
    ) {
        let Some(tool) = self.tools.get(&id) else {
            return;
        };
        let new_origin = tool.origin.offset_by(direction.0, direction.1);
        let old_cells: BTreeSet<TilePosition> = tool.cells().into_iter().collect();
        let footprint: BTreeSet<TilePosition> = cells_of(new_origin, tool.orientation, tool.span)
            .into_iter()
            .collect();
        plan.tool_moves.push((id, new_origin));
        for cell in footprint.iter().copied() {
            if old_cells.contains(&cell) {
                continue;
            }
            self.plan_cell(snapshot, cell, direction, &footprint, pushed_tools, plan);
        }
    }

    fn apply_plan(
        &mut self,
        world: &World,
        dragged: ToolId,
        to_origin: TilePosition,
        plan: PushPlan,
        out: &mut Vec<Command>,
    ) -> Result<Vec<ReplanRequest>, ToolError> {
        for (id, new_origin) in plan.tool_moves {
            if let Some(tool) = self.tools.get_mut(&id) {
                tool.origin = new_origin;
            }
        }
        if let Some(tool) = self.tools.get_mut(&dragged) {
            tool.origin = to_origin;
        }

        // Edits to the same list compose, so each unit's list is copied
        // once and every edit runs against the working copy.
        let mut lists: BTreeMap<UnitId, Vec<Waypoint>> = BTreeMap::new();
        for edit in &plan.waypoint_edits {
            let unit = edit.unit();
            let _ = lists
                .entry(unit)
                .or_insert_with(|| query::waypoints(world, unit).to_vec());
        }

        let mut requests = Vec::new();
        for edit in plan.waypoint_edits {
            let unit = edit.unit();
            if let Some(list) = lists.get_mut(&unit) {
                apply_waypoint_edit(list, edit, &mut requests);
            }
        }
        for (unit, list) in lists {
            emit_waypoints(unit, list, out);
        }
        Ok(requests)
    }
}

/// Unit direction the drag moves along; the dominant axis wins ties toward x.
fn drag_direction(from: TilePosition, to: TilePosition) -> (i32, i32) {
    let dx = to.x() - from.x();
    let dy = to.y() - from.y();
    if dx.abs() >= dy.abs() {
        (dx.signum(), 0)
    } else {
        (0, dy.signum())
    }
}

fn plan_waypoint_edit(
    snapshot: &Snapshot,
    unit: UnitId,
    index: usize,
    len: usize,
    cell: TilePosition,
    direction: (i32, i32),
    footprint: &BTreeSet<TilePosition>,
) -> WaypointEdit {
    if index + 1 == len {
        // The waypoint lands on the first free tile past the tool's new
        // footprint, which can be further than one tile for a wide tool.
        let mut to = cell.offset_by(direction.0, direction.1);
        while footprint.contains(&to) {
            to = to.offset_by(direction.0, direction.1);
        }
        if snapshot.on_path(unit, to) {
            WaypointEdit::TruncateAt { unit, position: to }
        } else {
            WaypointEdit::SlideLast {
                unit,
                from: cell,
                to,
            }
        }
    } else if index == 0 {
        WaypointEdit::DeleteFirst { unit }
    } else {
        WaypointEdit::DeleteMiddle {
            unit,
            position: cell,
        }
    }
}

fn apply_waypoint_edit(
    list: &mut Vec<Waypoint>,
    edit: WaypointEdit,
    requests: &mut Vec<ReplanRequest>,
) {
    match edit {
        WaypointEdit::SlideLast { from, to, .. } => {
            let Some(index) = list.iter().position(|waypoint| waypoint.position == from) else {
                return;
            };
            if index + 1 != list.len() {
                return;
            }
            // A push always moves one tile; a longer jump keeps a stand-in
            // at the old tile so the path still passes through it.
            if from.manhattan_distance(to) > 1 {
                let note = list[index].note.clone();
                list.push(Waypoint::new(to, 0, note));
            } else {
                list[index].position = to;
            }
        }
        WaypointEdit::TruncateAt { position, .. } => {
            if let Some(keep) = list
                .iter()
                .position(|waypoint| waypoint.position == position)
            {
                list.truncate(keep + 1);
            }
        }
        WaypointEdit::DeleteMiddle { unit, position } => {
            let Some(index) = list
                .iter()
                .position(|waypoint| waypoint.position == position)
            else {
                return;
            };
            let _ = list.remove(index);
            let anchor = index
                .checked_sub(1)
                .and_then(|slot| list.get(slot))
                .map(|waypoint| waypoint.position);
            let target = list.get(index).map(|waypoint| waypoint.position);
            match (anchor, target) {
                (Some(anchor), Some(target)) => requests.push(ReplanRequest {
                    unit,
                    anchor: ReplanAnchor::Waypoint(anchor),
                    target,
                }),
                (None, Some(target)) => requests.push(ReplanRequest {
                    unit,
                    anchor: ReplanAnchor::LiveUnitPosition,
                    target,
                }),
                _ => {}
            }
        }
        WaypointEdit::DeleteFirst { unit } => {
            if list.is_empty() {
                return;
            }
            let _ = list.remove(0);
            if let Some(target) = list.first().map(|waypoint| waypoint.position) {
                requests.push(ReplanRequest {
                    unit,
                    anchor: ReplanAnchor::LiveUnitPosition,
                    target,
                });
            }
        }
    }
}

/// Renumbers contiguously from one and emits the replacement list.
fn emit_waypoints(unit: UnitId, list: Vec<Waypoint>, out: &mut Vec<Command>) {
    let waypoints = list
        .into_iter()
        .enumerate()
        .map(|(slot, waypoint)| Waypoint::new(waypoint.position, slot as u32 + 1, waypoint.note))
        .collect();
    out.push(Command::SetWaypoints { unit, waypoints });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_colony_core::{
        Battery, ElevationLayer, Event, LayerId, TileFlag, TileRect, TileRectSize, UnitKind,
        UnitRadii, UnitSpec, VehicleClass,
    };
    use rover_colony_world::terrain::MapTerrain;
    use rover_colony_world::{apply, World};

    const GROUND: LayerId = LayerId::new(0);

    fn flat_world() -> World {
        let mut terrain = MapTerrain::new();
        terrain.assign_layer(GROUND, ElevationLayer::new(0));
        terrain.fill(
            TileRect::from_origin_and_size(TilePosition::new(0, 0), TileRectSize::new(16, 16)),
            GROUND,
            &[TileFlag::Buildable],
        );
        World::new(Box::new(terrain))
    }

    fn place_robot(world: &mut World, origin: TilePosition) -> UnitId {
        let mut events = Vec::new();
        apply(
            world,
            Command::PlaceUnit {
                spec: UnitSpec {
                    kind: UnitKind::Building,
                    vehicle: VehicleClass::Ground,
                    origin: TilePosition::new(0, 0),
                    size: TileRectSize::new(1, 1),
                    radii: UnitRadii::network_only(14),
                    stuck_probability: 0.0,
                    battery: Battery::new(100),
                    base: true,
                },
            },
            &mut events,
        );
        events.clear();
        apply(
            world,
            Command::PlaceUnit {
                spec: UnitSpec {
                    kind: UnitKind::Robot,
                    vehicle: VehicleClass::Ground,
                    origin,
                    size: TileRectSize::new(1, 1),
                    radii: UnitRadii::zero(),
                    stuck_probability: 0.0,
                    battery: Battery::new(100),
                    base: false,
                },
            },
            &mut events,
        );
        match events.first() {
            Some(Event::UnitPlaced { unit, .. }) => *unit,
            other => panic!("robot placement failed: {other:?}"),
        }
    }

    fn set_path(world: &mut World, unit: UnitId, tiles: &[TilePosition]) {
        let waypoints = tiles
            .iter()
            .enumerate()
            .map(|(slot, tile)| Waypoint::new(*tile, slot as u32 + 1, "path"))
            .collect();
        let mut events = Vec::new();
        apply(world, Command::SetWaypoints { unit, waypoints }, &mut events);
        assert!(
            matches!(events.first(), Some(Event::WaypointsChanged { .. })),
            "path rejected: {events:?}"
        );
    }

    fn run(world: &mut World, commands: Vec<Command>) {
        let mut events = Vec::new();
        for command in commands {
            apply(world, command, &mut events);
        }
    }

    fn pressed_tool(editor: &mut PathEditor, origin: TilePosition) -> ToolId {
        let id = editor.spawn_tool(Orientation::Horizontal, 1);
        editor.pick_up(id).expect("pick up");
        editor.place(id, origin).expect("place");
        editor.press(id).expect("press");
        id
    }

    #[test]
    fn lifecycle_enforces_state_order() {
        let mut editor = PathEditor::new();
        let id = editor.spawn_tool(Orientation::Vertical, 3);
        assert_eq!(editor.tool(id).map(|tool| tool.state), Some(RakeState::InDisplay));
        assert_eq!(editor.press(id), Err(ToolError::WrongState));
        editor.pick_up(id).expect("pick up");
        assert!(editor.tool(id).map_or(false, |tool| tool.cells().is_empty()));
        editor.place(id, TilePosition::new(2, 2)).expect("place");
        assert_eq!(
            editor.tool(id).map(|tool| tool.cells()),
            Some(vec![
                TilePosition::new(2, 2),
                TilePosition::new(2, 3),
                TilePosition::new(2, 4),
            ])
        );
    }

    #[test]
    fn dragging_the_last_waypoint_slides_it_one_tile() {
        let mut world = flat_world();
        let robot = place_robot(&mut world, TilePosition::new(4, 8));
        set_path(
            &mut world,
            robot,
            &[
                TilePosition::new(5, 8),
                TilePosition::new(6, 8),
                TilePosition::new(7, 8),
            ],
        );

        let mut editor = PathEditor::new();
        let rake = pressed_tool(&mut editor, TilePosition::new(6, 8));
        let mut commands = Vec::new();
        let requests = editor
            .drag(&world, rake, TilePosition::new(7, 8), &mut commands)
            .expect("drag");
        assert!(requests.is_empty());
        run(&mut world, commands);

        let waypoints = query::waypoints(&world, robot);
        assert_eq!(waypoints.len(), 3);
        assert_eq!(waypoints[2].position, TilePosition::new(8, 8));
        let indices: Vec<u32> = waypoints.iter().map(|waypoint| waypoint.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn pushing_the_last_waypoint_onto_the_path_truncates() {
        let mut world = flat_world();
        let robot = place_robot(&mut world, TilePosition::new(4, 8));
        // The path doubles back so pushing the tail west lands on itself.
        set_path(
            &mut world,
            robot,
            &[
                TilePosition::new(5, 8),
                TilePosition::new(6, 8),
                TilePosition::new(7, 8),
            ],
        );

        let mut editor = PathEditor::new();
        let rake = pressed_tool(&mut editor, TilePosition::new(8, 8));
        let mut commands = Vec::new();
        let requests = editor
            .drag(&world, rake, TilePosition::new(7, 8), &mut commands)
            .expect("drag");
        assert!(requests.is_empty());
        run(&mut world, commands);

        let waypoints = query::waypoints(&world, robot);
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[1].position, TilePosition::new(6, 8));
        assert_eq!(waypoints[1].index, 2);
    }

    #[test]
    fn deleting_a_middle_waypoint_requests_a_gap_replan() {
        let mut world = flat_world();
        let robot = place_robot(&mut world, TilePosition::new(4, 8));
        set_path(
            &mut world,
            robot,
            &[
                TilePosition::new(5, 8),
                TilePosition::new(6, 8),
                TilePosition::new(7, 8),
            ],
        );

        let mut editor = PathEditor::new();
        let rake = pressed_tool(&mut editor, TilePosition::new(6, 9));
        let mut commands = Vec::new();
        let requests = editor
            .drag(&world, rake, TilePosition::new(6, 8), &mut commands)
            .expect("drag");
        run(&mut world, commands);

        assert_eq!(
            requests,
            vec![ReplanRequest {
                unit: robot,
                anchor: ReplanAnchor::Waypoint(TilePosition::new(5, 8)),
                target: TilePosition::new(7, 8),
            }]
        );
        let waypoints = query::waypoints(&world, robot);
        assert_eq!(waypoints.len(), 2);
        let indices: Vec<u32> = waypoints.iter().map(|waypoint| waypoint.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn deleting_the_first_waypoint_anchors_at_the_unit() {
        let mut world = flat_world();
        let robot = place_robot(&mut world, TilePosition::new(4, 8));
        set_path(
            &mut world,
            robot,
            &[
                TilePosition::new(5, 8),
                TilePosition::new(6, 8),
                TilePosition::new(7, 8),
            ],
        );

        let mut editor = PathEditor::new();
        let rake = pressed_tool(&mut editor, TilePosition::new(5, 7));
        let mut commands = Vec::new();
        let requests = editor
            .drag(&world, rake, TilePosition::new(5, 8), &mut commands)
            .expect("drag");
        run(&mut world, commands);

        assert_eq!(
            requests,
            vec![ReplanRequest {
                unit: robot,
                anchor: ReplanAnchor::LiveUnitPosition,
                target: TilePosition::new(6, 8),
            }]
        );
        assert_eq!(query::waypoints(&world, robot).len(), 2);
    }

    #[test]
    fn push_round_trip_restores_tool_occupancy() {
        let world = flat_world();
        let mut editor = PathEditor::new();
        let pushed = editor.spawn_tool(Orientation::Horizontal, 1);
        editor.pick_up(pushed).expect("pick up");
        editor.place(pushed, TilePosition::new(5, 5)).expect("place");

        let rake = pressed_tool(&mut editor, TilePosition::new(4, 5));
        let mut commands = Vec::new();
        let _ = editor
            .drag(&world, rake, TilePosition::new(5, 5), &mut commands)
            .expect("push east");
        assert_eq!(
            editor.tool(pushed).map(|tool| tool.origin),
            Some(TilePosition::new(6, 5))
        );

        editor.release(rake).expect("release");
        editor.pick_up(rake).expect("pick up");
        editor.place(rake, TilePosition::new(7, 5)).expect("place");
        editor.press(rake).expect("press");
        let _ = editor
            .drag(&world, rake, TilePosition::new(6, 5), &mut commands)
            .expect("push west");
        assert_eq!(
            editor.tool(pushed).map(|tool| tool.origin),
            Some(TilePosition::new(5, 5))
        );
    }

    #[test]
    fn chained_tools_cascade_before_waypoints() {
        let mut world = flat_world();
        let robot = place_robot(&mut world, TilePosition::new(4, 8));
        set_path(
            &mut world,
            robot,
            &[TilePosition::new(6, 5), TilePosition::new(7, 5)],
        );

        let mut editor = PathEditor::new();
        let first = editor.spawn_tool(Orientation::Horizontal, 1);
        editor.pick_up(first).expect("pick up");
        editor.place(first, TilePosition::new(5, 5)).expect("place");
        let second = editor.spawn_tool(Orientation::Horizontal, 1);
        editor.pick_up(second).expect("pick up");
        editor.place(second, TilePosition::new(6, 5)).expect("place");

        let rake = pressed_tool(&mut editor, TilePosition::new(4, 5));
        let mut commands = Vec::new();
        let requests = editor
            .drag(&world, rake, TilePosition::new(5, 5), &mut commands)
            .expect("drag");
        run(&mut world, commands);

        // Both tools shunt east one tile; the displaced tools then resolve
        // the waypoints beneath their new cells, so the tail slides east
        // and the first waypoint is deleted with a live-position replan.
        assert_eq!(
            editor.tool(first).map(|tool| tool.origin),
            Some(TilePosition::new(6, 5))
        );
        assert_eq!(
            editor.tool(second).map(|tool| tool.origin),
            Some(TilePosition::new(7, 5))
        );
        assert_eq!(
            requests,
            vec![ReplanRequest {
                unit: robot,
                anchor: ReplanAnchor::LiveUnitPosition,
                target: TilePosition::new(8, 5),
            }]
        );
        let waypoints = query::waypoints(&world, robot);
        assert_eq!(waypoints.len(), 1);
        assert_eq!(waypoints[0].position, TilePosition::new(8, 5));
        assert_eq!(waypoints[0].index, 1);
    }

    #[test]
    fn dragging_an_unpressed_tool_is_rejected() {
        let world = flat_world();
        let mut editor = PathEditor::new();
        let id = editor.spawn_tool(Orientation::Horizontal, 1);
        editor.pick_up(id).expect("pick up");
        editor.place(id, TilePosition::new(3, 3)).expect("place");
        let mut commands = Vec::new();
        assert_eq!(
            editor.drag(&world, id, TilePosition::new(4, 3), &mut commands),
            Err(ToolError::WrongState)
        );
        assert!(commands.is_empty());
    }
}
