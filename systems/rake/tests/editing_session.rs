use rover_colony_core::{
    Battery, Command, ElevationLayer, Event, LayerId, TileFlag, TilePosition, TileRect,
    TileRectSize, UnitId, UnitKind, UnitRadii, UnitSpec, VehicleClass, Waypoint,
};
use rover_colony_system_rake::{Orientation, PathEditor, RakeState, ReplanAnchor};
use rover_colony_world::terrain::MapTerrain;
use rover_colony_world::{apply, query, World};

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

fn commit(world: &mut World, commands: &mut Vec<Command>) {
    let mut events = Vec::new();
    for command in commands.drain(..) {
        apply(world, command, &mut events);
    }
}

fn positions(world: &World, unit: UnitId) -> Vec<TilePosition> {
    query::waypoints(world, unit)
        .iter()
        .map(|waypoint| waypoint.position)
        .collect()
}

/// Walks a rake along a path over several drags with world commits in
/// between, consuming waypoints from the head and finally sliding the tail.
#[test]
fn a_full_session_erodes_the_path_head_and_slides_the_tail() {
    let mut world = flat_world();
    let robot = place_robot(&mut world, TilePosition::new(1, 8));
    set_path(
        &mut world,
        robot,
        &[
            TilePosition::new(4, 8),
            TilePosition::new(7, 8),
            TilePosition::new(10, 8),
        ],
    );

    let mut editor = PathEditor::new();
    let rake = editor.spawn_tool(Orientation::Vertical, 3);
    editor.pick_up(rake).expect("pick up");
    editor.place(rake, TilePosition::new(3, 7)).expect("place");
    editor.press(rake).expect("press");

    let mut commands = Vec::new();

    // Entering the first waypoint drops it and re-anchors at the unit.
    let requests = editor
        .drag(&world, rake, TilePosition::new(4, 7), &mut commands)
        .expect("first drag");
    commit(&mut world, &mut commands);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].anchor, ReplanAnchor::LiveUnitPosition);
    assert_eq!(requests[0].target, TilePosition::new(7, 8));
    assert_eq!(
        positions(&world, robot),
        vec![TilePosition::new(7, 8), TilePosition::new(10, 8)]
    );

    // A long jump over empty tiles only consumes the waypoint it lands on.
    let requests = editor
        .drag(&world, rake, TilePosition::new(7, 7), &mut commands)
        .expect("second drag");
    commit(&mut world, &mut commands);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, TilePosition::new(10, 8));
    assert_eq!(positions(&world, robot), vec![TilePosition::new(10, 8)]);

    // Crossing empty ground edits nothing.
    let requests = editor
        .drag(&world, rake, TilePosition::new(9, 7), &mut commands)
        .expect("third drag");
    assert!(requests.is_empty());
    assert!(commands.is_empty());

    // The sole surviving waypoint is also the tail, so it slides.
    let requests = editor
        .drag(&world, rake, TilePosition::new(10, 7), &mut commands)
        .expect("fourth drag");
    commit(&mut world, &mut commands);
    assert!(requests.is_empty());
    let waypoints = query::waypoints(&world, robot);
    assert_eq!(waypoints.len(), 1);
    assert_eq!(waypoints[0].position, TilePosition::new(11, 8));
    assert_eq!(waypoints[0].index, 1);

    editor.release(rake).expect("release");
    assert_eq!(
        editor.tool(rake).map(|tool| tool.state),
        Some(RakeState::Placed)
    );
    assert_eq!(
        editor.tool(rake).map(|tool| tool.origin),
        Some(TilePosition::new(10, 7))
    );
}

/// A wide rake that swallows the tail waypoint pushes it past its far edge
/// and leaves a stand-in behind so the path still visits the old tile.
#[test]
fn a_wide_rake_splices_a_stand_in_behind_a_long_push() {
    let mut world = flat_world();
    let robot = place_robot(&mut world, TilePosition::new(1, 4));
    set_path(
        &mut world,
        robot,
        &[TilePosition::new(4, 4), TilePosition::new(8, 4)],
    );

    let mut editor = PathEditor::new();
    let rake = editor.spawn_tool(Orientation::Horizontal, 3);
    editor.pick_up(rake).expect("pick up");
    editor.place(rake, TilePosition::new(5, 4)).expect("place");
    editor.press(rake).expect("press");

    let mut commands = Vec::new();
    let requests = editor
        .drag(&world, rake, TilePosition::new(7, 4), &mut commands)
        .expect("drag");
    commit(&mut world, &mut commands);

    assert!(requests.is_empty());
    assert_eq!(
        positions(&world, robot),
        vec![
            TilePosition::new(4, 4),
            TilePosition::new(8, 4),
            TilePosition::new(10, 4),
        ]
    );
    let indices: Vec<u32> = query::waypoints(&world, robot)
        .iter()
        .map(|waypoint| waypoint.index)
        .collect();
    assert_eq!(indices, vec![1, 2, 3]);
}
