#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a small rover colony scenario.
//!
//! Builds a map with a river and a mud bank, places the base and a scout
//! robot, walks a planned route through the movement orchestrator, and
//! prints the tile-set and traversal summaries.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Parser;

use rover_colony_core::{
    Battery, Command, ElevationLayer, Event, LayerId, TileFlag, TilePosition, TileRect,
    TileRectSize, UnitId, UnitKind, UnitRadii, UnitSpec, VehicleClass,
};
use rover_colony_planning::PlanSnapshot;
use rover_colony_system_movement::{
    Config, MoveState, Orchestrator, TravelOptions,
};
use rover_colony_system_pathfinding::{plan_route, WorldTiles};
use rover_colony_world::query;
use rover_colony_world::terrain::MapTerrain;
use rover_colony_world::{apply, World};

const GROUND: LayerId = LayerId::new(0);
const STEP_INTERVAL: Duration = Duration::from_millis(100);

/// Options controlling the scenario grid and traversal.
#[derive(Debug, Parser)]
#[command(name = "rover-colony", about = "Runs a rover colony traversal scenario")]
struct Args {
    /// Number of tile columns in the map.
    #[arg(long, default_value_t = 24)]
    columns: u32,
    /// Number of tile rows in the map.
    #[arg(long, default_value_t = 16)]
    rows: u32,
    /// Seed for the deterministic stuck-roll generator.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Maximum number of scheduler ticks to spend on the journey.
    #[arg(long, default_value_t = 256)]
    step_budget: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.columns < 12 || args.rows < 8 {
        bail!("the scenario needs a grid of at least 12x8 tiles");
    }

    let mut world = build_world(&args);
    let base = place_unit(&mut world, base_spec(&args))?;
    let scout = place_unit(&mut world, scout_spec())?;

    println!("colony map {}x{}", args.columns, args.rows);
    println!("  base unit        #{}", base.get());
    println!("  scout unit       #{}", scout.get());
    print_tile_sets(&world);

    let target = TilePosition::new(args.columns as i32 - 3, 4);
    describe_route(&world, scout, target)?;
    run_journey(&mut world, scout, target, &args)?;

    let snapshot = PlanSnapshot::capture(&world, scout)
        .ok_or_else(|| anyhow!("scout disappeared before the snapshot"))?;
    println!(
        "planning snapshot ({} context tiles): {}",
        snapshot.context.len(),
        snapshot.encode()?
    );
    Ok(())
}

/// Buildable plain with a vertical river and a mud bank on its near shore.
fn build_world(args: &Args) -> World {
    let mut terrain = MapTerrain::new();
    terrain.assign_layer(GROUND, ElevationLayer::new(0));
    terrain.fill(
        TileRect::from_origin_and_size(
            TilePosition::new(0, 0),
            TileRectSize::new(args.columns, args.rows),
        ),
        GROUND,
        &[TileFlag::Buildable],
    );

    let river_x = args.columns as i32 / 2;
    for y in 0..args.rows as i32 {
        terrain.set_flag(TilePosition::new(river_x, y), TileFlag::Water, true);
        terrain.set_flag(TilePosition::new(river_x - 1, y), TileFlag::Mud, true);
    }
    World::new(Box::new(terrain))
}

fn base_spec(args: &Args) -> UnitSpec {
    UnitSpec {
        kind: UnitKind::Building,
        vehicle: VehicleClass::Ground,
        origin: TilePosition::new(2, 2),
        size: TileRectSize::new(2, 2),
        radii: UnitRadii::network_only(args.columns.max(args.rows)),
        stuck_probability: 0.0,
        battery: Battery::new(1_000),
        base: true,
    }
}

fn scout_spec() -> UnitSpec {
    UnitSpec {
        kind: UnitKind::Robot,
        vehicle: VehicleClass::Ground,
        origin: TilePosition::new(5, 4),
        size: TileRectSize::new(1, 1),
        radii: UnitRadii {
            network: 0,
            resource: 0,
            danger: 0,
            attack: 0,
            vision: 3,
        },
        stuck_probability: 0.05,
        battery: Battery::new(120),
        base: false,
    }
}

fn place_unit(world: &mut World, spec: UnitSpec) -> Result<UnitId> {
    let origin = spec.origin;
    let mut events = Vec::new();
    apply(world, Command::PlaceUnit { spec }, &mut events);
    match events.first() {
        Some(Event::UnitPlaced { unit, .. }) => Ok(*unit),
        Some(Event::PlacementRejected { reason, .. }) => Err(anyhow!(
            "placement at ({}, {}) rejected: {reason:?}",
            origin.x(),
            origin.y()
        )),
        other => Err(anyhow!("unexpected placement outcome: {other:?}")),
    }
}

fn print_tile_sets(world: &World) {
    println!("tile sets after placement");
    println!("  occupied         {:>5}", query::occupied_tiles(world).len());
    println!(
        "  valid buildable  {:>5}",
        query::valid_buildable_tiles(world).len()
    );
    println!("  danger           {:>5}", query::danger_tiles(world).len());
    println!(
        "  base coverage    {:>5}",
        query::base_coverage(world).len()
    );
}

fn describe_route(world: &World, scout: UnitId, target: TilePosition) -> Result<()> {
    let snapshot = query::unit(world, scout).ok_or_else(|| anyhow!("scout is missing"))?;
    let tiles = WorldTiles::for_mover(world, scout);
    let route = plan_route(
        &tiles,
        snapshot.vehicle,
        snapshot.area.origin(),
        target,
        8,
        &BTreeSet::new(),
    )
    .map_err(|error| anyhow!("no route to ({}, {}): {error:?}", target.x(), target.y()))?;
    println!(
        "planned route: {} steps, {} bridge tiles",
        route.cost(),
        route.bridge_tiles.len()
    );
    Ok(())
}

fn run_journey(
    world: &mut World,
    scout: UnitId,
    target: TilePosition,
    args: &Args,
) -> Result<()> {
    let mut orchestrator = Orchestrator::new(Config::new(args.seed, STEP_INTERVAL));
    let mut commands = Vec::new();
    orchestrator
        .start_travel(
            world,
            scout,
            target,
            TravelOptions {
                bridge_budget: 8,
                ..TravelOptions::default()
            },
            Duration::ZERO,
            &mut commands,
        )
        .map_err(|failure| anyhow!("journey failed to start: {:?}", failure.reason))?;

    let mut now = Duration::ZERO;
    let mut moves = 0_u32;
    for _ in 0..args.step_budget {
        now += STEP_INTERVAL;
        let mut events = Vec::new();
        for command in commands.drain(..) {
            apply(world, command, &mut events);
        }
        moves += events
            .iter()
            .filter(|event| matches!(event, Event::UnitMoved { .. }))
            .count() as u32;
        orchestrator.handle(&events, world, now, &mut commands);
        if commands.is_empty() && orchestrator.state(scout) == MoveState::Idle {
            break;
        }
    }

    let snapshot = query::unit(world, scout).ok_or_else(|| anyhow!("scout was destroyed"))?;
    println!("traversal summary");
    println!("  committed steps  {moves:>5}");
    println!(
        "  final position   ({}, {})",
        snapshot.area.origin().x(),
        snapshot.area.origin().y()
    );
    println!("  battery left     {:>5}", snapshot.battery.charge());
    println!("  stuck in mud     {:>5}", snapshot.stuck);
    for failure in orchestrator.take_failures() {
        println!("  journey aborted: {:?}", failure.reason);
    }
    Ok(())
}
