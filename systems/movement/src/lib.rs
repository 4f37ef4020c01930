#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement orchestrator that schedules robot steps and runs
//! autonomous exploration on top of the world command loop.
//!
//! The orchestrator is a pure system: it consumes world events and immutable
//! views, keeps its own per-unit task state, and proposes mutations
//! exclusively as [`Command`] batches for the driver to apply. Steps are paced
//! by a monotonic clock supplied by the driver, and every random draw flows
//! through a seeded [`ChaCha8Rng`] so replays with the same seed reproduce
//! the same traversal.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rover_colony_core::{
    Command, Direction, Event, MoveError, TileFlag, TilePosition, TileRect, UnitId,
    LIFT_STEP_COST, STEP_BATTERY_COST,
};
use rover_colony_system_pathfinding::{can_step_to, plan_route, RouteError, WorldTiles};
use rover_colony_world::query::{self, UnitSnapshot};
use rover_colony_world::spatial::tiles_in_radius;
use rover_colony_world::World;

/// Multiplier applied to a unit's stuck probability when it lands on mud.
pub const MUD_STUCK_MULTIPLIER: f64 = 4.0;

/// Maximum number of committed steps a single exploration task may take.
pub const EXPLORE_STEP_BUDGET: u32 = 64;

/// Number of recent leg origins inspected for oscillation during ascent.
pub const OSCILLATION_WINDOW: usize = 6;

/// Revisits of the same leg origin tolerated before declaring a local maximum.
pub const OSCILLATION_TOLERANCE: usize = 2;

/// Drop-off tile offset from the base origin used by return journeys.
pub const DROP_OFF_OFFSET: (i32, i32) = (0, 1);

const WAYPOINT_NOTE: &str = "travel";

/// Configuration parameters required to construct the orchestrator.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    step_interval: Duration,
}

impl Config {
    /// Creates a new configuration using the provided step cadence and seed.
    #[must_use]
    pub const fn new(rng_seed: u64, step_interval: Duration) -> Self {
        Self {
            rng_seed,
            step_interval,
        }
    }
}

/// How a step spends battery charge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepMode {
    /// Ordinary ground or aerial travel.
    #[default]
    Normal,
    /// Aerial travel while lifting a payload.
    Lift,
    /// The unit is carried by another and spends nothing itself.
    Carried,
}

impl StepMode {
    /// Battery charge one step spends in this mode.
    #[must_use]
    pub const fn battery_cost(self) -> u32 {
        match self {
            StepMode::Normal => STEP_BATTERY_COST,
            StepMode::Lift => LIFT_STEP_COST,
            StepMode::Carried => 0,
        }
    }
}

/// Per-journey parameters supplied when a task starts.
#[derive(Clone, Copy, Debug, Default)]
pub struct TravelOptions {
    /// Battery accounting mode for every step of the journey.
    pub step_mode: StepMode,
    /// Consumable bridge units available for water crossings.
    pub bridge_budget: u32,
}

/// Autonomous exploration behaviours, without their per-task payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExploreKind {
    /// Greedy coverage of unscanned network tiles.
    RandomCoverage,
    /// Hill climbing over a caller-provided scalar field.
    GradientAscent,
    /// Travel to the drop-off tile next to the base.
    ReturnToBase,
    /// Travel straight to a caller-provided target.
    DirectPath,
}

/// Observable per-unit movement state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveState {
    /// No journey is in progress.
    Idle,
    /// A planned path is being walked, facing the given direction.
    Moving(Direction),
    /// An autonomous exploration mode is driving the unit.
    AutoExploring(ExploreKind),
}

/// Reasons a journey could not start or had to abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The unit already has a journey in progress.
    Busy,
    /// The unit is unknown to the world.
    MissingUnit,
    /// No base exists to return to.
    MissingBase,
    /// No route reaches the requested target.
    NoRoute,
    /// A bridged route exists but the bridge budget cannot cover it.
    InsufficientBridges {
        /// Number of bridge tiles the route requires.
        required: usize,
        /// Consumable bridge units the caller holds.
        available: u32,
    },
    /// The battery cannot afford the next step.
    BatteryExhausted,
    /// The world or the step validator rejected a step.
    StepRejected(MoveError),
}

/// Report surfaced to the caller when a journey aborts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveFailure {
    /// Unit whose journey failed.
    pub unit: UnitId,
    /// Specific reason the journey ended.
    pub reason: FailureReason,
}

/// Scalar sampled by gradient-ascent exploration.
pub trait ScalarField {
    /// Field value at the provided tile; higher values attract the unit.
    fn value(&self, tile: TilePosition) -> f64;
}

impl<F> ScalarField for F
where
    F: Fn(TilePosition) -> f64,
{
    fn value(&self, tile: TilePosition) -> f64 {
        self(tile)
    }
}

/// Exploration behaviour requested when a task starts.
pub enum ExploreRequest {
    /// Greedy coverage of unscanned network tiles.
    RandomCoverage,
    /// Hill climbing over the provided scalar field.
    GradientAscent(Box<dyn ScalarField>),
    /// Travel to the drop-off tile next to the base.
    ReturnToBase,
    /// Travel straight to the provided target tile.
    DirectPath(TilePosition),
}

impl fmt::Debug for ExploreRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExploreRequest::RandomCoverage => "RandomCoverage",
            ExploreRequest::GradientAscent(_) => "GradientAscent",
            ExploreRequest::ReturnToBase => "ReturnToBase",
            ExploreRequest::DirectPath(_) => "DirectPath",
        })
    }
}

enum ExploreTask {
    RandomCoverage {
        scanned: BTreeSet<TilePosition>,
        steps_left: u32,
    },
    GradientAscent {
        field: Box<dyn ScalarField>,
        recent: VecDeque<TilePosition>,
        steps_left: u32,
    },
    ReturnToBase,
    DirectPath {
        target: TilePosition,
    },
}

impl ExploreTask {
    fn kind(&self) -> ExploreKind {
        match self {
            ExploreTask::RandomCoverage { .. } => ExploreKind::RandomCoverage,
            ExploreTask::GradientAscent { .. } => ExploreKind::GradientAscent,
            ExploreTask::ReturnToBase => ExploreKind::ReturnToBase,
            ExploreTask::DirectPath { .. } => ExploreKind::DirectPath,
        }
    }
}

impl fmt::Debug for ExploreTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

#[derive(Debug)]
struct Task {
    pending: VecDeque<TilePosition>,
    ready_at: Duration,
    cancelled: bool,
    facing: Option<Direction>,
    step_mode: StepMode,
    bridge_budget: u32,
    explore: Option<ExploreTask>,
}

impl Task {
    fn new(options: TravelOptions, ready_at: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            ready_at,
            cancelled: false,
            facing: None,
            step_mode: options.step_mode,
            bridge_budget: options.bridge_budget,
            explore: None,
        }
    }

    fn state(&self) -> MoveState {
        if let Some(explore) = &self.explore {
            return MoveState::AutoExploring(explore.kind());
        }
        match self.facing {
            Some(direction) if !self.pending.is_empty() => MoveState::Moving(direction),
            _ => MoveState::Idle,
        }
    }
}

/// Pure system that paces unit steps and drives autonomous exploration.
#[derive(Debug)]
pub struct Orchestrator {
    rng: ChaCha8Rng,
    step_interval: Duration,
    tasks: BTreeMap<UnitId, Task>,
    failures: Vec<MoveFailure>,
}

impl Orchestrator {
    /// Creates a new orchestrator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            step_interval: config.step_interval,
            tasks: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Observable movement state of the provided unit.
    #[must_use]
    pub fn state(&self, unit: UnitId) -> MoveState {
        self.tasks
            .get(&unit)
            .map_or(MoveState::Idle, |task| task.state())
    }

    /// Drains the journey failures recorded since the previous call.
    pub fn take_failures(&mut self) -> Vec<MoveFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Starts walking a planned route toward the target tile.
    ///
    /// Paints one waypoint marker per step so the path stays observable while
    /// in flight; the markers are cleared when the journey ends for any
    /// reason. Fails synchronously when the unit is busy, missing, unable to
    /// step, or when no affordable route exists.
    pub fn start_travel(
        &mut self,
        world: &World,
        unit: UnitId,
        target: TilePosition,
        options: TravelOptions,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Result<(), MoveFailure> {
        let snapshot = self.admit_start(world, unit)?;
        let tiles = WorldTiles::for_mover(world, unit);
        let route = plan_route(
            &tiles,
            snapshot.vehicle,
            snapshot.area.origin(),
            target,
            options.bridge_budget,
            &BTreeSet::new(),
        )
        .map_err(|error| fail(unit, route_failure(error)))?;

        let mut task = Task::new(options, now + self.step_interval);
        enqueue_leg(&mut task, unit, &route.steps, out);
        task.facing = route
            .steps
            .first()
            .and_then(|step| Direction::between(snapshot.area.origin(), *step));
        let _ = self.tasks.insert(unit, task);
        Ok(())
    }

    /// Starts an autonomous exploration task for the provided unit.
    ///
    /// The first leg is planned immediately; subsequent legs are planned in
    /// [`Self::handle`] whenever the previous leg completes. Fails
    /// synchronously when the unit is busy or missing, when return travel has
    /// no base, or when the behaviour finds no first leg to walk.
    pub fn start_explore(
        &mut self,
        world: &World,
        unit: UnitId,
        request: ExploreRequest,
        options: TravelOptions,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Result<(), MoveFailure> {
        let snapshot = self.admit_start(world, unit)?;
        let explore = match request {
            ExploreRequest::RandomCoverage => {
                let mut scanned = BTreeSet::new();
                scanned.extend(tiles_in_radius(
                    snapshot.area,
                    snapshot.radii.vision,
                    |_| true,
                ));
                ExploreTask::RandomCoverage {
                    scanned,
                    steps_left: EXPLORE_STEP_BUDGET,
                }
            }
            ExploreRequest::GradientAscent(field) => ExploreTask::GradientAscent {
                field,
                recent: VecDeque::new(),
                steps_left: EXPLORE_STEP_BUDGET,
            },
            ExploreRequest::ReturnToBase => {
                if query::base(world).is_none() {
                    return Err(fail(unit, FailureReason::MissingBase));
                }
                ExploreTask::ReturnToBase
            }
            ExploreRequest::DirectPath(target) => ExploreTask::DirectPath { target },
        };

        let mut task = Task::new(options, now + self.step_interval);
        task.explore = Some(explore);
        match self.plan_next_leg(world, &snapshot, &mut task, out) {
            Ok(true) => {
                let _ = self.tasks.insert(unit, task);
                Ok(())
            }
            Ok(false) => Err(fail(unit, FailureReason::NoRoute)),
            Err(reason) => Err(fail(unit, reason)),
        }
    }

    /// Requests cancellation of the unit's journey.
    ///
    /// Committed steps are never rolled back; the pending queue is dropped
    /// before the next dequeue and the transient waypoint markers are
    /// cleared, leaving the unit idle.
    pub fn cancel(&mut self, unit: UnitId, out: &mut Vec<Command>) {
        if let Some(task) = self.tasks.get_mut(&unit) {
            task.cancelled = true;
            out.push(Command::ClearWaypoints { unit });
        }
    }

    /// Consumes world events and executes every due step.
    ///
    /// At most one step per unit is dequeued per call so each proposed move
    /// is validated against a world that has absorbed the previous one.
    pub fn handle(
        &mut self,
        events: &[Event],
        world: &World,
        now: Duration,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::MoveRejected { unit, reason } => {
                    if self.tasks.remove(unit).is_some() {
                        self.failures.push(MoveFailure {
                            unit: *unit,
                            reason: FailureReason::StepRejected(*reason),
                        });
                        out.push(Command::ClearWaypoints { unit: *unit });
                    }
                }
                Event::UnitStuckChanged { unit, stuck: true } => {
                    if self.tasks.remove(unit).is_some() {
                        out.push(Command::ClearWaypoints { unit: *unit });
                    }
                }
                Event::UnitRemoved { unit, .. } | Event::BatteryDepleted { unit } => {
                    let _ = self.tasks.remove(unit);
                }
                _ => {}
            }
        }

        let due: Vec<UnitId> = self.tasks.keys().copied().collect();
        for unit in due {
            self.advance_unit(world, unit, now, out);
        }
    }

    fn advance_unit(
        &mut self,
        world: &World,
        unit: UnitId,
        now: Duration,
        out: &mut Vec<Command>,
    ) {
        let Some(mut task) = self.tasks.remove(&unit) else {
            return;
        };
        if task.cancelled {
            return;
        }

        let Some(snapshot) = query::unit(world, unit) else {
            return;
        };

        if task.pending.is_empty() {
            if task.explore.is_some() {
                match self.plan_next_leg(world, &snapshot, &mut task, out) {
                    Ok(true) => {
                        let _ = self.tasks.insert(unit, task);
                    }
                    Ok(false) => out.push(Command::ClearWaypoints { unit }),
                    Err(reason) => {
                        self.failures.push(fail(unit, reason));
                        out.push(Command::ClearWaypoints { unit });
                    }
                }
            } else {
                out.push(Command::ClearWaypoints { unit });
            }
            return;
        }

        if task.ready_at > now {
            let _ = self.tasks.insert(unit, task);
            return;
        }

        match self.execute_step(world, &snapshot, &mut task, now, out) {
            Ok(StepOutcome::Advanced) => {
                let _ = self.tasks.insert(unit, task);
            }
            Ok(StepOutcome::StuckInTerrain) => {
                out.push(Command::ClearWaypoints { unit });
            }
            Err(reason) => {
                self.failures.push(fail(unit, reason));
                out.push(Command::ClearWaypoints { unit });
            }
        }
    }

    fn execute_step(
        &mut self,
        world: &World,
        snapshot: &UnitSnapshot,
        task: &mut Task,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Result<StepOutcome, FailureReason> {
        if snapshot.disabled {
            return Err(FailureReason::StepRejected(MoveError::UnitDisabled));
        }
        if snapshot.stuck {
            return Err(FailureReason::StepRejected(MoveError::UnitStuck));
        }

        let cost = task.step_mode.battery_cost();
        if !snapshot.battery.can_afford(cost) {
            return Err(FailureReason::BatteryExhausted);
        }

        let Some(next) = task.pending.front().copied() else {
            return Ok(StepOutcome::Advanced);
        };
        let destination = TileRect::from_origin_and_size(next, snapshot.area.size());
        let tiles = WorldTiles::for_mover(world, snapshot.id);
        can_step_to(&tiles, snapshot.vehicle, snapshot.area, destination)
            .map_err(FailureReason::StepRejected)?;

        let from = snapshot.area.origin();
        let multiplier = if query::terrain(world).flag(next, TileFlag::Mud) {
            MUD_STUCK_MULTIPLIER
        } else {
            1.0
        };
        let probability = (snapshot.stuck_probability * multiplier).clamp(0.0, 1.0);
        let stuck = probability > 0.0 && self.rng.gen_bool(probability);

        out.push(Command::MoveUnit {
            unit: snapshot.id,
            destination: next,
        });
        if cost > 0 {
            out.push(Command::DrainBattery {
                unit: snapshot.id,
                amount: cost,
            });
        }

        if stuck {
            out.push(Command::SetUnitStuck {
                unit: snapshot.id,
                stuck: true,
            });
            return Ok(StepOutcome::StuckInTerrain);
        }

        let _ = task.pending.pop_front();
        task.facing = Direction::between(from, next);
        task.ready_at = now + self.step_interval;
        match &mut task.explore {
            Some(ExploreTask::RandomCoverage {
                scanned,
                steps_left,
            }) => {
                *steps_left = steps_left.saturating_sub(1);
                scanned.extend(tiles_in_radius(destination, snapshot.radii.vision, |_| {
                    true
                }));
            }
            Some(ExploreTask::GradientAscent { steps_left, .. }) => {
                *steps_left = steps_left.saturating_sub(1);
            }
            _ => {}
        }
        Ok(StepOutcome::Advanced)
    }

    /// Plans the next exploration leg; `Ok(false)` means the behaviour has
    /// nothing left to do and the task finishes normally.
    fn plan_next_leg(
        &mut self,
        world: &World,
        snapshot: &UnitSnapshot,
        task: &mut Task,
        out: &mut Vec<Command>,
    ) -> Result<bool, FailureReason> {
        let origin = snapshot.area.origin();
        let leg = match task.explore.as_mut() {
            None => return Ok(false),
            Some(ExploreTask::DirectPath { target }) => {
                if *target == origin {
                    None
                } else {
                    let target = *target;
                    Some(self.plan_leg_route(world, snapshot, target, task.bridge_budget)?)
                }
            }
            Some(ExploreTask::ReturnToBase) => {
                let base = query::base(world).ok_or(FailureReason::MissingBase)?;
                let base_area = query::unit(world, base)
                    .ok_or(FailureReason::MissingBase)?
                    .area;
                let target = base_area
                    .origin()
                    .offset_by(DROP_OFF_OFFSET.0, DROP_OFF_OFFSET.1);
                if target == origin {
                    None
                } else {
                    Some(self.plan_leg_route(world, snapshot, target, task.bridge_budget)?)
                }
            }
            Some(ExploreTask::RandomCoverage {
                scanned,
                steps_left,
            }) => {
                if *steps_left == 0 {
                    None
                } else {
                    let candidates = coverage_candidates(world, snapshot, scanned);
                    let budget = task.bridge_budget;
                    self.first_reachable(world, snapshot, &candidates, budget)
                }
            }
            Some(ExploreTask::GradientAscent {
                field,
                recent,
                steps_left,
            }) => {
                if *steps_left == 0 || oscillating(recent, origin) {
                    None
                } else {
                    recent.push_back(origin);
                    while recent.len() > OSCILLATION_WINDOW {
                        let _ = recent.pop_front();
                    }
                    let candidates = ascent_candidates(snapshot, field.as_ref(), origin);
                    let budget = task.bridge_budget;
                    self.first_reachable(world, snapshot, &candidates, budget)
                }
            }
        };

        match leg {
            Some(route) => {
                enqueue_leg(task, snapshot.id, &route, out);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn plan_leg_route(
        &self,
        world: &World,
        snapshot: &UnitSnapshot,
        target: TilePosition,
        bridge_budget: u32,
    ) -> Result<Vec<TilePosition>, FailureReason> {
        let tiles = WorldTiles::for_mover(world, snapshot.id);
        plan_route(
            &tiles,
            snapshot.vehicle,
            snapshot.area.origin(),
            target,
            bridge_budget,
            &BTreeSet::new(),
        )
        .map(|route| route.steps)
        .map_err(route_failure)
    }

    /// Walks ordered candidates and returns the first one a route reaches.
    fn first_reachable(
        &self,
        world: &World,
        snapshot: &UnitSnapshot,
        candidates: &[TilePosition],
        bridge_budget: u32,
    ) -> Option<Vec<TilePosition>> {
        for candidate in candidates {
            if let Ok(steps) = self.plan_leg_route(world, snapshot, *candidate, bridge_budget) {
                if !steps.is_empty() {
                    return Some(steps);
                }
            }
        }
        None
    }

    fn admit_start(&self, world: &World, unit: UnitId) -> Result<UnitSnapshot, MoveFailure> {
        if self.tasks.contains_key(&unit) {
            return Err(fail(unit, FailureReason::Busy));
        }
        let snapshot = query::unit(world, unit).ok_or_else(|| fail(unit, FailureReason::MissingUnit))?;
        if snapshot.disabled {
            return Err(fail(unit, FailureReason::StepRejected(MoveError::UnitDisabled)));
        }
        if snapshot.stuck {
            return Err(fail(unit, FailureReason::StepRejected(MoveError::UnitStuck)));
        }
        Ok(snapshot)
    }
}

#[derive(Clone, Copy, Debug)]
enum StepOutcome {
    Advanced,
    StuckInTerrain,
}

const fn fail(unit: UnitId, reason: FailureReason) -> MoveFailure {
    MoveFailure { unit, reason }
}

const fn route_failure(error: RouteError) -> FailureReason {
    match error {
        RouteError::NoRoute => FailureReason::NoRoute,
        RouteError::InsufficientBridges {
            required,
            available,
        } => FailureReason::InsufficientBridges {
            required,
            available,
        },
    }
}

fn enqueue_leg(task: &mut Task, unit: UnitId, steps: &[TilePosition], out: &mut Vec<Command>) {
    for step in steps {
        task.pending.push_back(*step);
        out.push(Command::PaintWaypoint {
            unit,
            position: *step,
            note: WAYPOINT_NOTE.to_owned(),
        });
    }
}

/// Network-covered destination tiles ordered by how much unscanned area each
/// would bring into vision, ties broken by tile order.
fn coverage_candidates(
    world: &World,
    snapshot: &UnitSnapshot,
    scanned: &BTreeSet<TilePosition>,
) -> Vec<TilePosition> {
    let origin = snapshot.area.origin();
    let mut scored: Vec<(usize, TilePosition)> = query::valid_buildable_tiles(world)
        .iter()
        .filter(|tile| **tile != origin)
        .map(|tile| {
            let footprint = TileRect::from_origin_and_size(*tile, snapshot.area.size());
            let gain = tiles_in_radius(footprint, snapshot.radii.vision, |_| true)
                .difference(scanned)
                .count();
            (gain, *tile)
        })
        .filter(|(gain, _)| *gain > 0)
        .collect();
    scored.sort_by(|left, right| right.0.cmp(&left.0).then(left.1.cmp(&right.1)));
    scored.into_iter().map(|(_, tile)| tile).collect()
}

/// Tiles within vision ordered by descending field value, keeping only tiles
/// strictly above the field value at the unit's current origin.
fn ascent_candidates(
    snapshot: &UnitSnapshot,
    field: &dyn ScalarField,
    origin: TilePosition,
) -> Vec<TilePosition> {
    let here = field.value(origin);
    let mut scored: Vec<(f64, TilePosition)> =
        tiles_in_radius(snapshot.area, snapshot.radii.vision, |_| true)
            .into_iter()
            .filter(|tile| *tile != origin)
            .map(|tile| (field.value(tile), tile))
            .filter(|(value, _)| *value > here)
            .collect();
    scored.sort_by(|left, right| {
        right
            .0
            .partial_cmp(&left.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(left.1.cmp(&right.1))
    });
    scored.into_iter().map(|(_, tile)| tile).collect()
}

/// The leg origin repeating beyond tolerance inside the recent window marks
/// the unit as bouncing between the same tiles.
fn oscillating(recent: &VecDeque<TilePosition>, origin: TilePosition) -> bool {
    recent.iter().filter(|tile| **tile == origin).count() > OSCILLATION_TOLERANCE
}
