#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rover Colony engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use serde::{Deserialize, Serialize};

/// Battery points consumed by a single ground-level step.
pub const STEP_BATTERY_COST: u32 = 1;

/// Battery points consumed by a single aerial lift step.
pub const LIFT_STEP_COST: u32 = 3;

/// Location of a single grid tile expressed as signed x/y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    x: i32,
    y: i32,
}

impl TilePosition {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Computes the Manhattan distance between two tile positions.
    #[must_use]
    pub fn manhattan_distance(self, other: TilePosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns the position translated by the provided offsets.
    #[must_use]
    pub const fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }

    /// Returns the adjacent position one tile away in the given direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::North => self.offset_by(0, -1),
            Direction::East => self.offset_by(1, 0),
            Direction::South => self.offset_by(0, 1),
            Direction::West => self.offset_by(-1, 0),
        }
    }

    /// Squared Euclidean distance from this tile's center to an arbitrary point.
    #[must_use]
    pub fn squared_distance_to(self, center: (f64, f64)) -> f64 {
        let dx = self.x as f64 - center.0;
        let dy = self.y as f64 - center.1;
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle of tiles anchored at an origin position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    origin: TilePosition,
    size: TileRectSize,
}

impl TileRect {
    /// Constructs a rectangle from an origin tile and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: TilePosition, size: TileRectSize) -> Self {
        Self { origin, size }
    }

    /// Constructs a rectangle covering exactly one tile.
    #[must_use]
    pub const fn single(origin: TilePosition) -> Self {
        Self {
            origin,
            size: TileRectSize::new(1, 1),
        }
    }

    /// Upper-left tile that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> TilePosition {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole tiles.
    #[must_use]
    pub const fn size(&self) -> TileRectSize {
        self.size
    }

    /// Lower-right tile contained in the rectangle.
    #[must_use]
    pub const fn max(&self) -> TilePosition {
        TilePosition::new(
            self.origin.x() + self.size.width() as i32 - 1,
            self.origin.y() + self.size.height() as i32 - 1,
        )
    }

    /// Center of the rectangle expressed in fractional tile coordinates.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            self.origin.x() as f64 + (self.size.width() as f64 - 1.0) / 2.0,
            self.origin.y() as f64 + (self.size.height() as f64 - 1.0) / 2.0,
        )
    }

    /// Half of the rectangle's larger side, used to pad radius queries.
    #[must_use]
    pub fn half_diagonal_pad(&self) -> f64 {
        f64::from(self.size.width().max(self.size.height())) / 2.0
    }

    /// Reports whether the rectangle contains the provided tile.
    #[must_use]
    pub fn contains(&self, tile: TilePosition) -> bool {
        let max = self.max();
        tile.x() >= self.origin.x()
            && tile.x() <= max.x()
            && tile.y() >= self.origin.y()
            && tile.y() <= max.y()
    }

    /// Reports whether two rectangles share at least one tile.
    #[must_use]
    pub fn intersects(&self, other: &TileRect) -> bool {
        let self_max = self.max();
        let other_max = other.max();
        self.origin.x() <= other_max.x()
            && other.origin.x() <= self_max.x()
            && self.origin.y() <= other_max.y()
            && other.origin.y() <= self_max.y()
    }

    /// Iterates over every tile in the rectangle in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TilePosition> + '_ {
        let origin = self.origin;
        let width = self.size.width() as i32;
        let height = self.size.height() as i32;
        (0..height)
            .flat_map(move |dy| (0..width).map(move |dx| origin.offset_by(dx, dy)))
    }
}

/// Size of a [`TileRect`] measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRectSize {
    width: u32,
    height: u32,
}

impl TileRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Unique identifier assigned to a unit by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identity of a terrain layer supplying tile attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(u32);

impl LayerId {
    /// Creates a new layer identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identity of the elevation group that owns a terrain layer.
///
/// Two tiles share an elevation iff the elevation layers owning their
/// terrain layers match. Ground movement across different elevation layers
/// is blocked except via explicit bridges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElevationLayer(u32);

impl ElevationLayer {
    /// Creates a new elevation layer identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Per-tile boolean attributes sourced from the terrain layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileFlag {
    /// The tile accepts structures and ground traversal.
    Buildable,
    /// The tile holds a harvestable wood resource.
    WoodResource,
    /// The tile is rough terrain impassable to ground vehicles.
    RoughTerrain,
    /// The tile is covered by water.
    Water,
    /// The tile is mud, raising the chance of a unit getting stuck.
    Mud,
}

/// Vehicle classes that determine which movement rules apply to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    /// Surface vehicle bound by buildability, elevation, and rough terrain.
    Ground,
    /// Flying vehicle that ignores buildability and elevation.
    Aerial,
}

/// Broad category a unit belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Fixed structure occupying its footprint until removed.
    Building,
    /// Mobile unit able to traverse the grid.
    Robot,
}

/// Coverage radii owned by a unit, measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRadii {
    /// Network/buildable coverage radius; zero for units without coverage.
    pub network: u32,
    /// Radius within which resources are collected.
    pub resource: u32,
    /// Radius of the danger zone projected around the unit.
    pub danger: u32,
    /// Radius within which the unit can attack.
    pub attack: u32,
    /// Sensor radius used by autonomous exploration.
    pub vision: u32,
}

impl UnitRadii {
    /// Creates a radii descriptor with every radius set to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            network: 0,
            resource: 0,
            danger: 0,
            attack: 0,
            vision: 0,
        }
    }

    /// Creates a radii descriptor carrying only a network radius.
    #[must_use]
    pub const fn network_only(network: u32) -> Self {
        Self {
            network,
            resource: 0,
            danger: 0,
            attack: 0,
            vision: 0,
        }
    }
}

/// Remaining battery charge held by a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Battery(u32);

impl Battery {
    /// Creates a battery holding the provided charge.
    #[must_use]
    pub const fn new(charge: u32) -> Self {
        Self(charge)
    }

    /// Remaining charge points.
    #[must_use]
    pub const fn charge(&self) -> u32 {
        self.0
    }

    /// Returns the battery after draining the provided amount, saturating at zero.
    #[must_use]
    pub const fn drained_by(self, amount: u32) -> Self {
        Self(self.0.saturating_sub(amount))
    }

    /// Reports whether the battery holds no charge.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Reports whether the battery can afford the provided drain.
    #[must_use]
    pub const fn can_afford(&self, amount: u32) -> bool {
        self.0 >= amount
    }
}

/// Cardinal movement directions available to robots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing y coordinates.
    North,
    /// Movement toward increasing x coordinates.
    East,
    /// Movement toward increasing y coordinates.
    South,
    /// Movement toward decreasing x coordinates.
    West,
}

impl Direction {
    /// Derives the direction connecting two orthogonally adjacent tiles.
    ///
    /// Returns `None` when the tiles are not exactly one step apart.
    #[must_use]
    pub fn between(from: TilePosition, to: TilePosition) -> Option<Direction> {
        let dx = to.x() - from.x();
        let dy = to.y() - from.y();
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

/// Planned step of a not-yet-executed path, painted onto a tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Tile the waypoint marks.
    pub position: TilePosition,
    /// One-based sequence index within the owning unit's waypoint list.
    pub index: u32,
    /// Free-text annotation attached by the author of the waypoint.
    pub note: String,
}

impl Waypoint {
    /// Creates a waypoint at the provided position and sequence index.
    #[must_use]
    pub fn new(position: TilePosition, index: u32, note: impl Into<String>) -> Self {
        Self {
            position,
            index,
            note: note.into(),
        }
    }
}

/// Everything required to create a unit through [`Command::PlaceUnit`].
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSpec {
    /// Category of the unit being placed.
    pub kind: UnitKind,
    /// Movement rules governing the unit.
    pub vehicle: VehicleClass,
    /// Upper-left tile anchoring the unit's footprint.
    pub origin: TilePosition,
    /// Dimensions of the occupied area.
    pub size: TileRectSize,
    /// Coverage radii owned by the unit.
    pub radii: UnitRadii,
    /// Base probability of the unit becoming stuck after a step.
    pub stuck_probability: f64,
    /// Initial battery charge.
    pub battery: Battery,
    /// Whether the unit should root the colony network as its base.
    pub base: bool,
}

impl UnitSpec {
    /// Footprint the unit would occupy once placed.
    #[must_use]
    pub const fn area(&self) -> TileRect {
        TileRect::from_origin_and_size(self.origin, self.size)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests placement of a new unit. The first placed building with a
    /// network radius becomes the base rooting the colony network.
    PlaceUnit {
        /// Full description of the unit to create.
        spec: UnitSpec,
    },
    /// Requests removal of an existing unit.
    RemoveUnit {
        /// Identifier of the unit targeted for removal.
        unit: UnitId,
    },
    /// Requests relocation of a unit's footprint origin to a new tile.
    MoveUnit {
        /// Identifier of the unit attempting to move.
        unit: UnitId,
        /// Origin tile the footprint should occupy after the move.
        destination: TilePosition,
    },
    /// Enables or disables a unit, excluding it from coverage while disabled.
    SetUnitEnabled {
        /// Identifier of the unit to toggle.
        unit: UnitId,
        /// Whether the unit should participate in the simulation.
        enabled: bool,
    },
    /// Marks or clears the terrain-induced stuck state of a unit.
    SetUnitStuck {
        /// Identifier of the unit to update.
        unit: UnitId,
        /// Whether the unit is stuck in terrain.
        stuck: bool,
    },
    /// Appends a waypoint to the end of a unit's planned path.
    PaintWaypoint {
        /// Unit whose waypoint list grows.
        unit: UnitId,
        /// Tile the new waypoint marks.
        position: TilePosition,
        /// Annotation attached to the waypoint.
        note: String,
    },
    /// Replaces a unit's waypoint list wholesale, renumbering from one.
    SetWaypoints {
        /// Unit whose waypoint list is replaced.
        unit: UnitId,
        /// Replacement waypoints in execution order.
        waypoints: Vec<Waypoint>,
    },
    /// Clears every waypoint painted for a unit.
    ClearWaypoints {
        /// Unit whose waypoint list empties.
        unit: UnitId,
    },
    /// Drains battery charge from a unit, destroying it on depletion.
    DrainBattery {
        /// Unit whose battery drains.
        unit: UnitId,
        /// Charge points to remove.
        amount: u32,
    },
    /// Designates or clears the landmark tile that counts as buildable.
    ConfigureLandmark {
        /// Landmark tile position, or `None` to clear it.
        position: Option<TilePosition>,
    },
    /// Forces a full recomputation of every derived tile set.
    RecalculateGrid,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a unit was created and entered the registry.
    UnitPlaced {
        /// Identifier assigned to the unit by the world.
        unit: UnitId,
        /// Category of the placed unit.
        kind: UnitKind,
        /// Footprint occupied by the unit.
        area: TileRect,
    },
    /// Reports that a unit placement request was rejected.
    PlacementRejected {
        /// Origin tile provided in the placement request.
        origin: TilePosition,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a unit was removed from the world.
    UnitRemoved {
        /// Identifier of the unit that was removed.
        unit: UnitId,
        /// Footprint previously occupied by the unit.
        area: TileRect,
    },
    /// Reports that a unit removal request was rejected.
    RemovalRejected {
        /// Identifier of the unit targeted for removal.
        unit: UnitId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a unit relocated its footprint.
    UnitMoved {
        /// Identifier of the unit that moved.
        unit: UnitId,
        /// Origin tile before the move.
        from: TilePosition,
        /// Origin tile after the move.
        to: TilePosition,
    },
    /// Reports that a unit move request was rejected.
    MoveRejected {
        /// Identifier of the unit attempting to move.
        unit: UnitId,
        /// Specific reason the move failed.
        reason: MoveError,
    },
    /// Announces that a unit was enabled or disabled.
    UnitEnabledChanged {
        /// Identifier of the toggled unit.
        unit: UnitId,
        /// Whether the unit now participates in the simulation.
        enabled: bool,
    },
    /// Announces that a unit's stuck state changed.
    UnitStuckChanged {
        /// Identifier of the affected unit.
        unit: UnitId,
        /// Whether the unit is now stuck.
        stuck: bool,
    },
    /// Announces that a unit's waypoint list changed structurally.
    WaypointsChanged {
        /// Unit owning the modified waypoint list.
        unit: UnitId,
        /// Number of waypoints after the change.
        count: usize,
    },
    /// Confirms that charge was drained from a unit's battery.
    BatteryDrained {
        /// Unit whose battery drained.
        unit: UnitId,
        /// Charge remaining after the drain.
        remaining: Battery,
    },
    /// Announces that a unit's battery ran out and the unit was destroyed.
    BatteryDepleted {
        /// Unit destroyed by battery depletion.
        unit: UnitId,
    },
    /// Announces that the landmark designation changed.
    LandmarkConfigured {
        /// Landmark tile position, or `None` when cleared.
        position: Option<TilePosition>,
    },
    /// Confirms that every derived tile set was rebuilt from scratch.
    GridRecalculated,
}

/// Reasons a unit placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested footprint extends beyond the known terrain.
    OutOfBounds,
    /// The requested footprint overlaps an occupied tile.
    Occupied,
    /// The requested footprint lies outside the colony's buildable coverage.
    OutsideNetwork,
    /// The requested footprint overlaps a danger zone.
    DangerZone,
    /// A footprint tile is not buildable terrain.
    NotBuildable,
    /// A second network root was requested while a base already exists.
    BaseAlreadyPlaced,
}

/// Reasons a unit removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No unit with the provided identifier exists.
    MissingUnit,
    /// The base rooting the network cannot be removed.
    IsBase,
    /// Removal would cut another unit's link to the base.
    WouldDisconnectNetwork,
    /// Removal would leave a dependent unit without any covering footprint.
    WouldOrphanDependent,
}

/// Reasons a unit move request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveError {
    /// No unit with the provided identifier exists.
    MissingUnit,
    /// The unit is disabled and cannot act.
    UnitDisabled,
    /// The unit is stuck in terrain and must be freed first.
    UnitStuck,
    /// A destination tile violates the unit's vehicle movement rules.
    NotTraversable,
    /// A destination tile is occupied by another unit.
    Occupied,
    /// The destination lies on a different elevation layer.
    ElevationMismatch,
    /// The move would cut the unit's link to the base network.
    WouldDisconnectNetwork,
    /// The destination footprint extends beyond the known terrain.
    OutOfBounds,
}
