#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Serialization bridge between the engine and an external planning service.
//!
//! The engine's only obligations toward the service are a stable snapshot
//! schema and a validated way of applying a returned waypoint list. A
//! snapshot carries one unit's painted waypoints plus the context tiles the
//! service needs to reason about reachability and occupancy, encoded as a
//! single clipboard-friendly line. Returned coordinates are never trusted;
//! they pass the same validation as locally painted waypoints.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rover_colony_core::{Command, TilePosition, UnitId, Waypoint};
use rover_colony_world::query;
use rover_colony_world::spatial::tiles_in_radius;
use rover_colony_world::World;

const SNAPSHOT_DOMAIN: &str = "rover";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "rover:v1";
const FIELD_DELIMITER: char = ':';

/// One tile of surrounding context shipped alongside the waypoint list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTile {
    /// Grid position of the tile.
    pub position: TilePosition,
    /// Whether the tile currently accepts construction and travel.
    pub reachable: bool,
    /// Whether a live unit footprint covers the tile.
    pub occupied: bool,
}

/// Snapshot of a unit's planned path and its surroundings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Unit whose path the service is asked to improve.
    pub unit: UnitId,
    /// Painted waypoints in execution order.
    pub waypoints: Vec<Waypoint>,
    /// Tiles around the unit with their reachability and occupancy.
    pub context: Vec<ContextTile>,
}

impl PlanSnapshot {
    /// Captures a snapshot of the unit's waypoints and the tiles within its
    /// vision radius.
    #[must_use]
    pub fn capture(world: &World, unit: UnitId) -> Option<Self> {
        let snapshot = query::unit(world, unit)?;
        let occupied = query::occupied_tiles(world);
        let reachable = query::valid_buildable_tiles(world);
        let context = tiles_in_radius(snapshot.area, snapshot.radii.vision, |_| true)
            .into_iter()
            .map(|position| ContextTile {
                position,
                reachable: reachable.contains(&position),
                occupied: occupied.contains(&position),
            })
            .collect();
        Some(Self {
            unit,
            waypoints: query::waypoints(world, unit).to_vec(),
            context,
        })
    }

    /// Encodes the snapshot into a single line suitable for transfer.
    pub fn encode(&self) -> Result<String, PlanTransferError> {
        let json = serde_json::to_vec(self).map_err(PlanTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{encoded}",
            self.unit.get()
        ))
    }

    /// Decodes a snapshot from its single-line representation.
    pub fn decode(value: &str) -> Result<Self, PlanTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlanTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(PlanTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(PlanTransferError::MissingVersion)?;
        let unit = parts.next().ok_or(PlanTransferError::MissingUnit)?;
        let payload = parts.next().ok_or(PlanTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(PlanTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(PlanTransferError::UnsupportedVersion(version.to_owned()));
        }
        let unit = unit
            .parse::<u32>()
            .map_err(|_| PlanTransferError::InvalidUnit(unit.to_owned()))?;

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(PlanTransferError::InvalidEncoding)?;
        let decoded: Self =
            serde_json::from_slice(&bytes).map_err(PlanTransferError::InvalidPayload)?;

        if decoded.unit.get() != unit {
            return Err(PlanTransferError::UnitMismatch {
                header: unit,
                payload: decoded.unit.get(),
            });
        }
        Ok(decoded)
    }
}

/// Errors that can occur while encoding or decoding plan snapshots.
#[derive(Debug, Error)]
pub enum PlanTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("plan payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    #[error("plan string is missing the prefix")]
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    #[error("plan string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not name the unit it belongs to.
    #[error("plan string is missing the unit identifier")]
    MissingUnit,
    /// The encoded snapshot did not include the payload segment.
    #[error("plan string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("plan prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("plan version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The unit identifier could not be parsed from the header.
    #[error("could not parse unit identifier '{0}'")]
    InvalidUnit(String),
    /// The header and payload disagree about the unit.
    #[error("plan header names unit {header} but the payload names unit {payload}")]
    UnitMismatch {
        /// Unit identifier carried in the header.
        header: u32,
        /// Unit identifier carried in the payload.
        payload: u32,
    },
    /// The base64 payload could not be decoded.
    #[error("could not decode plan payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not parse plan payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Errors that can occur while applying an externally produced plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlanApplyError {
    /// The plan names a unit the world does not know.
    #[error("plan targets an unknown unit")]
    UnknownUnit,
    /// A returned waypoint lies outside the known terrain.
    #[error("plan waypoint at ({}, {}) lies outside the terrain", .0.x(), .0.y())]
    UnknownTile(TilePosition),
}

/// Turns a returned waypoint list into a [`Command::SetWaypoints`] batch.
///
/// Every coordinate is validated against the terrain before anything is
/// emitted; indices are renumbered from one so the service cannot smuggle in
/// duplicate or gapped sequence numbers.
pub fn apply_plan(
    world: &World,
    unit: UnitId,
    plan: Vec<Waypoint>,
    out: &mut Vec<Command>,
) -> Result<(), PlanApplyError> {
    if query::unit(world, unit).is_none() {
        return Err(PlanApplyError::UnknownUnit);
    }
    let terrain = query::terrain(world);
    for waypoint in &plan {
        if terrain.covering_layer(waypoint.position).is_none() {
            return Err(PlanApplyError::UnknownTile(waypoint.position));
        }
    }
    let waypoints = plan
        .into_iter()
        .enumerate()
        .map(|(slot, waypoint)| Waypoint::new(waypoint.position, slot as u32 + 1, waypoint.note))
        .collect();
    out.push(Command::SetWaypoints { unit, waypoints });
    Ok(())
}
