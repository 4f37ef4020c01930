//! Radius-based tile enumeration primitives.

use std::collections::BTreeSet;

use rover_colony_core::{TileFlag, TilePosition, TileRect};

use crate::terrain::TerrainSource;

/// Enumerates tiles within a near-circular footprint around an area.
///
/// The scan covers the bounding box `[area.min - radius, area.max + radius]`
/// and keeps a candidate iff the predicate accepts it and the squared
/// distance from the tile center to the area's center stays within
/// `(radius + pad)²`, where `pad` is half the larger side of the area. The
/// pad keeps the footprint circular regardless of the source area's shape.
pub fn tiles_in_radius<F>(area: TileRect, radius: u32, mut predicate: F) -> BTreeSet<TilePosition>
where
    F: FnMut(TilePosition) -> bool,
{
    let mut tiles = BTreeSet::new();
    let center = area.center();
    let reach = f64::from(radius) + area.half_diagonal_pad();
    let reach_squared = reach * reach;

    let radius = radius as i32;
    let min = area.origin().offset_by(-radius, -radius);
    let max = area.max().offset_by(radius, radius);

    for y in min.y()..=max.y() {
        for x in min.x()..=max.x() {
            let candidate = TilePosition::new(x, y);
            if !predicate(candidate) {
                continue;
            }
            if candidate.squared_distance_to(center) <= reach_squared {
                let _ = tiles.insert(candidate);
            }
        }
    }

    tiles
}

/// Tiles around an area that accept construction.
///
/// A tile qualifies when its buildable flag is set or when it is the
/// designated landmark tile.
pub fn valid_tiles_in_radius(
    terrain: &dyn TerrainSource,
    landmark: Option<TilePosition>,
    area: TileRect,
    radius: u32,
) -> BTreeSet<TilePosition> {
    tiles_in_radius(area, radius, |tile| {
        terrain.flag(tile, TileFlag::Buildable) || landmark == Some(tile)
    })
}

/// Tiles around an area that carry the wood-resource flag.
pub fn resource_tiles_in_radius(
    terrain: &dyn TerrainSource,
    area: TileRect,
    radius: u32,
) -> BTreeSet<TilePosition> {
    tiles_in_radius(area, radius, |tile| {
        terrain.flag(tile, TileFlag::WoodResource)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::MapTerrain;
    use rover_colony_core::{LayerId, TileRectSize};

    #[test]
    fn zero_radius_single_tile_covers_itself() {
        let area = TileRect::single(TilePosition::new(4, 4));
        let tiles = tiles_in_radius(area, 0, |_| true);
        assert!(tiles.contains(&TilePosition::new(4, 4)));
    }

    #[test]
    fn footprint_is_symmetric_under_half_turn() {
        let area =
            TileRect::from_origin_and_size(TilePosition::new(2, 3), TileRectSize::new(3, 2));
        let tiles = tiles_in_radius(area, 2, |_| true);

        // Reflect every tile through the footprint center; the uniform
        // predicate must keep the set closed under the rotation.
        let center = area.center();
        for tile in &tiles {
            let mirrored = TilePosition::new(
                (2.0 * center.0 - tile.x() as f64).round() as i32,
                (2.0 * center.1 - tile.y() as f64).round() as i32,
            );
            assert!(
                tiles.contains(&mirrored),
                "{tile:?} mirrored to {mirrored:?} escaped the footprint"
            );
        }
    }

    #[test]
    fn predicate_filters_candidates() {
        let area = TileRect::single(TilePosition::new(0, 0));
        let tiles = tiles_in_radius(area, 3, |tile| tile.x() >= 0);
        assert!(tiles.iter().all(|tile| tile.x() >= 0));
        assert!(tiles.contains(&TilePosition::new(2, 0)));
    }

    #[test]
    fn landmark_counts_as_valid() {
        let mut terrain = MapTerrain::new();
        terrain.insert_tile(TilePosition::new(0, 0), LayerId::new(0), &[TileFlag::Buildable]);
        terrain.insert_tile(TilePosition::new(1, 0), LayerId::new(0), &[]);

        let area = TileRect::single(TilePosition::new(0, 0));
        let without = valid_tiles_in_radius(&terrain, None, area, 2);
        assert!(!without.contains(&TilePosition::new(1, 0)));

        let with = valid_tiles_in_radius(&terrain, Some(TilePosition::new(1, 0)), area, 2);
        assert!(with.contains(&TilePosition::new(1, 0)));
    }

    #[test]
    fn resource_query_only_reports_wood() {
        let mut terrain = MapTerrain::new();
        terrain.insert_tile(
            TilePosition::new(1, 1),
            LayerId::new(0),
            &[TileFlag::WoodResource],
        );
        terrain.insert_tile(TilePosition::new(2, 1), LayerId::new(0), &[TileFlag::Buildable]);

        let area = TileRect::single(TilePosition::new(1, 1));
        let tiles = resource_tiles_in_radius(&terrain, area, 2);
        assert!(tiles.contains(&TilePosition::new(1, 1)));
        assert!(!tiles.contains(&TilePosition::new(2, 1)));
    }
}
