//! Target acquisition: picking a voxel on a unit or tile part that a ray
//! from a given origin actually reaches.

use bevy::math::IVec3;

use crate::battlefield::Battlefield;
use crate::collision::{VoxelFilter, VoxelHit};
use crate::constants::{
    EYE_OFFSET, HEIGHT_FROM_CENTER, MUZZLE_OFFSET, TILE_VOXELS_XY, TILE_VOXELS_Z, UNIT_SCAN_RADIUS,
};
use crate::geometry::{direction_to, tile_of_voxel, voxel_of_tile};
use crate::tiles::TilePart;
use crate::units::{BattleUnit, UnitId};

// =====================================================
// Scan patterns
// =====================================================

/// Sub-tile (x, y) points scanned on an object or floor, innermost ring first.
const OBJECT_SPIRAL: [(i32, i32); 41] = [
    (8, 8), (8, 6), (10, 6), (10, 8), (10, 10), (8, 10), (6, 10), (6, 8), (6, 6),
    (8, 4), (10, 4), (12, 4), (12, 6), (12, 8), (12, 10), (12, 12), (10, 12), (8, 12),
    (6, 12), (4, 12), (4, 10), (4, 8), (4, 6), (4, 4), (6, 4),
    (8, 1), (12, 1), (15, 1), (15, 4), (15, 8), (15, 12), (15, 15), (12, 15), (8, 15),
    (4, 15), (1, 15), (1, 12), (1, 8), (1, 4), (1, 1), (4, 1),
];

const WEST_WALL_SPIRAL: [(i32, i32); 7] = [(0, 7), (0, 9), (0, 6), (0, 11), (0, 4), (0, 13), (0, 2)];

const NORTH_WALL_SPIRAL: [(i32, i32); 7] = [(7, 0), (9, 0), (6, 0), (11, 0), (4, 0), (13, 0), (2, 0)];

/// Muzzle position within the tile per facing, north first.
const MUZZLE_X: [i32; 8] = [9, 15, 15, 13, 8, 1, 1, 3];
const MUZZLE_Y: [i32; 8] = [1, 3, 9, 15, 15, 13, 7, 1];

impl Battlefield {
    /// Voxel the unit looks from.
    pub fn sight_origin_voxel(&self, unit: &BattleUnit) -> IVec3 {
        let mut origin = voxel_of_tile(unit.position) + IVec3::new(7, 8, 0);
        origin.z += unit.current_height() + unit.float_height - self.terrain_level(unit.position)
            - EYE_OFFSET;
        if unit.size > 1 {
            origin.x += 8;
            origin.y += 8;
        }
        self.below_ceiling(unit.position, origin)
    }

    /// Voxel a shot or throw leaves from when aimed at `target`.
    pub fn firing_origin_voxel(&self, shooter: &BattleUnit, target: IVec3, throwing: bool) -> IVec3 {
        let mut origin = voxel_of_tile(shooter.position);
        if throwing {
            origin += IVec3::new(8, 8, 0);
        } else {
            let facing = direction_to(shooter.position, target).index();
            origin += IVec3::new(MUZZLE_X[facing], MUZZLE_Y[facing], 0);
        }
        origin.z += shooter.current_height() + shooter.float_height
            - self.terrain_level(shooter.position)
            - MUZZLE_OFFSET;
        if shooter.size > 1 {
            origin.x += 8;
            origin.y += 8;
        }
        self.below_ceiling(shooter.position, origin)
    }

    /// Keep a head-height voxel out of the floor of the level above.
    fn below_ceiling(&self, tile: IVec3, mut voxel: IVec3) -> IVec3 {
        let above = tile + IVec3::Z;
        let roofed = self
            .part_at(above, TilePart::Floor)
            .is_some_and(|floor| !floor.no_floor);
        if roofed {
            voxel.z = voxel.z.min(above.z * TILE_VOXELS_Z - 1);
        }
        voxel
    }

    /// Find a voxel on the unit standing on `tile` that a ray from `origin` hits
    /// first. With no unit there, `potential` is tested as if it stood on the
    /// tile, and an unobstructed ray counts as reaching it.
    pub fn can_target_unit(
        &self,
        origin: IVec3,
        tile: IVec3,
        exclude: Option<UnitId>,
        potential: Option<&BattleUnit>,
    ) -> Option<IVec3> {
        let present = self.unit_at(tile).and_then(|id| self.unit(id));
        let hypothetical = present.is_none();
        let target = present.or(potential)?;
        let anchor = if hypothetical { tile } else { target.position };

        let base = voxel_of_tile(anchor);
        let min_z = base.z - self.terrain_level(anchor) + target.float_height;
        let max_z = min_z + target.current_height();
        let center_z = (min_z + max_z) / 2;
        let height_range = ((max_z - min_z) / 2).clamp(0, 10) as usize;

        let filter = VoxelFilter {
            exclude,
            ..Default::default()
        };
        let size = target.size.max(1);
        for fx in 0..size {
            for fy in 0..size {
                let column = base + IVec3::new(fx * TILE_VOXELS_XY + 7, fy * TILE_VOXELS_XY + 8, 0);
                let rel = column - origin;
                let flat = f64::from(rel.x * rel.x + rel.y * rel.y).sqrt();
                let (side_x, side_y) = if flat == 0.0 {
                    (0, 0)
                } else {
                    let scale = f64::from(UNIT_SCAN_RADIUS) / flat;
                    (
                        (f64::from(rel.y) * scale).round() as i32,
                        (f64::from(-rel.x) * scale).round() as i32,
                    )
                };
                // centre, both flanks, then the near and far edge
                let slices = [
                    (0, 0),
                    (side_x, side_y),
                    (-side_x, -side_y),
                    (side_y, -side_x),
                    (-side_y, side_x),
                ];
                for offset in HEIGHT_FROM_CENTER.iter().take(height_range + 1) {
                    for (sx, sy) in slices {
                        let scan = IVec3::new(column.x + sx, column.y + sy, center_z + offset);
                        let trace = self.trace_voxels(origin, scan, &filter, false);
                        match (trace.hit, trace.impact) {
                            (VoxelHit::Unit(hit), Some(impact))
                                if !hypothetical && hit == target.id =>
                            {
                                // a head poking into the level above still counts
                                let hit_tile = tile_of_voxel(impact);
                                let on_body = target.occupies(IVec3::new(
                                    hit_tile.x,
                                    hit_tile.y,
                                    target.position.z,
                                ));
                                if on_body && (min_z..=max_z).contains(&impact.z) {
                                    return Some(scan);
                                }
                            }
                            (VoxelHit::Empty, _) if hypothetical => return Some(scan),
                            _ => {}
                        }
                    }
                }
            }
        }
        None
    }

    /// Find a voxel of the given part of `tile` that a ray from `origin` hits.
    /// The part's vertical extent is located first, then scanned outward
    /// from its middle.
    pub fn can_target_tile(
        &self,
        origin: IVec3,
        tile: IVec3,
        part: TilePart,
        exclude: Option<UnitId>,
    ) -> Option<IVec3> {
        self.part_at(tile, part)?;
        let spiral: &[(i32, i32)] = match part {
            TilePart::WestWall => &WEST_WALL_SPIRAL,
            TilePart::NorthWall => &NORTH_WALL_SPIRAL,
            TilePart::Floor | TilePart::Content => &OBJECT_SPIRAL,
        };
        let base = voxel_of_tile(tile);
        let wanted = VoxelHit::from_part(part);
        let terrain = VoxelFilter::terrain_only();
        let solid_at = |z: i32| {
            spiral.iter().any(|(x, y)| {
                self.voxel_check(base + IVec3::new(*x, *y, z), &terrain) == wanted
            })
        };

        let (min_z, max_z) = if part == TilePart::Floor {
            (0, 0)
        } else {
            let min_z = (1..12).map(|j| j * 2).find(|z| solid_at(*z))?;
            let max_z = (0..=10).rev().map(|j| j * 2).find(|z| solid_at(*z))?;
            (min_z.min(max_z), max_z)
        };
        let center_z = (min_z + max_z) / 2;
        let range = (max_z - min_z).clamp(0, HEIGHT_FROM_CENTER.len() as i32 - 1) as usize;

        let filter = VoxelFilter {
            exclude,
            ..Default::default()
        };
        for offset in HEIGHT_FROM_CENTER.iter().take(range + 1) {
            for (x, y) in spiral {
                let scan = base + IVec3::new(*x, *y, center_z + offset);
                let trace = self.trace_voxels(origin, scan, &filter, false);
                if trace.hit == wanted && trace.impact.map(tile_of_voxel) == Some(tile) {
                    return Some(scan);
                }
            }
        }
        None
    }

    /// Whether `shooter` has a clear shot at anything on `tile`: its unit,
    /// else its content, walls or floor.
    pub fn can_shot_reach(&self, shooter: UnitId, tile: IVec3) -> bool {
        let Some(unit) = self.unit(shooter) else {
            return false;
        };
        if !self.contains(tile) {
            return false;
        }
        let origin = self.firing_origin_voxel(unit, tile, false);
        let exclude = Some(shooter);
        match self.unit_at(tile) {
            Some(id) if id != shooter => self.can_target_unit(origin, tile, exclude, None).is_some(),
            _ => [
                TilePart::Content,
                TilePart::WestWall,
                TilePart::NorthWall,
                TilePart::Floor,
            ]
            .into_iter()
            .any(|part| self.can_target_tile(origin, tile, part, exclude).is_some()),
        }
    }
}
