//! Voxel collision: what occupies a single voxel.
//!
//! Terrain parts and unit bodies are tested against their line-of-fire
//! templates. Nothing here mutates the battlefield.

use bevy::math::IVec3;

use crate::battlefield::Battlefield;
use crate::constants::{TILE_VOXELS_XY, TILE_VOXELS_Z};
use crate::geometry::tile_of_voxel;
use crate::tiles::TilePart;
use crate::units::UnitId;

/// Classification of one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelHit {
    Empty,
    Floor,
    WestWall,
    NorthWall,
    Content,
    Unit(UnitId),
    OutOfBounds,
}

impl VoxelHit {
    pub fn from_part(part: TilePart) -> Self {
        match part {
            TilePart::Floor => VoxelHit::Floor,
            TilePart::WestWall => VoxelHit::WestWall,
            TilePart::NorthWall => VoxelHit::NorthWall,
            TilePart::Content => VoxelHit::Content,
        }
    }

    pub fn part(self) -> Option<TilePart> {
        match self {
            VoxelHit::Floor => Some(TilePart::Floor),
            VoxelHit::WestWall => Some(TilePart::WestWall),
            VoxelHit::NorthWall => Some(TilePart::NorthWall),
            VoxelHit::Content => Some(TilePart::Content),
            _ => None,
        }
    }

    pub fn unit(self) -> Option<UnitId> {
        match self {
            VoxelHit::Unit(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self == VoxelHit::Empty
    }
}

/// Which units a voxel test should see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoxelFilter {
    /// Never report this unit (usually the shooter)
    pub exclude: Option<UnitId>,
    /// Report only this unit; other units are transparent
    pub only: Option<UnitId>,
    pub ignore_units: bool,
    /// Units not seen by the player are transparent
    pub only_visible: bool,
}

impl VoxelFilter {
    pub fn excluding(unit: UnitId) -> Self {
        Self {
            exclude: Some(unit),
            ..Default::default()
        }
    }

    pub fn terrain_only() -> Self {
        Self {
            ignore_units: true,
            ..Default::default()
        }
    }

    fn admits(&self, unit: UnitId, visible: bool) -> bool {
        !self.ignore_units
            && self.exclude != Some(unit)
            && self.only.map_or(true, |only| only == unit)
            && (!self.only_visible || visible)
    }
}

impl Battlefield {
    /// Classify the voxel. Parts are tested in slot order, then units.
    pub fn voxel_check(&self, voxel: IVec3, filter: &VoxelFilter) -> VoxelHit {
        if voxel.cmplt(IVec3::ZERO).any() {
            return VoxelHit::OutOfBounds;
        }
        let pos = tile_of_voxel(voxel);
        let Some(tile) = self.tile(pos) else {
            return VoxelHit::OutOfBounds;
        };

        let below = pos - IVec3::Z;
        let unit_below = self.tile(below).and_then(|t| t.unit());
        if tile.is_void() && unit_below.is_none() {
            return VoxelHit::Empty;
        }

        let layer = (voxel.z.rem_euclid(TILE_VOXELS_Z) / 2) as usize;
        let sub_x = voxel.x.rem_euclid(TILE_VOXELS_XY);
        let sub_y = voxel.y.rem_euclid(TILE_VOXELS_XY);
        for slot in TilePart::ALL {
            let Some(part) = self.part_at(pos, slot) else {
                continue;
            };
            let template = part.loft.get(layer).copied().unwrap_or(0);
            if !tile.is_sliding_open(slot) && self.lofts.is_solid(template, sub_x, sub_y) {
                return VoxelHit::from_part(slot);
            }
        }

        // a unit on the tile below can poke its head up into a floorless tile
        let occupant = match tile.unit() {
            Some(id) => Some(id),
            None if self.part_at(pos, TilePart::Floor).is_none() => unit_below,
            None => None,
        };
        if let Some(hit) = occupant.and_then(|id| self.unit_voxel_hit(id, voxel, filter)) {
            return hit;
        }
        VoxelHit::Empty
    }

    fn unit_voxel_hit(&self, id: UnitId, voxel: IVec3, filter: &VoxelFilter) -> Option<VoxelHit> {
        let unit = self.unit(id)?;
        if !filter.admits(id, unit.visible) {
            return None;
        }
        let bottom = unit.position.z * TILE_VOXELS_Z + unit.float_height
            - self.terrain_level(unit.position);
        if voxel.z <= bottom || voxel.z > bottom + unit.current_height() {
            return None;
        }
        let tile = tile_of_voxel(voxel);
        let dx = tile.x - unit.position.x;
        let dy = tile.y - unit.position.y;
        if !(0..unit.size.max(1)).contains(&dx) || !(0..unit.size.max(1)).contains(&dy) {
            return None;
        }
        let sub_x = voxel.x.rem_euclid(TILE_VOXELS_XY);
        let sub_y = voxel.y.rem_euclid(TILE_VOXELS_XY);
        self.lofts
            .is_solid(unit.loft, sub_x, sub_y)
            .then_some(VoxelHit::Unit(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::fixtures::open_field;
    use crate::geometry::BigWall;
    use crate::units::{BattleUnit, Faction};

    #[test]
    fn test_negative_and_outside_voxels() {
        let (field, _) = open_field(IVec3::new(3, 3, 1));
        let filter = VoxelFilter::default();
        assert_eq!(field.voxel_check(IVec3::new(-1, 5, 5), &filter), VoxelHit::OutOfBounds);
        assert_eq!(field.voxel_check(IVec3::new(48, 5, 5), &filter), VoxelHit::OutOfBounds);
    }

    #[test]
    fn test_floor_and_air() {
        let (field, _) = open_field(IVec3::new(3, 3, 1));
        let filter = VoxelFilter::default();
        assert_eq!(field.voxel_check(IVec3::new(20, 20, 0), &filter), VoxelHit::Floor);
        assert_eq!(field.voxel_check(IVec3::new(20, 20, 1), &filter), VoxelHit::Floor);
        assert_eq!(field.voxel_check(IVec3::new(20, 20, 2), &filter), VoxelHit::Empty);
    }

    #[test]
    fn test_walls_use_templates() {
        let (mut field, parts) = open_field(IVec3::new(3, 3, 1));
        let pos = IVec3::new(1, 1, 0);
        field.set_part(pos, TilePart::WestWall, Some(parts.brick_west)).unwrap();
        let filter = VoxelFilter::default();
        assert_eq!(field.voxel_check(IVec3::new(16, 20, 10), &filter), VoxelHit::WestWall);
        assert_eq!(field.voxel_check(IVec3::new(17, 20, 10), &filter), VoxelHit::WestWall);
        assert_eq!(field.voxel_check(IVec3::new(18, 20, 10), &filter), VoxelHit::Empty);
    }

    #[test]
    fn test_diagonal_content_is_thin() {
        let (mut field, parts) = open_field(IVec3::new(3, 3, 1));
        field
            .set_part(IVec3::new(1, 1, 0), TilePart::Content, Some(parts.fence_nesw))
            .unwrap();
        assert_eq!(field.part_at(IVec3::new(1, 1, 0), TilePart::Content).unwrap().big_wall, BigWall::Nesw);
        let filter = VoxelFilter::default();
        // sub-tile (15, 0) lies on the NE-SW diagonal, (0, 0) does not
        assert_eq!(field.voxel_check(IVec3::new(31, 16, 12), &filter), VoxelHit::Content);
        assert_eq!(field.voxel_check(IVec3::new(16, 16, 12), &filter), VoxelHit::Empty);
    }

    #[test]
    fn test_unit_body_and_filters() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 1));
        let id = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Player))
            .unwrap();
        let body = IVec3::new(23, 24, 12);
        assert_eq!(field.voxel_check(body, &VoxelFilter::default()), VoxelHit::Unit(id));
        assert_eq!(field.voxel_check(body, &VoxelFilter::excluding(id)), VoxelHit::Empty);
        assert_eq!(field.voxel_check(body, &VoxelFilter::terrain_only()), VoxelHit::Empty);
        // above the head
        assert_eq!(field.voxel_check(IVec3::new(23, 24, 23), &VoxelFilter::default()), VoxelHit::Empty);
        // outside the silhouette
        assert_eq!(field.voxel_check(IVec3::new(16, 16, 12), &VoxelFilter::default()), VoxelHit::Empty);
    }

    #[test]
    fn test_tall_unit_pokes_into_floorless_tile_above() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 2));
        field.set_part(IVec3::new(1, 1, 1), TilePart::Floor, None).unwrap();
        let mut tall = BattleUnit::new("tall", IVec3::new(1, 1, 0), Faction::Hostile);
        tall.height = 30;
        let id = field.add_unit(tall).unwrap();
        assert_eq!(field.voxel_check(IVec3::new(23, 24, 28), &VoxelFilter::default()), VoxelHit::Unit(id));
        assert_eq!(field.voxel_check(IVec3::new(23, 24, 32), &VoxelFilter::default()), VoxelHit::Empty);
    }

    #[test]
    fn test_only_visible_filter() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 1));
        let id = field
            .add_unit(BattleUnit::new("alien", IVec3::new(0, 0, 0), Faction::Hostile))
            .unwrap();
        let filter = VoxelFilter {
            only_visible: true,
            ..Default::default()
        };
        assert_eq!(field.voxel_check(IVec3::new(7, 8, 10), &filter), VoxelHit::Empty);
        field.unit_mut(id).unwrap().visible = true;
        assert_eq!(field.voxel_check(IVec3::new(7, 8, 10), &filter), VoxelHit::Unit(id));
    }
}
