//! Validation of unit actions that depend on terrain geometry: melee
//! reach, thrown arcs and doors.

use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use crate::battlefield::Battlefield;
use crate::collision::{VoxelFilter, VoxelHit};
use crate::constants::{MAX_THROW_CURVATURE, THROW_CURVATURE_STEP, TILE_VOXELS_Z};
use crate::geometry::{tile_of_voxel, voxel_of_tile, BigWall, Direction};
use crate::tiles::{DoorKind, TilePart};
use crate::units::UnitId;

/// Terrain at or below this level counts as a staircase step.
const STAIRS_TERRAIN_LEVEL: i32 = -16;

/// A unit standing this deep in terrain checks doors on the level above.
const DOOR_STAIRS_LEVEL: i32 = -12;

/// A throw that lands on its target tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowArc {
    pub curvature: f64,
    pub origin: IVec3,
    pub target: IVec3,
    pub landing: IVec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorOutcome {
    NoDoor,
    /// A hinged door swung open
    Opened,
    /// A sliding door and its neighbours along the wall slid open
    SlidingOpened,
    NotEnoughTime,
    /// Someone else stands in the doorway
    Blocked,
}

/// Horizontal distance in voxels an item of `weight` thrown with `strength`
/// can cover, starting `height` voxels above the landing surface.
pub fn max_throw_distance(weight: i32, strength: i32, height: i32) -> i32 {
    let drop = f64::from(50 * weight / strength.max(1)) / 100.0;
    let mut z = f64::from(height) + 0.5;
    let mut dz = 1.0_f64;
    let mut dist = 0.0_f64;
    while dist < 4000.0 {
        dist += 8.0;
        z += dz * 8.0;
        if z < 0.0 && dz < 0.0 {
            // roll back to where the item crossed the surface
            dz = dz.max(-1.0);
            dist -= z / dz;
            break;
        }
        dz -= drop;
        if dz <= -2.0 {
            break;
        }
    }
    dist as i32
}

impl Battlefield {
    /// Whether `attacker` can strike the tile next to it in `direction`.
    /// With `target` set, only that unit counts. A neighbour one step up
    /// or down a staircase is reached too.
    pub fn valid_melee_range(
        &self,
        attacker: UnitId,
        direction: Direction,
        target: Option<UnitId>,
    ) -> bool {
        let Some(unit) = self.unit(attacker) else {
            return false;
        };
        if direction.is_vertical() {
            return false;
        }
        let step = direction.to_vector();
        let size = unit.size.max(1);
        for x in 0..size {
            for y in 0..size {
                let origin_tile = unit.position + IVec3::new(x, y, 0);
                let mut reach = origin_tile + step;
                if !self.contains(reach) || !self.contains(origin_tile) {
                    continue;
                }
                let above = reach + IVec3::Z;
                let below = reach - IVec3::Z;
                if self.terrain_level(origin_tile) <= STAIRS_TERRAIN_LEVEL
                    && self.contains(above)
                    && !self.has_no_floor(above)
                {
                    reach = above;
                } else if self.contains(below)
                    && self.has_no_floor(reach)
                    && self.unit_at(reach).is_none()
                    && self.terrain_level(below) <= STAIRS_TERRAIN_LEVEL
                {
                    reach = below;
                }

                let Some(occupant) = self.unit_at(reach) else {
                    continue;
                };
                if target.is_some_and(|wanted| wanted != occupant) || occupant == attacker {
                    continue;
                }
                let mut chest = voxel_of_tile(unit.position)
                    + IVec3::new(
                        8,
                        8,
                        unit.current_height() + unit.float_height - 4 - self.terrain_level(origin_tile),
                    );
                if size > 1 {
                    chest += IVec3::new(8, 8, 0);
                }
                if self.can_target_unit(chest, reach, Some(attacker), None).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Find an arc for `thrower` to land an item of `weight` on `target`.
    /// The gentlest curvature that lands on the tile wins.
    pub fn validate_throw(&self, thrower: UnitId, target: IVec3, weight: i32) -> Option<ThrowArc> {
        let unit = self.unit(thrower)?;
        self.tile(target)?;
        if let Some(content) = self.part_at(target, TilePart::Content) {
            let obstructs = matches!(
                content.big_wall,
                BigWall::None | BigWall::Block | BigWall::Nesw | BigWall::Nwse
            );
            if content.walk_cost >= 255 && obstructs {
                return None;
            }
        }
        let holds_items = (0..=target.z)
            .rev()
            .any(|z| !self.has_no_floor(IVec3::new(target.x, target.y, z)));
        if !holds_items {
            return None;
        }

        let origin = self.firing_origin_voxel(unit, target, true);
        let aim = voxel_of_tile(target) + IVec3::new(8, 8, 2 - self.terrain_level(target));

        let d = target - unit.position;
        let tiles = f64::from(d.x * d.x + d.y * d.y + d.z * d.z).sqrt();
        let height = origin.z - (target.z * TILE_VOXELS_Z + 2 - self.terrain_level(target));
        let reach = f64::from(max_throw_distance(weight, unit.strength, height) + 8) / 16.0;
        if tiles > reach {
            return None;
        }

        let filter = VoxelFilter::excluding(thrower);
        let ratio = f64::from(unit.strength) / f64::from(weight.max(1));
        let mut curvature = (1.73 / ratio.sqrt().sqrt()).max(0.48);
        if unit.kneeling {
            curvature += 0.1;
        }
        while curvature < MAX_THROW_CURVATURE {
            let arc = self.trace_parabola(origin, aim, curvature, &filter);
            if arc.hit != VoxelHit::OutOfBounds {
                if let Some(end) = arc.impact.or(arc.path.last().copied()) {
                    let landing = tile_of_voxel(end);
                    if landing == target {
                        return Some(ThrowArc {
                            curvature,
                            origin,
                            target: aim,
                            landing,
                        });
                    }
                }
            }
            curvature += THROW_CURVATURE_STEP;
        }
        None
    }

    /// Open the door `unit` faces in `direction`. Time is charged at the
    /// door's walking cost; everyone near the unit gets a fresh view.
    pub fn open_door(&mut self, unit: UnitId, direction: Direction) -> DoorOutcome {
        let Some(opener) = self.unit(unit) else {
            return DoorOutcome::NoDoor;
        };
        let raised = if self.terrain_level(opener.position) < DOOR_STAIRS_LEVEL { 1 } else { 0 };
        let size = opener.size.max(1);
        let position = opener.position;
        let time_units = opener.time_units;

        for x in 0..size {
            for y in 0..size {
                let base = position + IVec3::new(x, y, raised);
                if !self.contains(base) {
                    continue;
                }
                for (offset, slot) in door_checks(direction, x, y) {
                    let pos = base + offset;
                    let Some(part) = self.part_at(pos, slot) else {
                        continue;
                    };
                    let kind = part.door;
                    let cost = part.walk_cost;
                    let opened_into = part.opened_into;
                    let already_open = self.tile(pos).is_some_and(|t| t.is_sliding_open(slot));
                    if kind == DoorKind::None || (kind == DoorKind::Sliding && already_open) {
                        continue;
                    }
                    if self.unit_at(pos).is_some_and(|other| other != unit) {
                        return DoorOutcome::Blocked;
                    }
                    if time_units < cost {
                        return DoorOutcome::NotEnoughTime;
                    }

                    let outcome = match kind {
                        DoorKind::Hinged => {
                            if let Some(tile) = self.tile_mut(pos) {
                                tile.set_part(slot, opened_into);
                            }
                            DoorOutcome::Opened
                        }
                        _ => {
                            self.slide_doors_open(pos, slot);
                            DoorOutcome::SlidingOpened
                        }
                    };
                    if let Some(opener) = self.unit_mut(unit) {
                        opener.spend_time_units(cost);
                    }
                    tracing::debug!(unit = unit.0, x = pos.x, y = pos.y, z = pos.z, ?outcome, "door opened");
                    self.recalculate_fov_near(position);
                    return outcome;
                }
            }
        }
        DoorOutcome::NoDoor
    }

    /// Slide a door open along with the sliding parts continuing its wall.
    fn slide_doors_open(&mut self, pos: IVec3, slot: TilePart) {
        let along = if slot == TilePart::WestWall { IVec3::Y } else { IVec3::X };
        if let Some(tile) = self.tile_mut(pos) {
            tile.set_sliding_open(slot, true);
        }
        for sign in [1, -1] {
            let mut next = pos + along * sign;
            while self
                .part_at(next, slot)
                .is_some_and(|part| part.door == DoorKind::Sliding)
            {
                if let Some(tile) = self.tile_mut(next) {
                    tile.set_sliding_open(slot, true);
                }
                next += along * sign;
            }
        }
    }

    /// Close every open sliding door whose tile nobody stands on. Returns
    /// how many closed.
    pub fn close_sliding_doors(&mut self) -> usize {
        let mut closed = 0;
        let positions: Vec<IVec3> = self.grid.positions().collect();
        for pos in positions {
            if self.unit_at(pos).is_some() {
                continue;
            }
            for slot in TilePart::ALL {
                let sliding = self
                    .part_at(pos, slot)
                    .is_some_and(|part| part.door == DoorKind::Sliding);
                let Some(tile) = self.tile_mut(pos) else {
                    continue;
                };
                if sliding && tile.is_sliding_open(slot) {
                    tile.set_sliding_open(slot, false);
                    closed += 1;
                }
            }
        }
        if closed > 0 {
            tracing::debug!(closed, "sliding doors closed");
        }
        closed
    }
}

/// Wall slots to try, relative to the unit's tile, when opening a door
/// toward `direction`. `x` and `y` locate the tile within a large unit.
fn door_checks(direction: Direction, x: i32, y: i32) -> Vec<(IVec3, TilePart)> {
    let here = IVec3::ZERO;
    let mut checks = Vec::new();
    match direction {
        Direction::North => {
            checks.push((here, TilePart::NorthWall));
            if x != 0 {
                checks.push((IVec3::new(0, -1, 0), TilePart::WestWall));
            }
        }
        Direction::NorthEast => {
            checks.push((here, TilePart::NorthWall));
            checks.push((IVec3::new(1, -1, 0), TilePart::WestWall));
        }
        Direction::East => checks.push((IVec3::new(1, 0, 0), TilePart::WestWall)),
        Direction::SouthEast => {
            if y == 0 {
                checks.push((IVec3::new(1, 1, 0), TilePart::WestWall));
            }
            if x == 0 {
                checks.push((IVec3::new(1, 1, 0), TilePart::NorthWall));
            }
        }
        Direction::South => checks.push((IVec3::new(0, 1, 0), TilePart::NorthWall)),
        Direction::SouthWest => {
            checks.push((here, TilePart::WestWall));
            checks.push((IVec3::new(-1, 1, 0), TilePart::NorthWall));
        }
        Direction::West => {
            checks.push((here, TilePart::WestWall));
            if y != 0 {
                checks.push((IVec3::new(-1, 0, 0), TilePart::NorthWall));
            }
        }
        Direction::NorthWest => {
            checks.push((here, TilePart::WestWall));
            checks.push((here, TilePart::NorthWall));
            if x != 0 {
                checks.push((IVec3::new(-1, -1, 0), TilePart::WestWall));
            }
            if y != 0 {
                checks.push((IVec3::new(-1, -1, 0), TilePart::NorthWall));
            }
        }
        Direction::Up | Direction::Down => {}
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::fixtures::open_field;
    use crate::units::{BattleUnit, Faction};

    #[test]
    fn test_max_throw_distance() {
        // 0.5 drop per step, falls below -2 after six steps
        assert_eq!(max_throw_distance(30, 30, 16), 48);
        assert!(max_throw_distance(3, 30, 16) > max_throw_distance(30, 30, 16));
        // zero strength is treated as one
        assert!(max_throw_distance(1, 0, 16) > 0);
    }

    #[test]
    fn test_melee_adjacent_target() {
        let (mut field, parts) = open_field(IVec3::new(5, 3, 1));
        let attacker = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Hostile).facing(Direction::East))
            .unwrap();
        assert!(!field.valid_melee_range(attacker, Direction::East, None));

        let victim = field
            .add_unit(BattleUnit::new("b", IVec3::new(2, 1, 0), Faction::Player))
            .unwrap();
        assert!(field.valid_melee_range(attacker, Direction::East, None));
        assert!(field.valid_melee_range(attacker, Direction::East, Some(victim)));
        assert!(!field.valid_melee_range(attacker, Direction::East, Some(attacker)));
        assert!(!field.valid_melee_range(attacker, Direction::West, None));
        assert!(!field.valid_melee_range(attacker, Direction::Up, None));

        field
            .set_part(IVec3::new(2, 1, 0), TilePart::WestWall, Some(parts.brick_west))
            .unwrap();
        assert!(!field.valid_melee_range(attacker, Direction::East, Some(victim)));
    }

    #[test]
    fn test_throw_within_reach() {
        let (mut field, _) = open_field(IVec3::new(10, 3, 1));
        let thrower = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Player))
            .unwrap();
        let arc = field.validate_throw(thrower, IVec3::new(4, 1, 0), 3).unwrap();
        assert_eq!(arc.landing, IVec3::new(4, 1, 0));
        assert!(arc.curvature >= 0.48 && arc.curvature < MAX_THROW_CURVATURE);
        assert_eq!(arc.origin, IVec3::new(24, 24, 18));
    }

    #[test]
    fn test_throw_rejections() {
        let (mut field, parts) = open_field(IVec3::new(10, 3, 1));
        let thrower = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Player))
            .unwrap();
        // a heavy item drops short
        assert!(field.validate_throw(thrower, IVec3::new(7, 1, 0), 30).is_none());

        field
            .set_part(IVec3::new(4, 1, 0), TilePart::Content, Some(parts.rock))
            .unwrap();
        assert!(field.validate_throw(thrower, IVec3::new(4, 1, 0), 3).is_none());

        field.set_part(IVec3::new(5, 1, 0), TilePart::Floor, None).unwrap();
        assert!(field.validate_throw(thrower, IVec3::new(5, 1, 0), 3).is_none());
        assert!(field.validate_throw(thrower, IVec3::new(40, 1, 0), 3).is_none());
    }

    #[test]
    fn test_open_hinged_door() {
        let (mut field, parts) = open_field(IVec3::new(5, 3, 1));
        let door = IVec3::new(2, 1, 0);
        field.set_part(door, TilePart::WestWall, Some(parts.door_west)).unwrap();
        let id = field
            .add_unit(BattleUnit::new("a", door, Faction::Player).facing(Direction::West))
            .unwrap();

        assert_eq!(field.open_door(id, Direction::East), DoorOutcome::NoDoor);

        field.unit_mut(id).unwrap().time_units = 2;
        assert_eq!(field.open_door(id, Direction::West), DoorOutcome::NotEnoughTime);
        assert_eq!(field.tile(door).unwrap().part(TilePart::WestWall), Some(parts.door_west));

        field.unit_mut(id).unwrap().time_units = 60;
        assert_eq!(field.open_door(id, Direction::West), DoorOutcome::Opened);
        assert_eq!(field.tile(door).unwrap().part(TilePart::WestWall), Some(parts.door_west_open));
        assert_eq!(field.unit(id).unwrap().time_units, 56);
    }

    #[test]
    fn test_sliding_doors_open_together_and_close() {
        let (mut field, parts) = open_field(IVec3::new(6, 4, 1));
        for x in 1..=3 {
            field
                .set_part(IVec3::new(x, 2, 0), TilePart::NorthWall, Some(parts.sliding_door_north))
                .unwrap();
        }
        let id = field
            .add_unit(BattleUnit::new("a", IVec3::new(2, 1, 0), Faction::Player))
            .unwrap();
        assert_eq!(field.open_door(id, Direction::South), DoorOutcome::SlidingOpened);
        for x in 1..=3 {
            assert!(field.tile(IVec3::new(x, 2, 0)).unwrap().is_sliding_open(TilePart::NorthWall));
        }
        // an open door is not opened twice
        assert_eq!(field.open_door(id, Direction::South), DoorOutcome::NoDoor);

        field
            .add_unit(BattleUnit::new("b", IVec3::new(3, 2, 0), Faction::Player))
            .unwrap();
        assert_eq!(field.close_sliding_doors(), 2);
        assert!(field.tile(IVec3::new(3, 2, 0)).unwrap().is_sliding_open(TilePart::NorthWall));
        assert!(!field.tile(IVec3::new(1, 2, 0)).unwrap().is_sliding_open(TilePart::NorthWall));
    }

    #[test]
    fn test_door_blocked_by_other_unit() {
        let (mut field, parts) = open_field(IVec3::new(5, 4, 1));
        field
            .set_part(IVec3::new(2, 2, 0), TilePart::NorthWall, Some(parts.sliding_door_north))
            .unwrap();
        let id = field
            .add_unit(BattleUnit::new("a", IVec3::new(2, 1, 0), Faction::Player))
            .unwrap();
        field
            .add_unit(BattleUnit::new("b", IVec3::new(2, 2, 0), Faction::Hostile))
            .unwrap();
        assert_eq!(field.open_door(id, Direction::South), DoorOutcome::Blocked);
        assert!(!field.tile(IVec3::new(2, 2, 0)).unwrap().is_sliding_open(TilePart::NorthWall));
    }
}
