//! Explosions, terrain destruction, projectile impacts and gravity.
//!
//! A blast is cast as a fan of rays from its centre tile. Each ray loses
//! power every step and to whatever it crosses; the first time a ray enters
//! a tile its effects land there. Explosive blasts leave their power on the
//! tiles they reach, and after all rays are cast every such tile is
//! detonated against its parts' armor.

use std::collections::{HashSet, VecDeque};

use bevy::math::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::battlefield::Battlefield;
use crate::blockage::Phenomenon;
use crate::collision::{VoxelFilter, VoxelHit};
use crate::constants::{
    MAX_FIRE, RAY_BEARING_STEP, RAY_TILT_STEP, SMOKE_REFRESH_LIMIT, TILE_VOXELS_XY, TILE_VOXELS_Z,
};
use crate::geometry::{distance, tile_of_voxel, voxel_of_tile, BigWall, Direction};
use crate::logging::TimingSpan;
use crate::tiles::{PartId, TilePart};
use crate::units::{DamageType, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionRequest {
    /// Voxel at the centre of the blast
    pub center: IVec3,
    pub power: i32,
    pub phenomenon: Phenomenon,
    /// Maximum reach in tiles
    pub radius: i32,
    pub source: Option<UnitId>,
}

impl ExplosionRequest {
    pub fn new(center: IVec3, power: i32, phenomenon: Phenomenon, radius: i32) -> Self {
        Self {
            center,
            power,
            phenomenon,
            radius,
            source: None,
        }
    }

    pub fn from_unit(mut self, source: UnitId) -> Self {
        self.source = Some(source);
        self
    }

    /// Blast of a destroyed explosive part.
    fn terrain(tile: IVec3, power: i32) -> Self {
        Self::new(
            voxel_of_tile(tile) + IVec3::new(8, 8, TILE_VOXELS_Z / 2),
            power,
            Phenomenon::Explosive,
            (power / 10).max(1),
        )
    }
}

/// Everything one `explode` call changed, chained blasts included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplosionReport {
    /// Tiles reached by any ray, in the order first reached
    pub affected: Vec<IVec3>,
    pub destroyed: Vec<(IVec3, TilePart)>,
    pub damaged_units: Vec<(UnitId, i32)>,
    /// Blasts set off by destroyed explosive parts
    pub chained: Vec<ExplosionRequest>,
    pub floors_lost: bool,
}

/// Outcome of detonating one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detonation {
    pub destroyed: Vec<(IVec3, TilePart)>,
    pub chained: Vec<ExplosionRequest>,
    pub floors_lost: bool,
}

/// Outcome of a single projectile impact.
#[derive(Debug, Clone, PartialEq)]
pub struct HitOutcome {
    pub hit: VoxelHit,
    pub destroyed: Option<TilePart>,
    pub unit: Option<UnitId>,
    pub damage: i32,
    pub chained: Option<ExplosionReport>,
}

/// Tiles a ray passes at each unit of distance from `center` (in tiles),
/// starting with the centre tile itself.
pub fn sample_ray(center: DVec3, tilt: i32, bearing: i32, radius: i32) -> Vec<IVec3> {
    let (sin_fi, cos_fi) = f64::from(tilt).to_radians().sin_cos();
    let (sin_te, cos_te) = f64::from(bearing).to_radians().sin_cos();
    (0..=radius.max(0))
        .map(|l| {
            let l = f64::from(l);
            IVec3::new(
                (center.x + l * cos_te * cos_fi).floor() as i32,
                (center.y + l * sin_te * cos_fi).floor() as i32,
                (center.z + l * sin_fi).floor() as i32,
            )
        })
        .collect()
}

fn blast_center(voxel: IVec3) -> DVec3 {
    tile_of_voxel(voxel).as_dvec3() + DVec3::splat(0.5)
}

impl Battlefield {
    /// Power remaining on each tile a single ray enters, centre first. The
    /// walk ends when power runs out, the ray leaves the map or the radius
    /// is reached. Does not touch the battlefield.
    pub fn blast_ray(&self, request: &ExplosionRequest, tilt: i32, bearing: i32) -> Vec<(IVec3, i32)> {
        let mut power = request.power;
        if request.phenomenon == Phenomenon::Incendiary {
            power /= 2;
        }
        if power <= 0 || request.radius <= 0 {
            return Vec::new();
        }
        let origin = tile_of_voxel(request.center);
        if !self.contains(origin) {
            return Vec::new();
        }
        let decay = (power + request.radius - 1) / request.radius;
        let samples = sample_ray(blast_center(request.center), tilt, bearing, request.radius);

        let mut reached = vec![(origin, power)];
        let mut current = origin;
        for next in samples.into_iter().skip(1) {
            if !self.contains(next) {
                break;
            }
            power -= decay;
            if next != current {
                power -= self.config.tile_crossing_cost;
            }
            if next.z != current.z {
                power -= self.config.vertical_falloff();
            }
            if request.phenomenon == Phenomenon::Incendiary {
                let step = IVec3::new(next.x - current.x, next.y - current.y, 0);
                if Direction::from_vector(step).is_some_and(Direction::is_diagonal) {
                    power -= self.config.incendiary_diagonal_cost;
                }
            }
            if next != current {
                power -= 2 * self.crossing_blockage_from(
                    current,
                    next,
                    request.phenomenon,
                    current == origin,
                );
            }
            if power <= 0 {
                break;
            }
            reached.push((next, power));
            current = next;
        }
        reached
    }

    /// Cast a blast and everything it sets off. Lighting and every unit's
    /// view are rebuilt once at the end.
    pub fn explode(&mut self, request: ExplosionRequest) -> ExplosionReport {
        let _span = TimingSpan::new("explosion");
        let mut report = ExplosionReport::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([request]);
        while let Some(blast) = queue.pop_front() {
            tracing::debug!(
                power = blast.power,
                radius = blast.radius,
                x = blast.center.x,
                y = blast.center.y,
                z = blast.center.z,
                "explosion"
            );
            let chained = self.cast_blast(&blast, &mut report, &mut seen);
            report.chained.extend(chained.iter().copied());
            queue.extend(chained);
        }
        self.recalculate_lighting();
        self.recalculate_all_fov();
        report
    }

    fn cast_blast(
        &mut self,
        blast: &ExplosionRequest,
        report: &mut ExplosionReport,
        seen: &mut HashSet<IVec3>,
    ) -> Vec<ExplosionRequest> {
        let mut rays = Vec::new();
        for tilt in (-90..=90).step_by(RAY_TILT_STEP) {
            for bearing in (0..360).step_by(RAY_BEARING_STEP) {
                rays.push(self.blast_ray(blast, tilt, bearing));
            }
        }

        let ground_zero = tile_of_voxel(blast.center);
        let mut entered = HashSet::new();
        let mut order = Vec::new();
        for (pos, power) in rays.into_iter().flatten() {
            if blast.phenomenon == Phenomenon::Explosive {
                if let Some(tile) = self.tile_mut(pos) {
                    tile.mark_explosive(power);
                }
            }
            if entered.insert(pos) {
                order.push(pos);
                self.blast_effects(pos, power, blast.phenomenon, ground_zero, report);
            }
        }
        for pos in &order {
            if seen.insert(*pos) {
                report.affected.push(*pos);
            }
        }

        let mut chained = Vec::new();
        if blast.phenomenon == Phenomenon::Explosive {
            for pos in order {
                let detonation = self.detonate(pos);
                report.destroyed.extend(detonation.destroyed);
                report.floors_lost |= detonation.floors_lost;
                chained.extend(detonation.chained);
                self.apply_gravity(pos);
                self.apply_gravity(pos + IVec3::Z);
            }
        }
        chained
    }

    fn blast_effects(
        &mut self,
        pos: IVec3,
        power: i32,
        phenomenon: Phenomenon,
        ground_zero: IVec3,
        report: &mut ExplosionReport,
    ) {
        let relative = if distance(pos, ground_zero) < 2 {
            IVec3::ZERO
        } else {
            ground_zero - pos
        };
        let occupant = self.unit_at(pos);
        match phenomenon {
            Phenomenon::Explosive => {
                if let Some(id) = occupant {
                    let mut rolled = self.roll(power / 2, power * 3 / 2);
                    if self.unit(id).is_some_and(|u| u.kneeling) {
                        rolled = rolled * (100 - self.config.kneel_blast_reduction_pct) / 100;
                    }
                    self.damage_unit(id, relative, rolled, DamageType::Explosive, false, report);
                }
                self.blast_items(pos, power, report);
            }
            Phenomenon::Stun => {
                if let Some(id) = occupant {
                    let rolled = self.roll(0, power * 2);
                    self.damage_unit(id, relative, rolled, DamageType::Stun, false, report);
                }
                let bodies: Vec<UnitId> = self
                    .tile(pos)
                    .map(|t| t.items().iter().filter_map(|item| item.body).collect())
                    .unwrap_or_default();
                for body in bodies {
                    let rolled = self.roll(0, power * 2);
                    self.damage_unit(body, IVec3::ZERO, rolled, DamageType::Stun, true, report);
                }
            }
            Phenomenon::Smoke => {
                let thin = self
                    .tile(pos)
                    .is_some_and(|t| t.smoke() < SMOKE_REFRESH_LIMIT);
                if thin && self.terrain_level(pos) > -TILE_VOXELS_Z {
                    self.set_fire(pos, 0);
                    let smoke = self.roll(7, 15);
                    self.set_smoke(pos, smoke);
                }
                if let Some(id) = occupant {
                    let rolled = self.roll(0, power);
                    self.damage_unit(id, IVec3::ZERO, rolled, DamageType::Smoke, true, report);
                }
            }
            Phenomenon::Incendiary => self.ignite(pos, power, occupant, report),
            Phenomenon::Vision => {}
        }
    }

    fn ignite(&mut self, pos: IVec3, power: i32, occupant: Option<UnitId>, report: &mut ExplosionReport) {
        let Some(tile) = self.tile(pos) else {
            return;
        };
        if tile.is_void() {
            return;
        }
        let burnable: Vec<(i32, i32)> = [TilePart::Floor, TilePart::Content]
            .into_iter()
            .filter_map(|slot| self.part_at(pos, slot))
            .map(|part| (part.flammability, part.fuel))
            .collect();
        if tile.fire() == 0 && !burnable.is_empty() {
            let fuel = burnable.iter().map(|(_, fuel)| *fuel).max().unwrap_or(0);
            let flammability = burnable.iter().map(|(f, _)| *f).min().unwrap_or(255);
            if self.set_fire(pos, fuel + 1) {
                self.set_smoke(pos, (15 - flammability / 10).clamp(1, i32::from(MAX_FIRE)));
            }
        }
        if let Some(id) = occupant {
            let resistance = self
                .unit(id)
                .map(|u| u.resistances.get(DamageType::Incendiary))
                .unwrap_or(0.0);
            if resistance > 0.0 {
                let rolled = self.roll(power / 2, power * 3 / 2);
                self.damage_unit(id, IVec3::ZERO, rolled, DamageType::Incendiary, true, report);
                let burn = self.roll(0, (5.0 * resistance) as i32);
                if let Some(unit) = self.unit_mut(id) {
                    if unit.fire_turns < burn {
                        unit.fire_turns = burn;
                    }
                }
            }
        }
    }

    /// Items weaker than the blast are destroyed; bodies lying among them
    /// take the hit.
    fn blast_items(&mut self, pos: IVec3, power: i32, report: &mut ExplosionReport) {
        let bodies: Vec<UnitId> = self
            .tile(pos)
            .map(|t| {
                t.items()
                    .iter()
                    .filter(|item| power > item.armor)
                    .filter_map(|item| item.body)
                    .collect()
            })
            .unwrap_or_default();
        for body in bodies {
            let rolled = self.roll(power / 2, power * 3 / 2);
            self.damage_unit(body, IVec3::ZERO, rolled, DamageType::Explosive, false, report);
        }
        if let Some(tile) = self.tile_mut(pos) {
            tile.items_mut().retain(|item| power <= item.armor);
        }
    }

    fn damage_unit(
        &mut self,
        id: UnitId,
        relative: IVec3,
        power: i32,
        damage: DamageType,
        ignore_armor: bool,
        report: &mut ExplosionReport,
    ) {
        let Some(unit) = self.unit_mut(id) else {
            return;
        };
        let dealt = unit.take_damage(relative, power, damage, ignore_armor);
        if dealt > 0 {
            report.damaged_units.push((id, dealt));
        }
    }

    /// Apply the pending blast power of a tile to its own parts, the ceiling
    /// above and the walls it shares with its east and south neighbours.
    pub fn detonate(&mut self, pos: IVec3) -> Detonation {
        let mut outcome = Detonation::default();
        let Some(tile) = self.tile_mut(pos) else {
            return outcome;
        };
        let explosive = tile.take_pending_explosive();
        if explosive <= 0 {
            return outcome;
        }
        // the blast itself leaves a short-lived haze
        let haze = i32::from(self.tile(pos).map(|t| t.smoke()).unwrap_or(0)) + self.roll(0, 2);
        self.set_smoke(pos, haze.clamp(1, 15));

        let east = pos + IVec3::X;
        let south = pos + IVec3::Y;
        // highest first: neighbour big walls, own content, own walls and floor, then shared walls and ceiling
        let slots = [
            (pos + IVec3::Z, TilePart::Floor),
            (east, TilePart::WestWall),
            (south, TilePart::NorthWall),
            (pos, TilePart::Floor),
            (pos, TilePart::WestWall),
            (pos, TilePart::NorthWall),
            (pos, TilePart::Content),
            (south, TilePart::Content),
            (east, TilePart::Content),
        ];

        let mut shielded = false;
        let mut skip_shared_walls = false;
        for (i, (target, slot)) in slots.into_iter().enumerate().rev() {
            let Some(part) = self.part_at(target, slot) else {
                continue;
            };
            let shape = part.big_wall;
            let armor = part.armor;
            if i > 6 {
                let faces_us = matches!(shape, BigWall::Block | BigWall::EastAndSouth)
                    || (i == 8 && shape == BigWall::East)
                    || (i == 7 && shape == BigWall::South);
                if !faces_us {
                    continue;
                }
            }
            if shape != BigWall::None {
                skip_shared_walls = true;
            }
            if shielded && i < 6 {
                continue;
            }
            if skip_shared_walls && (i == 1 || i == 2) {
                continue;
            }
            let diagonal_here = i == 6 && shape.is_diagonal();
            if diagonal_here && 2 * armor >= explosive {
                shielded = true;
                continue;
            }
            self.break_part(target, slot, explosive, diagonal_here, &mut outcome);
        }
        if !self.supports_volatiles(pos) {
            self.set_smoke(pos, 0);
            self.set_fire(pos, 0);
        }
        outcome
    }

    /// Destroy a part and its successors while the remaining power lasts,
    /// then set the tile alight or leave smoke.
    fn break_part(&mut self, pos: IVec3, slot: TilePart, explosive: i32, diagonal: bool, outcome: &mut Detonation) {
        let mut remaining = explosive;
        let mut current = slot;
        let mut destroyed = false;
        let Some(first) = self.part_at(pos, slot) else {
            return;
        };
        let volume = first.volume();
        let mut flammability = first.flammability;
        let mut fuel = first.fuel + 1;

        // one pass per library entry is the longest chain a valid library has
        for _ in 0..self.parts.len() {
            let Some(part) = self.part_at(pos, current) else {
                break;
            };
            let threshold = 2 * part.armor;
            let falls = if diagonal && current == slot {
                threshold < remaining
            } else {
                threshold <= remaining
            };
            if !falls || !part.is_destructible() {
                break;
            }
            remaining -= threshold;
            destroyed = true;
            let (next_slot, chained) = self.destroy_part(pos, current);
            outcome.destroyed.push((pos, current));
            outcome.floors_lost |= current == TilePart::Floor;
            outcome.chained.extend(chained);
            if let Some(next) = self.part_at(pos, next_slot) {
                flammability = next.flammability;
                fuel = next.fuel + 1;
            }
            current = next_slot;
        }

        if 2 * flammability < remaining {
            let burnable = self.part_at(pos, TilePart::Floor).is_some()
                || self.part_at(pos, TilePart::Content).is_some();
            if burnable && self.set_fire(pos, fuel) {
                self.set_smoke(pos, (15 - flammability / 10).clamp(1, i32::from(MAX_FIRE)));
            }
        }
        let burning = self.tile(pos).is_some_and(|t| t.fire() > 0);
        if destroyed && !burning {
            let smoke = self.roll(1, volume / 2 + 3) + volume / 2;
            let current_smoke = self.tile(pos).map(|t| i32::from(t.smoke())).unwrap_or(0);
            if smoke > current_smoke {
                self.set_smoke(pos, smoke.min(15));
            }
        }
    }

    /// Replace a part with its destroyed successor, which may live in a
    /// different slot. Returns that slot and the blast of an explosive part.
    fn destroy_part(&mut self, pos: IVec3, slot: TilePart) -> (TilePart, Option<ExplosionRequest>) {
        let Some(part) = self.part_at(pos, slot) else {
            return (slot, None);
        };
        let successor: Option<PartId> = part.destroyed_into;
        let blast = (part.explosive_power > 0).then(|| ExplosionRequest::terrain(pos, part.explosive_power));
        let next_slot = successor
            .and_then(|id| self.parts.get(id))
            .map(|p| p.slot)
            .unwrap_or(slot);
        if let Some(tile) = self.tile_mut(pos) {
            tile.set_part(slot, None);
            if successor.is_some() {
                tile.set_part(next_slot, successor);
            }
        }
        tracing::trace!(x = pos.x, y = pos.y, z = pos.z, ?slot, "part destroyed");
        (next_slot, blast)
    }

    /// Drop units and items on `pos` down to the first supporting floor.
    /// Returns where the items ended up.
    pub fn apply_gravity(&mut self, pos: IVec3) -> IVec3 {
        let Some(tile) = self.tile(pos) else {
            return pos;
        };
        if let Some(id) = tile.unit() {
            self.drop_unit(id);
        }

        let mut landing = pos;
        while landing.z > 0 && self.has_no_floor(landing) {
            landing -= IVec3::Z;
        }
        if landing != pos {
            let items = self
                .tile_mut(pos)
                .map(|t| std::mem::take(t.items_mut()))
                .unwrap_or_default();
            if let Some(tile) = self.tile_mut(landing) {
                tile.items_mut().extend(items);
            }
        }
        landing
    }

    fn drop_unit(&mut self, id: UnitId) {
        let Some(unit) = self.unit(id) else {
            return;
        };
        if unit.flying && !unit.is_out() {
            return;
        }
        let start = unit.position;
        let footprint: Vec<IVec3> = unit.footprint().map(|p| p - start).collect();
        let mut landing = start;
        while landing.z > 0 {
            let unsupported = footprint.iter().all(|o| self.has_no_floor(landing + *o));
            let below = landing - IVec3::Z;
            let free = footprint
                .iter()
                .all(|o| self.unit_at(below + *o).map_or(true, |other| other == id));
            if !unsupported || !free {
                break;
            }
            landing = below;
        }
        if landing != start {
            if let Err(err) = self.move_unit(id, landing) {
                tracing::warn!(unit = id.0, %err, "unit could not fall");
            } else {
                tracing::debug!(unit = id.0, from = start.z, to = landing.z, "unit fell");
            }
        }
    }

    /// Resolve one projectile hitting `voxel`. Terrain takes a quarter to
    /// three quarters of the power against its armor, units between 1 and
    /// twice the power through their armor.
    pub fn hit(&mut self, voxel: IVec3, power: i32, damage: DamageType, attacker: Option<UnitId>) -> HitOutcome {
        let filter = VoxelFilter {
            exclude: attacker,
            ..Default::default()
        };
        let pos = tile_of_voxel(voxel);
        let hit = self.voxel_check(voxel, &filter);
        let mut outcome = HitOutcome {
            hit,
            destroyed: None,
            unit: None,
            damage: 0,
            chained: None,
        };
        if !self.contains(pos) {
            return outcome;
        }

        if let Some(slot) = hit.part() {
            let rolled = self.roll(power / 4, power * 3 / 4);
            let breaks = self
                .part_at(pos, slot)
                .is_some_and(|part| part.is_destructible() && rolled >= part.armor);
            if breaks {
                let (_, blast) = self.destroy_part(pos, slot);
                outcome.destroyed = Some(slot);
                if let Some(blast) = blast {
                    outcome.chained = Some(self.explode(blast));
                }
            }
        } else if let VoxelHit::Unit(id) = hit {
            let rolled = self.roll(1, power * 2);
            if let Some(unit) = self.unit(id) {
                let size = unit.size.max(1) * 8;
                let body = voxel_of_tile(unit.position)
                    + IVec3::new(size, size, unit.float_height - self.terrain_level(unit.position));
                let relative = voxel - body;
                outcome.unit = Some(id);
                if let Some(unit) = self.unit_mut(id) {
                    outcome.damage = unit.take_damage(relative, rolled, damage, false);
                }
            }
        }

        self.apply_gravity(pos);
        if outcome.destroyed.is_some() {
            self.apply_gravity(pos + IVec3::Z);
            self.recalculate_lighting();
            self.recalculate_fov_near(pos);
        }
        tracing::debug!(?hit, power, damage = outcome.damage, "projectile impact");
        outcome
    }
}

/// Voxel a thrown or fired blast centres on when it lands in `tile`.
pub fn impact_voxel(tile: IVec3) -> IVec3 {
    voxel_of_tile(tile) + IVec3::new(TILE_VOXELS_XY / 2, TILE_VOXELS_XY / 2, TILE_VOXELS_Z / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::fixtures::open_field;
    use crate::tiles::{GroundItem, LoftLibrary, PartLibrary, StandardParts};
    use crate::engine::config::EngineConfig;
    use crate::units::{BattleUnit, Faction};

    /// Single-level map floored with bedrock so blasts stay on the level.
    fn bedrock_field(size: IVec3) -> (Battlefield, StandardParts) {
        let (parts, handles) = PartLibrary::standard();
        let mut field =
            Battlefield::new(EngineConfig::default(), size, parts, LoftLibrary::standard()).unwrap();
        for z in 0..size.z {
            field.fill_level(z, handles.bedrock).unwrap();
        }
        (field, handles)
    }

    #[test]
    fn test_sample_ray_starts_at_center() {
        let samples = sample_ray(DVec3::new(5.5, 5.5, 0.5), 0, 0, 3);
        assert_eq!(samples, vec![
            IVec3::new(5, 5, 0),
            IVec3::new(6, 5, 0),
            IVec3::new(7, 5, 0),
            IVec3::new(8, 5, 0),
        ]);
        let up = sample_ray(DVec3::new(5.5, 5.5, 0.5), 90, 0, 2);
        assert_eq!(up[2], IVec3::new(5, 5, 2));
    }

    #[test]
    fn test_ray_power_decays_to_zero_within_radius() {
        let (field, _) = bedrock_field(IVec3::new(20, 20, 1));
        let request = ExplosionRequest::new(impact_voxel(IVec3::new(10, 10, 0)), 100, Phenomenon::Explosive, 6);
        let ray = field.blast_ray(&request, 0, 0);
        assert_eq!(ray[0], (IVec3::new(10, 10, 0), 100));
        assert!(ray.windows(2).all(|w| w[1].1 <= w[0].1));
        assert!(ray.len() <= 6);
        assert!(ray.iter().all(|(_, power)| *power > 0));
    }

    #[test]
    fn test_ray_absorbed_by_wall() {
        let (mut field, parts) = bedrock_field(IVec3::new(20, 1, 1));
        let request = ExplosionRequest::new(impact_voxel(IVec3::new(2, 0, 0)), 200, Phenomenon::Explosive, 10);
        let open = field.blast_ray(&request, 0, 0);
        field
            .set_part(IVec3::new(4, 0, 0), TilePart::WestWall, Some(parts.brick_west))
            .unwrap();
        let walled = field.blast_ray(&request, 0, 0);
        // one step decays 20 and a crossing costs 10 more; the wall takes twice its armor
        assert_eq!(open[2], (IVec3::new(4, 0, 0), 140));
        assert_eq!(walled[2], (IVec3::new(4, 0, 0), 40));
    }

    #[test]
    fn test_sight_like_blast_stops_at_wall() {
        let (mut field, parts) = bedrock_field(IVec3::new(10, 1, 1));
        field
            .set_part(IVec3::new(4, 0, 0), TilePart::WestWall, Some(parts.brick_west))
            .unwrap();
        let request = ExplosionRequest::new(impact_voxel(IVec3::new(2, 0, 0)), 200, Phenomenon::Smoke, 8);
        let ray = field.blast_ray(&request, 0, 0);
        assert_eq!(ray.last().map(|r| r.0), Some(IVec3::new(3, 0, 0)));
    }

    #[test]
    fn test_degenerate_requests() {
        let (field, _) = bedrock_field(IVec3::new(4, 4, 1));
        let center = impact_voxel(IVec3::new(1, 1, 0));
        assert!(field.blast_ray(&ExplosionRequest::new(center, 0, Phenomenon::Explosive, 4), 0, 0).is_empty());
        assert!(field.blast_ray(&ExplosionRequest::new(center, 50, Phenomenon::Explosive, 0), 0, 0).is_empty());
        let outside = impact_voxel(IVec3::new(9, 9, 0));
        assert!(field.blast_ray(&ExplosionRequest::new(outside, 50, Phenomenon::Explosive, 4), 0, 0).is_empty());
    }

    #[test]
    fn test_blast_destroys_weak_parts_and_leaves_smoke() {
        let (mut field, parts) = bedrock_field(IVec3::new(12, 12, 1));
        let weak = IVec3::new(6, 5, 0);
        field.set_part(weak, TilePart::Content, Some(parts.crate_object)).unwrap();
        let report = field.explode(ExplosionRequest::new(impact_voxel(IVec3::new(5, 5, 0)), 100, Phenomenon::Explosive, 6));
        assert!(field.part_at(weak, TilePart::Content).is_none());
        assert!(report.destroyed.contains(&(weak, TilePart::Content)));
        assert!(!report.affected.is_empty());
        for pos in &report.affected {
            let tile = field.tile(*pos).unwrap();
            assert!(tile.smoke() > 0);
            assert_eq!(tile.pending_explosive(), 0);
        }
        // bedrock never breaks
        assert_eq!(field.part_at(IVec3::new(5, 5, 0), TilePart::Floor).unwrap().name, "bedrock");
    }

    #[test]
    fn test_diagonal_wall_shields_its_tile() {
        let (mut field, parts) = bedrock_field(IVec3::new(3, 3, 1));
        let pos = IVec3::new(1, 1, 0);
        field.set_part(pos, TilePart::Content, Some(parts.fence_nesw)).unwrap();
        field.set_part(pos, TilePart::WestWall, Some(parts.window_west)).unwrap();
        // exactly twice the fence armor: the fence stands, the window behind it too
        field.tile_mut(pos).unwrap().mark_explosive(30);
        let outcome = field.detonate(pos);
        assert!(outcome.destroyed.is_empty());
        assert!(field.part_at(pos, TilePart::Content).is_some());
        assert!(field.part_at(pos, TilePart::WestWall).is_some());

        field.tile_mut(pos).unwrap().mark_explosive(31);
        let outcome = field.detonate(pos);
        assert!(outcome.destroyed.contains(&(pos, TilePart::Content)));
        assert!(field.part_at(pos, TilePart::Content).is_none());
    }

    #[test]
    fn test_floor_cascades_to_successor() {
        let (mut field, parts) = open_field(IVec3::new(3, 3, 1));
        let pos = IVec3::new(1, 1, 0);
        field.tile_mut(pos).unwrap().mark_explosive(120);
        let outcome = field.detonate(pos);
        assert!(outcome.floors_lost);
        assert_eq!(field.tile(pos).unwrap().part(TilePart::Floor), Some(parts.rubble));
    }

    #[test]
    fn test_floor_loss_drops_unit_and_items() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 3));
        let high = IVec3::new(1, 1, 2);
        let id = field.add_unit(BattleUnit::new("a", high, Faction::Player)).unwrap();
        field.add_item(high, GroundItem::new("clip", 5)).unwrap();
        field.set_part(high, TilePart::Floor, None).unwrap();
        field.set_part(IVec3::new(1, 1, 1), TilePart::Floor, None).unwrap();
        let landing = field.apply_gravity(high);
        assert_eq!(landing, IVec3::new(1, 1, 0));
        assert_eq!(field.unit(id).unwrap().position, IVec3::new(1, 1, 0));
        assert_eq!(field.tile(landing).unwrap().items().len(), 1);
        assert!(field.tile(high).unwrap().items().is_empty());
    }

    #[test]
    fn test_flying_unit_stays_up() {
        let (mut field, _) = open_field(IVec3::new(2, 2, 2));
        let pos = IVec3::new(0, 0, 1);
        let mut drone = BattleUnit::new("drone", pos, Faction::Hostile);
        drone.flying = true;
        let id = field.add_unit(drone).unwrap();
        field.set_part(pos, TilePart::Floor, None).unwrap();
        field.apply_gravity(pos);
        assert_eq!(field.unit(id).unwrap().position, pos);
    }

    #[test]
    fn test_explosive_part_chains() {
        let (mut field, parts) = bedrock_field(IVec3::new(12, 12, 1));
        let tank = IVec3::new(6, 5, 0);
        field.set_part(tank, TilePart::Content, Some(parts.fuel_tank)).unwrap();
        let report = field.explode(ExplosionRequest::new(impact_voxel(IVec3::new(5, 5, 0)), 100, Phenomenon::Explosive, 6));
        assert_eq!(report.chained.len(), 1);
        assert_eq!(report.chained[0].power, 60);
        assert_eq!(tile_of_voxel(report.chained[0].center), tank);
    }

    #[test]
    fn test_blast_damages_units_and_items() {
        let (mut field, _) = bedrock_field(IVec3::new(12, 12, 1));
        let near = field
            .add_unit(BattleUnit::new("near", IVec3::new(6, 5, 0), Faction::Player))
            .unwrap();
        field.add_item(IVec3::new(5, 6, 0), GroundItem::new("clip", 5)).unwrap();
        field.add_item(IVec3::new(5, 6, 0), GroundItem::new("plate", 500)).unwrap();
        let report = field.explode(ExplosionRequest::new(impact_voxel(IVec3::new(5, 5, 0)), 100, Phenomenon::Explosive, 6));
        assert!(report.damaged_units.iter().any(|(id, dealt)| *id == near && *dealt > 0));
        assert!(field.unit(near).unwrap().health < 40);
        let items = field.tile(IVec3::new(5, 6, 0)).unwrap().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "plate");
    }

    #[test]
    fn test_smoke_grenade_fills_tiles() {
        let (mut field, _) = bedrock_field(IVec3::new(10, 10, 1));
        let report = field.explode(ExplosionRequest::new(impact_voxel(IVec3::new(5, 5, 0)), 60, Phenomenon::Smoke, 3));
        for pos in &report.affected {
            let smoke = field.tile(*pos).unwrap().smoke();
            assert!((7..=15).contains(&smoke));
        }
        assert!(report.destroyed.is_empty());
    }

    #[test]
    fn test_incendiary_sets_fire() {
        let (mut field, parts) = bedrock_field(IVec3::new(10, 10, 1));
        let pos = IVec3::new(5, 5, 0);
        field.set_part(pos, TilePart::Content, Some(parts.crate_object)).unwrap();
        field.explode(ExplosionRequest::new(impact_voxel(pos), 60, Phenomenon::Incendiary, 3));
        let tile = field.tile(pos).unwrap();
        assert_eq!(tile.fire(), 6);
        assert!(tile.smoke() > 0);
    }

    #[test]
    fn test_hit_on_wall_and_unit() {
        let (mut field, parts) = open_field(IVec3::new(4, 4, 1));
        field
            .set_part(IVec3::new(2, 1, 0), TilePart::WestWall, Some(parts.window_west))
            .unwrap();
        // window armor 20, a roll of at least 100/4 always breaks it
        let outcome = field.hit(IVec3::new(32, 20, 10), 100, DamageType::Piercing, None);
        assert_eq!(outcome.hit, VoxelHit::WestWall);
        assert_eq!(outcome.destroyed, Some(TilePart::WestWall));
        assert!(field.part_at(IVec3::new(2, 1, 0), TilePart::WestWall).is_none());

        let id = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Hostile))
            .unwrap();
        // at most 30 damage, short of the 40 health
        let outcome = field.hit(IVec3::new(23, 24, 12), 15, DamageType::Piercing, None);
        assert_eq!(outcome.unit, Some(id));
        assert!(outcome.damage >= 1);
        assert_eq!(field.unit(id).unwrap().health, 40 - outcome.damage);
    }

    #[test]
    fn test_hit_misses_into_air() {
        let (mut field, _) = open_field(IVec3::new(2, 2, 1));
        let outcome = field.hit(IVec3::new(8, 8, 12), 50, DamageType::Piercing, None);
        assert_eq!(outcome.hit, VoxelHit::Empty);
        assert_eq!(outcome.damage, 0);
        let outside = field.hit(IVec3::new(-5, 8, 12), 50, DamageType::Piercing, None);
        assert_eq!(outside.hit, VoxelHit::OutOfBounds);
    }

    #[test]
    fn test_indestructible_part_survives() {
        let (mut field, parts) = bedrock_field(IVec3::new(2, 2, 1));
        field.tile_mut(IVec3::ZERO).unwrap().mark_explosive(10_000);
        let outcome = field.detonate(IVec3::ZERO);
        assert!(outcome.destroyed.is_empty());
        assert_eq!(field.tile(IVec3::ZERO).unwrap().part(TilePart::Floor), Some(parts.bedrock));
    }
}
