//! Reaction fire: opponents who spot a moving unit may shoot it before the
//! move completes.
//!
//! Shots are chosen and paid for here but not resolved; the caller feeds
//! each [`ReactionShot`] to its own projectile handling (usually
//! [`Battlefield::hit`] or [`Battlefield::explode`]).

use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use crate::battlefield::Battlefield;
use crate::blockage::Phenomenon;
use crate::geometry::{direction_to, distance, in_view_sector, voxel_of_tile};
use crate::units::{Faction, FireMode, UnitId, WeaponKind};

/// A shot taken in reaction to a mover, already paid for by the shooter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionShot {
    pub shooter: UnitId,
    pub target: UnitId,
    pub mode: FireMode,
    /// Time units spent on the shot
    pub cost: i32,
    /// Voxel the shot is aimed at
    pub aim: IVec3,
}

impl Battlefield {
    /// Opponents of the acting side that can see and shoot at `mover`.
    /// Spotting is recorded on both sides as a side effect.
    pub fn spotting_units(&mut self, mover: UnitId) -> Vec<UnitId> {
        let Some(target) = self.unit(mover) else {
            return Vec::new();
        };
        if self.side == Faction::Neutral {
            return Vec::new();
        }
        let position = target.position;
        let target_faction = target.faction;
        let range = self.config.max_view_distance;

        let mut spotters = Vec::new();
        for unit in self.units() {
            let eligible = !unit.is_out()
                && unit.faction != self.side
                && unit.faction.is_hostile_to(target_faction)
                && unit.time_units > 0
                && distance(unit.position, position) <= range;
            if !eligible {
                continue;
            }
            let facing = unit
                .turret_direction
                .filter(|_| self.config.turret_view)
                .unwrap_or(unit.direction);
            if !in_view_sector(unit.position, facing, position) {
                continue;
            }
            let origin = self.firing_origin_voxel(unit, position, false);
            if self.can_target_unit(origin, position, Some(unit.id), None).is_none() {
                continue;
            }
            if self.is_visible(unit.id, position) {
                spotters.push(unit.id);
            }
        }

        for id in &spotters {
            let player = self.unit(*id).is_some_and(|u| u.faction == Faction::Player);
            if let Some(unit) = self.unit_mut(*id) {
                if !unit.visible_units.contains(&mover) {
                    unit.visible_units.push(mover);
                }
            }
            if player {
                if let Some(target) = self.unit_mut(mover) {
                    target.visible = true;
                }
            }
        }
        spotters
    }

    /// Let every spotter that outranks `mover` react, best initiative first.
    /// `action_cost` is the time the mover is about to spend; its own
    /// initiative is measured as if that cost were already paid.
    pub fn check_reaction_fire(&mut self, mover: UnitId, action_cost: i32) -> Vec<ReactionShot> {
        let Some(unit) = self.unit(mover) else {
            return Vec::new();
        };
        if unit.is_out() {
            return Vec::new();
        }
        let defender = unit.initiative_after(action_cost);
        let mut candidates = self.spotting_units(mover);
        let mut shots = Vec::new();

        loop {
            let best = candidates
                .iter()
                .filter_map(|id| self.unit(*id).map(|u| (*id, u.initiative())))
                .fold(None, |best: Option<(UnitId, f64)>, candidate| match best {
                    Some(b) if b.1 >= candidate.1 => Some(b),
                    _ => Some(candidate),
                });
            let Some((shooter, initiative)) = best else {
                break;
            };
            if initiative <= defender {
                break;
            }
            match self.try_reaction_shot(shooter, mover) {
                Some(shot) => {
                    tracing::debug!(
                        shooter = shooter.0,
                        target = mover.0,
                        mode = ?shot.mode,
                        cost = shot.cost,
                        "reaction shot"
                    );
                    shots.push(shot);
                }
                None => candidates.retain(|id| *id != shooter),
            }
        }
        shots
    }

    /// Pick a fire mode, pay for it and turn toward the target. `None` when
    /// the shooter has nothing usable.
    pub fn try_reaction_shot(&mut self, shooter: UnitId, target: UnitId) -> Option<ReactionShot> {
        let unit = self.unit(shooter)?;
        let target_unit = self.unit(target)?;
        let weapon = unit.weapon.as_ref()?;
        if unit.faction == Faction::Player && !weapon.researched {
            return None;
        }
        let target_pos = target_unit.position;
        let heading = direction_to(unit.position, target_pos);
        let range = distance(unit.position, target_pos);

        let mode = if weapon.kind == WeaponKind::Melee {
            let cost = weapon.cost(FireMode::Melee)?;
            if cost > unit.time_units || !self.valid_melee_range(shooter, heading, Some(target)) {
                return None;
            }
            FireMode::Melee
        } else {
            if !weapon.has_ammo() {
                return None;
            }
            let preference = if range <= self.config.auto_shot_range {
                [FireMode::Auto, FireMode::Snap, FireMode::Aimed]
            } else if range <= self.config.snap_shot_range {
                [FireMode::Snap, FireMode::Aimed, FireMode::Auto]
            } else {
                [FireMode::Aimed, FireMode::Snap, FireMode::Auto]
            };
            preference
                .into_iter()
                .find(|mode| weapon.cost(*mode).is_some_and(|cost| cost <= unit.time_units))?
        };
        let cost = weapon.cost(mode)?;

        if unit.ai_controlled
            && weapon.blast_radius > 0
            && !self.explosive_efficacy(target_pos, shooter, weapon.blast_radius)
        {
            return None;
        }

        let aim = if mode == FireMode::Melee {
            voxel_of_tile(target_pos) + IVec3::new(8, 8, target_unit.current_height() / 2)
        } else {
            let origin = self.firing_origin_voxel(unit, target_pos, false);
            self.can_target_unit(origin, target_pos, Some(shooter), None)?
        };

        let unit = self.unit_mut(shooter)?;
        if !unit.spend_time_units(cost) {
            return None;
        }
        if let Some(weapon) = unit.weapon.as_mut() {
            if weapon.needs_ammo() {
                weapon.ammo -= 1;
            }
        }
        unit.direction = heading;
        if unit.turret_direction.is_some() {
            unit.turret_direction = Some(heading);
        }
        Some(ReactionShot {
            shooter,
            target,
            mode,
            cost,
            aim,
        })
    }

    /// Whether an area attack on `target` is worth it for `shooter`: never
    /// from inside the blast, otherwise only when the enemies caught
    /// outnumber twice the friendlies. Only units on the target's level
    /// with a clear line from the blast centre count.
    pub fn explosive_efficacy(&self, target: IVec3, shooter: UnitId, radius: i32) -> bool {
        let Some(unit) = self.unit(shooter) else {
            return false;
        };
        if distance(unit.position, target) <= radius {
            return false;
        }
        let score: i32 = self
            .units()
            .filter(|other| {
                !other.is_out()
                    && other.position.z == target.z
                    && distance(other.position, target) <= radius
            })
            .filter(|other| {
                self.trace_tiles(target, other.position, Phenomenon::Explosive, false)
                    .reached
            })
            .map(|other| {
                if unit.faction.is_hostile_to(other.faction) {
                    1
                } else if other.faction == unit.faction {
                    -2
                } else {
                    0
                }
            })
            .sum();
        score > 0
    }
}
