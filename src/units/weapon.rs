use serde::{Deserialize, Serialize};

use super::DamageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Firearm,
    Melee,
}

/// Shot types a unit can take with its weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireMode {
    Auto,
    Snap,
    Aimed,
    Melee,
}

/// Weapon state read by reaction fire. Costs are time units; `None` means
/// the weapon cannot fire in that mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    pub damage_type: DamageType,
    pub power: i32,
    pub auto_cost: Option<i32>,
    pub snap_cost: Option<i32>,
    pub aimed_cost: Option<i32>,
    pub melee_cost: Option<i32>,
    pub ammo: i32,
    /// Blast radius in tiles for area weapons, 0 otherwise
    pub blast_radius: i32,
    pub researched: bool,
}

impl Weapon {
    pub fn rifle() -> Self {
        Self {
            name: "rifle".into(),
            kind: WeaponKind::Firearm,
            damage_type: DamageType::Piercing,
            power: 30,
            auto_cost: Some(35),
            snap_cost: Some(25),
            aimed_cost: Some(80),
            melee_cost: None,
            ammo: 20,
            blast_radius: 0,
            researched: true,
        }
    }

    pub fn stun_rod() -> Self {
        Self {
            name: "stun rod".into(),
            kind: WeaponKind::Melee,
            damage_type: DamageType::Stun,
            power: 65,
            auto_cost: None,
            snap_cost: None,
            aimed_cost: None,
            melee_cost: Some(30),
            ammo: 0,
            blast_radius: 0,
            researched: true,
        }
    }

    pub fn rocket_launcher() -> Self {
        Self {
            name: "rocket launcher".into(),
            kind: WeaponKind::Firearm,
            damage_type: DamageType::Explosive,
            power: 75,
            auto_cost: None,
            snap_cost: Some(45),
            aimed_cost: Some(115),
            melee_cost: None,
            ammo: 1,
            blast_radius: 6,
            researched: true,
        }
    }

    /// Time-unit cost of a mode; zero-cost modes are treated as unavailable.
    pub fn cost(&self, mode: FireMode) -> Option<i32> {
        let cost = match mode {
            FireMode::Auto => self.auto_cost,
            FireMode::Snap => self.snap_cost,
            FireMode::Aimed => self.aimed_cost,
            FireMode::Melee => self.melee_cost,
        };
        cost.filter(|c| *c > 0)
    }

    pub fn needs_ammo(&self) -> bool {
        self.kind == WeaponKind::Firearm
    }

    pub fn has_ammo(&self) -> bool {
        !self.needs_ammo() || self.ammo > 0
    }
}
