//! Unit data the engine reads and damages.
//!
//! Units are spawned and removed by the mission shell; the engine keeps the
//! roster for the duration of a battle and mutates only position, time units,
//! health, stun, burning state and spotting lists.

use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use crate::geometry::{direction_to, Direction};
use crate::tiles::loft::LOFT_UNIT;

pub mod weapon;

pub use weapon::{FireMode, Weapon, WeaponKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Hostile,
    Neutral,
}

impl Faction {
    pub fn is_hostile_to(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Player, Faction::Hostile)
                | (Faction::Hostile, Faction::Player)
                | (Faction::Hostile, Faction::Neutral)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    Standing,
    Unconscious,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Piercing,
    Incendiary,
    Explosive,
    Laser,
    Plasma,
    Stun,
    Melee,
    Smoke,
}

impl DamageType {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Damage multipliers per damage type; 1.0 is unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resistances(pub [f32; DamageType::COUNT]);

impl Default for Resistances {
    fn default() -> Self {
        Self([1.0; DamageType::COUNT])
    }
}

impl Resistances {
    pub fn get(&self, damage: DamageType) -> f32 {
        self.0[damage.index()]
    }

    pub fn with(mut self, damage: DamageType, multiplier: f32) -> Self {
        self.0[damage.index()] = multiplier;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorSide {
    Front,
    Left,
    Right,
    Rear,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideArmor {
    pub front: i32,
    pub left: i32,
    pub right: i32,
    pub rear: i32,
    pub under: i32,
}

impl SideArmor {
    pub fn uniform(value: i32) -> Self {
        Self {
            front: value,
            left: value,
            right: value,
            rear: value,
            under: value,
        }
    }

    pub fn get(&self, side: ArmorSide) -> i32 {
        match side {
            ArmorSide::Front => self.front,
            ArmorSide::Left => self.left,
            ArmorSide::Right => self.right,
            ArmorSide::Rear => self.rear,
            ArmorSide::Under => self.under,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub name: String,
    /// Tile of the north-west corner of the footprint
    pub position: IVec3,
    pub direction: Direction,
    pub turret_direction: Option<Direction>,
    /// Standing height in voxels
    pub height: i32,
    pub float_height: i32,
    /// Footprint edge length in tiles, 1 or 2
    pub size: i32,
    pub faction: Faction,
    pub original_faction: Faction,
    pub status: UnitStatus,
    pub kneeling: bool,
    pub flying: bool,
    pub dark_vision: bool,
    /// Seen by the player's side
    pub visible: bool,
    pub ai_controlled: bool,
    pub health: i32,
    pub max_health: i32,
    pub stun_level: i32,
    pub time_units: i32,
    pub max_time_units: i32,
    pub reactions: i32,
    pub strength: i32,
    pub armor: SideArmor,
    pub resistances: Resistances,
    /// Turns left burning, 0 when not on fire
    pub fire_turns: i32,
    pub weapon: Option<Weapon>,
    pub loft: u8,
    pub visible_units: Vec<UnitId>,
    pub spotted_this_turn: Vec<UnitId>,
}

impl BattleUnit {
    pub fn new(name: impl Into<String>, position: IVec3, faction: Faction) -> Self {
        Self {
            id: UnitId(0),
            name: name.into(),
            position,
            direction: Direction::North,
            turret_direction: None,
            height: 22,
            float_height: 0,
            size: 1,
            faction,
            original_faction: faction,
            status: UnitStatus::Standing,
            kneeling: false,
            flying: false,
            dark_vision: faction == Faction::Hostile,
            visible: faction == Faction::Player,
            ai_controlled: faction != Faction::Player,
            health: 40,
            max_health: 40,
            stun_level: 0,
            time_units: 60,
            max_time_units: 60,
            reactions: 50,
            strength: 30,
            armor: SideArmor::default(),
            resistances: Resistances::default(),
            fire_turns: 0,
            weapon: None,
            loft: LOFT_UNIT,
            visible_units: Vec::new(),
            spotted_this_turn: Vec::new(),
        }
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn armed(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn is_out(&self) -> bool {
        self.status != UnitStatus::Standing
    }

    /// Tiles covered by the footprint.
    pub fn footprint(&self) -> impl Iterator<Item = IVec3> + '_ {
        let size = self.size.max(1);
        (0..size).flat_map(move |y| (0..size).map(move |x| self.position + IVec3::new(x, y, 0)))
    }

    pub fn occupies(&self, tile: IVec3) -> bool {
        let size = self.size.max(1);
        tile.z == self.position.z
            && (self.position.x..self.position.x + size).contains(&tile.x)
            && (self.position.y..self.position.y + size).contains(&tile.y)
    }

    /// Current height, accounting for kneeling.
    pub fn current_height(&self) -> i32 {
        if self.kneeling {
            self.height - 8
        } else {
            self.height
        }
    }

    /// Reaction score: reactions scaled by the fraction of time units left.
    pub fn initiative(&self) -> f64 {
        self.initiative_after(0)
    }

    pub fn initiative_after(&self, spent: i32) -> f64 {
        let remaining = (self.time_units - spent).max(0);
        f64::from(self.reactions) * f64::from(remaining) / f64::from(self.max_time_units.max(1))
    }

    pub fn spend_time_units(&mut self, cost: i32) -> bool {
        if cost > self.time_units {
            return false;
        }
        self.time_units -= cost;
        true
    }

    /// Side of the body facing a source at `relative` (source minus unit, voxels).
    pub fn armor_side(&self, relative: IVec3) -> ArmorSide {
        if relative == IVec3::ZERO {
            return ArmorSide::Under;
        }
        let toward = direction_to(IVec3::ZERO, relative);
        match (toward.index() as i32 - self.direction.index() as i32).rem_euclid(8) {
            0 | 1 | 7 => ArmorSide::Front,
            2 => ArmorSide::Right,
            6 => ArmorSide::Left,
            _ => ArmorSide::Rear,
        }
    }

    /// Apply damage and return what got through.
    pub fn take_damage(
        &mut self,
        relative: IVec3,
        power: i32,
        damage: DamageType,
        ignore_armor: bool,
    ) -> i32 {
        if power <= 0 || self.status == UnitStatus::Dead {
            return 0;
        }
        let mut dealt = (power as f32 * self.resistances.get(damage)).floor() as i32;
        if !ignore_armor {
            dealt -= self.armor.get(self.armor_side(relative));
        }
        if dealt <= 0 {
            return 0;
        }
        match damage {
            DamageType::Stun | DamageType::Smoke => self.stun_level += dealt,
            _ => self.health -= dealt,
        }
        self.refresh_status();
        dealt
    }

    pub(crate) fn kill(&mut self) {
        self.health = 0;
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        if self.health <= 0 {
            self.health = 0;
            self.status = UnitStatus::Dead;
        } else if self.stun_level >= self.health {
            self.status = UnitStatus::Unconscious;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soldier() -> BattleUnit {
        BattleUnit::new("soldier", IVec3::new(4, 4, 0), Faction::Player).facing(Direction::North)
    }

    #[test]
    fn test_faction_hostility() {
        assert!(Faction::Player.is_hostile_to(Faction::Hostile));
        assert!(Faction::Hostile.is_hostile_to(Faction::Neutral));
        assert!(!Faction::Player.is_hostile_to(Faction::Neutral));
        assert!(!Faction::Player.is_hostile_to(Faction::Player));
    }

    #[test]
    fn test_armor_side() {
        let unit = soldier();
        assert_eq!(unit.armor_side(IVec3::new(0, -10, 0)), ArmorSide::Front);
        assert_eq!(unit.armor_side(IVec3::new(10, 0, 0)), ArmorSide::Right);
        assert_eq!(unit.armor_side(IVec3::new(-10, 0, 0)), ArmorSide::Left);
        assert_eq!(unit.armor_side(IVec3::new(0, 10, 0)), ArmorSide::Rear);
        assert_eq!(unit.armor_side(IVec3::ZERO), ArmorSide::Under);
    }

    #[test]
    fn test_damage_reduced_by_side_armor() {
        let mut unit = soldier();
        unit.armor = SideArmor {
            front: 12,
            rear: 2,
            ..SideArmor::uniform(6)
        };
        assert_eq!(unit.take_damage(IVec3::new(0, -5, 0), 20, DamageType::Piercing, false), 8);
        assert_eq!(unit.take_damage(IVec3::new(0, 5, 0), 20, DamageType::Piercing, false), 18);
        assert_eq!(unit.health, 14);
    }

    #[test]
    fn test_resistance_and_stun() {
        let mut unit = soldier();
        unit.resistances = Resistances::default().with(DamageType::Stun, 0.5);
        let dealt = unit.take_damage(IVec3::ZERO, 100, DamageType::Stun, true);
        assert_eq!(dealt, 50);
        assert_eq!(unit.stun_level, 50);
        assert_eq!(unit.status, UnitStatus::Unconscious);
        assert!(unit.is_out());
    }

    #[test]
    fn test_lethal_damage() {
        let mut unit = soldier();
        unit.take_damage(IVec3::ZERO, 500, DamageType::Explosive, false);
        assert_eq!(unit.status, UnitStatus::Dead);
        assert_eq!(unit.health, 0);
        assert_eq!(unit.take_damage(IVec3::ZERO, 50, DamageType::Explosive, false), 0);
    }

    #[test]
    fn test_initiative_scales_with_time_units() {
        let mut unit = soldier();
        assert_eq!(unit.initiative(), 50.0);
        assert_eq!(unit.initiative_after(30), 25.0);
        assert!(unit.spend_time_units(45));
        assert!(!unit.spend_time_units(20));
        assert_eq!(unit.initiative_after(100), 0.0);
    }

    #[test]
    fn test_large_footprint() {
        let mut unit = soldier();
        unit.size = 2;
        let tiles: Vec<IVec3> = unit.footprint().collect();
        assert_eq!(tiles.len(), 4);
        assert!(unit.occupies(IVec3::new(5, 5, 0)));
        assert!(!unit.occupies(IVec3::new(6, 5, 0)));
        assert!(!unit.occupies(IVec3::new(5, 5, 1)));
    }
}
