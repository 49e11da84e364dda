//! The battlefield: tile grid, part arena, unit roster and engine state.
//!
//! Every engine query and mutation is a method on [`Battlefield`]; the
//! collision, tracing, blockage, visibility, targeting, lighting, explosion,
//! reaction and action modules each contribute one `impl` block.

use bevy::math::IVec3;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use sha3::{Digest, Sha3_256};

use crate::engine::config::EngineConfig;
use crate::error::{BattlescapeError, Result};
use crate::tiles::{
    GroundItem, LightLayer, LoftLibrary, PartDefinition, PartId, PartLibrary, Tile, TileGrid,
    TilePart,
};
use crate::units::{BattleUnit, Faction, UnitId};

#[derive(Debug, Clone)]
pub struct Battlefield {
    pub(crate) config: EngineConfig,
    pub(crate) grid: TileGrid,
    pub(crate) parts: PartLibrary,
    pub(crate) lofts: LoftLibrary,
    pub(crate) units: Vec<BattleUnit>,
    pub(crate) rng: Xoshiro256PlusPlus,
    pub(crate) global_shade: u8,
    pub(crate) side: Faction,
}

impl Battlefield {
    pub fn new(
        config: EngineConfig,
        size: IVec3,
        parts: PartLibrary,
        lofts: LoftLibrary,
    ) -> Result<Self> {
        config.validate()?;
        parts.validate(&lofts)?;
        let grid = TileGrid::new(size)?;
        tracing::debug!(x = size.x, y = size.y, z = size.z, parts = parts.len(), "battlefield allocated");
        Ok(Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(config.rng_seed),
            config,
            grid,
            parts,
            lofts,
            units: Vec::new(),
            global_shade: 0,
            side: Faction::Player,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn size(&self) -> IVec3 {
        self.grid.size()
    }

    pub fn parts(&self) -> &PartLibrary {
        &self.parts
    }

    pub fn lofts(&self) -> &LoftLibrary {
        &self.lofts
    }

    pub fn global_shade(&self) -> u8 {
        self.global_shade
    }

    /// Faction whose turn it is.
    pub fn side(&self) -> Faction {
        self.side
    }

    pub fn set_side(&mut self, side: Faction) {
        self.side = side;
    }

    pub fn tile(&self, pos: IVec3) -> Option<&Tile> {
        self.grid.get(pos)
    }

    pub(crate) fn tile_mut(&mut self, pos: IVec3) -> Option<&mut Tile> {
        self.grid.get_mut(pos)
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        self.grid.contains(pos)
    }

    /// Definition of the part in `slot` at `pos`, if any.
    pub fn part_at(&self, pos: IVec3, slot: TilePart) -> Option<&PartDefinition> {
        self.tile(pos)
            .and_then(|tile| tile.part(slot))
            .and_then(|id| self.parts.get(id))
    }

    pub fn set_part(&mut self, pos: IVec3, slot: TilePart, part: Option<PartId>) -> Result<()> {
        if let Some(id) = part {
            if !self.parts.contains(id) {
                return Err(BattlescapeError::UnknownPart(id));
            }
        }
        let tile = self
            .grid
            .get_mut(pos)
            .ok_or(BattlescapeError::OutOfBounds(pos))?;
        tile.set_part(slot, part);
        Ok(())
    }

    /// Lay the same floor on every tile of a level.
    pub fn fill_level(&mut self, z: i32, floor: PartId) -> Result<()> {
        let size = self.size();
        for y in 0..size.y {
            for x in 0..size.x {
                self.set_part(IVec3::new(x, y, z), TilePart::Floor, Some(floor))?;
            }
        }
        Ok(())
    }

    /// Standing surface height in voxels, 0 to -24.
    pub fn terrain_level(&self, pos: IVec3) -> i32 {
        let floor = self
            .part_at(pos, TilePart::Floor)
            .map(|p| p.terrain_level)
            .unwrap_or(0);
        let content = self
            .part_at(pos, TilePart::Content)
            .map(|p| p.terrain_level)
            .unwrap_or(0);
        floor.min(content)
    }

    /// Nothing to stand on: no floor here, and the tile below is not raised to the ceiling.
    pub fn has_no_floor(&self, pos: IVec3) -> bool {
        let below = pos - IVec3::Z;
        if self.contains(below) && self.terrain_level(below) == -24 {
            return false;
        }
        self.part_at(pos, TilePart::Floor)
            .map(|floor| floor.no_floor)
            .unwrap_or(true)
    }

    /// Smoke and fire need a real floor that does not block fire.
    pub fn supports_volatiles(&self, pos: IVec3) -> bool {
        self.part_at(pos, TilePart::Floor)
            .map(|floor| !floor.no_floor && !floor.blocks.incendiary)
            .unwrap_or(false)
    }

    /// Returns false when the tile cannot hold smoke. Clearing always succeeds.
    pub fn set_smoke(&mut self, pos: IVec3, level: i32) -> bool {
        if level > 0 && !self.supports_volatiles(pos) {
            return false;
        }
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.set_smoke(level);
                true
            }
            None => false,
        }
    }

    pub fn set_fire(&mut self, pos: IVec3, level: i32) -> bool {
        if level > 0 && !self.supports_volatiles(pos) {
            return false;
        }
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.set_fire(level);
                true
            }
            None => false,
        }
    }

    pub fn add_item(&mut self, pos: IVec3, item: GroundItem) -> Result<()> {
        let tile = self.tile_mut(pos).ok_or(BattlescapeError::OutOfBounds(pos))?;
        tile.items_mut().push(item);
        Ok(())
    }

    /// Place a unit on the map and hand back its id.
    pub fn add_unit(&mut self, mut unit: BattleUnit) -> Result<UnitId> {
        let id = UnitId(self.units.len() as u32);
        unit.id = id;
        self.check_footprint_free(&unit, unit.position)?;
        let footprint: Vec<IVec3> = unit.footprint().collect();
        for pos in footprint {
            if let Some(tile) = self.tile_mut(pos) {
                tile.set_unit(Some(id));
            }
        }
        tracing::debug!(unit = id.0, x = unit.position.x, y = unit.position.y, z = unit.position.z, "unit placed");
        self.units.push(unit);
        Ok(id)
    }

    pub fn move_unit(&mut self, id: UnitId, to: IVec3) -> Result<()> {
        let unit = self.unit(id).ok_or(BattlescapeError::UnknownUnit(id))?;
        self.check_footprint_free(unit, to)?;
        let old: Vec<IVec3> = unit.footprint().collect();
        for pos in old {
            if let Some(tile) = self.tile_mut(pos) {
                if tile.unit() == Some(id) {
                    tile.set_unit(None);
                }
            }
        }
        let unit = &mut self.units[id.0 as usize];
        unit.position = to;
        let new: Vec<IVec3> = unit.footprint().collect();
        for pos in new {
            if let Some(tile) = self.grid.get_mut(pos) {
                tile.set_unit(Some(id));
            }
        }
        Ok(())
    }

    fn check_footprint_free(&self, unit: &BattleUnit, at: IVec3) -> Result<()> {
        let size = unit.size.max(1);
        for y in 0..size {
            for x in 0..size {
                let pos = at + IVec3::new(x, y, 0);
                let tile = self.tile(pos).ok_or(BattlescapeError::OutOfBounds(pos))?;
                match tile.unit() {
                    Some(other) if other != unit.id => {
                        return Err(BattlescapeError::Occupied(pos));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(id.0 as usize)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(id.0 as usize)
    }

    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.iter()
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }

    pub fn unit_at(&self, pos: IVec3) -> Option<UnitId> {
        self.tile(pos).and_then(Tile::unit)
    }

    /// Inclusive roll; an empty range yields its lower bound.
    pub(crate) fn roll(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    /// SHA3-256 over every tile's parts, volatiles, light and discovery state
    /// plus every unit's mutable state.
    pub fn state_digest(&self) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update([self.global_shade]);
        for tile in self.grid.iter() {
            for slot in TilePart::ALL {
                let part = tile.part(slot).map(|id| i32::from(id.0)).unwrap_or(-1);
                hasher.update(part.to_le_bytes());
                hasher.update([u8::from(tile.is_sliding_open(slot))]);
            }
            hasher.update([tile.smoke(), tile.fire(), tile.shade()]);
            for layer in LightLayer::ALL {
                hasher.update([tile.light(layer)]);
            }
            hasher.update([u8::from(tile.is_visible())]);
            hasher.update(tile.pending_explosive().to_le_bytes());
            hasher.update((tile.items().len() as u32).to_le_bytes());
        }
        for unit in &self.units {
            hasher.update(unit.position.x.to_le_bytes());
            hasher.update(unit.position.y.to_le_bytes());
            hasher.update(unit.position.z.to_le_bytes());
            hasher.update(unit.health.to_le_bytes());
            hasher.update(unit.stun_level.to_le_bytes());
            hasher.update(unit.time_units.to_le_bytes());
            hasher.update(unit.fire_turns.to_le_bytes());
            hasher.update([u8::from(unit.visible)]);
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        digest
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::tiles::StandardParts;

    /// Open map with concrete floors on every level.
    pub fn open_field(size: IVec3) -> (Battlefield, StandardParts) {
        let (parts, handles) = PartLibrary::standard();
        let mut field =
            Battlefield::new(EngineConfig::default(), size, parts, LoftLibrary::standard())
                .unwrap();
        for z in 0..size.z {
            field.fill_level(z, handles.floor).unwrap();
        }
        (field, handles)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::open_field;
    use super::*;

    #[test]
    fn test_add_and_move_unit() {
        let (mut field, _) = open_field(IVec3::new(6, 6, 2));
        let id = field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Player))
            .unwrap();
        assert_eq!(field.unit_at(IVec3::new(1, 1, 0)), Some(id));

        field.move_unit(id, IVec3::new(2, 1, 0)).unwrap();
        assert_eq!(field.unit_at(IVec3::new(1, 1, 0)), None);
        assert_eq!(field.unit_at(IVec3::new(2, 1, 0)), Some(id));
        assert_eq!(field.unit(id).unwrap().position, IVec3::new(2, 1, 0));
    }

    #[test]
    fn test_placement_errors() {
        let (mut field, _) = open_field(IVec3::new(4, 4, 1));
        field
            .add_unit(BattleUnit::new("a", IVec3::new(1, 1, 0), Faction::Player))
            .unwrap();
        let taken = field.add_unit(BattleUnit::new("b", IVec3::new(1, 1, 0), Faction::Hostile));
        assert!(matches!(taken, Err(BattlescapeError::Occupied(_))));

        let mut big = BattleUnit::new("tank", IVec3::new(3, 3, 0), Faction::Player);
        big.size = 2;
        assert!(matches!(field.add_unit(big), Err(BattlescapeError::OutOfBounds(_))));
    }

    #[test]
    fn test_large_unit_fills_footprint() {
        let (mut field, _) = open_field(IVec3::new(4, 4, 1));
        let mut big = BattleUnit::new("tank", IVec3::new(1, 1, 0), Faction::Player);
        big.size = 2;
        let id = field.add_unit(big).unwrap();
        for pos in [IVec3::new(1, 1, 0), IVec3::new(2, 1, 0), IVec3::new(1, 2, 0), IVec3::new(2, 2, 0)] {
            assert_eq!(field.unit_at(pos), Some(id));
        }
    }

    #[test]
    fn test_smoke_needs_floor() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 1));
        assert!(field.set_smoke(IVec3::new(1, 1, 0), 5));
        field.set_part(IVec3::new(2, 2, 0), TilePart::Floor, None).unwrap();
        assert!(!field.set_smoke(IVec3::new(2, 2, 0), 5));
        assert!(field.set_smoke(IVec3::new(2, 2, 0), 0));
        assert!(!field.set_fire(IVec3::new(9, 9, 0), 3));
    }

    #[test]
    fn test_set_part_rejects_unknown() {
        let (mut field, _) = open_field(IVec3::new(2, 2, 1));
        let err = field.set_part(IVec3::ZERO, TilePart::Content, Some(PartId(999)));
        assert!(matches!(err, Err(BattlescapeError::UnknownPart(_))));
        let err = field.set_part(IVec3::new(5, 0, 0), TilePart::Content, None);
        assert!(matches!(err, Err(BattlescapeError::OutOfBounds(_))));
    }

    #[test]
    fn test_has_no_floor() {
        let (mut field, parts) = open_field(IVec3::new(2, 2, 2));
        assert!(!field.has_no_floor(IVec3::new(0, 0, 1)));
        field.set_part(IVec3::new(0, 0, 1), TilePart::Floor, None).unwrap();
        assert!(field.has_no_floor(IVec3::new(0, 0, 1)));
        assert!(!field.has_no_floor(IVec3::new(0, 0, 0)));
        assert_eq!(field.terrain_level(IVec3::new(1, 1, 0)), 0);
        assert!(field.parts().get(parts.floor).is_some());
    }

    #[test]
    fn test_state_digest_tracks_changes() {
        let (mut field, _) = open_field(IVec3::new(3, 3, 1));
        let before = field.state_digest();
        assert_eq!(before, field.state_digest());
        field.set_smoke(IVec3::new(1, 1, 0), 4);
        assert_ne!(before, field.state_digest());
    }

    #[test]
    fn test_roll_is_seeded() {
        let (mut a, _) = open_field(IVec3::new(1, 1, 1));
        let (mut b, _) = open_field(IVec3::new(1, 1, 1));
        let rolls_a: Vec<i32> = (0..8).map(|_| a.roll(0, 100)).collect();
        let rolls_b: Vec<i32> = (0..8).map(|_| b.roll(0, 100)).collect();
        assert_eq!(rolls_a, rolls_b);
        assert_eq!(a.roll(5, 5), 5);
        assert_eq!(a.roll(9, 2), 9);
    }
}
