use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use super::part::{PartId, TilePart};
use crate::constants::{MAX_FIRE, MAX_SHADE, MAX_SMOKE};
use crate::units::UnitId;

/// Light layers, each rebuilt independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightLayer {
    Ambient = 0,
    Static = 1,
    Dynamic = 2,
}

impl LightLayer {
    pub const ALL: [LightLayer; 3] = [LightLayer::Ambient, LightLayer::Static, LightLayer::Dynamic];
}

/// Discovery flags a tile keeps for the player's map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoveryEdge {
    WestWall = 0,
    NorthWall = 1,
    /// Floor, content object and the edges it implies to the east and south
    Floor = 2,
}

/// Item lying on a tile. Unconscious or dead units are carried as bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundItem {
    pub name: String,
    pub armor: i32,
    /// Flares glow with this power
    pub light_power: i32,
    pub weight: i32,
    pub body: Option<UnitId>,
}

impl GroundItem {
    pub fn new(name: impl Into<String>, armor: i32) -> Self {
        Self {
            name: name.into(),
            armor,
            light_power: 0,
            weight: 1,
            body: None,
        }
    }

    pub fn flare(power: i32) -> Self {
        Self {
            light_power: power,
            ..Self::new("flare", 10)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    position: IVec3,
    parts: [Option<PartId>; 4],
    sliding_open: [bool; 4],
    smoke: u8,
    fire: u8,
    light: [u8; 3],
    discovered: [bool; 3],
    visible: bool,
    pending_explosive: i32,
    unit: Option<UnitId>,
    items: Vec<GroundItem>,
}

impl Tile {
    pub fn new(position: IVec3) -> Self {
        Self {
            position,
            parts: [None; 4],
            sliding_open: [false; 4],
            smoke: 0,
            fire: 0,
            light: [0; 3],
            discovered: [false; 3],
            visible: false,
            pending_explosive: 0,
            unit: None,
            items: Vec::new(),
        }
    }

    pub fn position(&self) -> IVec3 {
        self.position
    }

    pub fn part(&self, slot: TilePart) -> Option<PartId> {
        self.parts[slot.index()]
    }

    pub(crate) fn set_part(&mut self, slot: TilePart, part: Option<PartId>) {
        self.parts[slot.index()] = part;
        self.sliding_open[slot.index()] = false;
    }

    pub fn is_sliding_open(&self, slot: TilePart) -> bool {
        self.sliding_open[slot.index()]
    }

    pub(crate) fn set_sliding_open(&mut self, slot: TilePart, open: bool) {
        self.sliding_open[slot.index()] = open;
    }

    /// No floor and nobody standing here. Walls and content alone do not count.
    pub fn is_void(&self) -> bool {
        self.parts[TilePart::Floor.index()].is_none() && self.unit.is_none()
    }

    pub fn has_no_parts(&self) -> bool {
        self.parts.iter().all(Option::is_none)
    }

    pub fn smoke(&self) -> u8 {
        self.smoke
    }

    pub fn fire(&self) -> u8 {
        self.fire
    }

    pub(crate) fn set_smoke(&mut self, level: i32) {
        self.smoke = level.clamp(0, i32::from(MAX_SMOKE)) as u8;
    }

    pub(crate) fn set_fire(&mut self, level: i32) {
        self.fire = level.clamp(0, i32::from(MAX_FIRE)) as u8;
    }

    pub fn light(&self, layer: LightLayer) -> u8 {
        self.light[layer as usize]
    }

    pub(crate) fn reset_light(&mut self, layer: LightLayer) {
        self.light[layer as usize] = 0;
    }

    /// Keeps the strongest contribution.
    pub(crate) fn add_light(&mut self, layer: LightLayer, power: i32) {
        let power = power.clamp(0, i32::from(MAX_SHADE)) as u8;
        let slot = &mut self.light[layer as usize];
        *slot = (*slot).max(power);
    }

    /// 0 is fully lit, 15 is pitch dark.
    pub fn shade(&self) -> u8 {
        let brightest = self.light.iter().copied().max().unwrap_or(0);
        MAX_SHADE.saturating_sub(brightest)
    }

    pub fn is_discovered(&self, edge: DiscoveryEdge) -> bool {
        self.discovered[edge as usize]
    }

    pub(crate) fn discover(&mut self, edge: DiscoveryEdge) {
        self.discovered[edge as usize] = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn pending_explosive(&self) -> i32 {
        self.pending_explosive
    }

    /// Records blast power reaching this tile; only the strongest ray counts.
    pub(crate) fn mark_explosive(&mut self, power: i32) {
        self.pending_explosive = self.pending_explosive.max(power);
    }

    pub(crate) fn take_pending_explosive(&mut self) -> i32 {
        std::mem::take(&mut self.pending_explosive)
    }

    pub fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    pub(crate) fn set_unit(&mut self, unit: Option<UnitId>) {
        self.unit = unit;
    }

    pub fn items(&self) -> &[GroundItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<GroundItem> {
        &mut self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tile_is_void_and_dark() {
        let tile = Tile::new(IVec3::new(1, 2, 0));
        assert!(tile.is_void());
        assert!(tile.has_no_parts());
        assert_eq!(tile.shade(), MAX_SHADE);
        assert_eq!(tile.position(), IVec3::new(1, 2, 0));
    }

    #[test]
    fn test_content_without_floor_is_void() {
        let mut tile = Tile::new(IVec3::new(2, 2, 1));
        tile.set_part(TilePart::Content, Some(PartId(3)));
        tile.set_part(TilePart::WestWall, Some(PartId(4)));
        assert!(tile.is_void());
        assert!(!tile.has_no_parts());

        tile.set_part(TilePart::Floor, Some(PartId(0)));
        assert!(!tile.is_void());
    }

    #[test]
    fn test_volatiles_clamped() {
        let mut tile = Tile::new(IVec3::ZERO);
        tile.set_smoke(40);
        tile.set_fire(-3);
        assert_eq!(tile.smoke(), MAX_SMOKE);
        assert_eq!(tile.fire(), 0);
        tile.set_fire(99);
        assert_eq!(tile.fire(), MAX_FIRE);
    }

    #[test]
    fn test_shade_uses_brightest_layer() {
        let mut tile = Tile::new(IVec3::ZERO);
        tile.add_light(LightLayer::Ambient, 4);
        tile.add_light(LightLayer::Dynamic, 11);
        tile.add_light(LightLayer::Dynamic, 6);
        assert_eq!(tile.light(LightLayer::Dynamic), 11);
        assert_eq!(tile.shade(), 4);
        tile.reset_light(LightLayer::Dynamic);
        assert_eq!(tile.shade(), 11);
    }

    #[test]
    fn test_pending_explosive_keeps_max() {
        let mut tile = Tile::new(IVec3::ZERO);
        tile.mark_explosive(30);
        tile.mark_explosive(70);
        tile.mark_explosive(50);
        assert_eq!(tile.take_pending_explosive(), 70);
        assert_eq!(tile.pending_explosive(), 0);
    }

    #[test]
    fn test_discovery_flags_independent() {
        let mut tile = Tile::new(IVec3::ZERO);
        tile.discover(DiscoveryEdge::NorthWall);
        assert!(tile.is_discovered(DiscoveryEdge::NorthWall));
        assert!(!tile.is_discovered(DiscoveryEdge::WestWall));
        assert!(!tile.is_discovered(DiscoveryEdge::Floor));
    }
}
