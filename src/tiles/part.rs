//! Part definitions and the per-mission part arena.
//!
//! Tiles never own their parts; they hold a [`PartId`] into a
//! [`PartLibrary`] that is loaded once and shared by every tile.

use serde::{Deserialize, Serialize};

use super::loft::*;
use crate::constants::{INDESTRUCTIBLE_ARMOR, LOFT_LAYERS};
use crate::error::{BattlescapeError, Result};
use crate::geometry::BigWall;

/// Slot of a part within a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TilePart {
    Floor = 0,
    WestWall = 1,
    NorthWall = 2,
    Content = 3,
}

impl TilePart {
    pub const ALL: [TilePart; 4] = [
        TilePart::Floor,
        TilePart::WestWall,
        TilePart::NorthWall,
        TilePart::Content,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Handle into a [`PartLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoorKind {
    #[default]
    None,
    /// Swings open by swapping to the part's `opened_into` successor
    Hinged,
    /// Slides aside while the part itself stays in place
    Sliding,
}

/// Which vision-like phenomena a part stops outright. Explosive power is
/// absorbed by armor instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhenomenonBlock {
    pub stun: bool,
    pub smoke: bool,
    pub incendiary: bool,
}

impl PhenomenonBlock {
    pub const ALL: PhenomenonBlock = PhenomenonBlock {
        stun: true,
        smoke: true,
        incendiary: true,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartDefinition {
    pub name: String,
    /// Slot the part occupies when placed, also where successors land
    pub slot: TilePart,
    pub armor: i32,
    /// 255 never ignites
    pub flammability: i32,
    pub fuel: i32,
    pub light_source: i32,
    pub stops_line_of_sight: bool,
    pub blocks: PhenomenonBlock,
    pub big_wall: BigWall,
    pub door: DoorKind,
    pub destroyed_into: Option<PartId>,
    pub opened_into: Option<PartId>,
    /// Power of the chained blast when this part is destroyed
    pub explosive_power: i32,
    /// Height of the standing surface, 0 to -24 voxels
    pub terrain_level: i32,
    /// Floors flagged here do not support anything standing on them
    pub no_floor: bool,
    /// Time units needed to walk through or open this part
    pub walk_cost: i32,
    pub loft: [u8; LOFT_LAYERS],
}

impl Default for PartDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            slot: TilePart::Content,
            armor: 20,
            flammability: 255,
            fuel: 0,
            light_source: 0,
            stops_line_of_sight: false,
            blocks: PhenomenonBlock::default(),
            big_wall: BigWall::None,
            door: DoorKind::None,
            destroyed_into: None,
            opened_into: None,
            explosive_power: 0,
            terrain_level: 0,
            no_floor: false,
            walk_cost: 4,
            loft: [LOFT_EMPTY; LOFT_LAYERS],
        }
    }
}

impl PartDefinition {
    pub fn new(name: impl Into<String>, slot: TilePart) -> Self {
        Self {
            name: name.into(),
            slot,
            ..Default::default()
        }
    }

    pub fn floor(name: impl Into<String>, armor: i32) -> Self {
        let mut loft = [LOFT_EMPTY; LOFT_LAYERS];
        loft[0] = LOFT_SOLID;
        Self {
            armor,
            loft,
            ..Self::new(name, TilePart::Floor)
        }
    }

    pub fn wall(name: impl Into<String>, slot: TilePart, armor: i32) -> Self {
        let template = if slot == TilePart::NorthWall {
            LOFT_NORTH_SLAB
        } else {
            LOFT_WEST_SLAB
        };
        Self {
            armor,
            stops_line_of_sight: true,
            blocks: PhenomenonBlock::ALL,
            walk_cost: 255,
            loft: [template; LOFT_LAYERS],
            ..Self::new(name, slot)
        }
    }

    /// Content object with a big-wall shape and a matching full-height template.
    pub fn big_wall(name: impl Into<String>, shape: BigWall, armor: i32) -> Self {
        let template = match shape {
            BigWall::None => LOFT_CRATE,
            BigWall::Block | BigWall::EastAndSouth | BigWall::WestAndNorth => LOFT_SOLID,
            BigWall::Nesw => LOFT_DIAGONAL_NESW,
            BigWall::Nwse => LOFT_DIAGONAL_NWSE,
            BigWall::West => LOFT_WEST_SLAB,
            BigWall::North => LOFT_NORTH_SLAB,
            BigWall::East => LOFT_EAST_SLAB,
            BigWall::South => LOFT_SOUTH_SLAB,
        };
        Self {
            armor,
            stops_line_of_sight: true,
            blocks: PhenomenonBlock::ALL,
            big_wall: shape,
            walk_cost: 255,
            loft: [template; LOFT_LAYERS],
            ..Self::new(name, TilePart::Content)
        }
    }

    /// Waist-high object that does not stop sight.
    pub fn crate_object(name: impl Into<String>, armor: i32) -> Self {
        let mut loft = [LOFT_EMPTY; LOFT_LAYERS];
        loft[..6].fill(LOFT_CRATE);
        Self {
            armor,
            walk_cost: 6,
            loft,
            ..Self::new(name, TilePart::Content)
        }
    }

    pub fn with_successor(mut self, successor: PartId) -> Self {
        self.destroyed_into = Some(successor);
        self
    }

    pub fn with_flammability(mut self, flammability: i32, fuel: i32) -> Self {
        self.flammability = flammability;
        self.fuel = fuel;
        self
    }

    pub fn with_light(mut self, power: i32) -> Self {
        self.light_source = power;
        self
    }

    pub fn with_explosive(mut self, power: i32) -> Self {
        self.explosive_power = power;
        self
    }

    pub fn is_destructible(&self) -> bool {
        self.armor < INDESTRUCTIBLE_ARMOR
    }

    pub fn is_door(&self) -> bool {
        self.door != DoorKind::None
    }

    /// Layers with any solid voxel; drives the smoke left by a destroyed part.
    pub fn volume(&self) -> i32 {
        self.loft.iter().filter(|layer| **layer != LOFT_EMPTY).count() as i32
    }
}

/// Handles of the parts registered by [`PartLibrary::standard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardParts {
    pub floor: PartId,
    pub rubble: PartId,
    pub bedrock: PartId,
    pub brick_west: PartId,
    pub brick_north: PartId,
    pub rock: PartId,
    pub fence_nesw: PartId,
    pub fence_nwse: PartId,
    pub crate_object: PartId,
    pub fuel_tank: PartId,
    pub lamp_post: PartId,
    pub door_west: PartId,
    pub door_west_open: PartId,
    pub sliding_door_north: PartId,
    pub window_west: PartId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartLibrary {
    parts: Vec<PartDefinition>,
}

impl PartLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a part. Successor handles are not checked until [`validate`](Self::validate).
    pub fn add(&mut self, part: PartDefinition) -> PartId {
        self.parts.push(part);
        PartId((self.parts.len() - 1) as u16)
    }

    pub fn get(&self, id: PartId) -> Option<&PartDefinition> {
        self.parts.get(usize::from(id.0))
    }

    pub fn contains(&self, id: PartId) -> bool {
        usize::from(id.0) < self.parts.len()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<PartId> {
        self.parts
            .iter()
            .position(|part| part.name == name)
            .map(|i| PartId(i as u16))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartId, &PartDefinition)> {
        self.parts
            .iter()
            .enumerate()
            .map(|(i, part)| (PartId(i as u16), part))
    }

    /// Parse a RON list of part definitions and check every reference.
    pub fn from_ron_str(source: &str, lofts: &LoftLibrary) -> Result<Self> {
        let parts: Vec<PartDefinition> = ron::from_str(source)?;
        let library = Self { parts };
        library.validate(lofts)?;
        Ok(library)
    }

    /// Every successor must exist and armor must not be negative. Destroy
    /// chains must end: a part never turns back into one of its own
    /// predecessors.
    pub fn validate(&self, lofts: &LoftLibrary) -> Result<()> {
        for (id, part) in self.iter() {
            if part.armor < 0 {
                return Err(BattlescapeError::NegativeArmor {
                    name: part.name.clone(),
                    armor: part.armor,
                });
            }
            for successor in [part.destroyed_into, part.opened_into].into_iter().flatten() {
                if !self.contains(successor) {
                    return Err(BattlescapeError::DanglingSuccessor {
                        name: part.name.clone(),
                        successor,
                    });
                }
            }
            if let Some(missing) = part.loft.iter().find(|id| !lofts.contains(**id)) {
                return Err(BattlescapeError::UnknownLoft(*missing));
            }
            if !(-24..=0).contains(&part.terrain_level) {
                return Err(BattlescapeError::InvalidConfig(format!(
                    "part '{}' has terrain level {} outside -24..=0",
                    part.name, part.terrain_level
                )));
            }
            if self.destroy_chain_loops(id) {
                return Err(BattlescapeError::SuccessorCycle {
                    name: part.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Follows `destroyed_into` from `start`; a chain longer than the
    /// library revisits some part.
    fn destroy_chain_loops(&self, start: PartId) -> bool {
        let mut current = start;
        for _ in 0..=self.parts.len() {
            match self.get(current).and_then(|part| part.destroyed_into) {
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }

    /// A small terrain set: floors, brick walls, a rock block, diagonal fences,
    /// crates, a fuel tank, a lamp post and doors.
    pub fn standard() -> (Self, StandardParts) {
        let mut lib = Self::new();

        let rubble = lib.add(PartDefinition {
            flammability: 60,
            fuel: 2,
            ..PartDefinition::floor("rubble", 40)
        });
        let floor = lib.add(PartDefinition::floor("concrete floor", 60).with_successor(rubble));
        let bedrock = lib.add(PartDefinition::floor("bedrock", INDESTRUCTIBLE_ARMOR));
        let brick_west = lib.add(PartDefinition::wall("brick wall", TilePart::WestWall, 50));
        let brick_north = lib.add(PartDefinition::wall("brick wall", TilePart::NorthWall, 50));
        let rock = lib.add(PartDefinition::big_wall("rock", BigWall::Block, 120));
        let fence_nesw = lib.add(PartDefinition::big_wall("fence", BigWall::Nesw, 15));
        let fence_nwse = lib.add(PartDefinition::big_wall("fence", BigWall::Nwse, 15));
        let crate_object = lib.add(
            PartDefinition::crate_object("wooden crate", 10).with_flammability(25, 5),
        );
        let fuel_tank = lib.add(PartDefinition::crate_object("fuel tank", 30).with_explosive(60));
        let lamp_post = lib.add(PartDefinition {
            loft: [LOFT_POST; LOFT_LAYERS],
            ..PartDefinition::crate_object("lamp post", 30).with_light(12)
        });
        let door_west_open = lib.add(PartDefinition {
            stops_line_of_sight: false,
            blocks: PhenomenonBlock::default(),
            walk_cost: 4,
            loft: [LOFT_EMPTY; LOFT_LAYERS],
            ..PartDefinition::wall("open door", TilePart::WestWall, 30)
        });
        let door_west = lib.add(PartDefinition {
            door: DoorKind::Hinged,
            opened_into: Some(door_west_open),
            walk_cost: 4,
            ..PartDefinition::wall("door", TilePart::WestWall, 30)
        });
        let sliding_door_north = lib.add(PartDefinition {
            door: DoorKind::Sliding,
            walk_cost: 4,
            ..PartDefinition::wall("sliding door", TilePart::NorthWall, INDESTRUCTIBLE_ARMOR)
        });
        let window_west = lib.add(PartDefinition {
            stops_line_of_sight: false,
            blocks: PhenomenonBlock {
                smoke: true,
                ..Default::default()
            },
            ..PartDefinition::wall("window", TilePart::WestWall, 20)
        });

        let handles = StandardParts {
            floor,
            rubble,
            bedrock,
            brick_west,
            brick_north,
            rock,
            fence_nesw,
            fence_nwse,
            crate_object,
            fuel_tank,
            lamp_post,
            door_west,
            door_west_open,
            sliding_door_north,
            window_west,
        };
        (lib, handles)
    }
}
