//! How much of a phenomenon is absorbed crossing between adjacent tiles.
//!
//! Vision-like phenomena (sight, stun gas, smoke, fire) are either stopped
//! outright or pass untouched. Explosive power is absorbed by each part's
//! armor. Which directions a content object obstructs comes from a single
//! (direction, big-wall shape) table.

use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use crate::battlefield::Battlefield;
use crate::constants::HARD_BLOCK;
use crate::geometry::{BigWall, Direction};
use crate::tiles::TilePart;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phenomenon {
    Vision,
    Explosive,
    Stun,
    Smoke,
    Incendiary,
}

impl Phenomenon {
    pub fn is_vision_like(self) -> bool {
        self != Phenomenon::Explosive
    }
}

const T: bool = true;
const F: bool = false;

// columns: None, Block, Nesw, Nwse, West, North, East, South, EastAndSouth, WestAndNorth
const OBSTRUCTS: [[bool; 10]; 10] = [
    [T, T, T, T, F, T, F, F, F, T], // north
    [T, T, F, T, F, T, T, F, T, T], // north-east
    [T, T, T, T, F, F, T, F, T, F], // east
    [T, T, T, F, F, F, T, T, T, F], // south-east
    [T, T, T, T, F, F, F, T, T, F], // south
    [T, T, F, T, T, F, F, T, T, T], // south-west
    [T, T, T, T, T, F, F, F, F, T], // west
    [T, T, T, F, T, T, F, F, F, T], // north-west
    [T, T, F, F, F, F, F, F, F, F], // up
    [T, T, F, F, F, F, F, F, F, F], // down
];

/// Whether a content object of this shape stands in the way of movement in `direction`.
pub fn big_wall_obstructs(direction: Direction, wall: BigWall) -> bool {
    OBSTRUCTS[direction.index()][wall.index()]
}

impl Battlefield {
    /// Blockage of one part. `direction` is the direction of travel and only
    /// matters for content objects; `from_origin` lets a blast leave its own
    /// tile past a diagonal object.
    pub fn part_blockage(
        &self,
        pos: IVec3,
        slot: TilePart,
        phenomenon: Phenomenon,
        direction: Option<Direction>,
        from_origin: bool,
    ) -> i32 {
        let Some(tile) = self.tile(pos) else {
            return 0;
        };
        let Some(part) = self.part_at(pos, slot) else {
            return 0;
        };
        if tile.is_sliding_open(slot) {
            return 0;
        }

        if slot == TilePart::Content {
            if let Some(dir) = direction {
                if !big_wall_obstructs(dir, part.big_wall) {
                    return 0;
                }
                if from_origin && part.big_wall.is_diagonal() && phenomenon != Phenomenon::Smoke {
                    return 0;
                }
                if phenomenon == Phenomenon::Smoke && part.big_wall != BigWall::None {
                    return HARD_BLOCK;
                }
            }
        }

        if slot == TilePart::Floor {
            return match phenomenon {
                Phenomenon::Explosive => part.armor,
                _ if part.no_floor => 0,
                _ => HARD_BLOCK,
            };
        }

        let stops = match phenomenon {
            Phenomenon::Explosive => return part.armor,
            Phenomenon::Vision => part.stops_line_of_sight,
            Phenomenon::Stun => part.blocks.stun,
            Phenomenon::Smoke => part.blocks.smoke,
            Phenomenon::Incendiary => part.blocks.incendiary,
        };
        if stops {
            HARD_BLOCK
        } else {
            0
        }
    }

    /// Blockage of the wall shared by two cardinally adjacent tiles.
    fn edge_blockage(&self, a: IVec3, b: IVec3, phenomenon: Phenomenon) -> i32 {
        let (owner, slot) = match (b.x - a.x, b.y - a.y) {
            (0, -1) => (a, TilePart::NorthWall),
            (0, 1) => (b, TilePart::NorthWall),
            (-1, 0) => (a, TilePart::WestWall),
            (1, 0) => (b, TilePart::WestWall),
            _ => return 0,
        };
        self.part_blockage(owner, slot, phenomenon, None, false)
    }

    /// Blockage crossing from `from` to the horizontally adjacent column of
    /// `to`, evaluated on `from`'s level. Non-adjacent or off-map pairs give 0.
    pub fn horizontal_blockage(
        &self,
        from: IVec3,
        to: IVec3,
        phenomenon: Phenomenon,
        from_origin: bool,
    ) -> i32 {
        let to = IVec3::new(to.x, to.y, from.z);
        let Some(dir) = Direction::from_vector(to - from) else {
            return 0;
        };
        if self.tile(from).is_none() || self.tile(to).is_none() {
            return 0;
        }

        let mut block = if dir.is_diagonal() {
            let via_y = IVec3::new(from.x, to.y, from.z);
            let via_x = IVec3::new(to.x, from.y, from.z);
            let walls_y = self.edge_blockage(from, via_y, phenomenon)
                + self.edge_blockage(via_y, to, phenomenon);
            let walls_x = self.edge_blockage(from, via_x, phenomenon)
                + self.edge_blockage(via_x, to, phenomenon);
            let object_y = self.part_blockage(via_y, TilePart::Content, phenomenon, Some(dir), false);
            let object_x = self.part_blockage(via_x, TilePart::Content, phenomenon, Some(dir), false);
            if phenomenon.is_vision_like() {
                // either open corner lets it through
                (walls_y + object_y).min(walls_x + object_x)
            } else {
                (walls_y + walls_x) / 2 + (object_y + object_x) / 2
            }
        } else {
            self.edge_blockage(from, to, phenomenon)
        };

        block += self.part_blockage(from, TilePart::Content, phenomenon, Some(dir), from_origin);

        // sight handles the far object in the tracer: the tile is seen, what lies behind is not
        let far_is_big_wall = self
            .part_at(to, TilePart::Content)
            .is_some_and(|part| part.big_wall != BigWall::None);
        if phenomenon != Phenomenon::Vision && far_is_big_wall {
            block += self.part_blockage(to, TilePart::Content, phenomenon, Some(dir.opposite()), false);
        }

        clamp_for(phenomenon, block)
    }

    /// Blockage crossing levels between `from` and `to`: every floor passed
    /// plus content obstructing vertical movement, in both columns when the
    /// move also changes x or y.
    pub fn vertical_blockage(&self, from: IVec3, to: IVec3, phenomenon: Phenomenon) -> i32 {
        let dz = to.z - from.z;
        if dz == 0 {
            return 0;
        }
        let mut columns = vec![(from.x, from.y)];
        if from.x != to.x || from.y != to.y {
            columns.push((to.x, to.y));
        }
        let (levels, dir) = if dz < 0 {
            (to.z + 1..=from.z, Direction::Down)
        } else {
            (from.z + 1..=to.z, Direction::Up)
        };

        let mut block = 0;
        for z in levels {
            for &(x, y) in &columns {
                let pos = IVec3::new(x, y, z);
                block += self.part_blockage(pos, TilePart::Floor, phenomenon, None, false);
                block += self.part_blockage(pos, TilePart::Content, phenomenon, Some(dir), false);
            }
        }
        clamp_for(phenomenon, block)
    }

    /// Full cost of one tracer step: across on the starting level, then up or down.
    pub fn crossing_blockage(&self, from: IVec3, to: IVec3, phenomenon: Phenomenon) -> i32 {
        self.crossing_blockage_from(from, to, phenomenon, false)
    }

    pub(crate) fn crossing_blockage_from(
        &self,
        from: IVec3,
        to: IVec3,
        phenomenon: Phenomenon,
        from_origin: bool,
    ) -> i32 {
        if from.z == to.z {
            return self.horizontal_blockage(from, to, phenomenon, from_origin);
        }
        let side = IVec3::new(to.x, to.y, from.z);
        self.horizontal_blockage(from, side, phenomenon, from_origin)
            + self.vertical_blockage(side, to, phenomenon)
    }

    /// Content of `pos` is opaque and faces a viewer standing in `toward`.
    pub(crate) fn content_faces_sight(&self, pos: IVec3, toward: Direction) -> bool {
        let open = self
            .tile(pos)
            .map(|tile| tile.is_sliding_open(TilePart::Content))
            .unwrap_or(true);
        !open
            && self.part_at(pos, TilePart::Content).is_some_and(|part| {
                part.stops_line_of_sight && big_wall_obstructs(toward.opposite(), part.big_wall)
            })
    }
}

fn clamp_for(phenomenon: Phenomenon, block: i32) -> i32 {
    if phenomenon.is_vision_like() {
        if block > 0 {
            HARD_BLOCK
        } else {
            0
        }
    } else {
        block
    }
}
