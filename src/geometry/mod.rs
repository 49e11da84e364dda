//! Direction and geometry utilities shared with the pathfinder.
//!
//! Coordinates follow the battlescape convention: +x is east, +y is south,
//! +z is up. Tile positions and voxel positions are both `IVec3`; the
//! helpers here convert between them.

use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{TILE_VOXELS_XY, TILE_VOXELS_Z};

/// One of the eight compass directions or straight up/down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
    Up = 8,
    Down = 9,
}

const DIR_X: [i32; 10] = [0, 1, 1, 1, 0, -1, -1, -1, 0, 0];
const DIR_Y: [i32; 10] = [-1, -1, 0, 1, 1, 1, 0, -1, 0, 0];
const DIR_Z: [i32; 10] = [0, 0, 0, 0, 0, 0, 0, 0, 1, -1];

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::Up,
        Direction::Down,
    ];

    pub const HORIZONTAL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Returns `None` for anything outside 0..=9.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn to_vector(self) -> IVec3 {
        let i = self.index();
        IVec3::new(DIR_X[i], DIR_Y[i], DIR_Z[i])
    }

    /// Inverse of [`to_vector`](Self::to_vector); only unit steps map back.
    pub fn from_vector(v: IVec3) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.to_vector() == v)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            horizontal => Self::HORIZONTAL[(horizontal.index() + 4) % 8],
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::SouthEast | Direction::SouthWest | Direction::NorthWest
        )
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Rotate clockwise by `steps` eighths of a turn. Vertical directions are unchanged.
    pub fn rotated(self, steps: i32) -> Self {
        if self.is_vertical() {
            return self;
        }
        let index = (self.index() as i32 + steps).rem_euclid(8) as usize;
        Self::HORIZONTAL[index]
    }
}

/// Shape of a content object, deciding which directions it obstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BigWall {
    /// Ordinary object occupying part of the tile
    #[default]
    None = 0,
    /// Fills the whole tile
    Block = 1,
    /// Diagonal from the north-east corner to the south-west corner
    Nesw = 2,
    /// Diagonal from the north-west corner to the south-east corner
    Nwse = 3,
    West = 4,
    North = 5,
    East = 6,
    South = 7,
    EastAndSouth = 8,
    WestAndNorth = 9,
}

impl BigWall {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_diagonal(self) -> bool {
        matches!(self, BigWall::Nesw | BigWall::Nwse)
    }
}

/// Compass bearing from `origin` to `target`, snapped to one of eight 45° slices.
/// Identical positions face north.
pub fn direction_to(origin: IVec3, target: IVec3) -> Direction {
    let dx = f64::from(target.x - origin.x);
    let dy = f64::from(target.y - origin.y);
    if dx == 0.0 && dy == 0.0 {
        return Direction::North;
    }
    let bearing = dx.atan2(-dy).rem_euclid(std::f64::consts::TAU);
    let slice = (bearing / std::f64::consts::FRAC_PI_4).round() as usize % 8;
    Direction::HORIZONTAL[slice]
}

/// Rounded euclidean distance between two tile positions.
pub fn distance(a: IVec3, b: IVec3) -> i32 {
    f64::from(distance_sq(a, b)).sqrt().round() as i32
}

pub fn distance_sq(a: IVec3, b: IVec3) -> i32 {
    let d = b - a;
    d.x * d.x + d.y * d.y + d.z * d.z
}

/// Horizontal distance between two tile positions, ignoring z.
pub fn distance_2d(a: IVec3, b: IVec3) -> i32 {
    let d = b - a;
    f64::from(d.x * d.x + d.y * d.y).sqrt().round() as i32
}

/// Tile containing a voxel. Negative voxels map to negative tiles.
pub fn tile_of_voxel(voxel: IVec3) -> IVec3 {
    IVec3::new(
        voxel.x.div_euclid(TILE_VOXELS_XY),
        voxel.y.div_euclid(TILE_VOXELS_XY),
        voxel.z.div_euclid(TILE_VOXELS_Z),
    )
}

/// Voxel at the north-west bottom corner of a tile.
pub fn voxel_of_tile(tile: IVec3) -> IVec3 {
    tile * IVec3::new(TILE_VOXELS_XY, TILE_VOXELS_XY, TILE_VOXELS_Z)
}

/// Voxel used as the horizontal centre of a tile at floor height.
pub fn tile_anchor_voxel(tile: IVec3) -> IVec3 {
    voxel_of_tile(tile) + IVec3::new(7, 8, 0)
}

/// Whether `target` lies inside the sector seen by a unit at `viewer` facing `facing`.
/// Cardinal facings cover ±45°, diagonal facings the full quarter between their neighbours.
pub fn in_view_sector(viewer: IVec3, facing: Direction, target: IVec3) -> bool {
    let dx = target.x - viewer.x;
    // north is positive here
    let dy = viewer.y - target.y;
    match facing {
        Direction::North => dx + dy >= 0 && dy - dx >= 0,
        Direction::NorthEast => dx >= 0 && dy >= 0,
        Direction::East => dx + dy >= 0 && dx - dy >= 0,
        Direction::SouthEast => dy <= 0 && dx >= 0,
        Direction::South => dx + dy <= 0 && dy - dx <= 0,
        Direction::SouthWest => dy <= 0 && dx <= 0,
        Direction::West => dx + dy <= 0 && dx - dy <= 0,
        Direction::NorthWest => dy >= 0 && dx <= 0,
        Direction::Up | Direction::Down => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_vectors() {
        assert_eq!(Direction::North.to_vector(), IVec3::new(0, -1, 0));
        assert_eq!(Direction::East.to_vector(), IVec3::new(1, 0, 0));
        assert_eq!(Direction::SouthWest.to_vector(), IVec3::new(-1, 1, 0));
        assert_eq!(Direction::Up.to_vector(), IVec3::new(0, 0, 1));
        for d in Direction::ALL {
            assert_eq!(Direction::from_vector(d.to_vector()), Some(d));
        }
    }

    #[test]
    fn test_from_index_rejects_out_of_range() {
        assert_eq!(Direction::from_index(2), Some(Direction::East));
        assert_eq!(Direction::from_index(-1), None);
        assert_eq!(Direction::from_index(10), None);
    }

    #[test]
    fn test_opposite_and_rotation() {
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::NorthWest.opposite(), Direction::SouthEast);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::North.rotated(-1), Direction::NorthWest);
        assert_eq!(Direction::West.rotated(3), Direction::NorthEast);
    }

    #[test]
    fn test_direction_to_slices() {
        let o = IVec3::ZERO;
        assert_eq!(direction_to(o, IVec3::new(0, -5, 0)), Direction::North);
        assert_eq!(direction_to(o, IVec3::new(5, 0, 0)), Direction::East);
        assert_eq!(direction_to(o, IVec3::new(3, 3, 0)), Direction::SouthEast);
        assert_eq!(direction_to(o, IVec3::new(-4, 1, 0)), Direction::West);
        assert_eq!(direction_to(o, o), Direction::North);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(IVec3::ZERO, IVec3::new(3, 4, 0)), 5);
        assert_eq!(distance_sq(IVec3::ZERO, IVec3::new(1, 1, 1)), 3);
        assert_eq!(distance_2d(IVec3::ZERO, IVec3::new(3, 4, 7)), 5);
    }

    #[test]
    fn test_voxel_tile_conversion() {
        assert_eq!(tile_of_voxel(IVec3::new(31, 16, 47)), IVec3::new(1, 1, 1));
        assert_eq!(tile_of_voxel(IVec3::new(-1, 0, 0)), IVec3::new(-1, 0, 0));
        assert_eq!(voxel_of_tile(IVec3::new(2, 1, 1)), IVec3::new(32, 16, 24));
        assert_eq!(tile_anchor_voxel(IVec3::ZERO), IVec3::new(7, 8, 0));
    }

    #[test]
    fn test_view_sector_cardinal() {
        let o = IVec3::new(5, 5, 0);
        assert!(in_view_sector(o, Direction::East, IVec3::new(9, 5, 0)));
        assert!(in_view_sector(o, Direction::East, IVec3::new(9, 1, 0)));
        assert!(!in_view_sector(o, Direction::East, IVec3::new(9, 0, 0)));
        assert!(!in_view_sector(o, Direction::East, IVec3::new(1, 5, 0)));
    }

    #[test]
    fn test_view_sector_diagonal() {
        let o = IVec3::new(5, 5, 0);
        assert!(in_view_sector(o, Direction::NorthEast, IVec3::new(5, 0, 0)));
        assert!(in_view_sector(o, Direction::NorthEast, IVec3::new(9, 5, 0)));
        assert!(!in_view_sector(o, Direction::NorthEast, IVec3::new(4, 4, 0)));
    }
}
