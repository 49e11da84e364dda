use bevy::math::IVec3;

use super::tile::Tile;
use crate::error::{BattlescapeError, Result};

/// Fixed-size 3-D array of tiles, allocated once per mission.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    size: IVec3,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(size: IVec3) -> Result<Self> {
        let invalid = || BattlescapeError::InvalidDimensions {
            x: size.x,
            y: size.y,
            z: size.z,
        };
        if size.x <= 0 || size.y <= 0 || size.z <= 0 {
            return Err(invalid());
        }
        // tile indices are computed in i32
        let count = size
            .x
            .checked_mul(size.y)
            .and_then(|area| area.checked_mul(size.z))
            .ok_or_else(invalid)?;
        let mut tiles = Vec::with_capacity(count as usize);
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    tiles.push(Tile::new(IVec3::new(x, y, z)));
                }
            }
        }
        Ok(Self { size, tiles })
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.size).all()
    }

    pub fn index(&self, pos: IVec3) -> Option<usize> {
        self.contains(pos)
            .then(|| (pos.z * self.size.y * self.size.x + pos.y * self.size.x + pos.x) as usize)
    }

    /// `None` outside the grid.
    pub fn get(&self, pos: IVec3) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, pos: IVec3) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    pub fn positions(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.tiles.iter().map(Tile::position)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_allocation() {
        let grid = TileGrid::new(IVec3::new(4, 3, 2)).unwrap();
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.size(), IVec3::new(4, 3, 2));
        for pos in grid.positions() {
            assert_eq!(grid.get(pos).unwrap().position(), pos);
        }
    }

    #[test]
    fn test_out_of_bounds_lookup() {
        let grid = TileGrid::new(IVec3::new(2, 2, 1)).unwrap();
        assert!(grid.get(IVec3::new(-1, 0, 0)).is_none());
        assert!(grid.get(IVec3::new(0, 2, 0)).is_none());
        assert!(grid.get(IVec3::new(0, 0, 1)).is_none());
        assert!(grid.get(IVec3::new(1, 1, 0)).is_some());
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(
            TileGrid::new(IVec3::new(0, 5, 5)),
            Err(BattlescapeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            TileGrid::new(IVec3::new(i32::MAX, 2, 1)),
            Err(BattlescapeError::InvalidDimensions { x: i32::MAX, y: 2, z: 1 })
        ));
        assert!(matches!(
            TileGrid::new(IVec3::new(65_536, 65_536, 4)),
            Err(BattlescapeError::InvalidDimensions { .. })
        ));
    }
}
