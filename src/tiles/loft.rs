//! Line-of-fire templates.
//!
//! A template is a 16×16 bitmask describing which voxel columns of one
//! two-voxel-high layer of a tile are solid. Row index is the sub-tile y,
//! bit index is the sub-tile x.

use serde::{Deserialize, Serialize};

use crate::constants::{LOFT_ROWS, TILE_VOXELS_XY};
use crate::error::{BattlescapeError, Result};

pub type LoftTemplate = [u16; LOFT_ROWS];

pub const LOFT_EMPTY: u8 = 0;
pub const LOFT_SOLID: u8 = 1;
pub const LOFT_WEST_SLAB: u8 = 2;
pub const LOFT_NORTH_SLAB: u8 = 3;
pub const LOFT_EAST_SLAB: u8 = 4;
pub const LOFT_SOUTH_SLAB: u8 = 5;
pub const LOFT_DIAGONAL_NESW: u8 = 6;
pub const LOFT_DIAGONAL_NWSE: u8 = 7;
pub const LOFT_CRATE: u8 = 8;
pub const LOFT_UNIT: u8 = 9;
pub const LOFT_POST: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoftLibrary {
    templates: Vec<LoftTemplate>,
}

impl LoftLibrary {
    /// Library holding only the empty template.
    pub fn new() -> Self {
        Self {
            templates: vec![[0; LOFT_ROWS]],
        }
    }

    /// Built-in template set covering slabs, diagonals, crates and unit bodies.
    pub fn standard() -> Self {
        let mut lib = Self::new();
        lib.templates.push(Self::rasterize(|_, _| true));
        lib.templates.push(Self::rasterize(|x, _| x < 2));
        lib.templates.push(Self::rasterize(|_, y| y < 2));
        lib.templates.push(Self::rasterize(|x, _| x >= 14));
        lib.templates.push(Self::rasterize(|_, y| y >= 14));
        lib.templates.push(Self::rasterize(|x, y| (14..=16).contains(&(x + y))));
        lib.templates.push(Self::rasterize(|x, y| (x - y).abs() <= 1));
        lib.templates.push(Self::rasterize(|x, y| (3..13).contains(&x) && (3..13).contains(&y)));
        lib.templates.push(Self::rasterize(|x, y| {
            let dx = f64::from(x) - 7.5;
            let dy = f64::from(y) - 7.5;
            dx * dx + dy * dy <= 20.25
        }));
        lib.templates.push(Self::rasterize(|x, y| (6..10).contains(&x) && (6..10).contains(&y)));
        lib
    }

    /// Parse a list of templates. Index 0 must be the empty template.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let templates: Vec<LoftTemplate> = ron::from_str(source)?;
        match templates.first() {
            Some(first) if first.iter().all(|row| *row == 0) => Ok(Self { templates }),
            _ => Err(BattlescapeError::InvalidConfig(
                "loft template 0 must exist and be empty".into(),
            )),
        }
    }

    pub fn add(&mut self, template: LoftTemplate) -> u8 {
        self.templates.push(template);
        (self.templates.len() - 1) as u8
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, id: u8) -> bool {
        usize::from(id) < self.templates.len()
    }

    /// Whether sub-tile column (x, y) of template `id` is solid.
    /// Unknown templates are treated as empty.
    pub fn is_solid(&self, id: u8, x: i32, y: i32) -> bool {
        let x = x.rem_euclid(TILE_VOXELS_XY);
        let y = y.rem_euclid(TILE_VOXELS_XY) as usize;
        self.templates
            .get(usize::from(id))
            .map(|template| template[y] & (1 << x) != 0)
            .unwrap_or(false)
    }

    /// Number of solid columns in a template.
    pub fn solid_columns(&self, id: u8) -> u32 {
        self.templates
            .get(usize::from(id))
            .map(|template| template.iter().map(|row| row.count_ones()).sum())
            .unwrap_or(0)
    }

    fn rasterize(solid: impl Fn(i32, i32) -> bool) -> LoftTemplate {
        let mut template = [0u16; LOFT_ROWS];
        for (y, row) in template.iter_mut().enumerate() {
            for x in 0..TILE_VOXELS_XY {
                if solid(x, y as i32) {
                    *row |= 1 << x;
                }
            }
        }
        template
    }
}

impl Default for LoftLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_templates() {
        let lib = LoftLibrary::standard();
        assert_eq!(lib.len(), 11);
        assert!(!lib.is_solid(LOFT_EMPTY, 5, 5));
        assert!(lib.is_solid(LOFT_SOLID, 15, 15));
        assert!(lib.is_solid(LOFT_WEST_SLAB, 1, 9));
        assert!(!lib.is_solid(LOFT_WEST_SLAB, 2, 9));
        assert!(lib.is_solid(LOFT_NORTH_SLAB, 9, 0));
        assert!(lib.is_solid(LOFT_DIAGONAL_NESW, 15, 0));
        assert!(!lib.is_solid(LOFT_DIAGONAL_NESW, 0, 0));
        assert!(lib.is_solid(LOFT_DIAGONAL_NWSE, 0, 0));
        assert!(lib.is_solid(LOFT_UNIT, 7, 8));
        assert!(!lib.is_solid(LOFT_UNIT, 0, 0));
    }

    #[test]
    fn test_unknown_template_is_empty() {
        let lib = LoftLibrary::standard();
        assert!(!lib.is_solid(200, 3, 3));
        assert_eq!(lib.solid_columns(200), 0);
        assert_eq!(lib.solid_columns(LOFT_SOLID), 256);
    }

    #[test]
    fn test_from_ron_requires_empty_first() {
        let ok = LoftLibrary::from_ron_str(
            "[(0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0), (1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1)]",
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
        assert!(ok.is_solid(1, 0, 4));

        let bad = LoftLibrary::from_ron_str("[(1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0)]");
        assert!(bad.is_err());
    }
}
