//! Centralized battlescape constants.
//!
//! Geometry of the voxel lattice is fixed; tunable gameplay values live in
//! [`EngineConfig`](crate::engine::EngineConfig) and use these as defaults.

// =====================================================
// Voxel Lattice
// =====================================================

/// Voxels along the x and y axes of one tile
pub const TILE_VOXELS_XY: i32 = 16;

/// Voxels along the z axis of one tile
pub const TILE_VOXELS_Z: i32 = 24;

/// Line-of-fire layers per part; each layer covers two voxel rows in z
pub const LOFT_LAYERS: usize = 12;

/// Rows in one line-of-fire template
pub const LOFT_ROWS: usize = 16;

// =====================================================
// Blockage
// =====================================================

/// Sentinel blockage meaning "hard stop"
pub const HARD_BLOCK: i32 = 255;

/// Accumulated blockage above this stops a tile trace
pub const BLOCK_THRESHOLD: i32 = 127;

/// Armor value of parts that can never be destroyed
pub const INDESTRUCTIBLE_ARMOR: i32 = 255;

// =====================================================
// Tile Volatiles
// =====================================================

/// Highest smoke level a tile can hold
pub const MAX_SMOKE: u8 = 17;

/// Highest fire level a tile can hold
pub const MAX_FIRE: u8 = 12;

/// Darkest shade value (0 is fully lit)
pub const MAX_SHADE: u8 = 15;

/// Smoke levels at or above this are not refreshed by smoke grenades
pub const SMOKE_REFRESH_LIMIT: u8 = 10;

// =====================================================
// Vision
// =====================================================

/// Default view radius in tiles
pub const MAX_VIEW_DISTANCE: i32 = 20;

/// Default view radius into dark tiles
pub const DARK_VIEW_DISTANCE: i32 = 9;

/// Tiles with shade above this count as dark
pub const MAX_DARKNESS_TO_SEE_UNITS: u8 = 9;

/// Eye-level origin sits this many voxels below the top of the unit
pub const EYE_OFFSET: i32 = 2;

/// Muzzle sits this many voxels below the top of the unit
pub const MUZZLE_OFFSET: i32 = 4;

/// Vertical scan offsets around a target's centre, closest first
pub const HEIGHT_FROM_CENTER: [i32; 11] = [0, -2, 2, -4, 4, -6, 6, -8, 8, -12, 12];

/// Horizontal scan radius around a unit's centre axis
pub const UNIT_SCAN_RADIUS: i32 = 3;

// =====================================================
// Lighting
// =====================================================

/// Light emitted by a burning tile or burning unit
pub const FIRE_LIGHT_POWER: i32 = 15;

/// Light carried by every active unit when personal lighting is on
pub const PERSONAL_LIGHT_POWER: i32 = 15;

/// Shade penalty for tiles under a roof
pub const ROOF_SHADE_PENALTY: i32 = 2;

// =====================================================
// Explosions
// =====================================================

/// Flat power loss whenever a blast ray enters a new tile
pub const TILE_CROSSING_COST: i32 = 10;

/// Extra loss for incendiary rays stepping diagonally
pub const INCENDIARY_DIAGONAL_COST: i32 = 5;

/// Vertical falloff per level change, indexed by explosion height setting
pub const VERTICAL_FALLOFF: [i32; 4] = [1000, 30, 10, 5];

/// Kneeling units take this percentage less blast damage
pub const KNEEL_BLAST_REDUCTION_PCT: i32 = 10;

/// Tilt step between explosion rays, in degrees
pub const RAY_TILT_STEP: usize = 5;

/// Bearing step between explosion rays, in degrees
pub const RAY_BEARING_STEP: usize = 3;

// =====================================================
// Reaction Fire
// =====================================================

/// Targets at or within this range prefer auto shots
pub const AUTO_SHOT_RANGE: i32 = 4;

/// Targets at or within this range prefer snap shots
pub const SNAP_SHOT_RANGE: i32 = 12;

// =====================================================
// Throwing
// =====================================================

/// Curvature ceiling for the throw arc search
pub const MAX_THROW_CURVATURE: f64 = 5.0;

/// Curvature increment between throw attempts
pub const THROW_CURVATURE_STEP: f64 = 0.5;
