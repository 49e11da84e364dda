//! Tactical Battlescape - Core Library
//!
//! This crate provides the deterministic battlefield rules of a turn-based
//! tactical game:
//! - Tile grid with per-voxel line-of-fire templates
//! - Voxel collision and the integer line / parabola tracers
//! - Phenomenon blockage (sight, heat, smoke, fire, stun, explosions)
//! - Field of view and target acquisition
//! - Ambient, static and dynamic lighting
//! - Explosion propagation, detonation and part destruction
//! - Reaction fire
//! - Melee, throw and door validation
//! - ECS plugin for driving all of the above through events

pub mod actions;
pub mod battlefield;
pub mod blockage;
pub mod collision;
pub mod constants;
pub mod engine;
pub mod error;
pub mod explosion;
pub mod geometry;
pub mod lighting;
pub mod logging;
pub mod reaction;
pub mod targeting;
pub mod tiles;
pub mod trace;
pub mod units;
pub mod visibility;

pub use actions::{max_throw_distance, DoorOutcome, ThrowArc};
pub use battlefield::Battlefield;
pub use blockage::Phenomenon;
pub use collision::{VoxelFilter, VoxelHit};
pub use engine::{BattlescapePlugin, EngineConfig};
pub use error::{BattlescapeError, Result};
pub use explosion::{ExplosionReport, ExplosionRequest, HitOutcome};
pub use geometry::{BigWall, Direction};
pub use reaction::ReactionShot;
pub use tiles::{GroundItem, LoftLibrary, PartId, PartLibrary, StandardParts, TilePart};
pub use units::{BattleUnit, DamageType, Faction, UnitId, Weapon};
