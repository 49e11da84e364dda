//! Tile grid, tile state and the shared part definitions tiles point into.

pub mod grid;
pub mod loft;
pub mod part;
pub mod tile;

pub use grid::TileGrid;
pub use loft::LoftLibrary;
pub use part::{
    DoorKind, PartDefinition, PartId, PartLibrary, PhenomenonBlock, StandardParts, TilePart,
};
pub use tile::{DiscoveryEdge, GroundItem, LightLayer, Tile};
