//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use battlescape_core::{
    BattleUnit, Battlefield, Direction, EngineConfig, Faction, LoftLibrary, PartLibrary,
    StandardParts, UnitId,
};
use bevy::math::IVec3;

/// Map with concrete floors on every level.
pub fn open_field(size: IVec3) -> (Battlefield, StandardParts) {
    let (parts, handles) = PartLibrary::standard();
    let mut field = Battlefield::new(EngineConfig::default(), size, parts, LoftLibrary::standard())
        .expect("valid battlefield");
    for z in 0..size.z {
        field.fill_level(z, handles.floor).expect("floor fits");
    }
    (field, handles)
}

pub fn soldier(field: &mut Battlefield, at: IVec3, facing: Direction) -> UnitId {
    field
        .add_unit(BattleUnit::new("soldier", at, Faction::Player).facing(facing))
        .expect("free tile")
}

pub fn alien(field: &mut Battlefield, at: IVec3, facing: Direction) -> UnitId {
    field
        .add_unit(BattleUnit::new("alien", at, Faction::Hostile).facing(facing))
        .expect("free tile")
}
