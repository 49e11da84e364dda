//! Errors raised while building or loading a battlefield.
//!
//! Geometric queries never return these; they answer with neutral values
//! instead. Only construction, placement and data loading can fail.

use bevy::math::IVec3;

use crate::tiles::PartId;
use crate::units::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum BattlescapeError {
    #[error("invalid grid dimensions: {x}x{y}x{z}")]
    InvalidDimensions { x: i32, y: i32, z: i32 },

    #[error("position {0:?} is outside the battlefield")]
    OutOfBounds(IVec3),

    #[error("unknown part definition {0:?}")]
    UnknownPart(PartId),

    #[error("part '{name}' references missing successor {successor:?}")]
    DanglingSuccessor { name: String, successor: PartId },

    #[error("destroying part '{name}' never ends: its successors loop")]
    SuccessorCycle { name: String },

    #[error("part '{name}' has negative armor {armor}")]
    NegativeArmor { name: String, armor: i32 },

    #[error("line-of-fire template {0} is not defined")]
    UnknownLoft(u8),

    #[error("tile {0:?} is already occupied")]
    Occupied(IVec3),

    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BattlescapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BattlescapeError::InvalidDimensions { x: 0, y: 4, z: 2 };
        assert_eq!(err.to_string(), "invalid grid dimensions: 0x4x2");

        let err = BattlescapeError::SuccessorCycle { name: "rug".into() };
        assert_eq!(err.to_string(), "destroying part 'rug' never ends: its successors loop");

        let err = BattlescapeError::UnknownLoft(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: BattlescapeError = parse.unwrap_err().into();
        assert!(matches!(err, BattlescapeError::Json(_)));
    }
}
