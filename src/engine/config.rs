use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{BattlescapeError, Result};

/// Tuning values for one battlefield. Every field falls back to its default
/// when omitted from a RON or JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rng_seed: u64,
    pub max_view_distance: i32,
    pub dark_view_distance: i32,
    pub max_darkness_to_see_units: u8,
    /// 0..=3, selects the per-level vertical falloff of blasts
    pub explosion_height: u8,
    pub tile_crossing_cost: i32,
    pub incendiary_diagonal_cost: i32,
    pub kneel_blast_reduction_pct: i32,
    pub fire_light_power: i32,
    pub personal_light_power: i32,
    pub personal_lighting: bool,
    pub roof_shade_penalty: i32,
    pub auto_shot_range: i32,
    pub snap_shot_range: i32,
    /// Vehicles look where their turret points instead of where they drive
    pub turret_view: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            max_view_distance: MAX_VIEW_DISTANCE,
            dark_view_distance: DARK_VIEW_DISTANCE,
            max_darkness_to_see_units: MAX_DARKNESS_TO_SEE_UNITS,
            explosion_height: 0,
            tile_crossing_cost: TILE_CROSSING_COST,
            incendiary_diagonal_cost: INCENDIARY_DIAGONAL_COST,
            kneel_blast_reduction_pct: KNEEL_BLAST_REDUCTION_PCT,
            fire_light_power: FIRE_LIGHT_POWER,
            personal_light_power: PERSONAL_LIGHT_POWER,
            personal_lighting: true,
            roof_shade_penalty: ROOF_SHADE_PENALTY,
            auto_shot_range: AUTO_SHOT_RANGE,
            snap_shot_range: SNAP_SHOT_RANGE,
            turret_view: true,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.ron` or `.json` file, picked by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            Some("ron") => Self::from_ron_str(&source),
            other => Err(BattlescapeError::InvalidConfig(format!(
                "unsupported config extension {other:?}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_view_distance <= 0 {
            return Err(BattlescapeError::InvalidConfig(
                "max_view_distance must be positive".into(),
            ));
        }
        if self.dark_view_distance < 0 || self.dark_view_distance > self.max_view_distance {
            return Err(BattlescapeError::InvalidConfig(format!(
                "dark_view_distance {} must be within 0..={}",
                self.dark_view_distance, self.max_view_distance
            )));
        }
        if self.max_darkness_to_see_units > MAX_SHADE {
            return Err(BattlescapeError::InvalidConfig(format!(
                "max_darkness_to_see_units {} exceeds {MAX_SHADE}",
                self.max_darkness_to_see_units
            )));
        }
        if usize::from(self.explosion_height) >= VERTICAL_FALLOFF.len() {
            return Err(BattlescapeError::InvalidConfig(format!(
                "explosion_height {} must be within 0..=3",
                self.explosion_height
            )));
        }
        if self.tile_crossing_cost < 0 || self.incendiary_diagonal_cost < 0 {
            return Err(BattlescapeError::InvalidConfig(
                "explosion costs must not be negative".into(),
            ));
        }
        if !(0..=100).contains(&self.kneel_blast_reduction_pct) {
            return Err(BattlescapeError::InvalidConfig(
                "kneel_blast_reduction_pct must be a percentage".into(),
            ));
        }
        if self.auto_shot_range > self.snap_shot_range {
            return Err(BattlescapeError::InvalidConfig(
                "auto_shot_range must not exceed snap_shot_range".into(),
            ));
        }
        Ok(())
    }

    /// Power lost by a blast ray for every level it climbs or drops.
    pub fn vertical_falloff(&self) -> i32 {
        VERTICAL_FALLOFF
            .get(usize::from(self.explosion_height))
            .copied()
            .unwrap_or(VERTICAL_FALLOFF[0])
    }
}
