//! Lighting: three layers rebuilt from scratch on every pass.
//!
//! Ambient light comes from the time of day, static light from glowing
//! parts, fires and flares on the ground, dynamic light from units.

use bevy::math::IVec3;

use crate::battlefield::Battlefield;
use crate::blockage::Phenomenon;
use crate::constants::MAX_SHADE;
use crate::logging::TimingSpan;
use crate::tiles::{LightLayer, TilePart};
use crate::units::Faction;

/// Shade at or below which a roof between a tile and the sky darkens it.
const ROOF_SHADOW_MAX_SHADE: u8 = 4;

impl Battlefield {
    /// Set the time-of-day shade (0 noon, 15 night) and rebuild ambient light.
    pub fn set_global_shade(&mut self, shade: u8) {
        self.global_shade = shade.min(MAX_SHADE);
        self.calculate_ambient_lighting();
    }

    pub fn calculate_ambient_lighting(&mut self) {
        let power = i32::from(MAX_SHADE - self.global_shade);
        let top = self.size().z - 1;
        let penalty = self.config.roof_shade_penalty;
        let casts_shadow = self.global_shade <= ROOF_SHADOW_MAX_SHADE;
        let lit: Vec<(IVec3, i32)> = self
            .grid
            .positions()
            .map(|pos| {
                let sky = IVec3::new(pos.x, pos.y, top);
                let roofed = casts_shadow
                    && pos.z < top
                    && self.vertical_blockage(sky, pos, Phenomenon::Vision) > 0;
                (pos, if roofed { power - penalty } else { power })
            })
            .collect();
        for (pos, power) in lit {
            if let Some(tile) = self.tile_mut(pos) {
                tile.reset_light(LightLayer::Ambient);
                tile.add_light(LightLayer::Ambient, power);
            }
        }
    }

    pub fn calculate_static_lighting(&mut self) {
        for tile in self.grid.iter_mut() {
            tile.reset_light(LightLayer::Static);
        }
        let fire_power = self.config.fire_light_power;
        let mut sources = Vec::new();
        for tile in self.grid.iter() {
            let pos = tile.position();
            for slot in TilePart::ALL {
                if let Some(part) = self.part_at(pos, slot) {
                    if part.light_source > 0 {
                        sources.push((pos, part.light_source));
                    }
                }
            }
            if tile.fire() > 0 {
                sources.push((pos, fire_power));
            }
            for item in tile.items() {
                if item.light_power > 0 {
                    sources.push((pos, item.light_power));
                }
            }
        }
        for (pos, power) in sources {
            self.add_light(pos, power, LightLayer::Static);
        }
    }

    pub fn calculate_dynamic_lighting(&mut self) {
        for tile in self.grid.iter_mut() {
            tile.reset_light(LightLayer::Dynamic);
        }
        let personal = self.config.personal_lighting;
        let personal_power = self.config.personal_light_power;
        let fire_power = self.config.fire_light_power;
        let sources: Vec<(IVec3, i32)> = self
            .units
            .iter()
            .flat_map(|unit| {
                let carries_lamp = personal && unit.faction == Faction::Player && !unit.is_out();
                let lamp = carries_lamp.then_some((unit.position, personal_power));
                let burning = (unit.fire_turns > 0).then_some((unit.position, fire_power));
                lamp.into_iter().chain(burning)
            })
            .collect();
        for (pos, power) in sources {
            self.add_light(pos, power, LightLayer::Dynamic);
        }
    }

    /// Rebuild all three layers.
    pub fn recalculate_lighting(&mut self) {
        let _span = TimingSpan::new("lighting");
        self.calculate_ambient_lighting();
        self.calculate_static_lighting();
        self.calculate_dynamic_lighting();
    }

    /// Radiate `power` from `center` over a square footprint on every level,
    /// losing one step per tile of horizontal distance.
    pub fn add_light(&mut self, center: IVec3, power: i32, layer: LightLayer) {
        if power <= 0 {
            return;
        }
        let levels = self.size().z;
        for dy in -power..=power {
            for dx in -power..=power {
                let falloff = f64::from(dx * dx + dy * dy).sqrt().round() as i32;
                let lit = power - falloff;
                if lit <= 0 {
                    continue;
                }
                for z in 0..levels {
                    let pos = IVec3::new(center.x + dx, center.y + dy, z);
                    if let Some(tile) = self.tile_mut(pos) {
                        tile.add_light(layer, lit);
                    }
                }
            }
        }
    }
}
