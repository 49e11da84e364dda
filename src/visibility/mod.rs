//! Field of view: which units a unit sees, which tiles the player has
//! discovered, and whether a voxel is hidden from the overhead camera.

use std::collections::HashSet;

use bevy::math::IVec3;

use crate::battlefield::Battlefield;
use crate::blockage::{big_wall_obstructs, Phenomenon};
use crate::collision::{VoxelFilter, VoxelHit};
use crate::constants::{TILE_VOXELS_XY, TILE_VOXELS_Z};
use crate::geometry::{distance, in_view_sector, tile_of_voxel, BigWall, Direction};
use crate::logging::TimingSpan;
use crate::tiles::{DiscoveryEdge, TilePart};
use crate::units::{BattleUnit, Faction, UnitId};

/// Horizontal offsets within `radius`, nearest first.
fn view_offsets(radius: i32) -> Vec<IVec3> {
    let mut offsets: Vec<IVec3> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| IVec3::new(dx, dy, 0)))
        .filter(|o| o.x * o.x + o.y * o.y <= radius * radius)
        .collect();
    offsets.sort_by_key(|o| (o.x * o.x + o.y * o.y, o.y, o.x));
    offsets
}

impl Battlefield {
    /// Sight range in tiles from `viewer` to `tile`: shortened to the dark
    /// view distance when the tile is too dark and the viewer lacks dark vision.
    pub fn visibility_bound(&self, viewer: &BattleUnit, tile: IVec3) -> i32 {
        let dark = self
            .tile(tile)
            .is_some_and(|t| t.shade() > self.config.max_darkness_to_see_units);
        if dark && !viewer.dark_vision {
            self.config.dark_view_distance
        } else {
            self.config.max_view_distance
        }
    }

    /// Whether `viewer` sees the unit standing on `tile`.
    pub fn is_visible(&self, viewer: UnitId, tile: IVec3) -> bool {
        let Some(unit) = self.unit(viewer) else {
            return false;
        };
        let Some(target) = self.unit_at(tile).and_then(|id| self.unit(id)) else {
            return false;
        };
        let bound = self.visibility_bound(unit, tile);
        if distance(unit.position, tile) > bound {
            return false;
        }
        if target.faction == unit.faction {
            return true;
        }
        let origin = self.sight_origin_voxel(unit);
        let Some(aim) = self.can_target_unit(origin, tile, Some(viewer), None) else {
            return false;
        };
        self.sight_clears_smoke(origin, aim, bound)
    }

    /// Whether `viewer` sees any tile of `target`'s footprint.
    pub fn can_see(&self, viewer: UnitId, target: UnitId) -> bool {
        self.unit(target)
            .is_some_and(|t| t.footprint().any(|pos| self.is_visible(viewer, pos)))
    }

    /// Smoke and fire along the ray eat into the sight budget.
    fn sight_clears_smoke(&self, origin: IVec3, aim: IVec3, bound: i32) -> bool {
        let trace = self.trace_voxels(origin, aim, &VoxelFilter::terrain_only(), true);
        if trace.path.len() < 2 {
            return true;
        }
        let step = (aim - origin).as_dvec3().length() / (trace.path.len() - 1) as f64;
        // one tile of slack for the sub-tile offsets of eye and aim point
        let budget = f64::from((bound + 1) * TILE_VOXELS_XY);
        let mut spent = 0.0;
        let mut density_at = (IVec3::splat(i32::MIN), 0u8);
        for voxel in trace.path.iter().skip(1) {
            let pos = tile_of_voxel(*voxel);
            if density_at.0 != pos {
                let density = self
                    .tile(pos)
                    .map(|t| t.smoke().saturating_add(t.fire()))
                    .unwrap_or(0);
                density_at = (pos, density);
            }
            spent += step * (1.0 + f64::from(density_at.1) / 3.0);
            if spent > budget {
                return false;
            }
        }
        true
    }

    /// Recompute what one unit sees. Player units also discover the tiles
    /// their sight reaches. Returns whether an enemy was newly spotted.
    pub fn calculate_fov(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.unit(id) else {
            return false;
        };
        if unit.is_out() {
            if let Some(unit) = self.unit_mut(id) {
                unit.visible_units.clear();
            }
            return false;
        }
        let position = unit.position;
        let faction = unit.faction;
        let facing = match unit.turret_direction {
            Some(turret) if self.config.turret_view => turret,
            _ => unit.direction,
        };
        let previously = unit.visible_units.clone();
        let levels = self.size().z;

        let mut seen = Vec::new();
        let mut revealed = HashSet::new();
        for offset in view_offsets(self.config.max_view_distance) {
            let column = position + offset;
            if offset != IVec3::ZERO && !in_view_sector(position, facing, column) {
                continue;
            }
            for z in 0..levels {
                let pos = IVec3::new(column.x, column.y, z);
                if !self.contains(pos) {
                    continue;
                }
                if let Some(other) = self.unit_at(pos) {
                    let candidate = other != id
                        && !seen.contains(&other)
                        && self.unit(other).is_some_and(|u| !u.is_out());
                    if candidate && self.is_visible(id, pos) {
                        seen.push(other);
                    }
                }
                if faction == Faction::Player {
                    let trace = self.trace_tiles(position, pos, Phenomenon::Vision, true);
                    revealed.extend(trace.path);
                }
            }
        }

        let mut hostile = Vec::new();
        for other in seen {
            let Some(target) = self.unit_mut(other) else {
                continue;
            };
            if faction == Faction::Player {
                target.visible = true;
            }
            if faction.is_hostile_to(target.faction) {
                hostile.push(other);
            }
        }
        let newly: Vec<UnitId> = hostile
            .iter()
            .copied()
            .filter(|other| !previously.contains(other))
            .collect();
        if let Some(unit) = self.unit_mut(id) {
            unit.visible_units = hostile;
            unit.spotted_this_turn.extend(newly.iter().copied());
        }

        let mut revealed: Vec<IVec3> = revealed.into_iter().collect();
        revealed.sort_by_key(|p| (p.z, p.y, p.x));
        for pos in revealed {
            self.reveal_tile(pos);
        }
        if !newly.is_empty() {
            tracing::debug!(unit = id.0, spotted = newly.len(), "new enemies in sight");
        }
        !newly.is_empty()
    }

    /// Rebuild every unit's view from scratch. Tile visibility and the
    /// player-seen flag of other factions are cleared first.
    pub fn recalculate_all_fov(&mut self) -> bool {
        let _span = TimingSpan::new("fov");
        for tile in self.grid.iter_mut() {
            tile.set_visible(false);
        }
        for unit in &mut self.units {
            if unit.faction != Faction::Player {
                unit.visible = false;
            }
        }
        let mut spotted = false;
        for id in self.unit_ids() {
            spotted |= self.calculate_fov(id);
        }
        spotted
    }

    /// Recompute the view of every active unit within sight range of `pos`.
    pub fn recalculate_fov_near(&mut self, pos: IVec3) -> bool {
        let range = self.config.max_view_distance;
        let nearby: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| !u.is_out() && distance(u.position, pos) <= range)
            .map(|u| u.id)
            .collect();
        let mut spotted = false;
        for id in nearby {
            spotted |= self.calculate_fov(id);
        }
        spotted
    }

    /// Mark a tile seen and discovered, spilling the discovery onto the
    /// neighbouring edges that nothing on this tile hides.
    pub fn reveal_tile(&mut self, pos: IVec3) {
        let blocks_toward = |field: &Self, dir: Direction| {
            field.part_at(pos, TilePart::Content).is_some_and(|part| {
                part.big_wall != BigWall::None
                    && part.stops_line_of_sight
                    && big_wall_obstructs(dir, part.big_wall)
            })
        };
        let wall_hides = |field: &Self, slot: TilePart| {
            field
                .part_at(pos, slot)
                .is_some_and(|part| part.stops_line_of_sight)
        };

        let east = !blocks_toward(self, Direction::East);
        let south = !blocks_toward(self, Direction::South);
        let west = !blocks_toward(self, Direction::West) && !wall_hides(self, TilePart::WestWall);
        let north = !blocks_toward(self, Direction::North) && !wall_hides(self, TilePart::NorthWall);

        let Some(tile) = self.tile_mut(pos) else {
            return;
        };
        tile.set_visible(true);
        tile.discover(DiscoveryEdge::WestWall);
        tile.discover(DiscoveryEdge::NorthWall);
        tile.discover(DiscoveryEdge::Floor);

        let spill = [
            (east, IVec3::X, DiscoveryEdge::WestWall),
            (south, IVec3::Y, DiscoveryEdge::NorthWall),
            (west, -IVec3::X, DiscoveryEdge::Floor),
            (north, -IVec3::Y, DiscoveryEdge::Floor),
        ];
        for (open, offset, edge) in spill {
            if !open {
                continue;
            }
            if let Some(neighbour) = self.tile_mut(pos + offset) {
                neighbour.discover(edge);
            }
        }
    }

    /// Whether the overhead camera sees a voxel, used to cull projectile
    /// trails. Content in the same tile above the voxel hides it.
    pub fn is_voxel_visible(&self, voxel: IVec3) -> bool {
        let start = voxel.z + 3;
        if start.div_euclid(TILE_VOXELS_Z) != voxel.z.div_euclid(TILE_VOXELS_Z) {
            return true;
        }
        let end = (start.div_euclid(TILE_VOXELS_Z) + 1) * TILE_VOXELS_Z;
        let filter = VoxelFilter::terrain_only();
        (start..end).all(|z| {
            self.voxel_check(IVec3::new(voxel.x, voxel.y, z), &filter) != VoxelHit::Content
                && self.voxel_check(IVec3::new(voxel.x + 4, voxel.y + 4, z), &filter)
                    != VoxelHit::Content
        })
    }
}
