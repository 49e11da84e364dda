//! 3-D line tracing in voxel or tile space.
//!
//! [`LineWalker`] drives a Bresenham walk along the dominant axis. Every
//! minor-axis step is emitted as its own intermediate point, so a diagonal
//! move checks the corner it cuts.

use std::collections::VecDeque;

use bevy::math::IVec3;

use crate::battlefield::Battlefield;
use crate::blockage::Phenomenon;
use crate::collision::{VoxelFilter, VoxelHit};
use crate::constants::BLOCK_THRESHOLD;
use crate::geometry::Direction;

/// One point visited by a [`LineWalker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStep {
    /// A point on the line proper, one per dominant-axis step
    Major(IVec3),
    /// Corner point visited when a minor axis advances
    Minor(IVec3),
}

impl LineStep {
    pub fn point(self) -> IVec3 {
        match self {
            LineStep::Major(p) | LineStep::Minor(p) => p,
        }
    }

    pub fn is_major(self) -> bool {
        matches!(self, LineStep::Major(_))
    }
}

#[derive(Debug, Clone)]
pub struct LineWalker {
    swap_xy: bool,
    swap_xz: bool,
    x: i32,
    y: i32,
    z: i32,
    x_end: i32,
    step: IVec3,
    delta: IVec3,
    drift_xy: i32,
    drift_xz: i32,
    pending: VecDeque<LineStep>,
    done: bool,
}

impl LineWalker {
    pub fn new(origin: IVec3, target: IVec3) -> Self {
        let (mut a, mut b) = (origin, target);
        let swap_xy = (b.y - a.y).abs() > (b.x - a.x).abs();
        if swap_xy {
            std::mem::swap(&mut a.x, &mut a.y);
            std::mem::swap(&mut b.x, &mut b.y);
        }
        let swap_xz = (b.z - a.z).abs() > (b.x - a.x).abs();
        if swap_xz {
            std::mem::swap(&mut a.x, &mut a.z);
            std::mem::swap(&mut b.x, &mut b.z);
        }
        let delta = (b - a).abs();
        let step = IVec3::new(sign(b.x - a.x), sign(b.y - a.y), sign(b.z - a.z));
        Self {
            swap_xy,
            swap_xz,
            x: a.x,
            y: a.y,
            z: a.z,
            x_end: b.x,
            step,
            delta,
            drift_xy: delta.x / 2,
            drift_xz: delta.x / 2,
            pending: VecDeque::with_capacity(2),
            done: false,
        }
    }

    fn unswap(&self, x: i32, y: i32, z: i32) -> IVec3 {
        let (mut cx, mut cy, mut cz) = (x, y, z);
        if self.swap_xz {
            std::mem::swap(&mut cx, &mut cz);
        }
        if self.swap_xy {
            std::mem::swap(&mut cx, &mut cy);
        }
        IVec3::new(cx, cy, cz)
    }
}

fn sign(v: i32) -> i32 {
    if v < 0 {
        -1
    } else {
        1
    }
}

impl Iterator for LineWalker {
    type Item = LineStep;

    fn next(&mut self) -> Option<LineStep> {
        if let Some(step) = self.pending.pop_front() {
            return Some(step);
        }
        if self.done {
            return None;
        }
        let major = self.unswap(self.x, self.y, self.z);
        if self.x == self.x_end {
            self.done = true;
            return Some(LineStep::Major(major));
        }
        self.drift_xy -= self.delta.y;
        self.drift_xz -= self.delta.z;
        if self.drift_xy < 0 {
            self.y += self.step.y;
            self.drift_xy += self.delta.x;
            let corner = self.unswap(self.x, self.y, self.z);
            self.pending.push_back(LineStep::Minor(corner));
        }
        if self.drift_xz < 0 {
            self.z += self.step.z;
            self.drift_xz += self.delta.x;
            let corner = self.unswap(self.x, self.y, self.z);
            self.pending.push_back(LineStep::Minor(corner));
        }
        self.x += self.step.x;
        Some(LineStep::Major(major))
    }
}

/// Result of a voxel-mode trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelTrace {
    pub hit: VoxelHit,
    /// First non-empty voxel
    pub impact: Option<IVec3>,
    /// Major points up to and including the impact, when requested
    pub path: Vec<IVec3>,
}

/// Result of a tile-mode trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTrace {
    /// Accumulated blockage along the reached part of the line
    pub blocked: i32,
    /// Tiles reached, origin first, when requested
    pub path: Vec<IVec3>,
    /// Whether the walk reached the target tile
    pub reached: bool,
}

impl Battlefield {
    /// Walk voxel by voxel and stop at the first occupied voxel.
    pub fn trace_voxels(
        &self,
        origin: IVec3,
        target: IVec3,
        filter: &VoxelFilter,
        record_path: bool,
    ) -> VoxelTrace {
        let mut path = Vec::new();
        for step in LineWalker::new(origin, target) {
            let point = step.point();
            if record_path && step.is_major() {
                path.push(point);
            }
            let hit = self.voxel_check(point, filter);
            if !hit.is_empty() {
                if record_path && !step.is_major() {
                    path.push(point);
                }
                return VoxelTrace {
                    hit,
                    impact: Some(point),
                    path,
                };
            }
        }
        VoxelTrace {
            hit: VoxelHit::Empty,
            impact: None,
            path,
        }
    }

    /// Walk tile by tile accumulating blockage of `phenomenon`. Stops before
    /// the first crossing that pushes the total over the hard-stop threshold.
    /// For sight, a tile whose content faces the ray is reached but ends the walk.
    pub fn trace_tiles(
        &self,
        origin: IVec3,
        target: IVec3,
        phenomenon: Phenomenon,
        record_path: bool,
    ) -> TileTrace {
        let mut path = Vec::new();
        let mut blocked = 0;
        let mut last = origin;
        for step in LineWalker::new(origin, target).filter(|s| s.is_major()) {
            let current = step.point();
            if current != last {
                blocked += self.crossing_blockage(last, current, phenomenon);
                if blocked > BLOCK_THRESHOLD {
                    return TileTrace {
                        blocked,
                        path,
                        reached: false,
                    };
                }
            }
            if record_path {
                path.push(current);
            }
            if current != last && phenomenon == Phenomenon::Vision {
                let flat = IVec3::new(current.x - last.x, current.y - last.y, 0);
                if let Some(heading) = Direction::from_vector(flat) {
                    if self.content_faces_sight(current, heading.opposite()) && current != target {
                        return TileTrace {
                            blocked,
                            path,
                            reached: false,
                        };
                    }
                }
            }
            last = current;
        }
        TileTrace {
            blocked,
            path,
            reached: true,
        }
    }

    /// Follow a thrown arc from `origin` toward `target` voxel. Hitting
    /// anything on the way up counts as out of bounds.
    pub fn trace_parabola(
        &self,
        origin: IVec3,
        target: IVec3,
        curvature: f64,
        filter: &VoxelFilter,
    ) -> VoxelTrace {
        let d = (target - origin).as_dvec3();
        let range = d.length();
        if range == 0.0 {
            return VoxelTrace {
                hit: VoxelHit::Empty,
                impact: None,
                path: Vec::new(),
            };
        }
        let tilt = (d.z / range).acos();
        let bearing = d.y.atan2(d.x);
        let apex = range.sqrt() * curvature;
        let bend = 4.0 * apex / range / range;

        let mut path = Vec::new();
        let mut last = origin;
        let mut i = 8.0_f64;
        let mut z = origin.z;
        // an arc never needs more samples than a few times its chord
        let limit = 8.0 + range * 4.0;
        while z > 0 && i < limit {
            let x = f64::from(origin.x) + i * bearing.cos() * tilt.sin();
            let y = f64::from(origin.y) + i * bearing.sin() * tilt.sin();
            let zf = f64::from(origin.z) + i * tilt.cos() - bend * (i - range / 2.0).powi(2) + apex;
            let next = IVec3::new(x as i32, y as i32, zf as i32);
            z = next.z;
            path.push(next);
            let leg = self.trace_voxels(last, next, filter, false);
            if !leg.hit.is_empty() {
                let hit = if last.z < next.z {
                    VoxelHit::OutOfBounds
                } else {
                    leg.hit
                };
                return VoxelTrace {
                    hit,
                    impact: leg.impact,
                    path,
                };
            }
            last = next;
            i += 1.0;
        }
        VoxelTrace {
            hit: VoxelHit::Empty,
            impact: None,
            path,
        }
    }
}
