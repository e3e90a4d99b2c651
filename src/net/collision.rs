//! Beam line-of-sight checks
//!
//! A link's beam runs straight from one node's beam endpoint to the other's.
//! It passes through blocks that don't block light (glass, non-solid blocks)
//! and stops at the first one that does.

use std::collections::HashMap;

use glam::{DVec3, IVec3};

use super::location::Location;
use super::node::Node;
use crate::block_at;
use crate::consts::TRACE_NUDGE;

/// First collidable block along a traced segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub block: IVec3,
    /// Where the segment enters the block
    pub entry: DVec3,
    /// Where the segment leaves the block (or ends inside it)
    pub exit: DVec3,
}

/// World queries needed by the collision check
pub trait Environment {
    /// First block with a collision box intersected by `start -> end`, if any
    fn trace(&self, realm: i32, start: DVec3, end: DVec3) -> Option<RayHit>;

    /// Whether the block at `pos` stops beams (opaque or light-blocking)
    fn blocks_beam(&self, realm: i32, pos: IVec3) -> bool;
}

/// Check the beam between two nodes
///
/// Hits on either node's own block never block. After each pass-through
/// hit the trace resumes just past the block, still aimed at the target,
/// so every round moves at least one block further along the segment.
pub fn beam_is_clear<E: Environment + ?Sized>(env: &E, from: &Node, to: &Node) -> bool {
    let realm = from.location.realm;
    let target = to.beam_endpoint;
    let mut start = from.beam_endpoint;

    // Blocks a segment can cross: one per boundary on each axis, plus the ends
    let span = (block_at(target) - block_at(start)).abs();
    let max_hits = (span.x + span.y + span.z) as usize + 3;

    for _ in 0..max_hits {
        if start.distance_squared(target) <= TRACE_NUDGE * TRACE_NUDGE {
            return true;
        }

        let Some(hit) = env.trace(realm, start, target) else {
            return true;
        };

        if hit.block == to.location.pos {
            return true;
        }

        if hit.block != from.location.pos && env.blocks_beam(realm, hit.block) {
            log::trace!(
                "Beam {} -> {} blocked at {:?}",
                from.location,
                to.location,
                hit.block
            );
            return false;
        }

        let remaining = target - hit.exit;
        if remaining.length_squared() <= TRACE_NUDGE * TRACE_NUDGE {
            return true;
        }
        start = hit.exit + remaining.normalize() * TRACE_NUDGE;
    }

    // Only an environment whose traces don't advance gets here
    log::warn!(
        "Beam {} -> {} kept hitting blocks past its own length",
        from.location,
        to.location
    );
    false
}

/// Physical properties of a block relevant to beams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMaterial {
    /// Has a collision box (non-collidable blocks are invisible to traces)
    pub collidable: bool,
    pub opaque: bool,
    /// 0 = fully transparent
    pub light_opacity: u8,
}

impl BlockMaterial {
    pub const STONE: Self = Self {
        collidable: true,
        opaque: true,
        light_opacity: 15,
    };
    pub const GLASS: Self = Self {
        collidable: true,
        opaque: false,
        light_opacity: 0,
    };
    pub const LEAVES: Self = Self {
        collidable: true,
        opaque: false,
        light_opacity: 1,
    };
    pub const WATER: Self = Self {
        collidable: false,
        opaque: false,
        light_opacity: 3,
    };

    #[inline]
    pub fn blocks_beam(&self) -> bool {
        self.opaque || self.light_opacity > 0
    }
}

/// Sparse block map implementing `Environment` with a voxel DDA trace
///
/// Unset positions are air.
#[derive(Debug, Clone, Default)]
pub struct VoxelWorld {
    blocks: HashMap<(i32, IVec3), BlockMaterial>,
}

impl VoxelWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, location: Location, material: BlockMaterial) {
        self.blocks.insert((location.realm, location.pos), material);
    }

    pub fn clear(&mut self, location: Location) -> Option<BlockMaterial> {
        self.blocks.remove(&(location.realm, location.pos))
    }

    pub fn material(&self, realm: i32, pos: IVec3) -> Option<BlockMaterial> {
        self.blocks.get(&(realm, pos)).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn collidable(&self, realm: i32, pos: IVec3) -> bool {
        self.material(realm, pos).is_some_and(|m| m.collidable)
    }
}

impl Environment for VoxelWorld {
    fn trace(&self, realm: i32, start: DVec3, end: DVec3) -> Option<RayHit> {
        let delta = end - start;
        let length = delta.length();
        if length <= 0.0 {
            return None;
        }
        let dir = delta / length;

        let mut block = block_at(start);
        let end_block = block_at(end);

        // Ray parameter t is distance travelled from `start`
        let step = IVec3::new(axis_step(dir.x), axis_step(dir.y), axis_step(dir.z));
        let t_delta = DVec3::new(
            axis_delta(dir.x),
            axis_delta(dir.y),
            axis_delta(dir.z),
        );
        let mut t_max = DVec3::new(
            first_boundary(start.x, block.x, dir.x),
            first_boundary(start.y, block.y, dir.y),
            first_boundary(start.z, block.z, dir.z),
        );
        let mut t_entry = 0.0;

        loop {
            if self.collidable(realm, block) {
                let t_exit = t_max.min_element().min(length);
                return Some(RayHit {
                    block,
                    entry: start + dir * t_entry,
                    exit: start + dir * t_exit,
                });
            }

            if block == end_block {
                return None;
            }

            if t_max.x < t_max.y && t_max.x < t_max.z {
                block.x += step.x;
                t_entry = t_max.x;
                t_max.x += t_delta.x;
            } else if t_max.y < t_max.z {
                block.y += step.y;
                t_entry = t_max.y;
                t_max.y += t_delta.y;
            } else {
                block.z += step.z;
                t_entry = t_max.z;
                t_max.z += t_delta.z;
            }

            if t_entry > length {
                return None;
            }
        }
    }

    fn blocks_beam(&self, realm: i32, pos: IVec3) -> bool {
        self.material(realm, pos).is_some_and(|m| m.blocks_beam())
    }
}

#[inline]
fn axis_step(d: f64) -> i32 {
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

#[inline]
fn axis_delta(d: f64) -> f64 {
    if d == 0.0 { f64::INFINITY } else { 1.0 / d.abs() }
}

/// Distance along the ray to the first block boundary on one axis
#[inline]
fn first_boundary(origin: f64, block: i32, d: f64) -> f64 {
    if d > 0.0 {
        (block as f64 + 1.0 - origin) / d
    } else if d < 0.0 {
        (block as f64 - origin) / d
    } else {
        f64::INFINITY
    }
}
