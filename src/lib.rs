//! Impetus Network - point-to-point resource routing between world nodes
//!
//! Core modules:
//! - `net`: Node arena, link maintenance, beam collision and flow distribution
//! - `linker`: Two-click interactive link/unlink flow
//! - `scenario`: Seeded demo networks
//! - `settings`: Data-driven network configuration
//! - `error`: Programmer-error faults

pub mod error;
pub mod linker;
pub mod net;
pub mod scenario;
pub mod settings;

pub use error::GraphError;
pub use linker::{Linker, LinkerFeedback};
pub use settings::{Settings, Side};

use glam::{DVec3, IVec3};

/// Network configuration constants
pub mod consts {
    /// Default number of upstream links a node accepts
    pub const DEFAULT_MAX_INPUTS: usize = 1;
    /// Default number of downstream links a node accepts
    pub const DEFAULT_MAX_OUTPUTS: usize = 1;
    /// Default link reach in blocks
    pub const DEFAULT_MAX_CONNECT_DISTANCE: f64 = 8.0;

    /// Distance a resumed beam trace is pushed past the block it left
    pub const TRACE_NUDGE: f64 = 1e-6;
}

/// Squared distance between two block positions
#[inline]
pub fn block_distance_sq(a: IVec3, b: IVec3) -> f64 {
    a.as_dvec3().distance_squared(b.as_dvec3())
}

/// Center point of a block
#[inline]
pub fn block_center(pos: IVec3) -> DVec3 {
    pos.as_dvec3() + DVec3::splat(0.5)
}

/// Block containing a point
#[inline]
pub fn block_at(point: DVec3) -> IVec3 {
    point.floor().as_ivec3()
}
