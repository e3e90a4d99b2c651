//! Node identity: arena ids and realm-qualified block positions

use std::fmt;

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Stable index of a node in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A block position in a specific realm (world/dimension)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub pos: IVec3,
    pub realm: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32, z: i32, realm: i32) -> Self {
        Self {
            pos: IVec3::new(x, y, z),
            realm,
        }
    }

    pub fn same_realm(&self, other: &Location) -> bool {
        self.realm == other.realm
    }

    /// Squared block distance, ignoring realm
    pub fn distance_sq(&self, other: &Location) -> f64 {
        crate::block_distance_sq(self.pos, other.pos)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}) in realm {}",
            self.pos.x, self.pos.y, self.pos.z, self.realm
        )
    }
}
