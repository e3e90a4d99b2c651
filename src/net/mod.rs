//! Impetus network core
//!
//! Everything here runs synchronously on the caller's thread and never
//! suspends mid-operation:
//! - Graph maintenance funnels through `Network` entry points only
//! - Edge sets are ordered, so traversal order is stable
//! - Distribution only touches provider and hook state, never edges

pub mod collision;
pub mod distribute;
pub mod graph;
pub mod link;
pub mod location;
pub mod node;
pub mod sync;

pub use collision::{BlockMaterial, Environment, RayHit, VoxelWorld, beam_is_clear};
pub use distribute::{ConsumeResult, UsedPath};
pub use graph::Network;
pub use link::{LinkOutcome, LinkRejection};
pub use location::{Location, NodeId};
pub use node::{
    Node, NodeKind, Provider, Reservoir, ThroughputLimit, TransactionContext, TransactionHook,
};
pub use sync::{EventLog, SyncEvent, SyncObserver};
