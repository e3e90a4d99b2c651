//! Faults raised by the network
//!
//! Only caller defects end up here. Rejected links, empty requests and
//! unreachable consumers are ordinary results, never errors.

use crate::net::{Location, NodeId};

/// Contract violations by the caller of the network API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    #[error("location {location} is already occupied by node {occupant}")]
    LocationOccupied { location: Location, occupant: NodeId },

    #[error("node {0} is not a consumer")]
    NotAConsumer(NodeId),

    #[error("node {0} is not a provider")]
    NotAProvider(NodeId),

    #[error("node {0} cannot be paired with itself")]
    SameNode(NodeId),
}
