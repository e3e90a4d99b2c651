//! Edge maintenance: linking, unlinking and validation
//!
//! Every edge is stored twice (in the downstream node's inputs and the
//! upstream node's outputs). These are the only functions that touch
//! either set, and they always change both.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::collision::{Environment, beam_is_clear};
use super::graph::Network;
use super::location::NodeId;
use super::node::Node;
use crate::error::GraphError;

/// Why a proposed link was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkRejection {
    AlreadyLinked,
    SamePosition,
    DifferentRealm,
    /// Upstream node has no free output slot
    OutputLimit,
    /// Downstream node has no free input slot
    InputLimit,
    Incompatible,
    TooFar,
    Obstructed,
}

impl LinkRejection {
    /// Stable key for user-facing feedback
    pub fn message_key(&self) -> &'static str {
        match self {
            LinkRejection::AlreadyLinked => "impetus.link.already_linked",
            LinkRejection::SamePosition => "impetus.link.same_pos",
            LinkRejection::DifferentRealm => "impetus.link.different_realm",
            LinkRejection::OutputLimit => "impetus.link.limit_out",
            LinkRejection::InputLimit => "impetus.link.limit_in",
            LinkRejection::Incompatible => "impetus.link.incompatible",
            LinkRejection::TooFar => "impetus.link.too_far",
            LinkRejection::Obstructed => "impetus.link.blocked",
        }
    }
}

impl fmt::Display for LinkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LinkRejection::AlreadyLinked => "nodes are already linked",
            LinkRejection::SamePosition => "cannot link a node to itself",
            LinkRejection::DifferentRealm => "nodes are in different realms",
            LinkRejection::OutputLimit => "upstream node has no free outputs",
            LinkRejection::InputLimit => "downstream node has no free inputs",
            LinkRejection::Incompatible => "nodes cannot be linked this way",
            LinkRejection::TooFar => "nodes are too far apart",
            LinkRejection::Obstructed => "beam is obstructed",
        };
        f.write_str(text)
    }
}

/// Result of a link proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    Rejected(LinkRejection),
}

impl LinkOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkOutcome::Linked)
    }

    pub fn rejection(&self) -> Option<LinkRejection> {
        match self {
            LinkOutcome::Linked => None,
            LinkOutcome::Rejected(reason) => Some(*reason),
        }
    }
}

/// Distance rule shared by linking and validation
///
/// Squared block distance against the square of the smaller reach.
pub fn within_reach(a: &Node, b: &Node) -> bool {
    let reach = a
        .max_connect_distance(b)
        .min(b.max_connect_distance(a));
    a.location.distance_sq(&b.location) <= reach * reach
}

impl Network {
    /// Propose `upstream` as an input of `downstream`
    pub fn link_input<E: Environment + ?Sized>(
        &mut self,
        downstream: NodeId,
        upstream: NodeId,
        env: &E,
    ) -> Result<LinkOutcome, GraphError> {
        let a = self.node(downstream)?;
        let b = self.node(upstream)?;

        if let Some(reason) = self.check_link(a, b, downstream, upstream, env) {
            log::debug!(
                "Link {} -> {} rejected: {}",
                b.location,
                a.location,
                reason
            );
            return Ok(LinkOutcome::Rejected(reason));
        }

        let (a_loc, b_loc) = (a.location, b.location);
        let (a, b) = self.pair_mut(downstream, upstream)?;
        a.inputs.insert(upstream);
        b.outputs.insert(downstream);
        a.dirty = true;
        b.dirty = true;

        self.emit_edge(a_loc, b_loc, false, false);
        self.emit_edge(b_loc, a_loc, true, false);
        log::info!("Linked {} -> {}", b_loc, a_loc);
        Ok(LinkOutcome::Linked)
    }

    fn check_link<E: Environment + ?Sized>(
        &self,
        a: &Node,
        b: &Node,
        downstream: NodeId,
        upstream: NodeId,
        env: &E,
    ) -> Option<LinkRejection> {
        if a.inputs.contains(&upstream) {
            return Some(LinkRejection::AlreadyLinked);
        }
        if downstream == upstream || a.location == b.location {
            return Some(LinkRejection::SamePosition);
        }
        if !a.location.same_realm(&b.location) {
            return Some(LinkRejection::DifferentRealm);
        }
        if b.num_outputs() >= b.max_outputs {
            return Some(LinkRejection::OutputLimit);
        }
        if a.num_inputs() >= a.max_inputs {
            return Some(LinkRejection::InputLimit);
        }
        if !a.can_connect_as_input(b) || !b.can_connect_as_output(a) {
            return Some(LinkRejection::Incompatible);
        }
        if !within_reach(a, b) {
            return Some(LinkRejection::TooFar);
        }
        if !beam_is_clear(env, a, b) {
            return Some(LinkRejection::Obstructed);
        }
        None
    }

    /// Remove `upstream` from the inputs of `downstream`
    ///
    /// Returns false when there was no such edge.
    pub fn unlink_input(&mut self, downstream: NodeId, upstream: NodeId) -> Result<bool, GraphError> {
        let a_loc = self.node(downstream)?.location;
        let b_loc = self.node(upstream)?.location;
        if downstream == upstream || !self.node(downstream)?.inputs.contains(&upstream) {
            return Ok(false);
        }

        let (a, b) = self.pair_mut(downstream, upstream)?;
        a.inputs.remove(&upstream);
        b.outputs.remove(&downstream);
        a.dirty = true;
        b.dirty = true;

        self.emit_edge(a_loc, b_loc, false, true);
        self.emit_edge(b_loc, a_loc, true, true);
        log::info!("Unlinked {} -> {}", b_loc, a_loc);
        Ok(true)
    }

    /// Cut every output edge of `id` that no longer holds
    ///
    /// An edge goes when its endpoints are in different realms, out of
    /// reach, or the beam between them is obstructed. Returns the number
    /// of edges removed.
    pub fn validate_outputs<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        id: NodeId,
    ) -> Result<usize, GraphError> {
        let node = self.node(id)?;
        let mut broken = Vec::new();
        for &output in node.outputs.iter() {
            let other = self.node(output)?;
            let valid = node.location.same_realm(&other.location)
                && within_reach(node, other)
                && beam_is_clear(env, node, other);
            if !valid {
                broken.push(output);
            }
        }

        for &output in &broken {
            self.unlink_input(output, id)?;
        }
        if !broken.is_empty() {
            log::info!(
                "Validation cut {} output(s) of {}",
                broken.len(),
                self.node(id)?.location
            );
        }
        Ok(broken.len())
    }

    /// Validate outputs of every node
    pub fn validate_all<E: Environment + ?Sized>(&mut self, env: &E) -> Result<usize, GraphError> {
        let ids: Vec<NodeId> = self.ids().collect();
        let mut removed = 0;
        for id in ids {
            removed += self.validate_outputs(env, id)?;
        }
        Ok(removed)
    }
}
