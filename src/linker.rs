//! Two-click link tool
//!
//! Sneak-use a node to pick it as the link origin (again to clear it), then
//! use another node to link the origin into it as an input. Using a node
//! that already takes the origin as input removes that link instead.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::net::{Environment, LinkOutcome, LinkRejection, Location, Network, NodeId};

/// What a link tool interaction did, for the host to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerFeedback {
    /// Interaction not consumed
    Ignored,
    /// Consumed with nothing to report
    Handled,
    OriginSet(Location),
    OriginCleared,
    /// The stored origin no longer holds a node
    OriginMissing,
    Linked,
    Unlinked,
    Rejected(LinkRejection),
}

impl LinkerFeedback {
    /// Whether the host should treat the interaction as used up
    pub fn consumed(&self) -> bool {
        !matches!(self, LinkerFeedback::Ignored)
    }

    /// Message key for feedback worth showing the user
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            LinkerFeedback::Rejected(reason) => Some(reason.message_key()),
            LinkerFeedback::OriginMissing => Some("impetus.link.origin_missing"),
            _ => None,
        }
    }
}

/// Link tool state carried by a player's item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linker {
    pub origin: Option<Location>,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the tool on `target`
    pub fn interact<E: Environment + ?Sized>(
        &mut self,
        network: &mut Network,
        env: &E,
        target: NodeId,
        sneaking: bool,
    ) -> Result<LinkerFeedback, GraphError> {
        if network.side().is_remote() {
            return Ok(LinkerFeedback::Handled);
        }

        let target_loc = network.node(target)?.location;
        if sneaking {
            if self.origin == Some(target_loc) {
                self.origin = None;
                return Ok(LinkerFeedback::OriginCleared);
            }
            self.origin = Some(target_loc);
            return Ok(LinkerFeedback::OriginSet(target_loc));
        }

        let Some(origin) = self.origin else {
            return Ok(LinkerFeedback::Ignored);
        };
        if origin == target_loc {
            return Ok(LinkerFeedback::Rejected(LinkRejection::SamePosition));
        }
        let Some(source) = network.node_at(&origin) else {
            return Ok(LinkerFeedback::OriginMissing);
        };

        let target_node = network.node(target)?;
        if target_node.inputs().contains(&source) {
            let source_node = network.node(source)?;
            if target_node.can_remove_as_input(source_node)
                && source_node.can_remove_as_output(target_node)
            {
                network.unlink_input(target, source)?;
                return Ok(LinkerFeedback::Unlinked);
            }
            return Ok(LinkerFeedback::Handled);
        }

        Ok(match network.link_input(target, source, env)? {
            LinkOutcome::Linked => LinkerFeedback::Linked,
            LinkOutcome::Rejected(reason) => LinkerFeedback::Rejected(reason),
        })
    }
}
