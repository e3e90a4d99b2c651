//! Node arena and graph queries
//!
//! The network owns every node in an arena indexed by `NodeId`. Ids stay
//! valid until the node is removed and are never handed out again.

use std::collections::{HashMap, HashSet, VecDeque};

use super::location::{Location, NodeId};
use super::node::Node;
use super::sync::{SyncEvent, SyncObserver};
use crate::error::GraphError;
use crate::settings::{Settings, Side};

/// The impetus network: nodes, their edges and pending sync events
#[derive(Debug)]
pub struct Network {
    pub(crate) settings: Settings,
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) by_location: HashMap<Location, NodeId>,
    pub(crate) events: Vec<SyncEvent>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Network {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            nodes: Vec::new(),
            by_location: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn side(&self) -> Side {
        self.settings.side
    }

    /// Insert a node; its edge sets are ignored and start empty
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        if let Some(&occupant) = self.by_location.get(&node.location) {
            return Err(GraphError::LocationOccupied {
                location: node.location,
                occupant,
            });
        }

        let id = NodeId(self.nodes.len() as u32);
        node.inputs.clear();
        node.outputs.clear();
        node.dirty = true;
        self.by_location.insert(node.location, id);
        self.nodes.push(Some(node));
        Ok(id)
    }

    /// Remove a node, cutting all of its edges first
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let (inputs, outputs) = {
            let node = self.node(id)?;
            (node.inputs.clone(), node.outputs.clone())
        };
        for input in inputs {
            self.unlink_input(id, input)?;
        }
        for output in outputs {
            self.unlink_input(output, id)?;
        }

        let node = self.nodes[id.index()]
            .take()
            .ok_or(GraphError::UnknownNode(id))?;
        self.by_location.remove(&node.location);
        log::info!("Removed node {} at {}", id, node.location);
        Ok(node)
    }

    /// Relocate a node; edges are left for the next validation sweep
    pub fn move_node(&mut self, id: NodeId, location: Location) -> Result<(), GraphError> {
        if let Some(&occupant) = self.by_location.get(&location) {
            if occupant != id {
                return Err(GraphError::LocationOccupied { location, occupant });
            }
        }

        let node = self.node_mut(id)?;
        let old = node.location;
        let offset = node.beam_endpoint - crate::block_center(old.pos);
        node.location = location;
        node.beam_endpoint = crate::block_center(location.pos) + offset;
        node.dirty = true;

        self.by_location.remove(&old);
        self.by_location.insert(location, id);
        self.request_full_sync(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_at(&self, location: &Location) -> Option<NodeId> {
        self.by_location.get(location).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Live node ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }

    /// Ids of nodes whose owners must persist them, clearing the marks
    pub fn take_dirty(&mut self) -> Vec<NodeId> {
        let mut dirty = Vec::new();
        for (i, slot) in self.nodes.iter_mut().enumerate() {
            if let Some(node) = slot {
                if node.dirty {
                    node.dirty = false;
                    dirty.push(NodeId(i as u32));
                }
            }
        }
        dirty
    }

    pub(crate) fn mark_dirty(&mut self, id: NodeId) {
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.dirty = true;
        }
    }

    /// Two distinct nodes borrowed mutably at once
    pub(crate) fn pair_mut(
        &mut self,
        a: NodeId,
        b: NodeId,
    ) -> Result<(&mut Node, &mut Node), GraphError> {
        self.node(a)?;
        self.node(b)?;
        if a == b {
            return Err(GraphError::SameNode(a));
        }

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi.index());
        let lo_node = head[lo.index()]
            .as_mut()
            .ok_or(GraphError::UnknownNode(lo))?;
        let hi_node = tail[0].as_mut().ok_or(GraphError::UnknownNode(hi))?;
        if a < b {
            Ok((lo_node, hi_node))
        } else {
            Ok((hi_node, lo_node))
        }
    }

    // === Sync events ===

    pub(crate) fn emit(&mut self, event: SyncEvent) {
        self.events.push(event);
    }

    pub(crate) fn emit_edge(&mut self, node: Location, other: Location, is_output: bool, removed: bool) {
        self.emit(SyncEvent::EdgeChanged {
            node,
            other,
            is_output,
            removed,
        });
    }

    /// Ask observers to resend everything about a node
    pub fn request_full_sync(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.node(id)?.location;
        self.emit(SyncEvent::FullSync { node });
        Ok(())
    }

    pub fn pending_events(&self) -> &[SyncEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    /// Hand every queued event to `observer`, oldest first
    pub fn flush_events<O: SyncObserver + ?Sized>(&mut self, observer: &mut O) {
        for event in self.drain_events() {
            observer.on_event(&event);
        }
    }

    // === Queries ===

    /// Providers feeding `consumer`, nearest first
    ///
    /// Walks input edges upstream, expanding only through relays. A
    /// provider ends the walk along its branch even if it also relays.
    pub fn find_direct_providers(&self, consumer: NodeId) -> Result<Vec<NodeId>, GraphError> {
        if !self.node(consumer)?.consumer {
            return Err(GraphError::NotAConsumer(consumer));
        }

        let mut providers = Vec::new();
        let mut visited = HashSet::from([consumer]);
        let mut queue = VecDeque::from([consumer]);

        while let Some(current) = queue.pop_front() {
            for &input in self.node(current)?.inputs.iter() {
                if !visited.insert(input) {
                    continue;
                }
                let node = self.node(input)?;
                if node.is_provider() {
                    providers.push(input);
                } else if node.relay {
                    queue.push_back(input);
                }
            }
        }

        Ok(providers)
    }

    /// Shortest path from `provider` to `consumer` along output edges
    ///
    /// The path includes both ends. Intermediate nodes must be relays that
    /// are not providers themselves.
    pub fn find_path(
        &self,
        provider: NodeId,
        consumer: NodeId,
    ) -> Result<Option<Vec<NodeId>>, GraphError> {
        if !self.node(provider)?.is_provider() {
            return Err(GraphError::NotAProvider(provider));
        }
        if !self.node(consumer)?.consumer {
            return Err(GraphError::NotAConsumer(consumer));
        }

        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([provider]);

        while let Some(current) = queue.pop_front() {
            for &output in self.node(current)?.outputs.iter() {
                if output == provider || parent.contains_key(&output) {
                    continue;
                }
                parent.insert(output, current);

                if output == consumer {
                    let mut path = vec![consumer];
                    let mut step = consumer;
                    while let Some(&prev) = parent.get(&step) {
                        path.push(prev);
                        step = prev;
                    }
                    path.reverse();
                    return Ok(Some(path));
                }

                let node = self.node(output)?;
                if node.relay && !node.is_provider() {
                    queue.push_back(output);
                }
            }
        }

        Ok(None)
    }
}
