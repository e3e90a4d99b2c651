//! Network nodes and their capabilities
//!
//! A node is a generic vertex with optional behaviors attached: it can
//! supply impetus (provider), sink it (consumer), pass it along (relay),
//! and react to transactions flowing through it (hook). Any combination
//! is allowed.

use std::collections::BTreeSet;
use std::fmt;

use glam::DVec3;

use super::location::{Location, NodeId};
use crate::block_center;
use crate::consts::*;

/// Something that can release impetus on request
pub trait Provider: fmt::Debug {
    /// Release up to `amount`, returning what was (or would be) released.
    /// Must not change any state when `simulate` is true.
    fn provide(&mut self, amount: u64, simulate: bool) -> u64;
}

/// Where a transaction currently is along its path
#[derive(Debug, Clone, Copy)]
pub struct TransactionContext<'a> {
    /// Sink of the transaction
    pub consumer: NodeId,
    /// Full path, provider first, consumer last
    pub path: &'a [NodeId],
    /// Index of the node being visited within `path`
    pub position: usize,
}

impl<'a> TransactionContext<'a> {
    /// Nodes still ahead of the current one
    pub fn remaining(&self) -> &'a [NodeId] {
        &self.path[(self.position + 1).min(self.path.len())..]
    }
}

/// Per-node reaction to a transaction passing through
pub trait TransactionHook: fmt::Debug {
    /// Returns the amount that continues past this node
    fn on_transaction(&mut self, ctx: &TransactionContext<'_>, amount: u64, simulate: bool) -> u64;
}

/// Buffered impetus store with a per-transaction output cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservoir {
    pub stored: u64,
    pub capacity: u64,
    pub max_per_transaction: u64,
}

impl Reservoir {
    pub fn new(capacity: u64, max_per_transaction: u64) -> Self {
        Self {
            stored: 0,
            capacity,
            max_per_transaction,
        }
    }

    pub fn filled(capacity: u64, max_per_transaction: u64) -> Self {
        Self {
            stored: capacity,
            capacity,
            max_per_transaction,
        }
    }

    /// Add impetus, returning how much did not fit
    pub fn fill(&mut self, amount: u64) -> u64 {
        let accepted = amount.min(self.capacity.saturating_sub(self.stored));
        self.stored += accepted;
        amount - accepted
    }
}

impl Provider for Reservoir {
    fn provide(&mut self, amount: u64, simulate: bool) -> u64 {
        let offered = amount.min(self.stored).min(self.max_per_transaction);
        if !simulate {
            self.stored -= offered;
        }
        offered
    }
}

/// Caps every transaction passing through and counts committed throughput
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThroughputLimit {
    pub max_per_transaction: u64,
    /// Total committed through this node
    pub carried: u64,
}

impl ThroughputLimit {
    pub fn new(max_per_transaction: u64) -> Self {
        Self {
            max_per_transaction,
            carried: 0,
        }
    }
}

impl TransactionHook for ThroughputLimit {
    fn on_transaction(&mut self, _ctx: &TransactionContext<'_>, amount: u64, simulate: bool) -> u64 {
        let passed = amount.min(self.max_per_transaction);
        if !simulate {
            self.carried = self.carried.saturating_add(passed);
        }
        passed
    }
}

/// Tagged view of a node's capability set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Provider,
    Consumer,
    Relay,
    /// More than one capability
    Combined,
    /// No capability at all
    Inert,
}

/// A vertex of the impetus network
#[derive(Debug)]
pub struct Node {
    pub location: Location,
    /// Point beams leave from and arrive at
    pub beam_endpoint: DVec3,
    pub max_inputs: usize,
    pub max_outputs: usize,
    pub max_connect_distance: f64,
    /// Refuses interactive unlinking (validation may still cut links)
    pub link_locked: bool,

    // === Capabilities ===
    pub provider: Option<Box<dyn Provider>>,
    pub consumer: bool,
    pub relay: bool,
    pub hook: Option<Box<dyn TransactionHook>>,

    pub(crate) inputs: BTreeSet<NodeId>,
    pub(crate) outputs: BTreeSet<NodeId>,
    pub(crate) dirty: bool,
}

impl Node {
    /// Node with no capabilities and default limits, beam at block center
    pub fn new(location: Location) -> Self {
        Self {
            location,
            beam_endpoint: block_center(location.pos),
            max_inputs: DEFAULT_MAX_INPUTS,
            max_outputs: DEFAULT_MAX_OUTPUTS,
            max_connect_distance: DEFAULT_MAX_CONNECT_DISTANCE,
            link_locked: false,
            provider: None,
            consumer: false,
            relay: false,
            hook: None,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            dirty: false,
        }
    }

    pub fn provider(location: Location, provider: impl Provider + 'static) -> Self {
        Self::new(location)
            .with_provider(provider)
            .with_limits(0, DEFAULT_MAX_OUTPUTS)
    }

    pub fn consumer(location: Location) -> Self {
        let mut node = Self::new(location).with_limits(DEFAULT_MAX_INPUTS, 0);
        node.consumer = true;
        node
    }

    pub fn relay(location: Location) -> Self {
        let mut node = Self::new(location);
        node.relay = true;
        node
    }

    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn with_hook(mut self, hook: impl TransactionHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn with_limits(mut self, max_inputs: usize, max_outputs: usize) -> Self {
        self.max_inputs = max_inputs;
        self.max_outputs = max_outputs;
        self
    }

    pub fn with_connect_distance(mut self, distance: f64) -> Self {
        self.max_connect_distance = distance;
        self
    }

    pub fn with_beam_endpoint(mut self, endpoint: DVec3) -> Self {
        self.beam_endpoint = endpoint;
        self
    }

    pub fn locked(mut self) -> Self {
        self.link_locked = true;
        self
    }

    pub fn kind(&self) -> NodeKind {
        let flags = [self.is_provider(), self.consumer, self.relay];
        match flags {
            [true, false, false] => NodeKind::Provider,
            [false, true, false] => NodeKind::Consumer,
            [false, false, true] => NodeKind::Relay,
            [false, false, false] => NodeKind::Inert,
            _ => NodeKind::Combined,
        }
    }

    #[inline]
    pub fn is_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether impetus can leave this node along an output edge
    #[inline]
    pub fn emits(&self) -> bool {
        self.is_provider() || self.relay
    }

    /// Whether impetus can arrive at this node along an input edge
    #[inline]
    pub fn accepts(&self) -> bool {
        self.consumer || self.relay
    }

    pub fn inputs(&self) -> &BTreeSet<NodeId> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<NodeId> {
        &self.outputs
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reach of this node toward `other`
    pub fn max_connect_distance(&self, _other: &Node) -> f64 {
        self.max_connect_distance
    }

    /// Link policy: may `other` feed into this node
    pub fn can_connect_as_input(&self, other: &Node) -> bool {
        self.accepts() && other.emits()
    }

    /// Link policy: may this node feed into `other`
    pub fn can_connect_as_output(&self, other: &Node) -> bool {
        self.emits() && other.accepts()
    }

    pub fn can_remove_as_input(&self, _other: &Node) -> bool {
        !self.link_locked
    }

    pub fn can_remove_as_output(&self, _other: &Node) -> bool {
        !self.link_locked
    }

    /// Ask the attached provider for impetus; zero for non-providers
    pub fn provide(&mut self, amount: u64, simulate: bool) -> u64 {
        match self.provider.as_mut() {
            Some(provider) => provider.provide(amount, simulate),
            None => 0,
        }
    }

    /// Run the transaction hook; nodes without one pass everything through
    pub fn on_transaction(&mut self, ctx: &TransactionContext<'_>, amount: u64, simulate: bool) -> u64 {
        match self.hook.as_mut() {
            Some(hook) => hook.on_transaction(ctx, amount, simulate),
            None => amount,
        }
    }
}
