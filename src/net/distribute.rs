//! Fair-share impetus distribution
//!
//! A consumer's request is split across every provider feeding it. Each
//! provider's share is recomputed just before it is asked, from whatever is
//! still outstanding and the number of providers left, so a provider that
//! comes up short (or whose path chokes) hands its unused share on to the
//! ones after it.

use super::graph::Network;
use super::location::{Location, NodeId};
use super::node::TransactionContext;
use super::sync::SyncEvent;
use crate::error::GraphError;
use crate::settings::Side;

/// A path that carried impetus in a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedPath {
    /// Provider first, consumer last
    pub nodes: Vec<NodeId>,
    /// Committed (or, when simulating, would-be committed) amount
    pub amount: u64,
}

impl UsedPath {
    pub fn provider(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }
}

/// Outcome of a distribution request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeResult {
    pub delivered: u64,
    pub paths: Vec<UsedPath>,
}

impl ConsumeResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered == 0 && self.paths.is_empty()
    }

    /// Amount delivered by one provider
    pub fn delivered_by(&self, provider: NodeId) -> u64 {
        self.paths
            .iter()
            .filter(|p| p.provider() == Some(provider))
            .map(|p| p.amount)
            .sum()
    }
}

/// Share for the next provider in line
///
/// `outstanding` split over `remaining` providers, with the remainder
/// going one unit at a time to the earliest ones. Asking this repeatedly
/// while every provider delivers in full hands out exactly `outstanding`.
#[inline]
pub fn fair_share(outstanding: u64, remaining: u64) -> u64 {
    if remaining == 0 {
        return 0;
    }
    outstanding / remaining + u64::from(outstanding % remaining > 0)
}

impl Network {
    /// Draw up to `amount` impetus into `consumer` from its providers
    ///
    /// Providers are tried in order of how much they could give at most,
    /// largest first. If fewer units are requested than there are
    /// providers, only the top `amount` providers take part. With
    /// `simulate` set (or on the client side) nothing is committed.
    pub fn distribute(
        &mut self,
        amount: u64,
        consumer: NodeId,
        simulate: bool,
    ) -> Result<ConsumeResult, GraphError> {
        if amount == 0 {
            return Ok(ConsumeResult::empty());
        }
        let simulate = simulate || self.side() == Side::Client;

        let mut ranked = Vec::new();
        for id in self.find_direct_providers(consumer)? {
            let capacity = self.node_mut(id)?.provide(u64::MAX, true);
            ranked.push((id, capacity));
        }
        if ranked.is_empty() {
            return Ok(ConsumeResult::empty());
        }

        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if amount < ranked.len() as u64 {
            ranked.truncate(amount as usize);
        }

        let mut routes = Vec::with_capacity(ranked.len());
        for (id, _) in ranked {
            // Discovery walks inputs, pathing walks outputs; they only
            // disagree when the two edge sets are out of step
            match self.find_path(id, consumer)? {
                Some(path) => routes.push((id, path)),
                None => log::debug!("Provider {} has no path to {}", id, consumer),
            }
        }

        let mut result = ConsumeResult::empty();
        let count = routes.len();
        for (i, (provider, path)) in routes.into_iter().enumerate() {
            let outstanding = amount - result.delivered;
            if outstanding == 0 {
                break;
            }

            let share = fair_share(outstanding, (count - i) as u64);
            let offered = self.node_mut(provider)?.provide(share, true).min(share);
            if offered == 0 {
                continue;
            }

            let passed = self.walk_path(consumer, &path, offered, true)?;
            if passed == 0 {
                continue;
            }

            let committed = self
                .node_mut(provider)?
                .provide(passed, simulate)
                .min(passed);
            if committed == 0 {
                continue;
            }
            if !simulate {
                self.walk_path(consumer, &path, committed, false)?;
            }

            result.delivered += committed;
            result.paths.push(UsedPath {
                nodes: path,
                amount: committed,
            });
        }

        log::debug!(
            "Distribute {} to {}{}: delivered {} over {} path(s)",
            amount,
            consumer,
            if simulate { " (simulated)" } else { "" },
            result.delivered,
            result.paths.len()
        );
        Ok(result)
    }

    /// Offer `amount` to every hook along `path`, provider first
    ///
    /// Each hook sees what the previous one let through. Stops early once
    /// nothing is left.
    fn walk_path(
        &mut self,
        consumer: NodeId,
        path: &[NodeId],
        amount: u64,
        simulate: bool,
    ) -> Result<u64, GraphError> {
        let mut passed = amount;
        for (position, &id) in path.iter().enumerate() {
            let ctx = TransactionContext {
                consumer,
                path,
                position,
            };
            passed = self
                .node_mut(id)?
                .on_transaction(&ctx, passed, simulate)
                .min(passed);
            if passed == 0 {
                break;
            }
        }
        Ok(passed)
    }

    /// Queue one transaction event per used path
    pub fn sync_transactions(&mut self, result: &ConsumeResult) -> Result<(), GraphError> {
        for used in &result.paths {
            let path = used
                .nodes
                .iter()
                .map(|&id| self.node(id).map(|n| n.location))
                .collect::<Result<Vec<Location>, _>>()?;
            self.emit(SyncEvent::Transaction { path });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::collision::VoxelWorld;
    use crate::net::node::{Node, Provider, Reservoir, ThroughputLimit, TransactionHook};
    use crate::settings::Settings;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Consumer at the origin with one provider per capacity linked straight in
    fn star(settings: Settings, capacities: &[u64]) -> (Network, Vec<NodeId>, NodeId) {
        let world = VoxelWorld::new();
        let mut net = Network::new(settings);
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)).with_limits(capacities.len(), 0))
            .unwrap();

        let mut providers = Vec::new();
        for (i, &cap) in capacities.iter().enumerate() {
            let id = net
                .add_node(Node::provider(
                    Location::new(i as i32 + 1, 0, 0, 0),
                    Reservoir::filled(cap, cap),
                ))
                .unwrap();
            assert!(net.link_input(consumer, id, &world).unwrap().is_linked());
            providers.push(id);
        }
        (net, providers, consumer)
    }

    fn stored(net: &mut Network, id: NodeId) -> u64 {
        net.node_mut(id).unwrap().provide(u64::MAX, true)
    }

    #[test]
    fn test_fair_share_sums_to_outstanding() {
        let mut outstanding = 7;
        let mut shares = Vec::new();
        for remaining in (1..=3).rev() {
            let share = fair_share(outstanding, remaining);
            shares.push(share);
            outstanding -= share;
        }
        assert_eq!(shares, vec![3, 2, 2]);
        assert_eq!(outstanding, 0);
        assert_eq!(fair_share(8, 3), 3);
        assert_eq!(fair_share(5, 0), 0);
    }

    #[test]
    fn test_zero_amount_is_empty() {
        let (mut net, _, consumer) = star(Settings::default(), &[10]);
        assert!(net.distribute(0, consumer, false).unwrap().is_empty());
    }

    #[test]
    fn test_no_providers_is_empty() {
        let (mut net, _, consumer) = star(Settings::default(), &[]);
        assert!(net.distribute(5, consumer, false).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_consumer_is_an_error() {
        let (mut net, providers, _) = star(Settings::default(), &[10]);
        assert_eq!(
            net.distribute(5, providers[0], false),
            Err(GraphError::NotAConsumer(providers[0]))
        );
        assert_eq!(
            net.distribute(5, NodeId(99), false),
            Err(GraphError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn test_three_providers_split_seven() {
        // Added smallest first so sorting has work to do
        let (mut net, providers, consumer) = star(Settings::default(), &[2, 5, 10]);
        let result = net.distribute(7, consumer, false).unwrap();

        assert_eq!(result.delivered, 7);
        assert_eq!(result.paths.len(), 3);
        let amounts: Vec<_> = result.paths.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![3, 2, 2]);
        assert_eq!(result.paths[0].provider(), Some(providers[2]));
        assert_eq!(result.paths[0].nodes, vec![providers[2], consumer]);
        assert_eq!(stored(&mut net, providers[2]), 7);
        assert_eq!(stored(&mut net, providers[1]), 3);
        assert_eq!(stored(&mut net, providers[0]), 0);
    }

    #[test]
    fn test_last_provider_shortfall_is_not_covered() {
        let (mut net, providers, consumer) = star(Settings::default(), &[1, 5, 10]);
        let result = net.distribute(7, consumer, false).unwrap();
        assert_eq!(result.delivered, 6);
        assert_eq!(result.delivered_by(providers[0]), 1);
        assert_eq!(result.delivered_by(providers[1]), 2);
        assert_eq!(result.delivered_by(providers[2]), 3);
    }

    #[test]
    fn test_fewer_units_than_providers() {
        let (mut net, providers, consumer) = star(Settings::default(), &[1, 5, 10]);
        let result = net.distribute(2, consumer, false).unwrap();

        assert_eq!(result.delivered, 2);
        assert_eq!(result.paths.len(), 2);
        assert_eq!(result.delivered_by(providers[2]), 1);
        assert_eq!(result.delivered_by(providers[1]), 1);
        assert_eq!(result.delivered_by(providers[0]), 0);
        assert_eq!(stored(&mut net, providers[0]), 1);
    }

    #[test]
    fn test_shortfall_is_redistributed() {
        let world = VoxelWorld::new();
        let mut net = Network::default();
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)).with_limits(3, 0))
            .unwrap();
        let big = net
            .add_node(Node::provider(
                Location::new(4, 0, 0, 0),
                Reservoir::filled(10, 10),
            ))
            .unwrap();
        let choke = net
            .add_node(Node::relay(Location::new(2, 0, 0, 0)).with_hook(ThroughputLimit::new(1)))
            .unwrap();
        let mid = net
            .add_node(Node::provider(
                Location::new(0, 0, 3, 0),
                Reservoir::filled(5, 5),
            ))
            .unwrap();
        let small = net
            .add_node(Node::provider(
                Location::new(0, 0, -3, 0),
                Reservoir::filled(4, 4),
            ))
            .unwrap();
        net.link_input(choke, big, &world).unwrap();
        net.link_input(consumer, choke, &world).unwrap();
        net.link_input(consumer, mid, &world).unwrap();
        net.link_input(consumer, small, &world).unwrap();

        let result = net.distribute(7, consumer, false).unwrap();
        // Big gets a share of 3 but its relay only lets 1 through
        assert_eq!(result.delivered, 7);
        assert_eq!(result.delivered_by(big), 1);
        assert_eq!(result.delivered_by(mid), 3);
        assert_eq!(result.delivered_by(small), 3);
        assert_eq!(result.paths[0].nodes, vec![big, choke, consumer]);
        assert_eq!(stored(&mut net, big), 9);
    }

    #[test]
    fn test_choked_path_is_skipped() {
        let world = VoxelWorld::new();
        let mut net = Network::default();
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)).with_limits(2, 0))
            .unwrap();
        let big = net
            .add_node(Node::provider(
                Location::new(4, 0, 0, 0),
                Reservoir::filled(10, 10),
            ))
            .unwrap();
        let closed = net
            .add_node(Node::relay(Location::new(2, 0, 0, 0)).with_hook(ThroughputLimit::new(0)))
            .unwrap();
        let other = net
            .add_node(Node::provider(
                Location::new(0, 0, 3, 0),
                Reservoir::filled(5, 5),
            ))
            .unwrap();
        net.link_input(closed, big, &world).unwrap();
        net.link_input(consumer, closed, &world).unwrap();
        net.link_input(consumer, other, &world).unwrap();

        let result = net.distribute(4, consumer, false).unwrap();
        assert_eq!(result.delivered, 4);
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.delivered_by(other), 4);
        assert_eq!(stored(&mut net, big), 10);
    }

    #[test]
    fn test_simulate_does_not_commit() {
        let (mut net, providers, consumer) = star(Settings::default(), &[4, 6]);
        let first = net.distribute(8, consumer, true).unwrap();
        let second = net.distribute(8, consumer, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.delivered, 8);
        assert_eq!(stored(&mut net, providers[0]), 4);
        assert_eq!(stored(&mut net, providers[1]), 6);

        let committed = net.distribute(8, consumer, false).unwrap();
        assert_eq!(committed, first);
        assert_eq!(stored(&mut net, providers[0]), 0);
        assert_eq!(stored(&mut net, providers[1]), 2);
    }

    #[test]
    fn test_client_side_never_commits() {
        let settings = Settings {
            side: Side::Client,
            ..Settings::default()
        };
        let (mut net, providers, consumer) = star(settings, &[5]);
        let result = net.distribute(3, consumer, false).unwrap();
        assert_eq!(result.delivered, 3);
        assert_eq!(stored(&mut net, providers[0]), 5);
    }

    #[test]
    fn test_sync_transactions() {
        let (mut net, _, consumer) = star(Settings::default(), &[5, 5]);
        net.drain_events();
        let result = net.distribute(4, consumer, false).unwrap();
        net.sync_transactions(&result).unwrap();

        let events = net.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SyncEvent::Transaction {
                path: vec![Location::new(1, 0, 0, 0), Location::new(0, 0, 0, 0)]
            }
        );
    }

    /// Reports a big capacity but never actually gives anything
    #[derive(Debug)]
    struct Mirage;

    impl Provider for Mirage {
        fn provide(&mut self, amount: u64, simulate: bool) -> u64 {
            if simulate { amount.min(100) } else { 0 }
        }
    }

    #[test]
    fn test_failed_commit_records_no_path() {
        let world = VoxelWorld::new();
        let mut net = Network::default();
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)).with_limits(2, 0))
            .unwrap();
        let mirage = net
            .add_node(Node::provider(Location::new(2, 0, 0, 0), Mirage))
            .unwrap();
        let real = net
            .add_node(Node::provider(
                Location::new(-2, 0, 0, 0),
                Reservoir::filled(10, 10),
            ))
            .unwrap();
        net.link_input(consumer, mirage, &world).unwrap();
        net.link_input(consumer, real, &world).unwrap();

        let result = net.distribute(6, consumer, false).unwrap();
        assert_eq!(result.delivered, 6);
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.delivered_by(real), 6);
    }

    /// Records what it sees committed, passes everything
    #[derive(Debug, Default)]
    struct Tally {
        committed: Rc<Cell<u64>>,
        simulated: Rc<Cell<u64>>,
    }

    impl TransactionHook for Tally {
        fn on_transaction(&mut self, _ctx: &TransactionContext<'_>, amount: u64, simulate: bool) -> u64 {
            let counter = if simulate { &self.simulated } else { &self.committed };
            counter.set(counter.get() + amount);
            amount
        }
    }

    #[test]
    fn test_unused_path_records_no_throughput() {
        let world = VoxelWorld::new();
        let mut net = Network::default();
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)))
            .unwrap();
        let relay = net
            .add_node(Node::relay(Location::new(2, 0, 0, 0)).with_hook(ThroughputLimit::new(50)))
            .unwrap();
        let mirage = net
            .add_node(Node::provider(Location::new(4, 0, 0, 0), Mirage))
            .unwrap();
        net.link_input(relay, mirage, &world).unwrap();
        net.link_input(consumer, relay, &world).unwrap();

        let tally = Tally::default();
        let (committed, simulated) = (tally.committed.clone(), tally.simulated.clone());
        net.node_mut(consumer).unwrap().hook = Some(Box::new(tally));

        let result = net.distribute(6, consumer, false).unwrap();
        assert!(result.is_empty());
        assert_eq!(simulated.get(), 6);
        assert_eq!(committed.get(), 0);
    }

    #[test]
    fn test_hooks_see_committed_amount_once() {
        let world = VoxelWorld::new();
        let mut net = Network::default();
        let consumer = net
            .add_node(Node::consumer(Location::new(0, 0, 0, 0)))
            .unwrap();
        let relay = net
            .add_node(Node::relay(Location::new(2, 0, 0, 0)).with_hook(ThroughputLimit::new(4)))
            .unwrap();
        let provider = net
            .add_node(Node::provider(
                Location::new(4, 0, 0, 0),
                Reservoir::filled(10, 10),
            ))
            .unwrap();
        net.link_input(relay, provider, &world).unwrap();
        net.link_input(consumer, relay, &world).unwrap();

        let tally = Tally::default();
        let committed = tally.committed.clone();
        net.node_mut(consumer).unwrap().hook = Some(Box::new(tally));

        assert_eq!(net.distribute(6, consumer, true).unwrap().delivered, 4);
        assert_eq!(committed.get(), 0);

        let result = net.distribute(6, consumer, false).unwrap();
        assert_eq!(result.delivered, 4);
        assert_eq!(committed.get(), 4);
        assert_eq!(stored(&mut net, provider), 6);
    }

    #[test]
    fn test_provider_without_path_is_skipped() {
        let (mut net, providers, consumer) = star(Settings::default(), &[5]);
        let stray = net
            .add_node(Node::provider(
                Location::new(0, 3, 0, 0),
                Reservoir::filled(9, 9),
            ))
            .unwrap();
        // Input edge with no matching output edge: discovered, never routed
        net.node_mut(consumer).unwrap().inputs.insert(stray);

        let result = net.distribute(4, consumer, false).unwrap();
        assert_eq!(result.delivered, 4);
        assert_eq!(result.delivered_by(providers[0]), 4);
        assert_eq!(stored(&mut net, stray), 9);
    }

    proptest! {
        #[test]
        fn prop_distribution_accounting(
            capacities in prop::collection::vec(0u64..20, 1..7),
            amount in 0u64..60,
        ) {
            let (mut net, providers, consumer) = star(Settings::default(), &capacities);
            let before: Vec<u64> = providers.iter().map(|&p| stored(&mut net, p)).collect();

            let simulated = net.distribute(amount, consumer, true).unwrap();
            let after: Vec<u64> = providers.iter().map(|&p| stored(&mut net, p)).collect();
            prop_assert_eq!(&before, &after);

            let result = net.distribute(amount, consumer, false).unwrap();
            prop_assert_eq!(&result, &simulated);
            prop_assert!(result.delivered <= amount);
            prop_assert_eq!(result.paths.iter().map(|p| p.amount).sum::<u64>(), result.delivered);
            prop_assert!(result.paths.len() as u64 <= amount);
            prop_assert!(result.paths.iter().all(|p| p.amount > 0));

            let drained: u64 = providers
                .iter()
                .zip(&before)
                .map(|(&p, &b)| b - stored(&mut net, p))
                .sum();
            prop_assert_eq!(drained, result.delivered);

            if amount > 0 && capacities.iter().any(|&c| c > 0) {
                prop_assert!(result.delivered > 0);
            }
        }

        #[test]
        fn prop_attempts_at_most_amount_providers(
            capacities in prop::collection::vec(1u64..20, 2..7),
        ) {
            let (mut net, _, consumer) = star(Settings::default(), &capacities);
            let amount = capacities.len() as u64 - 1;
            let result = net.distribute(amount, consumer, false).unwrap();
            prop_assert_eq!(result.delivered, amount);
            prop_assert_eq!(result.paths.len() as u64, amount);
        }
    }
}
