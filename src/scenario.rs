//! Seeded demo networks
//!
//! Builds a consumer fed by a ring of relays, each relay fed by a few
//! buffered providers, with a handful of stone obstacles scattered around.
//! Everything comes from a single seed, so a scenario can be rebuilt exactly.

use std::collections::HashSet;

use glam::IVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::net::{
    BlockMaterial, LinkOutcome, LinkRejection, Location, Network, Node, NodeId, Reservoir,
    ThroughputLimit, VoxelWorld,
};
use crate::settings::Settings;

/// Height all scenarios are built around
pub const BASE_Y: i32 = 64;
/// Attempts to find a free spot before giving up on a placement
const PLACEMENT_ATTEMPTS: usize = 32;

/// Shape of a generated scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub seed: u64,
    pub relays: usize,
    pub providers_per_relay: usize,
    /// Providers linked straight into the consumer
    pub direct_providers: usize,
    pub obstacles: usize,
    /// Upper bound for provider stock
    pub max_stock: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            relays: 3,
            providers_per_relay: 2,
            direct_providers: 1,
            obstacles: 6,
            max_stock: 50,
        }
    }
}

/// A generated network together with the world it lives in
#[derive(Debug)]
pub struct Scenario {
    pub network: Network,
    pub world: VoxelWorld,
    pub consumer: NodeId,
    pub relays: Vec<NodeId>,
    pub providers: Vec<NodeId>,
    /// Links the generator proposed that the network refused
    pub rejected: Vec<LinkRejection>,
}

/// Build a scenario from `params`
pub fn generate(params: &ScenarioParams, settings: &Settings) -> Result<Scenario, GraphError> {
    let mut rng = Pcg32::seed_from_u64(params.seed);
    let mut world = VoxelWorld::new();
    let mut network = Network::new(settings.clone());

    let origin = IVec3::new(0, BASE_Y, 0);
    let mut occupied = HashSet::from([origin]);
    let consumer = network.add_node(
        settings
            .configure(Node::consumer(at(origin)))
            .with_limits(params.relays + params.direct_providers, 0),
    )?;

    // Planned (downstream, upstream) links
    let mut links = Vec::new();
    let mut relays = Vec::new();
    let mut providers = Vec::new();

    for _ in 0..params.relays {
        let Some(pos) = place(&mut rng, origin, 4, &mut occupied) else {
            continue;
        };
        let throughput = rng.random_range(5..=20u64);
        let relay = network.add_node(
            settings
                .configure(Node::relay(at(pos)))
                .with_limits(params.providers_per_relay, 1)
                .with_hook(ThroughputLimit::new(throughput)),
        )?;
        links.push((consumer, relay));
        relays.push(relay);

        for _ in 0..params.providers_per_relay {
            let Some(p) = place(&mut rng, pos, 3, &mut occupied) else {
                continue;
            };
            let id = network.add_node(settings.configure(random_provider(&mut rng, p, params)))?;
            links.push((relay, id));
            providers.push(id);
        }
    }

    for _ in 0..params.direct_providers {
        let Some(p) = place(&mut rng, origin, 4, &mut occupied) else {
            continue;
        };
        let id = network.add_node(settings.configure(random_provider(&mut rng, p, params)))?;
        links.push((consumer, id));
        providers.push(id);
    }

    for _ in 0..params.obstacles {
        if let Some(pos) = place(&mut rng, origin, 6, &mut occupied) {
            world.set(at(pos), BlockMaterial::STONE);
        }
    }

    let mut rejected = Vec::new();
    for (downstream, upstream) in links {
        if let LinkOutcome::Rejected(reason) = network.link_input(downstream, upstream, &world)? {
            rejected.push(reason);
        }
    }

    log::info!(
        "Scenario {}: {} relays, {} providers, {} obstacles, {} rejected links",
        params.seed,
        relays.len(),
        providers.len(),
        world.len(),
        rejected.len()
    );

    Ok(Scenario {
        network,
        world,
        consumer,
        relays,
        providers,
        rejected,
    })
}

#[inline]
fn at(pos: IVec3) -> Location {
    Location {
        pos,
        realm: 0,
    }
}

fn random_provider(rng: &mut Pcg32, pos: IVec3, params: &ScenarioParams) -> Node {
    let stock = rng.random_range(0..=params.max_stock);
    let per_transaction = rng.random_range(1..=params.max_stock.max(1));
    Node::provider(at(pos), Reservoir::filled(stock, per_transaction))
}

/// Random free block near `center`, claimed in `occupied`
fn place(
    rng: &mut Pcg32,
    center: IVec3,
    spread: i32,
    occupied: &mut HashSet<IVec3>,
) -> Option<IVec3> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let pos = center
            + IVec3::new(
                rng.random_range(-spread..=spread),
                rng.random_range(-1..=1),
                rng.random_range(-spread..=spread),
            );
        if occupied.insert(pos) {
            return Some(pos);
        }
    }
    None
}
