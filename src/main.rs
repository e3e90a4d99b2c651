//! Impetus network demo
//!
//! Usage: `impetus-network [settings.json] [seed]`
//!
//! Generates a seeded network, previews a few requests, commits them and
//! then knocks a hole in a link's line of sight to show validation at work.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;

    use impetus_network::Settings;
    use impetus_network::net::{BlockMaterial, EventLog, Location};
    use impetus_network::scenario::{ScenarioParams, generate};

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = args
        .next()
        .map(PathBuf::from)
        .map(|path| Settings::load_or_default(&path))
        .unwrap_or_default();
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);

    let params = ScenarioParams {
        seed,
        ..Default::default()
    };
    let mut scenario = match generate(&params, &settings) {
        Ok(scenario) => scenario,
        Err(e) => {
            log::error!("Failed to build scenario: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("Impetus network demo (seed {}, {} side)", seed, settings.side.as_str());

    for reason in &scenario.rejected {
        println!("rejected link: {} [{}]", reason, reason.message_key());
    }

    let net = &mut scenario.network;
    for request in [1, 5, 25, 100] {
        let preview = net.distribute(request, scenario.consumer, true);
        let committed = net.distribute(request, scenario.consumer, false);
        match (preview, committed) {
            (Ok(preview), Ok(committed)) => {
                println!(
                    "request {:>3}: preview {:>3}, delivered {:>3} over {} path(s)",
                    request,
                    preview.delivered,
                    committed.delivered,
                    committed.paths.len()
                );
                if let Err(e) = net.sync_transactions(&committed) {
                    log::error!("Transaction sync failed: {}", e);
                }
            }
            (Err(e), _) | (_, Err(e)) => log::error!("Distribution failed: {}", e),
        }
    }

    // Drop stone on every relay's neighbour toward the consumer
    let consumer_pos = match net.node(scenario.consumer) {
        Ok(node) => node.location.pos,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };
    for &relay in &scenario.relays {
        if let Ok(node) = net.node(relay) {
            let step = (consumer_pos - node.location.pos).signum();
            let wall = Location {
                pos: node.location.pos + step,
                realm: node.location.realm,
            };
            if wall.pos != consumer_pos && net.node_at(&wall).is_none() {
                scenario.world.set(wall, BlockMaterial::STONE);
            }
        }
    }
    match net.validate_all(&scenario.world) {
        Ok(removed) => println!("validation removed {} link(s)", removed),
        Err(e) => log::error!("Validation failed: {}", e),
    }

    let mut events = EventLog::new();
    net.flush_events(&mut events);
    println!(
        "sync: {} edge change(s), {} transaction(s)",
        events.edge_changes().count(),
        events.transactions().count()
    );
    println!("dirty nodes to persist: {}", net.take_dirty().len());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library only on wasm
}
