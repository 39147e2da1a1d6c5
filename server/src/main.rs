//! Runeworld game server
//!
//! The authoritative simulation for the world: it owns every player,
//! NPC, shop and bank, advances them on fixed schedules, and emits state
//! deltas to connected clients. One task owns all world state; inbound
//! commands are serialized onto it, so mutation needs no locks.

mod commands;
mod entities;
mod network;
mod persistence;
mod world;

use std::time::{Duration, Instant};

use log::{info, warn, error};

use runeworld_shared::{DEFAULT_PORT, TICK_INTERVAL_MS, AI_TICK_EVERY, NPC_ROSTER_EVERY};

use crate::network::Server;
use crate::persistence::Store;
use crate::world::World;
use crate::world::terrain::{TerrainMap, TileGrid};

/// Account database location
const DATA_DIR: &str = "data";
const DB_PATH: &str = "data/runeworld.db";

/// How often to save player data (in seconds)
const SAVE_INTERVAL_SECS: u64 = 60;

/// Terrain source: an explicit tile grid when `--world <path>` is given,
/// the procedural classifier otherwise.
fn load_terrain(args: &[String]) -> TerrainMap {
    let path = args
        .iter()
        .position(|a| a == "--world")
        .and_then(|i| args.get(i + 1));
    match path {
        Some(path) => match TileGrid::load(path) {
            Ok(grid) => TerrainMap::with_grid(grid),
            Err(e) => {
                error!("Failed to load tile grid: {}", e);
                error!("Falling back to procedural terrain");
                TerrainMap::procedural()
            }
        },
        None => TerrainMap::procedural(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    info!("Starting Runeworld server...");
    info!("Tick interval: {} ms", TICK_INTERVAL_MS);
    info!("Listening on port {}", DEFAULT_PORT);

    // Account store; the server runs without it, just not durably
    if let Err(e) = std::fs::create_dir_all(DATA_DIR) {
        warn!("Could not create data directory: {}", e);
    }
    let store = match Store::connect(DB_PATH).await {
        Ok(store) => {
            info!("Connected to account store at {}", DB_PATH);
            Some(store)
        }
        Err(e) => {
            error!("Failed to open account store: {}", e);
            error!("Server will run without persistence (accounts are not durable)");
            None
        }
    };
    let persistence = store.clone().map(persistence::spawn);

    let mut world = World::new(load_terrain(&args));

    let mut server = match Server::new(DEFAULT_PORT, store, persistence.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return;
        }
    };

    let tick_duration = Duration::from_millis(TICK_INTERVAL_MS);
    let start = Instant::now();
    let mut tick: u64 = 0;
    let mut last_save = Instant::now();
    let save_interval = Duration::from_secs(SAVE_INTERVAL_SECS);

    info!("Server started successfully!");

    // Main game loop
    loop {
        let tick_start = Instant::now();
        // The one authoritative clock reading for this pass
        let now_ms = start.elapsed().as_millis() as u64;

        // Drain inbound commands into the world
        server.process_incoming(&mut world, now_ms).await;

        // AI/combat stepping runs on the slower cadence
        if tick % AI_TICK_EVERY == 0 {
            let events = world.update(now_ms);
            server.queue_outbound(events);
        }

        // Position broadcast every tick, full NPC roster less often
        server.broadcast_player_roster(&world);
        if tick % NPC_ROSTER_EVERY == 0 {
            server.broadcast_npc_roster(&world);
        }

        server.process_outgoing().await;

        if last_save.elapsed() >= save_interval {
            server.save_all_players(&world);
            info!("Periodic save complete");
            last_save = Instant::now();
        }

        tick += 1;

        let elapsed = tick_start.elapsed();
        if elapsed < tick_duration {
            tokio::time::sleep(tick_duration - elapsed).await;
        }
    }
}
