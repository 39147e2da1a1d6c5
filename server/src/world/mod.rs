//! Game world management.
//!
//! The [`World`] is the single owner of every player and NPC. All other
//! components receive a handle to it and mutate entities through its
//! operations; nothing else holds copies of entity state.

pub mod terrain;
pub mod movement;
pub mod zones;
pub mod combat;
pub mod economy;

use std::collections::HashMap;

use log::info;
use rand::Rng;

use runeworld_shared::{
    ServerMessage, PlayerSnapshot, NpcSnapshot, MessageChannel, HOME_POSITION,
    WORLD_WIDTH, WORLD_HEIGHT,
};

use crate::entities::{Player, Npc};
use terrain::{TerrainMap, Terrain};

/// Hostile population placed at world initialization
const GOBLIN_COUNT: usize = 10;

/// A message produced by a world operation, with its audience
#[derive(Debug)]
pub enum Outbound {
    /// Deliver to one player's session
    To(u64, ServerMessage),
    /// Deliver to every connected session
    Broadcast(ServerMessage),
}

/// Shorthand for a channelled server-generated message
pub fn system(channel: MessageChannel, text: impl Into<String>) -> ServerMessage {
    ServerMessage::SystemMessage {
        channel,
        text: text.into(),
    }
}

/// The game world containing all entities
pub struct World {
    terrain: TerrainMap,
    players: HashMap<u64, Player>,
    npcs: HashMap<u64, Npc>,
    // NPC ids start high to avoid confusion with player ids
    next_npc_id: u64,
}

impl World {
    pub fn new(terrain: TerrainMap) -> Self {
        let mut world = Self {
            terrain,
            players: HashMap::new(),
            npcs: HashMap::new(),
            next_npc_id: 10_000,
        };
        world.spawn_goblins();
        world.spawn_town();
        world
    }

    /// Scatter the hostile population over valid (non-water) terrain
    fn spawn_goblins(&mut self) {
        let mut rng = rand::thread_rng();
        let mut spawned = 0;
        let mut attempts = 0;
        while spawned < GOBLIN_COUNT && attempts < 100 {
            let x = rng.gen_range(0.0..WORLD_WIDTH);
            let y = rng.gen_range(0.0..WORLD_HEIGHT);
            if self.terrain.is_walkable(x, y) {
                self.spawn_hostile("goblin", [x, y], 15, 2, 3);
                spawned += 1;
            }
            attempts += 1;
        }
        info!("Spawned {} goblins", spawned);
    }

    /// Place the static shops, the banker and the quest giver
    fn spawn_town(&mut self) {
        let shops = [
            ("General Store", [500.0, 500.0], 50, 10, economy::general_store_stock()),
            ("Armor Shop", [1500.0, 500.0], 50, 15, economy::armor_shop_stock()),
            ("Magic Shop", [1000.0, 1500.0], 50, 20, economy::magic_shop_stock()),
        ];
        for (name, position, hp, level, stock) in shops {
            let id = self.allocate_npc_id();
            self.npcs
                .insert(id, Npc::shopkeeper(id, name, position, hp, level, stock));
        }

        let id = self.allocate_npc_id();
        self.npcs.insert(id, Npc::banker(id, "Banker", [750.0, 750.0]));

        let id = self.allocate_npc_id();
        self.npcs
            .insert(id, Npc::quest_giver(id, "Quest Giver", [800.0, 800.0]));

        info!("Initialized {} NPCs (including shops and bank)", self.npcs.len());
    }

    fn allocate_npc_id(&mut self) -> u64 {
        let id = self.next_npc_id;
        self.next_npc_id += 1;
        id
    }

    /// Spawn a hostile creature (world init or an external spawn command)
    pub fn spawn_hostile(
        &mut self,
        name: &str,
        position: [f32; 2],
        hp: u32,
        level: u32,
        attack_damage: u32,
    ) -> u64 {
        let id = self.allocate_npc_id();
        self.npcs
            .insert(id, Npc::hostile(id, name, position, hp, level, attack_damage));
        id
    }

    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    // =========================================================================
    // Player lifecycle
    // =========================================================================

    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Remove a live player (disconnect); the caller persists the record
    pub fn remove_player(&mut self, id: u64) -> Option<Player> {
        // Any NPC fighting this player gives up next AI tick; clear
        // player-side targets referencing them immediately.
        for player in self.players.values_mut() {
            if player.target == Some(id) {
                player.target = None;
            }
        }
        self.players.remove(&id)
    }

    pub fn player(&self, id: u64) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: u64) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn npc(&self, id: u64) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Validate and apply a movement request. The accepted position is
    /// broadcast; re-requesting an accepted position changes nothing.
    pub fn request_move(&mut self, player_id: u64, x: f32, y: f32) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&player_id) else {
            return Vec::new();
        };
        let accepted = movement::validate_move(&self.terrain, player.position, [x, y]);
        player.position = accepted;
        vec![Outbound::Broadcast(ServerMessage::PlayerMoved {
            id: player_id,
            x: accepted[0],
            y: accepted[1],
        })]
    }

    /// A guaranteed-safe spawn point: grass near the home anchor
    pub fn find_safe_spawn(&self) -> [f32; 2] {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let x = 900.0 + rng.gen_range(0.0..200.0);
            let y = 900.0 + rng.gen_range(0.0..200.0);
            if self.terrain.classify(x, y) == Terrain::Grass {
                return [x, y];
            }
        }
        HOME_POSITION
    }

    /// Restore a player to full health at a safe spawn point
    pub fn respawn(&mut self, player_id: u64) -> Vec<Outbound> {
        let spawn = self.find_safe_spawn();
        let Some(player) = self.players.get_mut(&player_id) else {
            return Vec::new();
        };
        player.restore_full();
        player.position = spawn;
        player.target = None;
        vec![
            Outbound::To(
                player_id,
                ServerMessage::Respawned {
                    x: spawn[0],
                    y: spawn[1],
                    hp: player.hp(),
                    max_hp: player.max_hp(),
                },
            ),
            Outbound::To(
                player_id,
                system(MessageChannel::System, "You have respawned at the starting location."),
            ),
            Outbound::Broadcast(ServerMessage::PlayerMoved {
                id: player_id,
                x: spawn[0],
                y: spawn[1],
            }),
        ]
    }

    /// Teleport back to the home anchor without touching vitals
    pub fn teleport_home(&mut self, player_id: u64) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&player_id) else {
            return Vec::new();
        };
        player.position = HOME_POSITION;
        vec![
            Outbound::To(
                player_id,
                ServerMessage::Respawned {
                    x: HOME_POSITION[0],
                    y: HOME_POSITION[1],
                    hp: player.hp(),
                    max_hp: player.max_hp(),
                },
            ),
            Outbound::To(
                player_id,
                system(MessageChannel::System, "You have teleported to your home location."),
            ),
            Outbound::Broadcast(ServerMessage::PlayerMoved {
                id: player_id,
                x: HOME_POSITION[0],
                y: HOME_POSITION[1],
            }),
        ]
    }

    // =========================================================================
    // Ticking & snapshots
    // =========================================================================

    /// Advance NPC AI one step against a single clock reading
    pub fn update(&mut self, now_ms: u64) -> Vec<Outbound> {
        combat::step_ai(self, now_ms)
    }

    pub fn player_roster(&self) -> Vec<PlayerSnapshot> {
        self.players
            .values()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                x: p.position[0],
                y: p.position[1],
            })
            .collect()
    }

    pub fn npc_roster(&self) -> Vec<NpcSnapshot> {
        self.npcs.values().map(|n| n.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world() -> World {
        World::new(TerrainMap::procedural())
    }

    #[test]
    fn world_init_populates_goblins_and_town() {
        let world = test_world();
        let hostiles = world.npcs().filter(|n| matches!(n.kind, crate::entities::NpcKind::Hostile(_))).count();
        let shops = world.npcs().filter(|n| matches!(n.kind, crate::entities::NpcKind::Shopkeeper(_))).count();
        assert_eq!(hostiles, GOBLIN_COUNT);
        assert_eq!(shops, 3);
        // Goblins never spawn in water
        for npc in world.npcs() {
            assert!(world.terrain().is_walkable(npc.position[0], npc.position[1]));
        }
    }

    #[test]
    fn npc_ids_start_above_player_range() {
        let world = test_world();
        assert!(world.npcs().all(|n| n.id >= 10_000));
    }

    #[test]
    fn move_request_to_current_position_is_idempotent() {
        let mut world = test_world();
        world.add_player(Player::new(1, "tester".into(), [1000.0, 1000.0]));
        world.request_move(1, 940.0, 1000.0);
        let first = world.player(1).unwrap().position;
        world.request_move(1, first[0], first[1]);
        assert_eq!(world.player(1).unwrap().position, first);
    }

    #[test]
    fn move_into_water_is_redirected_off_water() {
        let mut world = test_world();
        world.add_player(Player::new(1, "tester".into(), [1000.0, 300.0]));
        world.request_move(1, 1000.0, 100.0);
        let pos = world.player(1).unwrap().position;
        assert_ne!(world.terrain().classify(pos[0], pos[1]), Terrain::Water);
    }

    #[test]
    fn safe_spawn_is_grass() {
        let world = test_world();
        let spawn = world.find_safe_spawn();
        // Either a found grass point or the home anchor fallback
        assert!(world.terrain().is_walkable(spawn[0], spawn[1]));
        assert!(spawn[0] >= 900.0 && spawn[0] <= 1100.0);
    }

    #[test]
    fn respawn_restores_and_relocates() {
        let mut world = test_world();
        let mut player = Player::new(1, "tester".into(), [100.0, 1900.0]);
        player.apply_damage(19);
        world.add_player(player);

        let out = world.respawn(1);
        assert!(!out.is_empty());
        let player = world.player(1).unwrap();
        assert_eq!(player.hp(), player.max_hp());
        assert!(player.position[0] >= 900.0 && player.position[0] <= 1100.0);
    }
}
