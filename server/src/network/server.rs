//! UDP session gateway.
//!
//! Accepts inbound player commands over a persistent datagram flow, maps
//! each to exactly one world operation, and fans the resulting events
//! back out. Commands are drained at the top of every scheduler pass and
//! applied synchronously, so each one is a single atomic step against
//! the world.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn, error};
use tokio::net::UdpSocket;

use runeworld_shared::{
    ClientMessage, ServerMessage, MessageChannel, PROTOCOL_VERSION, HOME_POSITION,
};

use crate::commands;
use crate::entities::{Player, PlayerRecord};
use crate::persistence::{Store, PersistenceHandle, hash_password, verify_password};
use crate::world::{World, Outbound, system, combat, economy};

/// Maximum inbound packet size
const MAX_PACKET_SIZE: usize = 1200;

/// Connection timeout in seconds
const CONNECTION_TIMEOUT: f32 = 30.0;

/// Client connection state
#[derive(Debug)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub player_id: u64,
    pub username: String,
    pub last_seen: Instant,
    /// Outgoing message queue, flushed once per tick
    pub outgoing_queue: Vec<ServerMessage>,
    /// Whether this player may run admin commands
    pub is_admin: bool,
}

impl ClientConnection {
    pub fn new(addr: SocketAddr, player_id: u64, username: String, is_admin: bool) -> Self {
        Self {
            addr,
            player_id,
            username,
            last_seen: Instant::now(),
            outgoing_queue: Vec::new(),
            is_admin,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_seen.elapsed().as_secs_f32() > CONNECTION_TIMEOUT
    }
}

/// In-memory account used when no store is available. Nothing durable:
/// the server still runs, it just forgets on restart.
struct LocalAccount {
    password_hash: String,
    record: Option<PlayerRecord>,
}

/// Game server gateway
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: HashMap<SocketAddr, ClientConnection>,
    player_to_addr: HashMap<u64, SocketAddr>,
    next_player_id: u64,
    /// Messages to broadcast to all clients
    broadcast_queue: Vec<ServerMessage>,
    /// Account store (optional - the server works without it)
    store: Option<Store>,
    /// Background save handle (optional, paired with the store)
    persistence: Option<PersistenceHandle>,
    /// Volatile fallback accounts when the store is unavailable
    local_accounts: HashMap<String, LocalAccount>,
}

impl Server {
    /// Create a new server listening on the given port
    pub async fn new(
        port: u16,
        store: Option<Store>,
        persistence: Option<PersistenceHandle>,
    ) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", port);
        let socket = UdpSocket::bind(&addr).await?;

        Ok(Self {
            socket: Arc::new(socket),
            clients: HashMap::new(),
            player_to_addr: HashMap::new(),
            next_player_id: 1,
            broadcast_queue: Vec::new(),
            store,
            persistence,
            local_accounts: HashMap::new(),
        })
    }

    /// Drain and apply all pending inbound commands
    pub async fn process_incoming(&mut self, world: &mut World, now_ms: u64) {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, addr)) => {
                    self.handle_packet(&buf[..len], addr, world, now_ms).await;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }

        self.check_timeouts(world);
    }

    /// Handle a received packet
    async fn handle_packet(
        &mut self,
        data: &[u8],
        addr: SocketAddr,
        world: &mut World,
        now_ms: u64,
    ) {
        let message = match ClientMessage::deserialize(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize packet from {}: {}", addr, e);
                return;
            }
        };

        if let Some(client) = self.clients.get_mut(&addr) {
            client.last_seen = Instant::now();
        }

        match message {
            ClientMessage::Register { username, password } => {
                self.handle_register(addr, username, password).await;
            }
            ClientMessage::Login { protocol_version, username, password } => {
                self.handle_login(addr, protocol_version, username, password, world)
                    .await;
            }
            ClientMessage::Disconnect => {
                self.disconnect_client(addr, world);
            }
            other => {
                let Some(player_id) = self.clients.get(&addr).map(|c| c.player_id) else {
                    warn!("Command from unknown client {}", addr);
                    return;
                };
                let out = self.dispatch(player_id, other, world, now_ms);
                self.queue_outbound(out);
            }
        }
    }

    /// Map one in-game command to one world operation
    fn dispatch(
        &mut self,
        player_id: u64,
        message: ClientMessage,
        world: &mut World,
        now_ms: u64,
    ) -> Vec<Outbound> {
        match message {
            ClientMessage::MoveTo { x, y } => world.request_move(player_id, x, y),
            ClientMessage::Chat { text } => self.handle_chat(player_id, &text, world),
            ClientMessage::AttackNpc { npc_id } => {
                combat::attack_npc(world, player_id, npc_id, now_ms)
            }
            ClientMessage::AttackPlayer { player_id: target } => {
                combat::attack_player(world, player_id, target)
            }
            ClientMessage::GatherResource { resource, x, y } => {
                economy::gather_resource(world, player_id, resource, x, y)
            }
            ClientMessage::CastSpell { spell, target } => {
                economy::cast_spell(world, player_id, &spell, target, now_ms)
            }
            ClientMessage::OpenShop { npc_id } => economy::open_shop(world, player_id, npc_id),
            ClientMessage::BuyItem { shop_id, index } => {
                economy::buy_item(world, player_id, shop_id, index as usize)
            }
            ClientMessage::SellItem { slot } => {
                economy::sell_item(world, player_id, slot as usize)
            }
            ClientMessage::OpenBank => economy::open_bank(world, player_id),
            ClientMessage::DepositItem { slot } => {
                economy::deposit_item(world, player_id, slot as usize)
            }
            ClientMessage::WithdrawItem { slot } => {
                economy::withdraw_item(world, player_id, slot as usize)
            }
            ClientMessage::EquipItem { slot } => {
                economy::equip_item(world, player_id, slot as usize)
            }
            ClientMessage::UnequipItem { slot } => {
                economy::unequip_item(world, player_id, slot)
            }
            ClientMessage::UseItem { slot } => economy::use_item(world, player_id, slot as usize),
            ClientMessage::BuryBones { slot } => {
                economy::bury_bones(world, player_id, slot as usize)
            }
            ClientMessage::Respawn => world.respawn(player_id),
            ClientMessage::TeleportHome => world.teleport_home(player_id),
            // Connection management is handled before dispatch
            ClientMessage::Register { .. }
            | ClientMessage::Login { .. }
            | ClientMessage::Disconnect => Vec::new(),
        }
    }

    /// Chat: slash commands execute against the world, everything else
    /// broadcasts.
    fn handle_chat(&mut self, player_id: u64, text: &str, world: &mut World) -> Vec<Outbound> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let is_admin = self
            .player_to_addr
            .get(&player_id)
            .and_then(|addr| self.clients.get(addr))
            .map(|c| c.is_admin)
            .unwrap_or(false);

        if let Some(result) = commands::parse_and_execute(text, player_id, is_admin, world) {
            return vec![Outbound::To(
                player_id,
                system(MessageChannel::System, result.message),
            )];
        }

        let Some(player) = world.player(player_id) else {
            return Vec::new();
        };
        vec![Outbound::Broadcast(ServerMessage::ChatBroadcast {
            sender_id: player_id,
            sender_name: player.name.clone(),
            text: text.to_string(),
        })]
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn handle_register(&mut self, addr: SocketAddr, username: String, password: String) {
        if username.len() < 3 || username.len() > 12 {
            let msg = ServerMessage::RegisterFailed {
                reason: "Username must be 3-12 characters".to_string(),
            };
            self.send_to(addr, &msg).await;
            return;
        }
        if password.len() < 4 {
            let msg = ServerMessage::RegisterFailed {
                reason: "Password must be at least 4 characters".to_string(),
            };
            self.send_to(addr, &msg).await;
            return;
        }

        let result = match &self.store {
            Some(store) => store.register(&username, &password).await.map_err(|e| e.to_string()),
            None => {
                if self.local_accounts.contains_key(&username) {
                    Err("Username already exists".to_string())
                } else {
                    match hash_password(&password) {
                        Ok(password_hash) => {
                            self.local_accounts
                                .insert(username.clone(), LocalAccount { password_hash, record: None });
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        };

        match result {
            Ok(()) => {
                info!("New account registered: {}", username);
                self.send_to(addr, &ServerMessage::RegisterSuccess).await;
            }
            Err(reason) => {
                warn!("Registration failed for {}: {}", username, reason);
                self.send_to(addr, &ServerMessage::RegisterFailed { reason }).await;
            }
        }
    }

    async fn handle_login(
        &mut self,
        addr: SocketAddr,
        protocol_version: u32,
        username: String,
        password: String,
        world: &mut World,
    ) {
        if protocol_version != PROTOCOL_VERSION {
            let msg = ServerMessage::LoginFailed {
                reason: format!(
                    "Protocol version mismatch. Server: {}, Client: {}",
                    PROTOCOL_VERSION, protocol_version
                ),
            };
            self.send_to(addr, &msg).await;
            return;
        }

        if self.clients.contains_key(&addr) {
            warn!("Client {} already connected, ignoring", addr);
            return;
        }

        // One session per account
        if self.clients.values().any(|c| c.username == username) {
            let msg = ServerMessage::LoginFailed {
                reason: "User already logged in".to_string(),
            };
            self.send_to(addr, &msg).await;
            return;
        }

        let authenticated = match &self.store {
            Some(store) => store.authenticate(&username, &password).await.is_ok(),
            None => self
                .local_accounts
                .get(&username)
                .map(|a| verify_password(&password, &a.password_hash))
                .unwrap_or(false),
        };
        if !authenticated {
            warn!("Login failed for {}", username);
            let msg = ServerMessage::LoginFailed {
                reason: "Invalid username or password".to_string(),
            };
            self.send_to(addr, &msg).await;
            return;
        }

        let is_admin = match &self.store {
            Some(store) => store.is_admin(&username).await.unwrap_or(false),
            None => false,
        };

        // Last persisted state, if any
        let record = match &self.persistence {
            Some(persistence) => persistence.load_account(&username).await,
            None => self
                .local_accounts
                .get(&username)
                .and_then(|a| a.record.clone()),
        };

        let player_id = self.next_player_id;
        self.next_player_id += 1;

        let player = match record {
            Some(record) => Player::from_record(player_id, record),
            None => Player::new(player_id, username.clone(), HOME_POSITION),
        };
        let profile = player.profile();
        let joined = ServerMessage::PlayerJoined {
            id: player_id,
            name: player.name.clone(),
            x: player.position[0],
            y: player.position[1],
        };
        world.add_player(player);

        let connection = ClientConnection::new(addr, player_id, username.clone(), is_admin);
        self.clients.insert(addr, connection);
        self.player_to_addr.insert(player_id, addr);

        let admin_str = if is_admin { " [ADMIN]" } else { "" };
        info!("Player '{}' (id {}){} logged in from {}", username, player_id, admin_str, addr);

        self.send_to(addr, &ServerMessage::LoginSuccess { profile }).await;
        self.queue_outbound(vec![
            Outbound::To(
                player_id,
                system(
                    MessageChannel::System,
                    format!("Welcome to the game, {}!", username),
                ),
            ),
        ]);
        self.broadcast_except(addr, joined);
    }

    /// Tear down a session: persist the player, remove them from the
    /// world, tell everyone else. Disconnects are a lifecycle event,
    /// never an error.
    fn disconnect_client(&mut self, addr: SocketAddr, world: &mut World) {
        let Some(connection) = self.clients.remove(&addr) else {
            return;
        };
        self.player_to_addr.remove(&connection.player_id);

        if let Some(player) = world.remove_player(connection.player_id) {
            let record = player.to_record();
            match &self.persistence {
                Some(persistence) => persistence.save_account(&connection.username, record),
                None => {
                    if let Some(account) = self.local_accounts.get_mut(&connection.username) {
                        account.record = Some(record);
                    }
                }
            }
        }

        info!("Player '{}' (id {}) disconnected", connection.username, connection.player_id);
        self.broadcast_queue
            .push(ServerMessage::PlayerLeft { id: connection.player_id });
    }

    fn check_timeouts(&mut self, world: &mut World) {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .values()
            .filter(|c| c.is_timed_out())
            .map(|c| c.addr)
            .collect();
        for addr in timed_out {
            info!("Client {} timed out", addr);
            self.disconnect_client(addr, world);
        }
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Route world operation results to their audiences
    pub fn queue_outbound(&mut self, out: Vec<Outbound>) {
        for entry in out {
            match entry {
                Outbound::To(player_id, msg) => {
                    if let Some(addr) = self.player_to_addr.get(&player_id) {
                        if let Some(client) = self.clients.get_mut(addr) {
                            client.outgoing_queue.push(msg);
                        }
                    }
                }
                Outbound::Broadcast(msg) => {
                    self.broadcast_queue.push(msg);
                }
            }
        }
    }

    fn broadcast_except(&mut self, except: SocketAddr, msg: ServerMessage) {
        for client in self.clients.values_mut() {
            if client.addr != except {
                client.outgoing_queue.push(msg.clone());
            }
        }
    }

    /// Queue the periodic full player roster
    pub fn broadcast_player_roster(&mut self, world: &World) {
        if self.clients.is_empty() {
            return;
        }
        self.broadcast_queue.push(ServerMessage::PlayerRoster {
            players: world.player_roster(),
        });
    }

    /// Queue the periodic full NPC roster
    pub fn broadcast_npc_roster(&mut self, world: &World) {
        if self.clients.is_empty() {
            return;
        }
        self.broadcast_queue.push(ServerMessage::NpcRoster {
            npcs: world.npc_roster(),
        });
    }

    /// Flush the broadcast queue and every per-session queue
    pub async fn process_outgoing(&mut self) {
        let broadcasts = std::mem::take(&mut self.broadcast_queue);
        for msg in &broadcasts {
            let bytes = msg.serialize();
            for client in self.clients.values() {
                self.send_bytes(client.addr, &bytes).await;
            }
        }

        let addrs: Vec<SocketAddr> = self.clients.keys().copied().collect();
        for addr in addrs {
            let queued = match self.clients.get_mut(&addr) {
                Some(client) => std::mem::take(&mut client.outgoing_queue),
                None => continue,
            };
            for msg in queued {
                self.send_to(addr, &msg).await;
            }
        }
    }

    /// Persist every connected player (periodic save)
    pub fn save_all_players(&mut self, world: &World) {
        for client in self.clients.values() {
            let Some(player) = world.player(client.player_id) else {
                continue;
            };
            let record = player.to_record();
            match &self.persistence {
                Some(persistence) => persistence.save_account(&client.username, record),
                None => {
                    if let Some(account) = self.local_accounts.get_mut(&client.username) {
                        account.record = Some(record);
                    }
                }
            }
        }
    }

    async fn send_to(&self, addr: SocketAddr, msg: &ServerMessage) {
        self.send_bytes(addr, &msg.serialize()).await;
    }

    async fn send_bytes(&self, addr: SocketAddr, bytes: &[u8]) {
        if let Err(e) = self.socket.send_to(bytes, addr).await {
            error!("Failed to send to {}: {}", addr, e);
        }
    }
}
