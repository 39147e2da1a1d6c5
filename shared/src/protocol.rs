//! Network protocol definitions shared between client and server.

use serde::{Deserialize, Serialize};

use crate::items::{Item, EquipSlot, ShopListing};
use crate::skills::Skill;

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Default server port
pub const DEFAULT_PORT: u16 = 7777;

/// World bounds; positions live on a continuous plane inside them
pub const WORLD_WIDTH: f32 = 2000.0;
pub const WORLD_HEIGHT: f32 = 2000.0;

/// Fast scheduler tick (player position broadcast, command drain)
pub const TICK_INTERVAL_MS: u64 = 100;

/// AI/combat stepping runs every Nth fast tick (200 ms)
pub const AI_TICK_EVERY: u64 = 2;

/// Full NPC roster broadcast runs every Nth fast tick (500 ms)
pub const NPC_ROSTER_EVERY: u64 = 5;

/// Safe home/respawn anchor
pub const HOME_POSITION: [f32; 2] = [1000.0, 1000.0];

// =============================================================================
// Wire enums
// =============================================================================

/// Broad NPC category, enough for a client to pick a sprite and menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcRole {
    Hostile,
    Shopkeeper,
    Banker,
    QuestGiver,
}

/// Source channel for server-generated messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageChannel {
    System,
    Combat,
    Magic,
    Shop,
    Bank,
}

impl MessageChannel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Combat => "Combat",
            Self::Magic => "Magic",
            Self::Shop => "Shop",
            Self::Bank => "Bank",
        }
    }
}

/// Gatherable resource nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherKind {
    Oak,
    Willow,
    Maple,
    Yew,
    Copper,
    Tin,
    Iron,
    Coal,
    Gold,
    Fishing,
    Herbs,
}

impl GatherKind {
    /// The skill this resource trains
    pub fn skill(&self) -> Skill {
        match self {
            Self::Oak | Self::Willow | Self::Maple | Self::Yew => Skill::Woodcutting,
            Self::Copper | Self::Tin | Self::Iron | Self::Coal | Self::Gold => Skill::Mining,
            Self::Fishing => Skill::Fishing,
            Self::Herbs => Skill::Farming,
        }
    }
}

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Register a new account
    Register { username: String, password: String },

    /// Login with existing account
    Login {
        protocol_version: u32,
        username: String,
        password: String,
    },

    /// Disconnect gracefully
    Disconnect,

    /// Request movement to a destination point
    MoveTo { x: f32, y: f32 },

    /// Chat message (lines starting with '/' are commands)
    Chat { text: String },

    /// Melee attack on an NPC
    AttackNpc { npc_id: u64 },

    /// Melee attack on another player (PvP-zone gated)
    AttackPlayer { player_id: u64 },

    /// Work a resource node
    GatherResource { resource: GatherKind, x: f32, y: f32 },

    /// Cast a spell by name; `target` is an NPC id, or None for self
    CastSpell { spell: String, target: Option<u64> },

    /// Request a shopkeeper's stock
    OpenShop { npc_id: u64 },

    /// Buy one unit of the listing at `index` from a shop
    BuyItem { shop_id: u64, index: u8 },

    /// Sell the inventory stack at `slot` to any shop
    SellItem { slot: u8 },

    /// Request bank contents (must be near a banker)
    OpenBank,

    /// Move the inventory stack at `slot` into the bank
    DepositItem { slot: u8 },

    /// Move the bank stack at `slot` into the inventory
    WithdrawItem { slot: u8 },

    /// Equip the equipment item at inventory `slot`
    EquipItem { slot: u8 },

    /// Unequip whatever occupies the named equipment slot
    UnequipItem { slot: EquipSlot },

    /// Consume/use the inventory stack at `slot`
    UseItem { slot: u8 },

    /// Bury the bones at inventory `slot` for prayer experience
    BuryBones { slot: u8 },

    /// Respawn after death
    Respawn,

    /// Teleport back to the home anchor
    TeleportHome,
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    RegisterSuccess,
    RegisterFailed { reason: String },

    /// Login accepted; the full authoritative player state follows
    LoginSuccess { profile: PlayerProfile },
    LoginFailed { reason: String },

    /// Another player entered the world
    PlayerJoined { id: u64, name: String, x: f32, y: f32 },

    /// A player left the world
    PlayerLeft { id: u64 },

    /// Accepted movement for one player (possibly clamped or redirected)
    PlayerMoved { id: u64, x: f32, y: f32 },

    /// Periodic full player roster
    PlayerRoster { players: Vec<PlayerSnapshot> },

    /// Periodic full NPC roster
    NpcRoster { npcs: Vec<NpcSnapshot> },

    /// Delta for a single NPC (damage, movement, combat flag)
    NpcUpdate {
        id: u64,
        x: f32,
        y: f32,
        hp: u32,
        max_hp: u32,
        in_combat: bool,
    },

    /// An NPC landed a hit on a player
    NpcAttack { npc_id: u64, target_id: u64, damage: u32 },

    /// A player landed a hit on another player
    PlayerAttacked { attacker_id: u64, target_id: u64, damage: u32 },

    /// Damage notification for the receiving session's own player
    TakeDamage {
        attacker: String,
        damage: u32,
        hp: u32,
        max_hp: u32,
    },

    /// A skill gained a level
    LevelUp { skill: Skill, level: u32 },

    /// Skill level/experience refresh
    SkillUpdate { skill: Skill, level: u32, experience: f64 },

    /// Vitals refresh for the receiving session's own player
    StatsUpdate {
        hp: u32,
        max_hp: u32,
        mana: u32,
        max_mana: u32,
        prayer: u32,
        max_prayer: u32,
    },

    /// The receiving session's player was killed
    PlayerDied { killer: String },

    /// The receiving session's player was relocated and restored
    Respawned { x: f32, y: f32, hp: u32, max_hp: u32 },

    /// Full inventory replacement
    InventoryUpdate { slots: Vec<Option<Item>> },

    /// Full equipment replacement, indexed by [`EquipSlot::ALL`]
    EquipmentUpdate { equipment: Vec<Option<Item>> },

    /// A shopkeeper's stock, in response to OpenShop
    ShopOpened {
        shop_id: u64,
        name: String,
        listings: Vec<ShopListing>,
    },

    /// Stock changed after a purchase
    ShopUpdated { shop_id: u64, listings: Vec<ShopListing> },

    /// Bank contents, in response to OpenBank
    BankOpened {
        bank: Vec<Option<Item>>,
        inventory: Vec<Option<Item>>,
    },

    /// Bank/inventory state after a deposit or withdrawal
    BankUpdated {
        bank: Vec<Option<Item>>,
        inventory: Vec<Option<Item>>,
    },

    /// A spell resolved
    SpellCast {
        spell: String,
        target_id: Option<u64>,
        damage: Option<u32>,
        heal: Option<u32>,
    },

    /// A resource node was worked (for client-side animation)
    ResourceDamaged {
        resource: GatherKind,
        x: f32,
        y: f32,
        damage: u32,
    },

    /// Player chat line
    ChatBroadcast {
        sender_id: u64,
        sender_name: String,
        text: String,
    },

    /// Server-generated message on a named channel
    SystemMessage { channel: MessageChannel, text: String },
}

// =============================================================================
// State Types
// =============================================================================

/// Roster entry for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
}

/// Roster entry for one NPC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSnapshot {
    pub id: u64,
    pub name: String,
    pub role: NpcRole,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub level: u32,
    pub in_combat: bool,
}

/// Per-skill state sent at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillState {
    pub skill: Skill,
    pub level: u32,
    pub experience: f64,
}

/// The full authoritative view of the session's own player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub prayer: u32,
    pub max_prayer: u32,
    pub skills: Vec<SkillState>,
    pub inventory: Vec<Option<Item>>,
    pub equipment: Vec<Option<Item>>,
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl ClientMessage {
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize ClientMessage")
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerMessage {
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize ServerMessage")
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
