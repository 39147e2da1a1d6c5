//! Server-side entity definitions.

pub mod player;
pub mod npc;

pub use player::{Player, PlayerRecord};
pub use npc::{Npc, NpcKind, NpcMode, HostileBrain, Shop};
