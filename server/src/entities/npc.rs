//! Server-side NPC entity.
//!
//! NPC behavior is a sum type: only hostile creatures carry combat state,
//! so a shopkeeper or banker in combat is unrepresentable.

use runeworld_shared::{NpcRole, NpcSnapshot, ShopListing};

/// Distance at which a hostile NPC picks a fight
pub const AGGRO_RANGE: f32 = 100.0;

/// Distance at which a hostile NPC can land hits
pub const COMBAT_RANGE: f32 = 40.0;

/// Hostile movement speed; one step per AI tick is `speed / 10`
pub const NPC_SPEED: f32 = 30.0;

/// Minimum time between NPC attacks
pub const ATTACK_COOLDOWN_MS: u64 = 2_000;

/// Time a defeated NPC stays down before resetting
pub const RESPAWN_DELAY_MS: u64 = 30_000;

/// A combat target farther than this is given up on
pub const LEASH_RANGE: f32 = 200.0;

/// Wander targets are re-picked at least this often
pub const WANDER_REPICK_MS: u64 = 5_000;

/// A wander target closer than this counts as reached
pub const WANDER_REACHED: f32 = 50.0;

/// Wander targets are drawn from a square of this half-extent
pub const WANDER_SPREAD: f32 = 200.0;

/// Behavioral mode of a hostile NPC
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NpcMode {
    Idle,
    Wandering { target: [f32; 2] },
    InCombat { target: u64 },
    Dead { respawn_at: u64 },
}

/// Combat/wander state carried only by hostile creatures
#[derive(Debug, Clone)]
pub struct HostileBrain {
    pub mode: NpcMode,
    /// Point the creature drifts around
    pub anchor: [f32; 2],
    /// 0 disables wandering entirely
    pub wander_range: f32,
    pub aggro_range: f32,
    pub combat_range: f32,
    pub speed: f32,
    /// Upper bound of the damage roll
    pub attack_damage: u32,
    /// Deadline bookkeeping against the tick clock
    pub last_attack_ms: u64,
    pub next_wander_ms: u64,
}

impl HostileBrain {
    pub fn new(anchor: [f32; 2], attack_damage: u32) -> Self {
        Self {
            mode: NpcMode::Idle,
            anchor,
            wander_range: WANDER_SPREAD,
            aggro_range: AGGRO_RANGE,
            combat_range: COMBAT_RANGE,
            speed: NPC_SPEED,
            attack_damage,
            last_attack_ms: 0,
            next_wander_ms: 0,
        }
    }
}

/// A shopkeeper's priced stock
#[derive(Debug, Clone)]
pub struct Shop {
    pub listings: Vec<ShopListing>,
}

/// NPC type tag with type-specific data
#[derive(Debug, Clone)]
pub enum NpcKind {
    Hostile(HostileBrain),
    Shopkeeper(Shop),
    Banker,
    QuestGiver,
}

/// Server-side NPC state
#[derive(Debug, Clone)]
pub struct Npc {
    pub id: u64,
    pub name: String,
    pub position: [f32; 2],
    hp: u32,
    max_hp: u32,
    pub level: u32,
    pub kind: NpcKind,
}

impl Npc {
    pub fn hostile(
        id: u64,
        name: &str,
        position: [f32; 2],
        hp: u32,
        level: u32,
        attack_damage: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            hp,
            max_hp: hp,
            level,
            kind: NpcKind::Hostile(HostileBrain::new(position, attack_damage)),
        }
    }

    pub fn shopkeeper(
        id: u64,
        name: &str,
        position: [f32; 2],
        hp: u32,
        level: u32,
        listings: Vec<ShopListing>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            hp,
            max_hp: hp,
            level,
            kind: NpcKind::Shopkeeper(Shop { listings }),
        }
    }

    pub fn banker(id: u64, name: &str, position: [f32; 2]) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            hp: 50,
            max_hp: 50,
            level: 25,
            kind: NpcKind::Banker,
        }
    }

    pub fn quest_giver(id: u64, name: &str, position: [f32; 2]) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            hp: 100,
            max_hp: 100,
            level: 1,
            kind: NpcKind::QuestGiver,
        }
    }

    pub fn role(&self) -> NpcRole {
        match self.kind {
            NpcKind::Hostile(_) => NpcRole::Hostile,
            NpcKind::Shopkeeper(_) => NpcRole::Shopkeeper,
            NpcKind::Banker => NpcRole::Banker,
            NpcKind::QuestGiver => NpcRole::QuestGiver,
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Dead hostiles are out of play until their respawn deadline
    pub fn is_alive(&self) -> bool {
        match &self.kind {
            NpcKind::Hostile(brain) => !matches!(brain.mode, NpcMode::Dead { .. }),
            _ => true,
        }
    }

    /// Only hostile creatures can be fought
    pub fn is_attackable(&self) -> bool {
        matches!(self.kind, NpcKind::Hostile(_)) && self.is_alive() && self.hp > 0
    }

    pub fn in_combat(&self) -> bool {
        match &self.kind {
            NpcKind::Hostile(brain) => matches!(brain.mode, NpcMode::InCombat { .. }),
            _ => false,
        }
    }

    /// Apply damage, clamping at zero. Returns the hp actually removed.
    pub fn apply_damage(&mut self, damage: u32) -> u32 {
        let dealt = damage.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// Put a defeated hostile into its dead mode with a respawn deadline.
    /// No-op for civilised NPC kinds, which cannot die.
    pub fn mark_dead(&mut self, respawn_at: u64) {
        if let NpcKind::Hostile(brain) = &mut self.kind {
            self.hp = 0;
            brain.mode = NpcMode::Dead { respawn_at };
        }
    }

    /// Reset a respawning hostile to full health at its anchor
    pub fn reset_alive(&mut self) {
        if let NpcKind::Hostile(brain) = &mut self.kind {
            self.hp = self.max_hp;
            self.position = brain.anchor;
            brain.mode = NpcMode::Idle;
        }
    }

    pub fn distance_to(&self, point: [f32; 2]) -> f32 {
        let dx = point[0] - self.position[0];
        let dy = point[1] - self.position[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// Step toward a point at `speed / 10` per tick
    pub fn step_towards(&mut self, target: [f32; 2], speed: f32) {
        let dx = target[0] - self.position[0];
        let dy = target[1] - self.position[1];
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > f32::EPSILON {
            let ratio = ((speed / 10.0) / dist).min(1.0);
            self.position[0] += dx * ratio;
            self.position[1] += dy * ratio;
        }
    }

    pub fn snapshot(&self) -> NpcSnapshot {
        NpcSnapshot {
            id: self.id,
            name: self.name.clone(),
            role: self.role(),
            x: self.position[0],
            y: self.position[1],
            hp: self.hp,
            max_hp: self.max_hp,
            level: self.level,
            in_combat: self.in_combat(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero() {
        let mut goblin = Npc::hostile(10_000, "goblin", [100.0, 100.0], 15, 2, 3);
        assert_eq!(goblin.apply_damage(20), 15);
        assert_eq!(goblin.hp(), 0);
    }

    #[test]
    fn dead_mode_excludes_from_targeting_until_reset() {
        let mut goblin = Npc::hostile(10_000, "goblin", [100.0, 100.0], 15, 2, 3);
        goblin.apply_damage(15);
        goblin.mark_dead(30_000);
        assert!(!goblin.is_alive());
        assert!(!goblin.is_attackable());

        goblin.reset_alive();
        assert!(goblin.is_alive());
        assert_eq!(goblin.hp(), goblin.max_hp());
        assert!(matches!(goblin.kind, NpcKind::Hostile(ref b) if b.mode == NpcMode::Idle));
    }

    #[test]
    fn civilised_npcs_cannot_die_or_fight() {
        let mut banker = Npc::banker(10_001, "Banker", [750.0, 750.0]);
        banker.mark_dead(30_000);
        assert!(banker.is_alive());
        assert!(!banker.is_attackable());
        assert!(!banker.in_combat());
    }

    #[test]
    fn step_towards_never_overshoots() {
        let mut goblin = Npc::hostile(10_000, "goblin", [0.0, 0.0], 15, 2, 3);
        goblin.step_towards([1.0, 0.0], NPC_SPEED);
        assert!((goblin.position[0] - 1.0).abs() < f32::EPSILON);
        goblin.step_towards([100.0, 0.0], NPC_SPEED);
        assert!((goblin.position[0] - 4.0).abs() < 0.001);
    }
}
