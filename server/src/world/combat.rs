//! Combat resolution and hostile NPC AI.
//!
//! NPCs step through their behavioral state machine on the AI tick; all
//! cooldowns and respawns are deadlines compared against the one clock
//! value passed in, so a tick is deterministic given its inputs.
//! Player-initiated attacks resolve synchronously when the command
//! arrives, not on the tick.

use log::info;
use rand::Rng;

use runeworld_shared::{Item, ServerMessage, Skill, MessageChannel};

use crate::entities::npc::{
    Npc, NpcKind, NpcMode, HostileBrain,
    ATTACK_COOLDOWN_MS, RESPAWN_DELAY_MS, LEASH_RANGE,
    WANDER_REPICK_MS, WANDER_REACHED, WANDER_SPREAD,
};
use super::{World, Outbound, system};
use super::zones::zone_at;

/// Wander targets stay inside this margin of the world edge
const WANDER_MIN: f32 = 50.0;
const WANDER_MAX: f32 = 1950.0;

fn brain_mut(npc: &mut Npc) -> Option<&mut HostileBrain> {
    match &mut npc.kind {
        NpcKind::Hostile(brain) => Some(brain),
        _ => None,
    }
}

/// What one NPC decided to do this tick
enum Decision {
    Nothing,
    Respawn,
    StandDown,
    Aggro(u64),
    Chase([f32; 2]),
    /// `base` is the raw damage roll; defense applies when it lands
    Attack { target: u64, base: u32 },
    Wander { target: [f32; 2], repicked: bool },
}

/// One AI step over every NPC. Shopkeepers, bankers and quest givers have
/// no brain to step; only hostiles move, aggro, fight, die and respawn.
///
/// Decisions are computed against an immutable view first, then applied,
/// so every NPC in the pass sees the same world state.
pub fn step_ai(world: &mut World, now_ms: u64) -> Vec<Outbound> {
    let mut out = Vec::new();
    let mut rng = rand::thread_rng();

    // Positions of everyone still standing, read once for the whole pass
    let living: Vec<(u64, [f32; 2])> = world
        .players
        .values()
        .filter(|p| !p.is_dead())
        .map(|p| (p.id, p.position))
        .collect();

    let mut decisions: Vec<(u64, Decision)> = Vec::new();
    for npc in world.npcs.values() {
        let brain = match &npc.kind {
            NpcKind::Hostile(brain) => brain,
            _ => continue,
        };

        let decision = match brain.mode {
            NpcMode::Dead { respawn_at } => {
                if now_ms >= respawn_at {
                    Decision::Respawn
                } else {
                    Decision::Nothing
                }
            }
            NpcMode::InCombat { target } => {
                match living.iter().find(|(pid, _)| *pid == target).map(|(_, p)| *p) {
                    // Target died, left, or got away
                    None => Decision::StandDown,
                    Some(pos) => {
                        let dist = npc.distance_to(pos);
                        if dist > LEASH_RANGE {
                            Decision::StandDown
                        } else if dist > brain.combat_range {
                            Decision::Chase(pos)
                        } else if now_ms.saturating_sub(brain.last_attack_ms) > ATTACK_COOLDOWN_MS {
                            let base = rng.gen_range(1..=brain.attack_damage.max(1));
                            Decision::Attack { target, base }
                        } else {
                            Decision::Nothing
                        }
                    }
                }
            }
            NpcMode::Idle | NpcMode::Wandering { .. } => {
                let nearest = living
                    .iter()
                    .map(|&(pid, pos)| (pid, npc.distance_to(pos)))
                    .fold(None, |best: Option<(u64, f32)>, cand| match best {
                        Some(b) if b.1 <= cand.1 => Some(b),
                        _ => Some(cand),
                    });
                match nearest {
                    Some((pid, dist)) if dist <= brain.aggro_range => Decision::Aggro(pid),
                    _ if brain.wander_range == 0.0 => Decision::Nothing,
                    _ => {
                        // Drift toward the wander target, re-picking it
                        // when reached or stale
                        match brain.mode {
                            NpcMode::Wandering { target }
                                if npc.distance_to(target) >= WANDER_REACHED
                                    && now_ms < brain.next_wander_ms =>
                            {
                                Decision::Wander { target, repicked: false }
                            }
                            _ => {
                                let target = pick_wander_target(world, npc.position, &mut rng);
                                Decision::Wander { target, repicked: true }
                            }
                        }
                    }
                }
            }
        };
        decisions.push((npc.id, decision));
    }

    // Apply movement and mode changes; queue attacks for the damage pass
    let mut attacks: Vec<(u64, String, u64, u32)> = Vec::new();
    for (id, decision) in decisions {
        let Some(npc) = world.npcs.get_mut(&id) else { continue };
        match decision {
            Decision::Nothing => {}
            Decision::Respawn => {
                npc.reset_alive();
                info!("{} {} respawned", npc.name, npc.id);
                out.push(Outbound::Broadcast(npc_update(npc)));
            }
            Decision::StandDown => {
                if let Some(brain) = brain_mut(npc) {
                    brain.mode = NpcMode::Idle;
                }
            }
            Decision::Aggro(pid) => {
                info!("{} {} is now attacking player {}", npc.name, npc.id, pid);
                if let Some(brain) = brain_mut(npc) {
                    brain.mode = NpcMode::InCombat { target: pid };
                }
            }
            Decision::Chase(pos) => {
                let speed = brain_mut(npc).map(|b| b.speed).unwrap_or_default();
                npc.step_towards(pos, speed);
            }
            Decision::Attack { target, base } => {
                if let Some(brain) = brain_mut(npc) {
                    brain.last_attack_ms = now_ms;
                }
                attacks.push((id, npc.name.clone(), target, base));
            }
            Decision::Wander { target, repicked } => {
                let speed = if let Some(brain) = brain_mut(npc) {
                    brain.mode = NpcMode::Wandering { target };
                    if repicked {
                        brain.next_wander_ms = now_ms + WANDER_REPICK_MS;
                    }
                    brain.speed
                } else {
                    0.0
                };
                npc.step_towards(target, speed);
            }
        }
    }

    // Land the queued attacks on the players
    for (npc_id, npc_name, target_id, base) in attacks {
        let Some(player) = world.players.get_mut(&target_id) else { continue };
        if player.is_dead() {
            continue;
        }
        // Worn defense shaves off up to 80% of the roll
        let defense = player.equipment_defense_bonus();
        let reduction = (defense as f32 * 0.05).min(0.8);
        let damage = ((base as f32 * (1.0 - reduction)).floor() as u32).max(1);
        player.apply_damage(damage);
        let hp = player.hp();
        let max_hp = player.max_hp();

        out.push(Outbound::Broadcast(ServerMessage::NpcAttack {
            npc_id,
            target_id,
            damage,
        }));
        out.push(Outbound::To(
            target_id,
            ServerMessage::TakeDamage {
                attacker: npc_name.clone(),
                damage,
                hp,
                max_hp,
            },
        ));

        if hp == 0 {
            out.push(Outbound::To(
                target_id,
                ServerMessage::PlayerDied { killer: npc_name },
            ));
            // The fight is over; the NPC stands down
            if let Some(npc) = world.npcs.get_mut(&npc_id) {
                if let Some(brain) = brain_mut(npc) {
                    brain.mode = NpcMode::Idle;
                }
            }
        }
    }

    out
}

/// A nearby non-water point for a wanderer to drift toward. Falls back
/// to standing still when no valid ground turns up.
fn pick_wander_target(world: &World, from: [f32; 2], rng: &mut impl Rng) -> [f32; 2] {
    for _ in 0..10 {
        let x = (from[0] + rng.gen_range(-WANDER_SPREAD..WANDER_SPREAD)).clamp(WANDER_MIN, WANDER_MAX);
        let y = (from[1] + rng.gen_range(-WANDER_SPREAD..WANDER_SPREAD)).clamp(WANDER_MIN, WANDER_MAX);
        if world.terrain.is_walkable(x, y) {
            return [x, y];
        }
    }
    from
}

fn npc_update(npc: &Npc) -> ServerMessage {
    ServerMessage::NpcUpdate {
        id: npc.id,
        x: npc.position[0],
        y: npc.position[1],
        hp: npc.hp(),
        max_hp: npc.max_hp(),
        in_combat: npc.in_combat(),
    }
}

/// A player's melee attack on an NPC. Resolves immediately; the damage
/// roll scales with the equipped weapon and strength level.
pub fn attack_npc(world: &mut World, player_id: u64, npc_id: u64, now_ms: u64) -> Vec<Outbound> {
    let (weapon_bonus, strength_level) = match world.players.get(&player_id) {
        Some(p) if !p.is_dead() => (p.attack_bonus(), p.skills().level(Skill::Strength)),
        _ => return Vec::new(),
    };
    let Some(npc) = world.npcs.get_mut(&npc_id) else {
        return Vec::new();
    };
    if !npc.is_attackable() {
        if !matches!(npc.kind, NpcKind::Hostile(_)) {
            return vec![Outbound::To(
                player_id,
                system(MessageChannel::Combat, "You can't attack that."),
            )];
        }
        return Vec::new();
    }

    let mut rng = rand::thread_rng();
    // Each 4 strength levels add a point to the base roll
    let strength_bonus = strength_level / 4;
    let base = 1 + weapon_bonus + strength_bonus;
    let damage = rng.gen_range(0..base) + base;
    npc.apply_damage(damage);
    let npc_name = npc.name.clone();
    let npc_dead = npc.hp() == 0;

    // Fight back
    if let Some(brain) = brain_mut(npc) {
        brain.mode = NpcMode::InCombat { target: player_id };
    }
    if npc_dead {
        npc.mark_dead(now_ms + RESPAWN_DELAY_MS);
    }

    let mut out = Vec::new();
    let strength_text = if strength_bonus > 0 {
        format!(" (+{} str)", strength_bonus)
    } else {
        String::new()
    };
    out.push(Outbound::To(
        player_id,
        system(
            MessageChannel::Combat,
            format!("You deal {} damage to the {}!{}", damage, npc_name, strength_text),
        ),
    ));

    if let Some(player) = world.players.get_mut(&player_id) {
        player.target = if npc_dead { None } else { Some(npc_id) };
    }

    // Combat xp: attack and strength in full, hitpoints a third
    let combat_xp = (damage * 4) as f64;
    out.extend(grant_experience(world, player_id, &[
        (Skill::Attack, combat_xp),
        (Skill::Strength, combat_xp),
        (Skill::Hitpoints, combat_xp / 3.0),
    ]));

    if npc_dead {
        out.push(Outbound::To(
            player_id,
            system(MessageChannel::Combat, format!("You defeated the {}!", npc_name)),
        ));
        out.extend(roll_npc_loot(world, player_id));
    }

    if let Some(npc) = world.npcs.get(&npc_id) {
        out.push(Outbound::Broadcast(npc_update(npc)));
    }
    out
}

/// Grant experience batches and emit the matching notifications
pub(crate) fn grant_experience(
    world: &mut World,
    player_id: u64,
    grants: &[(Skill, f64)],
) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for &(skill, amount) in grants {
        for (skill, level) in player.add_experience(skill, amount) {
            out.push(Outbound::To(player_id, ServerMessage::LevelUp { skill, level }));
        }
        out.push(Outbound::To(
            player_id,
            ServerMessage::SkillUpdate {
                skill,
                level: player.skills().level(skill),
                experience: player.skills().experience(skill),
            },
        ));
    }
    out.push(Outbound::To(
        player_id,
        ServerMessage::StatsUpdate {
            hp: player.hp(),
            max_hp: player.max_hp(),
            mana: player.mana(),
            max_mana: player.max_mana(),
            prayer: player.prayer_points(),
            max_prayer: player.max_prayer(),
        },
    ));
    out
}

/// Loot for a defeated NPC: bones always, plus an occasional extra
fn roll_npc_loot(world: &mut World, player_id: u64) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    let mut rng = rand::thread_rng();
    let mut out = Vec::new();

    if player.add_item(Item::material("bones", 1)) {
        out.push(Outbound::To(
            player_id,
            system(MessageChannel::System, "You received: bones!"),
        ));
    }

    if rng.gen_bool(0.4) {
        let drop = match rng.gen_range(0..6) {
            0 => Item::Currency { quantity: rng.gen_range(1..=15) },
            1 => Item::equipment("bronze sword", runeworld_shared::EquipSlot::Weapon, 2, 0),
            2 => Item::equipment("iron axe", runeworld_shared::EquipSlot::Weapon, 3, 0),
            3 => Item::equipment("leather armor", runeworld_shared::EquipSlot::Armor, 0, 3),
            4 => Item::consumable("bread", 5),
            _ => Item::consumable("health potion", 15),
        };
        let name = drop.name().to_string();
        let added = match drop {
            Item::Currency { quantity } => player.add_coins(quantity),
            other => player.add_item(other),
        };
        if added {
            out.push(Outbound::To(
                player_id,
                system(MessageChannel::System, format!("You received: {}!", name)),
            ));
        }
    }

    out.push(Outbound::To(
        player_id,
        ServerMessage::InventoryUpdate {
            slots: player.inventory().to_vec(),
        },
    ));
    out
}

/// A player's attack on another player. Both must stand in the same PvP
/// zone and be within its combat-level tolerance, else the attack is
/// rejected without touching any state.
pub fn attack_player(world: &mut World, attacker_id: u64, target_id: u64) -> Vec<Outbound> {
    let (attacker_name, attacker_pos, attack_bonus, strength_level, attacker_combat) =
        match world.players.get(&attacker_id) {
            Some(p) if !p.is_dead() => (
                p.name.clone(),
                p.position,
                p.attack_bonus(),
                p.skills().level(Skill::Strength),
                p.skills().combat_level(),
            ),
            _ => return Vec::new(),
        };
    let (target_pos, target_combat) = match world.players.get(&target_id) {
        Some(p) if !p.is_dead() => (p.position, p.skills().combat_level()),
        _ => return Vec::new(),
    };

    // Both combatants must share a zone that tolerates their level gap
    let attacker_zone = zone_at(attacker_pos[0], attacker_pos[1]);
    let target_zone = zone_at(target_pos[0], target_pos[1]);
    let permitted = match (attacker_zone, target_zone) {
        (Some(a), Some(t)) => a.name == t.name && a.allows(attacker_combat, target_combat),
        _ => false,
    };
    if !permitted {
        return vec![Outbound::To(
            attacker_id,
            system(MessageChannel::System, "You cannot attack that player here!"),
        )];
    }

    if let Some(attacker) = world.players.get_mut(&attacker_id) {
        attacker.target = Some(target_id);
    }
    let Some(target) = world.players.get_mut(&target_id) else {
        return Vec::new();
    };
    let base = (attack_bonus + strength_level / 2).max(1) as i64;
    let defense = (target.armor_defense_bonus() + target.skills().level(Skill::Defense) / 3) as i64;
    let mut rng = rand::thread_rng();
    let damage = (base - defense + rng.gen_range(0..3)).max(1) as u32;
    target.apply_damage(damage);
    let target_name = target.name.clone();
    let target_hp = target.hp();
    let target_max_hp = target.max_hp();
    let target_dead = target.is_dead();

    let mut out = vec![
        Outbound::Broadcast(ServerMessage::PlayerAttacked {
            attacker_id,
            target_id,
            damage,
        }),
        Outbound::To(
            target_id,
            ServerMessage::TakeDamage {
                attacker: attacker_name.clone(),
                damage,
                hp: target_hp,
                max_hp: target_max_hp,
            },
        ),
    ];

    if target_dead {
        out.extend(handle_player_death(world, target_id, attacker_id));
        out.push(Outbound::Broadcast(system(
            MessageChannel::System,
            format!("{} has defeated {} in combat!", attacker_name, target_name),
        )));
    }

    out
}

/// Death at another player's hands: the victim is restored and moved to
/// safety, and part of their inventory changes hands.
fn handle_player_death(world: &mut World, victim_id: u64, killer_id: u64) -> Vec<Outbound> {
    let spawn = world.find_safe_spawn();
    let killer_name = world
        .players
        .get(&killer_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let mut rng = rand::thread_rng();
    let mut dropped: Vec<Item> = Vec::new();

    let Some(victim) = world.players.get_mut(&victim_id) else {
        return Vec::new();
    };
    victim.restore_full();
    victim.position = spawn;
    victim.target = None;
    // Each stack has a 30% chance of changing hands
    for slot in 0..victim.inventory().len() {
        if victim.item_at(slot).is_some() && rng.gen_bool(0.3) {
            if let Some(item) = victim.take_item(slot) {
                dropped.push(item);
            }
        }
    }
    let victim_name = victim.name.clone();
    let victim_hp = victim.hp();
    let victim_max_hp = victim.max_hp();
    let victim_inventory = victim.inventory().to_vec();

    let mut out = vec![
        Outbound::To(victim_id, ServerMessage::PlayerDied { killer: killer_name }),
        Outbound::To(
            victim_id,
            ServerMessage::Respawned {
                x: spawn[0],
                y: spawn[1],
                hp: victim_hp,
                max_hp: victim_max_hp,
            },
        ),
        Outbound::To(victim_id, ServerMessage::InventoryUpdate { slots: victim_inventory }),
        Outbound::Broadcast(ServerMessage::PlayerMoved {
            id: victim_id,
            x: spawn[0],
            y: spawn[1],
        }),
    ];

    if let Some(killer) = world.players.get_mut(&killer_id) {
        for item in dropped {
            // A full inventory forfeits the spoils
            match item {
                Item::Currency { quantity } => {
                    killer.add_coins(quantity);
                }
                other => {
                    killer.add_item(other);
                }
            }
        }
        out.push(Outbound::To(
            killer_id,
            system(MessageChannel::System, format!("You have defeated {}!", victim_name)),
        ));
        out.push(Outbound::To(
            killer_id,
            ServerMessage::InventoryUpdate {
                slots: killer.inventory().to_vec(),
            },
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Player;
    use crate::world::terrain::TerrainMap;

    fn empty_world() -> World {
        let mut world = World::new(TerrainMap::procedural());
        // Clear the random bootstrap population for deterministic tests
        world.npcs.clear();
        world
    }

    fn add_player_at(world: &mut World, id: u64, pos: [f32; 2]) {
        world.add_player(Player::new(id, format!("player{}", id), pos));
    }

    #[test]
    fn npc_in_aggro_range_enters_combat_with_nearest_player() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1080.0, 1000.0]); // distance 80 < 100
        add_player_at(&mut world, 2, [1095.0, 1000.0]); // distance 95

        world.update(0);

        match &world.npc(npc_id).unwrap().kind {
            NpcKind::Hostile(brain) => {
                assert_eq!(brain.mode, NpcMode::InCombat { target: 1 });
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn npc_outside_aggro_range_stays_peaceful() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1200.0, 1000.0]); // distance 200 > 100

        world.update(0);

        assert!(!world.npc(npc_id).unwrap().in_combat());
    }

    #[test]
    fn npc_attacks_respect_cooldown() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1010.0, 1000.0]); // inside combat range

        world.update(0); // aggro
        let hp_before = world.player(1).unwrap().hp();

        // First swing allowed once the cooldown window has passed
        let out = world.update(2001);
        assert!(out.iter().any(|o| matches!(o, Outbound::Broadcast(ServerMessage::NpcAttack { .. }))));
        assert!(world.player(1).unwrap().hp() < hp_before);

        // Immediately after, the cooldown blocks the next swing
        let hp_after = world.player(1).unwrap().hp();
        let out = world.update(2200);
        assert!(!out.iter().any(|o| matches!(o, Outbound::Broadcast(ServerMessage::NpcAttack { .. }))));
        assert_eq!(world.player(1).unwrap().hp(), hp_after);

        let _ = npc_id;
    }

    #[test]
    fn npc_gives_up_on_distant_target() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1080.0, 1000.0]);

        world.update(0);
        assert!(world.npc(npc_id).unwrap().in_combat());

        // Target teleports out of leash range
        world.player_mut(1).unwrap().position = [1000.0, 1300.0];
        world.update(200);
        assert!(!world.npc(npc_id).unwrap().in_combat());
    }

    #[test]
    fn dead_npc_respawns_after_deadline() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1010.0, 1000.0]);

        // Beat it down
        while world.npc(npc_id).unwrap().is_alive() {
            attack_npc(&mut world, 1, npc_id, 1000);
        }

        // Not yet due
        world.update(1000 + RESPAWN_DELAY_MS - 1);
        assert!(!world.npc(npc_id).unwrap().is_alive());

        // Past the deadline it stands back up at full health
        world.update(1000 + RESPAWN_DELAY_MS);
        let npc = world.npc(npc_id).unwrap();
        assert!(npc.is_alive());
        assert_eq!(npc.hp(), npc.max_hp());
    }

    #[test]
    fn player_attack_damages_and_draws_aggro() {
        let mut world = empty_world();
        let npc_id = world.spawn_hostile("goblin", [1000.0, 1000.0], 15, 2, 3);
        add_player_at(&mut world, 1, [1010.0, 1000.0]);

        let hp_before = world.npc(npc_id).unwrap().hp();
        let out = attack_npc(&mut world, 1, npc_id, 0);

        let npc = world.npc(npc_id).unwrap();
        assert!(npc.hp() < hp_before);
        assert!(npc.in_combat() || !npc.is_alive());
        // Attack and strength xp always land
        assert!(world.player(1).unwrap().skills().experience(Skill::Attack) > 0.0);
        assert!(out
            .iter()
            .any(|o| matches!(o, Outbound::Broadcast(ServerMessage::NpcUpdate { .. }))));
    }

    #[test]
    fn shopkeeper_cannot_be_attacked() {
        let mut world = World::new(TerrainMap::procedural());
        add_player_at(&mut world, 1, [500.0, 500.0]);
        let shop_id = world
            .npcs()
            .find(|n| matches!(n.kind, NpcKind::Shopkeeper(_)))
            .unwrap()
            .id;

        let hp_before = world.npc(shop_id).unwrap().hp();
        attack_npc(&mut world, 1, shop_id, 0);
        assert_eq!(world.npc(shop_id).unwrap().hp(), hp_before);
    }

    #[test]
    fn pvp_rejected_outside_zone() {
        let mut world = empty_world();
        add_player_at(&mut world, 1, [1000.0, 1000.0]);
        add_player_at(&mut world, 2, [1000.0, 1000.0]);

        let hp_before = world.player(2).unwrap().hp();
        let out = attack_player(&mut world, 1, 2);
        assert_eq!(world.player(2).unwrap().hp(), hp_before);
        assert!(matches!(
            out.as_slice(),
            [Outbound::To(1, ServerMessage::SystemMessage { .. })]
        ));
    }

    #[test]
    fn pvp_rejected_when_only_one_is_inside() {
        let mut world = empty_world();
        add_player_at(&mut world, 1, [1000.0, 250.0]); // Wilderness
        add_player_at(&mut world, 2, [1000.0, 1000.0]); // outside

        let hp_before = world.player(2).unwrap().hp();
        attack_player(&mut world, 1, 2);
        assert_eq!(world.player(2).unwrap().hp(), hp_before);
    }

    #[test]
    fn pvp_rejected_when_levels_diverge() {
        let mut world = empty_world();
        add_player_at(&mut world, 1, [1000.0, 250.0]);
        add_player_at(&mut world, 2, [1010.0, 250.0]);
        // Pump player 1's combat level far past the Wilderness tolerance
        world.player_mut(1).unwrap().add_experience(Skill::Attack, 100_000.0);
        let a = world.player(1).unwrap().skills().combat_level();
        let b = world.player(2).unwrap().skills().combat_level();
        assert!(a.abs_diff(b) > 10);

        let hp_before = world.player(2).unwrap().hp();
        attack_player(&mut world, 1, 2);
        assert_eq!(world.player(2).unwrap().hp(), hp_before);
    }

    #[test]
    fn pvp_permitted_in_shared_zone() {
        let mut world = empty_world();
        add_player_at(&mut world, 1, [1000.0, 250.0]);
        add_player_at(&mut world, 2, [1010.0, 250.0]);

        let hp_before = world.player(2).unwrap().hp();
        let out = attack_player(&mut world, 1, 2);
        assert!(world.player(2).unwrap().hp() < hp_before);
        assert!(out
            .iter()
            .any(|o| matches!(o, Outbound::Broadcast(ServerMessage::PlayerAttacked { .. }))));
    }

    #[test]
    fn lethal_pvp_damage_triggers_death_handler() {
        let mut world = empty_world();
        add_player_at(&mut world, 1, [1000.0, 250.0]);
        add_player_at(&mut world, 2, [1010.0, 250.0]);

        // Keep beating until the victim dies; each death resets them
        let mut died = false;
        for _ in 0..100 {
            let out = attack_player(&mut world, 1, 2);
            if out
                .iter()
                .any(|o| matches!(o, Outbound::To(2, ServerMessage::PlayerDied { .. })))
            {
                died = true;
                break;
            }
        }
        assert!(died);
        let victim = world.player(2).unwrap();
        assert_eq!(victim.hp(), victim.max_hp());
        // Relocated out of the Wilderness to the safe spawn area
        assert!(victim.position[0] >= 900.0 && victim.position[0] <= 1100.0);
        assert!(victim.position[1] >= 900.0 && victim.position[1] <= 1100.0);
    }
}
