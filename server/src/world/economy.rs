//! Shops, banking, item use and spellcasting.
//!
//! Every operation here is transactional within one synchronous step: it
//! either fully applies or answers the session with a rejection message
//! and mutates nothing.

use rand::Rng;

use runeworld_shared::{
    Item, EquipSlot, RuneKind, ShopListing, ServerMessage, Skill,
    MessageChannel, GatherKind, SpellEffect, find_spell,
};

use crate::entities::NpcKind;
use crate::entities::npc::RESPAWN_DELAY_MS;
use super::{World, Outbound, system};
use super::combat;

/// Prayer experience for burying one set of bones
const BONES_PRAYER_XP: f64 = 5.0;

// =============================================================================
// Shop stock
// =============================================================================

pub fn general_store_stock() -> Vec<ShopListing> {
    vec![
        ShopListing { item: Item::consumable("bread", 5), price: 3, stock: 50 },
        ShopListing { item: Item::consumable("health potion", 15), price: 10, stock: 20 },
        ShopListing { item: Item::equipment("bronze dagger", EquipSlot::Weapon, 1, 0), price: 25, stock: 5 },
        ShopListing { item: Item::equipment("iron axe", EquipSlot::Weapon, 3, 0), price: 50, stock: 3 },
        ShopListing { item: Item::equipment("iron pickaxe", EquipSlot::Weapon, 2, 0), price: 40, stock: 3 },
    ]
}

pub fn armor_shop_stock() -> Vec<ShopListing> {
    vec![
        ShopListing { item: Item::equipment("leather armor", EquipSlot::Armor, 0, 3), price: 35, stock: 8 },
        ShopListing { item: Item::equipment("leather cap", EquipSlot::Helmet, 0, 1), price: 15, stock: 10 },
        ShopListing { item: Item::equipment("leather boots", EquipSlot::Boots, 0, 1), price: 20, stock: 10 },
        ShopListing { item: Item::equipment("leather gloves", EquipSlot::Gloves, 0, 1), price: 15, stock: 10 },
        ShopListing { item: Item::equipment("iron helmet", EquipSlot::Helmet, 0, 2), price: 40, stock: 5 },
        ShopListing { item: Item::equipment("chainmail", EquipSlot::Armor, 0, 5), price: 80, stock: 3 },
    ]
}

pub fn magic_shop_stock() -> Vec<ShopListing> {
    vec![
        ShopListing { item: Item::Rune { kind: RuneKind::Air, quantity: 1 }, price: 2, stock: 1000 },
        ShopListing { item: Item::Rune { kind: RuneKind::Water, quantity: 1 }, price: 3, stock: 500 },
        ShopListing { item: Item::Rune { kind: RuneKind::Earth, quantity: 1 }, price: 3, stock: 500 },
        ShopListing { item: Item::Rune { kind: RuneKind::Fire, quantity: 1 }, price: 4, stock: 500 },
        ShopListing { item: Item::Rune { kind: RuneKind::Mind, quantity: 1 }, price: 5, stock: 200 },
        ShopListing { item: Item::Rune { kind: RuneKind::Body, quantity: 1 }, price: 8, stock: 100 },
        ShopListing {
            item: Item::Equipment {
                name: "wizard hat".into(),
                slot: EquipSlot::Helmet,
                attack_bonus: 0,
                defense_bonus: 0,
                magic_bonus: 2,
            },
            price: 50,
            stock: 3,
        },
        ShopListing {
            item: Item::Equipment {
                name: "wizard robe".into(),
                slot: EquipSlot::Armor,
                attack_bonus: 0,
                defense_bonus: 1,
                magic_bonus: 3,
            },
            price: 80,
            stock: 2,
        },
    ]
}

// =============================================================================
// Shops
// =============================================================================

fn shop_listings(world: &World, shop_id: u64) -> Option<(String, Vec<ShopListing>)> {
    match world.npcs.get(&shop_id).map(|n| (&n.name, &n.kind)) {
        Some((name, NpcKind::Shopkeeper(shop))) => Some((name.clone(), shop.listings.clone())),
        _ => None,
    }
}

pub fn open_shop(world: &World, player_id: u64, shop_id: u64) -> Vec<Outbound> {
    match shop_listings(world, shop_id) {
        Some((name, listings)) => vec![Outbound::To(
            player_id,
            ServerMessage::ShopOpened { shop_id, name, listings },
        )],
        None => Vec::new(),
    }
}

/// Buy one unit of a listing: check stock and funds, then commit. If the
/// item can't be added the coins come straight back and stock is
/// untouched, so no state is lost half-way.
pub fn buy_item(world: &mut World, player_id: u64, shop_id: u64, index: usize) -> Vec<Outbound> {
    let listing = match world.npcs.get(&shop_id).map(|n| &n.kind) {
        Some(NpcKind::Shopkeeper(shop)) => match shop.listings.get(index) {
            Some(listing) => listing.clone(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };

    if listing.stock == 0 {
        return vec![Outbound::To(
            player_id,
            system(MessageChannel::Shop, "That item is out of stock."),
        )];
    }
    let coins = player.coins();
    if coins < listing.price {
        return vec![Outbound::To(
            player_id,
            system(
                MessageChannel::Shop,
                format!("You need {} coins but only have {}.", listing.price, coins),
            ),
        )];
    }

    // Commit: deduct, then add; refund on a full inventory
    player.remove_coins(listing.price);
    if !player.add_item(listing.item.clone()) {
        player.add_coins(listing.price);
        return vec![Outbound::To(
            player_id,
            system(MessageChannel::Shop, "Your inventory is full!"),
        )];
    }
    let inventory = player.inventory().to_vec();

    // The purchase went through; only now does stock move
    if let Some(npc) = world.npcs.get_mut(&shop_id) {
        if let NpcKind::Shopkeeper(shop) = &mut npc.kind {
            if let Some(listing) = shop.listings.get_mut(index) {
                listing.stock -= 1;
            }
        }
    }
    let listings = match shop_listings(world, shop_id) {
        Some((_, listings)) => listings,
        None => Vec::new(),
    };

    vec![
        Outbound::To(
            player_id,
            system(
                MessageChannel::Shop,
                format!("You bought {} for {} coins.", listing.item.name(), listing.price),
            ),
        ),
        Outbound::To(player_id, ServerMessage::InventoryUpdate { slots: inventory }),
        Outbound::To(player_id, ServerMessage::ShopUpdated { shop_id, listings }),
    ]
}

/// Sell an inventory stack at its category price. Coins can't be sold.
pub fn sell_item(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    let price = match player.item_at(slot) {
        Some(Item::Currency { .. }) => {
            return vec![Outbound::To(
                player_id,
                system(MessageChannel::Shop, "You can't sell that."),
            )];
        }
        Some(item) => item.sell_price(),
        None => return Vec::new(),
    };
    let Some(item) = player.take_item(slot) else {
        return Vec::new();
    };
    player.add_coins(price);
    vec![
        Outbound::To(
            player_id,
            system(
                MessageChannel::Shop,
                format!("You sold {} for {} coins.", item.name(), price),
            ),
        ),
        Outbound::To(
            player_id,
            ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
        ),
    ]
}

// =============================================================================
// Bank
// =============================================================================

pub fn open_bank(world: &World, player_id: u64) -> Vec<Outbound> {
    match world.players.get(&player_id) {
        Some(player) => vec![Outbound::To(
            player_id,
            ServerMessage::BankOpened {
                bank: player.bank().to_vec(),
                inventory: player.inventory().to_vec(),
            },
        )],
        None => Vec::new(),
    }
}

pub fn deposit_item(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    match player.deposit(slot) {
        Ok(()) => vec![
            Outbound::To(
                player_id,
                ServerMessage::BankUpdated {
                    bank: player.bank().to_vec(),
                    inventory: player.inventory().to_vec(),
                },
            ),
            Outbound::To(player_id, system(MessageChannel::Bank, "Deposited.")),
        ],
        Err(reason) => vec![Outbound::To(player_id, system(MessageChannel::Bank, reason))],
    }
}

pub fn withdraw_item(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    match player.withdraw(slot) {
        Ok(()) => vec![
            Outbound::To(
                player_id,
                ServerMessage::BankUpdated {
                    bank: player.bank().to_vec(),
                    inventory: player.inventory().to_vec(),
                },
            ),
            Outbound::To(player_id, system(MessageChannel::Bank, "Withdrew.")),
        ],
        Err(reason) => vec![Outbound::To(player_id, system(MessageChannel::Bank, reason))],
    }
}

// =============================================================================
// Equipment & consumables
// =============================================================================

pub fn equip_item(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    match player.equip_from_inventory(slot) {
        Ok(_) => vec![
            Outbound::To(
                player_id,
                ServerMessage::EquipmentUpdate { equipment: player.equipment().to_vec() },
            ),
            Outbound::To(
                player_id,
                ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
            ),
        ],
        Err(reason) => vec![Outbound::To(player_id, system(MessageChannel::System, reason))],
    }
}

pub fn unequip_item(world: &mut World, player_id: u64, slot: EquipSlot) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    match player.unequip(slot) {
        Ok(()) => vec![
            Outbound::To(
                player_id,
                ServerMessage::EquipmentUpdate { equipment: player.equipment().to_vec() },
            ),
            Outbound::To(
                player_id,
                ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
            ),
        ],
        Err(reason) => vec![Outbound::To(player_id, system(MessageChannel::System, reason))],
    }
}

/// Eat/drink a consumable from the inventory
pub fn use_item(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    let Some(player) = world.players.get_mut(&player_id) else {
        return Vec::new();
    };
    let heal = match player.item_at(slot) {
        Some(Item::Consumable { heal, .. }) => *heal,
        Some(_) => {
            return vec![Outbound::To(
                player_id,
                system(MessageChannel::System, "Nothing interesting happens."),
            )];
        }
        None => return Vec::new(),
    };
    let Some(item) = player.take_item(slot) else {
        return Vec::new();
    };
    let healed = player.heal(heal);
    vec![
        Outbound::To(
            player_id,
            system(
                MessageChannel::System,
                format!("You eat the {} and heal {} HP.", item.name(), healed),
            ),
        ),
        Outbound::To(
            player_id,
            ServerMessage::StatsUpdate {
                hp: player.hp(),
                max_hp: player.max_hp(),
                mana: player.mana(),
                max_mana: player.max_mana(),
                prayer: player.prayer_points(),
                max_prayer: player.max_prayer(),
            },
        ),
        Outbound::To(
            player_id,
            ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
        ),
    ]
}

/// Bury bones for prayer experience
pub fn bury_bones(world: &mut World, player_id: u64, slot: usize) -> Vec<Outbound> {
    {
        let Some(player) = world.players.get_mut(&player_id) else {
            return Vec::new();
        };
        match player.item_at(slot) {
            Some(Item::Material { name, .. }) if name == "bones" => {}
            _ => return Vec::new(),
        }
        player.take_item(slot);
    }
    let mut out = combat::grant_experience(world, player_id, &[(Skill::Prayer, BONES_PRAYER_XP)]);
    if let Some(player) = world.players.get(&player_id) {
        out.push(Outbound::To(
            player_id,
            ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
        ));
    }
    out.push(Outbound::To(
        player_id,
        system(
            MessageChannel::System,
            format!("You bury the bones and gain {} Prayer XP.", BONES_PRAYER_XP),
        ),
    ));
    out
}

// =============================================================================
// Spellcasting
// =============================================================================

/// Cast a spell. The rune cost is checked in full before any rune is
/// consumed; a spell never partially consumes its cost.
pub fn cast_spell(
    world: &mut World,
    player_id: u64,
    spell_name: &str,
    target: Option<u64>,
    now_ms: u64,
) -> Vec<Outbound> {
    let Some(spell) = find_spell(spell_name) else {
        return Vec::new();
    };

    // Gate checks before anything is spent
    {
        let Some(player) = world.players.get(&player_id) else {
            return Vec::new();
        };
        if player.skills().level(Skill::Magic) < spell.magic_level {
            return vec![Outbound::To(
                player_id,
                system(
                    MessageChannel::Magic,
                    format!("You need {} Magic to cast {}.", spell.magic_level, spell.name),
                ),
            )];
        }
    }
    if let SpellEffect::Strike { .. } = spell.effect {
        let valid_target = target
            .and_then(|id| world.npcs.get(&id))
            .map(|npc| npc.is_attackable())
            .unwrap_or(false);
        if !valid_target {
            return vec![Outbound::To(
                player_id,
                system(MessageChannel::Magic, "You can't cast that spell on that target."),
            )];
        }
    }

    // Two-phase rune payment
    {
        let Some(player) = world.players.get_mut(&player_id) else {
            return Vec::new();
        };
        if let Err(missing) = player.consume_runes(spell.runes) {
            let needed = spell
                .runes
                .iter()
                .find(|(kind, _)| *kind == missing)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            let plural = if needed > 1 { "s" } else { "" };
            return vec![Outbound::To(
                player_id,
                system(
                    MessageChannel::Magic,
                    format!("You need {} {}{} to cast this spell.", needed, missing.name(), plural),
                ),
            )];
        }
    }

    let mut rng = rand::thread_rng();
    let mut out = Vec::new();

    match spell.effect {
        SpellEffect::Heal { min, max } => {
            let Some(player) = world.players.get_mut(&player_id) else {
                return Vec::new();
            };
            let healed = player.heal(rng.gen_range(min..=max));
            out.push(Outbound::To(
                player_id,
                ServerMessage::SpellCast {
                    spell: spell.name.into(),
                    target_id: None,
                    damage: None,
                    heal: Some(healed),
                },
            ));
            out.push(Outbound::To(
                player_id,
                system(
                    MessageChannel::Magic,
                    format!("You cast {} and heal {} HP.", spell.name, healed),
                ),
            ));
        }
        SpellEffect::Strike { min, max } => {
            let magic_bonus = world
                .players
                .get(&player_id)
                .map(|p| p.magic_bonus())
                .unwrap_or(0);
            let Some(npc) = target.and_then(|id| world.npcs.get_mut(&id)) else {
                return out;
            };
            let npc_id = npc.id;
            let damage = (rng.gen_range(min..=max) + magic_bonus / 3).max(1);
            npc.apply_damage(damage);
            let npc_name = npc.name.clone();
            let npc_dead = npc.hp() == 0;
            if let NpcKind::Hostile(brain) = &mut npc.kind {
                brain.mode = crate::entities::NpcMode::InCombat { target: player_id };
            }
            if npc_dead {
                npc.mark_dead(now_ms + RESPAWN_DELAY_MS);
            }

            out.push(Outbound::To(
                player_id,
                ServerMessage::SpellCast {
                    spell: spell.name.into(),
                    target_id: Some(npc_id),
                    damage: Some(damage),
                    heal: None,
                },
            ));
            out.push(Outbound::To(
                player_id,
                system(
                    MessageChannel::Magic,
                    format!("You cast {} and deal {} damage to the {}!", spell.name, damage, npc_name),
                ),
            ));
            if npc_dead {
                out.push(Outbound::To(
                    player_id,
                    system(
                        MessageChannel::Magic,
                        format!("You defeated the {} with magic!", npc_name),
                    ),
                ));
            }
            if let Some(npc) = world.npcs.get(&npc_id) {
                out.push(Outbound::Broadcast(ServerMessage::NpcUpdate {
                    id: npc.id,
                    x: npc.position[0],
                    y: npc.position[1],
                    hp: npc.hp(),
                    max_hp: npc.max_hp(),
                    in_combat: npc.in_combat(),
                }));
            }
        }
    }

    out.extend(combat::grant_experience(
        world,
        player_id,
        &[(Skill::Magic, spell.experience)],
    ));
    if let Some(player) = world.players.get(&player_id) {
        out.push(Outbound::To(
            player_id,
            ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
        ));
    }
    out
}

// =============================================================================
// Gathering
// =============================================================================

struct GatherTable {
    resource: &'static str,
    experience: f64,
    success_chance: f64,
    failure_text: &'static str,
}

fn gather_table(kind: GatherKind, rng: &mut impl Rng) -> GatherTable {
    let (resource, experience, success_chance) = match kind {
        GatherKind::Oak => ("oak logs", 25.0, 0.8),
        GatherKind::Willow => ("willow logs", 35.0, 0.7),
        GatherKind::Maple => ("maple logs", 50.0, 0.6),
        GatherKind::Yew => ("yew logs", 100.0, 0.5),
        GatherKind::Copper => ("copper ore", 20.0, 0.9),
        GatherKind::Tin => ("tin ore", 20.0, 0.9),
        GatherKind::Iron => ("iron ore", 35.0, 0.7),
        GatherKind::Coal => ("coal", 50.0, 0.6),
        GatherKind::Gold => ("gold ore", 80.0, 0.5),
        GatherKind::Fishing => {
            let fish = ["shrimp", "anchovies", "sardines", "herring", "trout"];
            (fish[rng.gen_range(0..fish.len())], 30.0, 0.6)
        }
        GatherKind::Herbs => {
            let herbs = [
                "grimy guam",
                "grimy marrentill",
                "grimy tarromin",
                "grimy harralander",
            ];
            (herbs[rng.gen_range(0..herbs.len())], 40.0, 0.8)
        }
    };
    let failure_text = match kind.skill() {
        Skill::Woodcutting => "You swing at the tree...",
        Skill::Mining => "You strike the rock...",
        Skill::Fishing => "You cast your line...",
        _ => "You tend the herbs...",
    };
    GatherTable { resource, experience, success_chance, failure_text }
}

/// Rare bonus finds, keyed by the gathering skill
fn rare_drop(skill: Skill, rng: &mut impl Rng) -> Option<Item> {
    let options: &[Item] = &match skill {
        Skill::Woodcutting => [
            Item::material("bird nest", 1),
            Item::equipment("wooden shield", EquipSlot::Armor, 0, 1),
        ],
        Skill::Mining => [
            Item::material("gems", 1),
            Item::equipment("iron helmet", EquipSlot::Helmet, 0, 2),
        ],
        Skill::Fishing => [
            Item::material("casket", 1),
            Item::material("big bass", 1),
        ],
        Skill::Farming => [
            Item::material("seeds", 3),
            Item::material("clean herbs", 1),
        ],
        _ => return None,
    };
    Some(options[rng.gen_range(0..options.len())].clone())
}

/// Work a resource node: experience always lands, the goods only on a
/// successful roll.
pub fn gather_resource(
    world: &mut World,
    player_id: u64,
    kind: GatherKind,
    x: f32,
    y: f32,
) -> Vec<Outbound> {
    if world.players.get(&player_id).is_none() {
        return Vec::new();
    }
    let mut rng = rand::thread_rng();
    let table = gather_table(kind, &mut rng);
    let skill = kind.skill();
    let damage = rng.gen_range(10..30);

    // The attempt itself teaches something
    let mut out = combat::grant_experience(world, player_id, &[
        (skill, table.experience),
        (Skill::Hitpoints, (table.experience / 10.0).floor()),
    ]);

    let success = rng.gen_bool(table.success_chance);
    let Some(player) = world.players.get_mut(&player_id) else {
        return out;
    };
    if success {
        let added = player.add_item(Item::material(table.resource, 1));
        let text = if added {
            format!(
                "You get some {}. (+{} {} XP)",
                table.resource, table.experience, skill.name()
            )
        } else {
            format!("Inventory full! (+{} {} XP)", table.experience, skill.name())
        };
        out.push(Outbound::To(player_id, system(MessageChannel::System, text)));

        if rng.gen_bool(0.05) {
            if let Some(bonus) = rare_drop(skill, &mut rng) {
                if player.add_item(bonus.clone()) {
                    out.push(Outbound::To(
                        player_id,
                        system(
                            MessageChannel::System,
                            format!("Bonus! You also get: {}!", bonus.name()),
                        ),
                    ));
                }
            }
        }

        out.push(Outbound::To(
            player_id,
            ServerMessage::InventoryUpdate { slots: player.inventory().to_vec() },
        ));
    } else {
        out.push(Outbound::To(
            player_id,
            system(
                MessageChannel::System,
                format!("{} (+{} {} XP)", table.failure_text, table.experience, skill.name()),
            ),
        ));
    }

    out.push(Outbound::Broadcast(ServerMessage::ResourceDamaged {
        resource: kind,
        x,
        y,
        damage,
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Player;
    use crate::world::terrain::TerrainMap;

    fn world_with_player() -> (World, u64) {
        let mut world = World::new(TerrainMap::procedural());
        world.add_player(Player::new(1, "tester".into(), [1000.0, 1000.0]));
        (world, 1)
    }

    fn find_shop(world: &World, name: &str) -> u64 {
        world
            .npcs()
            .find(|n| n.name == name)
            .map(|n| n.id)
            .expect("shop exists")
    }

    fn listing_stock(world: &World, shop_id: u64, index: usize) -> u32 {
        match &world.npc(shop_id).unwrap().kind {
            NpcKind::Shopkeeper(shop) => shop.listings[index].stock,
            _ => unreachable!(),
        }
    }

    #[test]
    fn purchase_deducts_coins_and_stock() {
        let (mut world, pid) = world_with_player();
        let shop = find_shop(&world, "General Store");

        // Bread: 3 coins, stock 50
        buy_item(&mut world, pid, shop, 0);
        let player = world.player(pid).unwrap();
        assert_eq!(player.coins(), 97);
        assert_eq!(listing_stock(&world, shop, 0), 49);
    }

    #[test]
    fn purchase_rejected_when_underfunded() {
        let (mut world, pid) = world_with_player();
        let shop = find_shop(&world, "Armor Shop");
        // Chainmail costs 80; drain the purse below that first
        world.player_mut(pid).unwrap().remove_coins(30);
        assert_eq!(world.player(pid).unwrap().coins(), 70);

        let before = world.player(pid).unwrap().inventory().to_vec();
        let out = buy_item(&mut world, pid, shop, 5);

        assert_eq!(world.player(pid).unwrap().coins(), 70);
        assert_eq!(world.player(pid).unwrap().inventory(), &before[..]);
        assert_eq!(listing_stock(&world, shop, 5), 3);
        assert!(matches!(
            out.as_slice(),
            [Outbound::To(1, ServerMessage::SystemMessage { .. })]
        ));
    }

    #[test]
    fn hundred_coins_cannot_buy_a_150_coin_item() {
        let (mut world, pid) = world_with_player();
        let shop_id = world.allocate_npc_id();
        world.npcs.insert(
            shop_id,
            crate::entities::Npc::shopkeeper(
                shop_id,
                "Jeweler",
                [900.0, 900.0],
                50,
                10,
                vec![ShopListing {
                    item: Item::equipment("ruby ring", EquipSlot::Gloves, 0, 0),
                    price: 150,
                    stock: 5,
                }],
            ),
        );

        assert_eq!(world.player(pid).unwrap().coins(), 100);
        let before = world.player(pid).unwrap().inventory().to_vec();
        let out = buy_item(&mut world, pid, shop_id, 0);

        let player = world.player(pid).unwrap();
        assert_eq!(player.coins(), 100);
        assert_eq!(player.inventory(), &before[..]);
        assert_eq!(listing_stock(&world, shop_id, 0), 5);
        // Exactly one explanatory rejection, nothing else
        assert!(matches!(
            out.as_slice(),
            [Outbound::To(1, ServerMessage::SystemMessage { .. })]
        ));
    }

    #[test]
    fn purchase_with_exhausted_stock_only_succeeds_once() {
        let (mut world, pid) = world_with_player();
        let shop = find_shop(&world, "General Store");
        // Force a single unit of stock, then race two buys for it
        if let Some(npc) = world.npcs.get_mut(&shop) {
            if let NpcKind::Shopkeeper(s) = &mut npc.kind {
                s.listings[0].stock = 1;
            }
        }

        buy_item(&mut world, pid, shop, 0);
        let coins_after_first = world.player(pid).unwrap().coins();
        assert_eq!(listing_stock(&world, shop, 0), 0);

        buy_item(&mut world, pid, shop, 0);
        assert_eq!(world.player(pid).unwrap().coins(), coins_after_first);
        assert_eq!(listing_stock(&world, shop, 0), 0);
    }

    #[test]
    fn full_inventory_purchase_refunds_and_keeps_stock() {
        let (mut world, pid) = world_with_player();
        let shop = find_shop(&world, "General Store");
        while world.player_mut(pid).unwrap().add_item(Item::material("rock", 1)) {}

        let coins_before = world.player(pid).unwrap().coins();
        buy_item(&mut world, pid, shop, 0);
        assert_eq!(world.player(pid).unwrap().coins(), coins_before);
        assert_eq!(listing_stock(&world, shop, 0), 50);
    }

    #[test]
    fn selling_uses_category_price_not_shop_price() {
        let (mut world, pid) = world_with_player();
        // Slot 1 is the iron axe (attack 3): sells for 9
        let coins_before = world.player(pid).unwrap().coins();
        sell_item(&mut world, pid, 1);
        let player = world.player(pid).unwrap();
        assert_eq!(player.coins(), coins_before + 9);
        assert!(player.item_at(1).is_none());
    }

    #[test]
    fn coins_cannot_be_sold() {
        let (mut world, pid) = world_with_player();
        sell_item(&mut world, pid, 6); // the coin stack
        assert_eq!(world.player(pid).unwrap().coins(), 100);
    }

    #[test]
    fn bank_round_trip_via_operations() {
        let (mut world, pid) = world_with_player();
        let original = world.player(pid).unwrap().item_at(0).cloned();

        deposit_item(&mut world, pid, 0);
        assert!(world.player(pid).unwrap().item_at(0).is_none());

        withdraw_item(&mut world, pid, 0);
        let player = world.player(pid).unwrap();
        assert_eq!(player.item_at(0).cloned(), original);
        assert!(player.bank()[0].is_none());
    }

    #[test]
    fn eating_bread_heals_and_consumes() {
        let (mut world, pid) = world_with_player();
        world.player_mut(pid).unwrap().apply_damage(10);

        use_item(&mut world, pid, 3); // bread, heals 5
        let player = world.player(pid).unwrap();
        assert_eq!(player.hp(), player.max_hp() - 5);
        assert!(player.item_at(3).is_none());
    }

    #[test]
    fn bury_bones_trains_prayer() {
        let (mut world, pid) = world_with_player();
        world.player_mut(pid).unwrap().add_item(Item::material("bones", 1));
        let slot = world
            .player(pid)
            .unwrap()
            .inventory()
            .iter()
            .position(|s| matches!(s, Some(i) if i.name() == "bones"))
            .unwrap();

        let xp_before = world.player(pid).unwrap().skills().experience(Skill::Prayer);
        bury_bones(&mut world, pid, slot);
        let player = world.player(pid).unwrap();
        assert_eq!(player.skills().experience(Skill::Prayer), xp_before + 5.0);
        assert!(player.item_at(slot).is_none());
    }

    #[test]
    fn spell_rejected_below_magic_level() {
        let (mut world, pid) = world_with_player();
        let runes_before = world.player(pid).unwrap().rune_count(RuneKind::Fire);
        let out = cast_spell(&mut world, pid, "fire strike", None, 0);
        assert_eq!(world.player(pid).unwrap().rune_count(RuneKind::Fire), runes_before);
        assert!(matches!(
            out.as_slice(),
            [Outbound::To(1, ServerMessage::SystemMessage { .. })]
        ));
    }

    #[test]
    fn strike_without_target_consumes_nothing() {
        let (mut world, pid) = world_with_player();
        // Give the player the mind rune wind strike needs
        world.player_mut(pid).unwrap().add_item(Item::Rune { kind: RuneKind::Mind, quantity: 5 });

        let air_before = world.player(pid).unwrap().rune_count(RuneKind::Air);
        cast_spell(&mut world, pid, "wind strike", None, 0);
        assert_eq!(world.player(pid).unwrap().rune_count(RuneKind::Air), air_before);
    }

    #[test]
    fn missing_runes_block_the_whole_cast() {
        let (mut world, pid) = world_with_player();
        let npc_id = world.spawn_hostile("goblin", [1010.0, 1000.0], 15, 2, 3);
        // Starter kit has air but no mind runes
        let air_before = world.player(pid).unwrap().rune_count(RuneKind::Air);
        let hp_before = world.npc(npc_id).unwrap().hp();

        cast_spell(&mut world, pid, "wind strike", Some(npc_id), 0);

        assert_eq!(world.player(pid).unwrap().rune_count(RuneKind::Air), air_before);
        assert_eq!(world.npc(npc_id).unwrap().hp(), hp_before);
    }

    #[test]
    fn successful_strike_consumes_runes_and_damages() {
        let (mut world, pid) = world_with_player();
        let npc_id = world.spawn_hostile("goblin", [1010.0, 1000.0], 15, 2, 3);
        world.player_mut(pid).unwrap().add_item(Item::Rune { kind: RuneKind::Mind, quantity: 5 });

        let air_before = world.player(pid).unwrap().rune_count(RuneKind::Air);
        let hp_before = world.npc(npc_id).unwrap().hp();
        cast_spell(&mut world, pid, "wind strike", Some(npc_id), 0);

        let player = world.player(pid).unwrap();
        assert_eq!(player.rune_count(RuneKind::Air), air_before - 1);
        assert_eq!(player.rune_count(RuneKind::Mind), 4);
        assert!(player.skills().experience(Skill::Magic) > 0.0);
        assert!(world.npc(npc_id).unwrap().hp() < hp_before);
    }

    #[test]
    fn heal_spell_restores_hp() {
        let (mut world, pid) = world_with_player();
        world.player_mut(pid).unwrap().apply_damage(15);
        // heal needs magic 3
        world.player_mut(pid).unwrap().add_experience(Skill::Magic, 200.0);

        let hp_before = world.player(pid).unwrap().hp();
        cast_spell(&mut world, pid, "heal", None, 0);
        let player = world.player(pid).unwrap();
        assert!(player.hp() > hp_before);
        assert!(player.hp() <= player.max_hp());
        assert_eq!(player.rune_count(RuneKind::Air), 47);
        assert_eq!(player.rune_count(RuneKind::Water), 24);
    }

    #[test]
    fn gathering_always_teaches_sometimes_yields() {
        let (mut world, pid) = world_with_player();
        let xp_before = world.player(pid).unwrap().skills().experience(Skill::Woodcutting);

        let out = gather_resource(&mut world, pid, GatherKind::Oak, 100.0, 700.0);
        let player = world.player(pid).unwrap();
        assert_eq!(
            player.skills().experience(Skill::Woodcutting),
            xp_before + 25.0
        );
        // Hitpoints tag along at a tenth
        assert!(player.skills().experience(Skill::Hitpoints) > 1154.0);
        assert!(out
            .iter()
            .any(|o| matches!(o, Outbound::Broadcast(ServerMessage::ResourceDamaged { .. }))));
    }
}
