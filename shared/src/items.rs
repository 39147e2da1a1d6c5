//! Item definitions shared between client and server.

use serde::{Deserialize, Serialize};

/// Equipment slot names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Helmet,
    Armor,
    Legs,
    Boots,
    Gloves,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 6] = [
        Self::Weapon,
        Self::Helmet,
        Self::Armor,
        Self::Legs,
        Self::Boots,
        Self::Gloves,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Helmet => "helmet",
            Self::Armor => "armor",
            Self::Legs => "legs",
            Self::Boots => "boots",
            Self::Gloves => "gloves",
        }
    }

    /// Index into a fixed-length equipment array
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

/// Rune types consumed by spellcasting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuneKind {
    Air,
    Water,
    Earth,
    Fire,
    Mind,
    Body,
}

impl RuneKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Air => "air rune",
            Self::Water => "water rune",
            Self::Earth => "earth rune",
            Self::Fire => "fire rune",
            Self::Mind => "mind rune",
            Self::Body => "body rune",
        }
    }
}

/// An item stack occupying one inventory or bank slot.
///
/// Items are value types: copying a stack into another slot duplicates
/// data, not identity, and the source slot must be cleared explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Equipment {
        name: String,
        slot: EquipSlot,
        attack_bonus: u32,
        defense_bonus: u32,
        magic_bonus: u32,
    },
    Consumable {
        name: String,
        heal: u32,
    },
    /// Coins; there is one currency, so only the quantity varies
    Currency {
        quantity: u32,
    },
    Material {
        name: String,
        quantity: u32,
    },
    Rune {
        kind: RuneKind,
        quantity: u32,
    },
}

impl Item {
    /// Shorthand for equipment with no magic bonus
    pub fn equipment(
        name: &str,
        slot: EquipSlot,
        attack_bonus: u32,
        defense_bonus: u32,
    ) -> Self {
        Self::Equipment {
            name: name.into(),
            slot,
            attack_bonus,
            defense_bonus,
            magic_bonus: 0,
        }
    }

    pub fn consumable(name: &str, heal: u32) -> Self {
        Self::Consumable { name: name.into(), heal }
    }

    pub fn material(name: &str, quantity: u32) -> Self {
        Self::Material { name: name.into(), quantity }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Equipment { name, .. }
            | Self::Consumable { name, .. }
            | Self::Material { name, .. } => name,
            Self::Currency { .. } => "coins",
            Self::Rune { kind, .. } => kind.name(),
        }
    }

    /// Price a shop pays for this item. Deterministic per category and
    /// bonus magnitude; unrelated to any shop's asking price.
    pub fn sell_price(&self) -> u32 {
        match self {
            Self::Equipment { attack_bonus, defense_bonus, .. } => {
                ((attack_bonus + defense_bonus) * 3).max(1)
            }
            Self::Consumable { heal, .. } => (heal / 2).max(1),
            Self::Material { .. } => 2,
            Self::Rune { .. } | Self::Currency { .. } => 1,
        }
    }
}

/// One line of a shopkeeper's stock: an item template, its asking price,
/// and how many units remain. Stock only ever decrements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopListing {
    pub item: Item,
    pub price: u32,
    pub stock: u32,
}

/// Number of inventory slots per player
pub const INVENTORY_SIZE: usize = 28;

/// Number of bank slots per player
pub const BANK_SIZE: usize = 100;

/// The kit every new account starts with
pub fn starter_inventory() -> Vec<Option<Item>> {
    let mut slots: Vec<Option<Item>> = vec![
        Some(Item::equipment("bronze dagger", EquipSlot::Weapon, 1, 0)),
        Some(Item::equipment("iron axe", EquipSlot::Weapon, 3, 0)),
        Some(Item::equipment("iron pickaxe", EquipSlot::Weapon, 2, 0)),
        Some(Item::consumable("bread", 5)),
        Some(Item::consumable("bread", 5)),
        Some(Item::consumable("bread", 5)),
        Some(Item::Currency { quantity: 100 }),
        Some(Item::Rune { kind: RuneKind::Air, quantity: 50 }),
        Some(Item::Rune { kind: RuneKind::Water, quantity: 25 }),
        Some(Item::Rune { kind: RuneKind::Earth, quantity: 25 }),
        Some(Item::Rune { kind: RuneKind::Fire, quantity: 25 }),
    ];
    slots.resize(INVENTORY_SIZE, None);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_kit_fills_eleven_slots() {
        let inv = starter_inventory();
        assert_eq!(inv.len(), INVENTORY_SIZE);
        assert_eq!(inv.iter().filter(|s| s.is_some()).count(), 11);
        assert!(matches!(inv[6], Some(Item::Currency { quantity: 100 })));
    }

    #[test]
    fn sell_prices_follow_category_rules() {
        let sword = Item::equipment("bronze sword", EquipSlot::Weapon, 2, 0);
        assert_eq!(sword.sell_price(), 6);

        let chainmail = Item::equipment("chainmail", EquipSlot::Armor, 0, 5);
        assert_eq!(chainmail.sell_price(), 15);

        // Zero-bonus equipment still fetches the 1 coin floor
        let hat = Item::equipment("wizard hat", EquipSlot::Helmet, 0, 0);
        assert_eq!(hat.sell_price(), 1);

        assert_eq!(Item::consumable("bread", 5).sell_price(), 2);
        assert_eq!(Item::consumable("health potion", 15).sell_price(), 7);
        assert_eq!(Item::material("oak logs", 1).sell_price(), 2);
        assert_eq!(Item::Rune { kind: RuneKind::Air, quantity: 10 }.sell_price(), 1);
    }

    #[test]
    fn equip_slot_indices_are_stable() {
        for (i, slot) in EquipSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
