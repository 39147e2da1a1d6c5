//! Server-side player entity.
//!
//! All gameplay mutation of a player goes through the narrow methods here
//! so the vital invariants (hp clamping, derived max stats) hold in one
//! place instead of at every call site.

use serde::{Deserialize, Serialize};

use runeworld_shared::{
    Item, EquipSlot, RuneKind, Skill, SkillSet,
    PlayerProfile, SkillState,
    INVENTORY_SIZE, BANK_SIZE, starter_inventory,
};

/// Flat mana pool; spells cost runes, not mana
const BASE_MANA: u32 = 10;

/// Server-side player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub position: [f32; 2],
    hp: u32,
    max_hp: u32,
    mana: u32,
    max_mana: u32,
    prayer: u32,
    max_prayer: u32,
    skills: SkillSet,
    inventory: Vec<Option<Item>>,
    equipment: Vec<Option<Item>>,
    bank: Vec<Option<Item>>,
    /// Current combat/interaction target, if any
    pub target: Option<u64>,
}

/// The persisted shape of a player: an opaque bag handed to the account
/// store on save and back on login. Derived stats are recomputed on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub mana: u32,
    pub prayer: u32,
    pub skills: SkillSet,
    pub inventory: Vec<Option<Item>>,
    pub equipment: Vec<Option<Item>>,
    pub bank: Vec<Option<Item>>,
}

impl Player {
    /// Create a fresh player with the starter kit at the home anchor
    pub fn new(id: u64, name: String, position: [f32; 2]) -> Self {
        let skills = SkillSet::starting();
        let max_hp = 9 + skills.level(Skill::Hitpoints);
        let max_prayer = skills.level(Skill::Prayer);
        Self {
            id,
            name,
            position,
            hp: max_hp,
            max_hp,
            mana: BASE_MANA,
            max_mana: BASE_MANA,
            prayer: max_prayer,
            max_prayer,
            skills,
            inventory: starter_inventory(),
            equipment: vec![None; EquipSlot::ALL.len()],
            bank: vec![None; BANK_SIZE],
            target: None,
        }
    }

    /// Rebuild a player from its persisted record. Derived maxima come
    /// from the skill levels, never from the stored vitals.
    pub fn from_record(id: u64, record: PlayerRecord) -> Self {
        let max_hp = 9 + record.skills.level(Skill::Hitpoints);
        let max_prayer = record.skills.level(Skill::Prayer);
        let mut inventory = record.inventory;
        inventory.resize(INVENTORY_SIZE, None);
        let mut equipment = record.equipment;
        equipment.resize(EquipSlot::ALL.len(), None);
        let mut bank = record.bank;
        bank.resize(BANK_SIZE, None);
        Self {
            id,
            name: record.name,
            position: [record.x, record.y],
            hp: record.hp.min(max_hp),
            max_hp,
            mana: record.mana.min(BASE_MANA),
            max_mana: BASE_MANA,
            prayer: record.prayer.min(max_prayer),
            max_prayer,
            skills: record.skills,
            inventory,
            equipment,
            bank,
            target: None,
        }
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            name: self.name.clone(),
            x: self.position[0],
            y: self.position[1],
            hp: self.hp,
            mana: self.mana,
            prayer: self.prayer,
            skills: self.skills.clone(),
            inventory: self.inventory.clone(),
            equipment: self.equipment.clone(),
            bank: self.bank.clone(),
        }
    }

    /// Authoritative state sent at login
    pub fn profile(&self) -> PlayerProfile {
        PlayerProfile {
            id: self.id,
            name: self.name.clone(),
            x: self.position[0],
            y: self.position[1],
            hp: self.hp,
            max_hp: self.max_hp,
            mana: self.mana,
            max_mana: self.max_mana,
            prayer: self.prayer,
            max_prayer: self.max_prayer,
            skills: Skill::ALL
                .iter()
                .map(|&skill| SkillState {
                    skill,
                    level: self.skills.level(skill),
                    experience: self.skills.experience(skill),
                })
                .collect(),
            inventory: self.inventory.clone(),
            equipment: self.equipment.clone(),
        }
    }

    // =========================================================================
    // Vitals
    // =========================================================================

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn mana(&self) -> u32 {
        self.mana
    }

    pub fn max_mana(&self) -> u32 {
        self.max_mana
    }

    pub fn prayer_points(&self) -> u32 {
        self.prayer
    }

    pub fn max_prayer(&self) -> u32 {
        self.max_prayer
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Apply damage, clamping at zero. Returns the hp actually removed.
    pub fn apply_damage(&mut self, damage: u32) -> u32 {
        let dealt = damage.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// Heal up to max hp. Returns the hp actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(self.max_hp - self.hp);
        self.hp += healed;
        healed
    }

    /// Restore hp to maximum (death handler, respawn)
    pub fn restore_full(&mut self) {
        self.hp = self.max_hp;
    }

    // =========================================================================
    // Skills & progression
    // =========================================================================

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    /// Grant experience; returns one `(skill, new_level)` pair per level
    /// gained so the caller can emit notifications. Hitpoints and prayer
    /// level changes immediately re-derive the matching max stat.
    pub fn add_experience(&mut self, skill: Skill, amount: f64) -> Vec<(Skill, u32)> {
        let gained = self.skills.add_experience(skill, amount);
        let level = self.skills.level(skill);
        let events = (0..gained)
            .map(|i| (skill, level - gained + 1 + i))
            .collect();
        match skill {
            Skill::Hitpoints => self.recompute_max_hp(),
            Skill::Prayer => self.recompute_max_prayer(),
            _ => {}
        }
        events
    }

    /// `max_hp = 9 + hitpoints level`; current hp rises by the delta
    fn recompute_max_hp(&mut self) {
        let new_max = 9 + self.skills.level(Skill::Hitpoints);
        if new_max > self.max_hp {
            self.hp += new_max - self.max_hp;
            self.max_hp = new_max;
        }
    }

    /// `max_prayer = prayer level`; current points rise by the delta
    fn recompute_max_prayer(&mut self) {
        let new_max = self.skills.level(Skill::Prayer);
        if new_max > self.max_prayer {
            self.prayer += new_max - self.max_prayer;
            self.max_prayer = new_max;
        }
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    pub fn equipment(&self) -> &[Option<Item>] {
        &self.equipment
    }

    pub fn equipped(&self, slot: EquipSlot) -> Option<&Item> {
        self.equipment[slot.index()].as_ref()
    }

    /// Move the equipment item at `inventory_slot` into its equipment
    /// slot, swapping out whatever was there.
    pub fn equip_from_inventory(&mut self, inventory_slot: usize) -> Result<EquipSlot, &'static str> {
        let item = self
            .inventory
            .get(inventory_slot)
            .and_then(|s| s.as_ref())
            .ok_or("There is nothing in that slot.")?;
        let slot = match item {
            Item::Equipment { slot, .. } => *slot,
            _ => return Err("You can't equip that."),
        };
        let item = self.inventory[inventory_slot].take();
        self.inventory[inventory_slot] = self.equipment[slot.index()].take();
        self.equipment[slot.index()] = item;
        Ok(slot)
    }

    /// Move the item in an equipment slot back into the inventory
    pub fn unequip(&mut self, slot: EquipSlot) -> Result<(), &'static str> {
        if self.equipment[slot.index()].is_none() {
            return Err("You have nothing equipped there.");
        }
        let free = self
            .inventory
            .iter()
            .position(|s| s.is_none())
            .ok_or("Your inventory is full!")?;
        self.inventory[free] = self.equipment[slot.index()].take();
        Ok(())
    }

    /// Weapon attack bonus
    pub fn attack_bonus(&self) -> u32 {
        match self.equipped(EquipSlot::Weapon) {
            Some(Item::Equipment { attack_bonus, .. }) => *attack_bonus,
            _ => 0,
        }
    }

    /// Summed defense bonus of every worn piece except the weapon
    pub fn equipment_defense_bonus(&self) -> u32 {
        [
            EquipSlot::Armor,
            EquipSlot::Helmet,
            EquipSlot::Legs,
            EquipSlot::Boots,
            EquipSlot::Gloves,
        ]
        .iter()
        .filter_map(|&slot| match self.equipped(slot) {
            Some(Item::Equipment { defense_bonus, .. }) => Some(*defense_bonus),
            _ => None,
        })
        .sum()
    }

    /// Defense bonus of the body armor alone
    pub fn armor_defense_bonus(&self) -> u32 {
        match self.equipped(EquipSlot::Armor) {
            Some(Item::Equipment { defense_bonus, .. }) => *defense_bonus,
            _ => 0,
        }
    }

    /// Summed magic bonus of helmet, armor and weapon
    pub fn magic_bonus(&self) -> u32 {
        [EquipSlot::Helmet, EquipSlot::Armor, EquipSlot::Weapon]
            .iter()
            .filter_map(|&slot| match self.equipped(slot) {
                Some(Item::Equipment { magic_bonus, .. }) => Some(*magic_bonus),
                _ => None,
            })
            .sum()
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub fn inventory(&self) -> &[Option<Item>] {
        &self.inventory
    }

    pub fn item_at(&self, slot: usize) -> Option<&Item> {
        self.inventory.get(slot).and_then(|s| s.as_ref())
    }

    /// Place an item in the first empty slot. Returns false (and leaves
    /// the inventory untouched) when every slot is taken.
    pub fn add_item(&mut self, item: Item) -> bool {
        match self.inventory.iter().position(|s| s.is_none()) {
            Some(free) => {
                self.inventory[free] = Some(item);
                true
            }
            None => false,
        }
    }

    /// Remove and return the stack at `slot`
    pub fn take_item(&mut self, slot: usize) -> Option<Item> {
        self.inventory.get_mut(slot)?.take()
    }

    pub fn coins(&self) -> u32 {
        self.inventory
            .iter()
            .filter_map(|s| match s {
                Some(Item::Currency { quantity }) => Some(*quantity),
                _ => None,
            })
            .sum()
    }

    /// Merge coins into the existing stack, or start a new one
    pub fn add_coins(&mut self, amount: u32) -> bool {
        for slot in self.inventory.iter_mut() {
            if let Some(Item::Currency { quantity }) = slot {
                *quantity += amount;
                return true;
            }
        }
        self.add_item(Item::Currency { quantity: amount })
    }

    /// Deduct coins across stacks, clearing any stack that hits zero.
    /// Returns false (no mutation) when the player can't cover the amount.
    pub fn remove_coins(&mut self, amount: u32) -> bool {
        if self.coins() < amount {
            return false;
        }
        let mut remaining = amount;
        for slot in self.inventory.iter_mut() {
            if remaining == 0 {
                break;
            }
            if let Some(Item::Currency { quantity }) = slot {
                let used = remaining.min(*quantity);
                *quantity -= used;
                remaining -= used;
                if *quantity == 0 {
                    *slot = None;
                }
            }
        }
        true
    }

    /// Total runes of one kind across all stacks
    pub fn rune_count(&self, kind: RuneKind) -> u32 {
        self.inventory
            .iter()
            .filter_map(|s| match s {
                Some(Item::Rune { kind: k, quantity }) if *k == kind => Some(*quantity),
                _ => None,
            })
            .sum()
    }

    /// Two-phase rune payment: verify the whole cost first, then consume
    /// it all. Never consumes partially.
    pub fn consume_runes(&mut self, costs: &[(RuneKind, u32)]) -> Result<(), RuneKind> {
        for &(kind, needed) in costs {
            if self.rune_count(kind) < needed {
                return Err(kind);
            }
        }
        for &(kind, needed) in costs {
            let mut remaining = needed;
            for slot in self.inventory.iter_mut() {
                if remaining == 0 {
                    break;
                }
                if let Some(Item::Rune { kind: k, quantity }) = slot {
                    if *k == kind {
                        let used = remaining.min(*quantity);
                        *quantity -= used;
                        remaining -= used;
                        if *quantity == 0 {
                            *slot = None;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Bank
    // =========================================================================

    pub fn bank(&self) -> &[Option<Item>] {
        &self.bank
    }

    /// Move the stack at `inventory_slot` into the first empty bank slot
    pub fn deposit(&mut self, inventory_slot: usize) -> Result<(), &'static str> {
        if self.inventory.get(inventory_slot).and_then(|s| s.as_ref()).is_none() {
            return Err("There is nothing in that slot.");
        }
        let free = self
            .bank
            .iter()
            .position(|s| s.is_none())
            .ok_or("Your bank is full!")?;
        self.bank[free] = self.inventory[inventory_slot].take();
        Ok(())
    }

    /// Move the stack at `bank_slot` into the first empty inventory slot
    pub fn withdraw(&mut self, bank_slot: usize) -> Result<(), &'static str> {
        if self.bank.get(bank_slot).and_then(|s| s.as_ref()).is_none() {
            return Err("There is nothing in that slot.");
        }
        let free = self
            .inventory
            .iter()
            .position(|s| s.is_none())
            .ok_or("Your inventory is full!")?;
        self.inventory[free] = self.bank[bank_slot].take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> Player {
        Player::new(1, "tester".into(), [1000.0, 1000.0])
    }

    #[test]
    fn fresh_player_vitals_derive_from_skills() {
        let player = test_player();
        // hitpoints 10 -> 9 + 10, prayer 1 -> 1
        assert_eq!(player.max_hp(), 19);
        assert_eq!(player.hp(), 19);
        assert_eq!(player.max_prayer(), 1);
        assert_eq!(player.coins(), 100);
    }

    #[test]
    fn damage_clamps_at_zero() {
        let mut player = test_player();
        let dealt = player.apply_damage(1000);
        assert_eq!(dealt, 19);
        assert_eq!(player.hp(), 0);
        assert!(player.is_dead());
        // More damage is a no-op
        assert_eq!(player.apply_damage(5), 0);
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut player = test_player();
        player.apply_damage(10);
        let healed = player.heal(1000);
        assert_eq!(healed, 10);
        assert_eq!(player.hp(), player.max_hp());
    }

    #[test]
    fn hitpoints_level_up_raises_max_and_current_hp() {
        let mut player = test_player();
        player.apply_damage(4);
        let hp_before = player.hp();
        // Enough xp to go from hitpoints 10 to 11 (threshold 1358)
        let events = player.add_experience(Skill::Hitpoints, 300.0);
        assert_eq!(events, vec![(Skill::Hitpoints, 11)]);
        assert_eq!(player.max_hp(), 20);
        assert_eq!(player.hp(), hp_before + 1);
    }

    #[test]
    fn prayer_level_up_raises_max_prayer() {
        let mut player = test_player();
        let events = player.add_experience(Skill::Prayer, 90.0);
        assert_eq!(events, vec![(Skill::Prayer, 2)]);
        assert_eq!(player.max_prayer(), 2);
        assert_eq!(player.prayer_points(), 2);
    }

    #[test]
    fn multi_level_grant_reports_each_level() {
        let mut player = test_player();
        let events = player.add_experience(Skill::Attack, 200.0);
        assert_eq!(events, vec![(Skill::Attack, 2), (Skill::Attack, 3)]);
    }

    #[test]
    fn add_item_fails_cleanly_when_full() {
        let mut player = test_player();
        while player.add_item(Item::material("oak logs", 1)) {}
        let before = player.inventory().to_vec();
        assert!(!player.add_item(Item::material("yew logs", 1)));
        assert_eq!(player.inventory(), &before[..]);
    }

    #[test]
    fn coins_merge_and_deduct() {
        let mut player = test_player();
        assert!(player.add_coins(50));
        assert_eq!(player.coins(), 150);
        assert!(player.remove_coins(150));
        assert_eq!(player.coins(), 0);
        assert!(!player.remove_coins(1));
    }

    #[test]
    fn rune_payment_is_all_or_nothing() {
        let mut player = test_player();
        // Starter kit has no mind runes: the check fails before any
        // air runes are touched.
        let cost = [(RuneKind::Air, 1), (RuneKind::Mind, 1)];
        assert_eq!(player.consume_runes(&cost), Err(RuneKind::Mind));
        assert_eq!(player.rune_count(RuneKind::Air), 50);

        let cost = [(RuneKind::Air, 3), (RuneKind::Water, 1)];
        assert_eq!(player.consume_runes(&cost), Ok(()));
        assert_eq!(player.rune_count(RuneKind::Air), 47);
        assert_eq!(player.rune_count(RuneKind::Water), 24);
    }

    #[test]
    fn rune_payment_spans_multiple_stacks() {
        let mut player = test_player();
        player.add_item(Item::Rune { kind: RuneKind::Mind, quantity: 1 });
        player.add_item(Item::Rune { kind: RuneKind::Mind, quantity: 1 });
        assert_eq!(player.rune_count(RuneKind::Mind), 2);
        assert_eq!(player.consume_runes(&[(RuneKind::Mind, 2)]), Ok(()));
        assert_eq!(player.rune_count(RuneKind::Mind), 0);
    }

    #[test]
    fn equip_swaps_with_occupied_slot() {
        let mut player = test_player();
        // Slot 0 holds the bronze dagger, slot 1 the iron axe
        player.equip_from_inventory(0).unwrap();
        assert_eq!(player.attack_bonus(), 1);
        assert!(player.item_at(0).is_none());

        player.equip_from_inventory(1).unwrap();
        assert_eq!(player.attack_bonus(), 3);
        // The dagger came back to the axe's slot
        assert_eq!(player.item_at(1).unwrap().name(), "bronze dagger");
    }

    #[test]
    fn equip_rejects_non_equipment() {
        let mut player = test_player();
        // Slot 3 is bread
        assert!(player.equip_from_inventory(3).is_err());
        assert_eq!(player.item_at(3).unwrap().name(), "bread");
    }

    #[test]
    fn bank_round_trip_restores_slot_content() {
        let mut player = test_player();
        let original = player.item_at(0).cloned();
        player.deposit(0).unwrap();
        assert!(player.item_at(0).is_none());
        assert_eq!(player.bank()[0], original);

        player.withdraw(0).unwrap();
        assert!(player.bank()[0].is_none());
        assert_eq!(player.item_at(0).cloned(), original);
    }

    #[test]
    fn deposit_from_empty_slot_fails() {
        let mut player = test_player();
        assert!(player.deposit(27).is_err());
    }

    #[test]
    fn record_round_trip_preserves_state() {
        let mut player = test_player();
        player.apply_damage(5);
        player.add_experience(Skill::Woodcutting, 100.0);
        let record = player.to_record();
        let restored = Player::from_record(42, record);
        assert_eq!(restored.hp(), player.hp());
        assert_eq!(restored.max_hp(), player.max_hp());
        assert_eq!(
            restored.skills().level(Skill::Woodcutting),
            player.skills().level(Skill::Woodcutting)
        );
        assert_eq!(restored.inventory(), player.inventory());
    }
}
