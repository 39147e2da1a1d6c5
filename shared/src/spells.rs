//! Spellbook definitions shared between client and server.
//!
//! Spells cost runes, not mana; the server consumes the full rune cost
//! or none of it.

use serde::{Deserialize, Serialize};

use crate::items::RuneKind;

/// What a spell does on a successful cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellEffect {
    /// Offensive spell: uniform damage roll in `min..=max`
    Strike { min: u32, max: u32 },
    /// Self heal: uniform roll in `min..=max`, clamped to max hp
    Heal { min: u32, max: u32 },
}

/// Spell definition
#[derive(Debug, Clone, Copy)]
pub struct SpellDef {
    pub name: &'static str,
    /// Minimum magic level to cast
    pub magic_level: u32,
    pub effect: SpellEffect,
    /// Rune cost, all consumed in one step
    pub runes: &'static [(RuneKind, u32)],
    /// Magic experience granted per cast
    pub experience: f64,
}

/// The spellbook
pub const SPELLS: &[SpellDef] = &[
    SpellDef {
        name: "wind strike",
        magic_level: 1,
        effect: SpellEffect::Strike { min: 1, max: 8 },
        runes: &[(RuneKind::Air, 1), (RuneKind::Mind, 1)],
        experience: 5.5,
    },
    SpellDef {
        name: "heal",
        magic_level: 3,
        effect: SpellEffect::Heal { min: 2, max: 8 },
        runes: &[(RuneKind::Air, 3), (RuneKind::Water, 1)],
        experience: 8.0,
    },
    SpellDef {
        name: "water strike",
        magic_level: 5,
        effect: SpellEffect::Strike { min: 2, max: 10 },
        runes: &[(RuneKind::Water, 1), (RuneKind::Air, 1), (RuneKind::Mind, 1)],
        experience: 7.5,
    },
    SpellDef {
        name: "earth strike",
        magic_level: 9,
        effect: SpellEffect::Strike { min: 3, max: 12 },
        runes: &[(RuneKind::Earth, 2), (RuneKind::Air, 1), (RuneKind::Mind, 1)],
        experience: 9.5,
    },
    SpellDef {
        name: "fire strike",
        magic_level: 13,
        effect: SpellEffect::Strike { min: 4, max: 16 },
        runes: &[(RuneKind::Fire, 3), (RuneKind::Air, 2), (RuneKind::Mind, 1)],
        experience: 11.5,
    },
];

/// Look up a spell by its display name
pub fn find_spell(name: &str) -> Option<&'static SpellDef> {
    SPELLS.iter().find(|s| s.name == name)
}
