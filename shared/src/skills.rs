//! Skill definitions and the experience curve.

use serde::{Deserialize, Serialize};

/// Level cap for every skill
pub const MAX_LEVEL: u32 = 99;

/// The fixed set of trainable skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Attack,
    Defense,
    Strength,
    Hitpoints,
    Magic,
    Ranged,
    Prayer,
    Mining,
    Woodcutting,
    Fishing,
    Farming,
    Cooking,
}

impl Skill {
    pub const ALL: [Skill; 12] = [
        Self::Attack,
        Self::Defense,
        Self::Strength,
        Self::Hitpoints,
        Self::Magic,
        Self::Ranged,
        Self::Prayer,
        Self::Mining,
        Self::Woodcutting,
        Self::Fishing,
        Self::Farming,
        Self::Cooking,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::Strength => "strength",
            Self::Hitpoints => "hitpoints",
            Self::Magic => "magic",
            Self::Ranged => "ranged",
            Self::Prayer => "prayer",
            Self::Mining => "mining",
            Self::Woodcutting => "woodcutting",
            Self::Fishing => "fishing",
            Self::Farming => "farming",
            Self::Cooking => "cooking",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Total experience required to hold `level`.
///
/// Each level requires materially more experience than the last; the
/// curve doubles roughly every seven levels. Level 1 requires nothing.
pub fn experience_for_level(level: u32) -> f64 {
    let mut points = 0.0_f64;
    for l in 1..level {
        points += (l as f64 + 300.0 * 2.0_f64.powf(l as f64 / 7.0)).floor();
    }
    (points / 4.0).floor()
}

/// Derive the level held at an experience total
pub fn level_for_experience(experience: f64) -> u32 {
    let mut level = 1;
    while level < MAX_LEVEL && experience >= experience_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Per-player skill levels with a parallel experience table.
///
/// Levels only ever increase through [`SkillSet::add_experience`]; the
/// experience total never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSet {
    levels: [u32; 12],
    experience: [f64; 12],
}

impl SkillSet {
    /// The spread a fresh account starts with
    pub fn starting() -> Self {
        let mut skills = Self {
            levels: [1; 12],
            experience: [0.0; 12],
        };
        skills.levels[Skill::Hitpoints.index()] = 10;
        skills.experience[Skill::Hitpoints.index()] = experience_for_level(10);
        skills.experience[Skill::Fishing.index()] = 1.0;
        skills
    }

    pub fn level(&self, skill: Skill) -> u32 {
        self.levels[skill.index()]
    }

    pub fn experience(&self, skill: Skill) -> f64 {
        self.experience[skill.index()]
    }

    /// Add experience and absorb any level-ups it pays for.
    /// Returns the number of levels gained (one large grant can pay for
    /// several at once).
    pub fn add_experience(&mut self, skill: Skill, amount: f64) -> u32 {
        if amount <= 0.0 {
            return 0;
        }
        let i = skill.index();
        self.experience[i] += amount;
        let mut gained = 0;
        while self.levels[i] < MAX_LEVEL
            && self.experience[i] >= experience_for_level(self.levels[i] + 1)
        {
            self.levels[i] += 1;
            gained += 1;
        }
        gained
    }

    /// Combined combat level used for PvP matchmaking checks
    pub fn combat_level(&self) -> u32 {
        self.level(Skill::Attack) + self.level(Skill::Defense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_matches_known_thresholds() {
        assert_eq!(experience_for_level(1), 0.0);
        assert_eq!(experience_for_level(2), 83.0);
        assert_eq!(experience_for_level(3), 174.0);
        assert_eq!(experience_for_level(10), 1154.0);
    }

    #[test]
    fn curve_is_superlinear() {
        let mut previous_step = 0.0;
        for level in 2..=99 {
            let step = experience_for_level(level) - experience_for_level(level - 1);
            assert!(step > previous_step, "step shrank at level {}", level);
            previous_step = step;
        }
    }

    #[test]
    fn starting_spread() {
        let skills = SkillSet::starting();
        assert_eq!(skills.level(Skill::Hitpoints), 10);
        assert_eq!(skills.experience(Skill::Hitpoints), 1154.0);
        assert_eq!(skills.level(Skill::Attack), 1);
        assert_eq!(skills.experience(Skill::Fishing), 1.0);
    }

    #[test]
    fn three_small_grants_stay_below_level_two() {
        let mut skills = SkillSet::starting();
        let mut gained = 0;
        for _ in 0..3 {
            gained += skills.add_experience(Skill::Woodcutting, 25.0);
        }
        assert_eq!(skills.experience(Skill::Woodcutting), 75.0);
        assert_eq!(skills.level(Skill::Woodcutting), level_for_experience(75.0));
        assert_eq!(skills.level(Skill::Woodcutting), 1);
        assert_eq!(gained, 0);
    }

    #[test]
    fn one_large_grant_pays_for_multiple_levels() {
        let mut skills = SkillSet::starting();
        // 700 xp crosses the thresholds for levels 2..=7 (650) but not 8 (801)
        let gained = skills.add_experience(Skill::Mining, 700.0);
        assert_eq!(skills.level(Skill::Mining), 7);
        assert_eq!(gained, 6);
    }

    #[test]
    fn experience_is_monotonic() {
        let mut skills = SkillSet::starting();
        let before = skills.experience(Skill::Attack);
        skills.add_experience(Skill::Attack, -50.0);
        assert_eq!(skills.experience(Skill::Attack), before);
        skills.add_experience(Skill::Attack, 10.0);
        assert!(skills.experience(Skill::Attack) > before);
    }

    #[test]
    fn levels_cap_at_99() {
        let mut skills = SkillSet::starting();
        skills.add_experience(Skill::Cooking, 1e9);
        assert_eq!(skills.level(Skill::Cooking), MAX_LEVEL);
    }
}
