//! PvP zones.
//!
//! Static configuration: rectangular regions where player-vs-player
//! damage is permitted under a combat-level tolerance rule.

/// A rectangular region permitting PvP combat
#[derive(Debug, Clone, Copy)]
pub struct PvpZone {
    pub name: &'static str,
    /// Top-left corner
    pub min: [f32; 2],
    /// Bottom-right corner
    pub max: [f32; 2],
    /// Allowed combat-level difference is `tolerance * 10`
    pub tolerance: u32,
}

impl PvpZone {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min[0] && x <= self.max[0] && y >= self.min[1] && y <= self.max[1]
    }

    /// Whether two combat levels are close enough to fight here
    pub fn allows(&self, a: u32, b: u32) -> bool {
        a.abs_diff(b) <= self.tolerance * 10
    }
}

/// The world's PvP zones; never mutated at runtime
pub const PVP_ZONES: &[PvpZone] = &[
    PvpZone {
        name: "Wilderness",
        min: [500.0, 100.0],
        max: [1500.0, 400.0],
        tolerance: 1,
    },
    PvpZone {
        name: "PvP Arena",
        min: [200.0, 800.0],
        max: [600.0, 1200.0],
        tolerance: 5,
    },
];

/// The zone covering a point, if any
pub fn zone_at(x: f32, y: f32) -> Option<&'static PvpZone> {
    PVP_ZONES.iter().find(|zone| zone.contains(x, y))
}
