//! Movement validation.
//!
//! Keeps entities inside the world and off the water. This is not
//! pathfinding: an illegal destination is redirected to nearby dry
//! ground, or refused by echoing the current position back.

use runeworld_shared::{WORLD_WIDTH, WORLD_HEIGHT};

use super::terrain::TerrainMap;

/// Ring search step and bound for the water redirect
const RING_STEP: f32 = 32.0;
const RING_MAX: f32 = 128.0;

/// Directions probed on each ring
const RING_ANGLES: usize = 8;

pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

/// Validate a requested destination.
///
/// The target is clamped into world bounds. A water target is redirected
/// to the nearest non-water point found on expanding rings around it; if
/// every probe within the search bound is water the move is refused and
/// `current` is returned unchanged, so re-requesting an accepted position
/// is a no-op.
pub fn validate_move(terrain: &TerrainMap, current: [f32; 2], target: [f32; 2]) -> [f32; 2] {
    let tx = target[0].clamp(0.0, WORLD_WIDTH);
    let ty = target[1].clamp(0.0, WORLD_HEIGHT);

    if terrain.is_walkable(tx, ty) {
        return [tx, ty];
    }

    let mut radius = RING_STEP;
    while radius <= RING_MAX {
        for i in 0..RING_ANGLES {
            let angle = i as f32 * (2.0 * std::f32::consts::PI / RING_ANGLES as f32);
            let cx = (tx + radius * angle.cos()).clamp(0.0, WORLD_WIDTH);
            let cy = (ty + radius * angle.sin()).clamp(0.0, WORLD_HEIGHT);
            if terrain.is_walkable(cx, cy) {
                return [cx, cy];
            }
        }
        radius += RING_STEP;
    }

    current
}
