//! Chat command system for admin and player commands.

use crate::world::World;

/// Result of executing a command
pub struct CommandResult {
    /// Whether the command was successful
    pub success: bool,
    /// Message to display to the user
    pub message: String,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// Parse and execute a chat command.
/// Returns None if it's not a command (doesn't start with /).
pub fn parse_and_execute(
    content: &str,
    player_id: u64,
    is_admin: bool,
    world: &mut World,
) -> Option<CommandResult> {
    if !content.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = content[1..].split_whitespace().collect();
    if parts.is_empty() {
        return Some(CommandResult::error("Invalid command"));
    }

    let command = parts[0].to_lowercase();
    let args = &parts[1..];

    Some(match command.as_str() {
        // === All player commands ===
        "help" => cmd_help(is_admin),
        "pos" => cmd_pos(player_id, world),
        "players" => cmd_players(world),

        // === Admin-only commands ===
        "spawn" => {
            if !is_admin {
                CommandResult::error("This command requires admin privileges")
            } else {
                cmd_spawn(player_id, args, world)
            }
        }

        _ => CommandResult::error(format!("Unknown command: /{}", command)),
    })
}

fn cmd_help(is_admin: bool) -> CommandResult {
    let mut text = String::from("Commands: /help, /pos, /players");
    if is_admin {
        text.push_str(" | Admin: /spawn <name> [hp level damage] [x y]");
    }
    CommandResult::success(text)
}

fn cmd_pos(player_id: u64, world: &World) -> CommandResult {
    match world.player(player_id) {
        Some(player) => CommandResult::success(format!(
            "Position: ({:.0}, {:.0})",
            player.position[0], player.position[1]
        )),
        None => CommandResult::error("Player not found"),
    }
}

fn cmd_players(world: &World) -> CommandResult {
    let names: Vec<&str> = world.players().map(|p| p.name.as_str()).collect();
    CommandResult::success(format!("{} online: {}", names.len(), names.join(", ")))
}

/// Spawn a hostile creature with a stat block. This is the command form
/// of the external "spawn monster" boundary: world tooling and game
/// masters inject creatures through it.
///
/// `/spawn goblin` uses the stock goblin block; a custom block is
/// `/spawn <name> <hp> <level> <damage>`. Either accepts a trailing
/// `<x> <y>`, defaulting to the caller's position.
fn cmd_spawn(player_id: u64, args: &[&str], world: &mut World) -> CommandResult {
    if args.is_empty() {
        return CommandResult::error("Usage: /spawn <name> [hp level damage] [x y]");
    }
    let name = args[0];

    let (stats, rest): ((u32, u32, u32), &[&str]) = if args.len() >= 4 {
        match (args[1].parse(), args[2].parse(), args[3].parse()) {
            (Ok(hp), Ok(level), Ok(damage)) => ((hp, level, damage), &args[4..]),
            _ => return CommandResult::error("Stat block must be numeric: <hp> <level> <damage>"),
        }
    } else if name == "goblin" {
        ((15, 2, 3), &args[1..])
    } else {
        return CommandResult::error("Unknown creature; give a stat block: <hp> <level> <damage>");
    };

    let position = match rest {
        [x, y] => match (x.parse::<f32>(), y.parse::<f32>()) {
            (Ok(x), Ok(y)) => [x, y],
            _ => return CommandResult::error("Coordinates must be numeric"),
        },
        [] => match world.player(player_id) {
            Some(player) => player.position,
            None => return CommandResult::error("Player not found"),
        },
        _ => return CommandResult::error("Usage: /spawn <name> [hp level damage] [x y]"),
    };

    if !world.terrain().is_walkable(position[0], position[1]) {
        return CommandResult::error("Can't spawn a creature in water");
    }

    let (hp, level, damage) = stats;
    let id = world.spawn_hostile(name, position, hp, level, damage);
    CommandResult::success(format!(
        "Spawned {} (id {}) at ({:.0}, {:.0})",
        name, id, position[0], position[1]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Player;
    use crate::world::terrain::TerrainMap;

    fn world_with_player() -> World {
        let mut world = World::new(TerrainMap::procedural());
        world.add_player(Player::new(1, "tester".into(), [1000.0, 1000.0]));
        world
    }

    #[test]
    fn non_commands_pass_through() {
        let mut world = world_with_player();
        assert!(parse_and_execute("hello there", 1, false, &mut world).is_none());
    }

    #[test]
    fn spawn_requires_admin() {
        let mut world = world_with_player();
        let npcs_before = world.npcs().count();
        let result = parse_and_execute("/spawn goblin", 1, false, &mut world).unwrap();
        assert!(!result.success);
        assert_eq!(world.npcs().count(), npcs_before);
    }

    #[test]
    fn admin_spawns_custom_stat_block() {
        let mut world = world_with_player();
        let result =
            parse_and_execute("/spawn ice_troll 60 12 8 400 1200", 1, true, &mut world).unwrap();
        assert!(result.success, "{}", result.message);
        let troll = world.npcs().find(|n| n.name == "ice_troll").unwrap();
        assert_eq!(troll.hp(), 60);
        assert_eq!(troll.level, 12);
        assert_eq!(troll.position, [400.0, 1200.0]);
    }

    #[test]
    fn spawn_rejects_water() {
        let mut world = world_with_player();
        let result = parse_and_execute("/spawn goblin 1000 100", 1, true, &mut world).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn pos_reports_current_position() {
        let mut world = world_with_player();
        let result = parse_and_execute("/pos", 1, false, &mut world).unwrap();
        assert!(result.success);
        assert!(result.message.contains("1000"));
    }
}
