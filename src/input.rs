//! Text input mapping for front-ends: keys and words to grid commands.

use crate::engine::Move;

/// A single user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Move),
    Restart,
    Quit,
}

/// Map WASD, vi keys (hjkl) or a direction word to a [`Move`]. Case-insensitive.
pub fn parse_direction(input: &str) -> Option<Move> {
    match input.trim().to_ascii_lowercase().as_str() {
        "w" | "k" | "up" => Some(Move::Up),
        "s" | "j" | "down" => Some(Move::Down),
        "a" | "h" | "left" => Some(Move::Left),
        "d" | "l" | "right" => Some(Move::Right),
        _ => None,
    }
}

pub fn parse_command(input: &str) -> Option<Command> {
    if let Some(dir) = parse_direction(input) {
        return Some(Command::Move(dir));
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "r" | "restart" => Some(Command::Restart),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_and_vi_keys() {
        assert_eq!(parse_direction("w"), Some(Move::Up));
        assert_eq!(parse_direction("A"), Some(Move::Left));
        assert_eq!(parse_direction("s"), Some(Move::Down));
        assert_eq!(parse_direction("d"), Some(Move::Right));
        assert_eq!(parse_direction("k"), Some(Move::Up));
        assert_eq!(parse_direction("l"), Some(Move::Right));
    }

    #[test]
    fn direction_words() {
        assert_eq!(parse_direction(" Up \n"), Some(Move::Up));
        assert_eq!(parse_direction("RIGHT"), Some(Move::Right));
        assert_eq!(parse_direction("sideways"), None);
        assert_eq!(parse_direction(""), None);
    }

    #[test]
    fn commands() {
        assert_eq!(parse_command("left"), Some(Command::Move(Move::Left)));
        assert_eq!(parse_command("r"), Some(Command::Restart));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("x"), None);
    }
}
