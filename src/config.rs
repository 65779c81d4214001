use std::env;
use std::path::PathBuf;

use crate::search::RoundKind;

/// Process-level settings, read from the environment the usual way.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub wordlist: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse::<u16>()
                .expect("Invalid HTTP_PORT"),
            wordlist: PathBuf::from(env::var("WORDLIST").unwrap_or_else(|_| "wordlist".to_string())),
        }
    }
}

/// Static description of one room. The roster is fixed at startup, one room
/// per grid-size variant.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub id: String,
    pub label: String,
    pub grid_size: usize,
    pub round_ms: u64,
    pub break_ms: u64,
    pub min_words: usize,
    /// Every Nth round is special; 0 disables special rounds.
    pub special_every: u64,
    /// The two special kinds the special slots alternate between.
    pub special_kinds: [RoundKind; 2],
}

pub fn default_rooms() -> Vec<RoomConfig> {
    vec![
        RoomConfig {
            id: "compact".to_string(),
            label: "Compact 4x4".to_string(),
            grid_size: 4,
            round_ms: 180_000,
            break_ms: 20_000,
            min_words: 25,
            special_every: 5,
            special_kinds: [RoundKind::Speed, RoundKind::TargetLong],
        },
        RoomConfig {
            id: "classic".to_string(),
            label: "Classic 5x5".to_string(),
            grid_size: 5,
            round_ms: 180_000,
            break_ms: 20_000,
            min_words: 45,
            special_every: 5,
            special_kinds: [RoundKind::BonusLetter, RoundKind::TargetScore],
        },
        RoomConfig {
            id: "grand".to_string(),
            label: "Grand 6x6".to_string(),
            grid_size: 6,
            round_ms: 240_000,
            break_ms: 25_000,
            min_words: 80,
            special_every: 5,
            special_kinds: [RoundKind::Monstrous, RoundKind::TargetLong],
        },
    ]
}

#[cfg(test)]
pub fn test_room(grid_size: usize) -> RoomConfig {
    RoomConfig {
        id: "test".to_string(),
        label: "Test room".to_string(),
        grid_size,
        round_ms: 300,
        break_ms: 100,
        min_words: 1,
        special_every: 5,
        special_kinds: [RoundKind::Speed, RoundKind::TargetLong],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rooms_have_distinct_sizes_and_ids() {
        let rooms = default_rooms();
        let mut ids: Vec<_> = rooms.iter().map(|r| r.id.clone()).collect();
        let mut sizes: Vec<_> = rooms.iter().map(|r| r.grid_size).collect();
        ids.dedup();
        sizes.dedup();
        assert_eq!(ids.len(), rooms.len());
        assert_eq!(sizes.len(), rooms.len());
    }

    #[test]
    fn test_all_round_kinds_reachable_from_defaults() {
        let mut kinds: Vec<RoundKind> = default_rooms()
            .iter()
            .flat_map(|r| r.special_kinds)
            .collect();
        kinds.push(RoundKind::Normal);
        for kind in [
            RoundKind::Normal,
            RoundKind::Speed,
            RoundKind::Monstrous,
            RoundKind::TargetLong,
            RoundKind::TargetScore,
            RoundKind::BonusLetter,
        ] {
            assert!(kinds.contains(&kind), "{:?} unreachable", kind);
        }
    }
}
