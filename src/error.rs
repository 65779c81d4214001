use serde::Serialize;
use thiserror::Error;

/// Why a word submission was rejected. Returned to the caller as a tagged
/// result, never thrown and never logged as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitError {
    #[error("unknown room")]
    InvalidRoom,
    #[error("round id is not the room's current round")]
    RoundInvalid,
    #[error("word is empty after normalization")]
    EmptyWord,
    #[error("word cannot be played on this grid")]
    InvalidWord,
    #[error("word was already played by this player")]
    AlreadyPlayed,
    #[error("a nickname is required")]
    NotLoggedIn,
    #[error("no round is accepting submissions")]
    NoRoundSubs,
}

impl SubmitError {
    /// Stable wire code for this rejection.
    pub fn code(self) -> &'static str {
        match self {
            SubmitError::InvalidRoom => "invalid_room",
            SubmitError::RoundInvalid => "round_invalid",
            SubmitError::EmptyWord => "empty_word",
            SubmitError::InvalidWord => "invalid_word",
            SubmitError::AlreadyPlayed => "already_played",
            SubmitError::NotLoggedIn => "not_logged_in",
            SubmitError::NoRoundSubs => "no_round_subs",
        }
    }
}

/// Failure of the grid-search worker. Callers are expected to retry; the
/// pool respawns the worker on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("grid search worker crashed")]
    Crashed,
    #[error("grid search worker is restarting")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_serde_tags() {
        for error in [
            SubmitError::InvalidRoom,
            SubmitError::RoundInvalid,
            SubmitError::EmptyWord,
            SubmitError::InvalidWord,
            SubmitError::AlreadyPlayed,
            SubmitError::NotLoggedIn,
            SubmitError::NoRoundSubs,
        ] {
            let json = serde_json::to_string(&error).unwrap();
            assert_eq!(json, format!("\"{}\"", error.code()));
        }
    }
}
