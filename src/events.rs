use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::game::board::Grid;
use crate::game::solver::Quality;
use crate::search::RoundKind;

/// Everything the round engine tells the outside world. Collaborators
/// (socket layer, bots, loggers) subscribe through the `EventBus`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RoundStarted {
        room_id: String,
        round_id: String,
        round_number: u64,
        grid: Grid,
        grid_size: usize,
        ends_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        special: Option<SpecialInfo>,
        quality: Quality,
    },
    /// Scores are intentionally omitted; only ranks are broadcast.
    RankingUpdate {
        room_id: String,
        round_id: String,
        ranking: Vec<RankEntry>,
    },
    RoundEnded {
        room_id: String,
        round_id: String,
        results: Vec<PlayerResult>,
    },
    BreakStarted {
        room_id: String,
        next_start_at: DateTime<Utc>,
    },
    Announcement(Announcement),
}

#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub nick: String,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerResult {
    pub nick: String,
    pub score: u32,
    pub words: Vec<String>,
}

/// What players need to know about a special round when it starts. The
/// target word itself is never included here.
#[derive(Debug, Clone, Serialize)]
pub struct SpecialInfo {
    pub kind: RoundKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_word_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_letter: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_letter_value: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMetric {
    LongestWord,
    TopWord,
}

impl RecordMetric {
    fn label(self) -> &'static str {
        match self {
            RecordMetric::LongestWord => "longest word",
            RecordMetric::TopWord => "top-scoring word",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnouncementKind {
    /// The solver-proven best possible value for this metric was reached.
    Superlative {
        nick: String,
        metric: RecordMetric,
        word: String,
        value: u32,
    },
    /// A new in-round record for this metric.
    Record {
        nick: String,
        metric: RecordMetric,
        word: String,
        value: u32,
    },
    /// The current record for this metric was tied.
    Equalized {
        nick: String,
        metric: RecordMetric,
        word: String,
        value: u32,
    },
    Duel {
        leaders: Vec<String>,
        gap: u32,
    },
    TimeLeft {
        seconds: u32,
    },
    TargetRevealed {
        word: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        found_by: Option<String>,
    },
}

impl AnnouncementKind {
    fn text(&self) -> String {
        match self {
            AnnouncementKind::Superlative {
                nick,
                metric,
                word,
                value,
            } => format!(
                "{} found {}, the best possible {} on this grid ({})!",
                nick,
                word.to_uppercase(),
                metric.label(),
                value
            ),
            AnnouncementKind::Record {
                nick,
                metric,
                word,
                value,
            } => format!(
                "{} takes the {} record with {} ({})",
                nick,
                metric.label(),
                word.to_uppercase(),
                value
            ),
            AnnouncementKind::Equalized {
                nick,
                metric,
                word,
                value,
            } => format!(
                "{} ties the {} record with {} ({})",
                nick,
                metric.label(),
                word.to_uppercase(),
                value
            ),
            AnnouncementKind::Duel { leaders, gap } => format!(
                "Close fight between {} ({} points apart)!",
                leaders.join(" and "),
                gap
            ),
            AnnouncementKind::TimeLeft { seconds } => format!("{} seconds left!", seconds),
            AnnouncementKind::TargetRevealed { word, found_by } => match found_by {
                Some(nick) => format!(
                    "The target word was {}, found by {}",
                    word.to_uppercase(),
                    nick
                ),
                None => format!("The target word was {}; nobody found it", word.to_uppercase()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub room_id: String,
    #[serde(flatten)]
    pub kind: AnnouncementKind,
    pub text: String,
}

impl Announcement {
    pub fn new(room_id: &str, kind: AnnouncementKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            room_id: room_id.to_string(),
            text: kind.text(),
            kind,
        }
    }
}

/// Process-wide broadcast channel for outbound events. Emitting never fails;
/// events are dropped when nobody is subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_serializes_flat() {
        let announcement = Announcement::new(
            "classic",
            AnnouncementKind::Record {
                nick: "alice".into(),
                metric: RecordMetric::LongestWord,
                word: "avion".into(),
                value: 5,
            },
        );
        let json = serde_json::to_value(&announcement).unwrap();
        assert_eq!(json["type"], "record");
        assert_eq!(json["room_id"], "classic");
        assert_eq!(json["metric"], "longest_word");
        assert!(json["text"].as_str().unwrap().contains("AVION"));
    }

    #[test]
    fn test_event_bus_fans_out() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(Event::BreakStarted {
            room_id: "classic".into(),
            next_start_at: Utc::now(),
        });
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::BreakStarted { .. }));
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        bus.emit(Event::BreakStarted {
            room_id: "classic".into(),
            next_start_at: Utc::now(),
        });
    }
}
