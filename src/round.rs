use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::SubmitError;
use crate::events::{AnnouncementKind, PlayerResult, RankEntry, RecordMetric};
use crate::game::board::Grid;
use crate::game::letters::normalize;
use crate::game::scoring::ScoreRules;
use crate::game::solver::{Quality, SolvedMap};
use crate::search::{BonusLetterPick, PreparedRound, RoundPlan, TargetWord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Finished,
}

/// One player's slice of the submission ledger. Append-only while the round
/// runs, read-only afterwards.
#[derive(Debug, Clone)]
struct PlayerLedger {
    nick: String,
    words: HashSet<String>,
    score: u32,
}

/// Per-round ledger. Entry order is the ranking tie-break: seed order at
/// round start, then first-accepted-submission order for later joiners.
#[derive(Debug, Default)]
struct Ledger {
    entries: Vec<PlayerLedger>,
    index: HashMap<String, usize>,
}

impl Ledger {
    fn entry_mut(&mut self, nick: &str) -> &mut PlayerLedger {
        let slot = match self.index.get(nick) {
            Some(slot) => *slot,
            None => {
                self.entries.push(PlayerLedger {
                    nick: nick.to_string(),
                    words: HashSet::new(),
                    score: 0,
                });
                let slot = self.entries.len() - 1;
                self.index.insert(nick.to_string(), slot);
                slot
            }
        };
        &mut self.entries[slot]
    }
}

/// Tracks one record metric through a round: the observed leader, who is
/// tied at that value, and the solver-computed ceiling.
#[derive(Debug)]
struct RecordTrack {
    metric: RecordMetric,
    best: u32,
    holders: HashSet<String>,
    ceiling: u32,
    superlative_fired: bool,
    superlative_by: HashSet<String>,
}

impl RecordTrack {
    fn new(metric: RecordMetric, ceiling: u32) -> Self {
        Self {
            metric,
            best: 0,
            holders: HashSet::new(),
            ceiling,
            superlative_fired: false,
            superlative_by: HashSet::new(),
        }
    }

    fn note_leader(&mut self, nick: &str, value: u32) {
        if value > self.best {
            self.best = value;
            self.holders.clear();
            self.holders.insert(nick.to_string());
        } else if value == self.best && self.best > 0 {
            self.holders.insert(nick.to_string());
        }
    }

    fn observe(&mut self, nick: &str, word: &str, value: u32) -> Option<AnnouncementKind> {
        if self.ceiling > 0 && value >= self.ceiling {
            self.note_leader(nick, value);
            if self.superlative_by.insert(nick.to_string()) {
                self.superlative_fired = true;
                return Some(AnnouncementKind::Superlative {
                    nick: nick.to_string(),
                    metric: self.metric,
                    word: word.to_string(),
                    value,
                });
            }
            return None;
        }

        if self.superlative_fired {
            self.note_leader(nick, value);
            return None;
        }

        if value > self.best {
            self.note_leader(nick, value);
            return Some(AnnouncementKind::Record {
                nick: nick.to_string(),
                metric: self.metric,
                word: word.to_string(),
                value,
            });
        }
        if value == self.best && self.best > 0 && !self.holders.contains(nick) {
            self.holders.insert(nick.to_string());
            return Some(AnnouncementKind::Equalized {
                nick: nick.to_string(),
                metric: self.metric,
                word: word.to_string(),
                value,
            });
        }
        None
    }
}

/// Record state for one round, reset at every round start.
#[derive(Debug)]
struct RoomRecords {
    longest: RecordTrack,
    top: RecordTrack,
}

impl RoomRecords {
    fn new(solved: &SolvedMap) -> Self {
        let ceiling_len = solved
            .keys()
            .map(|w| w.chars().count() as u32)
            .max()
            .unwrap_or(0);
        let ceiling_points = solved.values().map(|s| s.points).max().unwrap_or(0);
        Self {
            longest: RecordTrack::new(RecordMetric::LongestWord, ceiling_len),
            top: RecordTrack::new(RecordMetric::TopWord, ceiling_points),
        }
    }
}

/// An accepted submission: the normalized word, its score, the player's new
/// total, and any record announcements it produced.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub word: String,
    pub word_score: u32,
    pub total_score: u32,
    pub notes: Vec<AnnouncementKind>,
}

/// One live (or just-finished) round in a room. Owns the grid, the solved
/// snapshot, the submission ledger and the record trackers.
#[derive(Debug)]
pub struct Round {
    pub id: String,
    pub number: u64,
    pub grid: Grid,
    pub plan: RoundPlan,
    pub rules: ScoreRules,
    pub solved: SolvedMap,
    pub quality: Quality,
    pub target: Option<TargetWord>,
    pub bonus_letter: Option<BonusLetterPick>,
    pub ends_at: DateTime<Utc>,
    status: Status,
    ledger: Ledger,
    records: RoomRecords,
    target_found_by: Option<String>,
}

impl Round {
    /// Starts a round from a prepared grid, seeding the ledger with one
    /// empty entry per connected player.
    pub fn start(prepared: PreparedRound, duration_ms: u64, players: &[String]) -> Self {
        let rules = prepared.score_rules();
        let records = RoomRecords::new(&prepared.solved);
        let mut ledger = Ledger::default();
        for nick in players {
            ledger.entry_mut(nick);
        }
        Self {
            id: format!("{}-{:x}", prepared.round_number, Utc::now().timestamp_millis()),
            number: prepared.round_number,
            grid: prepared.grid,
            plan: prepared.plan,
            rules,
            solved: prepared.solved,
            quality: prepared.quality,
            target: prepared.target,
            bonus_letter: prepared.bonus_letter,
            ends_at: Utc::now() + chrono::Duration::milliseconds(duration_ms as i64),
            status: Status::Running,
            ledger,
            records,
            target_found_by: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Validates and records one submission. Rejections come back as tagged
    /// errors; an accepted word updates the ledger and the record trackers.
    pub fn submit(
        &mut self,
        round_id: &str,
        nick: &str,
        raw_word: &str,
    ) -> Result<SubmitOutcome, SubmitError> {
        if self.status != Status::Running || round_id != self.id {
            return Err(SubmitError::RoundInvalid);
        }
        if nick.is_empty() {
            return Err(SubmitError::NotLoggedIn);
        }
        let word = normalize(raw_word);
        if word.is_empty() {
            return Err(SubmitError::EmptyWord);
        }
        let Some(entry) = self.solved.get(&word) else {
            return Err(SubmitError::InvalidWord);
        };
        let word_score = entry.points;
        let word_len = word.chars().count() as u32;

        let player = self.ledger.entry_mut(nick);
        if player.words.contains(&word) {
            return Err(SubmitError::AlreadyPlayed);
        }
        player.words.insert(word.clone());
        player.score += word_score;
        let total_score = player.score;

        if let Some(target) = &self.target {
            if target.word == word && self.target_found_by.is_none() {
                self.target_found_by = Some(nick.to_string());
            }
        }

        let mut notes = Vec::new();
        notes.extend(self.records.longest.observe(nick, &word, word_len));
        notes.extend(self.records.top.observe(nick, &word, word_score));

        Ok(SubmitOutcome {
            word,
            word_score,
            total_score,
            notes,
        })
    }

    /// Live ranking, best score first. Ties share a rank and keep ledger
    /// order.
    pub fn ranking(&self) -> Vec<RankEntry> {
        let mut order: Vec<&PlayerLedger> = self.ledger.entries.iter().collect();
        order.sort_by(|a, b| b.score.cmp(&a.score));
        let mut ranking = Vec::with_capacity(order.len());
        let mut last_score = None;
        let mut rank = 0u32;
        for (position, player) in order.iter().enumerate() {
            if last_score != Some(player.score) {
                rank = position as u32 + 1;
                last_score = Some(player.score);
            }
            ranking.push(RankEntry {
                nick: player.nick.clone(),
                rank,
            });
        }
        ranking
    }

    /// The two leading scores, for close-fight detection.
    pub fn close_fight(&self, margin: u32, floor: u32) -> Option<AnnouncementKind> {
        let mut scores: Vec<&PlayerLedger> = self.ledger.entries.iter().collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        let (first, second) = match (scores.first(), scores.get(1)) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };
        if second.score < floor {
            return None;
        }
        let gap = first.score - second.score;
        if gap > margin {
            return None;
        }
        Some(AnnouncementKind::Duel {
            leaders: vec![first.nick.clone(), second.nick.clone()],
            gap,
        })
    }

    pub fn target_reveal(&self) -> Option<AnnouncementKind> {
        self.target.as_ref().map(|target| AnnouncementKind::TargetRevealed {
            word: target.word.clone(),
            found_by: self.target_found_by.clone(),
        })
    }

    /// Finalizes the round. Idempotent: the second call returns None and
    /// must emit nothing.
    pub fn finalize(&mut self) -> Option<Vec<PlayerResult>> {
        if self.status == Status::Finished {
            return None;
        }
        self.status = Status::Finished;

        let mut order: Vec<&PlayerLedger> = self.ledger.entries.iter().collect();
        order.sort_by(|a, b| b.score.cmp(&a.score));
        Some(
            order
                .into_iter()
                .map(|player| {
                    let mut words: Vec<String> = player.words.iter().cloned().collect();
                    words.sort();
                    PlayerResult {
                        nick: player.nick.clone(),
                        score: player.score,
                        words,
                    }
                })
                .collect(),
        )
    }
}
