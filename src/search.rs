use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RoomConfig;
use crate::dict::Dictionary;
use crate::game::board::Grid;
use crate::game::scoring::{score_path, ScoreRules};
use crate::game::solver::{solve_grid, Quality, SolvedMap};
use std::sync::Arc;

const BASE_ATTEMPT_BUDGET: u32 = 40;
const SPEED_WORD_SCORE: u32 = 5;
const BONUS_LETTER_VALUE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Normal,
    Speed,
    Monstrous,
    TargetLong,
    TargetScore,
    BonusLetter,
}

impl RoundKind {
    pub fn is_special(self) -> bool {
        !matches!(self, RoundKind::Normal)
    }

    /// Bonus tiles would undermine these modes' scoring, so their grids are
    /// stripped after generation.
    pub fn strips_bonus_tiles(self) -> bool {
        matches!(
            self,
            RoundKind::Speed | RoundKind::TargetLong | RoundKind::BonusLetter
        )
    }
}

/// The variant rules and acceptance thresholds for one upcoming round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub kind: RoundKind,
    pub min_words: usize,
    pub min_total_score: u32,
    pub min_long_word_len: usize,
    pub min_long_word_count: usize,
    pub bonus_letter_min_words: usize,
    pub fixed_word_score: Option<u32>,
    pub attempt_budget: u32,
}

impl RoundPlan {
    pub fn normal(min_words: usize) -> Self {
        Self {
            kind: RoundKind::Normal,
            min_words,
            min_total_score: 0,
            min_long_word_len: 0,
            min_long_word_count: 0,
            bonus_letter_min_words: 0,
            fixed_word_score: None,
            attempt_budget: BASE_ATTEMPT_BUDGET,
        }
    }

    pub fn special(kind: RoundKind, cfg: &RoomConfig) -> Self {
        let mut plan = Self::normal(cfg.min_words);
        plan.kind = kind;
        match kind {
            RoundKind::Normal => {}
            RoundKind::Speed => {
                plan.min_words = cfg.min_words * 2;
                plan.fixed_word_score = Some(SPEED_WORD_SCORE);
                plan.attempt_budget = BASE_ATTEMPT_BUDGET * 4;
            }
            RoundKind::Monstrous => {
                plan.min_total_score = cfg.min_words as u32 * 25;
                plan.min_long_word_len = 8;
                plan.min_long_word_count = 2;
                plan.attempt_budget = BASE_ATTEMPT_BUDGET * 5;
            }
            RoundKind::TargetLong | RoundKind::TargetScore => {
                plan.attempt_budget = BASE_ATTEMPT_BUDGET * 6;
            }
            RoundKind::BonusLetter => {
                plan.bonus_letter_min_words = (cfg.min_words / 3).max(5);
                plan.attempt_budget = BASE_ATTEMPT_BUDGET * 4;
            }
        }
        plan
    }

    /// Plan for a given round number, following the room's rotation: every
    /// `special_every`-th round is special, alternating between the room's
    /// two configured special kinds.
    pub fn for_round(round_number: u64, cfg: &RoomConfig) -> Self {
        if cfg.special_every > 0 && round_number % cfg.special_every == 0 {
            let slot = round_number / cfg.special_every;
            Self::special(cfg.special_kinds[(slot % 2) as usize], cfg)
        } else {
            Self::normal(cfg.min_words)
        }
    }
}

/// The unique best word of a target round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWord {
    pub word: String,
    pub len: usize,
    pub points: u32,
}

/// The designated letter of a bonus-letter round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusLetterPick {
    pub letter: char,
    pub value: u32,
    pub word_count: usize,
}

/// A grid ready to be played: the ground truth for one round.
#[derive(Debug, Clone)]
pub struct PreparedRound {
    pub round_number: u64,
    pub grid: Grid,
    pub plan: RoundPlan,
    pub solved: SolvedMap,
    pub quality: Quality,
    pub target: Option<TargetWord>,
    pub bonus_letter: Option<BonusLetterPick>,
}

impl PreparedRound {
    pub fn score_rules(&self) -> ScoreRules {
        match self.plan.kind {
            RoundKind::Speed => {
                ScoreRules::FixedPerWord(self.plan.fixed_word_score.unwrap_or(SPEED_WORD_SCORE))
            }
            RoundKind::TargetLong => ScoreRules::BareLetters,
            RoundKind::BonusLetter => match &self.bonus_letter {
                Some(pick) => ScoreRules::BonusLetter {
                    letter: pick.letter,
                    value: pick.value,
                },
                None => ScoreRules::BareLetters,
            },
            _ => ScoreRules::Standard,
        }
    }
}

enum Acceptance {
    Accept {
        target: Option<TargetWord>,
        bonus_letter: Option<BonusLetterPick>,
    },
    Reject,
}

/// Generates candidate grids until one meets the plan's acceptance test or
/// the attempt budget runs out. Never fails: when the budget is exhausted the
/// best-seen candidate is returned with a warning.
#[derive(Debug, Clone)]
pub struct GridSearch {
    dict: Arc<Dictionary>,
}

impl GridSearch {
    pub fn new(dict: Arc<Dictionary>) -> Self {
        Self { dict }
    }

    pub fn prepare<R: Rng>(
        &self,
        size: usize,
        round_number: u64,
        plan: RoundPlan,
        rng: &mut R,
    ) -> PreparedRound {
        let budget = plan.attempt_budget.max(1);
        let rules = provisional_rules(&plan);
        let mut best: Option<(f64, PreparedRound)> = None;

        for attempt in 1..=budget {
            let mut grid = Grid::sample(size, rng);
            grid.place_bonuses(rng);
            if plan.kind.strips_bonus_tiles() {
                grid.strip_bonuses();
            }

            let solved = solve_grid(&grid, &self.dict, &rules);
            let quality = Quality::of(&solved);

            match self.evaluate(&plan, &grid, &solved, &quality) {
                Acceptance::Accept {
                    target,
                    bonus_letter,
                } => {
                    debug!(
                        kind = ?plan.kind,
                        attempt,
                        words = quality.words,
                        "grid accepted"
                    );
                    let mut prepared = PreparedRound {
                        round_number,
                        grid,
                        plan,
                        solved,
                        quality,
                        target,
                        bonus_letter,
                    };
                    apply_final_rules(&mut prepared);
                    return prepared;
                }
                Acceptance::Reject => {
                    let composite = quality.composite();
                    if best.as_ref().map_or(true, |(seen, _)| composite > *seen) {
                        best = Some((
                            composite,
                            PreparedRound {
                                round_number,
                                grid,
                                plan: plan.clone(),
                                solved,
                                quality,
                                target: None,
                                bonus_letter: None,
                            },
                        ));
                    }
                }
            }
        }

        let (_, mut fallback) = best.expect("at least one attempt was made");
        warn!(
            kind = ?fallback.plan.kind,
            budget,
            words = fallback.quality.words,
            total_score = fallback.quality.total_score,
            "grid search exhausted its budget, settling for the best candidate seen"
        );
        apply_final_rules(&mut fallback);
        fallback
    }

    /// Solves an arbitrary grid with standard rules, for offline analysis.
    pub fn analyze(&self, grid: &Grid) -> (SolvedMap, Quality) {
        let solved = solve_grid(grid, &self.dict, &ScoreRules::Standard);
        let quality = Quality::of(&solved);
        (solved, quality)
    }

    fn evaluate(
        &self,
        plan: &RoundPlan,
        grid: &Grid,
        solved: &SolvedMap,
        quality: &Quality,
    ) -> Acceptance {
        // Degraded mode: without a dictionary there is nothing to gate on.
        if self.dict.is_empty() {
            return Acceptance::Accept {
                target: None,
                bonus_letter: None,
            };
        }

        match plan.kind {
            RoundKind::Normal | RoundKind::Speed => {
                if quality.words >= plan.min_words {
                    Acceptance::Accept {
                        target: None,
                        bonus_letter: None,
                    }
                } else {
                    Acceptance::Reject
                }
            }
            RoundKind::Monstrous => {
                let long_enough = solved
                    .keys()
                    .filter(|w| w.chars().count() >= plan.min_long_word_len)
                    .count();
                if quality.total_score >= plan.min_total_score
                    && quality.longest >= plan.min_long_word_len
                    && long_enough >= plan.min_long_word_count
                {
                    Acceptance::Accept {
                        target: None,
                        bonus_letter: None,
                    }
                } else {
                    Acceptance::Reject
                }
            }
            RoundKind::TargetLong => match unique_max(solved, |word, _| word.chars().count()) {
                Some(target) => Acceptance::Accept {
                    target: Some(target),
                    bonus_letter: None,
                },
                None => Acceptance::Reject,
            },
            RoundKind::TargetScore => {
                match unique_max(solved, |_, entry| entry.points as usize) {
                    Some(target) => Acceptance::Accept {
                        target: Some(target),
                        bonus_letter: None,
                    },
                    None => Acceptance::Reject,
                }
            }
            RoundKind::BonusLetter => {
                match pick_bonus_letter(grid, solved, plan.bonus_letter_min_words) {
                    Some(pick) => Acceptance::Accept {
                        target: None,
                        bonus_letter: Some(pick),
                    },
                    None => Acceptance::Reject,
                }
            }
        }
    }
}

fn provisional_rules(plan: &RoundPlan) -> ScoreRules {
    match plan.kind {
        RoundKind::Speed => {
            ScoreRules::FixedPerWord(plan.fixed_word_score.unwrap_or(SPEED_WORD_SCORE))
        }
        RoundKind::TargetLong | RoundKind::BonusLetter => ScoreRules::BareLetters,
        _ => ScoreRules::Standard,
    }
}

/// Once the bonus letter is chosen the snapshot is re-scored under the final
/// rules. Paths stay optimal: without tile bonuses every path for a word
/// scores the same.
fn apply_final_rules(prepared: &mut PreparedRound) {
    let Some(pick) = prepared.bonus_letter.clone() else {
        return;
    };
    let rules = ScoreRules::BonusLetter {
        letter: pick.letter,
        value: pick.value,
    };
    for (word, entry) in prepared.solved.iter_mut() {
        entry.points = score_path(word, &entry.path, &prepared.grid, &rules);
    }
    prepared.quality = Quality::of(&prepared.solved);
}

/// The word maximizing `measure`, or None when the maximum is tied; an
/// ambiguous target is not acceptable.
fn unique_max<F>(solved: &SolvedMap, measure: F) -> Option<TargetWord>
where
    F: Fn(&str, &crate::game::solver::SolvedWord) -> usize,
{
    let mut top: Option<(usize, usize, TargetWord)> = None;
    for (word, entry) in solved {
        let value = measure(word, entry);
        match &mut top {
            Some((best, count, target)) => {
                if value > *best {
                    *best = value;
                    *count = 1;
                    *target = TargetWord {
                        word: word.clone(),
                        len: word.chars().count(),
                        points: entry.points,
                    };
                } else if value == *best {
                    *count += 1;
                }
            }
            None => {
                top = Some((
                    value,
                    1,
                    TargetWord {
                        word: word.clone(),
                        len: word.chars().count(),
                        points: entry.points,
                    },
                ));
            }
        }
    }
    match top {
        Some((_, 1, target)) => Some(target),
        _ => None,
    }
}

/// The grid letter contained in the most solvable words, provided it reaches
/// the minimum occurrence count. Ties break alphabetically.
fn pick_bonus_letter(
    grid: &Grid,
    solved: &SolvedMap,
    min_words: usize,
) -> Option<BonusLetterPick> {
    let mut counts = [0usize; 26];
    for word in solved.keys() {
        let mut seen = [false; 26];
        for b in word.bytes() {
            seen[(b - b'a') as usize] = true;
        }
        for (slot, present) in seen.iter().enumerate() {
            if *present {
                counts[slot] += 1;
            }
        }
    }

    grid.distinct_letters()
        .into_iter()
        .map(|letter| (letter, counts[(letter as u8 - b'a') as usize]))
        .filter(|(_, count)| *count >= min_words.max(1))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(letter, word_count)| BonusLetterPick {
            letter,
            value: BONUS_LETTER_VALUE,
            word_count,
        })
}
