use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dict::Dictionary;
use crate::game::board::{adjacency, Grid};
use crate::game::scoring::{score_path, ScoreRules};

pub const MIN_WORD_LEN: usize = 3;
pub const MAX_WORD_LEN: usize = 25;

/// Word length from which a word counts as "long" in the quality composite.
const LONG_WORD_LEN: usize = 7;

/// The best tile path found for one word, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedWord {
    pub path: Vec<usize>,
    pub points: u32,
}

/// word -> best path and score. The single source of truth for what a word
/// can be worth on a given grid.
pub type SolvedMap = HashMap<String, SolvedWord>;

/// Aggregate measures of how rewarding a grid is to play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    pub words: usize,
    pub longest: usize,
    pub long_words: usize,
    pub total_score: u32,
}

impl Quality {
    pub fn of(solved: &SolvedMap) -> Self {
        let mut quality = Quality {
            words: solved.len(),
            longest: 0,
            long_words: 0,
            total_score: 0,
        };
        for (word, entry) in solved {
            let len = word.chars().count();
            quality.longest = quality.longest.max(len);
            if len >= LONG_WORD_LEN {
                quality.long_words += 1;
            }
            quality.total_score += entry.points;
        }
        quality
    }

    /// Composite used to rank sub-threshold candidates during grid search.
    pub fn composite(&self) -> f64 {
        self.words as f64 + self.total_score as f64 / 500.0 + self.long_words as f64
    }
}

/// Exhaustive search for the highest-scoring tile path spelling
/// `word` (normalized) on `grid`. Among equal-scoring paths the first in
/// search order wins, so the result is deterministic. None if the word cannot
/// be spelled.
pub fn find_best_path(grid: &Grid, word: &str, rules: &ScoreRules) -> Option<SolvedWord> {
    if word.is_empty() {
        return None;
    }
    let mut best: Option<SolvedWord> = None;
    let mut path = Vec::with_capacity(word.len());
    let mut used = 0u64;
    for start in 0..grid.cell_count() {
        extend_path(grid, word, rules, 0, start, &mut used, &mut path, &mut best);
    }
    best
}

#[allow(clippy::too_many_arguments)]
fn extend_path(
    grid: &Grid,
    word: &str,
    rules: &ScoreRules,
    consumed: usize,
    index: usize,
    used: &mut u64,
    path: &mut Vec<usize>,
    best: &mut Option<SolvedWord>,
) {
    let bit = 1u64 << index;
    if *used & bit != 0 {
        return;
    }
    let tile = grid.cell(index).letter.as_str();
    if !word[consumed..].starts_with(tile) {
        return;
    }
    let consumed = consumed + tile.len();

    *used |= bit;
    path.push(index);
    if consumed == word.len() {
        let points = score_path(word, path, grid, rules);
        if best.as_ref().map_or(true, |b| points > b.points) {
            *best = Some(SolvedWord {
                path: path.clone(),
                points,
            });
        }
    } else {
        for neighbor in adjacency(index, grid.size()) {
            extend_path(grid, word, rules, consumed, neighbor, used, path, best);
        }
    }
    path.pop();
    *used &= !bit;
}

/// Solves the whole grid: every dictionary word of playable length whose
/// letters fit the grid's inventory is run through `find_best_path`. Words
/// with no valid path are simply absent from the result.
pub fn solve_grid(grid: &Grid, dict: &Dictionary, rules: &ScoreRules) -> SolvedMap {
    let inventory = grid.letter_counts();
    let mut solved = SolvedMap::new();
    for word in dict.words() {
        let len = word.chars().count();
        if !(MIN_WORD_LEN..=MAX_WORD_LEN).contains(&len) {
            continue;
        }
        if !fits_inventory(word, &inventory) {
            continue;
        }
        if let Some(found) = find_best_path(grid, word, rules) {
            solved.insert(word.clone(), found);
        }
    }
    solved
}

fn fits_inventory(word: &str, inventory: &[u32; 26]) -> bool {
    let mut needed = [0u32; 26];
    for b in word.bytes() {
        if !b.is_ascii_lowercase() {
            return false;
        }
        let slot = (b - b'a') as usize;
        needed[slot] += 1;
        if needed[slot] > inventory[slot] {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{grid_from, Bonus};

    fn cat_grid() -> Grid {
        // c a t / r s e / x y z
        grid_from(3, "catrsexyz")
    }

    #[test]
    fn test_find_best_path_spells_word() {
        let grid = cat_grid();
        let found = find_best_path(&grid, "cat", &ScoreRules::Standard).unwrap();
        assert_eq!(found.path, vec![0, 1, 2]);
        // c3 + a1 + t1
        assert_eq!(found.points, 5);
    }

    #[test]
    fn test_find_best_path_rejects_unspellable() {
        let grid = cat_grid();
        assert!(find_best_path(&grid, "dog", &ScoreRules::Standard).is_none());
        // letters exist but are not adjacent in order
        assert!(find_best_path(&grid, "cz", &ScoreRules::Standard).is_none());
        assert!(find_best_path(&grid, "", &ScoreRules::Standard).is_none());
    }

    #[test]
    fn test_no_tile_reuse() {
        // "aa" needs two distinct a tiles; this grid has only one
        let grid = grid_from(2, "abcd");
        assert!(find_best_path(&grid, "aa", &ScoreRules::Standard).is_none());

        let grid = grid_from(2, "aacd");
        let found = find_best_path(&grid, "aa", &ScoreRules::Standard).unwrap();
        assert_eq!(found.path.len(), 2);
        assert_ne!(found.path[0], found.path[1]);
    }

    #[test]
    fn test_paths_never_repeat_indices() {
        let grid = grid_from(3, "ababababa");
        for word in ["aba", "bab", "ababa", "bababab"] {
            if let Some(found) = find_best_path(&grid, word, &ScoreRules::Standard) {
                let mut seen = std::collections::HashSet::new();
                for index in &found.path {
                    assert!(seen.insert(*index), "tile {} reused for {}", index, word);
                }
            }
        }
    }

    #[test]
    fn test_best_path_maximizes_score() {
        // two b tiles adjacent to the a; the L3 one must win
        let mut grid = grid_from(2, "abbx");
        grid.set_bonus(2, Bonus::L3);
        let found = find_best_path(&grid, "ab", &ScoreRules::Standard).unwrap();
        assert_eq!(found.path, vec![0, 2]);
        // a1 + b3*3
        assert_eq!(found.points, 10);
    }

    #[test]
    fn test_best_path_beats_exhaustive_alternatives() {
        // every valid path for "aba" on this grid, checked by hand against
        // the solver's pick
        let mut grid = grid_from(3, "abaxbxaxx");
        grid.set_bonus(4, Bonus::M2);
        let best = find_best_path(&grid, "aba", &ScoreRules::Standard).unwrap();
        // any path through the M2 at index 4 scores (1+3+1)*2 = 10
        assert_eq!(best.points, 10);
        assert!(best.path.contains(&4));
    }

    #[test]
    fn test_qu_tile_path() {
        // qu i z across the top row
        let grid = grid_from(3, "qizxxxxxx");
        let found = find_best_path(&grid, "quiz", &ScoreRules::Standard).unwrap();
        assert_eq!(found.path, vec![0, 1, 2]);
        // qu 11 + i 1 + z 10, length 4
        assert_eq!(found.points, 22);
    }

    #[test]
    fn test_solve_grid_finds_playable_words() {
        let grid = cat_grid();
        let dict = Dictionary::from(vec!["cat", "rat", "sat", "cats", "dog", "at"]);
        let solved = solve_grid(&grid, &dict, &ScoreRules::Standard);
        assert!(solved.contains_key("cat"));
        assert!(solved.contains_key("rat"));
        assert!(solved.contains_key("sat"));
        assert!(solved.contains_key("cats"));
        // not on the grid
        assert!(!solved.contains_key("dog"));
        // below the minimum length
        assert!(!solved.contains_key("at"));
    }

    #[test]
    fn test_inventory_prefilter() {
        let inventory = grid_from(2, "abcd").letter_counts();
        assert!(fits_inventory("abc", &inventory));
        assert!(!fits_inventory("aab", &inventory));
        assert!(!fits_inventory("abe", &inventory));
    }

    #[test]
    fn test_quality_of_solved_map() {
        let grid = cat_grid();
        let dict = Dictionary::from(vec!["cat", "cats", "tserxyz"]);
        let solved = solve_grid(&grid, &dict, &ScoreRules::Standard);
        let quality = Quality::of(&solved);
        assert_eq!(quality.words, solved.len());
        assert!(quality.longest >= 4);
        assert_eq!(
            quality.total_score,
            solved.values().map(|s| s.points).sum::<u32>()
        );
        assert!(quality.composite() > quality.words as f64);
    }
}
