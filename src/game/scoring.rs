use serde::{Deserialize, Serialize};

use crate::game::board::{Bonus, Grid};
use crate::game::letters::letter_value;

/// Round-specific scoring override. `Standard` honors the grid's bonus tiles;
/// the other variants are used by special round types whose grids carry no
/// bonus tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRules {
    Standard,
    /// Every word is worth the same flat number of points.
    FixedPerWord(u32),
    /// Base letter values only, all tile bonuses ignored.
    BareLetters,
    /// One designated letter is worth `value` per occurrence; the rest keep
    /// their base value. Tile bonuses ignored.
    BonusLetter { letter: char, value: u32 },
}

impl Default for ScoreRules {
    fn default() -> Self {
        ScoreRules::Standard
    }
}

/// Length bonus added to the letter sum before the word multiplier applies.
pub fn length_bonus(len: usize) -> u32 {
    match len {
        0..=4 => 0,
        5 => 3,
        6 => 6,
        7 => 10,
        _ => 15,
    }
}

/// Scores `word` along `path` on `grid`. Pure: identical inputs always give
/// identical output. The path is trusted to spell the word; use
/// `find_best_path` to obtain one.
pub fn score_path(word: &str, path: &[usize], grid: &Grid, rules: &ScoreRules) -> u32 {
    if let ScoreRules::FixedPerWord(points) = rules {
        return *points;
    }

    let mut letters = 0u32;
    let mut word_multiplier = 1u32;
    for &index in path {
        let cell = grid.cell(index);
        let mut tile: u32 = cell
            .letter
            .chars()
            .map(|c| match rules {
                ScoreRules::BonusLetter { letter, value } if c == *letter => *value,
                _ => letter_value(c),
            })
            .sum();
        if matches!(rules, ScoreRules::Standard) {
            match cell.bonus {
                Bonus::L2 => tile *= 2,
                Bonus::L3 => tile *= 3,
                Bonus::M2 => word_multiplier *= 2,
                Bonus::M3 => word_multiplier *= 3,
                Bonus::None => {}
            }
        }
        letters += tile;
    }

    (letters + length_bonus(word.chars().count())) * word_multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::grid_from;

    fn avion_grid() -> Grid {
        // a v i / o n x / x x x, path 0-1-2-3-4 spelling "avion"
        grid_from(3, "avionxxxx")
    }

    #[test]
    fn test_avion_plain_path_scores_eleven() {
        let grid = avion_grid();
        // base 8 + length bonus 3
        assert_eq!(
            score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard),
            11
        );
    }

    #[test]
    fn test_avion_word_multipliers_compound() {
        let mut grid = avion_grid();
        grid.set_bonus(2, Bonus::M2);
        assert_eq!(
            score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard),
            22
        );
        grid.set_bonus(4, Bonus::M3);
        assert_eq!(
            score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard),
            66
        );
    }

    #[test]
    fn test_letter_bonus_multiplies_single_tile() {
        let mut grid = avion_grid();
        grid.set_bonus(1, Bonus::L3);
        // v is worth 4, tripled to 12: 1 + 12 + 1 + 1 + 1 + 3
        assert_eq!(
            score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard),
            19
        );
    }

    #[test]
    fn test_length_bonus_steps() {
        assert_eq!(length_bonus(3), 0);
        assert_eq!(length_bonus(4), 0);
        assert_eq!(length_bonus(5), 3);
        assert_eq!(length_bonus(6), 6);
        assert_eq!(length_bonus(7), 10);
        assert_eq!(length_bonus(8), 15);
        assert_eq!(length_bonus(12), 15);
    }

    #[test]
    fn test_bare_letters_ignores_tile_bonuses() {
        let mut grid = avion_grid();
        grid.set_bonus(1, Bonus::L3);
        grid.set_bonus(2, Bonus::M3);
        assert_eq!(
            score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::BareLetters),
            11
        );
    }

    #[test]
    fn test_fixed_per_word() {
        let grid = avion_grid();
        let rules = ScoreRules::FixedPerWord(5);
        assert_eq!(score_path("avion", &[0, 1, 2, 3, 4], &grid, &rules), 5);
        assert_eq!(score_path("vi", &[1, 2], &grid, &rules), 5);
    }

    #[test]
    fn test_bonus_letter_value_replaces_base() {
        let grid = avion_grid();
        let rules = ScoreRules::BonusLetter {
            letter: 'v',
            value: 10,
        };
        // 1 + 10 + 1 + 1 + 1 + length bonus 3
        assert_eq!(score_path("avion", &[0, 1, 2, 3, 4], &grid, &rules), 17);
    }

    #[test]
    fn test_qu_tile_counts_both_letters() {
        let grid = grid_from(2, "qixx");
        // qu(11) + i(1), length 3 ("qui")
        assert_eq!(score_path("qui", &[0, 1], &grid, &ScoreRules::Standard), 12);
    }

    #[test]
    fn test_score_path_deterministic() {
        let mut grid = avion_grid();
        grid.set_bonus(3, Bonus::L2);
        let first = score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard);
        for _ in 0..10 {
            assert_eq!(
                score_path("avion", &[0, 1, 2, 3, 4], &grid, &ScoreRules::Standard),
                first
            );
        }
    }
}
