use core::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::letters::BAG_WEIGHTS;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Tile bonus: L2/L3 multiply one letter, M2/M3 multiply the whole word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    None,
    L2,
    L3,
    M2,
    M3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Lowercase tile text, one letter except the two-letter "qu" tile.
    pub letter: String,
    pub bonus: Bonus,
}

/// A size x size arrangement of letter tiles, row-major. Immutable once a
/// round has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

/// Orthogonal and diagonal neighbor indices of `index` on a size x size grid.
pub fn adjacency(index: usize, size: usize) -> Vec<usize> {
    let row = index / size;
    let col = index % size;
    let mut neighbors = Vec::with_capacity(8);
    for (row_step, col_step) in DIRECTIONS {
        let next_row = row.checked_add_signed(row_step);
        let next_col = col.checked_add_signed(col_step);
        if let (Some(next_row), Some(next_col)) = (next_row, next_col) {
            if next_row < size && next_col < size {
                neighbors.push(next_row * size + next_col);
            }
        }
    }
    neighbors
}

impl Grid {
    pub fn new(size: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        debug_assert!(size * size <= 64, "grid does not fit the solver's bitset");
        Self { size, cells }
    }

    /// Samples size*size letters from the weighted bag. A drawn "q" becomes
    /// the two-letter "qu" tile. No bonus tiles yet.
    pub fn sample<R: Rng>(size: usize, rng: &mut R) -> Self {
        let letters: Vec<char> = BAG_WEIGHTS.keys().copied().collect();
        let weights: Vec<u32> = letters.iter().map(|c| BAG_WEIGHTS[c]).collect();
        let bag = WeightedIndex::new(&weights).expect("letter bag weights are static");

        let cells = (0..size * size)
            .map(|_| {
                let letter = letters[bag.sample(rng)];
                let text = if letter == 'q' {
                    "qu".to_string()
                } else {
                    letter.to_string()
                };
                Cell {
                    letter: text,
                    bonus: Bonus::None,
                }
            })
            .collect();
        Self { size, cells }
    }

    /// Assigns L2, L3, M2 and M3 to four distinct cells chosen uniformly.
    pub fn place_bonuses<R: Rng>(&mut self, rng: &mut R) {
        let picks = rand::seq::index::sample(rng, self.cells.len(), 4);
        let kinds = [Bonus::L2, Bonus::L3, Bonus::M2, Bonus::M3];
        for (index, bonus) in picks.iter().zip(kinds) {
            self.cells[index].bonus = bonus;
        }
    }

    pub fn strip_bonuses(&mut self) {
        for cell in &mut self.cells {
            cell.bonus = Bonus::None;
        }
    }

    pub fn set_bonus(&mut self, index: usize, bonus: Bonus) {
        self.cells[index].bonus = bonus;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        adjacency(index, self.size)
    }

    /// Per-letter multiset of the grid's inventory; the "qu" tile contributes
    /// both a q and a u.
    pub fn letter_counts(&self) -> [u32; 26] {
        let mut counts = [0u32; 26];
        for cell in &self.cells {
            for b in cell.letter.bytes() {
                counts[(b - b'a') as usize] += 1;
            }
        }
        counts
    }

    /// Distinct letters present on the grid, in alphabetical order.
    pub fn distinct_letters(&self) -> Vec<char> {
        let counts = self.letter_counts();
        (0u8..26)
            .filter(|i| counts[*i as usize] > 0)
            .map(|i| (b'a' + i) as char)
            .collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            for col in 0..self.size {
                let cell = &self.cells[row * self.size + col];
                let marker = match cell.bonus {
                    Bonus::None => ' ',
                    Bonus::L2 => '2',
                    Bonus::L3 => '3',
                    Bonus::M2 => 'D',
                    Bonus::M3 => 'T',
                };
                write!(f, " {:>2}{}", cell.letter.to_uppercase(), marker)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn grid_from(size: usize, letters: &str) -> Grid {
    let cells = letters
        .chars()
        .map(|c| Cell {
            letter: if c == 'q' {
                "qu".to_string()
            } else {
                c.to_string()
            },
            bonus: Bonus::None,
        })
        .collect();
    Grid::new(size, cells)
}
