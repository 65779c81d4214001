use phf::phf_map;

/// Scrabble-style point value for each letter.
pub static LETTER_VALUES: phf::Map<char, u32> = phf_map! {
    'a' => 1, 'b' => 3, 'c' => 3, 'd' => 2, 'e' => 1, 'f' => 4, 'g' => 2,
    'h' => 4, 'i' => 1, 'j' => 8, 'k' => 5, 'l' => 1, 'm' => 3, 'n' => 1,
    'o' => 1, 'p' => 3, 'q' => 10, 'r' => 1, 's' => 1, 't' => 1, 'u' => 1,
    'v' => 4, 'w' => 4, 'x' => 8, 'y' => 4, 'z' => 10,
};

/// Relative draw weight for each letter when sampling a grid (frequency x 10000).
pub static BAG_WEIGHTS: phf::Map<char, u32> = phf_map! {
    'a' => 780, 'b' => 200, 'c' => 400, 'd' => 380, 'e' => 1100, 'f' => 140,
    'g' => 300, 'h' => 230, 'i' => 860, 'j' => 21, 'k' => 97, 'l' => 530,
    'm' => 270, 'n' => 720, 'o' => 610, 'p' => 280, 'q' => 19, 'r' => 730,
    's' => 870, 't' => 670, 'u' => 330, 'v' => 100, 'w' => 91, 'x' => 27,
    'y' => 160, 'z' => 44,
};

pub fn letter_value(letter: char) -> u32 {
    LETTER_VALUES.get(&letter).copied().unwrap_or(0)
}

/// Base value of a tile's text; the two-letter "qu" tile counts both letters.
pub fn tile_value(text: &str) -> u32 {
    text.chars().map(letter_value).sum()
}

/// Lowercases, folds diacritics and digraph ligatures to plain ascii letters,
/// and drops everything else (punctuation, digits, whitespace). Idempotent.
pub fn normalize(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for c in word.chars().flat_map(|c| c.to_lowercase()) {
        match c {
            'à' | 'â' | 'ä' | 'á' | 'ã' => out.push('a'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'î' | 'ï' | 'í' | 'ì' => out.push('i'),
            'ô' | 'ö' | 'ó' | 'ò' | 'õ' => out.push('o'),
            'ù' | 'û' | 'ü' | 'ú' => out.push('u'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            'ÿ' => out.push('y'),
            'œ' => out.push_str("oe"),
            'æ' => out.push_str("ae"),
            c if c.is_ascii_alphabetic() => out.push(c),
            _ => {}
        }
    }
    out
}
