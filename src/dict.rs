use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::game::letters::normalize;

/// The shared word list. Loaded once at startup and read-only afterwards;
/// every entry is already normalized.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening wordlist {:?}", path))?;
        let mut words = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("reading wordlist {:?}", path))?;
            let word = normalize(line.trim());
            if !word.is_empty() {
                words.insert(word);
            }
        }
        info!(words = words.len(), ?path, "loaded dictionary");
        Ok(Self { words })
    }

    /// Missing wordlist is a degraded mode, not an error: quality gating
    /// becomes a no-op and only grid-known words remain submittable.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(dict) => dict,
            Err(e) => {
                warn!(
                    "no dictionary available ({e:#}); quality thresholds disabled"
                );
                Self::empty()
            }
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &String> {
        self.words.iter()
    }
}

impl From<Vec<&str>> for Dictionary {
    fn from(words: Vec<&str>) -> Self {
        Self {
            words: words.into_iter().map(normalize).collect(),
        }
    }
}
