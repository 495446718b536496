//! Primary-player selection rule.
//!
//! Only candidates whose name matches the configured pattern and contains none
//! of the blocked substrings are eligible. When several remain, [`TieBreak`]
//! decides which one we follow.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_PLAYER_PATTERN: &str = r"^org\.mpris\.MediaPlayer2\.";

static DEFAULT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_PLAYER_PATTERN).expect("default player pattern is valid"));

/// How to choose between several equally eligible candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TieBreak {
    /// First candidate in name order.
    #[default]
    First,
    /// Last candidate in name order.
    Last,
    /// First candidate that is currently playing, else the first one.
    Playing,
}

/// An eligible element as seen by the selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub name: String,
    pub playing: bool,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct PlayerSelector {
    pattern: Regex,
    block_list: Vec<String>,
    tie_break: TieBreak,
}

/// Any MPRIS player, nothing blocked, first in name order.
impl Default for PlayerSelector {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
            block_list: Vec::new(),
            tie_break: TieBreak::First,
        }
    }
}

impl PlayerSelector {
    pub fn new(pattern: &str, block_list: Vec<String>, tie_break: TieBreak) -> Result<Self, regex::Error> {
        let selector = Self { pattern: Regex::new(pattern)?, ..Self::default() };
        Ok(selector.with_block_list(block_list).with_tie_break(tie_break))
    }

    /// Replace the block list. Entries are trimmed and compared lowercase.
    pub fn with_block_list(mut self, block_list: Vec<String>) -> Self {
        self.block_list = block_list
            .into_iter()
            .map(|b| b.trim().to_lowercase())
            .filter(|b| !b.is_empty())
            .collect();
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Returns true if the name (case-insensitive) contains any blocked string.
    pub fn is_blocked(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.block_list.iter().any(|blocked| lower.contains(blocked.as_str()))
    }

    pub fn is_eligible(&self, name: &str) -> bool {
        self.pattern.is_match(name) && !self.is_blocked(name)
    }

    /// Eligible names, sorted so the choice does not depend on listing order.
    pub fn eligible<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        let mut eligible: Vec<&str> = names.into_iter().filter(|n| self.is_eligible(n)).collect();
        eligible.sort_unstable();
        eligible.dedup();
        eligible
    }

    /// Pick one candidate according to the tie-break policy.
    pub fn pick<T>(&self, mut candidates: Vec<Candidate<T>>) -> Option<Candidate<T>> {
        candidates.retain(|c| self.is_eligible(&c.name));
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        match self.tie_break {
            TieBreak::First => candidates.into_iter().next(),
            TieBreak::Last => candidates.pop(),
            TieBreak::Playing => {
                let playing = candidates.iter().position(|c| c.playing).unwrap_or(0);
                (!candidates.is_empty()).then(|| candidates.swap_remove(playing))
            }
        }
    }
}
