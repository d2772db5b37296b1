//! Bet types and betting combination generation
//!
//! Every bet type fixes how many horses a ticket names (arity) and whether
//! finishing order matters:
//!
//! | Bet type          | Arity | Order     | Pool of 6 |
//! |-------------------|-------|-----------|-----------|
//! | 単勝 Win / 複勝 Place | 1   | -         | 6         |
//! | ワイド Wide        | 2     | unordered | 15        |
//! | 馬連 Quinella      | 2     | see below | 30 / 15   |
//! | 馬単 Exacta        | 2     | ordered   | 30        |
//! | 3連複 Trio         | 3     | unordered | 20        |
//! | 3連単 Trifecta     | 3     | ordered   | 120       |
//!
//! 馬連 pays regardless of which of the two horses wins, but tickets have
//! always been generated here as ordered pairs, so a mirrored pair receives
//! two stakes. That behavior is kept by default ([`QuinellaMode::Permutations`]);
//! [`QuinellaMode::Unordered`] emits each pair once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{KeibaError, Result};

/// Largest field size; pools beyond this cannot come from a single race
pub const DEFAULT_MAX_POOL: usize = 18;
/// Pool cap for ordered triples: 12 horses already yield 1320 tickets
pub const DEFAULT_MAX_ORDERED_TRIPLE_POOL: usize = 12;

/// Bet type (馬券種)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Win,
    Place,
    Wide,
    Quinella,
    Exacta,
    Trio,
    Trifecta,
}

impl BetType {
    pub const ALL: [BetType; 7] = [
        BetType::Win,
        BetType::Place,
        BetType::Wide,
        BetType::Quinella,
        BetType::Exacta,
        BetType::Trio,
        BetType::Trifecta,
    ];

    /// Number of horses named on one ticket
    pub fn arity(&self) -> usize {
        match self {
            BetType::Win | BetType::Place => 1,
            BetType::Wide | BetType::Quinella | BetType::Exacta => 2,
            BetType::Trio | BetType::Trifecta => 3,
        }
    }

    /// Whether tickets are generated as permutations
    pub fn is_ordered(&self, quinella: QuinellaMode) -> bool {
        match self {
            BetType::Win | BetType::Place | BetType::Wide | BetType::Trio => false,
            BetType::Quinella => quinella == QuinellaMode::Permutations,
            BetType::Exacta | BetType::Trifecta => true,
        }
    }

    /// Japanese ticket name as printed on the betting slip
    pub fn label(&self) -> &'static str {
        match self {
            BetType::Win => "単勝",
            BetType::Place => "複勝",
            BetType::Wide => "ワイド",
            BetType::Quinella => "馬連",
            BetType::Exacta => "馬単",
            BetType::Trio => "3連複",
            BetType::Trifecta => "3連単",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BetType::Win => "win",
            BetType::Place => "place",
            BetType::Wide => "wide",
            BetType::Quinella => "quinella",
            BetType::Exacta => "exacta",
            BetType::Trio => "trio",
            BetType::Trifecta => "trifecta",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.name())
    }
}

impl FromStr for BetType {
    type Err = KeibaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        BetType::ALL
            .into_iter()
            .find(|b| b.label() == s || b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| KeibaError::UnknownBetType(s.to_string()))
    }
}

/// How 馬連 tickets are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuinellaMode {
    /// Ordered pairs, so A-B and B-A are both staked
    #[default]
    Permutations,
    /// Each pair once, in pool order
    Unordered,
}

impl FromStr for QuinellaMode {
    type Err = KeibaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permutations" | "ordered" => Ok(QuinellaMode::Permutations),
            "unordered" | "combinations" => Ok(QuinellaMode::Unordered),
            _ => Err(KeibaError::InvalidConfig {
                key: "quinella_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// One betting ticket: horse names in bet order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(Vec<String>);

impl Combination {
    pub fn new<S: Into<String>>(horses: impl IntoIterator<Item = S>) -> Self {
        Self(horses.into_iter().map(Into::into).collect())
    }

    pub fn horses(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, horse: &str) -> bool {
        self.0.iter().any(|h| h == horse)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" - "))
    }
}

/// Combination generator with pool-size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinationGenerator {
    pub quinella_mode: QuinellaMode,
    pub max_pool: usize,
    pub max_ordered_triple_pool: usize,
}

impl CombinationGenerator {
    pub fn new(quinella_mode: QuinellaMode, max_pool: usize, max_ordered_triple_pool: usize) -> Self {
        Self {
            quinella_mode,
            max_pool,
            max_ordered_triple_pool,
        }
    }

    pub fn with_quinella_mode(quinella_mode: QuinellaMode) -> Self {
        Self {
            quinella_mode,
            ..Self::default()
        }
    }

    /// Generate every ticket for `bet_type` over `pool`
    ///
    /// Tickets come out in lexicographic order of pool positions, so the
    /// result is reproducible for a given pool order. Unordered tickets list
    /// their horses in pool order.
    ///
    /// # Errors
    /// * `InsufficientPoolSize` if the pool is smaller than the arity
    /// * `DuplicateHorse` if a name appears twice
    /// * `PoolTooLarge` if the pool exceeds the configured limits
    pub fn generate<S: AsRef<str>>(&self, bet_type: BetType, pool: &[S]) -> Result<Vec<Combination>> {
        let arity = bet_type.arity();
        let ordered = bet_type.is_ordered(self.quinella_mode);

        if pool.len() < arity {
            return Err(KeibaError::InsufficientPoolSize {
                bet_type,
                required: arity,
                actual: pool.len(),
            });
        }

        for (i, horse) in pool.iter().enumerate() {
            if pool[..i].iter().any(|h| h.as_ref() == horse.as_ref()) {
                return Err(KeibaError::DuplicateHorse(horse.as_ref().to_string()));
            }
        }

        let max = if ordered && arity == 3 {
            self.max_ordered_triple_pool.min(self.max_pool)
        } else {
            self.max_pool
        };
        if pool.len() > max {
            return Err(KeibaError::PoolTooLarge {
                bet_type,
                max,
                actual: pool.len(),
            });
        }

        let combos: Vec<Combination> = select_indices(pool.len(), arity, ordered)
            .into_iter()
            .map(|indices| Combination::new(indices.into_iter().map(|i| pool[i].as_ref())))
            .collect();

        debug!(
            bet_type = bet_type.name(),
            pool = pool.len(),
            combinations = combos.len(),
            "generated combinations"
        );

        Ok(combos)
    }
}

impl Default for CombinationGenerator {
    fn default() -> Self {
        Self {
            quinella_mode: QuinellaMode::default(),
            max_pool: DEFAULT_MAX_POOL,
            max_ordered_triple_pool: DEFAULT_MAX_ORDERED_TRIPLE_POOL,
        }
    }
}

/// Generate combinations with the default limits and legacy 馬連 behavior
///
/// # Examples
/// ```
/// use keiba::core::combination::{generate_combinations, BetType};
/// let combos = generate_combinations(BetType::Trio, &["A", "B", "C", "D"]).unwrap();
/// assert_eq!(combos.len(), 4);
/// assert_eq!(combos[0].to_string(), "A - B - C");
/// ```
pub fn generate_combinations<S: AsRef<str>>(bet_type: BetType, pool: &[S]) -> Result<Vec<Combination>> {
    CombinationGenerator::default().generate(bet_type, pool)
}

/// Closed-form ticket count: C(n, k) or P(n, k)
pub fn combination_count(n: usize, k: usize, ordered: bool) -> usize {
    if k > n {
        return 0;
    }
    let permutations: usize = (n - k + 1..=n).product();
    if ordered {
        permutations
    } else {
        let k_factorial: usize = (1..=k).product();
        permutations / k_factorial
    }
}

/// Index tuples of length `k` drawn from `0..n` without repetition
fn select_indices(n: usize, k: usize, ordered: bool) -> Vec<Vec<usize>> {
    let mut out = Vec::with_capacity(combination_count(n, k, ordered));
    let mut current = Vec::with_capacity(k);
    let mut used = vec![false; n];
    extend_selection(n, k, ordered, 0, &mut current, &mut used, &mut out);
    out
}

fn extend_selection(
    n: usize,
    k: usize,
    ordered: bool,
    start: usize,
    current: &mut Vec<usize>,
    used: &mut [bool],
    out: &mut Vec<Vec<usize>>,
) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }

    let from = if ordered { 0 } else { start };
    for i in from..n {
        if used[i] {
            continue;
        }
        used[i] = true;
        current.push(i);
        extend_selection(n, k, ordered, i + 1, current, used, out);
        current.pop();
        used[i] = false;
    }
}
