//! Budget allocation across betting combinations
//!
//! The automatic split is deliberately simple: every ticket gets
//! `floor(budget / count)` and the remainder stays unspent, so the total can
//! fall short of the budget by up to `count - 1`. Manual overrides replace a
//! single stake and may push the total over budget; the overrun is reported,
//! never prevented.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::combination::Combination;
use crate::error::{validate_budget, validate_stake, KeibaError, Result};

/// Stake placed on one combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub combination: Combination,
    pub stake: i64,
}

/// Stakes for the current set of combinations, in generation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    entries: Vec<StakeEntry>,
}

impl Allocation {
    /// Allocation with the same stake on every combination
    pub fn uniform(combos: &[Combination], stake: i64) -> Result<Self> {
        validate_stake(stake)?;
        Ok(Self {
            entries: combos
                .iter()
                .map(|c| StakeEntry {
                    combination: c.clone(),
                    stake,
                })
                .collect(),
        })
    }

    pub fn entries(&self) -> &[StakeEntry] {
        &self.entries
    }

    pub fn stake(&self, combo: &Combination) -> Option<i64> {
        self.entries
            .iter()
            .find(|e| &e.combination == combo)
            .map(|e| e.stake)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace one stake without touching the others
    pub fn set_stake(&mut self, combo: &Combination, stake: i64) -> Result<()> {
        validate_stake(stake)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.combination == combo)
            .ok_or_else(|| KeibaError::UnknownCombination(combo.to_string()))?;
        entry.stake = stake;
        Ok(())
    }

    /// Sum of all stakes; `StakeOverflow` when it does not fit in an i64
    pub fn total(&self) -> Result<i64> {
        self.entries.iter().try_fold(0i64, |acc, e| {
            acc.checked_add(e.stake).ok_or(KeibaError::StakeOverflow)
        })
    }
}

/// Split a budget evenly across combinations
///
/// Divides by `max(1, combos.len())`, so an empty set yields an empty
/// allocation instead of a division by zero.
///
/// # Examples
/// ```
/// use keiba::core::allocation::{auto_allocate, total_staked};
/// use keiba::core::combination::Combination;
///
/// let combos = vec![
///     Combination::new(["A"]),
///     Combination::new(["B"]),
///     Combination::new(["C"]),
/// ];
/// let allocation = auto_allocate(1000, &combos).unwrap();
/// assert_eq!(total_staked(&allocation).unwrap(), 999);
/// ```
pub fn auto_allocate(total_budget: i64, combos: &[Combination]) -> Result<Allocation> {
    validate_budget(total_budget)?;

    let count = combos.len().max(1) as i64;
    let base = total_budget / count;
    let allocation = Allocation::uniform(combos, base)?;

    let shortfall = total_budget - allocation.total()?;
    debug!(
        budget = total_budget,
        combinations = combos.len(),
        base,
        shortfall,
        "auto allocated"
    );

    Ok(allocation)
}

/// Every combination staked at zero (manual allocation mode)
pub fn zero_allocation(combos: &[Combination]) -> Allocation {
    Allocation {
        entries: combos
            .iter()
            .map(|c| StakeEntry {
                combination: c.clone(),
                stake: 0,
            })
            .collect(),
    }
}

/// Replace the stake for one combination
pub fn override_stake(allocation: &mut Allocation, combo: &Combination, new_stake: i64) -> Result<()> {
    allocation.set_stake(combo, new_stake)
}

/// Sum of all stakes
pub fn total_staked(allocation: &Allocation) -> Result<i64> {
    allocation.total()
}

/// Staked total measured against the configured budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget: i64,
    pub total_staked: i64,
    /// budget - total_staked; negative when over budget
    pub remaining: i64,
    pub over_budget: bool,
}

impl BudgetSummary {
    pub fn new(allocation: &Allocation, budget: i64) -> Result<Self> {
        let total = allocation.total()?;
        let summary = Self {
            budget,
            total_staked: total,
            remaining: budget.checked_sub(total).ok_or(KeibaError::StakeOverflow)?,
            over_budget: total > budget,
        };

        if summary.over_budget {
            warn!(budget, total_staked = total, "allocation exceeds budget");
        }

        Ok(summary)
    }
}
