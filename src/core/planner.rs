//! Bet planning: pool derivation, combinations and stakes in one pass
//!
//! A plan is recomputed from scratch for every user action. Overrides that
//! refer to combinations outside the freshly generated set are stale and get
//! dropped rather than merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::allocation::{auto_allocate, zero_allocation, Allocation, BudgetSummary, StakeEntry};
use super::combination::{BetType, Combination, CombinationGenerator};
use super::view::top_by_base_score;
use crate::error::{validate_budget, KeibaError, Result};
use crate::models::{BetRequest, Horse, StakeOverride};

/// Default number of combinations rendered per plan
pub const DEFAULT_DISPLAY_LIMIT: usize = 50;
/// Default pool size when the user's selection is too small
pub const DEFAULT_FALLBACK_POOL: usize = 6;

/// Where the pool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    /// The horses the user picked
    Selected,
    /// Top horses by base score, used when the selection is too small
    TopScore,
}

/// Planner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    pub display_limit: usize,
    pub fallback_pool: usize,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            display_limit: DEFAULT_DISPLAY_LIMIT,
            fallback_pool: DEFAULT_FALLBACK_POOL,
        }
    }
}

/// Parsed planning input
#[derive(Debug, Clone, PartialEq)]
pub struct BetSelection {
    pub bet_type: BetType,
    pub selected: Vec<String>,
    pub budget: i64,
    pub auto_allocate: bool,
    pub overrides: Vec<(Combination, i64)>,
}

impl BetSelection {
    pub fn new(bet_type: BetType, selected: Vec<String>, budget: i64) -> Self {
        Self {
            bet_type,
            selected,
            budget,
            auto_allocate: true,
            overrides: Vec::new(),
        }
    }
}

impl TryFrom<&BetRequest> for BetSelection {
    type Error = KeibaError;

    fn try_from(req: &BetRequest) -> Result<Self> {
        Ok(Self {
            bet_type: req.bet_type.parse()?,
            selected: req.selected.clone(),
            budget: req.budget,
            auto_allocate: req.auto_allocate,
            overrides: req
                .overrides
                .iter()
                .map(|StakeOverride { combination, stake }| {
                    (Combination::new(combination.iter().cloned()), *stake)
                })
                .collect(),
        })
    }
}

/// Purchasable combinations with their stakes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetPlan {
    pub bet_type: BetType,
    pub pool: Vec<String>,
    pub pool_source: PoolSource,
    pub combination_count: usize,
    pub allocation: Allocation,
    /// First `display_limit` entries of the allocation
    pub displayed: Vec<StakeEntry>,
    pub summary: BudgetSummary,
    #[serde(skip)]
    display_limit: usize,
}

impl BetPlan {
    /// Override one stake and refresh the derived totals
    ///
    /// The previous stake is restored when the new totals overflow.
    pub fn apply_override(&mut self, combo: &Combination, stake: i64) -> Result<()> {
        let previous = self
            .allocation
            .stake(combo)
            .ok_or_else(|| KeibaError::UnknownCombination(combo.to_string()))?;
        self.allocation.set_stake(combo, stake)?;
        if let Err(e) = self.refresh() {
            self.allocation.set_stake(combo, previous)?;
            return Err(e);
        }
        Ok(())
    }

    pub fn is_truncated(&self) -> bool {
        self.combination_count > self.displayed.len()
    }

    /// Record what would be bought; nothing leaves the process
    pub fn simulate_purchase(&self) -> PurchaseReceipt {
        let tickets: Vec<StakeEntry> = self
            .allocation
            .entries()
            .iter()
            .filter(|e| e.stake > 0)
            .cloned()
            .collect();

        let receipt = PurchaseReceipt {
            bet_type: self.bet_type,
            total_stake: self.summary.total_staked,
            tickets,
            budget: self.summary.budget,
            simulated_at: Utc::now(),
        };

        info!(
            bet_type = self.bet_type.name(),
            tickets = receipt.tickets.len(),
            total_stake = receipt.total_stake,
            "simulated purchase"
        );

        receipt
    }

    fn refresh(&mut self) -> Result<()> {
        let summary = BudgetSummary::new(&self.allocation, self.summary.budget)?;
        self.displayed = self
            .allocation
            .entries()
            .iter()
            .take(self.display_limit)
            .cloned()
            .collect();
        self.summary = summary;
        Ok(())
    }
}

/// Outcome of a simulated purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub bet_type: BetType,
    pub tickets: Vec<StakeEntry>,
    pub total_stake: i64,
    pub budget: i64,
    pub simulated_at: DateTime<Utc>,
}

/// Pick the pool for a bet type
///
/// The user's selection is used when it holds at least as many horses as the
/// bet type names (single-horse bets: any non-empty selection). Otherwise the
/// top `fallback_pool` horses by base score are used.
pub fn derive_pool(
    bet_type: BetType,
    selected: &[String],
    horses: &[Horse],
    fallback_pool: usize,
) -> Result<(Vec<String>, PoolSource)> {
    if let Some(unknown) = selected.iter().find(|s| !horses.iter().any(|h| &h.name == *s)) {
        return Err(KeibaError::UnknownHorse(unknown.clone()));
    }

    if !selected.is_empty() && selected.len() >= bet_type.arity() {
        return Ok((selected.to_vec(), PoolSource::Selected));
    }

    let pool: Vec<String> = top_by_base_score(horses, fallback_pool)
        .into_iter()
        .map(|h| h.name.clone())
        .collect();

    if !selected.is_empty() {
        warn!(
            bet_type = bet_type.name(),
            selected = selected.len(),
            fallback = pool.len(),
            "selection too small, using top horses by score"
        );
    }

    Ok((pool, PoolSource::TopScore))
}

/// Build a bet plan from the current card and selection
pub fn plan_bets(
    selection: &BetSelection,
    horses: &[Horse],
    generator: &CombinationGenerator,
    options: &PlannerOptions,
) -> Result<BetPlan> {
    validate_budget(selection.budget)?;

    let (pool, pool_source) = derive_pool(
        selection.bet_type,
        &selection.selected,
        horses,
        options.fallback_pool,
    )?;
    let combos = generator.generate(selection.bet_type, &pool)?;

    let mut allocation = if selection.auto_allocate {
        auto_allocate(selection.budget, &combos)?
    } else {
        zero_allocation(&combos)
    };

    for (combo, stake) in &selection.overrides {
        match allocation.set_stake(combo, *stake) {
            Ok(()) => {}
            Err(KeibaError::UnknownCombination(c)) => {
                debug!(combination = %c, "dropping stale override");
            }
            Err(e) => return Err(e),
        }
    }

    let mut plan = BetPlan {
        bet_type: selection.bet_type,
        pool,
        pool_source,
        combination_count: combos.len(),
        allocation,
        displayed: Vec::new(),
        summary: BudgetSummary::new(&Allocation::default(), selection.budget)?,
        display_limit: options.display_limit,
    };
    plan.refresh()?;

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combination::QuinellaMode;
    use crate::data::sample_horses;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_uses_selection() {
        let horses = sample_horses();
        let selection = BetSelection::new(
            BetType::Trio,
            names(&["サンプルA", "サンプルB", "サンプルC"]),
            1000,
        );
        let plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.pool_source, PoolSource::Selected);
        assert_eq!(plan.combination_count, 1);
        assert_eq!(plan.allocation.entries()[0].stake, 1000);
        assert_eq!(plan.summary.total_staked, 1000);
    }

    #[test]
    fn test_plan_falls_back_to_top_scores() {
        let horses = sample_horses();
        let selection = BetSelection::new(BetType::Trifecta, names(&["サンプルA"]), 1200);
        let plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.pool_source, PoolSource::TopScore);
        assert_eq!(plan.pool[0], "アドマイヤテラ");
        assert_eq!(plan.combination_count, 120);
        assert_eq!(plan.displayed.len(), 50);
        assert!(plan.is_truncated());
        assert_eq!(plan.summary.total_staked, 1200);
    }

    #[test]
    fn test_plan_single_horse_types() {
        let horses = sample_horses();
        let selection = BetSelection::new(BetType::Win, names(&["サンプルD"]), 1000);
        let plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.pool, names(&["サンプルD"]));
        assert_eq!(plan.combination_count, 1);

        let empty = BetSelection::new(BetType::Place, Vec::new(), 600);
        let plan = plan_bets(
            &empty,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.pool_source, PoolSource::TopScore);
        assert_eq!(plan.combination_count, 6);
        assert_eq!(plan.summary.total_staked, 600);
    }

    #[test]
    fn test_plan_manual_mode_and_overrides() {
        let horses = sample_horses();
        let mut selection =
            BetSelection::new(BetType::Wide, names(&["サンプルA", "サンプルB", "サンプルC"]), 1000);
        selection.auto_allocate = false;
        selection.overrides = vec![
            (Combination::new(["サンプルA", "サンプルC"]), 500),
            // Mirrored pair is not part of a wide plan; dropped
            (Combination::new(["サンプルC", "サンプルA"]), 700),
        ];

        let plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.combination_count, 3);
        assert_eq!(plan.summary.total_staked, 500);
        assert_eq!(
            plan.allocation
                .stake(&Combination::new(["サンプルA", "サンプルB"])),
            Some(0)
        );
    }

    #[test]
    fn test_plan_negative_override_rejected() {
        let horses = sample_horses();
        let mut selection = BetSelection::new(BetType::Win, names(&["サンプルA"]), 100);
        selection.overrides = vec![(Combination::new(["サンプルA"]), -10)];
        let result = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        );
        assert!(matches!(result, Err(KeibaError::NegativeStake(-10))));
    }

    #[test]
    fn test_apply_override_reports_overrun() {
        let horses = sample_horses();
        let selection = BetSelection::new(BetType::Exacta, names(&["サンプルA", "サンプルB"]), 1000);
        let mut plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.summary.total_staked, 1000);

        plan.apply_override(&Combination::new(["サンプルB", "サンプルA"]), 800)
            .unwrap();
        assert_eq!(plan.summary.total_staked, 1300);
        assert!(plan.summary.over_budget);
        assert_eq!(plan.displayed[1].stake, 800);
    }

    #[test]
    fn test_override_overflow_is_rejected() {
        let horses = sample_horses();
        let mut selection =
            BetSelection::new(BetType::Win, names(&["サンプルA", "サンプルB"]), 1000);
        selection.overrides = vec![
            (Combination::new(["サンプルA"]), i64::MAX),
            (Combination::new(["サンプルB"]), 1),
        ];
        let result = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        );
        assert!(matches!(result, Err(KeibaError::StakeOverflow)));
    }

    #[test]
    fn test_apply_override_overflow_keeps_previous_stake() {
        let horses = sample_horses();
        let mut selection =
            BetSelection::new(BetType::Win, names(&["サンプルA", "サンプルB"]), 1000);
        selection.overrides = vec![(Combination::new(["サンプルA"]), i64::MAX - 500)];
        let mut plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.summary.total_staked, i64::MAX);

        let result = plan.apply_override(&Combination::new(["サンプルB"]), 550);
        assert!(matches!(result, Err(KeibaError::StakeOverflow)));
        assert_eq!(
            plan.allocation.stake(&Combination::new(["サンプルB"])),
            Some(500)
        );
        assert_eq!(plan.summary.total_staked, i64::MAX);
    }

    #[test]
    fn test_quinella_mode_changes_plan() {
        let horses = sample_horses();
        let selection = BetSelection::new(BetType::Quinella, Vec::new(), 1500);
        let legacy = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();
        let corrected = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::with_quinella_mode(QuinellaMode::Unordered),
            &PlannerOptions::default(),
        )
        .unwrap();

        assert_eq!(legacy.combination_count, 30);
        assert_eq!(legacy.allocation.entries()[0].stake, 50);
        assert_eq!(corrected.combination_count, 15);
        assert_eq!(corrected.allocation.entries()[0].stake, 100);
    }

    #[test]
    fn test_unknown_horse_in_selection() {
        let horses = sample_horses();
        let selection = BetSelection::new(BetType::Win, names(&["ディープインパクト"]), 100);
        let result = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        );
        assert!(matches!(result, Err(KeibaError::UnknownHorse(_))));
    }

    #[test]
    fn test_small_card_insufficient_pool() {
        let horses: Vec<Horse> = sample_horses().into_iter().take(2).collect();
        let selection = BetSelection::new(BetType::Trio, Vec::new(), 100);
        let result = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        );
        assert!(matches!(
            result,
            Err(KeibaError::InsufficientPoolSize { actual: 2, .. })
        ));
    }

    #[test]
    fn test_simulate_purchase_skips_zero_stakes() {
        let horses = sample_horses();
        let mut selection = BetSelection::new(BetType::Win, names(&["サンプルA", "サンプルB"]), 1000);
        selection.overrides = vec![(Combination::new(["サンプルB"]), 0)];
        let plan = plan_bets(
            &selection,
            &horses,
            &CombinationGenerator::default(),
            &PlannerOptions::default(),
        )
        .unwrap();

        let receipt = plan.simulate_purchase();
        assert_eq!(receipt.tickets.len(), 1);
        assert_eq!(receipt.total_stake, 500);
        assert_eq!(receipt.budget, 1000);
    }

    #[test]
    fn test_selection_from_request() {
        let req = BetRequest {
            bet_type: "馬単".to_string(),
            selected: names(&["A", "B"]),
            budget: 300,
            auto_allocate: false,
            overrides: vec![StakeOverride {
                combination: names(&["B", "A"]),
                stake: 100,
            }],
        };
        let selection = BetSelection::try_from(&req).unwrap();
        assert_eq!(selection.bet_type, BetType::Exacta);
        assert!(!selection.auto_allocate);
        assert_eq!(selection.overrides[0].0, Combination::new(["B", "A"]));

        let bad = BetRequest {
            bet_type: "pick5".to_string(),
            ..req
        };
        assert!(BetSelection::try_from(&bad).is_err());
    }
}
