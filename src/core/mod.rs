//! Core business logic modules

pub mod allocation;
pub mod annotation;
pub mod combination;
pub mod planner;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use allocation::{
    auto_allocate, override_stake, total_staked, zero_allocation, Allocation, BudgetSummary,
    StakeEntry,
};
pub use annotation::{Annotation, AnnotationStore, Marker};
pub use combination::{
    combination_count, generate_combinations, BetType, Combination, CombinationGenerator,
    QuinellaMode,
};
pub use planner::{
    derive_pool, plan_bets, BetPlan, BetSelection, PlannerOptions, PoolSource, PurchaseReceipt,
};
pub use session::{Session, SessionId, SessionRegistry, DEFAULT_SESSION_TTL_SECS};
pub use view::{build_race_card, build_score_sheet, RaceCard, RaceCardRow, ScoreRow, SortOrder};
