//! Keiba - horse race betting assistant
//!
//! This library provides:
//! - Per-horse markers (◎ ○ ▲ △ ⭐ ×) and manual score adjustments
//! - Ticket generation for win, place, wide, quinella, exacta, trio and trifecta
//! - Budget allocation with per-ticket overrides
//! - Race card loading from CSV or a built-in sample card
//!
//! # Example
//!
//! ```no_run
//! use keiba::core::{auto_allocate, BetType, CombinationGenerator};
//!
//! let generator = CombinationGenerator::default();
//! let combos = generator
//!     .generate(BetType::Trio, &["A", "B", "C", "D"])
//!     .unwrap();
//!
//! let allocation = auto_allocate(1000, &combos).unwrap();
//! println!("{} tickets, {} yen staked", allocation.len(), allocation.total().unwrap());
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{CsvRaceSource, RaceSource, SampleRaceSource};
pub use error::{KeibaError, Result};
pub use models::{BetRequest, Horse, RaceKey, RaceMeta};
