//! Runtime configuration read from `KEIBA_*` environment variables

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

use crate::core::combination::{
    CombinationGenerator, QuinellaMode, DEFAULT_MAX_ORDERED_TRIPLE_POOL, DEFAULT_MAX_POOL,
};
use crate::core::planner::{PlannerOptions, DEFAULT_DISPLAY_LIMIT, DEFAULT_FALLBACK_POOL};
use crate::core::session::DEFAULT_SESSION_TTL_SECS;
use crate::data::{CsvRaceSource, RaceSource, SampleRaceSource};
use crate::error::{KeibaError, Result};

/// Smallest budget offered by the budget prompt
pub const MIN_BUDGET_INPUT: i64 = 100;
/// Budget prompt increment
pub const BUDGET_STEP: i64 = 100;
/// Per-ticket stake prompt increment
pub const STAKE_STEP: i64 = 50;
/// Longest accepted idle timeout for sessions (30 days)
pub const MAX_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Entry list CSV; the sample card is used when unset
    pub data_csv: Option<PathBuf>,
    pub quinella_mode: QuinellaMode,
    pub max_pool: usize,
    pub max_ordered_triple_pool: usize,
    pub display_limit: usize,
    pub fallback_pool: usize,
    pub default_budget: i64,
    /// Seconds a session may sit idle before it is dropped
    pub session_ttl_secs: i64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_csv: None,
            quinella_mode: QuinellaMode::default(),
            max_pool: DEFAULT_MAX_POOL,
            max_ordered_triple_pool: DEFAULT_MAX_ORDERED_TRIPLE_POOL,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            fallback_pool: DEFAULT_FALLBACK_POOL,
            default_budget: 1000,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: lookup("KEIBA_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "KEIBA_PORT", defaults.port)?,
            data_csv: lookup("KEIBA_DATA_CSV")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            quinella_mode: parse_var(&lookup, "KEIBA_QUINELLA_MODE", defaults.quinella_mode)?,
            max_pool: parse_var(&lookup, "KEIBA_MAX_POOL", defaults.max_pool)?,
            max_ordered_triple_pool: parse_var(
                &lookup,
                "KEIBA_MAX_ORDERED_TRIPLE_POOL",
                defaults.max_ordered_triple_pool,
            )?,
            display_limit: parse_var(&lookup, "KEIBA_DISPLAY_LIMIT", defaults.display_limit)?,
            fallback_pool: parse_var(&lookup, "KEIBA_FALLBACK_POOL", defaults.fallback_pool)?,
            default_budget: parse_var(&lookup, "KEIBA_DEFAULT_BUDGET", defaults.default_budget)?,
            session_ttl_secs: parse_var(&lookup, "KEIBA_SESSION_TTL", defaults.session_ttl_secs)?,
            log_level: lookup("KEIBA_LOG").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |key: &str, value: String| KeibaError::InvalidConfig {
            key: key.to_string(),
            value,
        };

        if self.max_pool == 0 {
            return Err(invalid("KEIBA_MAX_POOL", self.max_pool.to_string()));
        }
        if self.max_ordered_triple_pool == 0 {
            return Err(invalid(
                "KEIBA_MAX_ORDERED_TRIPLE_POOL",
                self.max_ordered_triple_pool.to_string(),
            ));
        }
        if self.default_budget < 0 {
            return Err(invalid(
                "KEIBA_DEFAULT_BUDGET",
                self.default_budget.to_string(),
            ));
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.session_ttl_secs) {
            return Err(invalid(
                "KEIBA_SESSION_TTL",
                self.session_ttl_secs.to_string(),
            ));
        }
        self.level()?;
        Ok(())
    }

    /// Tracing level parsed from `log_level`
    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.log_level).map_err(|_| KeibaError::InvalidConfig {
            key: "KEIBA_LOG".to_string(),
            value: self.log_level.clone(),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn generator(&self) -> CombinationGenerator {
        CombinationGenerator::new(
            self.quinella_mode,
            self.max_pool,
            self.max_ordered_triple_pool,
        )
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            display_limit: self.display_limit,
            fallback_pool: self.fallback_pool,
        }
    }

    /// CSV source when a path is configured, otherwise the sample card
    pub fn race_source(&self) -> Box<dyn RaceSource> {
        match &self.data_csv {
            Some(path) => Box::new(CsvRaceSource::new(path)),
            None => Box::new(SampleRaceSource),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| KeibaError::InvalidConfig {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
