//! Race entry sources

pub mod csv_loader;
pub mod sample;

use crate::error::Result;
use crate::models::{Horse, RaceKey};

// Re-export commonly used types
pub use csv_loader::CsvRaceSource;
pub use sample::{sample_horses, SampleRaceSource};

/// Supplies the entry list for a race
pub trait RaceSource: Send + Sync {
    /// Horses entered in the race, in post-position order
    fn fetch_entries(&self, key: &RaceKey) -> Result<Vec<Horse>>;

    /// Short description for logs
    fn describe(&self) -> String;
}
