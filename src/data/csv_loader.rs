//! CSV race entry loading
//!
//! Expected columns, one row per horse:
//!
//! ```text
//! date,course,race_no,frame,number,name,sex_age,carried_weight,body_weight,
//! jockey,running_style,odds,popularity,base_score,pedigree,owner,breeder,
//! trainer,record,preferred_course,preferred_distance,frame_aptitude,going_aptitude
//! ```

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::RaceSource;
use crate::error::{KeibaError, Result};
use crate::models::{Horse, RaceKey};

/// Race entries read from a CSV file
#[derive(Debug, Clone)]
pub struct CsvRaceSource {
    path: PathBuf,
}

impl CsvRaceSource {
    pub fn new<P: AsRef<Path>>(csv_path: P) -> Self {
        Self {
            path: csv_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scan(&self) -> Result<LazyFrame> {
        let lf = LazyCsvReader::new(&self.path).finish()?;
        // Whole-number weights and odds are inferred as integers
        Ok(lf.with_columns([
            col("carried_weight").cast(DataType::Float64),
            col("odds").cast(DataType::Float64),
        ]))
    }

    /// Get entries for a specific race, ordered by post position
    pub fn get_race(&self, key: &RaceKey) -> Result<Vec<Horse>> {
        let filtered = self
            .scan()?
            .filter(
                col("date")
                    .eq(lit(key.date as i64))
                    .and(col("course").eq(lit(key.course.as_str())))
                    .and(col("race_no").eq(lit(key.race_no as i64))),
            )
            .sort(["number"], Default::default())
            .collect()?;

        debug!(race = %key, rows = filtered.height(), "loaded race entries");
        Self::dataframe_to_horses(&filtered)
    }

    /// List available dates
    pub fn list_dates(&self) -> Result<Vec<u32>> {
        let dates = self
            .scan()?
            .select([col("date")])
            .unique(None, UniqueKeepStrategy::First)
            .sort(["date"], Default::default())
            .collect()?;

        let date_col = dates.column("date")?.i64()?;
        date_col
            .into_no_null_iter()
            .enumerate()
            .map(|(i, d)| narrow::<u32>(Some(d), i, "date"))
            .collect()
    }

    /// List races for a date (returns (course, race_no, num_entries) tuples)
    pub fn list_races(&self, date: u32) -> Result<Vec<(String, u8, usize)>> {
        let filtered = self
            .scan()?
            .filter(col("date").eq(lit(date as i64)))
            .group_by([col("course"), col("race_no")])
            .agg([col("name").count().alias("count")])
            .sort(["course", "race_no"], SortMultipleOptions::default())
            .collect()?;

        let course_col = filtered.column("course")?.str()?;
        let race_col = filtered.column("race_no")?.i64()?;
        let count_col = filtered.column("count")?.u32()?;

        let mut result = Vec::new();
        for i in 0..filtered.height() {
            if let (Some(c), Some(r), Some(n)) = (course_col.get(i), race_col.get(i), count_col.get(i)) {
                result.push((c.to_string(), narrow::<u8>(Some(r), i, "race_no")?, n as usize));
            }
        }

        Ok(result)
    }

    /// Convert DataFrame to Horse vector
    fn dataframe_to_horses(df: &DataFrame) -> Result<Vec<Horse>> {
        let mut horses = Vec::with_capacity(df.height());

        // Use i64 for all integer columns (polars default inference)
        let frame_col = df.column("frame")?.i64()?;
        let number_col = df.column("number")?.i64()?;
        let name_col = df.column("name")?.str()?;
        let sex_age_col = df.column("sex_age")?.str()?;
        let carried_col = df.column("carried_weight")?.f64()?;
        let body_col = df.column("body_weight")?.i64()?;
        let jockey_col = df.column("jockey")?.str()?;
        let style_col = df.column("running_style")?.str()?;
        let odds_col = df.column("odds")?.f64()?;
        let popularity_col = df.column("popularity")?.i64()?;
        let score_col = df.column("base_score")?.i64()?;
        let pedigree_col = df.column("pedigree")?.str()?;
        let owner_col = df.column("owner")?.str()?;
        let breeder_col = df.column("breeder")?.str()?;
        let trainer_col = df.column("trainer")?.str()?;
        let record_col = df.column("record")?.str()?;
        let pref_course_col = df.column("preferred_course")?.str()?;
        let pref_distance_col = df.column("preferred_distance")?.i64()?;
        let frame_apt_col = df.column("frame_aptitude")?.i64()?;
        let going_apt_col = df.column("going_aptitude")?.i64()?;

        for i in 0..df.height() {
            let name = name_col.get(i).unwrap_or("").to_string();
            if name.is_empty() {
                return Err(KeibaError::InvalidData(format!(
                    "Row {} has no horse name",
                    i
                )));
            }
            if horses.iter().any(|h: &Horse| h.name == name) {
                return Err(KeibaError::DuplicateHorse(name));
            }

            horses.push(Horse {
                frame: narrow(frame_col.get(i), i, "frame")?,
                number: narrow(number_col.get(i), i, "number")?,
                name,
                sex_age: sex_age_col.get(i).unwrap_or("").to_string(),
                carried_weight: carried_col.get(i).unwrap_or(0.0),
                body_weight: narrow(body_col.get(i), i, "body_weight")?,
                jockey: jockey_col.get(i).unwrap_or("").to_string(),
                running_style: style_col.get(i).unwrap_or("").to_string(),
                odds: odds_col.get(i).unwrap_or(0.0),
                popularity: narrow(popularity_col.get(i), i, "popularity")?,
                base_score: narrow(score_col.get(i), i, "base_score")?,
                pedigree: pedigree_col.get(i).unwrap_or("").to_string(),
                owner: owner_col.get(i).unwrap_or("").to_string(),
                breeder: breeder_col.get(i).unwrap_or("").to_string(),
                trainer: trainer_col.get(i).unwrap_or("").to_string(),
                record: record_col.get(i).unwrap_or("").to_string(),
                preferred_course: pref_course_col.get(i).unwrap_or("").to_string(),
                preferred_distance: narrow(pref_distance_col.get(i), i, "preferred_distance")?,
                frame_aptitude: narrow(frame_apt_col.get(i), i, "frame_aptitude")?,
                going_aptitude: narrow(going_apt_col.get(i), i, "going_aptitude")?,
            });
        }

        Ok(horses)
    }
}

/// Narrow an integer cell; missing cells become zero
fn narrow<T>(value: Option<i64>, row: usize, column: &str) -> Result<T>
where
    T: TryFrom<i64> + Default,
{
    match value {
        Some(v) => T::try_from(v).map_err(|_| {
            KeibaError::InvalidData(format!("Row {} column {} out of range: {}", row, column, v))
        }),
        None => Ok(T::default()),
    }
}

impl RaceSource for CsvRaceSource {
    fn fetch_entries(&self, key: &RaceKey) -> Result<Vec<Horse>> {
        let horses = self.get_race(key)?;
        if horses.is_empty() {
            return Err(KeibaError::RaceNotFound(key.to_string()));
        }
        info!(race = %key, entries = horses.len(), "race card loaded from CSV");
        Ok(horses)
    }

    fn describe(&self) -> String {
        format!("CSV {:?}", self.path)
    }
}
