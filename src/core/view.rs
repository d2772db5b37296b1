//! View models for the race card and score sheet
//!
//! These are pure functions of the horse list and the session's annotation
//! store. They never create annotation entries.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::annotation::{AnnotationStore, Marker};
use crate::error::{KeibaError, Result};
use crate::models::Horse;

/// Number of leading rows emphasized on the race card
pub const EMPHASIZED_ROWS: usize = 6;
/// Number of leading totals highlighted on the score sheet
pub const HIGHLIGHTED_TOTALS: usize = 3;

/// Race card ordering (並び替え)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Base score, highest first; manual adjustments do not reorder
    #[default]
    Score,
    /// Odds, shortest first
    Odds,
    /// Popularity rank, favorite first
    Popularity,
    /// Post position (馬番)
    Number,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Score,
        SortOrder::Odds,
        SortOrder::Popularity,
        SortOrder::Number,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Score => "スコア順",
            SortOrder::Odds => "オッズ順",
            SortOrder::Popularity => "人気順",
            SortOrder::Number => "馬番順",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortOrder {
    type Err = KeibaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" | "スコア順" => Ok(SortOrder::Score),
            "odds" | "オッズ順" => Ok(SortOrder::Odds),
            "popularity" | "人気順" => Ok(SortOrder::Popularity),
            "number" | "馬番順" => Ok(SortOrder::Number),
            _ => Err(KeibaError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// One row of the race card (出馬表)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceCardRow {
    pub frame: u8,
    pub number: u8,
    pub name: String,
    pub sex_age: String,
    pub carried_weight: f64,
    pub body_weight: u16,
    pub jockey: String,
    pub running_style: String,
    pub odds: f64,
    pub popularity: u8,
    pub base_score: i32,
    pub manual_adjustment: i32,
    pub total_score: i32,
    pub marker: Marker,
    pub emphasized: bool,
}

/// Race card view model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceCard {
    pub sort: SortOrder,
    pub rows: Vec<RaceCardRow>,
}

/// Build the race card in the requested order
///
/// With `emphasize_top`, rows whose total score reaches the sixth best total
/// (or the lowest total on cards with fewer horses) are flagged.
pub fn build_race_card(
    horses: &[Horse],
    store: &AnnotationStore,
    sort: SortOrder,
    emphasize_top: bool,
) -> RaceCard {
    let mut rows: Vec<RaceCardRow> = horses
        .iter()
        .map(|h| {
            let annotation = store.annotation_or_default(&h.name);
            RaceCardRow {
                frame: h.frame,
                number: h.number,
                name: h.name.clone(),
                sex_age: h.sex_age.clone(),
                carried_weight: h.carried_weight,
                body_weight: h.body_weight,
                jockey: h.jockey.clone(),
                running_style: h.running_style.clone(),
                odds: h.odds,
                popularity: h.popularity,
                base_score: h.base_score,
                manual_adjustment: annotation.manual_adjustment,
                total_score: store.compute_display_score(&h.name, h.base_score),
                marker: annotation.marker,
                emphasized: false,
            }
        })
        .collect();

    match sort {
        SortOrder::Score => rows.sort_by(|a, b| b.base_score.cmp(&a.base_score)),
        SortOrder::Odds => {
            rows.sort_by(|a, b| a.odds.partial_cmp(&b.odds).unwrap_or(Ordering::Equal))
        }
        SortOrder::Popularity => rows.sort_by_key(|r| r.popularity),
        SortOrder::Number => rows.sort_by_key(|r| r.number),
    }

    if emphasize_top {
        if let Some(cutoff) = nth_best(rows.iter().map(|r| r.total_score), EMPHASIZED_ROWS) {
            for row in &mut rows {
                row.emphasized = row.total_score >= cutoff;
            }
        }
    }

    RaceCard { sort, rows }
}

/// One row of the score sheet (スコア詳細)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub name: String,
    pub total_score: i32,
    pub base_score: i32,
    pub manual_adjustment: i32,
    pub sex_age: String,
    pub pedigree: String,
    pub jockey: String,
    pub owner: String,
    pub breeder: String,
    pub trainer: String,
    pub record: String,
    pub preferred_course: String,
    pub preferred_distance: u32,
    pub running_style: String,
    pub frame_aptitude: u8,
    pub going_aptitude: u8,
    pub highlighted: bool,
}

/// Score sheet sorted by total score, top three totals highlighted
pub fn build_score_sheet(horses: &[Horse], store: &AnnotationStore) -> Vec<ScoreRow> {
    let mut rows: Vec<ScoreRow> = horses
        .iter()
        .map(|h| ScoreRow {
            name: h.name.clone(),
            total_score: store.compute_display_score(&h.name, h.base_score),
            base_score: h.base_score,
            manual_adjustment: store.annotation_or_default(&h.name).manual_adjustment,
            sex_age: h.sex_age.clone(),
            pedigree: h.pedigree.clone(),
            jockey: h.jockey.clone(),
            owner: h.owner.clone(),
            breeder: h.breeder.clone(),
            trainer: h.trainer.clone(),
            record: h.record.clone(),
            preferred_course: h.preferred_course.clone(),
            preferred_distance: h.preferred_distance,
            running_style: h.running_style.clone(),
            frame_aptitude: h.frame_aptitude,
            going_aptitude: h.going_aptitude,
            highlighted: false,
        })
        .collect();

    rows.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    let mut top: Vec<i32> = rows.iter().map(|r| r.total_score).collect();
    top.truncate(HIGHLIGHTED_TOTALS);
    for row in &mut rows {
        row.highlighted = top.contains(&row.total_score);
    }

    rows
}

/// Horses ranked by base score, highest first; ties keep card order
pub fn top_by_base_score(horses: &[Horse], n: usize) -> Vec<&Horse> {
    let mut ranked: Vec<&Horse> = horses.iter().collect();
    ranked.sort_by(|a, b| b.base_score.cmp(&a.base_score));
    ranked.truncate(n);
    ranked
}

/// The n-th best value (1-based), or the worst when there are fewer values
fn nth_best(values: impl Iterator<Item = i32>, n: usize) -> Option<i32> {
    let mut sorted: Vec<i32> = values.collect();
    if sorted.is_empty() || n == 0 {
        return None;
    }
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let idx = (n - 1).min(sorted.len() - 1);
    Some(sorted[idx])
}
