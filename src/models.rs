use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::annotation::Marker;
use crate::error::{validate_course, validate_race_no, KeibaError, Result};

/// JRA racecourses, in the order they are offered for selection
pub const COURSES: [&str; 10] = [
    "札幌", "函館", "福島", "新潟", "東京", "中山", "中京", "京都", "阪神", "小倉",
];

/// Horse entry from the race card (出馬表)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
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
    pub pedigree: String,
    pub owner: String,
    pub breeder: String,
    pub trainer: String,
    /// Recent results as 1st-2nd-3rd-other counts, e.g. "1-2-1-2"
    pub record: String,
    pub preferred_course: String,
    pub preferred_distance: u32,
    pub frame_aptitude: u8,
    pub going_aptitude: u8,
}

/// Identifies a single race: date, course and race number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaceKey {
    /// YYYYMMDD
    pub date: u32,
    pub course: String,
    pub race_no: u8,
    /// Provider race id typed in by hand (e.g. 202507050211)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_id: Option<String>,
}

impl RaceKey {
    pub fn new(date: u32, course: &str, race_no: u8) -> Result<Self> {
        let key = Self {
            date,
            course: course.to_string(),
            race_no,
            race_id: None,
        };
        key.validate()?;
        Ok(key)
    }

    /// Check a key that arrived through deserialization
    pub fn validate(&self) -> Result<()> {
        validate_course(&self.course)?;
        validate_race_no(self.race_no)?;
        parse_date(self.date)?;
        Ok(())
    }

    /// Today's first race at the first course in the list
    pub fn today() -> Result<Self> {
        Ok(Self {
            date: date_to_u32(Local::now().date_naive())?,
            course: COURSES[0].to_string(),
            race_no: 1,
            race_id: None,
        })
    }

    pub fn with_race_id(mut self, race_id: impl Into<String>) -> Self {
        let race_id = race_id.into();
        self.race_id = if race_id.trim().is_empty() {
            None
        } else {
            Some(race_id.trim().to_string())
        };
        self
    }

    /// Heading shown above the race card, e.g. "東京 11R"
    pub fn label(&self) -> String {
        format!("{} {}R", self.course, self.race_no)
    }
}

impl std::fmt::Display for RaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", format_date(self.date), self.label())
    }
}

/// Race overview entered alongside the card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceMeta {
    #[serde(default)]
    pub race_name: String,
    /// G1, G2, G3, OP, 条件 or empty
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub post_time: String,
}

/// Parse a YYYYMMDD integer into a calendar date
pub fn parse_date(date: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt((date / 10000) as i32, (date / 100) % 100, date % 100)
        .ok_or_else(|| KeibaError::InvalidRaceKey(format!("Invalid date: {}", date)))
}

/// YYYYMMDD integer for a calendar date; years outside 0..=9999 are rejected
pub fn date_to_u32(date: NaiveDate) -> Result<u32> {
    let year = u32::try_from(date.year())
        .ok()
        .filter(|y| *y <= 9999)
        .ok_or_else(|| KeibaError::InvalidRaceKey(format!("Invalid date: {}", date)))?;
    Ok(year * 10000 + date.month() * 100 + date.day())
}

/// Format date as YYYY-MM-DD
pub fn format_date(date: u32) -> String {
    let year = date / 10000;
    let month = (date / 100) % 100;
    let day = date % 100;
    format!("{}-{:02}-{:02}", year, month, day)
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Session creation request; every field is optional
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub race: Option<RaceKey>,
    #[serde(default)]
    pub meta: Option<RaceMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub race: RaceKey,
    #[serde(default)]
    pub meta: RaceMeta,
    pub entries: usize,
}

/// Race switch request
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeRaceRequest {
    pub race: RaceKey,
    #[serde(default)]
    pub meta: Option<RaceMeta>,
}

/// Race card query string
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CardQuery {
    #[serde(default)]
    pub sort: Option<String>,
}

/// Annotation of one horse together with its scores
#[derive(Debug, Serialize, Deserialize)]
pub struct HorseAnnotation {
    pub name: String,
    pub marker: Marker,
    pub manual_adjustment: i32,
    pub base_score: i32,
    pub total_score: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkerRequest {
    pub marker: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub value: i32,
}

/// Manual stake for one combination, horses in bet order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeOverride {
    pub combination: Vec<String>,
    pub stake: i64,
}

/// Bet planning request (馬券 tab)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    pub bet_type: String,
    #[serde(default)]
    pub selected: Vec<String>,
    pub budget: i64,
    #[serde(default = "default_true")]
    pub auto_allocate: bool,
    #[serde(default)]
    pub overrides: Vec<StakeOverride>,
}

fn default_true() -> bool {
    true
}
