//! Per-horse rank markers (印) and manual score adjustments
//!
//! An [`AnnotationStore`] belongs to exactly one user session. It is keyed by
//! horse name and remembers what the user picked across repeated renders of
//! the race card. Entries are created lazily with a blank marker and a zero
//! adjustment and are only removed when the whole session is reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{validate_adjustment, KeibaError, Result};

/// Rank marker assigned by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Marker {
    #[default]
    #[serde(rename = "")]
    Blank,
    /// ◎ 本命
    #[serde(rename = "◎")]
    DoubleCircle,
    /// ○ 対抗
    #[serde(rename = "○")]
    Circle,
    /// ▲ 単穴
    #[serde(rename = "▲")]
    Triangle,
    /// △ 連下
    #[serde(rename = "△")]
    OpenTriangle,
    #[serde(rename = "⭐", alias = "⭐\u{fe0e}", alias = "⭐\u{fe0f}")]
    Star,
    /// × 消し
    #[serde(rename = "×")]
    Cross,
}

impl Marker {
    /// Every selectable marker, blank first
    pub const ALL: [Marker; 7] = [
        Marker::Blank,
        Marker::DoubleCircle,
        Marker::Circle,
        Marker::Triangle,
        Marker::OpenTriangle,
        Marker::Star,
        Marker::Cross,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Marker::Blank => "",
            Marker::DoubleCircle => "◎",
            Marker::Circle => "○",
            Marker::Triangle => "▲",
            Marker::OpenTriangle => "△",
            Marker::Star => "⭐",
            Marker::Cross => "×",
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Marker::Blank)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Marker {
    type Err = KeibaError;

    fn from_str(s: &str) -> Result<Self> {
        // The star is often typed with a text or emoji variation selector.
        let trimmed = s.trim().trim_end_matches(&['\u{fe0e}', '\u{fe0f}'][..]);
        match trimmed {
            "" | "none" => Ok(Marker::Blank),
            "◎" => Ok(Marker::DoubleCircle),
            "○" => Ok(Marker::Circle),
            "▲" => Ok(Marker::Triangle),
            "△" => Ok(Marker::OpenTriangle),
            "⭐" => Ok(Marker::Star),
            "×" => Ok(Marker::Cross),
            _ => Err(KeibaError::InvalidMarker(s.to_string())),
        }
    }
}

/// User annotation for one horse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub marker: Marker,
    pub manual_adjustment: i32,
}

/// Session-scoped annotation state keyed by horse name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationStore {
    annotations: HashMap<String, Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the annotation for a horse, storing the default on first sight
    pub fn get_annotation(&mut self, horse_id: &str) -> Annotation {
        *self.entry(horse_id)
    }

    /// Read without creating; unseen horses report the default
    pub fn annotation_or_default(&self, horse_id: &str) -> Annotation {
        self.annotations.get(horse_id).copied().unwrap_or_default()
    }

    pub fn contains(&self, horse_id: &str) -> bool {
        self.annotations.contains_key(horse_id)
    }

    /// Make sure every horse on a freshly loaded card has an entry
    pub fn ensure_horses<'a, I>(&mut self, horse_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in horse_ids {
            self.entry(id);
        }
    }

    pub fn set_marker(&mut self, horse_id: &str, marker: Marker) {
        debug!(horse = horse_id, marker = marker.symbol(), "set marker");
        self.entry(horse_id).marker = marker;
    }

    /// Set a marker from its symbol; unknown symbols leave the entry untouched
    pub fn set_marker_symbol(&mut self, horse_id: &str, symbol: &str) -> Result<Marker> {
        let marker: Marker = symbol.parse()?;
        self.set_marker(horse_id, marker);
        Ok(marker)
    }

    /// Set the manual adjustment; values outside -3..=3 are rejected, never clamped
    pub fn set_manual_adjustment(&mut self, horse_id: &str, value: i32) -> Result<()> {
        validate_adjustment(value)?;
        debug!(horse = horse_id, value, "set manual adjustment");
        self.entry(horse_id).manual_adjustment = value;
        Ok(())
    }

    /// Base score plus the stored manual adjustment
    pub fn compute_display_score(&self, horse_id: &str, base_score: i32) -> i32 {
        base_score + self.annotation_or_default(horse_id).manual_adjustment
    }

    /// Drop every annotation (session reset)
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Horses with a non-blank marker, sorted by name
    pub fn marked(&self) -> Vec<(&str, Marker)> {
        let mut marked: Vec<(&str, Marker)> = self
            .annotations
            .iter()
            .filter(|(_, a)| !a.marker.is_blank())
            .map(|(name, a)| (name.as_str(), a.marker))
            .collect();
        marked.sort_by(|a, b| a.0.cmp(b.0));
        marked
    }

    fn entry(&mut self, horse_id: &str) -> &mut Annotation {
        self.annotations.entry(horse_id.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_annotation_creates_default() {
        let mut store = AnnotationStore::new();
        assert!(!store.contains("A"));

        let ann = store.get_annotation("A");
        assert_eq!(ann.marker, Marker::Blank);
        assert_eq!(ann.manual_adjustment, 0);
        assert!(store.contains("A"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_annotation_idempotent() {
        let mut store = AnnotationStore::new();
        store.set_marker("A", Marker::Circle);
        let first = store.get_annotation("A");
        let second = store.get_annotation("A");
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_marker_symbol() {
        let mut store = AnnotationStore::new();
        let marker = store.set_marker_symbol("A", "◎").unwrap();
        assert_eq!(marker, Marker::DoubleCircle);
        assert_eq!(store.get_annotation("A").marker, Marker::DoubleCircle);
    }

    #[test]
    fn test_set_marker_invalid_keeps_previous() {
        let mut store = AnnotationStore::new();
        store.set_marker("A", Marker::Triangle);

        let result = store.set_marker_symbol("A", "★★");
        assert!(matches!(result, Err(KeibaError::InvalidMarker(_))));
        assert_eq!(store.get_annotation("A").marker, Marker::Triangle);
    }

    #[test]
    fn test_star_variation_selectors() {
        assert_eq!("⭐".parse::<Marker>().unwrap(), Marker::Star);
        assert_eq!("⭐\u{fe0e}".parse::<Marker>().unwrap(), Marker::Star);
        assert_eq!("⭐\u{fe0f}".parse::<Marker>().unwrap(), Marker::Star);
    }

    #[test]
    fn test_marker_symbols_round_trip() {
        for marker in Marker::ALL {
            assert_eq!(marker.symbol().parse::<Marker>().unwrap(), marker);
        }
    }

    #[test]
    fn test_marker_serde_uses_symbols() {
        let json = serde_json::to_string(&Marker::Cross).unwrap();
        assert_eq!(json, "\"×\"");
        let star: Marker = serde_json::from_str("\"⭐\u{fe0e}\"").unwrap();
        assert_eq!(star, Marker::Star);
    }

    #[test]
    fn test_set_manual_adjustment_out_of_range_rejected() {
        let mut store = AnnotationStore::new();
        let result = store.set_manual_adjustment("A", 4);
        assert!(matches!(
            result,
            Err(KeibaError::InvalidAdjustment { value: 4 })
        ));
        assert_eq!(store.get_annotation("A").manual_adjustment, 0);

        store.set_manual_adjustment("A", -2).unwrap();
        assert!(store.set_manual_adjustment("A", -4).is_err());
        assert_eq!(store.get_annotation("A").manual_adjustment, -2);
    }

    #[test]
    fn test_compute_display_score() {
        let mut store = AnnotationStore::new();
        store.set_manual_adjustment("A", 2).unwrap();
        assert_eq!(store.compute_display_score("A", 85), 87);
        assert_eq!(store.compute_display_score("B", 70), 70);
        // Reading a score never creates an entry
        assert!(!store.contains("B"));
    }

    #[test]
    fn test_ensure_horses_and_clear() {
        let mut store = AnnotationStore::new();
        store.ensure_horses(["A", "B", "C"]);
        assert_eq!(store.len(), 3);

        store.set_marker("B", Marker::Star);
        assert_eq!(store.marked(), vec![("B", Marker::Star)]);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get_annotation("B").marker, Marker::Blank);
    }

    #[test]
    fn test_stores_are_independent() {
        let mut first = AnnotationStore::new();
        let second = AnnotationStore::new();
        first.set_manual_adjustment("A", 3).unwrap();
        assert_eq!(second.compute_display_score("A", 80), 80);
    }
}
