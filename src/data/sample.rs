//! Built-in sample race card
//!
//! Used when no CSV is configured. The same six horses are returned for any
//! race key.

use super::RaceSource;
use crate::error::Result;
use crate::models::{Horse, RaceKey};

/// Sample entry source
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleRaceSource;

impl RaceSource for SampleRaceSource {
    fn fetch_entries(&self, _key: &RaceKey) -> Result<Vec<Horse>> {
        Ok(sample_horses())
    }

    fn describe(&self) -> String {
        "sample card".to_string()
    }
}

#[allow(clippy::too_many_arguments)]
fn horse(
    number: u8,
    name: &str,
    sex_age: &str,
    carried_weight: f64,
    body_weight: u16,
    jockey: &str,
    running_style: &str,
    odds: f64,
    popularity: u8,
    base_score: i32,
    pedigree: &str,
    owner: &str,
    breeder: &str,
    trainer: &str,
    record: &str,
    preferred_course: &str,
    preferred_distance: u32,
    frame_aptitude: u8,
    going_aptitude: u8,
) -> Horse {
    Horse {
        frame: number,
        number,
        name: name.to_string(),
        sex_age: sex_age.to_string(),
        carried_weight,
        body_weight,
        jockey: jockey.to_string(),
        running_style: running_style.to_string(),
        odds,
        popularity,
        base_score,
        pedigree: pedigree.to_string(),
        owner: owner.to_string(),
        breeder: breeder.to_string(),
        trainer: trainer.to_string(),
        record: record.to_string(),
        preferred_course: preferred_course.to_string(),
        preferred_distance,
        frame_aptitude,
        going_aptitude,
    }
}

/// The six-horse sample card
pub fn sample_horses() -> Vec<Horse> {
    vec![
        horse(
            1, "アドマイヤテラ", "牡4", 57.0, 500, "川田", "差し", 3.2, 1, 85,
            "サンデー系", "A", "X牧場", "(栗東)藤沢", "1-2-1-2", "東京", 1800, 3, 3,
        ),
        horse(
            2, "カランダガン", "セ4", 57.0, 502, "M.バルザローナ", "先行", 5.1, 2, 78,
            "キングマンボ系", "B", "Y牧場", "(美浦)高木", "0-1-1-3", "京都", 2000, 2, 2,
        ),
        horse(
            3, "サンプルA", "牝3", 54.0, 470, "武豊", "追込", 12.5, 4, 70,
            "ミスプロ系", "C", "Z牧場", "(栗東)池江", "2-0-1-2", "中山", 1600, 1, 2,
        ),
        horse(
            4, "サンプルB", "牡5", 56.0, 480, "福永", "逃げ", 7.8, 3, 72,
            "サンデー系", "D", "W牧場", "(美浦)友道", "1-1-0-3", "阪神", 1800, 3, 1,
        ),
        horse(
            5, "サンプルC", "牡6", 57.0, 488, "横山", "先行", 20.0, 6, 65,
            "ノーザン系", "E", "V牧場", "(栗東)田中", "0-0-1-4", "中京", 2000, 2, 1,
        ),
        horse(
            6, "サンプルD", "牝4", 55.0, 472, "池添", "差し", 15.0, 5, 68,
            "ミスプロ系", "F", "U牧場", "(美浦)佐藤", "1-1-2-1", "福島", 1400, 2, 2,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sample_horses_unique_names() {
        let horses = sample_horses();
        assert_eq!(horses.len(), 6);
        let names: HashSet<&str> = horses.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_sample_source_ignores_key() {
        let a = SampleRaceSource
            .fetch_entries(&RaceKey::new(20250705, "東京", 11).unwrap())
            .unwrap();
        let b = SampleRaceSource
            .fetch_entries(&RaceKey::new(20250101, "小倉", 1).unwrap())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].base_score, 85);
    }
}
