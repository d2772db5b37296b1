//! User sessions
//!
//! Each session owns its race selection, the loaded race card and an
//! independent [`AnnotationStore`]. Sessions never share annotation state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::annotation::AnnotationStore;
use crate::data::RaceSource;
use crate::error::{KeibaError, Result};
use crate::models::{Horse, RaceKey, RaceMeta};

pub type SessionId = Uuid;

/// Sessions untouched for this long are dropped (12 hours)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 12 * 60 * 60;

/// State held for one user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub race: RaceKey,
    pub meta: RaceMeta,
    pub entries: Vec<Horse>,
    pub annotations: AnnotationStore,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(race: RaceKey, meta: RaceMeta, entries: Vec<Horse>) -> Self {
        let now = Utc::now();
        let mut session = Self {
            id: Uuid::new_v4(),
            race,
            meta,
            entries: Vec::new(),
            annotations: AnnotationStore::new(),
            created_at: now,
            updated_at: now,
        };
        session.replace_entries(entries);
        session
    }

    /// Switch to another race. Annotations are keyed by horse name and survive.
    pub fn load_race(&mut self, race: RaceKey, source: &dyn RaceSource) -> Result<()> {
        let entries = source.fetch_entries(&race)?;
        self.race = race;
        self.replace_entries(entries);
        Ok(())
    }

    pub fn horse(&self, name: &str) -> Result<&Horse> {
        self.entries
            .iter()
            .find(|h| h.name == name)
            .ok_or_else(|| KeibaError::UnknownHorse(name.to_string()))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> bool {
        now - self.updated_at > max_idle
    }

    /// Clear annotations; the loaded card stays
    pub fn reset(&mut self) {
        self.annotations.clear();
        self.annotations
            .ensure_horses(self.entries.iter().map(|h| h.name.as_str()));
        self.touch();
    }

    fn replace_entries(&mut self, entries: Vec<Horse>) {
        self.annotations
            .ensure_horses(entries.iter().map(|h| h.name.as_str()));
        self.entries = entries;
        self.touch();
    }
}

/// All live sessions, partitioned by id
///
/// Sessions idle for longer than `idle_timeout` are treated as gone and are
/// swept out whenever the registry is mutated.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Drop sessions idle for longer than `max_idle`; returns how many went
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_idle(max_idle, now));
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Open a session on `race`, fetching its card from `source`
    pub fn create(
        &mut self,
        race: RaceKey,
        meta: RaceMeta,
        source: &dyn RaceSource,
    ) -> Result<&Session> {
        self.evict_idle(self.idle_timeout);
        let entries = source.fetch_entries(&race)?;
        let session = Session::new(race, meta, entries);
        let id = session.id;
        info!(session = %id, race = %session.race, entries = session.entries.len(), "session created");
        Ok(self.sessions.entry(id).or_insert(session))
    }

    /// Read-only lookup; does not extend the session's lifetime
    pub fn get(&self, id: &str) -> Result<&Session> {
        let key = parse_id(id)?;
        self.sessions
            .get(&key)
            .filter(|s| !s.is_idle(self.idle_timeout, Utc::now()))
            .ok_or_else(|| KeibaError::SessionNotFound(id.to_string()))
    }

    /// Lookup that marks the session as active
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Session> {
        let key = parse_id(id)?;
        self.evict_idle(self.idle_timeout);
        let session = self
            .sessions
            .get_mut(&key)
            .ok_or_else(|| KeibaError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    pub fn reset(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.reset();
        info!(session = id, "session reset");
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Session> {
        let key = parse_id(id)?;
        let session = self
            .sessions
            .remove(&key)
            .ok_or_else(|| KeibaError::SessionNotFound(id.to_string()))?;
        info!(session = id, "session closed");
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn parse_id(id: &str) -> Result<SessionId> {
    Uuid::parse_str(id).map_err(|_| KeibaError::SessionNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::Marker;
    use crate::data::SampleRaceSource;

    fn race() -> RaceKey {
        RaceKey::new(20250705, "東京", 11).unwrap()
    }

    #[test]
    fn test_create_session_initializes_annotations() {
        let mut registry = SessionRegistry::new();
        let session = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap();

        assert_eq!(session.entries.len(), 6);
        assert_eq!(session.annotations.len(), 6);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_annotations() {
        let mut registry = SessionRegistry::new();
        let a = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();
        let b = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();

        registry
            .get_mut(&a)
            .unwrap()
            .annotations
            .set_marker("サンプルA", Marker::DoubleCircle);

        let other = registry.get(&b).unwrap();
        assert_eq!(
            other.annotations.annotation_or_default("サンプルA").marker,
            Marker::Blank
        );
    }

    #[test]
    fn test_reset_and_remove() {
        let mut registry = SessionRegistry::new();
        let id = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();

        {
            let session = registry.get_mut(&id).unwrap();
            session
                .annotations
                .set_manual_adjustment("サンプルB", 3)
                .unwrap();
        }
        registry.reset(&id).unwrap();
        let session = registry.get(&id).unwrap();
        assert_eq!(session.annotations.compute_display_score("サンプルB", 72), 72);
        assert_eq!(session.annotations.len(), 6);

        registry.remove(&id).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(&id),
            Err(KeibaError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_session_id() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.get("not-a-uuid"),
            Err(KeibaError::SessionNotFound(_))
        ));
        assert!(registry.get(&Uuid::new_v4().to_string()).is_err());
    }

    #[test]
    fn test_idle_sessions_are_evicted_on_create() {
        let mut registry = SessionRegistry::with_idle_timeout(Duration::minutes(30));
        let stale = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();
        let fresh = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();

        registry.get_mut(&stale).unwrap().updated_at = Utc::now() - Duration::minutes(31);
        assert!(matches!(
            registry.get(&stale),
            Err(KeibaError::SessionNotFound(_))
        ));

        registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&fresh).is_ok());
        assert!(matches!(
            registry.get_mut(&stale),
            Err(KeibaError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_get_mut_keeps_session_alive() {
        let mut registry = SessionRegistry::with_idle_timeout(Duration::minutes(30));
        let id = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();

        registry.get_mut(&id).unwrap().updated_at = Utc::now() - Duration::minutes(29);
        registry.get_mut(&id).unwrap();

        assert_eq!(registry.evict_idle(Duration::minutes(1)), 0);

        registry.get_mut(&id).unwrap().updated_at = Utc::now() - Duration::minutes(2);
        assert_eq!(registry.evict_idle(Duration::minutes(1)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_idle_timeout() {
        let registry = SessionRegistry::new();
        assert_eq!(
            registry.idle_timeout(),
            Duration::seconds(DEFAULT_SESSION_TTL_SECS)
        );
    }

    #[test]
    fn test_load_race_keeps_annotations() {
        let mut registry = SessionRegistry::new();
        let id = registry
            .create(race(), RaceMeta::default(), &SampleRaceSource)
            .unwrap()
            .id
            .to_string();

        let session = registry.get_mut(&id).unwrap();
        session.annotations.set_marker("カランダガン", Marker::Circle);
        session
            .load_race(RaceKey::new(20250706, "阪神", 2).unwrap(), &SampleRaceSource)
            .unwrap();

        assert_eq!(session.race.course, "阪神");
        assert_eq!(
            session.annotations.annotation_or_default("カランダガン").marker,
            Marker::Circle
        );
        assert!(session.horse("カランダガン").is_ok());
        assert!(session.horse("不明").is_err());
    }
}
