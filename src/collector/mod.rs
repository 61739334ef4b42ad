//! Running aggregators fed by the ingestion loop
//!
//! Every aggregator buckets events with the same primitive,
//! [`create_or_update`]: scan an ordered collection for a match, update it in
//! place or append a fresh bucket. [`Ranking`] wraps that with the re-sort and
//! max recomputation done after every mutation, so display order is always by
//! ranking key and ties keep first-seen order.
//!
//! ```text
//! Event ──► Collectors::dispatch ──► DamageDealt
//!                                 ├─► DamageTaken
//!                                 ├─► Healing
//!                                 ├─► SkillUses
//!                                 ├─► Leveling
//!                                 └─► Misc
//! ```

pub mod damage;
pub mod healing;
pub mod leveling;
pub mod misc;
pub mod rate;
pub mod skills;

pub use damage::{entity_type, DamageDealt, DamageRecord, DamageTaken};
pub use healing::{HealRecord, Healing, PET_SKILL_MARKER};
pub use leveling::{LevelRecord, Leveling, SubjectLevels};
pub use misc::{Misc, MiscCounters, Outcome, OutcomeCounts};
pub use rate::RateMeter;
pub use skills::{SkillRecord, SkillUses};

use crate::event::Event;
use crate::settings::SettingsProvider;
use serde::Serialize;
use std::time::Duration;

/// Name the logged-in player appears under in combat lines
pub const SELF_NAME: &str = "You";

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("{collector}: invariant violated: {detail}")]
    Invariant {
        collector: &'static str,
        detail: String,
    },
}

/// Per-dispatch view of session state handed to each aggregator
pub struct SessionInfo<'a> {
    pub username: &'a str,
    pub settings: &'a dyn SettingsProvider,
}

impl<'a> SessionInfo<'a> {
    pub fn new(username: &'a str, settings: &'a dyn SettingsProvider) -> Self {
        Self { username, settings }
    }

    /// True when `name` refers to the logged-in player
    pub fn is_self(&self, name: &str) -> bool {
        name == SELF_NAME || (!self.username.is_empty() && name == self.username)
    }

    /// Subject the session is currently attributed to
    pub fn subject(&self) -> &str {
        if self.username.is_empty() {
            SELF_NAME
        } else {
            self.username
        }
    }

    /// Skill name as it should be bucketed, normalized if enabled
    pub fn skill_name(&self, raw: &str) -> String {
        if self.settings.normalize_skill_names() {
            normalize_skill_name(raw)
        } else {
            raw.trim().to_string()
        }
    }

    /// Case- and whitespace-insensitive allowlist lookup
    pub fn is_allowlisted_pet(&self, name: &str) -> bool {
        self.settings.is_pet_name(name)
    }
}

/// Strip trailing rank tokens (`Fireball III`, `Bash 2`) from a skill name
pub fn normalize_skill_name(raw: &str) -> String {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        if is_rank_token(last) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

fn is_rank_token(token: &str) -> bool {
    const ROMAN: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
    ROMAN.contains(&token) || (!token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
}

/// One statistic maintained over the event stream
pub trait Collector: Send + Sync {
    /// Label used by consumers to group the display
    fn tab_name(&self) -> &'static str;

    fn reset(&mut self);

    /// Fold one event in. Variants the collector does not care about are a no-op.
    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError>;
}

/// Find the first element matching `matches` and update it in place, or
/// append `create()` when nothing matches. Order is preserved; callers sort.
pub fn create_or_update<T, M, C, U>(items: &mut Vec<T>, matches: M, create: C, update: U)
where
    M: Fn(&T) -> bool,
    C: FnOnce() -> T,
    U: FnOnce(&mut T),
{
    match items.iter().position(|item| matches(item)) {
        Some(idx) => update(&mut items[idx]),
        None => items.push(create()),
    }
}

/// A bucket that can be ranked for display
pub trait Ranked {
    fn name(&self) -> &str;
    fn rank_key(&self) -> i64;
}

/// Named buckets kept sorted by rank key, descending
#[derive(Debug, Clone, Serialize)]
pub struct Ranking<T> {
    entries: Vec<T>,
    max: i64,
}

impl<T> Default for Ranking<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max: 0,
        }
    }
}

impl<T: Ranked> Ranking<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the bucket called `name`, then re-rank.
    ///
    /// `seed` builds an empty bucket; `apply` folds the current event into
    /// either the new or the existing bucket.
    pub fn record<S, A>(&mut self, name: &str, seed: S, apply: A)
    where
        S: FnOnce() -> T,
        A: Fn(&mut T),
    {
        let apply = &apply;
        create_or_update(
            &mut self.entries,
            |entry| entry.name() == name,
            || {
                let mut entry = seed();
                apply(&mut entry);
                entry
            },
            |entry| apply(entry),
        );
        self.rerank();
    }

    fn rerank(&mut self) {
        self.entries.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));
        self.max = self
            .entries
            .iter()
            .map(|entry| entry.rank_key().saturating_abs())
            .max()
            .unwrap_or(0);
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Largest absolute rank key, used to scale relative bars
    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.max = 0;
    }
}

/// Stats kept for one subject, in first-seen order
#[derive(Debug, Clone, Serialize)]
pub struct SubjectEntry<T> {
    pub subject: String,
    pub stats: T,
}

/// Per-subject breakdown that remembers every subject observed this session
#[derive(Debug, Clone, Serialize)]
pub struct PerSubject<T> {
    subjects: Vec<SubjectEntry<T>>,
}

impl<T> Default for PerSubject<T> {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
        }
    }
}

impl<T> PerSubject<T> {
    pub fn update<S, A>(&mut self, subject: &str, seed: S, apply: A)
    where
        S: FnOnce() -> T,
        A: Fn(&mut T),
    {
        let apply = &apply;
        create_or_update(
            &mut self.subjects,
            |entry| entry.subject == subject,
            || {
                let mut stats = seed();
                apply(&mut stats);
                SubjectEntry {
                    subject: subject.to_string(),
                    stats,
                }
            },
            |entry| apply(&mut entry.stats),
        );
    }

    pub fn get(&self, subject: &str) -> Option<&T> {
        self.subjects
            .iter()
            .find(|entry| entry.subject == subject)
            .map(|entry| &entry.stats)
    }

    /// Subjects in the order they were first observed
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|entry| entry.subject.as_str())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn clear(&mut self) {
        self.subjects.clear();
    }
}

/// The fixed set of aggregators owned by a session, in registration order
#[derive(Debug, Serialize)]
pub struct Collectors {
    pub damage_dealt: DamageDealt,
    pub damage_taken: DamageTaken,
    pub healing: Healing,
    pub skills: SkillUses,
    pub leveling: Leveling,
    pub misc: Misc,
}

impl Collectors {
    /// `idle_reset` is the idle gap after which rolling rates start over
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            damage_dealt: DamageDealt::new(idle_reset),
            damage_taken: DamageTaken::new(idle_reset),
            healing: Healing::new(idle_reset),
            skills: SkillUses::default(),
            leveling: Leveling::default(),
            misc: Misc::default(),
        }
    }

    pub fn iter(&self) -> [&dyn Collector; 6] {
        [
            &self.damage_dealt,
            &self.damage_taken,
            &self.healing,
            &self.skills,
            &self.leveling,
            &self.misc,
        ]
    }

    pub fn iter_mut(&mut self) -> [&mut dyn Collector; 6] {
        [
            &mut self.damage_dealt,
            &mut self.damage_taken,
            &mut self.healing,
            &mut self.skills,
            &mut self.leveling,
            &mut self.misc,
        ]
    }

    /// Feed `event` to every collector. A failing collector does not stop the
    /// others; failures come back tagged with the collector's tab name.
    pub fn dispatch(
        &mut self,
        info: &SessionInfo<'_>,
        event: &Event,
    ) -> Vec<(&'static str, CollectError)> {
        let mut errors = Vec::new();
        for collector in self.iter_mut() {
            if let Err(e) = collector.collect(info, event) {
                errors.push((collector.tab_name(), e));
            }
        }
        errors
    }

    pub fn reset(&mut self) {
        for collector in self.iter_mut() {
            collector.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[derive(Debug)]
    struct Bucket {
        name: String,
        value: i64,
    }

    impl Ranked for Bucket {
        fn name(&self) -> &str {
            &self.name
        }

        fn rank_key(&self) -> i64 {
            self.value
        }
    }

    fn bump(ranking: &mut Ranking<Bucket>, name: &str, by: i64) {
        ranking.record(
            name,
            || Bucket {
                name: name.to_string(),
                value: 0,
            },
            |b| b.value += by,
        );
    }

    #[test]
    fn test_create_or_update_appends_then_updates() {
        let mut items: Vec<(String, u32)> = Vec::new();

        for name in ["a", "b", "a"] {
            create_or_update(
                &mut items,
                |(n, _)| n == name,
                || (name.to_string(), 1),
                |(_, count)| *count += 1,
            );
        }

        assert_eq!(items, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }

    #[test]
    fn test_ranking_resorts_and_tracks_max() {
        let mut ranking = Ranking::new();
        bump(&mut ranking, "small", 1);
        bump(&mut ranking, "big", 5);
        bump(&mut ranking, "small", 10);

        let names: Vec<&str> = ranking.entries().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["small", "big"]);
        assert_eq!(ranking.max(), 11);
        assert_eq!(ranking.get("big").map(|b| b.value), Some(5));
    }

    #[test]
    fn test_ranking_ties_keep_first_seen_order() {
        let mut ranking = Ranking::new();
        bump(&mut ranking, "first", 3);
        bump(&mut ranking, "second", 3);

        let names: Vec<&str> = ranking.entries().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_per_subject_keeps_history() {
        let mut per: PerSubject<u32> = PerSubject::default();
        per.update("Aria", || 0, |n| *n += 1);
        per.update("Bran", || 0, |n| *n += 1);
        per.update("Aria", || 0, |n| *n += 1);

        assert_eq!(per.get("Aria"), Some(&2));
        assert_eq!(per.get("Bran"), Some(&1));
        assert_eq!(per.subjects().collect::<Vec<_>>(), vec!["Aria", "Bran"]);
    }

    #[test]
    fn test_normalize_skill_name() {
        assert_eq!(normalize_skill_name("Fireball III"), "Fireball");
        assert_eq!(normalize_skill_name("  Bash 2 "), "Bash");
        assert_eq!(normalize_skill_name("Power Strike"), "Power Strike");
        assert_eq!(normalize_skill_name("X"), "X");
    }

    #[test]
    fn test_session_info_self_and_allowlist() {
        let settings = Settings {
            pet_names: vec!["Fluffy  Bear".to_string()],
            normalize_skill_names: true,
        };
        let info = SessionInfo::new("Aria", &settings);

        assert!(info.is_self("Aria"));
        assert!(info.is_self("You"));
        assert!(!info.is_self("Goblin"));
        assert!(info.is_allowlisted_pet("fluffy bear"));
        assert_eq!(info.skill_name("Heal II"), "Heal");
    }
}
