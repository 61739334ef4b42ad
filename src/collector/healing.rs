//! Healing received, split between the player's side and enemies

use super::{entity_type, CollectError, Collector, RateMeter, Ranked, Ranking, SessionInfo};
use crate::event::{Event, EventKind, Vitals};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Skills containing this marker are used by a pet; their subject is an ally
pub const PET_SKILL_MARKER: &str = "(Pet)";

#[derive(Debug, Clone, Serialize)]
pub struct HealRecord {
    pub name: String,
    pub count: u64,
    pub healed: Vitals,
    pub ally: bool,
}

impl HealRecord {
    fn new(name: &str, ally: bool) -> Self {
        Self {
            name: name.to_string(),
            count: 0,
            healed: Vitals::ZERO,
            ally,
        }
    }
}

impl Ranked for HealRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank_key(&self) -> i64 {
        self.healed.total()
    }
}

/// Five parallel breakdowns, each ranked with its own max:
/// allies, enemies, enemies by type, everyone, and everyone with enemies
/// grouped by type.
#[derive(Debug, Clone, Serialize)]
pub struct Healing {
    allies: Ranking<HealRecord>,
    enemies: Ranking<HealRecord>,
    enemy_types: Ranking<HealRecord>,
    all: Ranking<HealRecord>,
    all_grouped: Ranking<HealRecord>,
    /// Subjects seen using a pet skill this session; only grows until reset
    pets: HashSet<String>,
    rate: RateMeter,
}

impl Healing {
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            allies: Ranking::new(),
            enemies: Ranking::new(),
            enemy_types: Ranking::new(),
            all: Ranking::new(),
            all_grouped: Ranking::new(),
            pets: HashSet::new(),
            rate: RateMeter::new(idle_reset),
        }
    }

    pub fn allies(&self) -> &Ranking<HealRecord> {
        &self.allies
    }

    pub fn enemies(&self) -> &Ranking<HealRecord> {
        &self.enemies
    }

    pub fn enemy_types(&self) -> &Ranking<HealRecord> {
        &self.enemy_types
    }

    pub fn all(&self) -> &Ranking<HealRecord> {
        &self.all
    }

    pub fn all_grouped(&self) -> &Ranking<HealRecord> {
        &self.all_grouped
    }

    /// Ally-side healing rate
    pub fn rate(&self) -> &RateMeter {
        &self.rate
    }

    pub fn is_known_pet(&self, name: &str) -> bool {
        self.pets.contains(name)
    }

    fn is_ally(&self, info: &SessionInfo<'_>, subject: &str) -> bool {
        info.is_self(subject) || self.pets.contains(subject) || info.is_allowlisted_pet(subject)
    }
}

fn heal(ranking: &mut Ranking<HealRecord>, name: &str, ally: bool, healed: Vitals) {
    ranking.record(
        name,
        || HealRecord::new(name, ally),
        |record| {
            record.count += 1;
            record.healed += healed;
        },
    );
}

impl Collector for Healing {
    fn tab_name(&self) -> &'static str {
        "Healing"
    }

    fn reset(&mut self) {
        self.allies.clear();
        self.enemies.clear();
        self.enemy_types.clear();
        self.all.clear();
        self.all_grouped.clear();
        self.pets.clear();
        self.rate.reset();
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        match &event.kind {
            EventKind::SkillUse { subject, skill, .. } => {
                if skill.contains(PET_SKILL_MARKER) && !self.pets.contains(subject) {
                    log::debug!("Discovered pet: {}", subject);
                    self.pets.insert(subject.clone());
                }
            }
            EventKind::Recovered { subject, healed } => {
                let healed = *healed;
                if self.is_ally(info, subject) {
                    heal(&mut self.allies, subject, true, healed);
                    heal(&mut self.all, subject, true, healed);
                    heal(&mut self.all_grouped, subject, true, healed);
                    self.rate.add(healed.total(), event.timestamp);
                } else {
                    let kind = entity_type(subject);
                    heal(&mut self.enemies, subject, false, healed);
                    heal(&mut self.enemy_types, &kind, false, healed);
                    heal(&mut self.all, subject, false, healed);
                    heal(&mut self.all_grouped, &kind, false, healed);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use crate::settings::Settings;

    fn feed(healing: &mut Healing, info: &SessionInfo<'_>, lines: &[&str]) {
        for line in lines {
            let event = parse_line(line).unwrap().unwrap();
            healing.collect(info, &event).unwrap();
        }
    }

    #[test]
    fn test_discovered_pet_counts_as_ally() {
        let settings = Settings::default();
        let info = SessionInfo::new("Aria", &settings);
        let mut healing = Healing::new(Duration::from_secs(10));

        feed(
            &mut healing,
            &info,
            &[
                "24-05-02 13:00:00\t[Combat] Shadow Wolf: Bite (Pet) on Rat! Dmg: 4 health",
                "24-05-02 13:00:01\t[Combat] Shadow Wolf Recovered: 6 health",
                "24-05-02 13:00:02\t[Combat] Shadow Wolf: Howl on Rat!",
                "24-05-02 13:00:03\t[Combat] Shadow Wolf Recovered: 4 health",
            ],
        );

        assert!(healing.is_known_pet("Shadow Wolf"));
        let wolf = healing.allies().get("Shadow Wolf").unwrap();
        assert_eq!(wolf.count, 2);
        assert_eq!(wolf.healed, Vitals::new(10, 0, 0));
        assert!(healing.enemies().is_empty());
    }

    #[test]
    fn test_allowlist_and_self_are_allies() {
        let settings = Settings {
            pet_names: vec!["stone golem".to_string()],
            normalize_skill_names: false,
        };
        let info = SessionInfo::new("Aria", &settings);
        let mut healing = Healing::new(Duration::from_secs(10));

        feed(
            &mut healing,
            &info,
            &[
                "24-05-02 13:00:00\t[Combat] StoneGolem Recovered: 3 health",
                "24-05-02 13:00:01\t[Combat] Aria Recovered: 5 health, 5 armor",
                "24-05-02 13:00:02\t[Combat] You Recovered: 1 health",
            ],
        );

        assert_eq!(healing.allies().len(), 3);
        assert!(healing.enemies().is_empty());
        assert_eq!(healing.allies().entries()[0].name, "Aria");
    }

    #[test]
    fn test_enemy_breakdowns() {
        let settings = Settings::default();
        let info = SessionInfo::new("Aria", &settings);
        let mut healing = Healing::new(Duration::from_secs(10));

        feed(
            &mut healing,
            &info,
            &[
                "24-05-02 13:00:00\t[Combat] Goblin Shaman #1 Recovered: 10 health",
                "24-05-02 13:00:01\t[Combat] Goblin Shaman #2 Recovered: 15 health",
                "24-05-02 13:00:02\t[Combat] Aria Recovered: 12 health",
            ],
        );

        assert_eq!(healing.enemies().len(), 2);
        assert_eq!(healing.enemy_types().len(), 1);
        assert_eq!(healing.enemy_types().get("Goblin Shaman").unwrap().count, 2);
        assert_eq!(healing.all().len(), 3);

        let grouped: Vec<(&str, i64)> = healing
            .all_grouped()
            .entries()
            .iter()
            .map(|r| (r.name(), r.rank_key()))
            .collect();
        assert_eq!(grouped, vec![("Goblin Shaman", 25), ("Aria", 12)]);
        assert_eq!(healing.all_grouped().max(), 25);
        assert_eq!(healing.enemies().max(), 15);
        assert_eq!(healing.allies().max(), 12);
    }

    #[test]
    fn test_reset_forgets_pets() {
        let settings = Settings::default();
        let info = SessionInfo::new("Aria", &settings);
        let mut healing = Healing::new(Duration::from_secs(10));

        feed(
            &mut healing,
            &info,
            &["24-05-02 13:00:00\t[Combat] Imp: Firebolt (Pet) on Rat!"],
        );
        healing.reset();
        feed(
            &mut healing,
            &info,
            &["24-05-02 13:00:01\t[Combat] Imp Recovered: 2 health"],
        );

        assert!(!healing.is_known_pet("Imp"));
        assert!(healing.allies().is_empty());
        assert_eq!(healing.enemies().len(), 1);
    }
}
