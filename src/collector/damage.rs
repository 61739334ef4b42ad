//! Damage dealt by the player (per skill) and damage taken (per attacker)

use super::{CollectError, Collector, RateMeter, Ranked, Ranking, SessionInfo};
use crate::event::{Event, EventKind, Vitals};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;

/// Bucket name used for damage without an attacker
pub const INDIRECT_SOURCE: &str = "Indirect damage";

#[derive(Debug, Clone, Serialize)]
pub struct DamageRecord {
    pub name: String,
    pub uses: u64,
    pub damage: Vitals,
    pub crits: u64,
    pub evasions: u64,
    pub fatalities: u64,
    #[serde(skip)]
    last_used: Option<NaiveDateTime>,
}

impl DamageRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uses: 0,
            damage: Vitals::ZERO,
            crits: 0,
            evasions: 0,
            fatalities: 0,
            last_used: None,
        }
    }

    /// Fold one hit in. Repeated lines sharing a timestamp count as one use.
    fn apply(&mut self, hit: &Hit) {
        if self.last_used != Some(hit.timestamp) {
            self.uses += 1;
            self.last_used = Some(hit.timestamp);
        }
        self.damage += hit.damage;
        self.crits += hit.crit as u64;
        self.evasions += hit.evaded as u64;
        self.fatalities += hit.fatal as u64;
    }
}

impl Ranked for DamageRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank_key(&self) -> i64 {
        self.damage.total()
    }
}

struct Hit {
    timestamp: NaiveDateTime,
    damage: Vitals,
    crit: bool,
    evaded: bool,
    fatal: bool,
}

impl Hit {
    fn from_skill_use(event: &Event) -> Option<(Self, &str, &str, &str)> {
        match &event.kind {
            EventKind::SkillUse {
                subject,
                skill,
                victim,
                damage,
                evaded,
                crit,
                fatal,
            } => Some((
                Hit {
                    timestamp: event.timestamp,
                    damage: damage.unwrap_or_default(),
                    crit: *crit,
                    evaded: *evaded,
                    fatal: *fatal,
                },
                subject.as_str(),
                skill.as_str(),
                victim.as_str(),
            )),
            _ => None,
        }
    }
}

fn record_hit(ranking: &mut Ranking<DamageRecord>, name: &str, hit: &Hit) {
    ranking.record(name, || DamageRecord::new(name), |record| record.apply(hit));
}

/// Damage the player deals, bucketed by skill
#[derive(Debug, Clone, Serialize)]
pub struct DamageDealt {
    by_skill: Ranking<DamageRecord>,
    total: Vitals,
    rate: RateMeter,
}

impl DamageDealt {
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            by_skill: Ranking::new(),
            total: Vitals::ZERO,
            rate: RateMeter::new(idle_reset),
        }
    }

    pub fn by_skill(&self) -> &Ranking<DamageRecord> {
        &self.by_skill
    }

    pub fn total(&self) -> Vitals {
        self.total
    }

    pub fn rate(&self) -> &RateMeter {
        &self.rate
    }
}

impl Collector for DamageDealt {
    fn tab_name(&self) -> &'static str {
        "Damage Dealt"
    }

    fn reset(&mut self) {
        self.by_skill.clear();
        self.total = Vitals::ZERO;
        self.rate.reset();
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        let Some((hit, subject, skill, victim)) = Hit::from_skill_use(event) else {
            return Ok(());
        };
        if !info.is_self(subject) || info.is_self(victim) {
            return Ok(());
        }
        if skill.is_empty() {
            return Err(CollectError::Invariant {
                collector: self.tab_name(),
                detail: "skill use without a skill name".to_string(),
            });
        }

        let skill = info.skill_name(skill);
        record_hit(&mut self.by_skill, &skill, &hit);
        self.total += hit.damage;
        self.rate.add(hit.damage.total(), hit.timestamp);
        Ok(())
    }
}

/// Damage the player takes, per attacker and per attacker type
#[derive(Debug, Clone, Serialize)]
pub struct DamageTaken {
    by_entity: Ranking<DamageRecord>,
    by_type: Ranking<DamageRecord>,
    total: Vitals,
    rate: RateMeter,
}

impl DamageTaken {
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            by_entity: Ranking::new(),
            by_type: Ranking::new(),
            total: Vitals::ZERO,
            rate: RateMeter::new(idle_reset),
        }
    }

    pub fn by_entity(&self) -> &Ranking<DamageRecord> {
        &self.by_entity
    }

    pub fn by_type(&self) -> &Ranking<DamageRecord> {
        &self.by_type
    }

    pub fn total(&self) -> Vitals {
        self.total
    }

    pub fn rate(&self) -> &RateMeter {
        &self.rate
    }

    fn record(&mut self, source: &str, hit: &Hit) {
        record_hit(&mut self.by_entity, source, hit);
        record_hit(&mut self.by_type, &entity_type(source), hit);
        self.total += hit.damage;
        self.rate.add(hit.damage.total(), hit.timestamp);
    }
}

impl Collector for DamageTaken {
    fn tab_name(&self) -> &'static str {
        "Damage Taken"
    }

    fn reset(&mut self) {
        self.by_entity.clear();
        self.by_type.clear();
        self.total = Vitals::ZERO;
        self.rate.reset();
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        if let EventKind::IndirectDamage { subject, damage } = &event.kind {
            if info.is_self(subject) {
                let hit = Hit {
                    timestamp: event.timestamp,
                    damage: damage.abs(),
                    crit: false,
                    evaded: false,
                    fatal: false,
                };
                self.record(INDIRECT_SOURCE, &hit);
            }
            return Ok(());
        }

        let Some((hit, subject, _, victim)) = Hit::from_skill_use(event) else {
            return Ok(());
        };
        if !info.is_self(victim) || info.is_self(subject) {
            return Ok(());
        }
        if subject.is_empty() {
            return Err(CollectError::Invariant {
                collector: self.tab_name(),
                detail: "skill use without an attacker".to_string(),
            });
        }

        self.record(subject, &hit);
        Ok(())
    }
}

/// Entity name with trailing id tokens removed (`Goblin #12` → `Goblin`)
pub fn entity_type(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    while let Some(last) = tokens.last().copied() {
        if tokens.len() == 1 {
            if let Some(idx) = last.find('#').filter(|&idx| idx > 0) {
                tokens[0] = &last[..idx];
            }
            break;
        }
        if last.starts_with('#') || last.chars().all(|c| c.is_ascii_digit()) {
            tokens.pop();
        } else {
            if let Some(idx) = last.find('#').filter(|&idx| idx > 0) {
                let n = tokens.len();
                tokens[n - 1] = &last[..idx];
            }
            break;
        }
    }
    tokens.join(" ")
}
