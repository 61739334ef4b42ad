//! Skill usage counts, overall and per subject

use super::{CollectError, Collector, PerSubject, Ranked, Ranking, SessionInfo};
use crate::event::{Event, EventKind, Vitals};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SkillRecord {
    pub name: String,
    pub uses: u64,
    pub hits: u64,
    pub crits: u64,
    pub evasions: u64,
    pub fatalities: u64,
    pub damage: Vitals,
}

impl SkillRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uses: 0,
            hits: 0,
            crits: 0,
            evasions: 0,
            fatalities: 0,
            damage: Vitals::ZERO,
        }
    }
}

impl Ranked for SkillRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank_key(&self) -> i64 {
        self.uses as i64
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillUses {
    global: Ranking<SkillRecord>,
    by_subject: PerSubject<Ranking<SkillRecord>>,
}

impl SkillUses {
    /// Skills used by anyone
    pub fn global(&self) -> &Ranking<SkillRecord> {
        &self.global
    }

    pub fn for_subject(&self, subject: &str) -> Option<&Ranking<SkillRecord>> {
        self.by_subject.get(subject)
    }

    /// Every subject seen using a skill, first-seen order
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.by_subject.subjects()
    }
}

impl Collector for SkillUses {
    fn tab_name(&self) -> &'static str {
        "Skills"
    }

    fn reset(&mut self) {
        self.global.clear();
        self.by_subject.clear();
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        let EventKind::SkillUse {
            subject,
            skill,
            damage,
            evaded,
            crit,
            fatal,
            ..
        } = &event.kind
        else {
            return Ok(());
        };
        if subject.is_empty() {
            return Err(CollectError::Invariant {
                collector: self.tab_name(),
                detail: format!("skill {:?} used without a subject", skill),
            });
        }

        let skill = info.skill_name(skill);
        let apply = |record: &mut SkillRecord| {
            record.uses += 1;
            if damage.is_some() && !*evaded {
                record.hits += 1;
            }
            record.crits += *crit as u64;
            record.evasions += *evaded as u64;
            record.fatalities += *fatal as u64;
            record.damage += damage.unwrap_or_default();
        };

        // Attribute the player's own "You" lines to the known username
        let subject = if info.is_self(subject) {
            info.subject()
        } else {
            subject.as_str()
        };

        self.global.record(&skill, || SkillRecord::new(&skill), apply);
        self.by_subject.update(subject, Ranking::new, |skills| {
            skills.record(&skill, || SkillRecord::new(&skill), apply)
        });
        Ok(())
    }
}
