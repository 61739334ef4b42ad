//! XP gains and level-ups per skill

use super::{CollectError, Collector, PerSubject, Ranked, Ranking, SessionInfo};
use crate::event::{Event, EventKind};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LevelRecord {
    pub skill: String,
    pub xp: i64,
    pub gains: u64,
    pub level_ups: u64,
    /// Highest level reached this session, if any level-up was seen
    pub level: Option<u32>,
}

impl LevelRecord {
    fn new(skill: &str) -> Self {
        Self {
            skill: skill.to_string(),
            xp: 0,
            gains: 0,
            level_ups: 0,
            level: None,
        }
    }

    fn apply(&mut self, xp: i64, level: Option<u32>) {
        self.xp = self.xp.saturating_add(xp);
        self.gains += 1;
        if let Some(level) = level {
            self.level_ups += 1;
            self.level = Some(self.level.map_or(level, |current| current.max(level)));
        }
    }
}

impl Ranked for LevelRecord {
    fn name(&self) -> &str {
        &self.skill
    }

    fn rank_key(&self) -> i64 {
        self.xp
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubjectLevels {
    pub skills: Ranking<LevelRecord>,
    pub total_xp: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Leveling {
    global: Ranking<LevelRecord>,
    by_subject: PerSubject<SubjectLevels>,
    total_xp: i64,
}

impl Leveling {
    pub fn global(&self) -> &Ranking<LevelRecord> {
        &self.global
    }

    pub fn total_xp(&self) -> i64 {
        self.total_xp
    }

    pub fn for_subject(&self, subject: &str) -> Option<&SubjectLevels> {
        self.by_subject.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.by_subject.subjects()
    }
}

impl Collector for Leveling {
    fn tab_name(&self) -> &'static str {
        "Leveling"
    }

    fn reset(&mut self) {
        self.global.clear();
        self.by_subject.clear();
        self.total_xp = 0;
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        let (xp, skill, level) = match &event.kind {
            EventKind::XpGained { xp, skill } => (*xp, skill, None),
            EventKind::XpGainedLeveledUp { xp, skill, level } => (*xp, skill, Some(*level)),
            _ => return Ok(()),
        };

        let apply = |record: &mut LevelRecord| record.apply(xp, level);
        self.global.record(skill, || LevelRecord::new(skill), apply);
        self.by_subject
            .update(info.subject(), SubjectLevels::default, |levels| {
                levels.skills.record(skill, || LevelRecord::new(skill), apply);
                levels.total_xp = levels.total_xp.saturating_add(xp);
            });
        self.total_xp = self.total_xp.saturating_add(xp);
        Ok(())
    }
}
