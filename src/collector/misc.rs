//! Outcome counters, coins and error lines

use super::{CollectError, Collector, PerSubject, SessionInfo};
use crate::event::{Event, EventKind};
use serde::Serialize;

/// Mutually exclusive classification of a skill use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Fatality,
    Crit,
    Evasion,
    Plain,
}

impl Outcome {
    /// Fatality beats crit, crit beats evasion
    pub fn classify(fatal: bool, crit: bool, evaded: bool) -> Self {
        if fatal {
            Outcome::Fatality
        } else if crit {
            Outcome::Crit
        } else if evaded {
            Outcome::Evasion
        } else {
            Outcome::Plain
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub fatalities: u64,
    pub crits: u64,
    pub evasions: u64,
    pub plain: u64,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fatality => self.fatalities += 1,
            Outcome::Crit => self.crits += 1,
            Outcome::Evasion => self.evasions += 1,
            Outcome::Plain => self.plain += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.fatalities + self.crits + self.evasions + self.plain
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MiscCounters {
    pub as_attacker: OutcomeCounts,
    pub as_victim: OutcomeCounts,
    pub coins_found: i64,
    pub coins_received: i64,
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Misc {
    global: MiscCounters,
    by_subject: PerSubject<MiscCounters>,
    last_error: Option<String>,
}

impl Misc {
    /// Counters over every subject. Each skill use has one attacker and one
    /// victim, so the two role totals match here.
    pub fn global(&self) -> &MiscCounters {
        &self.global
    }

    pub fn for_subject(&self, subject: &str) -> Option<&MiscCounters> {
        self.by_subject.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.by_subject.subjects()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Collector for Misc {
    fn tab_name(&self) -> &'static str {
        "Misc"
    }

    fn reset(&mut self) {
        self.global = MiscCounters::default();
        self.by_subject.clear();
        self.last_error = None;
    }

    fn collect(&mut self, info: &SessionInfo<'_>, event: &Event) -> Result<(), CollectError> {
        match &event.kind {
            EventKind::SkillUse {
                subject,
                victim,
                evaded,
                crit,
                fatal,
                ..
            } => {
                let outcome = Outcome::classify(*fatal, *crit, *evaded);
                let attacker = if info.is_self(subject) { info.subject() } else { subject.as_str() };
                let target = if info.is_self(victim) { info.subject() } else { victim.as_str() };

                self.global.as_attacker.add(outcome);
                self.global.as_victim.add(outcome);
                self.by_subject
                    .update(attacker, MiscCounters::default, |c| c.as_attacker.add(outcome));
                self.by_subject
                    .update(target, MiscCounters::default, |c| c.as_victim.add(outcome));
            }
            EventKind::FoundCoins { coins } => {
                self.global.coins_found = self.global.coins_found.saturating_add(*coins);
                self.by_subject.update(info.subject(), MiscCounters::default, |c| {
                    c.coins_found = c.coins_found.saturating_add(*coins)
                });
            }
            EventKind::ReceivedCoins { coins } => {
                self.global.coins_received = self.global.coins_received.saturating_add(*coins);
                self.by_subject.update(info.subject(), MiscCounters::default, |c| {
                    c.coins_received = c.coins_received.saturating_add(*coins)
                });
            }
            EventKind::ErrorLine { message } => {
                self.global.errors += 1;
                self.by_subject
                    .update(info.subject(), MiscCounters::default, |c| c.errors += 1);
                self.last_error = Some(message.clone());
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

    #[test]
    fn test_outcome_priority() {
        assert_eq!(Outcome::classify(true, true, true), Outcome::Fatality);
        assert_eq!(Outcome::classify(false, true, true), Outcome::Crit);
        assert_eq!(Outcome::classify(false, false, true), Outcome::Evasion);
        assert_eq!(Outcome::classify(false, false, false), Outcome::Plain);
    }

    #[test]
    fn test_roles_coins_and_errors() {
        let settings = Settings::default();
        let info = SessionInfo::new("Aria", &settings);
        let mut misc = Misc::default();

        let lines = [
            "24-05-02 13:00:00\t[Combat] You: Slash on Rat (CRIT!) Dmg: 9 health (FATALITY!)",
            "24-05-02 13:00:01\t[Combat] Rat: Bite on Aria (EVADED!)",
            "24-05-02 13:00:02\t[Combat] Rat: Bite on Aria (CRIT!) Dmg: 4 health",
            "24-05-02 13:00:03\t[Status] You searched the corpse and found 12 coins.",
            "24-05-02 13:00:04\t[Status] You receive 3 coins.",
            "24-05-02 13:00:05\t[Error] Not enough power",
        ];
        for line in lines {
            misc.collect(&info, &parse_line(line).unwrap().unwrap()).unwrap();
        }

        let aria = misc.for_subject("Aria").unwrap();
        assert_eq!(aria.as_attacker.fatalities, 1);
        assert_eq!(aria.as_attacker.crits, 0);
        assert_eq!(aria.as_victim.evasions, 1);
        assert_eq!(aria.as_victim.crits, 1);
        assert_eq!(aria.coins_found, 12);
        assert_eq!(aria.coins_received, 3);
        assert_eq!(aria.errors, 1);

        let rat = misc.for_subject("Rat").unwrap();
        assert_eq!(rat.as_attacker.total(), 2);
        assert_eq!(rat.as_victim.fatalities, 1);

        assert_eq!(misc.global().as_attacker.total(), 3);
        assert_eq!(misc.last_error(), Some("Not enough power"));
    }
}
