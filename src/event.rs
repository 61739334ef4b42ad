//! Typed events classified from combat log lines

use chrono::NaiveDateTime;
use serde::Serialize;
use std::ops::{Add, AddAssign};

/// Health / armor / power triplet carried by damage and healing lines.
///
/// Components may be negative (drains, indirect damage). A zero triplet is
/// meaningful: the hit landed but did no measurable damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Vitals {
    pub health: i64,
    pub armor: i64,
    pub power: i64,
}

impl Vitals {
    pub const ZERO: Vitals = Vitals { health: 0, armor: 0, power: 0 };

    pub fn new(health: i64, armor: i64, power: i64) -> Self {
        Self { health, armor, power }
    }

    /// Component-wise absolute value
    pub fn abs(self) -> Self {
        Self {
            health: self.health.saturating_abs(),
            armor: self.armor.saturating_abs(),
            power: self.power.saturating_abs(),
        }
    }

    /// Sum of all components, the default ranking scalar. Saturates.
    pub fn total(&self) -> i64 {
        self.health
            .saturating_add(self.armor)
            .saturating_add(self.power)
    }
}

impl Add for Vitals {
    type Output = Vitals;

    fn add(self, rhs: Vitals) -> Vitals {
        Vitals {
            health: self.health.saturating_add(rhs.health),
            armor: self.armor.saturating_add(rhs.armor),
            power: self.power.saturating_add(rhs.power),
        }
    }
}

impl AddAssign for Vitals {
    fn add_assign(&mut self, rhs: Vitals) {
        *self = *self + rhs;
    }
}

/// One classified, timestamped log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EventKind {
    Login {
        name: String,
    },
    SkillUse {
        subject: String,
        skill: String,
        victim: String,
        damage: Option<Vitals>,
        evaded: bool,
        crit: bool,
        fatal: bool,
    },
    Recovered {
        subject: String,
        healed: Vitals,
    },
    IndirectDamage {
        subject: String,
        damage: Vitals,
    },
    XpGained {
        xp: i64,
        skill: String,
    },
    XpGainedLeveledUp {
        xp: i64,
        skill: String,
        level: u32,
    },
    FoundCoins {
        coins: i64,
    },
    ReceivedCoins {
        coins: i64,
    },
    ErrorLine {
        message: String,
    },
}

impl Event {
    pub fn new(timestamp: NaiveDateTime, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn is_login(&self) -> bool {
        matches!(self.kind, EventKind::Login { .. })
    }

    /// Short label used in log output
    pub fn label(&self) -> &'static str {
        match self.kind {
            EventKind::Login { .. } => "login",
            EventKind::SkillUse { .. } => "skill-use",
            EventKind::Recovered { .. } => "recovered",
            EventKind::IndirectDamage { .. } => "indirect-damage",
            EventKind::XpGained { .. } => "xp",
            EventKind::XpGainedLeveledUp { .. } => "xp-level-up",
            EventKind::FoundCoins { .. } => "found-coins",
            EventKind::ReceivedCoins { .. } => "received-coins",
            EventKind::ErrorLine { .. } => "error-line",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vitals_arithmetic() {
        let a = Vitals::new(5, -2, 0);
        let b = Vitals::new(1, 1, 3);

        assert_eq!(a + b, Vitals::new(6, -1, 3));
        assert_eq!(a.abs(), Vitals::new(5, 2, 0));
        assert_eq!((a + b).total(), 8);

        let mut acc = Vitals::ZERO;
        acc += a;
        acc += a;
        assert_eq!(acc, Vitals::new(10, -4, 0));
    }

    #[test]
    fn test_vitals_saturate_at_the_bounds() {
        let huge = Vitals::new(i64::MAX, 1, 0);
        assert_eq!(huge.total(), i64::MAX);
        assert_eq!((huge + huge).health, i64::MAX);
        assert_eq!(Vitals::new(i64::MIN, 0, 0).abs().health, i64::MAX);
    }

    #[test]
    fn test_zero_vitals_is_default() {
        assert_eq!(Vitals::default(), Vitals::ZERO);
        assert_eq!(Vitals::ZERO.total(), 0);
    }
}
