//! Combat log line grammar
//!
//! Every line has the shape `<YY-MM-DD HH:MM:SS>\t<category text>`. The
//! category is recognized by prefix; anything unrecognized is dropped
//! (`Ok(None)`), and only a recognized line with an unparseable timestamp is
//! reported as an error. Numbers inside a recognized payload are parsed
//! leniently: a malformed token reads as 0.
//!
//! The parser keeps no state, so it is safe to run over arbitrary lines in any
//! order (live tailing and one-shot pre-scans both use it).

use crate::event::{Event, EventKind, Vitals};
use chrono::NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%y-%m-%d %H:%M:%S";

const COMBAT: &str = "[Combat]";
const XP_EARNED: &str = "[Status] You earned ";
const CORPSE_COINS: &str = "[Status] You searched the corpse and found ";
const RECEIVED_COINS: &str = "[Status] You receive ";
const LOGIN: &str = "***";
const ERROR: &str = "[Error]";

const SKILL_ON: &str = " on ";
const RECOVERED: &str = "Recovered: ";
const INDIRECT: &str = "Suffered indirect dmg: ";

const CRIT: &str = " (CRIT!)";
const EVADED: &str = " (EVADED!)";
const FATALITY: &str = "(FATALITY!)";
const DAMAGE: &str = "Dmg: ";

const XP_IN: &str = " XP in ";
const XP_LEVEL: &str = " XP and reached level ";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid timestamp {raw:?}: {source}")]
    InvalidTimestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Classify one raw line.
///
/// Returns `Ok(None)` for lines without a tab separator or with an
/// unrecognized category.
pub fn parse_line(line: &str) -> Result<Option<Event>, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some((stamp, rest)) = line.split_once('\t') else {
        return Ok(None);
    };

    let Some(kind) = classify(rest.trim_start()) else {
        return Ok(None);
    };

    let timestamp = parse_timestamp(stamp)?;
    Ok(Some(Event::new(timestamp, kind)))
}

pub fn parse_timestamp(stamp: &str) -> Result<NaiveDateTime, ParseError> {
    let stamp = stamp.trim();
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|source| {
        ParseError::InvalidTimestamp {
            raw: stamp.to_string(),
            source,
        }
    })
}

fn classify(rest: &str) -> Option<EventKind> {
    if let Some(body) = rest.strip_prefix(COMBAT) {
        parse_combat(body.trim_start())
    } else if let Some(body) = rest.strip_prefix(XP_EARNED) {
        parse_xp(body)
    } else if let Some(body) = rest.strip_prefix(CORPSE_COINS) {
        Some(EventKind::FoundCoins {
            coins: leading_int(body),
        })
    } else if let Some(body) = rest.strip_prefix(RECEIVED_COINS) {
        Some(EventKind::ReceivedCoins {
            coins: leading_int(body),
        })
    } else if rest.starts_with(LOGIN) {
        parse_login(rest)
    } else if let Some(body) = rest.strip_prefix(ERROR) {
        Some(EventKind::ErrorLine {
            message: body.trim().to_string(),
        })
    } else {
        None
    }
}

/// Skill use, recovery and indirect damage, tried in that order
fn parse_combat(body: &str) -> Option<EventKind> {
    if let Some(on_idx) = body.find(SKILL_ON) {
        return parse_skill_use(body, on_idx);
    }

    if let Some(idx) = body.find(RECOVERED) {
        return Some(EventKind::Recovered {
            subject: subject_name(&body[..idx]),
            healed: parse_vitals(&body[idx + RECOVERED.len()..]),
        });
    }

    if let Some(idx) = body.find(INDIRECT) {
        return Some(EventKind::IndirectDamage {
            subject: subject_name(&body[..idx]),
            damage: parse_vitals(&body[idx + INDIRECT.len()..]),
        });
    }

    None
}

/// `<subject>: <skill> on <victim>(terminator)<remainder>`
fn parse_skill_use(body: &str, on_idx: usize) -> Option<EventKind> {
    let head = &body[..on_idx];
    let (subject, skill) = head.split_once(": ")?;
    let after = &body[on_idx + SKILL_ON.len()..];

    let (victim, crit, evaded, remainder) = if let Some(i) = after.find(CRIT) {
        (&after[..i], true, false, &after[i + CRIT.len()..])
    } else if let Some(i) = after.find(EVADED) {
        (&after[..i], false, true, &after[i + EVADED.len()..])
    } else if let Some(i) = after.find('!') {
        (&after[..i], false, false, &after[i + 1..])
    } else {
        (after, false, false, "")
    };

    let damage = remainder
        .find(DAMAGE)
        .map(|i| parse_vitals(&remainder[i + DAMAGE.len()..]));

    Some(EventKind::SkillUse {
        subject: subject.trim().to_string(),
        skill: skill.trim().to_string(),
        victim: victim.trim().to_string(),
        damage,
        evaded,
        crit,
        fatal: after.contains(FATALITY),
    })
}

fn parse_xp(body: &str) -> Option<EventKind> {
    if let Some(i) = body.find(XP_IN) {
        return Some(EventKind::XpGained {
            xp: leading_int(&body[..i]),
            skill: trim_sentence(&body[i + XP_IN.len()..]),
        });
    }

    let i = body.find(XP_LEVEL)?;
    let (level, skill) = body[i + XP_LEVEL.len()..].split_once(" in ")?;
    Some(EventKind::XpGainedLeveledUp {
        xp: leading_int(&body[..i]),
        skill: trim_sentence(skill),
        level: level.trim().parse().unwrap_or(0),
    })
}

fn parse_login(rest: &str) -> Option<EventKind> {
    let inner = rest.trim_matches('*').trim();
    let name = match inner.rsplit_once(" as ") {
        Some((_, name)) => name,
        None => inner,
    };
    let name = name.trim_matches(|c: char| c == '*' || c == '.' || c == '!' || c.is_whitespace());

    if name.is_empty() {
        return None;
    }
    Some(EventKind::Login {
        name: name.to_string(),
    })
}

/// Damage / healing payload: `<n> health, <n> armor, <n> power`.
///
/// Missing components read as 0, as does the literal `none`.
pub fn parse_vitals(text: &str) -> Vitals {
    let text = text.trim();
    if text.starts_with("none") {
        return Vitals::ZERO;
    }

    let mut rest = text;
    let health = take_component(&mut rest, " health");
    let armor = take_component(&mut rest, " armor");
    let power = take_component(&mut rest, " power");
    Vitals::new(health, armor, power)
}

fn take_component(rest: &mut &str, unit: &str) -> i64 {
    let Some(i) = rest.find(unit) else {
        return 0;
    };
    let value = trailing_int(&rest[..i]);
    let after = &rest[i + unit.len()..];
    *rest = match after.find(", ") {
        Some(j) => &after[j + 2..],
        None => "",
    };
    value
}

fn subject_name(raw: &str) -> String {
    raw.trim().trim_end_matches(':').trim().to_string()
}

fn trim_sentence(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', '!']).trim().to_string()
}

fn leading_int(text: &str) -> i64 {
    text.split_whitespace().next().map(lenient_int).unwrap_or(0)
}

fn trailing_int(text: &str) -> i64 {
    text.split_whitespace().last().map(lenient_int).unwrap_or(0)
}

fn lenient_int(token: &str) -> i64 {
    token
        .trim_end_matches(['.', '!'])
        .replace(',', "")
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn kind(line: &str) -> EventKind {
        parse_line(line).unwrap().unwrap().kind
    }

    #[test]
    fn test_parse_skill_use_hit() {
        let event = parse_line(
            "24-05-02 13:04:05\t[Combat] Goblin: Claw on You! Dmg: 5 health, 2 armor, 0 power",
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.timestamp, ts(13, 4, 5));
        assert_eq!(
            event.kind,
            EventKind::SkillUse {
                subject: "Goblin".to_string(),
                skill: "Claw".to_string(),
                victim: "You".to_string(),
                damage: Some(Vitals::new(5, 2, 0)),
                evaded: false,
                crit: false,
                fatal: false,
            }
        );
    }

    #[test]
    fn test_parse_skill_use_crit_and_fatality() {
        let kind = kind(
            "24-05-02 13:04:05\t[Combat] Hero: Power Strike on Goblin #3 (CRIT!) Dmg: 40 health, 0 armor, 0 power (FATALITY!)",
        );
        match kind {
            EventKind::SkillUse { victim, crit, evaded, fatal, damage, skill, .. } => {
                assert_eq!(skill, "Power Strike");
                assert_eq!(victim, "Goblin #3");
                assert!(crit);
                assert!(!evaded);
                assert!(fatal);
                assert_eq!(damage, Some(Vitals::new(40, 0, 0)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_skill_use_evaded_with_fatality() {
        // Both flags are kept: evaded comes from the terminator, fatality is independent
        let kind = kind("24-05-02 13:04:05\t[Combat] Hero: Slash on Rat (EVADED!) (FATALITY!)");
        match kind {
            EventKind::SkillUse { victim, crit, evaded, fatal, damage, .. } => {
                assert_eq!(victim, "Rat");
                assert!(!crit);
                assert!(evaded);
                assert!(fatal);
                assert_eq!(damage, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_skill_use_crit_wins_over_evaded() {
        let kind = kind("24-05-02 13:04:05\t[Combat] Hero: Slash on Rat (CRIT!) (EVADED!)");
        match kind {
            EventKind::SkillUse { crit, evaded, .. } => {
                assert!(crit);
                assert!(!evaded);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_skill_use_zero_damage() {
        let kind = kind("24-05-02 13:04:05\t[Combat] Hero: Slash on Rat! Dmg: none");
        match kind {
            EventKind::SkillUse { damage, .. } => assert_eq!(damage, Some(Vitals::ZERO)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_recovered() {
        assert_eq!(
            kind("24-05-02 13:04:05\t[Combat] Healer Bot Recovered: 12 health, 0 armor, 3 power"),
            EventKind::Recovered {
                subject: "Healer Bot".to_string(),
                healed: Vitals::new(12, 0, 3),
            }
        );
    }

    #[test]
    fn test_parse_indirect_damage() {
        assert_eq!(
            kind("24-05-02 13:04:05\t[Combat] You Suffered indirect dmg: -4 health"),
            EventKind::IndirectDamage {
                subject: "You".to_string(),
                damage: Vitals::new(-4, 0, 0),
            }
        );
    }

    #[test]
    fn test_parse_xp_plain_and_level_up() {
        assert_eq!(
            kind("24-05-02 13:04:05\t[Status] You earned 120 XP in Swords."),
            EventKind::XpGained {
                xp: 120,
                skill: "Swords".to_string(),
            }
        );
        assert_eq!(
            kind("24-05-02 13:04:05\t[Status] You earned 300 XP and reached level 7 in Heavy Armor!"),
            EventKind::XpGainedLeveledUp {
                xp: 300,
                skill: "Heavy Armor".to_string(),
                level: 7,
            }
        );
    }

    #[test]
    fn test_parse_coins() {
        assert_eq!(
            kind("24-05-02 13:04:05\t[Status] You searched the corpse and found 15 coins."),
            EventKind::FoundCoins { coins: 15 }
        );
        assert_eq!(
            kind("24-05-02 13:04:05\t[Status] You receive 1,250 coins."),
            EventKind::ReceivedCoins { coins: 1250 }
        );
    }

    #[test]
    fn test_parse_login_and_error() {
        assert_eq!(
            kind("24-05-02 13:04:05\t*** Logged in as Aria ***"),
            EventKind::Login {
                name: "Aria".to_string(),
            }
        );
        assert_eq!(
            kind("24-05-02 13:04:05\t[Error] Target out of range"),
            EventKind::ErrorLine {
                message: "Target out of range".to_string(),
            }
        );
    }

    #[test]
    fn test_unrecognized_lines_are_dropped() {
        assert!(parse_line("no tab separator [Combat] A: B on C!").unwrap().is_none());
        assert!(parse_line("24-05-02 13:04:05\t[Chat] hello there").unwrap().is_none());
        assert!(parse_line("garbage\t[Whisper] psst").unwrap().is_none());
        assert!(parse_line("").unwrap().is_none());
    }

    #[test]
    fn test_bad_timestamp_on_recognized_line_is_error() {
        let err = parse_line("2024/05/02 13:04\t[Error] boom").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_vitals_lenient_numbers() {
        assert_eq!(parse_vitals("x health, 2 armor, 3 power"), Vitals::new(0, 2, 3));
        assert_eq!(parse_vitals("2 armor"), Vitals::new(0, 2, 0));
        assert_eq!(parse_vitals("5 health, 1 power"), Vitals::new(5, 0, 1));
        assert_eq!(parse_vitals(""), Vitals::ZERO);
    }

    #[test]
    fn test_trailing_carriage_return_is_ignored() {
        assert_eq!(
            kind("24-05-02 13:04:05\t[Status] You receive 3 coins.\r\n"),
            EventKind::ReceivedCoins { coins: 3 }
        );
    }
}
