//! Time-window scoping of a session

use chrono::NaiveDateTime;

/// Half-open interval `[start, end)`, optionally attributed to a username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub username: Option<String>,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Self {
        Self {
            start,
            end,
            username: None,
        }
    }

    pub fn for_user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start && self.end.map_or(true, |end| timestamp < end)
    }
}

/// Result of checking an event against the scope
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<'a> {
    /// Skip the event
    Outside,
    /// Forward it; `username` overrides the learned one when set
    Inside { username: Option<&'a str> },
}

/// Zero or more disjoint windows. An empty scope admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    windows: Vec<TimeWindow>,
}

impl Scope {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(windows: Vec<TimeWindow>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn is_unbounded(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn admit(&self, timestamp: NaiveDateTime) -> Admission<'_> {
        if self.windows.is_empty() {
            return Admission::Inside { username: None };
        }

        match self.windows.iter().find(|window| window.contains(timestamp)) {
            Some(window) => Admission::Inside {
                username: window.username.as_deref(),
            },
            None => Admission::Outside,
        }
    }
}
