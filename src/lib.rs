//! combatflow - streaming classifier and reducer for game combat logs
//!
//! Lines from an append-only log are parsed into typed [`Event`]s and folded
//! into a fixed set of running aggregators. A [`Session`] owns the ingestion
//! task; readers take the shared side of its lock whenever the batch counter
//! moves.

pub mod collector;
pub mod config;
pub mod event;
pub mod parser;
pub mod prescan;
pub mod session;
pub mod settings;
pub mod ui;

pub use collector::{Collector, Collectors, SessionInfo};
pub use event::{Event, EventKind, Vitals};
pub use parser::{parse_line, ParseError};
pub use session::{OpenOptions, Registry, Session, SessionError};
pub use settings::{Settings, SettingsProvider};
