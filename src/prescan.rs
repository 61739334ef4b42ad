//! One-shot pass over a log file to find where each login starts
//!
//! The result feeds time-window scoping: pick a login, build windows from
//! the markers, and re-scope the session at that login's byte offset.

use {
    crate::{
        event::EventKind,
        parser::parse_line,
        session::{LineReader, ReadOutcome, SessionError, TimeWindow},
    },
    chrono::NaiveDateTime,
    serde::Serialize,
    std::path::Path,
};

/// A login line and where it sits in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginMark {
    pub name: String,
    pub timestamp: NaiveDateTime,
    /// Byte offset of the start of the login line
    pub offset: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub logins: Vec<LoginMark>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub lines: u64,
    pub recognized: u64,
    pub malformed: u64,
}

/// Read `path` once to EOF and collect login markers
pub async fn scan_logins(path: impl AsRef<Path>) -> Result<ScanReport, SessionError> {
    let path = path.as_ref();
    let mut reader = LineReader::open(path, 0, false).await?;
    let mut report = ScanReport::default();

    loop {
        let offset = reader.consumed();
        let line = match reader.next_line().await? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Eof => break,
        };
        report.lines += 1;

        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                log::debug!("Pre-scan skipping line {}: {}", report.lines, e);
                report.malformed += 1;
                continue;
            }
        };
        report.recognized += 1;
        report.first.get_or_insert(event.timestamp);
        report.last = Some(event.timestamp);

        if let EventKind::Login { name } = event.kind {
            report.logins.push(LoginMark {
                name,
                timestamp: event.timestamp,
                offset,
            });
        }
    }

    log::info!(
        "Pre-scanned {}: {} lines, {} logins",
        path.display(),
        report.lines,
        report.logins.len()
    );
    Ok(report)
}

/// One window per run of logins by the same user, each ending where the
/// next user's first login begins. The last window is open-ended.
pub fn windows_from_logins(report: &ScanReport) -> Vec<TimeWindow> {
    let mut windows: Vec<TimeWindow> = Vec::new();

    for mark in &report.logins {
        if let Some(current) = windows.last_mut() {
            if current.username.as_deref() == Some(mark.name.as_str()) {
                continue;
            }
            current.end = Some(mark.timestamp);
        }
        windows.push(TimeWindow::new(mark.timestamp, None).for_user(mark.name.clone()));
    }

    windows
}
