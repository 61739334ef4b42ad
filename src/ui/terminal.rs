use {
    crate::session::Session,
    crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::time::Duration,
};

/// Upper bound between redraws when no batch settles
const REDRAW_TICK: Duration = Duration::from_millis(250);

/// Why the viewer returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    SessionEnded,
}

/// Run the TUI event loop
///
/// Redraws whenever a batch settles or the tick elapses, whichever comes
/// first. Only ever takes the read side of the session lock.
pub async fn run_ui(session: &Session) -> Result<UiExit, Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen keeps the UI apart from stderr logs
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, session).await;

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    session: &Session,
) -> Result<UiExit, Box<dyn std::error::Error>> {
    let mut updates = session.subscribe();
    let mut tab = 0usize;
    let mut tab_count: usize;

    loop {
        {
            let registry = session.read().await;
            tab_count = registry.tab_names().len().max(1);
            tab %= tab_count;
            let now = chrono::Local::now().naive_local();
            terminal.draw(|f| {
                let area = f.size();
                crate::ui::layout::render_layout(f, area, &registry, tab, now);
            })?;
        }

        if !session.is_alive() {
            return Ok(UiExit::SessionEnded);
        }

        tokio::select! {
            changed = updates.changed() => {
                // Closed channel: the loop is gone for good
                if changed.is_err() {
                    return Ok(UiExit::SessionEnded);
                }
            }
            _ = tokio::time::sleep(REDRAW_TICK) => {}
        }

        // Drain pending keys without blocking
        while crossterm::event::poll(Duration::ZERO)? {
            let TermEvent::Key(key) = crossterm::event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(UiExit::Quit),
                KeyCode::Tab | KeyCode::Right => tab = (tab + 1) % tab_count,
                KeyCode::BackTab | KeyCode::Left => tab = (tab + tab_count - 1) % tab_count,
                KeyCode::Char('r') => session.reset().await,
                _ => {}
            }
        }
    }
}
