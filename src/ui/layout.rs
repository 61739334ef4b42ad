use {
    super::renderer::{bar, format_rate, format_vitals, percent},
    crate::{
        collector::{DamageRecord, HealRecord, MiscCounters, Ranking},
        session::Registry,
    },
    chrono::NaiveDateTime,
    ratatui::{
        layout::{Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph, Row, Table, Tabs},
        Frame,
    },
};

const BAR_WIDTH: usize = 20;
const MAX_ROWS: usize = 50;

/// Render the main UI layout
pub fn render_layout(f: &mut Frame, area: Rect, registry: &Registry, tab: usize, now: NaiveDateTime) {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Active tab
            Constraint::Length(3), // Footer/Status
        ])
        .split(area);

    let tabs = registry.tab_names();
    let tab = tab.min(tabs.len().saturating_sub(1));
    render_tabs(f, chunks[0], &tabs, tab);

    let collectors = registry.collectors();
    match tabs.get(tab).copied() {
        Some("Damage Dealt") => {
            let dealt = &collectors.damage_dealt;
            let title = format!(
                "Damage dealt by skill | total {} | {}",
                format_vitals(dealt.total()),
                format_rate(dealt.rate().rate_at(now))
            );
            render_damage_table(f, chunks[1], &title, dealt.by_skill());
        }
        Some("Damage Taken") => {
            let taken = &collectors.damage_taken;
            let halves = split_horizontal(chunks[1]);
            let title = format!(
                "By attacker | total {} | {}",
                format_vitals(taken.total()),
                format_rate(taken.rate().rate_at(now))
            );
            render_damage_table(f, halves[0], &title, taken.by_entity());
            render_damage_table(f, halves[1], "By attacker type", taken.by_type());
        }
        Some("Healing") => {
            let healing = &collectors.healing;
            let halves = split_horizontal(chunks[1]);
            let title = format!("Allies | {}", format_rate(healing.rate().rate_at(now)));
            render_heal_table(f, halves[0], &title, healing.allies());
            render_heal_table(f, halves[1], "Everyone (enemies by type)", healing.all_grouped());
        }
        Some("Skills") => render_skills_table(f, chunks[1], registry),
        Some("Leveling") => render_leveling_table(f, chunks[1], registry),
        Some("Misc") => render_misc(f, chunks[1], registry),
        _ => {}
    }

    render_footer(f, chunks[2], registry);
}

fn split_horizontal(area: Rect) -> std::rc::Rc<[Rect]> {
    RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area)
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn render_tabs(f: &mut Frame, area: Rect, tabs: &[&'static str], selected: usize) {
    let tabs = Tabs::new(tabs.to_vec())
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("combatflow"))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn render_damage_table(f: &mut Frame, area: Rect, title: &str, ranking: &Ranking<DamageRecord>) {
    let header = Row::new(vec!["Name", "Uses", "H/A/P", "Crit", "Evaded", "Fatal", ""])
        .style(header_style());

    let rows: Vec<Row> = ranking
        .entries()
        .iter()
        .take(MAX_ROWS)
        .map(|record| {
            Row::new(vec![
                record.name.clone(),
                record.uses.to_string(),
                format_vitals(record.damage),
                percent(record.crits, record.uses),
                percent(record.evasions, record.uses),
                record.fatalities.to_string(),
                bar(record.damage.total(), ranking.max(), BAR_WIDTH),
            ])
            .style(Style::default().fg(Color::Red))
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(6),
        Constraint::Length(14),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(BAR_WIDTH as u16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(table, area);
}

fn render_heal_table(f: &mut Frame, area: Rect, title: &str, ranking: &Ranking<HealRecord>) {
    let header = Row::new(vec!["Name", "Count", "H/A/P", ""]).style(header_style());

    let rows: Vec<Row> = ranking
        .entries()
        .iter()
        .take(MAX_ROWS)
        .map(|record| {
            let color = if record.ally { Color::Green } else { Color::Red };
            Row::new(vec![
                record.name.clone(),
                record.count.to_string(),
                format_vitals(record.healed),
                bar(record.healed.total(), ranking.max(), BAR_WIDTH),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(6),
        Constraint::Length(14),
        Constraint::Length(BAR_WIDTH as u16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(table, area);
}

fn render_skills_table(f: &mut Frame, area: Rect, registry: &Registry) {
    let skills = registry.collectors().skills.global();
    let header = Row::new(vec!["Skill", "Uses", "Hits", "Crits", "Evaded", "Fatal", ""])
        .style(header_style());

    let rows: Vec<Row> = skills
        .entries()
        .iter()
        .take(MAX_ROWS)
        .map(|record| {
            Row::new(vec![
                record.name.clone(),
                record.uses.to_string(),
                record.hits.to_string(),
                record.crits.to_string(),
                record.evasions.to_string(),
                record.fatalities.to_string(),
                bar(record.uses as i64, skills.max(), BAR_WIDTH),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(BAR_WIDTH as u16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Skill uses"));
    f.render_widget(table, area);
}

fn render_leveling_table(f: &mut Frame, area: Rect, registry: &Registry) {
    let leveling = &registry.collectors().leveling;
    let header = Row::new(vec!["Skill", "XP", "Gains", "Level ups", "Level", ""])
        .style(header_style());

    let rows: Vec<Row> = leveling
        .global()
        .entries()
        .iter()
        .take(MAX_ROWS)
        .map(|record| {
            Row::new(vec![
                record.skill.clone(),
                record.xp.to_string(),
                record.gains.to_string(),
                record.level_ups.to_string(),
                record.level.map(|l| l.to_string()).unwrap_or_default(),
                bar(record.xp, leveling.global().max(), BAR_WIDTH),
            ])
            .style(Style::default().fg(Color::Magenta))
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(BAR_WIDTH as u16),
    ];

    let title = format!("Experience | total {} XP", leveling.total_xp());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn render_misc(f: &mut Frame, area: Rect, registry: &Registry) {
    let misc = &registry.collectors().misc;
    let subject = match registry.username() {
        "" => None,
        name => misc.for_subject(name),
    };
    let counters: &MiscCounters = subject.unwrap_or_else(|| misc.global());

    let outcome_line = |label: &'static str, attacker: u64, victim: u64| {
        Line::from(vec![
            Span::styled(format!("{:<12}", label), Style::default().fg(Color::Cyan)),
            Span::raw(format!("dealt {:>6}   taken {:>6}", attacker, victim)),
        ])
    };

    let mut text = vec![
        outcome_line("Fatalities", counters.as_attacker.fatalities, counters.as_victim.fatalities),
        outcome_line("Crits", counters.as_attacker.crits, counters.as_victim.crits),
        outcome_line("Evasions", counters.as_attacker.evasions, counters.as_victim.evasions),
        outcome_line("Plain hits", counters.as_attacker.plain, counters.as_victim.plain),
        Line::from(""),
        Line::from(format!(
            "Coins found {}   received {}",
            counters.coins_found, counters.coins_received
        )),
        Line::from(format!("Errors {}", counters.errors)),
    ];
    if let Some(error) = misc.last_error() {
        text.push(Line::from(vec![
            Span::styled("Last error: ", Style::default().fg(Color::Red)),
            Span::raw(error.to_string()),
        ]));
    }

    let title = if subject.is_some() {
        format!("Misc | {}", registry.username())
    } else {
        "Misc | everyone".to_string()
    };
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, registry: &Registry) {
    let user = match registry.username() {
        "" => "(not logged in)",
        name => name,
    };

    let text = vec![Line::from(vec![
        Span::styled("User: ", Style::default().fg(Color::Green)),
        Span::raw(user.to_string()),
        Span::raw(" | "),
        Span::styled("Events: ", Style::default().fg(Color::Cyan)),
        Span::raw(registry.events().to_string()),
        Span::raw(" | "),
        Span::raw("q/Esc quit, Tab/arrows switch, r reset"),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(text).block(footer), area);
}
