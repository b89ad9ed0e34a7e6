use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
};

use super::pane_block;
use crate::calendar::{
    ProjectScope, Quarter, days_in_month, is_today, is_weekend, leading_blanks, month_name,
    project_days,
};
use crate::models::Project;

const WEEKDAYS: &str = "Mo Tu We Th Fr Sa Su";

/// Quarter shown on the calendar pane
pub struct CalendarState {
    quarter: Quarter,
    today: NaiveDate,
}

impl CalendarState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            quarter: Quarter::containing(today),
            today,
        }
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    pub fn next_quarter(&mut self) {
        self.quarter = self.quarter.next();
    }

    pub fn previous_quarter(&mut self) {
        self.quarter = self.quarter.previous();
    }

    pub fn jump_to_today(&mut self) {
        self.quarter = Quarter::containing(self.today);
    }

    /// Refresh the notion of today, e.g. after midnight
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }
}

pub fn handle_key(state: &mut CalendarState, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('[') => state.previous_quarter(),
        KeyCode::Right | KeyCode::Char(']') => state.next_quarter(),
        KeyCode::Char('t') => state.jump_to_today(),
        _ => {}
    }
}

fn day_style(date: NaiveDate, today: NaiveDate, marked: &BTreeSet<NaiveDate>) -> Style {
    let mut style = Style::default();
    if marked.contains(&date) {
        style = style.bg(Color::Green).fg(Color::Black);
    } else if is_weekend(date) {
        style = style.fg(Color::Red);
    }
    if is_today(date, today) {
        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
    }
    style
}

/// One month as grid lines, Monday first
fn month_lines(
    year: i32,
    month: u32,
    today: NaiveDate,
    marked: &BTreeSet<NaiveDate>,
) -> Vec<Spans<'static>> {
    let mut lines = vec![Spans::from(Span::styled(
        WEEKDAYS,
        Style::default().fg(Color::Gray),
    ))];

    let mut week: Vec<Span> = (0..leading_blanks(year, month))
        .map(|_| Span::raw("   "))
        .collect();

    for day in 1..=days_in_month(year, month) {
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        week.push(Span::styled(format!("{day:>2}"), day_style(date, today, marked)));
        week.push(Span::raw(" "));

        if date.weekday().num_days_from_monday() == 6 {
            lines.push(Spans::from(std::mem::take(&mut week)));
        }
    }
    if !week.is_empty() {
        lines.push(Spans::from(week));
    }

    lines
}

pub fn render_calendar<B: Backend>(
    frame: &mut Frame<B>,
    area: Rect,
    state: &CalendarState,
    projects: &[Project],
    scope: ProjectScope,
    focused: bool,
) {
    let scope_label = match scope {
        ProjectScope::All => "all projects",
        ProjectScope::Client(_) => "selected client",
        ProjectScope::Project(_) => "selected project",
    };
    let title = format!("{} - {scope_label}  <Left/Right> <T>oday", state.quarter.label());
    let block = pane_block(&title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let marked = project_days(
        state.quarter.first_day(),
        state.quarter.last_day(),
        projects,
        scope,
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(inner);

    for (column, month) in columns.iter().zip(state.quarter.months()) {
        let lines = month_lines(state.quarter.year(), month, state.today, &marked);
        let widget = Paragraph::new(lines).block(
            Block::default()
                .title(month_name(month))
                .borders(Borders::NONE),
        );
        frame.render_widget(widget, *column);
    }
}
