use std::num::ParseFloatError;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use uuid::Uuid;

use crate::models::{Project, ProjectDraft};
use crate::ui::components::date_input::DateInputState;

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectWizardAction {
    Cancel,
    /// `id` is `None` for a new project
    Save { id: Option<Uuid>, draft: ProjectDraft },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectField {
    Name,
    Status,
    Budget,
    Currency,
    StartDate,
    EndDate,
    WorkDays,
}

const FIELDS: [ProjectField; 7] = [
    ProjectField::Name,
    ProjectField::Status,
    ProjectField::Budget,
    ProjectField::Currency,
    ProjectField::StartDate,
    ProjectField::EndDate,
    ProjectField::WorkDays,
];

impl ProjectField {
    fn label(&self) -> &'static str {
        match self {
            ProjectField::Name => "Name",
            ProjectField::Status => "Status",
            ProjectField::Budget => "Budget",
            ProjectField::Currency => "Currency",
            ProjectField::StartDate => "Start date",
            ProjectField::EndDate => "End date",
            ProjectField::WorkDays => "Schedule",
        }
    }

    /// Fields changed with Space instead of typed text
    fn is_choice(&self) -> bool {
        matches!(self, ProjectField::Status | ProjectField::WorkDays)
    }
}

pub struct ProjectWizardState {
    pub id: Option<Uuid>,
    pub draft: ProjectDraft,
    pub budget_input: String,
    pub current_field: ProjectField,
    pub editing: bool,
    pub start_date_state: DateInputState,
    pub end_date_state: DateInputState,
}

impl ProjectWizardState {
    pub fn new(client_id: Option<Uuid>, client_name: Option<String>, today: NaiveDate) -> Self {
        let mut draft = ProjectDraft::new(client_id, client_name);
        draft.start_date = Some(today);

        Self {
            id: None,
            draft,
            budget_input: String::new(),
            current_field: ProjectField::Name,
            editing: false,
            start_date_state: DateInputState::new(today),
            end_date_state: DateInputState::new(today),
        }
    }

    pub fn from_existing(project: &Project, today: NaiveDate) -> Self {
        let draft = ProjectDraft::from(project);
        let start = draft.start_date.unwrap_or(today);
        let end = draft.end_date.unwrap_or(start);

        Self {
            id: Some(project.id),
            budget_input: draft.budget.map(|b| b.to_string()).unwrap_or_default(),
            draft,
            current_field: ProjectField::Name,
            editing: false,
            start_date_state: DateInputState::new(start),
            end_date_state: DateInputState::new(end),
        }
    }

    pub fn toggle_editing(&mut self) {
        if self.current_field.is_choice() {
            return;
        }

        self.editing = !self.editing;
        if self.editing {
            match self.current_field {
                ProjectField::StartDate => self.start_date_state.toggle_editing(),
                ProjectField::EndDate => self.end_date_state.toggle_editing(),
                _ => {}
            }
        } else {
            self.start_date_state.editing = false;
            self.end_date_state.editing = false;
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.current_field as usize + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.current_field as usize + FIELDS.len() - 1) % FIELDS.len()];
    }

    /// Cycle a choice field
    pub fn cycle_choice(&mut self) {
        match self.current_field {
            ProjectField::Status => self.draft.status = self.draft.status.next(),
            ProjectField::WorkDays => self.draft.work_days_type = self.draft.work_days_type.toggled(),
            _ => {}
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ProjectField::Name => edit_text(&mut self.draft.name, key),
            ProjectField::Budget => {
                if let KeyCode::Char(c) = key {
                    if !(c.is_ascii_digit() || c == '.') {
                        return;
                    }
                }
                edit_text(&mut self.budget_input, key);
            }
            ProjectField::Currency => {
                edit_text(self.draft.currency.get_or_insert_with(String::new), key)
            }
            ProjectField::StartDate => {
                self.start_date_state.handle_input(key);
                self.draft.start_date = Some(self.start_date_state.date);
            }
            ProjectField::EndDate => {
                self.end_date_state.handle_input(key);
                self.draft.end_date = Some(self.end_date_state.date);
            }
            ProjectField::Status | ProjectField::WorkDays => {}
        }
    }

    /// Parsed budget; blank means no budget
    fn budget(&self) -> Result<Option<f64>, ParseFloatError> {
        let text = self.budget_input.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>().map(Some)
    }

    /// Why the form cannot be saved yet, if it cannot
    pub fn problem(&self) -> Option<&'static str> {
        if self.draft.name.trim().is_empty() {
            return Some("Name is required");
        }
        if self.budget().is_err() {
            return Some("Budget must be a number");
        }
        if let (Some(start), Some(end)) = (self.draft.start_date, self.draft.end_date) {
            if end < start {
                return Some("End date is before start date");
            }
        }
        None
    }

    pub fn is_valid(&self) -> bool {
        self.problem().is_none()
    }

    pub fn finished_draft(&self) -> ProjectDraft {
        let mut draft = self.draft.clone();
        draft.name = draft.name.trim().to_string();
        draft.budget = self.budget().unwrap_or(None);
        draft.currency = draft
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        draft
    }

    fn display_value(&self, field: ProjectField) -> String {
        let editing = self.editing && field == self.current_field;
        match field {
            ProjectField::Name => self.draft.name.clone(),
            ProjectField::Status => self.draft.status.as_str().to_string(),
            ProjectField::Budget => self.budget_input.clone(),
            ProjectField::Currency => self.draft.currency.clone().unwrap_or_default(),
            ProjectField::StartDate if editing => self.start_date_state.get_display_string(),
            ProjectField::EndDate if editing => self.end_date_state.get_display_string(),
            ProjectField::StartDate => format_date(self.draft.start_date),
            ProjectField::EndDate => format_date(self.draft.end_date),
            ProjectField::WorkDays => self.draft.work_days_type.label().to_string(),
        }
    }
}

fn edit_text(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) => value.push(c),
        KeyCode::Backspace => {
            value.pop();
        }
        _ => {}
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "Not set".to_string(),
    }
}

pub fn render_project_wizard<B: Backend>(f: &mut Frame<B>, state: &ProjectWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = match (state.id, state.draft.client_name.as_deref()) {
        (None, Some(client)) => format!("New Project for {client}"),
        (None, None) => "New Project".to_string(),
        (Some(_), _) => "Edit Project".to_string(),
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if state.editing {
        match state.current_field {
            ProjectField::StartDate | ProjectField::EndDate => {
                "Enter - Save field | Left/Right - Switch date part | Esc - Cancel editing"
            }
            _ => "Enter - Save field | Esc - Cancel editing",
        }
    } else if let Some(problem) = state.problem() {
        problem
    } else if state.current_field.is_choice() {
        "Space - Change | Up/Down - Navigate fields | S - Save project | Esc - Cancel"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save project | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ProjectWizardState, area: Rect) {
    let items: Vec<ListItem> = FIELDS
        .iter()
        .map(|field| {
            let current = *field == state.current_field;
            let label_style = if current {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let value = state.display_value(*field);
            let value_span = if current && state.editing {
                let cursor = if matches!(field, ProjectField::StartDate | ProjectField::EndDate) {
                    ""
                } else {
                    "|"
                };
                Span::styled(format!("{value}{cursor}"), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(value)
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                value_span,
            ]))
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Project Details"));

    f.render_widget(form_list, area);
}

pub fn handle_key(state: &mut ProjectWizardState, key: KeyEvent) -> Option<ProjectWizardAction> {
    match key.code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ProjectWizardAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down | KeyCode::Tab if !state.editing => state.next_field(),
        KeyCode::Char(' ') if !state.editing => state.cycle_choice(),
        KeyCode::Char('s') if !state.editing => {
            if state.is_valid() {
                return Some(ProjectWizardAction::Save {
                    id: state.id,
                    draft: state.finished_draft(),
                });
            }
        }
        _ if state.editing => state.edit_current_field(key.code),
        _ => {}
    }

    None
}
