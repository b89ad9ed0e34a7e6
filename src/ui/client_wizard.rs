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

use crate::models::{Client, ClientDraft};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientWizardAction {
    Cancel,
    /// `id` is `None` for a new client
    Save { id: Option<Uuid>, draft: ClientDraft },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientField {
    Company,
    Contact,
    Phone,
    Email,
    Country,
}

const FIELDS: [ClientField; 5] = [
    ClientField::Company,
    ClientField::Contact,
    ClientField::Phone,
    ClientField::Email,
    ClientField::Country,
];

impl ClientField {
    fn label(&self) -> &'static str {
        match self {
            ClientField::Company => "Company",
            ClientField::Contact => "Contact person",
            ClientField::Phone => "Phone",
            ClientField::Email => "Email",
            ClientField::Country => "Country",
        }
    }
}

pub struct ClientWizardState {
    pub id: Option<Uuid>,
    pub draft: ClientDraft,
    pub current_field: ClientField,
    pub editing: bool,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            id: None,
            draft: ClientDraft::default(),
            current_field: ClientField::Company,
            editing: false,
        }
    }

    pub fn from_existing(client: &Client) -> Self {
        Self {
            id: Some(client.id),
            draft: ClientDraft::from(client),
            current_field: ClientField::Company,
            editing: false,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.current_field as usize + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.current_field as usize + FIELDS.len() - 1) % FIELDS.len()];
    }

    fn value(&self, field: ClientField) -> &str {
        match field {
            ClientField::Company => self.draft.company_name.as_deref().unwrap_or(""),
            ClientField::Contact => &self.draft.contact_person,
            ClientField::Phone => self.draft.phone.as_deref().unwrap_or(""),
            ClientField::Email => self.draft.email.as_deref().unwrap_or(""),
            ClientField::Country => self.draft.country.as_deref().unwrap_or(""),
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Company => self.draft.company_name.get_or_insert_with(String::new),
            ClientField::Contact => &mut self.draft.contact_person,
            ClientField::Phone => self.draft.phone.get_or_insert_with(String::new),
            ClientField::Email => self.draft.email.get_or_insert_with(String::new),
            ClientField::Country => self.draft.country.get_or_insert_with(String::new),
        };

        match key {
            KeyCode::Char(c) => {
                field_value.push(c);
            }
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.draft.contact_person.trim().is_empty()
    }

    /// The draft with blank optional fields cleared
    pub fn finished_draft(&self) -> ClientDraft {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        ClientDraft {
            company_name: clean(&self.draft.company_name),
            contact_person: self.draft.contact_person.trim().to_string(),
            phone: clean(&self.draft.phone),
            email: clean(&self.draft.email),
            country: clean(&self.draft.country),
        }
    }
}

impl Default for ClientWizardState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState) {
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

    // Title with appropriate text based on whether we're editing or creating
    let title_text = if state.id.is_none() {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Cancel editing"
    } else if state.is_valid() {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save client | Esc - Cancel"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | Contact person is required | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState, area: Rect) {
    let items: Vec<ListItem> = FIELDS
        .iter()
        .map(|field| {
            let current = *field == state.current_field;
            let label_style = if current {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let value = state.value(*field);
            let value_span = if current && state.editing {
                Span::styled(format!("{value}|"), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(value.to_string())
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                value_span,
            ]))
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"));

    f.render_widget(form_list, area);
}

pub fn handle_key(state: &mut ClientWizardState, key: KeyEvent) -> Option<ClientWizardAction> {
    match key.code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ClientWizardAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down | KeyCode::Tab if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => {
            if state.is_valid() {
                return Some(ClientWizardAction::Save {
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
