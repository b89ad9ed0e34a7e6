use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use uuid::Uuid;

use super::{pane_block, render_delete_confirmation, step_selection};
use crate::filters::{active_project_count, search_clients};
use crate::models::{Client, Project};

// State of the clients pane. Rows come from the live list on every frame.
#[derive(Default)]
pub struct ClientsState {
    list_state: ListState,
    selected: Option<Uuid>,
    search: String,
    searching: bool,
    show_delete_confirmation: bool,
}

impl ClientsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clients matching the search box, in list order
    pub fn visible<'a>(&self, clients: &'a [Client]) -> Vec<&'a Client> {
        search_clients(clients, &self.search)
    }

    pub fn next(&mut self, clients: &[Client]) {
        let len = self.visible(clients).len();
        self.list_state.select(step_selection(self.list_state.selected(), len, true));
    }

    pub fn previous(&mut self, clients: &[Client]) {
        let len = self.visible(clients).len();
        self.list_state.select(step_selection(self.list_state.selected(), len, false));
    }

    /// Client under the cursor
    pub fn highlighted<'a>(&self, clients: &'a [Client]) -> Option<&'a Client> {
        let visible = self.visible(clients);
        self.list_state.selected().and_then(|i| visible.get(i).copied())
    }

    /// Client chosen as calendar scope
    pub fn selected_client_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn toggle_selected(&mut self, id: Uuid) {
        self.selected = if self.selected == Some(id) { None } else { Some(id) };
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn is_confirming(&self) -> bool {
        self.show_delete_confirmation
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    /// Drop a selection whose client is gone and keep the cursor in range
    pub fn reconcile(&mut self, clients: &[Client]) {
        if let Some(id) = self.selected {
            if !clients.iter().any(|c| c.id == id) {
                self.selected = None;
            }
        }

        let len = self.visible(clients).len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    NewClient,
    EditClient(Uuid),
    DeleteClient(Uuid),
}

pub fn render_clients<B: Backend>(
    frame: &mut Frame<B>,
    area: Rect,
    state: &mut ClientsState,
    clients: &[Client],
    projects: &[Project],
    loading: bool,
    focused: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
        .split(area);

    let search_style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let cursor = if state.searching { "|" } else { "" };
    let search = Paragraph::new(format!("{}{cursor}", state.search))
        .style(search_style)
        .block(Block::default().title("Search </>").borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    let items: Vec<ListItem> = if loading {
        vec![ListItem::new("Loading clients...")]
    } else {
        state
            .visible(clients)
            .into_iter()
            .map(|client| {
                let marker = if state.selected == Some(client.id) { "* " } else { "  " };
                let active = active_project_count(client.id, projects);
                let contact = if client.company_name.is_some() {
                    client.contact_person.as_str()
                } else {
                    ""
                };
                ListItem::new(vec![
                    Spans::from(vec![
                        Span::raw(marker),
                        Span::styled(
                            client.display_name().to_string(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(format!("  {active} active"), Style::default().fg(Color::Green)),
                    ]),
                    Spans::from(Span::styled(
                        format!("  {contact}"),
                        Style::default().fg(Color::Gray),
                    )),
                ])
            })
            .collect()
    };

    let title = format!("Clients ({})", clients.len());
    let list = List::new(items)
        .block(pane_block(&title, focused))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, chunks[1], &mut state.list_state);

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, "this client", "Their projects stay but lose the link.");
    }
}

pub fn handle_key(
    state: &mut ClientsState,
    key: KeyEvent,
    clients: &[Client],
) -> Option<ClientAction> {
    if state.searching {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => state.searching = false,
            KeyCode::Backspace => {
                state.search.pop();
            }
            KeyCode::Char(c) => state.search.push(c),
            _ => {}
        }
        state.reconcile(clients);
        return None;
    }

    if state.show_delete_confirmation {
        match key.code {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.highlighted(clients).map(|c| ClientAction::DeleteClient(c.id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('/') => state.searching = true,
        KeyCode::Char('n') => return Some(ClientAction::NewClient),
        KeyCode::Char('e') => {
            return state.highlighted(clients).map(|c| ClientAction::EditClient(c.id));
        }
        KeyCode::Char('d') => {
            if state.highlighted(clients).is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Down => state.next(clients),
        KeyCode::Up => state.previous(clients),
        KeyCode::Enter => {
            if let Some(id) = state.highlighted(clients).map(|c| c.id) {
                state.toggle_selected(id);
            }
        }
        _ => {}
    }
    None
}
