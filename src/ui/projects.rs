use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Tabs},
};
use uuid::Uuid;

use super::{pane_block, render_delete_confirmation, step_selection};
use crate::filters::ProjectFilter;
use crate::models::{Project, ProjectStatus};
use crate::stats::format_amount;

// State of the projects pane. Rows come from the live list on every frame.
#[derive(Default)]
pub struct ProjectsState {
    filter: ProjectFilter,
    list_state: ListState,
    selected: Option<Uuid>,
    show_delete_confirmation: bool,
}

impl ProjectsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> ProjectFilter {
        self.filter
    }

    pub fn cycle_filter(&mut self, projects: &[Project]) {
        self.filter = self.filter.next();
        self.list_state.select(None);
        self.reconcile(projects);
    }

    pub fn visible<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        self.filter.apply(projects)
    }

    pub fn next(&mut self, projects: &[Project]) {
        let len = self.visible(projects).len();
        self.list_state.select(step_selection(self.list_state.selected(), len, true));
    }

    pub fn previous(&mut self, projects: &[Project]) {
        let len = self.visible(projects).len();
        self.list_state.select(step_selection(self.list_state.selected(), len, false));
    }

    pub fn highlighted<'a>(&self, projects: &'a [Project]) -> Option<&'a Project> {
        let visible = self.visible(projects);
        self.list_state.selected().and_then(|i| visible.get(i).copied())
    }

    /// Project chosen as calendar scope
    pub fn selected_project_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn toggle_selected(&mut self, id: Uuid) {
        self.selected = if self.selected == Some(id) { None } else { Some(id) };
    }

    pub fn is_confirming(&self) -> bool {
        self.show_delete_confirmation
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn reconcile(&mut self, projects: &[Project]) {
        if let Some(id) = self.selected {
            if !projects.iter().any(|p| p.id == id) {
                self.selected = None;
            }
        }

        let len = self.visible(projects).len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectAction {
    NewProject,
    EditProject(Uuid),
    DeleteProject(Uuid),
}

fn status_color(status: ProjectStatus) -> Color {
    match status {
        ProjectStatus::Active => Color::Green,
        ProjectStatus::Completed => Color::Blue,
        ProjectStatus::New => Color::Yellow,
        ProjectStatus::Paused => Color::Gray,
    }
}

fn project_item(project: &Project, selected: bool) -> ListItem<'_> {
    let marker = if selected { "* " } else { "  " };
    let budget = project
        .budget
        .map(|b| format_amount(b, project.currency.as_deref().unwrap_or("BYN")))
        .unwrap_or_else(|| "no budget".to_string());
    let dates = format!(
        "{} .. {}",
        project.start_date.as_deref().unwrap_or("?"),
        project.end_date.as_deref().unwrap_or("?"),
    );

    ListItem::new(vec![
        Spans::from(vec![
            Span::raw(marker),
            Span::styled(project.name.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(project.status.as_str(), Style::default().fg(status_color(project.status))),
            Span::raw(format!("  {}%", project.progress.unwrap_or(0))),
        ]),
        Spans::from(Span::styled(
            format!(
                "  {}  {budget}  {dates}  {}",
                project.client_name.as_deref().unwrap_or("-"),
                project.work_days_type.label(),
            ),
            Style::default().fg(Color::Gray),
        )),
    ])
}

pub fn render_projects<B: Backend>(
    frame: &mut Frame<B>,
    area: Rect,
    state: &mut ProjectsState,
    projects: &[Project],
    loading: bool,
    focused: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
        .split(area);

    let titles = ProjectFilter::TABS
        .iter()
        .map(|f| Spans::from(f.label()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(state.filter.index())
        .block(Block::default().title("Filter <F>").borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[0]);

    let items: Vec<ListItem> = if loading {
        vec![ListItem::new("Loading projects...")]
    } else {
        state
            .visible(projects)
            .into_iter()
            .map(|p| project_item(p, state.selected == Some(p.id)))
            .collect()
    };

    let title = format!("Projects ({})", projects.len());
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
        render_delete_confirmation(frame, "this project", "This cannot be undone.");
    }
}

pub fn handle_key(
    state: &mut ProjectsState,
    key: KeyEvent,
    projects: &[Project],
) -> Option<ProjectAction> {
    if state.show_delete_confirmation {
        match key.code {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.highlighted(projects).map(|p| ProjectAction::DeleteProject(p.id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('f') => state.cycle_filter(projects),
        KeyCode::Char('n') => return Some(ProjectAction::NewProject),
        KeyCode::Char('e') => {
            return state.highlighted(projects).map(|p| ProjectAction::EditProject(p.id));
        }
        KeyCode::Char('d') => {
            if state.highlighted(projects).is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Down => state.next(projects),
        KeyCode::Up => state.previous(projects),
        KeyCode::Enter => {
            if let Some(id) = state.highlighted(projects).map(|p| p.id) {
                state.toggle_selected(id);
            }
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkDaysType;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn project(name: &str, status: ProjectStatus) -> Project {
        Project {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            client_id: None,
            name: name.to_string(),
            client_name: None,
            status,
            progress: None,
            budget: None,
            currency: None,
            start_date: None,
            end_date: None,
            work_days_type: WorkDaysType::Calendar,
            created_at: Utc::now(),
        }
    }

    fn press(state: &mut ProjectsState, code: KeyCode, projects: &[Project]) -> Option<ProjectAction> {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE), projects)
    }

    #[test]
    fn test_filter_tab_cycles_and_resets_cursor() {
        let projects = vec![
            project("Warehouse", ProjectStatus::Active),
            project("Mall", ProjectStatus::Completed),
        ];
        let mut state = ProjectsState::new();
        state.reconcile(&projects);
        assert_eq!(state.visible(&projects).len(), 1);

        press(&mut state, KeyCode::Char('f'), &projects);
        assert_eq!(state.filter(), ProjectFilter::All);
        assert_eq!(state.visible(&projects).len(), 2);
        assert_eq!(state.highlighted(&projects).map(|p| p.id), Some(projects[0].id));

        press(&mut state, KeyCode::Char('f'), &projects);
        assert_eq!(state.highlighted(&projects).map(|p| p.id), Some(projects[1].id));
    }

    #[test]
    fn test_edit_and_delete_target_the_cursor() {
        let projects = vec![project("Office", ProjectStatus::Active)];
        let mut state = ProjectsState::new();
        state.reconcile(&projects);

        assert_eq!(
            press(&mut state, KeyCode::Char('e'), &projects),
            Some(ProjectAction::EditProject(projects[0].id))
        );

        press(&mut state, KeyCode::Char('d'), &projects);
        assert_eq!(press(&mut state, KeyCode::Char('n'), &projects), None);
        assert!(!state.is_confirming());
    }

    #[test]
    fn test_enter_selects_for_calendar() {
        let projects = vec![project("Office", ProjectStatus::Active)];
        let mut state = ProjectsState::new();
        state.reconcile(&projects);

        press(&mut state, KeyCode::Enter, &projects);
        assert_eq!(state.selected_project_id(), Some(projects[0].id));
    }
}
