use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
};
use uuid::Uuid;

use project_dashboard::{
    calendar::{self, ProjectScope},
    config::{self, Config},
    db::{self, Backend as DataBackend},
    demo,
    models::{Client, Project},
    stats::DashboardStats,
    sync::{LiveList, ListOrder, SyncUpdate},
    telemetry,
    ui::{
        calendar_view::{self, CalendarState, render_calendar},
        client_wizard::{self, ClientWizardAction, ClientWizardState, render_client_wizard},
        clients::{self, ClientAction, ClientsState, render_clients},
        project_wizard::{self, ProjectWizardAction, ProjectWizardState, render_project_wizard},
        projects::{self, ProjectAction, ProjectsState, render_projects},
        stats_bar::render_stats,
    },
};

#[derive(Parser, Debug)]
#[command(name = "project-dashboard", about = "Live dashboard of clients, projects and their schedules")]
struct Args {
    /// Run against seeded in-memory data instead of the database
    #[arg(long)]
    demo: bool,

    /// Owner whose rows are shown; overrides OWNER_ID
    #[arg(long)]
    owner: Option<Uuid>,
}

// Represents the current screen in the app
enum AppScreen {
    Dashboard,
    ClientWizard,
    ProjectWizard,
}

// Pane receiving keys on the dashboard
#[derive(Clone, Copy, PartialEq)]
enum Focus {
    Clients,
    Projects,
    Calendar,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Clients => Focus::Projects,
            Focus::Projects => Focus::Calendar,
            Focus::Calendar => Focus::Clients,
        }
    }
}

// Main application state
struct AppState<D: DataBackend> {
    backend: Arc<D>,
    owner: Uuid,
    currency: String,
    clients: LiveList<Client, D>,
    projects: LiveList<Project, D>,
    screen: AppScreen,
    focus: Focus,
    clients_state: ClientsState,
    projects_state: ProjectsState,
    calendar_state: CalendarState,
    client_wizard_state: Option<ClientWizardState>,
    project_wizard_state: Option<ProjectWizardState>,
    status: Option<String>,
}

impl<D: DataBackend> AppState<D> {
    fn new(
        backend: Arc<D>,
        owner: Uuid,
        currency: String,
        clients: LiveList<Client, D>,
        projects: LiveList<Project, D>,
    ) -> Self {
        Self {
            backend,
            owner,
            currency,
            clients,
            projects,
            screen: AppScreen::Dashboard,
            focus: Focus::Clients,
            clients_state: ClientsState::new(),
            projects_state: ProjectsState::new(),
            calendar_state: CalendarState::new(calendar::today()),
            client_wizard_state: None,
            project_wizard_state: None,
            status: None,
        }
    }

    /// Selected project, else selected client, else everything
    fn scope(&self) -> ProjectScope {
        if let Some(id) = self.projects_state.selected_project_id() {
            ProjectScope::Project(id)
        } else if let Some(id) = self.clients_state.selected_client_id() {
            ProjectScope::Client(id)
        } else {
            ProjectScope::All
        }
    }

    fn report<T>(&mut self, what: &str, result: project_dashboard::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!(error = %err, "{what} failed");
                self.status = Some(format!("{what} failed: {err}"));
                None
            }
        }
    }
}

enum Wake {
    Clients(SyncUpdate),
    Projects(SyncUpdate),
    Tick,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = config::init()?;
    let subscriber = telemetry::get_subscriber("info", &config.log_file)?;
    telemetry::init_subscriber(subscriber)?;

    if args.demo {
        let owner = args.owner.unwrap_or_else(Uuid::new_v4);
        info!(%owner, "starting in demo mode");
        let backend = demo::seeded_backend(owner, calendar::today())?;
        run(Arc::new(backend), owner, &config).await
    } else {
        let owner = match args.owner {
            Some(owner) => owner,
            None => config.owner_id()?,
        };
        println!("Connecting to database...");
        let db = db::init(&config).await?;
        info!(%owner, "database connection established");
        run(Arc::new(db), owner, &config).await
    }
}

async fn run<D: DataBackend>(backend: Arc<D>, owner: Uuid, config: &Config) -> Result<()> {
    let clients = LiveList::open(
        Arc::clone(&backend),
        owner,
        "clients-changes",
        ListOrder::NewestFirst,
    )
    .await?;
    let projects = LiveList::open(
        Arc::clone(&backend),
        owner,
        "projects-changes",
        ListOrder::NewestFirst,
    )
    .await?;

    let mut app_state = AppState::new(backend, owner, config.currency.clone(), clients, projects);

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let result = run_app(&mut terminal, &mut app_state).await;

    app_state.clients.unsubscribe().await;
    app_state.projects.unsubscribe().await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {err}");
    }

    Ok(())
}

async fn run_app<B: Backend, D: DataBackend>(
    terminal: &mut Terminal<B>,
    app_state: &mut AppState<D>,
) -> Result<()> {
    loop {
        app_state.clients_state.reconcile(app_state.clients.items());
        app_state.projects_state.reconcile(app_state.projects.items());
        app_state.calendar_state.set_today(calendar::today());

        terminal.draw(|f| draw(f, app_state))?;

        let wake = tokio::select! {
            Some(update) = app_state.clients.next() => Wake::Clients(update),
            Some(update) = app_state.projects.next() => Wake::Projects(update),
            _ = tokio::time::sleep(Duration::from_millis(50)) => Wake::Tick,
        };
        match wake {
            Wake::Clients(update) => apply_update(app_state, "clients", update),
            Wake::Projects(update) => apply_update(app_state, "projects", update),
            Wake::Tick => {}
        }

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(app_state, key).await {
                    return Ok(());
                }
            }
        }
    }
}

fn apply_update<D: DataBackend>(app_state: &mut AppState<D>, list: &str, update: SyncUpdate) {
    match update {
        SyncUpdate::FetchFailed(message) => {
            app_state.status = Some(format!("Loading {list} failed: {message}"));
        }
        SyncUpdate::FeedClosed => {
            app_state.status = Some(format!("Live updates for {list} stopped; press r to reconnect"));
        }
        SyncUpdate::Loaded { .. } => {
            if app_state.status.as_deref().is_some_and(|s| s.contains(list)) {
                app_state.status = None;
            }
        }
        SyncUpdate::Changed(_) | SyncUpdate::Unchanged | SyncUpdate::Resync | SyncUpdate::StaleFetch => {}
    }
}

fn draw<B: Backend, D: DataBackend>(f: &mut Frame<B>, app_state: &mut AppState<D>) {
    match app_state.screen {
        AppScreen::ClientWizard => {
            if let Some(state) = &app_state.client_wizard_state {
                render_client_wizard(f, state);
            }
            return;
        }
        AppScreen::ProjectWizard => {
            if let Some(state) = &app_state.project_wizard_state {
                render_project_wizard(f, state);
            }
            return;
        }
        AppScreen::Dashboard => {}
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Percentage(45),
                Constraint::Min(11),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    let stats = DashboardStats::compute(
        app_state.projects.items(),
        app_state.clients.items(),
        &app_state.currency,
    );
    render_stats(f, rows[0], &stats);

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[1]);

    render_clients(
        f,
        lists[0],
        &mut app_state.clients_state,
        app_state.clients.items(),
        app_state.projects.items(),
        app_state.clients.is_loading(),
        app_state.focus == Focus::Clients,
    );
    render_projects(
        f,
        lists[1],
        &mut app_state.projects_state,
        app_state.projects.items(),
        app_state.projects.is_loading(),
        app_state.focus == Focus::Projects,
    );

    let scope = app_state.scope();
    render_calendar(
        f,
        rows[2],
        &app_state.calendar_state,
        app_state.projects.items(),
        scope,
        app_state.focus == Focus::Calendar,
    );

    let footer = match &app_state.status {
        Some(status) => Paragraph::new(status.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(
            "<Tab> Switch pane | <N> New | <E> Edit | <D> Delete | <Enter> Select | <R> Reload | <Q> Quit",
        )
        .style(Style::default().fg(Color::Gray)),
    };
    f.render_widget(footer, rows[3]);
}

/// Returns true when the app should quit
async fn handle_key<D: DataBackend>(app_state: &mut AppState<D>, key: KeyEvent) -> bool {
    match app_state.screen {
        AppScreen::Dashboard => handle_dashboard_key(app_state, key).await,
        AppScreen::ClientWizard => {
            handle_client_wizard_key(app_state, key).await;
            false
        }
        AppScreen::ProjectWizard => {
            handle_project_wizard_key(app_state, key).await;
            false
        }
    }
}

async fn handle_dashboard_key<D: DataBackend>(app_state: &mut AppState<D>, key: KeyEvent) -> bool {
    let pane_busy = app_state.clients_state.is_searching()
        || app_state.clients_state.is_confirming()
        || app_state.projects_state.is_confirming();

    if !pane_busy {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => {
                app_state.focus = app_state.focus.next();
                return false;
            }
            KeyCode::Char('r') => {
                app_state.status = None;
                let result = app_state.clients.reload().await;
                app_state.report("Reconnecting clients", result);
                let result = app_state.projects.reload().await;
                app_state.report("Reconnecting projects", result);
                return false;
            }
            _ => {}
        }
    }

    match app_state.focus {
        Focus::Clients => {
            let action = clients::handle_key(&mut app_state.clients_state, key, app_state.clients.items());
            match action {
                Some(ClientAction::NewClient) => {
                    app_state.client_wizard_state = Some(ClientWizardState::new());
                    app_state.screen = AppScreen::ClientWizard;
                }
                Some(ClientAction::EditClient(id)) => {
                    if let Some(client) = app_state.clients.get(id) {
                        app_state.client_wizard_state = Some(ClientWizardState::from_existing(client));
                        app_state.screen = AppScreen::ClientWizard;
                    }
                }
                Some(ClientAction::DeleteClient(id)) => {
                    // The row disappears when the delete notification arrives
                    let result = app_state.clients.delete(id).await;
                    app_state.report("Deleting client", result);
                }
                None => {}
            }
        }
        Focus::Projects => {
            let action =
                projects::handle_key(&mut app_state.projects_state, key, app_state.projects.items());
            match action {
                Some(ProjectAction::NewProject) => {
                    let client = app_state
                        .clients_state
                        .selected_client_id()
                        .and_then(|id| app_state.clients.get(id));
                    let (client_id, client_name) = match client {
                        Some(c) => (Some(c.id), Some(c.display_name().to_string())),
                        None => (None, None),
                    };
                    app_state.project_wizard_state =
                        Some(ProjectWizardState::new(client_id, client_name, calendar::today()));
                    app_state.screen = AppScreen::ProjectWizard;
                }
                Some(ProjectAction::EditProject(id)) => {
                    if let Some(project) = app_state.projects.get(id) {
                        app_state.project_wizard_state =
                            Some(ProjectWizardState::from_existing(project, calendar::today()));
                        app_state.screen = AppScreen::ProjectWizard;
                    }
                }
                Some(ProjectAction::DeleteProject(id)) => {
                    let result = app_state.projects.delete(id).await;
                    app_state.report("Deleting project", result);
                }
                None => {}
            }
        }
        Focus::Calendar => calendar_view::handle_key(&mut app_state.calendar_state, key),
    }

    false
}

async fn handle_client_wizard_key<D: DataBackend>(app_state: &mut AppState<D>, key: KeyEvent) {
    let Some(state) = &mut app_state.client_wizard_state else {
        app_state.screen = AppScreen::Dashboard;
        return;
    };

    match client_wizard::handle_key(state, key) {
        Some(ClientWizardAction::Cancel) => {}
        Some(ClientWizardAction::Save { id, draft }) => {
            let result = match id {
                Some(id) => app_state.backend.update_client(id, &draft).await,
                None => app_state
                    .backend
                    .insert_client(app_state.owner, &draft)
                    .await
                    .map(|_| ()),
            };
            app_state.report("Saving client", result);
        }
        None => return,
    }

    app_state.client_wizard_state = None;
    app_state.screen = AppScreen::Dashboard;
}

async fn handle_project_wizard_key<D: DataBackend>(app_state: &mut AppState<D>, key: KeyEvent) {
    let Some(state) = &mut app_state.project_wizard_state else {
        app_state.screen = AppScreen::Dashboard;
        return;
    };

    match project_wizard::handle_key(state, key) {
        Some(ProjectWizardAction::Cancel) => {}
        Some(ProjectWizardAction::Save { id, mut draft }) => {
            if draft.currency.is_none() {
                draft.currency = Some(app_state.currency.clone());
            }
            let result = match id {
                Some(id) => app_state.backend.update_project(id, &draft).await,
                None => app_state
                    .backend
                    .insert_project(app_state.owner, &draft)
                    .await
                    .map(|_| ()),
            };
            app_state.report("Saving project", result);
        }
        None => return,
    }

    app_state.project_wizard_state = None;
    app_state.screen = AppScreen::Dashboard;
}
