use std::{fs::File, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Frame, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState, Wrap}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};
use tracing_subscriber::EnvFilter;

use todo_web::{
    application::{todo_form::TodoForm, todo_service::{ServiceError, TodoService, TodoServiceImpl}},
    config::Config,
    domain::{repository::TodoRepository, todo::{Todo, TodoCounts, TodoFilter, TodoId}},
    infrastructure::sqlite_repo::SqliteTodoRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    // stdout belongs to the terminal UI, so logs only go to a file when asked for
    if let Some(path) = &config.tui_log {
        let file = File::create(path).with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let repo = SqliteTodoRepository::connect(&config.database_url)
        .await?
        .with_ordering(config.ordering);
    repo.init().await?;
    let service = TodoServiceImpl::new(repo);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, service).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    View,
    /// Editing a draft; `None` creates a new todo.
    Edit(Option<TodoId>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field { Title, Description, DueDate }

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Title => Field::Description,
            Field::Description => Field::DueDate,
            Field::DueDate => Field::Title,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Description => "Desc",
            Field::DueDate => "Due (YYYY-MM-DD)",
        }
    }
}

struct App<S: TodoService> {
    service: S,
    todos: Vec<Todo>,
    counts: TodoCounts,
    filter: TodoFilter,
    list_state: ListState,
    mode: Mode,
    field: Field,
    draft: TodoForm,
    message: Option<String>,
}

impl<S: TodoService> App<S> {
    fn new(service: S) -> Self {
        Self {
            service,
            todos: Vec::new(),
            counts: TodoCounts::default(),
            filter: TodoFilter::All,
            list_state: ListState::default(),
            mode: Mode::View,
            field: Field::Title,
            draft: TodoForm::default(),
            message: None,
        }
    }

    async fn load(&mut self) -> Result<()> {
        let listing = self.service.list(self.filter).await?;
        self.todos = listing.todos;
        self.counts = listing.counts;
        // Clamp selection within filtered bounds
        let selected = match (self.todos.len(), self.list_state.selected()) {
            (0, _) => None,
            (len, Some(i)) => Some(i.min(len - 1)),
            (_, None) => Some(0),
        };
        self.list_state.select(selected);
        Ok(())
    }

    fn selected(&self) -> Option<&Todo> {
        self.list_state.selected().and_then(|i| self.todos.get(i))
    }

    fn move_selection(&mut self, down: bool) {
        let Some(i) = self.list_state.selected() else { return };
        let i = if down { (i + 1).min(self.todos.len().saturating_sub(1)) } else { i.saturating_sub(1) };
        self.list_state.select(Some(i));
    }

    fn begin_edit(&mut self, target: Option<&Todo>) {
        self.mode = Mode::Edit(target.map(|t| t.id));
        self.draft = target.map(TodoForm::from_todo).unwrap_or_default();
        self.field = Field::Title;
        self.message = None;
    }

    fn draft_field(&mut self) -> &mut String {
        match self.field {
            Field::Title => &mut self.draft.title,
            Field::Description => &mut self.draft.description,
            Field::DueDate => &mut self.draft.due_date,
        }
    }

    async fn save(&mut self, target: Option<TodoId>) -> Result<()> {
        let saved = match target {
            None => self.service.create(&self.draft).await,
            Some(id) => self.service.update(id, &self.draft).await,
        };
        match saved {
            Ok(_) => {
                self.mode = Mode::View;
                self.message = None;
            }
            Err(ServiceError::Invalid(errors)) => self.message = Some(errors.to_string()),
            Err(ServiceError::NotFound(_)) => {
                self.mode = Mode::View;
                self.message = Some("That todo no longer exists".into());
            }
            Err(err) => return Err(err.into()),
        }
        self.load().await
    }

    /// Returns `false` once the user asks to quit.
    async fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.mode {
            Mode::View => match code {
                KeyCode::Char('q') => return Ok(false),
                KeyCode::Up => self.move_selection(false),
                KeyCode::Down => self.move_selection(true),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(id) = self.selected().map(|t| t.id) {
                        let toggled = self.service.toggle(id).await.map(drop);
                        self.report(toggled)?;
                        self.load().await?;
                    }
                }
                KeyCode::Char('n') => self.begin_edit(None),
                KeyCode::Char('e') => {
                    if let Some(todo) = self.selected().cloned() { self.begin_edit(Some(&todo)); }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = self.selected().map(|t| t.id) {
                        let deleted = self.service.delete(id).await;
                        self.report(deleted)?;
                        self.load().await?;
                    }
                }
                KeyCode::Char('f') => {
                    self.filter = self.filter.next();
                    self.list_state.select(Some(0));
                    self.load().await?;
                }
                _ => {}
            },
            Mode::Edit(target) => match code {
                KeyCode::Esc => { self.mode = Mode::View; self.message = None; }
                KeyCode::Enter => self.save(target).await?,
                KeyCode::Tab => self.field = self.field.next(),
                KeyCode::Backspace => { self.draft_field().pop(); }
                KeyCode::Char(c) => self.draft_field().push(c),
                _ => {}
            },
        }
        Ok(true)
    }

    // A todo vanishing underneath us is worth a message, not an exit.
    fn report(&mut self, result: Result<(), ServiceError>) -> Result<()> {
        match result {
            Ok(()) => self.message = None,
            Err(ServiceError::NotFound(_)) => self.message = Some("That todo no longer exists".into()),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

async fn run_app<S: TodoService>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, service: S) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App::new(service);
    app.load().await?;

    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                if !app.handle_key(key.code).await? { break; }
            }
        }
    }
    Ok(())
}

fn draw<S: TodoService>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let header = Paragraph::new("Enter/space: toggle, n: new, e: edit, d: delete, f: filter, q: quit")
        .block(Block::default().borders(Borders::ALL).title("todo-web"));
    f.render_widget(header, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let today = Local::now().date_naive();
    let items: Vec<ListItem> = app.todos.iter().map(|t| {
        let mark = if t.resolved { "[x]" } else { "[ ]" };
        let due = t.due_date.map(|d| format!("  (due {})", d.format("%b %-d"))).unwrap_or_default();
        let item = ListItem::new(format!("{mark} {}{due}", t.title));
        if !t.resolved && t.is_overdue(today) { item.style(Style::default().fg(Color::Red)) } else { item }
    }).collect();
    let title = format!(
        "{} [{}]  active {} / done {} / total {}",
        app.filter.label(), app.counts.for_filter(app.filter), app.counts.active, app.counts.done, app.counts.total,
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, middle[0], &mut app.list_state);

    let detail = match app.selected() {
        Some(t) => format!(
            "Title:\n{}\n\nStatus: {}\nDue: {}\n\nDescription:\n{}",
            t.title,
            if t.resolved { "Done" } else { "Active" },
            t.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            if t.description.is_empty() { "(no description)" } else { t.description.as_str() },
        ),
        None => "No tasks yet".to_string(),
    };
    let details = Paragraph::new(detail)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("details"));
    f.render_widget(details, middle[1]);

    let (footer_title, footer_text) = match app.mode {
        Mode::View => ("info", app.message.clone().unwrap_or_else(|| format!("Filter=[{}]", app.filter.label()))),
        Mode::Edit(target) => {
            let value = match app.field {
                Field::Title => &app.draft.title,
                Field::Description => &app.draft.description,
                Field::DueDate => &app.draft.due_date,
            };
            let hint = app.message.as_deref().unwrap_or("Tab to switch, Enter to save, Esc to cancel");
            (if target.is_some() { "edit" } else { "create" }, format!("{}: {value}_  |  {hint}", app.field.label()))
        }
    };
    let footer = Paragraph::new(footer_text)
        .block(Block::default().borders(Borders::ALL).title(footer_title));
    f.render_widget(footer, chunks[2]);
}
