// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use rollcall_app::{
    ActionContext, Category, CategorySelector, CellValue, FilterStage, IssuedFilter, LoadState,
    Notice, NoticeLevel, PaymentFilter, PresentationSink, PresentationSnapshot, Record, RowAction,
    ScreenCommand, ScreenEvent, ScreenKind, ScreenState, Segment, StatusFilter, Tone,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Spreadsheet,
    Print,
}

impl ExportFormat {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Print => "print",
        }
    }
}

/// Everything the terminal surface asks of the backend. Calls that start a
/// request return right away with the events they caused; the completion
/// arrives later through `poll`.
pub trait ScreenRuntime {
    fn is_busy(&self) -> bool;
    fn fetch(&mut self, screen: &mut ScreenState) -> Result<Vec<ScreenEvent>>;
    fn toggle_status(&mut self, screen: &mut ScreenState, record: &Record)
    -> Result<Vec<ScreenEvent>>;
    fn update_field(
        &mut self,
        screen: &mut ScreenState,
        record: &Record,
        field: &str,
        value: &str,
    ) -> Result<Vec<ScreenEvent>>;
    fn delete(&mut self, screen: &mut ScreenState, record: &Record) -> Result<Vec<ScreenEvent>>;
    fn create(
        &mut self,
        screen: &mut ScreenState,
        fields: Vec<(String, String)>,
    ) -> Result<Vec<ScreenEvent>>;
    /// Non-blocking. Applies a finished request to `screen`. Completions that
    /// belong to a screen no longer shown are dropped.
    fn poll(&mut self, screen: &mut ScreenState) -> Vec<ScreenEvent>;
    fn export(
        &mut self,
        kind: ScreenKind,
        format: ExportFormat,
        sink: &PresentationSink,
    ) -> Result<PathBuf>;
}

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Nav,
    Search,
    Edit,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Quit,
    SwitchScreen(ScreenKind),
    NextCategory,
    PreviousCategory,
    CycleStatus,
    CyclePayment,
    CycleIssued,
    ClearFilters,
    BeginSearch,
    BeginEdit,
    BeginCreate,
    Input(char),
    Backspace,
    Commit,
    Cancel,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    ToggleStatus,
    Delete,
    Export(ExportFormat),
    Refresh,
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

/// Terminal-side state around one screen. The screen itself stays the only
/// owner of its store and filters.
#[derive(Debug)]
pub struct UiState {
    pub screen: ScreenState,
    pub actions: ActionContext,
    pub mode: InputMode,
    pub edit_buffer: String,
    pub selected: usize,
    pub status_line: Option<String>,
    page_size: usize,
    sink: PresentationSink,
    status_token: u64,
    refetch_due: bool,
}

impl UiState {
    pub fn new(screen: ScreenState, actions: ActionContext) -> Self {
        let mut state = Self {
            screen,
            actions,
            mode: InputMode::Nav,
            edit_buffer: String::new(),
            selected: 0,
            status_line: None,
            page_size: DEFAULT_PAGE_SIZE,
            sink: PresentationSink::new(),
            status_token: 0,
            refetch_due: true,
        };
        state.rerender();
        state
    }

    /// Rows skipped by page up/down. Zero keeps the default.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self
    }

    pub fn sink(&self) -> &PresentationSink {
        &self.sink
    }

    pub fn snapshot(&self) -> Option<Arc<PresentationSnapshot>> {
        self.sink.snapshot()
    }

    pub fn refetch_due(&self) -> bool {
        self.refetch_due
    }

    /// Rebuilds the snapshot from the screen's current store and filters.
    pub fn rerender(&mut self) {
        let snapshot = self.sink.render(self.screen.snapshot(&self.actions));
        self.selected = self.selected.min(snapshot.total().saturating_sub(1));
    }

    pub fn selected_record(&self) -> Option<Record> {
        let snapshot = self.sink.snapshot()?;
        snapshot
            .view
            .rows()
            .get(self.selected)
            .map(|row| row.record.clone())
    }

    pub fn switch_screen(&mut self, kind: ScreenKind) {
        if self.screen.kind() == kind {
            return;
        }
        debug!(from = self.screen.kind().as_str(), to = kind.as_str(), "switch screen");
        self.screen = ScreenState::new(kind);
        self.mode = InputMode::Nav;
        self.edit_buffer.clear();
        self.selected = 0;
        self.refetch_due = true;
        self.rerender();
    }

    fn offers(&self, action: RowAction) -> bool {
        self.screen.kind().row_actions(&self.actions).contains(&action)
    }
}

pub fn run_app<R: ScreenRuntime>(ui: &mut UiState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(ui, &internal_rx);
        tick(ui, runtime, &internal_tx);

        if let Err(error) = terminal.draw(|frame| render(frame, ui)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && let Some(action) = key_action(ui.mode, key)
            && apply_action(ui, runtime, &internal_tx, action)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(ui: &mut UiState, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == ui.status_token => {
                ui.status_line = None;
                ui.screen.dismiss_notice();
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

/// Drains finished requests, then starts a due refetch once nothing is in
/// flight. A refetch only becomes due after a completion was observed.
pub fn tick<R: ScreenRuntime>(ui: &mut UiState, runtime: &mut R, tx: &Sender<InternalEvent>) {
    let events = runtime.poll(&mut ui.screen);
    handle_screen_events(ui, tx, events);

    if ui.refetch_due && !runtime.is_busy() {
        ui.refetch_due = false;
        match runtime.fetch(&mut ui.screen) {
            Ok(events) => handle_screen_events(ui, tx, events),
            Err(error) => {
                warn!(screen = ui.screen.kind().as_str(), %error, "fetch not started");
                emit_status(ui, tx, format!("load failed: {error}"));
            }
        }
    }
}

fn handle_screen_events(ui: &mut UiState, tx: &Sender<InternalEvent>, events: Vec<ScreenEvent>) {
    let mut changed = false;
    for event in events {
        match event {
            ScreenEvent::ViewChanged => changed = true,
            ScreenEvent::LoadingChanged(_) => {}
            ScreenEvent::Notice(notice) => emit_status(ui, tx, notice_text(&notice)),
            ScreenEvent::RefetchRequested => ui.refetch_due = true,
        }
    }
    if changed {
        ui.rerender();
    }
}

fn notice_text(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => notice.message.clone(),
        NoticeLevel::Error => format!("error: {}", notice.message),
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(ui: &mut UiState, internal_tx: &Sender<InternalEvent>, message: impl Into<String>) {
    ui.status_line = Some(message.into());
    ui.status_token = ui.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, ui.status_token);
}

pub fn key_action(mode: InputMode, key: KeyEvent) -> Option<UiAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return Some(UiAction::Quit);
    }

    match mode {
        InputMode::Search | InputMode::Edit | InputMode::Create => match key.code {
            KeyCode::Char(ch) => Some(UiAction::Input(ch)),
            KeyCode::Backspace => Some(UiAction::Backspace),
            KeyCode::Enter => Some(UiAction::Commit),
            KeyCode::Esc => Some(UiAction::Cancel),
            _ => None,
        },
        InputMode::Nav => match key.code {
            KeyCode::Char('q') => Some(UiAction::Quit),
            KeyCode::Char('1') => Some(UiAction::SwitchScreen(ScreenKind::Members)),
            KeyCode::Char('2') => Some(UiAction::SwitchScreen(ScreenKind::Registrations)),
            KeyCode::Char('3') => Some(UiAction::SwitchScreen(ScreenKind::MemberReport)),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Some(UiAction::NextCategory),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                Some(UiAction::PreviousCategory)
            }
            KeyCode::Char('s') => Some(UiAction::CycleStatus),
            KeyCode::Char('p') => Some(UiAction::CyclePayment),
            KeyCode::Char('i') => Some(UiAction::CycleIssued),
            KeyCode::Char('c') => Some(UiAction::ClearFilters),
            KeyCode::Char('/') => Some(UiAction::BeginSearch),
            KeyCode::Char('e') => Some(UiAction::BeginEdit),
            KeyCode::Char('n') => Some(UiAction::BeginCreate),
            KeyCode::Down | KeyCode::Char('j') => Some(UiAction::MoveDown),
            KeyCode::Up | KeyCode::Char('k') => Some(UiAction::MoveUp),
            KeyCode::PageDown => Some(UiAction::PageDown),
            KeyCode::PageUp => Some(UiAction::PageUp),
            KeyCode::Char('t') => Some(UiAction::ToggleStatus),
            KeyCode::Char('d') => Some(UiAction::Delete),
            KeyCode::Char('x') => Some(UiAction::Export(ExportFormat::Spreadsheet)),
            KeyCode::Char('P') => Some(UiAction::Export(ExportFormat::Print)),
            KeyCode::Char('r') => Some(UiAction::Refresh),
            KeyCode::Esc => Some(UiAction::DismissNotice),
            _ => None,
        },
    }
}

/// Applies one action. Returns true when the app should quit.
pub fn apply_action<R: ScreenRuntime>(
    ui: &mut UiState,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    action: UiAction,
) -> bool {
    match action {
        UiAction::Quit => return true,
        UiAction::SwitchScreen(kind) => ui.switch_screen(kind),
        UiAction::NextCategory | UiAction::PreviousCategory => {
            let forward = action == UiAction::NextCategory;
            match step_category(&ui.screen, forward) {
                Some(category) => dispatch(ui, tx, ScreenCommand::SelectCategory(category)),
                None => emit_status(ui, tx, unbound_message(&ui.screen, "category")),
            }
        }
        UiAction::CycleStatus => {
            if ui.screen.kind().binds(FilterStage::Status) {
                let next = cycle(&StatusFilter::ALL, ui.screen.filters().status);
                dispatch(ui, tx, ScreenCommand::SetStatus(next));
            } else {
                emit_status(ui, tx, unbound_message(&ui.screen, "status"));
            }
        }
        UiAction::CyclePayment => {
            if ui.screen.kind().binds(FilterStage::Payment) {
                let next = cycle(&PaymentFilter::ALL, ui.screen.filters().payment);
                dispatch(ui, tx, ScreenCommand::SetPayment(next));
            } else {
                emit_status(ui, tx, unbound_message(&ui.screen, "payment"));
            }
        }
        UiAction::CycleIssued => {
            if ui.screen.kind().binds(FilterStage::Issued) {
                let next = cycle(&IssuedFilter::ALL, ui.screen.filters().issued);
                dispatch(ui, tx, ScreenCommand::SetIssued(next));
            } else {
                emit_status(ui, tx, unbound_message(&ui.screen, "issued"));
            }
        }
        UiAction::ClearFilters => dispatch(ui, tx, ScreenCommand::ClearFilters),
        UiAction::BeginSearch => {
            if ui.screen.kind().binds(FilterStage::Search) {
                ui.mode = InputMode::Search;
            } else {
                emit_status(ui, tx, unbound_message(&ui.screen, "search"));
            }
        }
        UiAction::BeginEdit => {
            if !ui.offers(RowAction::Edit) {
                emit_status(ui, tx, "edit is not available on this screen");
            } else if ui.selected_record().is_none() {
                emit_status(ui, tx, "no row selected");
            } else {
                ui.edit_buffer.clear();
                ui.mode = InputMode::Edit;
            }
        }
        UiAction::BeginCreate => {
            if ui.screen.kind() == ScreenKind::Members {
                ui.edit_buffer.clear();
                ui.mode = InputMode::Create;
            } else {
                let message = format!("new records cannot be added on {}", ui.screen.kind().title());
                emit_status(ui, tx, message);
            }
        }
        UiAction::Input(ch) => match ui.mode {
            InputMode::Search => {
                let mut search = ui.screen.filters().search.clone();
                search.push(ch);
                dispatch(ui, tx, ScreenCommand::SetSearch(search));
            }
            InputMode::Edit | InputMode::Create => ui.edit_buffer.push(ch),
            InputMode::Nav => {}
        },
        UiAction::Backspace => match ui.mode {
            InputMode::Search => {
                let mut search = ui.screen.filters().search.clone();
                search.pop();
                dispatch(ui, tx, ScreenCommand::SetSearch(search));
            }
            InputMode::Edit | InputMode::Create => {
                ui.edit_buffer.pop();
            }
            InputMode::Nav => {}
        },
        UiAction::Commit => match ui.mode {
            InputMode::Search => ui.mode = InputMode::Nav,
            InputMode::Edit => commit_edit(ui, runtime, tx),
            InputMode::Create => commit_create(ui, runtime, tx),
            InputMode::Nav => {}
        },
        UiAction::Cancel => {
            if ui.mode == InputMode::Search {
                dispatch(ui, tx, ScreenCommand::SetSearch(String::new()));
            }
            ui.edit_buffer.clear();
            ui.mode = InputMode::Nav;
        }
        UiAction::MoveUp => ui.selected = ui.selected.saturating_sub(1),
        UiAction::MoveDown => move_selection(ui, 1),
        UiAction::PageUp => ui.selected = ui.selected.saturating_sub(ui.page_size),
        UiAction::PageDown => move_selection(ui, ui.page_size),
        UiAction::ToggleStatus => {
            if !ui.offers(RowAction::ToggleStatus) {
                emit_status(ui, tx, "status toggle is not available on this screen");
            } else if let Some(record) = ui.selected_record() {
                let started = runtime.toggle_status(&mut ui.screen, &record);
                settle_start(ui, tx, started);
            }
        }
        UiAction::Delete => {
            if !ui.offers(RowAction::Delete) {
                emit_status(ui, tx, "delete is not permitted for this user");
            } else if let Some(record) = ui.selected_record() {
                let started = runtime.delete(&mut ui.screen, &record);
                settle_start(ui, tx, started);
            }
        }
        UiAction::Export(format) => match runtime.export(ui.screen.kind(), format, &ui.sink) {
            Ok(path) => emit_status(ui, tx, format!("exported to {}", path.display())),
            Err(error) => emit_status(ui, tx, format!("{} export failed: {error:#}", format.label())),
        },
        UiAction::Refresh => {
            if runtime.is_busy() {
                emit_status(ui, tx, "a request is already in flight");
            } else {
                ui.refetch_due = true;
            }
        }
        UiAction::DismissNotice => {
            ui.status_line = None;
            ui.screen.dismiss_notice();
        }
    }
    false
}

fn move_selection(ui: &mut UiState, step: usize) {
    let total = ui.snapshot().map_or(0, |snapshot| snapshot.total());
    ui.selected = ui
        .selected
        .saturating_add(step)
        .min(total.saturating_sub(1));
}

fn dispatch(ui: &mut UiState, tx: &Sender<InternalEvent>, command: ScreenCommand) {
    let events = ui.screen.dispatch(command);
    handle_screen_events(ui, tx, events);
}

fn settle_start(ui: &mut UiState, tx: &Sender<InternalEvent>, started: Result<Vec<ScreenEvent>>) {
    match started {
        Ok(events) => handle_screen_events(ui, tx, events),
        Err(error) => emit_status(ui, tx, format!("{error:#}")),
    }
}

fn commit_edit<R: ScreenRuntime>(ui: &mut UiState, runtime: &mut R, tx: &Sender<InternalEvent>) {
    let Some((field, value)) = parse_assignment(&ui.edit_buffer) else {
        emit_status(ui, tx, "expected field=value");
        return;
    };
    let Some(record) = ui.selected_record() else {
        emit_status(ui, tx, "no row selected");
        return;
    };
    let started = runtime.update_field(&mut ui.screen, &record, &field, &value);
    ui.edit_buffer.clear();
    ui.mode = InputMode::Nav;
    settle_start(ui, tx, started);
}

fn commit_create<R: ScreenRuntime>(ui: &mut UiState, runtime: &mut R, tx: &Sender<InternalEvent>) {
    let Some(fields) = parse_assignments(&ui.edit_buffer) else {
        emit_status(ui, tx, "expected field=value; field=value");
        return;
    };
    let started = runtime.create(&mut ui.screen, fields);
    ui.edit_buffer.clear();
    ui.mode = InputMode::Nav;
    settle_start(ui, tx, started);
}

/// `name=Asha; mobile=98` splits on `;`. Every part must be an assignment.
pub fn parse_assignments(input: &str) -> Option<Vec<(String, String)>> {
    let fields = input
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(parse_assignment)
        .collect::<Option<Vec<_>>>()?;
    (!fields.is_empty()).then_some(fields)
}

/// `name=Asha Rao` becomes `("name", "Asha Rao")`. The field may not be blank.
pub fn parse_assignment(input: &str) -> Option<(String, String)> {
    let (field, value) = input.split_once('=')?;
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    Some((field.to_owned(), value.trim().to_owned()))
}

fn unbound_message(screen: &ScreenState, selector: &str) -> String {
    format!("{selector} filter is not available on {}", screen.kind().title())
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let index = all.iter().position(|value| *value == current).unwrap_or(0);
    all.get((index + 1) % all.len().max(1))
        .copied()
        .unwrap_or(current)
}

/// `All` followed by every loaded category, in tab order.
pub fn category_selectors(screen: &ScreenState) -> Vec<CategorySelector> {
    std::iter::once(CategorySelector::All)
        .chain(screen.categories().iter().map(Category::selector))
        .collect()
}

/// The neighbouring category tab, wrapping at either end. `None` when the
/// screen has no category selector.
pub fn step_category(screen: &ScreenState, forward: bool) -> Option<CategorySelector> {
    if !screen.kind().binds(FilterStage::Category) {
        return None;
    }
    let selectors = category_selectors(screen);
    let len = selectors.len();
    let current = selectors
        .iter()
        .position(|selector| selector == &screen.filters().category)
        .unwrap_or(0);
    let next = if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    };
    selectors.get(next).cloned()
}

fn category_label(screen: &ScreenState, selector: &CategorySelector) -> String {
    match selector {
        CategorySelector::All => "All".to_owned(),
        CategorySelector::Only(id) => screen
            .categories()
            .iter()
            .find(|category| category.id.get().to_string() == *id)
            .map(|category| category.label.clone())
            .unwrap_or_else(|| id.clone()),
    }
}

/// One line describing the selectors this screen binds, category excluded.
pub fn filter_summary(screen: &ScreenState, mode: InputMode) -> String {
    let kind = screen.kind();
    let filters = screen.filters();
    let mut parts = Vec::new();

    if kind.binds(FilterStage::Status) {
        parts.push(format!("s {}", filters.status.label()));
    }
    if kind.binds(FilterStage::Payment) {
        if kind == ScreenKind::Members {
            let counts = screen.payment_counts();
            let all = screen.derive_view().len();
            let choices = [
                (PaymentFilter::All, format!("All ({all})")),
                (PaymentFilter::Paid, format!("Paid ({})", counts.paid)),
                (PaymentFilter::NonPaid, format!("Non-Paid ({})", counts.non_paid)),
            ]
            .into_iter()
            .map(|(choice, label)| {
                if choice == filters.payment {
                    format!("[{label}]")
                } else {
                    label
                }
            })
            .collect::<Vec<_>>();
            parts.push(format!("p {}", choices.join(" ")));
        } else {
            parts.push(format!("p {}", filters.payment.label()));
        }
    }
    if kind.binds(FilterStage::Issued) {
        parts.push(format!("i {}", filters.issued.label()));
    }
    if kind.binds(FilterStage::Search) {
        let cursor = if mode == InputMode::Search { "_" } else { "" };
        if filters.search.is_empty() && cursor.is_empty() {
            parts.push("/ search".to_owned());
        } else {
            parts.push(format!("/ {}{cursor}", filters.search));
        }
    }
    parts.join(" | ")
}

pub fn status_text(ui: &UiState) -> String {
    let mode = match ui.mode {
        InputMode::Nav => "NAV",
        InputMode::Search => "SEARCH",
        InputMode::Edit => "EDIT",
        InputMode::Create => "NEW",
    };
    let hints = match ui.mode {
        InputMode::Nav => {
            let mut hints = vec!["1-3 screen", "tab category", "j/k"];
            if ui.offers(RowAction::Edit) {
                hints.push("e edit");
            }
            if ui.screen.kind() == ScreenKind::Members {
                hints.push("n new");
            }
            if ui.offers(RowAction::ToggleStatus) {
                hints.push("t toggle");
            }
            if ui.offers(RowAction::Delete) {
                hints.push("d delete");
            }
            hints.extend(["x csv", "P print", "r refresh", "q quit"]);
            hints.join(" | ")
        }
        InputMode::Search => "type to filter | enter keep | esc clear".to_owned(),
        InputMode::Edit => format!("field=value: {}_ | enter save | esc cancel", ui.edit_buffer),
        InputMode::Create => format!(
            "field=value; field=value: {}_ | enter add | esc cancel",
            ui.edit_buffer
        ),
    };

    let mut parts = vec![mode.to_owned()];
    if ui.screen.load() == LoadState::Loading {
        parts.push("loading".to_owned());
    }
    if let Some(status) = &ui.status_line {
        parts.push(status.clone());
    }
    parts.push(hints);
    parts.join(" | ")
}

fn match_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn segment_line(segments: &[Segment]) -> Line<'static> {
    Line::from(
        segments
            .iter()
            .map(|segment| {
                if segment.matched {
                    Span::styled(segment.text.clone(), match_style())
                } else {
                    Span::raw(segment.text.clone())
                }
            })
            .collect::<Vec<_>>(),
    )
}

fn action_hint(action: RowAction) -> &'static str {
    match action {
        RowAction::Edit => "e",
        RowAction::ToggleStatus => "t",
        RowAction::Delete => "d",
    }
}

/// Terminal rendering of one cell. Matched search segments keep their own span.
pub fn cell_line(cell: &CellValue) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    match cell {
        CellValue::Text(text) => Line::from(text.clone()),
        CellValue::Highlighted(segments) | CellValue::Link { segments, .. } => {
            segment_line(segments)
        }
        CellValue::Tag { label, tone } => {
            let color = match tone {
                Tone::Positive => Color::Green,
                Tone::Negative => Color::Red,
            };
            Line::from(Span::styled(
                label.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        }
        CellValue::Image { .. } => Line::from(Span::styled("img", dim)),
        CellValue::Actions(actions) => Line::from(Span::styled(
            actions
                .iter()
                .map(|action| format!("{} {}", action_hint(*action), action.label()))
                .collect::<Vec<_>>()
                .join("  "),
            dim,
        )),
    }
}

/// First row to draw so `selected` stays inside a window of `visible` rows.
pub fn window_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    selected.saturating_sub(visible - 1)
}

fn render(frame: &mut ratatui::Frame<'_>, ui: &UiState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = ScreenKind::ALL
        .iter()
        .position(|kind| *kind == ui.screen.kind())
        .unwrap_or(0);
    let titles = ScreenKind::ALL
        .iter()
        .enumerate()
        .map(|(index, kind)| format!("{} {}", index + 1, kind.title()))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("rollcall").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_filters(frame, layout[1], ui);
    render_table(frame, layout[2], ui);

    let status_widget = Paragraph::new(status_text(ui))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[3]);
}

fn render_filters(frame: &mut ratatui::Frame<'_>, area: Rect, ui: &UiState) {
    let summary = filter_summary(&ui.screen, ui.mode);
    if !ui.screen.kind().binds(FilterStage::Category) {
        let paragraph = Paragraph::new(summary)
            .block(Block::default().title("filters").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
        return;
    }

    let selectors = category_selectors(&ui.screen);
    let selected = selectors
        .iter()
        .position(|selector| selector == &ui.screen.filters().category)
        .unwrap_or(0);
    let labels = selectors
        .iter()
        .map(|selector| category_label(&ui.screen, selector))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(labels)
        .block(Block::default().title(summary).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, area);
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, ui: &UiState) {
    let Some(snapshot) = ui.snapshot() else {
        let empty = Paragraph::new(String::new())
            .block(Block::default().borders(Borders::ALL).title(ui.screen.title()));
        frame.render_widget(empty, area);
        return;
    };

    let title = format!("{} total:{}", snapshot.title, snapshot.total());
    if let Some(message) = &snapshot.empty_message {
        let empty = Paragraph::new(message.clone())
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let widths = vec![Constraint::Min(6); snapshot.columns.len().max(1)];
    let header = Row::new(snapshot.columns.iter().map(|column| {
        Cell::from(column.label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    // Two border rows and the header.
    let visible = usize::from(area.height.saturating_sub(3));
    let offset = window_offset(ui.selected, visible);
    let rows = snapshot
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(row_index, row)| {
            let mut style = Style::default();
            if row.inactive {
                style = style.bg(Color::Indexed(52));
            }
            if row_index == ui.selected {
                style = Style::default().fg(Color::Black).bg(Color::Cyan);
            }
            Row::new(row.cells.iter().map(|cell| Cell::from(cell_line(cell)))).style(style)
        });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::{
        ExportFormat, InputMode, InternalEvent, ScreenRuntime, UiAction, UiState, apply_action,
        cell_line, filter_summary, key_action, parse_assignment, parse_assignments, step_category,
        tick, window_offset,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::style::Color;
    use rollcall_app::{
        ActionContext, AuxiliaryLookup, Category, CategoryId, CategorySelector, CellValue,
        PresentationSink, Record, RecordCollection, ScreenCommand, ScreenEvent, ScreenKind,
        ScreenState, Segment,
    };
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::mpsc::{self, Receiver, Sender};

    type Harness = (
        UiState,
        FakeRuntime,
        Receiver<InternalEvent>,
        Sender<InternalEvent>,
    );

    fn member(id: i64, name: &str, category: i64, paid: &str, status: &str) -> Record {
        Record::from_value(json!({
            "id": id,
            "user_mid": format!("M{id:03}"),
            "name": name,
            "mobile": "9876543210",
            "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            "member_category": "Life",
            "user_member_catg_id": category,
            "payment_made": paid,
            "user_status": status,
        }))
        .expect("object")
    }

    fn roster() -> Vec<Record> {
        vec![
            member(1, "Asha Rao", 1, "yes", "Active"),
            member(2, "Vikram Iyer", 2, "no", "Active"),
            member(3, "Meera Rao", 1, "no", "Inactive"),
        ]
    }

    fn registration(id: i64, name: &str) -> Record {
        Record::from_value(json!({
            "id": id,
            "event_name": "Annual Meet",
            "event_register_name": name,
            "event_register_amount": 500,
        }))
        .expect("object")
    }

    /// Completes each request on the next `poll`, like a backend with one worker.
    #[derive(Default)]
    struct FakeRuntime {
        members: Vec<Record>,
        registrations: Vec<Record>,
        calls: Vec<String>,
        pending: Option<ScreenCommand>,
    }

    impl FakeRuntime {
        fn listing(&self, kind: ScreenKind) -> Vec<Record> {
            match kind {
                ScreenKind::Registrations => self.registrations.clone(),
                ScreenKind::Members | ScreenKind::MemberReport => self.members.clone(),
            }
        }

        fn start(&mut self, call: String, command: ScreenCommand) -> Result<Vec<ScreenEvent>> {
            if self.pending.is_some() {
                bail!("a request is already in flight");
            }
            self.calls.push(call);
            self.pending = Some(command);
            Ok(Vec::new())
        }
    }

    impl ScreenRuntime for FakeRuntime {
        fn is_busy(&self) -> bool {
            self.pending.is_some()
        }

        fn fetch(&mut self, screen: &mut ScreenState) -> Result<Vec<ScreenEvent>> {
            let records = RecordCollection::new(self.listing(screen.kind()));
            let mut events = screen.dispatch(ScreenCommand::FetchStarted);
            events.extend(self.start(
                format!("fetch {}", screen.kind().as_str()),
                ScreenCommand::FetchCompleted {
                    records,
                    lookup: AuxiliaryLookup::default(),
                },
            )?);
            Ok(events)
        }

        fn toggle_status(
            &mut self,
            _screen: &mut ScreenState,
            record: &Record,
        ) -> Result<Vec<ScreenEvent>> {
            let id = record.id().expect("id").get();
            for member in &mut self.members {
                if member.id() == record.id() {
                    let next = rollcall_app::next_member_status(
                        member.scalar_text("user_status").as_deref(),
                    );
                    *member = member.with_field("user_status", next);
                }
            }
            self.start(
                format!("toggle {id}"),
                ScreenCommand::MutationSucceeded {
                    message: Some("status updated".to_owned()),
                },
            )
        }

        fn update_field(
            &mut self,
            _screen: &mut ScreenState,
            record: &Record,
            field: &str,
            value: &str,
        ) -> Result<Vec<ScreenEvent>> {
            let id = record.id().expect("id").get();
            self.start(
                format!("update {id} {field}={value}"),
                ScreenCommand::MutationSucceeded { message: None },
            )
        }

        fn delete(&mut self, _screen: &mut ScreenState, record: &Record) -> Result<Vec<ScreenEvent>> {
            let id = record.id();
            self.registrations.retain(|row| row.id() != id);
            self.start(
                format!("delete {}", id.expect("id").get()),
                ScreenCommand::MutationSucceeded { message: None },
            )
        }

        fn create(
            &mut self,
            _screen: &mut ScreenState,
            fields: Vec<(String, String)>,
        ) -> Result<Vec<ScreenEvent>> {
            let assigned = fields
                .iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect::<Vec<_>>()
                .join(",");
            self.start(
                format!("create {assigned}"),
                ScreenCommand::MutationSucceeded {
                    message: Some("member added".to_owned()),
                },
            )
        }

        fn poll(&mut self, screen: &mut ScreenState) -> Vec<ScreenEvent> {
            self.pending
                .take()
                .map(|command| screen.dispatch(command))
                .unwrap_or_default()
        }

        fn export(
            &mut self,
            _kind: ScreenKind,
            format: ExportFormat,
            sink: &PresentationSink,
        ) -> Result<PathBuf> {
            let Some(snapshot) = sink.snapshot() else {
                bail!("nothing rendered");
            };
            self.calls
                .push(format!("export {} {}", format.label(), snapshot.total()));
            Ok(PathBuf::from("/tmp/Members Report.csv"))
        }
    }

    fn loaded(kind: ScreenKind, user_type: Option<&str>) -> Harness {
        let mut runtime = FakeRuntime {
            members: roster(),
            registrations: vec![registration(1, "Kiran"), registration(2, "Latha")],
            ..FakeRuntime::default()
        };
        let mut ui = UiState::new(ScreenState::new(kind), ActionContext::new(user_type));
        let (tx, rx) = mpsc::channel();
        tick(&mut ui, &mut runtime, &tx);
        tick(&mut ui, &mut runtime, &tx);
        (ui, runtime, rx, tx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn nav_keys_map_to_actions() {
        assert_eq!(
            key_action(InputMode::Nav, press(KeyCode::Char('q'))),
            Some(UiAction::Quit)
        );
        assert_eq!(
            key_action(InputMode::Nav, press(KeyCode::Char('3'))),
            Some(UiAction::SwitchScreen(ScreenKind::MemberReport))
        );
        assert_eq!(
            key_action(InputMode::Nav, press(KeyCode::Tab)),
            Some(UiAction::NextCategory)
        );
        assert_eq!(
            key_action(InputMode::Nav, KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT)),
            Some(UiAction::Export(ExportFormat::Print))
        );
    }

    #[test]
    fn typing_in_search_mode_never_quits() {
        assert_eq!(
            key_action(InputMode::Search, press(KeyCode::Char('q'))),
            Some(UiAction::Input('q'))
        );
        assert_eq!(
            key_action(InputMode::Search, press(KeyCode::Esc)),
            Some(UiAction::Cancel)
        );
        assert_eq!(
            key_action(
                InputMode::Edit,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            Some(UiAction::Quit)
        );
    }

    #[test]
    fn matched_segments_get_their_own_span() {
        let line = cell_line(&CellValue::Highlighted(vec![
            Segment {
                text: "Asha ".to_owned(),
                matched: false,
            },
            Segment {
                text: "Rao".to_owned(),
                matched: true,
            },
        ]));
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[1].content, "Rao");
        assert_eq!(line.spans[1].style.bg, Some(Color::Yellow));
        assert_eq!(line.spans[0].style.bg, None);
    }

    #[test]
    fn startup_fetch_renders_every_member() {
        let (ui, runtime, _rx, _tx) = loaded(ScreenKind::Members, None);
        assert_eq!(runtime.calls, vec!["fetch members".to_owned()]);
        assert_eq!(ui.snapshot().expect("snapshot").total(), 3);
        assert!(!ui.refetch_due());
    }

    #[test]
    fn toggle_refetches_only_after_its_completion() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        assert!(!apply_action(&mut ui, &mut runtime, &tx, UiAction::ToggleStatus));
        assert_eq!(runtime.calls.last().map(String::as_str), Some("toggle 1"));
        assert!(!ui.refetch_due());

        tick(&mut ui, &mut runtime, &tx);
        assert_eq!(ui.status_line.as_deref(), Some("status updated"));
        assert_eq!(runtime.calls.last().map(String::as_str), Some("fetch members"));

        tick(&mut ui, &mut runtime, &tx);
        let snapshot = ui.snapshot().expect("snapshot");
        assert!(snapshot.rows[0].inactive);
    }

    #[test]
    fn delete_is_gated_by_user_type() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Registrations, Some("1"));
        apply_action(&mut ui, &mut runtime, &tx, UiAction::Delete);
        assert_eq!(runtime.calls, vec!["fetch registrations".to_owned()]);
        assert_eq!(
            ui.status_line.as_deref(),
            Some("delete is not permitted for this user")
        );

        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Registrations, Some("3"));
        apply_action(&mut ui, &mut runtime, &tx, UiAction::Delete);
        assert_eq!(runtime.calls.last().map(String::as_str), Some("delete 1"));
        tick(&mut ui, &mut runtime, &tx);
        tick(&mut ui, &mut runtime, &tx);
        assert_eq!(ui.snapshot().expect("snapshot").total(), 1);
    }

    #[test]
    fn live_search_narrows_and_escape_clears() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::BeginSearch);
        assert_eq!(ui.mode, InputMode::Search);
        for ch in "rao".chars() {
            apply_action(&mut ui, &mut runtime, &tx, UiAction::Input(ch));
        }
        assert_eq!(ui.snapshot().expect("snapshot").total(), 2);
        assert_eq!(filter_summary(&ui.screen, ui.mode).rsplit(" | ").next(), Some("/ rao_"));

        apply_action(&mut ui, &mut runtime, &tx, UiAction::Cancel);
        assert_eq!(ui.mode, InputMode::Nav);
        assert_eq!(ui.snapshot().expect("snapshot").total(), 3);
    }

    #[test]
    fn category_tabs_wrap_and_reset_search() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        ui.screen.dispatch(ScreenCommand::CategoriesLoaded(vec![
            Category {
                id: CategoryId::new(1),
                label: "Life".to_owned(),
            },
            Category {
                id: CategoryId::new(2),
                label: "Annual".to_owned(),
            },
        ]));
        assert_eq!(
            step_category(&ui.screen, false),
            Some(CategorySelector::Only("2".to_owned()))
        );

        ui.screen.dispatch(ScreenCommand::SetSearch("asha".to_owned()));
        apply_action(&mut ui, &mut runtime, &tx, UiAction::NextCategory);
        assert_eq!(ui.screen.filters().category, CategorySelector::Only("1".to_owned()));
        assert!(ui.screen.filters().search.is_empty());
        assert_eq!(ui.snapshot().expect("snapshot").total(), 2);

        let registrations = ScreenState::new(ScreenKind::Registrations);
        assert_eq!(step_category(&registrations, true), None);
    }

    #[test]
    fn members_summary_shows_payment_counts() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::CyclePayment);
        let summary = filter_summary(&ui.screen, ui.mode);
        assert!(summary.starts_with("p All (1) [Paid (1)] Non-Paid (2)"), "{summary}");
    }

    #[test]
    fn unbound_selector_reports_instead_of_filtering() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::CycleStatus);
        assert_eq!(ui.screen.filters(), &rollcall_app::FilterState::default());
        assert_eq!(
            ui.status_line.as_deref(),
            Some("status filter is not available on Members")
        );
    }

    #[test]
    fn edit_commit_sends_parsed_assignment() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::MoveDown);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::BeginEdit);
        for ch in "name = Vikram I".chars() {
            apply_action(&mut ui, &mut runtime, &tx, UiAction::Input(ch));
        }
        apply_action(&mut ui, &mut runtime, &tx, UiAction::Commit);
        assert_eq!(ui.mode, InputMode::Nav);
        assert_eq!(
            runtime.calls.last().map(String::as_str),
            Some("update 2 name=Vikram I")
        );

        assert_eq!(parse_assignment("=value"), None);
        assert_eq!(parse_assignment("no separator"), None);
    }

    #[test]
    fn create_commit_sends_every_assignment() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        assert_eq!(
            key_action(InputMode::Nav, press(KeyCode::Char('n'))),
            Some(UiAction::BeginCreate)
        );
        apply_action(&mut ui, &mut runtime, &tx, UiAction::BeginCreate);
        assert_eq!(ui.mode, InputMode::Create);
        for ch in "name=Asha Rao; mobile = 98".chars() {
            apply_action(&mut ui, &mut runtime, &tx, UiAction::Input(ch));
        }
        apply_action(&mut ui, &mut runtime, &tx, UiAction::Commit);
        assert_eq!(ui.mode, InputMode::Nav);
        assert_eq!(
            runtime.calls.last().map(String::as_str),
            Some("create name=Asha Rao,mobile=98")
        );

        assert_eq!(parse_assignments(""), None);
        assert_eq!(parse_assignments("name=Om; broken"), None);
    }

    #[test]
    fn create_is_refused_off_the_members_screen() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Registrations, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::BeginCreate);
        assert_eq!(ui.mode, InputMode::Nav);
        assert_eq!(
            ui.status_line.as_deref(),
            Some("new records cannot be added on Event Registrations")
        );
    }

    #[test]
    fn report_screen_has_no_row_mutations() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::MemberReport, None);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::ToggleStatus);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::BeginEdit);
        assert_eq!(ui.mode, InputMode::Nav);
        assert_eq!(runtime.calls, vec!["fetch member-report".to_owned()]);
    }

    #[test]
    fn export_reports_written_path() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(
            &mut ui,
            &mut runtime,
            &tx,
            UiAction::Export(ExportFormat::Spreadsheet),
        );
        assert_eq!(
            runtime.calls.last().map(String::as_str),
            Some("export spreadsheet 3")
        );
        assert_eq!(
            ui.status_line.as_deref(),
            Some("exported to /tmp/Members Report.csv")
        );
    }

    #[test]
    fn switching_screens_starts_a_fresh_fetch() {
        let (mut ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        apply_action(
            &mut ui,
            &mut runtime,
            &tx,
            UiAction::SwitchScreen(ScreenKind::Registrations),
        );
        assert!(ui.refetch_due());
        assert_eq!(ui.snapshot().expect("snapshot").total(), 0);
        tick(&mut ui, &mut runtime, &tx);
        tick(&mut ui, &mut runtime, &tx);
        assert_eq!(ui.snapshot().expect("snapshot").total(), 2);
    }

    #[test]
    fn paging_stops_at_either_end() {
        let (ui, mut runtime, _rx, tx) = loaded(ScreenKind::Members, None);
        let mut ui = ui.with_page_size(2);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::PageDown);
        assert_eq!(ui.selected, 2);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::PageDown);
        assert_eq!(ui.selected, 2);
        apply_action(&mut ui, &mut runtime, &tx, UiAction::PageUp);
        assert_eq!(ui.selected, 0);
    }

    #[test]
    fn window_keeps_selection_visible() {
        assert_eq!(window_offset(0, 10), 0);
        assert_eq!(window_offset(9, 10), 0);
        assert_eq!(window_offset(12, 10), 3);
        assert_eq!(window_offset(4, 0), 4);
    }
}
