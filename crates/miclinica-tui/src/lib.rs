// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use miclinica_app::{
    AgeFilter, AppCommand, AppMode, AppSetting, AppState, Appointment, AppointmentFormInput,
    AppointmentId, AppointmentStatus, DashboardCounts, FinancialStatus, FormKind, FormPayload,
    InventoryCategoryId, InventoryItem, InventoryItemFormInput, InventoryItemId, Invoice,
    InvoiceFormInput, InvoiceId, InvoiceStatus, LastVisitFilter, Message, MessageDirection,
    Notification, NotificationKind, Patient, PatientFormInput, PatientId, PatientQuery,
    PatientSortKey, PatientStatus, PaymentMethod, Professional, ProfessionalFormInput,
    ProfessionalId, QueryCommand, SelectionState, SettingKey, SettingValue, SortDirection,
    TabKind, paginate,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use std::cmp::Ordering;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

const HALF_PAGE_ROWS: isize = 10;
const FULL_PAGE_ROWS: isize = 20;
const FILTER_MARK_ACTIVE: &str = "▼";
const FILTER_MARK_ACTIVE_INVERTED: &str = "▲";
const FILTER_MARK_PREVIEW: &str = "▽";
const SELECTED_MARK: &str = "✓";

#[derive(Debug, Clone, PartialEq)]
pub enum TabSnapshot {
    Patients(Vec<Patient>),
    Appointments(Vec<Appointment>),
    Billing(Vec<Invoice>),
    Inventory(Vec<InventoryItem>),
    Professionals(Vec<Professional>),
    Messages(Vec<Message>),
    Notifications(Vec<Notification>),
    Settings(Vec<AppSetting>),
}

impl TabSnapshot {
    pub const fn tab_kind(&self) -> TabKind {
        match self {
            Self::Patients(_) => TabKind::Patients,
            Self::Appointments(_) => TabKind::Appointments,
            Self::Billing(_) => TabKind::Billing,
            Self::Inventory(_) => TabKind::Inventory,
            Self::Professionals(_) => TabKind::Professionals,
            Self::Messages(_) => TabKind::Messages,
            Self::Notifications(_) => TabKind::Notifications,
            Self::Settings(_) => TabKind::Settings,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Patients(rows) => rows.len(),
            Self::Appointments(rows) => rows.len(),
            Self::Billing(rows) => rows.len(),
            Self::Inventory(rows) => rows.len(),
            Self::Professionals(rows) => rows.len(),
            Self::Messages(rows) => rows.len(),
            Self::Notifications(rows) => rows.len(),
            Self::Settings(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardSection {
    Today,
    Overdue,
    LowStock,
    RecentPayments,
}

impl DashboardSection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "today's appointments",
            Self::Overdue => "overdue invoices",
            Self::LowStock => "low stock",
            Self::RecentPayments => "recent payments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardAppointment {
    pub appointment_id: AppointmentId,
    pub patient_name: String,
    pub professional_name: String,
    pub scheduled_at: OffsetDateTime,
    pub status: AppointmentStatus,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardInvoice {
    pub invoice_id: InvoiceId,
    pub patient_name: String,
    pub amount_cents: i64,
    pub due_on: Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStockItem {
    pub item_id: InventoryItemId,
    pub name: String,
    pub quantity: i32,
    pub reorder_level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardPayment {
    pub invoice_id: InvoiceId,
    pub patient_name: String,
    pub amount_cents: i64,
    pub paid_on: Date,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSnapshot {
    pub appointments: Vec<DashboardAppointment>,
    pub overdue: Vec<DashboardInvoice>,
    pub low_stock: Vec<DashboardStockItem>,
    pub recent_payments: Vec<DashboardPayment>,
}

impl DashboardSnapshot {
    fn has_rows(&self) -> bool {
        !(self.appointments.is_empty()
            && self.overdue.is_empty()
            && self.low_stock.is_empty()
            && self.recent_payments.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Delete,
    Restore,
}

pub trait AppRuntime {
    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts>;
    fn load_dashboard_snapshot(&mut self) -> Result<DashboardSnapshot>;
    fn load_tab_snapshot(
        &mut self,
        tab: TabKind,
        include_deleted: bool,
    ) -> Result<Option<TabSnapshot>>;
    fn submit_form(&mut self, payload: &FormPayload) -> Result<()>;
    fn apply_lifecycle(&mut self, tab: TabKind, row_id: i64, action: LifecycleAction)
    -> Result<()>;
    fn mark_read(&mut self, tab: TabKind, row_id: i64) -> Result<()>;
    fn set_show_dashboard_preference(&mut self, show: bool) -> Result<()>;
    fn set_page_size_preference(&mut self, page_size: usize) -> Result<()>;
    fn load_page_size(&mut self) -> Result<usize> {
        Ok(miclinica_app::DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TableCell {
    Text(String),
    Integer(i64),
    Date(Option<Date>),
    DateTime(OffsetDateTime),
    Money(Option<i64>),
    PatientStatus(PatientStatus),
    FinancialStatus(FinancialStatus),
    AppointmentStatus(AppointmentStatus),
    InvoiceStatus(InvoiceStatus),
    PaymentMethod(PaymentMethod),
    Direction(MessageDirection),
    Kind(NotificationKind),
    Flag(bool),
}

impl TableCell {
    fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Date(Some(value)) => value.to_string(),
            Self::Date(None) => String::new(),
            Self::DateTime(value) => format_datetime_cell(*value),
            Self::Money(Some(cents)) => format_money(*cents),
            Self::Money(None) => String::new(),
            Self::PatientStatus(status) => status.as_str().to_owned(),
            Self::FinancialStatus(status) => status.as_str().to_owned(),
            Self::AppointmentStatus(status) => status.as_str().to_owned(),
            Self::InvoiceStatus(status) => status.as_str().to_owned(),
            Self::PaymentMethod(method) => method.as_str().to_owned(),
            Self::Direction(direction) => direction.as_str().to_owned(),
            Self::Kind(kind) => kind.as_str().to_owned(),
            Self::Flag(true) => "yes".to_owned(),
            Self::Flag(false) => String::new(),
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Self::Date(None) | Self::Money(None))
    }

    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Date(left), Self::Date(right)) => left.cmp(right),
            (Self::DateTime(left), Self::DateTime(right)) => left.cmp(right),
            (Self::Money(left), Self::Money(right)) => left.cmp(right),
            (Self::Flag(left), Self::Flag(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => {
                left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase())
            }
            _ => self
                .display()
                .to_ascii_lowercase()
                .cmp(&other.display().to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TableRowProjection {
    cells: Vec<TableCell>,
    deleted: bool,
    selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct TableProjection {
    title: &'static str,
    columns: Vec<&'static str>,
    rows: Vec<TableRowProjection>,
}

impl TableProjection {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortSpec {
    column: usize,
    direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
struct PinnedCell {
    column: usize,
    value: TableCell,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct TableUiState {
    tab: Option<TabKind>,
    selected_row: usize,
    selected_col: usize,
    sorts: Vec<SortSpec>,
    pin: Option<PinnedCell>,
    filter_active: bool,
    filter_inverted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveColumn(isize),
    MoveHalfPageDown,
    MoveHalfPageUp,
    MoveFullPageDown,
    MoveFullPageUp,
    JumpFirstRow,
    JumpLastRow,
    JumpFirstColumn,
    JumpLastColumn,
    CycleSort,
    ClearSort,
    TogglePin,
    ToggleFilter,
    ToggleFilterInversion,
    ClearPins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TableStatus {
    SortUnavailable,
    SortAsc(&'static str),
    SortDesc(&'static str),
    SortCleared,
    PinUnavailable,
    PinOn(String),
    PinOff,
    PinsCleared,
    SetPinFirst,
    FilterOn,
    FilterOff,
    FilterInvertedOn,
    FilterInvertedOff,
}

impl TableStatus {
    fn message(self) -> String {
        match self {
            Self::SortUnavailable => "sort unavailable".to_owned(),
            Self::SortAsc(column) => format!("sort {column} asc"),
            Self::SortDesc(column) => format!("sort {column} desc"),
            Self::SortCleared => "sort cleared".to_owned(),
            Self::PinUnavailable => "pin unavailable".to_owned(),
            Self::PinOn(value) => format!("pin on ({value})"),
            Self::PinOff => "pin off".to_owned(),
            Self::PinsCleared => "pins cleared".to_owned(),
            Self::SetPinFirst => "set a pin first".to_owned(),
            Self::FilterOn => "filter on".to_owned(),
            Self::FilterOff => "filter off".to_owned(),
            Self::FilterInvertedOn => "filter inverted on".to_owned(),
            Self::FilterInvertedOff => "filter inverted off".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TableEvent {
    CursorUpdated,
    Status(TableStatus),
}

/// Commands specific to the patient list view; everything else on that tab
/// falls through to the shared table machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatientCommand {
    EnterSearch,
    CycleStatusFilter,
    CycleFinancialFilter,
    CycleAgeFilter,
    CycleLastVisitFilter,
    CycleSort,
    NextPage,
    PrevPage,
    ToggleSelect,
    SelectPage,
    ClearSelection,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct PatientViewState {
    query: PatientQuery,
    selection: SelectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormFieldSpec {
    label: &'static str,
    hint: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
struct FormUiState {
    kind: FormKind,
    field_index: usize,
    values: Vec<String>,
}

impl FormUiState {
    fn new(kind: FormKind) -> Self {
        Self {
            kind,
            field_index: 0,
            values: vec![String::new(); form_field_specs(kind).len()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct DashboardUiState {
    visible: bool,
    snapshot: DashboardSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Default)]
struct ViewData {
    counts: DashboardCounts,
    dashboard: DashboardUiState,
    active_tab_snapshot: Option<TabSnapshot>,
    table_state: TableUiState,
    patients: PatientViewState,
    form: Option<FormUiState>,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    view_data.patients.query.page_size = runtime
        .load_page_size()
        .unwrap_or(miclinica_app::DEFAULT_PAGE_SIZE)
        .max(1);
    let (internal_tx, internal_rx) = mpsc::channel();

    if state.active_tab == TabKind::Dashboard {
        state.active_tab = TabKind::Patients;
        view_data.dashboard.visible = true;
    }

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.counts = runtime.load_dashboard_counts()?;
    if view_data.dashboard.visible {
        view_data.dashboard.snapshot = runtime.load_dashboard_snapshot()?;
    }

    view_data.active_tab_snapshot =
        runtime.load_tab_snapshot(state.active_tab, state.show_deleted)?;
    if view_data.table_state.tab != Some(state.active_tab) {
        view_data.table_state = TableUiState {
            tab: Some(state.active_tab),
            ..TableUiState::default()
        };
    }
    clamp_table_cursor(view_data);
    clamp_patient_page(view_data);
    Ok(())
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.mode {
        AppMode::Search => {
            handle_search_key(state, view_data, key);
            false
        }
        AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_search_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            let mut text = view_data.patients.query.search_text.clone();
            text.pop();
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetSearch(text));
            clamp_table_cursor(view_data);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut text = view_data.patients.query.search_text.clone();
            text.push(ch);
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetSearch(text));
            clamp_table_cursor(view_data);
        }
        _ => {}
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextTab);
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            }
            return false;
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevTab);
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            }
            return false;
        }
        KeyCode::Char('D') => {
            view_data.dashboard.visible = !view_data.dashboard.visible;
            if view_data.dashboard.visible
                && let Err(error) = refresh_view_data(state, runtime, view_data)
            {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            }
            return false;
        }
        KeyCode::Char('z') => {
            state.dispatch(AppCommand::ToggleDeleted);
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            }
            return false;
        }
        KeyCode::Char('i') => {
            if let Some(kind) = form_kind_for_tab(state.active_tab) {
                state.dispatch(AppCommand::OpenForm(kind));
                view_data.form = Some(FormUiState::new(kind));
            } else {
                emit_status(state, view_data, internal_tx, "no form on this tab");
            }
            return false;
        }
        KeyCode::Char('d') if key.modifiers == KeyModifiers::NONE => {
            apply_lifecycle_action(state, runtime, view_data, internal_tx, LifecycleAction::Delete);
            return false;
        }
        KeyCode::Char('r') => {
            apply_lifecycle_action(
                state,
                runtime,
                view_data,
                internal_tx,
                LifecycleAction::Restore,
            );
            return false;
        }
        KeyCode::Enter => {
            handle_nav_enter(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Char('+') | KeyCode::Char('-')
            if state.active_tab == TabKind::Settings =>
        {
            adjust_page_size_setting(
                state,
                runtime,
                view_data,
                internal_tx,
                key.code == KeyCode::Char('+'),
            );
            return false;
        }
        _ => {}
    }

    if state.active_tab == TabKind::Patients
        && let Some(command) = patient_command_for_key(key)
    {
        handle_patient_command(state, view_data, internal_tx, command);
        return false;
    }

    if let Some(command) = table_command_for_key(key) {
        match apply_table_command(view_data, command) {
            TableEvent::CursorUpdated => {}
            TableEvent::Status(status) => {
                emit_status(state, view_data, internal_tx, status.message());
            }
        }
    }
    false
}

fn form_kind_for_tab(tab: TabKind) -> Option<FormKind> {
    match tab {
        TabKind::Patients => Some(FormKind::Patient),
        TabKind::Appointments => Some(FormKind::Appointment),
        TabKind::Billing => Some(FormKind::Invoice),
        TabKind::Inventory => Some(FormKind::InventoryItem),
        TabKind::Professionals => Some(FormKind::Professional),
        TabKind::Dashboard
        | TabKind::Messages
        | TabKind::Notifications
        | TabKind::Settings => None,
    }
}

fn handle_nav_enter<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match state.active_tab {
        TabKind::Messages | TabKind::Notifications => {
            let Some(row_id) = selected_row_id(view_data) else {
                return;
            };
            let outcome = runtime
                .mark_read(state.active_tab, row_id)
                .and_then(|()| refresh_view_data(state, runtime, view_data));
            match outcome {
                Ok(()) => emit_status(state, view_data, internal_tx, "marked read"),
                Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
            }
        }
        TabKind::Settings => {
            toggle_bool_setting(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
}

fn toggle_bool_setting<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let selected = match &view_data.active_tab_snapshot {
        Some(TabSnapshot::Settings(settings)) => settings
            .get(view_data.table_state.selected_row)
            .map(|setting| (setting.key, setting.value.clone())),
        _ => None,
    };
    let Some((key, value)) = selected else {
        return;
    };

    match (key, value) {
        (SettingKey::UiShowDashboard, SettingValue::Bool(current)) => {
            let next = !current;
            let outcome = runtime
                .set_show_dashboard_preference(next)
                .and_then(|()| refresh_view_data(state, runtime, view_data));
            match outcome {
                Ok(()) => {
                    let label = if next {
                        "dashboard on startup"
                    } else {
                        "dashboard skipped on startup"
                    };
                    emit_status(state, view_data, internal_tx, label);
                }
                Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
            }
        }
        (SettingKey::UiPageSize, _) => {
            emit_status(state, view_data, internal_tx, "use +/- to adjust page size");
        }
        _ => {}
    }
}

fn adjust_page_size_setting<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    increase: bool,
) {
    let current = view_data.patients.query.page_size;
    let next = if increase {
        current.saturating_add(5)
    } else {
        current.saturating_sub(5).max(5)
    };
    if next == current {
        return;
    }

    let outcome = runtime
        .set_page_size_preference(next)
        .and_then(|()| refresh_view_data(state, runtime, view_data));
    match outcome {
        Ok(()) => {
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetPageSize(next));
            emit_status(state, view_data, internal_tx, format!("page size {next}"));
        }
        Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
    }
}

fn apply_lifecycle_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: LifecycleAction,
) {
    let tab = state.active_tab;
    if !matches!(
        tab,
        TabKind::Patients
            | TabKind::Appointments
            | TabKind::Billing
            | TabKind::Inventory
            | TabKind::Professionals
    ) {
        emit_status(state, view_data, internal_tx, "no delete on this tab");
        return;
    }

    // On the patient list a non-empty selection is a bulk action over the
    // ids still present in the filtered set.
    let targets: Vec<i64> = if tab == TabKind::Patients
        && action == LifecycleAction::Delete
        && !view_data.patients.selection.is_empty()
    {
        let Some(TabSnapshot::Patients(records)) = &view_data.active_tab_snapshot else {
            return;
        };
        let filtered = filtered_patients(records, &view_data.patients.query);
        view_data
            .patients
            .selection
            .intersect(filtered.iter())
            .into_iter()
            .map(PatientId::get)
            .collect()
    } else {
        selected_row_id(view_data).into_iter().collect()
    };

    if targets.is_empty() {
        emit_status(state, view_data, internal_tx, "nothing selected");
        return;
    }

    let count = targets.len();
    let mut outcome: Result<()> = Ok(());
    for row_id in targets {
        outcome = runtime.apply_lifecycle(tab, row_id, action);
        if outcome.is_err() {
            break;
        }
    }
    let outcome = outcome.and_then(|()| refresh_view_data(state, runtime, view_data));

    match outcome {
        Ok(()) => {
            if tab == TabKind::Patients && action == LifecycleAction::Delete {
                view_data.patients.selection.clear();
            }
            let verb = match action {
                LifecycleAction::Delete => "deleted",
                LifecycleAction::Restore => "restored",
            };
            let message = if count == 1 {
                format!("{verb} 1 row")
            } else {
                format!("{verb} {count} rows")
            };
            emit_status(state, view_data, internal_tx, message);
        }
        Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
    }
}

fn patient_command_for_key(key: KeyEvent) -> Option<PatientCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('/'), _) => Some(PatientCommand::EnterSearch),
        (KeyCode::Char('f'), KeyModifiers::NONE) => Some(PatientCommand::CycleStatusFilter),
        (KeyCode::Char('F'), _) => Some(PatientCommand::CycleFinancialFilter),
        (KeyCode::Char('y'), KeyModifiers::NONE) => Some(PatientCommand::CycleAgeFilter),
        (KeyCode::Char('v'), KeyModifiers::NONE) => Some(PatientCommand::CycleLastVisitFilter),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(PatientCommand::CycleSort),
        (KeyCode::Char(']'), _) => Some(PatientCommand::NextPage),
        (KeyCode::Char('['), _) => Some(PatientCommand::PrevPage),
        (KeyCode::Char(' '), _) => Some(PatientCommand::ToggleSelect),
        (KeyCode::Char('m'), KeyModifiers::NONE) => Some(PatientCommand::SelectPage),
        (KeyCode::Char('M'), _) => Some(PatientCommand::ClearSelection),
        _ => None,
    }
}

fn handle_patient_command(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: PatientCommand,
) {
    let message = match command {
        PatientCommand::EnterSearch => {
            state.dispatch(AppCommand::EnterSearchMode);
            "search: type, enter/esc to finish".to_owned()
        }
        PatientCommand::CycleStatusFilter => {
            let next = cycle_status_filter(view_data.patients.query.status);
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetStatusFilter(next));
            format!(
                "status filter {}",
                next.map_or("off".to_owned(), |status| status.as_str().to_owned())
            )
        }
        PatientCommand::CycleFinancialFilter => {
            let next = cycle_financial_filter(view_data.patients.query.financial_status);
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetFinancialFilter(next));
            format!(
                "financial filter {}",
                next.map_or("off".to_owned(), |status| status.as_str().to_owned())
            )
        }
        PatientCommand::CycleAgeFilter => {
            let next = cycle_age_filter(view_data.patients.query.age);
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetAgeFilter(next));
            format!("age filter {}", age_filter_label(next))
        }
        PatientCommand::CycleLastVisitFilter => {
            let next = cycle_last_visit_filter(view_data.patients.query.last_visit);
            view_data
                .patients
                .query
                .dispatch(QueryCommand::SetLastVisitFilter(next));
            format!("last visit filter {}", last_visit_filter_label(next))
        }
        PatientCommand::CycleSort => {
            match patient_sort_key_for_column(view_data.table_state.selected_col) {
                Some(key) => {
                    view_data
                        .patients
                        .query
                        .dispatch(QueryCommand::CycleSort(key));
                    match view_data.patients.query.sort {
                        Some(sort) if sort.direction == SortDirection::Asc => {
                            format!("sort {} asc", patient_sort_key_label(sort.key))
                        }
                        Some(sort) => format!("sort {} desc", patient_sort_key_label(sort.key)),
                        None => "sort cleared".to_owned(),
                    }
                }
                None => TableStatus::SortUnavailable.message(),
            }
        }
        PatientCommand::NextPage => {
            view_data.patients.query.dispatch(QueryCommand::NextPage);
            clamp_patient_page(view_data);
            patient_page_status(view_data)
        }
        PatientCommand::PrevPage => {
            view_data.patients.query.dispatch(QueryCommand::PrevPage);
            clamp_patient_page(view_data);
            patient_page_status(view_data)
        }
        PatientCommand::ToggleSelect => {
            let Some(patient_id) = selected_patient_id(view_data) else {
                return;
            };
            let added = view_data.patients.selection.toggle(patient_id);
            format!(
                "{} patient {} ({} selected)",
                if added { "selected" } else { "unselected" },
                patient_id.get(),
                view_data.patients.selection.len()
            )
        }
        PatientCommand::SelectPage => {
            let Some(page) = current_patient_page(view_data) else {
                return;
            };
            view_data.patients.selection.select_page(&page.items);
            format!("{} selected", view_data.patients.selection.len())
        }
        PatientCommand::ClearSelection => {
            view_data.patients.selection.clear();
            "selection cleared".to_owned()
        }
    };

    clamp_table_cursor(view_data);
    emit_status(state, view_data, internal_tx, message);
}

fn cycle_status_filter(current: Option<PatientStatus>) -> Option<PatientStatus> {
    match current {
        None => Some(PatientStatus::Active),
        Some(PatientStatus::Active) => Some(PatientStatus::Inactive),
        Some(PatientStatus::Inactive) => Some(PatientStatus::Pending),
        Some(PatientStatus::Pending) => None,
    }
}

fn cycle_financial_filter(current: Option<FinancialStatus>) -> Option<FinancialStatus> {
    match current {
        None => Some(FinancialStatus::Ok),
        Some(FinancialStatus::Ok) => Some(FinancialStatus::Pending),
        Some(FinancialStatus::Pending) => Some(FinancialStatus::Overdue),
        Some(FinancialStatus::Overdue) => None,
    }
}

const AGE_BUCKETS: [AgeFilter; 4] = [
    AgeFilter::Between { min: 0, max: 17 },
    AgeFilter::Between { min: 18, max: 39 },
    AgeFilter::Between { min: 40, max: 59 },
    AgeFilter::AtLeast(60),
];

fn cycle_age_filter(current: Option<AgeFilter>) -> Option<AgeFilter> {
    match current {
        None => Some(AGE_BUCKETS[0]),
        Some(bucket) => AGE_BUCKETS
            .iter()
            .position(|candidate| *candidate == bucket)
            .and_then(|index| AGE_BUCKETS.get(index + 1))
            .copied(),
    }
}

fn age_filter_label(filter: Option<AgeFilter>) -> String {
    match filter {
        None => "off".to_owned(),
        Some(AgeFilter::Between { min, max }) => format!("{min}-{max}"),
        Some(AgeFilter::AtLeast(min)) => format!("{min}+"),
    }
}

const LAST_VISIT_BUCKETS: [LastVisitFilter; 4] = [
    LastVisitFilter::WithinMonths(3),
    LastVisitFilter::WithinMonths(6),
    LastVisitFilter::WithinMonths(12),
    LastVisitFilter::Never,
];

fn cycle_last_visit_filter(current: Option<LastVisitFilter>) -> Option<LastVisitFilter> {
    match current {
        None => Some(LAST_VISIT_BUCKETS[0]),
        Some(bucket) => LAST_VISIT_BUCKETS
            .iter()
            .position(|candidate| *candidate == bucket)
            .and_then(|index| LAST_VISIT_BUCKETS.get(index + 1))
            .copied(),
    }
}

fn last_visit_filter_label(filter: Option<LastVisitFilter>) -> String {
    match filter {
        None => "off".to_owned(),
        Some(LastVisitFilter::WithinMonths(months)) => format!("within {months}mo"),
        Some(LastVisitFilter::Never) => "never visited".to_owned(),
    }
}

/// Patient table columns: sel, id, name, email, phone, tax id, status,
/// financial, age, last visit.
fn patient_sort_key_for_column(column: usize) -> Option<PatientSortKey> {
    match column {
        2 => Some(PatientSortKey::Name),
        3 => Some(PatientSortKey::Email),
        6 => Some(PatientSortKey::Status),
        7 => Some(PatientSortKey::FinancialStatus),
        8 => Some(PatientSortKey::Age),
        9 => Some(PatientSortKey::LastVisit),
        _ => None,
    }
}

fn patient_sort_key_label(key: PatientSortKey) -> &'static str {
    match key {
        PatientSortKey::Name => "name",
        PatientSortKey::Email => "email",
        PatientSortKey::Age => "age",
        PatientSortKey::Status => "status",
        PatientSortKey::FinancialStatus => "financial",
        PatientSortKey::LastVisit => "last visit",
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn filtered_patients(records: &[Patient], query: &PatientQuery) -> Vec<Patient> {
    let all = PatientQuery {
        page_size: records.len().max(1),
        page_index: 1,
        ..query.clone()
    };
    paginate(records, &all, today()).items
}

fn current_patient_page(view_data: &ViewData) -> Option<miclinica_app::PatientPage> {
    let Some(TabSnapshot::Patients(records)) = &view_data.active_tab_snapshot else {
        return None;
    };
    Some(paginate(records, &view_data.patients.query, today()))
}

fn clamp_patient_page(view_data: &mut ViewData) {
    let Some(page) = current_patient_page(view_data) else {
        return;
    };
    view_data.patients.query.clamp_page(page.total_pages);
}

fn patient_page_status(view_data: &ViewData) -> String {
    match current_patient_page(view_data) {
        Some(page) => format!(
            "page {}/{} ({} patients)",
            view_data.patients.query.page_index, page.total_pages, page.total_count
        ),
        None => "no patient data".to_owned(),
    }
}

fn selected_patient_id(view_data: &ViewData) -> Option<PatientId> {
    let page = current_patient_page(view_data)?;
    page.items
        .get(view_data.table_state.selected_row)
        .map(|patient| patient.id)
}

fn selected_row_id(view_data: &ViewData) -> Option<i64> {
    let projection = active_projection(view_data)?;
    let row = projection.rows.get(view_data.table_state.selected_row)?;
    row.cells.iter().find_map(|cell| match cell {
        TableCell::Integer(id) => Some(*id),
        _ => None,
    })
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let field_count = form_field_specs(form.kind).len();

    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Up => {
            form.field_index = form.field_index.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Tab => {
            form.field_index = (form.field_index + 1).min(field_count.saturating_sub(1));
        }
        KeyCode::Backspace => {
            if let Some(value) = form.values.get_mut(form.field_index) {
                value.pop();
            }
        }
        KeyCode::Enter => {
            if form.field_index + 1 < field_count {
                form.field_index += 1;
                return;
            }
            let kind = form.kind;
            let values = form.values.clone();
            let outcome = build_payload(kind, &values)
                .and_then(|payload| runtime.submit_form(&payload))
                .and_then(|()| refresh_view_data(state, runtime, view_data));
            match outcome {
                Ok(()) => {
                    view_data.form = None;
                    state.dispatch(AppCommand::ExitToNav);
                    emit_status(state, view_data, internal_tx, "saved");
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, error.to_string());
                }
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(value) = form.values.get_mut(form.field_index) {
                value.push(ch);
            }
        }
        _ => {}
    }
}

fn form_field_specs(kind: FormKind) -> &'static [FormFieldSpec] {
    match kind {
        FormKind::Patient => &[
            FormFieldSpec { label: "name", hint: "" },
            FormFieldSpec { label: "email", hint: "" },
            FormFieldSpec { label: "phone", hint: "" },
            FormFieldSpec { label: "tax id", hint: "" },
            FormFieldSpec { label: "status", hint: "active | inactive | pending" },
            FormFieldSpec { label: "financial", hint: "ok | pending | overdue" },
            FormFieldSpec { label: "birth date", hint: "YYYY-MM-DD" },
            FormFieldSpec { label: "last visit", hint: "YYYY-MM-DD, optional" },
            FormFieldSpec { label: "address", hint: "" },
            FormFieldSpec { label: "city", hint: "" },
            FormFieldSpec { label: "state", hint: "" },
            FormFieldSpec { label: "postal code", hint: "" },
            FormFieldSpec { label: "notes", hint: "" },
        ],
        FormKind::Professional => &[
            FormFieldSpec { label: "name", hint: "" },
            FormFieldSpec { label: "specialty id", hint: "numeric id" },
            FormFieldSpec { label: "registration", hint: "" },
            FormFieldSpec { label: "email", hint: "" },
            FormFieldSpec { label: "phone", hint: "" },
            FormFieldSpec { label: "notes", hint: "" },
        ],
        FormKind::Appointment => &[
            FormFieldSpec { label: "patient id", hint: "numeric id" },
            FormFieldSpec { label: "professional id", hint: "numeric id" },
            FormFieldSpec { label: "scheduled at", hint: "YYYY-MM-DD HH:MM" },
            FormFieldSpec { label: "duration minutes", hint: "" },
            FormFieldSpec {
                label: "status",
                hint: "scheduled | confirmed | completed | canceled | no_show",
            },
            FormFieldSpec { label: "room", hint: "" },
            FormFieldSpec { label: "notes", hint: "" },
        ],
        FormKind::Invoice => &[
            FormFieldSpec { label: "patient id", hint: "numeric id" },
            FormFieldSpec { label: "description", hint: "" },
            FormFieldSpec { label: "amount", hint: "dollars, e.g. 120.50" },
            FormFieldSpec { label: "status", hint: "paid | pending | overdue" },
            FormFieldSpec { label: "method", hint: "cash | card | transfer | insurance" },
            FormFieldSpec { label: "issued on", hint: "YYYY-MM-DD" },
            FormFieldSpec { label: "due on", hint: "YYYY-MM-DD" },
            FormFieldSpec { label: "paid on", hint: "YYYY-MM-DD, optional" },
            FormFieldSpec { label: "notes", hint: "" },
        ],
        FormKind::InventoryItem => &[
            FormFieldSpec { label: "name", hint: "" },
            FormFieldSpec { label: "category id", hint: "numeric id" },
            FormFieldSpec { label: "quantity", hint: "" },
            FormFieldSpec { label: "reorder level", hint: "" },
            FormFieldSpec { label: "unit cost", hint: "dollars, optional" },
            FormFieldSpec { label: "expires on", hint: "YYYY-MM-DD, optional" },
            FormFieldSpec { label: "supplier", hint: "" },
            FormFieldSpec { label: "notes", hint: "" },
        ],
    }
}

fn build_payload(kind: FormKind, values: &[String]) -> Result<FormPayload> {
    let field = |index: usize| values.get(index).map(String::as_str).unwrap_or("").trim();

    let payload = match kind {
        FormKind::Patient => FormPayload::Patient(PatientFormInput {
            name: field(0).to_owned(),
            email: field(1).to_owned(),
            phone: field(2).to_owned(),
            tax_id: field(3).to_owned(),
            status: parse_enum_field(field(4), PatientStatus::parse, PatientStatus::Pending)?,
            financial_status: parse_enum_field(
                field(5),
                FinancialStatus::parse,
                FinancialStatus::Ok,
            )?,
            birth_date: parse_date_field(field(6))?,
            last_visit: parse_date_field(field(7))?,
            address_line: field(8).to_owned(),
            city: field(9).to_owned(),
            state: field(10).to_owned(),
            postal_code: field(11).to_owned(),
            notes: field(12).to_owned(),
        }),
        FormKind::Professional => FormPayload::Professional(ProfessionalFormInput {
            name: field(0).to_owned(),
            specialty_id: miclinica_app::SpecialtyId::new(parse_id_field(field(1))?),
            registration: field(2).to_owned(),
            email: field(3).to_owned(),
            phone: field(4).to_owned(),
            notes: field(5).to_owned(),
        }),
        FormKind::Appointment => FormPayload::Appointment(AppointmentFormInput {
            patient_id: PatientId::new(parse_id_field(field(0))?),
            professional_id: ProfessionalId::new(parse_id_field(field(1))?),
            scheduled_at: parse_datetime_field(field(2))?,
            duration_minutes: parse_int_field(field(3))?.unwrap_or(30),
            status: parse_enum_field(
                field(4),
                AppointmentStatus::parse,
                AppointmentStatus::Scheduled,
            )?,
            room: field(5).to_owned(),
            notes: field(6).to_owned(),
        }),
        FormKind::Invoice => FormPayload::Invoice(InvoiceFormInput {
            patient_id: PatientId::new(parse_id_field(field(0))?),
            description: field(1).to_owned(),
            amount_cents: parse_money_field(field(2))?.unwrap_or(0),
            status: parse_enum_field(field(3), InvoiceStatus::parse, InvoiceStatus::Pending)?,
            method: parse_enum_field(field(4), PaymentMethod::parse, PaymentMethod::Card)?,
            issued_on: parse_date_field(field(5))?,
            due_on: parse_date_field(field(6))?,
            paid_on: parse_date_field(field(7))?,
            notes: field(8).to_owned(),
        }),
        FormKind::InventoryItem => FormPayload::InventoryItem(InventoryItemFormInput {
            name: field(0).to_owned(),
            category_id: InventoryCategoryId::new(parse_id_field(field(1))?),
            quantity: parse_int_field(field(2))?.unwrap_or(0),
            reorder_level: parse_int_field(field(3))?.unwrap_or(0),
            unit_cost_cents: parse_money_field(field(4))?,
            expires_on: parse_date_field(field(5))?,
            supplier: field(6).to_owned(),
            notes: field(7).to_owned(),
        }),
    };

    payload.validate()?;
    Ok(payload)
}

fn parse_enum_field<T>(raw: &str, parse: fn(&str) -> Option<T>, default: T) -> Result<T> {
    if raw.is_empty() {
        return Ok(default);
    }
    parse(&raw.to_ascii_lowercase())
        .ok_or_else(|| anyhow::anyhow!("unknown value {raw:?} -- see the field hint"))
}

fn parse_date_field(raw: &str) -> Result<Option<Date>> {
    if raw.is_empty() {
        return Ok(None);
    }
    Date::parse(raw, &format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| anyhow::anyhow!("invalid date {raw:?} -- use YYYY-MM-DD"))
}

fn parse_datetime_field(raw: &str) -> Result<Option<OffsetDateTime>> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ) {
        return Ok(Some(value.assume_utc()));
    }
    if let Ok(date) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        let morning = Time::from_hms(9, 0, 0).expect("valid default slot");
        return Ok(Some(date.with_time(morning).assume_utc()));
    }
    Err(anyhow::anyhow!(
        "invalid time {raw:?} -- use YYYY-MM-DD HH:MM"
    ))
}

fn parse_int_field(raw: &str) -> Result<Option<i32>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("invalid number {raw:?}"))
}

fn parse_id_field(raw: &str) -> Result<i64> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<i64>()
        .map_err(|_| anyhow::anyhow!("invalid id {raw:?}"))
}

fn parse_money_field(raw: &str) -> Result<Option<i64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let (dollars_raw, cents_raw) = match cleaned.split_once('.') {
        Some((dollars, cents)) => (dollars, cents),
        None => (cleaned.as_str(), ""),
    };
    if cents_raw.len() > 2 || cents_raw.chars().any(|c| !c.is_ascii_digit()) {
        return Err(anyhow::anyhow!("invalid amount {raw:?}"));
    }
    let dollars: i64 = if dollars_raw.is_empty() {
        0
    } else {
        dollars_raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid amount {raw:?}"))?
    };
    let cents: i64 = match cents_raw.len() {
        0 => 0,
        1 => {
            cents_raw
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("invalid amount {raw:?}"))?
                * 10
        }
        _ => cents_raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid amount {raw:?}"))?,
    };
    if dollars < 0 {
        return Err(anyhow::anyhow!("amount cannot be negative"));
    }
    Ok(Some(dollars * 100 + cents))
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(TableCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(TableCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(TableCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(TableCommand::MoveColumn(1)),
        (KeyCode::Char('d'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TableCommand::MoveHalfPageDown)
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TableCommand::MoveHalfPageUp)
        }
        (KeyCode::PageDown, _) => Some(TableCommand::MoveFullPageDown),
        (KeyCode::PageUp, _) => Some(TableCommand::MoveFullPageUp),
        (KeyCode::Char('g'), _) => Some(TableCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) => Some(TableCommand::JumpLastRow),
        (KeyCode::Char('^'), _) => Some(TableCommand::JumpFirstColumn),
        (KeyCode::Char('$'), _) => Some(TableCommand::JumpLastColumn),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(TableCommand::CycleSort),
        (KeyCode::Char('S'), _) => Some(TableCommand::ClearSort),
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => Some(TableCommand::ClearPins),
        (KeyCode::Char('n'), KeyModifiers::NONE) => Some(TableCommand::TogglePin),
        (KeyCode::Char('N'), _) => Some(TableCommand::ToggleFilter),
        (KeyCode::Char('!'), _) => Some(TableCommand::ToggleFilterInversion),
        _ => None,
    }
}

fn apply_table_command(view_data: &mut ViewData, command: TableCommand) -> TableEvent {
    match command {
        TableCommand::MoveRow(delta) => {
            move_row(view_data, delta);
            TableEvent::CursorUpdated
        }
        TableCommand::MoveColumn(delta) => {
            move_col(view_data, delta);
            TableEvent::CursorUpdated
        }
        TableCommand::MoveHalfPageDown => {
            move_row(view_data, HALF_PAGE_ROWS);
            TableEvent::CursorUpdated
        }
        TableCommand::MoveHalfPageUp => {
            move_row(view_data, -HALF_PAGE_ROWS);
            TableEvent::CursorUpdated
        }
        TableCommand::MoveFullPageDown => {
            move_row(view_data, FULL_PAGE_ROWS);
            TableEvent::CursorUpdated
        }
        TableCommand::MoveFullPageUp => {
            move_row(view_data, -FULL_PAGE_ROWS);
            TableEvent::CursorUpdated
        }
        TableCommand::JumpFirstRow => {
            view_data.table_state.selected_row = 0;
            TableEvent::CursorUpdated
        }
        TableCommand::JumpLastRow => {
            if let Some(projection) = active_projection(view_data) {
                view_data.table_state.selected_row = projection.row_count().saturating_sub(1);
            }
            TableEvent::CursorUpdated
        }
        TableCommand::JumpFirstColumn => {
            view_data.table_state.selected_col = 0;
            TableEvent::CursorUpdated
        }
        TableCommand::JumpLastColumn => {
            if let Some(projection) = active_projection(view_data) {
                view_data.table_state.selected_col = projection.column_count().saturating_sub(1);
            }
            TableEvent::CursorUpdated
        }
        TableCommand::CycleSort => TableEvent::Status(cycle_sort(view_data)),
        TableCommand::ClearSort => {
            view_data.table_state.sorts.clear();
            clamp_table_cursor(view_data);
            TableEvent::Status(TableStatus::SortCleared)
        }
        TableCommand::TogglePin => TableEvent::Status(toggle_pin(view_data)),
        TableCommand::ToggleFilter => TableEvent::Status(toggle_filter(view_data)),
        TableCommand::ToggleFilterInversion => {
            TableEvent::Status(toggle_filter_inversion(view_data))
        }
        TableCommand::ClearPins => {
            view_data.table_state.pin = None;
            view_data.table_state.filter_active = false;
            view_data.table_state.filter_inverted = false;
            clamp_table_cursor(view_data);
            TableEvent::Status(TableStatus::PinsCleared)
        }
    }
}

fn move_row(view_data: &mut ViewData, delta: isize) {
    let row_count = active_projection(view_data)
        .map(|projection| projection.row_count())
        .unwrap_or(0);
    if row_count == 0 {
        view_data.table_state.selected_row = 0;
        return;
    }
    let current = view_data.table_state.selected_row as isize;
    let next = (current + delta).clamp(0, row_count as isize - 1);
    view_data.table_state.selected_row = next as usize;
}

fn move_col(view_data: &mut ViewData, delta: isize) {
    let column_count = active_projection(view_data)
        .map(|projection| projection.column_count())
        .unwrap_or(0);
    if column_count == 0 {
        view_data.table_state.selected_col = 0;
        return;
    }
    let current = view_data.table_state.selected_col as isize;
    let next = (current + delta).clamp(0, column_count as isize - 1);
    view_data.table_state.selected_col = next as usize;
}

fn cycle_sort(view_data: &mut ViewData) -> TableStatus {
    if view_data.table_state.tab == Some(TabKind::Patients) {
        return TableStatus::SortUnavailable;
    }
    let Some(projection) = active_projection(view_data) else {
        return TableStatus::SortUnavailable;
    };
    if projection.column_count() == 0 {
        return TableStatus::SortUnavailable;
    }

    let column = view_data
        .table_state
        .selected_col
        .min(projection.column_count() - 1);
    let label = projection.columns[column];

    if let Some(index) = view_data
        .table_state
        .sorts
        .iter()
        .position(|sort| sort.column == column)
    {
        match view_data.table_state.sorts[index].direction {
            SortDirection::Asc => {
                view_data.table_state.sorts[index].direction = SortDirection::Desc;
            }
            SortDirection::Desc => {
                view_data.table_state.sorts.remove(index);
            }
        }
    } else {
        view_data.table_state.sorts.push(SortSpec {
            column,
            direction: SortDirection::Asc,
        });
    }

    clamp_table_cursor(view_data);
    match view_data
        .table_state
        .sorts
        .iter()
        .find(|sort| sort.column == column)
        .map(|sort| sort.direction)
    {
        Some(SortDirection::Asc) => TableStatus::SortAsc(label),
        Some(SortDirection::Desc) => TableStatus::SortDesc(label),
        None => TableStatus::SortCleared,
    }
}

fn selected_cell(view_data: &ViewData) -> Option<(usize, TableCell)> {
    let projection = active_projection(view_data)?;
    let row = projection.rows.get(view_data.table_state.selected_row)?;
    let column = view_data
        .table_state
        .selected_col
        .min(projection.column_count().saturating_sub(1));
    row.cells.get(column).map(|cell| (column, cell.clone()))
}

fn toggle_pin(view_data: &mut ViewData) -> TableStatus {
    if view_data.table_state.tab == Some(TabKind::Patients) {
        return TableStatus::PinUnavailable;
    }
    let Some((column, value)) = selected_cell(view_data) else {
        return TableStatus::PinUnavailable;
    };

    if let Some(existing) = &view_data.table_state.pin
        && existing.column == column
        && existing.value == value
    {
        view_data.table_state.pin = None;
        view_data.table_state.filter_active = false;
        view_data.table_state.filter_inverted = false;
        clamp_table_cursor(view_data);
        return TableStatus::PinOff;
    }

    view_data.table_state.pin = Some(PinnedCell {
        column,
        value: value.clone(),
    });
    clamp_table_cursor(view_data);
    TableStatus::PinOn(truncate_label(&value.display(), 14))
}

fn toggle_filter(view_data: &mut ViewData) -> TableStatus {
    if view_data.table_state.pin.is_none() {
        return TableStatus::SetPinFirst;
    }

    view_data.table_state.filter_active = !view_data.table_state.filter_active;
    clamp_table_cursor(view_data);
    if view_data.table_state.filter_active {
        TableStatus::FilterOn
    } else {
        TableStatus::FilterOff
    }
}

fn toggle_filter_inversion(view_data: &mut ViewData) -> TableStatus {
    view_data.table_state.filter_inverted = !view_data.table_state.filter_inverted;
    clamp_table_cursor(view_data);
    if view_data.table_state.filter_inverted {
        TableStatus::FilterInvertedOn
    } else {
        TableStatus::FilterInvertedOff
    }
}

fn clamp_table_cursor(view_data: &mut ViewData) {
    let Some(projection) = active_projection(view_data) else {
        view_data.table_state.selected_col = 0;
        view_data.table_state.selected_row = 0;
        return;
    };

    let original_sort_len = view_data.table_state.sorts.len();
    view_data
        .table_state
        .sorts
        .retain(|sort| sort.column < projection.column_count());
    let projection = if view_data.table_state.sorts.len() != original_sort_len {
        match active_projection(view_data) {
            Some(projection) => projection,
            None => return,
        }
    } else {
        projection
    };

    if let Some(pin) = &view_data.table_state.pin
        && pin.column >= projection.column_count()
    {
        view_data.table_state.pin = None;
        view_data.table_state.filter_active = false;
        view_data.table_state.filter_inverted = false;
    }

    if projection.column_count() == 0 {
        view_data.table_state.selected_col = 0;
    } else {
        view_data.table_state.selected_col = view_data
            .table_state
            .selected_col
            .min(projection.column_count() - 1);
    }

    if projection.row_count() == 0 {
        view_data.table_state.selected_row = 0;
    } else {
        view_data.table_state.selected_row = view_data
            .table_state
            .selected_row
            .min(projection.row_count() - 1);
    }
}

fn active_projection(view_data: &ViewData) -> Option<TableProjection> {
    let snapshot = view_data.active_tab_snapshot.as_ref()?;
    match snapshot {
        TabSnapshot::Patients(records) => Some(patient_projection(
            records,
            &view_data.patients,
        )),
        _ => Some(projection_for_snapshot(snapshot, &view_data.table_state)),
    }
}

/// The patient tab renders the output of the query pipeline: one projection
/// row per record of the current page slice.
fn patient_projection(records: &[Patient], patients: &PatientViewState) -> TableProjection {
    let reference = today();
    let page = paginate(records, &patients.query, reference);
    TableProjection {
        title: "patients",
        columns: vec![
            "sel",
            "id",
            "name",
            "email",
            "phone",
            "tax id",
            "status",
            "financial",
            "age",
            "last visit",
        ],
        rows: page
            .items
            .iter()
            .map(|patient| TableRowProjection {
                cells: vec![
                    TableCell::Text(
                        if patients.selection.contains(patient.id) {
                            SELECTED_MARK.to_owned()
                        } else {
                            String::new()
                        },
                    ),
                    TableCell::Integer(patient.id.get()),
                    TableCell::Text(patient.name.clone()),
                    TableCell::Text(patient.email.clone()),
                    TableCell::Text(patient.phone.clone()),
                    TableCell::Text(patient.tax_id.clone()),
                    TableCell::PatientStatus(patient.status),
                    TableCell::FinancialStatus(patient.financial_status),
                    TableCell::Integer(i64::from(miclinica_app::age_on(
                        patient.birth_date,
                        reference,
                    ))),
                    TableCell::Date(patient.last_visit),
                ],
                deleted: patient.deleted_at.is_some(),
                selected: patients.selection.contains(patient.id),
            })
            .collect(),
    }
}

fn projection_for_snapshot(snapshot: &TabSnapshot, table_state: &TableUiState) -> TableProjection {
    let mut projection = base_projection(snapshot);

    if !table_state.sorts.is_empty() {
        let column_count = projection.column_count();
        projection.rows.sort_by(|left, right| {
            for sort in &table_state.sorts {
                if sort.column >= column_count {
                    continue;
                }
                let left_value = left.cells.get(sort.column);
                let right_value = right.cells.get(sort.column);
                let left_null = left_value.map(TableCell::is_null).unwrap_or(true);
                let right_null = right_value.map(TableCell::is_null).unwrap_or(true);
                if left_null && right_null {
                    continue;
                }
                if left_null {
                    return Ordering::Greater;
                }
                if right_null {
                    return Ordering::Less;
                }
                let order = match (left_value, right_value) {
                    (Some(left), Some(right)) => match sort.direction {
                        SortDirection::Asc => left.cmp_value(right),
                        SortDirection::Desc => left.cmp_value(right).reverse(),
                    },
                    _ => Ordering::Equal,
                };
                if order != Ordering::Equal {
                    return order;
                }
            }

            let left_id = match left.cells.first() {
                Some(TableCell::Integer(id)) => Some(*id),
                _ => None,
            };
            let right_id = match right.cells.first() {
                Some(TableCell::Integer(id)) => Some(*id),
                _ => None,
            };
            left_id.cmp(&right_id)
        });
    }

    if table_state.filter_active
        && let Some(pin) = &table_state.pin
    {
        projection.rows.retain(|row| {
            let pin_match = row
                .cells
                .get(pin.column)
                .map(|value| *value == pin.value)
                .unwrap_or(false);
            if table_state.filter_inverted {
                !pin_match
            } else {
                pin_match
            }
        });
    }

    projection
}

fn base_projection(snapshot: &TabSnapshot) -> TableProjection {
    match snapshot {
        TabSnapshot::Patients(_) => TableProjection {
            // Patients render through patient_projection; this arm only backs
            // movement clamping before the first refresh.
            title: "patients",
            columns: Vec::new(),
            rows: Vec::new(),
        },
        TabSnapshot::Appointments(rows) => TableProjection {
            title: "appointments",
            columns: vec!["id", "patient", "staff", "time", "min", "status", "room"],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Integer(row.patient_id.get()),
                        TableCell::Integer(row.professional_id.get()),
                        TableCell::DateTime(row.scheduled_at),
                        TableCell::Integer(i64::from(row.duration_minutes)),
                        TableCell::AppointmentStatus(row.status),
                        TableCell::Text(row.room.clone()),
                    ],
                    deleted: row.deleted_at.is_some(),
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Billing(rows) => TableProjection {
            title: "billing",
            columns: vec![
                "id", "patient", "description", "amount", "status", "method", "issued", "due",
                "paid",
            ],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Integer(row.patient_id.get()),
                        TableCell::Text(row.description.clone()),
                        TableCell::Money(Some(row.amount_cents)),
                        TableCell::InvoiceStatus(row.status),
                        TableCell::PaymentMethod(row.method),
                        TableCell::Date(Some(row.issued_on)),
                        TableCell::Date(Some(row.due_on)),
                        TableCell::Date(row.paid_on),
                    ],
                    deleted: row.deleted_at.is_some(),
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Inventory(rows) => TableProjection {
            title: "inventory",
            columns: vec![
                "id", "name", "qty", "reorder", "unit cost", "expires", "supplier",
            ],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Text(row.name.clone()),
                        TableCell::Integer(i64::from(row.quantity)),
                        TableCell::Integer(i64::from(row.reorder_level)),
                        TableCell::Money(row.unit_cost_cents),
                        TableCell::Date(row.expires_on),
                        TableCell::Text(row.supplier.clone()),
                    ],
                    deleted: row.deleted_at.is_some(),
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Professionals(rows) => TableProjection {
            title: "staff",
            columns: vec!["id", "name", "specialty", "registration", "email", "phone"],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Text(row.name.clone()),
                        TableCell::Integer(row.specialty_id.get()),
                        TableCell::Text(row.registration.clone()),
                        TableCell::Text(row.email.clone()),
                        TableCell::Text(row.phone.clone()),
                    ],
                    deleted: row.deleted_at.is_some(),
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Messages(rows) => TableProjection {
            title: "messages",
            columns: vec!["id", "patient", "dir", "subject", "sent", "read"],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Integer(row.patient_id.get()),
                        TableCell::Direction(row.direction),
                        TableCell::Text(row.subject.clone()),
                        TableCell::DateTime(row.sent_at),
                        TableCell::Flag(row.read),
                    ],
                    deleted: false,
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Notifications(rows) => TableProjection {
            title: "alerts",
            columns: vec!["id", "kind", "body", "at", "read"],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Integer(row.id.get()),
                        TableCell::Kind(row.kind),
                        TableCell::Text(row.body.clone()),
                        TableCell::DateTime(row.created_at),
                        TableCell::Flag(row.read),
                    ],
                    deleted: false,
                    selected: false,
                })
                .collect(),
        },
        TabSnapshot::Settings(rows) => TableProjection {
            title: "settings",
            columns: vec!["setting", "value"],
            rows: rows
                .iter()
                .map(|row| TableRowProjection {
                    cells: vec![
                        TableCell::Text(row.key.label().to_owned()),
                        TableCell::Text(row.value.display()),
                    ],
                    deleted: false,
                    selected: false,
                })
                .collect(),
        },
    }
}

fn active_tab_filter_marker(view_data: &ViewData) -> Option<&'static str> {
    if view_data.table_state.tab == Some(TabKind::Patients) {
        if view_data.patients.query.has_active_filters() {
            return Some(FILTER_MARK_ACTIVE);
        }
        return None;
    }

    if view_data.table_state.filter_active && view_data.table_state.filter_inverted {
        Some(FILTER_MARK_ACTIVE_INVERTED)
    } else if view_data.table_state.filter_active {
        Some(FILTER_MARK_ACTIVE)
    } else if view_data.table_state.pin.is_some() {
        Some(FILTER_MARK_PREVIEW)
    } else {
        None
    }
}

fn tab_title(tab: TabKind, state: &AppState, view_data: &ViewData) -> String {
    if state.active_tab != tab {
        return format!(" {} ", tab.label());
    }

    if let Some(marker) = active_tab_filter_marker(view_data) {
        format!(" {} {} ", tab.label(), marker)
    } else {
        format!(" {} ", tab.label())
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let titles: Vec<String> = TabKind::ALL
        .iter()
        .map(|tab| tab_title(*tab, state, view_data))
        .collect();
    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title(" miclinica "))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    frame.render_widget(tabs, layout[0]);

    if view_data.dashboard.visible {
        let text = render_dashboard_text(view_data);
        let dashboard = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(" overview "));
        frame.render_widget(dashboard, layout[1]);
    } else if let Some(form) = &view_data.form {
        let text = render_form_text(form);
        let title = format!(" new {} ", form_title(form.kind));
        let widget =
            Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(widget, layout[1]);
    } else if state.active_tab == TabKind::Patients {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(layout[1]);
        render_table(frame, body[0], view_data);
        let footer = Paragraph::new(render_patient_footer(state, view_data))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(footer, body[1]);
    } else {
        render_table(frame, layout[1], view_data);
    }

    let status = state.status_line.clone().unwrap_or_default();
    let status_line = Paragraph::new(status)
        .block(Block::default().borders(Borders::ALL).title(" status "));
    frame.render_widget(status_line, layout[2]);
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: ratatui::layout::Rect,
    view_data: &ViewData,
) {
    let Some(projection) = active_projection(view_data) else {
        let empty = Paragraph::new("loading...")
            .block(Block::default().borders(Borders::ALL).title(" data "));
        frame.render_widget(empty, area);
        return;
    };

    let header = Row::new(
        projection
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let mut label = (*column).to_owned();
                if let Some(sort) = view_data
                    .table_state
                    .sorts
                    .iter()
                    .find(|sort| sort.column == index)
                {
                    label.push_str(match sort.direction {
                        SortDirection::Asc => " ↑",
                        SortDirection::Desc => " ↓",
                    });
                }
                Cell::from(label)
            })
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let selected_row = view_data.table_state.selected_row;
    let selected_col = view_data.table_state.selected_col;
    let rows: Vec<Row> = projection
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let cells: Vec<Cell> = row
                .cells
                .iter()
                .enumerate()
                .map(|(col_index, cell)| {
                    let mut style = Style::default();
                    if row.deleted {
                        style = style.fg(Color::DarkGray);
                    }
                    if row.selected {
                        style = style.fg(Color::Yellow);
                    }
                    if row_index == selected_row && col_index == selected_col {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Cell::from(cell.display()).style(style)
                })
                .collect();
            let row_widget = Row::new(cells);
            if row_index == selected_row {
                row_widget.style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                row_widget
            }
        })
        .collect();

    let widths: Vec<Constraint> = projection
        .columns
        .iter()
        .map(|column| Constraint::Min((column.len() as u16).max(6)))
        .collect();
    let title = format!(" {} ({}) ", projection.title, projection.row_count());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn render_patient_footer(state: &AppState, view_data: &ViewData) -> String {
    let Some(page) = current_patient_page(view_data) else {
        return String::new();
    };
    let query = &view_data.patients.query;

    let mut parts = vec![format!(
        "page {}/{} · {} patients",
        query.page_index, page.total_pages, page.total_count
    )];
    if state.mode == AppMode::Search || !query.search_text.is_empty() {
        parts.push(format!("search: {}", query.search_text));
    }
    if let Some(status) = query.status {
        parts.push(format!("status={}", status.as_str()));
    }
    if let Some(status) = query.financial_status {
        parts.push(format!("financial={}", status.as_str()));
    }
    if query.age.is_some() {
        parts.push(format!("age={}", age_filter_label(query.age)));
    }
    if query.last_visit.is_some() {
        parts.push(format!(
            "visits={}",
            last_visit_filter_label(query.last_visit)
        ));
    }
    if !view_data.patients.selection.is_empty() {
        parts.push(format!("{} selected", view_data.patients.selection.len()));
    }
    parts.join(" · ")
}

fn render_dashboard_text(view_data: &ViewData) -> String {
    let counts = &view_data.counts;
    let snapshot = &view_data.dashboard.snapshot;

    let mut lines = vec![
        format!(
            "{} appointments today · {} overdue invoices · {} low-stock items · {} unread messages",
            counts.appointments_today,
            counts.invoices_overdue,
            counts.inventory_low,
            counts.messages_unread,
        ),
        String::new(),
    ];

    if !snapshot.has_rows() {
        lines.push("nothing scheduled, billed, or running low".to_owned());
        lines.push(String::new());
        lines.push("press D to close".to_owned());
        return lines.join("\n");
    }

    if !snapshot.appointments.is_empty() {
        lines.push(format!("-- {} --", DashboardSection::Today.label()));
        for appointment in &snapshot.appointments {
            lines.push(format!(
                "  {}  {} with {} ({}, room {})",
                format_time_of_day(appointment.scheduled_at),
                appointment.patient_name,
                appointment.professional_name,
                appointment.status.as_str(),
                appointment.room,
            ));
        }
        lines.push(String::new());
    }

    if !snapshot.overdue.is_empty() {
        lines.push(format!("-- {} --", DashboardSection::Overdue.label()));
        for invoice in &snapshot.overdue {
            lines.push(format!(
                "  {}  {} (due {})",
                format_money(invoice.amount_cents),
                invoice.patient_name,
                invoice.due_on,
            ));
        }
        lines.push(String::new());
    }

    if !snapshot.low_stock.is_empty() {
        lines.push(format!("-- {} --", DashboardSection::LowStock.label()));
        for item in &snapshot.low_stock {
            lines.push(format!(
                "  {} ({} left, reorder at {})",
                item.name, item.quantity, item.reorder_level,
            ));
        }
        lines.push(String::new());
    }

    if !snapshot.recent_payments.is_empty() {
        lines.push(format!(
            "-- {} --",
            DashboardSection::RecentPayments.label()
        ));
        for payment in &snapshot.recent_payments {
            lines.push(format!(
                "  {}  {} (paid {})",
                format_money(payment.amount_cents),
                payment.patient_name,
                payment.paid_on,
            ));
        }
        lines.push(String::new());
    }

    lines.push("press D to close".to_owned());
    lines.join("\n")
}

fn render_form_text(form: &FormUiState) -> String {
    let specs = form_field_specs(form.kind);
    let mut lines = Vec::with_capacity(specs.len() + 2);
    for (index, spec) in specs.iter().enumerate() {
        let marker = if index == form.field_index { ">" } else { " " };
        let value = form.values.get(index).map(String::as_str).unwrap_or("");
        if spec.hint.is_empty() {
            lines.push(format!("{marker} {:<16} {value}", spec.label));
        } else {
            lines.push(format!(
                "{marker} {:<16} {value}   ({})",
                spec.label, spec.hint
            ));
        }
    }
    lines.push(String::new());
    lines.push("enter: next field / save on last · esc: cancel".to_owned());
    lines.join("\n")
}

fn form_title(kind: FormKind) -> &'static str {
    match kind {
        FormKind::Patient => "patient",
        FormKind::Professional => "professional",
        FormKind::Appointment => "appointment",
        FormKind::Invoice => "invoice",
        FormKind::InventoryItem => "inventory item",
    }
}

fn format_money(cents: i64) -> String {
    let negative = cents < 0;
    let cents = cents.saturating_abs();
    let dollars = cents / 100;
    let remainder = cents % 100;
    if negative {
        format!("-${dollars}.{remainder:02}")
    } else {
        format!("${dollars}.{remainder:02}")
    }
}

fn format_datetime_cell(value: OffsetDateTime) -> String {
    value
        .format(&format_description!(
            "[year]-[month]-[day] [hour]:[minute]"
        ))
        .unwrap_or_else(|_| value.to_string())
}

fn format_time_of_day(value: OffsetDateTime) -> String {
    value
        .format(&format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| value.to_string())
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    let truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::{
        AGE_BUCKETS, AppRuntime, DashboardSnapshot, FormUiState, LifecycleAction, PatientCommand,
        TabSnapshot, TableCell, TableCommand, TableEvent, TableStatus,
        TableUiState, ViewData, apply_lifecycle_action, apply_table_command, build_payload,
        cycle_age_filter, cycle_financial_filter, cycle_last_visit_filter, cycle_status_filter,
        format_money, handle_patient_command, handle_search_key, patient_command_for_key,
        patient_sort_key_for_column, table_command_for_key, truncate_label,
    };
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use miclinica_app::{
        AgeFilter, AppCommand, AppMode, AppState, DashboardCounts, FinancialStatus, FormKind,
        FormPayload, Invoice, InvoiceId, InvoiceStatus, LastVisitFilter, Patient, PatientId,
        PatientSortKey, PatientStatus, PaymentMethod, SortDirection, TabKind,
    };
    use std::sync::mpsc;
    use time::{Date, Duration, Month, OffsetDateTime};

    fn fixture_instant() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("valid fixture timestamp")
    }

    fn patient(id: i64, name: &str) -> Patient {
        Patient {
            id: PatientId::new(id),
            name: name.to_owned(),
            email: format!("{}@example-mail.com", name.to_lowercase().replace(' ', ".")),
            phone: format!("(555) 010-{id:04}"),
            tax_id: format!("{:03}-55-{:04}", id % 1000, 1000 + id),
            status: PatientStatus::Active,
            financial_status: FinancialStatus::Ok,
            birth_date: Date::from_calendar_date(1980, Month::March, 10)
                .expect("valid birth date"),
            last_visit: None,
            address_line: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            notes: String::new(),
            created_at: fixture_instant(),
            updated_at: fixture_instant(),
            deleted_at: None,
        }
    }

    fn invoice(id: i64, amount_cents: i64, status: InvoiceStatus) -> Invoice {
        let issued = Date::from_calendar_date(2026, Month::March, 1).expect("valid issue date");
        Invoice {
            id: InvoiceId::new(id),
            patient_id: PatientId::new(1),
            description: format!("Invoice {id}"),
            amount_cents,
            status,
            method: PaymentMethod::Card,
            issued_on: issued,
            due_on: issued + Duration::days(30),
            paid_on: None,
            notes: String::new(),
            created_at: fixture_instant(),
            updated_at: fixture_instant(),
            deleted_at: None,
        }
    }

    fn patients_view(records: Vec<Patient>) -> ViewData {
        let mut view_data = ViewData {
            active_tab_snapshot: Some(TabSnapshot::Patients(records)),
            ..ViewData::default()
        };
        view_data.table_state = TableUiState {
            tab: Some(TabKind::Patients),
            ..TableUiState::default()
        };
        view_data
    }

    fn billing_view(records: Vec<Invoice>) -> ViewData {
        let mut view_data = ViewData {
            active_tab_snapshot: Some(TabSnapshot::Billing(records)),
            ..ViewData::default()
        };
        view_data.table_state = TableUiState {
            tab: Some(TabKind::Billing),
            ..TableUiState::default()
        };
        view_data
    }

    struct FakeRuntime {
        patients: Vec<Patient>,
        deleted: Vec<i64>,
        page_size_pref: Option<usize>,
        show_dashboard_pref: Option<bool>,
    }

    impl FakeRuntime {
        fn new(patients: Vec<Patient>) -> Self {
            Self {
                patients,
                deleted: Vec::new(),
                page_size_pref: None,
                show_dashboard_pref: None,
            }
        }
    }

    impl AppRuntime for FakeRuntime {
        fn load_dashboard_counts(&mut self) -> Result<DashboardCounts> {
            Ok(DashboardCounts::default())
        }

        fn load_dashboard_snapshot(&mut self) -> Result<DashboardSnapshot> {
            Ok(DashboardSnapshot::default())
        }

        fn load_tab_snapshot(
            &mut self,
            tab: TabKind,
            include_deleted: bool,
        ) -> Result<Option<TabSnapshot>> {
            match tab {
                TabKind::Patients => {
                    let rows = self
                        .patients
                        .iter()
                        .filter(|patient| include_deleted || patient.deleted_at.is_none())
                        .cloned()
                        .collect();
                    Ok(Some(TabSnapshot::Patients(rows)))
                }
                _ => Ok(None),
            }
        }

        fn submit_form(&mut self, payload: &FormPayload) -> Result<()> {
            payload.validate()
        }

        fn apply_lifecycle(
            &mut self,
            _tab: TabKind,
            row_id: i64,
            action: LifecycleAction,
        ) -> Result<()> {
            if action == LifecycleAction::Delete {
                self.deleted.push(row_id);
                if let Some(patient) = self
                    .patients
                    .iter_mut()
                    .find(|patient| patient.id.get() == row_id)
                {
                    patient.deleted_at = Some(fixture_instant());
                }
            }
            Ok(())
        }

        fn mark_read(&mut self, _tab: TabKind, _row_id: i64) -> Result<()> {
            Ok(())
        }

        fn set_show_dashboard_preference(&mut self, show: bool) -> Result<()> {
            self.show_dashboard_pref = Some(show);
            Ok(())
        }

        fn set_page_size_preference(&mut self, page_size: usize) -> Result<()> {
            self.page_size_pref = Some(page_size);
            Ok(())
        }
    }

    #[test]
    fn patient_projection_shows_current_page_and_selection() {
        let records: Vec<Patient> = (1..=5)
            .map(|id| patient(id, &format!("Patient {id:02}")))
            .collect();
        let mut view_data = patients_view(records);
        view_data.patients.query.page_size = 2;
        view_data.patients.selection.toggle(PatientId::new(1));

        let projection = super::active_projection(&view_data).expect("patient projection");
        assert_eq!(projection.row_count(), 2);
        assert_eq!(projection.columns[0], "sel");
        assert_eq!(
            projection.rows[0].cells[0],
            TableCell::Text(super::SELECTED_MARK.to_owned())
        );
        assert_eq!(projection.rows[1].cells[0], TableCell::Text(String::new()));
        assert!(projection.rows[0].selected);
    }

    #[test]
    fn table_sort_cycles_asc_desc_cleared() {
        let mut view_data = billing_view(vec![
            invoice(1, 30_000, InvoiceStatus::Pending),
            invoice(2, 10_000, InvoiceStatus::Paid),
            invoice(3, 20_000, InvoiceStatus::Overdue),
        ]);
        view_data.table_state.selected_col = 3; // amount

        let event = apply_table_command(&mut view_data, TableCommand::CycleSort);
        assert_eq!(event, TableEvent::Status(TableStatus::SortAsc("amount")));
        let projection = super::active_projection(&view_data).expect("projection");
        assert_eq!(projection.rows[0].cells[3], TableCell::Money(Some(10_000)));

        let event = apply_table_command(&mut view_data, TableCommand::CycleSort);
        assert_eq!(event, TableEvent::Status(TableStatus::SortDesc("amount")));
        let projection = super::active_projection(&view_data).expect("projection");
        assert_eq!(projection.rows[0].cells[3], TableCell::Money(Some(30_000)));

        let event = apply_table_command(&mut view_data, TableCommand::CycleSort);
        assert_eq!(event, TableEvent::Status(TableStatus::SortCleared));
        assert!(view_data.table_state.sorts.is_empty());
    }

    #[test]
    fn pin_filter_retains_matching_rows_and_inverts() {
        let mut view_data = billing_view(vec![
            invoice(1, 30_000, InvoiceStatus::Pending),
            invoice(2, 10_000, InvoiceStatus::Paid),
            invoice(3, 20_000, InvoiceStatus::Pending),
        ]);
        view_data.table_state.selected_col = 4; // status
        view_data.table_state.selected_row = 0;

        let event = apply_table_command(&mut view_data, TableCommand::TogglePin);
        assert!(matches!(event, TableEvent::Status(TableStatus::PinOn(_))));

        apply_table_command(&mut view_data, TableCommand::ToggleFilter);
        let projection = super::active_projection(&view_data).expect("projection");
        assert_eq!(projection.row_count(), 2);
        assert!(projection.rows.iter().all(|row| {
            row.cells[4] == TableCell::InvoiceStatus(InvoiceStatus::Pending)
        }));

        apply_table_command(&mut view_data, TableCommand::ToggleFilterInversion);
        let projection = super::active_projection(&view_data).expect("projection");
        assert_eq!(projection.row_count(), 1);
        assert_eq!(
            projection.rows[0].cells[4],
            TableCell::InvoiceStatus(InvoiceStatus::Paid)
        );

        apply_table_command(&mut view_data, TableCommand::ClearPins);
        let projection = super::active_projection(&view_data).expect("projection");
        assert_eq!(projection.row_count(), 3);
    }

    #[test]
    fn filter_removal_clamps_cursor() {
        let mut view_data = billing_view(vec![
            invoice(1, 30_000, InvoiceStatus::Pending),
            invoice(2, 10_000, InvoiceStatus::Paid),
            invoice(3, 20_000, InvoiceStatus::Pending),
        ]);
        view_data.table_state.selected_row = 2;
        view_data.table_state.selected_col = 4;

        apply_table_command(&mut view_data, TableCommand::TogglePin);
        view_data.table_state.selected_row = 2;
        apply_table_command(&mut view_data, TableCommand::ToggleFilter);
        apply_table_command(&mut view_data, TableCommand::ToggleFilterInversion);

        let projection = super::active_projection(&view_data).expect("projection");
        assert!(view_data.table_state.selected_row < projection.row_count().max(1));
    }

    #[test]
    fn movement_clamps_at_edges() {
        let mut view_data = billing_view(vec![
            invoice(1, 30_000, InvoiceStatus::Pending),
            invoice(2, 10_000, InvoiceStatus::Paid),
        ]);

        apply_table_command(&mut view_data, TableCommand::MoveRow(-5));
        assert_eq!(view_data.table_state.selected_row, 0);

        apply_table_command(&mut view_data, TableCommand::MoveRow(10));
        assert_eq!(view_data.table_state.selected_row, 1);

        apply_table_command(&mut view_data, TableCommand::JumpLastColumn);
        assert_eq!(view_data.table_state.selected_col, 8);

        apply_table_command(&mut view_data, TableCommand::JumpFirstColumn);
        assert_eq!(view_data.table_state.selected_col, 0);
    }

    #[test]
    fn key_maps_cover_table_and_patient_commands() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert_eq!(
            table_command_for_key(key(KeyCode::Char('j'))),
            Some(TableCommand::MoveRow(1))
        );
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('s'))),
            Some(TableCommand::CycleSort)
        );
        assert_eq!(
            table_command_for_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(TableCommand::ClearPins)
        );
        assert_eq!(table_command_for_key(key(KeyCode::Char('Z'))), None);

        assert_eq!(
            patient_command_for_key(key(KeyCode::Char('/'))),
            Some(PatientCommand::EnterSearch)
        );
        assert_eq!(
            patient_command_for_key(key(KeyCode::Char('f'))),
            Some(PatientCommand::CycleStatusFilter)
        );
        assert_eq!(
            patient_command_for_key(key(KeyCode::Char(']'))),
            Some(PatientCommand::NextPage)
        );
        assert_eq!(
            patient_command_for_key(key(KeyCode::Char(' '))),
            Some(PatientCommand::ToggleSelect)
        );
        assert_eq!(patient_command_for_key(key(KeyCode::Char('Q'))), None);
    }

    #[test]
    fn filter_cycles_wrap_back_to_off() {
        let mut status = None;
        for _ in 0..=PatientStatus::ALL.len() {
            status = cycle_status_filter(status);
        }
        assert_eq!(status, None);

        let mut financial = None;
        for _ in 0..=FinancialStatus::ALL.len() {
            financial = cycle_financial_filter(financial);
        }
        assert_eq!(financial, None);

        let mut age = None;
        for _ in 0..=AGE_BUCKETS.len() {
            age = cycle_age_filter(age);
        }
        assert_eq!(age, None);
        assert_eq!(cycle_age_filter(None), Some(AgeFilter::Between { min: 0, max: 17 }));

        let mut visits = None;
        for _ in 0..=super::LAST_VISIT_BUCKETS.len() {
            visits = cycle_last_visit_filter(visits);
        }
        assert_eq!(visits, None);
        assert_eq!(
            cycle_last_visit_filter(Some(LastVisitFilter::WithinMonths(12))),
            Some(LastVisitFilter::Never)
        );
    }

    #[test]
    fn sortable_patient_columns_map_to_keys() {
        assert_eq!(patient_sort_key_for_column(2), Some(PatientSortKey::Name));
        assert_eq!(patient_sort_key_for_column(8), Some(PatientSortKey::Age));
        assert_eq!(
            patient_sort_key_for_column(9),
            Some(PatientSortKey::LastVisit)
        );
        assert_eq!(patient_sort_key_for_column(0), None);
        assert_eq!(patient_sort_key_for_column(4), None);
    }

    #[test]
    fn search_mode_edits_query_and_resets_page() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::EnterSearchMode);
        let mut view_data = patients_view(
            (1..=40)
                .map(|id| patient(id, &format!("Patient {id:02}")))
                .collect(),
        );
        view_data.patients.query.page_index = 3;

        handle_search_key(
            &mut state,
            &mut view_data,
            KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE),
        );
        assert_eq!(view_data.patients.query.search_text, "p");
        assert_eq!(view_data.patients.query.page_index, 1);

        handle_search_key(
            &mut state,
            &mut view_data,
            KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE),
        );
        assert_eq!(view_data.patients.query.search_text, "");

        handle_search_key(
            &mut state,
            &mut view_data,
            KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
        );
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn patient_commands_drive_selection_and_paging() {
        let mut state = AppState {
            active_tab: TabKind::Patients,
            ..AppState::default()
        };
        let (tx, _rx) = mpsc::channel();
        let mut view_data = patients_view(
            (1..=40)
                .map(|id| patient(id, &format!("Patient {id:02}")))
                .collect(),
        );

        handle_patient_command(
            &mut state,
            &mut view_data,
            &tx,
            PatientCommand::ToggleSelect,
        );
        assert_eq!(view_data.patients.selection.len(), 1);

        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::SelectPage);
        assert_eq!(
            view_data.patients.selection.len(),
            view_data.patients.query.page_size
        );

        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::NextPage);
        assert_eq!(view_data.patients.query.page_index, 2);

        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::PrevPage);
        assert_eq!(view_data.patients.query.page_index, 1);

        handle_patient_command(
            &mut state,
            &mut view_data,
            &tx,
            PatientCommand::ClearSelection,
        );
        assert!(view_data.patients.selection.is_empty());
    }

    #[test]
    fn next_page_clamps_at_last_page() {
        let mut state = AppState {
            active_tab: TabKind::Patients,
            ..AppState::default()
        };
        let (tx, _rx) = mpsc::channel();
        let mut view_data = patients_view(
            (1..=20)
                .map(|id| patient(id, &format!("Patient {id:02}")))
                .collect(),
        );

        // 20 records at page size 15 leaves two pages.
        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::NextPage);
        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::NextPage);
        handle_patient_command(&mut state, &mut view_data, &tx, PatientCommand::NextPage);
        assert_eq!(view_data.patients.query.page_index, 2);
    }

    #[test]
    fn bulk_delete_targets_selected_ids_still_in_the_filtered_set() {
        let mut state = AppState {
            active_tab: TabKind::Patients,
            ..AppState::default()
        };
        let (tx, _rx) = mpsc::channel();
        let records: Vec<Patient> = vec![
            patient(1, "Avery Walker"),
            patient(2, "Jordan Hill"),
            patient(3, "Taylor Evans"),
        ];
        let mut runtime = FakeRuntime::new(records.clone());
        let mut view_data = patients_view(records);

        view_data.patients.selection.toggle(PatientId::new(1));
        view_data.patients.selection.toggle(PatientId::new(3));
        // Narrow the filtered set so patient 3 drops out of it.
        view_data
            .patients
            .query
            .dispatch(miclinica_app::QueryCommand::SetSearch("walker".to_owned()));

        apply_lifecycle_action(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            LifecycleAction::Delete,
        );

        assert_eq!(runtime.deleted, vec![1]);
        assert!(view_data.patients.selection.is_empty());
    }

    #[test]
    fn payload_builder_parses_patient_fields() {
        let values = vec![
            "Ana Souza".to_owned(),
            "ana@example-mail.com".to_owned(),
            "(555) 010-2233".to_owned(),
            "120-55-3344".to_owned(),
            "active".to_owned(),
            "overdue".to_owned(),
            "1984-05-02".to_owned(),
            "".to_owned(),
            "".to_owned(),
            "".to_owned(),
            "".to_owned(),
            "".to_owned(),
            "".to_owned(),
        ];

        let payload = build_payload(FormKind::Patient, &values).expect("valid patient payload");
        let FormPayload::Patient(patient) = payload else {
            panic!("expected patient payload");
        };
        assert_eq!(patient.status, PatientStatus::Active);
        assert_eq!(patient.financial_status, FinancialStatus::Overdue);
        assert!(patient.last_visit.is_none());
    }

    #[test]
    fn payload_builder_rejects_unknown_enum_and_bad_date() {
        let mut values = vec![String::new(); 13];
        values[0] = "Ana Souza".to_owned();
        values[6] = "1984-05-02".to_owned();

        values[4] = "archived".to_owned();
        assert!(build_payload(FormKind::Patient, &values).is_err());

        values[4] = String::new();
        values[6] = "05/02/1984".to_owned();
        assert!(build_payload(FormKind::Patient, &values).is_err());
    }

    #[test]
    fn payload_builder_parses_invoice_money() {
        let values = vec![
            "1".to_owned(),
            "Consultation".to_owned(),
            "$1,250.50".to_owned(),
            "pending".to_owned(),
            "card".to_owned(),
            "2026-03-10".to_owned(),
            "2026-04-10".to_owned(),
            "".to_owned(),
            "".to_owned(),
        ];

        let payload = build_payload(FormKind::Invoice, &values).expect("valid invoice payload");
        let FormPayload::Invoice(invoice) = payload else {
            panic!("expected invoice payload");
        };
        assert_eq!(invoice.amount_cents, 125_050);
        assert_eq!(invoice.method, PaymentMethod::Card);
    }

    #[test]
    fn money_and_label_formatting() {
        assert_eq!(format_money(125_050), "$1250.50");
        assert_eq!(format_money(99), "$0.99");
        assert_eq!(format_money(-1_500), "-$15.00");
        assert_eq!(truncate_label("short", 14), "short");
        assert_eq!(truncate_label("a very long pinned value", 8), "a very …");
    }

    #[test]
    fn tab_title_carries_filter_marker() {
        let state = AppState {
            active_tab: TabKind::Patients,
            ..AppState::default()
        };
        let mut view_data = patients_view(vec![patient(1, "Avery Walker")]);

        assert_eq!(
            super::tab_title(TabKind::Patients, &state, &view_data),
            " patients "
        );

        view_data.patients.query.search_text = "av".to_owned();
        assert_eq!(
            super::tab_title(TabKind::Patients, &state, &view_data),
            format!(" patients {} ", super::FILTER_MARK_ACTIVE)
        );
    }

    #[test]
    fn dashboard_snapshot_row_presence() {
        let empty = DashboardSnapshot::default();
        assert!(!empty.has_rows());

        let with_stock = DashboardSnapshot {
            low_stock: vec![super::DashboardStockItem {
                item_id: miclinica_app::InventoryItemId::new(1),
                name: "Nitrile gloves".to_owned(),
                quantity: 2,
                reorder_level: 10,
            }],
            ..DashboardSnapshot::default()
        };
        assert!(with_stock.has_rows());
    }

    #[test]
    fn form_state_tracks_fields() {
        let form = FormUiState::new(FormKind::Invoice);
        assert_eq!(form.values.len(), super::form_field_specs(FormKind::Invoice).len());
        assert_eq!(form.field_index, 0);
    }
}
