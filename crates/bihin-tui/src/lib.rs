// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use bihin_app::{
    ApiRequest, AppCommand, AppEvent, AppState, Category, Equipment, EquipmentFilter, FieldKind,
    FormFieldSpec, FormFields, FormMode, FormState, LoadState, Location, Lookups, Resource,
    ResourceApi, ResourceKind, ResourceView, ViewCommand, ViewEvent, empty_list_message,
    filter_summary, format_price, format_purchase_date, perform,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const NONE_LABEL: &str = "-";

static NO_LOOKUPS: Lookups = Lookups {
    categories: Vec::new(),
    locations: Vec::new(),
};

/// One API request, tagged with the collection it targets.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Categories(ApiRequest<Category>),
    Locations(ApiRequest<Location>),
    Equipment(ApiRequest<Equipment>),
}

impl ApiCall {
    /// Runs the request against an API that serves every collection.
    pub fn perform<A>(self, api: &A) -> ApiOutcome
    where
        A: ResourceApi<Category> + ResourceApi<Location> + ResourceApi<Equipment>,
    {
        match self {
            Self::Categories(request) => ApiOutcome::Categories(perform(api, request)),
            Self::Locations(request) => ApiOutcome::Locations(perform(api, request)),
            Self::Equipment(request) => ApiOutcome::Equipment(perform(api, request)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    Categories(ViewCommand<Category>),
    Locations(ViewCommand<Location>),
    Equipment(ViewCommand<Equipment>),
}

pub trait AppRuntime {
    fn perform(&mut self, call: ApiCall) -> ApiOutcome;

    /// Starts a request and reports its outcome on `tx`. The default runs
    /// inline; runtimes backed by a real network override it.
    fn spawn(&mut self, mount: u64, call: ApiCall, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.perform(call);
        tx.send(InternalEvent::Api { mount, outcome })
            .map_err(|_| anyhow!("api event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Api { mount: u64, outcome: ApiOutcome },
}

/// Table, form, and detail rendering for one record type.
trait ScreenResource: Resource<Form: FormFields> {
    fn wrap(request: ApiRequest<Self>) -> ApiCall;
    fn columns() -> &'static [&'static str];
    fn cells(&self, lookups: &Lookups) -> Vec<String>;
    fn detail_lines(&self, lookups: &Lookups) -> Vec<String>;

    fn cycle_choice(
        _form: &mut Self::Form,
        _index: usize,
        _delta: isize,
        _lookups: &Lookups,
    ) -> Result<String> {
        bail!("no choices for this field")
    }
}

fn named_detail_lines(id: Option<String>, name: &str, description: Option<&str>) -> Vec<String> {
    vec![
        format!("id: {}", id.unwrap_or_else(|| NONE_LABEL.to_owned())),
        format!("name: {name}"),
        format!("description: {}", description.unwrap_or(NONE_LABEL)),
    ]
}

impl ScreenResource for Category {
    fn wrap(request: ApiRequest<Self>) -> ApiCall {
        ApiCall::Categories(request)
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "description"]
    }

    fn cells(&self, _lookups: &Lookups) -> Vec<String> {
        vec![
            display_id(self.id),
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
        ]
    }

    fn detail_lines(&self, _lookups: &Lookups) -> Vec<String> {
        named_detail_lines(
            self.id.map(|id| id.to_string()),
            &self.name,
            self.description.as_deref(),
        )
    }
}

impl ScreenResource for Location {
    fn wrap(request: ApiRequest<Self>) -> ApiCall {
        ApiCall::Locations(request)
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "description"]
    }

    fn cells(&self, _lookups: &Lookups) -> Vec<String> {
        vec![
            display_id(self.id),
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
        ]
    }

    fn detail_lines(&self, _lookups: &Lookups) -> Vec<String> {
        named_detail_lines(
            self.id.map(|id| id.to_string()),
            &self.name,
            self.description.as_deref(),
        )
    }
}

impl ScreenResource for Equipment {
    fn wrap(request: ApiRequest<Self>) -> ApiCall {
        ApiCall::Equipment(request)
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id", "name", "serial", "category", "location", "purchased", "price", "status",
        ]
    }

    fn cells(&self, lookups: &Lookups) -> Vec<String> {
        vec![
            display_id(self.id),
            self.name.clone(),
            self.serial_number.clone().unwrap_or_default(),
            lookups.category_label(self).to_owned(),
            lookups.location_label(self).to_owned(),
            self.purchase_date
                .map(format_purchase_date)
                .unwrap_or_default(),
            self.purchase_price_cents
                .map(format_price)
                .unwrap_or_default(),
            self.status.label().to_owned(),
        ]
    }

    fn detail_lines(&self, lookups: &Lookups) -> Vec<String> {
        let or_none = |value: Option<String>| value.unwrap_or_else(|| NONE_LABEL.to_owned());
        vec![
            format!("id: {}", or_none(self.id.map(|id| id.to_string()))),
            format!("name: {}", self.name),
            format!("serial number: {}", or_none(self.serial_number.clone())),
            format!("category: {}", lookups.category_label(self)),
            format!("location: {}", lookups.location_label(self)),
            format!(
                "purchase date: {}",
                or_none(self.purchase_date.map(format_purchase_date))
            ),
            format!(
                "purchase price: {}",
                or_none(self.purchase_price_cents.map(format_price))
            ),
            format!("status: {}", self.status.label()),
            format!("description: {}", or_none(self.description.clone())),
        ]
    }

    fn cycle_choice(
        form: &mut Self::Form,
        index: usize,
        delta: isize,
        lookups: &Lookups,
    ) -> Result<String> {
        form.cycle_choice(index, delta, &lookups.categories, &lookups.locations)
    }
}

fn display_id<Id: std::fmt::Display>(id: Option<Id>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
struct ResourceScreen<R: Resource> {
    view: ResourceView<R>,
    cursor: usize,
    field: usize,
    detail_visible: bool,
}

impl<R: ScreenResource> ResourceScreen<R> {
    fn mount() -> (Self, ApiCall) {
        let (view, request) = ResourceView::mount();
        let screen = Self {
            view,
            cursor: 0,
            field: 0,
            detail_visible: false,
        };
        (screen, R::wrap(request))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct EquipmentScreen {
    inner: ResourceScreen<Equipment>,
    lookups: Lookups,
    categories_loaded: bool,
    locations_loaded: bool,
    filter: EquipmentFilter,
    search_focused: bool,
}

impl EquipmentScreen {
    fn mount() -> (Self, Vec<ApiCall>) {
        let (inner, equipment) = ResourceScreen::mount();
        let screen = Self {
            inner,
            lookups: Lookups::default(),
            categories_loaded: false,
            locations_loaded: false,
            filter: EquipmentFilter::default(),
            search_focused: false,
        };
        let calls = vec![
            equipment,
            ApiCall::Categories(ApiRequest::LoadAll),
            ApiCall::Locations(ApiRequest::LoadAll),
        ];
        (screen, calls)
    }

    fn is_loading(&self) -> bool {
        self.inner.view.load_state() == LoadState::Loading
            || (self.inner.view.load_state() == LoadState::Ready
                && !(self.categories_loaded && self.locations_loaded))
    }

    fn visible(&self) -> Vec<&Equipment> {
        self.filter.apply(self.inner.view.items())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ActiveScreen {
    Equipment(Box<EquipmentScreen>),
    Categories(ResourceScreen<Category>),
    Locations(ResourceScreen<Location>),
}

impl ActiveScreen {
    fn mount(kind: ResourceKind) -> (Self, Vec<ApiCall>) {
        match kind {
            ResourceKind::Equipment => {
                let (screen, calls) = EquipmentScreen::mount();
                (Self::Equipment(Box::new(screen)), calls)
            }
            ResourceKind::Category => {
                let (screen, call) = ResourceScreen::mount();
                (Self::Categories(screen), vec![call])
            }
            ResourceKind::Location => {
                let (screen, call) = ResourceScreen::mount();
                (Self::Locations(screen), vec![call])
            }
        }
    }

    fn kind(&self) -> ResourceKind {
        match self {
            Self::Equipment(_) => ResourceKind::Equipment,
            Self::Categories(_) => ResourceKind::Category,
            Self::Locations(_) => ResourceKind::Location,
        }
    }

    fn clamp_cursor(&mut self) {
        fn clamp(cursor: &mut usize, rows: usize) {
            *cursor = (*cursor).min(rows.saturating_sub(1));
        }
        match self {
            Self::Equipment(screen) => {
                let rows = screen.visible().len();
                clamp(&mut screen.inner.cursor, rows);
            }
            Self::Categories(screen) => clamp(&mut screen.cursor, screen.view.items().len()),
            Self::Locations(screen) => clamp(&mut screen.cursor, screen.view.items().len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    screen: ActiveScreen,
    mount: u64,
    alert: Option<String>,
    help_visible: bool,
    status_token: u64,
}

impl Default for ViewData {
    fn default() -> Self {
        let (screen, _) = ActiveScreen::mount(ResourceKind::Equipment);
        Self {
            screen,
            mount: 0,
            alert: None,
            help_visible: false,
            status_token: 0,
        }
    }
}

/// What a handled key or completed request asks the shell to do next.
#[derive(Debug, Default, Clone, PartialEq)]
struct Reaction {
    calls: Vec<ApiCall>,
    alert: Option<String>,
    status: Option<String>,
}

impl Reaction {
    fn status(message: impl Into<String>) -> Self {
        Self {
            status: Some(message.into()),
            ..Self::default()
        }
    }
}

pub fn run_app<T: AppRuntime>(state: &mut AppState, runtime: &mut T) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    mount_active_tab(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    tracing::info!("terminal restored");
    result
}

fn mount_active_tab<T: AppRuntime>(
    state: &mut AppState,
    runtime: &mut T,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    view_data.mount = view_data.mount.wrapping_add(1);
    let (screen, calls) = ActiveScreen::mount(state.active_tab);
    view_data.screen = screen;
    tracing::info!(
        tab = state.active_tab.label(),
        mount = view_data.mount,
        "mounted view"
    );
    apply_reaction(
        state,
        runtime,
        view_data,
        tx,
        Reaction {
            calls,
            ..Reaction::default()
        },
    );
}

fn switch_tab<T: AppRuntime>(
    state: &mut AppState,
    runtime: &mut T,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let changed = state
        .dispatch(command)
        .iter()
        .any(|event| matches!(event, AppEvent::TabChanged(_)));
    if changed {
        mount_active_tab(state, runtime, view_data, tx);
    }
}

fn process_internal_events<T: AppRuntime>(
    state: &mut AppState,
    runtime: &mut T,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Api { mount, outcome } if mount == view_data.mount => {
                let reaction = apply_outcome(&mut view_data.screen, outcome);
                view_data.screen.clamp_cursor();
                apply_reaction(state, runtime, view_data, tx, reaction);
            }
            InternalEvent::Api { mount, .. } => {
                tracing::debug!(mount, current = view_data.mount, "dropping stale response");
            }
        }
    }
}

fn apply_outcome(screen: &mut ActiveScreen, outcome: ApiOutcome) -> Reaction {
    match (screen, outcome) {
        (ActiveScreen::Categories(screen), ApiOutcome::Categories(command)) => {
            complete(screen, command)
        }
        (ActiveScreen::Locations(screen), ApiOutcome::Locations(command)) => {
            complete(screen, command)
        }
        (ActiveScreen::Equipment(screen), ApiOutcome::Equipment(command)) => {
            complete(&mut screen.inner, command)
        }
        (ActiveScreen::Equipment(screen), ApiOutcome::Categories(command)) => {
            let failed = load_lookup(
                command,
                &mut screen.lookups.categories,
                &mut screen.categories_loaded,
            );
            fail_equipment_load(screen, failed)
        }
        (ActiveScreen::Equipment(screen), ApiOutcome::Locations(command)) => {
            let failed = load_lookup(
                command,
                &mut screen.lookups.locations,
                &mut screen.locations_loaded,
            );
            fail_equipment_load(screen, failed)
        }
        (screen, outcome) => {
            tracing::debug!(tab = screen.kind().label(), ?outcome, "response for another view");
            Reaction::default()
        }
    }
}

fn load_lookup<R: Resource>(
    command: ViewCommand<R>,
    slot: &mut Vec<R>,
    loaded: &mut bool,
) -> Option<&'static str> {
    match command {
        ViewCommand::Loaded(items) => {
            *slot = items;
            *loaded = true;
            None
        }
        ViewCommand::LoadFailed(message) => Some(message),
        _ => None,
    }
}

fn fail_equipment_load(screen: &mut EquipmentScreen, failed: Option<&'static str>) -> Reaction {
    let Some(message) = failed else {
        return Reaction::default();
    };
    let events = screen.inner.view.dispatch(ViewCommand::LoadFailed(message));
    react(&mut screen.inner, events)
}

fn complete<R: ScreenResource>(
    screen: &mut ResourceScreen<R>,
    command: ViewCommand<R>,
) -> Reaction {
    let success = completion_status(&command);
    let events = screen.view.dispatch(command);
    let changed = events.contains(&ViewEvent::CacheChanged);
    let mut reaction = react(screen, events);
    if changed && success.is_some() {
        reaction.status = success;
    }
    reaction
}

fn completion_status<R: ScreenResource>(command: &ViewCommand<R>) -> Option<String> {
    let singular = R::KIND.singular();
    match command {
        ViewCommand::Created(_, record) => Some(format!("created {singular} {}", record.name())),
        ViewCommand::Updated(_, _, record) => {
            Some(format!("saved {singular} {}", record.name()))
        }
        ViewCommand::Deleted(id) => Some(format!("deleted {singular} {id}")),
        _ => None,
    }
}

fn react<R: ScreenResource>(screen: &mut ResourceScreen<R>, events: Vec<ViewEvent<R>>) -> Reaction {
    let singular = R::KIND.singular();
    let mut reaction = Reaction::default();
    for event in events {
        match event {
            ViewEvent::Request(request) => {
                reaction.status = match &request {
                    ApiRequest::LoadAll => None,
                    ApiRequest::Create(..) | ApiRequest::Update(..) => {
                        Some("submitting…".to_owned())
                    }
                    ApiRequest::Delete(_) => Some("deleting…".to_owned()),
                };
                reaction.calls.push(R::wrap(request));
            }
            ViewEvent::Alert(message) => reaction.alert = Some(message),
            ViewEvent::FormOpened(mode) => {
                screen.field = 0;
                screen.detail_visible = false;
                reaction.status = Some(match mode {
                    FormMode::Create => format!("new {singular}"),
                    FormMode::Edit(id) => format!("edit {singular} {id}"),
                });
            }
            ViewEvent::Ignored(reason) => {
                reaction.status.get_or_insert_with(|| reason.to_owned());
            }
            ViewEvent::LoadFailed(_)
            | ViewEvent::CacheChanged
            | ViewEvent::FormClosed
            | ViewEvent::DeletePending(_)
            | ViewEvent::DeleteCleared => {}
        }
    }
    reaction
}

fn apply_reaction<T: AppRuntime>(
    state: &mut AppState,
    runtime: &mut T,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    reaction: Reaction,
) {
    for call in reaction.calls {
        if let Err(error) = runtime.spawn(view_data.mount, call, tx.clone()) {
            tracing::error!(error = %format!("{error:#}"), "start api request");
            emit_status(state, view_data, tx, "request could not be started");
        }
    }
    if let Some(alert) = reaction.alert {
        view_data.alert = Some(alert);
    }
    if let Some(status) = reaction.status {
        emit_status(state, view_data, tx, status);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
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

fn handle_key_event<T: AppRuntime>(
    state: &mut AppState,
    runtime: &mut T,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            view_data.alert = None;
        }
        return false;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    let reaction = match &mut view_data.screen {
        ActiveScreen::Equipment(screen) => handle_equipment_key(screen, key),
        ActiveScreen::Categories(screen) => {
            let (selected, rows) = selection(screen, screen.view.items());
            handle_resource_key(screen, &NO_LOOKUPS, selected, rows, key)
        }
        ActiveScreen::Locations(screen) => {
            let (selected, rows) = selection(screen, screen.view.items());
            handle_resource_key(screen, &NO_LOOKUPS, selected, rows, key)
        }
    };
    if let Some(reaction) = reaction {
        view_data.screen.clamp_cursor();
        apply_reaction(state, runtime, view_data, internal_tx, reaction);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => return true,
        (KeyCode::Tab, _) | (KeyCode::Char('f'), KeyModifiers::NONE) => {
            switch_tab(state, runtime, view_data, internal_tx, AppCommand::NextTab);
        }
        (KeyCode::BackTab, _) | (KeyCode::Char('b'), KeyModifiers::NONE) => {
            switch_tab(state, runtime, view_data, internal_tx, AppCommand::PrevTab);
        }
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn selection<R: Resource>(screen: &ResourceScreen<R>, rows: &[R]) -> (Option<R::Id>, usize) {
    let selected = rows.get(screen.cursor).and_then(|record| record.id());
    (selected, rows.len())
}

fn handle_equipment_key(screen: &mut EquipmentScreen, key: KeyEvent) -> Option<Reaction> {
    if screen.search_focused {
        return Some(handle_search_key(screen, key));
    }
    if screen.is_loading() {
        return None;
    }

    let overlay_open = screen.inner.detail_visible || screen.inner.view.form().is_some();
    if !overlay_open && screen.inner.view.load_state() == LoadState::Ready {
        match (key.code, key.modifiers) {
            (KeyCode::Char('s'), KeyModifiers::NONE) => return Some(cycle_status_filter(screen, 1)),
            (KeyCode::Char('S'), _) => return Some(cycle_status_filter(screen, -1)),
            (KeyCode::Char('/'), KeyModifiers::NONE) => {
                screen.search_focused = true;
                return Some(Reaction::status("search"));
            }
            (KeyCode::Char('x'), KeyModifiers::NONE) => return Some(clear_search(screen)),
            (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(clear_search(screen));
            }
            _ => {}
        }
    }

    let (selected, rows) = {
        let visible = screen.visible();
        let selected = visible.get(screen.inner.cursor).and_then(|item| item.id);
        (selected, visible.len())
    };
    handle_resource_key(&mut screen.inner, &screen.lookups, selected, rows, key)
}

fn cycle_status_filter(screen: &mut EquipmentScreen, delta: isize) -> Reaction {
    screen.filter.status = screen.filter.status.cycle(delta);
    screen.inner.cursor = 0;
    Reaction::status(format!("status filter: {}", screen.filter.status.label()))
}

fn clear_search(screen: &mut EquipmentScreen) -> Reaction {
    screen.filter.term.clear();
    screen.inner.cursor = 0;
    Reaction::status("search cleared")
}

fn handle_search_key(screen: &mut EquipmentScreen, key: KeyEvent) -> Reaction {
    match (key.code, key.modifiers) {
        (KeyCode::Enter | KeyCode::Esc, _) => {
            screen.search_focused = false;
            return Reaction::default();
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            screen.filter.term.clear();
        }
        (KeyCode::Backspace, _) => {
            screen.filter.term.pop();
        }
        (KeyCode::Char(ch), modifiers) if is_text_input(modifiers) => {
            screen.filter.term.push(ch);
        }
        _ => return Reaction::default(),
    }
    screen.inner.cursor = 0;
    Reaction::default()
}

fn is_text_input(modifiers: KeyModifiers) -> bool {
    !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn handle_resource_key<R: ScreenResource>(
    screen: &mut ResourceScreen<R>,
    lookups: &Lookups,
    selected: Option<R::Id>,
    rows: usize,
    key: KeyEvent,
) -> Option<Reaction> {
    if screen.detail_visible {
        screen.detail_visible = false;
        return Some(Reaction::default());
    }
    if screen.view.form().is_some() {
        return Some(handle_form_key(screen, lookups, key));
    }
    if screen.view.pending_delete().is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                return Some(dispatch(screen, ViewCommand::ConfirmDelete));
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                return Some(dispatch(screen, ViewCommand::CancelDelete));
            }
            _ => {}
        }
    }
    handle_nav_key(screen, selected, rows, key)
}

fn dispatch<R: ScreenResource>(
    screen: &mut ResourceScreen<R>,
    command: ViewCommand<R>,
) -> Reaction {
    let events = screen.view.dispatch(command);
    react(screen, events)
}

fn handle_nav_key<R: ScreenResource>(
    screen: &mut ResourceScreen<R>,
    selected: Option<R::Id>,
    rows: usize,
    key: KeyEvent,
) -> Option<Reaction> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    let last = rows.saturating_sub(1);
    let reaction = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            screen.cursor = (screen.cursor + 1).min(last);
            Reaction::default()
        }
        KeyCode::Char('k') | KeyCode::Up => {
            screen.cursor = screen.cursor.saturating_sub(1);
            Reaction::default()
        }
        KeyCode::Char('g') | KeyCode::Home => {
            screen.cursor = 0;
            Reaction::default()
        }
        KeyCode::Char('G') | KeyCode::End => {
            screen.cursor = last;
            Reaction::default()
        }
        KeyCode::Char('n') => dispatch(screen, ViewCommand::OpenCreate),
        KeyCode::Char('e') => match selected {
            Some(id) => dispatch(screen, ViewCommand::OpenEdit(id)),
            None => Reaction::status("nothing selected"),
        },
        KeyCode::Char('d') => match selected {
            Some(id) => dispatch(screen, ViewCommand::RequestDelete(id)),
            None => Reaction::status("nothing selected"),
        },
        KeyCode::Enter => {
            if selected.is_some() {
                screen.detail_visible = true;
                Reaction::default()
            } else {
                Reaction::status("nothing selected")
            }
        }
        _ => return None,
    };
    Some(reaction)
}

fn handle_form_key<R: ScreenResource>(
    screen: &mut ResourceScreen<R>,
    lookups: &Lookups,
    key: KeyEvent,
) -> Reaction {
    let specs = R::Form::field_specs();
    let field_count = specs.len().max(1);
    let Some(form) = screen.view.form() else {
        return Reaction::default();
    };
    let mut draft = form.draft.clone();
    let field = screen.field.min(field_count - 1);
    let kind = specs.get(field).map(|spec| spec.kind).unwrap_or(FieldKind::Text);

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => dispatch(screen, ViewCommand::CloseForm),
        (KeyCode::Enter, _) => dispatch(screen, ViewCommand::Submit),
        (KeyCode::Tab | KeyCode::Down, _) => {
            screen.field = (field + 1) % field_count;
            Reaction::status(field_status(specs, screen.field))
        }
        (KeyCode::BackTab | KeyCode::Up, _) => {
            screen.field = (field + field_count - 1) % field_count;
            Reaction::status(field_status(specs, screen.field))
        }
        (KeyCode::Left | KeyCode::Right, _) if kind == FieldKind::Choice => {
            let delta = if key.code == KeyCode::Left { -1 } else { 1 };
            match R::cycle_choice(&mut draft, field, delta, lookups) {
                Ok(status) => {
                    let mut reaction = dispatch(screen, ViewCommand::UpdateDraft(draft));
                    reaction.status.get_or_insert(status);
                    reaction
                }
                Err(error) => Reaction::status(error.to_string()),
            }
        }
        (KeyCode::Backspace, _) if kind == FieldKind::Text => {
            let mut value = draft.field_text(field);
            value.pop();
            draft.set_field_text(field, value);
            dispatch(screen, ViewCommand::UpdateDraft(draft))
        }
        (KeyCode::Char(ch), modifiers) if is_text_input(modifiers) => {
            if kind == FieldKind::Choice {
                return Reaction::status("use left/right to choose");
            }
            let mut value = draft.field_text(field);
            value.push(ch);
            draft.set_field_text(field, value);
            dispatch(screen, ViewCommand::UpdateDraft(draft))
        }
        _ => Reaction::default(),
    }
}

fn field_status(specs: &[FormFieldSpec], index: usize) -> String {
    match specs.get(index) {
        Some(spec) if spec.kind == FieldKind::Choice => {
            format!("field {}: left/right to choose", spec.label)
        }
        Some(spec) => format!("field {}", spec.label),
        None => String::new(),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = ResourceKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = ResourceKind::ALL
        .iter()
        .map(|tab| format!(" {} ", tab.label()))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("bihin").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match &view_data.screen {
        ActiveScreen::Equipment(screen) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1)])
                .split(layout[1]);
            let filter_bar = Paragraph::new(filter_bar_text(screen)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("filter")
                    .border_style(if screen.search_focused {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    }),
            );
            frame.render_widget(filter_bar, parts[0]);

            let visible = screen.visible();
            let empty = empty_list_message(screen.inner.view.items().len());
            render_resource_table(
                frame,
                parts[1],
                &screen.inner,
                &visible,
                &screen.lookups,
                screen.is_loading(),
                empty,
            );
            render_overlays(frame, &screen.inner, &visible, &screen.lookups);
        }
        ActiveScreen::Categories(screen) => {
            let rows = screen.view.items().iter().collect::<Vec<_>>();
            let loading = screen.view.load_state() == LoadState::Loading;
            render_resource_table(
                frame,
                layout[1],
                screen,
                &rows,
                &NO_LOOKUPS,
                loading,
                "no categories registered",
            );
            render_overlays(frame, screen, &rows, &NO_LOOKUPS);
        }
        ActiveScreen::Locations(screen) => {
            let rows = screen.view.items().iter().collect::<Vec<_>>();
            let loading = screen.view.load_state() == LoadState::Loading;
            render_resource_table(
                frame,
                layout[1],
                screen,
                &rows,
                &NO_LOOKUPS,
                loading,
                "no locations registered",
            );
            render_overlays(frame, screen, &rows, &NO_LOOKUPS);
        }
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(alert) = &view_data.alert {
        let area = centered_rect(50, 24, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(format!("{alert}\n\nenter/esc dismiss"))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("alert")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(widget, area);
    }

    if view_data.help_visible {
        let area = centered_rect(72, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_resource_table<R: ScreenResource>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    screen: &ResourceScreen<R>,
    rows: &[&R],
    lookups: &Lookups,
    loading: bool,
    empty_message: &str,
) {
    let block = Block::default().borders(Borders::ALL);

    if let LoadState::Failed(message) = screen.view.load_state() {
        let widget = Paragraph::new(message)
            .style(Style::default().fg(Color::Red))
            .block(block.title(R::KIND.label()));
        frame.render_widget(widget, area);
        return;
    }
    if loading {
        let widget = Paragraph::new(format!("loading {}…", R::KIND.label()))
            .block(block.title(R::KIND.label()));
        frame.render_widget(widget, area);
        return;
    }
    if rows.is_empty() {
        let widget = Paragraph::new(empty_message).block(block.title(R::KIND.label()));
        frame.render_widget(widget, area);
        return;
    }

    let header = Row::new(R::columns().iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let pending = screen.view.pending_delete().map(|pending| pending.target);
    let table_rows = rows.iter().enumerate().map(|(index, record)| {
        let mut style = Style::default();
        if pending.is_some() && record.id() == pending {
            style = style.fg(Color::Red).add_modifier(Modifier::CROSSED_OUT);
        }
        if index == screen.cursor {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
        }
        Row::new(record.cells(lookups).into_iter().map(Cell::from)).style(style)
    });
    let widths = R::columns()
        .iter()
        .map(|label| {
            if *label == "id" {
                Constraint::Length(5)
            } else {
                Constraint::Min(8)
            }
        })
        .collect::<Vec<_>>();

    let table = Table::new(table_rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block.title(format!("{} ({})", R::KIND.label(), rows.len())));
    let mut table_state = TableState::default().with_selected(Some(screen.cursor));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_overlays<R: ScreenResource>(
    frame: &mut ratatui::Frame<'_>,
    screen: &ResourceScreen<R>,
    rows: &[&R],
    lookups: &Lookups,
) {
    if let Some(form) = screen.view.form() {
        let area = centered_rect(64, 64, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_form_text(form, screen.field)).block(
            Block::default()
                .title(form_title(form))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(widget, area);
        return;
    }

    if screen.detail_visible
        && let Some(record) = rows.get(screen.cursor)
    {
        let area = centered_rect(60, 56, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(record.detail_lines(lookups).join("\n"))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(R::KIND.singular())
                    .borders(Borders::ALL),
            );
        frame.render_widget(widget, area);
    }
}

fn form_title<R: ScreenResource>(form: &FormState<R>) -> String {
    match form.mode {
        FormMode::Create => format!("new {}", R::KIND.singular()),
        FormMode::Edit(id) => format!("edit {} {id}", R::KIND.singular()),
    }
}

fn render_form_text<R: ScreenResource>(form: &FormState<R>, field: usize) -> String {
    let mut lines = R::Form::field_specs()
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let marker = if index == field { "▸" } else { " " };
            let required = if spec.required { "*" } else { "" };
            let value = form.draft.field_text(index);
            let hint = if spec.kind == FieldKind::Choice {
                " ◂▸"
            } else {
                ""
            };
            format!("{marker} {}{required}: {value}{hint}", spec.label)
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    if form.is_submitting() {
        lines.push("submitting…".to_owned());
    } else {
        lines.push("enter submit | esc cancel | tab/shift+tab field".to_owned());
    }
    lines.join("\n")
}

fn filter_bar_text(screen: &EquipmentScreen) -> String {
    let cursor = if screen.search_focused { "▏" } else { "" };
    let shown = screen.visible().len();
    let total = screen.inner.view.items().len();
    format!(
        "status: {} | search: {}{cursor} | {}",
        screen.filter.status.label(),
        screen.filter.term,
        filter_summary(shown, total)
    )
}

fn delete_prompt<R: ScreenResource>(screen: &ResourceScreen<R>) -> Option<String> {
    let pending = screen.view.pending_delete()?;
    let singular = R::KIND.singular();
    let name = screen
        .view
        .find(pending.target)
        .map(|record| record.name().to_owned())
        .unwrap_or_else(|| pending.target.to_string());
    Some(if pending.in_flight {
        format!("deleting {singular} {name}…")
    } else {
        format!("delete {singular} {name}? y confirm | n cancel")
    })
}

fn screen_status<R: ScreenResource>(screen: &ResourceScreen<R>) -> (&'static str, Option<String>) {
    if screen.view.form().is_some() {
        return ("FORM", None);
    }
    if let Some(prompt) = delete_prompt(screen) {
        return ("DELETE", Some(prompt));
    }
    ("NAV", None)
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if status_hidden_by_overlay(view_data) {
        return String::new();
    }

    let (mode, prompt, hints) = match &view_data.screen {
        ActiveScreen::Equipment(screen) if screen.search_focused => (
            "SEARCH",
            None,
            "type to filter | backspace | ctrl+u clear | enter/esc done",
        ),
        ActiveScreen::Equipment(screen) => {
            let (mode, prompt) = screen_status(&screen.inner);
            (mode, prompt, nav_hints(mode, true))
        }
        ActiveScreen::Categories(screen) => {
            let (mode, prompt) = screen_status(screen);
            (mode, prompt, nav_hints(mode, false))
        }
        ActiveScreen::Locations(screen) => {
            let (mode, prompt) = screen_status(screen);
            (mode, prompt, nav_hints(mode, false))
        }
    };

    let mut parts = vec![mode.to_owned()];
    parts.extend(prompt);
    parts.extend(state.status_line.clone());
    parts.push(hints.to_owned());
    parts.join(" | ")
}

fn nav_hints(mode: &str, equipment: bool) -> &'static str {
    match (mode, equipment) {
        ("FORM", _) => "tab/shift+tab field | left/right choose | enter submit | esc cancel",
        (_, true) => concat!(
            "j/k g/G | n new | e edit | d del | enter detail | s/S status | / search | x clear",
            " | tab/f/b tabs | ? help | ctrl+q"
        ),
        (_, false) => {
            "j/k g/G | n new | e edit | d del | enter detail | tab/f/b tabs | ? help | ctrl+q"
        }
    }
}

fn status_hidden_by_overlay(view_data: &ViewData) -> bool {
    let detail_visible = match &view_data.screen {
        ActiveScreen::Equipment(screen) => screen.inner.detail_visible,
        ActiveScreen::Categories(screen) => screen.detail_visible,
        ActiveScreen::Locations(screen) => screen.detail_visible,
    };
    view_data.help_visible || view_data.alert.is_some() || detail_visible
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | q quit (nav) | tab/shift+tab or f/b switch tab | ? help\n\
nav: j/k or up/down move | g/G first/last | n new | e edit | d delete | enter detail\n\
equipment: s/S cycle status filter | / search | x or ctrl+u clear search\n\
search: type to filter | backspace | enter/esc done\n\
form: tab/down next field | shift+tab/up previous | left/right choose | enter submit | esc cancel\n\
delete: y/enter confirm | n/esc cancel\n\
alert: enter/esc dismiss | detail: any key close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        ActiveScreen, ApiCall, ApiOutcome, AppRuntime, EquipmentScreen, InternalEvent,
        ViewData, filter_bar_text, handle_key_event, help_overlay_text, mount_active_tab,
        process_internal_events, render, render_form_text, status_text,
    };
    use bihin_app::{
        ApiRequest, AppState, CategoryId, EquipmentStatus, LoadState, Operation, ResourceKind,
        StatusFilter, perform,
    };
    use bihin_testkit::FakeBackend;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        backend: FakeBackend,
        calls: Vec<ApiCall>,
    }

    impl TestRuntime {
        fn seeded() -> Self {
            Self {
                backend: FakeBackend::seeded(),
                calls: Vec::new(),
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn perform(&mut self, call: ApiCall) -> ApiOutcome {
            self.calls.push(call.clone());
            match call {
                ApiCall::Categories(request) => {
                    ApiOutcome::Categories(perform(&self.backend.categories, request))
                }
                ApiCall::Locations(request) => {
                    ApiOutcome::Locations(perform(&self.backend.locations, request))
                }
                ApiCall::Equipment(request) => {
                    ApiOutcome::Equipment(perform(&self.backend.equipment, request))
                }
            }
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn mounted(tab: ResourceKind, runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::with_start_tab(tab),
                runtime,
                view_data: ViewData::default(),
                tx,
                rx,
            };
            mount_active_tab(
                &mut harness.state,
                &mut harness.runtime,
                &mut harness.view_data,
                &harness.tx,
            );
            harness.pump();
            harness
        }

        fn pump(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            self.pump();
            quit
        }

        fn press_without_pump(&mut self, key: KeyEvent) {
            let _ = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(key(KeyCode::Char(ch)));
            }
        }

        fn equipment(&self) -> &EquipmentScreen {
            match &self.view_data.screen {
                ActiveScreen::Equipment(screen) => screen,
                other => panic!("expected equipment screen, got {:?}", other.kind()),
            }
        }

        fn categories(&self) -> &super::ResourceScreen<bihin_app::Category> {
            match &self.view_data.screen {
                ActiveScreen::Categories(screen) => screen,
                other => panic!("expected categories screen, got {:?}", other.kind()),
            }
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn equipment_mount_loads_three_collections_once() {
        let harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());

        let screen = harness.equipment();
        assert_eq!(screen.inner.view.load_state(), LoadState::Ready);
        assert!(!screen.is_loading());
        assert_eq!(screen.inner.view.items().len(), 3);
        assert_eq!(screen.lookups.categories.len(), 2);
        assert_eq!(screen.lookups.locations.len(), 2);
        assert_eq!(
            harness.runtime.calls,
            vec![
                ApiCall::Equipment(ApiRequest::LoadAll),
                ApiCall::Categories(ApiRequest::LoadAll),
                ApiCall::Locations(ApiRequest::LoadAll),
            ]
        );
    }

    #[test]
    fn lookup_failure_is_terminal_for_equipment() {
        let runtime = TestRuntime::seeded();
        runtime.backend.locations.fail(Operation::Fetch);
        let mut harness = Harness::mounted(ResourceKind::Equipment, runtime);

        assert_eq!(
            harness.equipment().inner.view.load_state(),
            LoadState::Failed("failed to fetch locations")
        );

        harness.press(key(KeyCode::Char('n')));
        assert!(harness.equipment().inner.view.form().is_none());
        assert_eq!(harness.runtime.calls.len(), 3);
    }

    #[test]
    fn tab_key_cycles_tabs_and_remounts() {
        let mut harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());
        let first_mount = harness.view_data.mount;

        let should_quit = harness.press(key(KeyCode::Tab));
        assert!(!should_quit);
        assert_eq!(harness.state.active_tab, ResourceKind::Category);
        assert_eq!(harness.view_data.mount, first_mount + 1);
        assert_eq!(harness.categories().view.items().len(), 2);

        harness.press(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(harness.state.active_tab, ResourceKind::Equipment);
        assert_eq!(harness.equipment().inner.view.load_state(), LoadState::Ready);
    }

    #[test]
    fn responses_for_unmounted_view_are_dropped() {
        let (tx, rx) = mpsc::channel();
        let mut state = AppState::default();
        let mut runtime = TestRuntime::seeded();
        let mut view_data = ViewData::default();

        mount_active_tab(&mut state, &mut runtime, &mut view_data, &tx);
        state.active_tab = ResourceKind::Location;
        mount_active_tab(&mut state, &mut runtime, &mut view_data, &tx);
        process_internal_events(&mut state, &mut runtime, &mut view_data, &tx, &rx);

        match &view_data.screen {
            ActiveScreen::Locations(screen) => {
                assert_eq!(screen.view.load_state(), LoadState::Ready);
                assert_eq!(screen.view.items().len(), 2);
            }
            other => panic!("expected locations screen, got {:?}", other.kind()),
        }
    }

    #[test]
    fn create_category_through_form_keys() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('n')));
        assert!(harness.categories().view.form().is_some());
        harness.type_text("新");
        harness.press(key(KeyCode::Tab));
        harness.type_text("d");
        harness.press(key(KeyCode::Enter));

        let screen = harness.categories();
        assert!(screen.view.form().is_none());
        assert_eq!(screen.view.items().len(), 3);
        let last = screen.view.items().last().expect("created category");
        assert_eq!(last.id, Some(CategoryId::new(3)));
        assert_eq!(last.name, "新");
        assert_eq!(last.description.as_deref(), Some("d"));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("created category 新")
        );
    }

    #[test]
    fn blank_name_raises_alert_without_request() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('n')));
        harness.type_text("   ");
        harness.press(key(KeyCode::Enter));

        assert_eq!(
            harness.view_data.alert.as_deref(),
            Some("category name is required")
        );
        assert_eq!(harness.runtime.backend.categories.call_count(Operation::Create), 0);

        harness.press(key(KeyCode::Char('x')));
        assert!(harness.view_data.alert.is_some());
        harness.press(key(KeyCode::Esc));
        assert!(harness.view_data.alert.is_none());
        assert!(harness.categories().view.form().is_some());
    }

    #[test]
    fn double_submit_sends_one_request() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());
        harness.press(key(KeyCode::Char('n')));
        harness.type_text("消耗品");

        harness.press_without_pump(key(KeyCode::Enter));
        harness.press_without_pump(key(KeyCode::Enter));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("submit in progress")
        );
        harness.pump();

        assert_eq!(harness.runtime.backend.categories.call_count(Operation::Create), 1);
        assert_eq!(harness.categories().view.items().len(), 3);
    }

    #[test]
    fn failed_update_shows_alert_and_keeps_form() {
        let runtime = TestRuntime::seeded();
        runtime.backend.categories.fail(Operation::Update);
        let mut harness = Harness::mounted(ResourceKind::Category, runtime);

        harness.press(key(KeyCode::Char('e')));
        harness.type_text("!");
        harness.press(key(KeyCode::Enter));

        assert_eq!(
            harness.view_data.alert.as_deref(),
            Some("failed to update category")
        );
        let form = harness.categories().view.form().expect("form stays open");
        assert_eq!(form.draft.name, "電子機器!");
        assert!(!form.is_submitting());
        assert_eq!(harness.categories().view.items()[0].name, "電子機器");
    }

    #[test]
    fn delete_confirm_removes_selected_row() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('j')));
        harness.press(key(KeyCode::Char('d')));
        let status = status_text(&harness.state, &harness.view_data);
        assert!(status.contains("delete category 家具?"));
        harness.press(key(KeyCode::Char('y')));

        let screen = harness.categories();
        assert_eq!(screen.view.items().len(), 1);
        assert_eq!(screen.view.items()[0].name, "電子機器");
        assert_eq!(screen.view.pending_delete(), None);
        assert_eq!(screen.cursor, 0);
    }

    #[test]
    fn edit_cancels_pending_delete() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('d')));
        assert!(harness.categories().view.pending_delete().is_some());
        harness.press(key(KeyCode::Char('j')));
        harness.press(key(KeyCode::Char('e')));

        let screen = harness.categories();
        assert_eq!(screen.view.pending_delete(), None);
        assert!(screen.view.form().is_some());
        assert_eq!(harness.runtime.backend.categories.call_count(Operation::Delete), 0);
    }

    #[test]
    fn status_filter_and_search_narrow_equipment_rows() {
        let mut harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('s')));
        harness.press(key(KeyCode::Char('s')));
        assert_eq!(
            harness.equipment().filter.status,
            StatusFilter::Only(EquipmentStatus::InUse)
        );
        let names = harness
            .equipment()
            .visible()
            .iter()
            .map(|item| item.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["モニター".to_owned()]);

        harness.press(key(KeyCode::Char('S')));
        harness.press(key(KeyCode::Char('S')));
        harness.press(key(KeyCode::Char('/')));
        harness.type_text("PC");
        harness.press(key(KeyCode::Enter));
        let screen = harness.equipment();
        assert!(!screen.search_focused);
        assert_eq!(screen.filter.term, "PC");
        assert_eq!(screen.visible().len(), 1);
        assert_eq!(filter_bar_text(screen), "status: all | search: PC | 1 / 3 shown");

        harness.press(ctrl('u'));
        assert_eq!(harness.equipment().visible().len(), 3);
    }

    #[test]
    fn equipment_form_cycles_lookups_and_creates() {
        let mut harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('n')));
        harness.type_text("プロジェクター");
        harness.press(key(KeyCode::Tab));
        harness.press(key(KeyCode::Tab));
        harness.press(key(KeyCode::Right));
        harness.press(key(KeyCode::Right));
        harness.press(key(KeyCode::Tab));
        harness.press(key(KeyCode::Right));
        harness.press(key(KeyCode::Enter));

        let screen = harness.equipment();
        let created = screen.inner.view.items().last().expect("created equipment");
        assert_eq!(created.name, "プロジェクター");
        assert_eq!(created.category_name.as_deref(), Some("家具"));
        assert_eq!(created.location_name.as_deref(), Some("東京オフィス"));
        assert_eq!(created.status, EquipmentStatus::Available);
    }

    #[test]
    fn form_text_marks_cursor_and_submitting() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());
        harness.press(key(KeyCode::Char('e')));

        let screen = harness.categories();
        let form = screen.view.form().expect("form open");
        let text = render_form_text(form, screen.field);
        assert!(text.contains("▸ name*: 電子機器"));
        assert!(text.contains("  description: パソコンやタブレットなど"));
        assert!(text.contains("enter submit"));

        harness.press_without_pump(key(KeyCode::Enter));
        let screen = harness.categories();
        let form = screen.view.form().expect("form open while submitting");
        assert!(render_form_text(form, screen.field).contains("submitting…"));
    }

    #[test]
    fn detail_overlay_opens_and_closes() {
        let mut harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());

        harness.press(key(KeyCode::Enter));
        assert!(harness.equipment().inner.detail_visible);
        assert!(status_text(&harness.state, &harness.view_data).is_empty());

        harness.press(key(KeyCode::Char('z')));
        assert!(!harness.equipment().inner.detail_visible);
    }

    #[test]
    fn q_quits_from_nav_but_types_in_form() {
        let mut harness = Harness::mounted(ResourceKind::Location, TestRuntime::seeded());

        harness.press(key(KeyCode::Char('n')));
        assert!(!harness.press(key(KeyCode::Char('q'))));
        harness.press(key(KeyCode::Esc));
        assert!(harness.press(key(KeyCode::Char('q'))));
        assert!(harness.press(ctrl('q')));
    }

    #[test]
    fn status_clears_only_for_latest_token() {
        let mut harness = Harness::mounted(ResourceKind::Category, TestRuntime::seeded());
        harness.press(key(KeyCode::Char('n')));
        let token = harness.view_data.status_token;

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: token - 1 })
            .expect("send clear");
        harness.pump();
        assert!(harness.state.status_line.is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token })
            .expect("send clear");
        harness.pump();
        assert!(harness.state.status_line.is_none());
    }

    #[test]
    fn help_overlay_lists_every_mode() {
        let text = help_overlay_text();
        for needle in ["global:", "nav:", "equipment:", "search:", "form:", "delete:"] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn status_text_shows_mode_badges() {
        let mut harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());
        assert!(status_text(&harness.state, &harness.view_data).starts_with("NAV"));

        harness.press(key(KeyCode::Char('/')));
        assert!(status_text(&harness.state, &harness.view_data).starts_with("SEARCH"));
        harness.press(key(KeyCode::Esc));

        harness.press(key(KeyCode::Char('n')));
        assert!(status_text(&harness.state, &harness.view_data).starts_with("FORM"));
        harness.press(key(KeyCode::Char('?')));
        assert_eq!(
            harness.equipment().inner.view.form().map(|form| form.draft.name.as_str()),
            Some("?")
        );

        harness.press(key(KeyCode::Esc));
        harness.press(key(KeyCode::Char('?')));
        assert!(harness.view_data.help_visible);
        assert!(status_text(&harness.state, &harness.view_data).is_empty());
    }

    #[test]
    fn render_draws_rows_and_filter_bar() {
        let harness = Harness::mounted(ResourceKind::Equipment, TestRuntime::seeded());
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, &harness.state, &harness.view_data))
            .expect("draw frame");

        let screen = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("PC001"));
        assert!(screen.contains("CH003"));
        assert!(screen.contains("3 / 3 shown"));
    }
}
