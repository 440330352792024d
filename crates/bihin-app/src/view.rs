// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ApiRequest, Operation, Resource, ResourceApi, SubmitTicket, failure_message, perform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode<Id> {
    Create,
    Edit(Id),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState<R: Resource> {
    pub mode: FormMode<R::Id>,
    pub draft: R::Form,
    /// The ticket of the request this form is waiting on, if any.
    pub submitting: Option<SubmitTicket>,
}

impl<R: Resource> FormState<R> {
    fn new(mode: FormMode<R::Id>, draft: R::Form) -> Self {
        Self {
            mode,
            draft,
            submitting: None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelete<Id> {
    pub target: Id,
    pub in_flight: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand<R: Resource> {
    Loaded(Vec<R>),
    LoadFailed(&'static str),
    OpenCreate,
    OpenEdit(R::Id),
    UpdateDraft(R::Form),
    CloseForm,
    Submit,
    Created(SubmitTicket, R),
    Updated(SubmitTicket, R::Id, R),
    SubmitFailed(SubmitTicket, Operation),
    RequestDelete(R::Id),
    CancelDelete,
    ConfirmDelete,
    Deleted(R::Id),
    DeleteFailed(R::Id),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent<R: Resource> {
    Request(ApiRequest<R>),
    Alert(String),
    LoadFailed(&'static str),
    CacheChanged,
    FormOpened(FormMode<R::Id>),
    FormClosed,
    DeletePending(R::Id),
    DeleteCleared,
    Ignored(&'static str),
}

/// List, form, and delete-confirmation state for one entity view.
///
/// The cache only changes when a completion command reports that the API
/// applied a mutation. Record actions are ignored until the initial load has
/// settled, and a failed load is terminal.
///
/// Each submit carries a fresh [`SubmitTicket`]. A completion only clears the
/// in-flight flag or closes the form when its ticket is the one the open form
/// is waiting on, so a result for a cancelled form never touches a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView<R: Resource> {
    load: LoadState,
    items: Vec<R>,
    form: Option<FormState<R>>,
    pending_delete: Option<PendingDelete<R::Id>>,
    next_ticket: SubmitTicket,
}

impl<R: Resource> Default for ResourceView<R> {
    fn default() -> Self {
        Self {
            load: LoadState::Loading,
            items: Vec::new(),
            form: None,
            pending_delete: None,
            next_ticket: SubmitTicket::new(1),
        }
    }
}

impl<R: Resource> ResourceView<R> {
    /// A freshly mounted view and the one load request it issues.
    pub fn mount() -> (Self, ApiRequest<R>) {
        (Self::default(), ApiRequest::LoadAll)
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn find(&self, id: R::Id) -> Option<&R> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    pub fn form(&self) -> Option<&FormState<R>> {
        self.form.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.form.as_ref().is_some_and(FormState::is_submitting)
    }

    pub fn pending_delete(&self) -> Option<PendingDelete<R::Id>> {
        self.pending_delete
    }

    pub fn dispatch(&mut self, command: ViewCommand<R>) -> Vec<ViewEvent<R>> {
        match command {
            ViewCommand::Loaded(items) => {
                if self.load != LoadState::Loading {
                    return ignored("load already settled");
                }
                self.items = items;
                self.load = LoadState::Ready;
                vec![ViewEvent::CacheChanged]
            }
            ViewCommand::LoadFailed(message) => {
                if matches!(self.load, LoadState::Failed(_)) {
                    return ignored("load already failed");
                }
                self.load = LoadState::Failed(message);
                self.form = None;
                self.pending_delete = None;
                vec![ViewEvent::LoadFailed(message)]
            }
            ViewCommand::Created(ticket, record) => self.merge_created(ticket, record),
            ViewCommand::Updated(ticket, id, record) => self.merge_updated(ticket, id, record),
            ViewCommand::SubmitFailed(ticket, operation) => {
                if let Some(form) = self.form.as_mut()
                    && form.submitting == Some(ticket)
                {
                    form.submitting = None;
                }
                vec![ViewEvent::Alert(
                    failure_message(R::KIND, operation).to_owned(),
                )]
            }
            ViewCommand::Deleted(id) => {
                self.items.retain(|item| item.id() != Some(id));
                let mut events = vec![ViewEvent::CacheChanged];
                if self.pending_delete.is_some_and(|pending| pending.target == id) {
                    self.pending_delete = None;
                    events.push(ViewEvent::DeleteCleared);
                }
                events
            }
            ViewCommand::DeleteFailed(id) => {
                if let Some(pending) = self.pending_delete.as_mut()
                    && pending.target == id
                {
                    pending.in_flight = false;
                }
                vec![ViewEvent::Alert(
                    failure_message(R::KIND, Operation::Delete).to_owned(),
                )]
            }
            _ if self.load != LoadState::Ready => ignored("view not ready"),
            ViewCommand::OpenCreate => {
                if self.is_submitting() {
                    return ignored("submit in progress");
                }
                self.form = Some(FormState::new(FormMode::Create, R::Form::default()));
                vec![ViewEvent::FormOpened(FormMode::Create)]
            }
            ViewCommand::OpenEdit(id) => {
                if self.is_submitting() {
                    return ignored("submit in progress");
                }
                let Some(draft) = self.find(id).map(R::to_form) else {
                    return ignored("record not found");
                };
                let mut events = Vec::new();
                if self.pending_delete.take().is_some() {
                    events.push(ViewEvent::DeleteCleared);
                }
                self.form = Some(FormState::new(FormMode::Edit(id), draft));
                events.push(ViewEvent::FormOpened(FormMode::Edit(id)));
                events
            }
            ViewCommand::UpdateDraft(draft) => match self.form.as_mut() {
                None => ignored("no form open"),
                Some(form) if form.is_submitting() => ignored("submit in progress"),
                Some(form) => {
                    form.draft = draft;
                    Vec::new()
                }
            },
            ViewCommand::CloseForm => match self.form.take() {
                Some(_) => vec![ViewEvent::FormClosed],
                None => ignored("no form open"),
            },
            ViewCommand::Submit => self.submit(),
            ViewCommand::RequestDelete(id) => {
                if self.pending_delete.is_some_and(|pending| pending.in_flight) {
                    return ignored("delete in progress");
                }
                self.pending_delete = Some(PendingDelete {
                    target: id,
                    in_flight: false,
                });
                vec![ViewEvent::DeletePending(id)]
            }
            ViewCommand::CancelDelete => match self.pending_delete.take() {
                Some(_) => vec![ViewEvent::DeleteCleared],
                None => ignored("no delete pending"),
            },
            ViewCommand::ConfirmDelete => match self.pending_delete.as_mut() {
                None => ignored("no delete pending"),
                Some(pending) if pending.in_flight => ignored("delete in progress"),
                Some(pending) => {
                    pending.in_flight = true;
                    vec![ViewEvent::Request(ApiRequest::Delete(pending.target))]
                }
            },
        }
    }

    /// Dispatches a command and runs every request it produces against `api`
    /// before returning, feeding each outcome back in.
    pub fn dispatch_with<A>(&mut self, api: &A, command: ViewCommand<R>) -> Vec<ViewEvent<R>>
    where
        A: ResourceApi<R> + ?Sized,
    {
        let mut events = Vec::new();
        let mut queue = vec![command];
        while let Some(next) = queue.pop() {
            for event in self.dispatch(next) {
                if let ViewEvent::Request(request) = &event {
                    queue.push(perform(api, request.clone()));
                }
                events.push(event);
            }
        }
        events
    }

    fn submit(&mut self) -> Vec<ViewEvent<R>> {
        let Some(form) = self.form.as_mut() else {
            return ignored("no form open");
        };
        if form.is_submitting() {
            return ignored("submit in progress");
        }
        let input = match R::validate(&form.draft) {
            Ok(input) => input,
            Err(error) => return vec![ViewEvent::Alert(error.to_string())],
        };
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        form.submitting = Some(ticket);
        let request = match form.mode {
            FormMode::Create => ApiRequest::Create(ticket, input),
            FormMode::Edit(id) => ApiRequest::Update(ticket, id, input),
        };
        vec![ViewEvent::Request(request)]
    }

    fn merge_created(&mut self, ticket: SubmitTicket, record: R) -> Vec<ViewEvent<R>> {
        let existing = record
            .id()
            .and_then(|id| self.items.iter().position(|item| item.id() == Some(id)));
        match existing {
            Some(index) => self.items[index] = record,
            None => self.items.push(record),
        }
        let mut events = vec![ViewEvent::CacheChanged];
        self.close_if_waiting_on(ticket, &mut events);
        events
    }

    fn merge_updated(&mut self, ticket: SubmitTicket, id: R::Id, record: R) -> Vec<ViewEvent<R>> {
        let mut events = Vec::new();
        if let Some(slot) = self.items.iter_mut().find(|item| item.id() == Some(id)) {
            *slot = record;
            events.push(ViewEvent::CacheChanged);
        }
        self.close_if_waiting_on(ticket, &mut events);
        events
    }

    fn close_if_waiting_on(&mut self, ticket: SubmitTicket, events: &mut Vec<ViewEvent<R>>) {
        if self
            .form
            .as_ref()
            .is_some_and(|form| form.submitting == Some(ticket))
        {
            self.form = None;
            events.push(ViewEvent::FormClosed);
        }
    }
}

fn ignored<R: Resource>(reason: &'static str) -> Vec<ViewEvent<R>> {
    vec![ViewEvent::Ignored(reason)]
}
