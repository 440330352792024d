// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::{
    Category, CategoryFormInput, CategoryId, CategoryInput, Equipment, EquipmentFormInput,
    EquipmentId, EquipmentInput, Location, LocationFormInput, LocationId, LocationInput,
    Operation, ResourceKind, ViewCommand, failure_message, format_price, format_purchase_date,
};

/// An entity shape a generic resource view can manage.
pub trait Resource: Clone + fmt::Debug + PartialEq + Send + 'static {
    type Id: Copy + Eq + fmt::Debug + fmt::Display + Send + 'static;
    type Form: Clone + fmt::Debug + PartialEq + Default + Send + 'static;
    type Input: Clone + fmt::Debug + PartialEq + Serialize + Send + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> Option<Self::Id>;
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn to_form(&self) -> Self::Form;
    fn validate(form: &Self::Form) -> Result<Self::Input>;
}

/// The capability set every entity's API adapter provides.
pub trait ResourceApi<R: Resource> {
    fn get_all(&self) -> Result<Vec<R>>;
    fn create(&self, input: &R::Input) -> Result<R>;
    fn update(&self, id: R::Id, input: &R::Input) -> Result<R>;
    fn delete(&self, id: R::Id) -> Result<()>;
}

/// Tags one form submit so its completion can be told apart from a later
/// submit on the same view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket(u64);

impl SubmitTicket {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest<R: Resource> {
    LoadAll,
    Create(SubmitTicket, R::Input),
    Update(SubmitTicket, R::Id, R::Input),
    Delete(R::Id),
}

impl<R: Resource> ApiRequest<R> {
    pub fn operation(&self) -> Operation {
        match self {
            Self::LoadAll => Operation::Fetch,
            Self::Create(..) => Operation::Create,
            Self::Update(..) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

/// Runs one request against the API and turns the outcome into the command
/// that completes it. Failures are logged with their cause and reduced to the
/// fixed message for the operation.
pub fn perform<R, A>(api: &A, request: ApiRequest<R>) -> ViewCommand<R>
where
    R: Resource,
    A: ResourceApi<R> + ?Sized,
{
    let operation = request.operation();
    tracing::debug!(
        resource = R::KIND.singular(),
        operation = operation.as_str(),
        "api request"
    );
    let log_failure = |error: anyhow::Error| {
        tracing::warn!(
            resource = R::KIND.singular(),
            operation = operation.as_str(),
            error = %format!("{error:#}"),
            "api request failed"
        );
    };

    match request {
        ApiRequest::LoadAll => match api.get_all() {
            Ok(items) => ViewCommand::Loaded(items),
            Err(error) => {
                log_failure(error);
                ViewCommand::LoadFailed(failure_message(R::KIND, Operation::Fetch))
            }
        },
        ApiRequest::Create(ticket, input) => match api.create(&input) {
            Ok(record) => ViewCommand::Created(ticket, record),
            Err(error) => {
                log_failure(error);
                ViewCommand::SubmitFailed(ticket, Operation::Create)
            }
        },
        ApiRequest::Update(ticket, id, input) => match api.update(id, &input) {
            Ok(record) => ViewCommand::Updated(ticket, id, record),
            Err(error) => {
                log_failure(error);
                ViewCommand::SubmitFailed(ticket, Operation::Update)
            }
        },
        ApiRequest::Delete(id) => match api.delete(id) {
            Ok(()) => ViewCommand::Deleted(id),
            Err(error) => {
                log_failure(error);
                ViewCommand::DeleteFailed(id)
            }
        },
    }
}

impl Resource for Category {
    type Id = CategoryId;
    type Form = CategoryFormInput;
    type Input = CategoryInput;

    const KIND: ResourceKind = ResourceKind::Category;

    fn id(&self) -> Option<CategoryId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn to_form(&self) -> CategoryFormInput {
        CategoryFormInput {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
        }
    }

    fn validate(form: &CategoryFormInput) -> Result<CategoryInput> {
        form.validate()
    }
}

impl Resource for Location {
    type Id = LocationId;
    type Form = LocationFormInput;
    type Input = LocationInput;

    const KIND: ResourceKind = ResourceKind::Location;

    fn id(&self) -> Option<LocationId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn to_form(&self) -> LocationFormInput {
        LocationFormInput {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
        }
    }

    fn validate(form: &LocationFormInput) -> Result<LocationInput> {
        form.validate()
    }
}

impl Resource for Equipment {
    type Id = EquipmentId;
    type Form = EquipmentFormInput;
    type Input = EquipmentInput;

    const KIND: ResourceKind = ResourceKind::Equipment;

    fn id(&self) -> Option<EquipmentId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn to_form(&self) -> EquipmentFormInput {
        EquipmentFormInput {
            name: self.name.clone(),
            serial_number: self.serial_number.clone().unwrap_or_default(),
            category: self.category,
            category_name: self.category_name.clone(),
            location: self.location,
            location_name: self.location_name.clone(),
            purchase_date: self
                .purchase_date
                .map(format_purchase_date)
                .unwrap_or_default(),
            purchase_price: self
                .purchase_price_cents
                .map(format_price)
                .unwrap_or_default(),
            status: self.status,
            description: self.description.clone().unwrap_or_default(),
        }
    }

    fn validate(form: &EquipmentFormInput) -> Result<EquipmentInput> {
        form.validate()
    }
}
