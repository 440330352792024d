// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{
    Category, CategoryId, CategoryInput, EquipmentInput, EquipmentStatus, Location, LocationId,
    LocationInput, NamedInput, PURCHASE_DATE_MESSAGE, PURCHASE_PRICE_MESSAGE, ResourceKind,
    name_required_message, parse_price, parse_purchase_date,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFieldSpec {
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn text(label: &'static str, required: bool) -> FormFieldSpec {
    FormFieldSpec {
        label,
        kind: FieldKind::Text,
        required,
    }
}

const fn choice(label: &'static str) -> FormFieldSpec {
    FormFieldSpec {
        label,
        kind: FieldKind::Choice,
        required: false,
    }
}

/// Field-level access a form overlay needs to render and edit a draft without
/// knowing its concrete type.
pub trait FormFields {
    fn field_specs() -> &'static [FormFieldSpec];
    fn field_text(&self, index: usize) -> String;
    fn set_field_text(&mut self, index: usize, value: String) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryFormInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationFormInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquipmentFormInput {
    pub name: String,
    pub serial_number: String,
    pub category: Option<CategoryId>,
    pub category_name: Option<String>,
    pub location: Option<LocationId>,
    pub location_name: Option<String>,
    pub purchase_date: String,
    pub purchase_price: String,
    pub status: EquipmentStatus,
    pub description: String,
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn named_input(kind: ResourceKind, name: &str, description: &str) -> Result<NamedInput> {
    if name.trim().is_empty() {
        bail!(name_required_message(kind));
    }
    Ok(NamedInput {
        name: name.trim().to_owned(),
        description: optional_text(description),
    })
}

impl CategoryFormInput {
    pub fn validate(&self) -> Result<CategoryInput> {
        named_input(ResourceKind::Category, &self.name, &self.description)
    }
}

impl LocationFormInput {
    pub fn validate(&self) -> Result<LocationInput> {
        named_input(ResourceKind::Location, &self.name, &self.description)
    }
}

impl EquipmentFormInput {
    pub const NAME: usize = 0;
    pub const SERIAL_NUMBER: usize = 1;
    pub const CATEGORY: usize = 2;
    pub const LOCATION: usize = 3;
    pub const PURCHASE_DATE: usize = 4;
    pub const PURCHASE_PRICE: usize = 5;
    pub const STATUS: usize = 6;
    pub const DESCRIPTION: usize = 7;

    pub fn validate(&self) -> Result<EquipmentInput> {
        if self.name.trim().is_empty() {
            bail!(name_required_message(ResourceKind::Equipment));
        }
        let purchase_date = match optional_text(&self.purchase_date) {
            Some(raw) => match parse_purchase_date(&raw) {
                Ok(date) => Some(date),
                Err(_) => bail!(PURCHASE_DATE_MESSAGE),
            },
            None => None,
        };
        let purchase_price_cents = match optional_text(&self.purchase_price) {
            Some(raw) => match parse_price(&raw) {
                Ok(cents) => Some(cents),
                Err(_) => bail!(PURCHASE_PRICE_MESSAGE),
            },
            None => None,
        };

        Ok(EquipmentInput {
            name: self.name.trim().to_owned(),
            serial_number: optional_text(&self.serial_number),
            category: self.category,
            category_name: self.category_name.clone(),
            location: self.location,
            location_name: self.location_name.clone(),
            purchase_date,
            purchase_price_cents,
            status: self.status,
            description: optional_text(&self.description),
        })
    }

    /// Resolves a chosen category identifier to both the stored key and the
    /// display name carried alongside it.
    pub fn select_category(
        &mut self,
        categories: &[Category],
        id: Option<CategoryId>,
    ) -> Result<()> {
        match id {
            None => {
                self.category = None;
                self.category_name = None;
            }
            Some(id) => {
                let Some(category) = categories.iter().find(|c| c.id == Some(id)) else {
                    bail!("category {id} is not loaded");
                };
                self.category = Some(id);
                self.category_name = Some(category.name.clone());
            }
        }
        Ok(())
    }

    pub fn select_location(
        &mut self,
        locations: &[Location],
        id: Option<LocationId>,
    ) -> Result<()> {
        match id {
            None => {
                self.location = None;
                self.location_name = None;
            }
            Some(id) => {
                let Some(location) = locations.iter().find(|l| l.id == Some(id)) else {
                    bail!("location {id} is not loaded");
                };
                self.location = Some(id);
                self.location_name = Some(location.name.clone());
            }
        }
        Ok(())
    }

    /// Steps a choice field through its options. Category and location cycle
    /// through "none" followed by every loaded record.
    pub fn cycle_choice(
        &mut self,
        index: usize,
        delta: isize,
        categories: &[Category],
        locations: &[Location],
    ) -> Result<String> {
        match index {
            Self::STATUS => {
                self.status = self.status.cycle(delta);
                Ok(format!("status {}", self.status.label()))
            }
            Self::CATEGORY => {
                let options = std::iter::once(None)
                    .chain(categories.iter().filter_map(|c| c.id).map(Some))
                    .collect::<Vec<_>>();
                let next = step_option(&options, self.category, delta);
                self.select_category(categories, next)?;
                Ok(format!(
                    "category {}",
                    self.category_name.as_deref().unwrap_or("(none)")
                ))
            }
            Self::LOCATION => {
                let options = std::iter::once(None)
                    .chain(locations.iter().filter_map(|l| l.id).map(Some))
                    .collect::<Vec<_>>();
                let next = step_option(&options, self.location, delta);
                self.select_location(locations, next)?;
                Ok(format!(
                    "location {}",
                    self.location_name.as_deref().unwrap_or("(none)")
                ))
            }
            _ => bail!("no choices for this field"),
        }
    }
}

fn step_option<T>(options: &[Option<T>], current: Option<T>, delta: isize) -> Option<T>
where
    T: Copy + PartialEq,
{
    if options.is_empty() {
        return None;
    }
    let len = options.len() as isize;
    let position = options
        .iter()
        .position(|option| *option == current)
        .unwrap_or(0) as isize;
    options[(position + delta).rem_euclid(len) as usize]
}

const NAMED_FIELDS: [FormFieldSpec; 2] = [text("name", true), text("description", false)];

const EQUIPMENT_FIELDS: [FormFieldSpec; 8] = [
    text("name", true),
    text("serial number", false),
    choice("category"),
    choice("location"),
    text("purchase date", false),
    text("purchase price", false),
    choice("status"),
    text("description", false),
];

macro_rules! named_form_fields {
    ($form:ty) => {
        impl FormFields for $form {
            fn field_specs() -> &'static [FormFieldSpec] {
                &NAMED_FIELDS
            }

            fn field_text(&self, index: usize) -> String {
                match index {
                    0 => self.name.clone(),
                    1 => self.description.clone(),
                    _ => String::new(),
                }
            }

            fn set_field_text(&mut self, index: usize, value: String) -> bool {
                match index {
                    0 => self.name = value,
                    1 => self.description = value,
                    _ => return false,
                }
                true
            }
        }
    };
}

named_form_fields!(CategoryFormInput);
named_form_fields!(LocationFormInput);

impl FormFields for EquipmentFormInput {
    fn field_specs() -> &'static [FormFieldSpec] {
        &EQUIPMENT_FIELDS
    }

    fn field_text(&self, index: usize) -> String {
        match index {
            Self::NAME => self.name.clone(),
            Self::SERIAL_NUMBER => self.serial_number.clone(),
            Self::CATEGORY => self
                .category_name
                .clone()
                .unwrap_or_else(|| "(none)".to_owned()),
            Self::LOCATION => self
                .location_name
                .clone()
                .unwrap_or_else(|| "(none)".to_owned()),
            Self::PURCHASE_DATE => self.purchase_date.clone(),
            Self::PURCHASE_PRICE => self.purchase_price.clone(),
            Self::STATUS => self.status.label().to_owned(),
            Self::DESCRIPTION => self.description.clone(),
            _ => String::new(),
        }
    }

    fn set_field_text(&mut self, index: usize, value: String) -> bool {
        match index {
            Self::NAME => self.name = value,
            Self::SERIAL_NUMBER => self.serial_number = value,
            Self::PURCHASE_DATE => self.purchase_date = value,
            Self::PURCHASE_PRICE => self.purchase_price = value,
            Self::DESCRIPTION => self.description = value,
            _ => return false,
        }
        true
    }
}
