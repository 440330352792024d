// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::ids::*;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Equipment,
    Category,
    Location,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Equipment, Self::Category, Self::Location];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::Category => "categories",
            Self::Location => "locations",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::Category => "category",
            Self::Location => "location",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "equipment" | "equipments" => Some(Self::Equipment),
            "category" | "categories" => Some(Self::Category),
            "location" | "locations" => Some(Self::Location),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// The fixed message shown to the user when an API call fails. The underlying
/// cause only goes to the log.
pub const fn failure_message(kind: ResourceKind, operation: Operation) -> &'static str {
    match (kind, operation) {
        (ResourceKind::Category, Operation::Fetch) => "failed to fetch categories",
        (ResourceKind::Category, Operation::Create) => "failed to create category",
        (ResourceKind::Category, Operation::Update) => "failed to update category",
        (ResourceKind::Category, Operation::Delete) => "failed to delete category",
        (ResourceKind::Location, Operation::Fetch) => "failed to fetch locations",
        (ResourceKind::Location, Operation::Create) => "failed to create location",
        (ResourceKind::Location, Operation::Update) => "failed to update location",
        (ResourceKind::Location, Operation::Delete) => "failed to delete location",
        (ResourceKind::Equipment, Operation::Fetch) => "failed to fetch equipment",
        (ResourceKind::Equipment, Operation::Create) => "failed to create equipment",
        (ResourceKind::Equipment, Operation::Update) => "failed to update equipment",
        (ResourceKind::Equipment, Operation::Delete) => "failed to delete equipment",
    }
}

pub const fn name_required_message(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Equipment => "equipment name is required",
        ResourceKind::Category => "category name is required",
        ResourceKind::Location => "location name is required",
    }
}

pub const PURCHASE_DATE_MESSAGE: &str = "purchase date must be YYYY-MM-DD";
pub const PURCHASE_PRICE_MESSAGE: &str = "purchase price must be a non-negative amount";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    Broken,
    Discarded,
}

impl EquipmentStatus {
    pub const ALL: [Self; 5] = [
        Self::Available,
        Self::InUse,
        Self::Maintenance,
        Self::Broken,
        Self::Discarded,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Maintenance => "maintenance",
            Self::Broken => "broken",
            Self::Discarded => "discarded",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in use",
            Self::Maintenance => "maintenance",
            Self::Broken => "broken",
            Self::Discarded => "discarded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "in_use" => Some(Self::InUse),
            "maintenance" => Some(Self::Maintenance),
            "broken" => Some(Self::Broken),
            "discarded" => Some(Self::Discarded),
            _ => None,
        }
    }

    pub fn cycle(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let current = Self::ALL
            .iter()
            .position(|status| *status == self)
            .unwrap_or(0) as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocationId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EquipmentId>,
    pub name: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub location: Option<LocationId>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub purchase_date: Option<Date>,
    #[serde(default, rename = "purchase_price", with = "price_cents")]
    pub purchase_price_cents: Option<i64>,
    pub status: EquipmentStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// Create/update body for categories and locations. The identifier never
/// travels in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedInput {
    pub name: String,
    pub description: Option<String>,
}

pub type CategoryInput = NamedInput;
pub type LocationInput = NamedInput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentInput {
    pub name: String,
    pub serial_number: Option<String>,
    pub category: Option<CategoryId>,
    #[serde(skip_serializing)]
    pub category_name: Option<String>,
    pub location: Option<LocationId>,
    #[serde(skip_serializing)]
    pub location_name: Option<String>,
    #[serde(with = "iso_date::option")]
    pub purchase_date: Option<Date>,
    #[serde(rename = "purchase_price", with = "price_cents")]
    pub purchase_price_cents: Option<i64>,
    pub status: EquipmentStatus,
    pub description: Option<String>,
}

/// Category and location collections an equipment view loads to populate its
/// select options and to resolve display names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Lookups {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

impl Lookups {
    pub fn category_label<'a>(&'a self, equipment: &'a Equipment) -> &'a str {
        if let Some(name) = equipment.category_name.as_deref()
            && !name.is_empty()
        {
            return name;
        }
        equipment
            .category
            .and_then(|id| self.categories.iter().find(|c| c.id == Some(id)))
            .map(|c| c.name.as_str())
            .unwrap_or("uncategorized")
    }

    pub fn location_label<'a>(&'a self, equipment: &'a Equipment) -> &'a str {
        if let Some(name) = equipment.location_name.as_deref()
            && !name.is_empty()
        {
            return name;
        }
        equipment
            .location
            .and_then(|id| self.locations.iter().find(|l| l.id == Some(id)))
            .map(|l| l.name.as_str())
            .unwrap_or("unassigned")
    }
}

pub fn parse_purchase_date(raw: &str) -> Result<Date> {
    Date::parse(
        raw.trim(),
        &time::macros::format_description!("[year]-[month]-[day]"),
    )
    .with_context(|| format!("invalid purchase date {raw:?}"))
}

pub fn format_purchase_date(date: Date) -> String {
    date.format(&time::macros::format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Parses a decimal amount such as `1200`, `1,200.5`, or `.99` into cents.
pub fn parse_price(raw: &str) -> Result<i64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.starts_with('-') {
        bail!("price {raw:?} cannot be negative");
    }
    let (whole, fraction) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    if whole.is_empty() && fraction.is_empty() {
        bail!("price {raw:?} is empty");
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        bail!("price {raw:?} is not a decimal amount");
    }
    if fraction.len() > 2 {
        bail!("price {raw:?} has more than two decimal places");
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("price {raw:?} is too large"))?
    };
    let fraction_value: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>()? * 10,
        _ => fraction.parse()?,
    };

    whole_value
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction_value))
        .ok_or_else(|| anyhow!("price {raw:?} is too large"))
}

pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

mod price_cents {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(cents) => serializer.serialize_some(&super::format_price(*cents)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(i64),
            Float(f64),
            Text(String),
        }

        // Numbers follow the same rules as price strings.
        let text = match Option::<Raw>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(Raw::Integer(value)) => value.to_string(),
            Some(Raw::Float(value)) if !value.is_finite() => {
                return Err(D::Error::custom("purchase price must be a finite number"));
            }
            Some(Raw::Float(value)) => value.to_string(),
            Some(Raw::Text(text)) if text.trim().is_empty() => return Ok(None),
            Some(Raw::Text(text)) => text,
        };
        super::parse_price(&text)
            .map(Some)
            .map_err(|error| D::Error::custom(format!("{error:#}")))
    }
}
