// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Equipment, EquipmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EquipmentStatus),
}

impl StatusFilter {
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.label(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value == "all" {
            return Some(Self::All);
        }
        EquipmentStatus::parse(value).map(Self::Only)
    }

    pub fn matches(self, status: EquipmentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    /// Steps through "all" followed by each status in declaration order.
    pub fn cycle(self, delta: isize) -> Self {
        let options = std::iter::once(Self::All)
            .chain(EquipmentStatus::ALL.into_iter().map(Self::Only))
            .collect::<Vec<_>>();
        let len = options.len() as isize;
        let current = options
            .iter()
            .position(|option| *option == self)
            .unwrap_or(0) as isize;
        options[(current + delta).rem_euclid(len) as usize]
    }
}

/// Status selector plus free-text search applied to the equipment list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquipmentFilter {
    pub status: StatusFilter,
    pub term: String,
}

impl EquipmentFilter {
    pub fn apply<'a>(&self, items: &'a [Equipment]) -> Vec<&'a Equipment> {
        filter_equipment(items, self.status, &self.term)
    }

    pub fn is_active(&self) -> bool {
        self.status != StatusFilter::All || !self.term.trim().is_empty()
    }
}

/// Status first, then a case-insensitive substring match on name or
/// description. Source order is preserved.
pub fn filter_equipment<'a>(
    items: &'a [Equipment],
    status: StatusFilter,
    term: &str,
) -> Vec<&'a Equipment> {
    let needle = term.trim().to_lowercase();
    items
        .iter()
        .filter(|item| status.matches(item.status))
        .filter(|item| needle.is_empty() || matches_search(item, &needle))
        .collect()
}

fn matches_search(item: &Equipment, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle)
        || item
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

pub fn filter_summary(shown: usize, total: usize) -> String {
    format!("{shown} / {total} shown")
}

pub const fn empty_list_message(total: usize) -> &'static str {
    if total == 0 {
        "no equipment registered"
    } else {
        "no equipment matches the filter"
    }
}
