// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use bihin_app::{
    Category, CategoryId, Equipment, EquipmentId, EquipmentInput, EquipmentStatus, Location,
    LocationId, NamedInput, Operation, Resource, ResourceApi,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Date, Duration, Month};

const EQUIPMENT_NAMES: [&str; 12] = [
    "ノートPC",
    "モニター",
    "オフィスチェア",
    "プロジェクター",
    "タブレット",
    "キーボード",
    "Docking Station",
    "Label Printer",
    "Standing Desk",
    "Webcam",
    "Router",
    "Whiteboard",
];

const SERIAL_PREFIXES: [&str; 6] = ["PC", "MN", "CH", "PJ", "TB", "KB"];

const DESCRIPTIONS: [&str; 6] = [
    "デベロッパー用PC",
    "ワイドスクリーン",
    "肘掛け付き",
    "spare unit",
    "shared by the design team",
    "",
];

/// A record the fake server can mint from a create/update body.
pub trait FakeRecord: Resource {
    fn from_input(id: i64, input: &Self::Input) -> Self;
    fn raw_id(id: Self::Id) -> i64;
}

impl FakeRecord for Category {
    fn from_input(id: i64, input: &NamedInput) -> Self {
        Self {
            id: Some(CategoryId::new(id)),
            name: input.name.clone(),
            description: input.description.clone(),
        }
    }

    fn raw_id(id: CategoryId) -> i64 {
        id.get()
    }
}

impl FakeRecord for Location {
    fn from_input(id: i64, input: &NamedInput) -> Self {
        Self {
            id: Some(LocationId::new(id)),
            name: input.name.clone(),
            description: input.description.clone(),
        }
    }

    fn raw_id(id: LocationId) -> i64 {
        id.get()
    }
}

impl FakeRecord for Equipment {
    fn from_input(id: i64, input: &EquipmentInput) -> Self {
        Self {
            id: Some(EquipmentId::new(id)),
            name: input.name.clone(),
            serial_number: input.serial_number.clone(),
            category: input.category,
            category_name: input.category_name.clone(),
            location: input.location,
            location_name: input.location_name.clone(),
            purchase_date: input.purchase_date,
            purchase_price_cents: input.purchase_price_cents,
            status: input.status,
            description: input.description.clone(),
        }
    }

    fn raw_id(id: EquipmentId) -> i64 {
        id.get()
    }
}

#[derive(Debug)]
struct FakeStore<R> {
    records: Vec<R>,
    next_id: i64,
    failing: Vec<Operation>,
    calls: Vec<Operation>,
}

/// In-memory collection endpoint. Assigns increasing identifiers, rejects
/// updates and deletes of unknown records, and fails any operation on demand.
#[derive(Debug)]
pub struct FakeApi<R> {
    store: Mutex<FakeStore<R>>,
}

impl<R: FakeRecord> FakeApi<R> {
    pub fn new(records: Vec<R>) -> Self {
        let next_id = records
            .iter()
            .filter_map(|record| record.id().map(R::raw_id))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            store: Mutex::new(FakeStore {
                records,
                next_id,
                failing: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn fail(&self, operation: Operation) {
        let mut store = self.lock();
        if !store.failing.contains(&operation) {
            store.failing.push(operation);
        }
    }

    pub fn recover(&self, operation: Operation) {
        self.lock().failing.retain(|failing| *failing != operation);
    }

    pub fn records(&self) -> Vec<R> {
        self.lock().records.clone()
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, FakeStore<R>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, FakeStore<R>>> {
        let mut store = self.lock();
        store.calls.push(operation);
        if store.failing.contains(&operation) {
            bail!("injected {} failure", operation.as_str());
        }
        Ok(store)
    }
}

impl<R: FakeRecord> Default for FakeApi<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: FakeRecord> ResourceApi<R> for FakeApi<R> {
    fn get_all(&self) -> Result<Vec<R>> {
        let store = self.begin(Operation::Fetch)?;
        Ok(store.records.clone())
    }

    fn create(&self, input: &R::Input) -> Result<R> {
        let mut store = self.begin(Operation::Create)?;
        let record = R::from_input(store.next_id, input);
        store.next_id += 1;
        store.records.push(record.clone());
        Ok(record)
    }

    fn update(&self, id: R::Id, input: &R::Input) -> Result<R> {
        let mut store = self.begin(Operation::Update)?;
        let Some(slot) = store
            .records
            .iter_mut()
            .find(|record| record.id() == Some(id))
        else {
            bail!("{} {id} not found", R::KIND.singular());
        };
        *slot = R::from_input(R::raw_id(id), input);
        Ok(slot.clone())
    }

    fn delete(&self, id: R::Id) -> Result<()> {
        let mut store = self.begin(Operation::Delete)?;
        let before = store.records.len();
        store.records.retain(|record| record.id() != Some(id));
        if store.records.len() == before {
            bail!("{} {id} not found", R::KIND.singular());
        }
        Ok(())
    }
}

/// One fake endpoint per collection, seeded with the standard fixtures.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub categories: FakeApi<Category>,
    pub locations: FakeApi<Location>,
    pub equipment: FakeApi<Equipment>,
}

impl FakeBackend {
    pub fn seeded() -> Self {
        Self {
            categories: FakeApi::new(fixture_categories()),
            locations: FakeApi::new(fixture_locations()),
            equipment: FakeApi::new(fixture_equipment()),
        }
    }
}

fn named<T>(build: impl Fn(i64, &NamedInput) -> T, id: i64, name: &str, description: &str) -> T {
    build(
        id,
        &NamedInput {
            name: name.to_owned(),
            description: Some(description.to_owned()),
        },
    )
}

pub fn fixture_categories() -> Vec<Category> {
    vec![
        named(Category::from_input, 1, "電子機器", "パソコンやタブレットなど"),
        named(Category::from_input, 2, "家具", "デスクや椅子など"),
    ]
}

pub fn fixture_locations() -> Vec<Location> {
    vec![
        named(Location::from_input, 1, "東京オフィス", "東京本社"),
        named(Location::from_input, 2, "大阪オフィス", "大阪支社"),
    ]
}

pub fn fixture_equipment() -> Vec<Equipment> {
    vec![
        fixture_item(FixtureItem {
            id: 1,
            name: "ノートPC",
            serial: "PC001",
            date: (2023, Month::January, 1),
            price: 120_000,
            status: EquipmentStatus::Available,
            description: "デベロッパー用PC",
            category: (1, "電子機器"),
            location: (1, "東京オフィス"),
        }),
        fixture_item(FixtureItem {
            id: 2,
            name: "モニター",
            serial: "MN002",
            date: (2023, Month::February, 15),
            price: 35_000,
            status: EquipmentStatus::InUse,
            description: "ワイドスクリーン",
            category: (1, "電子機器"),
            location: (1, "東京オフィス"),
        }),
        fixture_item(FixtureItem {
            id: 3,
            name: "オフィスチェア",
            serial: "CH003",
            date: (2023, Month::March, 10),
            price: 25_000,
            status: EquipmentStatus::Broken,
            description: "肘掛け付き",
            category: (2, "家具"),
            location: (2, "大阪オフィス"),
        }),
    ]
}

struct FixtureItem {
    id: i64,
    name: &'static str,
    serial: &'static str,
    date: (i32, Month, u8),
    price: i64,
    status: EquipmentStatus,
    description: &'static str,
    category: (i64, &'static str),
    location: (i64, &'static str),
}

fn fixture_item(item: FixtureItem) -> Equipment {
    let (year, month, day) = item.date;
    Equipment {
        id: Some(EquipmentId::new(item.id)),
        name: item.name.to_owned(),
        serial_number: Some(item.serial.to_owned()),
        category: Some(CategoryId::new(item.category.0)),
        category_name: Some(item.category.1.to_owned()),
        location: Some(LocationId::new(item.location.0)),
        location_name: Some(item.location.1.to_owned()),
        purchase_date: Date::from_calendar_date(year, month, day).ok(),
        purchase_price_cents: Some(item.price * 100),
        status: item.status,
        description: Some(item.description.to_owned()),
    }
}

/// SplitMix64 stream. Only meant to spread generated fixtures around.
#[derive(Debug, Clone)]
struct SplitMix {
    state: u64,
}

impl SplitMix {
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(Self::GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform-enough index in `0..bound`; zero for empty or single ranges.
    fn below(&mut self, bound: usize) -> usize {
        match bound {
            0 | 1 => 0,
            _ => (self.next_u64() % bound as u64) as usize,
        }
    }

    fn percent(&mut self, chance: u64) -> bool {
        self.next_u64() % 100 < chance
    }
}

/// Seeded generator for larger equipment collections. The same seed and
/// lookups always produce the same list.
#[derive(Debug, Clone)]
pub struct InventoryFaker {
    rng: SplitMix,
    next_id: i64,
}

impl InventoryFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SplitMix::new(seed),
            next_id: 1,
        }
    }

    pub fn equipment(&mut self, categories: &[Category], locations: &[Location]) -> Equipment {
        let id = self.next_id;
        self.next_id += 1;

        let name = self.pick(&EQUIPMENT_NAMES).to_owned();
        let prefix = self.pick(&SERIAL_PREFIXES);
        let description = self.pick(&DESCRIPTIONS);
        let category = self.maybe_pick(categories);
        let location = self.maybe_pick(locations);
        let purchased = Date::from_calendar_date(2020, Month::January, 1)
            .ok()
            .and_then(|base| base.checked_add(Duration::days(self.rng.below(1_500) as i64)));
        let price_yen = self
            .rng
            .percent(60)
            .then(|| 1_000 + self.rng.below(500_000) as i64);

        Equipment {
            id: Some(EquipmentId::new(id)),
            name,
            serial_number: Some(format!("{prefix}{id:03}")),
            category: category.and_then(|category| category.id),
            category_name: category.map(|category| category.name.clone()),
            location: location.and_then(|location| location.id),
            location_name: location.map(|location| location.name.clone()),
            purchase_date: purchased,
            purchase_price_cents: price_yen.map(|yen| yen * 100),
            status: self.pick(&EquipmentStatus::ALL),
            description: (!description.is_empty()).then(|| description.to_owned()),
        }
    }

    pub fn equipment_list(
        &mut self,
        count: usize,
        categories: &[Category],
        locations: &[Location],
    ) -> Vec<Equipment> {
        (0..count)
            .map(|_| self.equipment(categories, locations))
            .collect()
    }

    fn pick<T: Copy>(&mut self, values: &[T]) -> T {
        values[self.rng.below(values.len())]
    }

    /// One in five records has no link, as do all records when nothing is loaded.
    fn maybe_pick<'a, T>(&mut self, values: &'a [T]) -> Option<&'a T> {
        if values.is_empty() || self.rng.below(5) == 0 {
            return None;
        }
        values.get(self.rng.below(values.len()))
    }
}
