//! Shared test doubles and fixtures.
//!
//! [`FakeStore`] is an in-memory [`RemoteStore`] that serves catalogue,
//! breed and ward lookups from seeded tables, records every call, and can
//! be told to reject creates for particular models or payloads.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use odk_odoo_bridge::catalogue::{CatalogueId, BREED_MODEL, CATALOGUE_ITEM_MODEL, WARD_MODEL};
use odk_odoo_bridge::gateway::{Condition, Payload, RecordId, RemoteStore, StoreFuture};
use odk_odoo_bridge::AppError;
use serde_json::{json, Value};

/// Rule rejecting a create call.
#[derive(Debug, Clone)]
struct CreateFailure {
    model: String,
    field: Option<(String, Value)>,
}

/// In-memory backend double.
#[derive(Default)]
pub struct FakeStore {
    catalogue: HashMap<(i64, String), RecordId>,
    breeds: HashMap<String, RecordId>,
    wards: HashMap<String, Payload>,
    create_failures: Vec<CreateFailure>,
    failing_search_models: Vec<String>,
    unreachable: bool,
    next_id: AtomicI64,
    attempts: Mutex<Vec<(String, Payload)>>,
    created: Mutex<Vec<(String, RecordId, Payload)>>,
    searches: Mutex<Vec<(String, Vec<Condition>)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn with_catalogue(mut self, catalogue: CatalogueId, code: &str, id: RecordId) -> Self {
        self.catalogue.insert((catalogue.id(), code.to_owned()), id);
        self
    }

    pub fn with_breed(mut self, code: &str, id: RecordId) -> Self {
        self.breeds.insert(code.to_owned(), id);
        self
    }

    pub fn with_ward(
        mut self,
        code: &str,
        county: RecordId,
        sub_county: RecordId,
        division: RecordId,
        ward: RecordId,
    ) -> Self {
        let row = json!({
            "id": ward,
            "county_id": [county, "County"],
            "sub_county_id": [sub_county, "Sub County"],
            "division_id": [division, "Division"],
        });
        if let Value::Object(row) = row {
            self.wards.insert(code.to_owned(), row);
        }
        self
    }

    /// Reject every create on `model`.
    pub fn failing_create(mut self, model: &str) -> Self {
        self.create_failures.push(CreateFailure {
            model: model.to_owned(),
            field: None,
        });
        self
    }

    /// Reject creates on `model` whose payload has `field == value`.
    pub fn failing_create_when(mut self, model: &str, field: &str, value: Value) -> Self {
        self.create_failures.push(CreateFailure {
            model: model.to_owned(),
            field: Some((field.to_owned(), value)),
        });
        self
    }

    /// Fail every `search_read` on `model` with an RPC error.
    pub fn failing_search(mut self, model: &str) -> Self {
        self.failing_search_models.push(model.to_owned());
        self
    }

    /// Make the health probe fail.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Seed a stored record so `read` can find it.
    pub fn insert_record(&self, model: &str, id: RecordId, payload: Payload) {
        self.created
            .lock()
            .unwrap()
            .push((model.to_owned(), id, payload));
    }

    /// Payloads successfully created on `model`, in call order.
    pub fn created(&self, model: &str) -> Vec<Payload> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _, _)| m == model)
            .map(|(_, _, p)| p.clone())
            .collect()
    }

    /// Create calls attempted on `model`, including rejected ones.
    pub fn attempts(&self, model: &str) -> Vec<Payload> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Total create calls attempted on any model.
    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Total `search_read` calls.
    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    /// `search_read` calls whose `code` condition equals `code`.
    pub fn searches_for_code(&self, code: &str) -> usize {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, conditions)| {
                conditions
                    .iter()
                    .any(|c| c.field == "code" && c.value == Value::from(code))
            })
            .count()
    }

    fn rejects(&self, model: &str, payload: &Payload) -> bool {
        self.create_failures.iter().any(|rule| {
            rule.model == model
                && rule
                    .field
                    .as_ref()
                    .is_none_or(|(field, value)| payload.get(field) == Some(value))
        })
    }

    fn lookup(&self, model: &str, conditions: &[Condition]) -> Vec<Payload> {
        let find = |name: &str| conditions.iter().find(|c| c.field == name).map(|c| &c.value);
        let code = find("code").and_then(Value::as_str).unwrap_or_default();
        let id_row = |id: RecordId| {
            let mut row = Payload::new();
            row.insert("id".into(), Value::from(id));
            row
        };

        match model {
            CATALOGUE_ITEM_MODEL => {
                let catalogue = find("catalogue_id").and_then(Value::as_i64).unwrap_or_default();
                self.catalogue
                    .get(&(catalogue, code.to_owned()))
                    .map(|id| vec![id_row(*id)])
                    .unwrap_or_default()
            }
            BREED_MODEL => self
                .breeds
                .get(code)
                .map(|id| vec![id_row(*id)])
                .unwrap_or_default(),
            WARD_MODEL => self.wards.get(code).cloned().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl RemoteStore for FakeStore {
    fn create<'a>(&'a self, model: &'a str, payload: Payload) -> StoreFuture<'a, RecordId> {
        Box::pin(async move {
            self.attempts
                .lock()
                .unwrap()
                .push((model.to_owned(), payload.clone()));
            if self.rejects(model, &payload) {
                return Err(AppError::Rpc(format!("{model}: record rejected by backend")));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.created
                .lock()
                .unwrap()
                .push((model.to_owned(), id, payload));
            Ok(id)
        })
    }

    fn search_read<'a>(
        &'a self,
        model: &'a str,
        conditions: Vec<Condition>,
        _fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>> {
        Box::pin(async move {
            self.searches
                .lock()
                .unwrap()
                .push((model.to_owned(), conditions.clone()));
            if self.failing_search_models.iter().any(|m| m == model) {
                return Err(AppError::Rpc(format!("{model}: search failed")));
            }
            Ok(self.lookup(model, &conditions))
        })
    }

    fn read<'a>(
        &'a self,
        model: &'a str,
        ids: Vec<RecordId>,
        fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>> {
        Box::pin(async move {
            let created = self.created.lock().unwrap();
            Ok(created
                .iter()
                .filter(|(m, id, _)| m == model && ids.contains(id))
                .map(|(_, id, payload)| {
                    let mut row = Payload::new();
                    row.insert("id".into(), Value::from(*id));
                    for field in fields {
                        if let Some(value) = payload.get(*field) {
                            row.insert((*field).to_owned(), value.clone());
                        }
                    }
                    row
                })
                .collect())
        })
    }

    fn server_version(&self) -> StoreFuture<'_, String> {
        Box::pin(async move {
            if self.unreachable {
                Err(AppError::Http("connection refused".into()))
            } else {
                Ok("17.0".to_owned())
            }
        })
    }
}

/// Store seeded with every code used by [`sample_submission`].
pub fn seeded_store() -> FakeStore {
    FakeStore::new()
        .with_ward("W-1203", 1, 12, 120, 1203)
        .with_catalogue(CatalogueId::Gender, "female", 201)
        .with_catalogue(CatalogueId::AgeGroup, "36_50", 301)
        .with_catalogue(CatalogueId::FarmType, "smallholder", 401)
        .with_catalogue(CatalogueId::NutritionalPlan, "zero_grazing", 501)
        .with_catalogue(CatalogueId::Species, "bovine", 2101)
        .with_catalogue(CatalogueId::AnimalType, "cow", 1401)
        .with_catalogue(CatalogueId::YesNo, "yes", 11)
        .with_catalogue(CatalogueId::YesNo, "no", 12)
        .with_catalogue(CatalogueId::Sex, "female", 601)
        .with_catalogue(CatalogueId::VaccineType, "fmd", 1201)
        .with_catalogue(CatalogueId::Disease, "fmd", 1101)
        .with_catalogue(CatalogueId::DewormerType, "albendazole", 1301)
        .with_breed("friesian", 77)
}

/// One animal entry with the given tag and nested groups.
pub fn animal_entry(tag: &str, vaccinations: Vec<Value>, dewormings: Vec<Value>) -> Value {
    let mut entry = json!({
        "animal_details/animal_tag": tag,
        "animal_details/species": "bovine",
        "animal_details/animal_type": "cow",
        "animal_details/breed": "friesian",
        "animal_details/sex": "female",
        "animal_details/age_months": "48",
        "animal_details/weight_kg": "412.5",
        "animal_details/breeding/is_pregnant": "yes",
        "animal_details/calving/last_calving_date": "2023-11-02",
        "animal_details/exam/temperature_c": 38.6,
    });
    if let Value::Object(ref mut map) = entry {
        if !vaccinations.is_empty() {
            map.insert("animal_details/vaccinations".into(), Value::Array(vaccinations));
        }
        if !dewormings.is_empty() {
            map.insert("animal_details/dewormings".into(), Value::Array(dewormings));
        }
    }
    entry
}

pub fn vaccination_entry() -> Value {
    json!({
        "animal_details/vaccinations/vaccination_date": "2024-02-14",
        "animal_details/vaccinations/vaccine_type": "fmd",
        "animal_details/vaccinations/disease": "fmd",
        "animal_details/vaccinations/batch_number": "B-2231",
    })
}

pub fn deworming_entry() -> Value {
    json!({
        "animal_details/dewormings/deworming_date": "2024-01-20",
        "animal_details/dewormings/dewormer_type": "albendazole",
        "animal_details/dewormings/dose_ml": "20",
    })
}

/// Submission with farmer details and the given animal entries.
pub fn submission_with(animals: Vec<Value>) -> Value {
    json!({
        "farmer/farmer_name": "Grace Wanjiru",
        "farmer/phone_number": "+254712000111",
        "farmer/gender": "female",
        "farmer/age_group": "36_50",
        "farm/farm_type": "smallholder",
        "farm/nutritional_plan": "zero_grazing",
        "farm/herd_size": "6",
        "location/ward": "W-1203",
        "location/village": "Kiamariga",
        "visit/visit_date": "2024-03-05",
        "meta/instanceID": "uuid:5b0c7d8e-1111-4c3b-9a51-7d2b1e0f9a01",
        "animal_details": animals,
    })
}

/// Submission with one fully vaccinated and dewormed animal.
pub fn sample_submission() -> Value {
    submission_with(vec![animal_entry(
        "KE-001",
        vec![vaccination_entry()],
        vec![deworming_entry()],
    )])
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}
