//! Vaccination and deworming records nested under an animal entry.

use serde_json::Value;

use super::{apply_spec, coded, raw, Kind, RecordSpec, ResolvedRefs};
use crate::catalogue::CatalogueId;
use crate::extract::Submission;
use crate::gateway::{Payload, RecordId};

/// Repeat group of vaccinations inside an animal entry.
pub const VACCINATION_GROUP: &str = "animal_details/vaccinations";

/// Repeat group of dewormings inside an animal entry.
pub const DEWORMING_GROUP: &str = "animal_details/dewormings";

/// Vaccination field layout.
pub const VACCINATION_SPEC: RecordSpec = RecordSpec {
    model: "health.animal.vaccination",
    raw: &[
        raw("animal_details/vaccinations/vaccination_date", "vaccination_date", Kind::Date),
        raw("animal_details/vaccinations/batch_number", "batch_number", Kind::Text),
        raw("animal_details/vaccinations/dose_ml", "dose_ml", Kind::Number),
        raw("animal_details/vaccinations/administered_by", "administered_by", Kind::Text),
        raw("animal_details/vaccinations/next_due_date", "next_due_date", Kind::Date),
    ],
    coded: &[
        coded("animal_details/vaccinations/vaccine_type", "vaccine_type_id", CatalogueId::VaccineType),
        coded("animal_details/vaccinations/disease", "disease_id", CatalogueId::Disease),
    ],
};

/// Deworming field layout.
pub const DEWORMING_SPEC: RecordSpec = RecordSpec {
    model: "health.animal.deworming",
    raw: &[
        raw("animal_details/dewormings/deworming_date", "deworming_date", Kind::Date),
        raw("animal_details/dewormings/dose_ml", "dose_ml", Kind::Number),
        raw("animal_details/dewormings/administered_by", "administered_by", Kind::Text),
        raw("animal_details/dewormings/next_due_date", "next_due_date", Kind::Date),
    ],
    coded: &[coded(
        "animal_details/dewormings/dewormer_type",
        "dewormer_type_id",
        CatalogueId::DewormerType,
    )],
};

/// Assemble one vaccination payload owned by `animal_id`.
#[must_use]
pub fn build_vaccination(entry: &Submission, refs: &ResolvedRefs, animal_id: RecordId) -> Payload {
    with_animal(apply_spec(entry, &VACCINATION_SPEC, refs), animal_id)
}

/// Assemble one deworming payload owned by `animal_id`.
#[must_use]
pub fn build_deworming(entry: &Submission, refs: &ResolvedRefs, animal_id: RecordId) -> Payload {
    with_animal(apply_spec(entry, &DEWORMING_SPEC, refs), animal_id)
}

fn with_animal(mut payload: Payload, animal_id: RecordId) -> Payload {
    payload.insert("animal_id".into(), Value::from(animal_id));
    payload
}
