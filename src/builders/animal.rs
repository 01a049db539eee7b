//! Animal record, one per entry of the animal repeat group.

use serde_json::Value;

use super::{apply_spec, coded, raw, CodedField, Kind, RecordSpec, ResolvedRefs, Source};
use crate::catalogue::CatalogueId;
use crate::extract::Submission;
use crate::gateway::{Payload, RecordId};

/// Repeat group holding one entry per examined animal.
pub const ANIMAL_GROUP: &str = "animal_details";

/// Submission key of the animal's ear tag, used to label log lines.
pub const TAG_PATH: &str = "animal_details/animal_tag";

/// Animal field layout.
pub const ANIMAL_SPEC: RecordSpec = RecordSpec {
    model: "health.animal",
    raw: &[
        // identification
        raw("animal_details/animal_tag", "tag_number", Kind::Text),
        raw("animal_details/animal_name", "name", Kind::Text),
        raw("animal_details/date_of_birth", "date_of_birth", Kind::Date),
        raw("animal_details/age_months", "age_months", Kind::Integer),
        raw("animal_details/colour", "colour", Kind::Text),
        raw("animal_details/weight_kg", "weight", Kind::Number),
        raw("animal_details/heart_girth_cm", "heart_girth", Kind::Number),
        raw("animal_details/purchase_date", "purchase_date", Kind::Date),
        raw("animal_details/source_of_animal", "source", Kind::Text),
        raw("animal_details/dam_tag", "dam_tag", Kind::Text),
        raw("animal_details/sire_tag", "sire_tag", Kind::Text),
        // heat history
        raw("animal_details/heat/last_heat_date", "last_heat_date", Kind::Date),
        raw("animal_details/heat/heat_interval_days", "heat_interval_days", Kind::Integer),
        raw("animal_details/heat/heat_duration_hours", "heat_duration_hours", Kind::Number),
        raw("animal_details/heat/heat_notes", "heat_notes", Kind::Text),
        // calving history
        raw("animal_details/calving/last_calving_date", "last_calving_date", Kind::Date),
        raw("animal_details/calving/number_of_calvings", "parity", Kind::Integer),
        raw("animal_details/calving/calving_interval_days", "calving_interval_days", Kind::Integer),
        raw("animal_details/calving/calving_complications", "calving_complications", Kind::Text),
        raw("animal_details/calving/days_in_milk", "days_in_milk", Kind::Integer),
        raw("animal_details/calving/milk_yield_litres", "milk_yield", Kind::Number),
        // breeding history
        raw("animal_details/breeding/last_service_date", "last_service_date", Kind::Date),
        raw("animal_details/breeding/number_of_services", "number_of_services", Kind::Integer),
        raw("animal_details/breeding/semen_code", "semen_code", Kind::Text),
        raw("animal_details/breeding/inseminator_name", "inseminator_name", Kind::Text),
        raw("animal_details/breeding/expected_calving_date", "expected_calving_date", Kind::Date),
        raw("animal_details/breeding/pregnancy_diagnosis_date", "pregnancy_diagnosis_date", Kind::Date),
        // fertility
        raw("animal_details/fertility/abortions", "abortion_count", Kind::Integer),
        raw("animal_details/fertility/retained_placenta", "retained_placenta_count", Kind::Integer),
        raw("animal_details/fertility/days_open", "days_open", Kind::Integer),
        raw("animal_details/fertility/fertility_notes", "fertility_notes", Kind::Text),
        // disease history
        raw("animal_details/disease/last_illness_date", "last_illness_date", Kind::Date),
        raw("animal_details/disease/illness_description", "illness_description", Kind::Text),
        raw("animal_details/disease/previous_treatment", "previous_treatment", Kind::Text),
        raw("animal_details/disease/mastitis_cases", "mastitis_cases", Kind::Integer),
        // physical examination
        raw("animal_details/exam/temperature_c", "temperature", Kind::Number),
        raw("animal_details/exam/pulse_rate", "pulse_rate", Kind::Integer),
        raw("animal_details/exam/respiration_rate", "respiration_rate", Kind::Integer),
        raw("animal_details/exam/rumen_motility", "rumen_motility", Kind::Integer),
        raw("animal_details/exam/mucous_membrane", "mucous_membrane", Kind::Text),
        raw("animal_details/exam/lymph_nodes", "lymph_nodes", Kind::Text),
        raw("animal_details/exam/udder_findings", "udder_findings", Kind::Text),
        raw("animal_details/exam/hoof_findings", "hoof_findings", Kind::Text),
        raw("animal_details/exam/skin_coat", "skin_coat", Kind::Text),
        raw("animal_details/exam/eye_findings", "eye_findings", Kind::Text),
        raw("animal_details/exam/exam_notes", "exam_notes", Kind::Text),
        // laboratory
        raw("animal_details/lab/sample_date", "sample_date", Kind::Date),
        raw("animal_details/lab/sample_type", "sample_type", Kind::Text),
        raw("animal_details/lab/lab_reference", "lab_reference", Kind::Text),
        raw("animal_details/lab/lab_findings", "lab_findings", Kind::Text),
        // treatment
        raw("animal_details/treatment/diagnosis", "diagnosis", Kind::Text),
        raw("animal_details/treatment/treatment_date", "treatment_date", Kind::Date),
        raw("animal_details/treatment/drug_administered", "drug_administered", Kind::Text),
        raw("animal_details/treatment/dosage", "dosage", Kind::Text),
        raw("animal_details/treatment/route", "treatment_route", Kind::Text),
        raw("animal_details/treatment/withdrawal_days", "withdrawal_days", Kind::Integer),
        raw("animal_details/treatment/follow_up_date", "follow_up_date", Kind::Date),
        raw("animal_details/treatment/treatment_cost", "treatment_cost", Kind::Number),
        raw("animal_details/remarks", "remarks", Kind::Text),
    ],
    coded: &[
        coded("animal_details/species", "species_id", CatalogueId::Species),
        coded("animal_details/animal_type", "animal_type_id", CatalogueId::AnimalType),
        CodedField {
            path: "animal_details/breed",
            target: "breed_id",
            source: Source::Breed,
        },
        coded("animal_details/sex", "sex_id", CatalogueId::Sex),
        coded("animal_details/body_condition", "body_condition_id", CatalogueId::BodyCondition),
        coded("animal_details/dentition", "dentition_id", CatalogueId::Dentition),
        coded("animal_details/temperament", "temperament_id", CatalogueId::Temperament),
        coded("animal_details/housing", "housing_id", CatalogueId::Housing),
        coded("animal_details/feed_type", "feed_type_id", CatalogueId::FeedType),
        coded("animal_details/heat/shows_heat", "shows_heat_id", CatalogueId::YesNo),
        coded("animal_details/heat/heat_signs", "heat_signs_id", CatalogueId::HeatSigns),
        coded("animal_details/calving/calving_ease", "calving_ease_id", CatalogueId::CalvingEase),
        coded("animal_details/breeding/breeding_method", "breeding_method_id", CatalogueId::BreedingMethod),
        coded("animal_details/breeding/is_pregnant", "is_pregnant_id", CatalogueId::YesNo),
        coded("animal_details/disease/has_disease_history", "has_disease_history_id", CatalogueId::YesNo),
        coded("animal_details/disease/previous_disease", "previous_disease_id", CatalogueId::Disease),
        coded("animal_details/exam/lameness", "lameness_id", CatalogueId::LamenessScore),
        coded("animal_details/exam/clinical_sign", "clinical_sign_id", CatalogueId::ClinicalSign),
        coded("animal_details/lab/lab_test", "lab_test_id", CatalogueId::LabTest),
        coded("animal_details/lab/lab_result", "lab_result_id", CatalogueId::LabResult),
        coded("animal_details/treatment/outcome", "treatment_outcome_id", CatalogueId::TreatmentOutcome),
        coded("animal_details/is_vaccinated", "is_vaccinated_id", CatalogueId::YesNo),
        coded("animal_details/is_dewormed", "is_dewormed_id", CatalogueId::YesNo),
    ],
};

/// Assemble the payload for one animal entry owned by `farmer_id`.
#[must_use]
pub fn build_animal(entry: &Submission, refs: &ResolvedRefs, farmer_id: RecordId) -> Payload {
    let mut payload = apply_spec(entry, &ANIMAL_SPEC, refs);
    payload.insert("farmer_id".into(), Value::from(farmer_id));
    payload
}

/// Human label for an animal entry: its tag, or its position.
#[must_use]
pub fn entry_label(entry: &Submission, index: usize) -> String {
    entry
        .text(TAG_PATH)
        .unwrap_or_else(|| format!("#{}", index + 1))
}
