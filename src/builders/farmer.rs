//! Farmer (client) record.

use chrono::NaiveDate;
use serde_json::Value;

use super::{apply_spec, coded, format_date, optional_id, raw, resolve_coded_fields, Kind, RecordSpec, ResolvedRefs};
use crate::catalogue::{AdminUnitChain, CatalogueId, CatalogueResolver, Lookup};
use crate::extract::Submission;
use crate::gateway::{Payload, RecordId};
use crate::Result;

/// Submission key of the ward choice used for the administrative chain.
pub const WARD_PATH: &str = "location/ward";

/// Submission key of the visit date, defaulted to today when absent.
pub const VISIT_DATE_PATH: &str = "visit/visit_date";

/// Farmer field layout.
pub const FARMER_SPEC: RecordSpec = RecordSpec {
    model: "health.farmer",
    raw: &[
        raw("farmer/farmer_name", "name", Kind::Text),
        raw("farmer/phone_number", "phone", Kind::Text),
        raw("farmer/id_number", "national_id", Kind::Text),
        raw("farmer/email", "email", Kind::Text),
        raw("location/village", "village", Kind::Text),
        raw("location/gps", "gps_location", Kind::Text),
        raw("farm/herd_size", "herd_size", Kind::Integer),
        raw("farm/farm_size_acres", "farm_size_acres", Kind::Number),
        raw("visit/officer_name", "officer_name", Kind::Text),
        raw("visit/visit_purpose", "visit_purpose", Kind::Text),
        raw("meta/instanceID", "odk_instance_id", Kind::Text),
    ],
    coded: &[
        coded("farmer/gender", "gender_id", CatalogueId::Gender),
        coded("farmer/age_group", "age_group_id", CatalogueId::AgeGroup),
        coded("farm/farm_type", "farm_type_id", CatalogueId::FarmType),
        coded("farm/nutritional_plan", "nutritional_plan_id", CatalogueId::NutritionalPlan),
        coded("farm/water_source", "water_source_id", CatalogueId::WaterSource),
    ],
};

/// References resolved for the farmer record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmerRefs {
    /// Administrative chain of the farmer's ward.
    pub admin: AdminUnitChain,
    /// Whether a supplied ward code matched nothing.
    pub ward_missing: bool,
    /// Coded attributes.
    pub codes: ResolvedRefs,
}

/// Resolve the ward chain and coded attributes of the farmer section.
///
/// # Errors
///
/// Returns the store error if any lookup query fails.
pub async fn resolve_farmer_refs(
    submission: &Submission,
    resolver: &CatalogueResolver<'_>,
) -> Result<FarmerRefs> {
    let ward_code = submission.code(WARD_PATH);
    let (admin, ward_missing) = match resolver.resolve_admin_unit(ward_code.as_deref()).await? {
        Lookup::Found(chain) => (chain, false),
        Lookup::NotFound => (AdminUnitChain::default(), true),
        Lookup::Skipped => (AdminUnitChain::default(), false),
    };

    let mut codes = resolve_coded_fields(submission, &FARMER_SPEC, resolver).await?;
    if ward_missing {
        if let Some(code) = ward_code.as_deref() {
            codes.note_miss(WARD_PATH, code);
        }
    }

    Ok(FarmerRefs {
        admin,
        ward_missing,
        codes,
    })
}

/// Assemble the farmer payload.
#[must_use]
pub fn build_farmer(
    submission: &Submission,
    refs: &FarmerRefs,
    submission_id: RecordId,
    today: NaiveDate,
) -> Payload {
    let mut payload = apply_spec(submission, &FARMER_SPEC, &refs.codes);

    payload.insert("county_id".into(), optional_id(refs.admin.level1));
    payload.insert("sub_county_id".into(), optional_id(refs.admin.level2));
    payload.insert("division_id".into(), optional_id(refs.admin.level3));
    payload.insert("ward_id".into(), optional_id(refs.admin.level4));

    let visit_date = submission.date_or(VISIT_DATE_PATH, today);
    payload.insert("visit_date".into(), Value::from(format_date(visit_date)));
    payload.insert("odk_submission_id".into(), Value::from(submission_id));
    payload
}
