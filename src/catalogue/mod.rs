//! Reference catalogues and code resolution.

pub mod resolver;

pub use resolver::{AdminUnitChain, CatalogueResolver, Lookup, Resolution};

/// Backend model holding catalogue items (id, code, name, active).
pub const CATALOGUE_ITEM_MODEL: &str = "health.catalogue.item";

/// Backend model holding animal breeds, keyed by breed code.
pub const BREED_MODEL: &str = "health.animal.breed";

/// Backend model holding wards with their administrative ancestors.
pub const WARD_MODEL: &str = "health.admin.ward";

/// Catalogue identifiers as configured in the backend.
///
/// Each value is the `catalogue_id` of a reference table; the numbers are
/// fixed by the backend data and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum CatalogueId {
    /// Generic yes/no answers.
    YesNo = 1,
    /// Farmer gender.
    Gender = 2,
    /// Farmer age bracket.
    AgeGroup = 3,
    /// Farm production system.
    FarmType = 4,
    /// Feeding / nutritional plan.
    NutritionalPlan = 5,
    /// Animal sex.
    Sex = 6,
    /// Body condition score.
    BodyCondition = 7,
    /// Observed heat signs.
    HeatSigns = 8,
    /// Natural service, AI, embryo transfer.
    BreedingMethod = 9,
    /// Calving ease score.
    CalvingEase = 10,
    /// Disease taxonomy.
    Disease = 11,
    /// Vaccine types.
    VaccineType = 12,
    /// Dewormer products.
    DewormerType = 13,
    /// Animal type (cow, heifer, bull, calf, ...).
    AnimalType = 14,
    /// Clinical signs found on examination.
    ClinicalSign = 15,
    /// Laboratory test types.
    LabTest = 16,
    /// Laboratory result classes.
    LabResult = 17,
    /// Dentition / age by teeth.
    Dentition = 18,
    /// Lameness score.
    LamenessScore = 19,
    /// Temperament score.
    Temperament = 20,
    /// Species.
    Species = 21,
    /// Housing system.
    Housing = 22,
    /// Main feed type.
    FeedType = 23,
    /// Treatment outcome.
    TreatmentOutcome = 24,
    /// Drinking water source.
    WaterSource = 25,
}

impl CatalogueId {
    /// Numeric identifier sent in catalogue queries.
    #[must_use]
    pub fn id(self) -> i64 {
        self as i64
    }
}
