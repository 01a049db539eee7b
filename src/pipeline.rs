//! Multi-step save pipeline.
//!
//! Submission → farmer → animals → vaccinations/dewormings, each step
//! depending on the identifier created by the previous one. The archive
//! and farmer steps halt the run on failure; inside the animal loop every
//! entry (and every nested record) succeeds or fails on its own. Every
//! outcome, including unexpected failures, is returned as an
//! [`ApiResponse`]. Nothing is retried.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::{error, info, info_span, warn, Instrument};

use crate::builders::animal::{build_animal, entry_label, ANIMAL_GROUP, ANIMAL_SPEC};
use crate::builders::farmer::{build_farmer, resolve_farmer_refs, FARMER_SPEC};
use crate::builders::submission::{build_submission, parse_blob, BLOB_FIELD, SUBMISSION_MODEL};
use crate::builders::treatment::{
    build_deworming, build_vaccination, DEWORMING_GROUP, DEWORMING_SPEC, VACCINATION_GROUP,
    VACCINATION_SPEC,
};
use crate::builders::{resolve_coded_fields, RecordSpec, ResolvedRefs, UnresolvedCode};
use crate::catalogue::CatalogueResolver;
use crate::extract::Submission;
use crate::gateway::{Payload, RecordId, RemoteStore};
use crate::models::report::{AnimalOutcome, PipelineStage, SaveReport};
use crate::models::response::ApiResponse;
use crate::{AppError, Result};

/// Builds a nested record payload for a given parent animal.
type ChildBuilder = fn(&Submission, &ResolvedRefs, RecordId) -> Payload;

/// Save pipeline bound to one backend store.
#[derive(Clone)]
pub struct SavePipeline {
    store: Arc<dyn RemoteStore>,
}

impl SavePipeline {
    /// Create a pipeline writing through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Backend store used by this pipeline.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Process one webhook body, defaulting missing visit dates to today.
    pub async fn process(&self, body: &[u8]) -> ApiResponse {
        self.process_on(body, Local::now().date_naive()).await
    }

    /// Process one webhook body with an explicit "today".
    pub async fn process_on(&self, body: &[u8], today: NaiveDate) -> ApiResponse {
        let span = info_span!("save_submission", bytes = body.len());
        async move {
            let mut report = SaveReport::new();

            let submission = match Submission::parse(body) {
                Ok(submission) => submission,
                Err(err) => {
                    warn!(%err, "rejected submission body");
                    report.advance(PipelineStage::Failed);
                    return ApiResponse::from(&err);
                }
            };

            match self.run(&submission, today, &mut report).await {
                Ok(()) => completed(&report),
                Err((step, err)) => {
                    error!(step, %err, "pipeline halted");
                    report.advance(PipelineStage::Failed);
                    let response = ApiResponse::bad_request(format!(
                        "Failed to save {step}: {}",
                        err.message()
                    ));
                    match serde_json::to_value(&report) {
                        Ok(data) => response.with_data(data),
                        Err(_) => response,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        submission: &Submission,
        today: NaiveDate,
        report: &mut SaveReport,
    ) -> std::result::Result<(), (&'static str, AppError)> {
        // ── Archive raw submission ──────────────────────────
        let submission_id = self
            .save_submission(submission)
            .await
            .map_err(|err| ("submission", err))?;
        report.submission_id = Some(submission_id);
        report.advance(PipelineStage::SubmissionSaved);
        info!(submission_id, "submission archived");

        let resolver = CatalogueResolver::new(self.store.as_ref());

        // ── Farmer ──────────────────────────────────────────
        let farmer_id = self
            .save_farmer(submission, &resolver, submission_id, today, &mut report.unresolved)
            .await
            .map_err(|err| ("farmer", err))?;
        report.farmer_id = Some(farmer_id);
        report.advance(PipelineStage::FarmerSaved);
        info!(farmer_id, "farmer saved");

        // ── Animals and nested records ──────────────────────
        for (index, entry) in submission.repeat(ANIMAL_GROUP).iter().enumerate() {
            let outcome = self
                .save_animal(entry, index, farmer_id, &resolver, &mut report.unresolved)
                .await;
            report.animals.push(outcome);
        }
        report.advance(PipelineStage::AnimalsSaved);
        report.advance(PipelineStage::Done);
        Ok(())
    }

    async fn save_submission(&self, submission: &Submission) -> Result<RecordId> {
        let payload = build_submission(submission.as_map())?;
        self.store.create(SUBMISSION_MODEL, payload).await
    }

    async fn save_farmer(
        &self,
        submission: &Submission,
        resolver: &CatalogueResolver<'_>,
        submission_id: RecordId,
        today: NaiveDate,
        unresolved: &mut Vec<UnresolvedCode>,
    ) -> Result<RecordId> {
        let refs = resolve_farmer_refs(submission, resolver).await?;
        unresolved.extend_from_slice(refs.codes.misses());
        let payload = build_farmer(submission, &refs, submission_id, today);
        self.store.create(FARMER_SPEC.model, payload).await
    }

    async fn save_animal(
        &self,
        entry: &Submission,
        index: usize,
        farmer_id: RecordId,
        resolver: &CatalogueResolver<'_>,
        unresolved: &mut Vec<UnresolvedCode>,
    ) -> AnimalOutcome {
        let label = entry_label(entry, index);
        let mut outcome = AnimalOutcome {
            label: label.clone(),
            ..AnimalOutcome::default()
        };

        let created = async {
            let refs = resolve_coded_fields(entry, &ANIMAL_SPEC, resolver).await?;
            unresolved.extend_from_slice(refs.misses());
            let payload = build_animal(entry, &refs, farmer_id);
            self.store.create(ANIMAL_SPEC.model, payload).await
        }
        .await;

        let animal_id = match created {
            Ok(id) => id,
            Err(err) => {
                warn!(animal = %label, %err, "animal entry failed; continuing with next entry");
                outcome.errors.push(format!("animal {label}: {}", err.message()));
                return outcome;
            }
        };
        outcome.animal_id = Some(animal_id);
        info!(animal = %label, animal_id, "animal saved");

        for (i, item) in entry.repeat(VACCINATION_GROUP).iter().enumerate() {
            match self
                .save_child(item, &VACCINATION_SPEC, build_vaccination, animal_id, resolver, unresolved)
                .await
            {
                Ok(id) => outcome.vaccination_ids.push(id),
                Err(err) => {
                    warn!(animal = %label, entry = i + 1, %err, "vaccination entry failed");
                    outcome
                        .errors
                        .push(format!("vaccination #{} of {label}: {}", i + 1, err.message()));
                }
            }
        }

        for (i, item) in entry.repeat(DEWORMING_GROUP).iter().enumerate() {
            match self
                .save_child(item, &DEWORMING_SPEC, build_deworming, animal_id, resolver, unresolved)
                .await
            {
                Ok(id) => outcome.deworming_ids.push(id),
                Err(err) => {
                    warn!(animal = %label, entry = i + 1, %err, "deworming entry failed");
                    outcome
                        .errors
                        .push(format!("deworming #{} of {label}: {}", i + 1, err.message()));
                }
            }
        }

        outcome
    }

    async fn save_child(
        &self,
        item: &Submission,
        spec: &RecordSpec,
        build: ChildBuilder,
        animal_id: RecordId,
        resolver: &CatalogueResolver<'_>,
        unresolved: &mut Vec<UnresolvedCode>,
    ) -> Result<RecordId> {
        let refs = resolve_coded_fields(item, spec, resolver).await?;
        unresolved.extend_from_slice(refs.misses());
        self.store.create(spec.model, build(item, &refs, animal_id)).await
    }
}

fn completed(report: &SaveReport) -> ApiResponse {
    let failed = report.failed_entries();
    let message = if failed == 0 {
        "Submission processed successfully".to_owned()
    } else {
        format!(
            "Submission processed; {failed} of {} animal entries had errors",
            report.animals.len()
        )
    };
    info!(
        animals = report.animals.len(),
        failed,
        unresolved = report.unresolved.len(),
        "submission processed"
    );
    ApiResponse::success(message, serde_json::to_value(report).ok())
}

/// Read an archived submission back and return it parsed.
pub async fn fetch_submission(store: &dyn RemoteStore, id: RecordId) -> ApiResponse {
    let result = async {
        let rows = store.read(SUBMISSION_MODEL, vec![id], &[BLOB_FIELD]).await?;
        let blob = rows
            .first()
            .and_then(|row| row.get(BLOB_FIELD))
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::NotFound(format!("submission {id} not found")))?;
        parse_blob(blob)
    }
    .await;

    match result {
        Ok(data) => ApiResponse::success("Submission retrieved", Some(data)),
        Err(err) => {
            warn!(id, %err, "submission read failed");
            ApiResponse::from(&err)
        }
    }
}
