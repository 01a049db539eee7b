//! Record builders: submission fragment + resolved references → payload.
//!
//! Every entity is described by a [`RecordSpec`]: the raw answers copied
//! across with light typing, and the coded answers that must first be
//! resolved to reference ids. Resolution ([`resolve_coded_fields`]) is the
//! only step that talks to the backend; building ([`apply_spec`]) is pure.

pub mod animal;
pub mod farmer;
pub mod submission;
pub mod treatment;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::catalogue::{CatalogueId, CatalogueResolver, Resolution};
use crate::extract::Submission;
use crate::gateway::{Payload, RecordId};
use crate::Result;

/// How a raw answer is typed before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Free text.
    Text,
    /// Decimal number.
    Number,
    /// Whole number.
    Integer,
    /// Calendar date, sent as `YYYY-MM-DD`.
    Date,
}

/// Raw answer copied into the payload.
#[derive(Debug, Clone, Copy)]
pub struct RawField {
    /// Key path in the submission.
    pub path: &'static str,
    /// Backend field name.
    pub target: &'static str,
    /// Typing applied on extraction.
    pub kind: Kind,
}

/// Reference table a coded answer resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Generic catalogue item.
    Catalogue(CatalogueId),
    /// Breed table.
    Breed,
}

/// Coded answer resolved to a many2one reference.
#[derive(Debug, Clone, Copy)]
pub struct CodedField {
    /// Key path in the submission.
    pub path: &'static str,
    /// Backend many2one field name.
    pub target: &'static str,
    /// Table the code is looked up in.
    pub source: Source,
}

/// Field layout of one backend entity.
#[derive(Debug, Clone, Copy)]
pub struct RecordSpec {
    /// Backend model name.
    pub model: &'static str,
    /// Raw answers.
    pub raw: &'static [RawField],
    /// Coded answers.
    pub coded: &'static [CodedField],
}

pub(crate) const fn raw(path: &'static str, target: &'static str, kind: Kind) -> RawField {
    RawField { path, target, kind }
}

pub(crate) const fn coded(path: &'static str, target: &'static str, catalogue: CatalogueId) -> CodedField {
    CodedField {
        path,
        target,
        source: Source::Catalogue(catalogue),
    }
}

/// A supplied code that matched no reference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedCode {
    /// Submission key path of the answer.
    pub path: String,
    /// The code as answered.
    pub code: String,
}

/// Reference ids resolved for one fragment, keyed by backend field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRefs {
    ids: HashMap<&'static str, Option<RecordId>>,
    misses: Vec<UnresolvedCode>,
}

impl ResolvedRefs {
    /// Record the outcome for `target`.
    pub fn insert(&mut self, target: &'static str, resolution: Resolution) {
        self.ids.insert(target, resolution.found());
    }

    /// Record a supplied code that matched nothing.
    pub fn note_miss(&mut self, path: &str, code: &str) {
        self.misses.push(UnresolvedCode {
            path: path.to_owned(),
            code: code.to_owned(),
        });
    }

    /// Resolved id for `target`, if any.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<RecordId> {
        self.ids.get(target).copied().flatten()
    }

    /// Codes that were supplied but not found.
    #[must_use]
    pub fn misses(&self) -> &[UnresolvedCode] {
        &self.misses
    }
}

/// Resolve every coded answer of `spec` present in `entry`.
///
/// Absent answers resolve to nothing without touching the store; supplied
/// codes that match nothing are listed in [`ResolvedRefs::misses`].
///
/// # Errors
///
/// Returns the store error of the first lookup whose query fails.
pub async fn resolve_coded_fields(
    entry: &Submission,
    spec: &RecordSpec,
    resolver: &CatalogueResolver<'_>,
) -> Result<ResolvedRefs> {
    let mut refs = ResolvedRefs::default();
    for field in spec.coded {
        let code = entry.code(field.path);
        let resolution = match field.source {
            Source::Catalogue(catalogue) => resolver.resolve(catalogue, code.as_deref()).await?,
            Source::Breed => resolver.resolve_breed(code.as_deref()).await?,
        };
        if let (true, Some(code)) = (resolution.is_miss(), code.as_deref()) {
            refs.note_miss(field.path, code);
        }
        refs.insert(field.target, resolution);
    }
    Ok(refs)
}

/// Copy raw answers and resolved references of `spec` into a payload.
///
/// Absent raw answers are left out so backend defaults apply; coded
/// answers always appear, as `null` when unresolved.
#[must_use]
pub fn apply_spec(entry: &Submission, spec: &RecordSpec, refs: &ResolvedRefs) -> Payload {
    let mut payload = Payload::new();
    for field in spec.raw {
        if let Some(value) = raw_value(entry, field) {
            payload.insert(field.target.to_owned(), value);
        }
    }
    for field in spec.coded {
        payload.insert(field.target.to_owned(), optional_id(refs.get(field.target)));
    }
    payload
}

fn raw_value(entry: &Submission, field: &RawField) -> Option<Value> {
    match field.kind {
        Kind::Text => entry.text(field.path).map(Value::from),
        Kind::Number => entry.number(field.path).map(Value::from),
        Kind::Integer => entry.integer(field.path).map(Value::from),
        Kind::Date => entry.date(field.path).map(|d| Value::from(format_date(d))),
    }
}

/// Backend date format.
#[must_use]
pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn optional_id(id: Option<RecordId>) -> Value {
    id.map_or(Value::Null, Value::from)
}
