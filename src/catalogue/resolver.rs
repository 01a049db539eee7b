//! Resolves coded answers to backend reference-record identifiers.
//!
//! A code that was not supplied is never looked up. A lookup that finds
//! nothing yields [`Lookup::NotFound`] instead of failing, so one unknown
//! choice cannot sink a whole submission. Results are memoized for the
//! lifetime of the resolver, which the pipeline scopes to one submission.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use super::{CatalogueId, BREED_MODEL, CATALOGUE_ITEM_MODEL, WARD_MODEL};
use crate::gateway::{many2one_id, Condition, RecordId, RemoteStore};
use crate::Result;

/// Outcome of a single reference lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    /// No code was supplied; no query was made.
    Skipped,
    /// The code matched a reference record.
    Found(T),
    /// The code was supplied but matched nothing.
    NotFound,
}

impl<T> Lookup<T> {
    /// Matched value, if any.
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Skipped | Self::NotFound => None,
        }
    }

    /// Whether a supplied code matched nothing.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Lookup of a single reference identifier.
pub type Resolution = Lookup<RecordId>;

/// Administrative hierarchy above (and including) a ward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminUnitChain {
    /// County.
    pub level1: Option<RecordId>,
    /// Sub-county.
    pub level2: Option<RecordId>,
    /// Division.
    pub level3: Option<RecordId>,
    /// Ward.
    pub level4: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Catalogue(CatalogueId, String),
    Breed(String),
}

const ID_FIELDS: &[&str] = &["id"];
const WARD_FIELDS: &[&str] = &["id", "division_id", "sub_county_id", "county_id"];

/// Catalogue resolver bound to one backend store.
pub struct CatalogueResolver<'a> {
    store: &'a dyn RemoteStore,
    cache: Mutex<HashMap<CacheKey, Resolution>>,
}

impl<'a> CatalogueResolver<'a> {
    /// Create a resolver with an empty memo.
    #[must_use]
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `code` against catalogue `catalogue`, restricted to active
    /// items.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query itself fails.
    pub async fn resolve(&self, catalogue: CatalogueId, code: Option<&str>) -> Result<Resolution> {
        let Some(code) = code else {
            return Ok(Lookup::Skipped);
        };
        let key = CacheKey::Catalogue(catalogue, code.to_owned());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let rows = self
            .store
            .search_read(
                CATALOGUE_ITEM_MODEL,
                vec![
                    Condition::eq("catalogue_id", catalogue.id()),
                    Condition::eq("code", code),
                    Condition::eq("active", true),
                ],
                ID_FIELDS,
            )
            .await?;

        let resolution = first_id(&rows);
        if resolution.is_miss() {
            warn!(?catalogue, code, "catalogue code not found");
        } else {
            debug!(?catalogue, code, ?resolution, "catalogue code resolved");
        }
        self.remember(key, resolution);
        Ok(resolution)
    }

    /// Resolve a breed code against the breed table.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query itself fails.
    pub async fn resolve_breed(&self, code: Option<&str>) -> Result<Resolution> {
        let Some(code) = code else {
            return Ok(Lookup::Skipped);
        };
        let key = CacheKey::Breed(code.to_owned());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let rows = self
            .store
            .search_read(BREED_MODEL, vec![Condition::eq("code", code)], ID_FIELDS)
            .await?;

        let resolution = first_id(&rows);
        if resolution.is_miss() {
            warn!(code, "breed code not found");
        }
        self.remember(key, resolution);
        Ok(resolution)
    }

    /// Resolve a ward code to its full administrative chain in one query.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query itself fails.
    pub async fn resolve_admin_unit(&self, ward_code: Option<&str>) -> Result<Lookup<AdminUnitChain>> {
        let Some(ward_code) = ward_code else {
            return Ok(Lookup::Skipped);
        };

        let rows = self
            .store
            .search_read(WARD_MODEL, vec![Condition::eq("code", ward_code)], WARD_FIELDS)
            .await?;

        let Some(row) = rows.first() else {
            warn!(ward_code, "ward code not found");
            return Ok(Lookup::NotFound);
        };

        let field = |name: &str| row.get(name).and_then(many2one_id);
        Ok(Lookup::Found(AdminUnitChain {
            level1: field("county_id"),
            level2: field("sub_county_id"),
            level3: field("division_id"),
            level4: row.get("id").and_then(Value::as_i64),
        }))
    }

    fn cached(&self, key: &CacheKey) -> Option<Resolution> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .copied()
    }

    fn remember(&self, key: CacheKey, resolution: Resolution) {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, resolution);
    }
}

fn first_id(rows: &[crate::gateway::Payload]) -> Resolution {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(Value::as_i64)
        .map_or(Lookup::NotFound, Lookup::Found)
}
