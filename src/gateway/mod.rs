//! Backend store abstraction.
//!
//! The [`RemoteStore`] trait decouples the mapping pipeline from the
//! transport used to reach the backend. Production code talks to Odoo
//! over JSON-RPC via [`odoo::OdooGateway`]; tests substitute an
//! in-memory implementation.

pub mod odoo;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::Result;

/// Backend record identifier.
pub type RecordId = i64;

/// Field map sent to `create` or returned by `search_read`.
pub type Payload = Map<String, Value>;

/// Boxed future returned by [`RemoteStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Single search condition, serialized as an Odoo domain triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Field the condition applies to.
    pub field: &'static str,
    /// Comparison operator (`=`, `in`, ...).
    pub operator: &'static str,
    /// Right-hand operand.
    pub value: Value,
}

impl Condition {
    /// Equality condition on `field`.
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            operator: "=",
            value: value.into(),
        }
    }

    /// Render as `[field, operator, value]`.
    #[must_use]
    pub fn to_domain_term(&self) -> Value {
        Value::Array(vec![
            Value::from(self.field),
            Value::from(self.operator),
            self.value.clone(),
        ])
    }
}

/// Render a list of conditions as an Odoo search domain.
#[must_use]
pub fn to_domain(conditions: &[Condition]) -> Value {
    Value::Array(conditions.iter().map(Condition::to_domain_term).collect())
}

/// Normalize a many2one value (`[id, "name"]`, `id`, or `false`) to an id.
#[must_use]
pub fn many2one_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(items) => items.first().and_then(Value::as_i64),
        _ => None,
    }
}

/// Interface between the mapping pipeline and the record backend.
///
/// All calls are independent; implementations hold whatever session state
/// they need internally.
pub trait RemoteStore: Send + Sync {
    /// Create one record and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Rpc`](crate::AppError::Rpc) when the backend
    /// rejects the payload, or a transport error variant.
    fn create<'a>(&'a self, model: &'a str, payload: Payload) -> StoreFuture<'a, RecordId>;

    /// Search `model` and return the requested fields of every match.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Rpc`](crate::AppError::Rpc) on backend failure.
    fn search_read<'a>(
        &'a self,
        model: &'a str,
        conditions: Vec<Condition>,
        fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>>;

    /// Read the requested fields of specific records.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Rpc`](crate::AppError::Rpc) on backend failure.
    fn read<'a>(
        &'a self,
        model: &'a str,
        ids: Vec<RecordId>,
        fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>>;

    /// Backend version string, used as a health probe.
    ///
    /// # Errors
    ///
    /// Returns a transport error variant when the backend is unreachable.
    fn server_version(&self) -> StoreFuture<'_, String>;
}
