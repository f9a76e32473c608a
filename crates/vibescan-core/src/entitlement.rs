//! Premium entitlement seam. The purchase flow lives elsewhere.

use crate::store::{KeyValueStore, KEY_PREMIUM};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("entitlement check failed: {0}")]
    CheckFailed(String),
}

pub trait Entitlement {
    fn is_premium(&self) -> Result<bool, EntitlementError>;
}

/// Resolve the premium flag, treating any failure as a free user.
pub fn is_premium_or_free<E: Entitlement + ?Sized>(entitlement: &E) -> bool {
    entitlement.is_premium().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "entitlement check failed; treating as free user");
        false
    })
}

/// Fixed answer, for tests and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEntitlement(pub bool);

impl Entitlement for StaticEntitlement {
    fn is_premium(&self) -> Result<bool, EntitlementError> {
        Ok(self.0)
    }
}

/// Reads the `vibescan_premium` flag from a store.
///
/// Accepts JSON `true` or the string `"true"`.
pub struct StoreEntitlement<S> {
    store: S,
}

impl<S: KeyValueStore> StoreEntitlement<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> Entitlement for StoreEntitlement<S> {
    fn is_premium(&self) -> Result<bool, EntitlementError> {
        let value = self
            .store
            .get(KEY_PREMIUM)
            .map_err(|e| EntitlementError::CheckFailed(e.to_string()))?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        })
    }
}

impl<T: Entitlement + ?Sized> Entitlement for Box<T> {
    fn is_premium(&self) -> Result<bool, EntitlementError> {
        (**self).is_premium()
    }
}
