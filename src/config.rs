//! Executor properties consumed by the exchange core.
//!
//! The framework hands every executor a flat string map. Unknown keys are
//! kept but ignored; the typed accessors validate only the keys this
//! crate recognizes. Override via environment variables (prefixed
//! `REDIST_`) or by filling a `Properties` by hand.

use std::collections::HashMap;

use crate::error::{RedistError, Result};
use crate::types::ExchangeMode;

/// Property selecting the exchange strategy: `"sync"`, `"async"`, or
/// unset for the sparsity probe.
pub const EXCHANGE_TYPE: &str = "exchange.type";

#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load properties from environment variables, falling back to empty.
    ///
    /// Recognized variables:
    /// - `REDIST_EXCHANGE_TYPE`
    pub fn from_env() -> Self {
        let mut props = Self::new();
        if let Ok(v) = std::env::var("REDIST_EXCHANGE_TYPE") {
            props.set(EXCHANGE_TYPE, v);
        }
        props
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Strategy forced by `exchange.type`, or `None` for auto-selection.
    pub fn exchange_mode(&self) -> Result<Option<ExchangeMode>> {
        match self.get(EXCHANGE_TYPE) {
            None => Ok(None),
            Some("sync") => Ok(Some(ExchangeMode::Sync)),
            Some("async") => Ok(Some(ExchangeMode::Async)),
            Some(other) => Err(RedistError::InvalidProperty {
                key: EXCHANGE_TYPE,
                value: other.to_string(),
            }),
        }
    }
}
