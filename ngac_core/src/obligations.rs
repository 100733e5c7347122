//! Obligations are stored and round-tripped with the policy; nothing here
//! evaluates them.

use crate::error::{require_non_empty, NgacError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The events an obligation listens for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPattern {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub label: String,
    pub author: String,
    pub event: EventPattern,
    /// Response actions, kept opaque.
    #[serde(default)]
    pub response: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Obligation {
    pub fn new(label: impl Into<String>, author: impl Into<String>, event: EventPattern) -> Self {
        Self {
            label: label.into(),
            author: author.into(),
            event,
            response: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_response(mut self, action: serde_json::Value) -> Self {
        self.response.push(action);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Obligations {
    obligations: BTreeMap<String, Obligation>,
}

impl Obligations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, obligation: Obligation) -> Result<()> {
        require_non_empty("obligation label", &obligation.label)?;
        if self.obligations.contains_key(&obligation.label) {
            return Err(NgacError::DuplicateObligation(obligation.label));
        }
        self.obligations
            .insert(obligation.label.clone(), obligation);
        Ok(())
    }

    pub fn remove(&mut self, label: &str) -> Option<Obligation> {
        self.obligations.remove(label)
    }

    pub fn get(&self, label: &str) -> Option<&Obligation> {
        self.obligations.get(label)
    }

    pub fn all(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations.values()
    }

    pub fn len(&self) -> usize {
        self.obligations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }
}
