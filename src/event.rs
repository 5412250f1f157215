//! Sensu event model
//!
//! Only the fields the handler reads are typed. Everything else on the entity
//! and check is carried through untouched so the copies sent to Squadcast match
//! what the Sensu backend handed us.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::{HandlerError, Result};

/// Object metadata shared by entities and checks
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The monitored resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Entity {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_class: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Result of one check execution
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Check {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub status: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Check {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// A Sensu event as delivered to handlers on stdin
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub entity: Entity,
    pub check: Check,
}

impl Event {
    /// Decode an event from a JSON stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let event: Self = serde_json::from_reader(reader)?;
        Ok(event)
    }

    /// Reject events without the names the handler keys on
    pub fn validate(&self) -> Result<()> {
        if self.entity.name().is_empty() {
            return Err(HandlerError::InvalidEvent("entity name must not be empty".to_string()));
        }
        if self.check.name().is_empty() {
            return Err(HandlerError::InvalidEvent("check name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Look up a handler option in check annotations, then entity annotations
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.check
            .metadata
            .annotations
            .get(key)
            .or_else(|| self.entity.metadata.annotations.get(key))
            .map(|s| s.as_str())
    }
}
