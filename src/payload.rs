//! Squadcast incident payload

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::error::Result;
use crate::event::{Check, Entity, Event};
use crate::template;

pub const MONITORING_TOOL: &str = "sensu";

/// Squadcast incident message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Recovery,
    Warning,
    Critical,
}

impl MessageType {
    /// Map a Sensu check status onto a Squadcast message type
    ///
    /// 0 resolves the incident, 1 is a warning, and every other status
    /// (including unknown) is critical.
    pub fn from_status(status: u32) -> Self {
        match status {
            0 => Self::Recovery,
            1 => Self::Warning,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recovery => "RECOVERY",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body POSTed to the Squadcast webhook
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SquadcastEvent {
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub monitoring_tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Check>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

impl SquadcastEvent {
    /// Build the payload for `event`, rendering the configured templates
    pub fn build(event: &Event, config: &Config) -> Result<Self> {
        let entity_id = template::render("entityID", &config.entity_id, event)?;
        let state_message = template::render("stateMessage", &config.state_message, event)?;

        Ok(Self {
            message_type: MessageType::from_status(event.check.status),
            state_message,
            entity_id,
            host_name: event.entity.name().to_string(),
            monitoring_tool: MONITORING_TOOL.to_string(),
            check: Some(event.check.clone()),
            entity: Some(event.entity.clone()),
        })
    }
}
