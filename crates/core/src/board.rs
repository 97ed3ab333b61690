//! Typed model of the Greenhopper backlog data document.
//!
//! Only the fields the deck needs are modelled. Unknown fields are ignored.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// Identifier of an issue, epic, or status.
///
/// The tracker sends some ids as JSON numbers and others as strings; both are
/// stored in their decimal string form so they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
        })
    }
}

/// Root of `xboard/plan/backlog/data.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    pub entity_data: EntityData,

    #[serde(default)]
    pub issues: Vec<BoardIssue>,

    #[serde(default)]
    pub sprints: Vec<BoardSprint>,
}

impl BoardData {
    /// Parse board data from the raw response body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// The sprint currently in progress. The tracker lists it first.
    pub fn current_sprint(&self) -> Result<&BoardSprint> {
        self.sprints.first().ok_or(Error::NoActiveSprint)
    }

    /// Resolve an epic id to its display name.
    pub fn epic_name(&self, issue: &BoardIssue, epic_id: &EntityId) -> Result<&str> {
        self.entity_data
            .epics
            .get(epic_id)
            .map(|epic| epic.epic_field.text.as_str())
            .ok_or_else(|| Error::UnknownEpic {
                issue: issue.id.to_string(),
                epic: epic_id.to_string(),
            })
    }

    /// Resolve a status id to its display name.
    pub fn status_name(&self, issue: &BoardIssue) -> Result<&str> {
        self.entity_data
            .statuses
            .get(&issue.status_id)
            .map(|status| status.status_name.as_str())
            .ok_or_else(|| Error::UnknownStatus {
                issue: issue.id.to_string(),
                status: issue.status_id.to_string(),
            })
    }
}

/// Lookup tables shared by all issues on the board.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityData {
    #[serde(default)]
    pub epics: HashMap<EntityId, BoardEpic>,

    #[serde(default)]
    pub statuses: HashMap<EntityId, BoardStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEpic {
    pub epic_field: EpicField,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpicField {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStatus {
    pub status_name: String,
}

/// An issue as listed in the board data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardIssue {
    pub id: EntityId,

    pub summary: String,

    pub status_id: EntityId,

    /// Absent (or null) for issues outside any epic.
    #[serde(default)]
    pub epic_id: Option<EntityId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSprint {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub issues_ids: Vec<EntityId>,
}
