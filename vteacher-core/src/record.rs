//! Record model
//!
//! Records are the only persisted entity: a titled body of text with
//! creation and update timestamps. Identifiers come from the store's serial
//! key and are always positive.

use crate::error::LocationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// RECORD ID
// ============================================================================

/// Positive 64-bit record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RecordId(i64);

impl RecordId {
    /// Create a record id, rejecting zero and negative values.
    pub fn new(value: i64) -> Result<Self, LocationError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(LocationError::InvalidRecordId { value })
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for RecordId {
    type Error = LocationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| LocationError::malformed(s, format!("invalid record id: {}", e)))?;
        Self::new(value)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Editable fields of a record, as submitted by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl RecordInput {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A write against the record store that is followed by a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { input: RecordInput },
    Update { id: RecordId, input: RecordInput },
    Delete { id: RecordId },
}

impl Mutation {
    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }

    /// The record targeted by this mutation, if it already exists.
    pub fn target(&self) -> Option<RecordId> {
        match self {
            Mutation::Create { .. } => None,
            Mutation::Update { id, .. } | Mutation::Delete { id } => Some(*id),
        }
    }
}
