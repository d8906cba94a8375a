//! Wire types returned by the store's REST endpoints.

use serde::Deserialize;
use slitmask_core::catalog::ObjectRecord;
use slitmask_core::mask::MaskDocument;

/// Outcome of a mask lookup. A missing mask is an expected answer, not an
/// error: it means the mask has not been generated yet.
#[derive(Debug, Clone)]
pub enum MaskLookup {
    Found(Box<MaskDocument>),
    NotFound,
}

/// One entry of the `objects/viewlist` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectListEntry {
    /// Empty when the store omits it.
    #[serde(default)]
    pub list_name: String,
    pub objects: Vec<ObjectRecord>,
}

/// One entry of the project mask listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskSummary {
    pub name: String,
}

/// Choices offered by an instrument configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentConfig {
    pub filters: Vec<String>,
    pub dispersers: Vec<String>,
}

impl InstrumentConfig {
    /// Normalize a raw configuration document. Non-array fields become
    /// empty lists and non-string entries are stringified.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            filters: string_list(value.get("filters")),
            dispersers: string_list(value.get("dispersers")),
        }
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
