//! External structural validator contract.
//!
//! Schema conformance checking (field presence, type shapes, bounds) is a
//! separate collaborator. The editor performs its own reference and bounds
//! checks while applying patches; this port is for whole-document
//! validation on load or before export.

use serde::{Deserialize, Serialize};

use crate::model::Project;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    /// JSON-pointer-style path to the offending value.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub trait StructuralValidator {
    /// An empty issue list means the document is valid.
    fn validate(&self, project: &Project) -> Vec<ValidationIssue>;
}
