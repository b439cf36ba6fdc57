//! Generative provider port.
//!
//! The orchestrator talks to any text-generation backend through this
//! trait. Implementations own transport, auth and model choice; the
//! orchestrator owns prompting, parsing, validation and the repair loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tilestudio_project::PatchV1;

use crate::summary::ProjectSummary;

/// One structured validation or parse problem, fed back to the provider
/// verbatim as repair context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPatchError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    pub error_type: String,
    pub message: String,
    /// The offending op as JSON, when one could be identified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Everything the previous attempt got wrong, plus how to fix it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairContext {
    /// 1-based repair attempt number.
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_patch: Option<PatchV1>,
    pub errors: Vec<AiPatchError>,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub project_summary: ProjectSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_context: Option<RepairContext>,
}

/// What came back. A provider may pre-parse the patch itself; when it does,
/// `parsed_patch` wins over `raw_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_patch: Option<PatchV1>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider call timed out after {0} ms")]
    Timeout(u64),
}

#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn propose(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
