//! # Proposal Orchestrator
//!
//! Drives one AI patch proposal end to end: summarize the project, call
//! the provider, parse, dry-run validate, and loop structured errors back
//! to the provider until the patch is clean or the repair budget runs out.
//!
//! The orchestrator never mutates the project. A successful proposal hands
//! the patch back to the caller, who applies it and pushes it to history
//! with origin `Ai` as a separate step.
//!
//! ## Bounds
//!
//! - Provider calls ≤ `1 + max_repair_attempts`
//! - Each call runs under a timeout; a timed-out or failed call finalizes
//!   immediately and never consumes repair budget
//! - Guardrail rejections finalize immediately: the content is valid, the
//!   policy says no, and re-asking the model cannot change policy

use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use tilestudio_editor::{self as editor, ChangeSummary, GuardrailConfig, GuardrailVerdict,
    PatchError};
use tilestudio_project::{PatchV1, Project};

use crate::parse::{parse_patch_response, ParseFailure};
use crate::provider::{
    AiPatchError, GenerativeProvider, ProviderRequest, RepairContext,
};
use crate::summary::ProjectSummary;

/// Default system prompt for patch proposals.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a level-editing assistant for a tile-based game project. \
Respond with exactly one JSON object: a patch of the form \
{\"patchVersion\": 1, \"patchId\": string, \"baseSchemaVersion\": int, \"ops\": [...]}. \
Use only ops from the documented vocabulary, reference only ids present in \
the project summary, and emit no text outside the JSON object.";

const REPAIR_PARSE_INSTRUCTION: &str =
    "Your previous response could not be parsed as a patch. Respond with only \
     the corrected JSON patch object and nothing else.";

const REPAIR_VALIDATION_INSTRUCTION: &str =
    "Your previous patch failed validation. Fix the listed errors and respond \
     with only the corrected JSON patch object.";

#[derive(Debug, Clone)]
pub struct ProposeOptions {
    /// Repair round budget on top of the initial call.
    pub max_repair_attempts: u32,
    pub provider_timeout_ms: u64,
    pub guardrails: GuardrailConfig,
    /// Overrides `DEFAULT_SYSTEM_PROMPT` when set.
    pub system_prompt: Option<String>,
}

impl Default for ProposeOptions {
    fn default() -> Self {
        Self {
            max_repair_attempts: 2,
            provider_timeout_ms: 30_000,
            guardrails: GuardrailConfig::default(),
            system_prompt: None,
        }
    }
}

/// Terminal state of one proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ProposeOutcome {
    Success {
        patch: PatchV1,
        summary: ChangeSummary,
        requires_confirmation: bool,
    },
    ParseFailed {
        failure: ParseFailure,
    },
    ValidationFailed {
        errors: Vec<AiPatchError>,
    },
    GuardrailBlocked {
        verdict: GuardrailVerdict,
    },
    ProviderFailed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedPatch {
    pub outcome: ProposeOutcome,
    pub provider_calls: u32,
    pub repair_attempts_used: u32,
    pub warnings: Vec<String>,
}

/// Propose a patch for `user_prompt` against `project`, repairing failed
/// attempts within the configured budget.
pub async fn propose_patch_with_repair(
    project: &Project,
    user_prompt: &str,
    provider: &dyn GenerativeProvider,
    options: &ProposeOptions,
) -> ProposedPatch {
    let project_summary = ProjectSummary::build(project);
    let system_prompt = options
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let mut warnings: Vec<String> = Vec::new();
    let mut repair_context: Option<RepairContext> = None;
    let mut provider_calls = 0u32;

    info!(prompt_len = user_prompt.len(), "starting patch proposal");

    for attempt in 0..=options.max_repair_attempts {
        let request = ProviderRequest {
            system_prompt: system_prompt.clone(),
            user_prompt: user_prompt.to_string(),
            project_summary: project_summary.clone(),
            repair_context: repair_context.take(),
        };

        provider_calls += 1;
        let response = match timeout(
            Duration::from_millis(options.provider_timeout_ms),
            provider.propose(request),
        )
        .await
        {
            Err(_) => {
                return finalize(
                    ProposeOutcome::ProviderFailed {
                        message: format!(
                            "provider call timed out after {} ms",
                            options.provider_timeout_ms
                        ),
                    },
                    provider_calls,
                    attempt,
                    warnings,
                );
            }
            Ok(Err(err)) => {
                return finalize(
                    ProposeOutcome::ProviderFailed {
                        message: err.to_string(),
                    },
                    provider_calls,
                    attempt,
                    warnings,
                );
            }
            Ok(Ok(response)) => response,
        };

        if !response.success {
            return finalize(
                ProposeOutcome::ProviderFailed {
                    message: response
                        .error
                        .unwrap_or_else(|| "provider reported failure".to_string()),
                },
                provider_calls,
                attempt,
                warnings,
            );
        }

        // A provider-parsed patch wins; otherwise extract from raw text.
        let parsed = match response.parsed_patch {
            Some(patch) => Ok(patch),
            None => match response.raw_text.as_deref() {
                Some(raw) => parse_patch_response(raw),
                None => Err(ParseFailure {
                    kind: crate::parse::ParseFailureKind::NoJson,
                    message: "provider returned no content".to_string(),
                }),
            },
        };

        let patch = match parsed {
            Ok(patch) => patch,
            Err(failure) => {
                debug!(attempt, kind = failure.kind.as_str(), "parse failed");
                if attempt < options.max_repair_attempts {
                    repair_context = Some(RepairContext {
                        attempt: attempt + 1,
                        previous_raw: response.raw_text.clone(),
                        previous_patch: None,
                        errors: vec![AiPatchError {
                            operation_index: None,
                            operation_type: None,
                            error_type: failure.kind.as_str().to_string(),
                            message: failure.message.clone(),
                            context: None,
                        }],
                        instruction: REPAIR_PARSE_INSTRUCTION.to_string(),
                    });
                    continue;
                }
                return finalize(
                    ProposeOutcome::ParseFailed { failure },
                    provider_calls,
                    attempt,
                    warnings,
                );
            }
        };

        // Dry-run through the engine: full reference and bounds checking,
        // nothing committed.
        match editor::dry_run(project, &patch) {
            Err(err) => {
                debug!(attempt, error = %err, "validation failed");
                let errors = vec![ai_error_from_patch_error(&err, &patch)];
                if attempt < options.max_repair_attempts {
                    repair_context = Some(RepairContext {
                        attempt: attempt + 1,
                        previous_raw: response.raw_text.clone(),
                        previous_patch: Some(patch),
                        errors,
                        instruction: REPAIR_VALIDATION_INSTRUCTION.to_string(),
                    });
                    continue;
                }
                return finalize(
                    ProposeOutcome::ValidationFailed { errors },
                    provider_calls,
                    attempt,
                    warnings,
                );
            }
            Ok(change_summary) => {
                let verdict = editor::check(&patch, &options.guardrails, Some(user_prompt));
                if !verdict.allowed {
                    // Valid content, disallowed policy: repair cannot help.
                    return finalize(
                        ProposeOutcome::GuardrailBlocked { verdict },
                        provider_calls,
                        attempt,
                        warnings,
                    );
                }

                warnings.extend(verdict.warnings.iter().cloned());
                info!(
                    patch = %patch.patch_id,
                    repairs = attempt,
                    "proposal succeeded"
                );
                return finalize(
                    ProposeOutcome::Success {
                        patch,
                        summary: change_summary,
                        requires_confirmation: verdict.requires_confirmation,
                    },
                    provider_calls,
                    attempt,
                    warnings,
                );
            }
        }
    }

    unreachable!("the final attempt always finalizes");
}

fn finalize(
    outcome: ProposeOutcome,
    provider_calls: u32,
    repair_attempts_used: u32,
    warnings: Vec<String>,
) -> ProposedPatch {
    ProposedPatch {
        outcome,
        provider_calls,
        repair_attempts_used,
        warnings,
    }
}

fn ai_error_from_patch_error(err: &PatchError, patch: &PatchV1) -> AiPatchError {
    let operation_index = err.op_index();
    let context = operation_index
        .and_then(|i| patch.ops.get(i))
        .and_then(|op| serde_json::to_string(op).ok());

    let error_type = match err {
        PatchError::UnsupportedVersion(_) => "unsupported_version",
        PatchError::Structural { .. } => "structural",
        PatchError::Reference { .. } => "reference",
        PatchError::Bounds { .. } => "bounds",
    };

    AiPatchError {
        operation_index,
        operation_type: err.op_tag().map(|t| t.to_string()),
        error_type: error_type.to_string(),
        message: err.to_string(),
        context,
    }
}
