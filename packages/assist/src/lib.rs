//! # Tilestudio Assist
//!
//! AI patch proposals for Tilestudio projects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ orchestrator: propose → parse → validate    │
//! │  - bounded repair loop with structured      │
//! │    error feedback                           │
//! │  - guardrail gate on the final patch        │
//! └─────────────────────────────────────────────┘
//!        ↓ summary            ↑ raw response
//! ┌─────────────────────────────────────────────┐
//! │ provider port (external LLM service)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The orchestrator is the only async, suspending component in the system:
//! the provider call does network work and runs under a timeout. Everything
//! else (parsing, dry-run validation, guardrails) is synchronous and
//! pure. Applying an accepted patch is the caller's job; this crate never
//! touches a live document.

mod orchestrator;
mod parse;
mod provider;
mod summary;

pub use orchestrator::{
    propose_patch_with_repair, ProposeOptions, ProposeOutcome, ProposedPatch,
    DEFAULT_SYSTEM_PROMPT,
};
pub use parse::{parse_patch_response, ParseFailure, ParseFailureKind};
pub use provider::{
    AiPatchError, GenerativeProvider, ProviderError, ProviderRequest, ProviderResponse,
    RepairContext,
};
pub use summary::{EntitySummary, MapSummary, ProjectSummary, SummaryCounts};
