//! Patch extraction from raw provider output.
//!
//! Models answer in several shapes: a bare JSON object, a fenced code
//! block, or JSON buried in prose. The first two are unambiguous and
//! accepted; prose around a bare object is not, because there is no way to
//! know whether the text amends the patch. Every failure is classified so
//! the repair loop can tell the provider exactly what went wrong.

use serde::Serialize;
use thiserror::Error;

use tilestudio_project::PatchV1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailureKind {
    /// No JSON object anywhere in the response.
    NoJson,
    /// Found something brace-shaped, but it does not parse.
    InvalidJson,
    /// Valid JSON that is not a valid patch.
    InvalidPatch,
    /// A valid patch surrounded by ambiguous extra text.
    MixedContent,
}

impl ParseFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseFailureKind::NoJson => "no_json",
            ParseFailureKind::InvalidJson => "invalid_json",
            ParseFailureKind::InvalidPatch => "invalid_patch",
            ParseFailureKind::MixedContent => "mixed_content",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{}: {message}", .kind.as_str())]
pub struct ParseFailure {
    pub kind: ParseFailureKind,
    pub message: String,
}

impl ParseFailure {
    fn new(kind: ParseFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Extract a `PatchV1` from raw model output.
pub fn parse_patch_response(raw: &str) -> Result<PatchV1, ParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::new(
            ParseFailureKind::NoJson,
            "response is empty",
        ));
    }

    // The whole response is JSON.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return patch_from_value(value);
    }

    // A fenced code block is an unambiguous carrier.
    if let Some(block) = fenced_block(trimmed) {
        return match serde_json::from_str::<serde_json::Value>(block.trim()) {
            Ok(value) => patch_from_value(value),
            Err(err) => Err(ParseFailure::new(
                ParseFailureKind::InvalidJson,
                format!("fenced block is not valid JSON: {err}"),
            )),
        };
    }

    // A bare object embedded in prose.
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ParseFailure::new(
            ParseFailureKind::NoJson,
            "response contains no JSON object",
        ));
    };
    if end < start {
        return Err(ParseFailure::new(
            ParseFailureKind::NoJson,
            "response contains no JSON object",
        ));
    }

    let slice = &trimmed[start..=end];
    let value = serde_json::from_str::<serde_json::Value>(slice).map_err(|err| {
        ParseFailure::new(
            ParseFailureKind::InvalidJson,
            format!("embedded JSON does not parse: {err}"),
        )
    })?;
    let patch = patch_from_value(value)?;

    let before = trimmed[..start].trim();
    let after = trimmed[end + 1..].trim();
    if !before.is_empty() || !after.is_empty() {
        return Err(ParseFailure::new(
            ParseFailureKind::MixedContent,
            "patch JSON is surrounded by extra text",
        ));
    }

    Ok(patch)
}

fn patch_from_value(value: serde_json::Value) -> Result<PatchV1, ParseFailure> {
    serde_json::from_value::<PatchV1>(value).map_err(|err| {
        ParseFailure::new(
            ParseFailureKind::InvalidPatch,
            format!("JSON is not a valid patch: {err}"),
        )
    })
}

/// Content of the first fenced code block, tolerating a language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PATCH: &str = r#"{
        "patchVersion": 1,
        "patchId": "ai-1",
        "baseSchemaVersion": 1,
        "ops": [{ "op": "paintRect", "mapId": "start", "layerId": "ground",
                  "x": 0, "y": 0, "width": 2, "height": 2, "tile": 3 }]
    }"#;

    #[test]
    fn bare_json_parses() {
        let patch = parse_patch_response(VALID_PATCH).unwrap();
        assert_eq!(patch.patch_id, "ai-1");
        assert_eq!(patch.ops.len(), 1);
    }

    #[test]
    fn fenced_block_parses() {
        let raw = format!("Here is the patch you asked for:\n```json\n{VALID_PATCH}\n```\nLet me know!");
        let patch = parse_patch_response(&raw).unwrap();
        assert_eq!(patch.patch_id, "ai-1");
    }

    #[test]
    fn prose_without_json_is_no_json() {
        let err = parse_patch_response("I cannot produce a patch for that.").unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::NoJson);
    }

    #[test]
    fn broken_braces_are_invalid_json() {
        let err = parse_patch_response(r#"{"patchVersion": 1, "ops": ["#).unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::InvalidJson);
    }

    #[test]
    fn wrong_shape_is_invalid_patch() {
        let err = parse_patch_response(r#"{"hello": "world"}"#).unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::InvalidPatch);

        // Unknown op tags are a patch-shape failure, not a JSON failure.
        let err = parse_patch_response(
            r#"{"patchVersion": 1, "patchId": "x", "baseSchemaVersion": 1,
                "ops": [{"op": "teleport", "mapId": "start"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::InvalidPatch);
    }

    #[test]
    fn bare_json_in_prose_is_mixed_content() {
        let raw = format!("Sure! Here's the patch: {VALID_PATCH} and nothing else.");
        let err = parse_patch_response(&raw).unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::MixedContent);
    }

    #[test]
    fn empty_response_is_no_json() {
        let err = parse_patch_response("   \n  ").unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::NoJson);
    }
}
