//! Recovery of structured objects from free-form model replies.
//!
//! Models wrap their JSON in prose and markdown fences, and the objects
//! themselves nest (arrays of suggestion objects). Extraction therefore:
//!
//! 1. drops lines that are only code-fence markers,
//! 2. scans from the first `{` with a brace-depth counter that ignores
//!    braces inside string literals, taking the minimal balanced substring
//!    (an object that never closes fails the scan),
//! 3. parses that substring, and
//! 4. checks it against the stage schema before deserializing.
//!
//! A greedy first-`{`-to-last-`}` match is wrong as soon as the reply holds
//! more than one object or trailing prose with a brace, so it is not used.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::room::{
    CostTier, ImagePrompt, RoomAnalysis, SuggestionCategory, SuggestionImpact, SuggestionSet,
};
use crate::stage::Stage;

/// Lines consisting only of a fence marker, optionally with a language tag.
static FENCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+-]*[ \t]*\r?$\n?").expect("valid regex"));

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why no object could be recovered from a reply.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("reply contains no '{{'")]
    NoOpeningBrace,

    #[error("reply contains an object that is never closed")]
    Unbalanced,

    #[error("no balanced candidate parses as JSON: {0}")]
    Unparseable(#[source] serde_json::Error),
}

/// Failure to turn a model reply into a stage value.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No well-formed object was found in the reply.
    #[error("{stage}: could not extract a JSON object from the model reply: {source}")]
    Extraction {
        stage: Stage,
        #[source]
        source: ScanError,
    },

    /// An object was found but does not match the stage schema.
    #[error("{stage}: model reply does not match the expected schema: {detail}")]
    Validation { stage: Stage, detail: String },
}

impl ExtractError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Extraction { stage, .. } | Self::Validation { stage, .. } => *stage,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage schemas
// ---------------------------------------------------------------------------

/// A value a pipeline stage expects the model to return.
///
/// `validate` checks field presence and shape on the raw JSON so a mismatch
/// is reported as a schema failure with a readable detail, instead of an
/// opaque serde error.
pub trait StageSchema: DeserializeOwned {
    /// The stage whose reply this type describes.
    const STAGE: Stage;

    fn validate(value: &Value) -> Result<(), String>;
}

impl StageSchema for RoomAnalysis {
    const STAGE: Stage = Stage::Analysis;

    fn validate(value: &Value) -> Result<(), String> {
        let obj = as_object(value, "reply")?;
        for field in ["roomType", "currentStyle", "layout", "lighting", "colorScheme"] {
            require_string(obj, field)?;
        }
        require_string_array(obj, "existingItems")?;
        require_string_array(obj, "issues")?;
        Ok(())
    }
}

impl StageSchema for SuggestionSet {
    const STAGE: Stage = Stage::Suggestions;

    fn validate(value: &Value) -> Result<(), String> {
        let obj = as_object(value, "reply")?;
        let items = match obj.get("suggestions") {
            None => return Err("missing field 'suggestions'".to_string()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err("field 'suggestions' must be an array".to_string()),
        };
        if items.is_empty() {
            return Err("field 'suggestions' must not be empty".to_string());
        }
        for (i, item) in items.iter().enumerate() {
            let suggestion = as_object(item, &format!("suggestions[{i}]"))?;
            require_string(suggestion, "title").map_err(|e| format!("suggestions[{i}]: {e}"))?;
            require_string(suggestion, "description")
                .map_err(|e| format!("suggestions[{i}]: {e}"))?;
            require_one_of(suggestion, "category", SuggestionCategory::VALUES)
                .map_err(|e| format!("suggestions[{i}]: {e}"))?;
            require_one_of(suggestion, "impact", SuggestionImpact::VALUES)
                .map_err(|e| format!("suggestions[{i}]: {e}"))?;
            require_one_of(suggestion, "cost", CostTier::VALUES)
                .map_err(|e| format!("suggestions[{i}]: {e}"))?;
        }
        Ok(())
    }
}

impl StageSchema for ImagePrompt {
    const STAGE: Stage = Stage::ImagePrompt;

    fn validate(value: &Value) -> Result<(), String> {
        let obj = as_object(value, "reply")?;
        let prompt = require_string(obj, "imagePrompt")?;
        if prompt.trim().is_empty() {
            return Err("field 'imagePrompt' must not be blank".to_string());
        }
        require_string(obj, "negativePrompt")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract, validate and deserialize the stage value `T` from a model reply.
pub fn extract<T: StageSchema>(reply: &str) -> Result<T, ExtractError> {
    let value = extract_object(reply).map_err(|source| ExtractError::Extraction {
        stage: T::STAGE,
        source,
    })?;

    T::validate(&value).map_err(|detail| ExtractError::Validation {
        stage: T::STAGE,
        detail,
    })?;

    serde_json::from_value(value).map_err(|e| ExtractError::Validation {
        stage: T::STAGE,
        detail: e.to_string(),
    })
}

/// Return the first balanced object in `reply` that parses as JSON.
pub fn extract_object(reply: &str) -> Result<Value, ScanError> {
    let text = strip_code_fences(reply);
    let (_, value) = first_parseable_object(&text)?;
    Ok(value)
}

/// Remove lines that consist solely of a markdown fence marker.
pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    FENCE_LINE_RE.replace_all(text, "")
}

/// Scan from the first `{`. A candidate that closes but does not parse is
/// skipped and scanning resumes at the next `{`; a candidate that never
/// closes ends the scan, since every later `{` lies inside it.
fn first_parseable_object(text: &str) -> Result<(&str, Value), ScanError> {
    let mut search_from = 0;
    let mut last_parse_error = None;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let end = matching_brace(text, start).ok_or(ScanError::Unbalanced)?;
        let candidate = &text[start..=end];
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => last_parse_error = Some(e),
        }
        search_from = start + 1;
    }

    Err(last_parse_error.map_or(ScanError::NoOpeningBrace, ScanError::Unparseable))
}

/// Byte index of the `}` closing the `{` at `start`, or `None` if the text
/// ends first. Braces inside string literals are ignored.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Schema helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| format!("{what} must be a JSON object"))
}

fn require_string<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, String> {
    match obj.get(field) {
        None => Err(format!("missing field '{field}'")),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(format!("field '{field}' must be a string")),
    }
}

fn require_string_array(obj: &Map<String, Value>, field: &str) -> Result<(), String> {
    match obj.get(field) {
        None => Err(format!("missing field '{field}'")),
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
        Some(Value::Array(_)) => Err(format!("field '{field}' must contain only strings")),
        Some(_) => Err(format!("field '{field}' must be an array")),
    }
}

fn require_one_of(
    obj: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
) -> Result<(), String> {
    let value = require_string(obj, field)?;
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "field '{field}' has value '{value}', expected one of {}",
            allowed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::room::CostTier;

    fn extract_object_text(reply: &str) -> Result<String, ScanError> {
        let text = strip_code_fences(reply);
        let (raw, _) = first_parseable_object(&text)?;
        Ok(raw.to_string())
    }

    const LIVING_ROOM: &str = r#"{"roomType":"living room","currentStyle":"modern","existingItems":[],"layout":"L-shaped","lighting":"natural","colorScheme":"neutral","issues":[]}"#;

    fn suggestion_json(title: &str) -> String {
        format!(
            r#"{{"title":"{title}","description":"d","category":"decor","impact":"low","cost":"$"}}"#
        )
    }

    // -- balanced-brace scanning --

    #[test]
    fn fenced_object_is_returned_exactly() {
        let reply = format!("```json\n{LIVING_ROOM}\n```");
        assert_eq!(extract_object_text(&reply).unwrap(), LIVING_ROOM);
    }

    #[test]
    fn nested_objects_are_not_truncated() {
        let inner = format!(
            r#"{{"suggestions":[{},{}],"meta":{{"n":2}}}}"#,
            suggestion_json("a"),
            suggestion_json("b")
        );
        let reply = format!("Here you go:\n{inner}\nHope this helps {{:}}");
        assert_eq!(extract_object_text(&reply).unwrap(), inner);
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let obj = r#"{"imagePrompt":"a room with a {curly} sign and \"quotes\" }","negativePrompt":"x"}"#;
        let reply = format!("prefix {obj} suffix");
        assert_eq!(extract_object_text(&reply).unwrap(), obj);
    }

    #[test]
    fn prose_brace_before_object_is_skipped() {
        let reply = format!("Use {{braces}} carefully. {LIVING_ROOM}");
        assert_eq!(extract_object_text(&reply).unwrap(), LIVING_ROOM);
    }

    #[test]
    fn multiple_objects_yield_the_first() {
        let reply = r#"{"a":1} and later {"b":2}"#;
        assert_eq!(extract_object_text(reply).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn text_without_brace_fails() {
        assert_matches!(extract_object("no json here"), Err(ScanError::NoOpeningBrace));
    }

    #[test]
    fn unterminated_object_fails() {
        assert_matches!(
            extract_object(r#"Result: {"a": [1, 2"#),
            Err(ScanError::Unbalanced)
        );
    }

    #[test]
    fn unclosed_outer_object_does_not_yield_a_nested_one() {
        let reply = format!(
            r#"{{"suggestions":[{},{{"title":"Lamp","descr"#,
            suggestion_json("Rug")
        );
        assert_matches!(extract_object(&reply), Err(ScanError::Unbalanced));
    }

    #[test]
    fn prose_brace_left_open_is_unbalanced() {
        assert_matches!(
            extract_object(r#"Note { see {"a":1}"#),
            Err(ScanError::Unbalanced)
        );
    }

    #[test]
    fn balanced_but_invalid_json_fails() {
        assert_matches!(
            extract_object("{not json at all}"),
            Err(ScanError::Unparseable(_))
        );
    }

    #[test]
    fn fence_markers_inside_prose_lines_are_kept() {
        let text = "see ```this``` inline\n```json\n{}\n```\n";
        assert_eq!(strip_code_fences(text), "see ```this``` inline\n{}\n");
    }

    // -- stage extraction --

    #[test]
    fn room_analysis_from_fenced_reply() {
        let reply = format!("```json\n{LIVING_ROOM}\n```");
        let analysis: RoomAnalysis = extract(&reply).unwrap();
        assert_eq!(analysis.room_type, "living room");
        assert!(analysis.existing_items.is_empty());
    }

    #[test]
    fn room_analysis_without_json_is_extraction_error() {
        let err = extract::<RoomAnalysis>("I cannot see the image.").unwrap_err();
        assert_matches!(
            err,
            ExtractError::Extraction {
                stage: Stage::Analysis,
                ..
            }
        );
    }

    #[test]
    fn truncated_suggestions_reply_is_extraction_error() {
        let reply = format!(
            "```json\n{{\"suggestions\": [{}, {{\"title\": \"Lamp\", \"descr",
            suggestion_json("Rug")
        );
        let err = extract::<SuggestionSet>(&reply).unwrap_err();
        assert_matches!(
            err,
            ExtractError::Extraction {
                stage: Stage::Suggestions,
                source: ScanError::Unbalanced,
            }
        );
    }

    #[test]
    fn room_analysis_with_wrong_shape_is_validation_error() {
        let reply = r#"{"roomType":"kitchen","currentStyle":"x","existingItems":"sofa","layout":"x","lighting":"x","colorScheme":"x","issues":[]}"#;
        let err = extract::<RoomAnalysis>(reply).unwrap_err();
        assert_matches!(err, ExtractError::Validation { ref detail, .. } if detail.contains("existingItems"));
    }

    #[test]
    fn suggestions_missing_field_is_validation_error() {
        let err = extract::<SuggestionSet>(r#"{"ideas": []}"#).unwrap_err();
        assert_matches!(err, ExtractError::Validation { stage: Stage::Suggestions, ref detail } if detail.contains("missing field 'suggestions'"));
    }

    #[test]
    fn suggestions_not_an_array_is_validation_error() {
        let err = extract::<SuggestionSet>(r#"{"suggestions": {"title": "x"}}"#).unwrap_err();
        assert_matches!(err, ExtractError::Validation { ref detail, .. } if detail.contains("must be an array"));
    }

    #[test]
    fn suggestions_with_unknown_category_is_validation_error() {
        let reply = r#"{"suggestions":[{"title":"t","description":"d","category":"plumbing","impact":"low","cost":"$"}]}"#;
        let err = extract::<SuggestionSet>(reply).unwrap_err();
        assert_matches!(err, ExtractError::Validation { ref detail, .. } if detail.contains("suggestions[0]") && detail.contains("category"));
    }

    #[test]
    fn suggestions_parse_into_drafts() {
        let reply = format!(
            "```json\n{{\"suggestions\": [{}, {}]}}\n```",
            suggestion_json("Rug"),
            suggestion_json("Lamp")
        );
        let set: SuggestionSet = extract(&reply).unwrap();
        assert_eq!(set.suggestions.len(), 2);
        assert_eq!(set.suggestions[1].title, "Lamp");
        assert_eq!(set.suggestions[0].cost, CostTier::Low);
    }

    #[test]
    fn image_prompt_requires_both_fields() {
        let err = extract::<ImagePrompt>(r#"{"imagePrompt": "a cosy room"}"#).unwrap_err();
        assert_matches!(err, ExtractError::Validation { stage: Stage::ImagePrompt, ref detail } if detail.contains("negativePrompt"));

        let ok: ImagePrompt =
            extract(r#"{"imagePrompt": "a cosy room", "negativePrompt": "blurry"}"#).unwrap();
        assert_eq!(ok.image_prompt, "a cosy room");
    }

    #[test]
    fn error_reports_its_stage() {
        let err = extract::<ImagePrompt>("nothing").unwrap_err();
        assert_eq!(err.stage(), Stage::ImagePrompt);
        assert!(err.to_string().starts_with("image_prompt:"));
    }
}
