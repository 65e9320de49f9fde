//! Helpers for pulling usable text out of model replies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```(?:json)?\n?|```$").expect("valid fence regex"));

/// Remove Markdown code fences (```` ``` ```` and ```` ```json ````) and trim.
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text.trim(), "").trim().to_string()
}

/// Parse the outermost `{...}` span as a JSON object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}
