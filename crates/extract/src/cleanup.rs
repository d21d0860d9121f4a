use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
});

/// Strip the markdown code fence models like to wrap their answers in.
/// Text outside the first fenced block is discarded; unfenced output is
/// returned trimmed.
pub fn clean_llm_output(raw: &str) -> String {
    match FENCED_BLOCK.captures(raw).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Best-effort slice of the outermost JSON object in `raw`.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// First `max_chars` characters of `text`, for error markers and logs.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
