/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a model response.
///
/// Handles a fenced block preceded by chatter ("Here is the plan: ```json ...```")
/// as well as a bare or partially fenced payload.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let inner = match (trimmed.find("```"), trimmed.rfind("```")) {
        (Some(open), Some(close)) if close > open => &trimmed[open..close],
        (Some(open), _) => &trimmed[open..],
        _ => trimmed,
    };
    inner
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
