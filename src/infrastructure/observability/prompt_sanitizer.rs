const MAX_VISIBLE_CHARS: usize = 100;

/// Sanitizes steering text (prompts, hotwords) for logging. Truncation
/// counts characters, so multi-byte hotword lists are cut safely.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total = trimmed.chars().count();
    let sanitized = match trimmed.char_indices().nth(MAX_VISIBLE_CHARS) {
        Some((cut, _)) => format!("{}... ({} chars total)", &trimmed[..cut], total),
        None => trimmed.to_string(),
    };

    redact_sensitive_patterns(&sanitized)
}

fn redact_sensitive_patterns(text: &str) -> String {
    let patterns = [
        ("Bearer ", "Bearer [REDACTED]"),
        ("api_key=", "api_key=[REDACTED]"),
        ("password=", "password=[REDACTED]"),
        ("token=", "token=[REDACTED]"),
        ("secret=", "secret=[REDACTED]"),
    ];

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        if let Some(idx) = result.find(pattern) {
            let end = result[idx + pattern.len()..]
                .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
                .map(|i| idx + pattern.len() + i)
                .unwrap_or(result.len());
            result = format!("{}{}{}", &result[..idx], replacement, &result[end..]);
        }
    }

    result
}
