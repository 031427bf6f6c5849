//! Markdown escaping applied to every piece of extracted text before it
//! is handed to callers.

/// Escape backslashes, double quotes, and newlines.
///
/// Backslashes first, so the escapes introduced for quotes and newlines
/// are not themselves re-escaped.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_newlines() {
        assert_eq!(escape_markdown("a\"b\nc"), "a\\\"b\\nc");
    }

    #[test]
    fn escapes_backslash_first() {
        assert_eq!(escape_markdown("a\\n"), "a\\\\n");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(escape_markdown("三个卖点"), "三个卖点");
    }
}
