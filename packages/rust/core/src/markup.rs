//! Escaping for text interpolated into HTML and XML output.

/// Escape for HTML/XML element content and attribute values.
///
/// Escapes: `& < > " '`
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_all_chars() {
        assert_eq!(escape("a<b>c&d\"e'f"), "a&lt;b&gt;c&amp;d&quot;e&#x27;f");
    }

    #[test]
    fn escape_is_not_idempotent_on_entities() {
        assert_eq!(escape("&lt;"), "&amp;lt;");
        assert_eq!(escape("G0 Rapid Motion"), "G0 Rapid Motion");
    }
}
