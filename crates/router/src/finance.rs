use std::sync::OnceLock;

use regex::Regex;

fn symbol_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\b(?:price|quote)\s+(?:for|of)\s+([A-Za-z]{1,5})\b",
            r"(?i)\b([A-Za-z]{1,5})\s+(?:stock|share)s?\s+(?:price|quote)\b",
            r"(?i)\bticker\s+([A-Za-z]{1,5})\b",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("symbol pattern must compile"))
        .collect()
    })
}

/// Return a likely ticker symbol mentioned in the user text.
pub fn extract_symbol(user_text: &str) -> Option<String> {
    for pattern in symbol_patterns() {
        if let Some(captures) = pattern.captures(user_text) {
            if let Some(matched) = captures.get(1) {
                return Some(matched.as_str().to_ascii_uppercase());
            }
        }
    }
    None
}
