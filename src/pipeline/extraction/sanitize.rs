/// Normalize an extracted field value.
/// Keeps ASCII letters and digits, spaces, `.`, `/` and `-`; drops the rest
/// (punctuation, currency symbols, non-Latin script) and trims the result.
pub fn normalize_field_value(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '/' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}
