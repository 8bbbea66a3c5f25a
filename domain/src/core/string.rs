//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Format a float with at most `decimals` places, dropping trailing zeros
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is two bytes; the cut backs off to a char boundary
        assert_eq!(truncate("ééééé", 8), "éé...");
        assert_eq!(truncate("café", 10), "café");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0, 2), "2");
        assert_eq!(format_number(0.126, 2), "0.13");
        assert_eq!(format_number(92.5, 1), "92.5");
        assert_eq!(format_number(-3.10, 3), "-3.1");
    }
}
