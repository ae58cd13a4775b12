//! Utility functions and helpers.

pub mod http;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite decimal points as commas (`1.80` -> `1,80`).
pub fn decimal_comma(s: &str) -> String {
    s.replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  A \n vs\tB  "), "A vs B");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(decimal_comma("1.80"), "1,80");
        assert_eq!(decimal_comma("2"), "2");
    }
}
