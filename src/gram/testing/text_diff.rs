//! Text diffing utilities for testing
//!
//! Comparison helpers for round-trip tests, where exact text output
//! matters: a char-level divergence index for machines, a line-level report
//! for humans.

/// The char index at which two strings first diverge, or `None` when they
/// are equal. When one string is a prefix of the other, the index is the
/// prefix length.
pub fn first_divergence(expected: &str, actual: &str) -> Option<usize> {
    let mut expected = expected.chars();
    let mut actual = actual.chars();
    let mut index = 0;
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return None,
            (Some(e), Some(a)) if e == a => index += 1,
            _ => return Some(index),
        }
    }
}

/// Compare two strings line by line and return a diff report, or `None`
/// when they are equal.
pub fn diff_text(expected: &str, actual: &str) -> Option<String> {
    if expected == actual {
        return None;
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    let mut diff_lines = Vec::new();
    let max_lines = expected_lines.len().max(actual_lines.len());

    for i in 0..max_lines {
        match (expected_lines.get(i), actual_lines.get(i)) {
            (Some(exp), Some(act)) if exp == act => {}
            (Some(exp), Some(act)) => {
                diff_lines.push(format!("Line {}: MISMATCH", i + 1));
                diff_lines.push(format!("  Expected: {exp:?}"));
                diff_lines.push(format!("  Actual:   {act:?}"));
            }
            (Some(exp), None) => {
                diff_lines.push(format!("Line {}: MISSING in actual", i + 1));
                diff_lines.push(format!("  Expected: {exp:?}"));
            }
            (None, Some(act)) => {
                diff_lines.push(format!("Line {}: EXTRA in actual", i + 1));
                diff_lines.push(format!("  Actual:   {act:?}"));
            }
            (None, None) => unreachable!(),
        }
    }

    Some(format!(
        "Text differs:\n{}\n\nExpected ({} lines):\n{}\n\nActual ({} lines):\n{}",
        diff_lines.join("\n"),
        expected_lines.len(),
        expected,
        actual_lines.len(),
        actual
    ))
}

/// Assert that two strings are equal, with a line-by-line diff on failure.
///
/// # Panics
///
/// Panics if the strings are not equal.
pub fn assert_text_eq(expected: &str, actual: &str) {
    if let Some(report) = diff_text(expected, actual) {
        panic!("\n\nText comparison failed:\n{report}\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_divergence_equal() {
        assert_eq!(first_divergence("abc", "abc"), None);
        assert_eq!(first_divergence("", ""), None);
    }

    #[test]
    fn test_first_divergence_index() {
        assert_eq!(first_divergence("abc", "abd"), Some(2));
        assert_eq!(first_divergence("abc", "xbc"), Some(0));
    }

    #[test]
    fn test_first_divergence_prefix() {
        assert_eq!(first_divergence("abc", "abcd"), Some(3));
        assert_eq!(first_divergence("abcd", "abc"), Some(3));
    }

    #[test]
    fn test_diff_text_identical() {
        assert_eq!(diff_text("hello\nworld", "hello\nworld"), None);
    }

    #[test]
    fn test_diff_text_reports_the_line() {
        let report = diff_text("hello\nworld", "hello\nplanet").unwrap();
        assert!(report.contains("Line 2: MISMATCH"));
        assert!(report.contains("world"));
        assert!(report.contains("planet"));
    }

    #[test]
    #[should_panic(expected = "Text comparison failed")]
    fn test_assert_text_eq_panics_on_difference() {
        assert_text_eq("hello", "goodbye");
    }
}
