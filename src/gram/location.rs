//! Byte-offset to line/column conversion for error reporting.

/// Convert a byte offset into a 1-based `(line, column)` pair.
///
/// The column counts characters, not bytes, so multi-byte symbols such as
/// `≈` advance it by one. Offsets past the end of the text report the
/// position just after the last character.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (idx, ch) in text.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_start() {
        assert_eq!(line_col("abc", 0), (1, 1));
    }

    #[test]
    fn test_line_col_second_line() {
        assert_eq!(line_col("ab\ncd", 3), (2, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
    }

    #[test]
    fn test_line_col_past_end() {
        assert_eq!(line_col("ab", 10), (1, 3));
    }

    #[test]
    fn test_line_col_multibyte() {
        // `≈` is three bytes but one column
        let text = "a ≈ b";
        assert_eq!(line_col(text, 5), (1, 4));
    }
}
