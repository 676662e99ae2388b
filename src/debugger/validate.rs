//! Pure input validators the (external) REPL uses to reject malformed
//! verb arguments before they ever reach a [`crate::Debugger`] verb. None
//! of these do I/O; they exist so bad input produces `BadUserInput` only
//! for the cases that still slip through.

/// Accepts exactly `path:N` where `N` is a positive integer and `path` is
/// non-empty.
pub fn looks_like_file_line(s: &str) -> bool {
    let Some((path, line)) = s.rsplit_once(':') else {
        return false;
    };
    if path.is_empty() || line.is_empty() {
        return false;
    }
    matches!(line.parse::<u64>(), Ok(n) if n > 0)
}

/// Accepts a non-empty string whose first character is a letter or
/// underscore and whose remaining characters are letters, digits, or
/// underscores.
pub fn looks_like_function_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `input` matches either the short or the long form of a
/// command name, e.g. `is_command("c", "c", "continue")`.
pub fn is_command(input: &str, short_form: &str, long_form: &str) -> bool {
    input == short_form || input == long_form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_accepts_valid() {
        assert!(looks_like_file_line("this/is/a/file:2578"));
    }

    #[test]
    fn file_line_rejects_missing_line() {
        assert!(!looks_like_file_line(
            "this/is/a/filename/without/a/line"
        ));
    }

    #[test]
    fn file_line_rejects_bare_number() {
        assert!(!looks_like_file_line("710985"));
    }

    #[test]
    fn file_line_rejects_trailing_garbage() {
        assert!(!looks_like_file_line("src/blah/test.c74"));
    }

    #[test]
    fn function_name_accepts_valid() {
        assert!(looks_like_function_name("function_name_check_works1203"));
    }

    #[test]
    fn function_name_rejects_leading_digit() {
        assert!(!looks_like_function_name("785019blah_function"));
    }

    #[test]
    fn function_name_rejects_hyphen() {
        assert!(!looks_like_function_name("check-function-name"));
    }

    #[test]
    fn function_name_rejects_punctuation() {
        assert!(!looks_like_function_name("check>function!>name"));
    }

    #[test]
    fn is_command_matches_short_or_long() {
        assert!(is_command("c", "c", "continue"));
        assert!(is_command("continue", "c", "continue"));
        assert!(!is_command("cont", "c", "continue"));
    }
}
