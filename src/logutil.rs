//! Sanitizers for member-supplied strings that end up in log lines.
//!
//! Usernames pass charset validation before they are stored, but display
//! names and receipt store names arrive raw, so anything interpolated into a
//! log message goes through one of these helpers to stay single-line.

/// Longest slice of a member-supplied string a log line will carry.
const LOG_FIELD_MAX: usize = 120;

/// Store names are short on real receipts; anything longer is noise.
const STORE_PREVIEW_MAX: usize = 48;

fn escape_limited(s: &str, max: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max) + 8);
    let mut taken = 0usize;
    for ch in s.chars() {
        if taken >= max {
            out.push('…');
            break;
        }
        taken += 1;
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Escape a member-supplied field for single-line logging. Control
/// characters become escape sequences and overlong input is truncated with
/// an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_limited(s, LOG_FIELD_MAX)
}

/// Escape a receipt store name with a tighter cap than [`escape_log`].
pub fn store_preview(s: &str) -> String {
    escape_limited(s, STORE_PREVIEW_MAX)
}

#[cfg(test)]
mod tests {
    use super::{escape_log, store_preview};

    #[test]
    fn escapes_newlines_and_tabs() {
        let s = "Zara\nHome\r\tEnd";
        assert_eq!(escape_log(s), "Zara\\nHome\\r\\tEnd");
    }

    #[test]
    fn control_characters_become_hex() {
        assert_eq!(escape_log("a\x07b"), "a\\x07b");
    }

    #[test]
    fn store_preview_truncates_long_names() {
        let long = "M".repeat(200);
        let preview = store_preview(&long);
        assert!(preview.ends_with('…'));
        assert!(preview.chars().count() <= 49);
    }
}
