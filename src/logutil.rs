//! Log sanitizing for player-supplied text.
//!
//! Usernames, display names and rendered kit commands all pass through here
//! before they reach a log line, so a crafted name cannot forge extra lines.

/// Longest preview kept for ordinary values.
pub const MAX_PREVIEW: usize = 300;

/// Escape `s` for single-line logging, truncating at [`MAX_PREVIEW`] chars.
pub fn escape_log(s: &str) -> String {
    escape_log_limited(s, MAX_PREVIEW)
}

/// Same as [`escape_log`] with an explicit character limit.
///
/// `\n`, `\r`, `\t` and backslash get their usual escapes; any other control
/// character becomes `\xNN`. Output past `limit` input chars ends in `…`.
pub fn escape_log_limited(s: &str, limit: usize) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(s.len().min(limit) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
