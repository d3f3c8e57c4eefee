//! POSIX shell quoting.

/// Quote `value` for a POSIX shell.
///
/// Values made only of characters that are never special are returned as
/// is; anything else is wrapped in single quotes with embedded quotes
/// escaped as `'\''`.
pub fn quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/:@%+=,".contains(c));
    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
