//! Character predicates shared by every section handler.

/// `\n` or `\r`.
pub fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Space or tab. Newlines are a separate class.
pub fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// ASCII letters and digits only. Command, action and property names are
/// ASCII identifiers; accented letters, other scripts and emoji do not count.
pub fn is_alphanumeric(c: char) -> bool {
    c.is_ascii_alphanumeric()
}
