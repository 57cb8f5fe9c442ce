//! Helpers for emitting Graphviz DOT text.

/// Escapes `s` for use inside a double-quoted DOT label.
///
/// Quotes, backslashes and angle brackets are backslash-escaped, line feeds
/// become `\n` and carriage returns are dropped.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '"' | '<' | '>' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}
