//! RFC4180-style field escaping used by the line-oriented resource files.
//!
//! Fields containing commas, double quotes, or newlines are wrapped in double
//! quotes with internal quotes doubled. Everything else passes through as-is.

/// Returns true if the field must be wrapped in quotes when written.
pub fn needs_quoting(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Escape a single field for writing.
pub fn escape_field(field: &str) -> String {
    if needs_quoting(field) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse a quoted segment at the start of `input`.
///
/// Returns the unescaped content and the remainder after the closing quote,
/// or `None` if `input` does not start with a quote or the quote never
/// closes.
pub fn take_quoted(input: &str) -> Option<(String, &str)> {
    let rest = input.strip_prefix('"')?;
    let mut content = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '"' {
            // A doubled quote is a literal quote; a lone quote closes the field.
            match rest[i + 1..].chars().next() {
                Some('"') => {
                    content.push('"');
                    chars.next();
                }
                _ => return Some((content, &rest[i + 1..])),
            }
        } else {
            content.push(c);
        }
    }
    None
}

/// Unquote a field value: a leading quoted segment wins, anything after its
/// closing quote is ignored; unquoted input is returned verbatim.
pub fn unquote_field(field: &str) -> String {
    match take_quoted(field) {
        Some((content, _rest)) => content,
        None => field.to_string(),
    }
}
