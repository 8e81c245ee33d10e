use std::ops::Range;

/// A `:name` placeholder found in query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Name without the leading `:`.
    pub name: &'a str,
    /// Byte range of the full token, colon included.
    pub span: Range<usize>,
}

/// Find every `:name` placeholder in `sql`, in order of appearance.
///
/// Names are maximal identifiers (`[A-Za-z_][A-Za-z0-9_]*`), so `:id` is never found inside
/// `:identifier`. Quoted strings and identifiers, comments and `::` casts are skipped.
#[must_use]
pub fn scan_placeholders(sql: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::Quoted(b'\''),
                b'"' => state = State::Quoted(b'"'),
                b'`' => state = State::Quoted(b'`'),
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b':' if bytes.get(idx + 1) == Some(&b':') => {
                    // `::type` cast
                    idx += 1;
                }
                b':' => {
                    if let Some(end) = scan_identifier(bytes, idx + 1) {
                        found.push(Placeholder {
                            name: &sql[idx + 1..end],
                            span: idx..end,
                        });
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::Quoted(quote) => {
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // doubled quote is an escape
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    found
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment(u32),
}

fn scan_identifier(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    Some(idx)
}
