//! `?` placeholder scanning.
//!
//! Builders write statements with positional `?` markers. Before execution they are
//! renumbered to `$1, $2, ...`. Markers inside single-quoted literals, double-quoted
//! identifiers and comments are left alone. PostgreSQL's `?`, `?|` and `?&` jsonb
//! operators cannot be written through a builder.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    Quoted,
    LineComment,
    BlockComment,
}

fn scan(sql: &str, mut out: Option<&mut String>) -> usize {
    let mut count = 0;
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            Scan::Code => match ch {
                '\'' => state = Scan::Literal,
                '"' => state = Scan::Quoted,
                '-' if chars.peek() == Some(&'-') => state = Scan::LineComment,
                '/' if chars.peek() == Some(&'*') => state = Scan::BlockComment,
                '?' => {
                    count += 1;
                    if let Some(out) = out.as_deref_mut() {
                        out.push('$');
                        out.push_str(&count.to_string());
                    }
                    continue;
                }
                _ => {}
            },
            // A doubled quote closes and immediately reopens, which is what we want.
            Scan::Literal if ch == '\'' => state = Scan::Code,
            Scan::Quoted if ch == '"' => state = Scan::Code,
            Scan::LineComment if ch == '\n' => state = Scan::Code,
            Scan::BlockComment if ch == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                if let Some(out) = out.as_deref_mut() {
                    out.push_str("*/");
                }
                state = Scan::Code;
                continue;
            }
            _ => {}
        }
        if let Some(out) = out.as_deref_mut() {
            out.push(ch);
        }
    }
    count
}

/// Number of `?` markers outside literals, quoted identifiers and comments.
pub fn count_placeholders(sql: &str) -> usize {
    scan(sql, None)
}

/// Rewrite `?` markers to `$1, $2, ...` in order of appearance.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    scan(sql, Some(&mut out));
    out
}
