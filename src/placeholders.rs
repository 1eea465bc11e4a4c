//! Positional placeholder handling for caller-written SQL fragments.
//!
//! `where_raw` fragments are written with their own `$1..$k` numbering. When the
//! fragment is spliced into a larger statement its placeholders are shifted so they
//! follow the parameters bound before it. Quoted strings, quoted identifiers, comments
//! and dollar-quoted blocks are skipped whole, so a `$1` inside them is left alone.

use std::borrow::Cow;

/// A `$n` found in live SQL text: byte span and parsed index.
struct Placeholder {
    start: usize,
    end: usize,
    index: usize,
}

/// End of a `'...'` or `"..."` run starting at `start`; doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |pos| start + pos + 1)
}

/// Block comments nest in Postgres.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the `$` closing a `$tag$` opener at `start`. A digit right after the
/// first `$` makes it a placeholder instead.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start + 1)?;
    if first.is_ascii_digit() {
        return None;
    }
    let len = bytes[start + 1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    let end = start + 1 + len;
    (bytes.get(end) == Some(&b'$')).then_some(end)
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag_end: usize) -> usize {
    let delimiter = &bytes[start..=tag_end];
    bytes[tag_end + 1..]
        .windows(delimiter.len())
        .position(|window| window == delimiter)
        .map_or(bytes.len(), |pos| tag_end + 1 + pos + delimiter.len())
}

fn placeholders(sql: &str) -> Vec<Placeholder> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        i = match bytes[i] {
            b'\'' => skip_quoted(bytes, i, b'\''),
            b'"' => skip_quoted(bytes, i, b'"'),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_block_comment(bytes, i),
            b'$' => {
                if let Some(tag_end) = dollar_tag_end(bytes, i) {
                    skip_dollar_quoted(bytes, i, tag_end)
                } else {
                    let digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit());
                    let end = i + 1 + digits.count();
                    if end > i + 1
                        && let Ok(index) = sql[i + 1..end].parse()
                    {
                        found.push(Placeholder { start: i, end, index });
                    }
                    end.max(i + 1)
                }
            }
            _ => i + 1,
        };
    }
    found
}

/// Shift every `$n` placeholder in `sql` to `$(n + offset)`.
///
/// Returns a borrowed `Cow` when `offset` is zero or there is nothing to shift.
#[must_use]
pub fn shift_placeholders(sql: &str, offset: usize) -> Cow<'_, str> {
    if offset == 0 {
        return Cow::Borrowed(sql);
    }
    let found = placeholders(sql);
    if found.is_empty() {
        return Cow::Borrowed(sql);
    }
    let mut out = String::with_capacity(sql.len() + found.len() * 2);
    let mut copied = 0;
    for p in found {
        out.push_str(&sql[copied..p.start]);
        out.push('$');
        out.push_str(&(p.index + offset).to_string());
        copied = p.end;
    }
    out.push_str(&sql[copied..]);
    Cow::Owned(out)
}

/// Highest placeholder index referenced by `sql`, or 0 when it has none.
#[must_use]
pub fn max_placeholder(sql: &str) -> usize {
    placeholders(sql).iter().map(|p| p.index).max().unwrap_or(0)
}
