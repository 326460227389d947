//! Bounded one-line rendering of HTTP bodies
//!
//! Changelist bodies can carry whole record sets (DKIM keys, long TXT
//! values) and pretty-printed JSON. Log lines and fallback error messages
//! only ever show a single line of at most [`PREVIEW_LIMIT`] bytes.

use std::fmt;

/// Bytes of a body shown before the size marker.
pub const PREVIEW_LIMIT: usize = 512;

/// Lazily formatted view of a body, see [`preview`].
#[derive(Debug, Clone, Copy)]
pub struct BodyPreview<'a> {
    body: &'a str,
}

/// Render `body` for a log line: trimmed, whitespace runs folded into one
/// space, cut at a char boundary and suffixed with `[shown of total bytes]`
/// when longer than [`PREVIEW_LIMIT`].
#[must_use]
pub fn preview(body: &str) -> BodyPreview<'_> {
    BodyPreview { body: body.trim() }
}

impl BodyPreview<'_> {
    /// End of the longest prefix that fits the limit.
    fn cut(&self) -> usize {
        self.body
            .char_indices()
            .map(|(index, c)| index + c.len_utf8())
            .take_while(|&end| end <= PREVIEW_LIMIT)
            .last()
            .unwrap_or(0)
    }
}

impl fmt::Display for BodyPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            return f.write_str("<empty body>");
        }

        let cut = self.cut();
        let mut in_gap = false;
        for c in self.body[..cut].chars() {
            if c.is_whitespace() || c.is_control() {
                if !in_gap {
                    f.write_str(" ")?;
                }
                in_gap = true;
            } else {
                in_gap = false;
                fmt::Write::write_char(f, c)?;
            }
        }

        if cut < self.body.len() {
            write!(f, "... [{cut} of {} bytes]", self.body.len())?;
        }
        Ok(())
    }
}
