//! Single-pass parser for the template grammar.
//!
//! The parser works on byte offsets. Every delimiter of the grammar is
//! ASCII, so slicing only ever happens at character boundaries even when
//! the surrounding text is not.

use crate::error::{Result, TemplateSyntaxError};
use crate::segment::Segment;

/// Where a run of text sits in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Outside any conditional. `!!` is an error here.
    TopLevel,
    /// Inside a conditional branch. `[$name]` is a variable here.
    Body,
}

/// Parses a raw template into segments.
pub(crate) fn parse(raw: &str) -> Result<Vec<Segment>> {
    parse_segments(raw, 0, Scope::TopLevel)
}

/// Returns true for bytes allowed in a column name.
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn name_len(s: &str) -> usize {
    s.bytes().take_while(|b| is_name_byte(*b)).count()
}

/// Accumulates segments, merging adjacent literal text.
#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
    literal: String,
}

impl SegmentBuilder {
    fn text(&mut self, text: &str) {
        self.literal.push_str(text);
    }

    fn push(&mut self, segment: Segment) {
        self.flush();
        self.segments.push(segment);
    }

    fn flush(&mut self) {
        if !self.literal.is_empty() {
            self.segments
                .push(Segment::Literal(std::mem::take(&mut self.literal)));
        }
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush();
        self.segments
    }
}

fn parse_segments(src: &str, base: usize, scope: Scope) -> Result<Vec<Segment>> {
    let bytes = src.as_bytes();
    let mut builder = SegmentBuilder::default();
    let mut pos = 0;
    let mut literal_start = 0;

    while pos < bytes.len() {
        let matched = match bytes[pos] {
            b'{' => {
                let rest = &src[pos..];
                match var_ref(rest, b'{', b'}') {
                    Some(found) => Some(found),
                    None => conditional(rest, base + pos)?,
                }
            }
            b'[' if scope == Scope::Body => var_ref(&src[pos..], b'[', b']'),
            b'!' if scope == Scope::TopLevel && bytes.get(pos + 1) == Some(&b'!') => {
                return Err(TemplateSyntaxError::StrayElse { offset: base + pos });
            }
            _ => None,
        };

        match matched {
            Some((segment, consumed)) => {
                builder.text(&src[literal_start..pos]);
                builder.push(segment);
                pos += consumed;
                literal_start = pos;
            }
            // Anything unrecognized, including a lone `{`, stays literal.
            None => pos += 1,
        }
    }

    builder.text(&src[literal_start..]);
    Ok(builder.finish())
}

/// Recognizes `<open>$name<close>` at the start of `rest`.
///
/// Returns the segment and the number of bytes consumed.
fn var_ref(rest: &str, open: u8, close: u8) -> Option<(Segment, usize)> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&open) || bytes.get(1) != Some(&b'$') {
        return None;
    }
    let len = name_len(&rest[2..]);
    if len == 0 || bytes.get(2 + len) != Some(&close) {
        return None;
    }
    Some((Segment::var(&rest[2..2 + len]), len + 3))
}

/// Length of the column name when `rest` starts with `{?name`.
fn conditional_name(rest: &str) -> Option<usize> {
    if rest.as_bytes().get(1) != Some(&b'?') {
        return None;
    }
    Some(name_len(&rest[2..])).filter(|len| *len > 0)
}

/// Recognizes `{?name body}` at the start of `rest`.
///
/// Returns `Ok(None)` when `rest` does not open a conditional at all, and an
/// error when it opens one that never closes.
fn conditional(rest: &str, offset: usize) -> Result<Option<(Segment, usize)>> {
    let Some(len) = conditional_name(rest) else {
        return Ok(None);
    };
    let column = &rest[2..2 + len];

    let mut body_start = 2 + len;
    if rest
        .as_bytes()
        .get(body_start)
        .is_some_and(|b| b.is_ascii_whitespace())
    {
        body_start += 1;
    }

    let Some(bounds) = body_bounds(&rest[body_start..]) else {
        return Err(TemplateSyntaxError::UnclosedConditional {
            column: column.to_string(),
            offset,
        });
    };
    let body = &rest[body_start..body_start + bounds.close];
    let body_offset = offset + body_start;

    let (then_branch, else_branch) = match bounds.split {
        Some(split) => {
            let then_branch = parse_segments(&body[..split], body_offset, Scope::Body)?;
            let else_branch =
                parse_segments(&body[split + 2..], body_offset + split + 2, Scope::Body)?;
            (then_branch, Some(else_branch))
        }
        None => (parse_segments(body, body_offset, Scope::Body)?, None),
    };

    let segment = Segment::conditional(column, then_branch, else_branch);
    Ok(Some((segment, body_start + bounds.close + 1)))
}

/// Where a conditional body ends and where its `!!` sits, if it has one.
struct BodyBounds {
    close: usize,
    split: Option<usize>,
}

/// Scans a conditional body that starts at `body[0]`.
///
/// Only `{$name}` and `{?name` count as markup. Any other `{` is literal
/// text and does not need a matching `}`.
fn body_bounds(body: &str) -> Option<BodyBounds> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if let Some((_, consumed)) = var_ref(&body[i..], b'{', b'}') {
                    i += consumed;
                    continue;
                }
                if conditional_name(&body[i..]).is_some() {
                    depth += 1;
                }
            }
            b'}' if depth == 0 => return Some(BodyBounds { close: i, split }),
            b'}' => depth -= 1,
            b'!' if depth == 0 && split.is_none() && bytes.get(i + 1) == Some(&b'!') => {
                split = Some(i);
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}
