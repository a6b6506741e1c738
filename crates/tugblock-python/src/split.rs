//! Partition a text span into statement chunks and non-code chunks.
//!
//! Given the start (and, where known, end) positions of the top-level
//! statements in a text, [`split_code_lines`] carves the text into
//! contiguous chunks: one per statement, plus chunks for the standalone
//! comments and blank lines between them. Trailing comments on a
//! statement's last line stay with the statement.

use std::sync::LazyLock;

use regex::Regex;
use tugblock_core::{BlockError, BlockResult, FilePos, FileText};

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new("#.*").expect("valid regex"));

/// Whether `line` holds nothing but whitespace and an optional comment.
pub fn is_comment_or_blank(line: &str) -> bool {
    COMMENT.replace_all(line, "").trim_end().is_empty()
}

/// Location of one top-level statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpan {
    pub start: FilePos,
    /// Known only for statements that are bare multi-line strings.
    pub end: Option<FilePos>,
}

/// One piece of a split text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Index into the spans passed to [`split_code_lines`]; `None` for
    /// comment/blank chunks.
    pub node: Option<usize>,
    pub text: FileText,
}

fn check(condition: bool, what: &str, start: FilePos, end: FilePos) -> BlockResult<()> {
    if condition {
        Ok(())
    } else {
        Err(BlockError::internal(format!(
            "split_code_lines: {} (start={}, end={})",
            what, start, end
        )))
    }
}

fn line_of(text: &FileText, lineno: u32) -> &str {
    text.line(lineno).unwrap_or("")
}

/// Split `text` at the statements described by `spans`.
///
/// `spans` must be in source order and fall inside `text`. The chunks
/// returned cover `text` exactly, in order.
pub fn split_code_lines(spans: &[NodeSpan], text: &FileText) -> BlockResult<Vec<Chunk>> {
    let (Some(first), Some(last)) = (spans.first(), spans.last()) else {
        return Ok(vec![Chunk {
            node: None,
            text: text.clone(),
        }]);
    };
    check(
        text.startpos() <= first.start,
        "first statement starts before the text",
        text.startpos(),
        first.start,
    )?;
    check(
        last.start < text.endpos(),
        "last statement starts at or after the end of the text",
        last.start,
        text.endpos(),
    )?;

    let mut chunks = Vec::new();
    if text.startpos() != first.start {
        chunks.push(Chunk {
            node: None,
            text: text.slice(text.startpos(), first.start),
        });
    }

    for (index, span) in spans.iter().enumerate() {
        let start = span.start;
        let next_start = spans
            .get(index + 1)
            .map_or_else(|| text.endpos(), |next| next.start);
        check(start < next_start, "statements out of order", start, next_start)?;

        // An explicit end settles the boundary only when the rest of its line
        // is a comment or blank; `'''a\nb'''; x = 1` falls through below.
        let absorbed = match span.end {
            Some(end) => {
                check(
                    start < end && end <= next_start,
                    "string end outside its statement",
                    start,
                    end,
                )?;
                // `end` is just past a closing quote, never at column 1
                check(end.colno != 1, "string end at column 1", start, end)?;
                let line_end = text.endpos().min(FilePos::line_start(end.lineno + 1));
                is_comment_or_blank(&text.slice(end, line_end).joined()).then_some(line_end)
            }
            None => None,
        };

        let endpos = match absorbed {
            Some(endpos) => endpos,
            None => {
                let mut endpos = next_start;
                // a comment on the last line with no trailing newline
                if endpos.colno != 1
                    && endpos == text.endpos()
                    && is_comment_or_blank(line_of(text, endpos.lineno))
                {
                    check(
                        start.lineno < endpos.lineno,
                        "trailing comment on the statement's own line",
                        start,
                        endpos,
                    )?;
                    if !line_of(text, endpos.lineno - 1).ends_with('\\') {
                        endpos = FilePos::line_start(endpos.lineno);
                    }
                }
                if endpos.colno == 1 {
                    while endpos.lineno - 1 > start.lineno
                        && is_comment_or_blank(line_of(text, endpos.lineno - 1))
                        && !line_of(text, endpos.lineno - 2).ends_with('\\')
                    {
                        endpos = FilePos::line_start(endpos.lineno - 1);
                    }
                }
                endpos
            }
        };

        check(
            start < endpos && endpos <= next_start,
            "statement end outside its range",
            start,
            endpos,
        )?;
        chunks.push(Chunk {
            node: Some(index),
            text: text.slice(start, endpos),
        });
        if endpos != next_start {
            chunks.push(Chunk {
                node: None,
                text: text.slice(endpos, next_start),
            });
        }
    }
    Ok(chunks)
}
