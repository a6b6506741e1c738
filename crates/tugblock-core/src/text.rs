//! Text positions and immutable text spans.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Columns count Unicode scalar values (chars), not bytes
//! - A [`FileText`] is anchored at a start position: its first line begins at
//!   the anchor column, every later line begins at column 1
//!
//! A `FileText` never changes once built. Slicing and concatenation produce
//! new spans that share nothing mutable with their source.

use std::fmt;
use std::ops::Add;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Positions
// ============================================================================

/// A (line, column) position, both 1-indexed.
///
/// Positions order by line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilePos {
    /// Line number (1-indexed).
    pub lineno: u32,
    /// Column number (1-indexed, chars).
    pub colno: u32,
}

impl FilePos {
    /// The first position of any text.
    pub const START: FilePos = FilePos { lineno: 1, colno: 1 };

    /// Create a position. Zero coordinates are clamped to 1.
    pub fn new(lineno: u32, colno: u32) -> Self {
        FilePos {
            lineno: lineno.max(1),
            colno: colno.max(1),
        }
    }

    /// The position at the start of `lineno`.
    pub fn line_start(lineno: u32) -> Self {
        FilePos::new(lineno, 1)
    }
}

impl Default for FilePos {
    fn default() -> Self {
        FilePos::START
    }
}

impl From<(u32, u32)> for FilePos {
    fn from((lineno, colno): (u32, u32)) -> Self {
        FilePos::new(lineno, colno)
    }
}

/// Offset a position by a `(line_delta, col_delta)` pair.
///
/// A delta measured inside a sub-span is relative to that span's anchor: on
/// the anchor line columns shift, on any later line they restart at 1.
impl Add<(u32, u32)> for FilePos {
    type Output = FilePos;

    fn add(self, (line_delta, col_delta): (u32, u32)) -> FilePos {
        if line_delta == 0 {
            FilePos::new(self.lineno, self.colno + col_delta)
        } else {
            FilePos::new(self.lineno + line_delta, 1 + col_delta)
        }
    }
}

impl fmt::Display for FilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.lineno, self.colno)
    }
}

// ============================================================================
// Char/byte helpers
// ============================================================================

/// Convert a byte offset within `line` into a 0-indexed char column.
///
/// Offsets past the end of the line (or inside a multi-byte char) count the
/// chars that start before the offset.
pub fn byte_to_char_column(line: &str, byte_offset: usize) -> u32 {
    line.char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .count() as u32
}

/// Byte offset of the `char_index`-th char of `s`, clamped to `s.len()`.
fn char_to_byte(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Number of chars in `s`, as a column width.
fn char_width(s: &str) -> u32 {
    s.chars().count() as u32
}

// ============================================================================
// FileText
// ============================================================================

/// An immutable, line-addressable span of source text.
///
/// Lines are split on `\n` and stored without their terminator, so
/// `"a\nb\n"` holds the lines `"a"`, `"b"` and `""`. The end position is
/// derived from the anchor and the last line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileText {
    lines: Arc<[String]>,
    filename: Option<PathBuf>,
    startpos: FilePos,
}

impl FileText {
    /// Build a text span anchored at (1,1) with no filename.
    pub fn new(text: impl AsRef<str>) -> Self {
        FileText {
            lines: text.as_ref().split('\n').map(String::from).collect(),
            filename: None,
            startpos: FilePos::START,
        }
    }

    fn from_lines(lines: Vec<String>, filename: Option<PathBuf>, startpos: FilePos) -> Self {
        debug_assert!(!lines.is_empty(), "FileText always holds at least one line");
        FileText {
            lines: lines.into(),
            filename,
            startpos,
        }
    }

    /// Attach a filename (used in diagnostics).
    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Re-anchor the span at `startpos`.
    pub fn with_startpos(mut self, startpos: FilePos) -> Self {
        self.startpos = startpos;
        self
    }

    /// The filename, if known.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The anchor position of the first char.
    pub fn startpos(&self) -> FilePos {
        self.startpos
    }

    /// The position just past the last char.
    pub fn endpos(&self) -> FilePos {
        let last = self.lines.last().map(String::as_str).unwrap_or("");
        let count = self.lines.len() as u32;
        if count <= 1 {
            FilePos::new(self.startpos.lineno, self.startpos.colno + char_width(last))
        } else {
            FilePos::new(self.startpos.lineno + count - 1, char_width(last) + 1)
        }
    }

    /// All lines, without terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines (a trailing newline contributes an empty last line).
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Whether the span holds no text at all.
    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    /// The line with absolute number `lineno`, if it falls inside the span.
    ///
    /// The first line is returned from the anchor column onward, exactly as
    /// stored.
    pub fn line(&self, lineno: u32) -> Option<&str> {
        let index = lineno.checked_sub(self.startpos.lineno)? as usize;
        self.lines.get(index).map(String::as_str)
    }

    /// Column at which line `lineno` begins within this span.
    pub fn line_startcol(&self, lineno: u32) -> u32 {
        if lineno == self.startpos.lineno {
            self.startpos.colno
        } else {
            1
        }
    }

    /// The text as a single string, lines joined with `\n`.
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    /// Clamp `pos` into `[startpos, endpos]` and map it to (line index, char index).
    fn locate(&self, pos: FilePos) -> (usize, usize) {
        let pos = pos.clamp(self.startpos, self.endpos());
        let index = (pos.lineno - self.startpos.lineno) as usize;
        let line = &self.lines[index];
        let col = pos.colno.saturating_sub(self.line_startcol(pos.lineno)) as usize;
        (index, col.min(line.chars().count()))
    }

    /// The sub-span between `start` (inclusive) and `end` (exclusive).
    ///
    /// Both positions are clamped into this span; an inverted range yields an
    /// empty span anchored at `start`.
    pub fn slice(&self, start: FilePos, end: FilePos) -> FileText {
        let (start_line, start_col) = self.locate(start);
        let (end_line, end_col) = self.locate(end.max(start));
        let anchor = {
            let lineno = self.startpos.lineno + start_line as u32;
            FilePos::new(lineno, self.line_startcol(lineno) + start_col as u32)
        };

        let lines = if start_line == end_line {
            let line = &self.lines[start_line];
            let from = char_to_byte(line, start_col);
            let to = char_to_byte(line, end_col.max(start_col));
            vec![line[from..to].to_string()]
        } else {
            let mut lines = Vec::with_capacity(end_line - start_line + 1);
            let first = &self.lines[start_line];
            lines.push(first[char_to_byte(first, start_col)..].to_string());
            lines.extend(self.lines[start_line + 1..end_line].iter().cloned());
            let last = &self.lines[end_line];
            lines.push(last[..char_to_byte(last, end_col)].to_string());
            lines
        };

        FileText::from_lines(lines, self.filename.clone(), anchor)
    }

    /// The rest of the span starting at `start`.
    pub fn slice_from(&self, start: FilePos) -> FileText {
        self.slice(start, self.endpos())
    }

    /// Join textually contiguous spans into one.
    ///
    /// Each span must start exactly where the previous one ends; this is the
    /// caller's responsibility and is only checked against anchors in debug
    /// builds. Returns `None` for an empty input.
    pub fn concatenate<'a>(texts: impl IntoIterator<Item = &'a FileText>) -> Option<FileText> {
        let mut iter = texts.into_iter();
        let first = iter.next()?;
        let mut joined = first.joined();
        let mut prev_end = first.endpos();
        for text in iter {
            debug_assert_eq!(
                prev_end,
                text.startpos(),
                "FileText::concatenate: spans are not contiguous"
            );
            joined.push_str(&text.joined());
            prev_end = text.endpos();
        }
        let lines = joined.split('\n').map(String::from).collect();
        Some(FileText::from_lines(
            lines,
            first.filename.clone(),
            first.startpos,
        ))
    }
}

impl fmt::Display for FileText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl From<&str> for FileText {
    fn from(text: &str) -> Self {
        FileText::new(text)
    }
}

impl From<String> for FileText {
    fn from(text: String) -> Self {
        FileText::new(text)
    }
}

// ============================================================================
// Tests
// ============================================================================
