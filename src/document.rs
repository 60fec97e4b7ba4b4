//! The readable "page": paragraphs of plain text wrapped to the terminal.
//!
//! Paragraphs are the text containers a selection lives in. Offsets are char
//! indices into a paragraph, so the same [`TextRange`] survives re-wrapping.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::geometry::Point;
use crate::models::{Selection, TextRange};
use crate::utils::wrap_chars;

#[derive(Debug, Clone)]
pub struct Document {
    host: String,
    paragraphs: Vec<Arc<str>>,
}

/// A position between two characters of one paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocPos {
    pub paragraph: usize,
    pub offset: usize,
}

/// One wrapped row on screen. Separator rows between paragraphs have no
/// paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    pub paragraph: Option<usize>,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DocumentView {
    width: u16,
    lines: Vec<VisualLine>,
}

impl Document {
    /// Blank lines separate paragraphs; whitespace inside a paragraph collapses.
    pub fn parse(host: impl Into<String>, text: &str) -> Self {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                push_paragraph(&mut paragraphs, &mut current);
            } else {
                current.extend(line.split_whitespace());
            }
        }
        push_paragraph(&mut paragraphs, &mut current);

        Self {
            host: host.into(),
            paragraphs,
        }
    }

    /// Reads `path`; the host defaults to the file name.
    pub fn from_file(path: &Path, host: Option<String>) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let host = host.unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "localhost".to_string())
        });
        Ok(Self::parse(host, &text))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn paragraphs(&self) -> &[Arc<str>] {
        &self.paragraphs
    }

    pub fn layout(&self, width: u16) -> DocumentView {
        let columns = usize::from(width.max(1));
        let mut lines = Vec::new();
        for (index, paragraph) in self.paragraphs.iter().enumerate() {
            if index > 0 {
                lines.push(VisualLine {
                    paragraph: None,
                    start: 0,
                    end: 0,
                    text: String::new(),
                });
            }
            let chars: Vec<char> = paragraph.chars().collect();
            for (start, end) in wrap_chars(&chars, columns) {
                lines.push(VisualLine {
                    paragraph: Some(index),
                    start,
                    end,
                    text: chars[start..end].iter().collect(),
                });
            }
        }
        DocumentView { width, lines }
    }

    /// Range between two positions, kept inside the paragraph where the drag
    /// began. `None` when nothing is covered.
    pub fn text_range(&self, from: DocPos, to: DocPos) -> Option<TextRange> {
        let paragraph = self.paragraphs.get(from.paragraph)?;
        let len = paragraph.chars().count();
        let to_offset = match to.paragraph.cmp(&from.paragraph) {
            std::cmp::Ordering::Equal => to.offset,
            std::cmp::Ordering::Greater => len,
            std::cmp::Ordering::Less => 0,
        };
        let range = TextRange::new(paragraph.clone(), from.offset, to_offset);
        (range.start() < range.end()).then_some(range)
    }

    /// Qualifying selection for a finished drag, anchored where the mouse was
    /// released.
    pub fn selection(&self, from: DocPos, to: DocPos, anchor: Point) -> Option<Selection> {
        let range = self.text_range(from, to)?;
        let text = range.selected_text();
        Selection::new(&text, anchor, Some(range))
    }
}

fn push_paragraph(paragraphs: &mut Vec<Arc<str>>, words: &mut Vec<&str>) {
    if !words.is_empty() {
        paragraphs.push(Arc::from(words.join(" ")));
        words.clear();
    }
}

impl DocumentView {
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn lines(&self) -> &[VisualLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Paragraph position under a cell, `row` counted from the top of the
    /// document. Columns past the row's end snap to it.
    pub fn position_at(&self, row: usize, column: usize) -> Option<DocPos> {
        let line = self.lines.get(row)?;
        let paragraph = line.paragraph?;
        Some(DocPos {
            paragraph,
            offset: line.start + column.min(line.end - line.start),
        })
    }

    /// Columns of `range` covered on row `row`, as `start..end` cell indices.
    pub fn highlight_on(&self, row: usize, range: &TextRange, paragraph: usize) -> Option<(usize, usize)> {
        let line = self.lines.get(row)?;
        if line.paragraph != Some(paragraph) {
            return None;
        }
        let start = range.start().max(line.start);
        let end = range.end().min(line.end);
        (start < end).then(|| (start - line.start, end - line.start))
    }
}
