use crate::geometry::{Point, Rect, Size};

/// Page pixels covered by one terminal cell.
pub const CELL_WIDTH_PX: f64 = 10.0;
pub const CELL_HEIGHT_PX: f64 = 20.0;

/// Top-left pixel of a cell, relative to the document area.
pub fn cell_to_px(column: u16, row: u16) -> Point {
    Point::new(f64::from(column) * CELL_WIDTH_PX, f64::from(row) * CELL_HEIGHT_PX)
}

pub fn px_to_cell(point: Point) -> (u16, u16) {
    let column = (point.x / CELL_WIDTH_PX).floor().clamp(0.0, f64::from(u16::MAX));
    let row = (point.y / CELL_HEIGHT_PX).floor().clamp(0.0, f64::from(u16::MAX));
    (column as u16, row as u16)
}

pub fn viewport_px(width: u16, height: u16) -> Size {
    Size::new(f64::from(width) * CELL_WIDTH_PX, f64::from(height) * CELL_HEIGHT_PX)
}

/// Cells covered by a pixel box, placed inside `area` and clipped to it.
pub fn px_rect_to_cells(rect: Rect, area: ratatui::layout::Rect) -> ratatui::layout::Rect {
    let (column, row) = px_to_cell(Point::new(rect.x, rect.y));
    let width = (rect.width / CELL_WIDTH_PX).ceil().max(0.0) as u16;
    let height = (rect.height / CELL_HEIGHT_PX).ceil().max(0.0) as u16;
    ratatui::layout::Rect {
        x: area.x.saturating_add(column),
        y: area.y.saturating_add(row),
        width,
        height,
    }
    .intersection(area)
}

/// Greedy word wrap over chars as `(start, end)` index pairs; a word wider
/// than `width` is split. An empty input is one empty row.
pub fn wrap_chars(chars: &[char], width: usize) -> Vec<(usize, usize)> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        while start < chars.len() && chars[start] == ' ' {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }
        let limit = (start + width).min(chars.len());
        let mut end = limit;
        if limit < chars.len() {
            if let Some(space) = (start + 1..=limit).rev().find(|&i| chars[i] == ' ') {
                end = space;
            }
        }
        rows.push((start, end));
        start = end;
    }
    if rows.is_empty() {
        rows.push((0, 0));
    }
    rows
}

/// `text` broken into rows of at most `width` chars, keeping hard line breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        for (start, end) in wrap_chars(&chars, width) {
            rows.push(chars[start..end].iter().collect());
        }
    }
    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

pub fn calculate_max_scroll(content_lines: usize, view_height: u16) -> usize {
    content_lines.saturating_sub(usize::from(view_height))
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
