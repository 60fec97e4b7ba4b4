use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::app::App;
use crate::models::PopoverState;
use crate::popover::PopoverVariant;
use crate::session::Phase;
use crate::utils::{px_rect_to_cells, px_to_cell, wrap_text};

/// Renders the reader: header, document, indicator, popover, footer.
pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    app.sync_area(chunks[1]);

    render_header(f, app, chunks[0]);
    render_document(f, app, chunks[1]);
    render_indicator(f, app, chunks[1]);
    render_popover(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let phase = match app.session.phase() {
        Phase::Idle => "idle",
        Phase::Armed => "selected",
        Phase::Confirming => "hover to define",
        Phase::Dispatched => "defined",
    };
    let mut spans = vec![
        Span::styled(" hoverdef ", app.theme.popover_title),
        Span::styled(app.session.hostname().to_string(), Style::default().fg(app.theme.text)),
        Span::styled(format!("  {phase}"), Style::default().fg(app.theme.text_secondary)),
    ];
    if app.session.is_excluded() {
        spans.push(Span::styled(
            "  [disabled on this site]",
            Style::default().fg(app.theme.text_secondary).add_modifier(Modifier::ITALIC),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Renders the visible slice of the wrapped document with the live
/// selection highlighted.
fn render_document(f: &mut Frame, app: &App, area: Rect) {
    let text_style = Style::default().fg(app.theme.text);
    let selected_style = Style::default().fg(app.theme.selection_fg).bg(app.theme.selection_bg);

    let lines: Vec<Line> = app
        .view
        .lines()
        .iter()
        .enumerate()
        .skip(app.scroll)
        .take(usize::from(area.height))
        .map(|(row, line)| {
            let highlight = app
                .highlight
                .as_ref()
                .and_then(|(paragraph, range)| app.view.highlight_on(row, range, *paragraph));
            match highlight {
                Some((start, end)) => {
                    let chars: Vec<char> = line.text.chars().collect();
                    Line::from(vec![
                        Span::styled(chars[..start].iter().collect::<String>(), text_style),
                        Span::styled(chars[start..end].iter().collect::<String>(), selected_style),
                        Span::styled(chars[end..].iter().collect::<String>(), text_style),
                    ])
                }
                None => Line::styled(line.text.clone(), text_style),
            }
        })
        .collect();

    let para = Paragraph::new(lines).style(Style::default().bg(app.theme.root_bg));
    f.render_widget(para, area);
}

fn render_indicator(f: &mut Frame, app: &App, area: Rect) {
    let Some(at) = app.session.indicator().position() else {
        return;
    };
    let (column, row) = px_to_cell(at);
    let cell = Rect {
        x: area.x.saturating_add(column),
        y: area.y.saturating_add(row),
        width: 1,
        height: 1,
    }
    .intersection(area);
    if cell.is_empty() {
        return;
    }
    f.render_widget(Paragraph::new("◆").style(app.theme.indicator), cell);
}

fn render_popover(f: &mut Frame, app: &App, area: Rect) {
    let popover = app.session.popover();
    let Some(bounds) = popover.bounds() else {
        return;
    };
    let popup_area = px_rect_to_cells(bounds, area);
    if popup_area.width < 3 || popup_area.height < 3 {
        return;
    }
    f.render_widget(Clear, popup_area);

    let title = match popover.state() {
        PopoverState::Error(_) => " Error ",
        _ => " hoverdef ",
    };
    let block = Block::default()
        .title(title)
        .title_style(app.theme.popover_title)
        .borders(Borders::ALL)
        .style(app.theme.popover_border);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let columns = popover.layout().text_columns();
    let body: Vec<Line> = match popover.state() {
        PopoverState::Hidden => Vec::new(),
        PopoverState::Loading => {
            let dots = (app.started.elapsed().as_millis() / 300 % 4) as usize;
            vec![Line::styled(format!("Loading{}", ".".repeat(dots)), app.theme.popover_loading)]
        }
        PopoverState::Showing(text) => wrap_text(text, columns)
            .into_iter()
            .map(|row| Line::styled(row, app.theme.popover_text))
            .collect(),
        PopoverState::Error(message) => wrap_text(message, columns)
            .into_iter()
            .map(|row| Line::styled(row, app.theme.popover_error))
            .collect(),
    };
    f.render_widget(Paragraph::new(body).style(app.theme.popover_text), rows[0]);

    let toolbar = match popover.variant() {
        PopoverVariant::Languages => Line::styled("c copy  1 EN  2 ES  3 PT", app.theme.toolbar),
        PopoverVariant::Prompt => {
            let input = popover.prompt_input();
            let room = usize::from(rows[1].width).saturating_sub(3);
            let shown: String = input.chars().skip(input.chars().count().saturating_sub(room)).collect();
            Line::from(vec![
                Span::styled("> ", app.theme.toolbar),
                Span::styled(format!("{shown}▏"), app.theme.prompt_input),
            ])
        }
    };
    f.render_widget(Paragraph::new(toolbar), rows[1]);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let keys = match app.session.popover().variant() {
        PopoverVariant::Languages => {
            "Drag to select | Alt+d Define now | 1/2/3 Translate | c Copy | x Toggle site | ↑/↓ Scroll | Esc Close | q Quit"
        }
        PopoverVariant::Prompt => {
            "Drag to select | Alt+d Define now | Type + Enter Ask | Ctrl+y Copy | x Toggle site | ↑/↓ Scroll | Esc Close | q Quit"
        }
    };
    let text = match app.status.as_deref() {
        Some(status) => format!("{status} | {keys}"),
        None => keys.to_string(),
    };
    let footer = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(app.theme.footer);
    f.render_widget(footer, area);
}
