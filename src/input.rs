use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, Drag, SCROLL_STEP};
use crate::models::Language;
use crate::popover::PopoverVariant;
use crate::session::Input;

pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Shortcuts that work regardless of the toolbar variant.
    match key.code {
        KeyCode::Char('d') if alt => {
            app.dispatch_input(Input::ForceDispatch, now);
            return;
        }
        KeyCode::Char('y') if ctrl => {
            app.copy_content();
            return;
        }
        KeyCode::Esc => {
            app.dispatch_input(Input::Close, now);
            return;
        }
        _ => {}
    }

    let popover = app.session.popover();
    if popover.variant() == PopoverVariant::Prompt && popover.is_visible() {
        match key.code {
            KeyCode::Enter => {
                let prompt = app.session.popover_mut().take_prompt_input();
                app.dispatch_input(Input::SubmitPrompt(prompt), now);
            }
            KeyCode::Backspace => app.session.popover_mut().pop_prompt_char(),
            KeyCode::Char(c) if !ctrl && !alt => app.session.popover_mut().push_prompt_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') => app.copy_content(),
        KeyCode::Char('x') => app.toggle_exclusion(),
        KeyCode::Char(digit @ '1'..='3') => {
            let index = usize::from(digit as u8 - b'1');
            app.dispatch_input(Input::Translate(Language::ALL[index]), now);
        }
        KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1, now),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1, now),
        KeyCode::PageUp => app.scroll_by(-page(app), now),
        KeyCode::PageDown => app.scroll_by(page(app), now),
        KeyCode::Home => app.scroll_by(-(app.scroll as isize), now),
        KeyCode::End => app.scroll_by(app.max_scroll() as isize, now),
        _ => {}
    }
}

fn page(app: &App) -> isize {
    app.doc_area.height.max(1) as isize
}

pub fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    let pointer = app.pointer_px(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.session.popover().contains(pointer) {
                return;
            }
            app.dispatch_input(Input::MouseDown(pointer), now);
            app.drag = app
                .doc_position(mouse.column, mouse.row)
                .map(|from| Drag { from, to: from });
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(to) = app.doc_position(mouse.column, mouse.row) {
                if let Some(drag) = app.drag.as_mut() {
                    drag.to = to;
                }
            }
            app.dispatch_input(Input::PointerMoved(pointer), now);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let Some(mut drag) = app.drag.take() else {
                return;
            };
            if let Some(to) = app.doc_position(mouse.column, mouse.row) {
                drag.to = to;
            }
            if let Some(selection) = app.document.selection(drag.from, drag.to, pointer) {
                app.select(selection, drag.from.paragraph, now);
            }
        }
        MouseEventKind::Moved => app.dispatch_input(Input::PointerMoved(pointer), now),
        MouseEventKind::ScrollUp => app.scroll_by(-(SCROLL_STEP as isize), now),
        MouseEventKind::ScrollDown => app.scroll_by(SCROLL_STEP as isize, now),
        _ => {}
    }
}
