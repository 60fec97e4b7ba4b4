use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use arboard::Clipboard;
use crossterm::event::{self, Event};
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::Rect;
use tokio::runtime::Handle;

use crate::config::Settings;
use crate::document::{DocPos, Document, DocumentView};
use crate::filter::ExclusionList;
use crate::geometry::Point;
use crate::history::HistoryEntry;
use crate::input;
use crate::models::{Request, Selection, TextRange};
use crate::network::{DispatchError, Dispatcher, OpenAiClient};
use crate::session::{Completion, Effect, Input, Session, Token};
use crate::store::Store;
use crate::theme::Theme;
use crate::ui;
use crate::utils::{CELL_HEIGHT_PX, CELL_WIDTH_PX, calculate_max_scroll, now_millis, viewport_px};

const IDLE_POLL: Duration = Duration::from_millis(250);
const ANIMATION_POLL: Duration = Duration::from_millis(100);
pub const SCROLL_STEP: usize = 3;

/// Result of one dispatch, sent back from the runtime to the UI thread.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub token: Token,
    pub request: Request,
    pub result: Result<String, DispatchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    pub from: DocPos,
    pub to: DocPos,
}

pub struct App {
    pub document: Document,
    pub view: DocumentView,
    pub scroll: usize,
    pub doc_area: Rect,
    pub session: Session,
    pub store: Store,
    pub theme: Theme,
    pub drag: Option<Drag>,
    /// Paragraph and range of the live selection, for highlighting.
    pub highlight: Option<(usize, TextRange)>,
    pub status: Option<String>,
    pub started: Instant,
    pub should_quit: bool,
    dispatcher: Arc<Dispatcher<OpenAiClient>>,
    runtime: Handle,
    outcome_tx: Sender<DispatchOutcome>,
    outcome_rx: Receiver<DispatchOutcome>,
}

impl App {
    pub fn new(document: Document, settings: &Settings, store: Store, runtime: Handle) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::from_settings(settings)?);
        let session = Session::new(
            document.host(),
            settings.session_config(),
            store.exclusions(),
            viewport_px(0, 0),
        );
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let view = document.layout(1);

        let status = if settings.has_api_key() {
            None
        } else {
            Some("No API key set: run `hoverdef config set-key <KEY>`".to_string())
        };

        Ok(Self {
            document,
            view,
            scroll: 0,
            doc_area: Rect::default(),
            session,
            store,
            theme: Theme::from_mode(settings.appearance.theme),
            drag: None,
            highlight: None,
            status,
            started: Instant::now(),
            should_quit: false,
            dispatcher,
            runtime,
            outcome_tx,
            outcome_rx,
        })
    }

    /// Re-wraps the document and resizes the page when the drawing area changes.
    pub fn sync_area(&mut self, area: Rect) {
        if area == self.doc_area {
            return;
        }
        if area.width != self.doc_area.width {
            self.view = self.document.layout(area.width);
        }
        self.doc_area = area;
        self.session.set_viewport(viewport_px(area.width, area.height));
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn max_scroll(&self) -> usize {
        calculate_max_scroll(self.view.len(), self.doc_area.height)
    }

    /// Page pixel position of a terminal cell; may lie outside the page.
    pub fn pointer_px(&self, column: u16, row: u16) -> Point {
        Point::new(
            (f64::from(column) - f64::from(self.doc_area.x)) * CELL_WIDTH_PX,
            (f64::from(row) - f64::from(self.doc_area.y)) * CELL_HEIGHT_PX,
        )
    }

    /// Document position under a terminal cell.
    pub fn doc_position(&self, column: u16, row: u16) -> Option<DocPos> {
        let area = self.doc_area;
        if column < area.x || row < area.y || column >= area.right() || row >= area.bottom() {
            return None;
        }
        let line = self.scroll + usize::from(row - area.y);
        self.view.position_at(line, usize::from(column - area.x))
    }

    pub fn dispatch_input(&mut self, input: Input, now: Instant) {
        let effects = self.session.handle(input, now);
        self.apply(effects);
    }

    /// Feeds a finished drag to the session after re-reading the exclusion list.
    pub fn select(&mut self, selection: Selection, paragraph: usize, now: Instant) {
        self.refresh_exclusions();
        if self.session.is_excluded() {
            tracing::debug!(host = self.session.hostname(), "selection on excluded host");
            self.highlight = None;
        } else {
            self.highlight = selection.range.clone().map(|range| (paragraph, range));
        }
        self.dispatch_input(Input::SelectionMade(selection), now);
    }

    pub fn scroll_by(&mut self, delta: isize, now: Instant) {
        let next = self.scroll.saturating_add_signed(delta).min(self.max_scroll());
        if next != self.scroll {
            self.scroll = next;
            self.dispatch_input(Input::Close, now);
        }
    }

    pub fn toggle_exclusion(&mut self) {
        self.refresh_exclusions();
        let mut exclusions = self.store.exclusions();
        let host = self.session.hostname().to_string();
        let excluded = if exclusions.contains(&host) {
            exclusions.remove(&host);
            false
        } else {
            exclusions.add(&host);
            true
        };

        match self.store.set_exclusions(&exclusions) {
            Ok(()) => {
                self.status = Some(if excluded {
                    format!("{host} excluded")
                } else {
                    format!("{host} enabled")
                });
                self.replace_exclusions(exclusions);
            }
            Err(err) => {
                tracing::warn!(?err, "could not save exclusion list");
                self.status = Some(format!("Could not save exclusions: {err}"));
            }
        }
    }

    pub fn copy_content(&mut self) {
        let Some(text) = self.session.popover().content().map(str::to_string) else {
            return;
        };
        let mut clipboard = Clipboard::new().ok();
        match clipboard.as_mut().map(|cb| cb.set_text(text)) {
            Some(Ok(())) => self.status = Some("Copied to clipboard".to_string()),
            Some(Err(err)) => {
                tracing::warn!(?err, "clipboard write failed");
                self.status = Some("Clipboard unavailable".to_string());
            }
            None => self.status = Some("Clipboard unavailable".to_string()),
        }
    }

    /// Runs timers and renders whatever results have come back.
    pub fn tick(&mut self, now: Instant) {
        let effects = self.session.tick(now);
        self.apply(effects);

        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.finish(outcome);
        }
    }

    /// How long the event loop may block before the next tick is due.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let cap = if self.session.popover().is_visible() { ANIMATION_POLL } else { IDLE_POLL };
        self.session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now).min(cap))
            .unwrap_or(cap)
    }

    fn refresh_exclusions(&mut self) {
        if let Err(err) = self.store.reload() {
            tracing::warn!(?err, "could not reload state; keeping previous exclusions");
        }
        self.replace_exclusions(self.store.exclusions());
    }

    fn replace_exclusions(&mut self, exclusions: ExclusionList) {
        let effects = self.session.set_exclusions(exclusions);
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Dispatch { token, request } => self.spawn_dispatch(token, request),
                Effect::Closed => self.highlight = None,
                Effect::ShowIndicator(_) | Effect::HideIndicator | Effect::ShowPopover(_) => {}
            }
        }
        if self.session.selection().is_none() {
            self.highlight = None;
        }
    }

    fn spawn_dispatch(&self, token: Token, request: Request) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let result = dispatcher.execute(&request).await;
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(DispatchOutcome {
                token,
                request,
                result,
            });
        });
    }

    fn finish(&mut self, outcome: DispatchOutcome) {
        let DispatchOutcome {
            token,
            request,
            result,
        } = outcome;

        if let (Request::Definition { text, .. }, Ok(definition)) = (&request, &result) {
            let entry = HistoryEntry::new(text.clone(), definition.clone(), now_millis());
            if let Err(err) = self.store.record_history(entry) {
                tracing::warn!(?err, "could not save history entry");
            }
        }

        if self.session.complete(token, result) == Completion::Stale {
            tracing::debug!(%token, kind = request.label(), "result arrived after the popover moved on");
        }
    }
}

pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, app))?;

        let now = Instant::now();
        app.tick(now);

        if event::poll(app.poll_timeout(now))? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => input::handle_key(app, key, now),
                Event::Mouse(mouse) => input::handle_mouse(app, mouse, now),
                _ => {}
            }
        }
    }
    Ok(())
}
