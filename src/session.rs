//! Selection trigger state machine for one page.
//!
//! The session owns every piece of per-page state (live selection, pending
//! delay timer, popover, hover indicator, close timer) and is driven by
//! abstract [`Input`]s plus [`Session::tick`]. It never performs I/O: a
//! dispatch is returned as an [`Effect`] carrying a [`Token`], and the host
//! reports the outcome back through [`Session::complete`].

use std::fmt;
use std::time::{Duration, Instant};

use crate::context::{DEFAULT_CONTEXT_CHARS, extract_context};
use crate::filter::{DomainFilter, ExclusionList};
use crate::geometry::{Point, Size};
use crate::models::{Language, Request, Selection};
use crate::network::DispatchError;
use crate::popover::{HoverIndicator, Popover, PopoverLayout, PopoverVariant};
use crate::proximity::{ProximityConfig, ProximityTracker};

pub const DEFAULT_SELECTION_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(2000);

/// Version marker of the live trigger chain. Any completion carrying an older
/// token is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Confirming,
    Dispatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Selection,
    Hover,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    kind: TimerKind,
    token: Token,
    deadline: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    SelectionMade(Selection),
    PointerMoved(Point),
    /// Mouse-down anywhere; counts as click-away unless it lands on the popover.
    MouseDown(Point),
    /// Skip the remaining delays for the live selection.
    ForceDispatch,
    /// Translate the displayed result.
    Translate(Language),
    SubmitPrompt(String),
    Close,
}

/// What the host has to do after an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowIndicator(Point),
    HideIndicator,
    ShowPopover(Point),
    Dispatch { token: Token, request: Request },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Rendered,
    Stale,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub selection_delay: Duration,
    pub hover_delay: Duration,
    pub context_chars: usize,
    pub default_language: Option<Language>,
    pub proximity: ProximityConfig,
    pub layout: PopoverLayout,
    pub variant: PopoverVariant,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            selection_delay: DEFAULT_SELECTION_DELAY,
            hover_delay: DEFAULT_HOVER_DELAY,
            context_chars: DEFAULT_CONTEXT_CHARS,
            default_language: None,
            proximity: ProximityConfig::default(),
            layout: PopoverLayout::default(),
            variant: PopoverVariant::default(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    hostname: String,
    config: SessionConfig,
    filter: DomainFilter,
    phase: Phase,
    selection: Option<Selection>,
    token: Token,
    pending: Option<PendingTimer>,
    popover: Popover,
    indicator: HoverIndicator,
    proximity: ProximityTracker,
}

impl Session {
    pub fn new(
        hostname: impl Into<String>,
        config: SessionConfig,
        exclusions: ExclusionList,
        viewport: Size,
    ) -> Self {
        let popover = Popover::new(config.layout, config.variant, viewport);
        let proximity = ProximityTracker::new(config.proximity);
        Self {
            hostname: hostname.into(),
            config,
            filter: DomainFilter::new(exclusions),
            phase: Phase::Idle,
            selection: None,
            token: Token(0),
            pending: None,
            popover,
            indicator: HoverIndicator::default(),
            proximity,
        }
    }

    pub fn handle(&mut self, input: Input, now: Instant) -> Vec<Effect> {
        match input {
            Input::SelectionMade(selection) => self.selection_made(selection, now),
            Input::PointerMoved(pointer) => {
                self.pointer_moved(pointer, now);
                Vec::new()
            }
            Input::MouseDown(point) => {
                if self.popover.contains(point) {
                    Vec::new()
                } else {
                    self.reset("click away")
                }
            }
            Input::ForceDispatch => self.dispatch_definition(),
            Input::Translate(target) => self.translate(target),
            Input::SubmitPrompt(prompt) => self.submit_prompt(prompt),
            Input::Close => self.reset("closed"),
        }
    }

    /// Fires every timer whose deadline has passed. Chained delays are measured
    /// from the previous deadline, so a late tick still dispatches on time.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        while let Some(timer) = self.pending.filter(|timer| timer.deadline <= now) {
            self.pending = None;
            if timer.token != self.token {
                continue;
            }
            match timer.kind {
                TimerKind::Selection => {
                    self.pending = Some(PendingTimer {
                        kind: TimerKind::Hover,
                        token: timer.token,
                        deadline: timer.deadline + self.config.hover_delay,
                    });
                    self.set_phase(Phase::Confirming);
                }
                TimerKind::Hover => effects.extend(self.dispatch_definition()),
            }
        }

        if self.proximity.poll(now) && self.popover.is_visible() {
            effects.extend(self.reset("pointer moved away"));
        }

        effects
    }

    /// Renders a dispatch outcome unless its token has since been invalidated.
    pub fn complete(&mut self, token: Token, result: Result<String, DispatchError>) -> Completion {
        if token != self.token || !self.popover.is_visible() {
            tracing::debug!(%token, current = %self.token, "discarding stale dispatch result");
            return Completion::Stale;
        }

        match result {
            Ok(text) => self.popover.set_content(&text),
            Err(err) => {
                tracing::warn!(%token, error = %err, "dispatch failed");
                self.popover.set_error(&err.user_message());
            }
        }
        Completion::Rendered
    }

    /// Swaps in the latest persisted exclusion list. Live state is torn down
    /// when the current host has just become excluded.
    pub fn set_exclusions(&mut self, exclusions: ExclusionList) -> Vec<Effect> {
        self.filter.replace(exclusions);
        if self.is_excluded() && self.is_active() {
            return self.reset("host excluded");
        }
        Vec::new()
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.popover.set_viewport(viewport);
    }

    /// Earliest instant at which [`Session::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let trigger = self.pending.map(|timer| timer.deadline);
        match (trigger, self.proximity.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.filter.is_excluded(&self.hostname)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn exclusions(&self) -> &ExclusionList {
        self.filter.exclusions()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.pending.map(|timer| timer.kind)
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }

    pub fn popover_mut(&mut self) -> &mut Popover {
        &mut self.popover
    }

    pub fn indicator(&self) -> &HoverIndicator {
        &self.indicator
    }

    fn is_active(&self) -> bool {
        self.selection.is_some()
            || self.pending.is_some()
            || self.popover.is_visible()
            || self.indicator.is_visible()
    }

    fn selection_made(&mut self, selection: Selection, now: Instant) -> Vec<Effect> {
        if self.is_excluded() {
            tracing::debug!(host = %self.hostname, "selection ignored on excluded host");
            return self.reset("host excluded");
        }

        let mut effects = Vec::new();
        if self.popover.is_visible() {
            self.popover.hide();
            effects.push(Effect::Closed);
        }
        self.proximity.cancel();

        let token = self.advance_token();
        let anchor = selection.anchor;
        tracing::debug!(%token, chars = selection.text.chars().count(), "selection armed");
        self.selection = Some(selection);
        self.pending = Some(PendingTimer {
            kind: TimerKind::Selection,
            token,
            deadline: now + self.config.selection_delay,
        });
        self.set_phase(Phase::Armed);

        self.indicator.show(anchor);
        effects.push(Effect::ShowIndicator(anchor));
        effects
    }

    fn pointer_moved(&mut self, pointer: Point, now: Instant) {
        let Some(bounds) = self.popover.bounds() else {
            return;
        };
        let anchor = self.selection.as_ref().map(|selection| selection.anchor);
        self.proximity.pointer_moved(pointer, bounds, anchor, now);
    }

    fn dispatch_definition(&mut self) -> Vec<Effect> {
        let Some(selection) = self.selection.as_ref() else {
            return Vec::new();
        };
        let anchor = selection.anchor;
        let request = Request::Definition {
            text: selection.text.clone(),
            context: extract_context(selection.range.as_ref(), self.config.context_chars),
            target_lang: self.config.default_language,
        };

        let mut effects = Vec::new();
        if self.indicator.is_visible() {
            self.indicator.hide();
            effects.push(Effect::HideIndicator);
        }
        self.pending = None;
        self.popover.set_loading();
        self.popover.show(anchor);
        effects.push(Effect::ShowPopover(anchor));
        effects.push(self.start_dispatch(request));
        effects
    }

    fn translate(&mut self, target: Language) -> Vec<Effect> {
        let Some(text) = self.popover.content().map(str::to_string) else {
            return Vec::new();
        };
        self.popover.set_loading();
        vec![self.start_dispatch(Request::Translation { text, target })]
    }

    fn submit_prompt(&mut self, prompt: String) -> Vec<Effect> {
        let prompt = prompt.trim();
        let Some(selection) = self.selection.as_ref().filter(|_| !prompt.is_empty()) else {
            return Vec::new();
        };
        let anchor = selection.anchor;
        let request = Request::CustomPrompt {
            prompt: prompt.to_string(),
            text: selection.text.clone(),
            context: extract_context(selection.range.as_ref(), self.config.context_chars),
        };

        let mut effects = Vec::new();
        if self.indicator.is_visible() {
            self.indicator.hide();
            effects.push(Effect::HideIndicator);
        }
        self.pending = None;
        self.popover.set_loading();
        self.popover.show(anchor);
        effects.push(Effect::ShowPopover(anchor));
        effects.push(self.start_dispatch(request));
        effects
    }

    fn start_dispatch(&mut self, request: Request) -> Effect {
        let token = self.advance_token();
        self.proximity.cancel();
        self.set_phase(Phase::Dispatched);
        tracing::info!(%token, kind = request.label(), "dispatching request");
        Effect::Dispatch { token, request }
    }

    /// Back to idle: timers cancelled, token invalidated, selection cleared,
    /// indicator and popover hidden.
    fn reset(&mut self, reason: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.is_active() && self.phase == Phase::Idle {
            return effects;
        }

        self.pending = None;
        self.proximity.cancel();
        self.advance_token();
        self.selection = None;
        if self.indicator.is_visible() {
            self.indicator.hide();
            effects.push(Effect::HideIndicator);
        }
        if self.popover.is_visible() {
            self.popover.hide();
            effects.push(Effect::Closed);
        }
        tracing::debug!(reason, "session reset");
        self.set_phase(Phase::Idle);
        effects
    }

    fn advance_token(&mut self) -> Token {
        self.token = Token(self.token.0 + 1);
        self.token
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase != next {
            tracing::debug!(from = ?self.phase, to = ?next, token = %self.token, "trigger transition");
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PopoverState, TextRange};

    const PARAGRAPH: &str = "Energy comes from the powerhouse of the mitochondria, which produces ATP.";
    const VIEWPORT: Size = Size::new(1200.0, 900.0);

    fn session() -> Session {
        Session::new("docs.local", SessionConfig::default(), ExclusionList::default(), VIEWPORT)
    }

    fn selection(word: &str, anchor: Point) -> Selection {
        let start = PARAGRAPH.find(word).expect("word in paragraph");
        let range = TextRange::new(PARAGRAPH, start, start + word.chars().count());
        Selection::new(word, anchor, Some(range)).expect("non-empty selection")
    }

    fn dispatched_token(effects: &[Effect]) -> Token {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Dispatch { token, .. } => Some(*token),
                _ => None,
            })
            .expect("effects should contain a dispatch")
    }

    fn dispatch_count(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Dispatch { .. }))
            .count()
    }

    #[test]
    fn selection_walks_both_delays_before_dispatching() {
        let mut session = session();
        let t0 = Instant::now();
        let anchor = Point::new(300.0, 200.0);

        let effects = session.handle(Input::SelectionMade(selection("mitochondria", anchor)), t0);
        assert_eq!(effects, vec![Effect::ShowIndicator(anchor)]);
        assert_eq!(session.phase(), Phase::Armed);
        assert_eq!(session.next_deadline(), Some(t0 + DEFAULT_SELECTION_DELAY));

        assert!(session.tick(t0 + Duration::from_millis(999)).is_empty());
        assert!(session.tick(t0 + DEFAULT_SELECTION_DELAY).is_empty());
        assert_eq!(session.phase(), Phase::Confirming);
        assert_eq!(session.pending_timer(), Some(TimerKind::Hover));

        assert!(session.tick(t0 + Duration::from_millis(2999)).is_empty());
        assert!(!session.popover().is_visible());

        let effects = session.tick(t0 + Duration::from_millis(3000));
        assert_eq!(effects.len(), 3);
        assert_eq!(effects[0], Effect::HideIndicator);
        assert_eq!(effects[1], Effect::ShowPopover(anchor));
        match &effects[2] {
            Effect::Dispatch { request, .. } => assert_eq!(
                request,
                &Request::Definition {
                    text: "mitochondria".into(),
                    context: "Energy comes from the powerhouse of the [SELECTION], which produces ATP."
                        .into(),
                    target_lang: None,
                }
            ),
            other => panic!("expected dispatch, got {other:?}"),
        }
        assert_eq!(session.phase(), Phase::Dispatched);
        assert_eq!(session.popover().state(), &PopoverState::Loading);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn late_tick_runs_the_whole_chain_once() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("powerhouse", Point::new(10.0, 10.0))), t0);

        let effects = session.tick(t0 + Duration::from_secs(30));
        assert_eq!(dispatch_count(&effects), 1);
        assert!(session.tick(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn new_selection_cancels_the_previous_chain() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("powerhouse", Point::new(10.0, 10.0))), t0);

        let t1 = t0 + Duration::from_millis(1500);
        session.handle(Input::SelectionMade(selection("ATP", Point::new(50.0, 10.0))), t1);
        assert_eq!(session.phase(), Phase::Armed);

        assert!(session.tick(t0 + Duration::from_millis(3000)).is_empty());
        let effects = session.tick(t1 + Duration::from_millis(3000));
        assert_eq!(dispatch_count(&effects), 1);
        match effects.last() {
            Some(Effect::Dispatch {
                request: Request::Definition { text, .. },
                ..
            }) => assert_eq!(text, "ATP"),
            other => panic!("expected definition dispatch, got {other:?}"),
        }
    }

    #[test]
    fn click_away_before_hover_delay_prevents_dispatch() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        session.tick(t0 + Duration::from_millis(1200));

        let effects = session.handle(Input::MouseDown(Point::new(800.0, 800.0)), t0 + Duration::from_millis(2000));
        assert_eq!(effects, vec![Effect::HideIndicator]);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.selection().is_none());
        assert_eq!(session.next_deadline(), None);
        assert!(session.tick(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn stale_result_does_not_touch_the_popover() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        let first = dispatched_token(&session.tick(t0 + Duration::from_secs(3)));

        let second = dispatched_token(&session.handle(Input::ForceDispatch, t0 + Duration::from_secs(4)));
        assert!(second > first);

        assert_eq!(session.complete(first, Ok("old definition".into())), Completion::Stale);
        assert_eq!(session.popover().state(), &PopoverState::Loading);

        assert_eq!(session.complete(second, Ok("Adenosine triphosphate.".into())), Completion::Rendered);
        assert_eq!(session.popover().content(), Some("Adenosine triphosphate."));
    }

    #[test]
    fn result_after_reselection_is_discarded() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        let token = dispatched_token(&session.tick(t0 + Duration::from_secs(3)));

        let effects = session.handle(
            Input::SelectionMade(selection("Energy", Point::new(20.0, 10.0))),
            t0 + Duration::from_secs(4),
        );
        assert_eq!(effects[0], Effect::Closed);

        assert_eq!(session.complete(token, Ok("late".into())), Completion::Stale);
        assert!(!session.popover().is_visible());
        assert_eq!(session.phase(), Phase::Armed);
    }

    #[test]
    fn failures_render_the_classified_message() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        let token = dispatched_token(&session.tick(t0 + Duration::from_secs(3)));

        assert_eq!(session.complete(token, Err(DispatchError::RateLimited)), Completion::Rendered);
        assert_eq!(
            session.popover().state(),
            &PopoverState::Error("Error: Rate limit exceeded. Please try again in a moment.".into())
        );
    }

    #[test]
    fn excluded_host_stays_silent() {
        let mut session = Session::new(
            "example.com",
            SessionConfig::default(),
            ExclusionList::new(["example.com"]),
            VIEWPORT,
        );
        let t0 = Instant::now();

        let effects = session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        assert!(effects.is_empty());
        assert!(!session.indicator().is_visible());
        assert_eq!(session.next_deadline(), None);
        assert!(session.tick(t0 + Duration::from_secs(10)).is_empty());
        assert!(!session.popover().is_visible());
        assert!(session.handle(Input::ForceDispatch, t0).is_empty());
    }

    #[test]
    fn exclusion_takes_effect_on_the_next_list_update() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);

        let effects = session.set_exclusions(ExclusionList::new(["docs.local"]));
        assert_eq!(effects, vec![Effect::HideIndicator]);
        assert!(session.tick(t0 + Duration::from_secs(10)).is_empty());

        session.set_exclusions(ExclusionList::default());
        let effects = session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn force_dispatch_skips_remaining_delays() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);

        let effects = session.handle(Input::ForceDispatch, t0 + Duration::from_millis(10));
        assert_eq!(dispatch_count(&effects), 1);
        assert_eq!(session.phase(), Phase::Dispatched);
        assert!(session.tick(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn force_dispatch_needs_a_live_selection() {
        let mut session = session();
        assert!(session.handle(Input::ForceDispatch, Instant::now()).is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn wandering_pointer_closes_the_popover() {
        let mut session = session();
        let t0 = Instant::now();
        let anchor = Point::new(100.0, 100.0);
        session.handle(Input::SelectionMade(selection("ATP", anchor)), t0);
        let token = dispatched_token(&session.handle(Input::ForceDispatch, t0));
        session.complete(token, Ok("Adenosine triphosphate.".into()));

        let t1 = t0 + Duration::from_secs(1);
        session.handle(Input::PointerMoved(Point::new(1100.0, 850.0)), t1);
        assert_eq!(session.next_deadline(), Some(t1 + Duration::from_millis(1000)));

        assert!(session.tick(t1 + Duration::from_millis(999)).is_empty());
        let effects = session.tick(t1 + Duration::from_millis(1000));
        assert_eq!(effects, vec![Effect::Closed]);
        assert!(!session.popover().is_visible());
        assert!(session.selection().is_none());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn pointer_over_popover_keeps_it_open() {
        let mut session = session();
        let t0 = Instant::now();
        let anchor = Point::new(100.0, 100.0);
        session.handle(Input::SelectionMade(selection("ATP", anchor)), t0);
        session.handle(Input::ForceDispatch, t0);

        let inside = session.popover().bounds().expect("visible");
        let pointer = Point::new(inside.right() + 50.0, inside.bottom() + 50.0);
        session.handle(Input::PointerMoved(pointer), t0);
        assert_eq!(session.next_deadline(), None);

        let effects = session.handle(Input::MouseDown(Point::new(inside.x + 5.0, inside.y + 5.0)), t0);
        assert!(effects.is_empty());
        assert!(session.popover().is_visible());
    }

    #[test]
    fn translate_uses_the_displayed_result() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        let token = dispatched_token(&session.handle(Input::ForceDispatch, t0));

        assert!(session.handle(Input::Translate(Language::Es), t0).is_empty());

        session.complete(token, Ok("Energy currency of the cell.".into()));
        let effects = session.handle(Input::Translate(Language::Es), t0);
        match effects.as_slice() {
            [Effect::Dispatch { token: next, request }] => {
                assert!(*next > token);
                assert_eq!(
                    request,
                    &Request::Translation {
                        text: "Energy currency of the cell.".into(),
                        target: Language::Es,
                    }
                );
            }
            other => panic!("expected a single translation dispatch, got {other:?}"),
        }
        assert_eq!(session.popover().state(), &PopoverState::Loading);
    }

    #[test]
    fn submitted_prompt_asks_about_the_selection() {
        let config = SessionConfig {
            variant: PopoverVariant::Prompt,
            ..SessionConfig::default()
        };
        let mut session = Session::new("docs.local", config, ExclusionList::default(), VIEWPORT);
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);

        assert!(session.handle(Input::SubmitPrompt("   ".into()), t0).is_empty());

        let effects = session.handle(Input::SubmitPrompt(" explain like I'm five ".into()), t0);
        match effects.last() {
            Some(Effect::Dispatch {
                request: Request::CustomPrompt { prompt, text, context },
                ..
            }) => {
                assert_eq!(prompt, "explain like I'm five");
                assert_eq!(text, "ATP");
                assert!(context.ends_with("which produces [SELECTION]."));
            }
            other => panic!("expected custom prompt dispatch, got {other:?}"),
        }
        assert!(effects.contains(&Effect::HideIndicator));
        assert!(!session.indicator().is_visible());
    }

    #[test]
    fn reselecting_the_same_text_starts_a_new_pass() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t0);
        let first = dispatched_token(&session.tick(t0 + Duration::from_secs(3)));
        session.complete(first, Ok("Adenosine triphosphate.".into()));

        let t1 = t0 + Duration::from_secs(5);
        let effects = session.handle(Input::SelectionMade(selection("ATP", Point::new(10.0, 10.0))), t1);
        assert_eq!(effects, vec![Effect::Closed, Effect::ShowIndicator(Point::new(10.0, 10.0))]);
        let second = dispatched_token(&session.tick(t1 + Duration::from_secs(3)));
        assert!(second > first);
    }
}
