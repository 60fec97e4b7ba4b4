use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::models::PopoverState;
use crate::utils::wrap_text;

pub const DEFAULT_OFFSET: f64 = 20.0;
pub const DEFAULT_MARGIN: f64 = 10.0;
pub const DEFAULT_MAX_WIDTH: f64 = 300.0;

// Terminal escape sequences and other control characters must never reach
// the host as live text.
static ESCAPE_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b(\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(\x07|\x1b\\)|[@-_])").unwrap());

/// Which toolbar the popover carries next to the copy action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopoverVariant {
    /// EN / ES / PT buttons translating the displayed result.
    #[default]
    Languages,
    /// Free-form prompt input about the selection.
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopoverLayout {
    pub offset: f64,
    pub margin: f64,
    pub max_width: f64,
    pub min_width: f64,
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub toolbar_height: f64,
}

impl Default for PopoverLayout {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            margin: DEFAULT_MARGIN,
            max_width: DEFAULT_MAX_WIDTH,
            min_width: 160.0,
            char_width: 10.0,
            line_height: 20.0,
            padding_x: 10.0,
            padding_y: 20.0,
            toolbar_height: 20.0,
        }
    }
}

impl PopoverLayout {
    pub fn with_max_width(mut self, max_width: f64) -> Self {
        self.max_width = max_width.max(self.min_width);
        self
    }

    /// Columns of text that fit inside the padded maximum width.
    pub fn text_columns(&self) -> usize {
        let inner = self.max_width - self.padding_x * 2.0;
        ((inner / self.char_width).floor() as usize).max(1)
    }

    /// Dimensions used before any content is measured.
    pub fn loading_size(&self) -> Size {
        Size::new(
            self.max_width,
            self.padding_y * 2.0 + self.toolbar_height + self.line_height,
        )
    }

    /// Wraps `text` at the padded maximum width and sizes the box around it.
    pub fn measure(&self, text: &str) -> Size {
        let lines = wrap_text(text, self.text_columns());
        let rows = lines.len();
        let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);

        let width = (widest as f64 * self.char_width + self.padding_x * 2.0)
            .clamp(self.min_width, self.max_width);
        let height = rows as f64 * self.line_height + self.toolbar_height + self.padding_y * 2.0;
        Size::new(width, height)
    }
}

/// Top-left corner for a box of `size` anchored at `anchor`: below the anchor
/// by default, pulled in from the right edge, flipped above the anchor when it
/// would overflow the bottom, never left of the margin.
pub fn position_popover(anchor: Point, size: Size, viewport: Size, layout: &PopoverLayout) -> Point {
    let mut left = anchor.x;
    let mut top = anchor.y + layout.offset;

    if left + size.width > viewport.width - layout.margin {
        left = viewport.width - size.width - layout.margin;
    }

    if top + size.height > viewport.height - layout.margin {
        top = anchor.y - size.height - layout.margin;
    }

    Point::new(left.max(layout.margin), top)
}

/// Renders untrusted text as inert plain text.
pub fn sanitize_text(text: &str) -> String {
    let stripped = ESCAPE_SEQUENCE.replace_all(text, "");
    stripped
        .chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct PopoverElement {
    state: PopoverState,
    anchor: Point,
    origin: Point,
    size: Size,
    prompt_input: String,
}

impl PopoverElement {
    pub fn state(&self) -> &PopoverState {
        &self.state
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin(self.origin, self.size)
    }

    pub fn prompt_input(&self) -> &str {
        &self.prompt_input
    }
}

/// Owner of the floating element for one page.
#[derive(Debug, Clone)]
pub struct Popover {
    layout: PopoverLayout,
    variant: PopoverVariant,
    viewport: Size,
    element: Option<PopoverElement>,
}

impl Popover {
    pub fn new(layout: PopoverLayout, variant: PopoverVariant, viewport: Size) -> Self {
        Self {
            layout,
            variant,
            viewport,
            element: None,
        }
    }

    /// Materializes the element on first use; later calls return the same one.
    pub fn create(&mut self) -> &mut PopoverElement {
        let layout = self.layout;
        self.element.get_or_insert_with(|| {
            tracing::debug!("creating popover element");
            PopoverElement {
                state: PopoverState::Hidden,
                anchor: Point::default(),
                origin: Point::default(),
                size: layout.loading_size(),
                prompt_input: String::new(),
            }
        })
    }

    pub fn is_created(&self) -> bool {
        self.element.is_some()
    }

    /// Positions the element at `at`. A hidden element comes up loading so
    /// visibility always follows the state.
    pub fn show(&mut self, at: Point) {
        let element = self.create();
        element.anchor = at;
        if element.state == PopoverState::Hidden {
            element.state = PopoverState::Loading;
        }
        self.reposition();
    }

    pub fn set_loading(&mut self) {
        let size = self.layout.loading_size();
        let element = self.create();
        element.state = PopoverState::Loading;
        element.size = size;
        self.reposition();
    }

    pub fn set_content(&mut self, text: &str) {
        let text = sanitize_text(text);
        let size = self.layout.measure(&text);
        let element = self.create();
        element.state = PopoverState::Showing(text);
        element.size = size;
        self.reposition();
    }

    pub fn set_error(&mut self, message: &str) {
        let message = sanitize_text(message);
        let size = self.layout.measure(&message);
        let element = self.create();
        element.state = PopoverState::Error(message);
        element.size = size;
        self.reposition();
    }

    pub fn hide(&mut self) {
        if let Some(element) = self.element.as_mut() {
            element.state = PopoverState::Hidden;
            element.prompt_input.clear();
            element.size = self.layout.loading_size();
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.reposition();
    }

    pub fn state(&self) -> &PopoverState {
        self.element
            .as_ref()
            .map(PopoverElement::state)
            .unwrap_or(&PopoverState::Hidden)
    }

    pub fn is_visible(&self) -> bool {
        self.state().is_visible()
    }

    /// Displayed result text, if a result is showing.
    pub fn content(&self) -> Option<&str> {
        match self.state() {
            PopoverState::Showing(text) => Some(text),
            _ => None,
        }
    }

    /// On-screen box; `None` while hidden.
    pub fn bounds(&self) -> Option<Rect> {
        self.element
            .as_ref()
            .filter(|element| element.state.is_visible())
            .map(PopoverElement::bounds)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds().is_some_and(|rect| rect.contains(point))
    }

    pub fn element(&self) -> Option<&PopoverElement> {
        self.element.as_ref()
    }

    pub fn layout(&self) -> &PopoverLayout {
        &self.layout
    }

    pub fn variant(&self) -> PopoverVariant {
        self.variant
    }

    pub fn prompt_input(&self) -> &str {
        self.element
            .as_ref()
            .map(PopoverElement::prompt_input)
            .unwrap_or("")
    }

    pub fn push_prompt_char(&mut self, c: char) {
        if self.variant != PopoverVariant::Prompt || c.is_control() {
            return;
        }
        if let Some(element) = self.element.as_mut().filter(|e| e.state.is_visible()) {
            element.prompt_input.push(c);
        }
    }

    pub fn pop_prompt_char(&mut self) {
        if let Some(element) = self.element.as_mut() {
            element.prompt_input.pop();
        }
    }

    pub fn take_prompt_input(&mut self) -> String {
        self.element
            .as_mut()
            .map(|element| std::mem::take(&mut element.prompt_input))
            .unwrap_or_default()
    }

    fn reposition(&mut self) {
        let (layout, viewport) = (self.layout, self.viewport);
        if let Some(element) = self.element.as_mut() {
            element.origin = position_popover(element.anchor, element.size, viewport, &layout);
        }
    }
}

/// Small marker shown at the selection anchor while the trigger is armed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverIndicator {
    at: Option<Point>,
}

impl HoverIndicator {
    pub fn show(&mut self, at: Point) {
        self.at = Some(at);
    }

    pub fn hide(&mut self) {
        self.at = None;
    }

    pub fn position(&self) -> Option<Point> {
        self.at
    }

    pub fn is_visible(&self) -> bool {
        self.at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(1000.0, 800.0);

    fn popover() -> Popover {
        Popover::new(PopoverLayout::default(), PopoverVariant::Languages, VIEWPORT)
    }

    #[test]
    fn position_prefers_below_the_anchor() {
        let layout = PopoverLayout::default();
        let origin = position_popover(
            Point::new(100.0, 100.0),
            Size::new(300.0, 80.0),
            VIEWPORT,
            &layout,
        );
        assert_eq!(origin, Point::new(100.0, 120.0));
    }

    #[test]
    fn position_shifts_left_at_the_right_edge() {
        let layout = PopoverLayout::default();
        let origin = position_popover(
            Point::new(900.0, 100.0),
            Size::new(300.0, 80.0),
            VIEWPORT,
            &layout,
        );
        assert_eq!(origin.x, 1000.0 - 300.0 - 10.0);
        assert_eq!(origin.y, 120.0);
    }

    #[test]
    fn position_flips_above_at_the_bottom_edge() {
        let layout = PopoverLayout::default();
        let origin = position_popover(
            Point::new(100.0, 750.0),
            Size::new(300.0, 80.0),
            VIEWPORT,
            &layout,
        );
        assert_eq!(origin.y, 750.0 - 80.0 - 10.0);
    }

    #[test]
    fn position_never_goes_left_of_the_margin() {
        let layout = PopoverLayout::default();
        let narrow = Size::new(200.0, 800.0);
        let origin = position_popover(Point::new(50.0, 10.0), Size::new(300.0, 80.0), narrow, &layout);
        assert_eq!(origin.x, 10.0);
    }

    #[test]
    fn create_is_idempotent() {
        let mut popover = popover();
        assert!(!popover.is_created());
        popover.create().prompt_input.push('x');
        assert_eq!(popover.create().prompt_input(), "x");
    }

    #[test]
    fn visibility_follows_state_through_the_lifecycle() {
        let mut popover = popover();
        assert!(!popover.is_visible());
        assert!(popover.bounds().is_none());

        popover.set_loading();
        popover.show(Point::new(100.0, 100.0));
        assert_eq!(popover.state(), &PopoverState::Loading);
        assert!(popover.is_visible());
        assert_eq!(
            popover.bounds().expect("visible").height,
            PopoverLayout::default().loading_size().height
        );

        popover.set_content("A membrane-bound organelle.");
        assert_eq!(popover.content(), Some("A membrane-bound organelle."));

        popover.set_error("Error: boom");
        assert_eq!(popover.state(), &PopoverState::Error("Error: boom".into()));
        assert_eq!(popover.content(), None);

        popover.hide();
        assert!(!popover.is_visible());
        assert!(!popover.contains(Point::new(110.0, 130.0)));
    }

    #[test]
    fn show_on_hidden_element_starts_loading() {
        let mut popover = popover();
        popover.show(Point::new(10.0, 10.0));
        assert_eq!(popover.state(), &PopoverState::Loading);
    }

    #[test]
    fn content_is_rendered_as_inert_text() {
        let mut popover = popover();
        popover.show(Point::new(10.0, 10.0));
        popover.set_content("\x1b[2J\x1b[31m<b>bold</b>\x07\tdone");
        assert_eq!(popover.content(), Some("<b>bold</b> done"));
    }

    #[test]
    fn measured_content_repositions_the_element() {
        let mut popover = popover();
        popover.set_loading();
        popover.show(Point::new(100.0, 600.0));
        let loading = popover.bounds().expect("visible");
        assert_eq!(loading.y, 600.0 + DEFAULT_OFFSET);

        popover.set_content(&"word ".repeat(60));
        let showing = popover.bounds().expect("visible");
        assert!(showing.height > loading.height);
        assert_eq!(showing.y, 600.0 - showing.height - DEFAULT_MARGIN);
    }

    #[test]
    fn measure_wraps_at_the_text_columns() {
        let layout = PopoverLayout::default();
        assert_eq!(layout.text_columns(), 28);

        let one_line = layout.measure("short");
        assert_eq!(one_line.width, layout.min_width);
        assert_eq!(one_line.height, 20.0 + 20.0 + 40.0);

        let wrapped = layout.measure(&"x".repeat(57));
        assert_eq!(wrapped.width, layout.max_width);
        assert_eq!(wrapped.height, 3.0 * 20.0 + 20.0 + 40.0);
    }

    #[test]
    fn hide_clears_prompt_input() {
        let mut popover = Popover::new(PopoverLayout::default(), PopoverVariant::Prompt, VIEWPORT);
        popover.show(Point::new(10.0, 10.0));
        popover.push_prompt_char('h');
        popover.push_prompt_char('i');
        assert_eq!(popover.prompt_input(), "hi");

        popover.hide();
        assert_eq!(popover.prompt_input(), "");
    }

    #[test]
    fn prompt_input_is_ignored_for_the_languages_variant() {
        let mut popover = popover();
        popover.show(Point::new(10.0, 10.0));
        popover.push_prompt_char('h');
        assert_eq!(popover.prompt_input(), "");
    }

    #[test]
    fn indicator_tracks_its_position() {
        let mut indicator = HoverIndicator::default();
        indicator.show(Point::new(3.0, 4.0));
        assert_eq!(indicator.position(), Some(Point::new(3.0, 4.0)));
        indicator.hide();
        assert!(!indicator.is_visible());
    }
}
