use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Boundary of a selection inside its immediate text container.
/// Offsets are char indices into `container`, `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    container: Arc<str>,
    start: usize,
    end: usize,
}

impl TextRange {
    pub fn new(container: impl Into<Arc<str>>, start: usize, end: usize) -> Self {
        let container = container.into();
        let len = container.chars().count();
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            container,
            start: start.min(len),
            end: end.min(len),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn selected_text(&self) -> String {
        self.container
            .chars()
            .skip(self.start)
            .take(self.end - self.start)
            .collect()
    }
}

/// The single live user selection on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub text: String,
    pub anchor: Point,
    pub range: Option<TextRange>,
}

impl Selection {
    /// Returns `None` unless the trimmed text is non-empty.
    pub fn new(raw_text: &str, anchor: Point, range: Option<TextRange>) -> Option<Self> {
        let text = raw_text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            anchor,
            range,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Pt,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Es, Language::Pt];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Pt => "pt",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Pt => "Portuguese",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Language::En),
            "es" | "spanish" => Some(Language::Es),
            "pt" | "portuguese" => Some(Language::Pt),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code().to_uppercase())
    }
}

/// What the dispatcher is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Definition {
        text: String,
        context: String,
        target_lang: Option<Language>,
    },
    Translation {
        text: String,
        target: Language,
    },
    CustomPrompt {
        prompt: String,
        text: String,
        context: String,
    },
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Definition { .. } => "definition",
            Request::Translation { .. } => "translation",
            Request::CustomPrompt { .. } => "custom prompt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PopoverState {
    #[default]
    Hidden,
    Loading,
    Showing(String),
    Error(String),
}

impl PopoverState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, PopoverState::Hidden)
    }
}
