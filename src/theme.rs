use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    /// `Auto` becomes `Light` or `Dark` from the terminal's `COLORFGBG`.
    pub fn resolve(self) -> ThemeMode {
        match self {
            ThemeMode::Auto => {
                let colorfgbg = std::env::var("COLORFGBG").ok();
                if is_dark_background(colorfgbg.as_deref()) {
                    ThemeMode::Dark
                } else {
                    ThemeMode::Light
                }
            }
            mode => mode,
        }
    }
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`); ANSI 0-6 and 8 are dark.
/// Unknown values count as dark.
pub fn is_dark_background(colorfgbg: Option<&str>) -> bool {
    colorfgbg
        .and_then(|value| value.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_none_or(|bg| bg <= 6 || bg == 8)
}

pub struct Theme {
    pub root_bg: Color,
    pub text: Color,
    pub text_secondary: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,

    // Specific components
    pub indicator: Style,
    pub popover_border: Style,
    pub popover_title: Style,
    pub popover_text: Style,
    pub popover_error: Style,
    pub popover_loading: Style,
    pub toolbar: Style,
    pub prompt_input: Style,
    pub footer: Style,
}

impl Theme {
    pub fn from_mode(mode: ThemeMode) -> Self {
        match mode.resolve() {
            ThemeMode::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Self {
            root_bg: Color::Black,
            text: Color::White,
            text_secondary: Color::Gray,
            selection_bg: Color::Blue,
            selection_fg: Color::White,

            indicator: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            popover_border: Style::default().fg(Color::Magenta).bg(Color::Black),
            popover_title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            popover_text: Style::default().fg(Color::White).bg(Color::Black),
            popover_error: Style::default().fg(Color::LightRed).bg(Color::Black),
            popover_loading: Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            toolbar: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            prompt_input: Style::default().fg(Color::Yellow),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        }
    }

    pub fn light() -> Self {
        Self {
            root_bg: Color::White,
            text: Color::Black,
            text_secondary: Color::DarkGray,
            selection_bg: Color::LightBlue,
            selection_fg: Color::Black,

            indicator: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            popover_border: Style::default().fg(Color::Blue).bg(Color::White),
            popover_title: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            popover_text: Style::default().fg(Color::Black).bg(Color::White),
            popover_error: Style::default().fg(Color::Red).bg(Color::White),
            popover_loading: Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            toolbar: Style::default().fg(Color::DarkGray),
            prompt_input: Style::default().fg(Color::Blue),
            footer: Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
