//! Structured command output and terminal rendering.
//!
//! The engine never formats for a particular terminal. It hands the sender a
//! [`Message`], and hosts that print to a terminal use [`Painter`] to turn it
//! into text.

use std::io::IsTerminal;

// ============================================================================
// ANSI Color Codes
// ============================================================================

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";
pub const GRAY: &str = "\x1b[90m";

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";

pub const BRIGHT_RED: &str = "\x1b[91m";
pub const BRIGHT_YELLOW: &str = "\x1b[93m";

// ============================================================================
// Messages
// ============================================================================

/// Something the engine wants shown to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Error(String),
    /// The usage string of the command that failed.
    Usage(String),
    Info(String),
    Help(HelpPage),
}

impl Message {
    /// Plain text without any styling.
    pub fn plain(&self) -> String {
        match self {
            Message::Error(text) | Message::Info(text) => text.clone(),
            Message::Usage(usage) => format!("Usage: {usage}"),
            Message::Help(page) => page.plain(),
        }
    }
}

/// Named colors a help theme can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeColor {
    Red,
    Green,
    Yellow,
    Gold,
    Blue,
    Cyan,
    Magenta,
    White,
    Gray,
}

impl ThemeColor {
    pub fn ansi(self) -> &'static str {
        match self {
            ThemeColor::Red => RED,
            ThemeColor::Green => GREEN,
            ThemeColor::Yellow => BRIGHT_YELLOW,
            ThemeColor::Gold => YELLOW,
            ThemeColor::Blue => BLUE,
            ThemeColor::Cyan => CYAN,
            ThemeColor::Magenta => MAGENTA,
            ThemeColor::White => WHITE,
            ThemeColor::Gray => GRAY,
        }
    }
}

/// Colors used when rendering a composite's help pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpTheme {
    pub border: ThemeColor,
    pub heading: ThemeColor,
    pub label: ThemeColor,
    pub text: ThemeColor,
}

impl Default for HelpTheme {
    fn default() -> Self {
        Self {
            border: ThemeColor::Yellow,
            heading: ThemeColor::White,
            label: ThemeColor::Gold,
            text: ThemeColor::White,
        }
    }
}

impl HelpTheme {
    pub fn with_border(mut self, color: ThemeColor) -> Self {
        self.border = color;
        self
    }

    pub fn with_heading(mut self, color: ThemeColor) -> Self {
        self.heading = color;
        self
    }

    pub fn with_label(mut self, color: ThemeColor) -> Self {
        self.label = color;
        self
    }

    pub fn with_text(mut self, color: ThemeColor) -> Self {
        self.text = color;
        self
    }
}

const HEADER_PREFIX: &str = "--------- ";
const HEADER_WIDTH: usize = 49;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpLine {
    pub label: String,
    pub text: String,
}

impl HelpLine {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A help listing: one header naming the topic, then labeled lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    pub topic: String,
    pub lines: Vec<HelpLine>,
    pub theme: HelpTheme,
}

impl HelpPage {
    pub fn new(topic: impl Into<String>, theme: HelpTheme) -> Self {
        Self {
            topic: topic.into(),
            lines: Vec::new(),
            theme,
        }
    }

    pub fn line(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.lines.push(HelpLine::new(label, text));
        self
    }

    /// `Help: <topic>`
    pub fn heading(&self) -> String {
        format!("Help: {}", self.topic)
    }

    /// Trailing border after the heading, so the header spans a fixed width.
    pub fn header_suffix(&self) -> String {
        let used = HEADER_PREFIX.len() + self.heading().chars().count();
        format!(" {}", "-".repeat(HEADER_WIDTH.saturating_sub(used)))
    }

    pub fn header(&self) -> String {
        format!("{HEADER_PREFIX}{}{}", self.heading(), self.header_suffix())
    }

    pub fn plain(&self) -> String {
        let mut out = self.header();
        for line in &self.lines {
            out.push('\n');
            out.push_str(&line.label);
            out.push_str(": ");
            out.push_str(&line.text);
        }
        out
    }
}

/// Cut descriptions longer than 50 characters to 47 plus an ellipsis.
pub fn shorten_description(description: &str) -> String {
    if description.chars().count() > 50 {
        let cut: String = description.chars().take(47).collect();
        format!("{cut}...")
    } else {
        description.to_string()
    }
}

// ============================================================================
// Color State
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

pub fn parse_color_mode(value: &str) -> Result<ColorMode, String> {
    match value {
        "auto" => Ok(ColorMode::Auto),
        "always" => Ok(ColorMode::Always),
        "never" => Ok(ColorMode::Never),
        other => Err(format!(
            "invalid color mode '{other}' (expected auto, always or never)"
        )),
    }
}

/// Determines if colors should be used based on ColorMode and terminal detection.
pub fn is_enabled(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

/// Colorizer for terminal hosts.
#[derive(Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: is_enabled(mode),
        }
    }

    /// Errors - BRIGHT_RED
    pub fn error(&self, s: &str) -> String {
        self.wrap(s, BRIGHT_RED)
    }

    /// Usage hints - DIM
    pub fn usage(&self, s: &str) -> String {
        self.wrap(s, DIM)
    }

    pub fn themed(&self, s: &str, color: ThemeColor) -> String {
        self.wrap(s, color.ansi())
    }

    pub fn render(&self, message: &Message) -> String {
        match message {
            Message::Error(text) => self.error(text),
            Message::Usage(usage) => self.usage(&format!("Usage: {usage}")),
            Message::Info(text) => text.clone(),
            Message::Help(page) => self.render_help(page),
        }
    }

    pub fn render_help(&self, page: &HelpPage) -> String {
        let theme = page.theme;
        let mut out = String::new();
        out.push_str(&self.themed(HEADER_PREFIX, theme.border));
        out.push_str(&self.wrap_both(&page.heading(), BOLD, theme.heading.ansi()));
        out.push_str(&self.themed(&page.header_suffix(), theme.border));
        for line in &page.lines {
            out.push('\n');
            out.push_str(&self.themed(&format!("{}: ", line.label), theme.label));
            out.push_str(&self.themed(&line.text, theme.text));
        }
        out
    }

    pub fn wrap(&self, s: &str, code: &str) -> String {
        if self.enabled {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn wrap_both(&self, s: &str, code1: &str, code2: &str) -> String {
        if self.enabled {
            format!("{code1}{code2}{s}{RESET}")
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_padded_to_width() {
        let page = HelpPage::new("math", HelpTheme::default());
        let header = page.header();
        assert!(header.starts_with("--------- Help: math -"));
        assert_eq!(header.chars().count(), HEADER_WIDTH + 1);
    }

    #[test]
    fn test_header_long_topic_keeps_single_space() {
        let page = HelpPage::new("x".repeat(60), HelpTheme::default());
        assert!(page.header().ends_with(&format!("{} ", "x".repeat(60))));
    }

    #[test]
    fn test_shorten_description() {
        assert_eq!(shorten_description("short"), "short");
        let long = "a".repeat(51);
        let cut = shorten_description(&long);
        assert_eq!(cut.len(), 50);
        assert!(cut.ends_with("..."));
        assert_eq!(shorten_description(&"b".repeat(50)), "b".repeat(50));
    }

    #[test]
    fn test_painter_disabled_renders_plain() {
        let p = Painter { enabled: false };
        let page = HelpPage::new("calc", HelpTheme::default()).line("add <a> <b>", "Add");
        assert_eq!(p.render(&Message::Help(page.clone())), page.plain());
        assert_eq!(p.render(&Message::Usage("calc".into())), "Usage: calc");
    }

    #[test]
    fn test_painter_enabled_wraps_codes() {
        let p = Painter { enabled: true };
        assert_eq!(p.error("bad"), "\x1b[91mbad\x1b[0m");
        assert_eq!(p.themed("x", ThemeColor::Gold), "\x1b[33mx\x1b[0m");
    }

    #[test]
    fn test_color_mode_parsing() {
        assert_eq!(parse_color_mode("never"), Ok(ColorMode::Never));
        assert!(parse_color_mode("sometimes").is_err());
        assert!(is_enabled(ColorMode::Always));
        assert!(!is_enabled(ColorMode::Never));
    }
}
