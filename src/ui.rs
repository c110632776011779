//! Terminal output for gitprof: labels, styled text, tables and spinners.
//!
//! Color is disabled, in priority order, by:
//! 1. `--no-color`
//! 2. `NO_COLOR` (any value)
//! 3. `TERM=dumb`
//! 4. stdout not being a TTY (in `auto` mode)

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

/// When to emit ANSI colors
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Ok,
    Warn,
    Err,
    Info,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Err => "ERROR",
            Level::Info => "INFO",
        }
    }

    fn color(self) -> AnsiColor {
        match self {
            Level::Ok => AnsiColor::Green,
            Level::Warn => AnsiColor::Yellow,
            Level::Err => AnsiColor::Red,
            Level::Info => AnsiColor::Cyan,
        }
    }
}

/// Resolved display settings
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need a TTY and color
    pub spinner_enabled: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(ColorMode::Auto, false)
    }
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let color_enabled = Self::resolve_color(mode, force_no_color);
        let spinner_enabled = color_enabled && std::io::stdout().is_terminal();

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled,
        }
    }

    fn resolve_color(mode: ColorMode, force_no_color: bool) -> bool {
        let disabled_by_env = std::env::var_os("NO_COLOR").is_some()
            || std::env::var("TERM").is_ok_and(|t| t == "dumb");

        match mode {
            _ if force_no_color || disabled_by_env => false,
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }

    fn paint(&self, style: Style, s: &str) -> String {
        if self.color_enabled {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    fn emit(&self, level: Level, msg: &str) {
        let style = Style::new().fg_color(Some(Color::Ansi(level.color()))).bold();
        let label = self.paint(style, level.label());
        match level {
            Level::Err => eprintln!("{label} {msg}"),
            _ => println!("{label} {msg}"),
        }
    }

    pub fn ok(&self, msg: impl AsRef<str>) {
        self.emit(Level::Ok, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Level::Warn, msg.as_ref());
    }

    /// Goes to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        self.emit(Level::Err, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, msg.as_ref());
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(Style::new().bold(), s.as_ref())
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(
            Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            s.as_ref(),
        )
    }

    fn icon(&self, level: Level) -> &'static str {
        match (level, self.color_enabled) {
            (Level::Ok, true) => "✓",
            (Level::Ok, false) => "[OK]",
            (Level::Warn, true) => "⚠",
            (Level::Warn, false) => "[!]",
            (Level::Err, true) => "✗",
            (Level::Err, false) => "[X]",
            (Level::Info, true) => "•",
            (Level::Info, false) => "-",
        }
    }

    pub fn icon_ok(&self) -> &'static str {
        self.icon(Level::Ok)
    }

    pub fn icon_warn(&self) -> &'static str {
        self.icon(Level::Warn)
    }

    pub fn icon_err(&self) -> &'static str {
        self.icon(Level::Err)
    }

    pub fn icon_info(&self) -> &'static str {
        self.icon(Level::Info)
    }

    /// Bordered table (ASCII markdown without color)
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if self.color_enabled {
            table.load_preset(presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(presets::ASCII_MARKDOWN);
        }
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    pub fn header_cell(&self, content: impl Into<String>) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.add_attribute(comfy_table::Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table so column widths stay right
    pub fn colored_cell(&self, content: impl Into<String>, color: comfy_table::Color) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled { cell.fg(color) } else { cell }
    }

    /// SSH key path with an icon saying whether the file exists
    pub fn key_cell(&self, key_path: &str) -> Cell {
        if Path::new(key_path).exists() {
            self.colored_cell(format!("{} {}", self.icon_ok(), key_path), comfy_table::Color::Green)
        } else {
            self.colored_cell(format!("{} {}", self.icon_err(), key_path), comfy_table::Color::Red)
        }
    }

    /// Spinner for slow operations; hidden when spinners are disabled
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = if self.spinner_enabled {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
            {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message);
        pb
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}
