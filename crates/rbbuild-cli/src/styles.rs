use anstyle::{AnsiColor, Color, Style};

pub const HEADER: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const USAGE: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const LITERAL: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

pub const STEP: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
    .bold();

pub const POLICY: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::White)))
    .dimmed();

pub const ERROR: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Red)))
    .bold();

pub fn get_clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(HEADER)
        .usage(USAGE)
        .literal(LITERAL)
        .placeholder(LITERAL)
}
