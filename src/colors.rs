//! Terminal color setup.
//!
//! `--color always|never` wins. With `--color auto` (the default) the usual
//! conventions apply, in this order:
//! - `NO_COLOR` set to anything disables colors (https://no-color.org/)
//! - `CLICOLOR_FORCE` set to anything but `0` forces colors
//! - `CLICOLOR=0` disables colors
//! - otherwise colors are on only when stdout is a terminal

use clap::ValueEnum;
use colored::control;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

pub fn init_colors(choice: ColorChoice) {
    control::set_override(colors_enabled(choice, |key| std::env::var(key).ok(), is_tty()));
}

pub fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

fn colors_enabled(
    choice: ColorChoice,
    var: impl Fn(&str) -> Option<String>,
    tty: bool,
) -> bool {
    match choice {
        ColorChoice::Always => return true,
        ColorChoice::Never => return false,
        ColorChoice::Auto => {}
    }

    if var("NO_COLOR").is_some() {
        return false;
    }
    if var("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if var("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    tty
}
