use std::fmt::Display;

use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;
use crate::terminal::format::Detail;
use crate::terminal::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 64;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

/// Writes a preformatted line through the log pipeline, so it never tears a progress bar.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// `fill` on both sides of `label`, padded to the full report width.
fn rule(fill: &str, label: ColoredString) -> String {
    let free = TOTAL_WIDTH.saturating_sub(label.width());
    let left = free / 2;
    format!(
        "{}{}{}",
        fill.repeat(left).color(colors::SEPARATOR),
        label,
        fill.repeat(free - left).color(colors::SEPARATOR)
    )
}

/// `key.....:` with the dots filling up to `width`.
fn dotted(key: &str, width: usize, key_color: Color) -> String {
    let dots = ".".repeat(width.saturating_sub(key.width()) + 1);
    format!(
        "{}{}{}",
        key.color(key_color),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    )
}

pub fn banner() {
    let title = format!("⟦ PATROL v{} ⟧", env!("CARGO_PKG_VERSION"));
    print(&rule("═", title.bright_green().bold()));
}

pub fn header(msg: &str) {
    let title = format!("⟦ {} ⟧", msg.to_uppercase());
    print(&rule("─", title.color(colors::HEALTHY)));
}

pub fn fat_separator() {
    print(&rule("═", "".normal()));
}

pub fn aligned_line(key: &str, value: impl Display, key_width: usize) {
    let prefix = ">".color(colors::SEPARATOR);
    let value = value.to_string().color(colors::TEXT_DEFAULT);
    print(&format!("{prefix} {} {value}", dotted(key, key_width, colors::PRIMARY)));
}

pub fn tree_head(idx: usize, name: &str) {
    print(&format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    ));
}

/// One branch per detail, keys aligned on the widest one.
pub fn detail_tree(details: &[Detail]) {
    let key_width = details.iter().map(|(key, _)| key.width()).max().unwrap_or(0);

    for (i, (key, value)) in details.iter().enumerate() {
        let branch = match i + 1 == details.len() {
            true => "└─",
            false => "├─",
        };
        print(&format!(
            " {} {} {value}",
            branch.color(colors::SEPARATOR),
            dotted(key, key_width, colors::TEXT_DEFAULT)
        ));
    }
}

pub fn centerln(msg: &str) {
    let pad = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{pad}{msg}"));
}

pub fn no_results(what: &str) {
    centerln(&format!("no {what} found").color(colors::FAILED).bold().to_string());
}

pub fn footer() {
    fat_separator();
}
