//! Interactive prompt recognition and output cleanup.
//!
//! Network CLIs do not frame command output; the only signal that a command finished is the
//! prompt coming back on the last, unterminated line of the stream. Recognized forms:
//!
//! * `core-sw-01#`, `core-sw-01>`, `core-sw-01(config)#` (Cisco-like)
//! * `<HW-AGG-01>`, `[HW-AGG-01]`, `[~HW-AGG-01-GigabitEthernet0/0/1]` (Huawei / H3C)
//! * `admin@edge-01>`, `user@host:~$` (Junos, Unix shells)

use std::sync::LazyLock;

use regex::Regex;

static GENERIC_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:<[^<>\s]+>|\[[^\[\]\s]+\]|[A-Za-z0-9_][\w.\-@/:()~]*[#>$%])\s*$")
        .expect("static prompt pattern is valid")
});

static PAGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:-+\s*more\s*-+|<--- more --->|press any key to continue\W*)[ \x08]*")
        .expect("static pager pattern is valid")
});

static TRAILING_PAGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:-+\s*more\s*-+|<--- more --->|press any key to continue\W*)\s*$")
        .expect("static pager pattern is valid")
});

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[()][A-Z0-9]")
        .expect("static escape pattern is valid")
});

/// Matches prompt lines, either generically or narrowed to a prompt seen after login.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    learned: Option<Regex>,
}

impl Default for PromptMatcher {
    fn default() -> Self {
        Self::generic()
    }
}

impl PromptMatcher {
    pub fn generic() -> Self {
        Self { learned: None }
    }

    /// Narrows matching to prompts sharing the device name of `prompt_line`, so that output
    /// lines which merely look like prompts are not taken for the end of a command.
    pub fn learned(prompt_line: &str) -> Self {
        let learned = base_name(prompt_line).and_then(|base| {
            let expr = format!(
                r"^[<\[]?[~*]?{}[^\s]*?[#>$%\]]\s*$",
                regex::escape(base)
            );
            Regex::new(&expr).ok()
        });
        Self { learned }
    }

    pub fn is_prompt(&self, line: &str) -> bool {
        let line = line.trim_end_matches('\r');
        match &self.learned {
            Some(pattern) => pattern.is_match(line),
            None => GENERIC_PROMPT.is_match(line),
        }
    }

    /// The prompt on the trailing line of `buffer`, if the device is waiting for input.
    pub fn trailing_prompt(&self, buffer: &str) -> Option<String> {
        let last = buffer.rsplit('\n').next()?;
        let last = strip_escapes(last);
        let candidate = last.trim();
        (!candidate.is_empty() && self.is_prompt(candidate)).then(|| candidate.to_string())
    }
}

/// Device name embedded in a prompt: `<HW-01>` → `HW-01`, `core(config)#` → `core`.
pub fn base_name(prompt_line: &str) -> Option<&str> {
    let trimmed = prompt_line.trim();
    let inner = trimmed
        .trim_start_matches(['<', '['])
        .trim_start_matches(['~', '*']);
    let end = inner
        .find(|c: char| matches!(c, '(' | '#' | '>' | '$' | '%' | ']' | ':' | '@'))
        .unwrap_or(inner.len());
    let base = &inner[..end];
    (!base.is_empty()).then_some(base)
}

/// True when the device paused output behind a pager prompt.
pub fn has_pager(buffer: &str) -> bool {
    TRAILING_PAGER.is_match(buffer)
}

pub fn strip_escapes(text: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// Turns a raw read buffer into the command's output: line endings normalized, escape
/// sequences and pager prompts removed, echoed command and trailing prompt dropped.
pub fn clean_output(buffer: &str, command: &str, prompt: &PromptMatcher) -> String {
    let text = strip_escapes(buffer);
    let text = PAGER.replace_all(&text, "");
    let text = text.replace("\r\n", "\n").replace(['\r', '\x08'], "");

    let mut lines: Vec<&str> = text.lines().collect();
    if let Some(first) = lines.first()
        && !command.trim().is_empty()
        && first.trim_end().ends_with(command.trim())
    {
        lines.remove(0);
    }
    if let Some(last) = lines.last()
        && prompt.is_prompt(last.trim())
    {
        lines.pop();
    }

    lines.join("\n").trim_end().to_string()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
