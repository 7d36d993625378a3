//! # Action Model
//!
//! An action is a named diagnostic command plus the strategy used to turn its output into
//! rows. Actions are immutable for the duration of a run.

use serde::{Deserialize, Serialize};

use crate::device::field_matches;

/// Command class. Only `show` commands are expected, `config` commands pass through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    #[default]
    Show,
    Config,
}

/// How the raw output of an action is turned into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    /// Regular expression with named capture groups.
    #[serde(alias = "regexp")]
    Pattern,
    /// Declarative column template over tabular CLI output.
    #[serde(alias = "textfsm")]
    Table,
}

impl std::fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStrategy::Pattern => write!(f, "pattern"),
            ParseStrategy::Table => write!(f, "table"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: u64,
    /// Logical check name. Validation hooks are looked up by this name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    pub cmd: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    /// `None` keeps the raw output and produces no rows.
    #[serde(default)]
    pub parse_type: Option<ParseStrategy>,
    #[serde(default)]
    pub parse_content: String,
}

impl Action {
    pub fn new(id: u64, name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            vendor: String::new(),
            model: String::new(),
            cmd: cmd.into(),
            kind: CommandKind::Show,
            parse_type: None,
            parse_content: String::new(),
        }
    }

    pub fn with_parser(mut self, strategy: ParseStrategy, content: impl Into<String>) -> Self {
        self.parse_type = Some(strategy);
        self.parse_content = content.into();
        self
    }
}

/// Exact-match filter over actions. Absent or empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFilter {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub kind: Option<CommandKind>,
}

impl ActionFilter {
    pub fn matches(&self, action: &Action) -> bool {
        self.id.is_none_or(|id| id == action.id)
            && self.kind.is_none_or(|kind| kind == action.kind)
            && field_matches(&self.name, &action.name)
            && field_matches(&self.vendor, &action.vendor)
            && field_matches(&self.model, &action.model)
    }
}

/// Partial update of an action, addressed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPatch {
    pub id: u64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub cmd: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CommandKind>,
    pub parse_type: Option<ParseStrategy>,
    pub parse_content: Option<String>,
}

impl ActionPatch {
    pub fn apply(self, action: &mut Action) {
        if let Some(name) = self.name {
            action.name = name;
        }
        if let Some(description) = self.description {
            action.description = description;
        }
        if let Some(vendor) = self.vendor {
            action.vendor = vendor;
        }
        if let Some(model) = self.model {
            action.model = model;
        }
        if let Some(cmd) = self.cmd {
            action.cmd = cmd;
        }
        if let Some(kind) = self.kind {
            action.kind = kind;
        }
        if let Some(strategy) = self.parse_type {
            action.parse_type = Some(strategy);
        }
        if let Some(content) = self.parse_content {
            action.parse_content = content;
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
