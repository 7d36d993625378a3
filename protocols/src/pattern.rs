//! Regular-expression strategy.
//!
//! The schema is either a bare regex, applied line by line, or a JSON object selecting the
//! scope explicitly:
//!
//! ```json
//! { "regex": "Version (?P<version>\\S+)", "scope": "blob" }
//! ```
//!
//! Each match yields one row mapping group names to captured text.

use patrol_common::error::SchemaError;
use patrol_common::inspection::Row;
use regex::{Captures, Regex};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// Match every line on its own.
    #[default]
    Line,
    /// Match across the whole output.
    Blob,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternSchema {
    regex: String,
    #[serde(default)]
    scope: MatchScope,
}

#[derive(Debug, Clone)]
pub struct PatternParser {
    regex: Regex,
    scope: MatchScope,
    groups: Vec<String>,
}

impl PatternParser {
    pub fn compile(content: &str) -> Result<Self, SchemaError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::Empty("pattern".into()));
        }

        if trimmed.starts_with('{') {
            let schema: PatternSchema = serde_json::from_str(trimmed)
                .map_err(|e| SchemaError::InvalidPattern(e.to_string()))?;
            return Self::new(&schema.regex, schema.scope);
        }

        Self::new(content, MatchScope::Line)
    }

    pub fn new(pattern: &str, scope: MatchScope) -> Result<Self, SchemaError> {
        let regex = Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern(e.to_string()))?;
        let groups: Vec<String> = regex.capture_names().flatten().map(String::from).collect();
        if groups.is_empty() {
            return Err(SchemaError::NoNamedGroups(pattern.to_string()));
        }

        Ok(Self {
            regex,
            scope,
            groups,
        })
    }

    pub fn scope(&self) -> MatchScope {
        self.scope
    }

    pub fn parse(&self, raw: &str) -> Vec<Row> {
        match self.scope {
            MatchScope::Line => raw
                .lines()
                .flat_map(|line| self.rows_in(line.trim_end_matches('\r')))
                .collect(),
            MatchScope::Blob => self.rows_in(raw),
        }
    }

    fn rows_in(&self, text: &str) -> Vec<Row> {
        self.regex
            .captures_iter(text)
            .filter(|caps| caps.get(0).is_some_and(|m| !m.is_empty()))
            .map(|caps| self.to_row(&caps))
            .collect()
    }

    // Groups that did not take part in the match are kept as empty strings.
    fn to_row(&self, caps: &Captures<'_>) -> Row {
        self.groups
            .iter()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.clone(), value.to_string())
            })
            .collect()
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
