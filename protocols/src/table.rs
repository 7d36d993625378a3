//! Semi-structured table strategy.
//!
//! Extracts rows from tabular CLI output using a declarative column template:
//!
//! ```json
//! {
//!   "header": "^Port\\s+Name\\s+Status",
//!   "end": "^\\s*$",
//!   "fixed_width": true,
//!   "columns": [
//!     { "name": "port",   "title": "Port",   "pattern": "\\S+" },
//!     { "name": "name",   "title": "Name",   "pattern": ".*", "optional": true },
//!     { "name": "status", "title": "Status", "pattern": "connected|notconnect|disabled" }
//!   ]
//! }
//! ```
//!
//! Whitespace-delimited templates turn the columns into a single anchored row regex.
//! Fixed-width templates slice every line at the offsets where the column titles appear in the
//! header line, which keeps cells containing spaces intact. Lines that do not fit are skipped.

use patrol_common::error::SchemaError;
use patrol_common::inspection::Row;
use regex::Regex;
use serde::Deserialize;

const DEFAULT_CELL: &str = r"\S+";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableTemplate {
    /// Marks the line right before the first row. Without it rows start at the first line.
    #[serde(default)]
    pub header: Option<String>,
    /// Marks the end of the table. A later header starts a new section.
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub fixed_width: bool,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default = "default_cell")]
    pub pattern: String,
    /// Header text locating the column in fixed-width mode. Defaults to `name`.
    #[serde(default)]
    pub title: Option<String>,
    /// Empty cells are accepted. Only trailing columns may be optional in delimited mode.
    #[serde(default)]
    pub optional: bool,
}

fn default_cell() -> String {
    DEFAULT_CELL.to_string()
}

#[derive(Debug, Clone)]
struct FixedColumn {
    name: String,
    title: String,
    cell: Regex,
    optional: bool,
}

#[derive(Debug, Clone)]
enum Layout {
    Delimited { row: Regex, names: Vec<String> },
    Fixed { columns: Vec<FixedColumn> },
}

#[derive(Debug, Clone)]
pub struct TableParser {
    header: Option<Regex>,
    end: Option<Regex>,
    layout: Layout,
}

impl TableParser {
    pub fn compile(content: &str) -> Result<Self, SchemaError> {
        if content.trim().is_empty() {
            return Err(SchemaError::Empty("table".into()));
        }
        let template: TableTemplate = serde_json::from_str(content)
            .map_err(|e| SchemaError::InvalidTemplate(e.to_string()))?;
        Self::from_template(template)
    }

    pub fn from_template(template: TableTemplate) -> Result<Self, SchemaError> {
        if template.columns.is_empty() {
            return Err(SchemaError::InvalidTemplate("no columns declared".into()));
        }
        for column in &template.columns {
            validate_column_name(&column.name)?;
        }
        if template.fixed_width && template.header.is_none() {
            return Err(SchemaError::InvalidTemplate(
                "fixed_width templates need a header".into(),
            ));
        }

        let header = template.header.as_deref().map(compile_marker).transpose()?;
        let end = template.end.as_deref().map(compile_marker).transpose()?;
        let layout = if template.fixed_width {
            fixed_layout(template.columns)?
        } else {
            delimited_layout(template.columns)?
        };

        Ok(Self {
            header,
            end,
            layout,
        })
    }

    pub fn parse(&self, raw: &str) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut in_table = self.header.is_none();
        let mut offsets: Option<Vec<usize>> = None;

        for line in raw.lines().map(|l| l.trim_end_matches('\r')) {
            if let Some(header) = &self.header
                && header.is_match(line)
            {
                in_table = true;
                offsets = self.locate_columns(line);
                continue;
            }
            if !in_table {
                continue;
            }
            if let Some(end) = &self.end
                && end.is_match(line)
            {
                in_table = false;
                continue;
            }
            if is_rule(line) {
                continue;
            }

            let row = match &self.layout {
                Layout::Delimited { row, names } => delimited_row(row, names, line),
                Layout::Fixed { columns } => offsets
                    .as_deref()
                    .and_then(|offsets| fixed_row(columns, offsets, line)),
            };
            if let Some(row) = row {
                rows.push(row);
            }
        }

        rows
    }

    /// Character offsets of each column title in `header_line`, in declaration order.
    fn locate_columns(&self, header_line: &str) -> Option<Vec<usize>> {
        let Layout::Fixed { columns } = &self.layout else {
            return None;
        };

        let mut offsets = Vec::with_capacity(columns.len());
        let mut search_from = 0;
        for column in columns {
            let found = header_line[search_from..].find(&column.title)? + search_from;
            offsets.push(header_line[..found].chars().count());
            search_from = found + column.title.len();
        }
        // The first column owns everything left of the second title.
        if let Some(first) = offsets.first_mut() {
            *first = 0;
        }
        Some(offsets)
    }
}

fn compile_marker(pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern(e.to_string()))
}

fn validate_column_name(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SchemaError::InvalidColumn(name.to_string()))
    }
}

fn delimited_layout(columns: Vec<ColumnSpec>) -> Result<Layout, SchemaError> {
    let mut expr = String::from(r"^\s*");
    let mut seen_optional = false;

    for (idx, column) in columns.iter().enumerate() {
        if seen_optional && !column.optional {
            return Err(SchemaError::InvalidTemplate(format!(
                "required column '{}' follows an optional one",
                column.name
            )));
        }
        seen_optional |= column.optional;

        let separator = if idx == 0 { "" } else { r"\s+" };
        let group = format!("(?P<{}>(?:{}))", column.name, column.pattern);
        if column.optional {
            expr.push_str(&format!("(?:{separator}{group})?"));
        } else {
            expr.push_str(separator);
            expr.push_str(&group);
        }
    }
    expr.push_str(r"\s*$");

    let row = Regex::new(&expr).map_err(|e| SchemaError::InvalidTemplate(e.to_string()))?;
    let names = columns.into_iter().map(|c| c.name).collect();
    Ok(Layout::Delimited { row, names })
}

fn fixed_layout(columns: Vec<ColumnSpec>) -> Result<Layout, SchemaError> {
    let columns = columns
        .into_iter()
        .map(|column| {
            let cell = Regex::new(&format!("^(?:{})$", column.pattern))
                .map_err(|e| SchemaError::InvalidTemplate(e.to_string()))?;
            Ok(FixedColumn {
                title: column.title.unwrap_or_else(|| column.name.clone()),
                name: column.name,
                cell,
                optional: column.optional,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(Layout::Fixed { columns })
}

fn delimited_row(row: &Regex, names: &[String], line: &str) -> Option<Row> {
    let caps = row.captures(line)?;
    Some(
        names
            .iter()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.clone(), value.to_string())
            })
            .collect(),
    )
}

fn fixed_row(columns: &[FixedColumn], offsets: &[usize], line: &str) -> Option<Row> {
    let chars: Vec<char> = line.chars().collect();
    let mut row = Row::new();

    for (idx, column) in columns.iter().enumerate() {
        let start = offsets[idx].min(chars.len());
        let end = offsets
            .get(idx + 1)
            .copied()
            .unwrap_or(chars.len())
            .min(chars.len())
            .max(start);
        let cell: String = chars[start..end].iter().collect();
        let cell = cell.trim();

        if cell.is_empty() && column.optional {
            row.insert(column.name.clone(), String::new());
            continue;
        }
        if !column.cell.is_match(cell) {
            return None;
        }
        row.insert(column.name.clone(), cell.to_string());
    }

    Some(row)
}

/// Blank lines and horizontal rules such as `-------  ------`.
fn is_rule(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_whitespace() || matches!(c, '-' | '=' | '+' | '*'))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    const POWER_OUTPUT: &str = "\
switch# show environment power
PS  Model             Status
--  ----------------  ---------
1   PWR-C1-350WAC     OK
2   PWR-C1-350WAC     Bad
3   absent
switch#";

    const INTERFACE_STATUS: &str = "\
Port      Name               Status       Vlan
Gi1/0/1   uplink to core     connected    trunk
Gi1/0/2                      notconnect   10
Gi1/0/3   printer            disabled     20

Total 3 ports";

    #[test]
    fn delimited_rows_follow_the_header() {
        let template = r#"{
            "header": "^PS\\s+Model\\s+Status",
            "columns": [
                {"name": "ps", "pattern": "\\d+"},
                {"name": "model", "pattern": "\\S+"},
                {"name": "status", "pattern": "\\w+"}
            ]
        }"#;
        let rows = TableParser::compile(template).unwrap().parse(POWER_OUTPUT);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ps"], "1");
        assert_eq!(rows[1]["status"], "Bad");
    }

    #[test]
    fn trailing_optional_columns_may_be_missing() {
        let template = r#"{
            "header": "^PS\\s+Model",
            "columns": [
                {"name": "ps", "pattern": "\\d+"},
                {"name": "model", "pattern": "\\S+"},
                {"name": "status", "pattern": "\\w+", "optional": true}
            ]
        }"#;
        let rows = TableParser::compile(template).unwrap().parse(POWER_OUTPUT);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["model"], "absent");
        assert_eq!(rows[2]["status"], "");
    }

    #[test]
    fn fixed_width_keeps_cells_with_spaces() {
        let template = r#"{
            "header": "^Port\\s+Name\\s+Status",
            "end": "^\\s*$",
            "fixed_width": true,
            "columns": [
                {"name": "port", "title": "Port"},
                {"name": "name", "title": "Name", "pattern": ".*", "optional": true},
                {"name": "status", "title": "Status", "pattern": "connected|notconnect|disabled"},
                {"name": "vlan", "title": "Vlan"}
            ]
        }"#;
        let rows = TableParser::compile(template).unwrap().parse(INTERFACE_STATUS);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["name"], "uplink to core");
        assert_eq!(rows[1]["name"], "");
        assert_eq!(rows[1]["status"], "notconnect");
        assert_eq!(rows[2]["vlan"], "20");
    }

    #[test]
    fn missing_header_produces_no_rows() {
        let template = r#"{"header": "^Neighbor\\s+", "columns": [{"name": "peer"}]}"#;
        let rows = TableParser::compile(template).unwrap().parse(POWER_OUTPUT);
        assert!(rows.is_empty());
    }

    #[test]
    fn malformed_templates_are_schema_errors() {
        assert!(matches!(
            TableParser::compile("not json"),
            Err(SchemaError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TableParser::compile(r#"{"columns": []}"#),
            Err(SchemaError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TableParser::compile(r#"{"columns": [{"name": "bad-name"}]}"#),
            Err(SchemaError::InvalidColumn(_))
        ));
        assert!(matches!(
            TableParser::compile(r#"{"fixed_width": true, "columns": [{"name": "a"}]}"#),
            Err(SchemaError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TableParser::compile(
                r#"{"columns": [{"name": "a", "optional": true}, {"name": "b"}]}"#
            ),
            Err(SchemaError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TableParser::compile(r#"{"header": "(", "columns": [{"name": "a"}]}"#),
            Err(SchemaError::InvalidPattern(_))
        ));
    }
}
