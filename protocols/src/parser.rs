//! Strategy dispatch.

use patrol_common::action::{Action, ParseStrategy};
use patrol_common::error::SchemaError;
use patrol_common::inspection::Row;

use crate::pattern::PatternParser;
use crate::table::TableParser;

/// A compiled parse schema, ready to be applied to any number of outputs.
#[derive(Debug, Clone)]
pub enum Parser {
    /// No strategy declared: the raw output is kept and no rows are produced.
    Raw,
    Pattern(PatternParser),
    Table(TableParser),
}

impl Parser {
    pub fn compile(strategy: Option<ParseStrategy>, schema: &str) -> Result<Self, SchemaError> {
        match strategy {
            None => Ok(Parser::Raw),
            Some(ParseStrategy::Pattern) => PatternParser::compile(schema).map(Parser::Pattern),
            Some(ParseStrategy::Table) => TableParser::compile(schema).map(Parser::Table),
        }
    }

    pub fn for_action(action: &Action) -> Result<Self, SchemaError> {
        Self::compile(action.parse_type, &action.parse_content)
    }

    pub fn parse(&self, raw: &str) -> Vec<Row> {
        match self {
            Parser::Raw => Vec::new(),
            Parser::Pattern(parser) => parser.parse(raw),
            Parser::Table(parser) => parser.parse(raw),
        }
    }
}

/// One-shot parse. Prefer [`Parser::compile`] when the same schema is applied repeatedly.
pub fn parse(
    raw: &str,
    strategy: Option<ParseStrategy>,
    schema: &str,
) -> Result<Vec<Row>, SchemaError> {
    Ok(Parser::compile(strategy, schema)?.parse(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_strategy() {
        let rows = parse("Version 7.0(3)", Some(ParseStrategy::Pattern), r"Version (?P<v>\S+)").unwrap();
        assert_eq!(rows[0]["v"], "7.0(3)");

        let rows = parse("a b\n", Some(ParseStrategy::Table), r#"{"columns": [{"name": "x"}, {"name": "y"}]}"#).unwrap();
        assert_eq!(rows[0]["y"], "b");
    }

    #[test]
    fn absent_strategy_keeps_no_rows() {
        let rows = parse("anything at all", None, "").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn schema_errors_are_not_empty_results() {
        let err = parse("output", Some(ParseStrategy::Table), "").unwrap_err();
        assert_eq!(err, SchemaError::Empty("table".into()));
    }
}
