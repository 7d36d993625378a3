use std::collections::HashSet;

use patrol_common::action::Action;
use patrol_common::error::SchemaError;
use patrol_protocols::Parser;
use tracing::warn;

/// One action of a run together with its compiled parser.
///
/// A broken schema is kept as an error: the action is skipped without its command ever being
/// sent to the device.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub action: Action,
    pub parser: Result<Parser, SchemaError>,
}

/// The fixed, ordered action list shared by every device of a run. Action ids are unique
/// within a plan; a repeated id keeps its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    steps: Vec<PlannedAction>,
}

impl ActionPlan {
    pub fn compile(actions: Vec<Action>) -> Self {
        let mut seen = HashSet::new();
        let steps = actions
            .into_iter()
            .filter(|action| {
                let fresh = seen.insert(action.id);
                if !fresh {
                    warn!(action = %action.name, id = action.id, "duplicate action ignored");
                }
                fresh
            })
            .map(|action| {
                let parser = Parser::for_action(&action);
                if let Err(err) = &parser {
                    warn!(action = %action.name, id = action.id, "unusable parse schema: {err}");
                }
                PlannedAction { action, parser }
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedAction] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_common::action::ParseStrategy;

    #[test]
    fn keeps_order_and_schema_errors() {
        let plan = ActionPlan::compile(vec![
            Action::new(1, "version", "show version")
                .with_parser(ParseStrategy::Pattern, r"Version (?P<version>\S+)"),
            Action::new(2, "broken", "show broken").with_parser(ParseStrategy::Pattern, "(unclosed"),
            Action::new(3, "raw", "show clock"),
        ]);

        let names: Vec<&str> = plan.steps().iter().map(|s| s.action.name.as_str()).collect();
        assert_eq!(names, ["version", "broken", "raw"]);
        assert!(plan.steps()[0].parser.is_ok());
        assert!(matches!(
            plan.steps()[1].parser,
            Err(SchemaError::InvalidPattern(_))
        ));
        assert!(matches!(plan.steps()[2].parser, Ok(Parser::Raw)));
    }

    #[test]
    fn repeated_action_id_keeps_the_first() {
        let plan = ActionPlan::compile(vec![
            Action::new(1, "version", "show version"),
            Action::new(2, "clock", "show clock"),
            Action::new(1, "version again", "show version | no-more"),
        ]);

        let ids: Vec<u64> = plan.steps().iter().map(|s| s.action.id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(plan.steps()[0].action.cmd, "show version");
    }
}
