//! # Validation Hooks
//!
//! A validation hook post-processes the rows parsed from one action and returns the value
//! stored as that action's validation result. Hooks are registered by action name at startup
//! and looked up by that name during a run; a name without a hook passes the rows through.

use std::collections::HashMap;
use std::sync::Arc;

use patrol_common::inspection::Row;
use serde_json::Value;
use tracing::debug;

pub mod builtin;

pub type ValidationHook = Arc<dyn Fn(&[Row]) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, ValidationHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the hooks in [`builtin`].
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Registers `hook` under `name`, replacing any previous hook with that name.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&[Row]) -> Value + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValidationHook> {
        self.hooks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the hook registered for `action_name`, or returns the rows unchanged.
    pub fn validate(&self, action_name: &str, rows: &[Row]) -> Value {
        match self.hooks.get(action_name) {
            Some(hook) => {
                debug!(action = action_name, "applying validation hook");
                hook(rows)
            }
            None => rows_to_value(rows),
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.names())
            .finish()
    }
}

pub fn rows_to_value(rows: &[Row]) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| {
                Value::Object(
                    row.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            })
            .collect(),
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
