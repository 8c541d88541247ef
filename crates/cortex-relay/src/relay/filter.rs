use serde_json::Value;
use std::collections::BTreeSet;

/// Removes a configured set of keys from JSON trees at every depth.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    blocked: BTreeSet<String>,
    enabled: bool,
}

impl FieldFilter {
    pub fn new<I, S>(blocked: I, enabled: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked: blocked.into_iter().map(Into::into).collect(),
            enabled,
        }
    }

    /// A filter that never touches its input.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.blocked.is_empty()
    }

    /// Apply the filter. When disabled the value is handed back untouched.
    pub fn apply(&self, tree: Value) -> Value {
        if !self.is_enabled() {
            return tree;
        }
        filter(tree, &self.blocked)
    }
}

/// Drop every key in `blocked` from mappings at any depth, descending into
/// the surviving values and into every sequence element. Scalars are
/// returned as they are.
pub fn filter(tree: Value, blocked: &BTreeSet<String>) -> Value {
    match tree {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !blocked.contains(key))
                .map(|(key, value)| (key, filter(value, blocked)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|item| filter(item, blocked)).collect())
        }
        scalar => scalar,
    }
}
