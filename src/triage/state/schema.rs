// SPDX-License-Identifier: MIT

//! State schema definitions and the reducers that merge updates into a field

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Declared fields of a graph's state and how each one merges
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateSchema {
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing any previous declaration with the same name
    pub fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        reducer: ReducerType,
    ) -> Self {
        self.fields.insert(
            name.into(),
            StateFieldDef {
                field_type,
                reducer,
                default: None,
            },
        );
        self
    }

    /// Declare a field with a default value
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        reducer: ReducerType,
        default: Value,
    ) -> Self {
        self.fields.insert(
            name.into(),
            StateFieldDef {
                field_type,
                reducer,
                default: Some(default),
            },
        );
        self
    }

    /// Reducer for a field; undeclared fields overwrite
    pub fn reducer_for(&self, key: &str) -> ReducerType {
        self.fields
            .get(key)
            .map(|def| def.reducer.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateFieldDef {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub reducer: ReducerType,
    /// Seeded into the initial state when the caller leaves the field out
    pub default: Option<Value>,
}

/// Informational; values are not type-checked on merge
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// How concurrent and successive writes to one field combine
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Last write in declared node order wins
    #[default]
    Overwrite,
    /// Concatenate; array updates are flattened one level
    #[serde(alias = "concat_append")]
    Append,
    Max,
    Min,
    /// Shallow key merge, later keys win
    Merge,
}

impl ReducerType {
    /// Fold `updates` (already in declared node order) into `current`.
    ///
    /// Returns `None` only when there was no current value and nothing applicable to write.
    pub fn reduce(&self, current: Option<&Value>, updates: Vec<Value>) -> Option<Value> {
        match self {
            ReducerType::Overwrite => updates.into_iter().last().or_else(|| current.cloned()),
            ReducerType::Append => {
                let mut items = match current {
                    Some(Value::Array(a)) => a.clone(),
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => vec![other.clone()],
                };
                for update in updates {
                    match update {
                        Value::Array(new_items) => items.extend(new_items),
                        other => items.push(other),
                    }
                }
                Some(Value::Array(items))
            }
            ReducerType::Max => fold_numbers(current, updates, |new, best| new > best),
            ReducerType::Min => fold_numbers(current, updates, |new, best| new < best),
            ReducerType::Merge => {
                let mut merged = match current {
                    Some(Value::Object(obj)) => obj.clone(),
                    _ => Map::new(),
                };
                for update in updates {
                    if let Value::Object(new_obj) = update {
                        for (k, v) in new_obj {
                            merged.insert(k, v);
                        }
                    }
                }
                Some(Value::Object(merged))
            }
        }
    }
}

fn fold_numbers<F>(current: Option<&Value>, updates: Vec<Value>, better: F) -> Option<Value>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best = current.filter(|v| v.is_number()).cloned();
    for update in updates {
        let Some(new) = update.as_f64() else {
            continue;
        };
        match best.as_ref().and_then(|b| b.as_f64()) {
            Some(b) if !better(new, b) => {}
            _ => best = Some(update),
        }
    }
    best.or_else(|| current.cloned())
}
