// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::schema::{ReducerType, StateSchema};

/// Partial state returned by a node: field name to value
pub type StateUpdate = Map<String, Value>;

/// Runtime workflow state with reducer support
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Current state values
    fields: HashMap<String, Value>,
    /// Schema carrying the reducer of each field
    schema: Arc<StateSchema>,
}

impl WorkflowState {
    /// Create a new WorkflowState from a schema, seeded with its defaults
    pub fn new(schema: Arc<StateSchema>) -> Self {
        let fields = schema
            .fields
            .iter()
            .filter_map(|(name, def)| def.default.clone().map(|d| (name.clone(), d)))
            .collect();

        Self { fields, schema }
    }

    /// Create an empty WorkflowState where every field overwrites
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
            schema: Arc::new(StateSchema::default()),
        }
    }

    /// Set caller-supplied seed fields, bypassing reducers
    pub fn seed(&mut self, seed: StateUpdate) {
        for (key, value) in seed {
            self.fields.insert(key, value);
        }
    }

    /// Update a field using the appropriate reducer
    pub fn update(&mut self, key: &str, value: Value) {
        self.apply(key, vec![value]);
    }

    /// Merge the partial updates of one pulse.
    ///
    /// `updates` must already be sorted in declared node order: the reducers rely on
    /// that order to break ties, never on the order in which nodes completed.
    pub fn merge_pulse(&mut self, updates: Vec<(String, StateUpdate)>) {
        let mut per_field: Vec<(String, Vec<(String, Value)>)> = Vec::new();

        for (node_id, update) in updates {
            for (key, value) in update {
                match per_field.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, writes)) => writes.push((node_id.clone(), value)),
                    None => per_field.push((key, vec![(node_id.clone(), value)])),
                }
            }
        }

        for (key, writes) in per_field {
            if writes.len() > 1 && self.schema.reducer_for(&key) == ReducerType::Overwrite {
                let writers: Vec<&str> = writes.iter().map(|(n, _)| n.as_str()).collect();
                log::warn!(
                    "Scalar field '{}' written by {} nodes in one pulse {:?}; last in declared order wins",
                    key,
                    writes.len(),
                    writers
                );
            }
            self.apply(&key, writes.into_iter().map(|(_, v)| v).collect());
        }
    }

    fn apply(&mut self, key: &str, values: Vec<Value>) {
        let reducer = self.schema.reducer_for(key);
        if let Some(merged) = reducer.reduce(self.fields.get(key), values) {
            self.fields.insert(key.to_string(), merged);
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a field deserialized into `T`; missing or mismatched fields yield `None`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a field as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Get a nested field value using dot notation (e.g., "classification.source")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::state::schema::FieldType;
    use serde_json::json;

    fn results_schema() -> Arc<StateSchema> {
        Arc::new(
            StateSchema::new()
                .field("query", FieldType::String, ReducerType::Overwrite)
                .field_with_default("results", FieldType::Array, ReducerType::Append, json!([])),
        )
    }

    fn update(pairs: &[(&str, Value)]) -> StateUpdate {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_state() {
        let state = WorkflowState::empty();
        assert!(state.get("anything").is_none());
    }

    #[test]
    fn test_state_with_defaults() {
        let state = WorkflowState::new(results_schema());
        assert_eq!(state.get("results"), Some(&json!([])));
        assert!(state.get("query").is_none());
    }

    #[test]
    fn test_seed_bypasses_reducers() {
        let mut state = WorkflowState::new(results_schema());
        state.seed(update(&[("results", json!(["seeded"]))]));
        assert_eq!(state.get("results"), Some(&json!(["seeded"])));
    }

    #[test]
    fn test_overwrite_reducer() {
        let mut state = WorkflowState::new(results_schema());

        state.update("query", json!("first"));
        state.update("query", json!("second"));
        assert_eq!(state.get_str("query"), Some("second"));
    }

    #[test]
    fn test_append_reducer() {
        let mut state = WorkflowState::new(results_schema());

        state.update("results", json!("item1"));
        state.update("results", json!(["item2", "item3"]));
        assert_eq!(
            state.get("results"),
            Some(&json!(["item1", "item2", "item3"]))
        );
    }

    #[test]
    fn test_merge_pulse_appends_in_given_order() {
        let mut state = WorkflowState::new(results_schema());

        state.merge_pulse(vec![
            ("a".to_string(), update(&[("results", json!([{"source": "a"}]))])),
            ("b".to_string(), update(&[("results", json!([{"source": "b"}]))])),
        ]);

        assert_eq!(
            state.get("results"),
            Some(&json!([{"source": "a"}, {"source": "b"}]))
        );
    }

    #[test]
    fn test_merge_pulse_scalar_tie_break() {
        let mut state = WorkflowState::new(results_schema());

        state.merge_pulse(vec![
            ("a".to_string(), update(&[("query", json!("from a"))])),
            ("b".to_string(), update(&[("query", json!("from b"))])),
        ]);

        assert_eq!(state.get_str("query"), Some("from b"));
    }

    #[test]
    fn test_repeated_appends_never_overwrite() {
        let mut state = WorkflowState::new(results_schema());
        let entry = json!([{"source": "blog", "result": "same"}]);

        state.merge_pulse(vec![("blog".to_string(), update(&[("results", entry.clone())]))]);
        state.merge_pulse(vec![("blog".to_string(), update(&[("results", entry)]))]);

        assert_eq!(state.get("results").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_get_path() {
        let mut state = WorkflowState::empty();
        state.update("classification", json!({"source": "blog", "query": "ai"}));

        assert_eq!(state.get_path("classification.source"), Some(&json!("blog")));
        assert_eq!(state.get_path("classification.missing"), None);
    }

    #[test]
    fn test_get_as() {
        let mut state = WorkflowState::empty();
        state.update("count", json!(3));

        assert_eq!(state.get_as::<u32>("count"), Some(3));
        assert_eq!(state.get_as::<String>("count"), None);
    }

    #[test]
    fn test_to_json() {
        let mut state = WorkflowState::empty();
        state.update("a", json!(1));
        state.update("b", json!("hello"));

        let json = state.to_json();
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"], "hello");
    }
}
