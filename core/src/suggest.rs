//! Parsing species suggestions out of generated text.
//!
//! Models rarely return bare JSON. We look for the first array or object
//! in the text that holds suggestions and otherwise hand the text back
//! unparsed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Measure;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesSuggestion {
    #[serde(alias = "name", alias = "common_name", alias = "species")]
    pub species_name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default, alias = "co2_absorption")]
    pub avg_co2_absorption: Option<Measure>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Suggestions {
    Parsed(Vec<SpeciesSuggestion>),
    Raw(String),
    Unavailable,
}

pub fn parse_suggestions(text: &str) -> Suggestions {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Suggestions::Unavailable;
    }

    // Each bracket is a candidate start; the deserializer stops at the end
    // of the first complete value, so trailing prose is ignored.
    for (start, c) in trimmed.char_indices() {
        if c != '[' && c != '{' {
            continue;
        }
        let mut values = serde_json::Deserializer::from_str(&trimmed[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            if let Some(found) = from_value(value) {
                return Suggestions::Parsed(found);
            }
        }
    }

    Suggestions::Raw(trimmed.to_string())
}

/// Accepts an array of suggestions, an object wrapping one, or a single object.
fn from_value(value: Value) -> Option<Vec<SpeciesSuggestion>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.values().find(|v| v.is_array()).cloned() {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        _ => return None,
    };

    let parsed: Vec<SpeciesSuggestion> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    (!parsed.is_empty()).then_some(parsed)
}
