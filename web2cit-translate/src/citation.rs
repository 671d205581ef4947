//! Embeddable citation metadata.
//!
//! Citations come out of the engine in MediaWiki (Citoid) format. Each one is
//! classified into [`CitationField`]s once, and the `<meta>` triples of the
//! results page are derived from that classification.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::output::Citation;

/// Fields that never become metadata.
const SKIPPED_FIELDS: [&str; 2] = ["key", "version"];

const PLAIN_PREFIX: &str = "z";
const CREATOR_PREFIX: &str = "so";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationField {
    Plain { name: String, values: Vec<String> },
    Tags(Vec<String>),
    /// Person lists such as `author` or `editor`. Each person is kept as its
    /// name parts in citation order, e.g. `["Jane", "Doe"]`.
    Creators { name: String, people: Vec<Vec<String>> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationData {
    pub prefix: String,
    pub field: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationResult {
    pub url: String,
    pub data: Vec<CitationData>,
}

/// Classify the fields of a citation, in citation order. Identifier and
/// version fields are dropped, and so is every field without a value.
pub fn map_fields(citation: &Citation) -> Vec<CitationField> {
    citation
        .iter()
        .filter(|(name, _)| !SKIPPED_FIELDS.contains(&name.as_str()))
        .filter_map(|(name, value)| classify(name, value))
        .collect()
}

fn classify(name: &str, value: &Value) -> Option<CitationField> {
    if name == "tags" {
        let tags: Vec<String> = match value {
            Value::Array(items) => items.iter().filter_map(tag_name).collect(),
            other => tag_name(other).into_iter().collect(),
        };
        return (!tags.is_empty()).then_some(CitationField::Tags(tags));
    }

    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            let people = items
                .iter()
                .filter_map(Value::as_array)
                .map(|parts| parts.iter().filter_map(scalar).collect())
                .collect();
            Some(CitationField::Creators {
                name: name.to_string(),
                people,
            })
        }
        Value::Array(items) => {
            let values: Vec<String> = items.iter().filter_map(scalar).collect();
            (!values.is_empty()).then(|| CitationField::Plain {
                name: name.to_string(),
                values,
            })
        }
        other => scalar(other).map(|value| CitationField::Plain {
            name: name.to_string(),
            values: vec![value],
        }),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Zotero stores tags as {"tag": ..., "type": ...}; Citoid may flatten them
fn tag_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("tag").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// `["Jane", "Doe"]` → `Doe, Jane`.
fn reversed_name(parts: &[String]) -> String {
    parts
        .iter()
        .rev()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CitationField {
    pub fn triples(&self) -> Vec<CitationData> {
        let triple = |prefix: &str, field: &str, content: String| CitationData {
            prefix: prefix.to_string(),
            field: field.to_string(),
            content,
        };
        match self {
            CitationField::Plain { name, values } => values
                .iter()
                .map(|v| triple(PLAIN_PREFIX, name, v.clone()))
                .collect(),
            CitationField::Tags(tags) => tags
                .iter()
                .map(|tag| triple(PLAIN_PREFIX, "tags", tag.clone()))
                .collect(),
            CitationField::Creators { name, people } => people
                .iter()
                .map(|person| reversed_name(person))
                .filter(|content| !content.is_empty())
                .map(|content| triple(CREATOR_PREFIX, name, content))
                .collect(),
        }
    }
}

pub fn citation_data(citation: &Citation) -> Vec<CitationData> {
    map_fields(citation)
        .iter()
        .flat_map(CitationField::triples)
        .collect()
}

/// Metadata for one citation. The canonical URL is the citation's own `url`
/// field when present, `fallback_url` otherwise.
pub fn citation_result(citation: &Citation, fallback_url: &str) -> CitationResult {
    let url = citation
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or(fallback_url)
        .to_string();
    CitationResult {
        url,
        data: citation_data(citation),
    }
}
