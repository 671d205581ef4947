//! Translation output as produced by the web2cit engine.
//!
//! These types mirror the library's `TargetOutput` tree. They are read-only
//! input to the result shaper, the citation mapper and the debug serializer.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A citation in MediaWiki (Citoid) format, keys in engine order.
pub type Citation = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutput {
    pub path: String,
    pub href: String,
    pub translation: TranslationOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutput {
    /// Matched URL pattern; absent when no pattern matched or patterns were
    /// not loaded.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub pattern_label: Option<String>,
    #[serde(default)]
    pub outputs: Vec<TemplateOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOutput {
    pub template: TemplateInfo,
    #[serde(default)]
    pub citation: Option<Citation>,
    #[serde(default)]
    pub scores: Option<TemplateScores>,
}

impl TemplateOutput {
    pub fn is_applicable(&self) -> bool {
        self.template.applicable == Some(true)
    }

    pub fn is_fallback(&self) -> bool {
        self.template.path.is_none()
    }

    pub fn score_for(&self, field: &str) -> Option<&FieldScore> {
        self.scores
            .as_ref()
            .and_then(|s| s.fields.iter().find(|f| f.field == field))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Template path; the fallback template has none.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// `None` when applicability was never evaluated.
    #[serde(default)]
    pub applicable: Option<bool>,
    #[serde(default)]
    pub fields: Vec<FieldOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOutput {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub applicable: bool,
    #[serde(default)]
    pub output: Vec<String>,
    /// Only filled in when per-field info was requested.
    #[serde(default)]
    pub procedures: Vec<ProcedureOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureOutput {
    #[serde(default)]
    pub selections: Vec<SelectionOutput>,
    #[serde(default)]
    pub transformations: Vec<TransformationOutput>,
    #[serde(default)]
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub itemwise: bool,
    #[serde(default)]
    pub output: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateScores {
    #[serde(default)]
    pub fields: Vec<FieldScore>,
}

/// Score of one field against its test fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field: String,
    #[serde(default)]
    pub expected: Vec<String>,
    pub score: f64,
}
