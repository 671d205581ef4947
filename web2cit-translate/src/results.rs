//! Public response shapes.
//!
//! [`TargetResult`] is shared by the HTML view model and the JSON payload;
//! [`PatternResult`] groups targets for the results page; [`JsonEnvelope`]
//! and [`MediawikiError`] are the JSON bodies.
use serde::{Deserialize, Serialize};

use crate::config::ConfigFile;
use crate::debug::DebugJson;
use crate::error::ErrorBody;
use crate::output::{FieldOutput, TemplateOutput};

pub const API_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResult {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip)]
    pub pattern_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub results: Vec<TranslationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugJson>,
}

impl TargetResult {
    pub fn new(path: &str) -> Self {
        TargetResult {
            path: path.to_string(),
            href: None,
            pattern: None,
            pattern_label: None,
            score: None,
            results: Vec::new(),
            error: None,
            debug: None,
        }
    }

    pub fn with_error(mut self, error: ErrorBody) -> Self {
        self.error = Some(error);
        self
    }

    /// Mean of the field scores of every result, `None` without scores.
    pub fn mean_score(&self) -> Option<f64> {
        mean(
            self.results
                .iter()
                .flat_map(|r| r.fields.iter())
                .filter_map(|f| f.score),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub template: TemplateRef,
    pub fields: Vec<TranslationField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationField {
    pub name: String,
    /// Absent when the field is not applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl TranslationResult {
    pub fn from_output(output: &TemplateOutput) -> Self {
        let field = |f: &FieldOutput| {
            let score = output.score_for(&f.name);
            TranslationField {
                name: f.name.clone(),
                output: f.applicable.then(|| f.output.clone()),
                test: score.map(|s| s.expected.clone()),
                score: score.map(|s| s.score),
            }
        };
        TranslationResult {
            template: TemplateRef {
                path: output.template.path.clone(),
                label: output.template.label.clone(),
            },
            fields: output.template.fields.iter().map(field).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternResult {
    pub pattern: Option<String>,
    pub label: Option<String>,
    pub targets: Vec<TargetResult>,
}

/// Group targets by matched pattern, in order of first appearance. Targets
/// without a pattern share one bucket.
pub fn group_by_pattern(targets: &[TargetResult]) -> Vec<PatternResult> {
    let mut groups: Vec<PatternResult> = Vec::new();
    for target in targets {
        match groups.iter_mut().find(|g| g.pattern == target.pattern) {
            Some(group) => group.targets.push(target.clone()),
            None => groups.push(PatternResult {
                pattern: target.pattern.clone(),
                label: target.pattern_label.clone(),
                targets: vec![target.clone()],
            }),
        }
    }
    groups
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Vec<ConfigFile>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonData {
    pub targets: Vec<TargetResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub info: ApiInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl JsonEnvelope {
    pub fn error(error: ErrorBody) -> Self {
        JsonEnvelope {
            info: ApiInfo {
                api_version: API_VERSION.to_string(),
                config: None,
            },
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediawikiError {
    pub error: ErrorBody,
}
