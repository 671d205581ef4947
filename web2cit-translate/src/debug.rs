//! Debug trace of a translation, flattened for display.
//!
//! The trace is a snapshot for troubleshooting. Nothing reads it back.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LoadedConfig;
use crate::engine::ConfigKind;
use crate::output::TargetOutput;

const MISSING_CONFIG: &str = "not found or corrupt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugJson {
    pub config: DebugConfig,
    pub pattern: String,
    pub templates: Vec<DebugTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    pub patterns: String,
    pub templates: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTemplate {
    pub path: String,
    /// `true`/`false`, or `"undefined"` when never evaluated.
    pub applicable: Value,
    pub fields: Vec<DebugField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugField {
    pub name: String,
    pub required: bool,
    pub valid: bool,
    pub applicable: bool,
    pub output: Vec<String>,
    pub procedures: Vec<DebugProcedure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugProcedure {
    pub selection: DebugStage<SelectionStep>,
    pub transformation: DebugStage<TransformationStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugStage<S> {
    pub steps: Vec<S>,
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: String,
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: String,
    pub itemwise: bool,
    pub output: Vec<String>,
}

fn revision_label(config: &LoadedConfig, kind: ConfigKind) -> String {
    match config.revid(kind) {
        Some(revid) => format!("revid {}", revid),
        None => MISSING_CONFIG.to_string(),
    }
}

/// A field is valid when it produced at least one value and none is empty.
fn is_valid_output(output: &[String]) -> bool {
    !output.is_empty() && output.iter().all(|value| !value.is_empty())
}

pub fn make_debug_json(output: &TargetOutput, config: &LoadedConfig) -> DebugJson {
    let tests = config
        .was_requested(ConfigKind::Tests)
        .then(|| revision_label(config, ConfigKind::Tests));

    let templates = output
        .translation
        .outputs
        .iter()
        .map(|template_output| {
            let template = &template_output.template;
            DebugTemplate {
                path: template
                    .path
                    .clone()
                    .unwrap_or_else(|| "fallback".to_string()),
                applicable: template
                    .applicable
                    .map(Value::Bool)
                    .unwrap_or_else(|| Value::String("undefined".to_string())),
                fields: template
                    .fields
                    .iter()
                    .map(|field| DebugField {
                        name: field.name.clone(),
                        required: field.required,
                        valid: is_valid_output(&field.output),
                        applicable: field.applicable,
                        output: field.output.clone(),
                        procedures: field
                            .procedures
                            .iter()
                            .map(|procedure| DebugProcedure {
                                selection: DebugStage {
                                    steps: procedure
                                        .selections
                                        .iter()
                                        .map(|s| SelectionStep {
                                            kind: s.kind.clone(),
                                            config: s.config.clone(),
                                            output: s.output.clone(),
                                        })
                                        .collect(),
                                    output: procedure
                                        .selections
                                        .iter()
                                        .flat_map(|s| s.output.iter().cloned())
                                        .collect(),
                                },
                                transformation: DebugStage {
                                    steps: procedure
                                        .transformations
                                        .iter()
                                        .map(|t| TransformationStep {
                                            kind: t.kind.clone(),
                                            config: t.config.clone(),
                                            itemwise: t.itemwise,
                                            output: t.output.clone(),
                                        })
                                        .collect(),
                                    output: procedure.output.clone(),
                                },
                            })
                            .collect(),
                    })
                    .collect(),
            }
        })
        .collect();

    DebugJson {
        config: DebugConfig {
            patterns: revision_label(config, ConfigKind::Patterns),
            templates: revision_label(config, ConfigKind::Templates),
            tests,
        },
        pattern: output.translation.pattern.clone().unwrap_or_default(),
        templates,
    }
}
