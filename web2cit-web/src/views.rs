//! Server-side rendered pages.
//!
//! Templates are embedded at compile time and auto-escaped. Every page gets
//! a `t(key, ...args)` function bound to the request's [`Translator`]; the
//! results page also gets a view model prepared here, so templates never
//! look at engine output directly.
use minijinja::value::{Rest, Value};
use minijinja::{Environment, HtmlEscape, context};
use serde::Serialize;
use serde_json::Value as Json;
use web2cit_i18n::Translator;
use web2cit_translate::{
    CitationResult, ConfigKind, PatternResult, TargetResult, TranslationResult, TranslationSummary,
};

use crate::config::WikiSettings;

pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("home.html", include_str!("../templates/home.html"))?;
    env.add_template("results.html", include_str!("../templates/results.html"))?;
    Ok(env)
}

fn translate_fn(t: &Translator) -> Value {
    let t = t.clone();
    Value::from_function(move |key: String, args: Rest<String>| t.t_with(&key, &args))
}

pub fn render_home(env: &Environment<'static>, t: &Translator) -> Result<String, minijinja::Error> {
    env.get_template("home.html")?.render(context! {
        locale => t.locale(),
        t => translate_fn(t),
    })
}

#[derive(Debug, Serialize)]
struct ResultsView {
    domain: String,
    debug: bool,
    tests: bool,
    sandbox: Option<String>,
    /// Target URL of the page, for switching configuration.
    target_url: Option<String>,
    storage_url: String,
    storage_label: String,
    /// Editors linked from the output and expected-value column headers.
    templates_edit_url: String,
    tests_edit_url: String,
    metadata: Option<CitationResult>,
    patterns: Vec<PatternView>,
    score: Option<String>,
    translated: usize,
    no_translation: bool,
}

#[derive(Debug, Serialize)]
struct PatternView {
    heading: String,
    edit_url: Option<String>,
    targets: Vec<TargetView>,
}

#[derive(Debug, Serialize)]
struct TargetView {
    path: String,
    href: Option<String>,
    error: Option<String>,
    score: Option<String>,
    results: Vec<ResultView>,
    debug_html: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResultView {
    heading: String,
    path: Option<String>,
    fields: Vec<FieldView>,
}

#[derive(Debug, Serialize)]
struct FieldView {
    label: String,
    name: String,
    output: Option<Vec<String>>,
    test: Option<Vec<String>>,
    score: Option<String>,
}

pub fn render_results(
    env: &Environment<'static>,
    t: &Translator,
    summary: &TranslationSummary,
    wiki: &WikiSettings,
) -> Result<String, minijinja::Error> {
    let spec = &summary.spec;
    let view = ResultsView {
        domain: summary.domain.clone(),
        debug: summary.options.debug,
        tests: summary.options.tests,
        sandbox: summary.options.sandbox.clone(),
        target_url: match summary.targets.as_slice() {
            [only] => only.href.clone(),
            _ => None,
        },
        storage_url: wiki.prefix_index_url(spec),
        storage_label: wiki.storage_label(spec),
        templates_edit_url: wiki.edit_url(spec, ConfigKind::Templates),
        tests_edit_url: wiki.edit_url(spec, ConfigKind::Tests),
        metadata: summary.citations.first().cloned(),
        patterns: summary
            .patterns()
            .iter()
            .map(|pattern| pattern_view(pattern, t, summary, wiki))
            .collect(),
        score: summary.score.map(format_score),
        translated: summary.citations.len(),
        no_translation: summary.citations.is_empty(),
    };
    env.get_template("results.html")?.render(context! {
        locale => t.locale(),
        t => translate_fn(t),
        view => view,
    })
}

fn pattern_view(
    pattern: &PatternResult,
    t: &Translator,
    summary: &TranslationSummary,
    wiki: &WikiSettings,
) -> PatternView {
    let heading = match (&pattern.pattern, &pattern.label) {
        (Some(p), Some(label)) => format!("{} {}", t.t_with("results-pattern-labelled", &[label.clone()]), p),
        (Some(p), None) => format!("{} {}", t.t("results-pattern-unlabelled"), p),
        (None, _) => t.t("results-pattern-undefined"),
    };
    PatternView {
        heading,
        edit_url: pattern
            .pattern
            .as_ref()
            .map(|_| wiki.edit_url(&summary.spec, ConfigKind::Patterns)),
        targets: pattern
            .targets
            .iter()
            .map(|target| target_view(target, t))
            .collect(),
    }
}

fn target_view(target: &TargetResult, t: &Translator) -> TargetView {
    TargetView {
        path: target.path.clone(),
        href: target.href.clone(),
        error: target
            .error
            .as_ref()
            .map(|e| format!("{}: {}", e.name, e.message)),
        score: target.score.map(format_score),
        results: target
            .results
            .iter()
            .enumerate()
            .map(|(index, result)| result_view(index + 1, result, t))
            .collect(),
        debug_html: target
            .debug
            .as_ref()
            .and_then(|debug| serde_json::to_value(debug).ok())
            .map(|value| json_table(&value, &JsonLabels::new(t))),
    }
}

fn result_view(index: usize, result: &TranslationResult, t: &Translator) -> ResultView {
    let index = index.to_string();
    let heading = match (&result.template.path, &result.template.label) {
        (None, _) => t.t_with("results-template-fallback", &[index]),
        (Some(_), Some(label)) => t.t_with("results-template-labelled", &[index, label.clone()]),
        (Some(_), None) => t.t_with("results-template-unlabelled", &[index]),
    };
    ResultView {
        heading,
        path: result.template.path.clone(),
        fields: result
            .fields
            .iter()
            .map(|field| FieldView {
                label: t
                    .try_t(&format!("field-{}", field.name))
                    .unwrap_or_else(|| field.name.clone()),
                name: field.name.clone(),
                output: field.output.clone(),
                test: field.test.clone(),
                score: field.score.map(format_score),
            })
            .collect(),
    }
}

fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

struct JsonLabels {
    yes: String,
    no: String,
    null: String,
    empty_array: String,
    empty_object: String,
}

impl JsonLabels {
    fn new(t: &Translator) -> Self {
        JsonLabels {
            yes: t.t("json-true"),
            no: t.t("json-false"),
            null: t.t("json-null"),
            empty_array: t.t("json-empty-array"),
            empty_object: t.t("json-empty-object"),
        }
    }
}

/// Render a JSON value as nested key/value tables. Scalars at the top level
/// get a one-cell table of their own.
fn json_table(value: &Json, labels: &JsonLabels) -> String {
    match value {
        Json::Array(_) | Json::Object(_) => format_json(value, labels),
        scalar => format!(
            "<table><tbody><tr><td>{}</td></tr></tbody></table>",
            format_json(scalar, labels)
        ),
    }
}

fn format_json(value: &Json, labels: &JsonLabels) -> String {
    match value {
        Json::String(s) => HtmlEscape(s).to_string(),
        Json::Number(n) => n.to_string(),
        Json::Bool(true) => HtmlEscape(&labels.yes).to_string(),
        Json::Bool(false) => HtmlEscape(&labels.no).to_string(),
        Json::Null => HtmlEscape(&labels.null).to_string(),
        Json::Array(items) if items.is_empty() => HtmlEscape(&labels.empty_array).to_string(),
        Json::Object(map) if map.is_empty() => HtmlEscape(&labels.empty_object).to_string(),
        Json::Array(items) => {
            let rows: String = items
                .iter()
                .map(|item| format!("<tr><td>{}</td></tr>", format_json(item, labels)))
                .collect();
            format!("<table class=\"json-table\"><tbody>{}</tbody></table>", rows)
        }
        Json::Object(map) => {
            let rows: String = map
                .iter()
                .map(|(key, item)| {
                    format!(
                        "<tr><th><span>{}</span></th><td>{}</td></tr>",
                        HtmlEscape(key),
                        format_json(item, labels)
                    )
                })
                .collect();
            format!("<table class=\"json\"><tbody>{}</tbody></table>", rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::builtin_catalog;
    use serde_json::json;
    use std::sync::Arc;

    fn translator() -> Translator {
        Translator::new(Arc::new(builtin_catalog().unwrap()), "en")
    }

    #[test]
    fn templates_compile() {
        let env = environment().unwrap();
        let html = render_home(&env, &translator()).unwrap();
        assert!(html.contains("<h1>Web2Cit</h1>"));
        assert!(html.contains("initHome();"));
    }

    #[test]
    fn json_table_escapes_and_labels() {
        let labels = JsonLabels::new(&translator());
        let html = json_table(
            &json!({"config": {"patterns": "<revid 1>"}, "templates": [], "ok": true}),
            &labels,
        );
        assert!(html.contains("&lt;revid 1&gt;"));
        assert!(html.contains("Empty array"));
        assert!(html.contains("<th><span>ok</span></th><td>true</td>"));
        assert_eq!(
            json_table(&json!(3), &labels),
            "<table><tbody><tr><td>3</td></tr></tbody></table>"
        );
    }

    #[test]
    fn field_labels_fall_back_to_names() {
        let result = TranslationResult {
            template: Default::default(),
            fields: vec![
                web2cit_translate::TranslationField {
                    name: "title".into(),
                    output: Some(vec!["Example".into()]),
                    test: None,
                    score: None,
                },
                web2cit_translate::TranslationField {
                    name: "customField".into(),
                    output: None,
                    test: None,
                    score: Some(0.5),
                },
            ],
        };
        let view = result_view(1, &result, &translator());
        assert_eq!(view.heading, "Template #1 (fallback)");
        assert_eq!(view.fields[0].label, "Title");
        assert_eq!(view.fields[1].label, "customField");
        assert_eq!(view.fields[1].score.as_deref(), Some("0.50"));
    }
}
