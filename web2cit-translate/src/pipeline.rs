//! The request pipeline: validated query in, shaped results out.
//!
//! 1. reject option combinations the output format cannot express,
//! 2. resolve the target and open a domain session,
//! 3. load configuration (eagerly when enumerating paths, otherwise only
//!    once a requested path is valid),
//! 4. translate the valid paths in one batch,
//! 5. shape every target, valid or not, in request order.
use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::{debug, info, warn};
use web2cit_i18n::Translator;

use crate::citation::{CitationResult, citation_result};
use crate::config::{LoadedConfig, known_paths, load_configs};
use crate::debug::make_debug_json;
use crate::engine::{DomainSession, DomainSpec, Engine, TranslateOptions};
use crate::error::{EngineError, TargetError, TranslateError};
use crate::output::{Citation, TargetOutput};
use crate::query::{Format, QueryOptions, ReqQuery, Target};
use crate::results::{
    API_VERSION, ApiInfo, JsonData, JsonEnvelope, PatternResult, TargetResult, TranslationResult,
    group_by_pattern, mean,
};
use crate::session::{SessionSettings, open_session};
use crate::target::{resolve_path, resolve_url};

/// How a translated request should be answered, short of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// None of the requested or known paths is a valid webpage.
    NoValidPaths,
    /// Translation ran but produced no citation.
    NoTranslation,
    /// The only target failed fetching an upstream resource.
    Upstream { status: u16 },
}

impl Outcome {
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Ok => 200,
            Outcome::NoValidPaths | Outcome::NoTranslation => 404,
            Outcome::Upstream { status } => *status,
        }
    }
}

/// One target as planned before translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    /// Path as requested or as found in the configuration.
    pub path: String,
    /// Normalized path and href, `None` for invalid paths.
    pub resolved: Option<(String, String)>,
}

impl TargetPlan {
    fn for_path(domain: &str, path: &str) -> Self {
        TargetPlan {
            path: path.to_string(),
            resolved: resolve_path(domain, path).map(|t| (t.path, t.href)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.resolved.is_some()
    }

    /// Path used for lookups and echoed back; the normalized one when valid.
    pub fn effective_path(&self) -> &str {
        self.resolved
            .as_ref()
            .map(|(path, _)| path.as_str())
            .unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct TranslationSummary {
    pub domain: String,
    pub spec: DomainSpec,
    pub options: QueryOptions,
    pub config: LoadedConfig,
    pub targets: Vec<TargetResult>,
    pub citations: Vec<CitationResult>,
    /// Raw citations for the MediaWiki format, one per translated target.
    pub mediawiki: Vec<Citation>,
    /// Mean target score, tests mode only.
    pub score: Option<f64>,
    pub outcome: Outcome,
}

impl TranslationSummary {
    pub fn patterns(&self) -> Vec<PatternResult> {
        group_by_pattern(&self.targets)
    }

    pub fn to_json(&self) -> JsonEnvelope {
        let files = self.config.files();
        JsonEnvelope {
            info: ApiInfo {
                api_version: API_VERSION.to_string(),
                config: (!files.is_empty()).then_some(files),
            },
            data: Some(JsonData {
                targets: self.targets.clone(),
                score: self.score,
            }),
            error: None,
        }
    }

    pub fn to_mediawiki(&self) -> Value {
        Value::Array(
            self.mediawiki
                .iter()
                .cloned()
                .map(Value::Object)
                .collect(),
        )
    }
}

pub async fn translate_request(
    engine: &dyn Engine,
    query: &ReqQuery,
    settings: &SessionSettings,
    t: &Translator,
) -> Result<TranslationSummary, TranslateError> {
    let options = &query.options;
    if options.format == Format::Mediawiki && (options.debug || options.tests) {
        return Err(TranslateError::IncompatibleOptions);
    }

    let (domain, requested) = match &query.target {
        Target::Url(url) => {
            let target = resolve_url(url)?;
            let plan = TargetPlan {
                path: target.path.clone(),
                resolved: Some((target.path, target.href)),
            };
            (target.domain, Some(plan))
        }
        Target::Domain { domain, path } => {
            let domain = domain.to_lowercase();
            let plan = path.as_deref().map(|p| TargetPlan::for_path(&domain, p));
            (domain, plan)
        }
    };

    let mut session = open_session(engine, &domain, options, settings)?;

    let (plans, config) = match requested {
        Some(plan) => {
            let config = if plan.is_valid() {
                load_configs(session.as_mut(), options.tests).await?
            } else {
                LoadedConfig::default()
            };
            (vec![plan], config)
        }
        None => {
            let config = load_configs(session.as_mut(), options.tests).await?;
            let plans: Vec<TargetPlan> = known_paths(session.as_ref())
                .iter()
                .map(|p| TargetPlan::for_path(&domain, p))
                .collect();
            (plans, config)
        }
    };

    let valid: BTreeSet<String> = plans
        .iter()
        .filter(|plan| plan.is_valid())
        .map(|plan| plan.effective_path().to_string())
        .collect();
    info!(
        "Translating {} of {} target(s) for {}",
        valid.len(),
        plans.len(),
        domain
    );

    let outputs = translate_valid(session.as_ref(), &plans, &valid, options).await;

    let mut targets = Vec::with_capacity(plans.len());
    let mut citations = Vec::new();
    let mut mediawiki = Vec::new();
    for plan in &plans {
        let path = plan.effective_path();
        if !valid.contains(path) {
            let error = TargetError::InvalidPath {
                path: plan.path.clone(),
                domain: domain.clone(),
            };
            targets.push(TargetResult::new(&plan.path).with_error(error.body(t)));
            continue;
        }
        let result = match outputs.get(path) {
            Some(Ok(output)) => {
                if let Some(citation) = first_citation(output) {
                    citations.push(citation_result(citation, &output.href));
                    mediawiki.push(citation.clone());
                }
                shape_target(output, &config, options, t)
            }
            Some(Err(e)) => {
                warn!("Translation of {}{} failed: {}", domain, path, e);
                let mut result = TargetResult::new(path);
                result.href = plan.resolved.as_ref().map(|(_, href)| href.clone());
                result.with_error(TargetError::from(e.clone()).body(t))
            }
            None => {
                let error = TargetError::Engine(format!("no translation returned for {}", path));
                TargetResult::new(path).with_error(error.body(t))
            }
        };
        targets.push(result);
    }

    let score = if options.tests {
        mean(targets.iter().filter_map(|target| target.score))
    } else {
        None
    };

    let outcome = if valid.is_empty() {
        Outcome::NoValidPaths
    } else if let [only] = plans.as_slice() {
        match outputs.get(only.effective_path()) {
            Some(Err(EngineError::HttpResponse { status, .. })) => Outcome::Upstream { status: *status },
            _ if citations.is_empty() => Outcome::NoTranslation,
            _ => Outcome::Ok,
        }
    } else if citations.is_empty() {
        Outcome::NoTranslation
    } else {
        Outcome::Ok
    };
    debug!("Request for {} finished with {:?}", domain, outcome);

    Ok(TranslationSummary {
        domain,
        spec: session.spec().clone(),
        options: options.clone(),
        config,
        targets,
        citations,
        mediawiki,
        score,
        outcome,
    })
}

async fn translate_valid(
    session: &dyn DomainSession,
    plans: &[TargetPlan],
    valid: &BTreeSet<String>,
    options: &QueryOptions,
) -> HashMap<String, Result<TargetOutput, EngineError>> {
    // request order, each path once
    let mut batch: Vec<String> = Vec::new();
    for plan in plans {
        let path = plan.effective_path();
        if valid.contains(path) && !batch.iter().any(|p| p == path) {
            batch.push(path.to_string());
        }
    }
    if batch.is_empty() {
        return HashMap::new();
    }

    let translate_options = TranslateOptions {
        only_applicable: !options.debug,
        template_field_info: options.debug,
    };
    let outcomes = session.translate(&batch, translate_options).await;
    batch.into_iter().zip(outcomes).collect()
}

fn first_citation(output: &TargetOutput) -> Option<&Citation> {
    output
        .translation
        .outputs
        .iter()
        .find(|o| o.is_applicable())
        .and_then(|o| o.citation.as_ref())
}

fn shape_target(
    output: &TargetOutput,
    config: &LoadedConfig,
    options: &QueryOptions,
    t: &Translator,
) -> TargetResult {
    let mut result = TargetResult::new(&output.path);
    result.href = Some(output.href.clone());
    result.pattern = output.translation.pattern.clone();
    result.pattern_label = output.translation.pattern_label.clone();
    result.results = output
        .translation
        .outputs
        .iter()
        .filter(|o| o.is_applicable())
        .map(TranslationResult::from_output)
        .collect();
    if options.tests {
        result.score = result.mean_score();
    }
    if options.debug {
        result.debug = Some(make_debug_json(output, config));
    }
    if result.results.is_empty() {
        let error = TargetError::NoApplicableTemplate {
            path: output.path.clone(),
        };
        result.error = Some(error.body(t));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConfigKind, StorageRoots};
    use crate::error::INVALID_PATH_ERROR_NAME;
    use crate::static_engine::{Fixtures, StaticEngine};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use web2cit_i18n::I18n;

    fn fixtures() -> Fixtures {
        serde_json::from_value(json!({
            "revisions": {
                "Web2Cit/data/com/example/templates.json": {"revid": 5},
                "Web2Cit/data/com/example/patterns.json": {"revid": 6},
                "Web2Cit/data/com/example/tests.json": {"revid": 7}
            },
            "domains": {
                "example.com": {
                    "templatePaths": ["/article", "article"],
                    "targets": {
                        "/article": {"output": {
                            "pattern": "/**",
                            "outputs": [{
                                "template": {"path": "/article", "applicable": true, "fields": [
                                    {"name": "itemType", "applicable": true, "valid": true, "output": ["webpage"]},
                                    {"name": "title", "applicable": true, "valid": true, "output": ["Example"]}
                                ]},
                                "citation": {"itemType": "webpage", "title": "Example", "url": "https://example.com/article"},
                                "scores": {"fields": [
                                    {"field": "itemType", "expected": ["webpage"], "score": 1},
                                    {"field": "title", "expected": ["Other"], "score": 0}
                                ]}
                            }]
                        }},
                        "/empty": {"output": {"outputs": [
                            {"template": {"path": "/article", "applicable": false, "fields": []}}
                        ]}},
                        "/down": {"httpFailure": {"url": "https://example.com/down", "status": 503, "statusText": "Service Unavailable"}}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn translator() -> Translator {
        Translator::new(Arc::new(I18n::new()), "en")
    }

    async fn run(engine: &StaticEngine, query: ReqQuery) -> Result<TranslationSummary, TranslateError> {
        translate_request(engine, &query, &SessionSettings::default(), &translator()).await
    }

    #[tokio::test]
    async fn mediawiki_rejects_debug_and_tests_before_translating() {
        let engine = StaticEngine::new(fixtures());
        for (debug, tests) in [(true, false), (false, true)] {
            let query = ReqQuery::url("https://example.com/article").with_options(QueryOptions {
                format: Format::Mediawiki,
                debug,
                tests,
                ..Default::default()
            });
            assert_eq!(
                run(&engine, query).await.unwrap_err(),
                TranslateError::IncompatibleOptions
            );
        }
        assert_eq!(engine.translate_calls(), 0);
        assert!(engine.opened_specs().is_empty());
    }

    #[tokio::test]
    async fn translates_url_target() {
        let engine = StaticEngine::new(fixtures());
        let summary = run(&engine, ReqQuery::url("https://example.com/article#top"))
            .await
            .unwrap();
        assert_eq!(summary.outcome, Outcome::Ok);
        assert_eq!(summary.targets.len(), 1);
        let target = &summary.targets[0];
        assert_eq!(target.pattern.as_deref(), Some("/**"));
        assert_eq!(target.results[0].fields.len(), 2);
        assert_eq!(target.score, None);
        assert_eq!(summary.citations[0].url, "https://example.com/article");
        assert_eq!(summary.config.revid(ConfigKind::Patterns), Some(6));
        assert!(!summary.config.was_requested(ConfigKind::Tests));
    }

    #[tokio::test]
    async fn invalid_sibling_paths_keep_valid_results() {
        let engine = StaticEngine::new(fixtures());
        let summary = run(&engine, ReqQuery::domain("example.com", None))
            .await
            .unwrap();
        let paths: Vec<&str> = summary.targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/article", "article"]);
        assert_eq!(summary.targets[0].error, None);
        assert!(!summary.targets[0].results.is_empty());
        let error = summary.targets[1].error.as_ref().unwrap();
        assert_eq!(error.name, INVALID_PATH_ERROR_NAME);
        assert_eq!(engine.translate_calls(), 1);
    }

    #[tokio::test]
    async fn path_validity_is_by_value() {
        // "0" would be an index of the valid paths, never a member
        let engine = StaticEngine::new(fixtures());
        let summary = run(&engine, ReqQuery::domain("example.com", Some("0")))
            .await
            .unwrap();
        assert_eq!(summary.outcome, Outcome::NoValidPaths);
        assert_eq!(
            summary.targets[0].error.as_ref().unwrap().name,
            INVALID_PATH_ERROR_NAME
        );
        // configuration is never fetched for a guaranteed-invalid path
        assert!(summary.config.entries.is_empty());
        assert_eq!(engine.translate_calls(), 0);
    }

    #[tokio::test]
    async fn no_applicable_template_is_not_found() {
        let engine = StaticEngine::new(fixtures());
        let summary = run(&engine, ReqQuery::domain("example.com", Some("/empty")))
            .await
            .unwrap();
        assert_eq!(summary.outcome, Outcome::NoTranslation);
        assert_eq!(
            summary.targets[0].error.as_ref().unwrap().name,
            "NoApplicableTemplateError"
        );
    }

    #[tokio::test]
    async fn single_upstream_failure_reemits_status() {
        let engine = StaticEngine::new(fixtures());
        let summary = run(&engine, ReqQuery::url("https://example.com/down"))
            .await
            .unwrap();
        assert_eq!(summary.outcome, Outcome::Upstream { status: 503 });
        assert_eq!(summary.outcome.status(), 503);
        assert_eq!(
            summary.targets[0].error.as_ref().unwrap().name,
            "HTTPResponseError"
        );
    }

    #[tokio::test]
    async fn tests_mode_scores() {
        let engine = StaticEngine::new(fixtures());
        let query = ReqQuery::url("https://example.com/article").with_options(QueryOptions {
            tests: true,
            format: Format::Json,
            ..Default::default()
        });
        let summary = run(&engine, query).await.unwrap();
        assert_eq!(summary.targets[0].score, Some(0.5));
        assert_eq!(summary.score, Some(0.5));
        let field = &summary.targets[0].results[0].fields[1];
        assert_eq!(field.test, Some(vec!["Other".to_string()]));
        let json = summary.to_json();
        assert_eq!(json.info.config.map(|c| c.len()), Some(3));
    }

    #[tokio::test]
    async fn debug_mode_attaches_trace() {
        let engine = StaticEngine::new(fixtures());
        let query = ReqQuery::url("https://example.com/article").with_options(QueryOptions {
            debug: true,
            ..Default::default()
        });
        let summary = run(&engine, query).await.unwrap();
        let debug = summary.targets[0].debug.as_ref().unwrap();
        assert_eq!(debug.config.templates, "revid 5");
        assert_eq!(debug.pattern, "/**");
    }

    #[tokio::test]
    async fn fatal_errors() {
        let engine = StaticEngine::new(fixtures());
        assert!(matches!(
            run(&engine, ReqQuery::url("not a url")).await,
            Err(TranslateError::InvalidTarget { .. })
        ));
        assert!(matches!(
            run(&engine, ReqQuery::domain("bad_domain", None)).await,
            Err(TranslateError::InvalidDomain { .. })
        ));
    }

    #[tokio::test]
    async fn sandbox_reads_user_storage() {
        let engine = StaticEngine::new(fixtures());
        let query = ReqQuery::url("https://example.com/article").with_options(QueryOptions {
            sandbox: Some("Alice".into()),
            ..Default::default()
        });
        let summary = run(&engine, query).await.unwrap();
        assert_eq!(
            summary.spec.storage,
            StorageRoots::default().sandboxed("Alice")
        );
        // no sandbox revisions: only the fallback template is available
        assert_eq!(summary.config.files(), vec![]);
        assert_eq!(summary.outcome, Outcome::NoTranslation);
    }

    #[tokio::test]
    async fn mediawiki_output_lists_citations() {
        let engine = StaticEngine::new(fixtures());
        let query = ReqQuery::url("https://example.com/article").with_options(QueryOptions {
            format: Format::Mediawiki,
            ..Default::default()
        });
        let summary = run(&engine, query).await.unwrap();
        assert_eq!(
            summary.to_mediawiki(),
            json!([{"itemType": "webpage", "title": "Example", "url": "https://example.com/article"}])
        );
    }
}
