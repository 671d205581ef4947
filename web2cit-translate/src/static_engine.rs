//! Fixture-backed engine.
//!
//! Replays recorded configuration revisions and per-path translation outputs
//! from a JSON document, without network access. It honours the session
//! options the way the real engine does (storage roots, fallback template,
//! loaded configuration, translate options) but never extracts anything
//! itself.
//!
//! ```json
//! {
//!   "revisions": {"Web2Cit/data/com/example/templates.json": {"revid": 42}},
//!   "domains": {
//!     "example.com": {
//!       "templatePaths": ["/article"],
//!       "targets": {
//!         "/article": {"output": {"pattern": "/**", "outputs": []}},
//!         "/down": {"httpFailure": {"url": "https://example.com/down", "status": 503, "statusText": "Service Unavailable"}}
//!       }
//!     }
//!   }
//! }
//! ```
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{
    ConfigKind, DomainSession, DomainSpec, Engine, FallbackTemplate, Revision, TranslateOptions,
};
use crate::error::EngineError;
use crate::output::{TargetOutput, TranslationOutput};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixtures {
    /// Latest revision per configuration page title.
    #[serde(default)]
    pub revisions: BTreeMap<String, Revision>,
    #[serde(default)]
    pub domains: BTreeMap<String, DomainFixture>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFixture {
    /// Paths declared by the templates configuration.
    #[serde(default)]
    pub template_paths: Vec<String>,
    /// Paths declared by the tests configuration.
    #[serde(default)]
    pub test_paths: Vec<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, PathFixture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathFixture {
    Output(TranslationOutput),
    #[serde(rename_all = "camelCase")]
    HttpFailure {
        url: String,
        status: u16,
        status_text: String,
    },
    Failure(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixtures '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixtures '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Validate a domain name the way the engine does: dot separated LDH labels
/// of at most 63 characters, 253 overall, at least two labels.
pub fn validate_domain_name(name: &str) -> Result<(), String> {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    let label = LABEL.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("label pattern is valid")
    });

    if name.is_empty() {
        return Err("domain name is empty".to_string());
    }
    if name.len() > 253 {
        return Err("domain name is longer than 253 characters".to_string());
    }
    let lower = name.to_lowercase();
    let labels: Vec<&str> = lower.split('.').collect();
    if labels.len() < 2 {
        return Err("domain name must have at least two labels".to_string());
    }
    match labels.iter().find(|l| !label.is_match(l)) {
        Some(bad) => Err(format!("invalid label \"{}\"", bad)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticEngine {
    fixtures: Arc<Fixtures>,
    translate_calls: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<DomainSpec>>>,
    delay_ms: u64,
}

impl StaticEngine {
    pub fn new(fixtures: Fixtures) -> Self {
        StaticEngine {
            fixtures: Arc::new(fixtures),
            ..Default::default()
        }
    }

    /// Simulate upstream latency on every engine call.
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let fixtures = serde_json::from_str(&content).map_err(|source| FixtureError::Json {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(fixtures))
    }

    /// Number of translate calls served across all sessions.
    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    /// Specs of every session opened so far.
    pub fn opened_specs(&self) -> Vec<DomainSpec> {
        self.opened
            .lock()
            .map(|specs| specs.clone())
            .unwrap_or_default()
    }
}

impl Engine for StaticEngine {
    fn open(&self, spec: DomainSpec) -> Result<Box<dyn DomainSession>, EngineError> {
        validate_domain_name(&spec.name).map_err(|reason| EngineError::InvalidDomain {
            domain: spec.name.clone(),
            reason,
        })?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(spec.clone());
        }
        debug!("Opening static session for {}", spec.name);
        Ok(Box::new(StaticSession {
            spec,
            fixtures: Arc::clone(&self.fixtures),
            loaded: BTreeMap::new(),
            translate_calls: Arc::clone(&self.translate_calls),
            delay_ms: self.delay_ms,
        }))
    }

    fn engine_name(&self) -> &str {
        "Static Engine"
    }
}

struct StaticSession {
    spec: DomainSpec,
    fixtures: Arc<Fixtures>,
    loaded: BTreeMap<ConfigKind, Revision>,
    translate_calls: Arc<AtomicUsize>,
    delay_ms: u64,
}

impl StaticSession {
    fn fixture(&self) -> Option<&DomainFixture> {
        self.fixtures.domains.get(&self.spec.name)
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn translate_one(
        &self,
        path: &str,
        options: TranslateOptions,
    ) -> Result<TargetOutput, EngineError> {
        let href = format!("https://{}{}", self.spec.name, path);
        let fixture = self.fixture().and_then(|d| d.targets.get(path));
        let translation = match fixture {
            Some(PathFixture::Output(translation)) => translation,
            Some(PathFixture::HttpFailure {
                url,
                status,
                status_text,
            }) => {
                return Err(EngineError::HttpResponse {
                    url: url.clone(),
                    status: *status,
                    status_text: status_text.clone(),
                });
            }
            Some(PathFixture::Failure(message)) => return Err(EngineError::Other(message.clone())),
            None => {
                return Err(EngineError::HttpResponse {
                    url: href,
                    status: 404,
                    status_text: "Not Found".to_string(),
                });
            }
        };

        let mut translation = translation.clone();
        if !self.loaded.contains_key(&ConfigKind::Patterns) {
            translation.pattern = None;
            translation.pattern_label = None;
        }
        // Without a templates revision only the fallback template exists
        let templates_loaded = self.loaded.contains_key(&ConfigKind::Templates);
        let fallback = self.spec.fallback_template;
        translation.outputs.retain(|output| {
            if output.is_fallback() {
                fallback == FallbackTemplate::Builtin
            } else {
                templates_loaded
            }
        });
        let tests_loaded = self.loaded.contains_key(&ConfigKind::Tests);
        for output in &mut translation.outputs {
            if !tests_loaded {
                output.scores = None;
            }
            if !options.template_field_info {
                for field in &mut output.template.fields {
                    field.procedures.clear();
                }
            }
        }
        if options.only_applicable {
            let first = translation.outputs.iter().position(|o| o.is_applicable());
            translation.outputs = match first {
                Some(i) => vec![translation.outputs.swap_remove(i)],
                None => Vec::new(),
            };
        }

        Ok(TargetOutput {
            path: path.to_string(),
            href,
            translation,
        })
    }
}

#[async_trait]
impl DomainSession for StaticSession {
    fn spec(&self) -> &DomainSpec {
        &self.spec
    }

    async fn latest_revision(&self, kind: ConfigKind) -> Result<Option<Revision>, EngineError> {
        self.apply_delay().await;
        let title = self.spec.config_title(kind);
        Ok(self.fixtures.revisions.get(&title).cloned())
    }

    fn load_revision(&mut self, kind: ConfigKind, revision: &Revision) -> Result<(), EngineError> {
        self.loaded.insert(kind, revision.clone());
        Ok(())
    }

    fn paths(&self) -> Vec<String> {
        let Some(fixture) = self.fixture() else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        if self.loaded.contains_key(&ConfigKind::Templates) {
            paths.extend(fixture.template_paths.iter().cloned());
        }
        if self.loaded.contains_key(&ConfigKind::Tests) {
            paths.extend(fixture.test_paths.iter().cloned());
        }
        paths
    }

    async fn translate(
        &self,
        paths: &[String],
        options: TranslateOptions,
    ) -> Vec<Result<TargetOutput, EngineError>> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;
        paths
            .iter()
            .map(|path| self.translate_one(path, options))
            .collect()
    }
}
