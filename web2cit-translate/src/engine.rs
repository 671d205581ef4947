//! Seam to the web2cit translation engine.
//!
//! The engine owns pattern matching, template extraction, scoring and the
//! wiki-backed configuration storage. This crate only opens a per-request
//! [`DomainSession`], loads configuration revisions into it and asks it to
//! translate paths.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::output::TargetOutput;

/// Root under which configuration files live on the wiki.
pub const DEFAULT_STORAGE_ROOT: &str = "Web2Cit/data/";

/// The three configuration files of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Templates,
    Patterns,
    Tests,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Templates, ConfigKind::Patterns, ConfigKind::Tests];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Templates => "templates",
            ConfigKind::Patterns => "patterns",
            ConfigKind::Tests => "tests",
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ConfigKind::Templates => "templates.json",
            ConfigKind::Patterns => "patterns.json",
            ConfigKind::Tests => "tests.json",
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A revision of a configuration page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub revid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Storage roots for the three configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    pub templates: String,
    pub patterns: String,
    pub tests: String,
}

impl Default for StorageRoots {
    fn default() -> Self {
        StorageRoots::uniform(DEFAULT_STORAGE_ROOT)
    }
}

impl StorageRoots {
    pub fn uniform(root: &str) -> Self {
        StorageRoots {
            templates: root.to_string(),
            patterns: root.to_string(),
            tests: root.to_string(),
        }
    }

    /// Relocate every root under `User:<user>/`, the user's draft area.
    pub fn sandboxed(&self, user: &str) -> Self {
        let relocate = |root: &str| format!("User:{}/{}", user, root);
        StorageRoots {
            templates: relocate(&self.templates),
            patterns: relocate(&self.patterns),
            tests: relocate(&self.tests),
        }
    }

    pub fn root(&self, kind: ConfigKind) -> &str {
        match kind {
            ConfigKind::Templates => &self.templates,
            ConfigKind::Patterns => &self.patterns,
            ConfigKind::Tests => &self.tests,
        }
    }
}

/// Domain part of a configuration page title: labels reversed,
/// `www.example.com` → `com/example/www/`.
pub fn storage_path(domain: &str) -> String {
    let mut path: String = domain
        .split('.')
        .rev()
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    path.push('/');
    path
}

/// Which fallback template the engine may apply when no configured
/// template does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackTemplate {
    /// The engine's built-in fallback, which queries Citoid.
    #[default]
    Builtin,
    /// No fallback; used when Citoid itself is the caller.
    Disabled,
}

/// Everything needed to open a domain session. The storage roots are fixed
/// at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub name: String,
    pub user_agent_prefix: Option<String>,
    pub fallback_template: FallbackTemplate,
    pub storage: StorageRoots,
}

impl DomainSpec {
    /// Full title of a configuration page on the wiki.
    pub fn config_title(&self, kind: ConfigKind) -> String {
        format!(
            "{}{}{}",
            self.storage.root(kind),
            storage_path(&self.name),
            kind.filename()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslateOptions {
    /// Stop at the first applicable template and drop the others.
    pub only_applicable: bool,
    /// Include per-field procedure traces.
    pub template_field_info: bool,
}

/// A translation engine able to open per-domain sessions.
pub trait Engine: Send + Sync {
    /// Open a session; fails with [`EngineError::InvalidDomain`] for names
    /// the engine rejects.
    fn open(&self, spec: DomainSpec) -> Result<Box<dyn DomainSession>, EngineError>;

    /// Name of this engine, for logging.
    fn engine_name(&self) -> &str;
}

/// Configuration and translation state for one domain, owned by one request.
#[async_trait]
pub trait DomainSession: Send + Sync {
    fn spec(&self) -> &DomainSpec;

    fn domain(&self) -> &str {
        &self.spec().name
    }

    /// Latest stored revision of a configuration file, `None` when the page
    /// does not exist yet.
    async fn latest_revision(&self, kind: ConfigKind) -> Result<Option<Revision>, EngineError>;

    fn load_revision(&mut self, kind: ConfigKind, revision: &Revision) -> Result<(), EngineError>;

    /// Paths mentioned by the loaded template and test configurations.
    fn paths(&self) -> Vec<String>;

    /// Translate every path, one outcome per path in the same order.
    async fn translate(
        &self,
        paths: &[String],
        options: TranslateOptions,
    ) -> Vec<Result<TargetOutput, EngineError>>;
}
