//! Request pipeline of the Web2Cit server.
//!
//! The web2cit engine (pattern matching, template extraction, scoring,
//! wiki-backed configuration) sits behind the [`Engine`] trait. This crate
//! validates queries, resolves targets, opens and configures domain
//! sessions, and shapes engine output into the HTML, JSON and MediaWiki
//! response models.
//!
//! ```no_run
//! use std::sync::Arc;
//! use web2cit_i18n::{I18n, Translator};
//! use web2cit_translate::{ReqQuery, SessionSettings, StaticEngine, translate_request};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = StaticEngine::from_file("fixtures/example.json".as_ref())?;
//! let t = Translator::new(Arc::new(I18n::new()), "en");
//! let query = ReqQuery::from_pairs([("url", "https://example.com/article"), ("format", "json")])?;
//! let summary = translate_request(&engine, &query, &SessionSettings::default(), &t).await?;
//! println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
//! # Ok(())
//! # }
//! ```
pub mod citation;
pub mod config;
pub mod debug;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod results;
pub mod session;
pub mod static_engine;
pub mod target;

pub use citation::{CitationData, CitationField, CitationResult, citation_result, map_fields};
pub use config::{ConfigFile, LoadedConfig, load_configs};
pub use debug::{DebugJson, make_debug_json};
pub use engine::{
    ConfigKind, DEFAULT_STORAGE_ROOT, DomainSession, DomainSpec, Engine, FallbackTemplate,
    Revision, StorageRoots, TranslateOptions, storage_path,
};
pub use error::{EngineError, ErrorBody, INVALID_PATH_ERROR_NAME, TargetError, TranslateError};
pub use output::{Citation, TargetOutput, TemplateOutput, TranslationOutput};
pub use pipeline::{Outcome, TranslationSummary, translate_request};
pub use query::{Format, QueryOptions, ReqQuery, Target, requested_format};
pub use results::{
    API_VERSION, JsonEnvelope, MediawikiError, PatternResult, TargetResult, TranslationField,
    TranslationResult,
};
pub use session::{SessionSettings, domain_spec};
pub use static_engine::{FixtureError, Fixtures, StaticEngine};
pub use target::{ResolvedTarget, resolve_url};
