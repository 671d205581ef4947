use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderMap, header};
use minijinja::Environment;
use web2cit_i18n::{I18n, LoadError, Translator, load_messages_from_str};
use web2cit_translate::{Engine, SessionSettings};

use crate::config::{DEFAULT_STATIC_DIR, WikiSettings};
use crate::views;

/// Catalogs compiled into the binary, used unless a directory is given.
const BUILTIN_CATALOGS: [(&str, &str); 2] = [
    ("en", include_str!("../i18n/en.json")),
    ("es", include_str!("../i18n/es.json")),
];

pub fn builtin_catalog() -> Result<I18n, LoadError> {
    let mut i18n = I18n::new();
    for (locale, content) in BUILTIN_CATALOGS {
        let messages = load_messages_from_str(&format!("i18n/{}.json", locale), content)?;
        i18n.with_messages_for_locale(locale, messages);
    }
    Ok(i18n)
}

/// Shared, read-only state of the server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub i18n: Arc<I18n>,
    pub templates: Arc<Environment<'static>>,
    pub settings: Arc<SessionSettings>,
    pub wiki: WikiSettings,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine>, i18n: I18n) -> Result<Self, minijinja::Error> {
        Ok(AppState {
            engine,
            i18n: Arc::new(i18n),
            templates: Arc::new(views::environment()?),
            settings: Arc::new(SessionSettings::default()),
            wiki: WikiSettings::default(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        })
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_wiki(mut self, wiki: WikiSettings) -> Self {
        self.wiki = wiki;
        self
    }

    pub fn with_static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = dir;
        self
    }

    /// Translator for the language negotiated from `Accept-Language`.
    pub fn translator(&self, headers: &HeaderMap) -> Translator {
        let accept_language = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        let locale = self.i18n.negotiate(accept_language);
        Translator::new(Arc::clone(&self.i18n), &locale)
    }
}
