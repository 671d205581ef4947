//! Message catalogs for the Web2Cit server.
//!
//! Messages follow the MediaWiki/banana conventions: one JSON catalog per
//! locale, `$1`-style positional parameters and `{{PLURAL:...}}` magic words.
//! The catalog is built once at startup and shared read-only; each request
//! gets a [`Translator`] bound to its negotiated locale.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub mod ast;
pub mod fallbacks;
pub mod loader;
pub mod parser;
pub mod plural;

pub use ast::{AstNode, AstNodeList, Localizable, Placeholder, Transclusion};
pub use fallbacks::{negotiate_locale, resolve_locale_chain};
pub use loader::{
    LoadError, load_all_messages_from_dir, load_messages_from_file, load_messages_from_str,
};
pub use parser::Parser;

#[derive(Debug, Clone, Default)]
pub struct LocalizedMessages(pub HashMap<String, String>);

impl LocalizedMessages {
    pub fn new() -> Self {
        LocalizedMessages(HashMap::new())
    }
    pub fn with_message(&mut self, key: &str, message: &str) -> &mut Self {
        self.0.insert(key.to_owned(), message.to_owned());
        self
    }
    pub fn get_message(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }
    pub fn get(&self, key: &str) -> String {
        self.0.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct I18n {
    // Keyed by locale and then by message key
    // e.g. messages["en"]["web2cit-title"] = "Web2Cit"
    //      messages["es"]["web2cit-title"] = "Web2Cit"
    messages: HashMap<String, LocalizedMessages>,
    default_locale: String,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

impl I18n {
    pub fn new() -> Self {
        I18n {
            messages: HashMap::new(),
            default_locale: fallbacks::ROOT_LOCALE.to_string(),
        }
    }

    /// Build a catalog from every locale file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, LoadError> {
        let mut i18n = I18n::new();
        for (locale, messages) in load_all_messages_from_dir(dir)? {
            i18n.with_messages_for_locale(&locale, messages);
        }
        Ok(i18n)
    }

    pub fn with_locale(&mut self, locale: &str) -> &mut Self {
        self.default_locale = locale.to_lowercase();
        self
    }

    pub fn get_default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn with_messages_for_locale(
        &mut self,
        locale: &str,
        messages: LocalizedMessages,
    ) -> &mut Self {
        self.messages.insert(locale.to_lowercase(), messages);
        self
    }

    /// Locales with a loaded catalog, sorted.
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Look a message up along the fallback chain of `locale`.
    pub fn get_message(&self, locale: &str, key: &str) -> Option<&str> {
        let chain = resolve_locale_chain(locale);
        for (depth, candidate) in chain.iter().enumerate() {
            let found = self
                .messages
                .get(candidate)
                .and_then(|messages| messages.get_message(key));
            if let Some(message) = found {
                if depth > 0 {
                    debug!(
                        "Fallback: using message '{}' from locale '{}' (requested: '{}')",
                        key, candidate, locale
                    );
                }
                return Some(message.as_str());
            }
        }
        debug!(
            "No message found for '{}' in locale '{}' or its fallbacks: {}",
            key,
            locale,
            chain.join(" -> ")
        );
        None
    }

    /// Format `key` for `locale`. Unknown keys render as the key itself.
    pub fn localize(&self, locale: &str, key: &str, values: &[String]) -> String {
        let Some(message) = self.get_message(locale, key) else {
            return key.to_string();
        };
        let ast = Parser::new(message).parse();

        let mut result = String::new();
        for node in &ast {
            match node {
                AstNode::Text(text) => result.push_str(text),
                AstNode::Placeholder(placeholder) => {
                    result.push_str(&placeholder.localize(locale, values))
                }
                AstNode::Transclusion(transclusion) => {
                    result.push_str(&transclusion.localize(locale, values))
                }
            }
        }
        result
    }

    /// Pick the best catalog locale for an `Accept-Language` header.
    pub fn negotiate(&self, accept_language: Option<&str>) -> String {
        accept_language
            .and_then(|header| negotiate_locale(header, self.locales()))
            .unwrap_or_else(|| self.default_locale.clone())
    }
}

/// A catalog bound to one locale, handed to request handlers and views.
#[derive(Debug, Clone)]
pub struct Translator {
    i18n: Arc<I18n>,
    locale: String,
}

impl Translator {
    pub fn new(i18n: Arc<I18n>, locale: &str) -> Self {
        Translator {
            i18n,
            locale: locale.to_lowercase(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn t(&self, key: &str) -> String {
        self.i18n.localize(&self.locale, key, &[])
    }

    pub fn t_with(&self, key: &str, values: &[String]) -> String {
        self.i18n.localize(&self.locale, key, values)
    }

    /// Like [`Translator::t`], but `None` when no catalog has the key.
    pub fn try_t(&self, key: &str) -> Option<String> {
        self.i18n
            .get_message(&self.locale, key)
            .is_some()
            .then(|| self.t(key))
    }
}
