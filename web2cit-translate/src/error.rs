//! Error taxonomy of the request pipeline.
//!
//! Three layers, each a closed enum:
//!
//! - [`EngineError`]: what the translation engine reports through the seam.
//! - [`TranslateError`]: fatal, request-level failures answered directly.
//! - [`TargetError`]: per-target failures recorded next to sibling results.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web2cit_i18n::Translator;

/// Name reported for targets whose path does not resolve to a webpage.
pub const INVALID_PATH_ERROR_NAME: &str = "Invalid path error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid domain name \"{domain}\": {reason}")]
    InvalidDomain { domain: String, reason: String },
    #[error("request to {url} failed with status {status} ({status_text})")]
    HttpResponse {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("the mediawiki format cannot be combined with debug or tests mode")]
    IncompatibleOptions,
    #[error("invalid target \"{target}\": {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("invalid domain \"{domain}\": {reason}")]
    InvalidDomain { domain: String, reason: String },
    #[error("request to {url} failed with status {status} ({status_text})")]
    ExternalResource {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<EngineError> for TranslateError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidDomain { domain, reason } => {
                TranslateError::InvalidDomain { domain, reason }
            }
            EngineError::HttpResponse {
                url,
                status,
                status_text,
            } => TranslateError::ExternalResource {
                url,
                status,
                status_text,
            },
            EngineError::Other(message) => TranslateError::Unexpected(message),
        }
    }
}

impl TranslateError {
    /// HTTP status the front end answers with.
    pub fn status(&self) -> u16 {
        match self {
            TranslateError::InvalidQuery(_)
            | TranslateError::IncompatibleOptions
            | TranslateError::InvalidTarget { .. }
            | TranslateError::InvalidDomain { .. } => 400,
            TranslateError::ExternalResource { status, .. } => *status,
            TranslateError::Unexpected(_) => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranslateError::InvalidQuery(_) => "InvalidQueryError",
            TranslateError::IncompatibleOptions => "IncompatibleOptionsError",
            TranslateError::InvalidTarget { .. } => "InvalidTargetError",
            TranslateError::InvalidDomain { .. } => "InvalidDomainError",
            TranslateError::ExternalResource { .. } => "HTTPResponseError",
            TranslateError::Unexpected(_) => "Error",
        }
    }

    /// Localized, user-facing description. Unexpected errors never expose
    /// their internal message.
    pub fn message(&self, t: &Translator) -> String {
        match self {
            TranslateError::InvalidQuery(reason) => {
                t.t_with("error-invalid-query", &[reason.clone()])
            }
            TranslateError::IncompatibleOptions => t.t("error-incompatible-options"),
            TranslateError::InvalidTarget { target, reason } => {
                t.t_with("error-invalid-target", &[target.clone(), reason.clone()])
            }
            TranslateError::InvalidDomain { domain, reason } => {
                t.t_with("error-invalid-domain", &[domain.clone(), reason.clone()])
            }
            TranslateError::ExternalResource {
                url,
                status,
                status_text,
            } => t.t_with(
                "error-external-resource",
                &[url.clone(), status.to_string(), status_text.clone()],
            ),
            TranslateError::Unexpected(_) => t.t("error-unexpected"),
        }
    }

    pub fn body(&self, t: &Translator) -> ErrorBody {
        ErrorBody {
            name: self.name().to_string(),
            message: self.message(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("invalid path \"{path}\" for domain \"{domain}\"")]
    InvalidPath { path: String, domain: String },
    #[error("no applicable translation template for target \"{path}\"")]
    NoApplicableTemplate { path: String },
    #[error("request to {url} failed with status {status} ({status_text})")]
    ExternalResource {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("{0}")]
    Engine(String),
}

impl From<EngineError> for TargetError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::HttpResponse {
                url,
                status,
                status_text,
            } => TargetError::ExternalResource {
                url,
                status,
                status_text,
            },
            other => TargetError::Engine(other.to_string()),
        }
    }
}

impl TargetError {
    pub fn name(&self) -> &'static str {
        match self {
            TargetError::InvalidPath { .. } => INVALID_PATH_ERROR_NAME,
            TargetError::NoApplicableTemplate { .. } => "NoApplicableTemplateError",
            TargetError::ExternalResource { .. } => "HTTPResponseError",
            TargetError::Engine(_) => "Error",
        }
    }

    pub fn message(&self, t: &Translator) -> String {
        match self {
            TargetError::InvalidPath { path, domain } => {
                t.t_with("error-invalid-path", &[path.clone(), domain.clone()])
            }
            TargetError::NoApplicableTemplate { path } => {
                t.t_with("error-no-applicable-template", &[path.clone()])
            }
            TargetError::ExternalResource {
                url,
                status,
                status_text,
            } => t.t_with(
                "error-external-resource",
                &[url.clone(), status.to_string(), status_text.clone()],
            ),
            TargetError::Engine(message) => message.clone(),
        }
    }

    pub fn body(&self, t: &Translator) -> ErrorBody {
        ErrorBody {
            name: self.name().to_string(),
            message: self.message(t),
        }
    }
}

/// Serialized form of every error: `{name, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}
