//! Request query validation.
//!
//! A query is accepted in exactly two shapes, `{url, ...options}` or
//! `{domain, path?, ...options}`. Options are string literals:
//! `citoid`, `debug`, `tests` take `"true"`/`"false"`, `format` takes
//! `"html"`/`"json"`/`"mediawiki"` and `sandbox` takes a user name.
//!
//! The same options can be spelled as path segments on the legacy
//! entrypoint: `/[debug/][sandbox/<user>/]<url>`.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Characters escaped in the sandbox user segment of a legacy path.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Html,
    Json,
    Mediawiki,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Format::Html),
            "json" => Ok(Format::Json),
            "mediawiki" => Ok(Format::Mediawiki),
            other => Err(format!(
                "unsupported format \"{}\", expected html, json or mediawiki",
                other
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Html => "html",
            Format::Json => "json",
            Format::Mediawiki => "mediawiki",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    /// A domain, optionally narrowed to one path. Without a path every path
    /// known to the domain's configuration is translated.
    Domain { domain: String, path: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub citoid: bool,
    pub debug: bool,
    pub format: Format,
    pub sandbox: Option<String>,
    pub tests: bool,
}

impl QueryOptions {
    /// Legacy path for a resolved target URL carrying these options, e.g.
    /// `/debug/sandbox/Alice/https://example.com/article`.
    pub fn legacy_path(&self, href: &str) -> String {
        let mut path = String::new();
        if self.debug {
            path.push_str("/debug");
        }
        if let Some(user) = &self.sandbox {
            path.push_str("/sandbox/");
            path.extend(utf8_percent_encode(user, SEGMENT));
        }
        // the legacy entrypoint percent-decodes the path once, so escape
        // '%' there; the query string is passed through undecoded
        let (target_path, query) = match href.split_once('?') {
            Some((target_path, query)) => (target_path, Some(query)),
            None => (href, None),
        };
        path.push('/');
        path.push_str(&target_path.replace('%', "%25"));
        if let Some(query) = query {
            path.push('?');
            path.push_str(query);
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqQuery {
    pub target: Target,
    pub options: QueryOptions,
}

impl ReqQuery {
    pub fn url(url: &str) -> Self {
        ReqQuery {
            target: Target::Url(url.to_string()),
            options: QueryOptions::default(),
        }
    }

    pub fn domain(domain: &str, path: Option<&str>) -> Self {
        ReqQuery {
            target: Target::Domain {
                domain: domain.to_string(),
                path: path.map(str::to_string),
            },
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate decoded query pairs. A repeated key is not a string value
    /// and makes the query invalid; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<ReqQuery, TranslateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = collect_single(pairs)?;
        let get = |key: &str| values.get(key).map(String::as_str);

        let target = match (get("url"), get("domain")) {
            (Some(_), Some(_)) => return Err(invalid("url and domain are mutually exclusive")),
            (None, None) => return Err(invalid("either url or domain is required")),
            (Some(url), None) => {
                if get("path").is_some() {
                    return Err(invalid("path cannot be combined with url"));
                }
                if url.is_empty() {
                    return Err(invalid("url must not be empty"));
                }
                Target::Url(url.to_string())
            }
            (None, Some(domain)) => {
                if domain.is_empty() {
                    return Err(invalid("domain must not be empty"));
                }
                Target::Domain {
                    domain: domain.to_string(),
                    path: get("path").map(str::to_string),
                }
            }
        };

        let sandbox = match get("sandbox") {
            Some("") => return Err(invalid("sandbox must name a user")),
            other => other.map(str::to_string),
        };
        let options = QueryOptions {
            citoid: parse_flag("citoid", get("citoid"))?,
            debug: parse_flag("debug", get("debug"))?,
            format: match get("format") {
                Some(format) => format.parse().map_err(TranslateError::InvalidQuery)?,
                None => Format::default(),
            },
            sandbox,
            tests: parse_flag("tests", get("tests"))?,
        };
        Ok(ReqQuery { target, options })
    }

    /// Parse the legacy entrypoint. `path` is the request path and
    /// `raw_query` its query string, which belongs to the target URL.
    pub fn from_legacy_path(path: &str, raw_query: Option<&str>) -> Result<ReqQuery, TranslateError> {
        let mut rest = path.trim_start_matches('/');
        let mut options = QueryOptions::default();

        if let Some(stripped) = strip_segment(rest, "debug") {
            options.debug = true;
            rest = stripped;
        }
        if let Some(stripped) = strip_segment(rest, "sandbox") {
            let (user, remainder) = stripped.split_once('/').unwrap_or((stripped, ""));
            let user = percent_decode_str(user).decode_utf8_lossy();
            if user.is_empty() {
                return Err(invalid("sandbox must name a user"));
            }
            options.sandbox = Some(user.into_owned());
            rest = remainder;
        }

        let mut url = percent_decode_str(rest).decode_utf8_lossy().into_owned();
        if url.is_empty() {
            return Err(invalid("either url or domain is required"));
        }
        if let Some(query) = raw_query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        Ok(ReqQuery::url(&url).with_options(options))
    }

    /// Whether a `/translate` request should be answered with a redirect
    /// to its legacy path instead.
    pub fn wants_legacy_redirect(&self) -> bool {
        matches!(self.target, Target::Url(_))
            && self.options.format == Format::Html
            && !self.options.citoid
            && !self.options.tests
    }
}

/// Format an error response for raw pairs should use: the requested format
/// when it is a single valid literal, html otherwise.
pub fn requested_format<I, K, V>(pairs: I) -> Format
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let formats: Vec<String> = pairs
        .into_iter()
        .filter(|(k, _)| k.as_ref() == "format")
        .map(|(_, v)| v.as_ref().to_string())
        .collect();
    match formats.as_slice() {
        [single] => single.parse().unwrap_or_default(),
        _ => Format::default(),
    }
}

fn invalid(reason: &str) -> TranslateError {
    TranslateError::InvalidQuery(reason.to_string())
}

fn collect_single<I, K, V>(pairs: I) -> Result<BTreeMap<String, String>, TranslateError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut values = BTreeMap::new();
    for (key, value) in pairs {
        let key = key.as_ref();
        if values
            .insert(key.to_string(), value.as_ref().to_string())
            .is_some()
        {
            return Err(TranslateError::InvalidQuery(format!(
                "parameter \"{}\" given more than once",
                key
            )));
        }
    }
    Ok(values)
}

fn parse_flag(name: &str, value: Option<&str>) -> Result<bool, TranslateError> {
    match value {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(TranslateError::InvalidQuery(format!(
            "{} must be \"true\" or \"false\", got \"{}\"",
            name, other
        ))),
    }
}

fn strip_segment<'a>(path: &'a str, segment: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(segment)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}
