use crate::LocalizedMessages;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON from '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid catalog '{0}': root must be an object")]
    NotAnObject(PathBuf),
    #[error("directory not found: {0}")]
    MissingDir(PathBuf),
}

/// Load messages from a single banana-style JSON catalog.
///
/// ```json
/// {
///     "@metadata": { "authors": [] },
///     "message-key": "message text"
/// }
/// ```
///
/// Keys starting with `@` are skipped, as are non-string values.
pub fn load_messages_from_file(path: &Path) -> Result<LocalizedMessages, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_messages(&content).map_err(|e| match e {
        ParseFailure::Json(source) => LoadError::Json {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::NotAnObject => LoadError::NotAnObject(path.to_path_buf()),
    })
}

/// Parse a catalog already in memory, such as one embedded with
/// `include_str!`. `name` stands in for the file path in errors.
pub fn load_messages_from_str(name: &str, content: &str) -> Result<LocalizedMessages, LoadError> {
    parse_messages(content).map_err(|e| match e {
        ParseFailure::Json(source) => LoadError::Json {
            path: PathBuf::from(name),
            source,
        },
        ParseFailure::NotAnObject => LoadError::NotAnObject(PathBuf::from(name)),
    })
}

enum ParseFailure {
    Json(serde_json::Error),
    NotAnObject,
}

fn parse_messages(content: &str) -> Result<LocalizedMessages, ParseFailure> {
    let json: Value = serde_json::from_str(content).map_err(ParseFailure::Json)?;
    let obj = json.as_object().ok_or(ParseFailure::NotAnObject)?;

    let mut messages = LocalizedMessages::new();
    for (key, value) in obj {
        if key.starts_with('@') {
            continue;
        }
        match value.as_str() {
            Some(message) => {
                messages.with_message(key, message);
            }
            None => warn!("Message '{}' is not a string, skipping", key),
        }
    }
    Ok(messages)
}

/// Load every `*.json` catalog in `dir`; the file stem is the locale code
/// (`en.json` → `en`, `zh-hans.json` → `zh-hans`).
pub fn load_all_messages_from_dir(
    dir: &Path,
) -> Result<HashMap<String, LocalizedMessages>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingDir(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut all_messages = HashMap::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();

        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!("Skipping catalog with a non UTF-8 name: {}", path.display());
            continue;
        };
        let locale = locale.to_lowercase();
        let messages = load_messages_from_file(&path)?;
        all_messages.insert(locale, messages);
    }

    if all_messages.is_empty() {
        warn!("No JSON catalogs found in directory {}", dir.display());
    }
    Ok(all_messages)
}
