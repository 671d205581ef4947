//! Loading configuration revisions into a domain session.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{ConfigKind, DomainSession, Revision};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub kind: ConfigKind,
    /// Page title the revision was looked up under.
    pub title: String,
    /// `None` when the page does not exist yet.
    pub revision: Option<Revision>,
}

/// A configuration file actually loaded, as reported under `info.config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub path: String,
    pub revid: u64,
}

/// What a request looked up and loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    pub entries: Vec<ConfigEntry>,
}

impl LoadedConfig {
    pub fn entry(&self, kind: ConfigKind) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    /// Whether `kind` was looked up at all.
    pub fn was_requested(&self, kind: ConfigKind) -> bool {
        self.entry(kind).is_some()
    }

    pub fn revid(&self, kind: ConfigKind) -> Option<u64> {
        self.entry(kind)
            .and_then(|e| e.revision.as_ref())
            .map(|r| r.revid)
    }

    pub fn files(&self) -> Vec<ConfigFile> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.revision.as_ref().map(|r| ConfigFile {
                    path: e.title.clone(),
                    revid: r.revid,
                })
            })
            .collect()
    }
}

/// Fetch the latest templates and patterns revisions (concurrently), plus
/// tests when requested, and load whatever exists into the session.
pub async fn load_configs(
    session: &mut dyn DomainSession,
    tests: bool,
) -> Result<LoadedConfig, EngineError> {
    let (templates, patterns) = {
        let reader: &dyn DomainSession = session;
        tokio::join!(
            reader.latest_revision(ConfigKind::Templates),
            reader.latest_revision(ConfigKind::Patterns)
        )
    };
    let mut fetched = vec![
        (ConfigKind::Templates, templates?),
        (ConfigKind::Patterns, patterns?),
    ];
    if tests {
        fetched.push((
            ConfigKind::Tests,
            session.latest_revision(ConfigKind::Tests).await?,
        ));
    }

    let mut loaded = LoadedConfig::default();
    for (kind, revision) in fetched {
        let title = session.spec().config_title(kind);
        match &revision {
            Some(revision) => {
                session.load_revision(kind, revision)?;
                debug!("Loaded {} revision {}", title, revision.revid);
            }
            None => info!("No {} configuration at {}, using fallback", kind, title),
        }
        loaded.entries.push(ConfigEntry {
            kind,
            title,
            revision,
        });
    }
    Ok(loaded)
}

/// Paths known to the loaded configuration, sorted and de-duplicated.
pub fn known_paths(session: &dyn DomainSession) -> Vec<String> {
    let mut paths = session.paths();
    paths.sort();
    paths.dedup();
    paths
}
