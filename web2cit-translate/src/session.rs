//! Domain session construction.
use tracing::debug;

use crate::engine::{DomainSession, DomainSpec, Engine, FallbackTemplate, StorageRoots};
use crate::error::TranslateError;
use crate::query::QueryOptions;

/// Process-wide settings every session is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub user_agent_prefix: Option<String>,
    pub storage: StorageRoots,
}

/// Spec of the session a request needs. Sandbox mode relocates the storage
/// roots and nothing else.
pub fn domain_spec(domain: &str, options: &QueryOptions, settings: &SessionSettings) -> DomainSpec {
    let storage = match &options.sandbox {
        Some(user) => settings.storage.sandboxed(user),
        None => settings.storage.clone(),
    };
    // Citoid asking us must not make the fallback template ask Citoid back
    let fallback_template = if options.citoid {
        FallbackTemplate::Disabled
    } else {
        FallbackTemplate::Builtin
    };
    DomainSpec {
        name: domain.to_string(),
        user_agent_prefix: settings.user_agent_prefix.clone(),
        fallback_template,
        storage,
    }
}

pub fn open_session(
    engine: &dyn Engine,
    domain: &str,
    options: &QueryOptions,
    settings: &SessionSettings,
) -> Result<Box<dyn DomainSession>, TranslateError> {
    let spec = domain_spec(domain, options, settings);
    debug!(
        "Opening {} session for {} (templates root {})",
        engine.engine_name(),
        spec.name,
        spec.storage.templates
    );
    Ok(engine.open(spec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ConfigKind;

    fn settings() -> SessionSettings {
        SessionSettings {
            user_agent_prefix: Some("web2cit-server".into()),
            storage: StorageRoots::default(),
        }
    }

    #[test]
    fn sandbox_rewrites_only_storage_roots() {
        let plain = domain_spec("example.com", &QueryOptions::default(), &settings());
        let sandboxed = domain_spec(
            "example.com",
            &QueryOptions {
                sandbox: Some("Alice".into()),
                ..Default::default()
            },
            &settings(),
        );
        for kind in ConfigKind::ALL {
            assert_eq!(
                sandboxed.storage.root(kind),
                format!("User:Alice/{}", plain.storage.root(kind))
            );
        }
        assert_eq!(
            DomainSpec {
                storage: plain.storage.clone(),
                ..sandboxed
            },
            plain
        );
    }

    #[test]
    fn citoid_disables_fallback() {
        let spec = domain_spec(
            "example.com",
            &QueryOptions {
                citoid: true,
                ..Default::default()
            },
            &settings(),
        );
        assert_eq!(spec.fallback_template, FallbackTemplate::Disabled);
        let spec = domain_spec("example.com", &QueryOptions::default(), &settings());
        assert_eq!(spec.fallback_template, FallbackTemplate::Builtin);
    }
}
