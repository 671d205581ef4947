use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use web2cit_i18n::I18n;
use web2cit_translate::{Engine, SessionSettings, StaticEngine, StorageRoots};

use web2cit_web::{AppState, ServerArgs, build_app, builtin_catalog};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();

    let engine: Arc<dyn Engine> = match &args.fixtures {
        Some(path) => {
            info!("Replaying fixtures from {}", path.display());
            Arc::new(StaticEngine::from_file(path)?)
        }
        None => {
            warn!("No fixtures given, every domain starts without configuration or targets");
            Arc::new(StaticEngine::default())
        }
    };

    let i18n = match &args.i18n_dir {
        Some(dir) => I18n::from_dir(dir)?,
        None => builtin_catalog()?,
    };
    info!("Loaded message catalogs: {}", i18n.locales().join(", "));

    let settings = SessionSettings {
        user_agent_prefix: args.user_agent_prefix.clone(),
        storage: StorageRoots::uniform(&args.storage_root),
    };
    let state = AppState::new(engine, i18n)?
        .with_settings(settings)
        .with_wiki(args.wiki())
        .with_static_dir(args.static_dir.clone());

    info!("Starting Web2Cit server");
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Server running at http://{}", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
