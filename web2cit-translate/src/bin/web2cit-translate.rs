use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use web2cit_i18n::{I18n, Translator};
use web2cit_translate::{
    Format, JsonEnvelope, MediawikiError, ReqQuery, SessionSettings, StaticEngine, StorageRoots,
    TranslateError, translate_request,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("web2cit-translate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate a webpage into a citation against recorded Web2Cit fixtures")
        .arg(
            Arg::new("url")
                .help("Target webpage URL")
                .index(1)
                .conflicts_with("domain"),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .short('d')
                .help("Translate every configured path of a domain instead of one URL"),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .short('p')
                .requires("domain")
                .help("Restrict a domain translation to one path"),
        )
        .arg(
            Arg::new("fixtures")
                .long("fixtures")
                .short('f')
                .env("WEB2CIT_FIXTURES")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Fixture file with recorded revisions and translation outputs"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(["json", "mediawiki"])
                .default_value("json")
                .help("Output format"),
        )
        .arg(
            Arg::new("sandbox")
                .long("sandbox")
                .help("Read configuration from this user's sandbox"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Include non-applicable templates and procedure traces"),
        )
        .arg(
            Arg::new("tests")
                .long("tests")
                .action(ArgAction::SetTrue)
                .help("Score outputs against the tests configuration"),
        )
        .arg(
            Arg::new("citoid")
                .long("citoid")
                .action(ArgAction::SetTrue)
                .help("Disable the Citoid-backed fallback template"),
        )
        .arg(
            Arg::new("storage-root")
                .long("storage-root")
                .env("WEB2CIT_STORAGE_ROOT")
                .default_value(web2cit_translate::DEFAULT_STORAGE_ROOT)
                .help("Wiki page prefix of the configuration files"),
        )
        .arg(
            Arg::new("i18n-dir")
                .long("i18n-dir")
                .env("WEB2CIT_I18N_DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory of message catalogs used for error messages"),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .short('l')
                .default_value("en")
                .help("Locale of error messages"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log pipeline steps to stderr"),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    // Same validation as the HTTP query string
    let mut pairs: Vec<(String, String)> = Vec::new();
    for key in ["url", "domain", "path", "format", "sandbox"] {
        if let Some(value) = matches.get_one::<String>(key) {
            pairs.push((key.to_string(), value.clone()));
        }
    }
    for flag in ["debug", "tests", "citoid"] {
        if matches.get_flag(flag) {
            pairs.push((flag.to_string(), "true".to_string()));
        }
    }

    let fixtures = matches
        .get_one::<PathBuf>("fixtures")
        .ok_or("missing --fixtures")?;
    let engine = StaticEngine::from_file(fixtures)?;

    let i18n = match matches.get_one::<PathBuf>("i18n-dir") {
        Some(dir) => I18n::from_dir(dir)?,
        None => I18n::new(),
    };
    let locale = matches
        .get_one::<String>("locale")
        .map(String::as_str)
        .unwrap_or("en");
    let t = Translator::new(Arc::new(i18n), locale);

    let storage_root = matches
        .get_one::<String>("storage-root")
        .map(String::as_str)
        .unwrap_or(web2cit_translate::DEFAULT_STORAGE_ROOT);
    let settings = SessionSettings {
        user_agent_prefix: Some(format!("web2cit-translate/{}", env!("CARGO_PKG_VERSION"))),
        storage: StorageRoots::uniform(storage_root),
    };

    let query = match ReqQuery::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(query) => query,
        Err(e) => return report(&e, Format::Json, &t),
    };
    let format = query.options.format;

    let summary = match translate_request(&engine, &query, &settings, &t).await {
        Ok(summary) => summary,
        Err(e) => return report(&e, format, &t),
    };

    let output = match format {
        Format::Mediawiki => serde_json::to_string_pretty(&summary.to_mediawiki())?,
        _ => serde_json::to_string_pretty(&summary.to_json())?,
    };
    println!("{}", output);

    if summary.outcome.status() != 200 {
        eprintln!("Finished with status {}", summary.outcome.status());
        std::process::exit(1);
    }
    Ok(())
}

fn report(
    error: &TranslateError,
    format: Format,
    t: &Translator,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = error.body(t);
    let output = match format {
        Format::Mediawiki => serde_json::to_string_pretty(&MediawikiError { error: body })?,
        _ => serde_json::to_string_pretty(&JsonEnvelope::error(body))?,
    };
    println!("{}", output);
    eprintln!("Request failed with status {}", error.status());
    std::process::exit(1);
}
