//! Server configuration: command line flags with environment fallbacks.
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use web2cit_translate::{ConfigKind, DEFAULT_STORAGE_ROOT, DomainSpec, storage_path};

pub const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
pub const DEFAULT_WIKI_INSTANCE: &str = "https://meta.wikimedia.org";
pub const DEFAULT_WIKI_PATH: &str = "/wiki/";

/// Characters escaped when a page title goes into a wiki URL.
const TITLE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'{')
    .add(b'}');

#[derive(Parser, Debug, Clone)]
#[command(name = "web2cit-server", version, about = "Web2Cit citation translation server")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "WEB2CIT_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Fixture file replayed by the static engine
    #[arg(long, env = "WEB2CIT_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Directory of message catalogs; the built-in catalogs are used otherwise
    #[arg(long, env = "WEB2CIT_I18N_DIR")]
    pub i18n_dir: Option<PathBuf>,

    /// Directory holding home.js, results.js and style.css
    #[arg(long, env = "WEB2CIT_STATIC_DIR", default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: PathBuf,

    /// Prefix of the user agent the engine sends upstream
    #[arg(long, env = "WEB2CIT_USER_AGENT_PREFIX")]
    pub user_agent_prefix: Option<String>,

    /// Wiki hosting the configuration files
    #[arg(long, env = "WEB2CIT_STORAGE_INSTANCE", default_value = DEFAULT_WIKI_INSTANCE)]
    pub storage_instance: String,

    /// Article path of that wiki
    #[arg(long, env = "WEB2CIT_STORAGE_WIKI", default_value = DEFAULT_WIKI_PATH)]
    pub storage_wiki: String,

    /// Page prefix of the configuration files
    #[arg(long, env = "WEB2CIT_STORAGE_ROOT", default_value = DEFAULT_STORAGE_ROOT)]
    pub storage_root: String,
}

impl ServerArgs {
    pub fn wiki(&self) -> WikiSettings {
        WikiSettings {
            instance: self.storage_instance.clone(),
            wiki: self.storage_wiki.clone(),
        }
    }
}

/// Where configuration pages are browsed and edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSettings {
    pub instance: String,
    pub wiki: String,
}

impl Default for WikiSettings {
    fn default() -> Self {
        WikiSettings {
            instance: DEFAULT_WIKI_INSTANCE.to_string(),
            wiki: DEFAULT_WIKI_PATH.to_string(),
        }
    }
}

impl WikiSettings {
    pub fn page_url(&self, title: &str) -> String {
        let title = title.replace(' ', "_");
        format!(
            "{}{}{}",
            self.instance,
            self.wiki,
            utf8_percent_encode(&title, TITLE)
        )
    }

    /// Listing of every configuration page of a domain.
    pub fn prefix_index_url(&self, spec: &DomainSpec) -> String {
        self.page_url(&format!(
            "Special:PrefixIndex/{}{}",
            spec.storage.root(ConfigKind::Templates),
            storage_path(&spec.name)
        ))
    }

    pub fn edit_url(&self, spec: &DomainSpec, kind: ConfigKind) -> String {
        format!("{}?action=edit", self.page_url(&spec.config_title(kind)))
    }

    /// Human readable storage location, e.g. `https://meta.wikimedia.org/wiki/Web2Cit/data/`.
    pub fn storage_label(&self, spec: &DomainSpec) -> String {
        format!(
            "{}{}{}",
            self.instance,
            self.wiki,
            spec.storage.root(ConfigKind::Templates)
        )
    }
}
