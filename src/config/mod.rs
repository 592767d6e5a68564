//! Configuration layer: typed settings with layered precedence
//! (file → dotenv → environment → CLI).

mod cli;
pub mod dotenv;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CacheOverrides, CachePostsArgs, CliArgs, Command, LookupArgs, NotionOverride, SchemaArgs,
    ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "canopy";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_DONE_STATUS: &str = "Done";
const DEFAULT_PUBLISHED_TAG: &str = "Published Blog Post";
const DEFAULT_SITE_TAG: &str = "ClimateFair";
const DEFAULT_SITE_URL: &str = "https://climatefair.co";
const DEFAULT_POSTS_PATH: &str = "posts-cache.json";
const DEFAULT_LOOKUP_PATH: &str = "route-lookup-cache.json";
const DEFAULT_LOOKUP_KEY: &str = "route-lookup-cache";
const DEFAULT_LOOKUP_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_EDGE_CONFIG_API_BASE: &str = "https://api.vercel.com";
const UNKNOWN_STAGE: &str = "unknown";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
    pub site: SiteSettings,
    pub cache: CacheSettings,
    pub environment: EnvironmentSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: Option<String>,
    pub database_id: Option<String>,
    pub api_base: Url,
    pub version: String,
    pub filter: PublicationFilter,
}

/// Property values a database row must carry to count as a published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationFilter {
    pub done_status: String,
    pub published_tag: String,
    pub site_tag: String,
}

impl Default for PublicationFilter {
    fn default() -> Self {
        Self {
            done_status: DEFAULT_DONE_STATUS.to_string(),
            published_tag: DEFAULT_PUBLISHED_TAG.to_string(),
            site_tag: DEFAULT_SITE_TAG.to_string(),
        }
    }
}

/// Token and database id, both guaranteed present.
#[derive(Debug, Clone)]
pub struct NotionCredentials {
    pub token: String,
    pub database_id: String,
}

impl NotionSettings {
    /// Resolve the credentials every CMS call needs.
    pub fn credentials(&self) -> Result<NotionCredentials, LoadError> {
        let token = self.token.clone().ok_or_else(|| {
            LoadError::invalid(
                "notion.token",
                "NOTION_TOKEN or NOTION_API_KEY environment variable is required",
            )
        })?;
        let database_id = self.database_id.clone().ok_or_else(|| {
            LoadError::invalid(
                "notion.database_id",
                "NOTION_DATABASE_ID environment variable is required",
            )
        })?;
        Ok(NotionCredentials { token, database_id })
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Public base URL without a trailing slash.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub posts_path: PathBuf,
    pub lookup_path: PathBuf,
    pub lookup_ttl: Duration,
    pub lookup_key: String,
    pub edge_config: Option<String>,
    pub edge_config_api_base: Url,
}

#[derive(Debug, Clone)]
pub struct EnvironmentSettings {
    /// Deployment stage label (`VERCEL_ENV`, else `NODE_ENV`, else `unknown`).
    pub stage: String,
    pub production: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] std::io::Error),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence.
///
/// `process_env` is the real process environment; it is layered over the
/// entries read from the CLI's env file.
pub fn load(
    cli: &CliArgs,
    process_env: impl IntoIterator<Item = (String, String)>,
) -> Result<Settings, LoadError> {
    let file_entries = dotenv::read_env_file(&cli.env_file)?;
    let env = dotenv::layered_environment(file_entries, process_env);

    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("CANOPY")
            .separator("__")
            .source(Some(env.clone())),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_deployment_env(&env);

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CachePosts(args)) => {
            raw.apply_cache_overrides(&args.cache);
            raw.apply_notion_override(&args.notion);
        }
        Some(Command::Lookup(args)) => {
            raw.apply_cache_overrides(&args.cache);
            raw.apply_notion_override(&args.notion);
        }
        Some(Command::Schema(args)) => raw.apply_notion_override(&args.notion),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration from the real command line and environment.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args, std::env::vars())?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    site: RawSiteSettings,
    cache: RawCacheSettings,
    environment: RawEnvironmentSettings,
}

impl RawSettings {
    /// Apply the variable names the hosting platform and the site frontend
    /// already use. These win over `CANOPY__*` values.
    fn apply_deployment_env(&mut self, env: &Map<String, String>) {
        let get = |key: &str| {
            env.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(token) = get("NOTION_TOKEN").or_else(|| get("NOTION_API_KEY")) {
            self.notion.token = Some(token);
        }
        if let Some(database_id) = get("NOTION_DATABASE_ID") {
            self.notion.database_id = Some(database_id);
        }
        if let Some(url) = get("NEXT_PUBLIC_SITE_URL").or_else(|| get("SITE_URL")) {
            self.site.base_url = Some(url);
        }
        if let Some(edge_config) = get("EDGE_CONFIG") {
            self.cache.edge_config = Some(edge_config);
        }

        let vercel_env = get("VERCEL_ENV");
        let node_env = get("NODE_ENV");
        if let Some(stage) = vercel_env.clone().or_else(|| node_env.clone()) {
            self.environment.stage = Some(stage);
        }
        if vercel_env.is_some() || node_env.is_some() {
            let production = node_env.as_deref() == Some("production")
                || matches!(vercel_env.as_deref(), Some("production" | "preview"));
            self.environment.production = Some(production);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_cache_overrides(&overrides.cache);
        self.apply_notion_override(&overrides.notion);
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(path) = overrides.posts_path.as_ref() {
            self.cache.posts_path = Some(path.clone());
        }
        if let Some(path) = overrides.lookup_path.as_ref() {
            self.cache.lookup_path = Some(path.clone());
        }
        if let Some(ttl) = overrides.lookup_ttl_seconds {
            self.cache.lookup_ttl_seconds = Some(ttl);
        }
    }

    fn apply_notion_override(&mut self, overrides: &NotionOverride) {
        if let Some(database_id) = overrides.database_id.as_ref() {
            self.notion.database_id = Some(database_id.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            site,
            cache,
            environment,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            notion: build_notion_settings(notion)?,
            site: build_site_settings(site)?,
            cache: build_cache_settings(cache)?,
            environment: build_environment_settings(environment),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_notion_settings(notion: RawNotionSettings) -> Result<NotionSettings, LoadError> {
    let api_base = parse_url(
        notion.api_base.as_deref().unwrap_or(DEFAULT_NOTION_API_BASE),
        "notion.api_base",
    )?;

    let version = notion
        .version
        .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string());
    if version.trim().is_empty() {
        return Err(LoadError::invalid("notion.version", "must not be empty"));
    }

    let defaults = PublicationFilter::default();
    let filter = PublicationFilter {
        done_status: non_blank(notion.done_status).unwrap_or(defaults.done_status),
        published_tag: non_blank(notion.published_tag).unwrap_or(defaults.published_tag),
        site_tag: non_blank(notion.site_tag).unwrap_or(defaults.site_tag),
    };

    Ok(NotionSettings {
        token: non_blank(notion.token),
        database_id: non_blank(notion.database_id),
        api_base,
        version,
        filter,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw = non_blank(site.base_url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    parse_url(&raw, "site.base_url")?;
    Ok(SiteSettings {
        base_url: raw.trim_end_matches('/').to_string(),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let posts_path = cache
        .posts_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_POSTS_PATH));
    if posts_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.posts_path",
            "path must not be empty",
        ));
    }

    let lookup_path = cache
        .lookup_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOOKUP_PATH));
    if lookup_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.lookup_path",
            "path must not be empty",
        ));
    }

    let ttl_seconds = cache.lookup_ttl_seconds.unwrap_or(DEFAULT_LOOKUP_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.lookup_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let edge_config_api_base = parse_url(
        cache
            .edge_config_api_base
            .as_deref()
            .unwrap_or(DEFAULT_EDGE_CONFIG_API_BASE),
        "cache.edge_config_api_base",
    )?;

    Ok(CacheSettings {
        posts_path,
        lookup_path,
        lookup_ttl: Duration::from_secs(ttl_seconds),
        lookup_key: non_blank(cache.lookup_key).unwrap_or_else(|| DEFAULT_LOOKUP_KEY.to_string()),
        edge_config: non_blank(cache.edge_config),
        edge_config_api_base,
    })
}

fn build_environment_settings(environment: RawEnvironmentSettings) -> EnvironmentSettings {
    EnvironmentSettings {
        stage: non_blank(environment.stage).unwrap_or_else(|| UNKNOWN_STAGE.to_string()),
        production: environment.production.unwrap_or(false),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    token: Option<String>,
    database_id: Option<String>,
    api_base: Option<String>,
    version: Option<String>,
    done_status: Option<String>,
    published_tag: Option<String>,
    site_tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    posts_path: Option<PathBuf>,
    lookup_path: Option<PathBuf>,
    lookup_ttl_seconds: Option<u64>,
    lookup_key: Option<String>,
    edge_config: Option<String>,
    edge_config_api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEnvironmentSettings {
    stage: Option<String>,
    production: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(value).map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
