use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

pub(crate) const DEFAULT_ENV_FILE: &str = ".env.local";

/// Command-line arguments for the Canopy binary.
#[derive(Debug, Parser)]
#[command(
    name = "canopy",
    version,
    about = "ClimateFair blog post cache and route lookup service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CANOPY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Dotenv-style file applied before settings are resolved.
    #[arg(
        long = "env-file",
        env = "CANOPY_ENV_FILE",
        value_name = "PATH",
        default_value = DEFAULT_ENV_FILE,
        value_hint = ValueHint::FilePath
    )]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the cache refresh, status and post lookup endpoints.
    Serve(Box<ServeArgs>),
    /// Write the post cache file and rebuild the route lookup from one
    /// fetch of the published posts.
    #[command(name = "cache-posts")]
    CachePosts(CachePostsArgs),
    /// Print the route lookup map as JSON.
    Lookup(LookupArgs),
    /// Print the Notion database property schema.
    Schema(SchemaArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub cache: CacheOverrides,

    #[command(flatten)]
    pub notion: NotionOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the post cache file location.
    #[arg(long = "cache-posts-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub posts_path: Option<PathBuf>,

    /// Override the file used by the file-backed route lookup store.
    #[arg(long = "cache-lookup-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub lookup_path: Option<PathBuf>,

    /// Override the route lookup time-to-live.
    #[arg(long = "cache-lookup-ttl-seconds", value_name = "SECONDS")]
    pub lookup_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct NotionOverride {
    /// Override the Notion database identifier.
    #[arg(long = "notion-database-id", value_name = "ID")]
    pub database_id: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CachePostsArgs {
    #[command(flatten)]
    pub cache: CacheOverrides,

    #[command(flatten)]
    pub notion: NotionOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub cache: CacheOverrides,

    #[command(flatten)]
    pub notion: NotionOverride,

    /// Ignore cached copies and rebuild from Notion.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub refresh: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub notion: NotionOverride,
}
