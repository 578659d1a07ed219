use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Path segment shareable links live under (`/<prefix>/<id>`), without slashes.
    pub link_prefix: String,
    pub max_body_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Publish and share code snippets by short id")]
pub struct Args {
    /// Host to bind to (overrides SNIPPET_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SNIPPET_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides SNIPPET_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Path prefix for shareable links (overrides SNIPPET_STORE_LINK_PREFIX)
    #[arg(long)]
    pub link_prefix: Option<String>,

    /// Largest accepted request body in bytes (overrides SNIPPET_STORE_MAX_BODY_BYTES)
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |key| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values produced by `lookup` (normally `env::var`).
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_string = |key: &str, default: &str| -> Result<String> {
            match lookup(key) {
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default.to_string()),
                Err(err) => Err(err).with_context(|| format!("reading {key}")),
            }
        };

        let host = match args.host {
            Some(host) => host,
            None => env_string("SNIPPET_STORE_HOST", "0.0.0.0")?,
        };
        let port = match args.port {
            Some(port) => port,
            None => parse_env(&lookup, "SNIPPET_STORE_PORT", DEFAULT_PORT)?,
        };
        let database_url = match args.database_url {
            Some(url) => url,
            None => env_string("SNIPPET_STORE_DATABASE_URL", "sqlite://./data/snippets.db")?,
        };
        let raw_prefix = match args.link_prefix {
            Some(prefix) => prefix,
            None => env_string("SNIPPET_STORE_LINK_PREFIX", "p")?,
        };
        let max_body_bytes = match args.max_body_bytes {
            Some(limit) => limit,
            None => parse_env(&lookup, "SNIPPET_STORE_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        };

        let link_prefix = raw_prefix.trim_matches('/').to_string();
        if link_prefix.is_empty() {
            bail!("link prefix `{raw_prefix}` must contain at least one path character");
        }
        if link_prefix == "api" {
            bail!("link prefix `api` collides with the JSON API routes");
        }

        Ok(Self {
            host,
            port,
            database_url,
            link_prefix,
            max_body_bytes,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {key} value `{value}`")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {key}")),
    }
}
