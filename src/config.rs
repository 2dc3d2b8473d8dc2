use std::{env, path::PathBuf};

use derive_builder::Builder;

pub const DEFAULT_STOP_REF: &str = "STIF:StopArea:SP:43082:";
pub const DEFAULT_CACHE_DIR: &str = "trains";
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_ALLOW_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_STOP_MONITORING_URL: &str =
    "https://prim.iledefrance-mobilites.fr/marketplace/stop-monitoring";
pub const DEFAULT_LINES_REFERENCE_URL: &str = "https://data.iledefrance-mobilites.fr/api/explore/v2.1/catalog/datasets/referentiel-des-lignes/records";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigBuilderError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything the server needs, resolved once at startup
#[derive(Builder, Clone, Debug)]
#[builder(setter(into))]
pub struct Config {
    /// Key for the real-time feed, sent as the `apikey` header
    pub api_key: String,
    #[builder(default = "DEFAULT_STOP_REF.to_string()")]
    pub stop_ref: String,
    /// Directory holding one `<line id>.json` file per line
    #[builder(default = "PathBuf::from(DEFAULT_CACHE_DIR)")]
    pub cache_dir: PathBuf,
    #[builder(default = "DEFAULT_LISTEN_ADDRESS.to_string()")]
    pub listen_address: String,
    /// `*` allows any origin
    #[builder(default = "DEFAULT_ALLOW_ORIGIN.to_string()")]
    pub allow_origin: String,
    #[builder(default = "DEFAULT_STOP_MONITORING_URL.to_string()")]
    pub stop_monitoring_url: String,
    #[builder(default = "DEFAULT_LINES_REFERENCE_URL.to_string()")]
    pub lines_reference_url: String,
}

impl Config {
    pub fn from_env() -> ConfigResult<Config> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let mut builder = ConfigBuilder::default();
        builder.api_key(var("API_KEY").ok_or(ConfigError::Missing("API_KEY"))?);

        if let Some(stop_ref) = var("STOP_REF") {
            builder.stop_ref(stop_ref);
        }
        if let Some(cache_dir) = var("CACHE_DIR") {
            builder.cache_dir(cache_dir);
        }
        if let Some(listen_address) = var("LISTEN_ADDRESS") {
            builder.listen_address(listen_address);
        }
        if let Some(allow_origin) = var("ALLOW_ORIGIN") {
            builder.allow_origin(allow_origin);
        }
        if let Some(url) = var("STOP_MONITORING_URL") {
            builder.stop_monitoring_url(url);
        }
        if let Some(url) = var("LINES_REFERENCE_URL") {
            builder.lines_reference_url(url);
        }

        Ok(builder.build()?)
    }
}
