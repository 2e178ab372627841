//! Configuration for fabricbeat collector instances.
//!
//! Each collector instance reads one YAML file (`configs/<name>.yaml`
//! by convention) layered with `FABRICBEAT_`-prefixed environment
//! overrides, and translates the fabric inventory into
//! `fabricbeat_core` types.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use fabricbeat_core::{Fabric, FabricEndpoint};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {path} not found")]
    NotFound { path: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level configuration for one collector instance.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Elasticsearch endpoint (scheme + host, e.g. "https://es.example.com").
    pub elastic_host: String,

    /// Base index name; the rotation suffix is appended per POST.
    pub elastic_index: String,

    pub elastic_username: String,
    pub elastic_password: SecretString,

    /// Index rotation cadence.
    #[serde(default)]
    pub elastic_index_rotate: IndexRotate,

    /// Poll interval in seconds. POSTs align to wall-clock multiples
    /// of this value.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Log destination: a file path, or "stdout". Defaults to
    /// `logs/<name>.log` (resolved by the binary, which knows the
    /// instance name).
    #[serde(default)]
    pub log_file: Option<String>,

    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub region_name: String,

    /// Fabric name → ordered controller endpoints, tried in order
    /// until one login succeeds.
    pub inventory: BTreeMap<String, Vec<EndpointConfig>>,
}

fn default_interval() -> u64 {
    60
}

/// Index rotation cadence for the bulk sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexRotate {
    #[default]
    Daily,
    Monthly,
}

impl IndexRotate {
    /// chrono format string for the index-name suffix.
    pub fn suffix_format(self) -> &'static str {
        match self {
            Self::Daily => "%Y-%m-%d",
            Self::Monthly => "%Y-%m",
        }
    }
}

/// One controller endpoint inside a fabric's inventory entry.
#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    pub address: String,
    pub username: String,
    pub password: SecretString,
    /// Site tag stamped into every document. Accepts a bare number or
    /// a string in YAML.
    #[serde(deserialize_with = "site_string")]
    pub site: String,
}

fn site_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SiteId {
        Num(i64),
        Str(String),
    }
    Ok(match SiteId::deserialize(deserializer)? {
        SiteId::Num(n) => n.to_string(),
        SiteId::Str(s) => s,
    })
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load and validate a collector configuration: YAML file first,
/// `FABRICBEAT_`-prefixed environment variables on top.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Figment treats a missing file as an empty layer; a missing
    // config is a hard error here.
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("FABRICBEAT_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < 30 {
            return Err(ConfigError::Validation {
                field: "interval".into(),
                reason: format!("minimum interval is 30, got {}", self.interval),
            });
        }
        if self.inventory.is_empty() {
            return Err(ConfigError::Validation {
                field: "inventory".into(),
                reason: "at least one fabric is required".into(),
            });
        }
        for (fabric, endpoints) in &self.inventory {
            if endpoints.is_empty() {
                return Err(ConfigError::Validation {
                    field: "inventory".into(),
                    reason: format!("fabric '{fabric}' has no controller endpoints"),
                });
            }
        }
        Ok(())
    }

    /// Translate the inventory into collector fabric descriptors.
    pub fn fabrics(&self) -> Vec<Fabric> {
        self.inventory
            .iter()
            .map(|(name, endpoints)| Fabric {
                name: name.clone(),
                endpoints: endpoints
                    .iter()
                    .map(|e| FabricEndpoint {
                        address: e.address.clone(),
                        username: e.username.clone(),
                        password: e.password.clone(),
                        site: e.site.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}
