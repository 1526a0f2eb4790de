//! Small, shared configuration building blocks. Each binary crate
//! defines its own config struct and loads it through [`load_config`],
//! which layers a TOML file under environment overrides with `figment`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Loads `T` from `path` (if present) merged under `prefix`-namespaced
/// environment variables, e.g. `BROKER__MAX_WORKERS=500`.
pub fn load_config<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    prefix: &str,
) -> Result<T, figment::Error> {
    Figment::new()
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed(prefix).split("__"))
        .extract()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    Compact,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracingConfig {
    pub format: TracingFormat,
    /// Passed to `EnvFilter`; e.g. "broker_service=debug,info".
    pub filter: String,
}

impl TracingConfig {
    pub fn local_dev(component: &str) -> Self {
        Self {
            format: TracingFormat::Compact,
            filter: format!("{component}=debug,info"),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::local_dev("broker")
    }
}
