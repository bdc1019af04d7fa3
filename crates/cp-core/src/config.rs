//! Layered configuration loader: YAML file, then `.env`, then process
//! environment, each layer overriding the last. A single typed struct
//! rather than a dynamic registry — this service has one config shape,
//! not a plugin-contributed one.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Load(String),
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
            ConfigError::Missing(key) => write!(f, "required config key missing: {key}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Resolution order (lowest to highest priority):
/// 1. `config/application.yaml` (base, optional)
/// 2. `config/application-{profile}.yaml` (profile override, optional)
/// 3. `.env` (loaded into process environment, never overwrites existing vars)
/// 4. Environment variables
///
/// Profile is `CP_PROFILE` env var, else the `profile` argument, else `"dev"`.
pub fn load<T: DeserializeOwned>(profile: &str) -> Result<T, ConfigError> {
    let active_profile = std::env::var("CP_PROFILE").unwrap_or_else(|_| profile.to_string());

    let mut merged = serde_yaml::Value::Mapping(Default::default());
    merge_yaml_file(&mut merged, Path::new("config/application.yaml"))?;
    merge_yaml_file(
        &mut merged,
        Path::new(&format!("config/application-{active_profile}.yaml")),
    )?;

    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_filename(format!(".env.{active_profile}"));

    // Environment variables overlay the YAML tree: `CP_SESSION__IDLE_TTL_SECS`
    // becomes `session.idle_ttl_secs` (double underscore = nesting separator).
    for (key, value) in std::env::vars() {
        let Some(rest) = key.strip_prefix("CP_") else {
            continue;
        };
        let path: Vec<String> = rest.to_lowercase().split("__").map(String::from).collect();
        set_path(&mut merged, &path, serde_yaml::Value::String(value));
    }

    serde_yaml::from_value(merged).map_err(|e| ConfigError::Load(e.to_string()))
}

fn merge_yaml_file(into: &mut serde_yaml::Value, path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Load(e.to_string()))?;
    merge_yaml(into, parsed);
    Ok(())
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(existing) => merge_yaml(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn set_path(root: &mut serde_yaml::Value, path: &[String], value: serde_yaml::Value) {
    use serde_yaml::{Mapping, Value};
    if !root.is_mapping() {
        *root = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = root else { unreachable!() };
    match path {
        [] => {}
        [last] => {
            map.insert(Value::String(last.clone()), value);
        }
        [head, tail @ ..] => {
            let entry = map
                .entry(Value::String(head.clone()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            set_path(entry, tail, value);
        }
    }
}

/// Top-level configuration for the control plane binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub extension: ExtensionConfig,
    pub scheduler: SchedulerConfig,
    pub credentials: CredentialsConfig,
    pub collaborators: CollaboratorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub issuer_url: String,
    pub jwks_url: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
    pub warmup_timeout_secs: u64,
    pub reap_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_secs(self.warmup_timeout_secs)
    }
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub default_request_timeout_secs: u64,
}

impl ExtensionConfig {
    pub fn default_request_timeout(&self) -> Duration {
        Duration::from_secs(self.default_request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_secs: u64,
    pub missed_policy: MissedPolicy,
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissedPolicy {
    SkipMissed,
    FireOnce,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Base64-encoded 256-bit symmetric key. Loaded from process
    /// configuration, never stored alongside ciphertext.
    pub encryption_key_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaboratorsConfig {
    /// Base URL of the browser-instance farm's allocation API.
    pub instance_farm_url: String,
    /// Base URL of the external Workflow Runtime.
    pub workflow_runtime_url: String,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            instance_farm_url: "http://localhost:9100".into(),
            workflow_runtime_url: "http://localhost:9200".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON output for production, pretty human-readable for local dev.
    pub json: bool,
    /// `RUST_LOG`-style env filter directive, e.g. "info,tower_http=warn".
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info,control_plane=debug,tower_http=warn".into(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            database_url: "postgres://localhost/control_plane".into(),
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
            extension: ExtensionConfig::default(),
            scheduler: SchedulerConfig::default(),
            credentials: CredentialsConfig::default(),
            collaborators: CollaboratorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer_url: "https://auth.example.com/".into(),
            jwks_url: "https://auth.example.com/.well-known/jwks.json".into(),
            audience: "control-plane".into(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 4 * 3600,
            warmup_timeout_secs: 30,
            reap_interval_secs: 60,
        }
    }
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            default_request_timeout_secs: 10,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            missed_policy: MissedPolicy::SkipMissed,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            encryption_key_base64: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overlay_sets_nested_path() {
        let mut root = serde_yaml::Value::Mapping(Default::default());
        set_path(
            &mut root,
            &["session".to_string(), "idle_ttl_secs".to_string()],
            serde_yaml::Value::String("120".into()),
        );
        let cfg: AppConfig = serde_yaml::from_value(root).unwrap();
        assert_eq!(cfg.session.idle_ttl_secs, 120);
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.idle_ttl().as_secs(), 4 * 3600);
        assert_eq!(cfg.scheduler.missed_policy, MissedPolicy::SkipMissed);
    }
}
