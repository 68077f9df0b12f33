//! Gateway settings store.
//!
//! The settings document is a small JSON file that operators edit by hand:
//!
//! ```json
//! {
//!   "maintenance": { "enabled": false, "exemptPaths": ["/api/settings", "/assets/"] },
//!   "apiSettings": { "creator": "VGX Team" }
//! }
//! ```
//!
//! Only the maintenance flag, the exempt prefixes and the attribution name are
//! interpreted. Everything else is opaque display metadata, kept verbatim in
//! [`GatewaySettings::raw`] so it can be served back to the documentation page.
//!
//! The file is loaded once at startup (a failure there is fatal) and re-read on
//! every request that reaches the maintenance gate, so toggling the flag takes
//! effect on the next request without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::SettingsError;

/// Attribution used when the settings document does not name a creator.
pub const DEFAULT_ATTRIBUTION: &str = "VGX Team";

/// Path prefixes that stay reachable while maintenance is enabled, unless the
/// settings document overrides them.
pub const DEFAULT_EXEMPT_PREFIXES: &[&str] =
    &["/api/settings", "/assets/", "/src/", "/api/preview-image"];

// =============================================================================
// Settings Document
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct SettingsDocument {
    #[serde(default, deserialize_with = "lenient_section")]
    maintenance: MaintenanceSection,

    #[serde(default, rename = "apiSettings", deserialize_with = "lenient_section")]
    api_settings: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
struct MaintenanceSection {
    #[serde(default, deserialize_with = "truthy")]
    enabled: bool,

    #[serde(default, rename = "exemptPaths", deserialize_with = "string_list")]
    exempt_paths: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    #[serde(default, deserialize_with = "string_value")]
    creator: Option<String>,
}

// Hand-edited documents are read leniently: a section of the wrong shape
// (including `null`) counts as absent rather than failing the whole document.

fn lenient_section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Loose truthiness: `null`, `false`, `0` and `""` are off, anything else is on.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(enabled) => enabled,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    })
}

fn string_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Interpreted view of the settings document.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Whether the maintenance gate is closed
    pub maintenance_enabled: bool,

    /// Ordered path prefixes that bypass the maintenance gate
    pub maintenance_exempt_prefixes: Vec<String>,

    /// Name injected as `creator` into enveloped JSON responses
    pub attribution_name: String,

    /// The full document as read from storage
    pub raw: Value,
}

impl GatewaySettings {
    /// Interpret an already parsed settings document.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let document = SettingsDocument::deserialize(&raw)?;

        let attribution_name = document
            .api_settings
            .creator
            .filter(|creator| !creator.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ATTRIBUTION.to_string());

        let maintenance_exempt_prefixes = document
            .maintenance
            .exempt_paths
            .unwrap_or_else(default_exempt_prefixes);

        Ok(Self {
            maintenance_enabled: document.maintenance.enabled,
            maintenance_exempt_prefixes,
            attribution_name,
            raw,
        })
    }

    /// Parse and interpret a settings document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_slice(bytes)?;
        Self::from_value(raw)
    }

    /// Check whether a request path starts with one of the exempt prefixes.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.maintenance_exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Return a copy with the maintenance flag set.
    pub fn with_maintenance(mut self, enabled: bool) -> Self {
        self.maintenance_enabled = enabled;
        self
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            maintenance_enabled: false,
            maintenance_exempt_prefixes: default_exempt_prefixes(),
            attribution_name: DEFAULT_ATTRIBUTION.to_string(),
            raw: Value::Object(Default::default()),
        }
    }
}

fn default_exempt_prefixes() -> Vec<String> {
    DEFAULT_EXEMPT_PREFIXES
        .iter()
        .map(|prefix| prefix.to_string())
        .collect()
}

// =============================================================================
// Settings Sources
// =============================================================================

/// Source of the current gateway settings.
///
/// The maintenance gate calls [`current_settings`](Self::current_settings) on
/// every request. Implementations must not cache across calls unless they
/// replace their snapshot atomically.
#[async_trait]
pub trait SettingsSource: Send + Sync + 'static {
    /// Read the settings as they are right now.
    async fn current_settings(&self) -> Result<GatewaySettings, SettingsError>;

    /// Human-readable location of the settings (for logging).
    fn identifier(&self) -> String;
}

/// Settings read from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    /// Create a source backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronously load the settings.
    ///
    /// Used once at startup, before the runtime starts accepting connections.
    pub fn load_blocking(&self) -> Result<GatewaySettings, SettingsError> {
        let bytes = std::fs::read(&self.path).map_err(|source| self.read_error(source))?;
        GatewaySettings::from_slice(&bytes).map_err(|source| self.parse_error(source))
    }

    fn read_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Read {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn parse_error(&self, source: serde_json::Error) -> SettingsError {
        SettingsError::Parse {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl SettingsSource for FileSettings {
    async fn current_settings(&self) -> Result<GatewaySettings, SettingsError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.read_error(source))?;
        GatewaySettings::from_slice(&bytes).map_err(|source| self.parse_error(source))
    }

    fn identifier(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory settings, replaced atomically.
///
/// Useful for embedding the gateway and for tests that toggle maintenance.
#[derive(Debug, Default)]
pub struct StaticSettings {
    settings: RwLock<GatewaySettings>,
}

impl StaticSettings {
    /// Create a source holding the given settings.
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Replace the whole snapshot.
    pub async fn replace(&self, settings: GatewaySettings) {
        *self.settings.write().await = settings;
    }

    /// Flip the maintenance flag.
    pub async fn set_maintenance(&self, enabled: bool) {
        self.settings.write().await.maintenance_enabled = enabled;
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn current_settings(&self) -> Result<GatewaySettings, SettingsError> {
        Ok(self.settings.read().await.clone())
    }

    fn identifier(&self) -> String {
        "memory".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
