//! Tracker configuration
//!
//! Configuration is read from a TOML file, then selectively overridden by
//! environment variables. Every section has defaults matching the built-in
//! fixture calibration, so an empty file (or no file at all) is valid.
//!
//! ```toml
//! [classifier]
//! dwell_ms = 3000
//!
//! [reference]
//! scale_min = [-505, -521, -620]
//! scale_max = [549, 506, 476]
//!
//! [trigger]
//! backend = "toggl"
//! label_template = "Project {face}"
//!
//! [toggl]
//! api_token = "..."
//! workspace_id = 123
//! project_id = 134612296
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use trackahedron_core::reference::{DEFAULT_FACE_NORMALS, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN};
use trackahedron_core::{ConfigError, DebounceStateMachine, ReferenceTable, ScaleBounds, Vector, DEFAULT_DWELL_MS};

/// Placeholder substituted with the face number in trigger labels
pub const FACE_PLACEHOLDER: &str = "{face}";

/// Nordic UART service advertised by the fixture
pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Nordic UART characteristic carrying sample notifications
pub const NUS_DATA_CHAR_UUID: Uuid = Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Config file could not be read or written
    #[error("Failed to access config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Environment override could not be parsed
    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Classification parameters are unusable
    #[error("Invalid classification config: {0}")]
    Invalid(#[from] ConfigError),

    /// Label template cannot identify faces
    #[error("Label template {0:?} must contain {{face}}")]
    LabelTemplate(String),

    /// Selected trigger backend is missing a required setting
    #[error("Trigger backend {backend:?} requires {setting}")]
    MissingSetting {
        /// Backend name
        backend: TriggerBackend,
        /// Missing setting
        setting: &'static str,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigFileError>;

// ============================================================================
// Sections
// ============================================================================

/// Complete tracker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Debounce parameters
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Reference table calibration
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Trigger selection and labelling
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Toggl back-end settings
    #[serde(default)]
    pub toggl: TogglConfig,

    /// BLE device selection
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Debounce parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Time a face must be held before it is confirmed (ms)
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

/// Reference table calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Raw reading for each face, in face order
    #[serde(default = "default_faces")]
    pub faces: Vec<[f64; 3]>,

    /// Lower per-axis scaling bound
    #[serde(default = "default_scale_min")]
    pub scale_min: [f64; 3],

    /// Upper per-axis scaling bound
    #[serde(default = "default_scale_max")]
    pub scale_max: [f64; 3],
}

/// Which activity trigger receives confirmed faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerBackend {
    /// Log confirmed faces only
    #[default]
    Log,
    /// Start Toggl time entries
    Toggl,
}

/// Trigger selection and labelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Back-end to use
    #[serde(default)]
    pub backend: TriggerBackend,

    /// Label template; `{face}` is replaced with the face number
    #[serde(default = "default_label_template")]
    pub label_template: String,
}

/// Toggl back-end settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TogglConfig {
    /// API token (basic auth user)
    #[serde(default)]
    pub api_token: Option<String>,

    /// Workspace owning the time entries
    #[serde(default)]
    pub workspace_id: Option<u64>,

    /// Project assigned to new time entries
    #[serde(default)]
    pub project_id: Option<u64>,

    /// `created_with` tag sent with each entry
    #[serde(default = "default_created_with")]
    pub created_with: String,

    /// Minimum spacing between API requests (ms)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Retries on rate limiting or transport errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// BLE device selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Connect to the first peripheral whose name contains this string
    #[serde(default)]
    pub name_filter: Option<String>,

    /// Service advertised by the fixture
    #[serde(default = "default_service_uuid")]
    pub service_uuid: Uuid,

    /// Characteristic carrying sample notifications
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: Uuid,

    /// Scan duration in seconds
    #[serde(default = "default_scan_secs")]
    pub scan_secs: u64,
}

// Default value functions
fn default_dwell_ms() -> u64 {
    DEFAULT_DWELL_MS
}

fn default_faces() -> Vec<[f64; 3]> {
    DEFAULT_FACE_NORMALS.iter().map(|v| [v.x, v.y, v.z]).collect()
}

fn default_scale_min() -> [f64; 3] {
    [DEFAULT_SCALE_MIN.x, DEFAULT_SCALE_MIN.y, DEFAULT_SCALE_MIN.z]
}

fn default_scale_max() -> [f64; 3] {
    [DEFAULT_SCALE_MAX.x, DEFAULT_SCALE_MAX.y, DEFAULT_SCALE_MAX.z]
}

fn default_label_template() -> String {
    "Project {face}".to_string()
}

fn default_created_with() -> String {
    "Time Trackahedron".to_string()
}

fn default_throttle_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_url() -> String {
    "https://api.track.toggl.com/api/v9".to_string()
}

fn default_service_uuid() -> Uuid {
    NUS_SERVICE_UUID
}

fn default_characteristic_uuid() -> Uuid {
    NUS_DATA_CHAR_UUID
}

fn default_scan_secs() -> u64 {
    5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { dwell_ms: default_dwell_ms() }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            faces: default_faces(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            backend: TriggerBackend::default(),
            label_template: default_label_template(),
        }
    }
}

impl Default for TogglConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            workspace_id: None,
            project_id: None,
            created_with: default_created_with(),
            throttle_ms: default_throttle_ms(),
            max_retries: default_max_retries(),
            base_url: default_base_url(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name_filter: None,
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
            scan_secs: default_scan_secs(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl TrackerConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::Parse`] on malformed TOML.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with precedence: env vars > config file > defaults,
    /// then validate it.
    ///
    /// An explicitly named file must exist; without one, `trackahedron.toml`
    /// in the working directory is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, an override is malformed,
    /// or validation fails.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with(config_path, |var| std::env::var(var).ok())
    }

    /// [`TrackerConfig::load`] with an arbitrary variable lookup in place of
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`TrackerConfig::load`].
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new("trackahedron.toml");
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::InvalidEnv`] on unparsable numeric values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TRACKAHEDRON_DWELL_MS") {
            self.classifier.dwell_ms = parse_env("TRACKAHEDRON_DWELL_MS", value)?;
        }

        if let Some(token) = lookup("TRACKAHEDRON_TOGGL_TOKEN") {
            self.toggl.api_token = Some(token);
        }

        if let Some(value) = lookup("TRACKAHEDRON_TOGGL_WORKSPACE") {
            self.toggl.workspace_id = Some(parse_env("TRACKAHEDRON_TOGGL_WORKSPACE", value)?);
        }

        if let Some(value) = lookup("TRACKAHEDRON_TOGGL_PROJECT") {
            self.toggl.project_id = Some(parse_env("TRACKAHEDRON_TOGGL_PROJECT", value)?);
        }

        if let Some(name) = lookup("TRACKAHEDRON_DEVICE_NAME") {
            self.device.name_filter = Some(name);
        }

        Ok(())
    }

    /// Check the configuration without building anything long-lived.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.build_table()?;
        self.build_debounce()?;

        if !self.trigger.label_template.contains(FACE_PLACEHOLDER) {
            return Err(ConfigFileError::LabelTemplate(self.trigger.label_template.clone()));
        }

        if self.trigger.backend == TriggerBackend::Toggl {
            let missing = if self.toggl.api_token.as_deref().map_or(true, str::is_empty) {
                Some("toggl.api_token")
            } else if self.toggl.workspace_id.is_none() {
                Some("toggl.workspace_id")
            } else {
                None
            };

            if let Some(setting) = missing {
                return Err(ConfigFileError::MissingSetting {
                    backend: TriggerBackend::Toggl,
                    setting,
                });
            }
        }

        Ok(())
    }

    /// Scaling bounds from the reference section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for non-finite or degenerate bounds.
    pub fn scale_bounds(&self) -> Result<ScaleBounds, ConfigError> {
        ScaleBounds::new(
            vector_from(self.reference.scale_min),
            vector_from(self.reference.scale_max),
        )
    }

    /// Build the reference table described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for bad bounds, bad faces or a face count
    /// other than 12.
    pub fn build_table(&self) -> Result<ReferenceTable, ConfigError> {
        let faces: Vec<Vector> = self.reference.faces.iter().copied().map(vector_from).collect();
        ReferenceTable::from_slice(&faces, self.scale_bounds()?)
    }

    /// Build a fresh debounce state machine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroDwell`] for a zero dwell threshold.
    pub fn build_debounce(&self) -> Result<DebounceStateMachine, ConfigError> {
        DebounceStateMachine::new(self.classifier.dwell_ms)
    }

    /// Render as pretty-printed TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn vector_from([x, y, z]: [f64; 3]) -> Vector {
    Vector::new(x, y, z)
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidEnv { var, value })
}
