//! Renderer configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default renderer executable.
pub const DEFAULT_RENDERER: &str = "wkhtmltopdf";

/// Default virtual-display wrapper executable.
pub const DEFAULT_DISPLAY_WRAPPER: &str = "xvfb-run";

/// Environment variable overriding the renderer path.
pub const ENV_RENDERER: &str = "WKHTMLTOPDF_PATH";
/// Environment variable overriding the display wrapper (empty disables it).
pub const ENV_DISPLAY_WRAPPER: &str = "WKPDF_DISPLAY_WRAPPER";
/// Environment variable overriding the temp directory root.
pub const ENV_TEMP_DIR: &str = "WKPDF_TEMP_DIR";
/// Environment variable setting the render timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "WKPDF_TIMEOUT_SECS";

/// Where the external executables live and how to run them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Renderer executable (name on PATH or full path)
    pub renderer: PathBuf,

    /// Virtual-display wrapper used when the direct run fails (None = no fallback)
    pub display_wrapper: Option<PathBuf>,

    /// Arguments given to the wrapper before the renderer name
    pub wrapper_args: Vec<String>,

    /// Directory under which temp page directories are created
    pub temp_root: PathBuf,

    /// Kill the renderer if it runs longer than this
    #[serde(with = "timeout_secs")]
    pub timeout: Option<Duration>,

    /// Reject successful runs whose output is not a PDF
    pub verify_output: bool,
}

impl RendererConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `WKHTMLTOPDF_PATH`, `WKPDF_DISPLAY_WRAPPER`,
    /// `WKPDF_TEMP_DIR` and `WKPDF_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(renderer) = lookup(ENV_RENDERER).filter(|v| !v.is_empty()) {
            config.renderer = PathBuf::from(renderer);
        }
        if let Some(wrapper) = lookup(ENV_DISPLAY_WRAPPER) {
            config.display_wrapper = if wrapper.is_empty() {
                None
            } else {
                Some(PathBuf::from(wrapper))
            };
        }
        if let Some(root) = lookup(ENV_TEMP_DIR).filter(|v| !v.is_empty()) {
            config.temp_root = PathBuf::from(root);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be whole seconds: {}", ENV_TIMEOUT_SECS, secs))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Parse a JSON configuration; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Set the renderer executable.
    pub fn with_renderer(mut self, renderer: impl Into<PathBuf>) -> Self {
        self.renderer = renderer.into();
        self
    }

    /// Set the display wrapper executable.
    pub fn with_display_wrapper(mut self, wrapper: impl Into<PathBuf>) -> Self {
        self.display_wrapper = Some(wrapper.into());
        self
    }

    /// Disable the display-wrapped fallback.
    pub fn without_display_wrapper(mut self) -> Self {
        self.display_wrapper = None;
        self
    }

    /// Set arguments passed to the wrapper ahead of the renderer name.
    pub fn with_wrapper_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wrapper_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the temp directory root.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Set the render timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable PDF header verification.
    pub fn with_verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            renderer: PathBuf::from(DEFAULT_RENDERER),
            display_wrapper: Some(PathBuf::from(DEFAULT_DISPLAY_WRAPPER)),
            wrapper_args: Vec::new(),
            temp_root: std::env::temp_dir(),
            timeout: None,
            verify_output: true,
        }
    }
}

mod timeout_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs_f64()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        match secs {
            Some(s) => Duration::try_from_secs_f64(s)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid timeout {}: {}", s, e))),
            None => Ok(None),
        }
    }
}
