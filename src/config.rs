//! Engine tunables, loaded from YAML.
//!
//! Every field has a default, so an empty document (or no file at all) gives
//! a working configuration:
//!
//! ```yaml
//! selection:
//!   policy: auto
//! automation:
//!   call_timeout_ms: 30000
//!   connect_timeout_ms: 10000
//! limits:
//!   max_rows: 1000
//!   max_cols: 100
//!   max_font_size: 4096.0
//! document:
//!   font_family: 함초롬바탕
//!   font_size: 10.0
//!   alignment: justify
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::document::Alignment;

/// How [`BackendSelector`](crate::backend::BackendSelector) binds a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Use the host only when a host-only operation is required and the host
    /// is reachable.
    #[default]
    Auto,
    /// Use the host whenever it is reachable.
    PreferAutomation,
    /// Never contact the host.
    DirectOnly,
    /// Fail selection when the host is unreachable.
    AutomationOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: SelectionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Budget for one host round trip. Zero disables the timeout.
    pub call_timeout_ms: u64,
    /// Budget for establishing or attaching to a host session.
    pub connect_timeout_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl AutomationConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

/// Bounds enforced on caller arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_rows: usize,
    pub max_cols: usize,
    /// Largest accepted font size, in points.
    pub max_font_size: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            max_cols: 100,
            max_font_size: 4096.0,
        }
    }
}

/// Formatting of documents made by `createNew`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDefaults {
    pub font_family: String,
    /// Points.
    pub font_size: f32,
    pub alignment: Alignment,
}

impl Default for DocumentDefaults {
    fn default() -> Self {
        Self {
            font_family: "함초롬바탕".to_string(),
            font_size: 10.0,
            alignment: Alignment::Justify,
        }
    }
}

/// All engine tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub selection: SelectionConfig,
    pub automation: AutomationConfig,
    pub limits: Limits,
    pub document: DocumentDefaults,
}

impl EngineConfig {
    /// Parse a YAML document. Empty input gives the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_saphyr::from_str(text).map_err(|e| Error::Config(format!("invalid YAML: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).map_err(|e| Error::Config(format!("cannot serialize: {e}")))
    }

    fn check(&self) -> Result<()> {
        if self.limits.max_rows == 0 || self.limits.max_cols == 0 {
            return Err(Error::Config("table limits must be positive".to_string()));
        }
        if !(self.limits.max_font_size > 0.0) {
            return Err(Error::Config("max_font_size must be positive".to_string()));
        }
        let size = self.document.font_size;
        if !(size > 0.0 && size <= self.limits.max_font_size) {
            return Err(Error::Config(format!(
                "default font size {size} is outside (0, {}]",
                self.limits.max_font_size
            )));
        }
        if self.document.font_family.trim().is_empty() {
            return Err(Error::Config("default font family is empty".to_string()));
        }
        Ok(())
    }
}
