//! Daemon configuration.
//!
//! Loaded from an optional TOML file. Every field has a default, so an empty
//! file (or no file) gives the demo roster and a Letter-size PDF export.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub institution: InstitutionConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub roster: RosterConfig,

    /// Directory relative asset and roster paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Text and images printed in the marksheet header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionConfig {
    #[serde(default = "default_institution_name")]
    pub name: String,

    #[serde(default = "default_exam_name")]
    pub exam: String,

    /// Asset reference: path, `file://` URL or `data:` URL.
    #[serde(default)]
    pub logo: Option<String>,

    #[serde(default)]
    pub background: Option<String>,
}

fn default_institution_name() -> String {
    "College Name".to_string()
}

fn default_exam_name() -> String {
    "Examination".to_string()
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            name: default_institution_name(),
            exam: default_exam_name(),
            logo: None,
            background: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Pdf,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// Width and height in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (215.9, 279.4),
            PageSize::A4 => (210.0, 297.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// When false the backend renders no tables and exports are refused.
    #[serde(default = "default_true")]
    pub table_layout: bool,

    #[serde(default)]
    pub page_size: PageSize,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            table_layout: true,
            page_size: PageSize::default(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// JSON array of student records. The demo roster is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.export.output_dir)
    }
}
