use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub pandoc: PandocConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub pages: PathBuf,
    pub build: PathBuf,
    pub templates: PathBuf,
    pub styles: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pages: PathBuf::from("pages"),
            build: PathBuf::from("build"),
            templates: PathBuf::from("templates"),
            styles: PathBuf::from("styles"),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PandocConfig {
    pub program: String,
    /// Input format passed to `pandoc -f`. Heading identifiers are turned
    /// off because headings with attributes are rejected.
    pub from: String,
    /// Extension of source documents handed to pandoc
    pub extension: String,
    /// Also treat `*.json` files under the pages directory as pandoc JSON
    /// documents. Off by default, since any other JSON file there would
    /// fail to convert.
    pub json_sources: bool,
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            from: "org-auto_identifiers".to_string(),
            extension: "org".to_string(),
            json_sources: false,
        }
    }
}

/// What to do when a single document fails to convert
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub page_template: String,
    pub index_template: String,
    pub on_error: ErrorPolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Home".to_string(),
            page_template: "page.html".to_string(),
            index_template: "index.html".to_string(),
            on_error: ErrorPolicy::Abort,
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
