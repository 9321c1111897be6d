//! Repository layout and source configuration loading.
//!
//! Every job works relative to a single root directory:
//!
//! ```text
//! root/
//! ├── sources.json            # or sources.yaml / sources.yml
//! ├── template.html
//! ├── index.html
//! ├── data/
//! │   ├── fetched_sources.json
//! │   ├── daily.json
//! │   └── techneme.json
//! └── archive/
//!     └── YYYY-MM-DD.html
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::SourcesConfig;

/// Conventional paths under the repository root.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `sources.json`, unless only a YAML variant exists.
    pub fn sources_path(&self) -> PathBuf {
        let json = self.root.join("sources.json");
        if json.exists() {
            return json;
        }
        ["sources.yaml", "sources.yml"]
            .iter()
            .map(|name| self.root.join(name))
            .find(|p| p.exists())
            .unwrap_or(json)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn fetched_sources_path(&self) -> PathBuf {
        self.data_dir().join("fetched_sources.json")
    }

    pub fn daily_path(&self) -> PathBuf {
        self.data_dir().join("daily.json")
    }

    pub fn techmeme_path(&self) -> PathBuf {
        self.data_dir().join("techneme.json")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    pub fn archive_page(&self, date: &str) -> PathBuf {
        self.archive_dir().join(format!("{date}.html"))
    }

    pub fn template_path(&self) -> PathBuf {
        self.root.join("template.html")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.html")
    }
}

/// Load the fetch configuration, choosing the parser from the file extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match
/// [`SourcesConfig`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources(path: &Path) -> Result<SourcesConfig, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let config = parse_sources(&raw, path)?;
    info!(count = config.sources.len(), "Loaded source configuration");
    Ok(config)
}

fn parse_sources(raw: &str, path: &Path) -> Result<SourcesConfig, Box<dyn Error>> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(raw)?)
    } else {
        Ok(serde_json::from_str(raw)?)
    }
}
