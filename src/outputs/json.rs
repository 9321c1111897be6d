//! JSON file output.
//!
//! # Output Files
//!
//! ```text
//! data/
//! ├── fetched_sources.json   # `fetch`
//! └── techneme.json          # `techmeme`
//! ```
//!
//! Files are pretty-printed with two-space indentation and keep non-ASCII
//! text as-is, so diffs of the committed data stay readable.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::utils::ensure_writable_dir;

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(dir = %dir.display(), error = %e, "Output directory is not writable");
            return Err(e);
        }
    }

    fs::write(path, json).await?;
    info!("Wrote JSON file");
    Ok(())
}

/// Read JSON from `path`, falling back to `T::default()` when the file does
/// not exist.
pub async fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, Box<dyn Error>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(Box::new(e)),
    }
}
