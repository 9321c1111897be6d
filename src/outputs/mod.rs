//! Files written by the pipeline.
//!
//! # Submodules
//!
//! - [`json`]: pretty JSON data files (`fetched_sources.json`, `techneme.json`)
//! - [`html`]: the daily HTML page and its homepage copy
//! - [`archive`]: archive discovery and navigation markup
//!
//! # Output Structure
//!
//! ```text
//! <root>/
//! ├── data/
//! │   ├── fetched_sources.json
//! │   ├── daily.json           # curated by hand, read only
//! │   └── techneme.json
//! ├── archive/
//! │   ├── 2026-02-13.html
//! │   └── 2026-02-14.html
//! └── index.html               # copy of the newest page
//! ```

pub mod archive;
pub mod html;
pub mod json;
