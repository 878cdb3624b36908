//! High-level orchestration layer over the lower-level crates.
//! Intentionally thin: exposes stable functions used by the CLI.

use std::fmt;
use std::str::FromStr;

pub use courseloc_content::{load_language, save_language, Language};
pub use courseloc_domain::{ExportStats, MergeReport};
pub use courseloc_merge::MergeOptions;

pub mod export;
pub mod import;
pub mod util;

pub use export::{export_language, ExportOptions};
pub use import::{import_language, ImportOptions, ImportOutcome};

/// File name of the single-JSON-bundle export.
pub const JSON_BUNDLE_FILE: &str = "export.json";
/// File name of the XLIFF export.
pub const XLIFF_FILE: &str = "source.xlf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xliff,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xliff => "xliff",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xliff" => Ok(ExportFormat::Xliff),
            other => Err(format!("unknown export format `{other}`")),
        }
    }
}
