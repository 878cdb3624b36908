use crate::{ExportFormat, JSON_BUNDLE_FILE, XLIFF_FILE};
use courseloc_content::write_atomic;
use courseloc_core::Result;
use courseloc_domain::ExportStats;
use courseloc_schema::SchemaIndex;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Delimiter for the delimited-text variant.
    pub delimiter: u8,
    /// Locale the export is destined for; recorded in the XLIFF header.
    pub target_lang: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            format: ExportFormat::Csv,
            delimiter: courseloc_codec_csv::DEFAULT_DELIMITER,
            target_lang: String::new(),
        }
    }
}

/// Extract the master language and write the interchange file(s) under
/// `out_dir`. Everything is encoded in memory before the first write, so an
/// aborted export never leaves a half-written file behind.
pub fn export_language(
    course_root: &Path,
    lang_name: &str,
    schema: &dyn SchemaIndex,
    out_dir: &Path,
    opts: &ExportOptions,
) -> Result<ExportStats> {
    let lang = courseloc_content::load_language(course_root, lang_name)?;
    let units = courseloc_extract::extract(&lang, schema);

    let mut stats = ExportStats {
        units: units.len(),
        files: Vec::new(),
    };

    match opts.format {
        ExportFormat::Csv => {
            for (ty, bytes) in courseloc_codec_csv::encode_with(&units, opts.delimiter)? {
                let path = out_dir.join(format!("{ty}.csv"));
                write_atomic(&path, &bytes)?;
                stats.files.push(path.display().to_string());
            }
        }
        ExportFormat::Json => {
            let text = courseloc_codec_json::encode(&units)?;
            let path = out_dir.join(JSON_BUNDLE_FILE);
            write_atomic(&path, text.as_bytes())?;
            stats.files.push(path.display().to_string());
        }
        ExportFormat::Xliff => {
            let text = courseloc_codec_xliff::encode(&units, lang_name, &opts.target_lang)?;
            let path = out_dir.join(XLIFF_FILE);
            write_atomic(&path, text.as_bytes())?;
            stats.files.push(path.display().to_string());
        }
    }

    info!(
        "exported {} units from `{}` as {} ({} file(s))",
        stats.units,
        lang_name,
        opts.format,
        stats.files.len()
    );
    Ok(stats)
}
