use crate::{util::backup_file, ExportFormat, JSON_BUNDLE_FILE, XLIFF_FILE};
use courseloc_core::{CourselocError, Result};
use courseloc_domain::{ItemType, MergeReport, TranslationUnit};
use courseloc_merge::MergeOptions;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub format: ExportFormat,
    /// Explicit delimiter for delimited text; auto-detected when `None`.
    pub delimiter: Option<u8>,
    pub replace_existing: bool,
    /// Decode and merge in memory, report, but do not persist.
    pub dry_run: bool,
    /// Copy each collection file to `<name>.bak` before saving.
    pub backup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub report: MergeReport,
    /// Per-unit decode issues (e.g. uninvertible XLIFF ids); the affected
    /// units were skipped, the rest of the file imported.
    pub unit_warnings: Vec<String>,
}

fn decode_csv_file(path: &Path, ty: ItemType, delimiter: Option<u8>) -> Result<Vec<TranslationUnit>> {
    let bytes = fs::read(path)?;
    courseloc_codec_csv::decode(&bytes, ty, delimiter, &path.display().to_string())
}

fn decode_input(input: &Path, opts: &ImportOptions) -> Result<(Vec<TranslationUnit>, Vec<String>)> {
    match opts.format {
        ExportFormat::Csv => {
            let mut units = Vec::new();
            if input.is_dir() {
                for ty in ItemType::ALL {
                    let path = input.join(format!("{ty}.csv"));
                    if path.exists() {
                        debug!("decoding {}", path.display());
                        units.extend(decode_csv_file(&path, ty, opts.delimiter)?);
                    }
                }
            } else {
                let ty: ItemType = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .parse()
                    .map_err(|e: String| CourselocError::format(input.display().to_string(), e))?;
                units.extend(decode_csv_file(input, ty, opts.delimiter)?);
            }
            Ok((units, Vec::new()))
        }
        ExportFormat::Json => {
            let path = if input.is_dir() { input.join(JSON_BUNDLE_FILE) } else { input.to_path_buf() };
            let text = fs::read_to_string(&path)?;
            let units = courseloc_codec_json::decode(&text, &path.display().to_string())?;
            Ok((units, Vec::new()))
        }
        ExportFormat::Xliff => {
            let path = if input.is_dir() { input.join(XLIFF_FILE) } else { input.to_path_buf() };
            let text = fs::read_to_string(&path)?;
            let decoded = courseloc_codec_xliff::decode(&text, &path.display().to_string())?;
            Ok((decoded.units, decoded.warnings))
        }
    }
}

/// Decode the interchange file(s) at `input` and merge them into the target
/// language under `course_root`. Persists only when the merge succeeded and
/// `dry_run` is off; the caller reads the report to decide what to do with
/// skipped and dangling units.
pub fn import_language(
    course_root: &Path,
    lang_name: &str,
    input: &Path,
    opts: &ImportOptions,
) -> Result<ImportOutcome> {
    let (units, unit_warnings) = decode_input(input, opts)?;
    debug!("decoded {} units from {}", units.len(), input.display());

    let mut lang = courseloc_content::load_language(course_root, lang_name)?;
    let report = courseloc_merge::apply(
        &mut lang,
        &units,
        &MergeOptions {
            replace_existing: opts.replace_existing,
        },
    );

    if opts.dry_run {
        info!(
            "dry-run import into `{}`: {} would apply, {} skipped, {} dangling",
            lang_name, report.applied, report.skipped_existing, report.dangling
        );
        return Ok(ImportOutcome { report, unit_warnings });
    }

    if opts.backup {
        let dir = course_root.join(lang_name);
        for name in [
            courseloc_content::COURSE_FILE,
            courseloc_content::CONTENT_OBJECTS_FILE,
            courseloc_content::ARTICLES_FILE,
            courseloc_content::BLOCKS_FILE,
            courseloc_content::COMPONENTS_FILE,
        ] {
            backup_file(&dir.join(name))?;
        }
    }

    courseloc_content::save_language(course_root, &lang)?;
    info!(
        "imported into `{}`: {} applied, {} skipped, {} dangling",
        lang_name, report.applied, report.skipped_existing, report.dangling
    );
    Ok(ImportOutcome { report, unit_warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export_language, ExportOptions};
    use courseloc_content::{save_language, Language};
    use courseloc_domain::ContentItem;
    use courseloc_schema::StaticSchemaIndex;
    use serde_json::{json, Map, Value};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn item(id: &str, parent: Option<&str>, ty: ItemType, fields: Value) -> ContentItem {
        let fields: Map<String, Value> = match fields {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        ContentItem {
            id: id.into(),
            parent_id: parent.map(|p| p.into()),
            item_type: ty,
            tracking_id: None,
            fields,
        }
    }

    fn master() -> Language {
        Language {
            name: "en".into(),
            course: item("c1", None, ItemType::Course, json!({"title": "Demo"})),
            content_objects: vec![],
            articles: vec![],
            blocks: vec![item("b1", Some("c1"), ItemType::Block, json!({"body": "Hello"}))],
            components: vec![],
        }
    }

    fn target() -> Language {
        let mut t = courseloc_content::copy_language(&master(), "fr");
        for i in t.all_items_mut() {
            for (_, v) in i.fields.iter_mut() {
                if v.is_string() {
                    *v = json!("");
                }
            }
        }
        t
    }

    fn schema() -> StaticSchemaIndex {
        let mut index = StaticSchemaIndex::new();
        let doc: HashMap<ItemType, Value> = serde_json::from_value(json!({
            "course": { "translatable": ["title"] },
            "block": { "translatable": ["body"] }
        }))
        .unwrap();
        index.merge_document(doc).unwrap();
        index
    }

    fn round_trip(format: ExportFormat) -> courseloc_core::Result<()> {
        let root = tempdir()?;
        let out = tempdir()?;
        save_language(root.path(), &master())?;
        save_language(root.path(), &target())?;

        let stats = export_language(
            root.path(),
            "en",
            &schema(),
            out.path(),
            &ExportOptions {
                format,
                target_lang: "fr".into(),
                ..ExportOptions::default()
            },
        )?;
        assert_eq!(stats.units, 2);

        let outcome = import_language(
            root.path(),
            "fr",
            out.path(),
            &ImportOptions {
                format,
                ..ImportOptions::default()
            },
        )?;
        assert_eq!(outcome.report.applied, 2, "format {format}: {:?}", outcome.report);
        assert!(outcome.unit_warnings.is_empty());

        let fr = courseloc_content::load_language(root.path(), "fr")?;
        assert_eq!(fr.item("b1").unwrap().fields.get("body"), Some(&json!("Hello")));
        assert_eq!(fr.course.fields.get("title"), Some(&json!("Demo")));
        Ok(())
    }

    #[test]
    fn csv_export_import_round_trip() -> courseloc_core::Result<()> {
        round_trip(ExportFormat::Csv)
    }

    #[test]
    fn json_export_import_round_trip() -> courseloc_core::Result<()> {
        round_trip(ExportFormat::Json)
    }

    #[test]
    fn xliff_export_import_round_trip() -> courseloc_core::Result<()> {
        round_trip(ExportFormat::Xliff)
    }

    #[test]
    fn dry_run_does_not_persist() -> courseloc_core::Result<()> {
        let root = tempdir()?;
        let out = tempdir()?;
        save_language(root.path(), &master())?;
        save_language(root.path(), &target())?;
        export_language(
            root.path(),
            "en",
            &schema(),
            out.path(),
            &ExportOptions { format: ExportFormat::Json, ..ExportOptions::default() },
        )?;

        let outcome = import_language(
            root.path(),
            "fr",
            out.path(),
            &ImportOptions { format: ExportFormat::Json, dry_run: true, ..ImportOptions::default() },
        )?;
        assert_eq!(outcome.report.applied, 2);

        let fr = courseloc_content::load_language(root.path(), "fr")?;
        assert_eq!(fr.item("b1").unwrap().fields.get("body"), Some(&json!("")));
        Ok(())
    }

    #[test]
    fn backup_copies_collections_before_save() -> courseloc_core::Result<()> {
        let root = tempdir()?;
        let out = tempdir()?;
        save_language(root.path(), &master())?;
        save_language(root.path(), &target())?;
        export_language(
            root.path(),
            "en",
            &schema(),
            out.path(),
            &ExportOptions { format: ExportFormat::Json, ..ExportOptions::default() },
        )?;
        import_language(
            root.path(),
            "fr",
            out.path(),
            &ImportOptions { format: ExportFormat::Json, backup: true, ..ImportOptions::default() },
        )?;
        assert!(root.path().join("fr").join("blocks.json.bak").exists());
        Ok(())
    }
}
