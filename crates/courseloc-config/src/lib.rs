use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourselocConfig {
    pub master_lang: Option<String>,
    pub target_lang: Option<String>,
    /// Item type that receives tracking ids (default "block").
    pub tracking_type: Option<String>,
    pub schema: Option<SchemaCfg>,
    pub export: Option<ExportCfg>,
    pub import: Option<ImportCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaCfg {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportCfg {
    pub format: Option<String>,
    pub delimiter: Option<String>,
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportCfg {
    pub replace_existing: Option<bool>,
    pub backup: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Other(String),
}

/// Search order: CWD/courseloc.toml, then $CONFIG_DIR/courseloc/courseloc.toml.
/// Earlier layers win field by field.
pub fn load_config() -> Result<CourselocConfig, ConfigError> {
    let mut merged = CourselocConfig::default();
    if let Ok(cwd) = std::env::current_dir() {
        merged = merge(merged, load_file(&cwd.join("courseloc.toml")));
    }
    if let Some(base) = dirs::config_dir() {
        merged = merge(merged, load_file(&base.join("courseloc").join("courseloc.toml")));
    }
    Ok(merged)
}

fn load_file(path: &Path) -> CourselocConfig {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str(&s).ok())
        .unwrap_or_default()
}

fn merge(mut a: CourselocConfig, b: CourselocConfig) -> CourselocConfig {
    if a.master_lang.is_none() {
        a.master_lang = b.master_lang;
    }
    if a.target_lang.is_none() {
        a.target_lang = b.target_lang;
    }
    if a.tracking_type.is_none() {
        a.tracking_type = b.tracking_type;
    }
    a.schema = merge_opt(a.schema, b.schema, merge_schema);
    a.export = merge_opt(a.export, b.export, merge_export);
    a.import = merge_opt(a.import, b.import, merge_import);
    a
}

fn merge_opt<T: Default>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_schema(mut a: SchemaCfg, b: SchemaCfg) -> SchemaCfg {
    if a.path.is_none() {
        a.path = b.path;
    }
    a
}

fn merge_export(mut a: ExportCfg, b: ExportCfg) -> ExportCfg {
    if a.format.is_none() {
        a.format = b.format;
    }
    if a.delimiter.is_none() {
        a.delimiter = b.delimiter;
    }
    if a.out_dir.is_none() {
        a.out_dir = b.out_dir;
    }
    a
}

fn merge_import(mut a: ImportCfg, b: ImportCfg) -> ImportCfg {
    if a.replace_existing.is_none() {
        a.replace_existing = b.replace_existing;
    }
    if a.backup.is_none() {
        a.backup = b.backup;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_layer_wins_field_by_field() {
        let cwd: CourselocConfig = toml::from_str(
            r#"
            master_lang = "en"
            [export]
            format = "xliff"
            "#,
        )
        .unwrap();
        let user: CourselocConfig = toml::from_str(
            r#"
            master_lang = "de"
            target_lang = "fr"
            [export]
            format = "csv"
            out_dir = "exports"
            "#,
        )
        .unwrap();

        let merged = merge(cwd, user);
        assert_eq!(merged.master_lang.as_deref(), Some("en"));
        assert_eq!(merged.target_lang.as_deref(), Some("fr"));
        let export = merged.export.unwrap();
        assert_eq!(export.format.as_deref(), Some("xliff"));
        assert_eq!(export.out_dir.as_deref(), Some("exports"));
    }
}
