//! The consumed schema capability: per item type, which field paths carry
//! translatable text and which default values apply. Schema composition
//! (base/extension/plugin resolution) happens before this crate sees the
//! data; here a resolved description is all there is.

use courseloc_content::Language;
use courseloc_core::{CourselocError, Result};
use courseloc_domain::ItemType;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Deterministic per-field capability lookup. Fields not described by any
/// schema are non-translatable (fail-closed).
pub trait SchemaIndex {
    fn is_translatable(&self, item_type: ItemType, field_path: &str) -> bool;
    fn defaults_for(&self, item_type: ItemType) -> Map<String, Value>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TypeSchema {
    #[serde(default)]
    translatable: Vec<String>,
    #[serde(default)]
    defaults: Map<String, Value>,
}

/// File-backed `SchemaIndex`. The on-disk shape is one JSON object keyed by
/// item type:
///
/// ```json
/// { "block": { "translatable": ["title", "body", "items.text"],
///              "defaults": { "title": "" } } }
/// ```
///
/// Array indices never appear in schema paths; numeric segments of a queried
/// path are skipped during matching, so `items.0.text` resolves through
/// `items.text`.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaIndex {
    translatable: HashMap<ItemType, HashSet<String>>,
    defaults: HashMap<ItemType, Map<String, Value>>,
}

impl StaticSchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one resolved schema document into the index. When several
    /// documents describe the same type, translatable sets union and later
    /// defaults win key-by-key (last-loaded wins).
    pub fn merge_document(&mut self, doc: HashMap<ItemType, Value>) -> Result<()> {
        for (ty, raw) in doc {
            let schema: TypeSchema = serde_json::from_value(raw)
                .map_err(|e| CourselocError::Other(format!("bad schema for `{ty}`: {e}")))?;
            let set = self.translatable.entry(ty).or_default();
            for path in schema.translatable {
                set.insert(path);
            }
            let defaults = self.defaults.entry(ty).or_default();
            for (k, v) in schema.defaults {
                defaults.insert(k, v);
            }
        }
        Ok(())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let mut index = StaticSchemaIndex::new();
        index.merge_file(path)?;
        Ok(index)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)?;
        let doc: HashMap<ItemType, Value> = serde_json::from_str(&text).map_err(|e| {
            CourselocError::format(path.display().to_string(), format!("invalid schema: {e}"))
        })?;
        debug!("merged schema file {}", path.display());
        self.merge_document(doc)
    }

    /// Load every `.json` file of a directory in name order. Order matters:
    /// later files override earlier defaults.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();
        let mut index = StaticSchemaIndex::new();
        for file in files {
            index.merge_file(&file)?;
        }
        Ok(index)
    }
}

/// Drop purely numeric segments so array indices match index-free schema
/// paths.
fn normalize_path(field_path: &str) -> String {
    field_path
        .split('.')
        .filter(|seg| !seg.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(".")
}

impl SchemaIndex for StaticSchemaIndex {
    fn is_translatable(&self, item_type: ItemType, field_path: &str) -> bool {
        let normalized = normalize_path(field_path);
        self.translatable
            .get(&item_type)
            .map(|set| set.contains(&normalized))
            .unwrap_or(false)
    }

    fn defaults_for(&self, item_type: ItemType) -> Map<String, Value> {
        self.defaults.get(&item_type).cloned().unwrap_or_default()
    }
}

fn fill_gaps(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, dv) in defaults {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), dv.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = dv {
                    fill_gaps(existing, nested);
                }
            }
            Some(_) => {} // existing scalar/array wins, defaults never overwrite
        }
    }
}

/// Apply schema defaults to every item of a language. Fills gaps only;
/// existing values are never removed or replaced.
pub fn apply_defaults(lang: &mut Language, schema: &dyn SchemaIndex) {
    for item in lang.all_items_mut() {
        let defaults = schema.defaults_for(item.item_type);
        if !defaults.is_empty() {
            fill_gaps(&mut item.fields, &defaults);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn demo_index() -> StaticSchemaIndex {
        let mut index = StaticSchemaIndex::new();
        let doc: HashMap<ItemType, Value> = serde_json::from_value(json!({
            "course": { "translatable": ["title"] },
            "page": { "translatable": ["title"] },
            "block": { "translatable": ["body", "title"], "defaults": { "title": "", "classes": "" } },
            "component": { "translatable": ["title", "items.text"] }
        }))
        .unwrap();
        index.merge_document(doc).unwrap();
        index
    }

    #[test]
    fn unknown_fields_are_fail_closed() {
        let index = demo_index();
        assert!(index.is_translatable(ItemType::Block, "body"));
        assert!(!index.is_translatable(ItemType::Block, "instruction"));
        assert!(!index.is_translatable(ItemType::Article, "body"));
    }

    #[test]
    fn numeric_segments_are_ignored_in_lookup() {
        let index = demo_index();
        assert!(index.is_translatable(ItemType::Component, "items.0.text"));
        assert!(index.is_translatable(ItemType::Component, "items.12.text"));
        assert!(!index.is_translatable(ItemType::Component, "items.0.url"));
    }

    #[test]
    fn later_documents_win_on_defaults() {
        let mut index = demo_index();
        let doc: HashMap<ItemType, Value> = serde_json::from_value(json!({
            "block": { "translatable": ["instruction"], "defaults": { "classes": "block" } }
        }))
        .unwrap();
        index.merge_document(doc).unwrap();
        // union of translatable sets
        assert!(index.is_translatable(ItemType::Block, "body"));
        assert!(index.is_translatable(ItemType::Block, "instruction"));
        // last-loaded default wins
        assert_eq!(index.defaults_for(ItemType::Block).get("classes"), Some(&json!("block")));
    }

    #[test]
    fn defaults_fill_gaps_without_overwriting() {
        use courseloc_content::Language;
        use courseloc_domain::ContentItem;

        let mut lang = Language {
            name: "en".into(),
            course: ContentItem {
                id: "c1".into(),
                parent_id: None,
                item_type: ItemType::Course,
                tracking_id: None,
                fields: Map::new(),
            },
            content_objects: vec![],
            articles: vec![],
            blocks: vec![ContentItem {
                id: "b1".into(),
                parent_id: Some("c1".into()),
                item_type: ItemType::Block,
                tracking_id: None,
                fields: serde_json::from_value(json!({"title": "Kept"})).unwrap(),
            }],
            components: vec![],
        };

        apply_defaults(&mut lang, &demo_index());
        let b1 = lang.item("b1").unwrap();
        assert_eq!(b1.fields.get("title"), Some(&json!("Kept")));
        assert_eq!(b1.fields.get("classes"), Some(&json!("")));
    }

    #[test]
    fn load_dir_merges_in_name_order() -> courseloc_core::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("00-base.json"),
            r#"{ "block": { "translatable": ["body"], "defaults": { "classes": "a" } } }"#,
        )?;
        fs::write(
            dir.path().join("10-extension.json"),
            r#"{ "block": { "defaults": { "classes": "b" } } }"#,
        )?;
        let index = StaticSchemaIndex::load_dir(dir.path())?;
        assert!(index.is_translatable(ItemType::Block, "body"));
        assert_eq!(index.defaults_for(ItemType::Block).get("classes"), Some(&json!("b")));
        Ok(())
    }
}
