//! The merge engine: applies decoded translation units onto a target
//! language by item identity, never by position. Per-unit problems are
//! collected in the report; nothing here is fatal.

use courseloc_content::Language;
use courseloc_domain::{MergeReport, MergeWarning, TranslationUnit};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// When false, a non-empty value already present in the target is kept
    /// (preserves manual translations) and the unit is reported as skipped.
    pub replace_existing: bool,
}

enum Slot<'a> {
    Object(&'a mut Map<String, Value>, String),
    Array(&'a mut Vec<Value>, usize),
}

enum Navigate<'a> {
    Found(Slot<'a>),
    /// Intermediate container missing or of the wrong shape; structural
    /// shape is never invented during merge.
    MissingPath(String),
}

fn navigate<'a>(fields: &'a mut Map<String, Value>, path: &str) -> Navigate<'a> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, inner) = match segments.split_last() {
        Some((last, inner)) if !last.is_empty() => (*last, inner),
        _ => return Navigate::MissingPath("empty field path".into()),
    };

    if inner.is_empty() {
        return Navigate::Found(Slot::Object(fields, last.to_string()));
    }

    let mut cursor: &mut Value = match fields.get_mut(inner[0]) {
        Some(value) => value,
        None => return Navigate::MissingPath(format!("segment `{}` does not exist", inner[0])),
    };
    for seg in &inner[1..] {
        cursor = match cursor {
            Value::Object(map) => match map.get_mut(*seg) {
                Some(value) => value,
                None => {
                    return Navigate::MissingPath(format!("segment `{seg}` does not exist"));
                }
            },
            Value::Array(values) => {
                let index = match seg.parse::<usize>() {
                    Ok(index) => index,
                    Err(_) => {
                        return Navigate::MissingPath(format!("`{seg}` indexes into an array"));
                    }
                };
                match values.get_mut(index) {
                    Some(value) => value,
                    None => {
                        return Navigate::MissingPath(format!("array slot {index} does not exist"));
                    }
                }
            }
            _ => {
                return Navigate::MissingPath(format!("`{seg}` is not reachable through a scalar"));
            }
        };
    }

    match cursor {
        Value::Object(map) => Navigate::Found(Slot::Object(map, last.to_string())),
        Value::Array(values) => match last.parse::<usize>() {
            Ok(index) => Navigate::Found(Slot::Array(values, index)),
            Err(_) => Navigate::MissingPath(format!("`{last}` indexes into an array")),
        },
        _ => Navigate::MissingPath(format!("`{last}` is not reachable through a scalar")),
    }
}

fn existing_text(slot: &Slot<'_>) -> Option<String> {
    let value = match slot {
        Slot::Object(map, key) => map.get(key.as_str()),
        Slot::Array(values, index) => values.get(*index),
    };
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn write_slot(slot: Slot<'_>, text: &str) -> Result<(), String> {
    match slot {
        Slot::Object(map, key) => {
            if matches!(map.get(key.as_str()), Some(v) if !v.is_string() && !v.is_null()) {
                return Err(format!("`{key}` holds a non-string value"));
            }
            map.insert(key, Value::String(text.to_string()));
            Ok(())
        }
        Slot::Array(values, index) => {
            if let Some(v) = values.get(index) {
                if !v.is_string() && !v.is_null() {
                    return Err(format!("array slot {index} holds a non-string value"));
                }
            }
            // The unit's path came from the master tree, so the master has
            // this index; padding with empty strings recreates the slot
            // without inventing new shape.
            while values.len() <= index {
                values.push(Value::String(String::new()));
            }
            values[index] = Value::String(text.to_string());
            Ok(())
        }
    }
}

fn warning(kind: &str, unit: &TranslationUnit, message: String) -> MergeWarning {
    MergeWarning {
        kind: kind.to_string(),
        item_id: unit.item_id.clone(),
        field_path: unit.field_path.clone(),
        message,
    }
}

/// Apply `units` onto `lang`. The tree is mutated in place; the report says
/// what happened per unit in aggregate, and the caller decides whether to
/// persist.
pub fn apply(lang: &mut Language, units: &[TranslationUnit], opts: &MergeOptions) -> MergeReport {
    let mut report = MergeReport::default();

    for unit in units {
        let Some(item) = lang.item_mut(&unit.item_id) else {
            report.dangling += 1;
            report.warnings.push(warning(
                "dangling",
                unit,
                format!("item `{}` does not exist in target language", unit.item_id),
            ));
            continue;
        };

        match navigate(&mut item.fields, &unit.field_path) {
            Navigate::MissingPath(message) => {
                report.warnings.push(warning("missing-path", unit, message));
            }
            Navigate::Found(slot) => {
                let existing = existing_text(&slot);
                if !opts.replace_existing
                    && existing.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
                {
                    report.skipped_existing += 1;
                    report.warnings.push(warning(
                        "skipped",
                        unit,
                        "target already holds a non-empty value".into(),
                    ));
                    continue;
                }
                match write_slot(slot, &unit.value) {
                    Ok(()) => report.applied += 1,
                    Err(message) => {
                        report.warnings.push(warning("missing-path", unit, message));
                    }
                }
            }
        }
    }

    debug!(
        "merge into `{}`: {} applied, {} skipped, {} dangling",
        lang.name, report.applied, report.skipped_existing, report.dangling
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseloc_domain::{ContentItem, ItemType};
    use serde_json::json;

    fn item(id: &str, parent: Option<&str>, ty: ItemType, fields: Value) -> ContentItem {
        let fields = match fields {
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

    fn target_language() -> Language {
        Language {
            name: "fr".into(),
            course: item("c1", None, ItemType::Course, json!({"title": ""})),
            content_objects: vec![],
            articles: vec![],
            blocks: vec![item("b1", Some("c1"), ItemType::Block, json!({"body": ""}))],
            components: vec![item(
                "c-txt",
                Some("b1"),
                ItemType::Component,
                json!({"title": "Déjà traduit", "items": [{"text": ""}]}),
            )],
        }
    }

    fn unit(id: &str, ty: ItemType, path: &str, value: &str) -> TranslationUnit {
        TranslationUnit {
            item_id: id.into(),
            item_type: ty,
            field_path: path.into(),
            context: None,
            value: value.into(),
        }
    }

    #[test]
    fn applies_into_empty_target_value() {
        let mut lang = target_language();
        let report = apply(
            &mut lang,
            &[unit("b1", ItemType::Block, "body", "Hello")],
            &MergeOptions::default(),
        );
        assert_eq!(report.applied, 1);
        assert_eq!(lang.item("b1").unwrap().fields.get("body"), Some(&json!("Hello")));
    }

    #[test]
    fn preserves_existing_translation_by_default() {
        let mut lang = target_language();
        let report = apply(
            &mut lang,
            &[unit("c-txt", ItemType::Component, "title", "Text")],
            &MergeOptions::default(),
        );
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(
            lang.item("c-txt").unwrap().fields.get("title"),
            Some(&json!("Déjà traduit"))
        );
        assert_eq!(report.warnings[0].kind, "skipped");
    }

    #[test]
    fn replace_existing_overwrites() {
        let mut lang = target_language();
        let report = apply(
            &mut lang,
            &[unit("c-txt", ItemType::Component, "title", "Texte")],
            &MergeOptions { replace_existing: true },
        );
        assert_eq!(report.applied, 1);
        assert_eq!(lang.item("c-txt").unwrap().fields.get("title"), Some(&json!("Texte")));
    }

    #[test]
    fn dangling_item_leaves_tree_unmodified() {
        let mut lang = target_language();
        let before = lang.clone();
        let report = apply(
            &mut lang,
            &[unit("ghost", ItemType::Block, "body", "Hello")],
            &MergeOptions::default(),
        );
        assert_eq!(report.dangling, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(report.warnings[0].kind, "dangling");
        assert_eq!(lang.item("b1").unwrap(), before.item("b1").unwrap());
    }

    #[test]
    fn nested_array_paths_are_written_by_index() {
        let mut lang = target_language();
        let report = apply(
            &mut lang,
            &[unit("c-txt", ItemType::Component, "items.0.text", "Premier")],
            &MergeOptions::default(),
        );
        assert_eq!(report.applied, 1);
        let items = lang.item("c-txt").unwrap().fields.get("items").unwrap();
        assert_eq!(items[0]["text"], json!("Premier"));
    }

    #[test]
    fn array_tail_is_padded_up_to_master_index() {
        let mut lang = target_language();
        // Master had items.2; target array is shorter.
        lang.item_mut("c-txt").unwrap().fields["items"] = json!(["a", "b"]);
        let report = apply(
            &mut lang,
            &[unit("c-txt", ItemType::Component, "items.3", "Quatre")],
            &MergeOptions::default(),
        );
        assert_eq!(report.applied, 1);
        let items = lang.item("c-txt").unwrap().fields.get("items").unwrap();
        assert_eq!(items.as_array().unwrap().len(), 4);
        assert_eq!(items[2], json!(""));
        assert_eq!(items[3], json!("Quatre"));
    }

    #[test]
    fn missing_intermediate_object_is_a_warning_not_a_write() {
        let mut lang = target_language();
        let report = apply(
            &mut lang,
            &[unit("b1", ItemType::Block, "graphic.alt", "An image")],
            &MergeOptions::default(),
        );
        assert_eq!(report.applied, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, "missing-path");
        assert!(lang.item("b1").unwrap().fields.get("graphic").is_none());
    }
}
