//! The translatable walker: turns one language's tree into a flat, ordered
//! sequence of translation units, guided by the schema index.

use courseloc_content::Language;
use courseloc_domain::{ContentItem, TranslationUnit};
use courseloc_schema::SchemaIndex;
use serde_json::Value;
use tracing::debug;

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn visit_value(
    item: &ContentItem,
    context: &Option<String>,
    schema: &dyn SchemaIndex,
    path: &str,
    value: &Value,
    out: &mut Vec<TranslationUnit>,
) {
    match value {
        Value::String(s) => {
            // Empty strings carry nothing to translate.
            if !s.is_empty() && schema.is_translatable(item.item_type, path) {
                out.push(TranslationUnit {
                    item_id: item.id.clone(),
                    item_type: item.item_type,
                    field_path: path.to_string(),
                    context: context.clone(),
                    value: s.clone(),
                });
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                visit_value(item, context, schema, &join_path(path, key), nested, out);
            }
        }
        Value::Array(values) => {
            for (index, nested) in values.iter().enumerate() {
                let seg = index.to_string();
                visit_value(item, context, schema, &join_path(path, &seg), nested, out);
            }
        }
        // Opaque scalar leaves: nothing translatable below.
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Extract every translatable, non-empty string of `lang` in stable
/// pre-order. The returned order is the export order for all interchange
/// formats; `(item_id, field_path)` never repeats.
pub fn extract(lang: &Language, schema: &dyn SchemaIndex) -> Vec<TranslationUnit> {
    let mut out = Vec::new();
    for item in lang.preorder() {
        let context = item.context_title();
        for (key, value) in &item.fields {
            visit_value(item, &context, schema, key, value, &mut out);
        }
    }
    debug!("extracted {} units from `{}`", out.len(), lang.name);
    out
}
