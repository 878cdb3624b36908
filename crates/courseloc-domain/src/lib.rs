use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const SCHEMA_VERSION: u32 = 1;

/// The fixed set of content node kinds, top of the tree first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Course,
    Menu,
    Page,
    Article,
    Block,
    Component,
}

impl ItemType {
    pub const ALL: [ItemType; 6] = [
        ItemType::Course,
        ItemType::Menu,
        ItemType::Page,
        ItemType::Article,
        ItemType::Block,
        ItemType::Component,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Course => "course",
            ItemType::Menu => "menu",
            ItemType::Page => "page",
            ItemType::Article => "article",
            ItemType::Block => "block",
            ItemType::Component => "component",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown item type `{s}`"))
    }
}

/// One node of a localized content tree, as stored on disk.
///
/// The underscore-prefixed identity fields are lifted into struct fields;
/// everything else stays in the open `fields` map, including nested objects
/// and arrays that may carry translatable strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "_type")]
    pub item_type: ItemType,
    #[serde(rename = "_trackingId", default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<u32>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    /// Human-readable locator for translators, best-effort.
    pub fn context_title(&self) -> Option<String> {
        for key in ["title", "displayTitle"] {
            if let Some(Value::String(s)) = self.fields.get(key) {
                if !s.trim().is_empty() {
                    return Some(s.clone());
                }
            }
        }
        None
    }
}

/// The interchange atom moved between a content tree and an export file.
/// `(item_id, field_path)` is unique within one export; export order is the
/// stable pre-order traversal order of the source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUnit {
    pub item_id: String,
    pub item_type: ItemType,
    pub field_path: String,
    #[serde(default)]
    pub context: Option<String>,
    pub value: String,
}

/// One identifier-integrity violation reported by `check_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdViolation {
    /// "missing-root" | "multiple-roots" | "root-has-parent" | "duplicate-id" | "unresolved-parent" | "cycle"
    pub kind: String,
    pub item_id: Option<String>,
    pub message: String,
}

/// Per-unit merge issue; never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergeWarning {
    /// "dangling" | "skipped" | "missing-path"
    pub kind: String,
    pub item_id: String,
    pub field_path: String,
    pub message: String,
}

/// Aggregated outcome of applying decoded units onto a target language.
/// Callers inspect this to decide whether to persist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MergeReport {
    pub applied: usize,
    pub skipped_existing: usize,
    pub dangling: usize,
    pub warnings: Vec<MergeWarning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExportStats {
    pub units: usize,
    pub files: Vec<String>,
}
