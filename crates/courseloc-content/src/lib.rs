//! In-memory reconstruction of one language's content tree from its on-disk
//! collection files, plus identifier management over that tree.

use courseloc_core::{CourselocError, Result};
use courseloc_domain::{ContentItem, ItemType};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod ids;

pub use ids::{add_tracking_ids, check_ids, copy_language, remove_tracking_ids};

/// Number of on-disk collections per language. Also bounds legal tree depth.
pub const COLLECTION_COUNT: usize = 5;

pub const COURSE_FILE: &str = "course.json";
pub const CONTENT_OBJECTS_FILE: &str = "contentObjects.json";
pub const ARTICLES_FILE: &str = "articles.json";
pub const BLOCKS_FILE: &str = "blocks.json";
pub const COMPONENTS_FILE: &str = "components.json";

/// One localized instance of the full content tree. Owns every item
/// exclusively; parent/child links are id references, resolved on demand.
#[derive(Debug, Clone)]
pub struct Language {
    /// Folder/locale identifier, e.g. "en".
    pub name: String,
    pub course: ContentItem,
    pub content_objects: Vec<ContentItem>,
    pub articles: Vec<ContentItem>,
    pub blocks: Vec<ContentItem>,
    pub components: Vec<ContentItem>,
}

impl Language {
    /// All items in collection declaration order: course, then content
    /// objects, articles, blocks, components, each in on-disk order.
    pub fn all_items(&self) -> impl Iterator<Item = &ContentItem> {
        std::iter::once(&self.course)
            .chain(self.content_objects.iter())
            .chain(self.articles.iter())
            .chain(self.blocks.iter())
            .chain(self.components.iter())
    }

    pub fn all_items_mut(&mut self) -> impl Iterator<Item = &mut ContentItem> {
        std::iter::once(&mut self.course)
            .chain(self.content_objects.iter_mut())
            .chain(self.articles.iter_mut())
            .chain(self.blocks.iter_mut())
            .chain(self.components.iter_mut())
    }

    /// Item count; never zero, the course item always exists.
    pub fn len(&self) -> usize {
        self.all_items().count()
    }

    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.all_items().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut ContentItem> {
        self.all_items_mut().find(|i| i.id == id)
    }

    /// Stable pre-order traversal: course first, children in on-disk
    /// declaration order. This order is the single source of truth for
    /// export order and tracking-id assignment.
    pub fn preorder(&self) -> Vec<&ContentItem> {
        let mut children: HashMap<&str, Vec<&ContentItem>> = HashMap::new();
        for item in self.all_items() {
            if let Some(pid) = item.parent_id.as_deref() {
                children.entry(pid).or_default().push(item);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<&ContentItem> = vec![&self.course];
        while let Some(item) = stack.pop() {
            out.push(item);
            if let Some(kids) = children.get(item.id.as_str()) {
                for kid in kids.iter().rev() {
                    stack.push(kid);
                }
            }
        }
        out
    }
}

fn read_collection(path: &Path, allowed: &[ItemType]) -> Result<Vec<ContentItem>> {
    if !path.exists() {
        debug!("collection file {} absent, treating as empty", path.display());
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    let items: Vec<ContentItem> = serde_json::from_str(&text).map_err(|e| {
        CourselocError::format(path.display().to_string(), format!("invalid collection: {e}"))
    })?;
    for item in &items {
        if !allowed.contains(&item.item_type) {
            return Err(CourselocError::format(
                path.display().to_string(),
                format!("item `{}` has type `{}`, not allowed here", item.id, item.item_type),
            )
            .into());
        }
    }
    Ok(items)
}

/// Like `load_language`, but skips the identifier-invariant validation.
/// Used by callers that want to report every violation themselves instead
/// of failing on the first.
pub fn load_language_unchecked(course_root: &Path, name: &str) -> Result<Language> {
    let dir = course_root.join(name);

    let course_path = dir.join(COURSE_FILE);
    let text = fs::read_to_string(&course_path)?;
    let course: ContentItem = serde_json::from_str(&text).map_err(|e| {
        CourselocError::format(course_path.display().to_string(), format!("invalid course: {e}"))
    })?;
    if course.item_type != ItemType::Course {
        return Err(CourselocError::format(
            course_path.display().to_string(),
            format!("expected a course item, found `{}`", course.item_type),
        )
        .into());
    }

    let lang = Language {
        name: name.to_string(),
        course,
        content_objects: read_collection(
            &dir.join(CONTENT_OBJECTS_FILE),
            &[ItemType::Menu, ItemType::Page],
        )?,
        articles: read_collection(&dir.join(ARTICLES_FILE), &[ItemType::Article])?,
        blocks: read_collection(&dir.join(BLOCKS_FILE), &[ItemType::Block])?,
        components: read_collection(&dir.join(COMPONENTS_FILE), &[ItemType::Component])?,
    };

    debug!("loaded language `{}`: {} items", name, lang.len());
    Ok(lang)
}

/// Read every collection of `name` under `course_root` and reconstruct the
/// tree. Fails with a structural error when the reconstruction violates the
/// identifier invariants (root count, unresolved parents, cycles, duplicate
/// ids).
pub fn load_language(course_root: &Path, name: &str) -> Result<Language> {
    let lang = load_language_unchecked(course_root, name)?;
    let violations = ids::check_ids(&lang);
    if let Some(v) = violations.first() {
        return Err(CourselocError::structural(name, v.message.clone()).into());
    }
    Ok(lang)
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// failed write never leaves a truncated collection behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CourselocError::Other(format!("bad output path {}", path.display())))?;
    let tmp: PathBuf = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn collection_bytes(items: &[ContentItem]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(items)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Persist every collection of `lang` back to its originating file.
pub fn save_language(course_root: &Path, lang: &Language) -> Result<()> {
    let dir = course_root.join(&lang.name);
    let mut course_bytes = serde_json::to_vec_pretty(&lang.course)?;
    course_bytes.push(b'\n');
    write_atomic(&dir.join(COURSE_FILE), &course_bytes)?;
    write_atomic(
        &dir.join(CONTENT_OBJECTS_FILE),
        &collection_bytes(&lang.content_objects)?,
    )?;
    write_atomic(&dir.join(ARTICLES_FILE), &collection_bytes(&lang.articles)?)?;
    write_atomic(&dir.join(BLOCKS_FILE), &collection_bytes(&lang.blocks)?)?;
    write_atomic(&dir.join(COMPONENTS_FILE), &collection_bytes(&lang.components)?)?;
    debug!("saved language `{}` to {}", lang.name, dir.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::{json, Map, Value};

    pub fn item(id: &str, parent: Option<&str>, ty: ItemType, fields: Value) -> ContentItem {
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

    /// course -> page p1 -> article a1 -> blocks b1,b2 -> component c-txt
    pub fn small_language(name: &str) -> Language {
        Language {
            name: name.into(),
            course: item("c1", None, ItemType::Course, json!({"title": "Demo"})),
            content_objects: vec![item("p1", Some("c1"), ItemType::Page, json!({"title": "Page"}))],
            articles: vec![item("a1", Some("p1"), ItemType::Article, json!({}))],
            blocks: vec![
                item("b1", Some("a1"), ItemType::Block, json!({"body": "Hello"})),
                item("b2", Some("a1"), ItemType::Block, json!({"body": "World"})),
            ],
            components: vec![item(
                "c-txt",
                Some("b1"),
                ItemType::Component,
                json!({"title": "Text", "items": [{"text": "First"}, {"text": "Second"}]}),
            )],
        }
    }
}
