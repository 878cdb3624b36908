//! Single-JSON-bundle interchange variant: one file, one ordered array of
//! unit records `{itemId, itemType, fieldPath, context, value}`.

use courseloc_core::{CourselocError, Result};
use courseloc_domain::TranslationUnit;

pub fn encode(units: &[TranslationUnit]) -> Result<String> {
    Ok(serde_json::to_string(units)?)
}

/// The whole bundle must be well-formed; a record missing `itemId` or
/// `fieldPath` (or otherwise malformed) aborts the import of this file.
pub fn decode(text: &str, origin: &str) -> Result<Vec<TranslationUnit>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| CourselocError::format(origin, format!("not a unit array: {e}")))?;
    let mut out = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        for required in ["itemId", "fieldPath"] {
            if value.get(required).and_then(|v| v.as_str()).is_none() {
                return Err(CourselocError::format(
                    origin,
                    format!("unit {index} is missing `{required}`"),
                )
                .into());
            }
        }
        let unit: TranslationUnit = serde_json::from_value(value)
            .map_err(|e| CourselocError::format(origin, format!("unit {index}: {e}")))?;
        out.push(unit);
    }
    Ok(out)
}
