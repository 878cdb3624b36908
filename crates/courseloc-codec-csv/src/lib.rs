//! Delimited-text interchange variant. One file per item type, header row
//! `itemId,fieldPath,context,value`, configurable delimiter. Encoded files
//! carry a UTF-8 BOM because downstream spreadsheet tools need it for
//! locale-correct glyph display; decode sniffs BOM and delimiter when they
//! are not given explicitly.

use courseloc_core::{CourselocError, Result};
use courseloc_domain::{ItemType, TranslationUnit};
use tracing::debug;

pub const DEFAULT_DELIMITER: u8 = b',';
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const HEADER: [&str; 4] = ["itemId", "fieldPath", "context", "value"];
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Encode with the default comma delimiter. Returns one buffer per distinct
/// item type, in first-appearance (export) order.
pub fn encode(units: &[TranslationUnit]) -> Result<Vec<(ItemType, Vec<u8>)>> {
    encode_with(units, DEFAULT_DELIMITER)
}

pub fn encode_with(units: &[TranslationUnit], delimiter: u8) -> Result<Vec<(ItemType, Vec<u8>)>> {
    let mut groups: Vec<(ItemType, Vec<&TranslationUnit>)> = Vec::new();
    for unit in units {
        match groups.iter_mut().find(|(ty, _)| *ty == unit.item_type) {
            Some((_, list)) => list.push(unit),
            None => groups.push((unit.item_type, vec![unit])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (ty, list) in groups {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        wtr.write_record(HEADER)?;
        for u in &list {
            wtr.write_record([
                u.item_id.as_str(),
                u.field_path.as_str(),
                u.context.as_deref().unwrap_or(""),
                u.value.as_str(),
            ])?;
        }
        let body = wtr
            .into_inner()
            .map_err(|e| CourselocError::Other(format!("csv flush failed: {e}")))?;
        let mut bytes = Vec::with_capacity(body.len() + UTF8_BOM.len());
        bytes.extend_from_slice(&UTF8_BOM);
        bytes.extend_from_slice(&body);
        debug!("encoded {} `{}` units to delimited text", list.len(), ty);
        out.push((ty, bytes));
    }
    Ok(out)
}

/// BOM sniff first, then strict UTF-8, then a Windows-1252 fallback for the
/// legacy spreadsheets that still show up.
fn decode_text(bytes: &[u8], origin: &str) -> Result<String> {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _, had_errors) = encoding.decode(&bytes[bom_len..]);
        if had_errors {
            return Err(CourselocError::format(
                origin,
                format!("undecodable {} content", encoding.name()),
            )
            .into());
        }
        return Ok(text.into_owned());
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => {
            let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
            if had_errors {
                return Err(CourselocError::format(
                    origin,
                    "content is neither UTF-8 nor Windows-1252",
                )
                .into());
            }
            Ok(text.into_owned())
        }
    }
}

/// Pick the most frequent plausible delimiter in the header row.
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    DELIMITER_CANDIDATES
        .into_iter()
        .map(|d| (header.bytes().filter(|&b| b == d).count(), d))
        .max_by_key(|(count, _)| *count)
        .filter(|(count, _)| *count > 0)
        .map(|(_, d)| d)
        .unwrap_or(DEFAULT_DELIMITER)
}

/// Decode one per-type file back into units. `item_type` comes from the file
/// name (one file per type); `delimiter` is auto-detected when `None`.
pub fn decode(
    bytes: &[u8],
    item_type: ItemType,
    delimiter: Option<u8>,
    origin: &str,
) -> Result<Vec<TranslationUnit>> {
    let text = decode_text(bytes, origin)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&text));

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for record in rdr.records() {
        let record =
            record.map_err(|e| CourselocError::format(origin, format!("bad row: {e}")))?;
        if record.len() < HEADER.len() {
            return Err(CourselocError::format(
                origin,
                format!("row has {} columns, expected {}", record.len(), HEADER.len()),
            )
            .into());
        }
        let item_id = record[0].to_string();
        let field_path = record[1].to_string();
        if item_id.is_empty() || field_path.is_empty() {
            return Err(
                CourselocError::format(origin, "row is missing itemId or fieldPath").into()
            );
        }
        let context = match &record[2] {
            "" => None,
            s => Some(s.to_string()),
        };
        out.push(TranslationUnit {
            item_id,
            item_type,
            field_path,
            context,
            value: record[3].to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn single_block_yields_one_data_row() {
        let units = vec![unit("b1", ItemType::Block, "body", "Hello")];
        let files = encode(&units).unwrap();
        assert_eq!(files.len(), 1);
        let (ty, bytes) = &files[0];
        assert_eq!(*ty, ItemType::Block);
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]), "delimited export carries a BOM");
        let text = std::str::from_utf8(&bytes[3..]).unwrap();
        assert_eq!(text, "itemId,fieldPath,context,value\nb1,body,,Hello\n");
    }

    #[test]
    fn decode_inverts_encode() {
        let units = vec![
            unit("b1", ItemType::Block, "body", "Hello, \"quoted\"\nworld"),
            unit("b2", ItemType::Block, "items.0.text", "Semi;colon"),
        ];
        let files = encode(&units).unwrap();
        let decoded = decode(&files[0].1, ItemType::Block, None, "block.csv").unwrap();
        assert_eq!(decoded, units);
    }

    #[test]
    fn groups_one_file_per_item_type_in_export_order() {
        let units = vec![
            unit("c1", ItemType::Course, "title", "Demo"),
            unit("b1", ItemType::Block, "body", "Hello"),
            unit("b2", ItemType::Block, "body", "World"),
        ];
        let files = encode(&units).unwrap();
        let types: Vec<ItemType> = files.iter().map(|(t, _)| *t).collect();
        assert_eq!(types, [ItemType::Course, ItemType::Block]);
    }

    #[test]
    fn delimiter_is_auto_detected_from_header() {
        let units = vec![unit("b1", ItemType::Block, "body", "Hello")];
        let files = encode_with(&units, b';').unwrap();
        let decoded = decode(&files[0].1, ItemType::Block, None, "block.csv").unwrap();
        assert_eq!(decoded, units);
    }

    #[test]
    fn windows_1252_fallback_decodes_legacy_bytes() {
        // "café" with 0xE9, no BOM: invalid UTF-8, valid Windows-1252.
        let mut bytes = b"itemId,fieldPath,context,value\nb1,body,,caf".to_vec();
        bytes.push(0xE9);
        bytes.push(b'\n');
        let decoded = decode(&bytes, ItemType::Block, None, "block.csv").unwrap();
        assert_eq!(decoded[0].value, "caf\u{e9}");
    }

    #[test]
    fn missing_item_id_is_a_format_error() {
        let bytes = b"itemId,fieldPath,context,value\n,body,,Hello\n";
        assert!(decode(bytes, ItemType::Block, None, "block.csv").is_err());
    }
}
