//! XLIFF 1.2 interchange variant: one document, one `<file>` per
//! master-to-target language pair, one `<trans-unit>` per unit. The
//! trans-unit id deterministically encodes item type, item id and field path
//! so decode inverts it without a side table.

use courseloc_core::{CourselocError, Result};
use courseloc_domain::{ItemType, TranslationUnit};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

const XMLNS: &str = "urn:oasis:names:tc:xliff:document:1.2";
const ID_SEPARATOR: char = '|';

#[derive(Debug)]
pub struct DecodedXliff {
    pub units: Vec<TranslationUnit>,
    /// Per-unit issues: the unit was skipped, the rest of the file imported.
    pub warnings: Vec<String>,
}

fn unit_id(unit: &TranslationUnit) -> String {
    format!(
        "{}{ID_SEPARATOR}{}{ID_SEPARATOR}{}",
        unit.item_type, unit.item_id, unit.field_path
    )
}

fn parse_unit_id(id: &str) -> Option<(ItemType, String, String)> {
    let mut parts = id.splitn(3, ID_SEPARATOR);
    let ty: ItemType = parts.next()?.parse().ok()?;
    let item_id = parts.next()?;
    let field_path = parts.next()?;
    if item_id.is_empty() || field_path.is_empty() {
        return None;
    }
    Some((ty, item_id.to_string(), field_path.to_string()))
}

/// Serialize `units` as an XLIFF 1.2 document. `<source>` is always emitted;
/// context travels in a `<note>`.
pub fn encode(units: &[TranslationUnit], source_lang: &str, target_lang: &str) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut xliff = BytesStart::new("xliff");
    xliff.push_attribute(("version", "1.2"));
    xliff.push_attribute(("xmlns", XMLNS));
    writer.write_event(Event::Start(xliff))?;

    let mut file = BytesStart::new("file");
    file.push_attribute(("original", "course"));
    file.push_attribute(("datatype", "plaintext"));
    file.push_attribute(("source-language", source_lang));
    file.push_attribute(("target-language", target_lang));
    writer.write_event(Event::Start(file))?;
    writer.write_event(Event::Start(BytesStart::new("body")))?;

    for unit in units {
        let mut tu = BytesStart::new("trans-unit");
        tu.push_attribute(("id", unit_id(unit).as_str()));
        writer.write_event(Event::Start(tu))?;

        writer.write_event(Event::Start(BytesStart::new("source")))?;
        writer.write_event(Event::Text(BytesText::new(&unit.value)))?;
        writer.write_event(Event::End(BytesEnd::new("source")))?;

        if let Some(context) = unit.context.as_deref() {
            writer.write_event(Event::Start(BytesStart::new("note")))?;
            writer.write_event(Event::Text(BytesText::new(context)))?;
            writer.write_event(Event::End(BytesEnd::new("note")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("trans-unit")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("body")))?;
    writer.write_event(Event::End(BytesEnd::new("file")))?;
    writer.write_event(Event::End(BytesEnd::new("xliff")))?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| CourselocError::Other(format!("non-UTF-8 output: {e}")).into())
}

#[derive(Debug, Default)]
struct PendingUnit {
    id: String,
    source: Option<String>,
    target: Option<String>,
    note: Option<String>,
}

/// Parse an XLIFF document back into units. A document that fails to parse
/// at the top level is a format error; an uninvertible trans-unit id only
/// skips that unit with a warning.
pub fn decode(text: &str, origin: &str) -> Result<DecodedXliff> {
    // Text is kept verbatim; the capture guard below already ignores the
    // indentation between elements, and content whitespace is significant.
    let mut reader = Reader::from_str(text);

    let mut units = Vec::new();
    let mut warnings = Vec::new();
    let mut pending: Option<PendingUnit> = None;
    let mut capture: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"trans-unit" => {
                    let id = e
                        .try_get_attribute("id")
                        .map_err(|err| {
                            CourselocError::format(origin, format!("bad trans-unit: {err}"))
                        })?
                        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                        .unwrap_or_default();
                    pending = Some(PendingUnit { id, ..Default::default() });
                }
                b"source" => capture = Some("source"),
                b"target" => capture = Some("target"),
                b"note" => capture = Some("note"),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(unit), Some(slot)) = (pending.as_mut(), capture) {
                    let text = t
                        .unescape()
                        .map_err(|err| {
                            CourselocError::format(origin, format!("bad text node: {err}"))
                        })?
                        .into_owned();
                    match slot {
                        "source" => unit.source = Some(text),
                        "target" => unit.target = Some(text),
                        "note" => unit.note = Some(text),
                        _ => unreachable!(),
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trans-unit" => {
                    if let Some(unit) = pending.take() {
                        match parse_unit_id(&unit.id) {
                            Some((item_type, item_id, field_path)) => {
                                // Translated target when present, else the
                                // untranslated source passes through.
                                let value = unit
                                    .target
                                    .filter(|t| !t.is_empty())
                                    .or(unit.source)
                                    .unwrap_or_default();
                                units.push(TranslationUnit {
                                    item_id,
                                    item_type,
                                    field_path,
                                    context: unit.note,
                                    value,
                                });
                            }
                            None => {
                                warn!("skipping trans-unit with uninvertible id `{}`", unit.id);
                                warnings.push(format!(
                                    "skipped trans-unit with uninvertible id `{}`",
                                    unit.id
                                ));
                            }
                        }
                    }
                }
                b"source" | b"target" | b"note" => capture = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CourselocError::format(origin, format!("invalid XLIFF: {e}")).into())
            }
            _ => {}
        }
    }

    Ok(DecodedXliff { units, warnings })
}
