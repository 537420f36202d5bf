//! Frame-SVG → structured-data parsing (spec's SVG def extraction step).
//!
//! Operates on the specific, narrow shape [`crate::svg::SvgEmitter`] itself
//! produces: one `<svg>` root, an optional `<defs>` of direct-child
//! definitions, and a single top-level positioning `<g transform="...">`
//! holding the frame's `<use>` placements. This is not a general SVG parser.
//!
//! Not grounded in any reference-pack usage of `quick-xml` — the pack only
//! carries it as a `Cargo.toml` dependency line in three unrelated repos, no
//! working parse loop. Written from `quick-xml`'s documented event-reader
//! API (see DESIGN.md).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::foundation::error::{VecanimError, VecanimResult};

#[derive(Clone, Debug, Default)]
pub struct ParsedUse {
    /// Target def id, without the leading `#`.
    pub href: String,
    pub transform: Option<String>,
    pub extra_attrs: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct ParsedDef {
    pub id: String,
    pub tag: String,
    /// Raw inner markup between the opening and closing tag, verbatim.
    pub content: String,
    /// Ids (without `#`) this def's content refers to via `href`,
    /// `xlink:href`, or `url(#...)`, deduplicated.
    pub references: Vec<String>,
    /// `(mime, base64)` when this def embeds a raster payload via a data
    /// URL, extracted before any textual rewriting touches it.
    pub image_payload: Option<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct ParsedFrame {
    pub view_box: (f64, f64, f64, f64),
    /// Translation carried by the outer positioning group.
    pub offset: (f64, f64),
    pub uses: Vec<ParsedUse>,
    pub defs: Vec<ParsedDef>,
}

pub fn parse_frame(xml: &str) -> VecanimResult<ParsedFrame> {
    let mut reader = Reader::from_str(xml);

    let mut frame = ParsedFrame::default();
    let mut stack: Vec<String> = Vec::new();
    let mut in_defs = false;
    let mut current_def: Option<(usize, String, String, usize)> = None; // (content_start, id, tag, depth)

    loop {
        let pos_before = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| VecanimError::malformed(format!("invalid atlas frame xml: {e}")))?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let name = local_name(&e);
                stack.push(name.clone());
                if name == "svg" {
                    if let Some(vb) = attr_value(&e, "viewBox") {
                        frame.view_box = parse_view_box(&vb);
                    }
                } else if name == "defs" && stack.len() == 2 {
                    in_defs = true;
                } else if in_defs && current_def.is_none() && stack.len() == 3 {
                    let id = attr_value(&e, "id").unwrap_or_default();
                    current_def = Some((reader.buffer_position(), id, name, stack.len()));
                } else if !in_defs && name == "g" && stack.len() == 2 {
                    if let Some(t) = attr_value(&e, "transform") {
                        frame.offset = parse_translate(&t);
                    }
                }
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if !in_defs && name == "use" {
                    frame.uses.push(parse_use(&e));
                } else if in_defs && current_def.is_none() && stack.len() == 2 {
                    // self-closing direct child of <defs> (empty element)
                    let id = attr_value(&e, "id").unwrap_or_default();
                    frame.defs.push(ParsedDef {
                        id,
                        tag: name,
                        content: String::new(),
                        references: Vec::new(),
                        image_payload: None,
                    });
                }
            }
            Event::End(e) => {
                let name = local_name(&e);
                if let Some((start, id, tag, depth)) = current_def.clone() {
                    if name == tag && stack.len() == depth {
                        let content = xml[start..pos_before].to_string();
                        let references = scan_references(&content);
                        let image_payload = extract_image_payload(&content);
                        frame.defs.push(ParsedDef { id, tag, content, references, image_payload });
                        current_def = None;
                    }
                }
                if name == "defs" && stack.len() == 2 {
                    in_defs = false;
                }
                stack.pop();
            }
            _ => {}
        }
    }

    Ok(frame)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn attr_value(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes().flatten().find(|a| a.key.local_name().as_ref() == key.as_bytes()).and_then(|a| {
        a.unescape_value().ok().map(|v| v.into_owned())
    })
}

fn parse_use(e: &BytesStart) -> ParsedUse {
    let mut href = String::new();
    let mut transform = None;
    let mut extra_attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let Ok(value) = attr.unescape_value() else { continue };
        let value = value.into_owned();
        match key.as_str() {
            "href" => href = value.strip_prefix('#').unwrap_or(&value).to_string(),
            "transform" => transform = Some(value),
            _ => extra_attrs.push((key, value)),
        }
    }
    ParsedUse { href, transform, extra_attrs }
}

fn parse_view_box(v: &str) -> (f64, f64, f64, f64) {
    let parts: Vec<f64> = v.split_whitespace().filter_map(|p| p.parse().ok()).collect();
    if parts.len() == 4 {
        (parts[0], parts[1], parts[2], parts[3])
    } else {
        (0.0, 0.0, 0.0, 0.0)
    }
}

fn parse_translate(transform: &str) -> (f64, f64) {
    let Some(start) = transform.find("translate(") else { return (0.0, 0.0) };
    let rest = &transform[start + "translate(".len()..];
    let Some(end) = rest.find(')') else { return (0.0, 0.0) };
    let mut parts = rest[..end].split(',').filter_map(|p| p.trim().parse::<f64>().ok());
    let x = parts.next().unwrap_or(0.0);
    let y = parts.next().unwrap_or(0.0);
    (x, y)
}

/// Finds every `#id` referenced via `href="#id"`, `xlink:href="#id"`, or
/// `url(#id)` in `content`, deduplicated in first-seen order.
fn scan_references(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut push_unique = |id: String| {
        if !out.contains(&id) {
            out.push(id);
        }
    };

    let mut rest = content;
    while let Some(pos) = rest.find("href=\"#") {
        let after = &rest[pos + "href=\"#".len()..];
        if let Some(end) = after.find('"') {
            push_unique(after[..end].to_string());
            rest = &after[end + 1..];
        } else {
            break;
        }
    }
    let mut rest = content;
    while let Some(pos) = rest.find("url(#") {
        let after = &rest[pos + "url(#".len()..];
        if let Some(end) = after.find(')') {
            push_unique(after[..end].to_string());
            rest = &after[end + 1..];
        } else {
            break;
        }
    }
    out
}

/// Extracts a `data:<mime>;base64,<payload>` href if present, so the
/// canonicalizer can hash the raster payload alone and reinstall it later
/// (spec §9, "base64 protection during textual normalization").
fn extract_image_payload(content: &str) -> Option<(String, String)> {
    let pos = content.find("data:")?;
    let rest = &content[pos + "data:".len()..];
    let semi = rest.find(';')?;
    let mime = rest[..semi].to_string();
    let after_mime = &rest[semi + 1..];
    let payload_start = after_mime.find("base64,")? + "base64,".len();
    let payload_rest = &after_mime[payload_start..];
    let end = payload_rest.find('"').unwrap_or(payload_rest.len());
    Some((mime, payload_rest[..end].to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/parse.rs"]
mod tests;
