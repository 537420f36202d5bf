//! Dependency-aware content-hash canonicalization (spec §4.9, §9
//! "dependency-aware content hashing").
//!
//! Each frame's defs are walked in topological (dependency-first) order so a
//! derived def's hash is computed over its dependencies' *already assigned*
//! canonical ids, not their original per-frame ids. Raster (base64) defs
//! hash their payload alone and are shareable across animations; every
//! other def's hash is salted with the animation name, since only a single
//! animation's frames may reference it.

use std::collections::HashMap;

use crate::foundation::math::Fnv1a64;

use super::parse::{ParsedDef, ParsedFrame};

#[derive(Clone, Debug)]
pub struct CanonicalDef {
    pub id: String,
    pub tag: String,
    pub content: String,
    pub references: Vec<String>,
    pub is_image: bool,
    /// Stable 12-hex content digest, independent of `short_ids` — used to
    /// name externalized image files so identical payloads across sprites
    /// land on the same file.
    pub content_hash: String,
    pub image_payload: Option<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct CanonicalUse {
    /// `None` when the original href didn't resolve to any known def; such
    /// uses are dropped by the caller before packing.
    pub href: Option<String>,
    pub transform: Option<String>,
    pub extra_attrs: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct CanonicalFrame {
    pub offset: (f64, f64),
    pub uses: Vec<CanonicalUse>,
}

pub struct Canonicalized {
    /// Topologically ordered so a def never appears before what it depends
    /// on (stable, deterministic output; spec §8 property 8).
    pub defs: Vec<CanonicalDef>,
    pub unique_frames: Vec<CanonicalFrame>,
    /// One entry per input frame, indexing into `unique_frames`.
    pub frame_assignment: Vec<usize>,
}

struct GlobalDefs {
    by_hash: HashMap<u64, String>,
    order: Vec<String>,
    table: HashMap<String, CanonicalDef>,
    next_seq: u32,
}

pub fn canonicalize(animation_name: &str, frames: &[ParsedFrame], short_ids: bool) -> Canonicalized {
    let mut globals = GlobalDefs {
        by_hash: HashMap::new(),
        order: Vec::new(),
        table: HashMap::new(),
        next_seq: 0,
    };

    let mut per_frame_id_maps: Vec<HashMap<String, String>> = Vec::with_capacity(frames.len());
    for frame in frames {
        let order = topo_order_defs(&frame.defs);
        let mut local_map = HashMap::new();
        for def_idx in order {
            let def = &frame.defs[def_idx];
            let canonical_id = canonicalize_def(animation_name, def, &local_map, &mut globals, short_ids);
            local_map.insert(def.id.clone(), canonical_id);
        }
        per_frame_id_maps.push(local_map);
    }

    let (unique_frames, frame_assignment) = dedup_frames(frames, &per_frame_id_maps);
    let defs = topo_order_canonical(&globals);

    Canonicalized { defs, unique_frames, frame_assignment }
}

fn canonicalize_def(
    animation_name: &str,
    def: &ParsedDef,
    local_map: &HashMap<String, String>,
    globals: &mut GlobalDefs,
    short_ids: bool,
) -> String {
    let rewritten = rewrite_references(&def.content, local_map);
    let is_image = def.image_payload.is_some();

    let mut content_digest = Fnv1a64::new_default();
    content_digest.write_bytes(def.tag.as_bytes());
    content_digest.write_bytes(rewritten.as_bytes());
    let content_hash = Fnv1a64::new(content_digest.finish()).finish_hex(12);

    let mut h = Fnv1a64::new_default();
    if !is_image {
        h.write_bytes(animation_name.as_bytes());
    }
    h.write_bytes(def.tag.as_bytes());
    h.write_bytes(rewritten.as_bytes());
    let digest = h.finish();

    if let Some(existing) = globals.by_hash.get(&digest) {
        return existing.clone();
    }

    let id = if short_ids {
        let id = format!("d{}", globals.next_seq);
        globals.next_seq += 1;
        id
    } else {
        format!("def_{}", Fnv1a64::new(digest).finish_hex(12))
    };

    let references: Vec<String> = def.references.iter().filter_map(|r| local_map.get(r).cloned()).collect();

    globals.by_hash.insert(digest, id.clone());
    globals.order.push(id.clone());
    globals.table.insert(
        id.clone(),
        CanonicalDef {
            id: id.clone(),
            tag: def.tag.clone(),
            content: rewritten,
            references,
            is_image,
            content_hash,
            image_payload: def.image_payload.clone(),
        },
    );
    id
}

fn dedup_frames(
    frames: &[ParsedFrame],
    per_frame_id_maps: &[HashMap<String, String>],
) -> (Vec<CanonicalFrame>, Vec<usize>) {
    let mut unique_frames = Vec::new();
    let mut skeleton_to_index: HashMap<u64, usize> = HashMap::new();
    let mut assignment = Vec::with_capacity(frames.len());

    for (frame, local_map) in frames.iter().zip(per_frame_id_maps) {
        let mut uses: Vec<CanonicalUse> = frame
            .uses
            .iter()
            .map(|u| CanonicalUse {
                href: local_map.get(&u.href).cloned(),
                transform: u.transform.clone(),
                extra_attrs: u.extra_attrs.clone(),
            })
            .collect();
        // Drop unresolvable <use>s rather than point an atlas symbol at a
        // dangling id (spec §4.9).
        uses.retain(|u| u.href.is_some());

        let mut h = Fnv1a64::new_default();
        h.write_bytes(format!("{:.3},{:.3}", frame.offset.0, frame.offset.1).as_bytes());
        for u in &uses {
            h.write_bytes(u.href.as_deref().unwrap_or("").as_bytes());
            h.write_bytes(u.transform.as_deref().unwrap_or("").as_bytes());
            for (k, v) in &u.extra_attrs {
                h.write_bytes(k.as_bytes());
                h.write_bytes(v.as_bytes());
            }
        }
        let digest = h.finish();

        let idx = *skeleton_to_index.entry(digest).or_insert_with(|| {
            unique_frames.push(CanonicalFrame { offset: frame.offset, uses });
            unique_frames.len() - 1
        });
        assignment.push(idx);
    }

    (unique_frames, assignment)
}

fn topo_order_defs(defs: &[ParsedDef]) -> Vec<usize> {
    let index_of: HashMap<&str, usize> = defs.iter().enumerate().map(|(i, d)| (d.id.as_str(), i)).collect();
    let mut visited = vec![false; defs.len()];
    let mut order = Vec::with_capacity(defs.len());

    fn visit(i: usize, defs: &[ParsedDef], index_of: &HashMap<&str, usize>, visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[i] {
            return;
        }
        visited[i] = true;
        for r in &defs[i].references {
            if let Some(&j) = index_of.get(r.as_str()) {
                visit(j, defs, index_of, visited, order);
            }
        }
        order.push(i);
    }

    for i in 0..defs.len() {
        visit(i, defs, &index_of, &mut visited, &mut order);
    }
    order
}

fn topo_order_canonical(globals: &GlobalDefs) -> Vec<CanonicalDef> {
    let mut visited: HashMap<&str, bool> = HashMap::new();
    let mut order: Vec<String> = Vec::with_capacity(globals.order.len());

    fn visit<'a>(
        id: &'a str,
        table: &'a HashMap<String, CanonicalDef>,
        visited: &mut HashMap<&'a str, bool>,
        order: &mut Vec<String>,
    ) {
        if *visited.get(id).unwrap_or(&false) {
            return;
        }
        visited.insert(id, true);
        if let Some(def) = table.get(id) {
            for r in &def.references {
                visit(r, table, visited, order);
            }
        }
        order.push(id.to_string());
    }

    for id in &globals.order {
        visit(id, &globals.table, &mut visited, &mut order);
    }

    order.into_iter().filter_map(|id| globals.table.get(&id).cloned()).collect()
}

/// Rewrites `href="#id"`, `xlink:href="#id"`, and `url(#id)` references
/// against `map`, replacing an unresolved `url(#id)` with the literal
/// `none` and leaving an unresolved `href` empty so [`drop_unresolved_uses`]
/// can strip the enclosing element.
fn rewrite_references(content: &str, map: &HashMap<String, String>) -> String {
    let rewritten = rewrite_hrefs(content, map);
    let rewritten = rewrite_url_refs(&rewritten, map);
    drop_unresolved_uses(&rewritten)
}

fn rewrite_hrefs(content: &str, map: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    loop {
        let Some(pos) = rest.find("href=\"#") else {
            out.push_str(rest);
            break;
        };
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let after_prefix = &tail["href=\"#".len()..];
        let Some(end) = after_prefix.find('"') else {
            out.push_str(tail);
            break;
        };
        let id = &after_prefix[..end];
        let replacement = map.get(id).cloned().unwrap_or_default();
        out.push_str("href=\"#");
        out.push_str(&replacement);
        out.push('"');
        rest = &after_prefix[end + 1..];
    }
    out
}

fn rewrite_url_refs(content: &str, map: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    loop {
        let Some(pos) = rest.find("url(#") else {
            out.push_str(rest);
            break;
        };
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let after_prefix = &tail["url(#".len()..];
        let Some(end) = after_prefix.find(')') else {
            out.push_str(tail);
            break;
        };
        let id = &after_prefix[..end];
        match map.get(id) {
            Some(canonical) => {
                out.push_str("url(#");
                out.push_str(canonical);
                out.push(')');
            }
            None => out.push_str("none"),
        }
        rest = &after_prefix[end + 1..];
    }
    out
}

/// Removes any self-closing `<use .../>` left with an empty `href="#"`
/// after [`rewrite_hrefs`] found no mapping for its target.
fn drop_unresolved_uses(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    loop {
        let Some(start) = rest.find("<use ") else {
            out.push_str(rest);
            break;
        };
        let Some(end_rel) = rest[start..].find("/>") else {
            out.push_str(rest);
            break;
        };
        let end = start + end_rel + 2;
        let element = &rest[start..end];
        out.push_str(&rest[..start]);
        if !element.contains("href=\"#\"") {
            out.push_str(element);
        }
        rest = &rest[end..];
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/hash.rs"]
mod tests;
