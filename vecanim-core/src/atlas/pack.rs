//! MaxRects Best-Short-Side-Fit bin packing (spec §4.9, §8 scenario (f)).
//!
//! Not grounded in any reference-pack source — the pack's only
//! packing-adjacent hit (`sprite-sheet.rs.rs` in `other_examples/`) is a
//! pure serde schema with no packing logic. Written from general
//! free-rectangle-packing algorithmic knowledge (see DESIGN.md).

use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PackedRect {
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Copy, Debug)]
struct FreeRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Clone, Copy)]
enum SortOrder {
    HeightMajor,
    AreaMajor,
    WidthMajor,
    MaxSideMajor,
}

const SORT_ORDERS: [SortOrder; 4] =
    [SortOrder::HeightMajor, SortOrder::AreaMajor, SortOrder::WidthMajor, SortOrder::MaxSideMajor];

/// Packs `sizes` (one `(width, height)` per item) into the smallest-area
/// layout this heuristic finds among several candidate strip widths and
/// sort orders, inflating each item by `padding` on its trailing edges so
/// neighbors never touch. Returns `(atlas_width, atlas_height, placements)`
/// in input order.
pub fn pack(sizes: &[(u32, u32)], padding: u32, max_strip_width: u32) -> (u32, u32, Vec<PackedRect>) {
    if sizes.is_empty() {
        return (0, 0, Vec::new());
    }
    let padded: Vec<(u32, u32)> = sizes.iter().map(|&(w, h)| (w + padding, h + padding)).collect();

    let mut best: Option<(u32, u32, Vec<PackedRect>)> = None;
    for width in candidate_widths(&padded, max_strip_width) {
        for order in SORT_ORDERS {
            if let Some((w, h, placed)) = try_pack(&padded, width, order) {
                let area = u64::from(w) * u64::from(h);
                let better = match &best {
                    None => true,
                    Some((bw, bh, _)) => area < u64::from(*bw) * u64::from(*bh),
                };
                if better {
                    best = Some((w, h, placed));
                }
            }
        }
    }

    best.unwrap_or_else(|| {
        // No swept width fit every item (one item wider than max_strip_width);
        // stack everything in a single column as a last resort.
        let width = padded.iter().map(|&(w, _)| w).max().unwrap_or(1);
        let mut y = 0u32;
        let mut placed = Vec::with_capacity(padded.len());
        for &(_, h) in &padded {
            placed.push(PackedRect { x: 0, y });
            y += h;
        }
        (width, y, placed)
    })
}

fn try_pack(padded: &[(u32, u32)], width: u32, order: SortOrder) -> Option<(u32, u32, Vec<PackedRect>)> {
    if padded.iter().any(|&(w, _)| w > width) {
        return None;
    }

    let mut indices: Vec<usize> = (0..padded.len()).collect();
    indices.sort_by_key(|&i| {
        let (w, h) = padded[i];
        std::cmp::Reverse(match order {
            SortOrder::HeightMajor => h,
            SortOrder::AreaMajor => w.saturating_mul(h),
            SortOrder::WidthMajor => w,
            SortOrder::MaxSideMajor => w.max(h),
        })
    });

    const TALL: u32 = u32::MAX / 2;
    let mut free: Vec<FreeRect> = vec![FreeRect { x: 0, y: 0, w: width, h: TALL }];
    let mut placed = vec![PackedRect::default(); padded.len()];
    let mut used_h = 0u32;

    for i in indices {
        let (w, h) = padded[i];
        let mut best_idx = None;
        let mut best_short = u32::MAX;
        let mut best_long = u32::MAX;
        for (fi, f) in free.iter().enumerate() {
            if w <= f.w && h <= f.h {
                let leftover_w = f.w - w;
                let leftover_h = f.h - h;
                let short = leftover_w.min(leftover_h);
                let long = leftover_w.max(leftover_h);
                if short < best_short || (short == best_short && long < best_long) {
                    best_short = short;
                    best_long = long;
                    best_idx = Some(fi);
                }
            }
        }
        let fi = best_idx?;
        let chosen = free[fi];
        placed[i] = PackedRect { x: chosen.x, y: chosen.y };
        used_h = used_h.max(chosen.y.saturating_add(h));

        let placed_rect = FreeRect { x: chosen.x, y: chosen.y, w, h };
        let mut next_free = Vec::with_capacity(free.len());
        for cand in free.drain(..) {
            if !overlaps(&cand, &placed_rect) {
                next_free.push(cand);
            } else {
                split_free_rect(&cand, &placed_rect, &mut next_free);
            }
        }
        free = prune_contained(next_free);
    }

    Some((width, used_h, placed))
}

fn overlaps(a: &FreeRect, b: &FreeRect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

fn split_free_rect(f: &FreeRect, placed: &FreeRect, out: &mut Vec<FreeRect>) {
    if placed.x > f.x {
        out.push(FreeRect { x: f.x, y: f.y, w: placed.x - f.x, h: f.h });
    }
    if placed.x + placed.w < f.x + f.w {
        out.push(FreeRect { x: placed.x + placed.w, y: f.y, w: (f.x + f.w) - (placed.x + placed.w), h: f.h });
    }
    if placed.y > f.y {
        out.push(FreeRect { x: f.x, y: f.y, w: f.w, h: placed.y - f.y });
    }
    if placed.y + placed.h < f.y + f.h {
        out.push(FreeRect { x: f.x, y: placed.y + placed.h, w: f.w, h: (f.y + f.h) - (placed.y + placed.h) });
    }
}

fn prune_contained(rects: Vec<FreeRect>) -> Vec<FreeRect> {
    let mut kept = Vec::with_capacity(rects.len());
    'outer: for (i, r) in rects.iter().enumerate() {
        if r.w == 0 || r.h == 0 {
            continue;
        }
        for (j, other) in rects.iter().enumerate() {
            if i != j && contains(other, r) {
                continue 'outer;
            }
        }
        kept.push(*r);
    }
    kept
}

fn contains(a: &FreeRect, b: &FreeRect) -> bool {
    b.x >= a.x && b.y >= a.y && b.x + b.w <= a.x + a.w && b.y + b.h <= a.y + a.h
}

/// Candidate strip widths to try: a dense sweep when the item-width range is
/// small, otherwise a sparse sweep built from unique widths, their pairwise
/// sums, a `sqrt(total area)` heuristic, and evenly sampled points across
/// the range (spec §4.9).
fn candidate_widths(padded: &[(u32, u32)], max_strip_width: u32) -> Vec<u32> {
    let widths: Vec<u32> = padded.iter().map(|&(w, _)| w).collect();
    let lo = widths.iter().copied().max().unwrap_or(1).max(1);
    let hi = max_strip_width.max(lo);
    let total_area: u64 = padded.iter().map(|&(w, h)| u64::from(w) * u64::from(h)).sum();
    let sqrt_area = (total_area as f64).sqrt().ceil() as u32;

    let mut candidates: BTreeSet<u32> = BTreeSet::new();
    candidates.insert(lo);
    candidates.insert(hi);
    candidates.insert(sqrt_area.clamp(lo, hi));

    let span = hi - lo;
    if span <= 256 {
        for w in lo..=hi {
            candidates.insert(w);
        }
        return candidates.into_iter().collect();
    }

    let mut uniq = widths.clone();
    uniq.sort_unstable();
    uniq.dedup();
    for &w in &uniq {
        if (lo..=hi).contains(&w) {
            candidates.insert(w);
        }
    }
    for i in 0..uniq.len() {
        for j in i..uniq.len() {
            let sum = uniq[i].saturating_add(uniq[j]);
            if (lo..=hi).contains(&sum) {
                candidates.insert(sum);
            }
        }
    }
    let steps = 32u32;
    for s in 0..=steps {
        candidates.insert((lo + (span / steps) * s).min(hi));
    }

    candidates.into_iter().collect()
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/pack.rs"]
mod tests;
