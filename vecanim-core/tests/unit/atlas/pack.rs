use super::*;

fn rects_overlap(a: (PackedRect, (u32, u32)), b: (PackedRect, (u32, u32))) -> bool {
    let (ra, (aw, ah)) = a;
    let (rb, (bw, bh)) = b;
    ra.x < rb.x + bw && rb.x < ra.x + aw && ra.y < rb.y + bh && rb.y < ra.y + ah
}

#[test]
fn packs_three_rects_without_overlap_within_strip_width() {
    let sizes = [(10, 20), (15, 10), (5, 30)];
    let (width, height, placed) = pack(&sizes, 1, 40);

    assert!(width <= 40, "atlas width {width} exceeds max strip width");
    // Lower bound: some item must supply at least its own padded height;
    // upper bound: worst case is every item stacked in a single column.
    assert!((31..=21 + 11 + 31 + 3).contains(&height), "unexpected atlas height {height}");
    assert_eq!(placed.len(), 3);

    for i in 0..placed.len() {
        for j in (i + 1)..placed.len() {
            assert!(
                !rects_overlap((placed[i], sizes[i]), (placed[j], sizes[j])),
                "rects {i} and {j} overlap: {:?} vs {:?}",
                placed[i],
                placed[j]
            );
        }
    }
}

#[test]
fn empty_input_packs_to_zero_size() {
    let (width, height, placed) = pack(&[], 1, 256);
    assert_eq!((width, height), (0, 0));
    assert!(placed.is_empty());
}

#[test]
fn single_item_wider_than_max_strip_width_falls_back_to_a_column() {
    let sizes = [(500, 20), (500, 30)];
    let (width, height, placed) = pack(&sizes, 0, 256);
    assert_eq!(width, 500);
    assert_eq!(height, 50);
    assert_eq!(placed[0].y, 0);
    assert_eq!(placed[1].y, 20);
}
