use super::*;
use crate::foundation::core::Color;
use crate::records::{NewStyles, ShapeRecord};

fn straight(dx: i32, dy: i32) -> ShapeRecord {
    ShapeRecord::StraightEdge { dx, dy }
}

fn style_change_full(
    move_to: (i32, i32),
    fill0: Option<u32>,
    fill1: Option<u32>,
    line: Option<u32>,
    new_styles: NewStyles,
) -> ShapeRecord {
    ShapeRecord::StyleChange {
        move_to: Some(move_to),
        fill0,
        fill1,
        line,
        new_styles: Some(new_styles),
    }
}

#[test]
fn solid_red_triangle_compiles_to_one_chained_fill_path() {
    let fill_styles = vec![FillStyle::Solid(Color::rgba(255, 0, 0, 255))];
    let new_styles = NewStyles {
        fill_styles: fill_styles.clone(),
        line_styles: vec![],
        fill_bits: 1,
        line_bits: 0,
    };
    let records = vec![
        style_change_full((0, 0), None, Some(1), None, new_styles),
        straight(100, 0),
        straight(0, 100),
        straight(-100, -100),
        ShapeRecord::End,
    ];

    let paths = ShapeCompiler::compile(&records, fill_styles.clone(), vec![]);
    assert_eq!(paths.len(), 1);
    let path = &paths[0];
    assert_eq!(path.fill, Some(FillStyle::Solid(Color::rgba(255, 0, 0, 255))));
    assert!(path.line.is_none());
    assert_eq!(path.segments.len(), 3);

    // Chain is head-to-tail: each segment's `to` matches the next's `from`.
    for pair in path.segments.windows(2) {
        assert_eq!(pair[0].to, pair[1].from);
    }
    // And the chain closes back to its own start.
    assert_eq!(path.segments.last().unwrap().to, path.segments[0].from);
}

#[test]
fn zero_edge_shape_compiles_to_empty_path_list() {
    let records = vec![ShapeRecord::End];
    let paths = ShapeCompiler::compile(&records, vec![], vec![]);
    assert!(paths.is_empty());
}

#[test]
fn fill_paths_emitted_before_line_paths() {
    let fill_styles = vec![FillStyle::Solid(Color::rgba(1, 2, 3, 255))];
    let line_styles = vec![crate::records::LineStyle {
        width: crate::foundation::core::Twips(20),
        color: Some(Color::rgba(9, 9, 9, 255)),
        fill: None,
        start_cap: crate::records::CapStyle::Round,
        end_cap: crate::records::CapStyle::Round,
        join: crate::records::JoinStyle::Round,
        miter_limit: None,
        no_h_scale: false,
        no_v_scale: false,
        pixel_hinting: false,
        no_close: false,
    }];
    let new_styles = NewStyles {
        fill_styles: fill_styles.clone(),
        line_styles: line_styles.clone(),
        fill_bits: 1,
        line_bits: 1,
    };
    let records = vec![
        style_change_full((0, 0), None, Some(1), Some(1), new_styles),
        straight(10, 0),
        straight(0, 10),
        ShapeRecord::End,
    ];
    let paths = ShapeCompiler::compile(&records, fill_styles, line_styles);
    assert_eq!(paths.len(), 2);
    assert!(paths[0].fill.is_some());
    assert!(paths[1].line.is_some());
}

#[test]
fn curved_edge_carries_control_point() {
    let fill_styles = vec![FillStyle::Solid(Color::rgba(0, 0, 0, 255))];
    let new_styles = NewStyles {
        fill_styles: fill_styles.clone(),
        line_styles: vec![],
        fill_bits: 1,
        line_bits: 0,
    };
    let records = vec![
        style_change_full((0, 0), None, Some(1), None, new_styles),
        ShapeRecord::CurvedEdge {
            control_dx: 10,
            control_dy: 0,
            anchor_dx: 10,
            anchor_dy: 10,
        },
        ShapeRecord::End,
    ];
    let paths = ShapeCompiler::compile(&records, fill_styles, vec![]);
    assert_eq!(paths.len(), 1);
    let seg = &paths[0].segments[0];
    assert!(seg.control.is_some());
    assert_eq!(seg.to, (crate::foundation::core::Twips(20), crate::foundation::core::Twips(10)));
}
