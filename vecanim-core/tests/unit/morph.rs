use super::*;
use crate::foundation::core::Color;
use crate::records::NewStyles;

fn style_change(move_to: (i32, i32), fill1: Option<u32>) -> ShapeRecord {
    ShapeRecord::StyleChange {
        move_to: Some(move_to),
        fill0: None,
        fill1,
        line: None,
        new_styles: None,
    }
}

#[test]
fn square_morph_at_half_ratio_blends_corners() {
    // Start: unit square (0,0)->(100,0)->(100,100)->(0,100)->(0,0).
    // End: same square scaled by 2.
    let start = vec![
        style_change((0, 0), Some(1)),
        ShapeRecord::StraightEdge { dx: 100, dy: 0 },
        ShapeRecord::StraightEdge { dx: 0, dy: 100 },
        ShapeRecord::StraightEdge { dx: -100, dy: 0 },
        ShapeRecord::StraightEdge { dx: 0, dy: -100 },
        ShapeRecord::End,
    ];
    let end = vec![
        style_change((0, 0), Some(1)),
        ShapeRecord::StraightEdge { dx: 200, dy: 0 },
        ShapeRecord::StraightEdge { dx: 0, dy: 200 },
        ShapeRecord::StraightEdge { dx: -200, dy: 0 },
        ShapeRecord::StraightEdge { dx: 0, dy: -200 },
        ShapeRecord::End,
    ];
    let fill_styles = vec![crate::records::MorphFillStyle::Solid {
        start: Color::rgba(0, 0, 0, 255),
        end: Color::rgba(0, 0, 0, 255),
    }];

    let paths = MorphCompiler::compile(&start, &end, &fill_styles, &[], 0.5).unwrap();
    assert_eq!(paths.len(), 1);

    let points: Vec<_> = paths[0]
        .segments
        .iter()
        .map(|s| (s.from.0.get(), s.from.1.get()))
        .collect();
    assert!(points.contains(&(0, 0)));
    assert!(points.contains(&(150, 0)));
    assert!(points.contains(&(150, 150)));
    assert!(points.contains(&(0, 150)));
}

#[test]
fn ratio_zero_and_one_reduce_to_endpoints() {
    let start = vec![
        style_change((0, 0), Some(1)),
        ShapeRecord::StraightEdge { dx: 10, dy: 0 },
        ShapeRecord::End,
    ];
    let end = vec![
        style_change((0, 0), Some(1)),
        ShapeRecord::StraightEdge { dx: 20, dy: 0 },
        ShapeRecord::End,
    ];
    let fill_styles = vec![crate::records::MorphFillStyle::Solid {
        start: Color::rgba(10, 10, 10, 255),
        end: Color::rgba(200, 200, 200, 255),
    }];

    let at_zero = MorphCompiler::compile(&start, &end, &fill_styles, &[], 0.0).unwrap();
    let at_one = MorphCompiler::compile(&start, &end, &fill_styles, &[], 1.0).unwrap();
    assert_eq!(at_zero[0].segments.len(), at_one[0].segments.len());
    assert_eq!(at_zero[0].segments[0].to.0.get(), 10);
    assert_eq!(at_one[0].segments[0].to.0.get(), 20);
}

#[test]
fn out_of_range_ratio_is_clamped() {
    let start = vec![
        style_change((0, 0), Some(1)),
        ShapeRecord::StraightEdge { dx: 10, dy: 0 },
        ShapeRecord::End,
    ];
    let fill_styles = vec![crate::records::MorphFillStyle::Solid {
        start: Color::rgba(0, 0, 0, 255),
        end: Color::rgba(0, 0, 0, 255),
    }];
    let result = MorphCompiler::compile(&start, &start, &fill_styles, &[], 1.5).unwrap();
    assert_eq!(result[0].segments[0].to.0.get(), 10);
}
