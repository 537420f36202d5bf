use super::*;

const FRAME: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 20 30" width="20" height="30"><defs><g id="shape1"><path d="M0 0L20 0L20 30L0 30Z" fill="#112233"/></g><g id="img1"><image width="8" height="8" preserveAspectRatio="none" href="data:image/png;base64,QUJD"/></g></defs><g transform="translate(5,7)"><use href="#shape1" transform="matrix(1,0,0,1,0,0)"/><use href="#img1" transform="matrix(1,0,0,1,1,1)" id="sprite_a"/></g></svg>"##;

#[test]
fn parses_view_box_and_offset() {
    let frame = parse_frame(FRAME).unwrap();
    assert_eq!(frame.view_box, (0.0, 0.0, 20.0, 30.0));
    assert_eq!(frame.offset, (5.0, 7.0));
}

#[test]
fn parses_uses_in_document_order_with_extra_attrs() {
    let frame = parse_frame(FRAME).unwrap();
    assert_eq!(frame.uses.len(), 2);
    assert_eq!(frame.uses[0].href, "shape1");
    assert_eq!(frame.uses[1].href, "img1");
    assert_eq!(frame.uses[1].extra_attrs, vec![("id".to_string(), "sprite_a".to_string())]);
}

#[test]
fn extracts_def_content_and_image_payload() {
    let frame = parse_frame(FRAME).unwrap();
    assert_eq!(frame.defs.len(), 2);

    let shape_def = frame.defs.iter().find(|d| d.id == "shape1").unwrap();
    assert!(shape_def.content.contains("<path"));
    assert!(shape_def.image_payload.is_none());

    let img_def = frame.defs.iter().find(|d| d.id == "img1").unwrap();
    assert_eq!(img_def.image_payload, Some(("image/png".to_string(), "QUJD".to_string())));
}

#[test]
fn scans_href_and_url_references() {
    let content = r#"<use href="#a"/><rect filter="url(#b)"/>"#;
    assert_eq!(scan_references(content), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn missing_view_box_defaults_to_zero_rect() {
    let xml = r#"<svg xmlns="http://www.w3.org/2000/svg"><g transform="translate(0,0)"/></svg>"#;
    let frame = parse_frame(xml).unwrap();
    assert_eq!(frame.view_box, (0.0, 0.0, 0.0, 0.0));
}
