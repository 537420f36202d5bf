use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VecanimError::malformed("x")
            .to_string()
            .contains("malformed data:")
    );
    assert!(
        VecanimError::out_of_bounds("x")
            .to_string()
            .contains("out of bounds:")
    );
    assert!(
        VecanimError::unknown_tag("x")
            .to_string()
            .contains("unknown tag:")
    );
    assert!(
        VecanimError::unprocessable("x")
            .to_string()
            .contains("unprocessable data:")
    );
    assert!(
        VecanimError::extra_data("x")
            .to_string()
            .contains("extra data:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VecanimError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn io_converts_via_from() {
    let io_err = std::io::Error::other("disk gone");
    let err: VecanimError = io_err.into();
    assert!(matches!(err, VecanimError::Io(_)));
}
