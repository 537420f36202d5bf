use super::*;

#[test]
fn fnv_seeded_hash_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"vecanim");
    let mut b = Fnv1a64::new(Fnv1a64::OFFSET_BASIS);
    b.write_u8(b'v');
    b.write_bytes(b"ecanim");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn finish_hex_is_stable_prefix_of_full_digest() {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(b"style:solid:255,0,0,255");
    let full = format!("{:016x}", h.finish());
    assert_eq!(h.finish_hex(12), full[..12]);
}

#[test]
fn different_inputs_produce_different_hashes() {
    let mut a = Fnv1a64::new_default();
    a.write_i32(1);
    let mut b = Fnv1a64::new_default();
    b.write_i32(2);
    assert_ne!(a.finish(), b.finish());
}
