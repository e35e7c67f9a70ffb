#[test]
fn lock_and_unlock_are_best_effort() {
    use lockbox::cryptography::memlock::{lock_slice, unlock_slice};
    let mut buf = [0u8; 64];
    assert!(lock_slice(&mut buf).is_ok());
    assert!(unlock_slice(&mut buf).is_ok());
    assert!(lock_slice(&mut []).is_ok());
}
