#![no_main]
use libfuzzer_sys::fuzz_target;
use lockbox::cryptography::cipher::{decrypt_cbc, decrypt_sealed};
use lockbox::cryptography::kdf::{derive_key, KEY_LEN};

fuzz_target!(|data: &[u8]| {
    // Both layouts must reject garbage without panicking
    let Ok(key) = derive_key("fuzz", b"fuzz-salt-000000", 1, KEY_LEN) else {
        return;
    };
    let _ = decrypt_cbc(data, &key);
    let _ = decrypt_sealed(data, &key);
});
