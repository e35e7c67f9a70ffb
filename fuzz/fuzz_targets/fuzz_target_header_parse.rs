#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Header parser should never panic on arbitrary input
    if let Ok((hdr, offset)) = lockbox::cryptography::cipher::parse_header(data) {
        assert!(offset <= data.len());
        let _ = lockbox::cryptography::cipher::header_fingerprint(&hdr);
    }
});
