#![no_main]
use libfuzzer_sys::fuzz_target;
use lockbox::vault::ports::RecordCodec;

fuzz_target!(|data: &[u8]| {
    // Decoder must not panic on arbitrary inputs
    let codec = lockbox::vault::codec::JsonCodec;
    let _ = codec.decode(data);
});
