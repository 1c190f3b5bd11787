#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any byte string must decode or fail cleanly
    if let Ok(record) = chargebridge::codec::decode(data) {
        assert!(record.phase_voltage.iter().all(|v| *v >= 0.0));
        assert!(record.combined_current >= 0.0);
    }

    let _ = chargebridge::codec::decode_write(data);
});
