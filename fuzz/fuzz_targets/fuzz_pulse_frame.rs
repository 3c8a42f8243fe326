//! Fuzz target: `decode_frame`
//!
//! Drives arbitrary 5-byte frames into the pulse-frame validation stage and
//! asserts it never panics, accepts exactly the frames whose checksum holds,
//! and never reports fields from a rejected frame.
//!
//! cargo fuzz run fuzz_pulse_frame

#![no_main]

use farmmon::sensors::dht11::decode_frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }
    let frame = [data[0], data[1], data[2], data[3], data[4]];
    let sum = frame[0]
        .wrapping_add(frame[1])
        .wrapping_add(frame[2])
        .wrapping_add(frame[3]);

    match decode_frame(&frame) {
        Ok(reading) => {
            assert_eq!(sum, frame[4], "accepted frame must have a valid checksum");
            assert_eq!(reading.humidity_pct, frame[0]);
            assert_eq!(reading.temperature_c, frame[2]);
        }
        Err(_) => assert_ne!(sum, frame[4], "valid frames must not be rejected"),
    }
});
