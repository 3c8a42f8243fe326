//! Application layer: port traits, outbound events, the per-tick service,
//! and the boot-time self test.

pub mod events;
pub mod ports;
pub mod selftest;
pub mod service;
