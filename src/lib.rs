//! Farmmon firmware core library.
//!
//! The protocol engines, decoders, and state machines of a field
//! environment monitor: a software-bitbanged I2C master, the DHT11
//! single-wire pulse decoder, an NB-IoT AT-command session manager, and the
//! button/fan/alarm state machines that consume their output. All hardware
//! enters through `embedded-hal` pin traits and two clock traits, so every
//! module is exercised host-side by the test suite.
//!
//! Display rendering, ADC sampling, clock setup, and PWM/beep playback are
//! external collaborators reached through the traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod control;
pub mod modem;
pub mod sensors;
pub mod time;

mod error;

pub mod adapters;
pub mod drivers;

pub use error::{BusError, Error, InitPhase, ModemError, Result, SensorError};
