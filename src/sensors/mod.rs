//! Sensor drivers: the single-wire pulse-decoded DHT11 and the bus-attached
//! BH1750 light sensor. Both are pure protocol logic over pin/clock traits;
//! the hardware adapter owns the concrete instances.

pub mod bh1750;
pub mod dht11;
