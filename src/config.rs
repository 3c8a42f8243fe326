//! System configuration parameters
//!
//! All tunable parameters for the monitor. Defaults match the deployed
//! field unit; values can be overridden by the embedding binary before the
//! service is constructed.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    // --- Fan curve ---
    /// Temperature (Celsius) at or below which the fan is off
    pub fan_on_temp_c: i32,
    /// Temperature (Celsius) at or above which the fan runs at 100%
    pub fan_max_temp_c: i32,
    /// Duty (%) at the bottom of the ramp, so the fan is effective as soon
    /// as it starts
    pub fan_floor_pct: u8,

    // --- Alarm thresholds ---
    /// Temperature (Celsius) at or above which the temperature alarm trips
    pub temp_high_c: i32,
    /// Temperature (Celsius) at or below which the temperature alarm trips
    pub temp_low_c: i32,
    /// Temperature hysteresis band (Celsius)
    pub temp_hyst_c: i32,
    /// Humidity (%RH) at or above which the humidity alarm trips
    pub humi_high_pct: i32,
    /// Humidity (%RH) at or below which the humidity alarm trips
    pub humi_low_pct: i32,
    /// Humidity hysteresis band (%RH)
    pub humi_hyst_pct: i32,
    /// Minimum interval between repeated beeps for the same alarm (ms)
    pub alarm_cooldown_ms: u32,

    // --- Buttons ---
    /// Raw level must be stable this long before the accepted level changes (ms)
    pub button_settle_ms: u32,
    /// Hold duration that classifies a press as long (ms)
    pub long_press_ms: u32,
    /// Button polling cadence (ms)
    pub button_scan_interval_ms: u32,

    // --- Sensor cadence ---
    /// Environment (temperature/humidity) read interval (ms)
    pub env_read_interval_ms: u32,
    /// Ambient light read interval (ms)
    pub lux_read_interval_ms: u32,

    // --- Power ---
    /// Below this supply voltage (mV), sensor polling and alarms are gated off
    pub low_vdd_mv: u16,

    // --- Uplink ---
    /// Status report interval (ms)
    pub report_interval_ms: u32,

    // --- Heartbeat LED ---
    /// Heartbeat period (ms)
    pub heartbeat_period_ms: u32,
    /// Heartbeat on-time within each period (ms)
    pub heartbeat_on_ms: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Fan: off at 32 C, ramp 50..100% over 32..38 C
            fan_on_temp_c: 32,
            fan_max_temp_c: 38,
            fan_floor_pct: 50,

            // Alarms
            temp_high_c: 35,
            temp_low_c: 24,
            temp_hyst_c: 1,
            humi_high_pct: 80,
            humi_low_pct: 35,
            humi_hyst_pct: 3,
            alarm_cooldown_ms: 30_000,

            // Buttons
            button_settle_ms: 20,
            long_press_ms: 1500,
            button_scan_interval_ms: 10,

            // Sensors
            env_read_interval_ms: 2000,
            lux_read_interval_ms: 500,

            // Power
            low_vdd_mv: 3050,

            // Uplink
            report_interval_ms: 10_000,

            // Heartbeat
            heartbeat_period_ms: 2000,
            heartbeat_on_ms: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = MonitorConfig::default();
        assert!(c.fan_max_temp_c > c.fan_on_temp_c);
        assert!(c.fan_floor_pct > 0 && c.fan_floor_pct <= 100);
        assert!(c.temp_high_c > c.temp_low_c);
        assert!(c.humi_high_pct > c.humi_low_pct);
        assert!(c.alarm_cooldown_ms > 0);
        assert!(c.button_settle_ms < c.long_press_ms);
        assert!(c.low_vdd_mv > 0);
    }

    #[test]
    fn hysteresis_bands_do_not_overlap() {
        let c = MonitorConfig::default();
        assert!(
            c.temp_high_c - c.temp_hyst_c > c.temp_low_c + c.temp_hyst_c,
            "temperature trigger/clear bands must not cross"
        );
        assert!(
            c.humi_high_pct - c.humi_hyst_pct > c.humi_low_pct + c.humi_hyst_pct,
            "humidity trigger/clear bands must not cross"
        );
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = MonitorConfig::default();
        assert!(
            c.button_scan_interval_ms < c.lux_read_interval_ms,
            "button scans should be faster than sensor polls"
        );
        assert!(
            c.env_read_interval_ms < c.report_interval_ms,
            "environment reads should be faster than reporting"
        );
        assert!(c.heartbeat_on_ms < c.heartbeat_period_ms);
    }

    #[test]
    fn serde_roundtrip() {
        let c = MonitorConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.temp_high_c, c2.temp_high_c);
        assert_eq!(c.fan_floor_pct, c2.fan_floor_pct);
        assert_eq!(c.report_interval_ms, c2.report_interval_ms);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = MonitorConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: MonitorConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.humi_high_pct, c2.humi_high_pct);
        assert_eq!(c.low_vdd_mv, c2.low_vdd_mv);
    }
}
