//! Hardware adapter — bridges real peripherals to the domain port traits.
//!
//! Owns the bit-banged bus, the environment sensor, both buttons, and the
//! injected collaborator implementations (PWM, buzzer, LED, ADC), exposing
//! everything through [`SensorPort`] and [`ActuatorPort`]. This is the only
//! module that composes concrete drivers; the service sees traits only.
//!
//! All pin and clock types are generic, so the same adapter runs on real
//! GPIO or on simulated pins under test.

use embedded_hal::digital::{InputPin, OutputPin};
use log::{info, warn};

use crate::app::ports::{ActuatorPort, Buzzer, FanPwm, SensorPort, StatusLed, VddSense};
use crate::app::selftest::{self, SelfTestReport};
use crate::bus::{I2cBus, SoftI2c};
use crate::config::MonitorConfig;
use crate::control::alarm::BeepPattern;
use crate::drivers::button::{Button, ButtonEvent};
use crate::error::{BusError, SensorError};
use crate::sensors::bh1750::{self, Bh1750, Mode};
use crate::sensors::dht11::{Dht11, EnvReading};
use crate::time::{MicrosClock, MillisClock};

/// Delay between environment read attempts during the self test.
const SELFTEST_RETRY_MS: u32 = 150;
/// Environment read attempts during the self test.
const SELFTEST_ENV_TRIES: u8 = 3;

pub struct HardwareAdapter<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD> {
    bus: SoftI2c<SCL, SDA, CLK>,
    dht: Dht11<DP, CLK>,
    light: Option<Bh1750>,
    light_mode: Mode,
    fan_button: Button<FB>,
    page_button: Button<PB>,
    clock: CLK,
    fan_pwm: PWM,
    buzzer: BZ,
    led: LED,
    vdd: VDD,
}

impl<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD>
    HardwareAdapter<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    DP: InputPin + OutputPin,
    FB: InputPin,
    PB: InputPin,
    CLK: MicrosClock + MillisClock + Clone,
    PWM: FanPwm,
    BZ: Buzzer,
    LED: StatusLed,
    VDD: VddSense,
{
    /// Both buttons are active-low with external pull-ups.
    pub fn new(
        config: &MonitorConfig,
        scl: SCL,
        sda: SDA,
        dht_pin: DP,
        fan_button_pin: FB,
        page_button_pin: PB,
        clock: CLK,
        fan_pwm: PWM,
        buzzer: BZ,
        led: LED,
        vdd: VDD,
    ) -> Self {
        let bus = SoftI2c::new(scl, sda, clock.clone());
        let dht = Dht11::new(dht_pin, clock.clone());
        let fan_button = Button::new(
            fan_button_pin,
            true,
            config.button_settle_ms,
            config.long_press_ms,
        );
        let page_button = Button::new(
            page_button_pin,
            true,
            config.button_settle_ms,
            config.long_press_ms,
        );
        Self {
            bus,
            dht,
            light: None,
            light_mode: Mode::ContHiRes,
            fan_button,
            page_button,
            clock,
            fan_pwm,
            buzzer,
            led,
            vdd,
        }
    }

    /// Boot-time hardware check: supply window, light sensor on either
    /// address (plus one reading), and a few environment read attempts.
    pub fn self_test(&mut self) -> SelfTestReport {
        let vdd_mv = self.vdd.read_mv();
        let mut report = SelfTestReport {
            vdd_mv,
            vdd_ok: selftest::vdd_in_range(vdd_mv),
            ..SelfTestReport::default()
        };

        report.bus_idle = self.bus.bus_idle().unwrap_or(false);
        if report.bus_idle {
            for addr in [bh1750::ADDR_LO, bh1750::ADDR_HI] {
                if self.bus.probe(addr).unwrap_or(false) {
                    report.light_found = true;
                    report.light_addr = addr;
                    match Bh1750::init(&mut self.bus, addr, self.light_mode) {
                        Ok(dev) => {
                            // First conversion needs a full cycle even in
                            // continuous mode.
                            self.wait_ms(self.light_mode.conversion_ms());
                            report.light_read_ok =
                                dev.read_lux(&mut self.bus, &self.clock).is_ok();
                            self.light = Some(dev);
                        }
                        Err(e) => warn!("light sensor init failed: {e}"),
                    }
                    break;
                }
            }
        } else {
            warn!("bus not idle, skipping light sensor probe");
        }

        for attempt in 0..SELFTEST_ENV_TRIES {
            if self.dht.read().is_ok() {
                report.env_ok = true;
                break;
            }
            if attempt + 1 < SELFTEST_ENV_TRIES {
                self.wait_ms(SELFTEST_RETRY_MS);
            }
        }

        info!(
            "self test: vdd={} mV ({}) light={} env={}",
            report.vdd_mv,
            if report.vdd_ok { "ok" } else { "out of range" },
            if report.light_read_ok { "ok" } else { "err" },
            if report.env_ok { "ok" } else { "err" },
        );
        report
    }

    /// Initialise the light sensor outside of the self test (e.g. after a
    /// cable was reseated). Keeps the previous device on failure.
    pub fn init_light(&mut self, prefer_addr: u8, mode: Mode) -> Result<(), BusError> {
        if !self.bus.bus_idle()? {
            return Err(BusError::HeldLow);
        }
        let dev = Bh1750::init(&mut self.bus, prefer_addr, mode)?;
        self.light_mode = mode;
        self.light = Some(dev);
        Ok(())
    }

    pub fn light_present(&self) -> bool {
        self.light.is_some()
    }

    fn wait_ms(&self, ms: u32) {
        let start = self.clock.now_ms();
        while self.clock.now_ms().wrapping_sub(start) < ms {
            core::hint::spin_loop();
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD> SensorPort
    for HardwareAdapter<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    DP: InputPin + OutputPin,
    FB: InputPin,
    PB: InputPin,
    CLK: MicrosClock + MillisClock + Clone,
    PWM: FanPwm,
    BZ: Buzzer,
    LED: StatusLed,
    VDD: VddSense,
{
    fn read_env(&mut self) -> Result<EnvReading, SensorError> {
        self.dht.read()
    }

    fn read_lux(&mut self) -> Result<f32, BusError> {
        match &self.light {
            Some(dev) => dev.read_lux(&mut self.bus, &self.clock),
            None => Err(BusError::Nack),
        }
    }

    fn read_vdd_mv(&mut self) -> u16 {
        self.vdd.read_mv()
    }

    fn poll_fan_button(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        self.fan_button.poll(now_ms)
    }

    fn poll_page_button(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        self.page_button.poll(now_ms)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD> ActuatorPort
    for HardwareAdapter<SCL, SDA, DP, FB, PB, CLK, PWM, BZ, LED, VDD>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    DP: InputPin + OutputPin,
    FB: InputPin,
    PB: InputPin,
    CLK: MicrosClock + MillisClock + Clone,
    PWM: FanPwm,
    BZ: Buzzer,
    LED: StatusLed,
    VDD: VddSense,
{
    fn set_fan_duty(&mut self, pct: u8) {
        self.fan_pwm.set_duty_pct(pct.min(100));
    }

    fn beep(&mut self, pattern: BeepPattern) {
        self.buzzer.play(pattern);
    }

    fn set_heartbeat_led(&mut self, on: bool) {
        self.led.set(on);
    }
}
