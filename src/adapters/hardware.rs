//! Hardware adapter — bridges the real servo to the domain port traits.
//!
//! Owns the [`ServoDriver`], exposing it through [`ServoPort`], and
//! provides the blocking [`DelayPort`] pacing for smooth transitions.
//! This is the only module in the system that touches actual hardware.
//! On non-espidf targets, the underlying driver uses cfg-gated
//! simulation stubs and the delay sleeps the host thread.

use crate::app::ports::{DelayPort, ServoPort};
use crate::drivers::servo::ServoDriver;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    servo: ServoDriver,
}

impl HardwareAdapter {
    pub fn new(servo: ServoDriver) -> Self {
        Self { servo }
    }

    /// The last angle the servo was commanded to (diagnostics).
    pub fn last_servo_angle(&self) -> Option<u8> {
        self.servo.last_angle()
    }
}

// ── ServoPort implementation ──────────────────────────────────

impl ServoPort for HardwareAdapter {
    fn command(&mut self, angle: u8) {
        self.servo.write(angle);
    }
}

// ── DelayPort implementation ──────────────────────────────────

impl DelayPort for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
