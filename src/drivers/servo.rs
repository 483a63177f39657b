//! Dispenser servo driver (SG90-class hobby servo on LEDC PWM).
//!
//! Open-loop, position-commanded: the servo holds whatever pulse width
//! it last received, with no feedback channel. This driver is a dumb
//! actuator — angle validation is the controller's job.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channel configured by hw_init.
//! On host/test: tracks the last commanded angle in-memory only.

use crate::app::motion::ANGLE_MAX;
use crate::drivers::hw_init;

/// Pulse width commanding the 0° position.
const MIN_PULSE_US: u32 = 500;
/// Pulse width commanding the 180° position.
const MAX_PULSE_US: u32 = 2500;
/// 50 Hz frame = 20 ms period.
const PERIOD_US: u32 = 20_000;

pub struct ServoDriver {
    last_angle: Option<u8>,
}

impl ServoDriver {
    pub fn new() -> Self {
        Self { last_angle: None }
    }

    /// Command an absolute angle in degrees.
    pub fn write(&mut self, angle: u8) {
        let angle = angle.min(ANGLE_MAX);
        hw_init::ledc_set(Self::angle_to_duty(angle));
        self.last_angle = Some(angle);
    }

    /// The last commanded angle, `None` before the first command.
    pub fn last_angle(&self) -> Option<u8> {
        self.last_angle
    }

    /// Convert an angle (0–180) to an LEDC duty value: linear pulse-width
    /// mapping over 500–2500 µs inside the 20 ms frame.
    fn angle_to_duty(angle: u8) -> u32 {
        let span = MAX_PULSE_US - MIN_PULSE_US;
        let pulse_us = MIN_PULSE_US + (u32::from(angle) * span) / u32::from(ANGLE_MAX);
        (pulse_us * hw_init::ledc_max_duty()) / PERIOD_US
    }
}
