//! CatFeeder firmware library.
//!
//! Dual-container servo feed dispenser: one actuator, two calibrated
//! slot positions, durable calibration/selection records and a small
//! HTTP command surface.  Exposes the pure-logic modules for
//! integration testing and external inspection; all ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each
//! module, so the whole crate compiles and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod http;

// Hardware-touching modules; the actual platform implementations are
// guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod pins;
