//! Concrete adapters binding port traits to the platform.

pub mod hardware;
pub mod log_sink;
pub mod mdns;
pub mod nvs;
pub mod wifi;
