//! System configuration parameters
//!
//! All tunable parameters for the CatFeeder system.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederConfig {
    // --- Motion ---
    /// Degrees the servo advances per intermediate step of a smooth
    /// transition.
    pub step_size_deg: u8,
    /// Pause between intermediate steps (milliseconds).
    pub step_delay_ms: u32,

    // --- Control surface ---
    /// TCP port the HTTP command surface listens on.
    pub http_port: u16,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // Motion
            step_size_deg: 5,
            step_delay_ms: 100,

            // Control surface
            http_port: 80,
        }
    }
}
