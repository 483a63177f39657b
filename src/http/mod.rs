//! HTTP control surface.
//!
//! Split in two layers, mirroring the rest of the crate's dual-target
//! design:
//!
//! - [`router`] — a pure request router: parses the request target,
//!   validates parameters, dispatches into the
//!   [`FeederController`](crate::app::controller::FeederController) and
//!   renders the wire-exact response bodies.  Fully host-testable.
//! - [`server`] — the ESP-IDF `EspHttpServer` binding that feeds real
//!   requests through the router.  Compiled on the target only.

pub mod router;

#[cfg(target_os = "espidf")]
pub mod server;
