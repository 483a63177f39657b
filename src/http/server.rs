//! ESP-IDF HTTP server binding for the command surface.
//!
//! Registers one wildcard GET handler and feeds every request through
//! the pure [`router`](super::router).  The controller, hardware
//! adapter, store and event sink travel together as one
//! [`FeederSystem`] behind a mutex — the mutex is an ownership
//! mechanism for the httpd worker task, not a concurrency feature:
//! requests are serviced one at a time and a slot change holds the
//! lock for its full motion duration.

use std::sync::{Arc, Mutex};

use esp_idf_svc::http::Method as EspMethod;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::Write;
use log::{info, warn};

use crate::adapters::hardware::HardwareAdapter;
use crate::adapters::log_sink::LogEventSink;
use crate::adapters::nvs::NvsAdapter;
use crate::app::controller::FeederController;
use crate::error::{Error, Result};
use crate::http::router::{self, Request};

/// Everything a request handler needs, bundled for the httpd task.
pub struct FeederSystem {
    pub controller: FeederController,
    pub hw: HardwareAdapter,
    pub store: NvsAdapter,
    pub sink: LogEventSink,
}

/// Running HTTP surface.  Dropping it stops the server.
pub struct HttpSurface {
    _server: EspHttpServer<'static>,
}

impl HttpSurface {
    /// Start the server on `port` and route every GET through the
    /// shared system handle.
    pub fn start(port: u16, system: Arc<Mutex<FeederSystem>>) -> Result<Self> {
        let config = Configuration {
            http_port: port,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server =
            EspHttpServer::new(&config).map_err(|_| Error::Init("HTTP server start failed"))?;

        server
            .fn_handler::<esp_idf_svc::io::EspIOError, _>("/*", EspMethod::Get, move |raw| {
                let target = raw.uri().to_string();
                let request = Request::get(&target);

                let response = match system.lock() {
                    Ok(mut sys) => {
                        let FeederSystem {
                            controller,
                            hw,
                            store,
                            sink,
                        } = &mut *sys;
                        router::route(&request, controller, hw, store, sink)
                    }
                    Err(_) => {
                        warn!("HTTP: system handle poisoned, dropping request");
                        return Ok(());
                    }
                };

                let mut out = raw.into_status_response(response.status)?;
                out.write_all(response.body.as_bytes())?;
                Ok(())
            })
            .map_err(|_| Error::Init("HTTP handler registration failed"))?;

        info!("HTTP: command surface listening on port {port}");
        Ok(Self { _server: server })
    }
}
