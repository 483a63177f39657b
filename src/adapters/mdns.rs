//! mDNS service advertisement adapter.
//!
//! Advertises the command surface as `cat-feeder.local` with a
//! `_catfeeder._tcp` service record on the configured HTTP port, so
//! remote controls find the feeder without a fixed IP.  Uses raw
//! ESP-IDF mDNS calls on the target and is a logging no-op on
//! simulation targets.
//!
//! Lifecycle is tied to WiFi: start once the station has an IP, stop
//! before a deliberate disconnect.

use log::info;

const MDNS_HOSTNAME: &str = "cat-feeder";
const MDNS_SERVICE_TYPE: &str = "_catfeeder";
#[allow(dead_code)]
const MDNS_SERVICE_PROTO: &str = "_tcp";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    port: u16,
    active: bool,
}

impl MdnsAdapter {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            active: false,
        }
    }

    /// Whether mDNS is currently advertising.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start hostname + service advertisement.  Call after WiFi is
    /// connected and has an IP.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.platform_start();
        self.active = true;
        info!(
            "mDNS: advertising {}.local → {}:{}",
            MDNS_HOSTNAME, MDNS_SERVICE_TYPE, self.port
        );
    }

    /// Stop advertisement.  Call before WiFi disconnect.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) {
        use esp_idf_svc::sys::*;
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK as i32 {
                log::error!("mDNS: mdns_init failed ({})", ret);
                return;
            }

            mdns_hostname_set(b"cat-feeder\0".as_ptr() as *const _);
            mdns_instance_name_set(b"CatFeeder Dispenser\0".as_ptr() as *const _);

            let svc_type = b"_catfeeder\0";
            let svc_proto = b"_tcp\0";
            mdns_service_add(
                b"CatFeeder\0".as_ptr() as *const _,
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                self.port,
                core::ptr::null_mut(),
                0,
            );

            let ver = concat!(env!("CARGO_PKG_VERSION"), "\0");
            mdns_service_txt_item_set(
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"version\0".as_ptr() as *const _,
                ver.as_ptr() as *const _,
            );
        }
        info!(
            "mDNS(espidf): registered {}.local {}:{} v={}",
            MDNS_HOSTNAME,
            MDNS_SERVICE_TYPE,
            self.port,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) {
        info!(
            "mDNS(sim): registered {}.local {}:{} v={}",
            MDNS_HOSTNAME,
            MDNS_SERVICE_TYPE,
            self.port,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mDNS(sim): unregistered");
    }
}
