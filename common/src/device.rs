//! # Device Model
//!
//! A managed network asset addressable over SSH. Devices are imported by an external
//! registry and are read-only to the inspection engine.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A network device, identified by its asset serial number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Asset serial number. Unique and immutable.
    pub sn: String,
    /// Management address.
    pub ip: IpAddr,
    pub hostname: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub role: String,
    /// Datacenter / location code.
    #[serde(default)]
    pub idc: String,
    /// Overrides the run-wide SSH port for this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Device {
    pub fn new(sn: impl Into<String>, ip: IpAddr, hostname: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            ip,
            hostname: hostname.into(),
            vendor: String::new(),
            model: String::new(),
            role: String::new(),
            idc: String::new(),
            port: None,
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// Exact-match filter over devices. Absent or empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub sn: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub role: Option<String>,
    pub idc: Option<String>,
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        field_matches(&self.sn, &device.sn)
            && field_matches(&self.hostname, &device.hostname)
            && field_matches(&self.vendor, &device.vendor)
            && field_matches(&self.model, &device.model)
            && field_matches(&self.role, &device.role)
            && field_matches(&self.idc, &device.idc)
    }
}

/// A filter field constrains only when it is present and non-empty.
pub(crate) fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
    match wanted.as_deref() {
        None | Some("") => true,
        Some(value) => value == actual,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
