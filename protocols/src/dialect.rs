//! Vendor CLI dialects.
//!
//! Only the commands needed to make a fresh session scriptable are modelled: turning off the
//! pager and, on Cisco-like platforms, entering privileged mode.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Cisco IOS/NX-OS and look-alikes (Arista, Ruijie, Dell OS).
    Cisco,
    Huawei,
    H3c,
    Juniper,
    Generic,
}

impl Dialect {
    pub fn from_vendor(vendor: &str) -> Self {
        let vendor = vendor.to_ascii_lowercase();
        match vendor.as_str() {
            v if ["cisco", "arista", "ruijie", "dell"].iter().any(|n| v.contains(n)) => {
                Dialect::Cisco
            }
            v if v.contains("huawei") => Dialect::Huawei,
            v if v.contains("h3c") || v.starts_with("hp") => Dialect::H3c,
            v if v.contains("juniper") => Dialect::Juniper,
            _ => Dialect::Generic,
        }
    }

    pub fn disable_paging(&self) -> Option<&'static str> {
        match self {
            Dialect::Cisco => Some("terminal length 0"),
            Dialect::Huawei => Some("screen-length 0 temporary"),
            Dialect::H3c => Some("screen-length disable"),
            Dialect::Juniper => Some("set cli screen-length 0"),
            Dialect::Generic => None,
        }
    }

    /// Command entering privileged mode, when `prompt` shows an unprivileged session.
    pub fn escalation_for(&self, prompt: &str) -> Option<&'static str> {
        let unprivileged = prompt.trim_end().ends_with('>') && !prompt.trim_start().starts_with('<');
        match self {
            Dialect::Cisco if unprivileged => Some("enable"),
            _ => None,
        }
    }
}
