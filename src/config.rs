use crate::types::{Hand, MAX_TRACKED_DEVICE_COUNT};

pub const ENV_SERIAL_PREFIX: &str = "VRMIRROR_SERIAL_PREFIX";
pub const ENV_MIRROR_LEFT: &str = "VRMIRROR_MIRROR_LEFT";
pub const ENV_MIRROR_RIGHT: &str = "VRMIRROR_MIRROR_RIGHT";
pub const ENV_SCAN_LIMIT: &str = "VRMIRROR_SCAN_LIMIT";

const DEFAULT_SERIAL_PREFIX: &str = "vrmirror";

/// Driver settings. Plugins usually build this with [`MirrorConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Registration serials are `<prefix>_left` and `<prefix>_right`.
    pub serial_prefix: String,
    pub mirror_left: bool,
    pub mirror_right: bool,
    /// Number of device-table slots scanned at startup.
    pub scan_limit: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            serial_prefix: DEFAULT_SERIAL_PREFIX.to_string(),
            mirror_left: true,
            mirror_right: true,
            scan_limit: MAX_TRACKED_DEVICE_COUNT,
        }
    }
}

impl MirrorConfig {
    /// Reads the `VRMIRROR_*` variables; unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let config = Self {
            serial_prefix: read_string(&lookup, ENV_SERIAL_PREFIX, &defaults.serial_prefix),
            mirror_left: read_bool(&lookup, ENV_MIRROR_LEFT, defaults.mirror_left),
            mirror_right: read_bool(&lookup, ENV_MIRROR_RIGHT, defaults.mirror_right),
            scan_limit: read_usize(&lookup, ENV_SCAN_LIMIT, defaults.scan_limit)
                .min(MAX_TRACKED_DEVICE_COUNT),
        };
        log::info!(
            "Mirror config: serialPrefix={} left={} right={} scanLimit={}",
            config.serial_prefix,
            config.mirror_left,
            config.mirror_right,
            config.scan_limit
        );
        config
    }

    pub fn with_serial_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.serial_prefix = prefix.into();
        self
    }

    pub fn with_mirrored(mut self, hand: Hand, enabled: bool) -> Self {
        match hand {
            Hand::Left => self.mirror_left = enabled,
            Hand::Right => self.mirror_right = enabled,
        }
        self
    }

    pub fn with_scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit.min(MAX_TRACKED_DEVICE_COUNT);
        self
    }

    pub fn mirrors(&self, hand: Hand) -> bool {
        match hand {
            Hand::Left => self.mirror_left,
            Hand::Right => self.mirror_right,
        }
    }

    pub fn serial(&self, hand: Hand) -> String {
        format!("{}_{}", self.serial_prefix, hand.as_str())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    lookup(name).and_then(|v| parse_bool(&v)).unwrap_or(default)
}

fn read_usize(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    lookup(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn read_string(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
