//! Capability lookup behind the host's `GetComponent(name_and_version)` call.

bitflags::bitflags! {
    /// Optional device components a host may ask a tracked device for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    pub struct Capabilities: u32 {
        const DISPLAY        = 1 << 0;
        const DRIVER_INPUT   = 1 << 1;
        const CAMERA         = 1 << 2;
        const VIRTUAL_DISPLAY = 1 << 3;
        const DIRECT_MODE    = 1 << 4;
    }
}

const COMPONENT_NAMES: &[(&str, Capabilities)] = &[
    ("IVRDisplayComponent", Capabilities::DISPLAY),
    ("IVRDriverInput", Capabilities::DRIVER_INPUT),
    ("IVRCameraComponent", Capabilities::CAMERA),
    ("IVRVirtualDisplay", Capabilities::VIRTUAL_DISPLAY),
    ("IVRDriverDirectModeComponent", Capabilities::DIRECT_MODE),
];

impl Capabilities {
    /// Parses a versioned component name such as `IVRDisplayComponent_003`.
    pub fn from_component_name(name_and_version: &str) -> Option<Capabilities> {
        let name = match name_and_version.rsplit_once('_') {
            Some((name, version)) if version.chars().all(|c| c.is_ascii_digit()) => name,
            _ => name_and_version,
        };
        COMPONENT_NAMES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, cap)| *cap)
    }
}

/// Table of the components a device implements.
pub struct ComponentTable {
    supported: Capabilities,
}

impl ComponentTable {
    /// A device that implements no optional component.
    pub const fn none() -> Self {
        Self {
            supported: Capabilities::empty(),
        }
    }

    pub fn supported(&self) -> Capabilities {
        self.supported
    }

    /// Resolves a host component request. `None` means "unsupported".
    pub fn lookup(&self, name_and_version: &str) -> Option<Capabilities> {
        match Capabilities::from_component_name(name_and_version) {
            Some(cap) if self.supported.contains(cap) => Some(cap),
            Some(_) => {
                log::debug!("Component {} not implemented", name_and_version);
                None
            }
            None => {
                log::debug!("Unknown component request {}", name_and_version);
                None
            }
        }
    }
}

impl Default for ComponentTable {
    fn default() -> Self {
        Self::none()
    }
}
