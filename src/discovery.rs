use crate::config::MirrorConfig;
use crate::host::DriverHost;
use crate::types::{ControllerRole, DeviceClass, DeviceIndex, Hand};

/// Physical controllers chosen as mirror sources, one per hand at most.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discovered {
    pub left: Option<DeviceIndex>,
    pub right: Option<DeviceIndex>,
}

impl Discovered {
    pub fn get(&self, hand: Hand) -> Option<DeviceIndex> {
        match hand {
            Hand::Left => self.left,
            Hand::Right => self.right,
        }
    }

    fn slot(&mut self, hand: Hand) -> &mut Option<DeviceIndex> {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Classifies the physical device in `index`. Any failed query yields `None`.
pub fn classify<H: DriverHost + ?Sized>(host: &H, index: DeviceIndex) -> Option<ControllerRole> {
    match host.tracked_device_class(index) {
        Ok(DeviceClass::Controller) => {}
        Ok(DeviceClass::Invalid) => return None,
        Ok(other) => {
            log::debug!("Device {} is {:?}, not a controller", index, other);
            return None;
        }
        Err(e) => {
            log::warn!("Device class query for {} failed: {} (skipping)", index, e);
            return None;
        }
    }

    match host.controller_role_hint(index) {
        Ok(hint) => {
            let role = ControllerRole::from_hint(hint);
            log::debug!("Device {} is a controller, role {:?}", index, role);
            Some(role)
        }
        Err(e) => {
            log::warn!("Role hint query for {} failed: {} (skipping)", index, e);
            None
        }
    }
}

/// Scans the device table in ascending index order. The first controller of each hand wins.
pub fn scan<H: DriverHost + ?Sized>(host: &H, config: &MirrorConfig) -> Discovered {
    let mut found = Discovered::default();

    for index in DeviceIndex::scan(config.scan_limit) {
        let Some(hand) = classify(host, index).and_then(ControllerRole::hand) else {
            continue;
        };
        if !config.mirrors(hand) {
            log::debug!("Ignoring {} controller {} (mirroring disabled)", hand, index);
            continue;
        }
        let slot = found.slot(hand);
        match *slot {
            Some(first) => {
                log::info!(
                    "Ignoring {} controller {}, already mirroring {}",
                    hand,
                    index,
                    first
                );
            }
            None => {
                log::info!("Found {} controller at {}", hand, index);
                *slot = Some(index);
            }
        }
    }

    if found.is_empty() {
        log::info!("No physical controllers found to mirror");
    }
    found
}
