use crate::config::MirrorConfig;
use crate::discovery;
use crate::host::{DriverHost, PoseSnapshot};
use crate::proxy::ControllerProxy;
use crate::types::{DeviceClass, DeviceIndex, DriverPose, Hand, ObjectId};
use crate::{MirrorError, Result};

/// Interface version strings this provider implements.
pub const SERVER_TRACKED_DEVICE_PROVIDER_VERSION: &str = "IServerTrackedDeviceProvider_004";

static INTERFACE_VERSIONS: [&str; 1] = [SERVER_TRACKED_DEVICE_PROVIDER_VERSION];

/// Owns the host connection and at most one virtual controller per hand.
///
/// Discovery and registration happen once in [`TrackedDeviceProvider::init`];
/// afterwards the host drives everything through [`TrackedDeviceProvider::run_frame`]
/// and the lifecycle forwards.
pub struct TrackedDeviceProvider<H: DriverHost> {
    host: H,
    config: MirrorConfig,
    left: Option<ControllerProxy>,
    right: Option<ControllerProxy>,
    snapshot: PoseSnapshot,
}

impl<H: DriverHost> TrackedDeviceProvider<H> {
    /// Scans the host's device table and registers a virtual controller for each hand found.
    ///
    /// A hand the host refuses to register stays unmirrored for the session.
    pub fn init(host: H, config: MirrorConfig) -> Self {
        let mut provider = Self {
            host,
            config,
            left: None,
            right: None,
            snapshot: PoseSnapshot::new(),
        };

        let found = discovery::scan(&provider.host, &provider.config);
        for hand in Hand::ALL {
            if let Some(index) = found.get(hand) {
                match provider.register(hand, index) {
                    Ok(proxy) => *provider.slot_mut(hand) = Some(proxy),
                    Err(e) => log::warn!("{} (not mirroring this hand)", e),
                }
            }
        }

        log::info!(
            "Provider ready: {} virtual controller(s) (left={:?} right={:?})",
            provider.bound_count(),
            provider.left.as_ref().and_then(|p| p.source()).map(DeviceIndex::get),
            provider.right.as_ref().and_then(|p| p.source()).map(DeviceIndex::get),
        );
        provider
    }

    fn register(&mut self, hand: Hand, index: DeviceIndex) -> Result<ControllerProxy> {
        let serial = self.config.serial(hand);
        let result = self
            .host
            .tracked_device_added(&serial, DeviceClass::Controller, hand);
        if !result.is_ok() {
            return Err(MirrorError::RegistrationRejected { hand, error: result });
        }
        log::info!("Registered {} as {} virtual controller", serial, hand);

        let mut proxy = ControllerProxy::new(hand, serial);
        proxy.bind_physical_source(index)?;
        Ok(proxy)
    }

    pub fn interface_versions(&self) -> &'static [&'static str] {
        &INTERFACE_VERSIONS
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn proxy(&self, hand: Hand) -> Option<&ControllerProxy> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    fn slot_mut(&mut self, hand: Hand) -> &mut Option<ControllerProxy> {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    fn proxy_mut(&mut self, hand: Hand) -> Result<&mut ControllerProxy> {
        self.slot_mut(hand).as_mut().ok_or(MirrorError::NoProxy(hand))
    }

    pub fn bound_count(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }

    /// One host tick: refresh the pose snapshot once, then update every virtual controller.
    pub fn run_frame(&mut self) {
        let any_active = self.left.as_ref().is_some_and(ControllerProxy::is_active)
            || self.right.as_ref().is_some_and(ControllerProxy::is_active);
        if !any_active {
            return;
        }

        self.snapshot.refresh(&mut self.host);
        for proxy in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            proxy.run_frame(&self.snapshot, &mut self.host);
        }
    }

    pub fn activate(&mut self, hand: Hand, object_id: ObjectId) -> Result<()> {
        self.proxy_mut(hand)?.activate(object_id)
    }

    pub fn deactivate(&mut self, hand: Hand) -> Result<()> {
        self.proxy_mut(hand)?.deactivate();
        Ok(())
    }

    /// Per-device standby request; publishes the standby pose immediately.
    pub fn device_enter_standby(&mut self, hand: Hand) -> Result<()> {
        let proxy = match hand {
            Hand::Left => self.left.as_mut(),
            Hand::Right => self.right.as_mut(),
        }
        .ok_or(MirrorError::NoProxy(hand))?;
        proxy.enter_standby(&mut self.host);
        Ok(())
    }

    pub fn device_leave_standby(&mut self, hand: Hand) -> Result<()> {
        self.proxy_mut(hand)?.leave_standby();
        Ok(())
    }

    pub fn get_pose(&self, hand: Hand) -> Result<DriverPose> {
        self.proxy(hand)
            .map(ControllerProxy::get_pose)
            .ok_or(MirrorError::NoProxy(hand))
    }

    /// System-wide standby: forwarded to every virtual controller.
    pub fn enter_standby(&mut self) {
        log::info!("Provider entering standby");
        for proxy in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            proxy.enter_standby(&mut self.host);
        }
    }

    pub fn leave_standby(&mut self) {
        log::info!("Provider leaving standby");
        for proxy in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            proxy.leave_standby();
        }
    }

    /// Mirrored controllers never keep the system awake.
    pub fn should_block_standby(&self) -> bool {
        false
    }

    /// Releases both virtual controllers. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if self.bound_count() > 0 {
            log::info!("Provider cleanup: releasing {} virtual controller(s)", self.bound_count());
        }
        self.left = None;
        self.right = None;
    }
}
