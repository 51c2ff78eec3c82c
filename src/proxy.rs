use crate::component::{Capabilities, ComponentTable};
use crate::host::{DriverHost, PoseSnapshot};
use crate::state::{PoseState, PoseStateMachine};
use crate::types::{DeviceIndex, DriverPose, Hand, ObjectId};
use crate::{MirrorError, Result};

/// A virtual controller whose pose is copied from one physical controller.
///
/// Owned by the provider. The host addresses it through its [`Hand`] and the
/// object id handed over in [`ControllerProxy::activate`].
pub struct ControllerProxy {
    hand: Hand,
    serial: String,
    object_id: ObjectId,
    machine: PoseStateMachine,
    components: ComponentTable,
}

impl ControllerProxy {
    pub fn new(hand: Hand, serial: impl Into<String>) -> Self {
        Self {
            hand,
            serial: serial.into(),
            object_id: ObjectId::INVALID,
            machine: PoseStateMachine::new(),
            components: ComponentTable::none(),
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn is_active(&self) -> bool {
        self.object_id.is_valid()
    }

    pub fn source(&self) -> Option<DeviceIndex> {
        self.machine.source()
    }

    pub fn state(&self) -> PoseState {
        self.machine.state()
    }

    /// Assigns the physical device to mirror.
    ///
    /// Binding is one-time: repeating the same index is a no-op, a different
    /// index is rejected with [`MirrorError::AlreadyBound`].
    pub fn bind_physical_source(&mut self, index: DeviceIndex) -> Result<()> {
        match self.machine.source() {
            Some(current) if current == index => Ok(()),
            Some(current) => {
                log::warn!(
                    "Refusing to rebind {} controller from {} to {}",
                    self.hand,
                    current,
                    index
                );
                Err(MirrorError::AlreadyBound {
                    hand: self.hand,
                    current,
                    requested: index,
                })
            }
            None => {
                log::info!("{} controller mirrors device {}", self.hand, index);
                self.machine.bind(index);
                Ok(())
            }
        }
    }

    /// Records the host-assigned identity and marks the device logically connected.
    ///
    /// Re-activation with the current id is accepted; a different id while
    /// active is rejected.
    pub fn activate(&mut self, object_id: ObjectId) -> Result<()> {
        if !object_id.is_valid() {
            return Err(MirrorError::InvalidObjectId);
        }
        if self.object_id.is_valid() && self.object_id != object_id {
            log::warn!(
                "{} controller already active as {}, rejecting activation as {}",
                self.hand,
                self.object_id,
                object_id
            );
            return Err(MirrorError::ConflictingActivation {
                hand: self.hand,
                active: self.object_id,
                requested: object_id,
            });
        }
        if self.object_id != object_id {
            log::info!("{} controller activated as object {}", self.hand, object_id);
        }
        self.object_id = object_id;
        self.machine.mark_connected();
        Ok(())
    }

    /// Invalidates the identity. Binding and last pose are kept.
    pub fn deactivate(&mut self) {
        if self.object_id.is_valid() {
            log::info!("{} controller deactivated (object {})", self.hand, self.object_id);
        }
        self.object_id = ObjectId::INVALID;
    }

    /// Enters standby and republishes the standby pose within this call.
    pub fn enter_standby<H: DriverHost + ?Sized>(&mut self, host: &mut H) {
        log::info!("{} controller entering standby", self.hand);
        let pose = self.machine.enter_standby();
        if self.object_id.is_valid() {
            host.tracked_device_pose_updated(self.object_id, pose);
        }
    }

    pub fn leave_standby(&mut self) {
        if self.machine.state() == PoseState::Standby {
            log::info!("{} controller leaving standby", self.hand);
        }
        self.machine.leave_standby();
    }

    /// One tick: advance the pose state and publish it. No-op while inactive.
    pub fn run_frame<H: DriverHost + ?Sized>(&mut self, snapshot: &PoseSnapshot, host: &mut H) {
        if !self.object_id.is_valid() {
            return;
        }
        let pose = self.machine.tick(snapshot);
        host.tracked_device_pose_updated(self.object_id, pose);
    }

    /// Last published pose, without recomputation.
    pub fn get_pose(&self) -> DriverPose {
        *self.machine.pose()
    }

    /// Optional component lookup; this device implements none.
    pub fn get_component(&self, name_and_version: &str) -> Option<Capabilities> {
        self.components.lookup(name_and_version)
    }

    /// Answers a host debug request with an empty NUL-terminated string.
    pub fn debug_request(&self, request: &str, response: &mut [u8]) {
        log::debug!("{} controller debug request: {}", self.hand, request);
        if let Some(first) = response.first_mut() {
            *first = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::types::{Quaternion, TrackingResult};

    fn idx(i: u32) -> DeviceIndex {
        DeviceIndex::new(i).unwrap()
    }

    fn bound_proxy(index: u32) -> ControllerProxy {
        let mut proxy = ControllerProxy::new(Hand::Left, "vrmirror_left");
        proxy.bind_physical_source(idx(index)).unwrap();
        proxy
    }

    fn snapshot(host: &mut MockHost) -> PoseSnapshot {
        let mut snapshot = PoseSnapshot::new();
        snapshot.refresh(host);
        snapshot
    }

    #[test]
    fn test_run_frame_before_activate_is_noop() {
        let mut host = MockHost::empty();
        host.track(2, Quaternion::IDENTITY, [0.0; 3]);
        let snap = snapshot(&mut host);
        let mut proxy = bound_proxy(2);

        proxy.run_frame(&snap, &mut host);
        assert!(host.published.is_empty());
        assert_eq!(proxy.state(), PoseState::Unbound);
    }

    #[test]
    fn test_run_frame_publishes_under_object_id() {
        let mut host = MockHost::empty();
        host.track(2, Quaternion::IDENTITY, [0.0, 1.5, 0.0]);
        let snap = snapshot(&mut host);
        let mut proxy = bound_proxy(2);
        proxy.activate(ObjectId::new(7)).unwrap();

        proxy.run_frame(&snap, &mut host);
        let (id, pose) = host.last_published().unwrap();
        assert_eq!(*id, ObjectId::new(7));
        assert!(pose.pose_is_valid);
        assert_eq!(pose.result, TrackingResult::RunningOk);
        assert_eq!(proxy.get_pose(), *pose);
    }

    #[test]
    fn test_deactivate_stops_publishing_until_reactivated() {
        let mut host = MockHost::empty();
        host.track(2, Quaternion::IDENTITY, [0.0; 3]);
        let snap = snapshot(&mut host);
        let mut proxy = bound_proxy(2);
        proxy.activate(ObjectId::new(3)).unwrap();
        proxy.run_frame(&snap, &mut host);
        assert_eq!(host.published.len(), 1);

        proxy.deactivate();
        assert!(!proxy.is_active());
        proxy.run_frame(&snap, &mut host);
        proxy.run_frame(&snap, &mut host);
        assert_eq!(host.published.len(), 1);
        // binding and last pose survive deactivation
        assert_eq!(proxy.source(), Some(idx(2)));
        assert!(proxy.get_pose().pose_is_valid);

        proxy.activate(ObjectId::new(4)).unwrap();
        proxy.run_frame(&snap, &mut host);
        assert_eq!(host.published.len(), 2);
        assert_eq!(host.last_published().unwrap().0, ObjectId::new(4));
    }

    #[test]
    fn test_activation_policy() {
        let mut proxy = bound_proxy(0);
        assert!(matches!(
            proxy.activate(ObjectId::INVALID),
            Err(MirrorError::InvalidObjectId)
        ));
        proxy.activate(ObjectId::new(1)).unwrap();
        proxy.activate(ObjectId::new(1)).unwrap();
        let err = proxy.activate(ObjectId::new(2)).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(proxy.object_id(), ObjectId::new(1));
    }

    #[test]
    fn test_activate_marks_connected() {
        let mut proxy = bound_proxy(0);
        assert!(!proxy.get_pose().device_is_connected);
        proxy.activate(ObjectId::new(1)).unwrap();
        assert!(proxy.get_pose().device_is_connected);
    }

    #[test]
    fn test_rebinding_is_rejected() {
        let mut proxy = bound_proxy(2);
        proxy.bind_physical_source(idx(2)).unwrap();
        let err = proxy.bind_physical_source(idx(7)).unwrap_err();
        assert!(matches!(err, MirrorError::AlreadyBound { .. }));
        assert!(err.is_contract_violation());
        assert_eq!(proxy.source(), Some(idx(2)));
    }

    #[test]
    fn test_enter_standby_publishes_immediately() {
        let mut host = MockHost::empty();
        host.track(2, Quaternion::IDENTITY, [0.0; 3]);
        let snap = snapshot(&mut host);
        let mut proxy = bound_proxy(2);
        proxy.activate(ObjectId::new(5)).unwrap();
        proxy.run_frame(&snap, &mut host);
        assert!(proxy.get_pose().pose_is_valid);

        proxy.enter_standby(&mut host);
        assert_eq!(host.published.len(), 2);
        let (_, pose) = host.last_published().unwrap();
        assert!(!pose.pose_is_valid);
        assert_eq!(pose.result, TrackingResult::Uninitialized);
        assert!(!proxy.get_pose().pose_is_valid);

        proxy.leave_standby();
        proxy.run_frame(&snap, &mut host);
        assert!(host.last_published().unwrap().1.pose_is_valid);
    }

    #[test]
    fn test_enter_standby_while_inactive_does_not_publish() {
        let mut host = MockHost::empty();
        let mut proxy = bound_proxy(2);
        proxy.enter_standby(&mut host);
        assert!(host.published.is_empty());
        assert_eq!(proxy.state(), PoseState::Standby);
    }

    #[test]
    fn test_get_pose_is_side_effect_free() {
        let mut host = MockHost::empty();
        let snap = snapshot(&mut host);
        let mut proxy = bound_proxy(1);
        proxy.activate(ObjectId::new(1)).unwrap();
        proxy.run_frame(&snap, &mut host);
        let a = proxy.get_pose();
        let b = proxy.get_pose();
        assert_eq!(a, b);
        assert_eq!(host.published.len(), 1);
    }

    #[test]
    fn test_components_and_debug_request() {
        let proxy = ControllerProxy::new(Hand::Right, "vrmirror_right");
        assert_eq!(proxy.get_component("IVRDriverInput_003"), None);
        assert_eq!(proxy.get_component("IVRDisplayComponent_002"), None);

        let mut buf = [b'x'; 8];
        proxy.debug_request("ping", &mut buf);
        assert_eq!(buf[0], 0);
        proxy.debug_request("ping", &mut []);
    }
}
