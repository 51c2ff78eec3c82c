use crate::error::HostError;
use crate::types::{
    DeviceClass, DeviceIndex, DriverPose, Hand, InitError, ObjectId, TrackedDevicePose,
    MAX_TRACKED_DEVICE_COUNT,
};

/// Boundary to the host tracking runtime.
///
/// The host owns the device table, schedules ticks and consumes published
/// poses. All calls happen on the host's frame thread.
pub trait DriverHost {
    /// Class of the device in `index`. Absent slots report `DeviceClass::Invalid`.
    fn tracked_device_class(&self, index: DeviceIndex) -> Result<DeviceClass, HostError>;

    /// Raw controller role hint property of the device in `index`.
    fn controller_role_hint(&self, index: DeviceIndex) -> Result<i32, HostError>;

    /// Requests registration of a virtual device. `InitError::None` means accepted.
    ///
    /// `hand` is the handle the host uses afterwards to address the new device's lifecycle.
    fn tracked_device_added(&mut self, serial: &str, class: DeviceClass, hand: Hand) -> InitError;

    /// Fills `out` with the current pose of every physical device, keyed by index.
    fn raw_tracked_device_poses(&mut self, out: &mut [TrackedDevicePose]) -> Result<(), HostError>;

    /// Publishes the pose of an active virtual device. Fire and forget.
    fn tracked_device_pose_updated(&mut self, object_id: ObjectId, pose: &DriverPose);
}

/// Fixed-capacity copy of the host's device poses for one tick.
///
/// Reused across ticks so the frame path never allocates.
pub struct PoseSnapshot {
    poses: [TrackedDevicePose; MAX_TRACKED_DEVICE_COUNT],
    valid: bool,
}

impl PoseSnapshot {
    pub fn new() -> Self {
        Self {
            poses: [TrackedDevicePose::default(); MAX_TRACKED_DEVICE_COUNT],
            valid: false,
        }
    }

    /// Pulls the current poses from the host. On failure every lookup misses until the next refresh.
    pub fn refresh<H: DriverHost + ?Sized>(&mut self, host: &mut H) {
        match host.raw_tracked_device_poses(&mut self.poses) {
            Ok(()) => self.valid = true,
            Err(e) => {
                if self.valid {
                    log::warn!("Device pose query failed: {}", e);
                }
                self.valid = false;
            }
        }
    }

    /// Pose of the device in `index`, if the last refresh succeeded.
    pub fn get(&self, index: DeviceIndex) -> Option<&TrackedDevicePose> {
        if self.valid {
            self.poses.get(index.as_usize())
        } else {
            None
        }
    }

    /// Overwrites one entry and marks the snapshot valid.
    pub fn set(&mut self, index: DeviceIndex, pose: TrackedDevicePose) {
        self.poses[index.as_usize()] = pose;
        self.valid = true;
    }
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockHost;
    use super::*;
    use crate::types::Quaternion;

    #[test]
    fn test_snapshot_misses_before_refresh() {
        let snapshot = PoseSnapshot::new();
        assert!(snapshot.get(DeviceIndex::new(0).unwrap()).is_none());
    }

    #[test]
    fn test_snapshot_refresh_and_failure() {
        let idx = DeviceIndex::new(4).unwrap();
        let mut host = MockHost::empty();
        host.track(4, Quaternion::IDENTITY, [1.0, 2.0, 3.0]);

        let mut snapshot = PoseSnapshot::new();
        snapshot.refresh(&mut host);
        let pose = snapshot.get(idx).unwrap();
        assert!(pose.pose_is_valid);
        assert_eq!(pose.device_to_absolute_tracking[1][3], 2.0);

        host.pose_query_error = Some(HostError::Failed(-1));
        snapshot.refresh(&mut host);
        assert!(snapshot.get(idx).is_none());
        assert_eq!(host.pose_queries, 2);
    }
}
