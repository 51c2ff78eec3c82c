use crate::host::PoseSnapshot;
use crate::transform;
use crate::types::{DeviceIndex, DriverPose, Quaternion, TrackedDevicePose, TrackingResult};

/// Where a virtual device's pose currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseState {
    /// No physical source assigned.
    Unbound,
    /// Last tick copied a valid physical pose.
    Tracking,
    /// Last tick found no usable physical pose.
    OutOfRange,
    /// Host requested standby.
    Standby,
}

/// Per-device pose state: binding, current state and the last published pose.
///
/// Advanced once per tick by [`PoseStateMachine::tick`]; no smoothing or
/// hysteresis between `Tracking` and `OutOfRange`.
pub struct PoseStateMachine {
    source: Option<DeviceIndex>,
    state: PoseState,
    pose: DriverPose,
}

impl PoseStateMachine {
    pub fn new() -> Self {
        Self {
            source: None,
            state: PoseState::Unbound,
            pose: DriverPose::uninitialized(),
        }
    }

    pub fn state(&self) -> PoseState {
        self.state
    }

    pub fn source(&self) -> Option<DeviceIndex> {
        self.source
    }

    /// Last pose produced by a tick or a standby transition.
    pub fn pose(&self) -> &DriverPose {
        &self.pose
    }

    /// Assigns the physical device to mirror. The caller enforces the one-time rule.
    pub(crate) fn bind(&mut self, index: DeviceIndex) {
        self.source = Some(index);
    }

    /// Marks the virtual device logically connected, as on host activation.
    pub(crate) fn mark_connected(&mut self) {
        self.pose.device_is_connected = true;
    }

    /// Advances one tick from the current host snapshot and returns the pose to publish.
    pub fn tick(&mut self, snapshot: &PoseSnapshot) -> &DriverPose {
        if self.state == PoseState::Standby {
            return &self.pose;
        }

        let next = match self.source {
            None => {
                self.pose.vec_velocity = [0.0; 3];
                self.pose.vec_angular_velocity = [0.0; 3];
                self.pose.pose_is_valid = false;
                self.pose.result = TrackingResult::Uninitialized;
                self.pose.device_is_connected = false;
                PoseState::Unbound
            }
            Some(index) => match snapshot
                .get(index)
                .and_then(|source| usable(source).map(|(p, q)| (source, p, q)))
            {
                Some((source, position, rotation)) => {
                    self.pose.vec_position = position;
                    self.pose.q_rotation = rotation;
                    self.pose.vec_velocity = source.velocity.map(f64::from);
                    self.pose.vec_angular_velocity = source.angular_velocity.map(f64::from);
                    self.pose.pose_is_valid = true;
                    self.pose.result = TrackingResult::RunningOk;
                    self.pose.device_is_connected = true;
                    PoseState::Tracking
                }
                None => {
                    // keep the last known placement, drop motion
                    self.pose.vec_velocity = [0.0; 3];
                    self.pose.vec_angular_velocity = [0.0; 3];
                    self.pose.pose_is_valid = false;
                    self.pose.result = TrackingResult::RunningOutOfRange;
                    self.pose.device_is_connected = true;
                    PoseState::OutOfRange
                }
            },
        };

        self.transition(next);
        &self.pose
    }

    /// Forces `Standby`. The returned pose is what must be republished right away.
    pub fn enter_standby(&mut self) -> &DriverPose {
        self.pose.pose_is_valid = false;
        self.pose.result = TrackingResult::Uninitialized;
        self.pose.vec_velocity = [0.0; 3];
        self.pose.vec_angular_velocity = [0.0; 3];
        self.transition(PoseState::Standby);
        &self.pose
    }

    /// Leaves `Standby`; the next tick re-evaluates the source.
    pub fn leave_standby(&mut self) {
        if self.state != PoseState::Standby {
            return;
        }
        let next = if self.source.is_some() {
            PoseState::OutOfRange
        } else {
            PoseState::Unbound
        };
        self.transition(next);
    }

    fn transition(&mut self, next: PoseState) {
        if self.state != next {
            log::debug!(
                "Pose state {:?} -> {:?} (source {:?})",
                self.state,
                next,
                self.source.map(DeviceIndex::get)
            );
            self.state = next;
        }
    }
}

impl Default for PoseStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Source pose split into position and rotation, or `None` if it must not be mirrored.
fn usable(source: &TrackedDevicePose) -> Option<([f64; 3], Quaternion)> {
    if !source.device_is_connected || !source.pose_is_valid {
        return None;
    }
    if !source
        .velocity
        .iter()
        .chain(source.angular_velocity.iter())
        .all(|v| v.is_finite())
    {
        return None;
    }
    transform::decompose(&source.device_to_absolute_tracking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::axis_angle;
    use crate::types::IDENTITY_MATRIX34;

    fn idx(i: u32) -> DeviceIndex {
        DeviceIndex::new(i).unwrap()
    }

    fn tracked(position: [f64; 3]) -> TrackedDevicePose {
        let q = axis_angle([0.0, 1.0, 0.0], 0.5);
        TrackedDevicePose {
            device_to_absolute_tracking: transform::matrix_from_quaternion(&q, position),
            velocity: [1.0, 0.0, 0.0],
            angular_velocity: [0.0, 0.0, 2.0],
            tracking_result: TrackingResult::RunningOk,
            pose_is_valid: true,
            device_is_connected: true,
        }
    }

    fn snapshot_with(index: u32, pose: TrackedDevicePose) -> PoseSnapshot {
        let mut snapshot = PoseSnapshot::new();
        snapshot.set(idx(index), pose);
        snapshot
    }

    /// Only three flag combinations may ever be published.
    fn assert_consistent(pose: &DriverPose) {
        match pose.result {
            TrackingResult::RunningOk => assert!(pose.pose_is_valid),
            TrackingResult::RunningOutOfRange | TrackingResult::Uninitialized => {
                assert!(!pose.pose_is_valid)
            }
            other => panic!("unexpected published result {:?}", other),
        }
        assert!(pose.q_rotation.is_finite());
        assert!((pose.q_rotation.norm() - 1.0).abs() < 1e-6);
        assert!(pose.vec_position.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unbound_publishes_uninitialized() {
        let mut machine = PoseStateMachine::new();
        machine.mark_connected();
        let pose = *machine.tick(&snapshot_with(0, tracked([0.0; 3])));
        assert_eq!(machine.state(), PoseState::Unbound);
        assert!(!pose.pose_is_valid);
        assert!(!pose.device_is_connected);
        assert_eq!(pose.result, TrackingResult::Uninitialized);
        assert_consistent(&pose);
    }

    #[test]
    fn test_tracking_copies_source() {
        let mut machine = PoseStateMachine::new();
        machine.bind(idx(3));
        let pose = *machine.tick(&snapshot_with(3, tracked([0.1, 1.2, -0.3])));
        assert_eq!(machine.state(), PoseState::Tracking);
        assert!(pose.pose_is_valid);
        assert!(pose.device_is_connected);
        assert_eq!(pose.result, TrackingResult::RunningOk);
        assert!((pose.vec_position[1] - 1.2).abs() < 1e-6);
        assert_eq!(pose.vec_velocity, [1.0, 0.0, 0.0]);
        assert_eq!(pose.vec_angular_velocity, [0.0, 0.0, 2.0]);
        let expected = axis_angle([0.0, 1.0, 0.0], 0.5);
        assert!((pose.q_rotation.dot(&expected).abs() - 1.0).abs() < 1e-5);
        assert_eq!(pose.q_world_from_driver_rotation, Quaternion::IDENTITY);
        assert_consistent(&pose);
    }

    #[test]
    fn test_flips_every_tick_without_hysteresis() {
        let mut machine = PoseStateMachine::new();
        machine.bind(idx(1));
        let good = snapshot_with(1, tracked([0.0, 1.0, 0.0]));
        let mut lost = tracked([0.0, 1.0, 0.0]);
        lost.device_is_connected = false;
        let lost = snapshot_with(1, lost);

        for (snapshot, expected) in [
            (&good, PoseState::Tracking),
            (&lost, PoseState::OutOfRange),
            (&good, PoseState::Tracking),
            (&lost, PoseState::OutOfRange),
        ] {
            let pose = *machine.tick(snapshot);
            assert_eq!(machine.state(), expected);
            assert_consistent(&pose);
        }
    }

    #[test]
    fn test_out_of_range_cases() {
        let mut invalid = tracked([0.0; 3]);
        invalid.pose_is_valid = false;
        let mut disconnected = tracked([0.0; 3]);
        disconnected.device_is_connected = false;
        let mut nan_matrix = tracked([0.0; 3]);
        nan_matrix.device_to_absolute_tracking[0][0] = f32::NAN;
        let mut nan_velocity = tracked([0.0; 3]);
        nan_velocity.velocity[2] = f32::INFINITY;

        for source in [invalid, disconnected, nan_matrix, nan_velocity] {
            let mut machine = PoseStateMachine::new();
            machine.bind(idx(0));
            let pose = *machine.tick(&snapshot_with(0, source));
            assert_eq!(machine.state(), PoseState::OutOfRange);
            assert!(!pose.pose_is_valid);
            assert!(pose.device_is_connected);
            assert_eq!(pose.result, TrackingResult::RunningOutOfRange);
            assert_consistent(&pose);
        }
    }

    #[test]
    fn test_failed_query_is_out_of_range() {
        let mut machine = PoseStateMachine::new();
        machine.bind(idx(0));
        let pose = *machine.tick(&PoseSnapshot::new());
        assert_eq!(machine.state(), PoseState::OutOfRange);
        assert_eq!(pose.result, TrackingResult::RunningOutOfRange);
    }

    #[test]
    fn test_out_of_range_keeps_last_placement() {
        let mut machine = PoseStateMachine::new();
        machine.bind(idx(2));
        machine.tick(&snapshot_with(2, tracked([0.5, 1.0, 0.0])));
        let pose = *machine.tick(&PoseSnapshot::new());
        assert!((pose.vec_position[0] - 0.5).abs() < 1e-6);
        assert_eq!(pose.vec_velocity, [0.0; 3]);
        assert_eq!(pose.vec_angular_velocity, [0.0; 3]);
    }

    #[test]
    fn test_standby_overrides_ticks_until_left() {
        let mut machine = PoseStateMachine::new();
        machine.bind(idx(0));
        let good = snapshot_with(0, tracked([0.0; 3]));
        machine.tick(&good);

        let pose = *machine.enter_standby();
        assert_eq!(machine.state(), PoseState::Standby);
        assert!(!pose.pose_is_valid);
        assert_eq!(pose.result, TrackingResult::Uninitialized);
        // connectivity untouched
        assert!(pose.device_is_connected);

        let pose = *machine.tick(&good);
        assert_eq!(machine.state(), PoseState::Standby);
        assert!(!pose.pose_is_valid);

        machine.leave_standby();
        assert_eq!(machine.state(), PoseState::OutOfRange);
        machine.tick(&good);
        assert_eq!(machine.state(), PoseState::Tracking);
    }

    #[test]
    fn test_leave_standby_unbound() {
        let mut machine = PoseStateMachine::new();
        machine.enter_standby();
        machine.leave_standby();
        assert_eq!(machine.state(), PoseState::Unbound);
        machine.leave_standby();
        assert_eq!(machine.state(), PoseState::Unbound);
        let source = TrackedDevicePose {
            device_to_absolute_tracking: IDENTITY_MATRIX34,
            ..tracked([0.0; 3])
        };
        let pose = machine.tick(&snapshot_with(0, source));
        assert!(!pose.pose_is_valid);
    }
}
