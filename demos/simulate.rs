//! Drive the mirroring provider against a simulated host for a few seconds of ticks.
//!
//! Usage: RUST_LOG=debug cargo run --example simulate
//!
//! The simulated table has an HMD, a left controller at index 2, a right
//! controller at index 5 and a second left controller at index 7. The left
//! controller spins about the vertical axis and drops out of tracking for a
//! while; the right one stays still.

use vrmirror::transform;
use vrmirror::{
    DeviceClass, DeviceIndex, DriverHost, DriverPose, Hand, HostError, InitError, MirrorConfig,
    ObjectId, TrackedDevicePose, TrackedDeviceProvider, TrackingResult, MAX_TRACKED_DEVICE_COUNT,
};

const TICK_HZ: f64 = 90.0;

struct SimHost {
    tick: u64,
    next_object_id: u32,
    registered: Vec<(String, Hand, ObjectId)>,
    published: u64,
    last: Option<(ObjectId, DriverPose)>,
}

impl SimHost {
    fn new() -> Self {
        Self {
            tick: 0,
            next_object_id: 1,
            registered: Vec::new(),
            published: 0,
            last: None,
        }
    }

    fn left_pose(&self) -> TrackedDevicePose {
        let t = self.tick as f64 / TICK_HZ;
        let q = transform::axis_angle([0.0, 1.0, 0.0], t * std::f64::consts::PI);
        // tracking lost between 1.0s and 1.5s
        let lost = (TICK_HZ as u64..(TICK_HZ * 1.5) as u64).contains(&self.tick);
        TrackedDevicePose {
            device_to_absolute_tracking: transform::matrix_from_quaternion(&q, [-0.2, 1.0, -0.3]),
            velocity: [0.0; 3],
            angular_velocity: [0.0, std::f32::consts::PI, 0.0],
            tracking_result: if lost {
                TrackingResult::RunningOutOfRange
            } else {
                TrackingResult::RunningOk
            },
            pose_is_valid: !lost,
            device_is_connected: true,
        }
    }
}

impl DriverHost for SimHost {
    fn tracked_device_class(&self, index: DeviceIndex) -> Result<DeviceClass, HostError> {
        Ok(match index.get() {
            0 => DeviceClass::Hmd,
            2 | 5 | 7 => DeviceClass::Controller,
            _ => DeviceClass::Invalid,
        })
    }

    fn controller_role_hint(&self, index: DeviceIndex) -> Result<i32, HostError> {
        match index.get() {
            2 | 7 => Ok(1),
            5 => Ok(2),
            _ => Err(HostError::UnknownProperty),
        }
    }

    fn tracked_device_added(&mut self, serial: &str, _class: DeviceClass, hand: Hand) -> InitError {
        let id = ObjectId::new(self.next_object_id);
        self.next_object_id += 1;
        println!("host: registered {} ({}) as object {}", serial, hand, id);
        self.registered.push((serial.to_string(), hand, id));
        InitError::None
    }

    fn raw_tracked_device_poses(&mut self, out: &mut [TrackedDevicePose]) -> Result<(), HostError> {
        for (i, pose) in out.iter_mut().enumerate().take(MAX_TRACKED_DEVICE_COUNT) {
            *pose = match i {
                2 => self.left_pose(),
                5 => TrackedDevicePose {
                    device_to_absolute_tracking: transform::matrix_from_quaternion(
                        &vrmirror::Quaternion::IDENTITY,
                        [0.2, 1.0, -0.3],
                    ),
                    tracking_result: TrackingResult::RunningOk,
                    pose_is_valid: true,
                    device_is_connected: true,
                    ..TrackedDevicePose::default()
                },
                _ => TrackedDevicePose::default(),
            };
        }
        Ok(())
    }

    fn tracked_device_pose_updated(&mut self, object_id: ObjectId, pose: &DriverPose) {
        self.published += 1;
        self.last = Some((object_id, *pose));
    }
}

fn main() {
    env_logger::init();

    let mut provider = TrackedDeviceProvider::init(SimHost::new(), MirrorConfig::from_env());

    // the host activates every device it accepted
    let registered = provider.host().registered.clone();
    for (_, hand, id) in registered {
        if let Err(e) = provider.activate(hand, id) {
            eprintln!("Activation failed: {}", e);
            std::process::exit(1);
        }
    }

    let ticks = (TICK_HZ * 2.0) as u64;
    for tick in 0..ticks {
        provider.host_mut().tick = tick;
        provider.run_frame();

        if tick % 15 == 0 {
            for hand in Hand::ALL {
                if let Ok(pose) = provider.get_pose(hand) {
                    let q = pose.q_rotation;
                    println!(
                        "t={:>3} {:<5} valid={:<5} result={:<18} pos=[{:+.3}, {:+.3}, {:+.3}] quat=[{:+.3}, {:+.3}, {:+.3}, {:+.3}]",
                        tick,
                        hand.as_str(),
                        pose.pose_is_valid,
                        format!("{:?}", pose.result),
                        pose.vec_position[0],
                        pose.vec_position[1],
                        pose.vec_position[2],
                        q.w,
                        q.x,
                        q.y,
                        q.z,
                    );
                }
            }
        }
    }

    provider.enter_standby();
    if let Some((id, pose)) = provider.host().last {
        println!("standby republished for object {}: valid={}", id, pose.pose_is_valid);
    }

    println!("\nTotal: {} poses published over {} ticks", provider.host().published, ticks);
    provider.cleanup();
}
