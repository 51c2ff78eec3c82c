use std::fmt;

/// Fixed size of the host's tracked-device table.
pub const MAX_TRACKED_DEVICE_COUNT: usize = 64;

/// Raw value the host uses for "no device" in both index spaces.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Slot of a physical device in the host's device table.
///
/// Always `< MAX_TRACKED_DEVICE_COUNT`. This crate only reads through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(u32);

impl DeviceIndex {
    /// Returns `None` when `raw` lies outside the device table.
    pub const fn new(raw: u32) -> Option<DeviceIndex> {
        if (raw as usize) < MAX_TRACKED_DEVICE_COUNT {
            Some(DeviceIndex(raw))
        } else {
            None
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// All slots of the device table in ascending order, capped at `limit`.
    pub fn scan(limit: usize) -> impl Iterator<Item = DeviceIndex> {
        (0..limit.min(MAX_TRACKED_DEVICE_COUNT) as u32).map(DeviceIndex)
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Host-assigned handle of a virtual device, valid between `Activate` and `Deactivate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const INVALID: ObjectId = ObjectId(INVALID_INDEX);

    pub const fn new(raw: u32) -> ObjectId {
        ObjectId(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != INVALID_INDEX
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::INVALID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("invalid")
        }
    }
}

/// Device class reported by the host for a table slot.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Invalid = 0,
    Hmd = 1,
    Controller = 2,
    GenericTracker = 3,
    TrackingReference = 4,
    DisplayRedirect = 5,
}

impl From<i32> for DeviceClass {
    fn from(value: i32) -> Self {
        match value {
            1 => DeviceClass::Hmd,
            2 => DeviceClass::Controller,
            3 => DeviceClass::GenericTracker,
            4 => DeviceClass::TrackingReference,
            5 => DeviceClass::DisplayRedirect,
            _ => DeviceClass::Invalid,
        }
    }
}

/// Handedness of a physical controller, derived from the host's role hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRole {
    Unknown,
    LeftHand,
    RightHand,
}

impl ControllerRole {
    /// Maps the host's raw role-hint property value.
    pub fn from_hint(hint: i32) -> ControllerRole {
        match hint {
            1 => ControllerRole::LeftHand,
            2 => ControllerRole::RightHand,
            _ => ControllerRole::Unknown,
        }
    }

    pub fn hand(self) -> Option<Hand> {
        match self {
            ControllerRole::LeftHand => Some(Hand::Left),
            ControllerRole::RightHand => Some(Hand::Right),
            ControllerRole::Unknown => None,
        }
    }
}

/// Which of the two virtual controllers a call refers to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left = 0,
    Right = 1,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn from_raw(raw: i32) -> Option<Hand> {
        match raw {
            0 => Some(Hand::Left),
            1 => Some(Hand::Right),
            _ => None,
        }
    }

    pub fn role(self) -> ControllerRole {
        match self {
            Hand::Left => ControllerRole::LeftHand,
            Hand::Right => ControllerRole::RightHand,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking confidence as understood by the host.
///
/// Published poses only ever carry `Uninitialized`, `RunningOk` or
/// `RunningOutOfRange`; the remaining values can appear in physical snapshots.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingResult {
    #[default]
    Uninitialized = 1,
    CalibratingInProgress = 100,
    CalibratingOutOfRange = 101,
    RunningOk = 200,
    RunningOutOfRange = 201,
    FallbackRotationOnly = 300,
}

impl From<i32> for TrackingResult {
    fn from(value: i32) -> Self {
        match value {
            100 => TrackingResult::CalibratingInProgress,
            101 => TrackingResult::CalibratingOutOfRange,
            200 => TrackingResult::RunningOk,
            201 => TrackingResult::RunningOutOfRange,
            300 => TrackingResult::FallbackRotationOnly,
            _ => TrackingResult::Uninitialized,
        }
    }
}

/// Unit quaternion in the host's `[w, x, y, z]` field order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Quaternion {
        Quaternion { w, x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Dot product, used to compare rotations up to sign.
    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

/// 3x4 row-major affine transform: rotation block in columns 0..3, translation in column 3.
pub type HmdMatrix34 = [[f32; 4]; 3];

pub const IDENTITY_MATRIX34: HmdMatrix34 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// Per-tick snapshot of one physical device, as returned by the host's bulk pose query.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedDevicePose {
    pub device_to_absolute_tracking: HmdMatrix34,
    /// Linear velocity in m/s, tracking space.
    pub velocity: [f32; 3],
    /// Angular velocity in rad/s, tracking space.
    pub angular_velocity: [f32; 3],
    pub tracking_result: TrackingResult,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl Default for TrackedDevicePose {
    fn default() -> Self {
        TrackedDevicePose {
            device_to_absolute_tracking: IDENTITY_MATRIX34,
            velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
            tracking_result: TrackingResult::Uninitialized,
            pose_is_valid: false,
            device_is_connected: false,
        }
    }
}

/// Pose published for a virtual device on every tick.
///
/// The world-from-driver and driver-from-head transforms are always identity;
/// this crate does no secondary calibration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverPose {
    pub pose_time_offset: f64,
    pub q_world_from_driver_rotation: Quaternion,
    pub vec_world_from_driver_translation: [f64; 3],
    pub q_driver_from_head_rotation: Quaternion,
    pub vec_driver_from_head_translation: [f64; 3],
    pub vec_position: [f64; 3],
    pub vec_velocity: [f64; 3],
    pub q_rotation: Quaternion,
    pub vec_angular_velocity: [f64; 3],
    pub result: TrackingResult,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl DriverPose {
    /// Pose of a virtual device with no usable source: identity, zero velocity, invalid.
    pub const fn uninitialized() -> DriverPose {
        DriverPose {
            pose_time_offset: 0.0,
            q_world_from_driver_rotation: Quaternion::IDENTITY,
            vec_world_from_driver_translation: [0.0; 3],
            q_driver_from_head_rotation: Quaternion::IDENTITY,
            vec_driver_from_head_translation: [0.0; 3],
            vec_position: [0.0; 3],
            vec_velocity: [0.0; 3],
            q_rotation: Quaternion::IDENTITY,
            vec_angular_velocity: [0.0; 3],
            result: TrackingResult::Uninitialized,
            pose_is_valid: false,
            device_is_connected: false,
        }
    }
}

impl Default for DriverPose {
    fn default() -> Self {
        DriverPose::uninitialized()
    }
}

/// Result code of host registration and activation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    None,
    Unknown,
    InterfaceNotFound,
    DriverFailed,
    /// Any code this crate has no name for.
    Other(i32),
}

impl InitError {
    pub fn code(self) -> i32 {
        match self {
            InitError::None => 0,
            InitError::Unknown => 1,
            InitError::InterfaceNotFound => 105,
            InitError::DriverFailed => 200,
            InitError::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> InitError {
        match code {
            0 => InitError::None,
            1 => InitError::Unknown,
            105 => InitError::InterfaceNotFound,
            200 => InitError::DriverFailed,
            other => InitError::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == InitError::None
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::None => f.write_str("none"),
            InitError::Unknown => f.write_str("unknown"),
            InitError::InterfaceNotFound => f.write_str("interface not found"),
            InitError::DriverFailed => f.write_str("driver failed"),
            InitError::Other(code) => write!(f, "code {}", code),
        }
    }
}
