//! C FFI layer for vrmirror.
//!
//! The plugin shim owns a `VmRegistry` handle and forwards the host's
//! provider and device callbacks to it. The host itself is reached through a
//! `VmHostCallbacks` table. The generated C header is written to
//! `include/vrmirror.h` by cbindgen.

use crate::config::MirrorConfig;
use crate::error::{HostError, LastError};
use crate::host::DriverHost;
use crate::registry::DriverRegistry;
use crate::types::{
    DeviceClass, DeviceIndex, DriverPose, Hand, HmdMatrix34, InitError, ObjectId,
    TrackedDevicePose, TrackingResult, IDENTITY_MATRIX34, MAX_TRACKED_DEVICE_COUNT,
};
use crate::MirrorError;
use std::ffi::{c_char, c_int, c_void, CStr, CString};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Device pose as written by the host's bulk pose callback.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VmTrackedDevicePose {
    /// Row-major 3x4 device-to-tracking transform.
    pub device_to_absolute_tracking: HmdMatrix34,
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    /// Host tracking result code (200 = running OK).
    pub tracking_result: c_int,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl VmTrackedDevicePose {
    const EMPTY: VmTrackedDevicePose = VmTrackedDevicePose {
        device_to_absolute_tracking: IDENTITY_MATRIX34,
        velocity: [0.0; 3],
        angular_velocity: [0.0; 3],
        tracking_result: TrackingResult::Uninitialized as c_int,
        pose_is_valid: false,
        device_is_connected: false,
    };
}

impl From<&VmTrackedDevicePose> for TrackedDevicePose {
    fn from(raw: &VmTrackedDevicePose) -> Self {
        TrackedDevicePose {
            device_to_absolute_tracking: raw.device_to_absolute_tracking,
            velocity: raw.velocity,
            angular_velocity: raw.angular_velocity,
            tracking_result: TrackingResult::from(raw.tracking_result),
            pose_is_valid: raw.pose_is_valid,
            device_is_connected: raw.device_is_connected,
        }
    }
}

/// Host entry points, called back on the host's frame thread.
///
/// Property callbacks return a host property-error code (0 = success) and
/// write their value through the out pointer. `device_added` returns an init
/// error code (0 = accepted). `device_poses` fills `count` entries and returns
/// 0 on success. Any callback left NULL counts as failing.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VmHostCallbacks {
    pub context: *mut c_void,
    pub device_class:
        Option<unsafe extern "C" fn(context: *mut c_void, index: u32, out_class: *mut c_int) -> c_int>,
    pub controller_role_hint:
        Option<unsafe extern "C" fn(context: *mut c_void, index: u32, out_role: *mut i32) -> c_int>,
    pub device_added: Option<
        unsafe extern "C" fn(
            context: *mut c_void,
            serial: *const c_char,
            device_class: c_int,
            hand: c_int,
        ) -> c_int,
    >,
    pub device_poses: Option<
        unsafe extern "C" fn(context: *mut c_void, out: *mut VmTrackedDevicePose, count: u32) -> c_int,
    >,
    pub pose_updated:
        Option<unsafe extern "C" fn(context: *mut c_void, object_id: u32, pose: *const DriverPose)>,
}

/// [`DriverHost`] backed by a C callback table.
pub struct CallbackHost {
    callbacks: VmHostCallbacks,
    scratch: [VmTrackedDevicePose; MAX_TRACKED_DEVICE_COUNT],
}

impl CallbackHost {
    /// # Safety
    /// Every non-NULL callback must be safe to call with `callbacks.context`
    /// for as long as the host lives.
    pub unsafe fn new(callbacks: VmHostCallbacks) -> Self {
        Self {
            callbacks,
            scratch: [VmTrackedDevicePose::EMPTY; MAX_TRACKED_DEVICE_COUNT],
        }
    }
}

impl DriverHost for CallbackHost {
    fn tracked_device_class(&self, index: DeviceIndex) -> Result<DeviceClass, HostError> {
        let f = self.callbacks.device_class.ok_or(HostError::Failed(-1))?;
        let mut raw: c_int = 0;
        let code = unsafe { f(self.callbacks.context, index.get(), &mut raw) };
        match HostError::from_code(code) {
            None => Ok(DeviceClass::from(raw)),
            Some(e) => Err(e),
        }
    }

    fn controller_role_hint(&self, index: DeviceIndex) -> Result<i32, HostError> {
        let f = self.callbacks.controller_role_hint.ok_or(HostError::Failed(-1))?;
        let mut raw: i32 = 0;
        let code = unsafe { f(self.callbacks.context, index.get(), &mut raw) };
        match HostError::from_code(code) {
            None => Ok(raw),
            Some(e) => Err(e),
        }
    }

    fn tracked_device_added(&mut self, serial: &str, class: DeviceClass, hand: Hand) -> InitError {
        let Some(f) = self.callbacks.device_added else {
            return InitError::DriverFailed;
        };
        let Ok(serial) = CString::new(serial) else {
            return InitError::Unknown;
        };
        let code = unsafe {
            f(
                self.callbacks.context,
                serial.as_ptr(),
                class as c_int,
                hand as c_int,
            )
        };
        InitError::from_code(code)
    }

    fn raw_tracked_device_poses(&mut self, out: &mut [TrackedDevicePose]) -> Result<(), HostError> {
        let f = self.callbacks.device_poses.ok_or(HostError::Failed(-1))?;
        let count = out.len().min(self.scratch.len());
        let code = unsafe { f(self.callbacks.context, self.scratch.as_mut_ptr(), count as u32) };
        if code != 0 {
            return Err(HostError::Failed(code));
        }
        for (dst, src) in out.iter_mut().zip(self.scratch[..count].iter()) {
            *dst = TrackedDevicePose::from(src);
        }
        Ok(())
    }

    fn tracked_device_pose_updated(&mut self, object_id: ObjectId, pose: &DriverPose) {
        if let Some(f) = self.callbacks.pose_updated {
            unsafe { f(self.callbacks.context, object_id.get(), pose) };
        }
    }
}

/// Opaque registry handle for C consumers.
pub struct VmRegistry(DriverRegistry<CallbackHost>);

fn report(err: MirrorError) -> c_int {
    let code = err.init_error().code();
    LAST_ERROR.set(&err);
    code
}

fn hand_from_raw(hand: c_int) -> Result<Hand, MirrorError> {
    Hand::from_raw(hand).ok_or(MirrorError::InvalidHand(hand))
}

/// Run `f` against the registered provider, mapping errors to init error codes.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
unsafe fn with_provider(
    reg: *mut VmRegistry,
    f: impl FnOnce(&mut crate::TrackedDeviceProvider<CallbackHost>) -> crate::Result<()>,
) -> c_int {
    if reg.is_null() {
        return report(MirrorError::NotInitialized);
    }
    let reg = &mut *reg;
    match reg.0.get_mut().and_then(f) {
        Ok(()) => InitError::None.code(),
        Err(e) => report(e),
    }
}

/// Create an empty registry. Free it with `vm_registry_free`.
#[no_mangle]
pub extern "C" fn vm_registry_new() -> *mut VmRegistry {
    Box::into_raw(Box::new(VmRegistry(DriverRegistry::new())))
}

/// Tear down the provider (if any) and free the registry.
///
/// # Safety
/// `reg` must be a pointer returned by `vm_registry_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_registry_free(reg: *mut VmRegistry) {
    if !reg.is_null() {
        let mut reg = Box::from_raw(reg);
        reg.0.cleanup();
    }
}

/// Factory entry point. Creates the provider on the first request for the
/// provider interface, scanning the host's devices through `callbacks`.
///
/// Returns 0 on success or an init error code (105 = interface not found).
/// The code is also written to `return_code` when it is not null.
///
/// # Safety
/// `reg` must be a valid registry pointer; `interface_name` a NUL-terminated
/// string; `callbacks` must point to a callback table whose functions stay
/// valid until `vm_registry_cleanup` or `vm_registry_free`.
#[no_mangle]
pub unsafe extern "C" fn vm_driver_factory(
    reg: *mut VmRegistry,
    interface_name: *const c_char,
    callbacks: *const VmHostCallbacks,
    return_code: *mut c_int,
) -> c_int {
    let code = if reg.is_null() || interface_name.is_null() || callbacks.is_null() {
        report(MirrorError::NotInitialized)
    } else {
        let reg = &mut *reg;
        let name = CStr::from_ptr(interface_name).to_string_lossy();
        let callbacks = *callbacks;
        match reg.0.factory(&name, || {
            (CallbackHost::new(callbacks), MirrorConfig::from_env())
        }) {
            Ok(_) => InitError::None.code(),
            Err(e) => report(e),
        }
    };
    if !return_code.is_null() {
        return_code.write(code);
    }
    code
}

/// Release the provider. Safe to call repeatedly.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_registry_cleanup(reg: *mut VmRegistry) {
    if !reg.is_null() {
        (*reg).0.cleanup();
    }
}

/// Per-tick update of every virtual controller.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_run_frame(reg: *mut VmRegistry) {
    if reg.is_null() {
        return;
    }
    if let Ok(provider) = (*reg).0.get_mut() {
        provider.run_frame();
    }
}

/// Device `Activate` callback. `hand`: 0 = left, 1 = right.
/// Returns 0 on success or an init error code.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_activate(reg: *mut VmRegistry, hand: c_int, object_id: u32) -> c_int {
    with_provider(reg, |p| p.activate(hand_from_raw(hand)?, ObjectId::new(object_id)))
}

/// Device `Deactivate` callback.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_deactivate(reg: *mut VmRegistry, hand: c_int) -> c_int {
    with_provider(reg, |p| p.deactivate(hand_from_raw(hand)?))
}

/// Device `EnterStandby` callback; the standby pose is published before returning.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_enter_standby(reg: *mut VmRegistry, hand: c_int) -> c_int {
    with_provider(reg, |p| p.device_enter_standby(hand_from_raw(hand)?))
}

/// Device `LeaveStandby` callback; the next frame re-evaluates the source.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_leave_standby(reg: *mut VmRegistry, hand: c_int) -> c_int {
    with_provider(reg, |p| p.device_leave_standby(hand_from_raw(hand)?))
}

/// Device `GetPose` callback. Writes the last published pose to `out`.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null; `out` must be writable, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_get_pose(reg: *mut VmRegistry, hand: c_int, out: *mut DriverPose) -> c_int {
    with_provider(reg, |p| {
        let pose = p.get_pose(hand_from_raw(hand)?)?;
        if !out.is_null() {
            out.write(pose);
        }
        Ok(())
    })
}

/// Device `GetComponent` callback. Always NULL: no optional components are implemented.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null; `name` a NUL-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_get_component(
    reg: *mut VmRegistry,
    hand: c_int,
    name: *const c_char,
) -> *mut c_void {
    if reg.is_null() || name.is_null() {
        return std::ptr::null_mut();
    }
    let name = CStr::from_ptr(name).to_string_lossy();
    let supported = Hand::from_raw(hand)
        .and_then(|hand| (*reg).0.get().ok()?.proxy(hand)?.get_component(&name));
    if let Some(cap) = supported {
        log::warn!("Component {:?} advertised but has no implementation", cap);
    }
    std::ptr::null_mut()
}

/// Device `DebugRequest` callback. Writes an empty string into `response`.
///
/// # Safety
/// `request` must be a NUL-terminated string, or null; `response` must point
/// to `response_size` writable bytes, or be null.
#[no_mangle]
pub unsafe extern "C" fn vm_device_debug_request(
    reg: *mut VmRegistry,
    hand: c_int,
    request: *const c_char,
    response: *mut c_char,
    response_size: u32,
) {
    if response.is_null() || response_size == 0 {
        return;
    }
    let buf = std::slice::from_raw_parts_mut(response as *mut u8, response_size as usize);
    let request = if request.is_null() {
        String::new()
    } else {
        CStr::from_ptr(request).to_string_lossy().into_owned()
    };
    let proxy = if reg.is_null() {
        None
    } else {
        Hand::from_raw(hand).and_then(|hand| (*reg).0.get().ok()?.proxy(hand))
    };
    match proxy {
        Some(proxy) => proxy.debug_request(&request, buf),
        None => buf[0] = 0,
    }
}

/// Provider-level `EnterStandby`: forwarded to every virtual controller.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_enter_standby(reg: *mut VmRegistry) {
    if !reg.is_null() {
        if let Ok(provider) = (*reg).0.get_mut() {
            provider.enter_standby();
        }
    }
}

/// Provider-level `LeaveStandby`.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_leave_standby(reg: *mut VmRegistry) {
    if !reg.is_null() {
        if let Ok(provider) = (*reg).0.get_mut() {
            provider.leave_standby();
        }
    }
}

/// Always false: mirrored controllers never block system standby.
///
/// # Safety
/// `reg` must be a valid registry pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vm_should_block_standby(reg: *const VmRegistry) -> bool {
    if reg.is_null() {
        return false;
    }
    (*reg).0.get().map(|p| p.should_block_standby()).unwrap_or(false)
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next failing vrmirror call.
#[no_mangle]
pub extern "C" fn vm_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
