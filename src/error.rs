use crate::types::{DeviceIndex, Hand, InitError, ObjectId};
use std::fmt;

/// Transient failure reported by the host for a single query.
///
/// Never fatal: discovery skips the slot, the per-tick update falls back to out-of-range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("unknown property")]
    UnknownProperty,

    #[error("invalid device")]
    InvalidDevice,

    #[error("property not yet available")]
    NotYetAvailable,

    #[error("wrong property data type")]
    WrongDataType,

    #[error("host query failed (code {0})")]
    Failed(i32),
}

impl HostError {
    /// Maps a raw host property-error code. `0` means success and yields `None`.
    pub fn from_code(code: i32) -> Option<HostError> {
        match code {
            0 => None,
            1 => Some(HostError::WrongDataType),
            3 => Some(HostError::InvalidDevice),
            7 => Some(HostError::UnknownProperty),
            8 => Some(HostError::NotYetAvailable),
            other => Some(HostError::Failed(other)),
        }
    }
}

/// Errors returned by the mirroring driver.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("{hand} proxy already mirrors device {current}, refusing to rebind to {requested}")]
    AlreadyBound {
        hand: Hand,
        current: DeviceIndex,
        requested: DeviceIndex,
    },

    #[error("{hand} proxy is active as object {active}, refusing activation as {requested}")]
    ConflictingActivation {
        hand: Hand,
        active: ObjectId,
        requested: ObjectId,
    },

    #[error("activation with the invalid object id")]
    InvalidObjectId,

    #[error("host rejected the {hand} virtual controller: {error}")]
    RegistrationRejected { hand: Hand, error: InitError },

    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("driver provider already initialized")]
    AlreadyInitialized,

    #[error("driver provider not initialized")]
    NotInitialized,

    #[error("no {0} virtual controller is registered")]
    NoProxy(Hand),

    #[error("invalid hand value {0}")]
    InvalidHand(i32),
}

impl MirrorError {
    /// True for programming errors on the caller's side, as opposed to host-side failures.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            MirrorError::AlreadyBound { .. }
                | MirrorError::ConflictingActivation { .. }
                | MirrorError::InvalidObjectId
                | MirrorError::AlreadyInitialized
                | MirrorError::InvalidHand(_)
        )
    }

    /// Result code handed back to the host for a failed call.
    pub fn init_error(&self) -> InitError {
        match self {
            MirrorError::RegistrationRejected { error, .. } => *error,
            MirrorError::InterfaceNotFound(_) => InitError::InterfaceNotFound,
            MirrorError::NotInitialized | MirrorError::NoProxy(_) => InitError::DriverFailed,
            _ => InitError::Unknown,
        }
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &MirrorError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
