//! # vrmirror - virtual controllers mirrored from physical ones
//!
//! Registers up to two virtual tracked controllers with a host tracking
//! runtime and, on every host tick, republishes the pose of the physical
//! controller each one is bound to. Provides:
//! - Discovery of physical left/right controllers in the host's device table
//! - Per-tick pose mirroring with an explicit out-of-range fallback
//! - Numerically stable transform-to-quaternion conversion
//! - C FFI for loading as a driver plugin
//!
//! ## Quick Start
//! ```no_run
//! use vrmirror::{DriverHost, Hand, MirrorConfig, ObjectId, TrackedDeviceProvider};
//!
//! fn plugin<H: DriverHost>(host: H) -> vrmirror::Result<()> {
//!     let mut provider = TrackedDeviceProvider::init(host, MirrorConfig::from_env());
//!     // host callbacks
//!     provider.activate(Hand::Left, ObjectId::new(3))?;
//!     provider.run_frame();
//!     println!("left: {:?}", provider.get_pose(Hand::Left)?.vec_position);
//!     provider.cleanup();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod types;
pub mod transform;
pub mod host;
pub mod state;
pub mod component;
pub mod proxy;
pub mod discovery;
pub mod provider;
pub mod registry;
pub mod config;
pub mod ffi;

pub use config::MirrorConfig;
pub use error::{HostError, MirrorError};
pub use host::{DriverHost, PoseSnapshot};
pub use provider::TrackedDeviceProvider;
pub use proxy::ControllerProxy;
pub use registry::DriverRegistry;
pub use state::PoseState;
pub use types::*;

/// Result type alias for vrmirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;
