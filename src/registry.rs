use crate::config::MirrorConfig;
use crate::host::DriverHost;
use crate::provider::{TrackedDeviceProvider, SERVER_TRACKED_DEVICE_PROVIDER_VERSION};
use crate::{MirrorError, Result};

/// Holder of the one provider instance a plugin may expose.
///
/// Owned by whoever loads the plugin. The provider is created on the first
/// factory request (or an explicit [`DriverRegistry::init`]) and dropped by
/// [`DriverRegistry::cleanup`].
pub struct DriverRegistry<H: DriverHost> {
    provider: Option<TrackedDeviceProvider<H>>,
}

impl<H: DriverHost> DriverRegistry<H> {
    pub const fn new() -> Self {
        Self { provider: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.is_some()
    }

    /// Host factory entry: returns the provider for `interface_name`, creating it on first use.
    ///
    /// `connect` is only called when a new provider has to be built.
    pub fn factory<F>(&mut self, interface_name: &str, connect: F) -> Result<&mut TrackedDeviceProvider<H>>
    where
        F: FnOnce() -> (H, MirrorConfig),
    {
        if interface_name != SERVER_TRACKED_DEVICE_PROVIDER_VERSION {
            log::warn!("Factory request for unsupported interface {}", interface_name);
            return Err(MirrorError::InterfaceNotFound(interface_name.to_string()));
        }
        if self.provider.is_none() {
            let (host, config) = connect();
            self.provider = Some(TrackedDeviceProvider::init(host, config));
        }
        self.get_mut()
    }

    /// Creates the provider. Fails if one already exists.
    pub fn init(&mut self, host: H, config: MirrorConfig) -> Result<&mut TrackedDeviceProvider<H>> {
        if self.provider.is_some() {
            return Err(MirrorError::AlreadyInitialized);
        }
        self.provider = Some(TrackedDeviceProvider::init(host, config));
        self.get_mut()
    }

    pub fn get(&self) -> Result<&TrackedDeviceProvider<H>> {
        self.provider.as_ref().ok_or(MirrorError::NotInitialized)
    }

    pub fn get_mut(&mut self) -> Result<&mut TrackedDeviceProvider<H>> {
        self.provider.as_mut().ok_or(MirrorError::NotInitialized)
    }

    /// Tears the provider down. Idempotent.
    pub fn cleanup(&mut self) {
        if let Some(mut provider) = self.provider.take() {
            provider.cleanup();
            log::info!("Driver provider released");
        }
    }
}

impl<H: DriverHost> Default for DriverRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
