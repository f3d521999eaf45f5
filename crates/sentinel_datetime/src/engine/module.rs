use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::cache::{Cache, CacheError, Change};
use super::composer::{ComposeError, Composer};
use super::device::Device;
use super::status::StatusSnapshot;
use crate::integrations::pubsub::{
    CacheRole, ConnectionLost, PubSubClient, PubSubError, Publisher, MODULE_NAME,
};
use crate::integrations::sunrise::SunriseClient;

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    PubSub(#[from] PubSubError),
}

/// Query surface shared by the hub's device modules.
#[async_trait]
pub trait DeviceModule: Send + Sync {
    /// Module name used in notifications
    fn name(&self) -> &str;

    /// All devices that currently have a status, with `current` filled in
    async fn get_devices(&self) -> Result<Vec<Device>, ModuleError>;

    /// Latest status of one device
    async fn get_device_status(&self, id: &str) -> Result<Option<StatusSnapshot>, ModuleError>;

    /// Re-read the module's devices. Nothing to re-read for the timer.
    async fn reload(&self) -> Result<Vec<Device>, ModuleError>;
}

/// The date/time device module
///
/// Owns the device and status caches; every write is handed to the publisher
/// before the call returns.
pub struct DatetimeModule<S: SunriseClient, P: PubSubClient> {
    device_id: String,
    devices: Cache<Device>,
    statuses: Cache<StatusSnapshot>,
    composer: Composer<S>,
    publisher: Publisher<P>,
}

impl<S: SunriseClient, P: PubSubClient> DatetimeModule<S, P> {
    pub fn new(device_id: impl Into<String>, composer: Composer<S>, publisher: Publisher<P>) -> Self {
        Self {
            device_id: device_id.into(),
            devices: Cache::new(),
            statuses: Cache::new(),
            composer,
            publisher,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Connect the notification channel
    pub async fn connect(&self) -> Result<ConnectionLost, ModuleError> {
        Ok(self.publisher.connect().await?)
    }

    /// Register the timer device and compute its first status
    pub async fn bootstrap(&self) -> Result<(), ModuleError> {
        self.register_device().await?;
        self.refresh().await?;
        info!("Timer device {} ready", self.device_id);
        Ok(())
    }

    /// Put the timer descriptor into the device cache
    pub async fn register_device(&self) -> Result<(), ModuleError> {
        let change = self.devices.set(self.device_id.clone(), Device::timer(&self.device_id))?;
        self.announce(CacheRole::Devices, &change).await;
        Ok(())
    }

    /// Compose a fresh snapshot and store it
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<(), ModuleError> {
        let snapshot = self.composer.compose().await?;
        let change = self.statuses.set(self.device_id.clone(), snapshot)?;
        self.announce(CacheRole::Status, &change).await;
        Ok(())
    }

    /// Drop a device from both caches. Returns whether it was known.
    pub async fn remove_device(&self, id: &str) -> Result<bool, ModuleError> {
        if let Some(change) = self.statuses.delete(id)? {
            self.announce(CacheRole::Status, &change).await;
        }

        match self.devices.delete(id)? {
            Some(change) => {
                self.announce(CacheRole::Devices, &change).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Publish a cache change; the write has already happened, so failures are only logged
    async fn announce<V: Serialize + Sync>(&self, role: CacheRole, change: &Change<V>) {
        if let Err(e) = self.publisher.publish_change(role, change).await {
            warn!("Failed to publish change for {}: {}", change.key(), e);
        }
    }
}

#[async_trait]
impl<S: SunriseClient, P: PubSubClient> DeviceModule for DatetimeModule<S, P> {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    async fn get_devices(&self) -> Result<Vec<Device>, ModuleError> {
        let ids = self.devices.keys()?;
        let mut devices = self.devices.mget(&ids)?;
        let mut statuses = self.statuses.mget(&ids)?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                let device = devices.remove(id)?;
                let status = statuses.remove(id)?;
                Some(device.with_current(status))
            })
            .collect())
    }

    async fn get_device_status(&self, id: &str) -> Result<Option<StatusSnapshot>, ModuleError> {
        Ok(self.statuses.get(id)?)
    }

    async fn reload(&self) -> Result<Vec<Device>, ModuleError> {
        Ok(Vec::new())
    }
}
