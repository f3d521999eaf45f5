use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;

use super::client::ConnectionLost;
use super::client::PubSubClient;
use super::client::PubSubError;
use crate::engine::Change;

/// Module name carried in every notification
pub const MODULE_NAME: &str = "datetime";

/// Hub-wide device notification topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Topic {
    #[strum(serialize = "sentinel.device.insert")]
    Insert,
    #[strum(serialize = "sentinel.device.update")]
    Update,
    #[strum(serialize = "sentinel.device.delete")]
    Delete,
}

/// Which cache a change came from; decides the topic it is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRole {
    /// Device descriptors: every write is announced as an insert
    Devices,
    /// Status snapshots: every write is announced as an update, deletes are silent
    Status,
}

impl CacheRole {
    pub fn topic_for<V>(self, change: &Change<V>) -> Option<Topic> {
        match (self, change) {
            (CacheRole::Devices, Change::Deleted { .. }) => Some(Topic::Delete),
            (CacheRole::Devices, _) => Some(Topic::Insert),
            (CacheRole::Status, Change::Deleted { .. }) => None,
            (CacheRole::Status, _) => Some(Topic::Update),
        }
    }
}

/// Wire format of a device notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification<T> {
    pub module: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
}

/// Serializes cache changes and publishes them on their topic
pub struct Publisher<C: PubSubClient> {
    client: Mutex<C>,
}

impl<C: PubSubClient> Publisher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    pub async fn connect(&self) -> Result<ConnectionLost, PubSubError> {
        self.client.lock().await.connect().await
    }

    /// Publish `change` according to `role`. Returns the topic used, if any.
    pub async fn publish_change<V: Serialize + Sync>(
        &self,
        role: CacheRole,
        change: &Change<V>,
    ) -> Result<Option<Topic>, PubSubError> {
        let Some(topic) = role.topic_for(change) else {
            return Ok(None);
        };

        self.publish(topic, change.key(), change.value()).await?;
        Ok(Some(topic))
    }

    pub async fn publish<T: Serialize + Sync>(
        &self,
        topic: Topic,
        id: &str,
        value: Option<&T>,
    ) -> Result<(), PubSubError> {
        let data = serde_json::to_string(&Notification {
            module: MODULE_NAME.to_string(),
            id: id.to_string(),
            value,
        })?;

        match topic {
            Topic::Update => debug!("{} => {}", topic, data),
            Topic::Insert | Topic::Delete => info!("{} => {}", topic, data),
        }

        self.client
            .lock()
            .await
            .publish(topic.as_ref(), data.as_bytes())
            .await
    }
}
