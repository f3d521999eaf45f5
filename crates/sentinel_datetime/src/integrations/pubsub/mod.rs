//! Device change notifications over MQTT.

mod client;
mod publisher;

#[cfg(test)]
pub use client::MockPubSubClient;
pub use client::ConnectionLost;
pub use client::PubSubClient;
pub use client::PubSubError;
pub use client::RumqttcClient;
pub use publisher::CacheRole;
pub use publisher::Notification;
pub use publisher::Publisher;
pub use publisher::Topic;
pub use publisher::MODULE_NAME;
