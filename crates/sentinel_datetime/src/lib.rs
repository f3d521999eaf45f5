#[cfg(feature = "http_api")]
pub mod api;
pub mod config;
mod engine;
mod integrations;

pub use config::Config;
pub use config::LogLevel;
pub use config::StatusProfile;
pub use engine::Clock;
pub use engine::ComposeError;
pub use engine::Composer;
pub use engine::DatetimeModule;
pub use engine::Device;
pub use engine::DeviceModule;
pub use engine::ModuleError;
pub use engine::PollState;
pub use engine::Scheduler;
pub use engine::StatusSnapshot;
pub use engine::SunEvent;
pub use engine::SystemClock;
pub use engine::Weekday;
pub use integrations::pubsub::ConnectionLost;
pub use integrations::pubsub::Notification;
pub use integrations::pubsub::PubSubClient;
pub use integrations::pubsub::PubSubError;
pub use integrations::pubsub::Publisher;
pub use integrations::pubsub::RumqttcClient;
pub use integrations::pubsub::Topic;
pub use integrations::sunrise::HttpSunriseClient;
pub use integrations::sunrise::SunriseClient;
pub use integrations::sunrise::SunInstant;
pub use integrations::sunrise::SunTimes;
pub use integrations::sunrise::SunriseError;
pub use integrations::sunrise::SunriseResponse;
