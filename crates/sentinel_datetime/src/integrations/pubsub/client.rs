use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::EventLoop;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::PubSubConfig;

/// Resolves with a reason once the broker connection is gone for good.
pub type ConnectionLost = oneshot::Receiver<String>;

#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    #[error("pub/sub client not connected. Call connect() first.")]
    NotConnected,

    #[error("failed to connect to pub/sub broker: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("failed to publish: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Trait for pub/sub client operations
///
/// This trait allows for mocking the broker connection for testing purposes
#[async_trait]
pub trait PubSubClient: Send + Sync {
    /// Connect to the broker
    ///
    /// Returns once the broker has accepted the connection. The returned
    /// receiver fires if the connection is later lost.
    async fn connect(&mut self) -> Result<ConnectionLost, PubSubError>;

    /// Publish a message to a topic
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PubSubError>;
}

/// Real pub/sub client implementation using rumqttc
pub struct RumqttcClient {
    /// Connection options (stored for lazy initialization)
    mqtt_options: MqttOptions,

    /// AsyncClient (created in connect())
    client: Option<AsyncClient>,

    /// Background event loop task handle
    event_loop_task: Option<JoinHandle<()>>,
}

impl RumqttcClient {
    pub fn new(config: &PubSubConfig) -> Self {
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);

        mqtt_options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        Self {
            mqtt_options,
            client: None,
            event_loop_task: None,
        }
    }

    /// Drive the event loop until the broker acknowledges the connection
    async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<(), PubSubError> {
        loop {
            if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl PubSubClient for RumqttcClient {
    async fn connect(&mut self) -> Result<ConnectionLost, PubSubError> {
        let (client, mut event_loop) = AsyncClient::new(self.mqtt_options.clone(), 10);

        Self::wait_for_connack(&mut event_loop).await?;
        tracing::info!("Connected to pub/sub broker");

        let (lost_tx, lost_rx) = oneshot::channel();

        // Outgoing publishes only make progress while the event loop is polled.
        // Any error here means the broker hung up.
        let task = tokio::spawn(async move {
            loop {
                if let Err(e) = event_loop.poll().await {
                    tracing::error!("Pub/sub event loop error: {}", e);
                    let _ = lost_tx.send(e.to_string());
                    break;
                }
            }
            tracing::info!("Pub/sub event loop task exiting");
        });

        self.client = Some(client);
        self.event_loop_task = Some(task);

        Ok(lost_rx)
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PubSubError> {
        let client = self.client.as_ref().ok_or(PubSubError::NotConnected)?;

        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;

        Ok(())
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}

/// Mock pub/sub client for testing
///
/// Clones share the published log, so a test can keep one while the
/// publisher owns another.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockPubSubClient {
    published: std::sync::Arc<std::sync::Mutex<Vec<(String, Vec<u8>)>>>,
    lost_tx: std::sync::Arc<std::sync::Mutex<Option<oneshot::Sender<String>>>>,
    is_connected: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MockPubSubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far as (topic, payload) pairs
    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(t, p)| (t.clone(), String::from_utf8_lossy(p).into_owned()))
            .collect()
    }

    /// Payloads published on `topic`
    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p)
            .collect()
    }

    /// Simulate the broker hanging up
    pub fn drop_connection(&self, reason: &str) {
        if let Some(tx) = self.lost_tx.lock().unwrap().take() {
            let _ = tx.send(reason.to_string());
        }
        self.is_connected
            .store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl PubSubClient for MockPubSubClient {
    async fn connect(&mut self) -> Result<ConnectionLost, PubSubError> {
        let (tx, rx) = oneshot::channel();
        *self.lost_tx.lock().unwrap() = Some(tx);
        self.is_connected
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(rx)
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PubSubError> {
        if !self.is_connected.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PubSubError::NotConnected);
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}
