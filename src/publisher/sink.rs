//! Trait abstraction for the pub/sub transport to enable testing

use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::MqttConfig;
use crate::error::{JoystickControlError, Result};

/// Capacity of the client request queue. Publishes beyond it are dropped.
const REQUEST_QUEUE_CAPACITY: usize = 16;

/// Fire-and-forget message publishing
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send {
    /// Queue `payload` for `topic` without waiting for delivery.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// MQTT sink using rumqttc
///
/// Publishes with QoS 0. The client event loop runs on a background task
/// that reconnects on failure.
pub struct MqttSink {
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

impl std::fmt::Debug for MqttSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSink").finish_non_exhaustive()
    }
}

impl MqttSink {
    /// Create the client and start its event loop.
    ///
    /// Must be called from within a tokio runtime. The broker does not need
    /// to be reachable yet.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_control::config::MqttConfig;
    /// use joystick_control::publisher::sink::{MessageSink, MqttSink};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut sink = MqttSink::connect(&MqttConfig::default());
    ///     sink.publish("testJoystick", br#"{"valid":true,"axes":[0.0,0.0]}"#.to_vec())?;
    ///     Ok(())
    /// }
    /// ```
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_s));

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let reconnect_interval = Duration::from_millis(config.reconnect_interval_ms);
        let broker = format!("{}:{}", config.host, config.port);

        let event_loop = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to MQTT broker at {}", broker);
                    }
                    Ok(event) => trace!("MQTT event: {:?}", event),
                    Err(e) => {
                        warn!("MQTT connection to {} failed: {}", broker, e);
                        tokio::time::sleep(reconnect_interval).await;
                    }
                }
            }
        });

        Self { client, event_loop }
    }
}

impl MessageSink for MqttSink {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| match e {
                ClientError::TryRequest(_) => {
                    JoystickControlError::Publish("request queue full".to_string())
                }
                other => JoystickControlError::Publish(other.to_string()),
            })
    }
}

impl Drop for MqttSink {
    fn drop(&mut self) {
        debug!("Stopping MQTT event loop");
        self.event_loop.abort();
    }
}
