//! Broker connection and event dispatch

use crate::topics::{parse_message, status_payload};
use crate::{OFFLINE, ONLINE, Result};
use oledd_config::MqttConfig;
use oledd_display::{SharedScheduler, Status};
use rumqttc::{
    AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS, SubscribeFilter,
};
use std::time::Duration;
use tokio::sync::watch;

/// Capacity of the client request queue
const REQUEST_CAPACITY: usize = 32;

/// Time allowed to flush `offline` and disconnect on shutdown
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Connection options for `config`
///
/// The availability topic carries a retained `offline` last will.
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(true);
    options.set_last_will(LastWill::new(
        &config.topics.availability,
        OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    if config.has_credentials() {
        options.set_credentials(&config.user, &config.password);
    }
    options
}

/// One broker session feeding the shared scheduler
pub struct MqttIngress {
    config: MqttConfig,
    scheduler: SharedScheduler,
}

impl MqttIngress {
    pub fn new(config: MqttConfig, scheduler: SharedScheduler) -> Self {
        Self { config, scheduler }
    }

    /// Poll the broker until `shutdown` turns true
    ///
    /// Connection errors are retried after the reconnect delay. Status
    /// changes are published only while connected. Failing to queue the
    /// subscriptions on connect ends the session with an error.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(&self.config), REQUEST_CAPACITY);
        let mut status = self.scheduler.subscribe();
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);
        let mut connected = false;

        tracing::info!(
            "Connecting to MQTT broker {}:{} as {}",
            self.config.broker,
            self.config.port,
            self.config.client_id
        );

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = status.changed() => {
                    if changed.is_ok() {
                        let current = *status.borrow_and_update();
                        self.on_status_change(&client, connected, &current);
                    }
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        self.on_connect(&client)?;
                        connected = true;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.dispatch(&publish.topic, &publish.payload);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        connected = false;
                        tracing::warn!(
                            "MQTT connection error: {}, retrying in {}s",
                            e,
                            delay.as_secs()
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                },
            }
        }

        self.go_offline(&client, &mut eventloop).await;
        Ok(())
    }

    /// Subscriptions do not survive a clean-session reconnect
    fn on_connect(&self, client: &AsyncClient) -> Result<()> {
        let topics = &self.config.topics;
        let filters: Vec<_> = topics
            .subscriptions()
            .into_iter()
            .map(|topic| SubscribeFilter::new(topic, QoS::AtLeastOnce))
            .collect();

        client.try_subscribe_many(filters)?;
        client.try_publish(&topics.availability, QoS::AtLeastOnce, true, ONLINE)?;
        self.publish_status(client, &self.scheduler.status())?;

        tracing::info!("Connected to MQTT broker, listening on {}", topics.subscriptions().join(", "));
        Ok(())
    }

    fn dispatch(&self, topic: &str, payload: &[u8]) {
        match parse_message(&self.config.topics, topic, payload) {
            Ok(event) => {
                tracing::debug!("Received {} on {}", event.kind(), topic);
                // Rejected events are logged by the scheduler
                let _ = self.scheduler.handle_event(event);
            }
            Err(e) => tracing::warn!("Ignoring message: {}", e),
        }
    }

    /// The current status is republished on every connect, so changes
    /// while disconnected are dropped
    fn on_status_change(&self, client: &AsyncClient, connected: bool, status: &Status) {
        if !connected {
            tracing::debug!("Broker unavailable, status {} deferred", status.current_screen);
            return;
        }
        if let Err(e) = self.publish_status(client, status) {
            tracing::warn!("Failed to publish status: {}", e);
        }
    }

    fn publish_status(&self, client: &AsyncClient, status: &Status) -> Result<()> {
        let payload = status_payload(status)?;
        client.try_publish(&self.config.topics.status, QoS::AtLeastOnce, true, payload)?;
        tracing::debug!(
            "Status: mode {} screen {} brightness {}",
            status.mode,
            status.current_screen,
            status.brightness
        );
        Ok(())
    }

    async fn go_offline(&self, client: &AsyncClient, eventloop: &mut EventLoop) {
        let availability = &self.config.topics.availability;
        if let Err(e) = client.try_publish(availability, QoS::AtLeastOnce, true, OFFLINE) {
            tracing::warn!("Failed to queue offline status: {}", e);
        }
        if let Err(e) = client.try_disconnect() {
            tracing::warn!("Failed to queue disconnect: {}", e);
            return;
        }

        let drained = tokio::time::timeout(DISCONNECT_GRACE, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("Connection closed during shutdown: {}", e);
                        break;
                    }
                }
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::info!("Disconnected from MQTT broker"),
            Err(_) => tracing::warn!("MQTT disconnect timed out"),
        }
    }
}
