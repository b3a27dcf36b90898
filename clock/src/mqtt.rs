use std::time::Duration;

use deskclock_common::{
    topics, ClimateSample, DiscoveryConfig, MqttConfig, RuntimeConfig, TemperatureUnit,
};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
struct MqttSettings {
    broker: MqttConfig,
    hostname: String,
    unit: TemperatureUnit,
}

impl MqttSettings {
    fn resolve(runtime: &RuntimeConfig) -> Self {
        let mut broker = runtime.mqtt.clone();
        if let Ok(host) = std::env::var("MQTT_HOST") {
            broker.server = host;
        }
        if let Some(port) = std::env::var("MQTT_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
        {
            broker.port = port;
        }
        if let Ok(user) = std::env::var("MQTT_USER") {
            broker.user = user;
        }
        if let Ok(pass) = std::env::var("MQTT_PASS") {
            broker.password = pass;
        }

        Self {
            broker,
            hostname: runtime.device.hostname.clone(),
            unit: runtime.display.temperature_unit(),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.hostname.clone(),
            self.broker.server.clone(),
            self.broker.port,
        );
        options.set_keep_alive(Duration::from_secs(15));
        if !self.broker.user.is_empty() {
            options.set_credentials(self.broker.user.clone(), self.broker.password.clone());
        }
        options
    }
}

enum SessionEnd {
    Reconfigure,
    Shutdown,
}

pub async fn run(
    mut config: watch::Receiver<RuntimeConfig>,
    mut samples: mpsc::Receiver<ClimateSample>,
) {
    loop {
        let settings = MqttSettings::resolve(&config.borrow_and_update());
        match session(&settings, &mut config, &mut samples).await {
            SessionEnd::Reconfigure => info!("mqtt settings changed, reconnecting"),
            SessionEnd::Shutdown => return,
        }
    }
}

async fn session(
    settings: &MqttSettings,
    config: &mut watch::Receiver<RuntimeConfig>,
    samples: &mut mpsc::Receiver<ClimateSample>,
) -> SessionEnd {
    let (client, mut eventloop) = if settings.broker.is_empty() {
        info!("mqtt not configured; telemetry disabled");
        (None, None)
    } else {
        info!(
            server = %settings.broker.server,
            port = settings.broker.port,
            "connecting to mqtt broker"
        );
        let (client, eventloop) = AsyncClient::new(settings.options(), 32);
        (Some(client), Some(eventloop))
    };

    loop {
        tokio::select! {
            changed = config.changed() => {
                if changed.is_err() {
                    return SessionEnd::Shutdown;
                }
                if MqttSettings::resolve(&config.borrow_and_update()) != *settings {
                    return SessionEnd::Reconfigure;
                }
            }
            sample = samples.recv() => {
                let Some(sample) = sample else {
                    return SessionEnd::Shutdown;
                };
                if let Some(client) = &client {
                    publish_sample(client, &settings.hostname, &sample);
                }
            }
            event = next_event(&mut eventloop) => match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    if let Some(client) = &client {
                        announce(client, settings);
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    handle_command(&message.topic, &message.payload);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            },
        }
    }
}

async fn next_event(eventloop: &mut Option<EventLoop>) -> Result<Event, ConnectionError> {
    match eventloop {
        Some(eventloop) => eventloop.poll().await,
        None => std::future::pending().await,
    }
}

/// Publishes discovery documents and subscribes to the command topic.
/// Runs on every (re)connect since the broker may have lost both.
fn announce(client: &AsyncClient, settings: &MqttSettings) {
    let hostname = &settings.hostname;
    let documents = [
        (
            topics::temperature_config(hostname),
            DiscoveryConfig::temperature(hostname, settings.unit),
        ),
        (
            topics::humidity_config(hostname),
            DiscoveryConfig::humidity(hostname),
        ),
    ];

    for (topic, document) in documents {
        match serde_json::to_vec(&document) {
            Ok(body) => {
                if let Err(err) = client.try_publish(&topic, QoS::AtLeastOnce, true, body) {
                    warn!("discovery publish to {topic} failed: {err}");
                }
            }
            Err(err) => warn!("discovery serialization failed: {err}"),
        }
    }

    let command = topics::command(hostname);
    if let Err(err) = client.try_subscribe(&command, QoS::AtMostOnce) {
        warn!("subscribe to {command} failed: {err}");
    }
}

fn publish_sample(client: &AsyncClient, hostname: &str, sample: &ClimateSample) {
    let readings = [
        (topics::temperature_state(hostname), sample.temperature),
        (topics::humidity_state(hostname), sample.humidity),
    ];
    for (topic, value) in readings {
        if let Err(err) = client.try_publish(&topic, QoS::AtMostOnce, true, format!("{value:.1}"))
        {
            warn!("publish to {topic} failed: {err}");
        }
    }
}

fn handle_command(topic: &str, payload: &[u8]) {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return;
    }
    match std::str::from_utf8(payload) {
        Ok(message) => info!("command received on {topic}: {message}"),
        Err(_) => warn!("non utf8 command payload on {topic}"),
    }
}
