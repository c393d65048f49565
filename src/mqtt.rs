use anyhow::Result;
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::plan::MqttPlan;

pub type MessageCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

#[derive(Clone, Default)]
struct MqttStatus {
    connected: Arc<AtomicBool>,
    /// Set on every (re)connect until the topics are subscribed again
    needs_subscribe: Arc<AtomicBool>,
}

pub struct MqttClient {
    client: Mutex<EspMqttClient<'static>>,
    plan: MqttPlan,
    status: MqttStatus,
}

impl MqttClient {
    pub fn new(plan: MqttPlan, message_callback: MessageCallback) -> Result<Self> {
        info!("Initializing MQTT client...");
        info!("  Broker: {}", plan.broker_url);
        info!("  Client ID: {}", plan.client_id);

        let status = MqttStatus::default();

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(&plan.client_id),
            username: Some(&plan.username),
            password: Some(&plan.password),
            keep_alive_interval: Some(std::time::Duration::from_secs(30)),
            reconnect_timeout: Some(std::time::Duration::from_secs(5)),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&plan.broker_url, &mqtt_config)?;

        let status_clone = status.clone();

        std::thread::Builder::new()
            .stack_size(8192)
            .name("mqtt_conn".to_string())
            .spawn(move || {
                info!("MQTT connection handler started");
                let mut consecutive_errors = 0u32;
                let mut last_error_log_time = std::time::Instant::now();

                loop {
                    match connection.next() {
                        Ok(event) => match event.payload() {
                            EventPayload::Connected(session_present) => {
                                info!(
                                    "✅ MQTT connected to broker (session_present: {})",
                                    session_present
                                );
                                status_clone.connected.store(true, Ordering::Relaxed);
                                status_clone.needs_subscribe.store(true, Ordering::Relaxed);
                                consecutive_errors = 0;
                            }
                            EventPayload::Disconnected => {
                                info!("🔌 MQTT disconnected from broker");
                                status_clone.connected.store(false, Ordering::Relaxed);
                            }
                            EventPayload::Received {
                                topic: Some(topic_str),
                                data,
                                ..
                            } => {
                                info!("📩 MQTT received on '{}': {} bytes", topic_str, data.len());
                                message_callback(topic_str, data);
                            }
                            EventPayload::Subscribed(id) => {
                                info!("✅ MQTT subscribed (message id: {})", id);
                            }
                            EventPayload::Error(e) => {
                                if last_error_log_time.elapsed().as_secs() >= 10 {
                                    warn!("❌ MQTT error: {:?}", e);
                                    last_error_log_time = std::time::Instant::now();
                                }
                            }
                            _ => {}
                        },
                        Err(e) => {
                            status_clone.connected.store(false, Ordering::Relaxed);
                            consecutive_errors += 1;

                            // 1s, 2s, 5s, 10s, 30s, then 60s max
                            let backoff_secs = match consecutive_errors {
                                1 => 1,
                                2 => 2,
                                3 => 5,
                                4 => 10,
                                5 => 30,
                                _ => 60,
                            };

                            if consecutive_errors <= 3
                                || last_error_log_time.elapsed().as_secs() >= 30
                            {
                                warn!(
                                    "❌ MQTT connection error (#{}, retry in {}s): {:?}",
                                    consecutive_errors, backoff_secs, e
                                );
                                last_error_log_time = std::time::Instant::now();
                            }

                            std::thread::sleep(std::time::Duration::from_secs(backoff_secs));
                        }
                    }
                }
            })?;

        // The client lives for the whole program
        let client_static: EspMqttClient<'static> = unsafe { std::mem::transmute(client) };

        Ok(Self {
            client: Mutex::new(client_static),
            plan,
            status,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.status.connected.load(Ordering::Relaxed)
    }

    /// Subscribes the command and shared-data topics after a (re)connect.
    pub fn subscribe_if_needed(&self) -> Result<()> {
        if !self.is_connected() || !self.status.needs_subscribe.load(Ordering::Relaxed) {
            return Ok(());
        }
        let mut client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        for topic in self.plan.subscriptions() {
            client.subscribe(topic, QoS::AtMostOnce)?;
            info!("📥 MQTT subscribe requested for topic: '{}'", topic);
        }
        self.status.needs_subscribe.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Publishes to the status topic
    pub fn publish_status(&self, payload: &str) -> Result<()> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .enqueue(&self.plan.publish, QoS::AtMostOnce, false, payload.as_bytes())?;

        info!(
            "📤 MQTT enqueued publish to '{}': {} bytes",
            self.plan.publish,
            payload.len()
        );
        Ok(())
    }
}
