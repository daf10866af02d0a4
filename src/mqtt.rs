use crate::prelude::*;
use crate::register::DOOR_SWITCH;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use std::sync::Arc;

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    /// Everything worth publishing after one poll, topics relative to the
    /// namespace.
    ///
    /// The connection topic and its attributes are always included. Register
    /// and door topics only appear once a reading has been cached; after that
    /// they keep carrying the last known values through outages.
    pub fn for_state(controller: &config::Controller, state: Arc<CachedState>) -> Result<Vec<Message>> {
        let name = controller.name();
        let view = SensorView::from_state(state);
        let mut r = Vec::new();

        r.push(Message {
            topic: format!("{}/connection", name),
            retain: true,
            payload: if view.connected() { "online" } else { "offline" }.to_string(),
        });

        r.push(Message {
            topic: format!("{}/connection/attributes", name),
            retain: true,
            payload: serde_json::to_string(&view.connection_attributes(controller))?,
        });

        if !view.state().has_data() {
            return Ok(r);
        }

        r.push(Message {
            topic: format!("{}/variant", name),
            retain: true,
            payload: view.variant().model().to_string(),
        });

        r.push(Message {
            topic: format!("{}/door", name),
            retain: true,
            payload: match view.door_open() {
                Some(true) => "open",
                Some(false) => "closed",
                None => "unknown",
            }
            .to_string(),
        });

        r.push(Message {
            topic: format!("{}/door/attributes", name),
            retain: true,
            payload: serde_json::to_string(&view.attributes(&DOOR_SWITCH, controller))?,
        });

        for register in view.visible_registers() {
            let value = view.value(register);
            if !value.is_available() {
                continue;
            }

            r.push(Message {
                topic: format!("{}/{}", name, register.key),
                retain: true,
                payload: serde_json::to_string(&value)?,
            });

            if let Some(raw) = view.raw(register.address) {
                r.push(Message {
                    topic: format!("{}/{}/raw", name, register.key),
                    retain: true,
                    payload: raw.to_string(),
                });
            }

            r.push(Message {
                topic: format!("{}/{}/attributes", name, register.key),
                retain: true,
                payload: serde_json::to_string(&view.attributes(register, controller))?,
            });
        }

        Ok(r)
    }
} // }}}

#[derive(Clone)]
pub struct Mqtt {
    config: ConfigWrapper,
    channels: Channels,
}

impl Mqtt {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let mqtt = match self.config.mqtt() {
            Some(mqtt) if mqtt.enabled() => mqtt,
            _ => {
                info!("mqtt disabled, skipping");
                return Ok(());
            }
        };

        let mut options = MqttOptions::new("timnet-bridge", mqtt.host(), mqtt.port());

        let will = LastWill {
            topic: Self::lwt_topic(&mqtt),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(std::time::Duration::from_secs(60));
        if let (Some(u), Some(p)) = (mqtt.username(), mqtt.password()) {
            options.set_credentials(u, p);
        }

        info!("initializing mqtt at {}:{}", mqtt.host(), mqtt.port());

        let (client, eventloop) = AsyncClient::new(options, 10);

        futures::try_join!(
            self.setup(client.clone(), &mqtt),
            self.receiver(eventloop),
            self.sender(client, &mqtt)
        )?;

        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping MQTT client...");
        let _ = self
            .channels
            .from_coordinator
            .send(coordinator::ChannelData::Shutdown);
    }

    async fn setup(&self, client: AsyncClient, mqtt: &config::Mqtt) -> Result<()> {
        client
            .publish(Self::lwt_topic(mqtt), QoS::AtLeastOnce, true, "online")
            .await?;

        Ok(())
    }

    // drives the connection; we subscribe to nothing so incoming publishes
    // are unexpected
    async fn receiver(&self, mut eventloop: EventLoop) -> Result<()> {
        let mut shutdown = self.channels.shutdown.subscribe();

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        debug!("ignoring unexpected publish on {}", publish.topic);
                    }
                    Ok(_) => {} // keepalives etc
                    Err(e) => {
                        error!("{}", e);
                        info!("reconnecting in 5s");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }

        // keep the connection driven until the sender's offline/disconnect
        // has gone out
        let _ = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        info!("MQTT receiver loop exiting");
        Ok(())
    }

    // coordinator -> mqtt
    async fn sender(&self, client: AsyncClient, mqtt: &config::Mqtt) -> Result<()> {
        use coordinator::ChannelData::*;

        let mut receiver = self.channels.from_coordinator.subscribe();

        loop {
            match receiver.recv().await {
                Ok(Polled(controller, state)) => {
                    for message in Message::for_state(&controller, state)? {
                        let topic = format!("{}/{}", mqtt.namespace(), message.topic);
                        debug!("publishing: {} = {}", topic, message.payload);
                        // the next poll republishes everything, so no retry
                        if let Err(err) = client
                            .publish(&topic, QoS::AtLeastOnce, message.retain, message.payload)
                            .await
                        {
                            error!("MQTT publish to {} failed: {:?}", topic, err);
                        }
                    }
                }
                Ok(Shutdown) => {
                    info!("MQTT sender received shutdown signal");
                    let _ = client
                        .publish(Self::lwt_topic(mqtt), QoS::AtLeastOnce, true, "offline")
                        .await;
                    let _ = client.disconnect().await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("MQTT sender lagged, dropped {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("MQTT sender loop exiting");
        Ok(())
    }

    fn lwt_topic(mqtt: &config::Mqtt) -> String {
        format!("{}/LWT", mqtt.namespace())
    }
}
