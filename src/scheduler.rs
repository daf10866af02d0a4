use crate::prelude::*;

use tokio::time::MissedTickBehavior;

/// Drives one poll per controller per `scan_interval` until shutdown.
#[derive(Clone)]
pub struct Scheduler {
    coordinators: Vec<Coordinator>,
    channels: Channels,
}

impl Scheduler {
    pub fn new(coordinators: Vec<Coordinator>, channels: Channels) -> Self {
        Self {
            coordinators,
            channels,
        }
    }

    pub fn coordinators(&self) -> &[Coordinator] {
        &self.coordinators
    }

    pub async fn start(&self) -> Result<()> {
        futures::future::try_join_all(self.coordinators.iter().map(|c| self.run(c))).await?;

        Ok(())
    }

    async fn run(&self, coordinator: &Coordinator) -> Result<()> {
        let controller = coordinator.controller().clone();
        let mut shutdown = self.channels.shutdown.subscribe();

        let mut interval = tokio::time::interval(controller.scan_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "{}: polling {}:{} unit {} every {}s",
            controller.name(),
            controller.host(),
            controller.port(),
            controller.unit(),
            controller.scan_interval().as_secs()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let state = coordinator.poll().await;
                    Self::log_state(&controller, &state);

                    // nobody listening is fine
                    let _ = self
                        .channels
                        .from_coordinator
                        .send(coordinator::ChannelData::Polled(controller.clone(), state));
                }
                _ = shutdown.recv() => {
                    info!("{}: scheduler received shutdown signal", controller.name());
                    break;
                }
            }
        }

        Ok(())
    }

    fn log_state(controller: &config::Controller, state: &std::sync::Arc<CachedState>) {
        let view = SensorView::from_state(state.clone());
        if !view.state().has_data() {
            debug!("{}: no data yet", controller.name());
            return;
        }

        let values: Vec<String> = view
            .visible_registers()
            .map(|r| format!("{}={}", r.key, view.value(r)))
            .collect();
        debug!(
            "{} ({}, connected={}): {}",
            controller.name(),
            view.variant().model(),
            view.connected(),
            values.join(" ")
        );
    }
}
