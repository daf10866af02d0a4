#[macro_use]
pub mod error;         // Error types and located-error macros

pub mod channels;      // Inter-component communication channels
pub mod config;        // Configuration management
pub mod coordinator;   // Per-controller acquisition loop
pub mod decoder;       // Raw word -> display value rules
pub mod mqtt;          // MQTT publishing of decoded state
pub mod options;       // Command line options parsing
pub mod prelude;       // Common imports and types
pub mod register;      // Register catalog
pub mod register_cache; // Last good reading per controller
pub mod scheduler;     // Polling cadence
pub mod sensor;        // Consumer-facing accessors
pub mod timnet;        // Modbus-TCP transport

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::mqtt::Mqtt;
use crate::scheduler::Scheduler;
use crate::timnet::Client;
use std::sync::Arc;

/// Manages all application components and their lifecycle
#[derive(Clone)]
pub struct Components {
    pub scheduler: Arc<Scheduler>,
    pub mqtt: Option<Arc<Mqtt>>,
    pub channels: Channels,
}

impl Components {
    /// Wires a coordinator, cache and client for every enabled controller.
    pub fn new(config: &ConfigWrapper, channels: Channels) -> Self {
        let coordinators = config
            .enabled_controllers()
            .into_iter()
            .map(|controller| {
                let client = Arc::new(Client::new(&controller));
                Coordinator::new(controller, client, RegisterCache::new())
            })
            .collect();

        let mqtt = if config.mqtt_enabled() {
            Some(Arc::new(Mqtt::new(config.clone(), channels.clone())))
        } else {
            None
        };

        Self {
            scheduler: Arc::new(Scheduler::new(coordinators, channels.clone())),
            mqtt,
            channels,
        }
    }

    /// Stops polling first, then lets MQTT mark us offline.
    pub fn stop(&self) {
        info!("Stopping all components...");

        let _ = self.channels.shutdown.send(());
        if let Some(mqtt) = &self.mqtt {
            mqtt.stop();
        }
    }

    pub fn print_stats(&self) {
        for coordinator in self.scheduler.coordinators() {
            coordinator.stats().print_summary(coordinator.controller().name());
        }
    }
}

fn init_logging(level: &str) -> std::result::Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
}

/// Main application entry point
pub async fn app(options: Options) -> Result<()> {
    // the configured log level is only known once the file is read
    let config = Config::new(options.config_file.clone())?;

    if let Err(e) = init_logging(&config.loglevel) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    info!(
        "timnet-bridge {} starting with config file: {}",
        CARGO_PKG_VERSION, options.config_file
    );
    config.log_summary();

    let config = ConfigWrapper::from_config(config);
    let channels = Channels::new();
    let components = Components::new(&config, channels.clone());

    info!(
        "Starting {} controller(s)...",
        components.scheduler.coordinators().len()
    );

    let scheduler = components.scheduler.clone();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler task failed: {}", e);
        }
    });

    let mqtt_handle = components.mqtt.clone().map(|mqtt| {
        tokio::spawn(async move {
            if let Err(e) = mqtt.start().await {
                error!("MQTT task failed: {}", e);
            }
        })
    });

    // Wait for ctrl-c or the runtime limit
    info!("Waiting for shutdown signal...");
    match options.runtime {
        Some(secs) => {
            tokio::select! {
                r = tokio::signal::ctrl_c() => r?,
                _ = tokio::time::sleep(std::time::Duration::from_secs(secs)) => {
                    info!("Runtime limit of {}s reached", secs);
                }
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutdown signal received, stopping components...");
    components.stop();

    if let Err(e) = scheduler_handle.await {
        error!("Error waiting for scheduler task: {}", e);
    }
    if let Some(handle) = mqtt_handle {
        if let Err(e) = handle.await {
            error!("Error waiting for MQTT task: {}", e);
        }
    }

    components.print_stats();
    info!("Shutdown complete");

    Ok(())
}
