use crate::prelude::*;

use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub controllers: Vec<Controller>,

    pub mqtt: Option<Mqtt>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Controller {{{
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Controller {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub name: Option<String>,

    pub host: String,
    #[serde(default = "Config::default_modbus_port")]
    pub port: u16,
    #[serde(default = "Config::default_unit")]
    pub unit: u8,

    /// Seconds between polls.
    #[serde(default = "Config::default_scan_interval")]
    pub scan_interval: u64,
    /// Seconds allowed for each of connect and receive.
    #[serde(default = "Config::default_timeout")]
    pub timeout: u64,
}
impl Controller {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            enabled: Config::default_enabled(),
            name: None,
            host: host.to_string(),
            port,
            unit: Config::default_unit(),
            scan_interval: Config::default_scan_interval(),
            timeout: Config::default_timeout(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Display name, falling back to the host.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.host.is_empty() {
            bail!("controllers[{}].host cannot be empty", index);
        }
        if self.port == 0 {
            bail!("controllers[{}].port must be between 1 and 65535", index);
        }
        if self.unit > 247 {
            bail!("controllers[{}].unit must be between 0 and 247", index);
        }
        if self.timeout == 0 {
            bail!("controllers[{}].timeout must be at least 1 second", index);
        }
        if self.scan_interval == 0 {
            bail!("controllers[{}].scan_interval must be at least 1 second", index);
        }
        // a poll must finish before the next one is due
        if self.scan_interval < self.timeout {
            bail!(
                "controllers[{}].scan_interval ({}s) must not be shorter than timeout ({}s)",
                index,
                self.scan_interval,
                self.timeout
            );
        }
        Ok(())
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_namespace")]
    pub namespace: String,
}
impl Mqtt {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn controllers(&self) -> Vec<Controller> {
        self.lock().controllers.clone()
    }

    pub fn enabled_controllers(&self) -> Vec<Controller> {
        self.controllers().into_iter().filter(|c| c.enabled()).collect()
    }

    pub fn controller_with_host(&self, host: &str) -> Option<Controller> {
        self.controllers().into_iter().find(|c| c.host() == host)
    }

    pub fn mqtt(&self) -> Option<Mqtt> {
        self.lock().mqtt.clone()
    }

    pub fn mqtt_enabled(&self) -> bool {
        self.mqtt().map(|m| m.enabled()).unwrap_or(false)
    }

    pub fn loglevel(&self) -> String {
        self.lock().loglevel.clone()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| file_error_with_source!(err, "error reading {}", file))?;

        Self::from_yaml(&content)
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!(
            "  Controllers: {} configured, {} enabled",
            self.controllers.len(),
            self.controllers.iter().filter(|c| c.enabled).count()
        );
        for (i, controller) in self.controllers.iter().enumerate() {
            info!("    Controller[{}]:", i);
            info!("      Name: {}", controller.name());
            info!("      Enabled: {}", controller.enabled);
            info!("      Host: {}", controller.host);
            info!("      Port: {}", controller.port);
            info!("      Unit: {}", controller.unit);
            info!("      Scan Interval: {}s", controller.scan_interval);
            info!("      Timeout: {}s", controller.timeout);
            if controller.scan_interval < controller.timeout * 2 {
                warn!(
                    "      scan_interval is less than twice the timeout, slow polls may delay the next tick"
                );
            }
        }

        match &self.mqtt {
            Some(mqtt) if mqtt.enabled => {
                info!("  MQTT: enabled");
                info!("    Host: {}", mqtt.host);
                info!("    Port: {}", mqtt.port);
                info!("    Namespace: {}", mqtt.namespace);
            }
            _ => info!("  MQTT: disabled"),
        }
        info!("  Log Level: {}", self.loglevel);
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|err| file_error_with_source!(err, "invalid configuration"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.controllers.is_empty() {
            bail!("at least one controller must be configured");
        }

        for (i, controller) in self.controllers.iter().enumerate() {
            if controller.enabled {
                controller.validate(i)?;
            }
        }

        if let Some(mqtt) = &self.mqtt {
            if mqtt.enabled {
                if mqtt.port == 0 {
                    bail!("mqtt.port must be between 1 and 65535");
                }
                if mqtt.host.is_empty() {
                    return Err(file_error!("MQTT host cannot be empty"));
                }
            }
        }

        Ok(())
    }

    fn default_modbus_port() -> u16 {
        502
    }

    fn default_unit() -> u8 {
        1
    }

    fn default_scan_interval() -> u64 {
        8
    }

    fn default_timeout() -> u64 {
        3
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_namespace() -> String {
        "timnet".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
