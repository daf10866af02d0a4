pub use anyhow::{anyhow, bail, Error, Result};
pub use log::{debug, error, info, trace, warn};

pub use std::io::Write;
pub use std::str::FromStr;

pub use tokio::sync::broadcast;

pub use crate::{
    channels::Channels,
    config::{self, Config, ConfigWrapper},
    coordinator::{self, Coordinator},
    decoder::{self, DecodedValue, DeviceVariant},
    error::ModbusError,
    mqtt,
    options::Options,
    register::{self, RegisterDescriptor},
    register_cache::{CachedState, RawReading, RegisterCache},
    sensor::SensorView,
    timnet,
};
