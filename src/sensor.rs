use crate::prelude::*;
use crate::register::{DOOR_SWITCH, T2_ADDRESS};

use serde_json::{json, Value};
use std::sync::Arc;

/// Read side of one controller, pinned to a single cached snapshot.
///
/// Every accessor answers: a fresh value, a stale one, or
/// [`DecodedValue::Unavailable`]. Values are decoded on each call.
#[derive(Clone, Debug)]
pub struct SensorView {
    state: Arc<CachedState>,
}

impl SensorView {
    pub fn new(cache: &RegisterCache) -> Self {
        Self::from_state(cache.snapshot())
    }

    pub fn from_state(state: Arc<CachedState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CachedState {
        &self.state
    }

    /// Raw word at `address`, for diagnostics.
    pub fn raw(&self, address: u16) -> Option<u16> {
        self.state.raw(address)
    }

    pub fn value(&self, descriptor: &RegisterDescriptor) -> DecodedValue {
        match self.raw(descriptor.address) {
            Some(raw) => descriptor.decode(raw),
            None => DecodedValue::Unavailable,
        }
    }

    pub fn value_by_key(&self, key: &str) -> DecodedValue {
        register::by_key(key)
            .map(|d| self.value(d))
            .unwrap_or(DecodedValue::Unavailable)
    }

    /// `None` until a reading exists.
    pub fn door_open(&self) -> Option<bool> {
        decoder::door_open(self.raw(DOOR_SWITCH.address))
    }

    /// Last poll succeeded and there is data to show. Always answerable,
    /// even when every other accessor is unavailable.
    pub fn connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn variant(&self) -> DeviceVariant {
        DeviceVariant::infer(self.raw(T2_ADDRESS))
    }

    /// Registers worth presenting on the hardware the readings suggest.
    pub fn visible_registers(&self) -> impl Iterator<Item = &'static RegisterDescriptor> {
        register::for_variant(self.variant())
    }

    /// Where the connectivity indicator points.
    pub fn connection_attributes(&self, controller: &config::Controller) -> Value {
        json!({
            "host": controller.host(),
            "port": controller.port(),
        })
    }

    /// Diagnostic attributes for one register.
    pub fn attributes(&self, descriptor: &RegisterDescriptor, controller: &config::Controller) -> Value {
        let mut attrs = json!({
            "address": descriptor.address_hex(),
            "register_key": descriptor.key,
            "host": controller.host(),
            "port": controller.port(),
        });

        if let Some(raw) = self.raw(descriptor.address) {
            attrs["raw_value"] = json!(raw);
        }

        attrs
    }
}
