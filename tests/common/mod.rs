#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use timnet_bridge::coordinator::BLOCK_SIZE;
use timnet_bridge::prelude::*;
use timnet_bridge::timnet::RegisterReader;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;
impl Factory {
    pub fn controller() -> config::Controller {
        let mut controller = config::Controller::new("10.0.0.11", 502);
        controller.name = Some("boiler".to_string());
        controller
    }

    /// Full 22-register block starting with `head`, rest zero.
    pub fn block(head: &[u16]) -> Vec<u16> {
        let mut r = vec![0; BLOCK_SIZE as usize];
        r[..head.len()].copy_from_slice(head);
        r
    }

    /// TimNet 200 mid-burn.
    pub fn burning_block() -> Vec<u16> {
        let mut r = Self::block(&[215, 634, 1200, 50, 0, 2, 1, 3, 31, 2]);
        r[0x10] = 15; // BEEP on
        r[0x11] = 1; // relay 1 closed
        r[0x12] = 0; // relay 2 open
        r[0x13] = 0; // no faults
        r[0x14] = 5; // burning, rising
        r[0x15] = 1234; // refuels
        r
    }

    pub fn coordinator(reader: Arc<dyn RegisterReader>) -> Coordinator {
        Coordinator::new(Self::controller(), reader, RegisterCache::new())
    }
}

/// Answers reads from a script, front to back. An exhausted script behaves
/// like a device that refuses connections.
#[derive(Default)]
pub struct FakeReader {
    responses: Mutex<VecDeque<std::result::Result<Vec<u16>, ModbusError>>>,
    pub requests: Mutex<Vec<(u16, u16)>>,
}

impl FakeReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, words: Vec<u16>) {
        self.responses.lock().unwrap().push_back(Ok(words));
    }

    pub fn push_err(&self, err: ModbusError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RegisterReader for FakeReader {
    async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, ModbusError> {
        self.requests.lock().unwrap().push((address, count));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(refused()))
    }
}

/// Blocks every read until released, so a poll can be held in flight.
#[derive(Default)]
pub struct GatedReader {
    pub started: Notify,
    pub release: Notify,
    pub words: Vec<u16>,
}

#[async_trait]
impl RegisterReader for GatedReader {
    async fn read_holding_registers(
        &self,
        _address: u16,
        _count: u16,
    ) -> std::result::Result<Vec<u16>, ModbusError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.words.clone())
    }
}

pub fn refused() -> ModbusError {
    ModbusError::Connect {
        addr: "10.0.0.11:502".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
    }
}

/// A well-formed read-holding-registers response.
pub fn response_frame(transaction_id: u16, unit: u8, words: &[u16]) -> Vec<u8> {
    let mut pdu = vec![3, (words.len() * 2) as u8];
    for w in words {
        pdu.extend_from_slice(&w.to_be_bytes());
    }

    let mut r = Vec::new();
    r.extend_from_slice(&transaction_id.to_be_bytes());
    r.extend_from_slice(&[0, 0]);
    r.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
    r.push(unit);
    r.extend_from_slice(&pdu);
    r
}
