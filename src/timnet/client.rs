use crate::prelude::*;
use crate::timnet::packet::{Parser, ReadHoldingRegisters, TcpFrameFactory};

use {
    async_trait::async_trait,
    std::sync::atomic::{AtomicU16, Ordering},
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tokio::net::TcpStream,
    tokio::time::timeout,
};

/// Responses are small; one receive of this size is always enough.
const RECV_BUFFER_SIZE: usize = 4096;

/// Anything that can answer a read-holding-registers request.
#[async_trait]
pub trait RegisterReader: Send + Sync {
    async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, ModbusError>;
}

/// Modbus-TCP client for TimNet controllers.
///
/// Every request opens its own connection and closes it once the reply is
/// in; the controller does not cope with long-lived sessions. There are no
/// retries here.
pub struct Client {
    host: String,
    port: u16,
    unit: u8,
    timeout: Duration,
    transaction_id: AtomicU16,
}

impl Client {
    pub fn new(controller: &config::Controller) -> Self {
        Self::with_params(
            controller.host(),
            controller.port(),
            controller.unit(),
            controller.timeout(),
        )
    }

    pub fn with_params(host: &str, port: u16, unit: u8, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            unit,
            timeout,
            transaction_id: AtomicU16::new(0),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    // wraps at 65535 -> 0
    fn next_transaction_id(&self) -> u16 {
        self.transaction_id
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    async fn send_request(&self, pdu: &[u8]) -> std::result::Result<Vec<u8>, ModbusError> {
        let addr = self.addr();
        let transaction_id = self.next_transaction_id();
        let frame = TcpFrameFactory::build(transaction_id, self.unit, pdu);

        let mut stream = match timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ModbusError::Connect { addr, source }),
            Err(_) => {
                return Err(ModbusError::Timeout {
                    addr,
                    phase: "connect",
                    timeout: self.timeout,
                })
            }
        };

        trace!("{}: TX tid={} {:02x?}", addr, transaction_id, frame);

        match timeout(self.timeout, stream.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(ModbusError::Io { addr, source }),
            Err(_) => {
                return Err(ModbusError::Timeout {
                    addr,
                    phase: "send",
                    timeout: self.timeout,
                })
            }
        }

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let len = match timeout(self.timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(source)) => return Err(ModbusError::Io { addr, source }),
            Err(_) => {
                return Err(ModbusError::Timeout {
                    addr,
                    phase: "receive",
                    timeout: self.timeout,
                })
            }
        };
        buf.truncate(len);

        trace!("{}: RX {:02x?}", addr, buf);

        Ok(buf)
    }
}

#[async_trait]
impl RegisterReader for Client {
    async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, ModbusError> {
        let request = ReadHoldingRegisters::new(address, count)?;
        let response = self.send_request(&request.pdu()).await?;

        Parser::parse_read_holding(&response, count)
    }
}
