mod common;
use common::*;
use timnet_bridge::prelude::*;
use timnet_bridge::timnet::{Client, RegisterReader};

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

/// Accepts `connections` connections, one request each, and answers every
/// request with whatever `reply` builds from it. Returns the requests seen.
async fn fake_device<F>(connections: usize, reply: F) -> (u16, JoinHandle<Vec<Vec<u8>>>)
where
    F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for _ in 0..connections {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 12];
            socket.read_exact(&mut request).await.unwrap();
            socket.write_all(&reply(&request)).await.unwrap();
            requests.push(request);
        }
        requests
    });

    (port, handle)
}

fn client(port: u16) -> Client {
    Client::with_params("127.0.0.1", port, 1, Duration::from_secs(2))
}

// echoes the request's transaction id back
fn tid(request: &[u8]) -> u16 {
    u16::from_be_bytes([request[0], request[1]])
}

#[tokio::test]
async fn reads_register_block() -> Result<()> {
    common_setup();

    let block = Factory::burning_block();
    let words = block.clone();
    let (port, device) = fake_device(1, move |req| response_frame(tid(req), 1, &words)).await;

    let values = client(port).read_holding_registers(0x0000, 22).await?;
    assert_eq!(values, block);

    let requests = device.await?;
    assert_eq!(requests[0], vec![0, 1, 0, 0, 0, 6, 1, 3, 0, 0, 0, 22]);

    Ok(())
}

#[tokio::test]
async fn transaction_id_increments_per_request() -> Result<()> {
    common_setup();

    let (port, device) = fake_device(3, |req| response_frame(tid(req), 1, &[0])).await;
    let client = client(port);

    for _ in 0..3 {
        client.read_holding_registers(0, 1).await?;
    }

    let ids: Vec<u16> = device.await?.iter().map(|r| tid(r)).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    Ok(())
}

#[tokio::test]
async fn configured_unit_is_sent() -> Result<()> {
    common_setup();

    let (port, device) = fake_device(1, |req| response_frame(tid(req), 7, &[0])).await;
    let client = Client::with_params("127.0.0.1", port, 7, Duration::from_secs(2));

    client.read_holding_registers(0, 1).await?;

    assert_eq!(device.await?[0][6], 7);

    Ok(())
}

#[tokio::test]
async fn device_exception() -> Result<()> {
    common_setup();

    let (port, device) = fake_device(1, |req| {
        let mut r = req[..4].to_vec();
        r.extend_from_slice(&[0, 3, 1, 0x83, 0x02]);
        r
    })
    .await;

    let err = client(port).read_holding_registers(0, 22).await.unwrap_err();
    assert_eq!(err.exception_code(), Some(2));
    assert!(err.is_protocol());

    device.await?;
    Ok(())
}

#[tokio::test]
async fn short_reply() -> Result<()> {
    common_setup();

    let (port, device) = fake_device(1, |_| vec![0, 1, 0]).await;

    let err = client(port).read_holding_registers(0, 22).await.unwrap_err();
    assert!(matches!(err, ModbusError::TruncatedHeader(3)));

    device.await?;
    Ok(())
}

#[tokio::test]
async fn connection_closed_without_reply() -> Result<()> {
    common_setup();

    let (port, device) = fake_device(1, |_| Vec::new()).await;

    let err = client(port).read_holding_registers(0, 22).await.unwrap_err();
    assert!(matches!(err, ModbusError::TruncatedHeader(0)));
    assert!(err.is_transport());

    device.await?;
    Ok(())
}

#[tokio::test]
async fn receive_timeout() -> Result<()> {
    common_setup();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    // accept and then say nothing
    let device = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(socket);
    });

    let client = Client::with_params("127.0.0.1", port, 1, Duration::from_millis(200));
    let err = client.read_holding_registers(0, 22).await.unwrap_err();

    assert!(matches!(
        err,
        ModbusError::Timeout {
            phase: "receive",
            ..
        }
    ));
    assert!(err.is_transport());

    device.abort();
    Ok(())
}

#[tokio::test]
async fn connect_timeout() -> Result<()> {
    common_setup();

    // backlog of one and nobody accepting: once the queue is full further
    // SYNs are dropped and connects hang
    let socket = TcpSocket::new_v4()?;
    socket.bind("127.0.0.1:0".parse()?)?;
    let port = socket.local_addr()?.port();
    let listener = socket.listen(1)?;

    let mut queued = Vec::new();
    for _ in 0..8 {
        if let Ok(Ok(stream)) = tokio::time::timeout(
            Duration::from_millis(100),
            TcpStream::connect(("127.0.0.1", port)),
        )
        .await
        {
            queued.push(stream);
        }
    }

    let client = Client::with_params("127.0.0.1", port, 1, Duration::from_millis(200));
    let err = client.read_holding_registers(0, 22).await.unwrap_err();

    assert!(matches!(
        err,
        ModbusError::Timeout {
            phase: "connect",
            ..
        }
    ));
    assert!(err.is_transport());

    drop(queued);
    drop(listener);
    Ok(())
}

#[tokio::test]
async fn connection_refused() -> Result<()> {
    common_setup();

    // grab a free port, then close it again
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let err = client(port).read_holding_registers(0, 22).await.unwrap_err();

    assert!(matches!(err, ModbusError::Connect { .. }));
    assert!(err.is_transport());
    assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));

    Ok(())
}

#[tokio::test]
async fn invalid_count_is_rejected_before_connecting() {
    common_setup();

    // nothing listens on port 1; an attempt would fail differently
    let client = client(1);

    assert!(matches!(
        client.read_holding_registers(0, 0).await,
        Err(ModbusError::InvalidCount(0))
    ));
    assert!(matches!(
        client.read_holding_registers(0, 200).await,
        Err(ModbusError::InvalidCount(200))
    ));
}

#[test]
fn client_from_controller_config() {
    let controller = Factory::controller();

    assert_eq!(Client::new(&controller).addr(), "10.0.0.11:502");
}
