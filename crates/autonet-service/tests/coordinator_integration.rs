//! Integration tests for the coordinator over real loopback UDP sockets.
//!
//! Each test starts a coordinator on an ephemeral 127.0.0.1 port with short
//! handshake timings and plays the device side with a plain tokio socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autonet_core::{Announcement, DeviceInfo, RendezvousOffer};
use autonet_service::{Coordinator, CoordinatorConfig, CoordinatorError, SessionPool};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

const URI: &str = "flora://svc";

fn config(timeout_ms: u64, interval_ms: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        port: 0,
        bind_address: "127.0.0.1".parse().unwrap(),
        rendezvous_uri: URI.to_string(),
        max_sessions: 4,
        handshake_timeout_ms: timeout_ms,
        handshake_interval_ms: interval_ms,
    }
}

async fn started(cfg: CoordinatorConfig) -> (Arc<Coordinator>, SocketAddr) {
    let pool = SessionPool::new(Handle::current(), cfg.max_sessions);
    let coordinator = Arc::new(Coordinator::new(cfg, pool).expect("valid config"));
    coordinator.start(false).await.expect("bind loopback");
    let addr = coordinator.local_addr().expect("bound address");
    (coordinator, addr)
}

async fn device_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.expect("bind device socket")
}

async fn announce(socket: &UdpSocket, to: SocketAddr, id: &str, name: &str) {
    let payload = Announcement::new(id, DeviceInfo::new(0, name))
        .encode()
        .unwrap();
    socket.send_to(&payload, to).await.unwrap();
}

async fn recv_offer(socket: &UdpSocket, wait: Duration) -> Option<(RendezvousOffer, SocketAddr)> {
    let mut buf = [0u8; 1024];
    let (len, from) = timeout(wait, socket.recv_from(&mut buf)).await.ok()?.ok()?;
    Some((RendezvousOffer::decode(&buf[..len]).ok()?, from))
}

async fn wait_until(mut cond: impl FnMut() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn test_announcement_receives_offer_from_service_port() {
    // Arrange
    let (coord, addr) = started(config(5_000, 100)).await;
    let device = device_socket().await;

    // Act
    announce(&device, addr, "dev1", "foo").await;
    let (offer, from) = recv_offer(&device, Duration::from_secs(2))
        .await
        .expect("an offer within two seconds");

    // Assert
    assert_eq!(offer.uri, URI);
    assert_eq!(offer.device_uri("dev1"), "flora://svc#dev1");
    assert_eq!(from, addr);
    assert!(coord.is_device_connecting("dev1"));

    coord.shutdown();
}

#[tokio::test]
async fn test_networking_complete_stops_offers_and_lists_device() {
    // Arrange
    let (coord, addr) = started(config(5_000, 50)).await;
    let device = device_socket().await;
    announce(&device, addr, "dev1", "foo").await;
    recv_offer(&device, Duration::from_secs(2)).await.expect("first offer");

    // Act
    assert!(coord.networking_complete("dev1"));
    // Let the session observe the transition, then drain in-flight offers.
    tokio::time::sleep(Duration::from_millis(150)).await;
    while recv_offer(&device, Duration::from_millis(20)).await.is_some() {}

    // Assert
    assert!(recv_offer(&device, Duration::from_millis(200)).await.is_none());
    assert_eq!(
        coord.get_devices(),
        vec![("dev1".to_string(), DeviceInfo::new(0, "foo"))]
    );
    assert!(!coord.is_device_connecting("dev1"));

    coord.shutdown();
}

#[tokio::test]
async fn test_malformed_datagram_does_not_stop_the_loop() {
    // Arrange
    let (coord, addr) = started(config(5_000, 100)).await;
    let device = device_socket().await;

    // Act
    device.send_to(b"garbage", addr).await.unwrap();
    announce(&device, addr, "dev2", "bar").await;

    // Assert
    let (offer, _) = recv_offer(&device, Duration::from_secs(2))
        .await
        .expect("valid announcement still served");
    assert_eq!(offer.uri, URI);
    assert!(coord.is_device_connecting("dev2"));

    coord.shutdown();
}

#[tokio::test]
async fn test_duplicate_announcements_start_one_session() {
    // Arrange
    let (coord, addr) = started(config(5_000, 100)).await;
    let device = device_socket().await;

    // Act
    for _ in 0..3 {
        announce(&device, addr, "dev1", "foo").await;
    }
    recv_offer(&device, Duration::from_secs(2)).await.expect("an offer");

    // Assert
    assert!(wait_until(|| coord.pool().active() == 1, Duration::from_secs(1)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coord.pool().active(), 1);
    assert_eq!(coord.connecting_count(), 1);

    coord.shutdown();
}

#[tokio::test]
async fn test_silent_device_is_evicted_after_timeout() {
    // Arrange: 300 ms timeout, 100 ms interval, nobody reports completion
    let (coord, addr) = started(config(300, 100)).await;
    let device = device_socket().await;

    // Act
    announce(&device, addr, "dev1", "foo").await;
    assert!(wait_until(|| coord.is_device_connecting("dev1"), Duration::from_secs(1)).await);

    // Assert
    assert!(wait_until(|| !coord.is_device_connecting("dev1"), Duration::from_secs(2)).await);
    assert!(coord.get_devices().is_empty());
    assert!(!coord.networking_complete("dev1"));

    // A fresh announcement is admitted again.
    announce(&device, addr, "dev1", "foo").await;
    assert!(wait_until(|| coord.is_device_connecting("dev1"), Duration::from_secs(1)).await);

    coord.shutdown();
}

#[tokio::test]
async fn test_shutdown_ends_loop_and_evicts_connecting_devices() {
    // Arrange
    let pool = SessionPool::new(Handle::current(), 4);
    let coord = Coordinator::new(config(10_000, 100), pool).unwrap();
    let handle = coord.start(false).await.unwrap().expect("detached handle");
    let addr = coord.local_addr().unwrap();
    let device = device_socket().await;
    announce(&device, addr, "dev1", "foo").await;
    recv_offer(&device, Duration::from_secs(2)).await.expect("an offer");

    // Act
    coord.shutdown();
    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop stops promptly")
        .expect("loop task does not panic");

    // Assert
    assert_ok!(result);
    assert!(!coord.is_device_connecting("dev1"));
    assert!(coord.pool().is_shut_down());
}

#[tokio::test]
async fn test_blocking_start_returns_after_shutdown() {
    // Arrange
    let pool = SessionPool::new(Handle::current(), 1);
    let coord = Arc::new(Coordinator::new(config(1_000, 100), pool).unwrap());
    let stopper = Arc::clone(&coord);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.shutdown();
    });

    // Act
    let result = timeout(Duration::from_secs(2), coord.start(true))
        .await
        .expect("blocking start returns");

    // Assert
    assert!(matches!(result, Ok(None)));
    assert!(coord.local_addr().is_some());
}

#[tokio::test]
async fn test_second_coordinator_on_same_port_fails_to_bind() {
    // Arrange
    let (first, addr) = started(config(1_000, 100)).await;
    let cfg = CoordinatorConfig {
        port: addr.port(),
        ..config(1_000, 100)
    };
    let second = Coordinator::new(cfg, SessionPool::new(Handle::current(), 1)).unwrap();

    // Act
    let result = second.start(false).await;

    // Assert
    let err = assert_err!(result);
    assert!(matches!(err, CoordinatorError::BindFailed { .. }));
    first.shutdown();
}
