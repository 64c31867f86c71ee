//! Integration tests for MqttClient
//!
//! These run the client against an in-process fake broker over real TCP
//! sockets and check what actually goes over the wire.

mod common;

use common::{FakeBroker, closed_port, silent_listener};
use std::time::Duration;
use tagwatch_network::{ConnectReturnCode, MqttClient, MqttClientConfig, MqttError, Packet};

#[tokio::test]
async fn test_full_session() {
    let mut broker = FakeBroker::start(ConnectReturnCode::Accepted).await;
    let config = broker.client_config("door-1").with_credentials("door", "secret");

    let mut client = MqttClient::new(config);
    assert!(!client.is_connected());

    client.connect().await.unwrap();
    assert!(client.is_connected());

    client
        .publish("rc522/card/authorized", "Authorized card Wies scanned")
        .await
        .unwrap();
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());

    match broker.next().await.packet {
        Packet::Connect(connect) => {
            assert_eq!(connect.client_id, "door-1");
            assert_eq!(connect.username.as_deref(), Some("door"));
            assert_eq!(connect.password.as_deref(), Some(&b"secret"[..]));
            assert!(connect.clean_session);
        }
        other => panic!("expected CONNECT, got {other:?}"),
    }

    match broker.next().await.packet {
        Packet::Publish(publish) => {
            assert_eq!(publish.topic, "rc522/card/authorized");
            assert_eq!(&publish.payload[..], b"Authorized card Wies scanned");
            assert!(!publish.retain);
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }

    assert_eq!(broker.next().await.packet, Packet::Disconnect);
}

#[tokio::test]
async fn test_connect_without_credentials() {
    let mut broker = FakeBroker::start(ConnectReturnCode::Accepted).await;

    let mut client = MqttClient::new(broker.client_config("anon"));
    client.connect().await.unwrap();
    client.disconnect().await.unwrap();

    match broker.next().await.packet {
        Packet::Connect(connect) => {
            assert!(connect.username.is_none());
            assert!(connect.password.is_none());
        }
        other => panic!("expected CONNECT, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_authorized_refusal() {
    let broker = FakeBroker::start(ConnectReturnCode::NotAuthorized).await;

    let mut client = MqttClient::new(broker.client_config("door-1"));
    let result = client.connect().await;

    let error = result.unwrap_err();
    assert!(error.is_not_authorized());
    assert_eq!(error.reason_code(), Some(5));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_bad_credentials_refusal() {
    let broker = FakeBroker::start(ConnectReturnCode::BadUsernameOrPassword).await;

    let mut client = MqttClient::new(broker.client_config("door-1"));
    let error = client.connect().await.unwrap_err();

    assert!(matches!(
        error,
        MqttError::ConnectionRefused(ConnectReturnCode::BadUsernameOrPassword)
    ));
    assert!(!error.is_not_authorized());
}

#[tokio::test]
async fn test_connection_refused_by_os() {
    let addr = closed_port().await;
    let config = MqttClientConfig::new(addr.ip().to_string(), addr.port(), "x")
        .with_timeout(Duration::from_millis(500));

    let mut client = MqttClient::new(config);
    let error = client.connect().await.unwrap_err();

    assert!(matches!(error, MqttError::Io(_)));
    assert_eq!(error.reason_code(), None);
}

#[tokio::test]
async fn test_connack_timeout() {
    let addr = silent_listener().await;
    let config = MqttClientConfig::new(addr.ip().to_string(), addr.port(), "x")
        .with_timeout(Duration::from_millis(100));

    let mut client = MqttClient::new(config);
    let result = client.connect().await;

    assert!(matches!(result, Err(MqttError::ReadTimeout(100))));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let mut broker = FakeBroker::start(ConnectReturnCode::Accepted).await;

    for i in 0..3 {
        let mut client = MqttClient::new(broker.client_config("door-1"));
        client.connect().await.unwrap();
        client.publish("t", format!("message {i}")).await.unwrap();
        client.disconnect().await.unwrap();
    }

    let mut connections = Vec::new();
    for _ in 0..9 {
        let seen = broker.next().await;
        if matches!(seen.packet, Packet::Connect(_)) {
            connections.push(seen.connection);
        }
    }
    assert_eq!(connections, vec![1, 2, 3]);
}
